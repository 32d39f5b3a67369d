use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{CategoryItem, Level};

use super::balance::{even_split, proportional_split};
use super::error::EditError;
use super::TARGET_TOTAL;

/// How an edit to one sibling affects the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalancingMode {
    /// Redistribute the rest of 100 over the other siblings on every edit.
    #[default]
    Auto,
    /// Only the edited value changes; the user balances by hand.
    Manual,
}

/// One sibling as held in a buffer, in whole percentage points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditItem {
    pub value: String,
    pub percentage: u32,
    pub count: Option<u64>,
    pub total_count: Option<u64>,
}

impl From<CategoryItem> for EditItem {
    fn from(item: CategoryItem) -> Self {
        Self {
            value: item.value,
            percentage: item.percentage.max(0.0).round() as u32,
            count: item.count,
            total_count: item.total_count,
        }
    }
}

/// Local editable copy of one sibling set.
///
/// `synced` is the last copy confirmed by the server; `local` is what the
/// user is editing. The buffer is dirty from the first edit until it is
/// rolled back or replaced with fresh server data.
#[derive(Debug, Clone)]
pub struct EditBuffer {
    level: Level,
    mode: BalancingMode,
    synced: Vec<EditItem>,
    local: Vec<EditItem>,
    dirty: bool,
}

impl EditBuffer {
    pub fn new(level: Level, items: Vec<CategoryItem>, mode: BalancingMode) -> Self {
        let synced: Vec<EditItem> = items.into_iter().map(EditItem::from).collect();
        Self {
            level,
            mode,
            local: synced.clone(),
            synced,
            dirty: false,
        }
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn mode(&self) -> BalancingMode {
        self.mode
    }

    /// The items as currently edited.
    pub fn items(&self) -> &[EditItem] {
        &self.local
    }

    /// The last server-confirmed items.
    pub fn synced_items(&self) -> &[EditItem] {
        &self.synced
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_empty(&self) -> bool {
        self.local.is_empty()
    }

    /// Sum of the local percentages. Summed wide so no combination of
    /// `u32` items can wrap around to 100.
    pub fn total(&self) -> u64 {
        self.local.iter().map(|item| u64::from(item.percentage)).sum()
    }

    /// A set with items must sum to exactly 100. An empty set has nothing to save.
    pub fn is_balanced(&self) -> bool {
        self.local.is_empty() || self.total() == u64::from(TARGET_TOTAL)
    }

    pub fn percentage_of(&self, value: &str) -> Option<u32> {
        self.local
            .iter()
            .find(|item| item.value == value)
            .map(|item| item.percentage)
    }

    /// Whether `value` differs locally from the server copy.
    pub fn is_changed(&self, value: &str) -> bool {
        let synced = self.synced.iter().find(|item| item.value == value);
        match (synced, self.percentage_of(value)) {
            (Some(synced), Some(local)) => synced.percentage != local,
            _ => false,
        }
    }

    /// Set `value` to `percentage`, rebalancing the other siblings in `Auto` mode.
    ///
    /// Values above 100 are accepted so the imbalance is visible before saving;
    /// in that case there is nothing left to give the other siblings and they
    /// are left as they are.
    pub fn update_percentage(&mut self, value: &str, percentage: i32) -> Result<(), EditError> {
        if percentage < 0 {
            return Err(EditError::NegativePercentage(percentage));
        }
        let percentage = percentage as u32;

        let target = self
            .local
            .iter()
            .position(|item| item.value == value)
            .ok_or_else(|| EditError::UnknownValue {
                level: self.level,
                value: value.to_string(),
            })?;

        self.local[target].percentage = percentage;

        if self.mode == BalancingMode::Auto && percentage <= TARGET_TOTAL {
            self.rebalance_others(target, TARGET_TOTAL - percentage);
        }

        self.dirty = true;
        debug!(level = %self.level, value = value, percentage = percentage, total = self.total(), "Updated local percentage");
        Ok(())
    }

    fn rebalance_others(&mut self, target: usize, remainder: u32) {
        let others: Vec<u32> = self
            .local
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != target)
            .map(|(_, item)| item.percentage)
            .collect();
        if others.is_empty() {
            return;
        }

        let mut shares = proportional_split(remainder, &others).into_iter();
        for (i, item) in self.local.iter_mut().enumerate() {
            if i == target {
                continue;
            }
            if let Some(share) = shares.next() {
                item.percentage = share;
            }
        }
    }

    /// Reset every item to an even split of 100.
    pub fn distribute_evenly(&mut self) {
        let split = even_split(TARGET_TOTAL, self.local.len());
        for (item, share) in self.local.iter_mut().zip(split) {
            item.percentage = share;
        }
        self.dirty = true;
    }

    /// Discard local edits.
    pub fn rollback(&mut self) {
        self.local = self.synced.clone();
        self.dirty = false;
    }

    /// Replace both copies with fresh server data.
    pub fn replace(&mut self, items: Vec<CategoryItem>) {
        self.synced = items.into_iter().map(EditItem::from).collect();
        self.local = self.synced.clone();
        self.dirty = false;
    }
}
