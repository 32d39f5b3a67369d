//! Percentage configuration for one drill-down selection.
//!
//! A selection of a B1 manages the B2 set under it; adding a B2 also manages
//! the B3 set under that pair; adding a B3 also manages its detail set.
//! Changing the selection means loading a new editor: sets are never merged
//! across parents.

use tracing::{debug, info, warn};

use crate::api::ApiError;
use crate::models::Level;

use super::buffer::{BalancingMode, EditBuffer};
use super::error::{CommitError, EditError, Imbalance, ValidationError};
use super::source::{SiblingScope, SiblingSource};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection {
    pub b1: String,
    pub b2: Option<String>,
    pub b3: Option<String>,
}

impl Selection {
    pub fn new(b1: impl Into<String>) -> Self {
        Self {
            b1: b1.into(),
            b2: None,
            b3: None,
        }
    }

    pub fn with_b2(mut self, b2: impl Into<String>) -> Self {
        self.b2 = Some(b2.into());
        self
    }

    pub fn with_b3(mut self, b3: impl Into<String>) -> Self {
        self.b3 = Some(b3.into());
        self
    }

    /// The sibling sets this selection manages, parents first.
    pub fn scopes(&self) -> Vec<SiblingScope> {
        let mut scopes = vec![SiblingScope::B2 {
            b1: self.b1.clone(),
        }];
        if let Some(ref b2) = self.b2 {
            scopes.push(SiblingScope::B3 {
                b1: self.b1.clone(),
                b2: b2.clone(),
            });
            if let Some(ref b3) = self.b3 {
                scopes.push(SiblingScope::Detail {
                    b1: self.b1.clone(),
                    b2: b2.clone(),
                    b3: b3.clone(),
                });
            }
        }
        scopes
    }
}

/// A percentage that reached the server during a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedItem {
    pub level: Level,
    pub value: String,
    pub percentage: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    pub saved: Vec<SavedItem>,
}

impl CommitReport {
    pub fn is_empty(&self) -> bool {
        self.saved.is_empty()
    }
}

#[derive(Debug, Clone)]
struct ManagedSet {
    scope: SiblingScope,
    buffer: EditBuffer,
}

pub struct PercentageEditor {
    selection: Selection,
    mode: BalancingMode,
    sets: Vec<ManagedSet>,
}

impl PercentageEditor {
    /// Load every set managed by `selection` into clean buffers.
    pub async fn load<S>(
        source: &S,
        selection: Selection,
        mode: BalancingMode,
    ) -> Result<Self, ApiError>
    where
        S: SiblingSource + ?Sized,
    {
        let mut sets = Vec::new();
        for scope in selection.scopes() {
            let items = source.fetch_siblings(&scope).await?;
            debug!(scope = %scope, items = items.len(), "Loaded sibling set");
            sets.push(ManagedSet {
                buffer: EditBuffer::new(scope.level(), items, mode),
                scope,
            });
        }

        Ok(Self {
            selection,
            mode,
            sets,
        })
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn mode(&self) -> BalancingMode {
        self.mode
    }

    pub fn buffer(&self, level: Level) -> Option<&EditBuffer> {
        self.sets
            .iter()
            .find(|set| set.scope.level() == level)
            .map(|set| &set.buffer)
    }

    /// Managed sets in load order.
    pub fn buffers(&self) -> impl Iterator<Item = (&SiblingScope, &EditBuffer)> {
        self.sets.iter().map(|set| (&set.scope, &set.buffer))
    }

    fn buffer_mut(&mut self, level: Level) -> Result<&mut EditBuffer, EditError> {
        self.sets
            .iter_mut()
            .find(|set| set.scope.level() == level)
            .map(|set| &mut set.buffer)
            .ok_or(EditError::LevelNotLoaded(level))
    }

    pub fn update_percentage(
        &mut self,
        level: Level,
        value: &str,
        percentage: i32,
    ) -> Result<(), EditError> {
        self.buffer_mut(level)?.update_percentage(value, percentage)
    }

    pub fn distribute_evenly(&mut self, level: Level) -> Result<(), EditError> {
        self.buffer_mut(level)?.distribute_evenly();
        Ok(())
    }

    /// Discard all local edits. No network call.
    pub fn rollback(&mut self) {
        for set in &mut self.sets {
            set.buffer.rollback();
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.sets.iter().any(|set| set.buffer.is_dirty())
    }

    /// Current total of each managed set, in load order.
    pub fn totals(&self) -> Vec<(Level, u64)> {
        self.sets
            .iter()
            .map(|set| (set.scope.level(), set.buffer.total()))
            .collect()
    }

    /// Check that every non-empty managed set sums to exactly 100.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let imbalances: Vec<Imbalance> = self
            .sets
            .iter()
            .filter(|set| !set.buffer.is_balanced())
            .map(|set| Imbalance {
                level: set.scope.level(),
                scope: set.scope.to_string(),
                total: set.buffer.total(),
            })
            .collect();

        if imbalances.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { imbalances })
        }
    }

    /// Save every item of every dirty set, then reload them from the server.
    ///
    /// Writes go out one at a time, parents first, and stop at the first
    /// failure. The buffers are left dirty on failure so the user can retry.
    pub async fn commit<S>(&mut self, source: &S) -> Result<CommitReport, CommitError>
    where
        S: SiblingSource + ?Sized,
    {
        self.validate()?;

        let dirty: Vec<usize> = (0..self.sets.len())
            .filter(|&i| self.sets[i].buffer.is_dirty())
            .collect();
        if dirty.is_empty() {
            debug!("No local changes to save");
            return Ok(CommitReport::default());
        }

        let mut saved = Vec::new();
        for &i in &dirty {
            let set = &self.sets[i];
            let level = set.scope.level();
            for item in set.buffer.items() {
                if let Err(e) = source
                    .save_percentage(&set.scope, &item.value, item.percentage)
                    .await
                {
                    warn!(scope = %set.scope, value = %item.value, saved = saved.len(), error = %e, "Save stopped partway");
                    return Err(CommitError::PartialWrite {
                        level,
                        value: item.value.clone(),
                        saved,
                        source: e,
                    });
                }
                saved.push(SavedItem {
                    level,
                    value: item.value.clone(),
                    percentage: item.percentage,
                });
            }
        }

        for &i in &dirty {
            let scope = self.sets[i].scope.clone();
            source.invalidate(&scope);
            let fresh = source
                .fetch_siblings(&scope)
                .await
                .map_err(|e| CommitError::Resync {
                    level: scope.level(),
                    source: e,
                })?;
            self.sets[i].buffer.replace(fresh);
        }

        info!(saved = saved.len(), "Saved percentage changes");
        Ok(CommitReport { saved })
    }

    /// Throw away local edits and reload every set from the server, bypassing the cache.
    pub async fn refresh<S>(&mut self, source: &S) -> Result<(), ApiError>
    where
        S: SiblingSource + ?Sized,
    {
        for set in &mut self.sets {
            source.invalidate(&set.scope);
            let fresh = source.fetch_siblings(&set.scope).await?;
            set.buffer.replace(fresh);
        }
        Ok(())
    }
}
