//! Hierarchy entries returned by the `/data` endpoints.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One value at a hierarchy level (B2 or B3) within a fixed parent context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct CategoryItem {
    pub value: String,
    pub percentage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(rename = "totalCount", default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
}

impl CategoryItem {
    pub fn new(value: impl Into<String>, percentage: f64) -> Self {
        Self {
            value: value.into(),
            percentage,
            count: None,
            total_count: None,
        }
    }

    /// Occurrence summary, e.g. "12/40 occurrences", when the API reported counts.
    pub fn occurrence_display(&self) -> Option<String> {
        match (self.count, self.total_count) {
            (Some(count), Some(total)) if count > 0 && total > 0 => {
                Some(format!("{}/{} occurrences", count, total))
            }
            _ => None,
        }
    }
}

/// A free-text detail row grouped under one (B1, B2, B3) combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct DetailItem {
    pub detail: String,
    #[serde(default)]
    pub count: u64,
    #[serde(rename = "totalCount", default)]
    pub total_count: u64,
    pub percentage: f64,
    #[serde(
        rename = "configuredPercentage",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub configured_percentage: Option<f64>,
}

impl DetailItem {
    /// The percentage shown to users: an admin override wins over the natural value.
    pub fn effective_percentage(&self) -> f64 {
        self.configured_percentage.unwrap_or(self.percentage)
    }

    pub fn is_configured(&self) -> bool {
        self.configured_percentage.is_some()
    }
}

impl From<DetailItem> for CategoryItem {
    fn from(item: DetailItem) -> Self {
        let percentage = item.effective_percentage();
        Self {
            value: item.detail,
            percentage,
            count: Some(item.count),
            total_count: Some(item.total_count),
        }
    }
}

/// Response body of `POST /data/import`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ImportResponse {
    pub message: String,
    pub count: u64,
}

/// Hierarchy level of an editable sibling set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    B2,
    B3,
    Detail,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Level::B2 => "B2",
            Level::B3 => "B3",
            Level::Detail => "Detail",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_category_item_with_counts() {
        let json = r#"{"value":"5G Plus","percentage":37.5,"count":15,"totalCount":40}"#;
        let item: CategoryItem = serde_json::from_str(json).expect("valid category json");
        assert_eq!(item.value, "5G Plus");
        assert_eq!(item.percentage, 37.5);
        assert_eq!(item.total_count, Some(40));
        assert_eq!(item.occurrence_display().as_deref(), Some("15/40 occurrences"));
    }

    #[test]
    fn test_parse_category_item_without_counts() {
        let item: CategoryItem =
            serde_json::from_str(r#"{"value":"Basic","percentage":20}"#).expect("valid json");
        assert_eq!(item.count, None);
        assert_eq!(item.occurrence_display(), None);
    }

    #[test]
    fn test_detail_configured_percentage_wins() {
        let json = r#"{"detail":"iPhone trade-in","count":3,"totalCount":10,"percentage":30,"configuredPercentage":45}"#;
        let detail: DetailItem = serde_json::from_str(json).expect("valid detail json");
        assert!(detail.is_configured());
        assert_eq!(detail.effective_percentage(), 45.0);

        let item = CategoryItem::from(detail);
        assert_eq!(item.value, "iPhone trade-in");
        assert_eq!(item.percentage, 45.0);
    }

    #[test]
    fn test_detail_without_override_uses_natural() {
        let json = r#"{"detail":"Keep number","count":7,"totalCount":10,"percentage":70}"#;
        let detail: DetailItem = serde_json::from_str(json).expect("valid detail json");
        assert!(!detail.is_configured());
        assert_eq!(detail.effective_percentage(), 70.0);
    }

    #[test]
    fn test_level_display() {
        assert_eq!(Level::B2.to_string(), "B2");
        assert_eq!(Level::Detail.to_string(), "Detail");
    }
}
