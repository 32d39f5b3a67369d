use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An entry in the supplementary phone brand list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct PhoneBrand {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub percentage: f64,
}

/// Request body for creating or updating a phone brand.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhoneBrandDraft {
    pub name: String,
    pub percentage: f64,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DraftError {
    #[error("Phone brand name must not be empty")]
    EmptyName,

    #[error("Percentage must be between 0 and 100, got {0}")]
    PercentageOutOfRange(f64),
}

impl PhoneBrandDraft {
    /// Build a draft, trimming the name and checking the percentage range.
    pub fn new(name: &str, percentage: f64) -> Result<Self, DraftError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DraftError::EmptyName);
        }
        if !(0.0..=100.0).contains(&percentage) {
            return Err(DraftError::PercentageOutOfRange(percentage));
        }
        Ok(Self {
            name: name.to_string(),
            percentage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_trims_name() {
        let draft = PhoneBrandDraft::new("  Apple ", 40.0).expect("valid draft");
        assert_eq!(draft.name, "Apple");
    }

    #[test]
    fn test_draft_rejects_blank_name() {
        assert_eq!(PhoneBrandDraft::new("   ", 10.0), Err(DraftError::EmptyName));
    }

    #[test]
    fn test_draft_rejects_out_of_range() {
        assert_eq!(
            PhoneBrandDraft::new("Samsung", 101.0),
            Err(DraftError::PercentageOutOfRange(101.0))
        );
        assert!(PhoneBrandDraft::new("Samsung", -1.0).is_err());
        assert!(PhoneBrandDraft::new("Samsung", 100.0).is_ok());
        assert!(PhoneBrandDraft::new("Samsung", 0.0).is_ok());
    }

    #[test]
    fn test_parse_phone_brand() {
        let json = r#"{"_id":"65a1","name":"Google","percentage":12}"#;
        let brand: PhoneBrand = serde_json::from_str(json).expect("valid brand json");
        assert_eq!(brand.id.as_deref(), Some("65a1"));
        assert_eq!(brand.percentage, 12.0);
    }
}
