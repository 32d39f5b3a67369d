use std::fmt;

use thiserror::Error;

use crate::api::ApiError;
use crate::models::Level;

use super::editor::SavedItem;
use super::TARGET_TOTAL;

/// A local edit that cannot be applied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("Percentage cannot be negative: {0}")]
    NegativePercentage(i32),

    #[error("No {level} value named '{value}'")]
    UnknownValue { level: Level, value: String },

    #[error("No {0} values are loaded for the current selection")]
    LevelNotLoaded(Level),
}

/// One sibling set whose total is not 100.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Imbalance {
    pub level: Level,
    pub scope: String,
    pub total: u64,
}

impl Imbalance {
    /// Signed distance from the target: negative when short.
    pub fn difference(&self) -> i64 {
        i64::try_from(self.total).unwrap_or(i64::MAX) - i64::from(TARGET_TOTAL)
    }
}

impl fmt::Display for Imbalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let diff = self.difference();
        let direction = if diff < 0 { "short" } else { "over" };
        write!(
            f,
            "{} total is {}%, must equal {}% ({}% {}) for {}",
            self.level,
            self.total,
            TARGET_TOTAL,
            diff.abs(),
            direction,
            self.scope
        )
    }
}

/// Save blocked before any request was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub imbalances: Vec<Imbalance>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.imbalances.iter().map(|i| i.to_string()).collect();
        f.write_str(&messages.join("; "))
    }
}

impl std::error::Error for ValidationError {}

#[derive(Error, Debug)]
pub enum CommitError {
    #[error("Cannot save: {0}")]
    Validation(#[from] ValidationError),

    /// Writes stopped at `value`. Everything in `saved` already reached the
    /// server; nothing after `value` was attempted.
    #[error("Failed to save {level} '{value}' after {} successful updates: {source}", .saved.len())]
    PartialWrite {
        level: Level,
        value: String,
        saved: Vec<SavedItem>,
        #[source]
        source: ApiError,
    },

    /// All writes succeeded but the authoritative copy could not be re-read.
    #[error("Saved, but failed to reload {level} values: {source}")]
    Resync {
        level: Level,
        #[source]
        source: ApiError,
    },
}

impl CommitError {
    pub fn is_auth_failure(&self) -> bool {
        match self {
            CommitError::Validation(_) => false,
            CommitError::PartialWrite { source, .. } | CommitError::Resync { source, .. } => {
                source.is_auth_failure()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_imbalance_message_short() {
        let imbalance = Imbalance {
            level: Level::B2,
            scope: "B1 'Premium'".to_string(),
            total: 92,
        };
        assert_eq!(imbalance.difference(), -8);
        assert_eq!(
            imbalance.to_string(),
            "B2 total is 92%, must equal 100% (8% short) for B1 'Premium'"
        );
    }

    #[test]
    fn test_imbalance_message_over() {
        let imbalance = Imbalance {
            level: Level::B3,
            scope: "x".to_string(),
            total: 105,
        };
        assert!(imbalance.to_string().contains("(5% over)"));
    }

    #[test]
    fn test_validation_error_lists_every_set() {
        let error = ValidationError {
            imbalances: vec![
                Imbalance { level: Level::B2, scope: "a".to_string(), total: 90 },
                Imbalance { level: Level::B3, scope: "b".to_string(), total: 110 },
            ],
        };
        let message = error.to_string();
        assert!(message.contains("B2 total is 90%"));
        assert!(message.contains("B3 total is 110%"));
    }
}
