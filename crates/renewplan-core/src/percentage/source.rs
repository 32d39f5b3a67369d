use std::fmt;

use async_trait::async_trait;

use crate::api::{ApiClient, ApiError};
use crate::cache::keys;
use crate::models::{CategoryItem, Level};

/// The parent context that identifies one sibling set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SiblingScope {
    B2 { b1: String },
    B3 { b1: String, b2: String },
    Detail { b1: String, b2: String, b3: String },
}

impl SiblingScope {
    pub fn level(&self) -> Level {
        match self {
            SiblingScope::B2 { .. } => Level::B2,
            SiblingScope::B3 { .. } => Level::B3,
            SiblingScope::Detail { .. } => Level::Detail,
        }
    }

    /// Cache key of the read that loads this set.
    pub fn cache_key(&self) -> String {
        match self {
            SiblingScope::B2 { b1 } => keys::b2_data(b1),
            SiblingScope::B3 { b1, b2 } => keys::b3_data(b1, b2),
            SiblingScope::Detail { b1, b2, b3 } => keys::b3_details(b1, b2, b3),
        }
    }
}

impl fmt::Display for SiblingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiblingScope::B2 { b1 } => write!(f, "B1 '{}'", b1),
            SiblingScope::B3 { b1, b2 } => write!(f, "B1 '{}' / B2 '{}'", b1, b2),
            SiblingScope::Detail { b1, b2, b3 } => {
                write!(f, "B1 '{}' / B2 '{}' / B3 '{}'", b1, b2, b3)
            }
        }
    }
}

/// Where the editor loads sibling sets from and saves percentages to.
#[async_trait]
pub trait SiblingSource: Send + Sync {
    async fn fetch_siblings(&self, scope: &SiblingScope) -> Result<Vec<CategoryItem>, ApiError>;

    async fn save_percentage(
        &self,
        scope: &SiblingScope,
        value: &str,
        percentage: u32,
    ) -> Result<(), ApiError>;

    /// Drop any cached copy of this set so the next fetch goes to the server.
    fn invalidate(&self, scope: &SiblingScope);
}

#[async_trait]
impl SiblingSource for ApiClient {
    async fn fetch_siblings(&self, scope: &SiblingScope) -> Result<Vec<CategoryItem>, ApiError> {
        match scope {
            SiblingScope::B2 { b1 } => self.b2_data(b1).await,
            SiblingScope::B3 { b1, b2 } => self.b3_data(b1, b2).await,
            SiblingScope::Detail { b1, b2, b3 } => {
                let details = self.b3_details(b1, b2, b3).await?;
                Ok(details.into_iter().map(CategoryItem::from).collect())
            }
        }
    }

    async fn save_percentage(
        &self,
        scope: &SiblingScope,
        value: &str,
        percentage: u32,
    ) -> Result<(), ApiError> {
        match scope {
            SiblingScope::B2 { b1 } => self.update_b2_percentage(b1, value, percentage).await,
            SiblingScope::B3 { b1, b2 } => {
                self.update_b3_percentage(b1, b2, value, percentage).await
            }
            SiblingScope::Detail { b1, b2, b3 } => {
                self.update_detail_percentage(b1, b2, b3, value, percentage)
                    .await
            }
        }
    }

    fn invalidate(&self, scope: &SiblingScope) {
        self.cache().clear_by_prefix(&scope.cache_key());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_level_and_key() {
        let scope = SiblingScope::B3 {
            b1: "Premium".to_string(),
            b2: "Upgrade".to_string(),
        };
        assert_eq!(scope.level(), Level::B3);
        assert_eq!(scope.cache_key(), "b3Data:Premium:Upgrade");
        assert_eq!(scope.to_string(), "B1 'Premium' / B2 'Upgrade'");
    }
}
