//! Percentage reconciliation for sibling sets.
//!
//! Admins override the frequency-derived percentages of B2 values (under a
//! B1), B3 values (under a B1/B2 pair) and details (under a full path). Each
//! sibling set must sum to exactly 100 before it can be saved.
//!
//! - `EditBuffer`: local editable copy of one sibling set plus the last
//!   server-synced copy and a dirty flag
//! - `balance`: the redistribution arithmetic used by the buffer
//! - `PercentageEditor`: owns one buffer per managed set for a selection and
//!   commits, rolls back or refreshes them together
//! - `SiblingSource`: the seam the editor reads and writes through,
//!   implemented by `ApiClient`

pub mod balance;
pub mod buffer;
pub mod editor;
pub mod error;
pub mod source;

pub use buffer::{BalancingMode, EditBuffer, EditItem};
pub use editor::{CommitReport, PercentageEditor, SavedItem, Selection};
pub use error::{CommitError, EditError, Imbalance, ValidationError};
pub use source::{SiblingScope, SiblingSource};

/// Every sibling set must sum to this before it can be saved.
pub const TARGET_TOTAL: u32 = 100;
