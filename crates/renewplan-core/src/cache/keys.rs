//! Cache key construction.
//!
//! Keys encode the logical identity of a read so that a write can invalidate
//! everything under its parent scope with a single prefix.

pub const B1_VALUES: &str = "b1Values";
pub const PHONE_BRANDS: &str = "phoneBrands";

pub const B2_DATA_PREFIX: &str = "b2Data";
pub const B3_DATA_PREFIX: &str = "b3Data";
pub const B3_DETAILS_PREFIX: &str = "b3Details";

pub fn b2_data(b1: &str) -> String {
    format!("{}:{}", B2_DATA_PREFIX, b1)
}

pub fn b3_data(b1: &str, b2: &str) -> String {
    format!("{}:{}:{}", B3_DATA_PREFIX, b1, b2)
}

pub fn b3_details(b1: &str, b2: &str, b3: &str) -> String {
    format!("{}:{}:{}:{}", B3_DETAILS_PREFIX, b1, b2, b3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_formats() {
        assert_eq!(b2_data("Premium"), "b2Data:Premium");
        assert_eq!(b3_data("Premium", "Upgrade"), "b3Data:Premium:Upgrade");
        assert_eq!(
            b3_details("Premium", "Upgrade", "Plan 1299"),
            "b3Details:Premium:Upgrade:Plan 1299"
        );
    }

    #[test]
    fn test_child_keys_share_parent_prefix() {
        assert!(b3_details("A", "B", "C").starts_with(B3_DETAILS_PREFIX));
        assert!(b3_data("A", "B").starts_with(&format!("{}:A", B3_DATA_PREFIX)));
    }
}
