//! Plain-text rendering of hierarchy data for the terminal.

use renewplan_core::models::{CategoryItem, DetailItem, PhoneBrand};
use renewplan_core::percentage::{EditBuffer, SiblingScope, TARGET_TOTAL};

/// Width of the value column in tables
const VALUE_WIDTH: usize = 40;

/// Truncate a string to a maximum number of characters, adding ellipsis if needed
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a wire percentage without a trailing `.0` for whole numbers
pub fn format_percentage(pct: f64) -> String {
    if pct.fract() == 0.0 {
        format!("{:.0}%", pct)
    } else {
        format!("{:.1}%", pct)
    }
}

pub fn render_items(items: &[CategoryItem]) -> String {
    let mut out = String::new();
    for item in items {
        let occurrences = item.occurrence_display().unwrap_or_default();
        out.push_str(&format!(
            "{:<width$} {:>7}  {}\n",
            truncate(&item.value, VALUE_WIDTH),
            format_percentage(item.percentage),
            occurrences,
            width = VALUE_WIDTH
        ));
    }
    out
}

pub fn render_details(details: &[DetailItem]) -> String {
    let mut out = String::new();
    for detail in details {
        let marker = if detail.is_configured() { " (configured)" } else { "" };
        out.push_str(&format!(
            "{:<width$} {:>7}  {}/{}{}\n",
            truncate(&detail.detail, VALUE_WIDTH),
            format_percentage(detail.effective_percentage()),
            detail.count,
            detail.total_count,
            marker,
            width = VALUE_WIDTH
        ));
    }
    out
}

/// Render one edit buffer; changed rows are marked with `*`.
pub fn render_buffer(scope: &SiblingScope, buffer: &EditBuffer) -> String {
    let mut out = format!("{} values for {}\n", scope.level(), scope);
    for item in buffer.items() {
        let marker = if buffer.is_changed(&item.value) { "*" } else { " " };
        out.push_str(&format!(
            "{} {:<width$} {:>4}%\n",
            marker,
            truncate(&item.value, VALUE_WIDTH),
            item.percentage,
            width = VALUE_WIDTH
        ));
    }
    let status = if buffer.is_balanced() {
        "ok".to_string()
    } else {
        format!("must equal {}%", TARGET_TOTAL)
    };
    out.push_str(&format!(
        "  {:<width$} {:>4}%  {}\n",
        "Total",
        buffer.total(),
        status,
        width = VALUE_WIDTH
    ));
    out
}

pub fn render_brands(brands: &[PhoneBrand]) -> String {
    let mut out = String::new();
    for brand in brands {
        out.push_str(&format!(
            "{:<26} {:<width$} {:>7}\n",
            brand.id.as_deref().unwrap_or("-"),
            truncate(&brand.name, VALUE_WIDTH),
            format_percentage(brand.percentage),
            width = VALUE_WIDTH
        ));
    }
    out
}
