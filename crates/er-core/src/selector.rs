//! Selector list splitting
//!
//! A rule's selector field may hold several selectors separated by commas.
//! Each one is queried on its own so a single bad selector cannot hide the rest.

/// Split a selector field on commas, trimming whitespace and dropping empty parts.
pub fn split_selectors(selectors: &str) -> Vec<&str> {
    selectors
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}
