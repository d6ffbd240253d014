//! Removal pass
//!
//! One execution of "find and remove every element matching the rule's
//! selectors" inside a page. The host binding runs it once on delivery and
//! again on every DOM mutation.

use crate::selector::split_selectors;

/// The page operations a removal pass needs.
pub trait PageDocument {
    type Node;

    /// All elements matching one selector, or the engine's error message.
    fn query_all(&self, selector: &str) -> Result<Vec<Self::Node>, String>;

    fn remove(&self, node: &Self::Node);
}

/// Outcome of one removal pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovalReport {
    pub removed: usize,
    pub failed_selectors: usize,
}

/// Remove every element matching any of the comma-separated selectors.
///
/// Selectors are queried independently; one that fails to parse is logged and
/// skipped.
pub fn run_removal_pass<D: PageDocument>(doc: &D, selectors: &str) -> RemovalReport {
    let mut report = RemovalReport::default();
    for selector in split_selectors(selectors) {
        match doc.query_all(selector) {
            Ok(nodes) => {
                for node in &nodes {
                    doc.remove(node);
                }
                report.removed += nodes.len();
            }
            Err(e) => {
                log::warn!("Selector '{}' failed: {}", selector, e);
                report.failed_selectors += 1;
            }
        }
    }
    report
}
