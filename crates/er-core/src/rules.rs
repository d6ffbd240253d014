//! Rule list editing
//!
//! Every popup action is a pure transform on the ordered rule list. Callers
//! read the list, apply one of these, and write the result back.

use crate::types::Rule;

/// Error type for rule list edits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("URL fragment must not be empty")]
    EmptyUrl,
    #[error("Selector must not be empty")]
    EmptySelector,
    #[error("Rule index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

fn validate<'a>(url: &'a str, selector: &'a str) -> Result<(&'a str, &'a str), RuleError> {
    let url = url.trim();
    let selector = selector.trim();
    if url.is_empty() {
        return Err(RuleError::EmptyUrl);
    }
    if selector.is_empty() {
        return Err(RuleError::EmptySelector);
    }
    Ok((url, selector))
}

fn check_index(rules: &[Rule], index: usize) -> Result<(), RuleError> {
    if index < rules.len() {
        Ok(())
    } else {
        Err(RuleError::IndexOutOfRange { index, len: rules.len() })
    }
}

/// Append a new enabled rule.
pub fn add_rule(rules: &mut Vec<Rule>, url: &str, selector: &str) -> Result<usize, RuleError> {
    let (url, selector) = validate(url, selector)?;
    rules.push(Rule::new(url, selector));
    Ok(rules.len() - 1)
}

/// Overwrite the url and selector of an existing rule, keeping its position
/// and enabled flag.
pub fn edit_rule(rules: &mut [Rule], index: usize, url: &str, selector: &str) -> Result<(), RuleError> {
    check_index(rules, index)?;
    let (url, selector) = validate(url, selector)?;
    let rule = &mut rules[index];
    rule.url = url.to_string();
    rule.selector = selector.to_string();
    Ok(())
}

/// Remove a rule; later rules shift down by one.
pub fn remove_rule(rules: &mut Vec<Rule>, index: usize) -> Result<Rule, RuleError> {
    check_index(rules, index)?;
    Ok(rules.remove(index))
}

pub fn set_enabled(rules: &mut [Rule], index: usize, enabled: bool) -> Result<(), RuleError> {
    check_index(rules, index)?;
    rules[index].enabled = enabled;
    Ok(())
}

// =============================================================================
// Edit Session
// =============================================================================

/// What a form submission did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submitted {
    Added(usize),
    Edited(usize),
}

/// The popup's "currently editing" state. Lives as long as one popup session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditSession {
    editing: Option<usize>,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the rule loaded into the form, if any.
    pub fn editing(&self) -> Option<usize> {
        self.editing
    }

    pub fn begin(&mut self, index: usize) {
        self.editing = Some(index);
    }

    pub fn cancel(&mut self) {
        self.editing = None;
    }

    /// Apply the form to `rules`: add when idle, edit when editing. The
    /// session itself is untouched; call [`committed`](Self::committed) once
    /// the list has been saved.
    pub fn apply(&self, rules: &mut Vec<Rule>, url: &str, selector: &str) -> Result<Submitted, RuleError> {
        match self.editing {
            Some(index) => edit_rule(rules, index, url, selector).map(|_| Submitted::Edited(index)),
            None => add_rule(rules, url, selector).map(Submitted::Added),
        }
    }

    /// The submitted form was saved; back to adding.
    pub fn committed(&mut self) {
        self.editing = None;
    }

    /// Keep the editing index pointing at the same rule after a removal.
    pub fn on_removed(&mut self, removed: usize) {
        self.editing = match self.editing {
            Some(index) if index == removed => None,
            Some(index) if index > removed => Some(index - 1),
            other => other,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Rule> {
        vec![
            Rule::new("a.com", ".a"),
            Rule::new("b.com", ".b"),
            Rule::new("c.com", ".c"),
        ]
    }

    #[test]
    fn test_add_rule_trims_and_enables() {
        let mut rules = Vec::new();
        assert_eq!(add_rule(&mut rules, "  example.com ", " .ad ").unwrap(), 0);
        assert_eq!(rules, vec![Rule::new("example.com", ".ad")]);
    }

    #[test]
    fn test_add_rule_rejects_empty() {
        let mut rules = sample();
        assert_eq!(add_rule(&mut rules, "   ", ".ad"), Err(RuleError::EmptyUrl));
        assert_eq!(add_rule(&mut rules, "x.com", ""), Err(RuleError::EmptySelector));
        assert_eq!(rules, sample());
    }

    #[test]
    fn test_edit_rule_preserves_position_and_enabled() {
        let mut rules = sample();
        rules[1].enabled = false;
        edit_rule(&mut rules, 1, "bb.com", ".bb, .cc").unwrap();
        assert_eq!(rules[1].url, "bb.com");
        assert_eq!(rules[1].selector, ".bb, .cc");
        assert!(!rules[1].enabled);
        assert_eq!(rules[0], sample()[0]);
        assert_eq!(rules[2], sample()[2]);
    }

    #[test]
    fn test_edit_rule_out_of_range() {
        let mut rules = sample();
        assert_eq!(
            edit_rule(&mut rules, 3, "x", "y"),
            Err(RuleError::IndexOutOfRange { index: 3, len: 3 })
        );
    }

    #[test]
    fn test_remove_rule_shifts() {
        let mut rules = sample();
        let removed = remove_rule(&mut rules, 1).unwrap();
        assert_eq!(removed.url, "b.com");
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[1].url, "c.com");
        assert!(remove_rule(&mut rules, 2).is_err());
    }

    #[test]
    fn test_set_enabled() {
        let mut rules = sample();
        set_enabled(&mut rules, 2, false).unwrap();
        assert!(!rules[2].enabled);
        set_enabled(&mut rules, 2, true).unwrap();
        assert!(rules[2].enabled);
    }

    #[test]
    fn test_session_apply_adds_when_idle() {
        let session = EditSession::new();
        let mut rules = sample();
        assert_eq!(session.apply(&mut rules, "d.com", ".d").unwrap(), Submitted::Added(3));
        assert_eq!(rules.len(), 4);
        assert_eq!(session.editing(), None);
    }

    #[test]
    fn test_session_edits_then_idles_on_commit() {
        let mut session = EditSession::new();
        let mut rules = sample();
        session.begin(0);
        assert_eq!(session.apply(&mut rules, "z.com", ".z").unwrap(), Submitted::Edited(0));
        session.committed();
        assert_eq!(rules[0].url, "z.com");
        assert_eq!(rules.len(), 3);
        assert_eq!(session.editing(), None);
    }

    #[test]
    fn test_session_stays_editing_on_error() {
        let mut session = EditSession::new();
        let mut rules = sample();
        session.begin(2);
        assert_eq!(session.apply(&mut rules, "", ".z"), Err(RuleError::EmptyUrl));
        assert_eq!(session.editing(), Some(2));
        assert_eq!(rules, sample());
    }

    #[test]
    fn test_session_apply_keeps_editing() {
        let mut session = EditSession::new();
        let mut rules = sample();
        session.begin(1);
        assert_eq!(session.apply(&mut rules, "y.com", ".y").unwrap(), Submitted::Edited(1));
        assert_eq!(session.editing(), Some(1));
        // Applying again over a fresh read still edits the same slot
        let mut reread = sample();
        assert_eq!(session.apply(&mut reread, "y.com", ".y").unwrap(), Submitted::Edited(1));
        assert_eq!(reread.len(), 3);
        session.committed();
        assert_eq!(session.editing(), None);
    }

    #[test]
    fn test_session_on_removed() {
        let mut session = EditSession::new();
        session.begin(2);
        session.on_removed(0);
        assert_eq!(session.editing(), Some(1));
        session.on_removed(1);
        assert_eq!(session.editing(), None);

        session.begin(0);
        session.on_removed(1);
        assert_eq!(session.editing(), Some(0));
    }
}
