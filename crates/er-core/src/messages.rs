//! Background / content-script message protocol

use serde::{Deserialize, Serialize};

/// Messages exchanged between the background worker and a page's content script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ContentMessage {
    /// Run the removal pass now and on every later DOM mutation, replacing
    /// any selectors applied earlier in this page
    ApplySelectors { selectors: String },
    /// The content script finished loading and is listening
    Ready,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape() {
        let msg = ContentMessage::ApplySelectors { selectors: ".a, .b".to_string() };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "applySelectors", "selectors": ".a, .b"})
        );
        assert_eq!(serde_json::to_value(ContentMessage::Ready).unwrap(), json!({"type": "ready"}));
    }

    #[test]
    fn test_unknown_message_rejected() {
        assert!(serde_json::from_value::<ContentMessage>(json!({"type": "ping"})).is_err());
    }
}
