use serde::{Deserialize, Serialize};

use super::classify::{SenderPolicy, SenderSignals};
use crate::models::ConversationTurn;

const DATE_DIVIDERS: &[&str] = &["Today", "Yesterday"];

/// Snapshot of one message element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageNode {
    pub text: String,
    #[serde(default)]
    pub signals: SenderSignals,
}

impl MessageNode {
    pub fn new(text: impl Into<String>, signals: SenderSignals) -> Self {
        Self { text: text.into(), signals }
    }
}

/// Drops blank rows and date dividers, keeping page order.
pub fn visible_messages(nodes: Vec<MessageNode>) -> Vec<MessageNode> {
    nodes
        .into_iter()
        .filter_map(|mut node| {
            let text = node.text.trim();
            if text.is_empty() || DATE_DIVIDERS.iter().any(|d| text.contains(d)) {
                return None;
            }
            node.text = text.to_string();
            Some(node)
        })
        .collect()
}

/// The last `window` messages as chat turns, oldest first.
pub fn extract_conversation(
    messages: &[MessageNode],
    window: usize,
    policy: SenderPolicy,
) -> Vec<ConversationTurn> {
    let start = messages.len().saturating_sub(window);
    messages[start..]
        .iter()
        .map(|m| {
            if policy.is_outgoing(&m.signals) {
                ConversationTurn::assistant(m.text.clone())
            } else {
                ConversationTurn::user(m.text.clone())
            }
        })
        .collect()
}
