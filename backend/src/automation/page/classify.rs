use serde::{Deserialize, Serialize};

const OUTGOING_CLASS_MARKERS: &[&str] = &["x1iyjqo2", "outgoing"];

/// Raw facts about one message element, captured in the page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SenderSignals {
    pub class_list: Vec<String>,
    /// A descendant matches `[data-testid*="outgoing"]`.
    pub outgoing_test_id: bool,
    /// A descendant matches `[data-testid="outgoing-message"]`.
    pub outgoing_message_test_id: bool,
    /// Computed `justify-content` of the element.
    pub justify_content: String,
    /// Computed `text-align` of the element.
    pub text_align: String,
    /// The element or an ancestor has inline `justify-content: flex-end`.
    pub ancestor_flex_end: bool,
    pub descendant_flex_end: bool,
    /// Like `descendant_flex_end`, restricted to `div` descendants.
    pub descendant_div_flex_end: bool,
    pub descendant_right_align: bool,
    /// Inline `justify-content` of the parent element.
    pub parent_justify_content: String,
    /// Inline `text-align` of the parent element.
    pub parent_text_align: String,
}

/// How to decide whether a message was sent by the operator.
///
/// No signal is authoritative; the site only exposes layout hints. When
/// nothing fires the message counts as incoming.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderPolicy {
    /// Any class, test-id, computed-style or inline-alignment hint.
    #[default]
    Broad,
    /// Exact class tokens, the exact outgoing test id, and inline flex-end only.
    Strict,
}

impl SenderPolicy {
    pub fn is_outgoing(self, signals: &SenderSignals) -> bool {
        match self {
            SenderPolicy::Broad => {
                let classes = signals.class_list.join(" ");
                let class_hit = OUTGOING_CLASS_MARKERS.iter().any(|m| classes.contains(m));
                let flex_end = signals.justify_content == "flex-end"
                    || signals.ancestor_flex_end
                    || signals.descendant_flex_end;
                let right_align = signals.text_align == "right" || signals.descendant_right_align;
                let parent = signals.parent_justify_content == "flex-end"
                    || signals.parent_text_align == "right";
                class_hit || signals.outgoing_test_id || flex_end || right_align || parent
            }
            SenderPolicy::Strict => {
                let class_hit = signals
                    .class_list
                    .iter()
                    .any(|c| OUTGOING_CLASS_MARKERS.contains(&c.as_str()));
                class_hit
                    || signals.outgoing_message_test_id
                    || signals.descendant_div_flex_end
                    || signals.ancestor_flex_end
            }
        }
    }
}
