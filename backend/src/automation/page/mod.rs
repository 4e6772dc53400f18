pub mod cdp;
pub mod classify;
pub mod conversation;
pub mod discovery;
pub mod scripts;

pub use cdp::{CdpChat, CdpPageAdapter};
pub use classify::{SenderPolicy, SenderSignals};
pub use conversation::{extract_conversation, visible_messages, MessageNode};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PilotResult;

/// What the inbox page looked like when navigation was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboxNavigation {
    AlreadyThere,
    Clicked,
    LinkMissing,
}

/// How a reply left the input box. Delivery itself is never confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionOutcome {
    Clicked,
    EnterKey,
    InputMissing,
}

/// Everything the run loop needs from the messaging page.
///
/// Implementations own the selector knowledge for one version of the site;
/// the loop only sees chats, message snapshots and injection outcomes.
#[async_trait]
pub trait PageAdapter: Send + Sync {
    /// Reference to one thread in the inbox list. Only valid while the page lives.
    type Chat: Send + Sync;

    async fn open_inbox(&self) -> PilotResult<InboxNavigation>;

    /// Threads in page order; empty when nothing matched.
    async fn discover_chats(&self) -> Vec<Self::Chat>;

    async fn open_chat(&self, chat: &Self::Chat) -> PilotResult<()>;

    async fn chat_title(&self) -> Option<String>;

    /// Visible messages of the open thread, oldest first.
    async fn messages(&self) -> PilotResult<Vec<MessageNode>>;

    async fn inject_reply(&self, text: &str) -> PilotResult<InjectionOutcome>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteVersion {
    #[default]
    Current,
    Legacy,
}

/// Selector lists for one version of the messaging page, each in priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorProfile {
    pub inbox_links: Vec<String>,
    pub chat_list: Vec<String>,
    /// Keep only chat-list hits whose `href` points at a thread.
    pub require_thread_href: bool,
    pub chat_title: Vec<String>,
    pub message_rows: Vec<String>,
    pub reply_input: Vec<String>,
    pub send_button: Vec<String>,
}

fn list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl SelectorProfile {
    pub fn for_version(version: SiteVersion) -> Self {
        match version {
            SiteVersion::Current => Self::current(),
            SiteVersion::Legacy => Self::legacy(),
        }
    }

    fn current() -> Self {
        Self {
            inbox_links: list(&[r#"a[href="/direct/inbox/"]"#, r#"a[href*="/direct"]"#]),
            chat_list: list(&[
                r#".x1n2onr6 a[href*="/direct/t/"]"#,
                r#"div[role="listitem"] a[href*="/direct/t/"]"#,
                r#"a[role="link"][href*="/direct/t/"]"#,
                r#"a[href*="/direct/t/"]"#,
            ]),
            require_thread_href: false,
            chat_title: list(&["header h2", "header span", r#"[role="heading"]"#, r#"div[role="button"] span"#]),
            message_rows: list(&[
                r#"div[role="row"]"#,
                r#"div[class*="message"]"#,
                r#"div[data-testid*="message"]"#,
            ]),
            reply_input: list(&[
                r#"textarea[placeholder*="Message"]"#,
                r#"div[contenteditable="true"][role="textbox"]"#,
                r#"textarea[aria-label*="Message"]"#,
                r#"div[contenteditable="true"][aria-label*="Message"]"#,
                r#"div[contenteditable="true"]"#,
            ]),
            send_button: list(&[
                r#"button[type="submit"]"#,
                r#"div[role="button"][tabindex="0"]"#,
                r#"button[type="button"]"#,
            ]),
        }
    }

    fn legacy() -> Self {
        Self {
            chat_list: list(&[
                r#"div[role="listitem"]"#,
                r#"div[role="button"]"#,
                r#"a[role="link"][href*="/direct/t/"]"#,
            ]),
            require_thread_href: true,
            reply_input: list(&[
                r#"textarea[placeholder*="Message"]"#,
                r#"div[contenteditable="true"][role="textbox"]"#,
                r#"textarea[aria-label*="Message"]"#,
                r#"div[contenteditable="true"]"#,
            ]),
            send_button: list(&[r#"button[type="button"]"#, r#"div[role="button"]"#]),
            ..Self::current()
        }
    }
}
