use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::{Element, Page};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::discovery::{self, Candidate};
use super::scripts;
use super::{InboxNavigation, InjectionOutcome, MessageNode, PageAdapter, SelectorProfile};
use crate::automation::page::conversation::visible_messages;
use crate::error::{PilotError, PilotResult};

/// A thread entry in the inbox list of a live page.
pub struct CdpChat {
    element: Element,
    href: Option<String>,
}

impl CdpChat {
    pub fn href(&self) -> Option<&str> {
        self.href.as_deref()
    }
}

/// [`PageAdapter`] for a Chromium tab driven over CDP.
pub struct CdpPageAdapter {
    page: Page,
    profile: SelectorProfile,
    input_settle: Duration,
}

impl CdpPageAdapter {
    pub fn new(page: Page, profile: SelectorProfile, input_settle: Duration) -> Self {
        Self { page, profile, input_settle }
    }

    pub fn into_page(self) -> Page {
        self.page
    }

    async fn eval<T: DeserializeOwned>(&self, script: String) -> PilotResult<T> {
        let result = self.page.evaluate(script).await?;
        let value = result.value().cloned().unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(|e| PilotError::Script(e.to_string()))
    }
}

#[async_trait]
impl PageAdapter for CdpPageAdapter {
    type Chat = CdpChat;

    async fn open_inbox(&self) -> PilotResult<InboxNavigation> {
        let state: String = self.eval(scripts::open_inbox(&self.profile.inbox_links)).await?;
        Ok(match state.as_str() {
            "present" => InboxNavigation::AlreadyThere,
            "clicked" => InboxNavigation::Clicked,
            _ => InboxNavigation::LinkMissing,
        })
    }

    async fn discover_chats(&self) -> Vec<CdpChat> {
        let page = &self.page;
        let hits = discovery::discover(&self.profile, |selector| async move {
            let elements = page.find_elements(selector).await?;
            let mut hits = Vec::with_capacity(elements.len());
            for element in elements {
                let href = element.attribute("href").await.ok().flatten();
                hits.push(Candidate::new(element, href));
            }
            Ok::<_, PilotError>(hits)
        })
        .await;

        hits.into_iter()
            .map(|c| CdpChat { element: c.node, href: c.href })
            .collect()
    }

    async fn open_chat(&self, chat: &CdpChat) -> PilotResult<()> {
        match chat.element.click().await {
            Ok(_) => Ok(()),
            Err(e) => {
                // The list may have re-rendered under us; the link still works.
                let Some(href) = chat.href() else {
                    return Err(e.into());
                };
                debug!(href, error = %e, "chat element stale, navigating by href");
                let target = serde_json::to_string(href).map_err(|e| PilotError::Script(e.to_string()))?;
                self.page
                    .evaluate(format!("() => {{ window.location.assign({target}); return true; }}"))
                    .await?;
                self.page.wait_for_navigation().await?;
                Ok(())
            }
        }
    }

    async fn chat_title(&self) -> Option<String> {
        match self.eval::<Option<String>>(scripts::chat_title(&self.profile.chat_title)).await {
            Ok(title) => title,
            Err(e) => {
                debug!(error = %e, "chat title lookup failed");
                None
            }
        }
    }

    async fn messages(&self) -> PilotResult<Vec<MessageNode>> {
        let nodes: Vec<MessageNode> = self.eval(scripts::message_snapshot(&self.profile.message_rows)).await?;
        Ok(visible_messages(nodes))
    }

    async fn inject_reply(&self, text: &str) -> PilotResult<InjectionOutcome> {
        let filled: Option<String> = self.eval(scripts::fill_input(&self.profile.reply_input, text)).await?;
        let Some(tag) = filled else {
            warn!("could not find message input");
            return Ok(InjectionOutcome::InputMissing);
        };
        debug!(tag = %tag, "reply typed");

        sleep(self.input_settle).await;

        let sent: String = self
            .eval(scripts::press_send(&self.profile.reply_input, &self.profile.send_button))
            .await?;
        Ok(match sent.as_str() {
            "clicked" => InjectionOutcome::Clicked,
            "enter" => InjectionOutcome::EnterKey,
            _ => {
                warn!("message input vanished before sending");
                InjectionOutcome::InputMissing
            }
        })
    }
}
