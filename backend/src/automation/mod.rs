pub mod agents;
pub mod core;
pub mod page;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::automation::agents::ReplyGenerator;
use crate::automation::page::{
    extract_conversation, InboxNavigation, InjectionOutcome, PageAdapter, SenderPolicy,
};
use crate::automation::state::{RunContext, StatusSink};
use crate::config::PacingSection;
use crate::error::PilotResult;
use crate::models::{RunPhase, StatusEvent};

pub const NO_CHATS_ALERT: &str =
    "No conversations found. Make sure you are on Instagram Direct Messages page.";

const STATUS_CHECKING: &str = "Checking last message...";
const STATUS_ANALYZING: &str = "Analyzing conversation...";
const STATUS_SENDING: &str = "Sending response...";

/// Knobs that stay the same across runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub pacing: PacingSection,
    pub sender_policy: SenderPolicy,
}

/// What happened to one chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatOutcome {
    Responded(InjectionOutcome),
    NoMessages,
    LastMessageOutgoing,
    NoReply,
}

impl ChatOutcome {
    pub fn is_responded(self) -> bool {
        matches!(self, ChatOutcome::Responded(_))
    }
}

/// Walks every discovered chat once, strictly one after another.
pub struct Autopilot<A: PageAdapter> {
    page: A,
    generator: Box<dyn ReplyGenerator>,
    sink: Arc<dyn StatusSink>,
    options: RunOptions,
}

impl<A: PageAdapter> Autopilot<A> {
    pub fn new(
        page: A,
        generator: Box<dyn ReplyGenerator>,
        sink: Arc<dyn StatusSink>,
        options: RunOptions,
    ) -> Self {
        Self { page, generator, sink, options }
    }

    pub fn into_page(self) -> A {
        self.page
    }

    /// Runs to completion or until a stop is observed between chats.
    /// `Completed` is always the last event emitted.
    pub async fn run(&self, ctx: &mut RunContext) -> RunPhase {
        ctx.begin();
        info!(
            delay_ms = ctx.config().delay_ms(),
            window = ctx.config().message_window(),
            "starting run"
        );

        let pacing = self.options.pacing;
        match self.page.open_inbox().await {
            Ok(InboxNavigation::Clicked) => sleep(pacing.inbox_navigation()).await,
            Ok(InboxNavigation::LinkMissing) => warn!("inbox link not found, staying on current page"),
            Ok(InboxNavigation::AlreadyThere) => {}
            Err(e) => warn!(error = %e, "could not open inbox"),
        }
        sleep(pacing.after_navigation()).await;

        let chats = self.page.discover_chats().await;
        info!(chats = chats.len(), "chats discovered");
        if chats.is_empty() {
            error!("no chats found");
            self.sink.emit(StatusEvent::Alert { message: NO_CHATS_ALERT.to_string() });
            return self.finish(ctx);
        }

        let total = chats.len();
        let delay = Duration::from_millis(ctx.config().delay_ms());
        for (index, chat) in chats.iter().enumerate() {
            if ctx.stop_requested() {
                info!(remaining = total - index, "stop requested, ending run");
                break;
            }

            info!(chat = index + 1, total, "processing chat");
            match self.process_chat(ctx, chat, index).await {
                Ok(outcome) if outcome.is_responded() => ctx.stats_mut().record_responded(),
                Ok(outcome) => {
                    info!(chat = index + 1, ?outcome, "chat skipped");
                    ctx.stats_mut().record_skipped();
                }
                Err(e) => {
                    warn!(chat = index + 1, error = %e, "chat failed, skipping");
                    ctx.stats_mut().record_skipped();
                }
            }
            self.sink.emit(StatusEvent::Stats { stats: ctx.stats() });

            if index + 1 < total && !ctx.stop_requested() {
                sleep(delay).await;
            }
        }

        self.finish(ctx)
    }

    async fn process_chat(&self, ctx: &RunContext, chat: &A::Chat, index: usize) -> PilotResult<ChatOutcome> {
        self.page.open_chat(chat).await?;
        sleep(self.options.pacing.chat_open()).await;

        let name = self
            .page
            .chat_title()
            .await
            .unwrap_or_else(|| format!("Chat {}", index + 1));
        self.report(&name, STATUS_CHECKING);

        let messages = self.page.messages().await?;
        let Some(last) = messages.last() else {
            return Ok(ChatOutcome::NoMessages);
        };
        if self.options.sender_policy.is_outgoing(&last.signals) {
            return Ok(ChatOutcome::LastMessageOutgoing);
        }

        self.report(&name, STATUS_ANALYZING);
        let conversation = extract_conversation(
            &messages,
            ctx.config().message_window(),
            self.options.sender_policy,
        );

        let reply = match self.generator.generate(&conversation).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(chat = %name, error = %e, "no reply generated");
                return Ok(ChatOutcome::NoReply);
            }
        };

        self.report(&name, STATUS_SENDING);
        let delivery = self.page.inject_reply(&reply).await?;
        info!(chat = %name, ?delivery, "reply sent");
        Ok(ChatOutcome::Responded(delivery))
    }

    fn report(&self, name: &str, status: &str) {
        self.sink.emit(StatusEvent::CurrentChat {
            name: name.to_string(),
            status: status.to_string(),
        });
    }

    fn finish(&self, ctx: &mut RunContext) -> RunPhase {
        let phase = ctx.finish();
        let stats = ctx.stats();
        info!(
            ?phase,
            processed = stats.processed,
            responded = stats.responded,
            skipped = stats.skipped,
            "run finished"
        );
        self.sink.emit(StatusEvent::Completed);
        phase
    }
}
