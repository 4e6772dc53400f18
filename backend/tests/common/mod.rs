#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use inbox_pilot::automation::agents::{AgentResult, GenerationError, ReplyGenerator};
use inbox_pilot::automation::page::{
    InboxNavigation, InjectionOutcome, MessageNode, PageAdapter, SenderSignals,
};
use inbox_pilot::automation::state::{SessionProvider, StatusSink, StopHandle};
use inbox_pilot::config::PacingSection;
use inbox_pilot::automation::RunOptions;
use inbox_pilot::models::{ConversationTurn, RunConfig, StatusEvent};
use inbox_pilot::{PilotError, PilotResult};

pub fn incoming(text: &str) -> MessageNode {
    MessageNode::new(text, SenderSignals::default())
}

pub fn outgoing(text: &str) -> MessageNode {
    MessageNode::new(
        text,
        SenderSignals {
            justify_content: "flex-end".into(),
            ..SenderSignals::default()
        },
    )
}

pub fn options() -> RunOptions {
    RunOptions {
        pacing: PacingSection::immediate(),
        ..RunOptions::default()
    }
}

pub fn run_config(window: usize) -> RunConfig {
    RunConfig::new("sk-test", 0, window).unwrap()
}

#[derive(Clone)]
pub struct FakeChat {
    pub name: Option<String>,
    pub messages: Vec<MessageNode>,
}

impl FakeChat {
    pub fn named(name: &str, messages: Vec<MessageNode>) -> Self {
        Self { name: Some(name.to_string()), messages }
    }
}

/// In-memory inbox. Chats are addressed by index.
#[derive(Clone, Default)]
pub struct FakePage {
    pub chats: Vec<FakeChat>,
    pub current: Arc<Mutex<Option<usize>>>,
    pub opened: Arc<Mutex<Vec<usize>>>,
    pub sent: Arc<Mutex<Vec<(usize, String)>>>,
    unclickable: Vec<usize>,
    unreadable: Vec<usize>,
    injection: Option<InjectionOutcome>,
}

impl FakePage {
    pub fn new(chats: Vec<FakeChat>) -> Self {
        Self { chats, ..Self::default() }
    }

    /// Opening this chat fails like a detached element would.
    pub fn unclickable(mut self, chat: usize) -> Self {
        self.unclickable.push(chat);
        self
    }

    /// Reading messages of this chat fails like a broken page script would.
    pub fn unreadable(mut self, chat: usize) -> Self {
        self.unreadable.push(chat);
        self
    }

    pub fn injecting(mut self, outcome: InjectionOutcome) -> Self {
        self.injection = Some(outcome);
        self
    }

    pub fn sent(&self) -> Vec<(usize, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn opened(&self) -> Vec<usize> {
        self.opened.lock().unwrap().clone()
    }

    fn current(&self) -> Option<usize> {
        *self.current.lock().unwrap()
    }
}

#[async_trait]
impl PageAdapter for FakePage {
    type Chat = usize;

    async fn open_inbox(&self) -> PilotResult<InboxNavigation> {
        Ok(InboxNavigation::AlreadyThere)
    }

    async fn discover_chats(&self) -> Vec<usize> {
        (0..self.chats.len()).collect()
    }

    async fn open_chat(&self, chat: &usize) -> PilotResult<()> {
        if self.unclickable.contains(chat) {
            return Err(PilotError::Browser(format!("chat {chat} is not clickable")));
        }
        *self.current.lock().unwrap() = Some(*chat);
        self.opened.lock().unwrap().push(*chat);
        Ok(())
    }

    async fn chat_title(&self) -> Option<String> {
        self.current().and_then(|i| self.chats[i].name.clone())
    }

    async fn messages(&self) -> PilotResult<Vec<MessageNode>> {
        if self.current().is_some_and(|i| self.unreadable.contains(&i)) {
            return Err(PilotError::Script("message snapshot failed".into()));
        }
        Ok(self.current().map(|i| self.chats[i].messages.clone()).unwrap_or_default())
    }

    async fn inject_reply(&self, text: &str) -> PilotResult<InjectionOutcome> {
        let chat = self.current().unwrap_or(usize::MAX);
        self.sent.lock().unwrap().push((chat, text.to_string()));
        Ok(self.injection.unwrap_or(InjectionOutcome::Clicked))
    }
}

/// Returns queued results in order, recording every conversation it sees.
#[derive(Clone, Default)]
pub struct ScriptedGenerator {
    replies: Arc<Mutex<VecDeque<AgentResult<String>>>>,
    pub calls: Arc<Mutex<Vec<Vec<ConversationTurn>>>>,
    stop_on_call: Option<StopHandle>,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<AgentResult<String>>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            ..Self::default()
        }
    }

    /// Requests a stop from inside the first generation call.
    pub fn stopping(mut self, stop: StopHandle) -> Self {
        self.stop_on_call = Some(stop);
        self
    }

    pub fn calls(&self) -> Vec<Vec<ConversationTurn>> {
        self.calls.lock().unwrap().clone()
    }
}

pub fn api_error() -> AgentResult<String> {
    Err(GenerationError::Status { status: 500, body: "upstream failure".into() })
}

#[async_trait]
impl ReplyGenerator for ScriptedGenerator {
    async fn generate(&self, conversation: &[ConversationTurn]) -> AgentResult<String> {
        self.calls.lock().unwrap().push(conversation.to_vec());
        if let Some(stop) = &self.stop_on_call {
            stop.stop();
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(GenerationError::Empty))
    }
}

#[derive(Clone, Default)]
pub struct RecordingSink {
    pub events: Arc<Mutex<Vec<StatusEvent>>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<StatusEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl StatusSink for RecordingSink {
    fn emit(&self, event: StatusEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Hands out a fresh clone of the same fake page for every run.
pub struct FakeSession {
    pub page: FakePage,
    pub generator: ScriptedGenerator,
}

#[async_trait]
impl SessionProvider for FakeSession {
    type Page = FakePage;

    async fn open_page(&self) -> PilotResult<FakePage> {
        Ok(self.page.clone())
    }

    fn generator(&self, _config: &RunConfig) -> PilotResult<Box<dyn ReplyGenerator>> {
        Ok(Box::new(self.generator.clone()))
    }
}
