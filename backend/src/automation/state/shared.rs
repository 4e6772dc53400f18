use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::automation::agents::ReplyGenerator;
use crate::automation::page::PageAdapter;
use crate::automation::state::run::{RunContext, StatusSink, StopHandle};
use crate::automation::{Autopilot, RunOptions};
use crate::error::{PilotError, PilotResult};
use crate::models::{ChatStatus, RunConfig, RunPhase, StatusEvent, StatusSnapshot};

/// Supplies the page and reply generator for each run.
#[async_trait]
pub trait SessionProvider: Send + Sync + 'static {
    type Page: PageAdapter + 'static;

    async fn open_page(&self) -> PilotResult<Self::Page>;

    fn generator(&self, config: &RunConfig) -> PilotResult<Box<dyn ReplyGenerator>>;

    /// Called once the run is over, whatever its outcome.
    async fn release(&self, _page: Self::Page) {}
}

#[derive(Debug)]
pub enum ControlCommand {
    Start { config: RunConfig, reply: oneshot::Sender<PilotResult<()>> },
    Stop { reply: oneshot::Sender<bool> },
    Snapshot { reply: oneshot::Sender<StatusSnapshot> },
}

/// Sent when a run task ends without finishing its event stream.
#[derive(Debug)]
struct RunExit {
    run: u64,
    error: String,
}

/// Sole owner of the active run. Commands and run events are handled one at a
/// time, so "is a run active" never needs a lock.
pub struct ControlActor<P: SessionProvider> {
    provider: Arc<P>,
    options: RunOptions,
    snapshot: StatusSnapshot,
    stop: Option<StopHandle>,
    run_id: u64,
    rx: mpsc::Receiver<ControlCommand>,
    events_tx: mpsc::UnboundedSender<StatusEvent>,
    events_rx: mpsc::UnboundedReceiver<StatusEvent>,
    exits_tx: mpsc::UnboundedSender<RunExit>,
    exits_rx: mpsc::UnboundedReceiver<RunExit>,
}

impl<P: SessionProvider> ControlActor<P> {
    pub fn new(provider: P, options: RunOptions) -> (Self, PilotClient) {
        let (tx, rx) = mpsc::channel(32);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (exits_tx, exits_rx) = mpsc::unbounded_channel();
        let actor = Self {
            provider: Arc::new(provider),
            options,
            snapshot: StatusSnapshot::default(),
            stop: None,
            run_id: 0,
            rx,
            events_tx,
            events_rx,
            exits_tx,
            exits_rx,
        };
        (actor, PilotClient::new(tx))
    }

    pub async fn run(mut self) {
        loop {
            // Events sent before a task died are drained before its exit.
            tokio::select! {
                biased;
                Some(event) = self.events_rx.recv() => self.apply_event(event),
                Some(exit) = self.exits_rx.recv() => self.run_died(exit),
                cmd = self.rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
            }
        }
        if let Some(stop) = self.stop.take() {
            stop.stop();
        }
    }

    fn handle_command(&mut self, cmd: ControlCommand) {
        match cmd {
            ControlCommand::Start { config, reply } => {
                let _ = reply.send(self.start(config));
            }
            ControlCommand::Stop { reply } => {
                let stopping = match &self.stop {
                    Some(stop) if self.snapshot.phase.is_active() => {
                        info!("stop requested");
                        stop.stop();
                        true
                    }
                    _ => false,
                };
                let _ = reply.send(stopping);
            }
            ControlCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot.clone());
            }
        }
    }

    fn start(&mut self, config: RunConfig) -> PilotResult<()> {
        if self.snapshot.phase.is_active() {
            return Err(PilotError::AlreadyRunning);
        }

        let ctx = RunContext::new(config);
        self.stop = Some(ctx.stop_handle());
        self.snapshot = StatusSnapshot {
            phase: RunPhase::Running,
            updated_at: Some(Local::now().to_rfc3339()),
            ..StatusSnapshot::default()
        };

        self.run_id += 1;
        let run = self.run_id;
        let provider = Arc::clone(&self.provider);
        let sink = self.events_tx.clone();
        let handle = tokio::spawn(execute_run(provider, self.options, ctx, sink));

        let exits = self.exits_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = handle.await {
                let _ = exits.send(RunExit { run, error: e.to_string() });
            }
        });
        Ok(())
    }

    fn run_died(&mut self, exit: RunExit) {
        if exit.run != self.run_id || !self.snapshot.phase.is_active() {
            debug!(run = exit.run, error = %exit.error, "earlier run task ended abnormally");
            return;
        }
        error!(run = exit.run, error = %exit.error, "run task died");
        self.apply_event(StatusEvent::Alert {
            message: format!("Run ended unexpectedly: {}", exit.error),
        });
        self.apply_event(StatusEvent::Completed);
    }

    fn apply_event(&mut self, event: StatusEvent) {
        match event {
            StatusEvent::Stats { stats } => self.snapshot.stats = stats,
            StatusEvent::CurrentChat { name, status } => {
                self.snapshot.current_chat = Some(ChatStatus { name, status });
            }
            StatusEvent::Alert { message } => self.snapshot.alert = Some(message),
            StatusEvent::Completed => {
                let stopped = self.stop.take().is_some_and(|s| s.is_stopped());
                self.snapshot.phase = if stopped { RunPhase::Stopped } else { RunPhase::Completed };
                self.snapshot.current_chat = None;
            }
        }
        self.snapshot.updated_at = Some(Local::now().to_rfc3339());
    }
}

async fn execute_run<P: SessionProvider>(
    provider: Arc<P>,
    options: RunOptions,
    mut ctx: RunContext,
    sink: mpsc::UnboundedSender<StatusEvent>,
) {
    let generator = match provider.generator(ctx.config()) {
        Ok(g) => g,
        Err(e) => return abort_run(&sink, "Could not set up reply generation", e),
    };
    let page = match provider.open_page().await {
        Ok(page) => page,
        Err(e) => return abort_run(&sink, "Could not open the messages page", e),
    };

    let pilot = Autopilot::new(page, generator, Arc::new(sink), options);
    pilot.run(&mut ctx).await;
    provider.release(pilot.into_page()).await;
}

fn abort_run(sink: &mpsc::UnboundedSender<StatusEvent>, what: &str, e: PilotError) {
    warn!(error = %e, "{what}");
    sink.emit(StatusEvent::Alert { message: format!("{what}: {e}") });
    sink.emit(StatusEvent::Completed);
}

/// Cheap handle for talking to a [`ControlActor`].
#[derive(Clone)]
pub struct PilotClient {
    tx: mpsc::Sender<ControlCommand>,
}

impl PilotClient {
    pub fn new(tx: mpsc::Sender<ControlCommand>) -> Self {
        Self { tx }
    }

    pub async fn start(&self, config: RunConfig) -> PilotResult<()> {
        let (tx, rx) = oneshot::channel();
        self.send(ControlCommand::Start { config, reply: tx }).await?;
        rx.await.map_err(|_| PilotError::ControllerGone)?
    }

    /// Returns whether a running run was asked to stop.
    pub async fn stop(&self) -> PilotResult<bool> {
        let (tx, rx) = oneshot::channel();
        self.send(ControlCommand::Stop { reply: tx }).await?;
        rx.await.map_err(|_| PilotError::ControllerGone)
    }

    pub async fn snapshot(&self) -> PilotResult<StatusSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(ControlCommand::Snapshot { reply: tx }).await?;
        rx.await.map_err(|_| PilotError::ControllerGone)
    }

    async fn send(&self, cmd: ControlCommand) -> PilotResult<()> {
        self.tx.send(cmd).await.map_err(|_| PilotError::ControllerGone)
    }
}
