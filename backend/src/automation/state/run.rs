use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::models::{RunConfig, RunPhase, RunStats, StatusEvent};

/// Cooperative cancellation flag shared between a run and whoever may stop it.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// All mutable state of one run, owned by the loop that executes it.
#[derive(Debug)]
pub struct RunContext {
    config: RunConfig,
    stats: RunStats,
    phase: RunPhase,
    stop: StopHandle,
}

impl RunContext {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            stats: RunStats::default(),
            phase: RunPhase::Idle,
            stop: StopHandle::new(),
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    pub fn stats_mut(&mut self) -> &mut RunStats {
        &mut self.stats
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.is_stopped()
    }

    pub(crate) fn begin(&mut self) {
        self.stats = RunStats::default();
        self.phase = RunPhase::Running;
    }

    pub(crate) fn finish(&mut self) -> RunPhase {
        self.phase = if self.stop.is_stopped() {
            RunPhase::Stopped
        } else {
            RunPhase::Completed
        };
        self.phase
    }
}

/// Receiver of run progress.
pub trait StatusSink: Send + Sync {
    fn emit(&self, event: StatusEvent);
}

impl StatusSink for mpsc::UnboundedSender<StatusEvent> {
    fn emit(&self, event: StatusEvent) {
        let _ = self.send(event);
    }
}
