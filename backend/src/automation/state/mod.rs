pub mod run;
pub mod shared;

pub use run::{RunContext, StatusSink, StopHandle};
pub use shared::{ControlActor, ControlCommand, PilotClient, SessionProvider};
