use thiserror::Error;

pub type PilotResult<T> = Result<T, PilotError>;

#[derive(Debug, Error)]
pub enum PilotError {
    #[error("browser error: {0}")]
    Browser(String),

    #[error("page script failed: {0}")]
    Script(String),

    #[error("invalid run config: {0}")]
    InvalidRunConfig(String),

    #[error("a run is already in progress")]
    AlreadyRunning,

    #[error("run controller is no longer available")]
    ControllerGone,

    #[error("reply generation setup failed: {0}")]
    Generation(#[from] crate::automation::agents::GenerationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}

impl From<chromiumoxide::error::CdpError> for PilotError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        PilotError::Browser(e.to_string())
    }
}
