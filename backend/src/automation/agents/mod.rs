pub mod openai;
pub mod protocol;

pub use openai::OpenAiGenerator;
pub use protocol::{AgentResult, GenerationError, ReplyGenerator, SYSTEM_PROMPT};
