pub mod openai;
pub mod traits;

pub use openai::OpenAiAgent;
pub use traits::{ChatAgent, Message, MessageRole};
