//! Text-generation backends for the correlation reporter.

pub mod interface;
pub mod mock;
pub mod ollama;
pub mod openai;

pub use interface::LlmClient;
pub use mock::MockLlm;
pub use ollama::OllamaClient;
pub use openai::OpenAiChatClient;
