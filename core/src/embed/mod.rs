pub mod client;
#[cfg(feature = "local-embeddings")]
pub mod fastembed;
pub mod hashing;
pub mod ollama;

pub use client::{EmbeddingClient, TextEmbedder, DEFAULT_VECTOR_DIM};
pub use hashing::HashingEmbedder;
pub use ollama::OllamaEmbedder;
