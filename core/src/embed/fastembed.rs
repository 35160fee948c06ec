use super::client::TextEmbedder;
use crate::error::{CoreError, CoreResult};
use ::fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

/// Local all-MiniLM-L6-v2 (384 dims) through ONNX runtime.
pub struct FastEmbedder {
    model: TextEmbedding,
}

impl FastEmbedder {
    pub fn new() -> CoreResult<Self> {
        let model = TextEmbedding::try_new(InitOptions::new(EmbeddingModel::AllMiniLML6V2))
            .map_err(|e| CoreError::Config(format!("failed to load embedding model: {}", e)))?;
        Ok(Self { model })
    }
}

impl TextEmbedder for FastEmbedder {
    fn model_name(&self) -> &str {
        "all-MiniLM-L6-v2"
    }

    fn embed_raw(&mut self, text: &str) -> CoreResult<Vec<f32>> {
        let mut out = self
            .model
            .embed(vec![text.to_string()], None)
            .map_err(|e| CoreError::InvalidInput(format!("embedding failed: {}", e)))?;
        out.pop()
            .ok_or_else(|| CoreError::InvalidInput("embedding model returned no vector".to_string()))
    }
}
