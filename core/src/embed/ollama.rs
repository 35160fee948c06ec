use super::client::TextEmbedder;
use crate::error::{CoreError, CoreResult};
use crate::http::{build_client, check_status, join_url};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Embeddings from a local Ollama server (`/api/embeddings`).
pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    client: Client,
}

impl OllamaEmbedder {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> CoreResult<Self> {
        Ok(Self {
            base_url: base_url.to_string(),
            model: model.to_string(),
            client: build_client(timeout)?,
        })
    }
}

impl TextEmbedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn embed_raw(&mut self, text: &str) -> CoreResult<Vec<f32>> {
        let url = join_url(&self.base_url, "api/embeddings");
        let resp = self
            .client
            .post(&url)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()?;
        let body: EmbeddingResponse = check_status("ollama", resp)?.json()?;
        if body.embedding.is_empty() {
            return Err(CoreError::remote(
                "ollama",
                None,
                format!("model {} returned an empty embedding", self.model),
            ));
        }
        Ok(body.embedding)
    }
}
