use super::interface::LlmClient;
use crate::error::{CoreError, CoreResult};
use crate::http::{build_client, check_status, join_url};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

/// Non-streaming `/api/generate` against a local Ollama server.
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: Client,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> CoreResult<Self> {
        Ok(Self {
            base_url: base_url.to_string(),
            model: model.to_string(),
            client: build_client(timeout)?,
        })
    }
}

impl LlmClient for OllamaClient {
    fn name(&self) -> &str {
        &self.model
    }

    fn generate(&self, prompt: &str) -> CoreResult<String> {
        let url = join_url(&self.base_url, "api/generate");
        let resp = self
            .client
            .post(&url)
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
            })
            .send()
            .map_err(|e| CoreError::Llm(format!("ollama unreachable at {}: {}", url, e)))?;
        let body: GenerateResponse = check_status("ollama", resp)?.json()?;
        body.response
            .ok_or_else(|| CoreError::Llm("ollama response has no 'response' field".to_string()))
    }
}
