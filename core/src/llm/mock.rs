use super::interface::LlmClient;
use crate::classify::extract::truncate_chars;
use crate::error::CoreResult;

const ECHO_PREFIX_CHARS: usize = 1000;

/// Offline stand-in that echoes the head of the prompt.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockLlm;

impl LlmClient for MockLlm {
    fn name(&self) -> &str {
        "mock"
    }

    fn generate(&self, prompt: &str) -> CoreResult<String> {
        Ok(format!(
            "[MockLLM] Correlation summary for prompt:\n{}",
            truncate_chars(prompt, ECHO_PREFIX_CHARS)
        ))
    }
}
