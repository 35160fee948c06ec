use crate::error::CoreResult;

/// Prompt in, text out. One blocking call, no streaming.
pub trait LlmClient {
    fn name(&self) -> &str;
    fn generate(&self, prompt: &str) -> CoreResult<String>;
}

impl<L: LlmClient + ?Sized> LlmClient for &L {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn generate(&self, prompt: &str) -> CoreResult<String> {
        (**self).generate(prompt)
    }
}

impl<L: LlmClient + ?Sized> LlmClient for Box<L> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn generate(&self, prompt: &str) -> CoreResult<String> {
        (**self).generate(prompt)
    }
}
