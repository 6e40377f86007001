use crate::{Result, prompt::PromptMessage};
use async_trait::async_trait;

/// Inputs for one generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub messages: Vec<PromptMessage>,
    pub max_new_tokens: usize,
}

/// Raw model output plus token accounting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

/// Text/image-to-text generation over a chat-formatted prompt.
///
/// Implementations apply the model's chat template, decode greedily and return
/// only the newly generated tokens as text.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation>;
}
