use async_trait::async_trait;
use healer_api::{
    Error, Result,
    engine::{Generation, GenerationRequest, Generator},
};
use std::sync::{Arc, Mutex};

/// Mock generator for testing
#[derive(Debug)]
pub struct MockGenerator {
    pub requests: Arc<Mutex<Vec<GenerationRequest>>>,
    pub response: String,
    pub error: Option<String>,
    pub echo_prompt: bool,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            response: "Hypertension is persistently elevated blood pressure.".to_string(),
            error: None,
            echo_prompt: false,
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = response.into();
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Prefixes the output with the rendered chat template, like a decoder that
    /// returns the whole sequence instead of only the new tokens.
    pub fn echoing(mut self) -> Self {
        self.echo_prompt = true;
        self
    }

    pub fn get_requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(ref error) = self.error {
            return Err(Error::generation(error.clone()));
        }

        let text = if self.echo_prompt {
            let rendered: String = request
                .messages
                .iter()
                .map(|message| format!("<start_of_turn>user\n{}<end_of_turn>\n", message.text()))
                .collect();
            format!("<bos>{}<start_of_turn>model\n{}<end_of_turn>", rendered, self.response)
        } else {
            self.response.clone()
        };

        Ok(Generation {
            text,
            prompt_tokens: 42,
            completion_tokens: self.response.split_whitespace().count(),
        })
    }
}
