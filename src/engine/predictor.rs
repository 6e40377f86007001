use super::{
    device::Device,
    generator::{GenerationRequest, Generator},
    mistral::MistralRsGenerator,
};
use crate::{
    Error, Result,
    config::ModelConfig,
    prompt::{build_messages, clean_output, decode_image},
};
use std::sync::Arc;
use tracing::{Span, debug, field, info, instrument};
use uuid::Uuid;

/// New-token budget for every generation.
pub const MAX_NEW_TOKENS: usize = 1024;

/// An uploaded image as received, before decoding.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PredictionRequest {
    pub question: String,
    pub image: Option<ImageUpload>,
}

/// Answers questions with the once-loaded model. Shared read-only across requests.
#[derive(Clone)]
pub struct Predictor {
    generator: Arc<dyn Generator>,
}

impl Predictor {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    /// Resolves the device and loads the model. Blocks until the weights are ready.
    pub async fn load(config: &ModelConfig) -> Result<Self> {
        let device = Device::resolve(config.device)?;
        let generator = MistralRsGenerator::load(config, device).await?;
        Ok(Self::new(Arc::new(generator)))
    }

    #[instrument(
        skip_all,
        fields(
            request_id = %Uuid::new_v4(),
            has_image = request.image.is_some(),
            prompt_tokens = field::Empty,
            completion_tokens = field::Empty
        )
    )]
    pub async fn predict(&self, request: PredictionRequest) -> Result<String> {
        if request.question.trim().is_empty() {
            return Err(Error::invalid_request("question must not be empty"));
        }

        let image = match &request.image {
            Some(upload) => {
                debug!(
                    "Decoding {} byte upload ({})",
                    upload.bytes.len(),
                    upload.content_type.as_deref().unwrap_or("unknown type")
                );
                Some(decode_image(&upload.bytes)?)
            }
            None => None,
        };

        let generation_request = GenerationRequest {
            messages: build_messages(&request.question, image),
            max_new_tokens: MAX_NEW_TOKENS,
        };

        let generation = self.generator.generate(&generation_request).await?;

        let span = Span::current();
        span.record("prompt_tokens", generation.prompt_tokens);
        span.record("completion_tokens", generation.completion_tokens);

        let prediction = clean_output(&generation.text);
        info!("Prediction complete ({} chars)", prediction.len());

        Ok(prediction)
    }
}
