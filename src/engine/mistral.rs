use super::{
    device::{Device, Precision},
    generator::{Generation, GenerationRequest, Generator},
};
use crate::{
    Error, Result,
    config::{ModelConfig, Quantization},
    prompt::Role,
};
use async_trait::async_trait;
use mistralrs::{
    IsqType, Model, ModelDType, RequestBuilder, TextMessageRole, VisionMessages,
    VisionModelBuilder,
};
use std::path::Path;
use tracing::{debug, info};

/// Gemma 3 vision pipeline loaded from a local artifact directory.
pub struct MistralRsGenerator {
    model: Model,
}

impl MistralRsGenerator {
    pub async fn load(config: &ModelConfig, device: Device) -> Result<Self> {
        if !Path::new(&config.path).is_dir() {
            return Err(Error::startup(format!(
                "Model directory '{}' does not exist; run healer-fetch first",
                config.path
            )));
        }

        let precision = device.precision();
        info!(
            "Loading model from {} on {} ({})",
            config.path, device, precision
        );

        let mut builder = VisionModelBuilder::new(&config.path)
            .with_dtype(model_dtype(precision))
            .with_logging();

        if !device.is_accelerator() {
            builder = builder.with_force_cpu();
        }

        if let Some(quantization) = config.quantization {
            debug!("Applying in-situ quantization: {:?}", quantization);
            builder = builder.with_isq(isq_type(quantization));
        }

        let model = builder
            .build()
            .await
            .map_err(|e| Error::startup(format!("Failed to load model from {}: {}", config.path, e)))?;

        info!("Model loaded successfully");

        Ok(Self { model })
    }

    fn build_request(&self, request: &GenerationRequest) -> Result<RequestBuilder> {
        let mut messages = VisionMessages::new();
        for message in &request.messages {
            let role = match message.role {
                Role::System => TextMessageRole::System,
                Role::User => TextMessageRole::User,
            };
            let images = message.images();
            messages = if images.is_empty() {
                messages.add_message(role, message.text())
            } else {
                messages
                    .add_image_message(role, message.text(), images, &self.model)
                    .map_err(|e| Error::generation(format!("Failed to attach image: {}", e)))?
            };
        }

        Ok(RequestBuilder::from(messages)
            .set_deterministic_sampler()
            .set_sampler_max_len(request.max_new_tokens))
    }
}

#[async_trait]
impl Generator for MistralRsGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation> {
        let chat_request = self.build_request(request)?;

        let response = self
            .model
            .send_chat_request(chat_request)
            .await
            .map_err(|e| Error::generation(e.to_string()))?;

        let text = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| Error::generation("Model returned no output"))?;

        Ok(Generation {
            text,
            prompt_tokens: response.usage.prompt_tokens,
            completion_tokens: response.usage.completion_tokens,
        })
    }
}

fn model_dtype(precision: Precision) -> ModelDType {
    match precision {
        Precision::BF16 => ModelDType::BF16,
        Precision::F32 => ModelDType::F32,
    }
}

fn isq_type(quantization: Quantization) -> IsqType {
    match quantization {
        Quantization::Q8_0 => IsqType::Q8_0,
        Quantization::Q4k => IsqType::Q4K,
    }
}
