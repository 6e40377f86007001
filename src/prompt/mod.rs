mod persona;
mod types;

pub use persona::system_prompt;
pub use types::{ContentPart, PromptMessage, Role};

use crate::{Error, Result};
use image::DynamicImage;

/// Gemma control tokens that must never reach a caller.
const CONTROL_TOKENS: &[&str] = &[
    "<bos>",
    "<eos>",
    "<pad>",
    "<start_of_turn>",
    "<end_of_turn>",
    "<start_of_image>",
    "<end_of_image>",
    "<image_soft_token>",
];

/// Opening of the model's turn in a rendered chat template.
const MODEL_TURN: &str = "<start_of_turn>model";

/// The same boundary once a decoder has already dropped the control tokens.
const BARE_USER_TURN: &str = "user\n";
const BARE_MODEL_TURN: &str = "\nmodel\n";

/// Builds the system + user message pair for one request.
///
/// The persona depends only on whether an image is present; the image, if any,
/// follows the question inside the user message.
pub fn build_messages(question: &str, image: Option<DynamicImage>) -> Vec<PromptMessage> {
    vec![
        PromptMessage::system(system_prompt(image.is_some())),
        PromptMessage::user(question, image),
    ]
}

/// Decodes an upload into a three-channel image.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    let image = image::load_from_memory(bytes).map_err(|e| Error::invalid_image(e.to_string()))?;
    Ok(DynamicImage::ImageRgb8(image.to_rgb8()))
}

/// Strips control tokens and, when the output still carries the rendered
/// chat template, everything up to the model's turn.
///
/// Output without a turn marker is only trimmed; the answer text is never
/// matched against the question or persona.
pub fn clean_output(raw: &str) -> String {
    let reply = match raw.rfind(MODEL_TURN) {
        Some(index) => &raw[index + MODEL_TURN.len()..],
        None => raw,
    };

    let mut text = reply.to_string();
    for token in CONTROL_TOKENS {
        text = text.replace(token, "");
    }

    let trimmed = text.trim_start();
    let reply = if trimmed.starts_with(BARE_USER_TURN) {
        match trimmed.rfind(BARE_MODEL_TURN) {
            Some(index) => &trimmed[index + BARE_MODEL_TURN.len()..],
            None => trimmed,
        }
    } else {
        trimmed
    };

    reply.trim().to_string()
}
