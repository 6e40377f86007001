mod device;
mod generator;
mod mistral;
mod predictor;

pub use device::{Device, Precision};
pub use generator::{Generation, GenerationRequest, Generator};
pub use mistral::MistralRsGenerator;
pub use predictor::{ImageUpload, MAX_NEW_TOKENS, PredictionRequest, Predictor};
