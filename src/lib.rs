pub mod config;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod prompt;
pub mod server;

pub use error::{Error, Result};
