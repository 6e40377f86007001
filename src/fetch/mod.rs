//! One-shot model snapshot download from the Hugging Face hub.

mod hub;

pub use hub::{HubClient, RepoFile};

use crate::{Error, Result};
use std::{fmt, path::PathBuf};
use tracing::info;

pub const DEFAULT_MODEL_ID: &str = "google/medgemma-4b-it";
pub const DEFAULT_MODEL_DIR: &str = "./medgemma-model";
pub const DEFAULT_ENDPOINT: &str = "https://huggingface.co";
pub const DEFAULT_REVISION: &str = "main";

/// Credential variables, in order of preference.
const TOKEN_VARS: &[&str] = &["MY_HF_TOKEN", "HF_TOKEN"];

/// What to download, from where, and with which credential.
#[derive(Clone)]
pub struct ModelReference {
    pub identifier: String,
    pub local_path: PathBuf,
    pub credential: String,
    pub endpoint: String,
    pub revision: String,
}

impl fmt::Debug for ModelReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelReference")
            .field("identifier", &self.identifier)
            .field("local_path", &self.local_path)
            .field("credential", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("revision", &self.revision)
            .finish()
    }
}

impl ModelReference {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the reference from a variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let credential = TOKEN_VARS
            .iter()
            .find_map(|key| get(*key))
            .ok_or_else(|| {
                Error::config(format!(
                    "{} environment variable not set",
                    TOKEN_VARS.join(" or ")
                ))
            })?;

        Ok(Self {
            identifier: get("MODEL_ID").unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
            local_path: PathBuf::from(
                get("MODEL_DIR").unwrap_or_else(|| DEFAULT_MODEL_DIR.to_string()),
            ),
            credential,
            endpoint: get("HF_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            revision: get("MODEL_REVISION").unwrap_or_else(|| DEFAULT_REVISION.to_string()),
        })
    }
}

/// Authenticates and materialises every file of the artifact under `local_path`.
///
/// Returns the number of files transferred; files already complete on disk are kept.
pub async fn snapshot_download(reference: &ModelReference) -> Result<usize> {
    let client = HubClient::new(&reference.endpoint, &reference.credential)?;

    let user = client.whoami().await?;
    info!("Authenticated with model registry as {}", user);

    let files = client
        .list_files(&reference.identifier, &reference.revision)
        .await?;
    info!(
        "Found {} files in {}@{}",
        files.len(),
        reference.identifier,
        reference.revision
    );

    tokio::fs::create_dir_all(&reference.local_path).await?;

    let mut transferred = 0;
    for file in &files {
        if client
            .download_file(
                &reference.identifier,
                &reference.revision,
                file,
                &reference.local_path,
            )
            .await?
        {
            transferred += 1;
        }
    }

    Ok(transferred)
}
