use crate::{Error, Result};
use futures::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, info};

/// A file in a model repository.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepoFile {
    #[serde(rename = "rfilename")]
    pub path: String,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RepoInfo {
    #[serde(default)]
    siblings: Vec<RepoFile>,
}

#[derive(Debug, Deserialize)]
struct WhoAmI {
    name: String,
}

/// Authenticated client for a Hugging Face compatible model registry.
pub struct HubClient {
    client: Client,
    endpoint: String,
    token: String,
}

impl HubClient {
    pub fn new(endpoint: &str, token: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("healer-api/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Verifies the token and returns the account name it belongs to.
    pub async fn whoami(&self) -> Result<String> {
        let url = format!("{}/api/whoami-v2", self.endpoint);
        let response = self.get(&url).await?;
        let user: WhoAmI = response.json().await?;
        Ok(user.name)
    }

    pub async fn list_files(&self, repo_id: &str, revision: &str) -> Result<Vec<RepoFile>> {
        if !is_valid_repo_id(repo_id) {
            return Err(Error::fetch(format!(
                "Invalid repo id '{}'. Expected 'owner/repo'",
                repo_id
            )));
        }

        let url = format!(
            "{}/api/models/{}/revision/{}?blobs=true",
            self.endpoint, repo_id, revision
        );
        let response = self.get(&url).await?;
        let info: RepoInfo = response.json().await?;

        Ok(info.siblings)
    }

    /// Streams one file to `dir`, replacing any incomplete copy.
    ///
    /// Returns `false` when a complete copy already exists.
    pub async fn download_file(
        &self,
        repo_id: &str,
        revision: &str,
        file: &RepoFile,
        dir: &Path,
    ) -> Result<bool> {
        if !is_safe_file_path(&file.path) {
            return Err(Error::fetch(format!(
                "Unsafe file path in repository listing: '{}'",
                file.path
            )));
        }

        let target = dir.join(&file.path);
        if let (Some(expected), Ok(metadata)) = (file.size, fs::metadata(&target).await) {
            if metadata.is_file() && metadata.len() == expected {
                debug!("Skipping {} (already complete)", file.path);
                return Ok(false);
            }
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        let url = format!(
            "{}/{}/resolve/{}/{}",
            self.endpoint, repo_id, revision, file.path
        );
        info!("Downloading {}", file.path);
        let response = self.get(&url).await?;

        let partial = partial_path(&target);
        let mut out = fs::File::create(&partial).await?;
        let mut written = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            out.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        out.flush().await?;
        drop(out);

        if let Some(expected) = file.size {
            if written != expected {
                fs::remove_file(&partial).await?;
                return Err(Error::fetch(format!(
                    "Size mismatch for {}: expected {} bytes, received {}",
                    file.path, expected, written
                )));
            }
        }

        fs::rename(&partial, &target).await?;
        info!("Downloaded {} ({} bytes)", file.path, written);

        Ok(true)
    }

    async fn get(&self, url: &str) -> Result<Response> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(Error::Unauthorized(format!("{} for {}", response.status(), url)))
            }
            status => Err(Error::fetch(format!(
                "HTTP {} for {}: {}",
                status,
                url,
                response.text().await.unwrap_or_default()
            ))),
        }
    }
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".incomplete");
    PathBuf::from(name)
}

fn is_valid_repo_id(repo_id: &str) -> bool {
    let mut parts = repo_id.split('/');
    matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty()
    )
}

/// Relative, non-empty, and without `..` components.
fn is_safe_file_path(path: &str) -> bool {
    !path.is_empty()
        && Path::new(path)
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("config.json", true)]
    #[case("tokenizer/tokenizer.json", true)]
    #[case("../escape.bin", false)]
    #[case("nested/../../escape.bin", false)]
    #[case("/etc/passwd", false)]
    #[case("", false)]
    fn test_safe_file_paths(#[case] path: &str, #[case] safe: bool) {
        assert_eq!(is_safe_file_path(path), safe);
    }

    #[rstest]
    #[case("google/medgemma-4b-it", true)]
    #[case("medgemma-4b-it", false)]
    #[case("google/", false)]
    #[case("a/b/c", false)]
    fn test_repo_ids(#[case] repo_id: &str, #[case] valid: bool) {
        assert_eq!(is_valid_repo_id(repo_id), valid);
    }

    #[test]
    fn test_partial_path_appends_suffix() {
        let partial = partial_path(Path::new("/models/model-00001.safetensors"));
        assert_eq!(partial, PathBuf::from("/models/model-00001.safetensors.incomplete"));
    }
}
