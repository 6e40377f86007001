use healer_api::{
    Error,
    fetch::{ModelReference, snapshot_download},
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path, query_param},
};

const TOKEN: &str = "hf_test_token";
const REPO: &str = "google/medgemma-4b-it";

const CONFIG_JSON: &[u8] = br#"{"model_type": "gemma3"}"#;
const PREPROCESSOR_JSON: &[u8] = br#"{"image_processor_type": "Gemma3ImageProcessor"}"#;

fn reference(server: &MockServer, dir: &Path) -> ModelReference {
    ModelReference {
        identifier: REPO.to_string(),
        local_path: dir.to_path_buf(),
        credential: TOKEN.to_string(),
        endpoint: server.uri(),
        revision: "main".to_string(),
    }
}

async fn mount_whoami(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/whoami-v2"))
        .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "healer-bot"})))
        .mount(server)
        .await;
}

async fn mount_listing(server: &MockServer, siblings: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/api/models/{}/revision/main", REPO)))
        .and(query_param("blobs", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "modelId": REPO,
            "siblings": siblings,
        })))
        .mount(server)
        .await;
}

async fn mount_file(server: &MockServer, file: &str, body: &[u8], expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/{}/resolve/main/{}", REPO, file)))
        .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn standard_listing() -> serde_json::Value {
    json!([
        {"rfilename": "config.json", "size": CONFIG_JSON.len()},
        {"rfilename": "processor/preprocessor_config.json", "size": PREPROCESSOR_JSON.len()},
    ])
}

#[test_log::test(tokio::test)]
async fn test_snapshot_downloads_every_file() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_whoami(&server).await;
    mount_listing(&server, standard_listing()).await;
    mount_file(&server, "config.json", CONFIG_JSON, 1).await;
    mount_file(&server, "processor/preprocessor_config.json", PREPROCESSOR_JSON, 1).await;

    let transferred = snapshot_download(&reference(&server, dir.path()))
        .await
        .unwrap();

    assert_eq!(transferred, 2);
    assert_eq!(
        std::fs::read(dir.path().join("config.json")).unwrap(),
        CONFIG_JSON
    );
    assert_eq!(
        std::fs::read(dir.path().join("processor/preprocessor_config.json")).unwrap(),
        PREPROCESSOR_JSON
    );
    assert!(!dir.path().join("config.json.incomplete").exists());
}

#[tokio::test]
async fn test_complete_files_are_kept_and_partial_files_replaced() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("config.json"), CONFIG_JSON).unwrap();
    std::fs::create_dir_all(dir.path().join("processor")).unwrap();
    std::fs::write(
        dir.path().join("processor/preprocessor_config.json"),
        &PREPROCESSOR_JSON[..10],
    )
    .unwrap();

    mount_whoami(&server).await;
    mount_listing(&server, standard_listing()).await;
    mount_file(&server, "config.json", CONFIG_JSON, 0).await;
    mount_file(&server, "processor/preprocessor_config.json", PREPROCESSOR_JSON, 1).await;

    let transferred = snapshot_download(&reference(&server, dir.path()))
        .await
        .unwrap();

    assert_eq!(transferred, 1);
    assert_eq!(
        std::fs::read(dir.path().join("processor/preprocessor_config.json")).unwrap(),
        PREPROCESSOR_JSON
    );
}

#[tokio::test]
async fn test_rejected_token_fails() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path("/api/whoami-v2"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "Invalid credentials"})))
        .mount(&server)
        .await;

    let result = snapshot_download(&reference(&server, dir.path())).await;

    assert!(matches!(result, Err(Error::Unauthorized(_))));
}

#[tokio::test]
async fn test_unknown_repository_fails() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_whoami(&server).await;
    Mock::given(method("GET"))
        .and(path(format!("/api/models/{}/revision/main", REPO)))
        .respond_with(ResponseTemplate::new(404).set_body_string("Repository not found"))
        .mount(&server)
        .await;

    let result = snapshot_download(&reference(&server, dir.path())).await;

    match result {
        Err(Error::Fetch(message)) => assert!(message.contains("404")),
        other => panic!("expected fetch error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_truncated_transfer_leaves_no_file() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_whoami(&server).await;
    mount_listing(
        &server,
        json!([{"rfilename": "model-00001-of-00002.safetensors", "size": 1024}]),
    )
    .await;
    mount_file(&server, "model-00001-of-00002.safetensors", b"short", 1).await;

    let result = snapshot_download(&reference(&server, dir.path())).await;

    assert!(matches!(result, Err(Error::Fetch(_))));
    assert!(!dir.path().join("model-00001-of-00002.safetensors").exists());
    assert!(
        !dir
            .path()
            .join("model-00001-of-00002.safetensors.incomplete")
            .exists()
    );
}

#[tokio::test]
async fn test_listing_escaping_target_dir_is_refused() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_whoami(&server).await;
    mount_listing(&server, json!([{"rfilename": "../outside.json", "size": 2}])).await;

    let result = snapshot_download(&reference(&server, dir.path())).await;

    assert!(matches!(result, Err(Error::Fetch(_))));
    assert!(!dir.path().parent().unwrap().join("outside.json").exists());
}
