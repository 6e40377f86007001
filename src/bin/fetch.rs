use anyhow::Result;
use healer_api::fetch::{ModelReference, snapshot_download};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let reference = match ModelReference::from_env() {
        Ok(reference) => reference,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    println!("Starting download of {}...", reference.identifier);
    info!(
        "Downloading {} into {}",
        reference.identifier,
        reference.local_path.display()
    );

    match snapshot_download(&reference).await {
        Ok(transferred) => {
            info!("{} files transferred", transferred);
            println!("Model download complete.");
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: model download failed: {}", e);
            std::process::exit(1);
        }
    }
}
