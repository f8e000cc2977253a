use std::path::{Path, PathBuf};
use std::sync::Arc;

use photoshoot::{
    config::{AppConfig, BatchConfig},
    models::{image::SourceImage, job::RunSelection},
    services::{
        album::{self, GridAlbumCompositor},
        catalog,
        dispatcher::Dispatcher,
        store::JobStateStore,
        workers_ai::WorkersAiClient,
    },
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let config = AppConfig::from_env().expect("Failed to load configuration");
    let batch = BatchConfig::from_env().expect("Failed to load batch configuration");

    if let Err(e) = run(&config, &batch).await {
        tracing::error!(error = %e, "Batch failed");
        std::process::exit(1);
    }
}

async fn run(config: &AppConfig, batch: &BatchConfig) -> Result<(), Box<dyn std::error::Error>> {
    let source = SourceImage::from_bytes(std::fs::read(&batch.batch_input)?)?;
    tracing::info!(
        input = %batch.batch_input,
        content_type = source.content_type(),
        "Loaded source photo"
    );

    let names = batch.style_names();
    let selection = if names.is_empty() {
        RunSelection::new(catalog::all())
    } else {
        catalog::select(&names)?
    };

    let transform = WorkersAiClient::new(
        &config.cf_account_id,
        &config.cf_api_token,
        &config.transform_model,
        config.transform_timeout(),
    )?;
    let store = Arc::new(JobStateStore::new());
    let dispatcher = Dispatcher::new(Arc::new(transform), store.clone(), config.worker_count);

    let summary = dispatcher.run(&selection, &source).await?;

    let out_dir = PathBuf::from(&batch.batch_output_dir);
    std::fs::create_dir_all(&out_dir)?;
    write_results(&out_dir, &store)?;

    if summary.failed > 0 {
        tracing::warn!(
            failed = summary.failed,
            "Some styles failed; album skipped. Re-run with BATCH_STYLES set to the failed names."
        );
        return Ok(());
    }

    let compositor = GridAlbumCompositor::new(config.album_jpeg_quality);
    let album = album::compose_album(&store, &selection, &compositor)?;
    let album_path = out_dir.join("ai-photoshoot-album.jpg");
    std::fs::write(&album_path, album.bytes())?;
    tracing::info!(path = %album_path.display(), "Album written");

    Ok(())
}

/// Write every finished image and log every failure.
fn write_results(out_dir: &Path, store: &JobStateStore) -> std::io::Result<()> {
    for entry in store.snapshot() {
        let Some(spec) = catalog::find(&entry.name) else {
            continue;
        };
        if let Some(image) = entry.status.image() {
            let path = out_dir.join(format!("ai-photoshoot-{}.{}", spec.slug(), image.extension()));
            std::fs::write(&path, image.bytes())?;
            tracing::info!(job = %entry.name, path = %path.display(), "Image written");
        } else if let Some(error) = entry.status.error() {
            tracing::error!(job = %entry.name, error = %error, "No image produced");
        }
    }
    Ok(())
}
