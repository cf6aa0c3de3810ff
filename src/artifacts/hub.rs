//! Remote artifact fetching via the HuggingFace Hub
//!
//! Downloads go through hf-hub's standard persistent cache, so a second load
//! of the same artifact resolves offline. Progress is reported per file:
//! the plain fetch API does not expose byte counts, so percent reflects
//! completed files within the artifact set.

use crate::device::Precision;
use crate::progress::{ArtifactKind, ProgressEvent, ProgressPhase, ProgressSink};
use crate::provider::ModelArtifacts;
use anyhow::{Context, Result};
use hf_hub::api::tokio::{Api, ApiBuilder, ApiRepo};
use std::path::PathBuf;

fn build_api(cache_dir: Option<PathBuf>) -> Result<Api> {
    match cache_dir {
        Some(dir) => ApiBuilder::new()
            .with_cache_dir(dir)
            .build()
            .context("Failed to create HF API client"),
        None => Api::new().context("Failed to create HF API client"),
    }
}

fn emit(progress: &Option<ProgressSink>, event: ProgressEvent) {
    if let Some(sink) = progress {
        sink(event);
    }
}

/// Fetch one file of an artifact set, bracketed with progress events.
async fn fetch_file(
    repo: &ApiRepo,
    kind: ArtifactKind,
    file: &str,
    done: usize,
    total: usize,
    progress: &Option<ProgressSink>,
) -> Result<PathBuf> {
    let before = (done * 100 / total) as u8;
    let after = ((done + 1) * 100 / total) as u8;

    emit(progress, ProgressEvent::new(ProgressPhase::Initiate, kind, file, before));
    tracing::debug!(kind = %kind, file = %file, "Fetching artifact file");

    let path = repo
        .get(file)
        .await
        .with_context(|| format!("Failed to download {file}"))?;

    emit(progress, ProgressEvent::new(ProgressPhase::Cached, kind, file, after));
    Ok(path)
}

/// Fetch optional companion files; absence is not an error.
async fn fetch_optional(repo: &ApiRepo, files: &[&str]) {
    for file in files {
        if repo.get(file).await.is_ok() {
            tracing::debug!(file = %file, "Downloaded optional file");
        }
    }
}

/// Fetch the tokenizer artifact set for a model.
///
/// Returns the path to `tokenizer.json`.
pub async fn fetch_tokenizer(
    model_id: &str,
    cache_dir: Option<PathBuf>,
    progress: Option<ProgressSink>,
) -> Result<PathBuf> {
    tracing::info!(model_id = %model_id, "Fetching tokenizer from hub");

    let api = build_api(cache_dir)?;
    let repo = api.model(model_id.to_string());

    let path = fetch_file(
        &repo,
        ArtifactKind::Tokenizer,
        "tokenizer.json",
        0,
        1,
        &progress,
    )
    .await?;

    fetch_optional(&repo, &["tokenizer_config.json", "special_tokens_map.json"]).await;

    Ok(path)
}

/// Fetch the model artifact set for a model at the given precision.
pub async fn fetch_model(
    model_id: &str,
    cache_dir: Option<PathBuf>,
    precision: Precision,
    progress: Option<ProgressSink>,
) -> Result<ModelArtifacts> {
    let weight_file = precision.weight_file();
    tracing::info!(
        model_id = %model_id,
        weights = %weight_file,
        "Fetching model from hub"
    );

    let api = build_api(cache_dir)?;
    let repo = api.model(model_id.to_string());

    let config = fetch_file(&repo, ArtifactKind::Model, "config.json", 0, 2, &progress).await?;
    let weights = fetch_file(&repo, ArtifactKind::Model, weight_file, 1, 2, &progress).await?;

    let generation_config = repo.get("generation_config.json").await.ok();

    Ok(ModelArtifacts {
        config,
        weights,
        generation_config,
    })
}
