//! Upload command: one attempt against the configured storage server.

use anyhow::{Context, Result};
use chunkup_core::api::HttpStorageApi;
use chunkup_core::config::ChunkupConfig;
use chunkup_core::source::SourceFile;
use chunkup_core::uploader::{AttemptResult, Phase, Uploader};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

/// Upload the file, printing progress labels to stderr and the final message.
/// Exit status is failure for a rejected file or a FAIL outcome.
pub async fn run_upload(cfg: &ChunkupConfig, path: &Path) -> Result<ExitCode> {
    let source = SourceFile::open(path).with_context(|| format!("open {}", path.display()))?;
    let api = HttpStorageApi::from_config(cfg).context("storage server")?;
    tracing::debug!(
        upload_url = %api.upload_url(),
        patch_url = %api.patch_url(),
        "storage endpoints"
    );
    let uploader = Arc::new(Uploader::new(api, cfg.upload_settings()));

    let mut status = uploader.subscribe();
    let mut result = uploader.start(Some(source));
    let mut last_phase = Phase::Idle;

    let attempt: AttemptResult = loop {
        tokio::select! {
            res = &mut result => {
                break res.context("upload attempt ended without a result")?;
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break (&mut result).await.context("upload attempt ended without a result")?;
                }
                let phase = status.borrow_and_update().phase;
                if phase != last_phase {
                    last_phase = phase;
                    if let Some(label) = phase.progress_label() {
                        eprintln!("{}", label);
                    }
                }
            }
        }
    };

    match attempt {
        Err(rejected) => {
            eprintln!("{}", rejected);
            Ok(ExitCode::FAILURE)
        }
        Ok(outcome) if outcome.is_success() => {
            println!("{}", outcome.message);
            Ok(ExitCode::SUCCESS)
        }
        Ok(outcome) => {
            eprintln!("{}", outcome.message);
            Ok(ExitCode::FAILURE)
        }
    }
}
