//! Upload orchestrator.
//!
//! One attempt: validate the selected file, upload all chunks concurrently,
//! compute the whole-file MD5, ask the server to patch, and report exactly one
//! [`PatchOutcome`]. Progress and the latest result are published on a watch
//! channel that only the orchestrator writes.

mod fanout;
mod outcome;
mod state;
mod validate;

use std::sync::Arc;
use tokio::sync::{oneshot, watch};

use crate::api::{PatchRequest, StorageApi};
use crate::checksum::{self, CHECKSUM_CHUNK_SIZE};
use crate::chunking::{plan_chunks, UPLOAD_CHUNK_SIZE};
use crate::source::SourceFile;

use self::state::InFlightGuard;

pub use outcome::{
    PatchOutcome, UploadError, PATCH_FAIL_MESSAGE, PATCH_SUCCESS_MESSAGE, UPLOAD_FAIL_MESSAGE,
};
pub use state::{PatchResult, Phase, UploadStatus};
pub use validate::{validate, ValidationError};

/// What one attempt yields: an outcome, or a rejection before any request was made.
pub type AttemptResult = Result<PatchOutcome, ValidationError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadSettings {
    pub upload_chunk_size: u64,
    /// Step size for the MD5 reads; does not affect the digest.
    pub checksum_chunk_size: u64,
    /// None = every chunk in flight at once.
    pub max_concurrent_uploads: Option<usize>,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            upload_chunk_size: UPLOAD_CHUNK_SIZE,
            checksum_chunk_size: CHECKSUM_CHUNK_SIZE,
            max_concurrent_uploads: None,
        }
    }
}

pub struct Uploader<A> {
    api: A,
    settings: UploadSettings,
    status: watch::Sender<UploadStatus>,
}

impl<A: StorageApi> Uploader<A> {
    pub fn new(api: A, settings: UploadSettings) -> Self {
        let (status, _) = watch::channel(UploadStatus::default());
        Self {
            api,
            settings,
            status,
        }
    }

    /// Receiver for status updates (phase, latest result, in-flight flag).
    pub fn subscribe(&self) -> watch::Receiver<UploadStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> UploadStatus {
        self.status.borrow().clone()
    }

    /// Runs one attempt to completion in the calling thread.
    ///
    /// Returns `Err` without touching the network or the latest result when no
    /// file is given, the file is not a zip, or another attempt is in flight.
    pub fn run(&self, file: Option<&SourceFile>) -> AttemptResult {
        let guard = InFlightGuard::acquire(&self.status).ok_or(ValidationError::InFlight)?;
        let file = validate(file)?;
        guard.begin();

        tracing::info!(
            file = file.name(),
            bytes = file.len(),
            chunk_size = self.settings.upload_chunk_size,
            "upload attempt started"
        );

        let outcome = match self.attempt(file, &guard) {
            Ok(patched) => PatchOutcome::from_patch_reply(patched),
            Err(e) => {
                tracing::warn!(file = file.name(), error = %e, "upload attempt failed");
                PatchOutcome::from_error(&e)
            }
        };
        guard.finish(outcome.result, &outcome.message);
        tracing::info!(
            file = file.name(),
            result = ?outcome.result,
            message = %outcome.message,
            "upload attempt finished"
        );
        Ok(outcome)
    }

    fn attempt(&self, file: &SourceFile, guard: &InFlightGuard<'_>) -> Result<bool, UploadError> {
        guard.set_phase(Phase::Uploading);
        let chunks = plan_chunks(file.len(), self.settings.upload_chunk_size);
        let handles = fanout::upload_chunks(
            &self.api,
            file,
            &chunks,
            self.settings.max_concurrent_uploads,
        )?;

        guard.set_phase(Phase::Verifying);
        let md5 = checksum::md5_source(file, self.settings.checksum_chunk_size)
            .map_err(UploadError::Checksum)?;
        tracing::debug!(file = file.name(), md5 = %md5, "digest computed");

        guard.set_phase(Phase::Merging);
        let request = PatchRequest::new(file.name(), &handles, md5);
        self.api.patch(&request).map_err(UploadError::Patch)
    }

    /// Leaves a finished attempt: result back to `Default`, phase `Idle`.
    /// Returns false (and changes nothing) while an attempt is in flight.
    pub fn back(&self) -> bool {
        let mut reset = false;
        self.status.send_if_modified(|s| {
            if s.in_flight {
                return false;
            }
            reset = true;
            let changed = *s != UploadStatus::default();
            *s = UploadStatus::default();
            changed
        });
        reset
    }
}

impl<A: StorageApi + 'static> Uploader<A> {
    /// Runs one attempt on its own thread. The receiver gets exactly one value;
    /// it errors only if the attempt thread panicked.
    pub fn start(self: &Arc<Self>, file: Option<SourceFile>) -> oneshot::Receiver<AttemptResult> {
        let (tx, rx) = oneshot::channel();
        let uploader = Arc::clone(self);
        std::thread::spawn(move || {
            let res = uploader.run(file.as_ref());
            let _ = tx.send(res);
        });
        rx
    }
}
