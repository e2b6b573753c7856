//! Concurrent chunk upload with index-ordered fan-in.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Mutex, PoisonError};
use std::thread;

use super::outcome::UploadError;
use crate::api::{ChunkHandle, StorageApi};
use crate::chunking::ChunkSpec;
use crate::source::SourceFile;

type ChunkResult = Result<ChunkHandle, UploadError>;

/// Uploads every chunk concurrently and returns the handles in the order of
/// `chunks` (ascending index), whatever order the uploads finish in.
///
/// One worker per chunk unless `max_concurrent` bounds it. Chunk bytes are
/// streamed by the api from `file`, never buffered whole. If the OS refuses
/// some worker threads the ones that started share the queue; if it refuses
/// all of them the fan-out fails. The first failure stops workers from taking
/// new chunks; uploads already running are left to settle before this returns.
pub(super) fn upload_chunks<A: StorageApi>(
    api: &A,
    file: &SourceFile,
    chunks: &[ChunkSpec],
    max_concurrent: Option<usize>,
) -> Result<Vec<ChunkHandle>, UploadError> {
    let count = chunks.len();
    if count == 0 {
        return Ok(Vec::new());
    }

    let work: Mutex<VecDeque<(usize, ChunkSpec)>> =
        Mutex::new(chunks.iter().copied().enumerate().collect());
    let abort = AtomicBool::new(false);
    let num_workers = max_concurrent.unwrap_or(count).clamp(1, count);
    let (tx, rx) = mpsc::channel::<(usize, ChunkResult)>();

    tracing::debug!(chunks = count, workers = num_workers, "starting chunk upload fan-out");

    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(num_workers);
        let mut spawn_error = None;
        for n in 0..num_workers {
            let tx = tx.clone();
            let work = &work;
            let abort = &abort;
            let spawned = thread::Builder::new()
                .name(format!("chunk-upload-{}", n))
                .spawn_scoped(scope, move || loop {
                    if abort.load(Ordering::Relaxed) {
                        break;
                    }
                    let (pos, chunk) = match next_chunk(work) {
                        Some(p) => p,
                        None => break,
                    };
                    let res = upload_one(api, file, &chunk);
                    if tx.send((pos, res)).is_err() {
                        break;
                    }
                });
            match spawned {
                Ok(h) => handles.push(h),
                Err(e) => {
                    tracing::warn!(error = %e, started = handles.len(), "could not start chunk upload worker");
                    spawn_error = Some(e);
                    break;
                }
            }
        }
        drop(tx);

        if handles.is_empty() {
            if let Some(e) = spawn_error {
                return Err(UploadError::Spawn(e));
            }
        }

        let result = collect_in_order(&rx, count, &work, &abort);

        for h in handles {
            if h.join().is_err() {
                tracing::warn!("chunk upload worker panicked");
            }
        }
        result
    })
}

fn next_chunk(work: &Mutex<VecDeque<(usize, ChunkSpec)>>) -> Option<(usize, ChunkSpec)> {
    work.lock().unwrap_or_else(PoisonError::into_inner).pop_front()
}

fn upload_one<A: StorageApi>(api: &A, file: &SourceFile, chunk: &ChunkSpec) -> ChunkResult {
    api.upload_chunk(file, chunk)
        .map_err(|source| UploadError::Chunk {
            index: chunk.index,
            source,
        })
}

/// Receives results as they arrive and slots them by position. Returns on the
/// first failure after draining chunks no worker has picked up yet.
fn collect_in_order(
    rx: &mpsc::Receiver<(usize, ChunkResult)>,
    count: usize,
    work: &Mutex<VecDeque<(usize, ChunkSpec)>>,
    abort: &AtomicBool,
) -> Result<Vec<ChunkHandle>, UploadError> {
    let mut slots: Vec<Option<ChunkHandle>> = vec![None; count];
    for _ in 0..count {
        let (pos, res) = rx.recv().map_err(|_| UploadError::WorkerLost)?;
        match res {
            Ok(handle) => slots[pos] = Some(handle),
            Err(e) => {
                abort.store(true, Ordering::Relaxed);
                let drained = {
                    let mut q = work.lock().unwrap_or_else(PoisonError::into_inner);
                    let n = q.len();
                    q.clear();
                    n
                };
                tracing::warn!(error = %e, skipped = drained, "chunk upload failed; abandoning fan-out");
                return Err(e);
            }
        }
    }
    slots
        .into_iter()
        .map(|s| s.ok_or(UploadError::WorkerLost))
        .collect()
}
