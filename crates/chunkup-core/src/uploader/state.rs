//! Observable attempt state and the in-flight guard.

use std::cell::Cell;
use tokio::sync::watch;

/// Terminal result of the latest attempt, as seen by a presenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatchResult {
    /// No attempt has finished since the last reset.
    #[default]
    Default,
    Success,
    Fail,
}

/// Where the current attempt is. Display-only; never drives control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Validating,
    Uploading,
    Verifying,
    Merging,
    /// Attempt reached SUCCESS or FAIL; stays here until `back()`.
    Finished,
}

impl Phase {
    /// Progress label shown while the attempt runs.
    pub fn progress_label(self) -> Option<&'static str> {
        match self {
            Phase::Uploading => Some("正在上传..."),
            Phase::Verifying => Some("正在校验文件..."),
            Phase::Merging => Some("正在合并依赖..."),
            Phase::Idle | Phase::Validating | Phase::Finished => None,
        }
    }
}

/// Snapshot published on the uploader's watch channel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UploadStatus {
    pub phase: Phase,
    pub result: PatchResult,
    /// Message attached to SUCCESS/FAIL; empty otherwise.
    pub message: String,
    /// True while an attempt holds the in-flight guard.
    pub in_flight: bool,
}

/// Holds the in-flight flag for one attempt and clears it on drop, whichever
/// way the attempt exits (return, early `?`, panic).
///
/// Until `begin()` the previous attempt's result stays visible; an attempt
/// rejected before `begin()` puts the phase back where it was.
pub(super) struct InFlightGuard<'a> {
    status: &'a watch::Sender<UploadStatus>,
    restore: Cell<Phase>,
}

impl<'a> InFlightGuard<'a> {
    /// Marks an attempt in flight. Returns None if one already is.
    pub(super) fn acquire(status: &'a watch::Sender<UploadStatus>) -> Option<Self> {
        let mut previous = Phase::Idle;
        let acquired = status.send_if_modified(|s| {
            if s.in_flight {
                return false;
            }
            previous = s.phase;
            s.in_flight = true;
            s.phase = Phase::Validating;
            true
        });
        acquired.then(|| Self {
            status,
            restore: Cell::new(previous),
        })
    }

    /// Validation passed: drop the previous result so nothing carries over.
    pub(super) fn begin(&self) {
        self.restore.set(Phase::Idle);
        self.status.send_modify(|s| {
            s.result = PatchResult::Default;
            s.message.clear();
        });
    }

    pub(super) fn set_phase(&self, phase: Phase) {
        self.status.send_modify(|s| s.phase = phase);
    }

    /// Records the terminal result; the phase moves to `Finished`.
    pub(super) fn finish(&self, result: PatchResult, message: &str) {
        self.status.send_modify(|s| {
            s.result = result;
            s.message = message.to_string();
            s.phase = Phase::Finished;
        });
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let restore = self.restore.get();
        self.status.send_modify(|s| {
            s.in_flight = false;
            if s.phase != Phase::Finished {
                s.phase = restore;
            }
        });
    }
}
