//! Advisory progress reporting
//!
//! Counters are monotonically increasing within a phase but may be updated
//! out of index order by concurrent workers; they inform the caller's UI and
//! are never used to decide correctness.

use tokio::sync::watch;

/// Pipeline phase currently executing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    ResolvingCodes,
    ExactLookup,
    FuzzyMatching,
    WritingPlaylist,
    Done,
}

impl SyncPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPhase::Idle => "idle",
            SyncPhase::ResolvingCodes => "resolving codes",
            SyncPhase::ExactLookup => "exact lookup",
            SyncPhase::FuzzyMatching => "fuzzy matching",
            SyncPhase::WritingPlaylist => "writing playlist",
            SyncPhase::Done => "done",
        }
    }
}

/// Snapshot of reconciliation progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub phase: SyncPhase,
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    fn idle() -> Self {
        Self {
            phase: SyncPhase::Idle,
            completed: 0,
            total: 0,
        }
    }
}

/// Publishes progress snapshots over a watch channel.
///
/// Receivers only ever observe the latest snapshot; intermediate ticks may
/// be coalesced.
#[derive(Debug)]
pub struct ProgressTracker {
    tx: watch::Sender<Progress>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Progress::idle());
        Self { tx }
    }

    /// Subscribe to progress snapshots
    pub fn subscribe(&self) -> watch::Receiver<Progress> {
        self.tx.subscribe()
    }

    pub(crate) fn begin_phase(&self, phase: SyncPhase, total: usize) {
        tracing::debug!(phase = phase.as_str(), total, "Entering phase");
        self.tx.send_replace(Progress {
            phase,
            completed: 0,
            total,
        });
    }

    pub(crate) fn tick(&self) {
        self.tx.send_modify(|p| p.completed += 1);
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}
