//! Two-sample size debounce.
//!
//! # Design
//! - A candidate is ready once a measurement equals the previous one.
//! - A changed size replaces the stored one; the candidate waits another round.
//! - A candidate that cannot be measured leaves the active set without error.

use std::io;
use std::sync::Arc;

use intake_fsops::{Candidate, SizeProbe};

/// Result of one measurement round.
#[derive(Debug, Default)]
pub struct Measurement {
    /// Candidates whose size did not change, in discovery order.
    pub ready: Vec<Candidate>,
    /// Candidates that could not be measured, with the reason.
    pub dropped: Vec<(Candidate, io::Error)>,
    /// Candidates that changed size this round.
    pub changed: usize,
}

/// Owns the active candidate set of one import run.
pub struct StabilityTracker {
    probe: Arc<dyn SizeProbe>,
    active: Vec<Candidate>,
}

impl StabilityTracker {
    /// Track `candidates` using sizes from `probe`.
    #[must_use]
    pub fn new(probe: Arc<dyn SizeProbe>, candidates: Vec<Candidate>) -> Self {
        Self {
            probe,
            active: candidates,
        }
    }

    /// Number of candidates still awaiting a stable size.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.active.len()
    }

    /// Whether no candidates remain.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Re-measure every active candidate, removing ready and unreadable ones.
    pub fn remeasure(&mut self) -> Measurement {
        let mut measurement = Measurement::default();
        let mut still_changing = Vec::with_capacity(self.active.len());

        for mut candidate in self.active.drain(..) {
            match self.probe.size_of(&candidate.source_path) {
                Ok(size) if size == candidate.last_observed_size => {
                    measurement.ready.push(candidate);
                }
                Ok(size) => {
                    candidate.last_observed_size = size;
                    measurement.changed += 1;
                    still_changing.push(candidate);
                }
                Err(err) => measurement.dropped.push((candidate, err)),
            }
        }

        self.active = still_changing;
        measurement
    }

    /// Give up on every remaining candidate.
    pub fn abandon(&mut self) -> Vec<Candidate> {
        std::mem::take(&mut self.active)
    }
}
