use std::collections::VecDeque;

use tracing::debug;

use super::system::NetworkSnapshot;
use crate::error::{ReductionError, Result};

/// A circuit-simulation engine seen through a single "solve and extract" call.
///
/// Each call compiles `description`, solves it and returns a fresh owned snapshot, so
/// nothing read from one solution can observe a later one. `&mut self` keeps use
/// exclusive: only one network is active at a time.
pub trait SimulationEngine {
    fn solve(&mut self, description: &str) -> Result<NetworkSnapshot>;
}

/// Engine that hands out snapshots solved elsewhere, in order.
///
/// Used when the circuit solver runs out of process and its results are exchanged as
/// snapshot files.
#[derive(Debug, Default)]
pub struct ReplayEngine {
    queue: VecDeque<NetworkSnapshot>,
}

impl ReplayEngine {
    pub fn new(snapshots: impl IntoIterator<Item = NetworkSnapshot>) -> Self {
        Self {
            queue: snapshots.into_iter().collect(),
        }
    }

    pub fn push(&mut self, snapshot: NetworkSnapshot) {
        self.queue.push_back(snapshot);
    }

    /// Number of solutions left to replay.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl SimulationEngine for ReplayEngine {
    fn solve(&mut self, description: &str) -> Result<NetworkSnapshot> {
        debug!(bytes = description.len(), "replaying solution");
        self.queue.pop_front().ok_or_else(|| {
            ReductionError::Engine("no solved snapshot left to replay".to_owned())
        })
    }
}
