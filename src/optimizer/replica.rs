use crate::error::CommunicationError;

use std::fmt::Debug;
use std::sync::{Arc, Condvar, Mutex, PoisonError};

/// Collective reduction between cooperating replicas
///
/// Every participant calls [sum_average](ReplicaCommunicator::sum_average) with a buffer of the
/// same length, the call blocks until all of them arrived and leaves the element-wise mean in
/// every buffer.
pub trait ReplicaCommunicator: Debug + Send {
    /// Number of replicas in the group
    fn participants(&self) -> usize;

    /// Index of this replica inside of the group
    fn rank(&self) -> usize;

    fn sum_average(&self, buffer: &mut [f64]) -> Result<(), CommunicationError>;
}

/// Communicator of a replica which works alone
#[derive(Clone, Copy, Debug, Default)]
pub struct SingleReplica;

impl ReplicaCommunicator for SingleReplica {
    fn participants(&self) -> usize {
        1
    }

    fn rank(&self) -> usize {
        0
    }

    fn sum_average(&self, _buffer: &mut [f64]) -> Result<(), CommunicationError> {
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Reduction {
    arrived: usize,
    generation: u64,
    ready_generation: u64,
    sum: Vec<f64>,
    error: Option<CommunicationError>,
    aborted: Option<usize>,
    outcome: Option<Result<Vec<f64>, CommunicationError>>,
}

#[derive(Debug)]
struct ReplicaGroup {
    participants: usize,
    state: Mutex<Reduction>,
    condvar: Condvar,
}

/// Replicas running as threads of one process
///
/// A length mismatch in one replica fails the reduction for all of them. A replica which
/// stops early must [abort](ThreadReplicas::abort) the group, dropping the communicator does it
/// too, so that the others get [CommunicationError::Aborted] instead of waiting forever.
#[derive(Debug)]
pub struct ThreadReplicas {
    group: Arc<ReplicaGroup>,
    rank: usize,
}

impl ThreadReplicas {
    /// Communicators for a new group, one per rank
    pub fn group(participants: usize) -> Vec<Self> {
        let group = Arc::new(ReplicaGroup {
            participants,
            state: Mutex::new(Reduction::default()),
            condvar: Condvar::new(),
        });
        (0..participants)
            .map(|rank| Self {
                group: group.clone(),
                rank,
            })
            .collect()
    }

    /// Fail pending and future reductions of the whole group
    pub fn abort(&self) {
        let mut state = self
            .group
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if state.aborted.is_none() {
            state.aborted = Some(self.rank);
        }
        self.group.condvar.notify_all();
    }
}

impl Drop for ThreadReplicas {
    fn drop(&mut self) {
        self.abort();
    }
}

impl ReplicaCommunicator for ThreadReplicas {
    fn participants(&self) -> usize {
        self.group.participants
    }

    fn rank(&self) -> usize {
        self.rank
    }

    fn sum_average(&self, buffer: &mut [f64]) -> Result<(), CommunicationError> {
        let group = &self.group;
        let mut state = group
            .state
            .lock()
            .map_err(|_| CommunicationError::Poisoned)?;
        if let Some(rank) = state.aborted {
            return Err(CommunicationError::Aborted { rank });
        }
        if state.arrived == 0 {
            state.generation = state.generation.wrapping_add(1);
            state.sum.clear();
            state.sum.resize(buffer.len(), 0.0);
            state.error = None;
        }
        if state.sum.len() == buffer.len() {
            state
                .sum
                .iter_mut()
                .zip(buffer.iter())
                .for_each(|(s, x)| *s += x);
        } else if state.error.is_none() {
            state.error = Some(CommunicationError::LengthMismatch {
                rank: self.rank,
                expected: state.sum.len(),
                actual: buffer.len(),
            });
        }
        state.arrived += 1;
        let generation = state.generation;
        if state.arrived == group.participants {
            state.arrived = 0;
            let outcome = match state.error.take() {
                Some(error) => Err(error),
                None => {
                    let scale = (group.participants as f64).recip();
                    Ok(state.sum.iter().map(|s| s * scale).collect())
                }
            };
            state.outcome = Some(outcome);
            state.ready_generation = generation;
            group.condvar.notify_all();
        } else {
            while state.ready_generation != generation && state.aborted.is_none() {
                state = group
                    .condvar
                    .wait(state)
                    .map_err(|_| CommunicationError::Poisoned)?;
            }
        }
        if state.ready_generation != generation {
            let rank = state.aborted.unwrap_or(self.rank);
            return Err(CommunicationError::Aborted { rank });
        }
        match &state.outcome {
            Some(Ok(mean)) => {
                buffer.copy_from_slice(mean);
                Ok(())
            }
            Some(Err(error)) => Err(error.clone()),
            None => Err(CommunicationError::Poisoned),
        }
    }
}
