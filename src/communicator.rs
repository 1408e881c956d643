//! Blocking collective reductions across processes.
//!
//! The only cross-process interaction needed by the field operations is an all-reduce of a
//! single scalar. [`SerialCommunicator`] covers the single-process case, while
//! [`LocalCommunicator`] runs several ranks as threads within one process.
use crate::error::{Error, Result};
use crate::Real;
use parking_lot::Mutex;
use std::any::Any;
use std::cmp::Ordering;
use std::sync::{Arc, Barrier};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReduceOp {
    Sum,
    Max,
    Min,
}

impl ReduceOp {
    /// Combines two values. `Max` and `Min` return NaN if either value is NaN.
    pub fn apply<T: Real>(&self, a: T, b: T) -> T {
        match (self, a.partial_cmp(&b)) {
            (ReduceOp::Sum, _) => a + b,
            // Unordered: at least one of the values is NaN
            (_, None) => a + b,
            (ReduceOp::Max, Some(Ordering::Less)) | (ReduceOp::Min, Some(Ordering::Greater)) => b,
            (ReduceOp::Max, _) | (ReduceOp::Min, _) => a,
        }
    }
}

pub trait Communicator {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    /// Combines `value` from all ranks with `op` and returns the result on every rank.
    ///
    /// Blocks until all ranks have contributed.
    fn all_reduce<T: Real>(&self, value: T, op: ReduceOp) -> T;
}

/// Combines the outcome of a local step across all ranks.
///
/// Every rank must call this with its own outcome. A rank that failed keeps its error, while
/// ranks that succeeded return [`Error::FailedOnOtherRank`] if any other rank failed. After the
/// call, either all ranks continue or none do.
pub fn agree_on_outcome<C, R>(comm: &C, local: Result<R>) -> Result<R>
where
    C: Communicator + ?Sized,
{
    let local_failed = if local.is_err() { 1.0 } else { 0.0 };
    let any_failed = comm.all_reduce(local_failed, ReduceOp::Max) > 0.0;
    match local {
        Ok(_) if any_failed => Err(Error::FailedOnOtherRank),
        local => local,
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct SerialCommunicator;

impl Communicator for SerialCommunicator {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn all_reduce<T: Real>(&self, value: T, _op: ReduceOp) -> T {
        value
    }
}

struct Shared {
    barrier: Barrier,
    slots: Mutex<Vec<Option<Box<dyn Any + Send>>>>,
}

/// A communicator for ranks that run as threads of the same process.
///
/// Created as a group with [`LocalCommunicator::create`]. Every rank must take part in every
/// reduction, in the same order and with the same scalar type.
#[derive(Clone)]
pub struct LocalCommunicator {
    rank: usize,
    size: usize,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for LocalCommunicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCommunicator")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .finish()
    }
}

impl LocalCommunicator {
    /// Creates one communicator per rank.
    pub fn create(num_ranks: usize) -> Vec<Self> {
        assert!(num_ranks > 0, "Need at least one rank.");
        let shared = Arc::new(Shared {
            barrier: Barrier::new(num_ranks),
            slots: Mutex::new((0..num_ranks).map(|_| None).collect()),
        });
        (0..num_ranks)
            .map(|rank| Self {
                rank,
                size: num_ranks,
                shared: Arc::clone(&shared),
            })
            .collect()
    }
}

impl Communicator for LocalCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn all_reduce<T: Real>(&self, value: T, op: ReduceOp) -> T {
        self.shared.slots.lock()[self.rank] = Some(Box::new(value));
        self.shared.barrier.wait();

        // Every rank folds the contributions in rank order, so all ranks obtain identical results
        let result = {
            let slots = self.shared.slots.lock();
            slots
                .iter()
                .map(|slot| {
                    *slot
                        .as_ref()
                        .and_then(|boxed| boxed.downcast_ref::<T>())
                        .expect("All ranks must contribute a value of the same type")
                })
                .reduce(|a, b| op.apply(a, b))
                .expect("There is at least one rank")
        };

        // Slots must not be overwritten by the next reduction before everyone has read them
        self.shared.barrier.wait();
        result
    }
}
