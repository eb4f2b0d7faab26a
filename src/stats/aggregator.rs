//! Per-member aggregation
//!
//! One scan over a partition produces its minimum, maximum, widened sum and
//! element count.

use super::Sample;
use crate::error::RunError;
use crate::group::ReduceOp;

/// Sufficient statistics of one partition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalStats<T: Sample> {
    pub min: T,
    pub max: T,
    pub sum: T::Accum,
    pub count: usize,
}

impl<T: Sample> LocalStats<T> {
    /// Scan `partition`; `rank` is only used in the error
    pub fn from_partition(rank: usize, partition: &[T]) -> Result<Self, RunError> {
        let (&first, rest) = partition.split_first().ok_or(RunError::EmptyPartition { rank })?;

        let mut stats = Self {
            min: first,
            max: first,
            sum: T::accumulate(T::zero(), first),
            count: partition.len(),
        };
        for &value in rest {
            stats.min = stats.min.combine(value, ReduceOp::Min);
            stats.max = stats.max.combine(value, ReduceOp::Max);
            stats.sum = T::accumulate(stats.sum, value);
        }
        Ok(stats)
    }

    /// Average of this partition alone (diagnostics only)
    pub fn local_average(&self) -> f64 {
        T::accum_to_f64(self.sum) / self.count as f64
    }
}
