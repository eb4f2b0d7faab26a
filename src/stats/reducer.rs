//! Global reduction
//!
//! Three independent reductions to the coordinator: MIN of the minima, MAX of
//! the maxima and SUM of the sums. The average is computed from the total sum
//! and the dataset size. MIN and MAX are exact; a floating-point SUM can
//! differ in the last bits from a sequential sum over the whole dataset.

use super::{LocalStats, Sample};
use crate::error::GroupError;
use crate::group::{GroupContext, ReduceOp, COORDINATOR};
use serde::Serialize;

/// Statistics of the whole dataset, available on the coordinator only
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GlobalStats<T> {
    pub min: T,
    pub max: T,
    pub average: f64,
}

/// Reduce every member's local statistics to the coordinator
///
/// Returns `Some` on the coordinator and `None` elsewhere.
pub fn reduce_global<T: Sample>(
    ctx: &GroupContext,
    local: &LocalStats<T>,
    dataset_size: i64,
) -> Result<Option<GlobalStats<T>>, GroupError> {
    let min = ctx.reduce(local.min, ReduceOp::Min, COORDINATOR)?;
    let max = ctx.reduce(local.max, ReduceOp::Max, COORDINATOR)?;
    let sum = ctx.reduce(local.sum, ReduceOp::Sum, COORDINATOR)?;

    Ok(match (min, max, sum) {
        (Some(min), Some(max), Some(sum)) => Some(GlobalStats {
            min,
            max,
            average: T::accum_to_f64(sum) / dataset_size as f64,
        }),
        _ => None,
    })
}
