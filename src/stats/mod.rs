//! Distributed statistics
//!
//! Computes the global minimum, maximum and average of a dataset that only
//! the coordinator holds:
//!
//! ```text
//! agree on RunConfig -> generate dataset (coordinator) -> scatter equal partitions
//!     -> local min/max/sum on every member -> reduce MIN, MAX, SUM to coordinator
//!     -> average = sum / dataset_size
//! ```
//!
//! Sums are reduced instead of per-member averages, and division happens once
//! on the coordinator.

pub mod aggregator;
pub mod dataset;
pub mod partition;
pub mod pipeline;
pub mod reducer;

use crate::group::{ReduceOp, Reducible};
use dataset::SampleSupplier;
use std::fmt;

pub use aggregator::LocalStats;
pub use pipeline::{run_statistics, StatsOutcome, StatsSummary};
pub use reducer::GlobalStats;

/// Element type of a dataset
///
/// `Accum` is the type sums are accumulated and reduced in. It is wider than
/// the element where needed so `dataset_size * 100` cannot overflow.
pub trait Sample: Reducible + PartialOrd + fmt::Display + Send + Sync + 'static {
    type Accum: Reducible + fmt::Display + Send;

    /// Element type name for diagnostics
    const ELEMENT_TYPE: &'static str;

    /// Draw `count` samples from the supplier
    fn generate(supplier: &mut SampleSupplier, count: usize) -> Vec<Self>;

    fn widen(self) -> Self::Accum;

    fn zero() -> Self::Accum;

    fn accum_to_f64(sum: Self::Accum) -> f64;

    /// Add one element to a running sum
    fn accumulate(sum: Self::Accum, value: Self) -> Self::Accum {
        sum.combine(value.widen(), ReduceOp::Sum)
    }
}

impl Sample for f64 {
    type Accum = f64;
    const ELEMENT_TYPE: &'static str = "float64";

    fn generate(supplier: &mut SampleSupplier, count: usize) -> Vec<Self> {
        supplier.float_samples(count)
    }

    fn widen(self) -> f64 {
        self
    }

    fn zero() -> f64 {
        0.0
    }

    fn accum_to_f64(sum: f64) -> f64 {
        sum
    }
}

impl Sample for i32 {
    type Accum = i64;
    const ELEMENT_TYPE: &'static str = "int32";

    fn generate(supplier: &mut SampleSupplier, count: usize) -> Vec<Self> {
        supplier.int_samples(count)
    }

    fn widen(self) -> i64 {
        self as i64
    }

    fn zero() -> i64 {
        0
    }

    fn accum_to_f64(sum: i64) -> f64 {
        sum as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_sum_is_widened() {
        let sum = [i32::MAX, i32::MAX, 2]
            .iter()
            .fold(i32::zero(), |acc, &v| i32::accumulate(acc, v));
        assert_eq!(sum, 2 * i32::MAX as i64 + 2);
        assert_eq!(i32::accum_to_f64(sum), sum as f64);
    }

    #[test]
    fn test_element_types() {
        assert_eq!(<f64 as Sample>::ELEMENT_TYPE, "float64");
        assert_eq!(<i32 as Sample>::ELEMENT_TYPE, "int32");
    }
}
