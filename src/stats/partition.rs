//! Dataset partitioning
//!
//! Splits the coordinator's dataset into `size` contiguous, equal partitions
//! in rank order.

use super::Sample;
use crate::config::RunConfig;
use crate::error::GroupError;
use crate::group::{GroupContext, COORDINATOR};
use tracing::info;

/// Scatter the dataset; every member returns its own partition
///
/// Only the coordinator passes `Some(dataset)`. The configuration must already
/// be agreed and validated, so each partition has
/// `dataset_size / size` elements.
pub fn partition_dataset<T: Sample>(
    ctx: &GroupContext,
    dataset: Option<&[T]>,
    config: &RunConfig,
) -> Result<Vec<T>, GroupError> {
    let chunk_size = config.chunk_size(ctx.size());
    let partition = ctx.scatter_equal_chunks(dataset, chunk_size, COORDINATOR)?;

    if config.verbose {
        info!(
            "Member {}: received partition with {} elements ({})",
            ctx.rank(),
            partition.len(),
            T::ELEMENT_TYPE
        );
    }

    Ok(partition)
}
