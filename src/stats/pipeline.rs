//! Statistics pipeline
//!
//! Runs the whole statistics protocol on one member. Every member of the group
//! must call [`run_statistics`]; only the coordinator supplies a configuration
//! and only the coordinator gets a result.

use super::aggregator::LocalStats;
use super::dataset::SampleSupplier;
use super::partition::partition_dataset;
use super::reducer::{reduce_global, GlobalStats};
use super::Sample;
use crate::config::validator::validate_run_config;
use crate::config::{RunConfig, ValueMode};
use crate::coordinator::agree_on_config;
use crate::error::RunError;
use crate::group::GroupContext;
use anyhow::Result;
use serde::Serialize;
use tracing::info;

/// Global statistics in the element type of the run
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "value_mode", rename_all = "lowercase")]
pub enum StatsSummary {
    Float(GlobalStats<f64>),
    Int(GlobalStats<i32>),
}

impl StatsSummary {
    pub fn average(&self) -> f64 {
        match self {
            StatsSummary::Float(stats) => stats.average,
            StatsSummary::Int(stats) => stats.average,
        }
    }
}

/// Coordinator's view of a finished run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsOutcome {
    pub config: RunConfig,
    pub group_size: usize,
    pub summary: StatsSummary,
}

/// Run the statistics protocol as this member
///
/// Returns `Some` on the coordinator and `None` on every other member. An
/// invalid configuration aborts the whole group and returns
/// [`RunError::Configuration`] everywhere.
pub fn run_statistics(ctx: &GroupContext, local: Option<RunConfig>) -> Result<Option<StatsOutcome>> {
    let config = agree_on_config(ctx, local, validate_run_config)?;

    let summary = match &config.value_mode {
        ValueMode::Float => run_typed::<f64>(ctx, &config)?.map(StatsSummary::Float),
        ValueMode::Int => run_typed::<i32>(ctx, &config)?.map(StatsSummary::Int),
        ValueMode::Unrecognized(name) => {
            return Err(RunError::Configuration {
                violations: vec![format!("unrecognized value mode '{}'", name)],
            }
            .into())
        }
    };

    Ok(summary.map(|summary| StatsOutcome {
        group_size: ctx.size(),
        config,
        summary,
    }))
}

fn run_typed<T: Sample>(ctx: &GroupContext, config: &RunConfig) -> Result<Option<GlobalStats<T>>> {
    let dataset = if ctx.is_coordinator() {
        let n = usize::try_from(config.dataset_size)?;
        let data = T::generate(&mut SampleSupplier::new(config.seed), n);
        info!("Coordinator: dataset initialized with {} elements ({})", n, T::ELEMENT_TYPE);
        Some(data)
    } else {
        None
    };

    let partition = partition_dataset(ctx, dataset.as_deref(), config)?;
    drop(dataset);

    let local = LocalStats::from_partition(ctx.rank(), &partition)?;
    if config.verbose {
        info!(
            "Member {}: min={}, max={}, local average={:.6}",
            ctx.rank(),
            local.min,
            local.max,
            local.local_average()
        );
    }

    Ok(reduce_global(ctx, &local, config.dataset_size)?)
}
