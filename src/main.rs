//! groupbench CLI entry point

use anyhow::{Context, Result};
use clap::Parser;
use groupbench::config::cli::{Cli, Command, LatencyArgs, StatsArgs};
use groupbench::config::cli_convert::{
    build_latency_config, build_stats_config, resolve_group, GroupLayout, DEFAULT_LATENCY_MEMBERS,
    DEFAULT_STATS_MEMBERS,
};
use groupbench::config::OutputConfig;
use groupbench::error::{exit_code_for, GroupError};
use groupbench::group::{run_local_group, GroupContext, TcpTransport, COORDINATOR};
use groupbench::latency::{run_latency, LatencyOutcome};
use groupbench::output::csv::write_latency_csv;
use groupbench::output::json::{write_json_report, JsonReport, JsonRunInfo};
use groupbench::output::text;
use groupbench::stats::{run_statistics, StatsOutcome};
use groupbench::util::logging::init_logging;
use tracing::{debug, error, info};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli.log_level) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    let result = match &cli.command {
        Command::Stats(args) => run_stats_command(args),
        Command::Latency(args) => run_latency_command(args),
    };

    if let Err(e) = result {
        let code = exit_code_for(&e);
        match e.downcast_ref::<GroupError>() {
            // Whoever aborted the group has already reported why
            Some(GroupError::Aborted { .. }) => debug!("{:#}", e),
            _ => error!("{:#}", e),
        }
        std::process::exit(code);
    }
}

fn run_stats_command(args: &StatsArgs) -> Result<()> {
    let layout = resolve_group(&args.group, DEFAULT_STATS_MEMBERS)?;
    debug!(?layout, "starting statistics run");

    let finished = run_group(&layout, |ctx| {
        let (config, output) = coordinator_input(ctx, || build_stats_config(args))?;
        Ok(run_statistics(ctx, config)?.map(|outcome| (outcome, output)))
    })?;

    if let Some((outcome, output)) = finished {
        report_stats(&layout, &outcome, &output)?;
    }
    Ok(())
}

fn run_latency_command(args: &LatencyArgs) -> Result<()> {
    let layout = resolve_group(&args.group, DEFAULT_LATENCY_MEMBERS)?;
    debug!(?layout, "starting latency run");

    let finished = run_group(&layout, |ctx| {
        let (config, output) = coordinator_input(ctx, || build_latency_config(args))?;
        Ok(run_latency(ctx, config)?.map(|outcome| (outcome, output)))
    })?;

    if let Some((outcome, output)) = finished {
        report_latency(&layout, &outcome, &output)?;
    }
    Ok(())
}

/// Build the configuration on the coordinator; other members contribute nothing
fn coordinator_input<C, F>(ctx: &GroupContext, build: F) -> Result<(Option<C>, OutputConfig)>
where
    F: FnOnce() -> Result<(C, OutputConfig)>,
{
    if !ctx.is_coordinator() {
        return Ok((None, OutputConfig::default()));
    }
    let (config, output) = build()?;
    Ok((Some(config), output))
}

/// Run `member` as this process's part of the group
///
/// Returns the coordinator's value, if this process hosts the coordinator.
/// A failing member aborts the whole group before its error is returned.
fn run_group<T, F>(layout: &GroupLayout, member: F) -> Result<Option<T>>
where
    T: Send,
    F: Fn(&GroupContext) -> Result<Option<T>> + Sync,
{
    match layout {
        GroupLayout::Local { size } => {
            let mut coordinator = None;
            let mut first_error = None;
            for (rank, result) in run_local_group(*size, &member).into_iter().enumerate() {
                match result {
                    Ok(value) if rank == COORDINATOR => coordinator = value,
                    Ok(_) => {}
                    Err(e) if first_error.is_none() => first_error = Some(e),
                    Err(_) => {}
                }
            }
            match first_error {
                Some(e) => Err(e),
                None => Ok(coordinator),
            }
        }
        GroupLayout::Mesh {
            rank,
            hosts,
            connect_timeout,
        } => {
            let ctx = TcpTransport::join(*rank, hosts, *connect_timeout)
                .with_context(|| format!("Failed to join the group as rank {}", rank))?;
            let _span = tracing::info_span!("member", rank = *rank).entered();

            member(&ctx).map_err(|e| {
                if ctx.aborted().is_none() {
                    ctx.abort(exit_code_for(&e));
                }
                e
            })
        }
    }
}

fn transport_name(layout: &GroupLayout) -> &'static str {
    match layout {
        GroupLayout::Local { .. } => "local",
        GroupLayout::Mesh { .. } => "tcp",
    }
}

fn report_stats(layout: &GroupLayout, outcome: &StatsOutcome, output: &OutputConfig) -> Result<()> {
    text::print_stats_report(outcome)?;

    if let Some(path) = &output.json_output {
        let report = JsonReport::Stats {
            info: JsonRunInfo::capture(transport_name(layout), layout.size()),
            outcome,
        };
        write_json_report(path, &report, true)
            .with_context(|| format!("Failed to write JSON report: {}", path.display()))?;
        info!("JSON report saved to: {}", path.display());
    }
    Ok(())
}

fn report_latency(layout: &GroupLayout, outcome: &LatencyOutcome, output: &OutputConfig) -> Result<()> {
    text::print_latency_report(outcome)?;

    if let Some(path) = &output.csv_output {
        write_latency_csv(path, &outcome.results)
            .with_context(|| format!("Failed to write CSV: {}", path.display()))?;
        println!();
        println!("CSV saved to: {}", path.display());
    }

    if let Some(path) = &output.json_output {
        let report = JsonReport::Latency {
            info: JsonRunInfo::capture(transport_name(layout), layout.size()),
            outcome,
        };
        write_json_report(path, &report, true)
            .with_context(|| format!("Failed to write JSON report: {}", path.display()))?;
        info!("JSON report saved to: {}", path.display());
    }
    Ok(())
}
