/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use cadence::clock::{Clock, ManualClock, MonotonicClock};
use cadence::config::ScenarioConfig;
use cadence::mode::ModeSwitch;
use cadence::scenario::Scenario;
use cadence::scheduler::Scheduler;

// ── CLI argument definition ───────────────────────────────────────────────────

/// Cadence command scheduler driver.
///
/// Example:
///   cadence -c scenario.yaml -n 500 --realtime
#[derive(Debug, Parser)]
#[command(
    name = "cadence",
    about = "Cadence – runs a scenario on the cooperative command scheduler",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML scenario file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Number of cycles to run.
    #[arg(short = 'n', long = "cycles", default_value_t = 250)]
    cycles: u64,

    /// Loop period in milliseconds (overrides the scenario file).
    #[arg(short = 'p', long = "period-ms")]
    period_ms: Option<u64>,

    /// Pace cycles on the wall clock instead of running them back to back on
    /// a simulated clock.
    #[arg(long, default_value_t = false)]
    realtime: bool,

    /// Log level used when RUST_LOG is not set.
    #[arg(long = "log-level", default_value = "info")]
    log_level: String,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    // Level is controlled by the RUST_LOG env-var, falling back to --log-level.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .init();

    info!("Cadence starting up...");
    info!(
        config    = ?cli.config,
        cycles    = cli.cycles,
        period_ms = ?cli.period_ms,
        realtime  = cli.realtime,
        "Configuration"
    );

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // ── Load scenario ─────────────────────────────────────────────────────────
    let mut config = match &cli.config {
        Some(path) => ScenarioConfig::load_from_file(path)?,
        None => {
            warn!("No scenario file provided, running an empty scenario");
            ScenarioConfig::default()
        }
    };
    if let Some(period_ms) = cli.period_ms {
        config.scheduler.period_ms = period_ms;
    }
    config.scheduler.validate().context("Invalid loop period")?;
    let period = config.scheduler.period();

    // ── Build and drive ───────────────────────────────────────────────────────
    let mode = Rc::new(ModeSwitch::enabled());

    let scenario = if cli.realtime {
        let clock: Rc<dyn Clock> = Rc::new(MonotonicClock::new());
        let scheduler = Scheduler::new(mode.clone(), clock);
        let mut scenario = Scenario::build(&config, &scheduler, mode)?;

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        for _ in 0..cli.cycles {
            ticker.tick().await;
            scenario.step();
        }
        scenario
    } else {
        let clock = Rc::new(ManualClock::new());
        let scheduler = Scheduler::new(mode.clone(), clock.clone());
        let mut scenario = Scenario::build(&config, &scheduler, mode)?;

        for _ in 0..cli.cycles {
            scenario.step();
            clock.advance(period);
        }
        scenario
    };

    // ── Report ────────────────────────────────────────────────────────────────
    let summary = scenario.summary();
    info!(
        cycles = summary.cycles,
        overruns = summary.overruns,
        scheduled = ?summary.scheduled,
        "Scenario finished"
    );
    for (name, stats) in &summary.commands {
        info!(
            "  [{name}]  init={init}  exec={exec}  finished={fin}  interrupted={int}",
            init = stats.initialized,
            exec = stats.executed,
            fin = stats.finished,
            int = stats.interrupted,
        );
    }
    if let Some(report) = scenario.scheduler().last_overrun() {
        warn!("Last overrun: {report}");
    }

    if let Some(table) = scenario.telemetry() {
        let yaml = serde_yaml::to_string(&table).context("Failed to render telemetry")?;
        debug!("Telemetry:\n{yaml}");
    }

    Ok(())
}
