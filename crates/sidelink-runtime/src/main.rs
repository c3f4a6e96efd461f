// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::{Context, Result};
use clap::Parser;
use sidelink_runtime::{ReplayReport, Scenario};
use std::path::PathBuf;

/// Replays a sidelink scenario against a simulated node.
#[derive(Parser, Debug)]
#[command(name = "sidelink-sim", version, about)]
struct Cli {
    /// Scenario file (RON).
    #[arg(short, long)]
    scenario: PathBuf,

    /// Print the summary as JSON instead of text.
    #[arg(long)]
    summary_json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    sidelink_telemetry::init_logging();

    let scenario = Scenario::load(&cli.scenario)?;
    let report = scenario
        .replay()
        .with_context(|| format!("Replay of '{}' failed", cli.scenario.display()))?;

    if cli.summary_json {
        let json =
            serde_json::to_string_pretty(&report).context("Failed to serialize summary")?;
        println!("{json}");
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &ReplayReport) {
    let summary = &report.summary;
    println!("Run finished at {}", summary.at);
    println!("  mode                 {}", summary.mode);
    println!("  utilization          {:.3}", summary.utilization);
    println!("  active allocations   {}", summary.active_allocations);
    println!(
        "  allocations          {} ok, {} failed, {} released, {} expired",
        summary.pool.total_allocations,
        summary.pool.failed_allocations,
        summary.pool.released,
        summary.pool.expired
    );
    println!(
        "  mode switches        {} ok, {} failed",
        summary.total_switches, summary.failed_switches
    );
    println!("  link quality         {:.3}", summary.link.quality_score);
    println!(
        "  actions              {} applied, {} rejected, {} skipped",
        report.applied, report.rejected, report.skipped
    );
    for transition in &report.switches {
        println!(
            "  switch at {}  {} -> {}",
            transition.at, transition.from, transition.to
        );
    }
}
