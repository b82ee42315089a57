use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;
use log::{info, warn, error, debug, trace};

// Define modules used by main
mod geometry;
mod metrics;
mod remodeling;
mod simulation;
mod state;

use metrics::MetricsAggregator;
use osseo_common::{RunRecord, SimulationConfig};
use remodeling::RemodelingModel;
use simulation::{MigrationSimulation, TickOutcome};

/// Command-line arguments for the engine
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the config.toml file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the osteoblast step size per tick
    #[arg(long)]
    growth_rate: Option<f64>,

    /// Override the bone density (pores per ring = density / 3)
    #[arg(long)]
    density: Option<u32>,
}

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();
    let args = Args::parse();

    info!("Starting Osseointegration Engine...");

    // --- Load Configuration ---
    let mut config = SimulationConfig::load(&args.config)?;
    if let Some(growth_rate) = args.growth_rate {
        config.migration.growth_rate = growth_rate;
    }
    if let Some(density) = args.density {
        config.migration.density = density;
    }
    config.validate().context("Invalid command-line override")?;

    // --- Bone Remodeling ---
    let remodeling_params = config.get_remodeling_params();
    info!(
        "Running remodeling model: {} steps, {:.2} -> {:.2} GPa, rate {:.4}",
        remodeling_params.step_count,
        remodeling_params.initial_modulus,
        remodeling_params.max_modulus,
        remodeling_params.remodeling_rate
    );
    let mut remodeling = RemodelingModel::new(remodeling_params)?;
    let final_modulus = remodeling.run().last().copied().unwrap_or_default();
    info!("Final bone modulus: {:.3} GPa", final_modulus);

    // --- Osteoblast Migration ---
    let migration_params = config.get_migration_params();
    debug!("Migration Parameters: {:#?}", migration_params);
    let mut sim = MigrationSimulation::new(migration_params)?;
    sim.start()?;

    let mut metrics = MetricsAggregator::new(sim.total_cells(), config.metrics.sample_interval);
    let start_time = Instant::now();
    run_migration(&mut sim, &mut metrics, config.migration.max_ticks);

    let summary = metrics.summary();
    info!(
        "Analysis | Cells: {} | Success: {:.1}% | Bone: {:.1}u | Time: {:.1}s | Wall clock: {:.3}s",
        summary.total_cells,
        summary.percent_reached,
        summary.bone_volume,
        summary.elapsed_time,
        start_time.elapsed().as_secs_f64()
    );

    // --- Save Recorded Data ---
    let record = build_record(&remodeling, &metrics, &sim);

    if config.output.save_stats {
        let output_format = config.output.format.as_deref().unwrap_or("json");
        if let Err(e) = save_record(&record, &config.output.base_filename, output_format) {
            error!("Error saving run record: {:#}", e);
        }
    } else {
        info!("Skipping saving run record as per config (save_stats is false).");
    }

    if config.output.save_series_csv {
        if let Err(e) = save_series_csv(&record, &config.output.base_filename) {
            error!("Error saving CSV series: {:#}", e);
        }
    }

    info!("Simulation Complete.");
    Ok(())
}

/// Ticks `sim` until it completes or `max_ticks` have run, feeding `metrics`
/// at its cadence. Always ends with a forced sample of the last state; a run
/// still going after `max_ticks` is halted. Returns whether the run completed.
fn run_migration(sim: &mut MigrationSimulation, metrics: &mut MetricsAggregator, max_ticks: u64) -> bool {
    for _ in 0..max_ticks {
        match sim.tick() {
            TickOutcome::Inactive => break,
            TickOutcome::Advanced { docked } => {
                trace!("Tick {}: {} docked", sim.state().ticks, docked);
                if metrics.observe(sim.sample(), false) {
                    let sample = sim.sample();
                    info!(
                        "t={:.1} s | Cells reached: {}/{} | Bone volume: {:.1} units",
                        sample.time,
                        sample.cells_reached,
                        sim.total_cells(),
                        sample.bone_formation
                    );
                }
            }
            TickOutcome::Completed(_) => break,
        }
    }

    // Final sample so the series end on the last state.
    metrics.observe(sim.sample(), true);
    if sim.summary().is_none() {
        warn!(
            "Migration did not complete within {} ticks; halting with {}/{} cells reached.",
            max_ticks,
            sim.state().cells_reached,
            sim.total_cells()
        );
        sim.halt();
        return false;
    }
    true
}

/// Collects everything worth saving from a finished (or halted) run.
fn build_record(remodeling: &RemodelingModel, metrics: &MetricsAggregator, sim: &MigrationSimulation) -> RunRecord {
    RunRecord {
        remodeling_rate: remodeling.params().remodeling_rate,
        remodeling: remodeling.samples(),
        cells_series: metrics.cells_series().to_vec(),
        bone_series: metrics.bone_series().to_vec(),
        summary: sim.summary(),
    }
}

/// Writes the run record in the requested format, returning the file name.
fn save_record(record: &RunRecord, base_filename: &str, output_format: &str) -> Result<String> {
    let output_format = match output_format {
        "json" | "bincode" | "messagepack" => output_format,
        other => {
            error!("Unknown output format: {}. Using JSON instead.", other);
            "json"
        }
    };

    match output_format {
        "bincode" => {
            // Binary format (much more compact)
            let filename = format!("{}_record.bin", base_filename);
            let file = File::create(&filename)
                .with_context(|| format!("Error creating record file '{}'", filename))?;
            bincode::serialize_into(file, record).context("Error serializing record to bincode")?;
            info!("Run record saved to {} (binary format)", filename);
            Ok(filename)
        }
        "messagepack" => {
            // MessagePack format (compact and cross-platform)
            let filename = format!("{}_record.msgpack", base_filename);
            let mut file = File::create(&filename)
                .with_context(|| format!("Error creating record file '{}'", filename))?;
            rmp_serde::encode::write(&mut file, record).context("Error serializing record to MessagePack")?;
            info!("Run record saved to {} (MessagePack format)", filename);
            Ok(filename)
        }
        _ => {
            let filename = format!("{}_record.json", base_filename);
            let json_string = serde_json::to_string_pretty(record).context("Error serializing record to JSON")?;
            let mut file = File::create(&filename)
                .with_context(|| format!("Error creating record file '{}'", filename))?;
            file.write_all(json_string.as_bytes())
                .with_context(|| format!("Error writing record JSON to '{}'", filename))?;
            info!("Run record saved to {}", filename);
            Ok(filename)
        }
    }
}

/// Writes `<base>_remodeling.csv` and `<base>_metrics.csv`.
fn save_series_csv(record: &RunRecord, base_filename: &str) -> Result<()> {
    let filename = format!("{}_remodeling.csv", base_filename);
    let mut writer = csv::Writer::from_path(&filename)
        .with_context(|| format!("Error creating CSV file '{}'", filename))?;
    writer.write_record(["step", "stimulus", "modulus_gpa"])?;
    for sample in &record.remodeling {
        writer.write_record(&[
            sample.step.to_string(),
            format!("{:.4}", sample.stimulus),
            format!("{:.4}", sample.modulus),
        ])?;
    }
    writer.flush()?;
    info!("Remodeling series saved to {}", filename);

    let filename = format!("{}_metrics.csv", base_filename);
    let mut writer = csv::Writer::from_path(&filename)
        .with_context(|| format!("Error creating CSV file '{}'", filename))?;
    writer.write_record(["time_s", "cells_reached", "bone_volume"])?;
    for (&(time, cells), &(_, bone)) in record.cells_series.iter().zip(&record.bone_series) {
        writer.write_record(&[format!("{:.2}", time), cells.to_string(), format!("{:.2}", bone)])?;
    }
    writer.flush()?;
    info!("Metric series saved to {}", filename);
    Ok(())
}
