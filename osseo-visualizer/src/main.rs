use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Builder;
use log::{info, warn, LevelFilter};
use osseo_common::RunRecord;
use plotters::prelude::*;
use plotters_bitmap::BitMapBackend;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Command-line arguments for the visualizer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input run record (.json, .bin or .msgpack)
    #[arg(short, long)]
    input: PathBuf,

    /// Directory the chart images are written to
    #[arg(short, long, default_value = "static")]
    output_dir: PathBuf,

    /// Width of each chart in pixels
    #[arg(long, default_value_t = 1000)]
    width: u32,

    /// Height of each chart in pixels
    #[arg(long, default_value_t = 600)]
    height: u32,
}

// Series colors of the metrics dashboard
const CELLS_COLOR: RGBColor = RGBColor(46, 204, 113);
const BONE_COLOR: RGBColor = RGBColor(230, 126, 34);
const MODULUS_COLOR: RGBColor = RGBColor(31, 119, 180);

/// Loads a run record, picking the decoder from the file extension.
fn load_record(path: &Path) -> Result<RunRecord> {
    let file = File::open(path).with_context(|| format!("Failed to open record '{}'", path.display()))?;
    let reader = BufReader::new(file);
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    let record = match extension {
        "bin" => bincode::deserialize_from(reader).context("Failed to decode bincode record")?,
        "msgpack" => rmp_serde::from_read(reader).context("Failed to decode MessagePack record")?,
        "json" => serde_json::from_reader(reader).context("Failed to decode JSON record")?,
        other => {
            warn!("Unknown record extension '{}', trying JSON.", other);
            serde_json::from_reader(reader).context("Failed to decode record as JSON")?
        }
    };
    Ok(record)
}

/// Upper axis bound: at least `floor`, with 10% headroom over the data.
fn axis_max(values: impl Iterator<Item = f64>, floor: f64) -> f64 {
    let max = values.fold(0.0f64, f64::max);
    floor.max(max * 1.1)
}

/// Lower and upper bound of the modulus axis with a little padding.
fn modulus_range(record: &RunRecord) -> (f64, f64) {
    let (min, max) = record
        .remodeling
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| (lo.min(s.modulus), hi.max(s.modulus)));
    if !min.is_finite() {
        return (0.0, 1.0);
    }
    let pad = ((max - min) * 0.05).max(0.1);
    ((min - pad).max(0.0), max + pad)
}

/// Draws the bone-modulus curve.
fn draw_modulus_chart(record: &RunRecord, path: &Path, size: (u32, u32)) -> Result<()> {
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let steps = record.remodeling.len().max(2);
    let (y_min, y_max) = modulus_range(record);
    let mut chart = ChartBuilder::on(&root)
        .caption("Simulated Bone Remodeling During Osseointegration", ("sans-serif", 24))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0usize..steps - 1, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Time Step")
        .y_desc("Bone Modulus (GPa)")
        .draw()?;

    chart
        .draw_series(LineSeries::new(
            record.remodeling.iter().map(|s| (s.step, s.modulus)),
            MODULUS_COLOR.stroke_width(2),
        ))?
        .label(format!("Bone Modulus (GPa), rate {:.4}", record.remodeling_rate))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], MODULUS_COLOR));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Draws cells reached and bone formation over time, one panel each.
fn draw_metrics_dashboard(record: &RunRecord, path: &Path, size: (u32, u32)) -> Result<()> {
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let (upper, lower) = root.split_vertically(size.1 / 2);

    let t_max = record
        .cells_series
        .last()
        .map(|&(t, _)| t)
        .unwrap_or(0.0)
        .max(0.5);

    let cells_max = axis_max(record.cells_series.iter().map(|&(_, c)| c as f64), 100.0);
    let mut cells_chart = ChartBuilder::on(&upper)
        .caption("Osteoblasts Migration", ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..t_max, 0.0..cells_max)?;
    cells_chart
        .configure_mesh()
        .x_desc("Time (s)")
        .y_desc("Cells Reached")
        .draw()?;
    cells_chart.draw_series(LineSeries::new(
        record.cells_series.iter().map(|&(t, c)| (t, c as f64)),
        CELLS_COLOR.stroke_width(2),
    ))?;

    let bone_max = axis_max(record.bone_series.iter().map(|&(_, b)| b), 50.0);
    let mut bone_chart = ChartBuilder::on(&lower)
        .caption("Bone Formation Progress", ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..t_max, 0.0..bone_max)?;
    bone_chart
        .configure_mesh()
        .x_desc("Time (s)")
        .y_desc("Volume (units)")
        .draw()?;
    bone_chart.draw_series(LineSeries::new(
        record.bone_series.iter().copied(),
        BONE_COLOR.stroke_width(2),
    ))?;

    root.present()?;
    Ok(())
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    run_with_args(args)
}

fn run_with_args(args: Args) -> Result<()> {
    // Initialize logger
    Builder::from_default_env()
        .filter(None, LevelFilter::Info)
        .init();

    info!("Starting Osseointegration Visualizer...");
    info!("Input record: {}", args.input.display());

    let record = load_record(&args.input)?;
    info!(
        "Loaded {} remodeling steps and {} metric samples.",
        record.remodeling.len(),
        record.cells_series.len()
    );
    match &record.summary {
        Some(summary) => info!(
            "Run summary: {}/{} cells ({:.1}%), bone {:.1}u, time {:.1}s",
            summary.cells_reached,
            summary.total_cells,
            summary.percent_reached,
            summary.bone_volume,
            summary.elapsed_time
        ),
        None => warn!("Record has no summary; the run was halted before completing."),
    }

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create output directory '{}'", args.output_dir.display()))?;
    let size = (args.width, args.height);

    let modulus_path = args.output_dir.join("bone_modulus_plot.png");
    draw_modulus_chart(&record, &modulus_path, size)?;
    info!("Modulus chart saved to {}", modulus_path.display());

    let metrics_path = args.output_dir.join("metrics_dashboard.png");
    draw_metrics_dashboard(&record, &metrics_path, (args.width, args.height * 2))?;
    info!("Metrics dashboard saved to {}", metrics_path.display());

    Ok(())
}

// Unit tests
#[cfg(test)]
mod tests {
    use super::*;
    use osseo_common::{RemodelingSample, RunSummary};

    fn sample_record() -> RunRecord {
        RunRecord {
            remodeling_rate: 0.05,
            remodeling: vec![
                RemodelingSample { step: 0, stimulus: 0.0, modulus: 1.0 },
                RemodelingSample { step: 1, stimulus: 0.5, modulus: 1.475 },
                RemodelingSample { step: 2, stimulus: 1.0, modulus: 2.40125 },
            ],
            cells_series: vec![(0.5, 0), (1.0, 12)],
            bone_series: vec![(0.5, 0.0), (1.0, 2.4)],
            summary: Some(RunSummary::new(12, 12, 2.4, 1.0)),
        }
    }

    #[test]
    fn test_load_record_by_extension() {
        let record = sample_record();
        let dir = std::env::temp_dir();
        let stem = format!("osseo_visualizer_test_{}", std::process::id());

        let json = dir.join(format!("{}.json", stem));
        fs::write(&json, serde_json::to_vec(&record).unwrap()).unwrap();
        assert_eq!(load_record(&json).unwrap(), record);

        let bin = dir.join(format!("{}.bin", stem));
        fs::write(&bin, bincode::serialize(&record).unwrap()).unwrap();
        assert_eq!(load_record(&bin).unwrap(), record);

        let msgpack = dir.join(format!("{}.msgpack", stem));
        fs::write(&msgpack, rmp_serde::to_vec(&record).unwrap()).unwrap();
        assert_eq!(load_record(&msgpack).unwrap(), record);

        for path in [json, bin, msgpack] {
            let _ = fs::remove_file(path);
        }
    }

    #[test]
    fn test_missing_record_is_an_error() {
        assert!(load_record(Path::new("/nonexistent/osseo_record.json")).is_err());
    }

    #[test]
    fn test_axis_bounds() {
        assert_eq!(axis_max([3.0, 12.0].into_iter(), 100.0), 100.0);
        assert!((axis_max([200.0].into_iter(), 100.0) - 220.0).abs() < 1e-9);

        let (lo, hi) = modulus_range(&sample_record());
        assert!(lo <= 1.0 && lo >= 0.0);
        assert!(hi > 2.40125);

        let empty = RunRecord { remodeling: Vec::new(), ..sample_record() };
        assert_eq!(modulus_range(&empty), (0.0, 1.0));
    }
}
