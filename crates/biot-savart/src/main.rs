//! loop-field: CLI tool for plotting the magnetic field of a current loop

use anyhow::{Context, Result};
use biot_savart::analytic::{compare_on_axis, AxisComparison};
use biot_savart::{
    build_evaluator, render_html, run, run_slice, AxisRange, Curve, LengthUnit, Method,
    PlaneSlice, PlaneType, QuadratureMode, RunConfig,
};
use clap::{Parser, ValueEnum};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "loop-field")]
#[command(about = "Compute the Biot-Savart field of a current loop and plot it as 3D cones")]
#[command(version)]
struct Args {
    /// JSON run configuration; flags below override its fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Starting configuration when no file is given
    #[arg(long, value_enum, default_value = "circle")]
    preset: Preset,

    /// Output HTML file
    #[arg(short, long, default_value = "field.html")]
    output: PathBuf,

    /// Length unit of the configuration (m, mm, um, nm)
    #[arg(long)]
    unit: Option<String>,

    /// Loop radius in the configured unit
    #[arg(long)]
    radius: Option<f64>,

    /// Loop current in amperes
    #[arg(long)]
    current: Option<f64>,

    /// Polygon vertex count (discretized) or drawn points (integrated)
    #[arg(long)]
    segments: Option<usize>,

    #[arg(long, value_enum)]
    method: Option<MethodArg>,

    /// Integrate all sample points as one vector-valued quadrature
    #[arg(long)]
    batch: bool,

    /// Also write the raw sample arrays as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Compare the on-axis field of the selected method with the closed form (circular loops only)
    #[arg(long)]
    check_axis: bool,

    /// Evaluate a planar slice and write it as JSON to `--slice-json`
    #[arg(long, value_enum, requires = "slice_json")]
    slice: Option<PlaneArg>,

    /// Slice position along the plane normal
    #[arg(long, default_value = "0")]
    slice_offset: f64,

    /// Samples per slice axis
    #[arg(long, default_value = "41")]
    slice_count: usize,

    #[arg(long)]
    slice_json: Option<PathBuf>,

    /// Print the HTML to stdout instead of writing a file
    #[arg(long)]
    stdout: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Preset {
    Circle,
    Rose,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum MethodArg {
    Discretized,
    Integrated,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PlaneArg {
    Xz,
    Xy,
    Yz,
}

fn build_config(args: &Args) -> Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => RunConfig::load(path)
            .with_context(|| format!("Failed to load config: {:?}", path))?,
        None => match args.preset {
            Preset::Circle => RunConfig::default(),
            Preset::Rose => RunConfig::rose_preset(),
        },
    };

    if let Some(unit) = &args.unit {
        config.unit = unit.parse::<LengthUnit>().map_err(anyhow::Error::msg)?;
    }
    if let Some(radius) = args.radius {
        config.curve.set_radius(radius);
    }
    if let Some(current) = args.current {
        config.current = current;
    }
    if let Some(segments) = args.segments {
        config.segments = segments;
    }
    if let Some(method) = args.method {
        config.method = match method {
            MethodArg::Discretized => Method::Discretized,
            MethodArg::Integrated => Method::Integrated,
        };
    }
    if args.batch {
        config.quadrature_mode = QuadratureMode::Batch;
    }
    Ok(config)
}

/// On-axis comparison for the evaluator the configuration selects.
fn axis_comparison(config: &RunConfig) -> Result<AxisComparison> {
    let curve = config.curve.build(config.length_scale())?;
    let Curve::Circle(circle) = &curve else {
        anyhow::bail!("--check-axis needs a circular loop, got {}", curve.name());
    };
    let (evaluator, _) = build_evaluator(config)?;

    let radius = circle.radius();
    let distances = AxisRange::new(-2.0 * radius, 2.0 * radius, 9).values();
    Ok(compare_on_axis(
        evaluator.as_ref(),
        circle,
        config.current,
        &config.constants(),
        &distances,
    ))
}

fn check_axis(config: &RunConfig) -> Result<()> {
    let comparison = axis_comparison(config)?;
    eprintln!("On-axis check, {:?} method:", config.method);
    for s in &comparison.samples {
        eprintln!(
            "z = {:>10.4} {}  numeric = {:.6e}  closed form = {:.6e}  rel. error = {:.2e}",
            config.unit.from_meters(s.distance),
            config.unit.symbol(),
            s.numeric,
            s.analytic,
            s.relative_error
        );
    }
    eprintln!("Max relative error: {:.3e}", comparison.max_relative_error());
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = build_config(&args)?;

    let field = run(&config).context("Field evaluation failed")?;
    if !field.samples.singular().is_empty() {
        tracing::warn!(
            "{} samples are numeric approximations near the current path",
            field.samples.singular().len()
        );
    }

    if let Some(path) = &args.json {
        field
            .write_json(path)
            .with_context(|| format!("Failed to write sample JSON: {:?}", path))?;
        eprintln!("Wrote samples: {:?}", path);
    }

    if args.check_axis {
        check_axis(&config)?;
    }

    if let (Some(plane), Some(path)) = (args.slice, &args.slice_json) {
        let radius = config.curve.radius();
        let extent = AxisRange::new(-2.0 * radius, 2.0 * radius, args.slice_count);
        let slice = PlaneSlice {
            plane: match plane {
                PlaneArg::Xz => PlaneType::XZ,
                PlaneArg::Xy => PlaneType::XY,
                PlaneArg::Yz => PlaneType::YZ,
            },
            offset: args.slice_offset,
            axis1: extent,
            axis2: extent,
        };
        let slice_field = run_slice(&config, &slice).context("Slice evaluation failed")?;
        fs::write(path, serde_json::to_string(&slice_field)?)
            .with_context(|| format!("Failed to write slice JSON: {:?}", path))?;
        eprintln!("Wrote slice: {:?}", path);
    }

    let html = render_html(&field, &config.render).context("Rendering failed")?;
    if args.stdout {
        println!("{}", html);
    } else {
        fs::write(&args.output, &html)
            .with_context(|| format!("Failed to write output file: {:?}", args.output))?;
        eprintln!("Generated figure: {:?}", args.output);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use biot_savart::CurveConfig;

    #[test]
    fn test_flags_override_preset() {
        let args = Args::parse_from([
            "loop-field",
            "--preset",
            "rose",
            "--unit",
            "mm",
            "--radius",
            "2.5",
            "--method",
            "discretized",
            "--batch",
        ]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.unit, LengthUnit::Millimeter);
        assert_eq!(config.curve.radius(), 2.5);
        assert_eq!(config.method, Method::Discretized);
        assert_eq!(config.quadrature_mode, QuadratureMode::Batch);
        assert!(matches!(config.curve, CurveConfig::Rose { .. }));
    }

    #[test]
    fn test_bad_unit_is_rejected() {
        let args = Args::parse_from(["loop-field", "--unit", "furlong"]);
        assert!(build_config(&args).is_err());
    }

    #[test]
    fn test_axis_check_uses_selected_method() {
        let args = Args::parse_from(["loop-field", "--segments", "10"]);
        let polygon = axis_comparison(&build_config(&args).unwrap()).unwrap();
        assert!(polygon.max_relative_error() > 1e-3);

        let args = Args::parse_from(["loop-field", "--segments", "10", "--method", "integrated"]);
        let continuous = axis_comparison(&build_config(&args).unwrap()).unwrap();
        assert!(continuous.max_relative_error() < 1e-7);
    }

    #[test]
    fn test_axis_check_needs_a_circle() {
        let args = Args::parse_from(["loop-field", "--preset", "rose"]);
        assert!(axis_comparison(&build_config(&args).unwrap()).is_err());
    }

    #[test]
    fn test_slice_requires_output_path() {
        assert!(Args::try_parse_from(["loop-field", "--slice", "xz"]).is_err());
    }
}
