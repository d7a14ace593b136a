//! Configuration file to HTML figure, end to end

use biot_savart::{
    render_html, run, run_slice, AxisRange, CurveConfig, Method, PlaneSlice, PlaneType, RunConfig,
    SampleGrid,
};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_config_file_to_figure() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("run.json");
    fs::write(
        &config_path,
        r#"{
            "unit": "mm",
            "current": 2.0,
            "segments": 120,
            "curve": {"kind": "circle", "radius": 300.0},
            "grid": {
                "x": {"min": -500.0, "max": 500.0, "count": 4},
                "y": {"min": -500.0, "max": 500.0, "count": 4},
                "z": {"min": -300.0, "max": 300.0, "count": 3}
            },
            "render": {"title": "Loop", "vectors": {"mode": "clipped", "limit": 1e-6}}
        }"#,
    )
    .unwrap();

    let config = RunConfig::load(&config_path).unwrap();
    let field = run(&config).unwrap();
    assert_eq!(field.samples.len(), 48);
    assert_eq!(field.polyline.len(), 121);

    let json_path = dir.path().join("samples.json");
    field.write_json(&json_path).unwrap();
    let dumped = fs::read_to_string(&json_path).unwrap();
    let columns: serde_json::Value = serde_json::from_str(&dumped).unwrap();
    assert_eq!(columns["x"].as_array().unwrap().len(), 48);
    assert_eq!(columns["x"][0].as_f64(), Some(-500.0));

    let html = render_html(&field, &config.render).unwrap();
    let html_path = dir.path().join("field.html");
    fs::write(&html_path, &html).unwrap();
    let written = fs::read_to_string(&html_path).unwrap();
    assert!(written.contains("<title>Loop</title>"));
    assert!(written.contains("Z (mm)"));
}

#[test]
fn test_missing_config_file_reports_path() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.json");
    let err = RunConfig::load(&missing).unwrap_err();
    assert!(err.to_string().contains("nope.json"));
}

#[test]
fn test_rose_preset_runs_integrated() {
    let config = RunConfig {
        grid: SampleGrid::cube(2.0, 3),
        ..RunConfig::rose_preset()
    };
    let field = run(&config).unwrap();
    assert_eq!(field.method, Method::Integrated);
    assert_eq!(field.samples.len(), 27);
    assert!(field.samples.vectors().iter().all(|b| b.iter().all(|c| c.is_finite())));

    let html = render_html(&field, &config.render).unwrap();
    assert!(html.contains("Inferno"));
}

#[test]
fn test_helix_runs_integrated() {
    let config = RunConfig {
        curve: CurveConfig::Helix {
            radius: 1.0,
            pitch: 1.0,
        },
        method: Method::Integrated,
        segments: 50,
        grid: SampleGrid::cube(2.0, 3),
        ..RunConfig::default()
    };
    let field = run(&config).unwrap();
    assert_eq!(field.method, Method::Integrated);
    assert_eq!(field.samples.len(), 27);
    assert!(field.samples.singular().is_empty());
    assert!(field.samples.vectors().iter().all(|b| b.iter().all(|c| c.is_finite())));

    // Open path drawn end to end, rising from z = -1 to z = 1
    assert_eq!(field.polyline.len(), 50);
    assert!((field.polyline[0].z + 1.0).abs() < 1e-12);
    assert!((field.polyline[49].z - 1.0).abs() < 1e-12);

    // Counter-clockwise winding seen from +z: field through the center points up
    let center = field.samples.vectors()[13];
    assert!(center.z > 0.0);
}

#[test]
fn test_slice_in_loop_plane() {
    let config = RunConfig::default();
    let slice = PlaneSlice {
        plane: PlaneType::XY,
        offset: 0.0,
        axis1: AxisRange::new(-0.1, 0.1, 3),
        axis2: AxisRange::new(-0.1, 0.1, 3),
    };
    let field = run_slice(&config, &slice).unwrap();
    // Inside a planar loop the field is perpendicular to the plane
    for ((b1, b2), m) in field.b1.iter().zip(&field.b2).zip(&field.magnitude) {
        assert!(b1.abs() < 1e-9 * m);
        assert!(b2.abs() < 1e-9 * m);
    }
}
