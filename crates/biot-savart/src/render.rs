//! Interactive HTML figure: plotly cone trace for the field, line trace for the loop
//!
//! Display-only transforms of the field (direction-only arrows, component
//! clipping) live here; evaluators always hand over the raw field.

use minijinja::{context, Environment, Value};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{ensure_positive, FieldError, Result};
use crate::field::{FieldSamples, SampleColumns};
use crate::FieldRun;

const FIGURE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{{ title }}</title>
<!--
  Generated: {{ timestamp }}
  Method: {{ method }}
  Samples: {{ sample_count }}
  Length unit: {{ unit }}
-->
<script src="{{ plotly_url }}"></script>
<style>
  html, body { margin: 0; height: 100%; }
  #figure { width: 100%; height: 100%; }
</style>
</head>
<body>
<div id="figure"></div>
<script>
  const data = {{ traces }};
  const layout = {{ layout }};
  Plotly.newPlot("figure", data, layout, { responsive: true });
</script>
</body>
</html>
"##;

const PLOTLY_URL: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// What the cone trace's u/v/w arrays hold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case", deny_unknown_fields)]
pub enum VectorMode {
    /// B / (|B| + ε): direction only
    Unit,
    /// Each component clamped to [-limit, limit]
    Clipped { limit: f64 },
    /// Raw field in tesla
    Raw,
}

impl VectorMode {
    pub fn apply(&self, samples: &FieldSamples) -> Vec<Vector3<f64>> {
        match self {
            VectorMode::Unit => samples.unit_vectors(),
            VectorMode::Clipped { limit } => {
                samples.vectors().iter().map(|b| clip_components(b, *limit)).collect()
            }
            VectorMode::Raw => samples.vectors().to_vec(),
        }
    }
}

/// Clamp every component of `b` to `[-limit, limit]`. NaN components pass through.
pub fn clip_components(b: &Vector3<f64>, limit: f64) -> Vector3<f64> {
    b.map(|c| c.clamp(-limit, limit))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub title: String,
    /// Plotly colorscale name
    pub colorscale: String,
    /// Cone size reference (plotly `sizeref`, absolute size mode)
    pub size_ref: f64,
    pub vectors: VectorMode,
    pub loop_color: String,
    pub loop_width: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            title: "Magnetic Field Around a Circular Current Loop (Biot–Savart Law)".to_string(),
            colorscale: "Viridis".to_string(),
            size_ref: 0.3,
            vectors: VectorMode::Unit,
            loop_color: "black".to_string(),
            loop_width: 4.0,
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("cone size reference", self.size_ref)?;
        ensure_positive("loop line width", self.loop_width)?;
        if let VectorMode::Clipped { limit } = self.vectors {
            ensure_positive("clip limit", limit)?;
        }
        if self.colorscale.trim().is_empty() {
            return Err(FieldError::invalid("colorscale must not be empty"));
        }
        Ok(())
    }
}

/// Cone trace columns for `samples` under `mode`, coordinates multiplied by `length_scale`.
pub fn cone_columns(samples: &FieldSamples, mode: &VectorMode, length_scale: f64) -> SampleColumns {
    samples.columns_with(&mode.apply(samples), length_scale)
}

/// JSON embedded in a `<script>` block must not close it early.
fn script_safe_json(value: &serde_json::Value) -> Result<Value> {
    let json = serde_json::to_string(value)?.replace("</", "<\\/");
    Ok(Value::from_safe_string(json))
}

/// Render the whole figure as a standalone HTML page.
pub fn render_html(run: &FieldRun, config: &RenderConfig) -> Result<String> {
    config.validate()?;

    let mut env = Environment::new();
    env.add_template("figure.html", FIGURE_TEMPLATE)?;
    let template = env.get_template("figure.html")?;

    let display_scale = 1.0 / run.length_scale;
    let columns = cone_columns(&run.samples, &config.vectors, display_scale);
    let cone_count = columns.len();

    let cone = serde_json::json!({
        "type": "cone",
        "x": columns.x,
        "y": columns.y,
        "z": columns.z,
        "u": columns.u,
        "v": columns.v,
        "w": columns.w,
        "customdata": columns.magnitude,
        "hovertemplate": "|B| = %{customdata:.3e} T<extra></extra>",
        "colorscale": config.colorscale,
        "sizemode": "absolute",
        "sizeref": config.size_ref,
        "showscale": true,
        "name": "Magnetic Field",
    });

    let (lx, (ly, lz)): (Vec<f64>, (Vec<f64>, Vec<f64>)) = run
        .polyline
        .iter()
        .map(|p| (p.x * display_scale, (p.y * display_scale, p.z * display_scale)))
        .unzip();
    let loop_trace = serde_json::json!({
        "type": "scatter3d",
        "x": lx,
        "y": ly,
        "z": lz,
        "mode": "lines",
        "line": { "color": config.loop_color, "width": config.loop_width },
        "name": "Current Loop",
    });

    let unit = run.unit.symbol();
    let layout = serde_json::json!({
        "title": { "text": config.title },
        "scene": {
            "xaxis": { "title": { "text": format!("X ({})", unit) } },
            "yaxis": { "title": { "text": format!("Y ({})", unit) } },
            "zaxis": { "title": { "text": format!("Z ({})", unit) } },
            "aspectmode": "cube",
        },
    });

    let output = template.render(context! {
        title => config.title.as_str(),
        timestamp => chrono::Utc::now().to_rfc3339(),
        method => format!("{:?}", run.method),
        sample_count => run.samples.len(),
        unit => unit,
        plotly_url => PLOTLY_URL,
        traces => script_safe_json(&serde_json::json!([loop_trace, cone]))?,
        layout => script_safe_json(&layout)?,
    })?;

    tracing::debug!(
        "Rendered figure with {} cones and {} loop points",
        cone_count,
        run.polyline.len()
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LengthUnit;
    use crate::evaluator::Method;
    use crate::field::FieldValue;
    use nalgebra::Point3;

    fn run() -> FieldRun {
        FieldRun {
            method: Method::Discretized,
            unit: LengthUnit::Millimeter,
            length_scale: 1e-3,
            polyline: vec![
                Point3::new(0.3, 0.0, 0.0),
                Point3::new(0.0, 0.3, 0.0),
                Point3::new(0.3, 0.0, 0.0),
            ],
            samples: FieldSamples::from_values(
                vec![Point3::new(0.001, 0.0, 0.0), Point3::new(0.0, 0.0, 0.002)],
                vec![
                    FieldValue::regular(Vector3::new(0.0, 0.0, 30.0)),
                    FieldValue::regular(Vector3::new(-50.0, 5.0, 0.0)),
                ],
            ),
        }
    }

    #[test]
    fn test_clipping_is_per_component() {
        let clipped = clip_components(&Vector3::new(-50.0, 5.0, 25.0), 20.0);
        assert_eq!(clipped, Vector3::new(-20.0, 5.0, 20.0));
    }

    #[test]
    fn test_vector_modes() {
        let run = run();
        let unit = VectorMode::Unit.apply(&run.samples);
        assert!((unit[0].z - 1.0).abs() < 1e-12);
        let clipped = VectorMode::Clipped { limit: 20.0 }.apply(&run.samples);
        assert_eq!(clipped[1], Vector3::new(-20.0, 5.0, 0.0));
        assert_eq!(VectorMode::Raw.apply(&run.samples), run.samples.vectors().to_vec());
    }

    #[test]
    fn test_html_contains_both_traces() {
        let html = render_html(&run(), &RenderConfig::default()).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(r#""type":"cone""#));
        assert!(html.contains(r#""type":"scatter3d""#));
        assert!(html.contains("X (mm)"));
        assert!(html.contains(PLOTLY_URL));
        // Sample at 0.002 m is drawn at 2 mm
        assert!(html.contains(r#""z":[0.0,2.0]"#));
    }

    #[test]
    fn test_title_cannot_break_out_of_script() {
        let config = RenderConfig {
            title: "</script><b>x</b>".to_string(),
            ..RenderConfig::default()
        };
        let html = render_html(&run(), &config).unwrap();
        assert!(!html.contains("</script><b>"));
        assert!(html.contains("<title>&lt;"));
    }

    #[test]
    fn test_invalid_render_options() {
        let config = RenderConfig {
            vectors: VectorMode::Clipped { limit: 0.0 },
            ..RenderConfig::default()
        };
        assert!(config.validate().unwrap_err().is_invalid_input());
        let config = RenderConfig {
            size_ref: -1.0,
            ..RenderConfig::default()
        };
        assert!(render_html(&run(), &config).is_err());
    }
}
