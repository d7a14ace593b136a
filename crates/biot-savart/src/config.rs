//! Run configuration: loop geometry, evaluator choice, sampling grid and figure options

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::curve::{Curve, Helix, Rose};
use crate::error::{ensure_finite, ensure_positive, FieldError, Result};
use crate::evaluator::{Method, PhysicalConstants, QuadratureMode};
use crate::geometry::Circle;
use crate::grid::SampleGrid;
use crate::quadrature::QuadratureConfig;
use crate::render::{RenderConfig, VectorMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LengthUnit {
    #[serde(rename = "m", alias = "meter", alias = "meters")]
    Meter,
    #[serde(rename = "mm", alias = "millimeter", alias = "millimeters")]
    Millimeter,
    #[serde(rename = "um", alias = "µm", alias = "micrometer", alias = "micrometers")]
    Micrometer,
    #[serde(rename = "nm", alias = "nanometer", alias = "nanometers")]
    Nanometer,
}

impl LengthUnit {
    /// Convert from this unit to meters
    pub fn to_meters(&self, value: f64) -> f64 {
        match self {
            LengthUnit::Meter => value,
            LengthUnit::Millimeter => value * 1e-3,
            LengthUnit::Micrometer => value * 1e-6,
            LengthUnit::Nanometer => value * 1e-9,
        }
    }

    /// Convert from meters to this unit
    pub fn from_meters(&self, value: f64) -> f64 {
        match self {
            LengthUnit::Meter => value,
            LengthUnit::Millimeter => value * 1e3,
            LengthUnit::Micrometer => value * 1e6,
            LengthUnit::Nanometer => value * 1e9,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            LengthUnit::Meter => "m",
            LengthUnit::Millimeter => "mm",
            LengthUnit::Micrometer => "µm",
            LengthUnit::Nanometer => "nm",
        }
    }
}

impl FromStr for LengthUnit {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "m" | "meter" | "meters" => Ok(LengthUnit::Meter),
            "mm" | "millimeter" | "millimeters" => Ok(LengthUnit::Millimeter),
            "um" | "µm" | "micrometer" | "micrometers" => Ok(LengthUnit::Micrometer),
            "nm" | "nanometer" | "nanometers" => Ok(LengthUnit::Nanometer),
            _ => Err(format!("Unknown unit: {}. Use: m, mm, um, or nm", s)),
        }
    }
}

/// Shape of the current path, lengths in the configured unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum CurveConfig {
    Circle {
        radius: f64,
        #[serde(default)]
        center: [f64; 3],
        #[serde(default = "default_normal")]
        normal: [f64; 3],
    },
    Rose {
        radius: f64,
        #[serde(default = "default_rose_amplitude")]
        amplitude: f64,
        #[serde(default = "default_rose_lobes")]
        lobes: u32,
    },
    Helix {
        radius: f64,
        #[serde(default = "default_helix_pitch")]
        pitch: f64,
    },
}

fn default_normal() -> [f64; 3] {
    [0.0, 0.0, 1.0]
}

fn default_rose_amplitude() -> f64 {
    0.75
}

fn default_rose_lobes() -> u32 {
    3
}

fn default_helix_pitch() -> f64 {
    1.0
}

impl Default for CurveConfig {
    fn default() -> Self {
        CurveConfig::Circle {
            radius: 0.3,
            center: [0.0; 3],
            normal: default_normal(),
        }
    }
}

impl CurveConfig {
    pub fn radius(&self) -> f64 {
        match self {
            CurveConfig::Circle { radius, .. }
            | CurveConfig::Rose { radius, .. }
            | CurveConfig::Helix { radius, .. } => *radius,
        }
    }

    pub fn set_radius(&mut self, value: f64) {
        match self {
            CurveConfig::Circle { radius, .. }
            | CurveConfig::Rose { radius, .. }
            | CurveConfig::Helix { radius, .. } => *radius = value,
        }
    }

    /// Build the curve with every length multiplied by `scale` (to meters).
    pub fn build(&self, scale: f64) -> Result<Curve> {
        match self {
            CurveConfig::Circle {
                radius,
                center,
                normal,
            } => {
                let center = Point3::from(*center) * scale;
                let circle = Circle::new(radius * scale)?
                    .with_center(center)?
                    .with_normal(Vector3::from(*normal))?;
                Ok(Curve::Circle(circle))
            }
            CurveConfig::Rose {
                radius,
                amplitude,
                lobes,
            } => Ok(Curve::Rose(Rose::new(radius * scale, *amplitude, *lobes)?)),
            CurveConfig::Helix { radius, pitch } => {
                Ok(Curve::Helix(Helix::new(radius * scale, pitch * scale)?))
            }
        }
    }
}

/// Everything one run needs. Missing fields take the defaults of [`RunConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Unit of every length in this configuration
    pub unit: LengthUnit,
    /// Vacuum permeability
    pub mu0: f64,
    /// Loop current (A)
    pub current: f64,
    pub curve: CurveConfig,
    pub method: Method,
    /// Discretized: polygon vertex count. Integrated: points of the drawn polyline.
    pub segments: usize,
    pub quadrature: QuadratureConfig,
    pub quadrature_mode: QuadratureMode,
    pub grid: SampleGrid,
    pub render: RenderConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            unit: LengthUnit::Meter,
            mu0: PhysicalConstants::default().mu0,
            current: 1.0,
            curve: CurveConfig::default(),
            method: Method::Discretized,
            segments: 200,
            quadrature: QuadratureConfig::default(),
            quadrature_mode: QuadratureMode::PerSample,
            grid: SampleGrid::default(),
            render: RenderConfig::default(),
        }
    }
}

impl RunConfig {
    /// Three-lobed rose on a 20³ grid in normalized units (μ₀ I / 4π = 1),
    /// integrated and drawn with components clipped to ±20.
    pub fn rose_preset() -> Self {
        Self {
            mu0: PhysicalConstants::normalized().mu0,
            curve: CurveConfig::Rose {
                radius: 1.0,
                amplitude: default_rose_amplitude(),
                lobes: default_rose_lobes(),
            },
            method: Method::Integrated,
            segments: 100,
            grid: SampleGrid::cube(2.0, 20),
            render: RenderConfig {
                colorscale: "Inferno".to_string(),
                size_ref: 20.0,
                vectors: VectorMode::Clipped { limit: 20.0 },
                loop_color: "green".to_string(),
                loop_width: 10.0,
                ..RenderConfig::default()
            },
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| FieldError::io(path, e))?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn constants(&self) -> PhysicalConstants {
        PhysicalConstants { mu0: self.mu0 }
    }

    /// Meters per configured length unit.
    pub fn length_scale(&self) -> f64 {
        self.unit.to_meters(1.0)
    }

    /// Reject anything that would make the run meaningless before computing.
    pub fn validate(&self) -> Result<()> {
        ensure_positive("mu0", self.mu0)?;
        ensure_finite("current", self.current)?;
        ensure_positive("radius", self.curve.radius())?;
        if self.segments < 2 {
            return Err(FieldError::invalid(format!(
                "segment count must be at least 2, got {}",
                self.segments
            )));
        }
        self.grid.validate()?;
        self.quadrature.validate()?;
        self.render.validate()?;
        let open_helix = matches!(self.curve, CurveConfig::Helix { pitch, .. } if pitch != 0.0);
        if self.method == Method::Discretized && open_helix {
            return Err(FieldError::invalid(
                "the discretized method needs a closed loop; use the integrated method for a helix",
            ));
        }
        Ok(())
    }
}
