//! Experiment configuration loading, parsing, and validation.
//!
//! The whole experiment is described by one immutable configuration object
//! loaded from a JSON file and passed explicitly to the engine constructor;
//! there is no process-wide mutable configuration state.

use anyhow::Context;
use nalgebra::Vector3;
use serde::Deserialize;
use std::fs;

/// Error type for configuration loading failures.
#[derive(Debug)]
pub enum ConfigLoadError {
    FileReadError(String),
    ParseError(String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigLoadError::FileReadError(msg) => write!(f, "Failed to read file: {}", msg),
            ConfigLoadError::ParseError(msg) => write!(f, "Failed to parse JSON: {}", msg),
            ConfigLoadError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigLoadError {}

/// Particles emitted per simulation step, per type.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchSizes {
    pub neutron: u32,
    pub alpha: u32,
}

/// Pulse timing distribution selection.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum PulseDistributionConfig {
    #[serde(rename = "gaussian")]
    Gaussian { mean: f64, std: f64 },
    #[serde(rename = "uniform")]
    Uniform { min: f64, max: f64 },
}

/// Trajectory of the detector array frame.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum TrajectoryConfig {
    #[serde(rename = "circular")]
    Circular { radius: f64, angular_speed: f64 },
    #[serde(rename = "linear")]
    Linear { velocity: [f64; 3] },
    #[serde(rename = "static")]
    Static,
}

/// Axis of the fixed tilt applied to the detector array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum TiltAxis {
    #[serde(rename = "x")]
    X,
    #[serde(rename = "y")]
    Y,
    #[serde(rename = "z")]
    Z,
}

impl Default for TiltAxis {
    fn default() -> Self {
        TiltAxis::Z
    }
}

/// Planar detector grid in the xy plane at `z`, `spacing` apart.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectorGridConfig {
    pub count_x: u32,
    pub count_y: u32,
    pub spacing: f64,
    #[serde(default)]
    pub z: f64,
}

/// Root structure describing the entire experiment.
#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentConfig {
    /// Point source position.
    pub generator_position: [f64; 3],
    /// Per-step emission counts, per particle type.
    pub particles_per_step: BatchSizes,
    /// Timing distribution of pulse offsets.
    pub pulse_distribution: PulseDistributionConfig,
    /// Emit neutron/alpha coincidence pairs back-to-back along a shared axis.
    #[serde(default)]
    pub paired_emission: bool,
    /// Explicit detector reference positions.
    #[serde(default)]
    pub detector_positions: Vec<[f64; 3]>,
    /// Optional generated planar grid, appended after the explicit list.
    #[serde(default)]
    pub detector_grid: Option<DetectorGridConfig>,
    /// Half-extent of each detector box.
    pub detector_half_size: f64,
    /// Straight-line particle speed.
    pub particle_speed: f64,
    /// Acceptance floor for track lengths; shorter tracks are flagged.
    pub min_track_length: f64,
    /// Rigid translation of the array over time.
    pub trajectory: TrajectoryConfig,
    /// Axis of the fixed array tilt.
    #[serde(default)]
    pub tilt_axis: TiltAxis,
    /// Tilt angle in degrees.
    #[serde(default)]
    pub tilt_degrees: f64,
    /// Total simulated time.
    pub horizon: f64,
    /// Fixed step size of the clock.
    pub time_step: f64,
    /// Radius of the spatial-index candidate query around the generator.
    /// Must cover the maximum plausible detector displacement plus the
    /// detector half-size; the index does not enforce this.
    pub query_radius: f64,
    /// RNG seed for deterministic replay. Absent means OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl ExperimentConfig {
    /// Load and validate an experiment configuration from a JSON file.
    pub fn load(path: &str) -> Result<Self, ConfigLoadError> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path))
            .map_err(|e| ConfigLoadError::FileReadError(e.to_string()))?;

        let config: ExperimentConfig = serde_json::from_str(&data)
            .context("Invalid JSON format")
            .map_err(|e| ConfigLoadError::ParseError(e.to_string()))?;

        validate_config(&config).map_err(ConfigLoadError::ValidationError)?;

        Ok(config)
    }

    /// All detector reference positions: the explicit list followed by the
    /// generated grid, in row-major grid order.
    pub fn detector_reference_positions(&self) -> Vec<Vector3<f64>> {
        let mut positions: Vec<Vector3<f64>> = self
            .detector_positions
            .iter()
            .map(|p| Vector3::new(p[0], p[1], p[2]))
            .collect();
        if let Some(grid) = &self.detector_grid {
            for ix in 0..grid.count_x {
                for iy in 0..grid.count_y {
                    positions.push(Vector3::new(ix as f64 * grid.spacing, iy as f64 * grid.spacing, grid.z));
                }
            }
        }
        positions
    }

    pub fn generator_position_vector(&self) -> Vector3<f64> {
        Vector3::new(self.generator_position[0], self.generator_position[1], self.generator_position[2])
    }
}

/// Validate an experiment configuration.
///
/// Configuration errors are fatal: a simulation must not start from an
/// invalid configuration.
pub fn validate_config(config: &ExperimentConfig) -> Result<(), String> {
    if config.particle_speed <= 0.0 {
        return Err(format!("particle_speed {} must be positive", config.particle_speed));
    }
    if config.detector_half_size <= 0.0 {
        return Err(format!("detector_half_size {} must be positive", config.detector_half_size));
    }
    if config.min_track_length <= 0.0 {
        return Err(format!("min_track_length {} must be positive", config.min_track_length));
    }
    if config.time_step <= 0.0 {
        return Err(format!("time_step {} must be positive", config.time_step));
    }
    if config.horizon <= 0.0 {
        return Err(format!("horizon {} must be positive", config.horizon));
    }
    if config.query_radius <= 0.0 {
        return Err(format!("query_radius {} must be positive", config.query_radius));
    }
    if !config.generator_position.iter().all(|c| c.is_finite()) {
        return Err("generator_position must be finite".to_string());
    }

    match &config.pulse_distribution {
        PulseDistributionConfig::Gaussian { std, .. } => {
            if *std < 0.0 {
                return Err(format!("gaussian pulse std {} must be non-negative", std));
            }
        }
        PulseDistributionConfig::Uniform { min, max } => {
            if min > max {
                return Err(format!("uniform pulse min {} must not exceed max {}", min, max));
            }
        }
    }

    match &config.trajectory {
        TrajectoryConfig::Circular { radius, .. } => {
            if *radius < 0.0 {
                return Err(format!("trajectory radius {} must be non-negative", radius));
            }
        }
        TrajectoryConfig::Linear { velocity } => {
            if !velocity.iter().all(|c| c.is_finite()) {
                return Err("trajectory velocity must be finite".to_string());
            }
        }
        TrajectoryConfig::Static => {}
    }

    if let Some(grid) = &config.detector_grid {
        if grid.count_x == 0 || grid.count_y == 0 {
            return Err("detector_grid counts must be positive".to_string());
        }
        if grid.spacing <= 0.0 {
            return Err(format!("detector_grid spacing {} must be positive", grid.spacing));
        }
    }

    if config.detector_positions.is_empty() && config.detector_grid.is_none() {
        return Err("configuration must define at least one detector".to_string());
    }
    if !config.detector_positions.iter().all(|p| p.iter().all(|c| c.is_finite())) {
        return Err("detector_positions must be finite".to_string());
    }

    if config.particles_per_step.neutron == 0 && config.particles_per_step.alpha == 0 {
        return Err("particles_per_step must emit at least one particle".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> ExperimentConfig {
        ExperimentConfig {
            generator_position: [0.0, 0.0, 0.0],
            particles_per_step: BatchSizes { neutron: 1, alpha: 1 },
            pulse_distribution: PulseDistributionConfig::Gaussian { mean: 0.0, std: 0.5 },
            paired_emission: true,
            detector_positions: vec![[1.0, 0.0, 0.0]],
            detector_grid: None,
            detector_half_size: 0.05,
            particle_speed: 1.0,
            min_track_length: 0.1,
            trajectory: TrajectoryConfig::Static,
            tilt_axis: TiltAxis::Z,
            tilt_degrees: 0.0,
            horizon: 10.0,
            time_step: 1.0,
            query_radius: 5.0,
            seed: Some(1),
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(validate_config(&base_config()).is_ok());
    }

    #[test]
    fn non_positive_physics_parameters_are_fatal() {
        let mut c = base_config();
        c.particle_speed = 0.0;
        assert!(validate_config(&c).is_err());

        let mut c = base_config();
        c.detector_half_size = -0.05;
        assert!(validate_config(&c).is_err());

        let mut c = base_config();
        c.min_track_length = 0.0;
        assert!(validate_config(&c).is_err());
    }

    #[test]
    fn uniform_pulse_bounds_are_checked() {
        let mut c = base_config();
        c.pulse_distribution = PulseDistributionConfig::Uniform { min: 1.0, max: -1.0 };
        assert!(validate_config(&c).is_err());
    }

    #[test]
    fn at_least_one_detector_required() {
        let mut c = base_config();
        c.detector_positions.clear();
        assert!(validate_config(&c).is_err());
    }

    #[test]
    fn grid_positions_are_row_major() {
        let mut c = base_config();
        c.detector_positions.clear();
        c.detector_grid = Some(DetectorGridConfig {
            count_x: 2,
            count_y: 3,
            spacing: 1.0,
            z: 0.5,
        });
        let positions = c.detector_reference_positions();
        assert_eq!(positions.len(), 6);
        assert_eq!(positions[0], Vector3::new(0.0, 0.0, 0.5));
        assert_eq!(positions[2], Vector3::new(0.0, 2.0, 0.5));
        assert_eq!(positions[3], Vector3::new(1.0, 0.0, 0.5));
    }

    #[test]
    fn parse_tagged_enums_from_json() {
        let json = r#"{
            "generator_position": [0, 0, 0],
            "particles_per_step": { "neutron": 1, "alpha": 1 },
            "pulse_distribution": { "type": "uniform", "min": -1.0, "max": 1.0 },
            "detector_positions": [[1, 0, 0]],
            "detector_half_size": 0.05,
            "particle_speed": 1.0,
            "min_track_length": 0.1,
            "trajectory": { "type": "circular", "radius": 2.0, "angular_speed": 0.02 },
            "tilt_axis": "y",
            "tilt_degrees": 10.0,
            "horizon": 100.0,
            "time_step": 1.0,
            "query_radius": 6.0,
            "seed": 42
        }"#;
        let config: ExperimentConfig = serde_json::from_str(json).unwrap();
        assert!(matches!(config.pulse_distribution, PulseDistributionConfig::Uniform { .. }));
        assert!(matches!(config.trajectory, TrajectoryConfig::Circular { .. }));
        assert_eq!(config.tilt_axis, TiltAxis::Y);
        assert!(!config.paired_emission);
        assert!(validate_config(&config).is_ok());
    }
}
