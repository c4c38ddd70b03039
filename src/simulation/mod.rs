//! Coincidence-detection simulation core.
//!
//! This module provides the complete engine for a coincidence-detection
//! experiment: a point generator emitting correlated particle pairs (or
//! batches) in random directions, and a moving, tiltable array of box
//! detectors intersecting particle trajectories over a discretized time
//! horizon. It integrates:
//! - Isotropic direction sampling and pulse timing (generator)
//! - Slab-method ray/box intersection geometry
//! - Rigid-body detector motion (tilt + trajectory)
//! - Uniform-grid spatial pruning of candidate detectors
//! - The deterministic time-stepped control loop
//! - Result aggregation ("stitching") for export
//!
//! ## Module Organization
//!
//! - `types`: Core data structures (Particle, Detection, Detector, errors)
//! - `geometry`: Pure ray/box intersection and distance helpers
//! - `generator`: Direction sampling, pulse timing, per-step emission
//! - `motion`: Rigid tilt rotation and trajectory of the array
//! - `spatial_index`: Radius-query index rebuilt each step
//! - `engine`: The step loop and engine state machine
//! - `stitching`: Per-detector grouping of the raw detection stream
//!
//! ## Public API
//!
//! The main entry point is `SimulationEngine`: build it from an
//! `ExperimentConfig`, call `run()`, then read the flat result stream or
//! the stitched per-detector map.

pub mod engine;
pub mod generator;
pub mod geometry;
pub mod motion;
pub mod spatial_index;
pub mod stitching;
pub mod types;

// Re-export the engine and the commonly used value types
pub use engine::{EngineState, RunSummary, SimulationEngine};
pub use types::{Detection, Detector, Particle, ParticleType, RecordedDetection, SimulationError};
