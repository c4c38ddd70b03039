//! Simulation engine: the time-stepped control loop.
//!
//! Single-threaded, synchronous, deterministic. One iteration per fixed time
//! step until the clock reaches the horizon:
//! 1. Move detectors for the current clock (rigid pose from reference).
//! 2. Rebuild the spatial index over the new positions.
//! 3. Emit the step's particle batch.
//! 4. Intersect each particle against the pruned candidate set.
//! 5. Advance the clock.
//!
//! Steps are strictly sequential: detector positions depend on the clock and
//! the index must reflect them before any particle test runs. There is no
//! I/O in the hot loop; exports happen after the run against the finished
//! results.

use log::{debug, info, warn};

use crate::config::ExperimentConfig;

use super::generator::{Generator, PulseTimingModel};
use super::motion::{MotionModel, Trajectory};
use super::spatial_index::SpatialIndex;
use super::stitching::{self, StitchedResults};
use super::types::{Detector, IntersectOutcome, RecordedDetection, SimulationError};

/// Engine lifecycle. A finished run is immutable; re-running requires a
/// fresh engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    Finished,
}

/// Counters summarizing a completed run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub steps: u64,
    pub total_detections: usize,
    pub neutron_detections: usize,
    pub alpha_detections: usize,
    /// Candidate detectors tested but rejected by geometry.
    pub missed_count: u64,
    /// Per-particle skips caused by a negative computed detection time.
    pub time_rejected_count: u64,
}

/// Owns the clock and drives generator, motion model, spatial index, and
/// detector intersection tests per step, accumulating results.
pub struct SimulationEngine {
    generator: Generator,
    detectors: Vec<Detector>,
    motion: MotionModel,
    batch: crate::config::BatchSizes,
    particle_speed: f64,
    query_radius: f64,
    time_step: f64,
    horizon: f64,
    clock: f64,
    state: EngineState,
    results: Vec<RecordedDetection>,
    stitched: StitchedResults,
    missed_count: u64,
    time_rejected_count: u64,
}

impl SimulationEngine {
    /// Build an engine from a validated configuration.
    ///
    /// Construction fails on any invariant violation (non-positive speed or
    /// detector dimensions); an invalid configuration must never start.
    pub fn new(config: &ExperimentConfig) -> Result<Self, SimulationError> {
        if config.particle_speed <= 0.0 {
            return Err(SimulationError::InvalidSpeed(config.particle_speed));
        }

        let detectors = config
            .detector_reference_positions()
            .into_iter()
            .map(|position| Detector::new(position, config.detector_half_size, config.min_track_length))
            .collect::<Result<Vec<_>, _>>()?;

        let generator = Generator::new(
            config.generator_position_vector(),
            PulseTimingModel::from_config(&config.pulse_distribution),
            config.paired_emission,
            config.seed,
        );

        let motion = MotionModel::new(config.tilt_axis, config.tilt_degrees, Trajectory::from_config(&config.trajectory));

        info!("Engine initialized with {} detectors", detectors.len());

        Ok(Self {
            generator,
            detectors,
            motion,
            batch: config.particles_per_step.clone(),
            particle_speed: config.particle_speed,
            query_radius: config.query_radius,
            time_step: config.time_step,
            horizon: config.horizon,
            clock: 0.0,
            state: EngineState::Idle,
            results: Vec::new(),
            stitched: StitchedResults::new(),
            missed_count: 0,
            time_rejected_count: 0,
        })
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn detectors(&self) -> &[Detector] {
        &self.detectors
    }

    /// Flat chronological detection stream (pre-aggregation), for consumers
    /// that need emission order rather than per-detector grouping.
    pub fn results(&self) -> &[RecordedDetection] {
        &self.results
    }

    /// Per-detector stitched results. Empty until the run finishes.
    pub fn stitched_results(&self) -> &StitchedResults {
        &self.stitched
    }

    /// Run the step loop from the current clock to the horizon.
    ///
    /// Returns `RunAlreadyFinished` on a finished engine; the completed run
    /// is immutable.
    pub fn run(&mut self) -> Result<RunSummary, SimulationError> {
        if self.state == EngineState::Finished {
            return Err(SimulationError::RunAlreadyFinished);
        }
        self.state = EngineState::Running;
        info!("Starting run: horizon {}, step {}", self.horizon, self.time_step);

        let mut steps: u64 = 0;
        while self.clock < self.horizon {
            self.step()?;
            steps += 1;
        }

        self.stitched = stitching::stitch(&self.results);
        self.state = EngineState::Finished;

        let summary = self.summarize(steps);
        info!(
            "Run finished after {} steps: {} detections ({} neutron, {} alpha), {} geometric misses, {} time-rejected",
            summary.steps,
            summary.total_detections,
            summary.neutron_detections,
            summary.alpha_detections,
            summary.missed_count,
            summary.time_rejected_count
        );
        Ok(summary)
    }

    /// One iteration of the control loop at the current clock.
    fn step(&mut self) -> Result<(), SimulationError> {
        let pose = self.motion.pose(self.clock);
        for detector in &mut self.detectors {
            detector.apply_pose(&pose);
        }
        debug!("Detectors moved to pose translation {:?} at t={}", pose.translation, self.clock);

        let positions: Vec<_> = self.detectors.iter().map(|d| d.position()).collect();
        let index = SpatialIndex::build(&positions, self.query_radius);

        let particles = self.generator.emit(self.clock, &self.batch)?;
        for particle in &particles {
            let candidates = index.query(&particle.origin, self.query_radius);
            for detector_index in candidates {
                match self.detectors[detector_index].intersect(particle, self.particle_speed) {
                    IntersectOutcome::Hit(detection) => {
                        debug!(
                            "Detector {} registered {} with track {} at t={}",
                            detector_index,
                            detection.particle_type.name(),
                            detection.track_length,
                            detection.time
                        );
                        self.detectors[detector_index].register(detection.clone());
                        self.results.push(RecordedDetection {
                            detector_index,
                            detector_position: self.detectors[detector_index].position(),
                            detection,
                        });
                    }
                    IntersectOutcome::Miss => {
                        self.missed_count += 1;
                    }
                    IntersectOutcome::TimeInconsistent => {
                        self.time_rejected_count += 1;
                        warn!(
                            "Negative detection time for {} emitted at t={}; particle skipped",
                            particle.particle_type.name(),
                            particle.emission_time
                        );
                    }
                }
            }
        }

        self.clock += self.time_step;
        Ok(())
    }

    fn summarize(&self, steps: u64) -> RunSummary {
        use super::types::ParticleType;
        let neutron_detections = self.results.iter().filter(|r| r.detection.particle_type == ParticleType::Neutron).count();
        let alpha_detections = self.results.iter().filter(|r| r.detection.particle_type == ParticleType::Alpha).count();
        RunSummary {
            steps,
            total_detections: self.results.len(),
            neutron_detections,
            alpha_detections,
            missed_count: self.missed_count,
            time_rejected_count: self.time_rejected_count,
        }
    }
}
