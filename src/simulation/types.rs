//! Type definitions for the simulation.
//!
//! Contains the data structures shared across the simulation core:
//! - Particle and detection value types
//! - Detector state (reference position, current position, detection log)
//! - Domain error type for construction-time invariant violations

use nalgebra::Vector3;

use super::geometry;
use super::motion::DetectorPose;

/// Minimum norm a raw direction vector must have before normalization.
/// Anything below this is treated as degenerate (effectively zero).
pub const MIN_DIRECTION_NORM: f64 = 1e-8;

/// Error type for simulation invariant violations.
///
/// Configuration errors are fatal: they surface at construction time and
/// prevent an engine from starting. Geometry and timing edge cases are never
/// represented here; those are encoded as values (`IntersectOutcome`).
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// Raw particle direction norm at or below `MIN_DIRECTION_NORM`.
    InvalidDirection(f64),
    /// Detector half-size must be strictly positive.
    InvalidHalfSize(f64),
    /// Minimum track length must be strictly positive.
    InvalidMinTrackLength(f64),
    /// Particle speed must be strictly positive.
    InvalidSpeed(f64),
    /// Isotropic sampling produced only degenerate vectors within the
    /// bounded retry budget.
    DirectionSamplingFailed,
    /// `run()` was called on an engine that already finished its run.
    RunAlreadyFinished,
}

impl std::fmt::Display for SimulationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimulationError::InvalidDirection(norm) => {
                write!(f, "particle direction norm {} is below the minimum {}", norm, MIN_DIRECTION_NORM)
            }
            SimulationError::InvalidHalfSize(v) => write!(f, "detector half-size {} must be positive", v),
            SimulationError::InvalidMinTrackLength(v) => write!(f, "minimum track length {} must be positive", v),
            SimulationError::InvalidSpeed(v) => write!(f, "particle speed {} must be positive", v),
            SimulationError::DirectionSamplingFailed => write!(f, "direction sampling retry budget exhausted"),
            SimulationError::RunAlreadyFinished => write!(f, "simulation run already finished; build a fresh engine to re-run"),
        }
    }
}

impl std::error::Error for SimulationError {}

/// Particle species emitted by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleType {
    Neutron,
    Alpha,
}

impl ParticleType {
    /// Stable lowercase name used in export records.
    pub fn name(&self) -> &'static str {
        match self {
            ParticleType::Neutron => "neutron",
            ParticleType::Alpha => "alpha",
        }
    }

    /// Parse the export name back into a type (used by the CSV re-parser).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "neutron" => Some(ParticleType::Neutron),
            "alpha" => Some(ParticleType::Alpha),
            _ => None,
        }
    }
}

/// Immutable particle value: created by the generator for one step,
/// read by intersection tests, discarded when the step completes.
#[derive(Debug, Clone)]
pub struct Particle {
    pub particle_type: ParticleType,
    pub origin: Vector3<f64>,
    /// Unit direction. Guaranteed normalized by construction.
    pub direction: Vector3<f64>,
    pub emission_time: f64,
}

impl Particle {
    /// Construct a particle, normalizing `direction`.
    ///
    /// Fails with `InvalidDirection` when the raw direction norm is at or
    /// below `MIN_DIRECTION_NORM`.
    pub fn new(
        particle_type: ParticleType,
        origin: Vector3<f64>,
        direction: Vector3<f64>,
        emission_time: f64,
    ) -> Result<Self, SimulationError> {
        let norm = direction.norm();
        if norm <= MIN_DIRECTION_NORM {
            return Err(SimulationError::InvalidDirection(norm));
        }
        Ok(Self {
            particle_type,
            origin,
            direction: direction / norm,
            emission_time,
        })
    }
}

/// Value record produced per successful intersection.
#[derive(Debug, Clone)]
pub struct Detection {
    /// Absolute time the particle entered the detector volume.
    pub time: f64,
    /// Chord length of the particle track through the detector volume.
    pub track_length: f64,
    pub particle_type: ParticleType,
    /// Normalized particle direction.
    pub direction: Vector3<f64>,
    /// Track below the acceptance floor. Flagged, never silently dropped,
    /// so downstream consumers decide whether to filter.
    pub is_short_track: bool,
}

/// A detection tagged with the detector that produced it.
///
/// The detector index is the stable aggregation identity; the detector
/// position is captured at the moment of detection for export, never used
/// as a grouping key (floating-point keys silently split buckets).
#[derive(Debug, Clone)]
pub struct RecordedDetection {
    pub detector_index: usize,
    pub detector_position: Vector3<f64>,
    pub detection: Detection,
}

/// Outcome of a single particle-versus-detector intersection test.
#[derive(Debug, Clone)]
pub enum IntersectOutcome {
    /// The ray crosses the detector volume ahead of the particle.
    Hit(Detection),
    /// Geometric rejection: no intersection, or the box lies behind the ray.
    Miss,
    /// The computed detection time was negative. This indicates an
    /// inconsistent configuration and is surfaced as a recoverable
    /// per-particle skip, not a fatal error.
    TimeInconsistent,
}

/// Axis-aligned box detector.
///
/// `reference_position` is immutable; `position` is rewritten every step by
/// the motion model from reference + current rigid transform, never
/// accumulated incrementally. The detection log is append-only and owned
/// exclusively by this detector.
#[derive(Debug, Clone)]
pub struct Detector {
    reference_position: Vector3<f64>,
    position: Vector3<f64>,
    half_size: f64,
    min_track_length: f64,
    detection_log: Vec<Detection>,
}

impl Detector {
    /// Construct a detector at its reference position.
    ///
    /// Fails when `half_size` or `min_track_length` is not strictly positive.
    pub fn new(reference_position: Vector3<f64>, half_size: f64, min_track_length: f64) -> Result<Self, SimulationError> {
        if !(half_size > 0.0) {
            return Err(SimulationError::InvalidHalfSize(half_size));
        }
        if !(min_track_length > 0.0) {
            return Err(SimulationError::InvalidMinTrackLength(min_track_length));
        }
        Ok(Self {
            reference_position,
            position: reference_position,
            half_size,
            min_track_length,
            detection_log: Vec::new(),
        })
    }

    pub fn reference_position(&self) -> Vector3<f64> {
        self.reference_position
    }

    pub fn position(&self) -> Vector3<f64> {
        self.position
    }

    pub fn half_size(&self) -> f64 {
        self.half_size
    }

    /// Detections registered over the run, in recording order.
    pub fn detection_log(&self) -> &[Detection] {
        &self.detection_log
    }

    /// Rewrite the current position from the immutable reference and the
    /// given rigid transform.
    pub fn apply_pose(&mut self, pose: &DetectorPose) {
        self.position = pose.rotation * self.reference_position + pose.translation;
    }

    /// Slab-method intersection test against the current detector box.
    ///
    /// Pure function of particle and current box; registration into the
    /// detection log is a separate explicit call (`register`).
    pub fn intersect(&self, particle: &Particle, speed: f64) -> IntersectOutcome {
        let box_min = self.position.map(|c| c - self.half_size);
        let box_max = self.position.map(|c| c + self.half_size);

        let (t_near, t_far) = match geometry::ray_box_intersection(&particle.origin, &particle.direction, &box_min, &box_max) {
            Some(interval) => interval,
            None => return IntersectOutcome::Miss,
        };

        let track_length = particle.direction.norm() * (t_far - t_near);
        let detection_time = particle.emission_time + t_near / speed;
        if detection_time < 0.0 {
            return IntersectOutcome::TimeInconsistent;
        }

        IntersectOutcome::Hit(Detection {
            time: detection_time,
            track_length,
            particle_type: particle.particle_type,
            direction: particle.direction,
            is_short_track: track_length < self.min_track_length,
        })
    }

    /// Append a detection to this detector's own log.
    pub fn register(&mut self, detection: Detection) {
        self.detection_log.push(detection);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    #[test]
    fn zero_direction_fails_construction() {
        let err = Particle::new(ParticleType::Neutron, Vector3::zeros(), Vector3::zeros(), 0.0).unwrap_err();
        assert!(matches!(err, SimulationError::InvalidDirection(_)));
    }

    #[test]
    fn direction_is_normalized_at_construction() {
        let p = Particle::new(ParticleType::Alpha, Vector3::zeros(), Vector3::new(0.0, 3.0, 4.0), 0.0).unwrap();
        assert!((p.direction.norm() - 1.0).abs() < 1e-12);
        assert!((p.direction.y - 0.6).abs() < 1e-12);
        assert!((p.direction.z - 0.8).abs() < 1e-12);
    }

    #[test]
    fn detector_rejects_non_positive_dimensions() {
        assert!(matches!(
            Detector::new(Vector3::zeros(), 0.0, 0.1),
            Err(SimulationError::InvalidHalfSize(_))
        ));
        assert!(matches!(
            Detector::new(Vector3::zeros(), 0.05, -1.0),
            Err(SimulationError::InvalidMinTrackLength(_))
        ));
    }

    #[test]
    fn intersect_scenario_single_detector_at_origin() {
        // Detector at origin with half-size 0.05, speed 1.0, particle from
        // (-1,0,0) along +x emitted at t=0: detection at t=0.95, track 0.1.
        let detector = Detector::new(Vector3::zeros(), 0.05, 0.01).unwrap();
        assert_eq!(detector.half_size(), 0.05);
        let particle = Particle::new(ParticleType::Neutron, Vector3::new(-1.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0), 0.0).unwrap();
        match detector.intersect(&particle, 1.0) {
            IntersectOutcome::Hit(d) => {
                assert!((d.time - 0.95).abs() < 1e-9);
                assert!((d.track_length - 0.1).abs() < 1e-9);
                assert!(!d.is_short_track);
            }
            other => panic!("expected hit, got {:?}", other),
        }
    }

    #[test]
    fn intersect_is_translation_invariant() {
        let shift = Vector3::new(3.5, -2.0, 7.25);
        let detector_a = Detector::new(Vector3::new(1.0, 1.0, 0.0), 0.05, 0.01).unwrap();
        let detector_b = Detector::new(Vector3::new(1.0, 1.0, 0.0) + shift, 0.05, 0.01).unwrap();
        let dir = Vector3::new(0.3, 0.4, 0.1);
        let particle_a = Particle::new(ParticleType::Alpha, Vector3::new(0.0, 0.0, -0.2), dir, 2.0).unwrap();
        let particle_b = Particle::new(ParticleType::Alpha, Vector3::new(0.0, 0.0, -0.2) + shift, dir, 2.0).unwrap();

        match (detector_a.intersect(&particle_a, 1.0), detector_b.intersect(&particle_b, 1.0)) {
            (IntersectOutcome::Hit(a), IntersectOutcome::Hit(b)) => {
                assert!((a.track_length - b.track_length).abs() < 1e-9);
                assert!((a.time - b.time).abs() < 1e-9);
            }
            (IntersectOutcome::Miss, IntersectOutcome::Miss) => {}
            other => panic!("translation changed the outcome: {:?}", other),
        }
    }

    #[test]
    fn intersect_from_inside_starts_at_origin() {
        // Origin inside the box pointing outward: t_near = 0, the track is
        // the distance to the exit face.
        let detector = Detector::new(Vector3::zeros(), 0.05, 0.5).unwrap();
        let particle = Particle::new(ParticleType::Neutron, Vector3::new(0.01, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0), 1.0).unwrap();
        match detector.intersect(&particle, 2.0) {
            IntersectOutcome::Hit(d) => {
                assert!((d.time - 1.0).abs() < 1e-12, "t_near must be 0: time {}", d.time);
                assert!((d.track_length - 0.04).abs() < 1e-9);
                assert!(d.is_short_track, "0.04 is below the 0.5 acceptance floor");
            }
            other => panic!("expected hit, got {:?}", other),
        }
    }

    #[test]
    fn box_behind_ray_is_rejected_not_mirrored() {
        let detector = Detector::new(Vector3::zeros(), 0.05, 0.01).unwrap();
        let particle = Particle::new(ParticleType::Neutron, Vector3::new(1.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0), 0.0).unwrap();
        assert!(matches!(detector.intersect(&particle, 1.0), IntersectOutcome::Miss));
    }

    #[test]
    fn negative_detection_time_is_a_distinct_outcome() {
        let detector = Detector::new(Vector3::zeros(), 0.05, 0.01).unwrap();
        // Emission far in the past relative to a short flight time.
        let particle = Particle::new(ParticleType::Alpha, Vector3::new(-1.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0), -100.0).unwrap();
        assert!(matches!(detector.intersect(&particle, 1.0), IntersectOutcome::TimeInconsistent));
    }

    #[test]
    fn register_appends_in_order() {
        let mut detector = Detector::new(Vector3::zeros(), 0.05, 0.01).unwrap();
        for t in [1.0, 2.0, 3.0] {
            detector.register(Detection {
                time: t,
                track_length: 0.1,
                particle_type: ParticleType::Neutron,
                direction: Vector3::new(1.0, 0.0, 0.0),
                is_short_track: false,
            });
        }
        let times: Vec<f64> = detector.detection_log().iter().map(|d| d.time).collect();
        assert_eq!(times, vec![1.0, 2.0, 3.0]);
    }
}
