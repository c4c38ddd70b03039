//! Result aggregation ("stitching"): grouping the chronological detection
//! stream by detector identity for export.
//!
//! The grouping key is the detector's stable array index, never its floating
//! position; two numerically close but unequal positions must not split into
//! separate buckets. Per-detector order preserves the recording order of the
//! raw stream (stable, never re-sorted).

use std::collections::BTreeMap;

use super::types::RecordedDetection;

/// Per-detector ordered detection sequences, keyed by detector index.
pub type StitchedResults = BTreeMap<usize, Vec<RecordedDetection>>;

/// Group the raw chronological result stream by detector index.
///
/// Does not mutate or re-sort the input; each bucket's order is the temporal
/// order in which that detector recorded its detections.
pub fn stitch(results: &[RecordedDetection]) -> StitchedResults {
    let mut stitched = StitchedResults::new();
    for record in results {
        stitched.entry(record.detector_index).or_default().push(record.clone());
    }
    stitched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::types::{Detection, ParticleType};
    use nalgebra::Vector3;

    fn record(detector_index: usize, time: f64) -> RecordedDetection {
        RecordedDetection {
            detector_index,
            detector_position: Vector3::new(detector_index as f64, 0.0, 0.0),
            detection: Detection {
                time,
                track_length: 0.1,
                particle_type: ParticleType::Neutron,
                direction: Vector3::new(1.0, 0.0, 0.0),
                is_short_track: false,
            },
        }
    }

    #[test]
    fn groups_by_detector_index_preserving_order() {
        let results = vec![record(1, 0.5), record(0, 1.0), record(1, 2.0), record(0, 3.0), record(1, 4.0)];
        let stitched = stitch(&results);
        assert_eq!(stitched.len(), 2);
        let times_0: Vec<f64> = stitched[&0].iter().map(|r| r.detection.time).collect();
        let times_1: Vec<f64> = stitched[&1].iter().map(|r| r.detection.time).collect();
        assert_eq!(times_0, vec![1.0, 3.0]);
        assert_eq!(times_1, vec![0.5, 2.0, 4.0]);
    }

    #[test]
    fn keys_iterate_in_detector_order() {
        let results = vec![record(7, 0.0), record(2, 0.0), record(5, 0.0)];
        let stitched = stitch(&results);
        let keys: Vec<usize> = stitched.keys().copied().collect();
        assert_eq!(keys, vec![2, 5, 7]);
    }

    #[test]
    fn empty_stream_stitches_to_empty_map() {
        assert!(stitch(&[]).is_empty());
    }
}
