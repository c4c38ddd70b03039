//! Export of stitched simulation results.
//!
//! Two encodings, both derived losslessly from the stitched map:
//! - a tabular CSV record with fixed six-decimal numeric fields, and
//! - a keyed JSON structure mapping the rounded detector reference position
//!   to that detector's ordered detection list.
//!
//! Exports are written into a timestamped `history/<stamp>/` directory. An
//! existing export target is renamed aside rather than silently overwritten.
//! I/O failures here are isolated to the export boundary: callers log them
//! and keep the in-memory result set authoritative.

use anyhow::Context;
use chrono::Local;
use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::simulation::engine::SimulationEngine;
use crate::simulation::types::ParticleType;

/// Header of the tabular export, in column order.
pub const CSV_COLUMNS: [&str; 9] = [
    "detector_x",
    "detector_y",
    "detector_z",
    "time",
    "particle_type",
    "track_length",
    "dir_x",
    "dir_y",
    "dir_z",
];

/// One parsed row of the tabular export.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvRecord {
    pub detector_position: [f64; 3],
    pub time: f64,
    pub particle_type: ParticleType,
    pub track_length: f64,
    pub direction: [f64; 3],
}

/// One detection entry of the keyed JSON encoding.
#[derive(Debug, Clone, Serialize)]
struct JsonDetection {
    time: f64,
    particle_type: &'static str,
    track_length: f64,
    direction: [f64; 3],
    is_short_track: bool,
    /// Detector position at the moment of detection (the array moves).
    detector_position: [f64; 3],
}

/// Directory for this run's artifacts: `history/<local timestamp>/`.
pub fn history_directory() -> PathBuf {
    Path::new("history").join(Local::now().format("%Y%m%d_%H%M%S").to_string())
}

/// Rename an existing export target aside instead of overwriting it.
///
/// The previous artifact is preserved under a timestamped `.bak` name.
fn preserve_existing(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        let backup = path.with_extension(format!("{}.bak", Local::now().format("%Y%m%d%H%M%S")));
        warn!("Export target {} exists, renaming aside to {}", path.display(), backup.display());
        fs::rename(path, &backup).with_context(|| format!("Failed to rename {} aside", path.display()))?;
    }
    Ok(())
}

/// Write the stitched results of a finished engine as a CSV table.
///
/// Rows are emitted per detector in index order, each detector's detections
/// in recording order; every numeric field is fixed to six decimal places.
pub fn export_csv(engine: &SimulationEngine, directory: &Path, filename: &str) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(directory).with_context(|| format!("Failed to create export directory {}", directory.display()))?;
    let path = directory.join(filename);
    preserve_existing(&path)?;

    let mut out = String::new();
    out.push_str(&CSV_COLUMNS.join(","));
    out.push('\n');
    for records in engine.stitched_results().values() {
        for record in records {
            let p = record.detector_position;
            let d = &record.detection;
            out.push_str(&format!(
                "{:.6},{:.6},{:.6},{:.6},{},{:.6},{:.6},{:.6},{:.6}\n",
                p.x,
                p.y,
                p.z,
                d.time,
                d.particle_type.name(),
                d.track_length,
                d.direction.x,
                d.direction.y,
                d.direction.z
            ));
        }
    }

    let mut file = fs::File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(out.as_bytes()).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Results exported to {} as CSV", path.display());
    Ok(path)
}

/// Write the stitched results as a keyed JSON structure.
///
/// The key is the detector's reference position rounded to six decimals (a
/// formatting of the stable index-keyed map, never used for grouping); the
/// value is that detector's ordered detection list.
pub fn export_json(engine: &SimulationEngine, directory: &Path, filename: &str) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(directory).with_context(|| format!("Failed to create export directory {}", directory.display()))?;
    let path = directory.join(filename);
    preserve_existing(&path)?;

    let mut keyed: BTreeMap<String, Vec<JsonDetection>> = BTreeMap::new();
    for (detector_index, records) in engine.stitched_results() {
        let reference = engine.detectors()[*detector_index].reference_position();
        let key = format!("{:.6},{:.6},{:.6}", reference.x, reference.y, reference.z);
        let entries = records
            .iter()
            .map(|record| JsonDetection {
                time: record.detection.time,
                particle_type: record.detection.particle_type.name(),
                track_length: record.detection.track_length,
                direction: [record.detection.direction.x, record.detection.direction.y, record.detection.direction.z],
                is_short_track: record.detection.is_short_track,
                detector_position: [record.detector_position.x, record.detector_position.y, record.detector_position.z],
            })
            .collect();
        keyed.insert(key, entries);
    }

    let data = serde_json::to_string_pretty(&keyed).context("Failed to serialize results")?;
    fs::write(&path, data).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Results exported to {} as JSON", path.display());
    Ok(path)
}

/// Parse a tabular export back into records (analyzer-style re-reader, also
/// backing the round-trip test).
pub fn parse_csv_export(path: &Path) -> anyhow::Result<Vec<CsvRecord>> {
    let data = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let mut lines = data.lines();
    let header = lines.next().context("Empty export file")?;
    anyhow::ensure!(header == CSV_COLUMNS.join(","), "Unexpected header: {}", header);

    let mut records = Vec::new();
    for (line_no, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();
        anyhow::ensure!(fields.len() == CSV_COLUMNS.len(), "Line {}: expected {} fields, got {}", line_no + 2, CSV_COLUMNS.len(), fields.len());

        let num = |i: usize| -> anyhow::Result<f64> {
            fields[i].parse::<f64>().with_context(|| format!("Line {}: bad number in column {}", line_no + 2, CSV_COLUMNS[i]))
        };
        let particle_type = ParticleType::from_name(fields[4]).with_context(|| format!("Line {}: unknown particle type {}", line_no + 2, fields[4]))?;

        records.push(CsvRecord {
            detector_position: [num(0)?, num(1)?, num(2)?],
            time: num(3)?,
            particle_type,
            track_length: num(5)?,
            direction: [num(6)?, num(7)?, num(8)?],
        });
    }
    Ok(records)
}
