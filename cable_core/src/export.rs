//! # Export
//!
//! Read-only renderings of one calculation: a flat CSV dump (one header
//! row, one value row) and a plain-text summary grouped the way an engineer
//! reviews a circuit.

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::errors::{CalcError, CalcResult};
use crate::project::{sanitize_name, ProjectInfo};
use crate::record::CalcRecord;
use crate::schema::field;

fn csv_error(e: impl std::fmt::Display) -> CalcError {
    CalcError::serialization(format!("CSV: {}", e))
}

fn write_record<W: std::io::Write>(writer: W, record: &CalcRecord) -> CalcResult<W> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(record.names()).map_err(csv_error)?;
    csv.write_record(record.iter().map(|(_, v)| v.to_string()))
        .map_err(csv_error)?;
    csv.into_inner().map_err(csv_error)
}

/// The record as CSV text, fields in record order
pub fn export_csv_string(record: &CalcRecord) -> CalcResult<String> {
    let bytes = write_record(Vec::new(), record)?;
    String::from_utf8(bytes).map_err(csv_error)
}

/// File name for an exported calculation: `<project>_<calc>.csv`
pub fn export_file_name(project: &ProjectInfo, record: &CalcRecord) -> String {
    let calc = record.key();
    let calc = if calc.is_empty() { "row".to_string() } else { calc };
    format!("{}_{}.csv", sanitize_name(project.display_name()), sanitize_name(&calc))
}

/// Write the record to `<dir>/<project>_<calc>.csv`, returning the path.
pub fn export_csv(record: &CalcRecord, project: &ProjectInfo, dir: &Path) -> CalcResult<PathBuf> {
    let path = dir.join(export_file_name(project, record));
    let file = File::create(&path)
        .map_err(|e| CalcError::file_error("create export", path.display().to_string(), e.to_string()))?;
    write_record(file, record)?;
    info!(path = %path.display(), "calculation exported");
    Ok(path)
}

/// Plain-text summary of a calculation.
///
/// Values are shown as stored; run the record through
/// [`crate::pipeline::recompute`] first so derived values are current.
pub fn summary(project: &ProjectInfo, record: &CalcRecord) -> String {
    let g = |name: &str| record.text(name);
    let mut lines = Vec::new();

    lines.push(format!(
        "Project: {} ({})",
        project.project_title(),
        project.project_number()
    ));
    lines.push(format!(
        "Calc No: {}  |  Circuit: {}  |  Cable Tag: {}",
        g(field::CALCULATION_NUMBER),
        g(field::CIRCUIT_ID),
        g(field::CABLE_TAG)
    ));
    lines.push(format!(
        "From: {} ({})  →  To: {} ({})",
        g(field::FROM_DESCRIPTION),
        g(field::FROM_TAG),
        g(field::TO_DESCRIPTION),
        g(field::TO_TAG)
    ));
    lines.push(String::new());

    lines.push("System".to_string());
    lines.push(format!(
        "  Phase: {}  VLL: {} V  Vph: {} V  kVA: {}  FLC: {} A  Istart: {} A",
        g(field::PHASE),
        g(field::SYSTEM_VOLTAGE_LL),
        g(field::PHASE_VOLTAGE),
        g(field::APPARENT_POWER_KVA),
        g(field::FULL_LOAD_CURRENT),
        g(field::STARTING_CURRENT)
    ));
    lines.push(format!(
        "  PF: {}  Eff%: {}  StartPF: {}  Length: {} m",
        g(field::POWER_FACTOR),
        g(field::EFFICIENCY_PCT),
        g(field::START_PF),
        g(field::CIRCUIT_LENGTH_M)
    ));
    lines.push(String::new());

    lines.push("Protection".to_string());
    lines.push(format!(
        "  Device In: {} A  Overload%: {}  Type: {}  I2×In: {}  Iz: {} A  Result: {}",
        g(field::PROTECTIVE_DEVICE_A),
        g(field::OVERLOAD_SETTING_PCT),
        g(field::PROTECTION_TYPE),
        g(field::I2_FACTOR),
        g(field::IZ_TOTAL),
        g(field::OVERLOAD_CHECK)
    ));
    lines.push(String::new());

    lines.push("Installation & Environment".to_string());
    lines.push(format!(
        "  Cable: {}  Install: {}  Core: {} {}",
        g(field::TYPE_OF_CABLE),
        g(field::TYPE_OF_INSTALLATION),
        g(field::CORE_TYPE),
        g(field::FORMATION)
    ));
    lines.push(format!(
        "  Ground/Ducts CF: Depth {}, Soil {}, Group {}; Free Air CF: {}; Temp CF: {}",
        g(field::DEPTH_CF),
        g(field::SOIL_RESISTIVITY_CF),
        g(field::GROUND_OR_DUCTS_CF),
        g(field::IN_AIR_DERATING_FACTOR),
        g(field::TEMPERATURE_DERATING_FACTOR)
    ));
    lines.push(format!("  ODF: {}", g(field::OVERALL_DERATING_FACTOR)));
    lines.push(String::new());

    lines.push("Voltage Drop".to_string());
    lines.push(format!(
        "  r: {} Ω/km  x: {} Ω/km  |  Steady: {} V ({}%), {}  |  Start: {} V ({}%), {}",
        g(field::CABLE_R),
        g(field::CABLE_X),
        g(field::STEADY_VD_V),
        g(field::STEADY_VD_PCT),
        g(field::STEADY_VD_OK),
        g(field::STARTING_VD_V),
        g(field::STARTING_VD_PCT),
        g(field::STARTING_VD_OK)
    ));

    lines.join("\n")
}
