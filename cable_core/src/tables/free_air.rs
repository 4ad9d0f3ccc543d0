//! Free-air grouping factors for cables on trays and ladders.
//!
//! Multi-core and single-core cables use disjoint sets of arrangements.
//! Single-core arrangements are further split by formation (flat or
//! trefoil), each with its own table.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};

type RawTable = &'static [(u32, &'static [(u32, f64)])];

/// Cable construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CoreType {
    #[default]
    #[serde(rename = "Multicore")]
    Multicore,
    #[serde(rename = "Single Core")]
    SingleCore,
}

impl CoreType {
    pub const ALL: [CoreType; 2] = [CoreType::Multicore, CoreType::SingleCore];

    /// Label as stored in the calculation record
    pub fn label(&self) -> &'static str {
        match self {
            CoreType::Multicore => "Multicore",
            CoreType::SingleCore => "Single Core",
        }
    }

    /// Parse a stored label; anything other than "Single Core" is multicore.
    pub fn from_label(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("single core") {
            CoreType::SingleCore
        } else {
            CoreType::Multicore
        }
    }
}

impl std::fmt::Display for CoreType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Laying formation of single-core cables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Formation {
    #[default]
    Flat,
    Trefoil,
}

impl Formation {
    pub const ALL: [Formation; 2] = [Formation::Flat, Formation::Trefoil];

    pub fn label(&self) -> &'static str {
        match self {
            Formation::Flat => "Flat",
            Formation::Trefoil => "Trefoil",
        }
    }

    /// Parse a stored label; blank or unknown text means flat.
    pub fn from_label(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("trefoil") {
            Formation::Trefoil
        } else {
            Formation::Flat
        }
    }
}

impl std::fmt::Display for Formation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Two-level grouping table: trays/ladders → cables per tray → factor.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupingTable {
    rows: BTreeMap<u32, BTreeMap<u32, f64>>,
}

impl GroupingTable {
    fn from_raw(raw: RawTable) -> Self {
        let rows = raw
            .iter()
            .map(|(trays, cells)| (*trays, cells.iter().copied().collect()))
            .collect();
        GroupingTable { rows }
    }

    /// Factor for the given tray count and cables per tray
    pub fn factor(&self, trays: u32, cables_per_tray: u32) -> Option<f64> {
        self.rows.get(&trays)?.get(&cables_per_tray).copied()
    }

    /// Tray counts available in this table, ascending
    pub fn tray_counts(&self) -> Vec<u32> {
        self.rows.keys().copied().collect()
    }

    /// Union of cables-per-tray counts across all rows, ascending
    pub fn cable_counts(&self) -> Vec<u32> {
        let mut counts: Vec<u32> = self
            .rows
            .values()
            .flat_map(|row| row.keys().copied())
            .collect();
        counts.sort_unstable();
        counts.dedup();
        counts
    }
}

// ============================================================================
// Multi-core arrangements
// ============================================================================

pub const MC_PERFORATED_TRAY_TOUCHING: &str = "Horizontal Perforated Cable Tray (Touching)";
pub const MC_PERFORATED_TRAY_SPACED: &str = "Horizontal Perforated Cable Tray (Spaced)";
pub const MC_VERTICAL_TRAY_TOUCHING: &str = "Vertical Perforated Tray (Touching)";
pub const MC_VERTICAL_TRAY_SPACED: &str = "Vertical Perforated Tray (Spaced)";
pub const MC_UNPERFORATED_TRAY_TOUCHING: &str = "Unperforated Horizontal Cable Tray (Touching)";
pub const MC_LADDER_TOUCHING: &str = "Cable Ladder System (Touching)";
pub const MC_LADDER_SPACED: &str = "Cable Ladder System (Spaced)";

/// Multi-core arrangement names in presentation order
pub const MULTICORE_ARRANGEMENTS: [&str; 7] = [
    MC_PERFORATED_TRAY_TOUCHING,
    MC_PERFORATED_TRAY_SPACED,
    MC_VERTICAL_TRAY_TOUCHING,
    MC_VERTICAL_TRAY_SPACED,
    MC_UNPERFORATED_TRAY_TOUCHING,
    MC_LADDER_TOUCHING,
    MC_LADDER_SPACED,
];

const MC_RAW: [(&str, RawTable); 7] = [
    (
        MC_PERFORATED_TRAY_TOUCHING,
        &[
            (1, &[(1, 1.00), (2, 0.88), (3, 0.82), (4, 0.79), (6, 0.76), (9, 0.73)]),
            (2, &[(1, 1.00), (2, 0.87), (3, 0.80), (4, 0.77), (6, 0.73), (9, 0.68)]),
            (3, &[(1, 1.00), (2, 0.86), (3, 0.79), (4, 0.76), (6, 0.71), (9, 0.66)]),
            (6, &[(1, 1.00), (2, 1.00), (3, 0.77), (4, 0.73), (6, 0.68), (9, 0.64)]),
        ],
    ),
    (
        MC_PERFORATED_TRAY_SPACED,
        &[
            (1, &[(1, 1.00), (2, 1.00), (3, 0.98), (4, 0.95), (6, 0.91)]),
            (2, &[(1, 1.00), (2, 0.99), (3, 0.96), (4, 0.92), (6, 0.87)]),
            (3, &[(1, 1.00), (2, 0.98), (3, 0.95), (4, 0.91), (6, 0.85)]),
        ],
    ),
    (
        MC_VERTICAL_TRAY_TOUCHING,
        &[
            (1, &[(1, 1.00), (2, 0.88), (3, 0.82), (4, 0.78), (6, 0.73), (9, 0.72)]),
            (2, &[(1, 1.00), (2, 0.88), (3, 0.81), (4, 0.76), (6, 0.71), (9, 0.70)]),
        ],
    ),
    (
        MC_VERTICAL_TRAY_SPACED,
        &[
            (1, &[(1, 1.00), (2, 0.91), (3, 0.89), (4, 0.88), (6, 0.87)]),
            (2, &[(1, 1.00), (2, 0.91), (3, 0.88), (4, 0.87), (6, 0.85)]),
        ],
    ),
    (
        MC_UNPERFORATED_TRAY_TOUCHING,
        &[
            (1, &[(1, 0.97), (2, 0.84), (3, 0.78), (4, 0.75), (6, 0.71), (9, 0.68)]),
            (2, &[(1, 0.97), (2, 0.83), (3, 0.76), (4, 0.72), (6, 0.68), (9, 0.63)]),
            (3, &[(1, 0.97), (2, 0.82), (3, 0.75), (4, 0.71), (6, 0.66), (9, 0.61)]),
            (6, &[(1, 0.97), (2, 0.81), (3, 0.73), (4, 0.69), (6, 0.63), (9, 0.58)]),
        ],
    ),
    (
        MC_LADDER_TOUCHING,
        &[
            (1, &[(1, 1.00), (2, 0.87), (3, 0.82), (4, 0.80), (6, 0.79), (9, 0.78)]),
            (2, &[(1, 1.00), (2, 0.86), (3, 0.80), (4, 0.78), (6, 0.76), (9, 0.73)]),
            (3, &[(1, 1.00), (2, 0.85), (3, 0.79), (4, 0.76), (6, 0.73), (9, 0.70)]),
            (6, &[(1, 1.00), (2, 0.84), (3, 0.77), (4, 0.73), (6, 0.68), (9, 0.64)]),
        ],
    ),
    (
        MC_LADDER_SPACED,
        &[
            (1, &[(1, 1.00), (2, 1.00), (3, 1.00), (4, 1.00), (6, 1.00)]),
            (2, &[(1, 1.00), (2, 0.99), (3, 0.98), (4, 0.97), (6, 0.96)]),
            (3, &[(1, 1.00), (2, 0.98), (3, 0.97), (4, 0.96), (6, 0.93)]),
        ],
    ),
];

// ============================================================================
// Single-core arrangements
// ============================================================================

pub const SC_PERFORATED_SPACED: &str = "Horizontal Perforated Cable (Spaced)";
pub const SC_VERTICAL_TRAY_SPACED: &str = "Vertical Perforated Tray (Spaced)";
pub const SC_LADDER_SPACED: &str = "Horizontal Ladder System (Spaced)";

/// Single-core arrangement names in presentation order
pub const SINGLE_CORE_ARRANGEMENTS: [&str; 3] =
    [SC_PERFORATED_SPACED, SC_VERTICAL_TRAY_SPACED, SC_LADDER_SPACED];

const SC_TREFOIL_RAW: [(&str, RawTable); 3] = [
    (
        SC_PERFORATED_SPACED,
        &[
            (1, &[(1, 1.00), (2, 0.98), (3, 0.96)]),
            (2, &[(1, 0.97), (2, 0.93), (3, 0.89)]),
            (3, &[(1, 0.96), (2, 0.92), (3, 0.86)]),
        ],
    ),
    (
        SC_VERTICAL_TRAY_SPACED,
        &[
            (1, &[(1, 1.00), (2, 0.91), (3, 0.89)]),
            (2, &[(1, 1.00), (2, 0.90), (3, 0.86)]),
        ],
    ),
    (
        SC_LADDER_SPACED,
        &[
            (1, &[(1, 1.00), (2, 1.00), (3, 1.00)]),
            (2, &[(1, 0.97), (2, 0.95), (3, 0.93)]),
            (3, &[(1, 0.96), (2, 0.94), (3, 0.90)]),
        ],
    ),
];

// No flat-formation data exists for the ladder arrangement; it reuses the
// trefoil table (see `grouping_table`).
const SC_FLAT_RAW: [(&str, RawTable); 2] = [
    (
        SC_PERFORATED_SPACED,
        &[
            (1, &[(1, 0.98), (2, 0.91), (3, 0.87)]),
            (2, &[(1, 0.96), (2, 0.87), (3, 0.81)]),
            (3, &[(1, 0.95), (2, 0.85), (3, 0.78)]),
        ],
    ),
    (
        SC_VERTICAL_TRAY_SPACED,
        &[(1, &[(1, 0.96), (2, 0.86)]), (2, &[(1, 0.95), (2, 0.84)])],
    ),
];

fn build(raw: &[(&'static str, RawTable)]) -> BTreeMap<&'static str, GroupingTable> {
    raw.iter()
        .map(|(name, table)| (*name, GroupingTable::from_raw(table)))
        .collect()
}

static MULTICORE: Lazy<BTreeMap<&'static str, GroupingTable>> = Lazy::new(|| build(&MC_RAW));
static SINGLE_CORE_TREFOIL: Lazy<BTreeMap<&'static str, GroupingTable>> =
    Lazy::new(|| build(&SC_TREFOIL_RAW));
static SINGLE_CORE_FLAT: Lazy<BTreeMap<&'static str, GroupingTable>> =
    Lazy::new(|| build(&SC_FLAT_RAW));

/// Arrangement names valid for a core type, in presentation order
pub fn arrangements(core: CoreType) -> &'static [&'static str] {
    match core {
        CoreType::Multicore => &MULTICORE_ARRANGEMENTS,
        CoreType::SingleCore => &SINGLE_CORE_ARRANGEMENTS,
    }
}

/// Select the grouping table for an arrangement.
///
/// Formation is ignored for multi-core cables.
pub fn grouping_table(core: CoreType, formation: Formation, arrangement: &str) -> Option<&'static GroupingTable> {
    match (core, formation) {
        (CoreType::Multicore, _) => MULTICORE.get(arrangement),
        (CoreType::SingleCore, Formation::Trefoil) => SINGLE_CORE_TREFOIL.get(arrangement),
        (CoreType::SingleCore, Formation::Flat) => SINGLE_CORE_FLAT
            .get(arrangement)
            .or_else(|| match arrangement {
                SC_LADDER_SPACED => SINGLE_CORE_TREFOIL.get(arrangement),
                _ => None,
            }),
    }
}

/// Look up a free-air grouping factor.
///
/// Returns `CalcError::LookupMiss` when the arrangement is not valid for the
/// core type/formation or the table has no cell for the counts.
pub fn grouping_factor(
    core: CoreType,
    formation: Formation,
    arrangement: &str,
    trays: u32,
    cables_per_tray: u32,
) -> CalcResult<f64> {
    let table_name = match core {
        CoreType::Multicore => "free-air grouping (multicore)".to_string(),
        CoreType::SingleCore => format!("free-air grouping (single core, {})", formation.label()),
    };
    let table = grouping_table(core, formation, arrangement)
        .ok_or_else(|| CalcError::lookup_miss(&table_name, arrangement))?;
    table.factor(trays, cables_per_tray).ok_or_else(|| {
        CalcError::lookup_miss(
            table_name,
            format!("{} / {} trays / {} cables", arrangement, trays, cables_per_tray),
        )
    })
}
