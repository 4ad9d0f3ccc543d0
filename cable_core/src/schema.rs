//! # Calculation Schema
//!
//! Canonical field names, their input/derived classification, and the
//! append-only column registry used by the project store.
//!
//! The canonical order is the cross-tool contract: stores written by other
//! tools with the same header list can be opened without remapping, and a
//! store that predates newer fields is migrated by appending the missing
//! names at the end.

use serde::{Deserialize, Serialize};

/// Canonical calculation field names.
pub mod field {
    // Identity / context
    pub const CALCULATION_NUMBER: &str = "CalculationNumber";
    pub const FROM_DESCRIPTION: &str = "FromDescription";
    pub const TO_DESCRIPTION: &str = "ToDescription";
    pub const FROM_TAG: &str = "FromTag";
    pub const TO_TAG: &str = "ToTag";
    pub const CIRCUIT_ID: &str = "CircuitID";
    pub const CABLE_TAG: &str = "CableTag";

    // Load & system
    pub const PHASE: &str = "Phase";
    pub const SYSTEM_VOLTAGE_LL: &str = "SystemVoltageLL_V";
    pub const PHASE_VOLTAGE: &str = "PhaseVoltage_V";
    pub const EQUIPMENT_RATING_KW: &str = "EquipmentRating_kW";
    pub const POWER_FACTOR: &str = "PowerFactor";
    pub const EFFICIENCY_PCT: &str = "Efficiency_pct";
    pub const START_FACTOR: &str = "StartFactor";
    pub const START_PF: &str = "StartPF";
    pub const APPARENT_POWER_KVA: &str = "ApparentPower_kVA";
    pub const FULL_LOAD_CURRENT: &str = "FullLoadCurrent_A";
    pub const STARTING_CURRENT: &str = "StartingCurrent_A";
    pub const PROTECTIVE_DEVICE_A: &str = "ProtectiveDevice_A";
    pub const OVERLOAD_SETTING_PCT: &str = "OverloadSetting_pct";
    pub const CIRCUIT_LENGTH_M: &str = "CircuitLength_m";

    // Installation & environment
    pub const TYPE_OF_CABLE: &str = "TypeOfCable";
    pub const TYPE_OF_INSTALLATION: &str = "TypeOfInstallation";
    pub const CORE_TYPE: &str = "CoreType";
    pub const FORMATION: &str = "Formation";
    pub const DEPTH_OF_CABLE: &str = "DepthOfCable";
    pub const DEPTH_CF: &str = "DepthCF";
    pub const SOIL_THERMAL_RESISTIVITY: &str = "SoilThermalResistivity";
    pub const SOIL_RESISTIVITY_CF: &str = "SoilResistivityCF";
    pub const NUMBER_OF_CIRCUITS: &str = "NumberOfCircuits";
    pub const GROUND_OR_DUCTS_CF: &str = "GroundOrDuctsCF";
    pub const SPACING_BETWEEN_CIRCUITS: &str = "SpacingBetweenCircuits";
    pub const CABLE_MANAGEMENT: &str = "CableManagement";
    pub const NUMBER_OF_TRAYS: &str = "NumberOfTraysLadders";
    pub const CABLES_PER_TRAY: &str = "NumberOfCablesPerTray";
    pub const IN_AIR_DERATING_FACTOR: &str = "InAirDeratingFactor";
    pub const AMBIENT_TEMPERATURE_C: &str = "AmbientTemperature_C";
    pub const TEMPERATURE_DERATING_FACTOR: &str = "TemperatureDeratingFactor";
    pub const OVERALL_DERATING_FACTOR: &str = "OverallDeratingFactor";

    // Overload protection
    pub const PROTECTION_TYPE: &str = "ProtectionType";
    pub const I2_FACTOR: &str = "I2_Factor";
    pub const IZ_SINGLE: &str = "CableRatedCurrent_Iz_single";
    pub const CABLES_IN_PARALLEL: &str = "CablesInParallel_n";
    pub const IZ_TOTAL: &str = "TotalCableRating_Iz";
    pub const OVERLOAD_CHECK: &str = "OverloadCheck_OK";

    // Voltage drop
    pub const CABLE_R: &str = "Cable_r_ohm_per_km";
    pub const CABLE_X: &str = "Cable_x_ohm_per_km";
    pub const STEADY_VD_V: &str = "SteadyVD_V";
    pub const STEADY_VD_PCT: &str = "SteadyVD_pct";
    pub const STEADY_VD_LIMIT_PCT: &str = "SteadyVD_limit_pct";
    pub const STEADY_VD_OK: &str = "SteadyVD_OK";
    pub const STARTING_VD_V: &str = "StartingVD_V";
    pub const STARTING_VD_PCT: &str = "StartingVD_pct";
    pub const STARTING_VD_LIMIT_PCT: &str = "StartingVD_limit_pct";
    pub const STARTING_VD_OK: &str = "StartingVD_OK";

    pub const SAVED_AT: &str = "SavedAt";
}

/// Who owns a field: the operator or the recalculation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    /// Entered by the operator
    Input,
    /// Written only by the pipeline (or the store, for `SavedAt`)
    Derived,
}

/// A canonical field and its classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn input(name: &'static str) -> FieldSpec {
    FieldSpec { name, kind: FieldKind::Input }
}

const fn derived(name: &'static str) -> FieldSpec {
    FieldSpec { name, kind: FieldKind::Derived }
}

/// Canonical calculation fields in column order.
pub const CANONICAL_FIELDS: [FieldSpec; 56] = {
    use field::*;
    [
        input(CALCULATION_NUMBER),
        input(FROM_DESCRIPTION),
        input(TO_DESCRIPTION),
        input(FROM_TAG),
        input(TO_TAG),
        input(CIRCUIT_ID),
        input(CABLE_TAG),
        input(PHASE),
        input(SYSTEM_VOLTAGE_LL),
        derived(PHASE_VOLTAGE),
        input(EQUIPMENT_RATING_KW),
        input(POWER_FACTOR),
        input(EFFICIENCY_PCT),
        input(START_FACTOR),
        input(START_PF),
        derived(APPARENT_POWER_KVA),
        derived(FULL_LOAD_CURRENT),
        derived(STARTING_CURRENT),
        input(PROTECTIVE_DEVICE_A),
        input(OVERLOAD_SETTING_PCT),
        input(CIRCUIT_LENGTH_M),
        input(TYPE_OF_CABLE),
        input(TYPE_OF_INSTALLATION),
        input(CORE_TYPE),
        input(FORMATION),
        input(DEPTH_OF_CABLE),
        input(DEPTH_CF),
        input(SOIL_THERMAL_RESISTIVITY),
        input(SOIL_RESISTIVITY_CF),
        input(NUMBER_OF_CIRCUITS),
        input(GROUND_OR_DUCTS_CF),
        input(SPACING_BETWEEN_CIRCUITS),
        input(CABLE_MANAGEMENT),
        input(NUMBER_OF_TRAYS),
        input(CABLES_PER_TRAY),
        derived(IN_AIR_DERATING_FACTOR),
        input(AMBIENT_TEMPERATURE_C),
        derived(TEMPERATURE_DERATING_FACTOR),
        derived(OVERALL_DERATING_FACTOR),
        input(PROTECTION_TYPE),
        input(I2_FACTOR),
        input(IZ_SINGLE),
        input(CABLES_IN_PARALLEL),
        derived(IZ_TOTAL),
        derived(OVERLOAD_CHECK),
        input(CABLE_R),
        input(CABLE_X),
        derived(STEADY_VD_V),
        derived(STEADY_VD_PCT),
        input(STEADY_VD_LIMIT_PCT),
        derived(STEADY_VD_OK),
        derived(STARTING_VD_V),
        derived(STARTING_VD_PCT),
        input(STARTING_VD_LIMIT_PCT),
        derived(STARTING_VD_OK),
        derived(SAVED_AT),
    ]
};

/// Canonical field names in column order
pub fn canonical_names() -> impl Iterator<Item = &'static str> {
    CANONICAL_FIELDS.iter().map(|f| f.name)
}

/// Classification of a field name.
///
/// Names outside the canonical list are extension columns and count as
/// inputs: the pipeline never writes them.
pub fn kind_of(name: &str) -> FieldKind {
    CANONICAL_FIELDS
        .iter()
        .find(|f| f.name == name)
        .map(|f| f.kind)
        .unwrap_or(FieldKind::Input)
}

/// True if the pipeline owns this field
pub fn is_derived(name: &str) -> bool {
    kind_of(name) == FieldKind::Derived
}

/// Append-only column registry for the calculation table.
///
/// Columns are never removed or reordered; new names go to the end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Schema {
    columns: Vec<String>,
}

impl Schema {
    /// Schema holding exactly the canonical columns
    pub fn canonical() -> Self {
        Schema {
            columns: canonical_names().map(str::to_string).collect(),
        }
    }

    /// Wrap an existing header row as-is
    pub fn from_columns(columns: Vec<String>) -> Self {
        Schema { columns }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Column index for `name`, appending a new column if needed.
    pub fn ensure(&mut self, name: &str) -> usize {
        match self.index_of(name) {
            Some(idx) => idx,
            None => {
                self.columns.push(name.to_string());
                self.columns.len() - 1
            }
        }
    }

    /// Append every canonical column that is missing, in canonical order.
    ///
    /// Returns the names that were added.
    pub fn migrate_to_canonical(&mut self) -> Vec<String> {
        let missing: Vec<String> = canonical_names()
            .filter(|name| self.index_of(name).is_none())
            .map(str::to_string)
            .collect();
        self.columns.extend(missing.iter().cloned());
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order_endpoints() {
        let names: Vec<_> = canonical_names().collect();
        assert_eq!(names.first(), Some(&field::CALCULATION_NUMBER));
        assert_eq!(names.last(), Some(&field::SAVED_AT));
        assert_eq!(names.len(), 56);
    }

    #[test]
    fn test_canonical_names_unique() {
        let mut names: Vec<_> = canonical_names().collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), CANONICAL_FIELDS.len());
    }

    #[test]
    fn test_classification() {
        assert!(is_derived(field::FULL_LOAD_CURRENT));
        assert!(is_derived(field::OVERALL_DERATING_FACTOR));
        assert!(is_derived(field::SAVED_AT));
        assert!(!is_derived(field::SYSTEM_VOLTAGE_LL));
        assert!(!is_derived(field::DEPTH_CF));
        assert!(!is_derived("SomeCustomColumn"));
    }

    #[test]
    fn test_ensure_appends_once() {
        let mut schema = Schema::canonical();
        let idx = schema.ensure("Remarks");
        assert_eq!(idx, 56);
        assert_eq!(schema.ensure("Remarks"), 56);
        assert_eq!(schema.ensure(field::PHASE), 7);
        assert_eq!(schema.len(), 57);
    }

    #[test]
    fn test_migration_appends_missing_at_end() {
        let mut columns: Vec<String> = canonical_names().map(str::to_string).collect();
        columns.retain(|c| c != field::CABLE_R && c != field::STEADY_VD_OK && c != field::SAVED_AT);
        columns.push("Remarks".to_string());
        let mut schema = Schema::from_columns(columns.clone());

        let added = schema.migrate_to_canonical();
        assert_eq!(added, vec![field::CABLE_R, field::STEADY_VD_OK, field::SAVED_AT]);
        assert_eq!(&schema.columns()[..columns.len()], columns.as_slice());
        assert_eq!(schema.len(), columns.len() + 3);
    }
}
