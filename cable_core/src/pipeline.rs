//! # Recalculation Pipeline
//!
//! Rebuilds every derived field of a calculation from its inputs in one
//! pass, in dependency order:
//!
//! ```text
//! phase voltage
//!   → apparent power, full-load current
//!     → starting current
//!       → derating chain (independent of the load stage)
//!         → overload check (FLC, ODF, device rating)
//!           → voltage drop (FLC / starting current; not derated)
//! ```
//!
//! Derived fields are always overwritten, never merged, so a stored record
//! cannot carry a value computed from a stale upstream input.
//!
//! Inputs are read leniently: blank or unparseable values fall back to
//! neutral defaults (see [`StageInputs::from_record`]).

use serde::Serialize;
use tracing::debug;

use crate::calculations::{
    derating, load, overload, voltage_drop, DeratingInput, DeratingResult, InstallationMethod, LoadInput,
    LoadResult, OverloadInput, OverloadResult, VoltageDropInput, VoltageDropResult,
};
use crate::calculations::voltage_drop::NO_LIMIT_PCT;
use crate::equations::Phase;
use crate::errors::CalcError;
use crate::record::{CalcRecord, FieldValue};
use crate::schema::field;
use crate::tables::{CoreType, Formation, ProtectionDevice};

/// Typed inputs for every stage, read from a record.
///
/// The overload and voltage drop inputs carry placeholder currents and
/// derating until [`recalculate`] fills them from upstream results.
#[derive(Debug, Clone, PartialEq)]
pub struct StageInputs {
    pub load: LoadInput,
    pub derating: DeratingInput,
    pub overload: OverloadInput,
    pub voltage_drop: VoltageDropInput,
}

/// Whole non-negative count, or `None` when blank or not a count.
fn count(record: &CalcRecord, name: &str) -> Option<u32> {
    let value = record.number(name)?;
    if value < 0.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
        debug!(field = name, value, "not a whole count");
        return None;
    }
    Some(value as u32)
}

impl StageInputs {
    /// Read stage inputs from a record.
    ///
    /// | Input                        | Blank / unparseable          |
    /// |------------------------------|------------------------------|
    /// | Phase                        | three phase                  |
    /// | voltages, ratings, currents  | 0.0                          |
    /// | correction factors           | 1.0                          |
    /// | voltage drop limits          | 100 % (no limit)             |
    /// | cables in parallel           | 1                            |
    /// | trays, cables per tray       | table miss, factor 1.0       |
    /// | ambient temperature          | 50 °C reference, factor 1.0  |
    pub fn from_record(record: &CalcRecord) -> Self {
        let phase = Phase::from_label(&record.text(field::PHASE));
        let system_voltage_ll_v = record.number_or(field::SYSTEM_VOLTAGE_LL, 0.0);
        let power_factor = record.number_or(field::POWER_FACTOR, 0.0);

        let load = LoadInput {
            phase,
            system_voltage_ll_v,
            equipment_rating_kw: record.number_or(field::EQUIPMENT_RATING_KW, 0.0),
            power_factor,
            efficiency_pct: record.number_or(field::EFFICIENCY_PCT, 0.0),
            start_factor: record.number_or(field::START_FACTOR, 0.0),
        };

        let derating = DeratingInput {
            installation: InstallationMethod::from_label(&record.text(field::TYPE_OF_INSTALLATION)),
            cable_type: record.text(field::TYPE_OF_CABLE),
            core_type: CoreType::from_label(&record.text(field::CORE_TYPE)),
            formation: Formation::from_label(&record.text(field::FORMATION)),
            depth_cf: record.number(field::DEPTH_CF),
            soil_resistivity_cf: record.number(field::SOIL_RESISTIVITY_CF),
            ground_or_ducts_cf: record.number(field::GROUND_OR_DUCTS_CF),
            cable_management: record.text(field::CABLE_MANAGEMENT),
            trays: count(record, field::NUMBER_OF_TRAYS),
            cables_per_tray: count(record, field::CABLES_PER_TRAY),
            ambient_temperature_c: record.number(field::AMBIENT_TEMPERATURE_C),
        };

        let overload = OverloadInput {
            device_rating_a: record.number_or(field::PROTECTIVE_DEVICE_A, 0.0),
            protection: ProtectionDevice::from_label(&record.text(field::PROTECTION_TYPE)),
            i2_factor: record.number(field::I2_FACTOR),
            iz_single_a: record.number_or(field::IZ_SINGLE, 0.0),
            cables_in_parallel: count(record, field::CABLES_IN_PARALLEL).unwrap_or(1),
            ..Default::default()
        };

        let voltage_drop = VoltageDropInput {
            phase,
            system_voltage_ll_v,
            length_m: record.number_or(field::CIRCUIT_LENGTH_M, 0.0),
            r_ohm_per_km: record.number_or(field::CABLE_R, 0.0),
            x_ohm_per_km: record.number_or(field::CABLE_X, 0.0),
            power_factor,
            starting_power_factor: record.number_or(field::START_PF, 0.0),
            steady_limit_pct: record.number_or(field::STEADY_VD_LIMIT_PCT, NO_LIMIT_PCT),
            starting_limit_pct: record.number_or(field::STARTING_VD_LIMIT_PCT, NO_LIMIT_PCT),
            ..Default::default()
        };

        StageInputs {
            load,
            derating,
            overload,
            voltage_drop,
        }
    }
}

/// All derived values of one calculation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedValues {
    pub load: LoadResult,
    pub derating: DeratingResult,
    pub overload: OverloadResult,
    pub voltage_drop: VoltageDropResult,
}

impl DerivedValues {
    /// Table lookups that fell back to a neutral factor
    pub fn lookup_misses(&self) -> &[CalcError] {
        &self.derating.lookup_misses
    }

    /// Derived field values in canonical order (excluding `SavedAt`)
    pub fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        let num = FieldValue::Number;
        let text = |s: &str| FieldValue::Text(s.to_string());
        vec![
            (field::PHASE_VOLTAGE, num(self.load.phase_voltage_v)),
            (field::APPARENT_POWER_KVA, num(self.load.apparent_power_kva)),
            (field::FULL_LOAD_CURRENT, num(self.load.full_load_current_a)),
            (field::STARTING_CURRENT, num(self.load.starting_current_a)),
            (field::IN_AIR_DERATING_FACTOR, num(self.derating.in_air_cf)),
            (field::TEMPERATURE_DERATING_FACTOR, num(self.derating.temperature_cf)),
            (field::OVERALL_DERATING_FACTOR, num(self.derating.overall)),
            (field::IZ_TOTAL, num(self.overload.iz_total_a)),
            (field::OVERLOAD_CHECK, text(self.overload.verdict.label())),
            (field::STEADY_VD_V, num(self.voltage_drop.steady.volts)),
            (field::STEADY_VD_PCT, num(self.voltage_drop.steady.percent)),
            (field::STEADY_VD_OK, text(self.voltage_drop.steady.label())),
            (field::STARTING_VD_V, num(self.voltage_drop.starting.volts)),
            (field::STARTING_VD_PCT, num(self.voltage_drop.starting.percent)),
            (field::STARTING_VD_OK, text(self.voltage_drop.starting.label())),
        ]
    }

    /// Overwrite every derived field of `record`
    pub fn apply_to(&self, record: &mut CalcRecord) {
        for (name, value) in self.fields() {
            record.set(name, value);
        }
    }
}

/// Compute all derived values from a record's inputs.
///
/// Existing derived fields in `record` are ignored.
pub fn recalculate(record: &CalcRecord) -> DerivedValues {
    let mut inputs = StageInputs::from_record(record);

    let load = load::calculate(&inputs.load);
    let derating = derating::calculate(&inputs.derating);

    inputs.overload.design_current_a = load.full_load_current_a;
    inputs.overload.overall_derating_factor = derating.overall;
    let overload = overload::calculate(&inputs.overload);

    inputs.voltage_drop.full_load_current_a = load.full_load_current_a;
    inputs.voltage_drop.starting_current_a = load.starting_current_a;
    let voltage_drop = voltage_drop::calculate(&inputs.voltage_drop);

    debug!(
        key = %record.key(),
        flc = load.full_load_current_a,
        odf = derating.overall,
        overload = %overload.verdict,
        "recalculated"
    );

    DerivedValues {
        load,
        derating,
        overload,
        voltage_drop,
    }
}

/// Recalculate and write the derived fields back into `record`.
pub fn recompute(record: &mut CalcRecord) -> DerivedValues {
    let derived = recalculate(record);
    derived.apply_to(record);
    derived
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::free_air::MC_LADDER_TOUCHING;

    fn motor_feeder() -> CalcRecord {
        CalcRecord::new("0001")
            .with(field::PHASE, "3")
            .with(field::SYSTEM_VOLTAGE_LL, 400.0)
            .with(field::EQUIPMENT_RATING_KW, 75.0)
            .with(field::POWER_FACTOR, 0.85)
            .with(field::EFFICIENCY_PCT, 95.0)
            .with(field::START_FACTOR, 6.0)
            .with(field::START_PF, 0.3)
            .with(field::PROTECTIVE_DEVICE_A, 160.0)
            .with(field::CIRCUIT_LENGTH_M, 85.0)
            .with(field::TYPE_OF_CABLE, "XLPE/SWA/LSZH")
            .with(field::TYPE_OF_INSTALLATION, "In Air")
            .with(field::CORE_TYPE, "Multicore")
            .with(field::CABLE_MANAGEMENT, MC_LADDER_TOUCHING)
            .with(field::NUMBER_OF_TRAYS, "2")
            .with(field::CABLES_PER_TRAY, "4")
            .with(field::AMBIENT_TEMPERATURE_C, "40")
            .with(field::PROTECTION_TYPE, "MCCB (IEC 60947-2)")
            .with(field::IZ_SINGLE, 200.0)
            .with(field::CABLES_IN_PARALLEL, 1.0)
            .with(field::CABLE_R, 0.193)
            .with(field::CABLE_X, 0.08)
            .with(field::STEADY_VD_LIMIT_PCT, 5.0)
            .with(field::STARTING_VD_LIMIT_PCT, 15.0)
    }

    #[test]
    fn test_full_chain() {
        let mut record = motor_feeder();
        let derived = recompute(&mut record);

        assert_eq!(derived.load.full_load_current_a, 134.06);
        assert_eq!(derived.derating.overall, 0.881);
        assert_eq!(derived.overload.iz_total_a, 176.2);
        assert!(derived.overload.passes());

        assert_eq!(record.number(field::FULL_LOAD_CURRENT), Some(134.06));
        assert_eq!(record.number(field::IN_AIR_DERATING_FACTOR), Some(0.78));
        assert_eq!(record.number(field::TEMPERATURE_DERATING_FACTOR), Some(1.13));
        assert_eq!(record.text(field::OVERLOAD_CHECK), "OK");
        assert_eq!(record.number(field::STEADY_VD_V), Some(4.07));
        assert_eq!(record.text(field::STEADY_VD_OK), "OK");
        assert_eq!(record.text(field::STARTING_VD_OK), "OK");
    }

    #[test]
    fn test_upstream_change_refreshes_downstream() {
        let mut record = motor_feeder();
        recompute(&mut record);
        let vd_before = record.number(field::STEADY_VD_V);

        record.set(field::SYSTEM_VOLTAGE_LL, 690.0);
        recompute(&mut record);

        assert_eq!(record.number(field::PHASE_VOLTAGE), Some(398.37));
        assert!(record.number(field::FULL_LOAD_CURRENT) < Some(134.06));
        assert!(record.number(field::STEADY_VD_V) < vd_before);
    }

    #[test]
    fn test_stale_derived_values_are_overwritten() {
        let mut record = motor_feeder()
            .with(field::FULL_LOAD_CURRENT, 9999.0)
            .with(field::OVERLOAD_CHECK, "OK")
            .with(field::PROTECTIVE_DEVICE_A, 250.0);
        recompute(&mut record);
        assert_eq!(record.number(field::FULL_LOAD_CURRENT), Some(134.06));
        assert_eq!(record.text(field::OVERLOAD_CHECK), "FAIL: Ib≤In≤Iz");
    }

    #[test]
    fn test_blank_record_uses_neutral_defaults() {
        let mut record = CalcRecord::new("0002");
        let derived = recompute(&mut record);
        assert_eq!(derived.load, LoadResult::default());
        assert_eq!(derived.derating.overall, 1.0);
        assert_eq!(derived.voltage_drop.steady.limit_pct, NO_LIMIT_PCT);
        assert_eq!(record.text(field::STEADY_VD_OK), "OK");
        assert_eq!(record.text(field::OVERLOAD_CHECK), "FAIL: Ib≤In≤Iz");
    }

    #[test]
    fn test_garbage_counts_are_lookup_misses() {
        let record = motor_feeder().with(field::NUMBER_OF_TRAYS, "two");
        let derived = recalculate(&record);
        assert_eq!(derived.derating.in_air_cf, 1.0);
        assert_eq!(derived.lookup_misses().len(), 1);
        assert_eq!(derived.lookup_misses()[0].error_code(), "LOOKUP_MISS");
    }

    #[test]
    fn test_not_in_air_ignores_tray_inputs() {
        let record = motor_feeder()
            .with(field::TYPE_OF_INSTALLATION, "Direct in Ground")
            .with(field::DEPTH_CF, "0.95");
        let derived = recalculate(&record);
        assert_eq!(derived.derating.in_air_cf, 1.0);
        assert_eq!(derived.derating.temperature_cf, 1.0);
        assert_eq!(derived.derating.overall, 0.95);
    }

    #[test]
    fn test_every_derived_field_is_written() {
        let mut record = CalcRecord::new("0003");
        recompute(&mut record);
        for spec in crate::schema::CANONICAL_FIELDS {
            if spec.kind == crate::schema::FieldKind::Derived && spec.name != field::SAVED_AT {
                assert!(record.contains(spec.name), "{} not written", spec.name);
            }
        }
    }
}
