//! # Load Characteristics
//!
//! Converts an equipment rating into the currents a cable has to carry.
//!
//! ## Example
//!
//! ```rust
//! use cable_core::calculations::load::{calculate, LoadInput};
//! use cable_core::equations::Phase;
//!
//! let input = LoadInput {
//!     phase: Phase::Three,
//!     system_voltage_ll_v: 400.0,
//!     equipment_rating_kw: 75.0,
//!     power_factor: 0.85,
//!     efficiency_pct: 95.0,
//!     start_factor: 6.0,
//! };
//!
//! let result = calculate(&input);
//! assert_eq!(result.full_load_current_a, 134.06);
//! ```

use serde::{Deserialize, Serialize};

use crate::equations::{self, Phase};

/// Input parameters for the load stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LoadInput {
    pub phase: Phase,
    /// Line-to-line system voltage, V
    pub system_voltage_ll_v: f64,
    /// Equipment rating, kW
    pub equipment_rating_kw: f64,
    /// Running power factor
    pub power_factor: f64,
    /// Efficiency, %
    pub efficiency_pct: f64,
    /// Starting current as a multiple of full-load current
    pub start_factor: f64,
}

/// Results of the load stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct LoadResult {
    pub phase_voltage_v: f64,
    pub apparent_power_kva: f64,
    pub full_load_current_a: f64,
    pub starting_current_a: f64,
}

/// Evaluate the load stage in dependency order: phase voltage, then
/// apparent power and full-load current, then starting current.
pub fn calculate(input: &LoadInput) -> LoadResult {
    let phase_voltage_v = equations::phase_voltage(input.system_voltage_ll_v, input.phase);
    let apparent_power_kva =
        equations::apparent_power_kva(input.equipment_rating_kw, input.power_factor, input.efficiency_pct);
    let full_load_current_a = equations::full_load_current(
        input.equipment_rating_kw,
        input.system_voltage_ll_v,
        input.phase,
        input.power_factor,
        input.efficiency_pct,
    );
    let starting_current_a = equations::starting_current(full_load_current_a, input.start_factor);

    LoadResult {
        phase_voltage_v,
        apparent_power_kva,
        full_load_current_a,
        starting_current_a,
    }
}
