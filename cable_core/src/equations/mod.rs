//! # Electrical Equations
//!
//! Pure formulas used by the calculation chain. Keeping them in one place
//! makes them easy to check against hand calculations and IEC 60364 worked
//! examples.
//!
//! ## Modules
//!
//! - [`electrical`] - Load, derating composition, overload and voltage-drop formulas
//!
//! ## Conventions
//!
//! - Voltages in volts, currents in amperes, power in kW / kVA
//! - Efficiency is entered in percent, power factor as a ratio
//! - Cable impedance in Ω/km, route length in metres
//! - Degenerate inputs (zero, negative, NaN) never panic; each formula
//!   documents the value it falls back to

pub mod electrical;

pub use electrical::{
    apparent_power_kva,
    full_load_current,
    overall_derating_factor,
    overload_check,
    phase_voltage,
    round_to,
    starting_current,
    voltage_drop,
    OverloadVerdict,
    Phase,
    VoltageDrop,
};
