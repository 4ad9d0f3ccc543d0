//! # Voltage Drop
//!
//! Evaluates the route voltage drop twice: at full-load current with the
//! running power factor, and at starting current with the starting power
//! factor. Each is compared against its own limit.
//!
//! Derating does not enter here; it only reduces ampacity.

use serde::{Deserialize, Serialize};

use crate::equations::{phase_voltage, round_to, voltage_drop, Phase};

/// Limit applied when none is entered, i.e. no practical limit
pub const NO_LIMIT_PCT: f64 = 100.0;

/// Input parameters for the voltage drop stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoltageDropInput {
    pub phase: Phase,
    pub system_voltage_ll_v: f64,
    pub length_m: f64,
    /// Conductor resistance, Ω/km
    pub r_ohm_per_km: f64,
    /// Conductor reactance, Ω/km
    pub x_ohm_per_km: f64,
    pub full_load_current_a: f64,
    pub power_factor: f64,
    pub starting_current_a: f64,
    pub starting_power_factor: f64,
    pub steady_limit_pct: f64,
    pub starting_limit_pct: f64,
}

impl Default for VoltageDropInput {
    fn default() -> Self {
        Self {
            phase: Phase::Three,
            system_voltage_ll_v: 0.0,
            length_m: 0.0,
            r_ohm_per_km: 0.0,
            x_ohm_per_km: 0.0,
            full_load_current_a: 0.0,
            power_factor: 0.0,
            starting_current_a: 0.0,
            starting_power_factor: 0.0,
            steady_limit_pct: NO_LIMIT_PCT,
            starting_limit_pct: NO_LIMIT_PCT,
        }
    }
}

impl VoltageDropInput {
    /// Line-to-line voltage for three phase, phase voltage for single phase
    pub fn reference_voltage(&self) -> f64 {
        match self.phase {
            Phase::Three => self.system_voltage_ll_v,
            Phase::Single => phase_voltage(self.system_voltage_ll_v, Phase::Single),
        }
    }
}

/// One voltage drop condition checked against its limit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DropCheck {
    /// Drop, V (2 decimals)
    pub volts: f64,
    /// Drop, % of reference voltage (2 decimals)
    pub percent: f64,
    pub limit_pct: f64,
    pub passes: bool,
}

impl DropCheck {
    /// Text stored in the `*VD_OK` fields
    pub fn label(&self) -> &'static str {
        if self.passes {
            "OK"
        } else {
            "FAIL"
        }
    }
}

/// Results of the voltage drop stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoltageDropResult {
    pub steady: DropCheck,
    pub starting: DropCheck,
}

fn check(input: &VoltageDropInput, current_a: f64, pf: f64, limit_pct: f64) -> DropCheck {
    let drop = voltage_drop(
        current_a,
        input.r_ohm_per_km,
        input.x_ohm_per_km,
        input.length_m,
        pf,
        input.phase,
        input.reference_voltage(),
    );
    // The limit is compared against the unrounded percentage
    DropCheck {
        volts: round_to(drop.volts, 2),
        percent: round_to(drop.percent, 2),
        limit_pct,
        passes: drop.percent <= limit_pct,
    }
}

pub fn calculate(input: &VoltageDropInput) -> VoltageDropResult {
    VoltageDropResult {
        steady: check(input, input.full_load_current_a, input.power_factor, input.steady_limit_pct),
        starting: check(
            input,
            input.starting_current_a,
            input.starting_power_factor,
            input.starting_limit_pct,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feeder() -> VoltageDropInput {
        VoltageDropInput {
            phase: Phase::Three,
            system_voltage_ll_v: 400.0,
            length_m: 85.0,
            r_ohm_per_km: 0.193,
            x_ohm_per_km: 0.08,
            full_load_current_a: 134.06,
            power_factor: 0.85,
            starting_current_a: 804.36,
            starting_power_factor: 0.3,
            steady_limit_pct: 5.0,
            starting_limit_pct: 15.0,
        }
    }

    #[test]
    fn test_steady_and_starting() {
        let result = calculate(&feeder());
        assert_eq!(result.steady.volts, 4.07);
        assert_eq!(result.steady.percent, 1.02);
        assert!(result.steady.passes);
        assert_eq!(result.starting.volts, 15.89);
        assert_eq!(result.starting.percent, 3.97);
        assert!(result.starting.passes);
    }

    #[test]
    fn test_limits_are_independent() {
        let input = VoltageDropInput {
            steady_limit_pct: 1.0,
            ..feeder()
        };
        let result = calculate(&input);
        assert_eq!(result.steady.label(), "FAIL");
        assert_eq!(result.starting.label(), "OK");
    }

    #[test]
    fn test_single_phase_uses_round_trip() {
        let input = VoltageDropInput {
            phase: Phase::Single,
            system_voltage_ll_v: 230.0,
            length_m: 30.0,
            r_ohm_per_km: 1.83,
            x_ohm_per_km: 0.1,
            full_load_current_a: 20.0,
            power_factor: 0.9,
            ..Default::default()
        };
        let result = calculate(&input);
        assert_eq!(result.steady.volts, 2.03);
        assert_eq!(result.steady.percent, 0.88);
    }

    #[test]
    fn test_zero_voltage_gives_zero_percent() {
        let input = VoltageDropInput {
            system_voltage_ll_v: 0.0,
            ..feeder()
        };
        let result = calculate(&input);
        assert_eq!(result.steady.percent, 0.0);
        assert!(result.steady.passes);
    }
}
