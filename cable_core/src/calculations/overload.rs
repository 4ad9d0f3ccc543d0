//! # Overload Protection Coordination
//!
//! Checks that the protective device protects the cable against overload
//! (IEC 60364-4-43, 433.1):
//!
//! ```text
//! Iz = Iz_single × n × ODF
//! I2 = k × In
//! Ib ≤ In ≤ Iz   and   I2 ≤ 1.45 × Iz
//! ```
//!
//! `k` is the operator's `I2_Factor` when set, otherwise the constant of the
//! selected device class, otherwise 1.45.

use serde::{Deserialize, Serialize};

use crate::equations::{overload_check, round_to, OverloadVerdict};
use crate::tables::ProtectionDevice;

/// Tripping multiple used when neither a factor nor a known class is given
pub const DEFAULT_I2_FACTOR: f64 = 1.45;

/// Input parameters for the overload check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverloadInput {
    /// Ib, A
    pub design_current_a: f64,
    /// In, A
    pub device_rating_a: f64,
    pub protection: Option<ProtectionDevice>,
    /// Operator-supplied k; overrides the class constant
    pub i2_factor: Option<f64>,
    /// Single-circuit ampacity from the cable datasheet, A
    pub iz_single_a: f64,
    pub cables_in_parallel: u32,
    pub overall_derating_factor: f64,
}

impl Default for OverloadInput {
    fn default() -> Self {
        Self {
            design_current_a: 0.0,
            device_rating_a: 0.0,
            protection: None,
            i2_factor: None,
            iz_single_a: 0.0,
            cables_in_parallel: 1,
            overall_derating_factor: 1.0,
        }
    }
}

impl OverloadInput {
    /// The tripping multiple actually applied
    pub fn effective_i2_factor(&self) -> f64 {
        self.i2_factor
            .filter(|k| k.is_finite() && *k > 0.0)
            .or_else(|| self.protection.and_then(|p| p.i2_factor()))
            .unwrap_or(DEFAULT_I2_FACTOR)
    }
}

/// Results of the overload check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverloadResult {
    pub i2_factor: f64,
    /// I2, A
    pub i2_a: f64,
    /// Derated ampacity of all parallel cables, A (2 decimals)
    pub iz_total_a: f64,
    pub verdict: OverloadVerdict,
}

impl OverloadResult {
    pub fn passes(&self) -> bool {
        self.verdict.passes()
    }
}

pub fn calculate(input: &OverloadInput) -> OverloadResult {
    let i2_factor = input.effective_i2_factor();
    let i2_a = i2_factor * input.device_rating_a;
    let iz_total = input.iz_single_a * input.cables_in_parallel as f64 * input.overall_derating_factor;
    let verdict = overload_check(input.design_current_a, input.device_rating_a, iz_total, i2_a);

    OverloadResult {
        i2_factor,
        i2_a,
        iz_total_a: round_to(iz_total, 2),
        verdict,
    }
}
