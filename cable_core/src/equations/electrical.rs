//! # Cable Sizing Formulas
//!
//! ## Notation
//!
//! - `V_ll` = Line-to-line system voltage
//! - `V_ph` = Phase (line-to-neutral) voltage
//! - `P` = Equipment rating (shaft/output power)
//! - `pf` = Power factor (cos φ)
//! - `η` = Efficiency
//! - `Ib` = Design (full-load) current
//! - `In` = Protective device rated current
//! - `Iz` = Installed cable ampacity
//! - `I2` = Conventional operating current of the protective device
//! - `r`, `x` = Cable resistance and reactance per km
//!
//! ## References
//!
//! - IEC 60364-4-43: Protection against overcurrent (433.1)
//! - IEC 60364-5-52: Selection and erection of wiring systems (Annex G)

use serde::{Deserialize, Serialize};

/// Supply phase arrangement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Phase {
    #[serde(rename = "1")]
    Single,
    #[default]
    #[serde(rename = "3")]
    Three,
}

impl Phase {
    pub const ALL: [Phase; 2] = [Phase::Three, Phase::Single];

    /// Label as stored in the calculation record ("1" or "3")
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Single => "1",
            Phase::Three => "3",
        }
    }

    /// Parse a stored label. Only "1" selects single phase; blank or
    /// unknown text is three phase.
    pub fn from_label(s: &str) -> Self {
        let s = s.trim();
        // "1.0" shows up when a numeric cell was round-tripped
        if s == "1" || s.parse::<f64>().map(|v| v == 1.0).unwrap_or(false) {
            Phase::Single
        } else {
            Phase::Three
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Round to a fixed number of decimal places
#[inline]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Efficiency as a ratio, floored at 1% so a blank entry cannot divide by zero.
#[inline]
fn efficiency_ratio(eff_pct: f64) -> f64 {
    (eff_pct / 100.0).max(0.01)
}

/// Phase voltage from line-to-line voltage
///
/// # Formulas
/// - Single phase: V_ph = V_ll
/// - Three phase:  V_ph = V_ll / √3
///
/// Rounded to 2 decimals.
#[inline]
pub fn phase_voltage(v_ll: f64, phase: Phase) -> f64 {
    match phase {
        Phase::Single => round_to(v_ll, 2),
        Phase::Three => round_to(v_ll / 3f64.sqrt(), 2),
    }
}

/// Apparent power drawn by the load, kVA
///
/// # Formula
/// - S = P / (pf × η)
///
/// Returns 0.0 unless both `kw` and `pf` are positive. Rounded to 3 decimals.
#[inline]
pub fn apparent_power_kva(kw: f64, pf: f64, eff_pct: f64) -> f64 {
    if !(kw > 0.0 && pf > 0.0) {
        return 0.0;
    }
    round_to(kw / (pf * efficiency_ratio(eff_pct)), 3)
}

/// Full-load (design) current, A
///
/// # Formulas
/// - Three phase:  Ib = P / (√3 × V_ll × pf × η)
/// - Single phase: Ib = P / (V_ll × pf × η)
///
/// with P in watts. Returns exactly 0.0 if any of `kw`, `v_ll`, `pf`,
/// `eff_pct` is not positive. Rounded to 2 decimals.
pub fn full_load_current(kw: f64, v_ll: f64, phase: Phase, pf: f64, eff_pct: f64) -> f64 {
    if !(kw > 0.0 && v_ll > 0.0 && pf > 0.0 && eff_pct > 0.0) {
        return 0.0;
    }
    let p_w = kw * 1000.0;
    let eff = efficiency_ratio(eff_pct);
    let current = match phase {
        Phase::Three => p_w / (3f64.sqrt() * v_ll * pf * eff),
        Phase::Single => p_w / (v_ll * pf * eff),
    };
    round_to(current, 2)
}

/// Starting current, A
///
/// # Formula
/// - I_start = max(0, Ib × k_start)
///
/// Rounded to 2 decimals.
#[inline]
pub fn starting_current(flc: f64, start_factor: f64) -> f64 {
    round_to((flc * start_factor).max(0.0), 2)
}

/// Overall derating factor: the product of all correction factors.
///
/// Absent, non-finite, zero or negative factors count as 1.0, so a bad
/// entry degrades to neutral instead of zeroing the cable rating.
pub fn overall_derating_factor<I>(factors: I) -> f64
where
    I: IntoIterator<Item = Option<f64>>,
{
    factors
        .into_iter()
        .map(|f| match f {
            Some(v) if v.is_finite() && v > 0.0 => v,
            _ => 1.0,
        })
        .product()
}

/// Outcome of the overload coordination check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverloadVerdict {
    /// Both conditions hold
    Ok,
    /// Ib ≤ In ≤ Iz does not hold
    CurrentOrderFailed,
    /// Ib ≤ In ≤ Iz holds but I2 ≤ 1.45 × Iz does not
    TrippingCurrentFailed,
}

impl OverloadVerdict {
    pub fn passes(&self) -> bool {
        matches!(self, OverloadVerdict::Ok)
    }

    /// Text stored in the `OverloadCheck_OK` field
    pub fn label(&self) -> &'static str {
        match self {
            OverloadVerdict::Ok => "OK",
            OverloadVerdict::CurrentOrderFailed => "FAIL: Ib≤In≤Iz",
            OverloadVerdict::TrippingCurrentFailed => "FAIL: I2≤1.45×Iz",
        }
    }
}

impl std::fmt::Display for OverloadVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Overload protection coordination per IEC 60364-4-43, 433.1
///
/// # Conditions
/// 1. Ib ≤ In ≤ Iz
/// 2. I2 ≤ 1.45 × Iz
///
/// A non-positive `in_a` or `iz_total_a` fails condition 1; a non-positive
/// `i2_a` or `iz_total_a` fails condition 2. The first failing condition is
/// the one reported.
pub fn overload_check(ib_a: f64, in_a: f64, iz_total_a: f64, i2_a: f64) -> OverloadVerdict {
    let order_ok = in_a > 0.0 && iz_total_a > 0.0 && ib_a <= in_a && in_a <= iz_total_a;
    let tripping_ok = i2_a > 0.0 && iz_total_a > 0.0 && i2_a <= 1.45 * iz_total_a;
    if !order_ok {
        OverloadVerdict::CurrentOrderFailed
    } else if !tripping_ok {
        OverloadVerdict::TrippingCurrentFailed
    } else {
        OverloadVerdict::Ok
    }
}

/// Voltage drop magnitude and percentage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct VoltageDrop {
    /// Drop in volts
    pub volts: f64,
    /// Drop as a percentage of the reference voltage
    pub percent: f64,
}

/// Voltage drop along a cable route
///
/// ```text
///   cos φ = pf  (pf clamped to [0, 1])
///   sin φ = √(1 − pf²)
///   ΔV = k × I × (r·cos φ + x·sin φ) × L_km     k = √3 (three phase), 2 (single phase)
///   ΔV% = ΔV / V_ref × 100
/// ```
///
/// `v_ref` is the line-to-line voltage for three phase and the phase
/// voltage for single phase; the percentage is 0.0 when `v_ref` is not
/// positive. Values are not rounded.
pub fn voltage_drop(
    current_a: f64,
    r_ohm_per_km: f64,
    x_ohm_per_km: f64,
    length_m: f64,
    pf: f64,
    phase: Phase,
    v_ref: f64,
) -> VoltageDrop {
    let cos_phi = if pf.is_finite() { pf.clamp(0.0, 1.0) } else { 0.0 };
    let sin_phi = (1.0 - cos_phi * cos_phi).sqrt();
    let length_km = length_m / 1000.0;
    let k = match phase {
        Phase::Three => 3f64.sqrt(),
        Phase::Single => 2.0,
    };
    let volts = k * current_a * (r_ohm_per_km * cos_phi + x_ohm_per_km * sin_phi) * length_km;
    let percent = if v_ref > 0.0 { volts / v_ref * 100.0 } else { 0.0 };
    VoltageDrop { volts, percent }
}
