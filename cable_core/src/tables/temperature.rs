//! Ambient air temperature correction factors.
//!
//! Factors are referenced to 50 °C ambient (factor 1.00), so cooler
//! installations gain capacity and hotter ones lose it.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};

/// Insulation class used to select a temperature row
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InsulationClass {
    #[serde(rename = "PVC")]
    Pvc,
    #[serde(rename = "XLPE")]
    Xlpe,
}

impl InsulationClass {
    pub const ALL: [InsulationClass; 2] = [InsulationClass::Pvc, InsulationClass::Xlpe];

    pub fn label(&self) -> &'static str {
        match self {
            InsulationClass::Pvc => "PVC",
            InsulationClass::Xlpe => "XLPE",
        }
    }

    /// Infer the class from a free-text cable type ("PVC/SWA/PVC", "XLPE", ...).
    ///
    /// PVC wins when both appear. Other insulations (MICC, EPR) have no
    /// temperature row and return `None`.
    pub fn from_cable_type(cable_type: &str) -> Option<Self> {
        let upper = cable_type.to_uppercase();
        if upper.contains("PVC") {
            Some(InsulationClass::Pvc)
        } else if upper.contains("XLPE") {
            Some(InsulationClass::Xlpe)
        } else {
            None
        }
    }
}

impl std::fmt::Display for InsulationClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Tabulated ambient temperatures, °C
pub const AMBIENT_TEMPERATURES_C: [i32; 7] = [25, 30, 35, 40, 45, 50, 55];

/// Ambient temperature at which every class has a factor of 1.00
pub const REFERENCE_AMBIENT_C: i32 = 50;

const PVC_FACTORS: [f64; 7] = [1.49, 1.40, 1.31, 1.22, 1.12, 1.00, 0.87];
const XLPE_FACTORS: [f64; 7] = [1.28, 1.23, 1.18, 1.13, 1.06, 1.00, 0.94];

static TEMPERATURE_FACTORS: Lazy<BTreeMap<InsulationClass, BTreeMap<i32, f64>>> = Lazy::new(|| {
    let row = |factors: [f64; 7]| -> BTreeMap<i32, f64> {
        AMBIENT_TEMPERATURES_C.iter().copied().zip(factors).collect()
    };
    let mut table = BTreeMap::new();
    table.insert(InsulationClass::Pvc, row(PVC_FACTORS));
    table.insert(InsulationClass::Xlpe, row(XLPE_FACTORS));
    table
});

/// Temperature correction factor for an insulation class.
///
/// The ambient temperature is rounded to the nearest whole degree and
/// must match a tabulated value exactly; no interpolation is done.
pub fn temperature_factor(class: InsulationClass, ambient_c: f64) -> CalcResult<f64> {
    let key = ambient_c.round() as i32;
    TEMPERATURE_FACTORS
        .get(&class)
        .and_then(|row| row.get(&key))
        .copied()
        .ok_or_else(|| CalcError::lookup_miss("ambient temperature", format!("{} @ {} °C", class, key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_inference() {
        assert_eq!(InsulationClass::from_cable_type("XLPE/SWA/PVC"), Some(InsulationClass::Pvc));
        assert_eq!(InsulationClass::from_cable_type("xlpe"), Some(InsulationClass::Xlpe));
        assert_eq!(InsulationClass::from_cable_type("MICC"), None);
        assert_eq!(InsulationClass::from_cable_type(""), None);
    }

    #[test]
    fn test_tabulated_values() {
        assert_eq!(temperature_factor(InsulationClass::Pvc, 30.0).unwrap(), 1.40);
        assert_eq!(temperature_factor(InsulationClass::Xlpe, 55.0).unwrap(), 0.94);
    }

    #[test]
    fn test_reference_temperature_is_unity() {
        for class in InsulationClass::ALL {
            assert_eq!(temperature_factor(class, REFERENCE_AMBIENT_C as f64).unwrap(), 1.0);
        }
    }

    #[test]
    fn test_rounds_before_lookup() {
        assert_eq!(temperature_factor(InsulationClass::Xlpe, 39.6).unwrap(), 1.13);
    }

    #[test]
    fn test_untabulated_temperature_misses() {
        assert!(matches!(
            temperature_factor(InsulationClass::Pvc, 33.0),
            Err(CalcError::LookupMiss { .. })
        ));
    }
}
