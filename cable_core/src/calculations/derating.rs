//! # Installation Derating
//!
//! Combines the correction factors that reduce a cable's tabulated
//! ampacity for its actual installation.
//!
//! ## Paths
//!
//! - **Ground / duct**: depth, soil thermal resistivity and circuit grouping
//!   factors are entered by the operator (read off the manufacturer's
//!   tables), each 1.0 when blank.
//! - **Free air**: only for "In Air" installations. The grouping factor is
//!   looked up from the tray/ladder arrangement and the ambient temperature
//!   factor from the insulation class.
//!
//! ```text
//! ODF = C_depth × C_soil × C_group × C_air × C_temp
//! ```
//!
//! Table misses resolve to 1.0 and are reported in
//! [`DeratingResult::lookup_misses`].

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::equations::{overall_derating_factor, round_to};
use crate::errors::CalcError;
use crate::tables::free_air::{self, CoreType, Formation};
use crate::tables::temperature::{self, InsulationClass, REFERENCE_AMBIENT_C};

/// How the cable is installed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstallationMethod {
    #[serde(rename = "Direct in Ground")]
    DirectInGround,
    #[serde(rename = "In Ducts")]
    InDucts,
    #[serde(rename = "In Air")]
    InAir,
}

impl InstallationMethod {
    pub const ALL: [InstallationMethod; 3] = [
        InstallationMethod::DirectInGround,
        InstallationMethod::InDucts,
        InstallationMethod::InAir,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            InstallationMethod::DirectInGround => "Direct in Ground",
            InstallationMethod::InDucts => "In Ducts",
            InstallationMethod::InAir => "In Air",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.into_iter().find(|m| m.label().eq_ignore_ascii_case(s))
    }
}

impl std::fmt::Display for InstallationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Input parameters for the derating stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DeratingInput {
    /// `None` when not selected; treated as not in air
    pub installation: Option<InstallationMethod>,
    /// Free-text cable type, used to infer the insulation class
    pub cable_type: String,
    pub core_type: CoreType,
    pub formation: Formation,

    /// Depth of burial factor (operator entry)
    pub depth_cf: Option<f64>,
    /// Soil thermal resistivity factor (operator entry)
    pub soil_resistivity_cf: Option<f64>,
    /// Ground / duct grouping factor (operator entry)
    pub ground_or_ducts_cf: Option<f64>,

    /// Tray/ladder arrangement name
    pub cable_management: String,
    pub trays: Option<u32>,
    pub cables_per_tray: Option<u32>,
    /// Ambient air temperature, °C
    pub ambient_temperature_c: Option<f64>,
}

impl DeratingInput {
    pub fn is_in_air(&self) -> bool {
        self.installation == Some(InstallationMethod::InAir)
    }
}

/// Results of the derating stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeratingResult {
    pub depth_cf: f64,
    pub soil_resistivity_cf: f64,
    pub ground_or_ducts_cf: f64,
    /// Free-air grouping factor (1.0 when not in air), 2 decimals
    pub in_air_cf: f64,
    /// Ambient temperature factor (1.0 when not in air), 2 decimals
    pub temperature_cf: f64,
    /// Product of all factors, 3 decimals
    pub overall: f64,
    /// Table lookups that fell back to 1.0
    pub lookup_misses: Vec<CalcError>,
}

fn neutral(factor: Option<f64>) -> f64 {
    overall_derating_factor([factor])
}

/// Evaluate the derating chain.
pub fn calculate(input: &DeratingInput) -> DeratingResult {
    let mut lookup_misses = Vec::new();

    let depth_cf = neutral(input.depth_cf);
    let soil_resistivity_cf = neutral(input.soil_resistivity_cf);
    let ground_or_ducts_cf = neutral(input.ground_or_ducts_cf);

    let (in_air_cf, temperature_cf) = if input.is_in_air() {
        (
            grouping_factor(input, &mut lookup_misses),
            temperature_factor(input, &mut lookup_misses),
        )
    } else {
        (1.0, 1.0)
    };

    let overall = round_to(
        overall_derating_factor([
            Some(depth_cf),
            Some(soil_resistivity_cf),
            Some(ground_or_ducts_cf),
            Some(in_air_cf),
            Some(temperature_cf),
        ]),
        3,
    );

    DeratingResult {
        depth_cf,
        soil_resistivity_cf,
        ground_or_ducts_cf,
        in_air_cf,
        temperature_cf,
        overall,
        lookup_misses,
    }
}

fn grouping_factor(input: &DeratingInput, misses: &mut Vec<CalcError>) -> f64 {
    let (Some(trays), Some(cables)) = (input.trays, input.cables_per_tray) else {
        let err = CalcError::lookup_miss(
            "free-air grouping",
            format!("{} (tray or cable count not set)", input.cable_management),
        );
        warn!(%err, "free-air grouping factor defaults to 1.0");
        misses.push(err);
        return 1.0;
    };

    match free_air::grouping_factor(
        input.core_type,
        input.formation,
        input.cable_management.trim(),
        trays,
        cables,
    ) {
        Ok(f) => round_to(f, 2),
        Err(err) => {
            warn!(%err, "free-air grouping factor defaults to 1.0");
            misses.push(err);
            1.0
        }
    }
}

fn temperature_factor(input: &DeratingInput, misses: &mut Vec<CalcError>) -> f64 {
    let Some(class) = InsulationClass::from_cable_type(&input.cable_type) else {
        debug!(cable_type = %input.cable_type, "no temperature row for cable type");
        return 1.0;
    };
    let ambient = input.ambient_temperature_c.unwrap_or(REFERENCE_AMBIENT_C as f64);
    match temperature::temperature_factor(class, ambient) {
        Ok(f) => round_to(f, 2),
        Err(err) => {
            warn!(%err, "temperature factor defaults to 1.0");
            misses.push(err);
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::free_air::{MC_LADDER_TOUCHING, SC_PERFORATED_SPACED};

    fn in_air() -> DeratingInput {
        DeratingInput {
            installation: Some(InstallationMethod::InAir),
            cable_type: "XLPE/SWA/LSZH".to_string(),
            cable_management: MC_LADDER_TOUCHING.to_string(),
            trays: Some(2),
            cables_per_tray: Some(4),
            ambient_temperature_c: Some(40.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_all_blank_is_identity() {
        let result = calculate(&DeratingInput::default());
        assert_eq!(result.overall, 1.0);
        assert!(result.lookup_misses.is_empty());
    }

    #[test]
    fn test_ground_path_uses_operator_factors() {
        let input = DeratingInput {
            installation: Some(InstallationMethod::DirectInGround),
            depth_cf: Some(0.97),
            soil_resistivity_cf: Some(0.9),
            ground_or_ducts_cf: Some(0.8),
            ..Default::default()
        };
        let result = calculate(&input);
        // 0.97 × 0.9 × 0.8 = 0.6984
        assert_eq!(result.overall, 0.698);
        assert_eq!(result.in_air_cf, 1.0);
        assert_eq!(result.temperature_cf, 1.0);
    }

    #[test]
    fn test_air_tables_ignored_when_buried() {
        let input = DeratingInput {
            installation: Some(InstallationMethod::InDucts),
            ..in_air()
        };
        let result = calculate(&input);
        assert_eq!(result.overall, 1.0);
    }

    #[test]
    fn test_in_air_multicore() {
        let result = calculate(&in_air());
        assert_eq!(result.in_air_cf, 0.78);
        assert_eq!(result.temperature_cf, 1.13);
        // 0.78 × 1.13 = 0.8814
        assert_eq!(result.overall, 0.881);
        assert!(result.lookup_misses.is_empty());
    }

    #[test]
    fn test_in_air_single_core_trefoil() {
        let input = DeratingInput {
            core_type: CoreType::SingleCore,
            formation: Formation::Trefoil,
            cable_management: SC_PERFORATED_SPACED.to_string(),
            trays: Some(3),
            cables_per_tray: Some(2),
            ..in_air()
        };
        assert_eq!(calculate(&input).in_air_cf, 0.92);
    }

    #[test]
    fn test_lookup_miss_is_neutral_and_reported() {
        let input = DeratingInput {
            cables_per_tray: Some(7),
            ambient_temperature_c: Some(33.0),
            ..in_air()
        };
        let result = calculate(&input);
        assert_eq!(result.in_air_cf, 1.0);
        assert_eq!(result.temperature_cf, 1.0);
        assert_eq!(result.lookup_misses.len(), 2);
    }

    #[test]
    fn test_unknown_insulation_is_neutral_without_miss() {
        let input = DeratingInput {
            cable_type: "MICC".to_string(),
            ..in_air()
        };
        let result = calculate(&input);
        assert_eq!(result.temperature_cf, 1.0);
        assert!(result.lookup_misses.is_empty());
    }

    #[test]
    fn test_blank_ambient_uses_reference() {
        let input = DeratingInput {
            ambient_temperature_c: None,
            ..in_air()
        };
        assert_eq!(calculate(&input).temperature_cf, 1.0);
    }

    #[test]
    fn test_installation_labels() {
        assert_eq!(InstallationMethod::from_label("In Air"), Some(InstallationMethod::InAir));
        assert_eq!(InstallationMethod::from_label("direct in ground"), Some(InstallationMethod::DirectInGround));
        assert_eq!(InstallationMethod::from_label(""), None);
    }
}
