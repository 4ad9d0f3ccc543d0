//! # Calculation Record
//!
//! A calculation is an ordered set of named field values keyed by its
//! `CalculationNumber`. Records are deliberately loose (any field may be
//! absent, text or a number) because they are saved incrementally and
//! may come from stores written by other tools. Typed views are built on
//! demand by the recalculation pipeline.
//!
//! ## Example
//!
//! ```rust
//! use cable_core::record::CalcRecord;
//! use cable_core::schema::field;
//!
//! let record = CalcRecord::new("0001")
//!     .with(field::SYSTEM_VOLTAGE_LL, 400.0)
//!     .with(field::PHASE, "3");
//!
//! assert_eq!(record.key(), "0001");
//! assert_eq!(record.number_or(field::SYSTEM_VOLTAGE_LL, 0.0), 400.0);
//! ```

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use tracing::debug;

use crate::errors::{CalcError, CalcResult};
use crate::schema::{self, field};

/// A single cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Numeric view: numbers as-is, text parsed after trimming.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(v) => Some(*v),
            FieldValue::Text(s) => s.trim().parse().ok(),
        }
    }

    /// True for empty or whitespace-only text
    pub fn is_blank(&self) -> bool {
        matches!(self, FieldValue::Text(s) if s.trim().is_empty())
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Number(v) => write!(f, "{}", v),
            FieldValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Number(v)
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        FieldValue::Number(v as f64)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

/// Ordered field-name → value mapping for one calculation.
///
/// Field order is insertion order; setting an existing field keeps its
/// position.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CalcRecord {
    fields: Vec<(String, FieldValue)>,
}

impl CalcRecord {
    /// Record holding only the calculation number
    pub fn new(calc_number: impl Into<String>) -> Self {
        let mut record = CalcRecord::default();
        record.set(field::CALCULATION_NUMBER, FieldValue::Text(calc_number.into()));
        record
    }

    /// Builder-style setter
    pub fn with(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a field, keeping its position if it already exists
    pub fn set(&mut self, name: &str, value: impl Into<FieldValue>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        let idx = self.fields.iter().position(|(n, _)| n == name)?;
        Some(self.fields.remove(idx).1)
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Trimmed text of a field; empty when absent
    pub fn text(&self, name: &str) -> String {
        self.get(name)
            .map(|v| v.to_string().trim().to_string())
            .unwrap_or_default()
    }

    /// The calculation number, trimmed
    pub fn key(&self) -> String {
        self.text(field::CALCULATION_NUMBER)
    }

    /// Parse a numeric field.
    ///
    /// Absent or blank fields are `Ok(None)`; text that is not a finite
    /// number is a `CalcError::Parse`.
    pub fn parse_number(&self, name: &str) -> CalcResult<Option<f64>> {
        match self.get(name) {
            None => Ok(None),
            Some(v) if v.is_blank() => Ok(None),
            Some(v) => match v.as_number() {
                Some(n) if n.is_finite() => Ok(Some(n)),
                _ => Err(CalcError::parse(name, v.to_string())),
            },
        }
    }

    /// Numeric field, or `default` when absent, blank or unparseable.
    pub fn number_or(&self, name: &str, default: f64) -> f64 {
        match self.parse_number(name) {
            Ok(Some(v)) => v,
            Ok(None) => default,
            Err(err) => {
                debug!(%err, default, "using neutral default");
                default
            }
        }
    }

    /// Numeric field when present and parseable
    pub fn number(&self, name: &str) -> Option<f64> {
        self.parse_number(name).ok().flatten()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Copy of this record without pipeline-owned fields
    pub fn inputs_only(&self) -> CalcRecord {
        CalcRecord {
            fields: self
                .fields
                .iter()
                .filter(|(n, _)| !schema::is_derived(n))
                .cloned()
                .collect(),
        }
    }

    /// Space-joined field values, used for full-text search
    pub fn haystack(&self) -> String {
        self.fields
            .iter()
            .map(|(_, v)| v.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl FromIterator<(String, FieldValue)> for CalcRecord {
    fn from_iter<T: IntoIterator<Item = (String, FieldValue)>>(iter: T) -> Self {
        let mut record = CalcRecord::default();
        for (name, value) in iter {
            record.set(&name, value);
        }
        record
    }
}

impl Serialize for CalcRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Next calculation number: the highest all-digit key plus one, padded to
/// four digits. Keys with any non-digit character are ignored.
///
/// ```rust
/// use cable_core::record::next_calc_number;
///
/// assert_eq!(next_calc_number(["0001", "0007", "A-12"]), "0008");
/// assert_eq!(next_calc_number(Vec::<&str>::new()), "0001");
/// ```
pub fn next_calc_number<'a, I>(keys: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let highest = keys
        .into_iter()
        .map(str::trim)
        .filter(|k| !k.is_empty() && k.chars().all(|c| c.is_ascii_digit()))
        .filter_map(|k| k.parse::<u64>().ok())
        .max();
    // A key at u64::MAX has no successor; restart at 1 like an empty project
    format!("{:04}", highest.and_then(|n| n.checked_add(1)).unwrap_or(1))
}
