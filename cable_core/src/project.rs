//! # Project Data Structures
//!
//! A project is one workbook file holding the project information sheet
//! and the calculation sheet. Workbooks serialize to `.ccp` files as
//! human-readable JSON.
//!
//! ## Structure
//!
//! ```text
//! Workbook
//! ├── version: schema version (for migration compatibility)
//! ├── project: ProjectInfo (ordered key/value pairs)
//! └── calc: CalcSheet
//!     ├── headers: Schema (append-only column list)
//!     └── rows: one row of cells per calculation, null for empty
//! ```
//!
//! ## Example
//!
//! ```rust
//! use cable_core::project::{info, ProjectInfo, ProjectLocator};
//! use std::path::Path;
//!
//! let mut project = ProjectInfo::default();
//! project.set(info::PROJECT_NUMBER, "P-2024/17");
//!
//! let locator = ProjectLocator::for_project_number(Path::new("/projects"), project.project_number());
//! assert_eq!(locator.path(), Path::new("/projects/P-2024_17.ccp"));
//! ```

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::record::{CalcRecord, FieldValue};
use crate::schema::{field, Schema};

/// Current schema version for .ccp files
pub const SCHEMA_VERSION: &str = "0.1.0";

/// File extension for project workbooks
pub const PROJECT_EXTENSION: &str = "ccp";

/// Well-known project information keys, in form order
pub mod info {
    pub const PROJECT_TITLE: &str = "Project Title";
    pub const PROJECT_NUMBER: &str = "Project Number";
    pub const LOCATION: &str = "Location";
    pub const DOCUMENT_NUMBER: &str = "Document Number";
    pub const REV_NO: &str = "Rev No";
    pub const PROJECT_DESCRIPTION: &str = "Project Description";
    pub const PROJECT_NOTES: &str = "Project Notes";

    pub const ALL: [&str; 7] = [
        PROJECT_TITLE,
        PROJECT_NUMBER,
        LOCATION,
        DOCUMENT_NUMBER,
        REV_NO,
        PROJECT_DESCRIPTION,
        PROJECT_NOTES,
    ];
}

/// Ordered project information, serialized as `[[key, value], ...]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ProjectInfo {
    entries: Vec<(String, String)>,
}

impl ProjectInfo {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set a value, keeping the key's position if it already exists
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Trimmed project number; empty when unset
    pub fn project_number(&self) -> &str {
        self.get(info::PROJECT_NUMBER).map(str::trim).unwrap_or_default()
    }

    /// Trimmed project title; empty when unset
    pub fn project_title(&self) -> &str {
        self.get(info::PROJECT_TITLE).map(str::trim).unwrap_or_default()
    }

    /// Name used in export file names: the number, else the title, else "Project"
    pub fn display_name(&self) -> &str {
        [self.project_number(), self.project_title()]
            .into_iter()
            .find(|s| !s.is_empty())
            .unwrap_or("Project")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ProjectInfo {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut info = ProjectInfo::default();
        for (k, v) in iter {
            let key: String = k.into();
            info.set(&key, v);
        }
        info
    }
}

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\-]+").expect("constant pattern"));

const MAX_NAME_CHARS: usize = 80;

/// Make a name safe for use as a file name component.
///
/// Runs of characters other than word characters and `-` become `_`; the
/// result is cut to 80 characters, and an empty result becomes "Project".
///
/// ```rust
/// use cable_core::project::sanitize_name;
///
/// assert_eq!(sanitize_name(" 24-017 / Pump House "), "24-017_Pump_House");
/// assert_eq!(sanitize_name("///"), "_");
/// assert_eq!(sanitize_name(""), "Project");
/// ```
pub fn sanitize_name(name: &str) -> String {
    let replaced = UNSAFE_CHARS.replace_all(name.trim(), "_");
    let cut: String = replaced.chars().take(MAX_NAME_CHARS).collect();
    if cut.is_empty() {
        "Project".to_string()
    } else {
        cut
    }
}

/// Where a project workbook lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLocator {
    dir: PathBuf,
    name: String,
}

impl ProjectLocator {
    /// Locator for a project number; a blank number maps to "UNSPECIFIED".
    pub fn for_project_number(dir: &Path, project_number: &str) -> Self {
        let number = project_number.trim();
        let number = if number.is_empty() { "UNSPECIFIED" } else { number };
        ProjectLocator {
            dir: dir.to_path_buf(),
            name: sanitize_name(number),
        }
    }

    /// Locator for an existing workbook path
    pub fn from_path(path: &Path) -> Self {
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Project".to_string());
        ProjectLocator { dir, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/<name>.ccp`
    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.{}", self.name, PROJECT_EXTENSION))
    }
}

/// The calculation sheet: header row plus one row per calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalcSheet {
    pub headers: Schema,
    #[serde(default)]
    pub rows: Vec<Vec<Option<FieldValue>>>,
}

impl Default for CalcSheet {
    fn default() -> Self {
        CalcSheet {
            headers: Schema::canonical(),
            rows: Vec::new(),
        }
    }
}

impl CalcSheet {
    /// Pad every row to the header width
    pub fn normalize(&mut self) {
        let width = self.headers.len();
        for row in &mut self.rows {
            if row.len() < width {
                row.resize(width, None);
            }
        }
    }

    /// Key of a row; empty when the key cell is blank or missing
    pub fn row_key(&self, row: &[Option<FieldValue>]) -> String {
        self.headers
            .index_of(field::CALCULATION_NUMBER)
            .and_then(|idx| row.get(idx))
            .and_then(Option::as_ref)
            .map(|v| v.to_string().trim().to_string())
            .unwrap_or_default()
    }

    /// Rows with a non-blank key, as `(row position, key)`
    pub fn keyed_rows(&self) -> impl Iterator<Item = (usize, String)> + '_ {
        self.rows
            .iter()
            .enumerate()
            .map(|(pos, row)| (pos, self.row_key(row)))
            .filter(|(_, key)| !key.is_empty())
    }

    /// Build a record from a row, in column order, skipping empty cells
    pub fn record_at(&self, pos: usize) -> Option<CalcRecord> {
        let row = self.rows.get(pos)?;
        Some(
            self.headers
                .columns()
                .iter()
                .zip(row.iter())
                .filter_map(|(name, cell)| cell.clone().map(|v| (name.clone(), v)))
                .collect(),
        )
    }
}

/// Root container serialized to `.ccp` files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    /// Schema version (for migration compatibility)
    pub version: String,
    #[serde(default)]
    pub project: ProjectInfo,
    #[serde(default)]
    pub calc: CalcSheet,
}

impl Default for Workbook {
    fn default() -> Self {
        Workbook {
            version: SCHEMA_VERSION.to_string(),
            project: ProjectInfo::default(),
            calc: CalcSheet::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("24-017"), "24-017");
        assert_eq!(sanitize_name("A.B C"), "A_B_C");
        assert_eq!(sanitize_name("  "), "Project");
        assert_eq!(sanitize_name(&"x".repeat(100)).len(), 80);
    }

    #[test]
    fn test_locator_blank_number() {
        let locator = ProjectLocator::for_project_number(Path::new("/p"), "   ");
        assert_eq!(locator.name(), "UNSPECIFIED");
        assert_eq!(locator.path(), Path::new("/p/UNSPECIFIED.ccp"));
    }

    #[test]
    fn test_locator_from_path() {
        let locator = ProjectLocator::from_path(Path::new("/p/24-017.ccp"));
        assert_eq!(locator.name(), "24-017");
        assert_eq!(locator.dir(), Path::new("/p"));
    }

    #[test]
    fn test_project_info_order_and_update() {
        let mut project: ProjectInfo = [(info::PROJECT_TITLE, "Pump House"), (info::PROJECT_NUMBER, "24-017")]
            .into_iter()
            .collect();
        project.set(info::PROJECT_TITLE, "Pump House 2");
        project.set(info::LOCATION, "Site B");
        let keys: Vec<_> = project.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![info::PROJECT_TITLE, info::PROJECT_NUMBER, info::LOCATION]);
        assert_eq!(project.display_name(), "24-017");
    }

    #[test]
    fn test_project_info_serializes_as_pairs() {
        let project: ProjectInfo = [(info::PROJECT_NUMBER, "24-017")].into_iter().collect();
        let json = serde_json::to_string(&project).unwrap();
        assert_eq!(json, r#"[["Project Number","24-017"]]"#);
    }

    #[test]
    fn test_workbook_missing_sections_default() {
        let workbook: Workbook = serde_json::from_str(r#"{"version":"0.1.0"}"#).unwrap();
        assert!(workbook.project.is_empty());
        assert_eq!(workbook.calc.headers, Schema::canonical());
        assert!(workbook.calc.rows.is_empty());
    }

    #[test]
    fn test_record_at_skips_empty_cells() {
        let sheet = CalcSheet {
            headers: Schema::from_columns(vec![
                field::CALCULATION_NUMBER.to_string(),
                field::PHASE.to_string(),
                field::SYSTEM_VOLTAGE_LL.to_string(),
            ]),
            rows: vec![vec![Some("0001".into()), None, Some(400.0.into())]],
        };
        let record = sheet.record_at(0).unwrap();
        assert_eq!(record.len(), 2);
        assert_eq!(record.key(), "0001");
        assert!(!record.contains(field::PHASE));
        assert_eq!(sheet.keyed_rows().collect::<Vec<_>>(), vec![(0, "0001".to_string())]);
    }
}
