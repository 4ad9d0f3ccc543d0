//! # Project Store
//!
//! Per-project record store over one workbook file. Every mutation is
//! applied to a copy of the workbook, saved atomically, and only then
//! becomes the in-memory state, so a failed write leaves both the file and
//! the store unchanged.
//!
//! ## Example
//!
//! ```rust,no_run
//! use cable_core::project::ProjectLocator;
//! use cable_core::record::CalcRecord;
//! use cable_core::schema::field;
//! use cable_core::store::ProjectStore;
//! use std::path::Path;
//!
//! let locator = ProjectLocator::for_project_number(Path::new("projects"), "24-017");
//! let mut store = ProjectStore::open_or_create(&locator)?;
//!
//! store.upsert(&CalcRecord::new("0001").with(field::CABLE_TAG, "CB-101"))?;
//! assert_eq!(store.list_calculation_keys(), vec!["0001"]);
//! # Ok::<(), cable_core::errors::CalcError>(())
//! ```

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use chrono::{SecondsFormat, Utc};
use tracing::{debug, info};

use crate::errors::{CalcError, CalcResult};
use crate::file_io::{self, FileLock};
use crate::project::{ProjectInfo, ProjectLocator, Workbook, SCHEMA_VERSION};
use crate::record::{CalcRecord, FieldValue};
use crate::schema::{field, Schema};

/// Timestamp format written to `SavedAt`
pub fn saved_at_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Record store for one project.
#[derive(Debug)]
pub struct ProjectStore {
    locator: ProjectLocator,
    workbook: Workbook,
    migrated_columns: Vec<String>,
    lock: Option<FileLock>,
}

impl ProjectStore {
    /// Open a project workbook, creating it if it does not exist.
    ///
    /// Idempotent. An existing workbook missing canonical columns is
    /// migrated by appending them after its existing columns, and saved.
    pub fn open_or_create(locator: &ProjectLocator) -> CalcResult<Self> {
        let path = locator.path();
        fs::create_dir_all(locator.dir()).map_err(|e| {
            CalcError::file_error("create directory", locator.dir().display().to_string(), e.to_string())
        })?;

        let mut store = ProjectStore {
            locator: locator.clone(),
            workbook: Workbook::default(),
            migrated_columns: Vec::new(),
            lock: None,
        };

        if !path.exists() {
            file_io::save_workbook(&store.workbook, &path)?;
            info!(path = %path.display(), "created project workbook");
            return Ok(store);
        }

        let mut workbook = file_io::load_workbook(&path)?;
        let added = workbook.calc.headers.migrate_to_canonical();
        let outdated = workbook.version != SCHEMA_VERSION;
        if !added.is_empty() || outdated {
            workbook.calc.normalize();
            workbook.version = SCHEMA_VERSION.to_string();
            file_io::save_workbook(&workbook, &path)?;
            info!(path = %path.display(), added = ?added, "migrated project workbook");
        }
        store.workbook = workbook;
        store.migrated_columns = added;
        Ok(store)
    }

    /// Like [`open_or_create`](Self::open_or_create), holding an exclusive
    /// file lock for the lifetime of the store.
    pub fn open_locked(locator: &ProjectLocator, user_id: &str) -> CalcResult<Self> {
        fs::create_dir_all(locator.dir()).map_err(|e| {
            CalcError::file_error("create directory", locator.dir().display().to_string(), e.to_string())
        })?;
        let lock = FileLock::acquire(&locator.path(), user_id)?;
        let mut store = Self::open_or_create(locator)?;
        store.lock = Some(lock);
        Ok(store)
    }

    pub fn locator(&self) -> &ProjectLocator {
        &self.locator
    }

    pub fn path(&self) -> PathBuf {
        self.locator.path()
    }

    pub fn schema(&self) -> &Schema {
        &self.workbook.calc.headers
    }

    /// Columns appended by migration when this store was opened
    pub fn migrated_columns(&self) -> &[String] {
        &self.migrated_columns
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_some()
    }

    /// Save `workbook` and make it the current state
    fn commit(&mut self, workbook: Workbook) -> CalcResult<()> {
        file_io::save_workbook(&workbook, &self.path())?;
        self.workbook = workbook;
        Ok(())
    }

    /// Replace the project information sheet.
    pub fn write_project_info(&mut self, project: ProjectInfo) -> CalcResult<()> {
        let mut workbook = self.workbook.clone();
        workbook.project = project;
        self.commit(workbook)?;
        info!(path = %self.path().display(), "project info saved");
        Ok(())
    }

    pub fn read_project_info(&self) -> &ProjectInfo {
        &self.workbook.project
    }

    /// Non-empty calculation keys in store order
    pub fn list_calculation_keys(&self) -> Vec<String> {
        self.workbook.calc.keyed_rows().map(|(_, key)| key).collect()
    }

    pub fn len(&self) -> usize {
        self.workbook.calc.keyed_rows().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record at a position of [`list_calculation_keys`](Self::list_calculation_keys)
    pub fn read_by_index(&self, index: usize) -> Option<CalcRecord> {
        let (pos, _) = self.workbook.calc.keyed_rows().nth(index)?;
        self.workbook.calc.record_at(pos)
    }

    /// First record with this key, with its index
    pub fn read_by_key(&self, key: &str) -> Option<(usize, CalcRecord)> {
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        let (index, (pos, _)) = self
            .workbook
            .calc
            .keyed_rows()
            .enumerate()
            .find(|(_, (_, k))| k == key)?;
        Some((index, self.workbook.calc.record_at(pos)?))
    }

    /// Records whose joined field values contain `query`, case-insensitive,
    /// with their index, in store order. A blank query matches nothing.
    pub fn search(&self, query: &str) -> Vec<(usize, CalcRecord)> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        let hits: Vec<(usize, CalcRecord)> = self
            .workbook
            .calc
            .keyed_rows()
            .enumerate()
            .filter_map(|(index, (pos, _))| Some((index, self.workbook.calc.record_at(pos)?)))
            .filter(|(_, record)| record.haystack().to_lowercase().contains(&needle))
            .collect();
        debug!(query, hits = hits.len(), "search");
        hits
    }

    /// Insert or update a calculation by its key.
    ///
    /// Only fields present in `record` are written; a present but blank
    /// value clears its cell. Unknown field names become new columns.
    /// `SavedAt` is stamped on every write. Returns the stored record.
    pub fn upsert(&mut self, record: &CalcRecord) -> CalcResult<CalcRecord> {
        let key = record.key();
        if key.is_empty() {
            return Err(CalcError::missing_key(field::CALCULATION_NUMBER));
        }

        let mut workbook = self.workbook.clone();
        let sheet = &mut workbook.calc;
        for name in record.names() {
            sheet.headers.ensure(name);
        }
        let saved_at_idx = sheet.headers.ensure(field::SAVED_AT);
        sheet.normalize();

        let width = sheet.headers.len();
        let existing = sheet.keyed_rows().find(|(_, k)| *k == key).map(|(pos, _)| pos);
        let inserted = existing.is_none();
        let pos = existing.unwrap_or_else(|| {
            sheet.rows.push(vec![None; width]);
            sheet.rows.len() - 1
        });

        let mut cells: Vec<(usize, Option<FieldValue>)> = Vec::with_capacity(record.len() + 1);
        for (name, value) in record.iter() {
            let Some(idx) = sheet.headers.index_of(name) else {
                continue;
            };
            let cell = if name == field::CALCULATION_NUMBER {
                Some(FieldValue::Text(key.clone()))
            } else if value.is_blank() {
                None
            } else {
                Some(value.clone())
            };
            cells.push((idx, cell));
        }
        cells.push((saved_at_idx, Some(FieldValue::Text(saved_at_now()))));

        let row = &mut sheet.rows[pos];
        for (idx, cell) in cells {
            row[idx] = cell;
        }

        let stored = workbook
            .calc
            .record_at(pos)
            .ok_or_else(|| CalcError::internal(format!("row {} vanished during upsert", pos)))?;
        self.commit(workbook)?;
        info!(key = %key, inserted, "calculation saved");
        Ok(stored)
    }
}

/// A [`ProjectStore`] shared between threads.
///
/// One writer at a time; readers see a consistent snapshot because
/// mutations only become visible after their atomic save.
#[derive(Debug, Clone)]
pub struct SharedProjectStore {
    inner: Arc<RwLock<ProjectStore>>,
}

impl SharedProjectStore {
    pub fn new(store: ProjectStore) -> Self {
        SharedProjectStore {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    /// Run `f` with shared read access
    pub fn read<T>(&self, f: impl FnOnce(&ProjectStore) -> T) -> CalcResult<T> {
        let guard = self
            .inner
            .read()
            .map_err(|_| CalcError::internal("project store lock poisoned"))?;
        Ok(f(&guard))
    }

    /// Run `f` with exclusive write access
    pub fn write<T>(&self, f: impl FnOnce(&mut ProjectStore) -> CalcResult<T>) -> CalcResult<T> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| CalcError::internal("project store lock poisoned"))?;
        f(&mut guard)
    }

    pub fn upsert(&self, record: &CalcRecord) -> CalcResult<CalcRecord> {
        self.write(|store| store.upsert(record))
    }

    pub fn read_by_key(&self, key: &str) -> CalcResult<Option<(usize, CalcRecord)>> {
        self.read(|store| store.read_by_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::info;
    use std::thread;
    use tempfile::TempDir;

    fn open(dir: &TempDir) -> ProjectStore {
        let locator = ProjectLocator::for_project_number(dir.path(), "24-017");
        ProjectStore::open_or_create(&locator).unwrap()
    }

    #[test]
    fn test_create_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        assert_eq!(store.schema(), &Schema::canonical());
        store.upsert(&CalcRecord::new("0001")).unwrap();

        let reopened = open(&dir);
        assert_eq!(reopened.list_calculation_keys(), vec!["0001"]);
        assert!(reopened.migrated_columns().is_empty());
    }

    #[test]
    fn test_empty_key_is_refused() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        let err = store.upsert(&CalcRecord::new("  ")).unwrap_err();
        assert_eq!(err, CalcError::missing_key(field::CALCULATION_NUMBER));
        assert!(store.is_empty());
    }

    fn electrical_feeder() -> CalcRecord {
        let mut record = CalcRecord::new("0001")
            .with(field::CABLE_TAG, "CB-101")
            .with(field::PHASE, "3")
            .with(field::SYSTEM_VOLTAGE_LL, 400.0)
            .with(field::EQUIPMENT_RATING_KW, 75.0)
            .with(field::POWER_FACTOR, 0.85)
            .with(field::EFFICIENCY_PCT, 95.0)
            .with(field::PROTECTIVE_DEVICE_A, 160.0)
            .with(field::PROTECTION_TYPE, "MCCB (IEC 60947-2)")
            .with(field::CABLE_R, 0.193);
        crate::pipeline::recompute(&mut record);
        record
    }

    fn saved_at(record: &CalcRecord) -> chrono::DateTime<chrono::FixedOffset> {
        chrono::DateTime::parse_from_rfc3339(&record.text(field::SAVED_AT)).unwrap()
    }

    fn without_saved_at(mut record: CalcRecord) -> CalcRecord {
        record.remove(field::SAVED_AT);
        record
    }

    #[test]
    fn test_repeated_upsert_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        let record = electrical_feeder();

        let first = store.upsert(&record).unwrap();
        let second = store.upsert(&record).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.list_calculation_keys(), vec!["0001"]);
        assert_eq!(without_saved_at(first.clone()), without_saved_at(second.clone()));
        assert!(saved_at(&second) >= saved_at(&first));
        assert_eq!(store.read_by_key("0001").unwrap().1, second);
    }

    #[test]
    fn test_protection_only_upsert_leaves_electrical_inputs() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        let before = store.upsert(&electrical_feeder()).unwrap();

        let after = store
            .upsert(&CalcRecord::new("0001").with(field::PROTECTION_TYPE, "X"))
            .unwrap();

        assert_eq!(after.text(field::PROTECTION_TYPE), "X");
        assert!(saved_at(&after) >= saved_at(&before));
        for (name, value) in before.iter() {
            if name == field::PROTECTION_TYPE || name == field::SAVED_AT {
                continue;
            }
            assert_eq!(after.get(name), Some(value), "{} changed", name);
        }
        assert_eq!(after.len(), before.len());
    }

    #[test]
    fn test_partial_upsert_keeps_other_fields() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        store
            .upsert(
                &CalcRecord::new("0001")
                    .with(field::CABLE_TAG, "CB-101")
                    .with(field::SYSTEM_VOLTAGE_LL, 400.0)
                    .with(field::FROM_TAG, "MCC-1"),
            )
            .unwrap();
        store
            .upsert(
                &CalcRecord::new("0001")
                    .with(field::SYSTEM_VOLTAGE_LL, 690.0)
                    .with(field::FROM_TAG, ""),
            )
            .unwrap();

        let (index, record) = store.read_by_key("0001").unwrap();
        assert_eq!(index, 0);
        assert_eq!(record.text(field::CABLE_TAG), "CB-101");
        assert_eq!(record.number(field::SYSTEM_VOLTAGE_LL), Some(690.0));
        assert!(!record.contains(field::FROM_TAG));
        assert!(record.contains(field::SAVED_AT));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_unknown_fields_extend_schema() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        store
            .upsert(&CalcRecord::new("0001").with("Remarks", "spare way"))
            .unwrap();
        assert_eq!(store.schema().columns().last().map(String::as_str), Some("Remarks"));
        assert_eq!(store.schema().len(), Schema::canonical().len() + 1);
        assert_eq!(store.read_by_index(0).unwrap().text("Remarks"), "spare way");
    }

    #[test]
    fn test_keys_in_store_order() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        for key in ["0002", "0001", "0010"] {
            store.upsert(&CalcRecord::new(key)).unwrap();
        }
        assert_eq!(store.list_calculation_keys(), vec!["0002", "0001", "0010"]);
        assert_eq!(store.read_by_index(2).unwrap().key(), "0010");
        assert!(store.read_by_index(3).is_none());
        assert!(store.read_by_key("0003").is_none());
    }

    #[test]
    fn test_search() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        store
            .upsert(&CalcRecord::new("0001").with(field::TO_DESCRIPTION, "Fire Pump"))
            .unwrap();
        store
            .upsert(&CalcRecord::new("0002").with(field::TO_DESCRIPTION, "Lighting"))
            .unwrap();
        store
            .upsert(&CalcRecord::new("0003").with(field::TO_DESCRIPTION, "Jockey pump"))
            .unwrap();

        let hits: Vec<_> = store
            .search("PUMP")
            .iter()
            .map(|(index, record)| (*index, record.key()))
            .collect();
        assert_eq!(hits, vec![(0, "0001".to_string()), (2, "0003".to_string())]);
        for (index, record) in store.search("pump") {
            assert_eq!(store.read_by_index(index), Some(record));
        }
        assert!(store.search("   ").is_empty());
        assert!(store.search("chiller").is_empty());
    }

    #[test]
    fn test_project_info_replaced_whole() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        let first: ProjectInfo = [(info::PROJECT_TITLE, "A"), (info::LOCATION, "B")].into_iter().collect();
        store.write_project_info(first).unwrap();
        let second: ProjectInfo = [(info::PROJECT_TITLE, "C")].into_iter().collect();
        store.write_project_info(second.clone()).unwrap();

        let reopened = open(&dir);
        assert_eq!(reopened.read_project_info(), &second);
    }

    #[test]
    fn test_migration_appends_missing_columns() {
        let dir = TempDir::new().unwrap();
        let locator = ProjectLocator::for_project_number(dir.path(), "old");
        fs::write(
            locator.path(),
            r#"{"version":"0.1.0","project":[],"calc":{"headers":["CalculationNumber","Remarks","CableTag"],"rows":[["0001","keep","CB-9"]]}}"#,
        )
        .unwrap();

        let store = ProjectStore::open_or_create(&locator).unwrap();
        let columns = store.schema().columns();
        assert_eq!(&columns[..3], &["CalculationNumber", "Remarks", "CableTag"]);
        assert_eq!(columns.len(), Schema::canonical().len() + 1);
        assert_eq!(store.migrated_columns().len(), Schema::canonical().len() - 2);

        let record = store.read_by_index(0).unwrap();
        assert_eq!(record.text("Remarks"), "keep");
        assert_eq!(record.text(field::CABLE_TAG), "CB-9");

        // the migration was persisted
        assert!(ProjectStore::open_or_create(&locator).unwrap().migrated_columns().is_empty());
    }

    #[test]
    fn test_locked_store_blocks_second_writer() {
        let dir = TempDir::new().unwrap();
        let locator = ProjectLocator::for_project_number(dir.path(), "24-017");
        let store = ProjectStore::open_locked(&locator, "alice").unwrap();
        assert!(store.is_locked());
        let err = ProjectStore::open_locked(&locator, "bob").unwrap_err();
        assert!(err.is_recoverable());
        drop(store);
        assert!(ProjectStore::open_locked(&locator, "bob").is_ok());
    }

    #[test]
    fn test_shared_store_serializes_writers() {
        let dir = TempDir::new().unwrap();
        let shared = SharedProjectStore::new(open(&dir));

        let handles: Vec<_> = (1..=4)
            .map(|n| {
                let shared = shared.clone();
                thread::spawn(move || shared.upsert(&CalcRecord::new(format!("{:04}", n))).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let keys = shared.read(|store| store.list_calculation_keys()).unwrap();
        assert_eq!(keys.len(), 4);
        assert!(shared.read_by_key("0003").unwrap().is_some());
    }
}
