//! # Calculation Session
//!
//! The working copy of one calculation in an editor, with navigation over
//! the project's calculations. Every edit and every load recomputes the
//! derived fields, so the working record is always consistent with its
//! inputs.
//!
//! ## Example
//!
//! ```rust,no_run
//! use cable_core::project::ProjectLocator;
//! use cable_core::schema::field;
//! use cable_core::session::CalcSession;
//! use cable_core::store::ProjectStore;
//! use std::path::Path;
//!
//! let locator = ProjectLocator::for_project_number(Path::new("projects"), "24-017");
//! let mut store = ProjectStore::open_or_create(&locator)?;
//!
//! let mut session = CalcSession::new(5.0, 15.0);
//! session.attach(&mut store)?;
//! session.set_input(field::SYSTEM_VOLTAGE_LL, "400")?;
//! session.save(&mut store)?;
//! # Ok::<(), cable_core::errors::CalcError>(())
//! ```

use tracing::debug;
use uuid::Uuid;

use crate::calculations::InstallationMethod;
use crate::config::AppConfig;
use crate::errors::{CalcError, CalcResult};
use crate::pipeline::{self, DerivedValues};
use crate::record::{next_calc_number, CalcRecord};
use crate::schema::{self, field};
use crate::store::ProjectStore;
use crate::tables::free_air;
use crate::tables::{CoreType, Formation, ProtectionDevice};

/// Key of the calculation created for an empty project
pub const FIRST_CALC_NUMBER: &str = "0001";

/// Ambient temperature filled in when a cable is moved into air, °C
pub const DEFAULT_AIR_AMBIENT_C: &str = "30";

#[derive(Debug, Clone)]
pub struct CalcSession {
    id: Uuid,
    record: CalcRecord,
    derived: DerivedValues,
    keys: Vec<String>,
    index: usize,
    dirty: bool,
    steady_vd_limit_pct: f64,
    starting_vd_limit_pct: f64,
}

impl CalcSession {
    /// Session whose new calculations get the given voltage drop limits
    pub fn new(steady_vd_limit_pct: f64, starting_vd_limit_pct: f64) -> Self {
        let record = CalcRecord::default();
        let derived = pipeline::recalculate(&record);
        CalcSession {
            id: Uuid::new_v4(),
            record,
            derived,
            keys: Vec::new(),
            index: 0,
            dirty: false,
            steady_vd_limit_pct,
            starting_vd_limit_pct,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.default_steady_vd_limit_pct, config.default_starting_vd_limit_pct)
    }

    /// Identifies this session, e.g. as an autosave key
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn record(&self) -> &CalcRecord {
        &self.record
    }

    pub fn derived(&self) -> &DerivedValues {
        &self.derived
    }

    /// Calculation number of the working record
    pub fn key(&self) -> String {
        self.record.key()
    }

    /// Position in [`keys`](Self::keys); equal to its length for an unsaved
    /// new calculation
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Edited since the last load or save
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn fresh_record(&self, key: &str) -> CalcRecord {
        CalcRecord::new(key)
            .with(field::PHASE, "3")
            .with(field::STEADY_VD_LIMIT_PCT, self.steady_vd_limit_pct)
            .with(field::STARTING_VD_LIMIT_PCT, self.starting_vd_limit_pct)
    }

    fn show(&mut self, mut record: CalcRecord, index: usize) {
        self.derived = pipeline::recompute(&mut record);
        self.record = record;
        self.index = index;
        self.dirty = false;
    }

    /// Re-read the key order and re-locate the working record in it
    fn refresh_keys(&mut self, store: &ProjectStore) {
        self.keys = store.list_calculation_keys();
        let key = self.key();
        self.index = self.keys.iter().position(|k| *k == key).unwrap_or(0);
    }

    /// Attach to a project: make sure it has a calculation, then load
    /// "0001" if it exists, else the first one.
    pub fn attach(&mut self, store: &mut ProjectStore) -> CalcResult<()> {
        if store.is_empty() {
            let mut first = self.fresh_record(FIRST_CALC_NUMBER);
            pipeline::recompute(&mut first);
            store.upsert(&first)?;
        }
        self.keys = store.list_calculation_keys();
        if !self.load_key(store, FIRST_CALC_NUMBER) {
            self.load_index(store, 0);
        }
        Ok(())
    }

    /// Start an unsaved calculation with the next free number.
    pub fn new_calculation(&mut self, store: &ProjectStore) -> String {
        self.keys = store.list_calculation_keys();
        let key = next_calc_number(self.keys.iter().map(String::as_str));
        let record = self.fresh_record(&key);
        let index = self.keys.len();
        self.show(record, index);
        debug!(key = %key, "new calculation");
        key
    }

    /// Load the calculation at `index`; false when out of range
    pub fn load_index(&mut self, store: &ProjectStore, index: usize) -> bool {
        match store.read_by_index(index) {
            Some(record) => {
                self.show(record, index);
                true
            }
            None => false,
        }
    }

    /// Load a calculation by key; false when not found
    pub fn load_key(&mut self, store: &ProjectStore, key: &str) -> bool {
        match store.read_by_key(key) {
            Some((index, record)) => {
                self.show(record, index);
                true
            }
            None => false,
        }
    }

    pub fn can_previous(&self) -> bool {
        self.index > 0
    }

    pub fn can_next(&self) -> bool {
        !self.keys.is_empty() && self.index + 1 < self.keys.len()
    }

    pub fn previous(&mut self, store: &ProjectStore) -> bool {
        self.keys = store.list_calculation_keys();
        self.can_previous() && self.load_index(store, self.index - 1)
    }

    pub fn next(&mut self, store: &ProjectStore) -> bool {
        self.keys = store.list_calculation_keys();
        self.can_next() && self.load_index(store, self.index + 1)
    }

    /// Load the first calculation matching `query`; false when none does
    pub fn search_first(&mut self, store: &ProjectStore, query: &str) -> bool {
        let Some((index, record)) = store.search(query).into_iter().next() else {
            return false;
        };
        self.keys = store.list_calculation_keys();
        self.show(record, index);
        true
    }

    /// Save the working record.
    ///
    /// Returns `CalcError::MissingKey` when the calculation number is blank.
    pub fn save(&mut self, store: &mut ProjectStore) -> CalcResult<()> {
        self.derived = pipeline::recompute(&mut self.record);
        let stored = store.upsert(&self.record)?;
        self.record = stored;
        self.dirty = false;
        self.refresh_keys(store);
        Ok(())
    }

    /// Edit one input field and recompute.
    ///
    /// Derived fields are refused with `CalcError::ReadOnlyField`. Some
    /// edits fill in related inputs the way the editor form does:
    ///
    /// - a protection class with a known constant sets `I2_Factor`
    /// - single core defaults the formation to flat; multicore clears it
    /// - "In Air" fills in the first arrangement, tray count and cable count
    ///   valid for the cable, and 30 °C ambient; other installations clear
    ///   those inputs
    pub fn set_input(&mut self, name: &str, text: &str) -> CalcResult<&DerivedValues> {
        if schema::is_derived(name) {
            return Err(CalcError::read_only_field(name));
        }
        self.record.set(name, text);

        match name {
            field::PROTECTION_TYPE => {
                if let Some(k) = ProtectionDevice::from_label(text).and_then(|p| p.i2_factor()) {
                    self.record.set(field::I2_FACTOR, format!("{:.2}", k));
                }
            }
            field::CORE_TYPE => {
                match CoreType::from_label(text) {
                    CoreType::SingleCore if self.record.text(field::FORMATION).is_empty() => {
                        self.record.set(field::FORMATION, Formation::Flat.label());
                    }
                    CoreType::SingleCore => {}
                    CoreType::Multicore => self.record.set(field::FORMATION, ""),
                }
                self.apply_air_defaults();
            }
            field::TYPE_OF_INSTALLATION | field::FORMATION | field::CABLE_MANAGEMENT => {
                self.apply_air_defaults();
            }
            _ => {}
        }

        self.derived = pipeline::recompute(&mut self.record);
        self.dirty = true;
        Ok(&self.derived)
    }

    fn apply_air_defaults(&mut self) {
        let in_air = InstallationMethod::from_label(&self.record.text(field::TYPE_OF_INSTALLATION))
            == Some(InstallationMethod::InAir);
        if !in_air {
            for name in [
                field::CABLE_MANAGEMENT,
                field::NUMBER_OF_TRAYS,
                field::CABLES_PER_TRAY,
                field::AMBIENT_TEMPERATURE_C,
            ] {
                if self.record.contains(name) {
                    self.record.set(name, "");
                }
            }
            return;
        }

        let core = CoreType::from_label(&self.record.text(field::CORE_TYPE));
        let formation = Formation::from_label(&self.record.text(field::FORMATION));
        let options = free_air::arrangements(core);
        let mut arrangement = self.record.text(field::CABLE_MANAGEMENT);
        if !options.contains(&arrangement.as_str()) {
            if let Some(first) = options.first() {
                arrangement = first.to_string();
                self.record.set(field::CABLE_MANAGEMENT, first.to_string());
            }
        }
        if self.record.text(field::AMBIENT_TEMPERATURE_C).is_empty() {
            self.record.set(field::AMBIENT_TEMPERATURE_C, DEFAULT_AIR_AMBIENT_C);
        }

        if let Some(table) = free_air::grouping_table(core, formation, &arrangement) {
            if self.record.text(field::NUMBER_OF_TRAYS).is_empty() {
                if let Some(trays) = table.tray_counts().first() {
                    self.record.set(field::NUMBER_OF_TRAYS, trays.to_string());
                }
            }
            if self.record.text(field::CABLES_PER_TRAY).is_empty() {
                if let Some(cables) = table.cable_counts().first() {
                    self.record.set(field::CABLES_PER_TRAY, cables.to_string());
                }
            }
        }
    }
}
