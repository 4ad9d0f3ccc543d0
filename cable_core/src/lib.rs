//! # cable_core - Cable Sizing Calculation Engine
//!
//! `cable_core` computes and records low-voltage cable sizing calculations:
//! load currents, installation derating, overload protection coordination
//! and voltage drop, organized per project in a versioned workbook file.
//!
//! ## Design Philosophy
//!
//! - **Pure formulas**: [`equations`] and [`calculations`] never touch I/O
//! - **Never stale**: the [`pipeline`] rebuilds every derived field from its
//!   inputs in one pass
//! - **Forgiving inputs**: blank or unparseable values fall back to neutral
//!   defaults; table misses resolve to a factor of 1.0 and are logged
//! - **Safe storage**: atomic saves, additive schema migration, optional
//!   file locking
//!
//! ## Quick Start
//!
//! ```rust
//! use cable_core::pipeline;
//! use cable_core::record::CalcRecord;
//! use cable_core::schema::field;
//!
//! let mut record = CalcRecord::new("0001")
//!     .with(field::SYSTEM_VOLTAGE_LL, 400.0)
//!     .with(field::EQUIPMENT_RATING_KW, 75.0)
//!     .with(field::POWER_FACTOR, 0.85)
//!     .with(field::EFFICIENCY_PCT, 95.0);
//!
//! let derived = pipeline::recompute(&mut record);
//! assert_eq!(derived.load.full_load_current_a, 134.06);
//! ```
//!
//! ## Modules
//!
//! - [`equations`] - Electrical formulas
//! - [`tables`] - Free-air grouping, temperature and protection device data
//! - [`calculations`] - Load, derating, overload and voltage drop stages
//! - [`schema`] / [`record`] - Calculation fields and records
//! - [`pipeline`] - Recalculation of derived fields
//! - [`project`] / [`file_io`] / [`store`] - Workbook files and the record store
//! - [`session`] / [`autosave`] - Editing, navigation and debounced saving
//! - [`export`] - CSV export and text summary
//! - [`config`] - Application settings
//! - [`errors`] - Structured error types

pub mod autosave;
pub mod calculations;
pub mod config;
pub mod equations;
pub mod errors;
pub mod export;
pub mod file_io;
pub mod pipeline;
pub mod project;
pub mod record;
pub mod schema;
pub mod session;
pub mod store;
pub mod tables;

// Re-export commonly used types at crate root for convenience
pub use config::AppConfig;
pub use errors::{CalcError, CalcResult};
pub use file_io::{find_projects, load_workbook, save_workbook, FileLock};
pub use pipeline::{recalculate, recompute, DerivedValues};
pub use project::{ProjectInfo, ProjectLocator, Workbook};
pub use record::{CalcRecord, FieldValue};
pub use session::CalcSession;
pub use store::{ProjectStore, SharedProjectStore};
