//! # Cable Calculations
//!
//! Each stage of a cable sizing calculation follows the pattern:
//!
//! - `*Input` - Typed input parameters (JSON-serializable)
//! - `*Result` - Calculation results (JSON-serializable)
//! - `calculate(input) -> *Result` - Pure calculation function
//!
//! Stages never fail. Degenerate inputs produce zero currents, neutral
//! factors or failing checks, so a recalculation pass always completes.
//!
//! ## Available Calculations
//!
//! - [`load`] - Phase voltage, apparent power, full-load and starting current
//! - [`derating`] - Installation correction factors and their product
//! - [`overload`] - Protective device / cable coordination
//! - [`voltage_drop`] - Steady-state and starting voltage drop

pub mod derating;
pub mod load;
pub mod overload;
pub mod voltage_drop;

pub use derating::{DeratingInput, DeratingResult, InstallationMethod};
pub use load::{LoadInput, LoadResult};
pub use overload::{OverloadInput, OverloadResult};
pub use voltage_drop::{DropCheck, VoltageDropInput, VoltageDropResult};
