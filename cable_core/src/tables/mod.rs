//! # Lookup Tables
//!
//! Static derating and protection data used by the calculation chain.
//! Every table is immutable and built once on first access; nothing in the
//! engine mutates them at runtime.
//!
//! ## Tables
//!
//! | Table                | Key                                              | Source                     |
//! |----------------------|--------------------------------------------------|----------------------------|
//! | Free-air grouping    | arrangement → trays/ladders → cables per tray    | IEC 60364-5-52 Tables B.52.20/21 |
//! | Ambient temperature  | insulation class → ambient °C                    | Cable manufacturer data    |
//! | Protection I2 factor | protection device class                          | IEC 60898-1 / 60947-2 / 60269 |
//!
//! A miss in any table is not an error for the engine: the calculation
//! layer substitutes a neutral factor of 1.0 and logs the miss.

pub mod free_air;
pub mod protection;
pub mod temperature;

pub use free_air::{CoreType, Formation, GroupingTable};
pub use protection::ProtectionDevice;
pub use temperature::InsulationClass;
