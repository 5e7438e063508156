//! tagwarden-adapters: fronteras del auditor.
//!
//! - `source`: implementaciones de `InstanceSource` (snapshot JSON en el
//!   formato de wire del proveedor, y lista estática para tests/demos).
//! - `report`: salida tabular (CSV) y resumen de consola.

pub mod report;
pub mod source;

pub use report::{export_csv, print_summary, write_csv};
pub use source::{SnapshotFileSource, SourceConfig, StaticSource};
