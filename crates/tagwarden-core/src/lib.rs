//! tagwarden-core: motor de auditoría de tags con seguimiento de ciclo de vida.
//!
//! Piezas:
//! - `detector`: función pura que encuentra instancias con tags faltantes.
//! - `ledger`: contrato del almacén durable de seguimiento + backend en memoria.
//! - `driver`: orquestación de una pasada (clasificación NEW/REPEAT y
//!   resolución opcional).
//! - `source`: frontera con el proveedor de instancias.
pub mod detector;
pub mod driver;
pub mod errors;
pub mod ledger;
pub mod source;

pub use detector::find_violators;
pub use driver::{AuditDriver, AuditOptions, AuditOutcome, AuditSummary};
pub use errors::AuditError;
pub use ledger::{ComplianceLedger, InMemoryLedger};
pub use source::InstanceSource;
