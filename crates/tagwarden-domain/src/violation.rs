use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Violación detectada en la pasada actual (efímera, no se persiste directo;
/// sólo a través del registro del ledger).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub instance_id: String,
    /// Tags faltantes en el orden del `RequiredTagSet` de la corrida.
    pub missing_tags: Vec<String>,
    pub launch_time: DateTime<Utc>,
}

/// Clasificación de una violación contra el estado previo del ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViolationStatus {
    /// Sin registro previo en el ledger.
    New,
    /// Ya existía un registro (activo o resuelto).
    Repeat,
}

impl fmt::Display for ViolationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationStatus::New => write!(f, "NEW"),
            ViolationStatus::Repeat => write!(f, "REPEAT"),
        }
    }
}

/// Violación más su clasificación NEW/REPEAT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedViolation {
    pub violation: Violation,
    pub status: ViolationStatus,
}
