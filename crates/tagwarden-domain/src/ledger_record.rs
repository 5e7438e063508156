use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registro de seguimiento por instancia, propiedad exclusiva del ledger.
///
/// Invariantes:
/// - `first_seen <= last_seen` siempre.
/// - `missing_tags` nunca vacío mientras `is_active = true` (el registro
///   existe porque se observó al menos una violación).
/// - A lo sumo un registro por `instance_id`, incluso a través de ciclos
///   resolve/re-flag: re-marcar actualiza el registro existente.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub instance_id: String,
    /// Último conjunto de tags faltantes observado.
    pub missing_tags: Vec<String>,
    /// Se fija en la creación y no se muta jamás.
    pub first_seen: DateTime<Utc>,
    /// Avanza en cada re-observación.
    pub last_seen: DateTime<Utc>,
    pub is_active: bool,
}
