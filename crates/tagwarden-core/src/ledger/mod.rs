//! Contrato del ledger de cumplimiento y backend en memoria.

mod memory;

pub use memory::InMemoryLedger;

use tagwarden_domain::LedgerRecord;

use crate::errors::AuditError;

/// Almacén durable de registros de seguimiento, con clave `instance_id`.
///
/// Semántica de fallas: las fallas de la capa de storage se devuelven como
/// `AuditError::Storage`; el ledger nunca se traga una falla de persistencia
/// (un upsert perdido corrompe la clasificación NEW/REPEAT de corridas
/// futuras).
pub trait ComplianceLedger {
    /// True si existe un registro para el id, sin importar su estado activo.
    /// Se usa únicamente para clasificar NEW vs REPEAT.
    fn seen(&self, instance_id: &str) -> Result<bool, AuditError>;

    /// Crea el registro (`first_seen = last_seen = now`, activo) o, si ya
    /// existe, avanza `last_seen`, reemplaza `missing_tags` y fuerza
    /// `is_active = true` (una re-violación reactiva un registro resuelto).
    /// Atómico por instancia: nunca se aplica parcialmente.
    /// `missing_tags` vacío es entrada inválida (un registro activo sólo
    /// existe porque se observó al menos una violación) y se rechaza con
    /// `AuditError::Validation` sin tocar el registro.
    fn upsert(&mut self, instance_id: &str, missing_tags: &[String]) -> Result<(), AuditError>;

    /// Marca el registro como inactivo; no-op si no existe.
    fn resolve(&mut self, instance_id: &str) -> Result<(), AuditError>;

    /// Registros activos, ordenados por `last_seen` descendente.
    fn list_active(&self) -> Result<Vec<LedgerRecord>, AuditError>;

    /// Registro completo sin importar estado activo; `None` = nunca observado.
    fn history(&self, instance_id: &str) -> Result<Option<LedgerRecord>, AuditError>;

    /// Borra todos los registros de forma irreversible (admin/testing).
    fn reset(&mut self) -> Result<(), AuditError>;
}
