//! Errores del core (taxonomía de la pasada de auditoría).

use tagwarden_domain::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    /// Registro de entrada malformado; aborta la pasada sin persistir nada
    /// para ese lote.
    #[error("validation: {0}")]
    Validation(String),
    /// Falla del instance source; aborta antes de mutar el ledger.
    #[error("collection: {0}")]
    Collection(String),
    /// Falla de lectura/escritura del ledger; se propaga de inmediato, el
    /// caller decide si reintenta la pasada completa.
    #[error("storage: {0}")]
    Storage(String),
}

impl From<DomainError> for AuditError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::ValidationError(msg) => AuditError::Validation(msg),
        }
    }
}
