//! Errores de persistencia.
//! Mapea errores de Diesel / conexión a variantes semánticas de la capa de
//! storage, y colapsa hacia `AuditError::Storage` en la frontera con el core.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tagwarden_core::AuditError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("unique violation: {0}")]
    UniqueViolation(String),
    #[error("check violation: {0}")]
    CheckViolation(String),
    #[error("not found")]
    NotFound,
    #[error("database locked (retryable): {0}")]
    Locked(String),
    #[error("transient IO / connection pool error: {0}")]
    TransientIo(String),
    #[error("corrupt stored value: {0}")]
    Corruption(String),
    #[error("unknown database error: {0}")]
    Unknown(String),
}

impl From<DieselError> for PersistenceError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => Self::NotFound,
            DieselError::DatabaseError(kind, info) => match kind {
                DatabaseErrorKind::UniqueViolation => Self::UniqueViolation(info.message().to_string()),
                DatabaseErrorKind::CheckViolation => Self::CheckViolation(info.message().to_string()),
                // SQLite reporta contención de lock como error genérico con
                // mensaje "database is locked" / SQLITE_BUSY.
                other => {
                    let msg = info.message().to_string();
                    if msg.to_lowercase().contains("locked") {
                        Self::Locked(msg)
                    } else {
                        Self::Unknown(format!("db error kind {:?}: {}", other, msg))
                    }
                }
            },
            DieselError::DeserializationError(e) => Self::Corruption(format!("deser: {e}")),
            DieselError::SerializationError(e) => Self::Corruption(format!("ser: {e}")),
            DieselError::AlreadyInTransaction => Self::Unknown("already in transaction".into()),
            DieselError::BrokenTransactionManager => Self::TransientIo("broken transaction manager".into()),
            DieselError::QueryBuilderError(e) => Self::Unknown(format!("query builder: {e}")),
            DieselError::RollbackTransaction => Self::Unknown("rollback transaction".into()),
            DieselError::NotInTransaction => Self::Unknown("not in transaction".into()),
            other => Self::Unknown(format!("unhandled diesel error: {other:?}")),
        }
    }
}

impl From<PersistenceError> for AuditError {
    fn from(err: PersistenceError) -> Self {
        AuditError::Storage(err.to_string())
    }
}
