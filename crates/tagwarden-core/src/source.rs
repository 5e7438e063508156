//! Frontera con el proveedor de instancias.

use tagwarden_domain::Instance;

use crate::errors::AuditError;

/// Enumera el snapshot de instancias de la corrida.
///
/// Las fallas de colección (red/credenciales/archivo) se devuelven como
/// `AuditError::Collection` y el driver las propaga sin reintentar: la
/// política de retry pertenece al source.
pub trait InstanceSource {
    fn list_instances(&self) -> Result<Vec<Instance>, AuditError>;
}
