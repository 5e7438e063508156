//! Detector de violaciones (función pura, sin I/O).

use tagwarden_domain::{Instance, RequiredTagSet, Violation};

use crate::errors::AuditError;

/// Calcula, para cada instancia, los tags requeridos ausentes de su mapping.
///
/// - `missing_tags` conserva el orden de `required` para que la persistencia
///   sea estable y comparable entre corridas.
/// - Instancias sin tags faltantes se excluyen; el resto sale en orden de
///   entrada.
/// - Una instancia con id vacío (posible vía deserialización, que no pasa por
///   el constructor validante) es entrada malformada y aborta el lote.
pub fn find_violators(instances: &[Instance], required: &RequiredTagSet) -> Result<Vec<Violation>, AuditError> {
    let mut violations = Vec::new();
    for instance in instances {
        if instance.id().trim().is_empty() {
            return Err(AuditError::Validation("instance without id in input batch".to_string()));
        }
        let missing: Vec<String> = required
            .keys()
            .iter()
            .filter(|key| !instance.has_tag(key))
            .cloned()
            .collect();
        if !missing.is_empty() {
            violations.push(Violation {
                instance_id: instance.id().to_string(),
                missing_tags: missing,
                launch_time: instance.launch_time(),
            });
        }
    }
    Ok(violations)
}
