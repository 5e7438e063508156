use serde::{Deserialize, Serialize};

use crate::DomainError;

/// Conjunto ordenado de claves de tag obligatorias para la corrida.
/// Inmutable tras construcción; el orden de `keys` define el orden en que se
/// reportan los tags faltantes (estable entre corridas).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredTagSet {
    keys: Vec<String>,
}

impl RequiredTagSet {
    /// Construye el conjunto validando que no esté vacío ni contenga claves
    /// vacías. Claves repetidas se deduplican conservando la primera posición.
    pub fn new(keys: Vec<String>) -> Result<Self, DomainError> {
        if keys.is_empty() {
            return Err(DomainError::ValidationError("required tag set must not be empty".to_string()));
        }
        let mut deduped: Vec<String> = Vec::with_capacity(keys.len());
        for key in keys {
            if key.trim().is_empty() {
                return Err(DomainError::ValidationError("required tag key must not be empty".to_string()));
            }
            if !deduped.contains(&key) {
                deduped.push(key);
            }
        }
        Ok(RequiredTagSet { keys: deduped })
    }

    pub fn keys(&self) -> &[String] { &self.keys }
    pub fn len(&self) -> usize { self.keys.len() }
    pub fn is_empty(&self) -> bool { self.keys.is_empty() }
}
