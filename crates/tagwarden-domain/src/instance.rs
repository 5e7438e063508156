use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::DomainError;

/// Instancia de cómputo observada en un snapshot del proveedor.
/// Solo lectura para el core: el detector consulta sus tags, nunca los muta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    id: String,
    tags: HashMap<String, String>,
    launch_time: DateTime<Utc>,
}

impl Instance {
    pub fn new(id: &str, tags: HashMap<String, String>, launch_time: DateTime<Utc>) -> Result<Self, DomainError> {
        if id.trim().is_empty() {
            return Err(DomainError::ValidationError("instance id must not be empty".to_string()));
        }
        Ok(Instance { id: id.to_string(), tags, launch_time })
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn tags(&self) -> &HashMap<String, String> { &self.tags }
    pub fn launch_time(&self) -> DateTime<Utc> { self.launch_time }
    pub fn has_tag(&self, key: &str) -> bool { self.tags.contains_key(key) }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<instance: {}, {} tags>", self.id, self.tags.len())
    }
}
