//! Sources de instancias.
//!
//! `SnapshotFileSource` consume un snapshot JSON con la shape de wire del
//! proveedor: lista de objetos `{"InstanceId": …, "Tags": [{"Key": …,
//! "Value": …}], "LaunchTime": …}`. El campo `Tags` puede faltar (instancia
//! sin tags) y se trata como lista vacía. La lista Key/Value se pliega a un
//! mapping clave -> valor antes de entrar al dominio.

use chrono::{DateTime, Utc};
use log::debug;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tagwarden_core::{AuditError, InstanceSource};
use tagwarden_domain::Instance;

/// Estado de sesión del proveedor, explícito en vez de global: se pasa al
/// construir el source y queda inmutable durante la corrida.
#[derive(Debug, Clone, Default)]
pub struct SourceConfig {
    pub region: Option<String>,
    pub profile: Option<String>,
}

impl SourceConfig {
    /// Lee región/perfil de las variables de entorno convencionales.
    pub fn from_env() -> Self {
        Self {
            region: std::env::var("AWS_REGION").ok(),
            profile: std::env::var("AWS_PROFILE").ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawTag {
    #[serde(rename = "Key")]
    key: String,
    #[serde(rename = "Value")]
    value: String,
}

#[derive(Debug, Deserialize)]
struct RawInstance {
    // Ausente en el wire -> string vacío, que el dominio rechaza como
    // ValidationError (registro malformado, no falla de colección).
    #[serde(rename = "InstanceId", default)]
    instance_id: String,
    #[serde(rename = "Tags", default)]
    tags: Vec<RawTag>,
    #[serde(rename = "LaunchTime")]
    launch_time: DateTime<Utc>,
}

fn raw_to_instance(raw: RawInstance) -> Result<Instance, AuditError> {
    let tags: HashMap<String, String> = raw.tags.into_iter().map(|t| (t.key, t.value)).collect();
    Ok(Instance::new(&raw.instance_id, tags, raw.launch_time)?)
}

/// Source que lee el snapshot completo desde un archivo JSON.
pub struct SnapshotFileSource {
    path: PathBuf,
    config: SourceConfig,
}

impl SnapshotFileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_config(path, SourceConfig::default())
    }

    pub fn with_config(path: impl AsRef<Path>, config: SourceConfig) -> Self {
        Self { path: path.as_ref().to_path_buf(), config }
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Parsea el cuerpo JSON de un snapshot (separado de la lectura de
    /// archivo para poder testearlo sin filesystem).
    pub fn parse_snapshot(body: &str) -> Result<Vec<Instance>, AuditError> {
        let raw: Vec<RawInstance> = serde_json::from_str(body)
            .map_err(|e| AuditError::Collection(format!("malformed snapshot JSON: {e}")))?;
        raw.into_iter().map(raw_to_instance).collect()
    }
}

impl InstanceSource for SnapshotFileSource {
    fn list_instances(&self) -> Result<Vec<Instance>, AuditError> {
        let body = std::fs::read_to_string(&self.path)
            .map_err(|e| AuditError::Collection(format!("cannot read snapshot {}: {e}", self.path.display())))?;
        let instances = Self::parse_snapshot(&body)?;
        debug!("snapshot:loaded path={} instances={}", self.path.display(), instances.len());
        Ok(instances)
    }
}

/// Source con lista fija en memoria (tests y demos).
pub struct StaticSource {
    instances: Vec<Instance>,
}

impl StaticSource {
    pub fn new(instances: Vec<Instance>) -> Self {
        Self { instances }
    }
}

impl InstanceSource for StaticSource {
    fn list_instances(&self) -> Result<Vec<Instance>, AuditError> {
        Ok(self.instances.clone())
    }
}
