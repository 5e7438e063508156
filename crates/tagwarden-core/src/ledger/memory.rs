use std::collections::HashMap;

use chrono::Utc;
use tagwarden_domain::LedgerRecord;

use crate::errors::AuditError;
use crate::ledger::ComplianceLedger;

/// Backend en memoria del ledger (tests y embebido). Misma semántica que el
/// backend durable, sin durabilidad entre procesos.
pub struct InMemoryLedger {
    records: HashMap<String, LedgerRecord>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self { records: HashMap::new() }
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl ComplianceLedger for InMemoryLedger {
    fn seen(&self, instance_id: &str) -> Result<bool, AuditError> {
        Ok(self.records.contains_key(instance_id))
    }

    fn upsert(&mut self, instance_id: &str, missing_tags: &[String]) -> Result<(), AuditError> {
        if missing_tags.is_empty() {
            return Err(AuditError::Validation("missing_tags must not be empty on upsert".to_string()));
        }
        let now = Utc::now();
        match self.records.get_mut(instance_id) {
            Some(record) => {
                record.last_seen = now;
                record.missing_tags = missing_tags.to_vec();
                record.is_active = true;
            }
            None => {
                self.records.insert(instance_id.to_string(), LedgerRecord {
                    instance_id: instance_id.to_string(),
                    missing_tags: missing_tags.to_vec(),
                    first_seen: now,
                    last_seen: now,
                    is_active: true,
                });
            }
        }
        Ok(())
    }

    fn resolve(&mut self, instance_id: &str) -> Result<(), AuditError> {
        if let Some(record) = self.records.get_mut(instance_id) {
            record.is_active = false;
        }
        Ok(())
    }

    fn list_active(&self) -> Result<Vec<LedgerRecord>, AuditError> {
        let mut active: Vec<LedgerRecord> = self.records.values().filter(|r| r.is_active).cloned().collect();
        active.sort_by(|a, b| b.last_seen.cmp(&a.last_seen).then_with(|| a.instance_id.cmp(&b.instance_id)));
        Ok(active)
    }

    fn history(&self, instance_id: &str) -> Result<Option<LedgerRecord>, AuditError> {
        Ok(self.records.get(instance_id).cloned())
    }

    fn reset(&mut self) -> Result<(), AuditError> {
        self.records.clear();
        Ok(())
    }
}
