//! Driver de reconciliación: orquesta una pasada de auditoría.
//!
//! Garantía de orden: la clasificación NEW/REPEAT se calcula contra el estado
//! del ledger al inicio de la pasada. Los `seen` se resuelven todos antes del
//! primer `upsert` (snapshot-read-then-batch-write), así un upsert de la misma
//! pasada nunca contamina la clasificación de otra violación, incluso si un
//! id se repitiera en la entrada.

use std::collections::{HashMap, HashSet};

use log::debug;
use serde::{Deserialize, Serialize};
use tagwarden_domain::{ClassifiedViolation, RequiredTagSet, Violation, ViolationStatus};

use crate::detector::find_violators;
use crate::errors::AuditError;
use crate::ledger::ComplianceLedger;
use crate::source::InstanceSource;

/// Opciones de la pasada. La resolución automática es opt-in: marcar
/// inactivos los registros activos ausentes del set de violadores actual.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuditOptions {
    pub auto_resolve: bool,
}

/// Resultado de una pasada completa.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditOutcome {
    pub total_scanned: usize,
    pub classified: Vec<ClassifiedViolation>,
    /// Ids resueltos por la pasada de resolución (vacío si no corrió).
    pub resolved: Vec<String>,
}

/// Agregados de la pasada, computados por suma sobre la secuencia
/// clasificada, nunca como estado aparte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub total_scanned: usize,
    pub total_violators: usize,
    pub new_count: usize,
    pub repeat_count: usize,
    pub resolved_count: usize,
}

impl AuditOutcome {
    pub fn summary(&self) -> AuditSummary {
        let new_count = self.classified.iter().filter(|c| c.status == ViolationStatus::New).count();
        AuditSummary {
            total_scanned: self.total_scanned,
            total_violators: self.classified.len(),
            new_count,
            repeat_count: self.classified.len() - new_count,
            resolved_count: self.resolved.len(),
        }
    }
}

/// Orquestador de una pasada: detector sobre el snapshot actual, consulta al
/// ledger para clasificar, upsert, y resolución opcional.
pub struct AuditDriver<L: ComplianceLedger> {
    ledger: L,
}

impl<L: ComplianceLedger> AuditDriver<L> {
    pub fn new(ledger: L) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn into_ledger(self) -> L {
        self.ledger
    }

    /// Clasifica cada violación como NEW o REPEAT y upserta el ledger.
    ///
    /// El upsert se hace siempre, para que `last_seen`/`missing_tags` reflejen
    /// la pasada actual aunque el reporte posterior falle. Una entrada vacía
    /// no muta el ledger.
    pub fn reconcile(&mut self, violations: &[Violation]) -> Result<Vec<ClassifiedViolation>, AuditError> {
        debug!("reconcile:start violations={}", violations.len());

        // Fase 1: snapshot de `seen` al inicio de la pasada.
        let mut seen_at_start: HashMap<&str, bool> = HashMap::with_capacity(violations.len());
        for violation in violations {
            let id = violation.instance_id.as_str();
            if !seen_at_start.contains_key(id) {
                seen_at_start.insert(id, self.ledger.seen(id)?);
            }
        }

        // Fase 2: upserts (atómicos por instancia).
        for violation in violations {
            self.ledger.upsert(&violation.instance_id, &violation.missing_tags)?;
        }

        // Fase 3: clasificación contra el snapshot.
        let classified: Vec<ClassifiedViolation> = violations
            .iter()
            .map(|violation| {
                let was_seen = seen_at_start[violation.instance_id.as_str()];
                ClassifiedViolation {
                    violation: violation.clone(),
                    status: if was_seen { ViolationStatus::Repeat } else { ViolationStatus::New },
                }
            })
            .collect();
        debug!("reconcile:done classified={}", classified.len());
        Ok(classified)
    }

    /// Pasada de resolución: todo registro activo cuyo id no aparece entre los
    /// violadores actuales se marca inactivo. No verifica que la instancia
    /// siga existiendo (la ausencia puede significar terminación; ambigüedad
    /// aceptada). Devuelve los ids resueltos en el orden del listado activo.
    pub fn resolve_absent(&mut self, violations: &[Violation]) -> Result<Vec<String>, AuditError> {
        let current: HashSet<&str> = violations.iter().map(|v| v.instance_id.as_str()).collect();
        let mut resolved = Vec::new();
        for record in self.ledger.list_active()? {
            if !current.contains(record.instance_id.as_str()) {
                self.ledger.resolve(&record.instance_id)?;
                resolved.push(record.instance_id);
            }
        }
        debug!("resolve_absent:done resolved={}", resolved.len());
        Ok(resolved)
    }

    /// Pasada completa: colecta, detecta, reconcilia y (opcional) resuelve.
    /// Una falla de colección aborta antes de tocar el ledger.
    pub fn run_audit<S: InstanceSource + ?Sized>(
        &mut self,
        source: &S,
        required: &RequiredTagSet,
        options: AuditOptions,
    ) -> Result<AuditOutcome, AuditError> {
        let instances = source.list_instances()?;
        debug!("run_audit:collected instances={}", instances.len());
        let violations = find_violators(&instances, required)?;
        let classified = self.reconcile(&violations)?;
        let resolved = if options.auto_resolve {
            self.resolve_absent(&violations)?
        } else {
            Vec::new()
        };
        Ok(AuditOutcome { total_scanned: instances.len(), classified, resolved })
    }
}
