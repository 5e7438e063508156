use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use tagwarden_core::{
    AuditDriver, AuditError, AuditOptions, ComplianceLedger, InMemoryLedger, InstanceSource,
};
use tagwarden_domain::{Instance, RequiredTagSet, Violation, ViolationStatus};

fn launch() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 10, 8, 30, 0).unwrap()
}

fn violation(id: &str, missing: &[&str]) -> Violation {
    Violation {
        instance_id: id.to_string(),
        missing_tags: missing.iter().map(|m| m.to_string()).collect(),
        launch_time: launch(),
    }
}

/// Source de prueba con lista fija o falla simulada de colección.
struct FakeSource {
    instances: Vec<Instance>,
    fail: bool,
}

impl InstanceSource for FakeSource {
    fn list_instances(&self) -> Result<Vec<Instance>, AuditError> {
        if self.fail {
            return Err(AuditError::Collection("simulated provider outage".to_string()));
        }
        Ok(self.instances.clone())
    }
}

fn tagged_instance(id: &str, tags: &[(&str, &str)]) -> Instance {
    let map: HashMap<String, String> = tags.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    Instance::new(id, map, launch()).expect("valid instance")
}

#[test]
fn first_observation_classifies_as_new() {
    let mut driver = AuditDriver::new(InMemoryLedger::new());
    let classified = driver.reconcile(&[violation("i-1", &["Owner"])]).expect("reconcile");

    assert_eq!(classified.len(), 1);
    assert_eq!(classified[0].status, ViolationStatus::New);
    assert!(driver.ledger().seen("i-1").expect("seen"), "reconcile must upsert");
}

#[test]
fn lifecycle_new_then_repeat_then_resolved() {
    let mut driver = AuditDriver::new(InMemoryLedger::new());
    let v = violation("i-1", &["Owner", "CostCenter"]);

    // Corrida 1: NEW
    let run1 = driver.reconcile(std::slice::from_ref(&v)).expect("run 1");
    assert_eq!(run1[0].status, ViolationStatus::New);

    // Corrida 2: misma violación, REPEAT
    let run2 = driver.reconcile(std::slice::from_ref(&v)).expect("run 2");
    assert_eq!(run2[0].status, ViolationStatus::Repeat);

    // Corrida 3: i-1 ya no viola; la pasada de resolución lo marca inactivo
    let run3 = driver.reconcile(&[]).expect("run 3");
    assert!(run3.is_empty());
    let resolved = driver.resolve_absent(&[]).expect("resolution pass");
    assert_eq!(resolved, vec!["i-1".to_string()]);

    let record = driver.ledger().history("i-1").expect("history").expect("record");
    assert!(!record.is_active);
}

#[test]
fn repeat_even_after_resolution() {
    // Un registro resuelto sigue contando como visto: re-violar es REPEAT.
    let mut driver = AuditDriver::new(InMemoryLedger::new());
    let v = violation("i-1", &["Owner"]);

    driver.reconcile(std::slice::from_ref(&v)).expect("run 1");
    driver.resolve_absent(&[]).expect("resolution pass");

    let run2 = driver.reconcile(std::slice::from_ref(&v)).expect("run 2");
    assert_eq!(run2[0].status, ViolationStatus::Repeat);
    let record = driver.ledger().history("i-1").expect("history").expect("record");
    assert!(record.is_active, "re-violation reactivates the record");
}

#[test]
fn empty_reconcile_mutates_nothing() {
    let mut driver = AuditDriver::new(InMemoryLedger::new());
    let classified = driver.reconcile(&[]).expect("reconcile");
    assert!(classified.is_empty());
    assert!(driver.ledger().list_active().expect("list_active").is_empty());
}

#[test]
fn duplicate_id_in_one_pass_keeps_one_classification() {
    // No se espera en respuestas reales del proveedor, pero el snapshot de
    // `seen` garantiza que ambas entradas reciben la misma clasificación.
    let mut driver = AuditDriver::new(InMemoryLedger::new());
    let batch = vec![violation("i-1", &["Owner"]), violation("i-1", &["Owner"])];

    let classified = driver.reconcile(&batch).expect("reconcile");
    assert_eq!(classified.len(), 2);
    assert!(classified.iter().all(|c| c.status == ViolationStatus::New));
}

#[test]
fn resolution_pass_keeps_current_violators_active() {
    let mut driver = AuditDriver::new(InMemoryLedger::new());
    driver.reconcile(&[violation("i-1", &["Owner"]), violation("i-2", &["Owner"])]).expect("run 1");

    // En la corrida siguiente sólo i-2 sigue violando
    let current = vec![violation("i-2", &["Owner"])];
    driver.reconcile(&current).expect("run 2");
    let resolved = driver.resolve_absent(&current).expect("resolution pass");

    assert_eq!(resolved, vec!["i-1".to_string()]);
    let active = driver.ledger().list_active().expect("list_active");
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].instance_id, "i-2");
}

#[test]
fn run_audit_summary_counts_by_summation() {
    let mut driver = AuditDriver::new(InMemoryLedger::new());
    // i-known ya está en el ledger de una corrida previa
    driver.ledger_mut().upsert("i-known", &["Owner".to_string()]).expect("seed");

    let source = FakeSource {
        instances: vec![
            tagged_instance("i-known", &[]),
            tagged_instance("i-fresh", &[("Owner", "a")]),
            tagged_instance("i-ok", &[("Owner", "a"), ("CostCenter", "b"), ("Project", "c")]),
        ],
        fail: false,
    };
    let required = RequiredTagSet::new(vec!["Owner".to_string(), "CostCenter".to_string(), "Project".to_string()])
        .expect("required set");

    let outcome = driver.run_audit(&source, &required, AuditOptions::default()).expect("audit");
    let summary = outcome.summary();

    assert_eq!(summary.total_scanned, 3);
    assert_eq!(summary.total_violators, 2);
    assert_eq!(summary.new_count, 1);
    assert_eq!(summary.repeat_count, 1);
    assert_eq!(summary.resolved_count, 0, "resolution is opt-in and was off");
}

#[test]
fn run_audit_with_auto_resolve_marks_absent_records() {
    let mut driver = AuditDriver::new(InMemoryLedger::new());
    driver.ledger_mut().upsert("i-gone", &["Owner".to_string()]).expect("seed");

    let source = FakeSource {
        instances: vec![tagged_instance("i-bad", &[("CostCenter", "x")])],
        fail: false,
    };
    let required = RequiredTagSet::new(vec!["Owner".to_string()]).expect("required set");

    let outcome = driver
        .run_audit(&source, &required, AuditOptions { auto_resolve: true })
        .expect("audit");

    assert_eq!(outcome.resolved, vec!["i-gone".to_string()]);
    let record = driver.ledger().history("i-gone").expect("history").expect("record");
    assert!(!record.is_active);
}

#[test]
fn collection_failure_aborts_before_any_ledger_mutation() {
    let mut driver = AuditDriver::new(InMemoryLedger::new());
    let source = FakeSource { instances: vec![], fail: true };
    let required = RequiredTagSet::new(vec!["Owner".to_string()]).expect("required set");

    let err = driver.run_audit(&source, &required, AuditOptions::default());
    assert!(matches!(err, Err(AuditError::Collection(_))));
    assert!(driver.ledger().list_active().expect("list_active").is_empty());
}
