//! Pruebas del ledger SQLite: misma semántica que el backend en memoria del
//! core, más la representación JSON de `missing_tags`.


use diesel::connection::SimpleConnection;
use tagwarden_core::{AuditError, ComplianceLedger};
use tagwarden_persistence::ConnectionProvider;
use test_support::memory_ledger;

fn tags(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

#[test]
fn seen_is_false_for_new_instance() {
    let ledger = memory_ledger();
    assert!(!ledger.seen("i-99999").expect("seen"));
}

#[test]
fn seen_is_true_after_recording() {
    let mut ledger = memory_ledger();
    ledger.upsert("i-12345", &tags(&["Owner", "CostCenter"])).expect("upsert");
    assert!(ledger.seen("i-12345").expect("seen"));
}

#[test]
fn upsert_stores_missing_tags_in_order() {
    let mut ledger = memory_ledger();
    let missing = tags(&["Owner", "CostCenter", "Project"]);
    ledger.upsert("i-54321", &missing).expect("upsert");

    let record = ledger.history("i-54321").expect("history").expect("record");
    assert_eq!(record.instance_id, "i-54321");
    assert_eq!(record.missing_tags, missing);
    assert!(record.is_active);
    assert!(record.first_seen <= record.last_seen);
}

#[test]
fn missing_tag_keys_may_contain_commas() {
    // La columna guarda un array JSON, no un comma-join: una clave con coma
    // debe sobrevivir el roundtrip intacta.
    let mut ledger = memory_ledger();
    let missing = tags(&["Team, Billing", "Owner"]);
    ledger.upsert("i-commas", &missing).expect("upsert");

    let record = ledger.history("i-commas").expect("history").expect("record");
    assert_eq!(record.missing_tags, missing);
}

#[test]
fn upsert_updates_on_duplicate_and_preserves_first_seen() {
    let mut ledger = memory_ledger();
    ledger.upsert("i-11111", &tags(&["Owner"])).expect("first upsert");
    let first = ledger.history("i-11111").expect("history").expect("record");

    ledger.upsert("i-11111", &tags(&["Owner", "CostCenter"])).expect("second upsert");
    let second = ledger.history("i-11111").expect("history").expect("record");

    assert_eq!(second.first_seen, first.first_seen, "first_seen must never mutate");
    assert!(second.last_seen >= first.last_seen);
    assert_eq!(second.missing_tags, tags(&["Owner", "CostCenter"]));
}

#[test]
fn resolve_marks_inactive_and_history_survives() {
    let mut ledger = memory_ledger();
    ledger.upsert("i-22222", &tags(&["Owner"])).expect("upsert");
    ledger.resolve("i-22222").expect("resolve");

    let record = ledger.history("i-22222").expect("history").expect("record");
    assert!(!record.is_active);
    assert!(ledger.list_active().expect("list_active").iter().all(|r| r.instance_id != "i-22222"));
}

#[test]
fn resolve_unknown_is_noop() {
    let mut ledger = memory_ledger();
    ledger.resolve("i-unknown").expect("resolve unknown must not fail");
    assert!(ledger.history("i-unknown").expect("history").is_none());
}

#[test]
fn upsert_after_resolve_reactivates_without_duplicate() {
    let mut ledger = memory_ledger();
    ledger.upsert("i-55555", &tags(&["Owner"])).expect("upsert");
    let created = ledger.history("i-55555").expect("history").expect("record");
    ledger.resolve("i-55555").expect("resolve");

    ledger.upsert("i-55555", &tags(&["Project"])).expect("re-upsert");
    let reactivated = ledger.history("i-55555").expect("history").expect("record");

    assert!(reactivated.is_active);
    assert_eq!(reactivated.first_seen, created.first_seen);
    assert_eq!(reactivated.missing_tags, tags(&["Project"]));

    let active = ledger.list_active().expect("list_active");
    assert_eq!(active.iter().filter(|r| r.instance_id == "i-55555").count(), 1, "no duplicate record");
}

#[test]
fn list_active_returns_active_only_ordered_by_last_seen_desc() {
    let mut ledger = memory_ledger();
    ledger.upsert("i-active-1", &tags(&["Owner"])).expect("upsert");
    ledger.upsert("i-active-2", &tags(&["CostCenter"])).expect("upsert");
    ledger.upsert("i-inactive", &tags(&["Project"])).expect("upsert");
    ledger.resolve("i-inactive").expect("resolve");

    let active = ledger.list_active().expect("list_active");
    assert_eq!(active.len(), 2);
    let ids: Vec<&str> = active.iter().map(|r| r.instance_id.as_str()).collect();
    assert!(ids.contains(&"i-active-1"));
    assert!(ids.contains(&"i-active-2"));
    assert!(!ids.contains(&"i-inactive"));
    for pair in active.windows(2) {
        assert!(pair[0].last_seen >= pair[1].last_seen, "listing must be last_seen descending");
    }
}

#[test]
fn upsert_rejects_empty_missing_tags() {
    let mut ledger = memory_ledger();
    let err = ledger.upsert("i-empty", &[]).expect_err("empty missing_tags must be rejected");
    assert!(matches!(err, AuditError::Validation(_)), "got {err:?}");
    assert!(ledger.history("i-empty").expect("history").is_none(), "rejected upsert must not write");
}

#[test]
fn malformed_missing_tags_column_surfaces_as_storage_error() {
    // El CHECK de la columna sólo exige el prefijo '[': una fila con JSON
    // truncado puede existir en una base escrita por otra herramienta. Leerla
    // debe fallar como error de storage, nunca devolver datos inventados.
    let ledger = memory_ledger();
    {
        let mut conn = ledger.provider.connection().expect("connection");
        conn.batch_execute(
            "INSERT INTO flagged_instances (instance_id, first_seen, last_seen, missing_tags, is_active) \
             VALUES ('i-malformed', '2024-03-01 00:00:00', '2024-03-01 00:00:00', '[broken', 1);",
        )
        .expect("raw insert");
    }

    let err = ledger.history("i-malformed").expect_err("decode must fail");
    assert!(matches!(err, AuditError::Storage(_)), "got {err:?}");

    let err = ledger.list_active().expect_err("decode must fail");
    assert!(matches!(err, AuditError::Storage(_)), "got {err:?}");
}

#[test]
fn list_active_breaks_last_seen_ties_by_instance_id() {
    // Mismo last_seen al segundo: el orden debe seguir siendo determinista.
    let ledger = memory_ledger();
    {
        let mut conn = ledger.provider.connection().expect("connection");
        conn.batch_execute(
            "INSERT INTO flagged_instances (instance_id, first_seen, last_seen, missing_tags, is_active) \
             VALUES ('i-bbb', '2024-03-01 00:00:00', '2024-03-01 00:00:00', '[\"Owner\"]', 1), \
                    ('i-aaa', '2024-03-01 00:00:00', '2024-03-01 00:00:00', '[\"Owner\"]', 1);",
        )
        .expect("raw insert");
    }

    let active = ledger.list_active().expect("list_active");
    let ids: Vec<&str> = active.iter().map(|r| r.instance_id.as_str()).collect();
    assert_eq!(ids, vec!["i-aaa", "i-bbb"]);
}

#[test]
fn history_returns_none_for_unknown_instance() {
    let ledger = memory_ledger();
    assert!(ledger.history("i-unknown").expect("history").is_none());
}

#[test]
fn reset_clears_all_records() {
    let mut ledger = memory_ledger();
    ledger.upsert("i-33333", &tags(&["Owner"])).expect("upsert");
    ledger.upsert("i-44444", &tags(&["CostCenter"])).expect("upsert");

    ledger.reset().expect("reset");

    assert!(ledger.list_active().expect("list_active").is_empty());
    assert!(!ledger.seen("i-33333").expect("seen"));
}
