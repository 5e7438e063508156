//! Pruebas básicas de pool y migraciones embebidas.

use diesel::connection::SimpleConnection;
use tagwarden_persistence::build_pool;

#[test]
fn build_pool_runs_migrations_and_accepts_queries() {
    let pool = build_pool(":memory:", 1, 1).expect("pool");
    let mut conn = pool.get().expect("conn");
    // Sonda trivial de validez sobre la tabla migrada
    conn.batch_execute("SELECT instance_id, first_seen, last_seen, missing_tags, is_active FROM flagged_instances;")
        .expect("migrated table must exist");
}

#[test]
fn in_memory_pool_keeps_a_single_shared_database() {
    // Con :memory: cada conexión abriría una base distinta; el builder fija
    // el pool en 1, así dos checkouts sucesivos ven los mismos datos.
    let pool = build_pool(":memory:", 2, 8).expect("pool");
    {
        let mut conn = pool.get().expect("first checkout");
        conn.batch_execute(
            "INSERT INTO flagged_instances (instance_id, first_seen, last_seen, missing_tags, is_active) \
             VALUES ('i-probe', '2024-03-01 00:00:00', '2024-03-01 00:00:00', '[\"Owner\"]', 1);",
        )
        .expect("insert");
    }
    let mut conn = pool.get().expect("second checkout");
    conn.batch_execute("SELECT instance_id FROM flagged_instances WHERE instance_id = 'i-probe';")
        .expect("row visible from a later checkout");
}
