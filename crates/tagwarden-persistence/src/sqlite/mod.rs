//! Implementación SQLite (Diesel) del `ComplianceLedger` del core.
//!
//! Objetivo general del módulo:
//! - Proveer un ledger durable con paridad 1:1 respecto al backend en
//!   memoria del core (mismos resultados para seen/upsert/resolve/listados).
//! - Mantener el upsert atómico por instancia: el insert-or-update corre como
//!   una sola sentencia dentro de una transacción inmediata, nunca se aplica
//!   parcialmente.
//! - Aislar el mapeo dominio ↔ filas de DB del core.
//!
//! Serialización de `missing_tags`: array JSON en una columna TEXT. No se usa
//! comma-join porque las claves de tag pueden contener comas.
//!
//! Concurrencia: WAL + `busy_timeout` por conexión, más transacciones
//! inmediatas en escrituras. Invocaciones solapadas serializan sus
//! upserts/resolves sobre el mismo archivo; la contención transitoria se
//! reintenta con backoff acotado.

use chrono::{NaiveDateTime, TimeZone, Utc};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use diesel::sqlite::SqliteConnection;
use log::{debug, warn};

use tagwarden_core::{AuditError, ComplianceLedger};
use tagwarden_domain::LedgerRecord;

use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;
use crate::schema::flagged_instances;

/// Alias de tipo para el pool r2d2 de conexiones SQLite.
///
/// Notas operativas:
/// - El pool se construye con `min_idle` y `max_size`.
/// - Al construirlo, se corre automáticamente el set de migraciones
///   pendientes (una sola vez).
/// - Con `:memory:` el pool se fija en una sola conexión: cada conexión
///   nueva abriría una base de datos distinta.
pub type SqlitePool = r2d2::Pool<ConnectionManager<SqliteConnection>>;

/// Proveedor abstracto de conexiones.
///
/// Permite inyectar un pool real (producción/tests de integración) o
/// simular en tests unitarios sin acoplar a r2d2.
///
/// Contrato: devuelve una conexión válida o `PersistenceError::TransientIo`
/// en caso de error.
pub trait ConnectionProvider: Send + Sync + 'static {
    /// Obtiene una conexión lista para ejecutar consultas Diesel.
    fn connection(&self) -> Result<r2d2::PooledConnection<ConnectionManager<SqliteConnection>>, PersistenceError>;
}

/// Implementación concreta de `ConnectionProvider` respaldada por un
/// `SqlitePool`.
pub struct PoolProvider {
    pub pool: SqlitePool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<r2d2::PooledConnection<ConnectionManager<SqliteConnection>>, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

/// Fila mapeada de la tabla `flagged_instances` para lecturas.
#[derive(Queryable, Debug)]
pub struct FlaggedRow {
    pub instance_id: String,
    pub first_seen: NaiveDateTime,
    pub last_seen: NaiveDateTime,
    pub missing_tags: String,
    pub is_active: bool,
}

/// Estructura para inserción en `flagged_instances`.
///
/// Se inserta con `ON CONFLICT(instance_id) DO UPDATE`: el conflicto preserva
/// `first_seen` (no aparece en el SET) y avanza `last_seen`.
#[derive(Insertable, Debug)]
#[diesel(table_name = flagged_instances)]
pub struct NewFlaggedRow<'a> {
    pub instance_id: &'a str,
    pub first_seen: NaiveDateTime,
    pub last_seen: NaiveDateTime,
    pub missing_tags: &'a str,
    pub is_active: bool,
}

/// Determina si un error es transitorio (recomendado reintentar con backoff).
///
/// Cubre:
/// - Contención de lock de SQLite (SQLITE_BUSY / "database is locked").
/// - Errores de IO transitorios de pool/conexión.
fn is_retryable(e: &PersistenceError) -> bool {
    match e {
        PersistenceError::Locked(_) => true,
        PersistenceError::TransientIo(_) => true,
        PersistenceError::Unknown(msg) => {
            let m = msg.to_lowercase();
            m.contains("locked") || m.contains("busy") || m.contains("timeout")
        }
        _ => false,
    }
}

/// Retry simple con backoff muy pequeño (hasta 3 intentos).
///
/// No altera semántica de negocio; sólo repite la unidad de trabajo provista
/// por `f`. Fallas semánticas (unique/check/corrupción) salen de inmediato.
fn with_retry<F, T>(mut f: F) -> Result<T, PersistenceError>
    where F: FnMut() -> Result<T, PersistenceError>
{
    let mut attempts = 0;
    loop {
        match f() {
            Err(e) if is_retryable(&e) && attempts < 3 => {
                let delay_ms = 15 * ((attempts + 1) as u64);
                warn!("retryable error (attempt {}): {:?} -> sleeping {}ms",
                      attempts + 1,
                      e,
                      delay_ms);
                std::thread::sleep(std::time::Duration::from_millis(delay_ms));
                attempts += 1;
            }
            r => return r,
        }
    }
}

fn encode_missing_tags(missing: &[String]) -> Result<String, PersistenceError> {
    serde_json::to_string(missing).map_err(|e| PersistenceError::Corruption(format!("encode missing_tags: {e}")))
}

fn decode_missing_tags(raw: &str) -> Result<Vec<String>, PersistenceError> {
    serde_json::from_str(raw).map_err(|e| PersistenceError::Corruption(format!("decode missing_tags: {e}")))
}

/// Convierte una fila a registro de dominio. Los timestamps se guardan en UTC
/// naive y se reinterpretan como UTC al leer.
fn row_to_record(row: FlaggedRow) -> Result<LedgerRecord, PersistenceError> {
    Ok(LedgerRecord {
        missing_tags: decode_missing_tags(&row.missing_tags)?,
        instance_id: row.instance_id,
        first_seen: Utc.from_utc_datetime(&row.first_seen),
        last_seen: Utc.from_utc_datetime(&row.last_seen),
        is_active: row.is_active,
    })
}

/// Ledger de cumplimiento sobre SQLite.
///
/// Responsabilidades:
/// - `upsert`: crear o reactivar el registro de una instancia en una sola
///   sentencia atómica.
/// - Lecturas (`seen`, `list_active`, `history`) con retry ante contención
///   transitoria.
pub struct SqliteLedger<P: ConnectionProvider> {
    pub provider: P,
}

impl<P: ConnectionProvider> SqliteLedger<P> {
    /// Crea un `SqliteLedger` a partir de un `ConnectionProvider`
    /// (generalmente `PoolProvider`).
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

impl<P: ConnectionProvider> ComplianceLedger for SqliteLedger<P> {
    fn seen(&self, instance_id: &str) -> Result<bool, AuditError> {
        let found: Option<String> = with_retry(|| {
            let mut conn = self.provider.connection()?;
            flagged_instances::table
                .find(instance_id)
                .select(flagged_instances::instance_id)
                .first::<String>(&mut conn)
                .optional()
                .map_err(PersistenceError::from)
        })?;
        Ok(found.is_some())
    }

    fn upsert(&mut self, instance_id: &str, missing_tags: &[String]) -> Result<(), AuditError> {
        // Un registro activo existe porque se observó al menos un tag faltante.
        if missing_tags.is_empty() {
            return Err(AuditError::Validation("missing_tags must not be empty on upsert".to_string()));
        }
        let encoded = encode_missing_tags(missing_tags)?;
        debug!("upsert:start instance_id={instance_id}");
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            let now = Utc::now().naive_utc();
            // Transacción inmediata: toma el write-lock desde el arranque para
            // que invocaciones solapadas serialicen aquí en vez de fallar al
            // final con SQLITE_BUSY.
            conn.immediate_transaction(|tx_conn| {
                let row = NewFlaggedRow {
                    instance_id,
                    first_seen: now,
                    last_seen: now,
                    missing_tags: encoded.as_str(),
                    is_active: true,
                };
                diesel::insert_into(flagged_instances::table)
                    .values(&row)
                    .on_conflict(flagged_instances::instance_id)
                    .do_update()
                    .set((
                        flagged_instances::last_seen.eq(now),
                        flagged_instances::missing_tags.eq(encoded.as_str()),
                        flagged_instances::is_active.eq(true),
                    ))
                    .execute(tx_conn)?;
                Ok::<(), diesel::result::Error>(())
            })
            .map_err(PersistenceError::from)
        })?;
        debug!("upsert:done instance_id={instance_id}");
        Ok(())
    }

    fn resolve(&mut self, instance_id: &str) -> Result<(), AuditError> {
        // UPDATE sobre id ausente afecta 0 filas: no-op, no error.
        let affected = with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::update(flagged_instances::table.find(instance_id))
                .set(flagged_instances::is_active.eq(false))
                .execute(&mut conn)
                .map_err(PersistenceError::from)
        })?;
        debug!("resolve:done instance_id={instance_id} affected={affected}");
        Ok(())
    }

    fn list_active(&self) -> Result<Vec<LedgerRecord>, AuditError> {
        let rows: Vec<FlaggedRow> = with_retry(|| {
            let mut conn = self.provider.connection()?;
            flagged_instances::table
                .filter(flagged_instances::is_active.eq(true))
                .order(flagged_instances::last_seen.desc())
                .then_order_by(flagged_instances::instance_id.asc())
                .load(&mut conn)
                .map_err(PersistenceError::from)
        })?;
        let records = rows
            .into_iter()
            .map(row_to_record)
            .collect::<Result<Vec<_>, _>>()?;
        debug!("list_active:done count={}", records.len());
        Ok(records)
    }

    fn history(&self, instance_id: &str) -> Result<Option<LedgerRecord>, AuditError> {
        let row: Option<FlaggedRow> = with_retry(|| {
            let mut conn = self.provider.connection()?;
            flagged_instances::table
                .find(instance_id)
                .first::<FlaggedRow>(&mut conn)
                .optional()
                .map_err(PersistenceError::from)
        })?;
        Ok(row.map(row_to_record).transpose()?)
    }

    fn reset(&mut self) -> Result<(), AuditError> {
        let deleted = with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::delete(flagged_instances::table)
                .execute(&mut conn)
                .map_err(PersistenceError::from)
        })?;
        debug!("reset:done deleted={deleted}");
        Ok(())
    }
}

/// PRAGMAs por conexión: WAL para lecturas concurrentes con una escritura,
/// `busy_timeout` para que la contención espere en vez de fallar al instante,
/// y foreign keys activas.
#[derive(Debug)]
struct SqlitePragmas;

impl r2d2::CustomizeConnection<SqliteConnection, r2d2::Error> for SqlitePragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), r2d2::Error> {
        conn.batch_execute("PRAGMA journal_mode = WAL; PRAGMA busy_timeout = 5000; PRAGMA foreign_keys = ON;")
            .map_err(r2d2::Error::QueryError)
    }
}

/// Construye un pool SQLite r2d2 a partir de la ruta del archivo.
///
/// Comportamiento:
/// - Valida y ajusta tamaños (si `min_size > max_size`, usa `min_size =
///   max_size`); con `:memory:` fuerza una sola conexión.
/// - Ejecuta migraciones inmediatamente tras el primer `get()`.
/// - Devuelve `PersistenceError::TransientIo` ante errores del pool/manager.
pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<SqlitePool, PersistenceError> {
    let in_memory = database_url == ":memory:";
    let validated_min = if min_size == 0 || in_memory { 1 } else { min_size };
    let validated_max = if in_memory { 1 } else if max_size == 0 { 1 } else { max_size };
    if validated_min > validated_max {
        eprintln!("WARN: min_size > max_size ({} > {}), ajustando min=max",
                  validated_min, validated_max);
    }
    let final_min = validated_min.min(validated_max);
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = r2d2::Pool::builder()
        .min_idle(Some(final_min))
        .max_size(validated_max)
        .connection_customizer(Box::new(SqlitePragmas))
        .build(manager)
        .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    // Ejecutar migraciones una sola vez al construir (primer connection checkout).
    {
        let mut conn = pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    Ok(pool)
}

/// Helper de desarrollo: carga `.env`, lee configuración (DATABASE_URL,
/// tamaños) y construye un pool ya migrado.
pub fn build_dev_pool_from_env() -> Result<SqlitePool, PersistenceError> {
    crate::config::init_dotenv();
    let cfg = crate::config::DbConfig::from_env();
    build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)
}
