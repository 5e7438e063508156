//! tagwarden-persistence
//!
//! Implementación durable (Diesel + SQLite) del `ComplianceLedger` del core,
//! más utilidades de conexión y migraciones. El backend sobrevive reinicios
//! del proceso: la clasificación NEW/REPEAT entre corridas depende de él.
//!
//! Módulos:
//! - `sqlite`: ledger sobre SQLite (pool r2d2, upsert atómico por instancia).
//! - `migrations`: runner embebido de migraciones Diesel.
//! - `config`: carga de configuración desde .env.
//! - `schema`: tabla Diesel declarada para compilar queries.

pub mod config;
pub mod error;
pub mod migrations;
pub mod schema;
pub mod sqlite;

pub use config::init_dotenv;
pub use error::PersistenceError;
pub use sqlite::{build_dev_pool_from_env, build_pool, ConnectionProvider, PoolProvider, SqliteLedger, SqlitePool};
