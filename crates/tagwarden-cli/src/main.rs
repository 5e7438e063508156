use tagwarden_adapters::{export_csv, print_summary, SnapshotFileSource, SourceConfig};
use tagwarden_core::{AuditDriver, AuditError, AuditOptions, ComplianceLedger};
use tagwarden_domain::RequiredTagSet;
use tagwarden_persistence::{build_dev_pool_from_env, PoolProvider, SqliteLedger};

// Códigos de salida: 0 ok, 2 uso, 3 entrada/validación, 4 no
// encontrado/rechazado, 5 falla de storage/colección.

const DEFAULT_REQUIRED_TAGS: &str = "Owner,CostCenter,Project";

fn build_ledger(ctx: &str) -> SqliteLedger<PoolProvider> {
    let pool = match build_dev_pool_from_env() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("[tagwarden {ctx}] pool error: {e}");
            std::process::exit(5);
        }
    };
    SqliteLedger::new(PoolProvider { pool })
}

fn exit_for_audit_error(ctx: &str, e: AuditError) -> ! {
    match e {
        AuditError::Validation(_) => {
            eprintln!("[tagwarden {ctx}] {e}");
            std::process::exit(3);
        }
        AuditError::Collection(_) | AuditError::Storage(_) => {
            eprintln!("[tagwarden {ctx}] {e}");
            std::process::exit(5);
        }
    }
}

fn main() {
    // Cargar .env si existe para obtener DATABASE_URL
    let _ = dotenvy::dotenv();
    let args: Vec<String> = std::env::args().collect();
    if args.len() >= 2 && args[1] == "audit" {
        // `tagwarden audit --snapshot <FILE> [--require K1,K2] [--resolve] [--export <CSV>]`
        let mut snapshot: Option<String> = None;
        let mut require: Option<String> = None;
        let mut resolve = false;
        let mut export: Option<String> = None;
        let mut i = 2;
        while i < args.len() {
            match args[i].as_str() {
                "--snapshot" => {
                    i += 1;
                    if i < args.len() { snapshot = Some(args[i].clone()); }
                }
                "--require" => {
                    i += 1;
                    if i < args.len() { require = Some(args[i].clone()); }
                }
                "--resolve" => { resolve = true; }
                "--export" => {
                    i += 1;
                    if i < args.len() { export = Some(args[i].clone()); }
                }
                _ => {}
            }
            i += 1;
        }

        let Some(snapshot_path) = snapshot else {
            eprintln!("Uso: tagwarden audit --snapshot <FILE> [--require K1,K2] [--resolve] [--export <CSV>]");
            std::process::exit(2);
        };

        let keys: Vec<String> = require
            .as_deref()
            .unwrap_or(DEFAULT_REQUIRED_TAGS)
            .split(',')
            .map(|k| k.trim().to_string())
            .collect();
        let required = match RequiredTagSet::new(keys) {
            Ok(r) => r,
            Err(e) => {
                eprintln!("[tagwarden audit] invalid required tag set: {e}");
                std::process::exit(3);
            }
        };

        let config = SourceConfig::from_env();
        if let Some(region) = &config.region {
            println!("Region: {region}");
        }
        let source = SnapshotFileSource::with_config(&snapshot_path, config);

        let mut driver = AuditDriver::new(build_ledger("audit"));
        let outcome = match driver.run_audit(&source, &required, AuditOptions { auto_resolve: resolve }) {
            Ok(o) => o,
            Err(e) => exit_for_audit_error("audit", e),
        };
        if print_summary(std::io::stdout().lock(), &outcome).is_err() {
            std::process::exit(5);
        }
        if let Some(csv_path) = export {
            if let Err(e) = export_csv(&csv_path, &outcome.classified) {
                eprintln!("[tagwarden audit] export error: {e}");
                std::process::exit(5);
            }
            println!("Exported: {csv_path}");
        }
        std::process::exit(0);
    } else if args.len() >= 2 && args[1] == "active" {
        let ledger = build_ledger("active");
        let records = match ledger.list_active() {
            Ok(r) => r,
            Err(e) => exit_for_audit_error("active", e),
        };
        if records.is_empty() {
            println!("No active violators.");
        }
        for record in records {
            println!(
                "{} first_seen={} last_seen={} missing: {}",
                record.instance_id,
                record.first_seen.format("%Y-%m-%d %H:%M:%S"),
                record.last_seen.format("%Y-%m-%d %H:%M:%S"),
                record.missing_tags.join(", "),
            );
        }
        std::process::exit(0);
    } else if args.len() >= 2 && args[1] == "history" {
        let instance = flag_value(&args, "--instance");
        let Some(instance_id) = instance else {
            eprintln!("Uso: tagwarden history --instance <ID>");
            std::process::exit(2);
        };
        let ledger = build_ledger("history");
        match ledger.history(&instance_id) {
            Ok(Some(record)) => {
                println!(
                    "{} active={} first_seen={} last_seen={} missing: {}",
                    record.instance_id,
                    record.is_active,
                    record.first_seen.format("%Y-%m-%d %H:%M:%S"),
                    record.last_seen.format("%Y-%m-%d %H:%M:%S"),
                    record.missing_tags.join(", "),
                );
                std::process::exit(0);
            }
            Ok(None) => {
                eprintln!("[tagwarden history] never observed: {instance_id}");
                std::process::exit(4);
            }
            Err(e) => exit_for_audit_error("history", e),
        }
    } else if args.len() >= 2 && args[1] == "resolve" {
        let instance = flag_value(&args, "--instance");
        let Some(instance_id) = instance else {
            eprintln!("Uso: tagwarden resolve --instance <ID>");
            std::process::exit(2);
        };
        let mut ledger = build_ledger("resolve");
        match ledger.seen(&instance_id) {
            Ok(false) => {
                eprintln!("[tagwarden resolve] never observed: {instance_id}");
                std::process::exit(4);
            }
            Ok(true) => {}
            Err(e) => exit_for_audit_error("resolve", e),
        }
        if let Err(e) = ledger.resolve(&instance_id) {
            exit_for_audit_error("resolve", e);
        }
        println!("resolved: {instance_id}");
        std::process::exit(0);
    } else if args.len() >= 2 && args[1] == "reset" {
        if !args.iter().any(|a| a == "--yes") {
            eprintln!("[tagwarden reset] destructive: borra todos los registros; confirmar con --yes");
            std::process::exit(4);
        }
        let mut ledger = build_ledger("reset");
        if let Err(e) = ledger.reset() {
            exit_for_audit_error("reset", e);
        }
        println!("ledger reset");
        std::process::exit(0);
    } else {
        println!("tagwarden: use 'audit', 'active', 'history', 'resolve' or 'reset' subcommands");
        std::process::exit(2);
    }
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    let mut i = 2;
    while i < args.len() {
        if args[i] == flag {
            i += 1;
            if i < args.len() {
                return Some(args[i].clone());
            }
        }
        i += 1;
    }
    None
}
