//! Reporters: export CSV y resumen de consola.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tagwarden_core::AuditOutcome;
use tagwarden_domain::ClassifiedViolation;

/// Timestamp de reporte estilo "YYYY-MM-DD HH:MM:SS".
const LAUNCH_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// El campo MissingTags lleva las claves comma-joined, así que siempre va
// entre comillas; comillas internas se duplican (RFC 4180).
fn quote_csv_field(raw: &str) -> String {
    format!("\"{}\"", raw.replace('"', "\"\""))
}

/// Escribe el export tabular: header `InstanceId,MissingTags,LaunchTime` y
/// una fila por violador, UTF-8.
pub fn write_csv<W: Write>(mut writer: W, rows: &[ClassifiedViolation]) -> io::Result<()> {
    writeln!(writer, "InstanceId,MissingTags,LaunchTime")?;
    for classified in rows {
        let v = &classified.violation;
        writeln!(
            writer,
            "{},{},{}",
            v.instance_id,
            quote_csv_field(&v.missing_tags.join(",")),
            v.launch_time.format(LAUNCH_TIME_FORMAT),
        )?;
    }
    writer.flush()
}

/// Export a archivo (buffered).
pub fn export_csv(path: impl AsRef<Path>, rows: &[ClassifiedViolation]) -> io::Result<()> {
    let file = File::create(path)?;
    write_csv(BufWriter::new(file), rows)
}

/// Resumen de consola de una pasada: agregados primero, luego una línea por
/// violador con su clasificación, y los ids resueltos si corrió la pasada de
/// resolución.
pub fn print_summary<W: Write>(mut writer: W, outcome: &AuditOutcome) -> io::Result<()> {
    let summary = outcome.summary();
    writeln!(writer, "Total Instances Scanned: {}", summary.total_scanned)?;
    writeln!(writer, "Total Violators Found: {}", summary.total_violators)?;
    writeln!(writer, "New Violators: {}", summary.new_count)?;
    writeln!(writer, "Repeat Violators: {}", summary.repeat_count)?;
    for classified in &outcome.classified {
        let v = &classified.violation;
        writeln!(
            writer,
            " Instance {} [{}] is missing: {}",
            v.instance_id,
            classified.status,
            v.missing_tags.join(", "),
        )?;
    }
    if !outcome.resolved.is_empty() {
        writeln!(writer, "Resolved this pass: {}", outcome.resolved.join(", "))?;
    }
    writer.flush()
}
