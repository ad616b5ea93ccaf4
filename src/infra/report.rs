// ============================================================
// Layer 6 — Sweep Report
// ============================================================
// Writes the evaluated checkpoints in two shapes:
//
//   table (stdout)  — one tab-separated line per checkpoint
//   CSV (optional)  — header + one comma-separated row each
//
// Columns, in order: time, epoch, update, cost, model
//
// Example CSV output:
//   time,epoch,update,cost,model
//   1712001234.5,1,5000,61.2381,models/model_epoch_1_update_5000.npz
//   1712004821.25,1,10000,55.0912,models/model_epoch_1_update_10000.npz
//
// The CSV file is overwritten on every run. Rows appear in the
// same order as the table.
//
// Reference: csv crate documentation
//            Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{io::Write, path::Path};

use crate::domain::record::CheckpointRecord;

pub const CSV_HEADER: [&str; 5] = ["time", "epoch", "update", "cost", "model"];

/// Write one tab-separated line per record.
pub fn write_table<W: Write>(mut out: W, records: &[CheckpointRecord]) -> Result<()> {
    for r in records {
        writeln!(out, "{}", r.fields().join("\t"))?;
    }
    out.flush()?;
    Ok(())
}

/// Write the records to a CSV file, replacing any existing file.
pub fn write_csv(path: impl AsRef<Path>, records: &[CheckpointRecord]) -> Result<()> {
    let path = path.as_ref();
    let mut w = csv::Writer::from_path(path)
        .with_context(|| format!("Cannot create report '{}'", path.display()))?;

    w.write_record(CSV_HEADER)?;
    for r in records {
        w.write_record(r.fields())?;
    }
    w.flush()?;

    tracing::info!("Wrote {} rows to '{}'", records.len(), path.display());
    Ok(())
}
