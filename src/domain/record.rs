// ============================================================
// Layer 3 — Checkpoint Record
// ============================================================
// One evaluated checkpoint in a sweep:
//   (modification time, epoch, update, mean cost, file path)
// Created once per checkpoint and never modified afterwards.

use std::{
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointRecord {
    pub modified: SystemTime,
    pub epoch:    u64,
    pub update:   u64,
    pub cost:     f64,
    pub model:    PathBuf,
}

impl CheckpointRecord {
    /// Modification time as fractional seconds since the Unix epoch.
    /// Times before 1970 (clock skew) are reported as negative seconds.
    pub fn time_secs(&self) -> f64 {
        match self.modified.duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs_f64(),
            Err(e) => -e.duration().as_secs_f64(),
        }
    }

    /// The record as report columns: time, epoch, update, cost, model.
    pub fn fields(&self) -> [String; 5] {
        [
            self.time_secs().to_string(),
            self.epoch.to_string(),
            self.update.to_string(),
            self.cost.to_string(),
            self.model.display().to_string(),
        ]
    }
}
