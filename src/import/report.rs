use std::time::Duration;

use crate::import::validator::{SkipCounts, SkipReason};

/// Counters accumulated over one import run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub total: u64,
    pub imported: u64,
    pub duplicates: u64,
    pub skipped: SkipCounts,
    pub batches: u64,
    pub failed_batches: u64,
    pub memberships_added: u64,
    pub elapsed: Duration,
}

/// JSON body returned once the import completes.
#[derive(Debug, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct ImportSummary {
    pub message: String,
    pub imported: u64,
    pub duplicates: u64,
    pub skipped: u64,
    pub total: u64,
    pub duration: String,
}

impl ImportReport {
    pub fn skip(&mut self, reason: SkipReason, rows: u64) {
        self.skipped.record(reason, rows);
    }

    pub fn skipped_rows(&self) -> u64 {
        self.skipped.total()
    }

    /// Elapsed time as seconds with two decimals, e.g. `"1.25s"`.
    pub fn duration(&self) -> String {
        format!("{:.2}s", self.elapsed.as_secs_f64())
    }

    pub fn summary(&self) -> ImportSummary {
        ImportSummary {
            message: String::from("Import completed"),
            imported: self.imported,
            duplicates: self.duplicates,
            skipped: self.skipped_rows(),
            total: self.total,
            duration: self.duration(),
        }
    }
}
