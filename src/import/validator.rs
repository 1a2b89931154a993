use crate::import::normalizer::SubscriberRecord;

/// Why a CSV row did not reach the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingEmail,
    UnreadableRow,
    FailedBatch,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::MissingEmail => "missing_email",
            SkipReason::UnreadableRow => "unreadable_row",
            SkipReason::FailedBatch => "failed_batch",
        }
    }
}

/// Per-reason tally of skipped rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipCounts {
    pub missing_email: u64,
    pub unreadable_row: u64,
    pub failed_batch: u64,
}

impl SkipCounts {
    pub fn record(&mut self, reason: SkipReason, rows: u64) {
        match reason {
            SkipReason::MissingEmail => self.missing_email += rows,
            SkipReason::UnreadableRow => self.unreadable_row += rows,
            SkipReason::FailedBatch => self.failed_batch += rows,
        }
    }

    pub fn total(&self) -> u64 {
        self.missing_email + self.unreadable_row + self.failed_batch
    }
}

/// Bulk import only requires an email; every other field is optional.
pub fn validate_row(normalized: Option<SubscriberRecord>) -> Result<SubscriberRecord, SkipReason> {
    match normalized {
        Some(record) if !record.email.trim().is_empty() => Ok(record),
        _ => Err(SkipReason::MissingEmail),
    }
}
