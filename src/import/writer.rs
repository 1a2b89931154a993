use crate::import::normalizer::SubscriberRecord;
use crate::import::store::SubscriberStore;

/// Result of writing one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub affected_rows: u64,
    pub duplicates: u64,
}

/// Writes one batch with a single statement. Duplicates are whatever the
/// store reports as not inserted; a failure leaves the whole batch unwritten.
pub async fn write_batch<S>(store: &S, batch: &[SubscriberRecord]) -> Result<UpsertOutcome, sqlx::Error>
where
    S: SubscriberStore + ?Sized,
{
    let affected_rows = store.upsert_batch(batch).await?;

    Ok(UpsertOutcome {
        affected_rows,
        duplicates: (batch.len() as u64).saturating_sub(affected_rows),
    })
}
