use std::collections::HashSet;

use crate::import::batcher::{batch_count, batches};
use crate::import::store::SubscriberStore;

pub const DEFAULT_ASSOCIATION_BATCH_SIZE: usize = 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssociationOutcome {
    /// Subscribers found for the given emails.
    pub resolved: u64,
    /// Memberships that did not exist before.
    pub inserted: u64,
}

/// Adds every stored subscriber among `emails` to `list_id`.
///
/// Lookups run in chunks of `chunk_size` emails, which are deduplicated
/// without case. Emails without a stored subscriber are skipped and existing
/// memberships are left untouched.
#[tracing::instrument(
    name = "Associate imported subscribers with a list",
    skip(store, emails),
    fields(emails = emails.len(), list_id = %list_id)
)]
pub async fn associate_with_list<S>(
    store: &S,
    emails: &[String],
    list_id: i64,
    chunk_size: usize,
) -> Result<AssociationOutcome, sqlx::Error>
where
    S: SubscriberStore + ?Sized,
{
    let mut seen = HashSet::with_capacity(emails.len());
    let unique_emails: Vec<String> = emails
        .iter()
        .filter(|email| seen.insert(email.to_lowercase()))
        .cloned()
        .collect();

    let total_chunks = batch_count(unique_emails.len(), chunk_size);
    let mut outcome = AssociationOutcome::default();

    for (index, chunk) in batches(unique_emails, chunk_size).enumerate() {
        let subscriber_ids = store.find_ids_by_emails(&chunk).await?;

        if subscriber_ids.is_empty() {
            continue;
        }

        outcome.resolved += subscriber_ids.len() as u64;
        outcome.inserted += store.insert_memberships(&subscriber_ids, list_id).await?;

        tracing::debug!(
            "List association batch {}/{} complete ({} subscribers)",
            index + 1,
            total_chunks,
            subscriber_ids.len()
        );
    }

    Ok(outcome)
}
