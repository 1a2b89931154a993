use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::import::normalizer::SubscriberRecord;

/// Persistence operations the import pipeline relies on.
///
/// `email` is unique in the store, ignoring case: inserting an existing email
/// must be a no-op, not an error.
#[async_trait]
pub trait SubscriberStore {
    /// Inserts every record whose email is not stored yet and returns how
    /// many rows were actually inserted.
    async fn upsert_batch(&self, batch: &[SubscriberRecord]) -> Result<u64, sqlx::Error>;

    /// Distinct ids of the stored subscribers among `emails`, compared without
    /// case. Unknown emails are ignored.
    async fn find_ids_by_emails(&self, emails: &[String]) -> Result<Vec<i64>, sqlx::Error>;

    /// Adds the subscribers to the list, ignoring existing memberships. A list
    /// that does not exist gets no memberships.
    /// Returns how many memberships were created.
    async fn insert_memberships(
        &self,
        subscriber_ids: &[i64],
        list_id: i64,
    ) -> Result<u64, sqlx::Error>;
}

#[derive(Clone)]
pub struct PgSubscriberStore {
    db_pool: PgPool,
}

impl PgSubscriberStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl SubscriberStore for PgSubscriberStore {
    #[tracing::instrument(
        name = "Upsert a batch of subscribers",
        skip(self, batch),
        fields(batch_size = batch.len())
    )]
    async fn upsert_batch(&self, batch: &[SubscriberRecord]) -> Result<u64, sqlx::Error> {
        if batch.is_empty() {
            return Ok(0);
        }

        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"INSERT INTO subscribers (
                email, name, date_added, stop_time, stop_status, misc,
                ad_tracking, ip_address, web_form_url, country, region,
                city, postal_code, latitude, longitude, dma_code, area_code, tags, phone
            ) "#,
        );

        query.push_values(batch, |mut row, record| {
            row.push_bind(record.email.as_str())
                .push_bind(record.name.as_str())
                .push_bind(record.date_added)
                .push_bind(record.stop_time)
                .push_bind(record.stop_status)
                .push_bind(record.misc.as_str())
                .push_bind(record.ad_tracking.as_str())
                .push_bind(record.ip_address.as_str())
                .push_bind(record.web_form_url.as_str())
                .push_bind(record.country.as_str())
                .push_bind(record.region.as_str())
                .push_bind(record.city.as_str())
                .push_bind(record.postal_code.as_str())
                .push_bind(record.latitude)
                .push_bind(record.longitude)
                .push_bind(record.dma_code.as_str())
                .push_bind(record.area_code.as_str())
                .push_bind(record.tags.as_str())
                .push_bind(record.phone.as_str());
        });
        // Postgres only counts freshly inserted rows, including when the
        // same email appears twice in one statement.
        query.push(" ON CONFLICT ((lower(email))) DO NOTHING");

        let result = query.build().execute(&self.db_pool).await?;

        Ok(result.rows_affected())
    }

    #[tracing::instrument(
        name = "Resolve subscriber ids by email",
        skip(self, emails),
        fields(emails = emails.len())
    )]
    async fn find_ids_by_emails(&self, emails: &[String]) -> Result<Vec<i64>, sqlx::Error> {
        if emails.is_empty() {
            return Ok(Vec::new());
        }

        let emails: Vec<String> = emails.iter().map(|email| email.to_lowercase()).collect();

        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT DISTINCT id
            FROM subscribers
            WHERE lower(email) = ANY($1)
            "#,
        )
        .bind(emails)
        .fetch_all(&self.db_pool)
        .await
    }

    #[tracing::instrument(
        name = "Insert list memberships",
        skip(self, subscriber_ids),
        fields(subscribers = subscriber_ids.len(), list_id = %list_id)
    )]
    async fn insert_memberships(
        &self,
        subscriber_ids: &[i64],
        list_id: i64,
    ) -> Result<u64, sqlx::Error> {
        if subscriber_ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO list_subscribers (subscriber_id, list_id)
            SELECT t.subscriber_id, $2
            FROM UNNEST($1::bigint[]) AS t(subscriber_id)
            WHERE EXISTS (SELECT 1 FROM lists WHERE id = $2)
            ON CONFLICT (subscriber_id, list_id) DO NOTHING
            "#,
        )
        .bind(subscriber_ids)
        .bind(list_id)
        .execute(&self.db_pool)
        .await?;

        Ok(result.rows_affected())
    }
}
