use actix_web::{http::header, http::StatusCode, web, HttpRequest, HttpResponse, ResponseError};
use chrono::Utc;
use serde::Deserialize;
use sqlx::{postgres::PgRow, PgPool};

use crate::{
    auth::AdminUser,
    domain::{
        new_subscriber::{NewSubscriber, NewSubscriberBody},
        subscriber::Subscriber,
    },
    error_chain_fmt,
    import::{PgSubscriberStore, SubscriberStore},
    phone_verification::{PhoneVerdict, PhoneVerificationClient, VerificationContext},
};

const UNIQUE_VIOLATION: &str = "23505";

#[derive(thiserror::Error)]
pub enum SubscriberError {
    #[error("{0}")]
    Validation(String),
    #[error("Submission blocked due to suspicious activity")]
    BotDetected,
    #[error("Invalid phone number")]
    InvalidPhone,
    #[error("This email is already subscribed")]
    AlreadySubscribed,
    #[error("Failed to add subscriber. Please try again.")]
    InsertSubscriber(#[source] sqlx::Error),
    #[error("Failed to add the subscriber to the list.")]
    InsertMembership(#[source] sqlx::Error),
    #[error("Failed to get subscribers from the database.")]
    GetSubscribers(#[source] sqlx::Error),
}

impl std::fmt::Debug for SubscriberError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for SubscriberError {
    fn status_code(&self) -> StatusCode {
        match self {
            SubscriberError::Validation(_) | SubscriberError::InvalidPhone => {
                StatusCode::BAD_REQUEST
            }
            SubscriberError::BotDetected => StatusCode::FORBIDDEN,
            SubscriberError::AlreadySubscribed => StatusCode::CONFLICT,
            SubscriberError::InsertSubscriber(_)
            | SubscriberError::InsertMembership(_)
            | SubscriberError::GetSubscribers(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            SubscriberError::BotDetected => serde_json::json!({
                "error": self.to_string(),
                "message": "Your submission could not be processed. Please contact support if you believe this is an error.",
                "code": "BOT_DETECTED"
            }),
            SubscriberError::InvalidPhone => serde_json::json!({
                "error": self.to_string(),
                "message": "The phone number provided is not valid. Please check and try again."
            }),
            _ => serde_json::json!({ "error": self.to_string() }),
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}

#[derive(Deserialize, Debug)]
pub struct SubscribersQuery {
    #[serde(rename = "listId")]
    pub list_id: Option<i64>,
}

#[tracing::instrument(
    name = "Adding a new subscriber handler",
    skip(req, body, db_pool, store, phone_verifier),
    fields(
        subscriber_email = ?body.email,
        list_id = ?body.list_id
    )
)]
pub async fn handle_add_subscriber(
    req: HttpRequest,
    body: web::Json<NewSubscriberBody>,
    db_pool: web::Data<PgPool>,
    store: web::Data<PgSubscriberStore>,
    phone_verifier: web::Data<PhoneVerificationClient>,
) -> Result<HttpResponse, SubscriberError> {
    let new_subscriber = NewSubscriber::try_from(body.into_inner()).map_err(|err| {
        tracing::warn!("Validation error: {}", err);
        SubscriberError::Validation(err)
    })?;

    let client_ip = client_ip(&req);
    let context = VerificationContext {
        email: new_subscriber.email.as_ref().to_string(),
        name: new_subscriber
            .name
            .as_ref()
            .map(|name| AsRef::<str>::as_ref(name).to_string()),
        ip: client_ip.clone(),
        user_agent: header_value(&req, header::USER_AGENT.as_str()),
    };
    let verdict = phone_verifier
        .verify(new_subscriber.phone.as_ref(), &context)
        .await;

    if verdict.is_bot {
        tracing::warn!(
            email = %new_subscriber.email.as_ref(),
            phone = %new_subscriber.phone.as_ref(),
            score = verdict.score,
            ip = ?client_ip,
            "Bot submission blocked"
        );
        return Err(SubscriberError::BotDetected);
    }

    if !verdict.valid {
        return Err(SubscriberError::InvalidPhone);
    }

    let web_form_url = header_value(&req, header::REFERER.as_str());
    let subscriber_id = insert_subscriber(
        &db_pool,
        &new_subscriber,
        &verdict,
        client_ip.as_deref(),
        web_form_url.as_deref(),
    )
    .await?;

    if let Some(list_id) = new_subscriber.list_id {
        let added = store
            .insert_memberships(&[subscriber_id], list_id)
            .await
            .map_err(SubscriberError::InsertMembership)?;

        if added == 0 {
            tracing::warn!(
                "List {} does not exist, subscriber {} kept without it",
                list_id,
                subscriber_id
            );
        } else {
            tracing::info!("Subscriber {} added to list {}", subscriber_id, list_id);
        }
    }

    Ok(HttpResponse::Created().json(serde_json::json!({
        "id": subscriber_id,
        "message": "Subscriber added successfully",
        "email": new_subscriber.email.as_ref(),
        "validation": {
            "score": verdict.score,
            "verified": true
        }
    })))
}

#[tracing::instrument(
    name = "Insert a new subscriber into the database",
    skip(db_pool, new_subscriber, verdict)
)]
async fn insert_subscriber(
    db_pool: &PgPool,
    new_subscriber: &NewSubscriber,
    verdict: &PhoneVerdict,
    ip_address: Option<&str>,
    web_form_url: Option<&str>,
) -> Result<i64, SubscriberError> {
    let misc = serde_json::json!({
        "verification_score": verdict.score,
        "risk_level": verdict.risk_level,
    })
    .to_string();

    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO subscribers (
            email, name, phone, date_added, stop_status, ip_address,
            web_form_url, misc, ad_tracking
        )
        VALUES ($1, $2, $3, $4, 0, $5, $6, $7, $8)
        RETURNING id
        "#,
    )
    .bind(new_subscriber.email.as_ref())
    .bind(new_subscriber.name.as_ref().map(AsRef::<str>::as_ref))
    .bind(new_subscriber.phone.as_ref())
    .bind(Utc::now().naive_utc())
    .bind(ip_address)
    .bind(web_form_url)
    .bind(misc)
    .bind(format!("verified_{}", verdict.score))
    .fetch_one(db_pool)
    .await
    .map_err(|err| {
        if is_unique_violation(&err) {
            return SubscriberError::AlreadySubscribed;
        }

        tracing::error!("Failed to execute query: {:?}", err);
        SubscriberError::InsertSubscriber(err)
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
    )
}

#[tracing::instrument(name = "Listing subscribers handler", skip(_admin, db_pool))]
pub async fn handle_list_subscribers(
    _admin: AdminUser,
    query: web::Query<SubscribersQuery>,
    db_pool: web::Data<PgPool>,
) -> Result<HttpResponse, SubscriberError> {
    let subscribers = match query.list_id {
        Some(list_id) => {
            sqlx::query(
                r#"
                SELECT s.*
                FROM subscribers s
                JOIN list_subscribers ls ON s.id = ls.subscriber_id
                WHERE ls.list_id = $1
                ORDER BY s.date_added DESC NULLS LAST, s.id DESC
                "#,
            )
            .bind(list_id)
            .map(|row: PgRow| Subscriber::from_row(row))
            .fetch_all(db_pool.get_ref())
            .await
        }
        None => {
            sqlx::query(
                r#"
                SELECT *
                FROM subscribers
                ORDER BY date_added DESC NULLS LAST, id DESC
                "#,
            )
            .map(|row: PgRow| Subscriber::from_row(row))
            .fetch_all(db_pool.get_ref())
            .await
        }
    }
    .map_err(SubscriberError::GetSubscribers)?;

    Ok(HttpResponse::Ok().json(subscribers))
}

fn header_value(req: &HttpRequest, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// First `X-Forwarded-For` hop, then `X-Real-IP`, then the peer address.
fn client_ip(req: &HttpRequest) -> Option<String> {
    header_value(req, "x-forwarded-for")
        .and_then(|value| value.split(',').next().map(|ip| ip.trim().to_string()))
        .filter(|ip| !ip.is_empty())
        .or_else(|| header_value(req, "x-real-ip"))
        .or_else(|| req.peer_addr().map(|addr| addr.ip().to_string()))
}
