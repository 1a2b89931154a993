use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use sqlx::{postgres::PgRow, PgPool};

use crate::{
    auth::AdminUser,
    domain::list::{ListName, MailingList, NewListBody},
    error_chain_fmt,
};

#[derive(thiserror::Error)]
pub enum ListError {
    #[error("{0}")]
    Validation(String),
    #[error("List not found")]
    NotFound,
    #[error("Failed to create the list.")]
    CreateList(#[source] sqlx::Error),
    #[error("Failed to get lists from the database.")]
    GetLists(#[source] sqlx::Error),
    #[error("Failed to delete the list.")]
    DeleteList(#[source] sqlx::Error),
}

impl std::fmt::Debug for ListError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for ListError {
    fn status_code(&self) -> StatusCode {
        match self {
            ListError::Validation(_) => StatusCode::BAD_REQUEST,
            ListError::NotFound => StatusCode::NOT_FOUND,
            ListError::CreateList(_) | ListError::GetLists(_) | ListError::DeleteList(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({ "error": self.to_string() }))
    }
}

#[tracing::instrument(
    name = "Creating a new list handler",
    skip(_admin, body, db_pool),
    fields(list_name = %body.name)
)]
pub async fn handle_create_list(
    _admin: AdminUser,
    body: web::Json<NewListBody>,
    db_pool: web::Data<PgPool>,
) -> Result<HttpResponse, ListError> {
    let body = body.into_inner();
    let name = ListName::parse(body.name).map_err(ListError::Validation)?;
    let description = body
        .description
        .map(|description| description.trim().to_string())
        .filter(|description| !description.is_empty());

    let list_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO lists (name, description)
        VALUES ($1, $2)
        RETURNING id
        "#,
    )
    .bind(name.as_ref())
    .bind(description)
    .fetch_one(db_pool.get_ref())
    .await
    .map_err(ListError::CreateList)?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "id": list_id,
        "message": "List created successfully"
    })))
}

#[tracing::instrument(name = "Listing lists handler", skip(_admin, db_pool))]
pub async fn handle_get_lists(
    _admin: AdminUser,
    db_pool: web::Data<PgPool>,
) -> Result<HttpResponse, ListError> {
    let lists = sqlx::query(
        r#"
        SELECT id, name, description, created_at
        FROM lists
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .map(|row: PgRow| MailingList::from_row(row))
    .fetch_all(db_pool.get_ref())
    .await
    .map_err(ListError::GetLists)?;

    Ok(HttpResponse::Ok().json(lists))
}

/// Memberships of the list are removed with it.
#[tracing::instrument(name = "Deleting a list handler", skip(_admin, db_pool))]
pub async fn handle_delete_list(
    _admin: AdminUser,
    list_id: web::Path<i64>,
    db_pool: web::Data<PgPool>,
) -> Result<HttpResponse, ListError> {
    let result = sqlx::query("DELETE FROM lists WHERE id = $1")
        .bind(list_id.into_inner())
        .execute(db_pool.get_ref())
        .await
        .map_err(ListError::DeleteList)?;

    if result.rows_affected() == 0 {
        return Err(ListError::NotFound);
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "List deleted successfully" })))
}
