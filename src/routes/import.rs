use actix_multipart::{Field, Multipart};
use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use futures_util::StreamExt;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::{
    auth::AdminUser,
    config::ImportConfig,
    error_chain_fmt,
    import::{run_import, ImportError, PgSubscriberStore, UploadedFile},
};

const FILE_FIELD: &str = "file";
const LIST_ID_FIELD: &str = "listId";

#[derive(thiserror::Error)]
pub enum ImportRouteError {
    #[error("No file uploaded")]
    MissingFile,
    #[error("{0}")]
    Validation(String),
    #[error("Uploaded file exceeds the {0} bytes limit")]
    TooLarge(usize),
    #[error("Invalid upload: {0}")]
    Multipart(String),
    #[error("Failed to store the uploaded file.")]
    Upload(#[source] std::io::Error),
    #[error(transparent)]
    Import(#[from] ImportError),
}

impl std::fmt::Debug for ImportRouteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for ImportRouteError {
    fn status_code(&self) -> StatusCode {
        match self {
            ImportRouteError::MissingFile
            | ImportRouteError::Validation(_)
            | ImportRouteError::Multipart(_) => StatusCode::BAD_REQUEST,
            ImportRouteError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ImportRouteError::Upload(_) | ImportRouteError::Import(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({ "error": self.to_string() }))
    }
}

/// Receives a multipart CSV upload and imports it.
///
/// Parts: `file` (the CSV) and an optional `listId`. The upload is written
/// to the configured upload directory and always removed afterwards.
#[tracing::instrument(
    name = "Importing subscribers handler",
    skip(admin, payload, store, import_config),
    fields(admin = %admin.username)
)]
pub async fn handle_import_subscribers(
    admin: AdminUser,
    mut payload: Multipart,
    store: web::Data<PgSubscriberStore>,
    import_config: web::Data<ImportConfig>,
) -> Result<HttpResponse, ImportRouteError> {
    tokio::fs::create_dir_all(&import_config.upload_dir)
        .await
        .map_err(ImportRouteError::Upload)?;

    let mut uploaded: Option<UploadedFile> = None;
    let mut list_id: Option<i64> = None;

    while let Some(field) = payload.next().await {
        let mut field = field.map_err(|err| ImportRouteError::Multipart(err.to_string()))?;
        let name = field
            .content_disposition()
            .get_name()
            .unwrap_or_default()
            .to_string();

        match name.as_str() {
            FILE_FIELD => {
                let file = UploadedFile::new(
                    import_config
                        .upload_dir
                        .join(format!("{}.csv", Uuid::new_v4())),
                );
                save_field(&mut field, file.path(), import_config.max_upload_bytes).await?;
                uploaded = Some(file);
            }
            LIST_ID_FIELD => {
                let value = read_text_field(&mut field).await?;
                list_id = parse_list_id(&value)?;
            }
            _ => drain_field(&mut field).await?,
        }
    }

    let file = uploaded.ok_or(ImportRouteError::MissingFile)?;
    let report = run_import(
        store.get_ref(),
        file,
        list_id,
        import_config.get_import_settings(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(report.summary()))
}

async fn save_field(field: &mut Field, path: &Path, max_bytes: usize) -> Result<(), ImportRouteError> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(ImportRouteError::Upload)?;
    let mut written = 0usize;

    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|err| ImportRouteError::Multipart(err.to_string()))?;
        written += chunk.len();

        if written > max_bytes {
            return Err(ImportRouteError::TooLarge(max_bytes));
        }

        file.write_all(&chunk)
            .await
            .map_err(ImportRouteError::Upload)?;
    }

    file.flush().await.map_err(ImportRouteError::Upload)?;
    tracing::info!("Stored uploaded file {} ({} bytes)", path.display(), written);

    Ok(())
}

async fn read_text_field(field: &mut Field) -> Result<String, ImportRouteError> {
    let mut bytes = Vec::new();

    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|err| ImportRouteError::Multipart(err.to_string()))?;
        bytes.extend_from_slice(&chunk);
    }

    String::from_utf8(bytes)
        .map_err(|_| ImportRouteError::Validation(String::from("listId must be valid text")))
}

async fn drain_field(field: &mut Field) -> Result<(), ImportRouteError> {
    while let Some(chunk) = field.next().await {
        chunk.map_err(|err| ImportRouteError::Multipart(err.to_string()))?;
    }

    Ok(())
}

fn parse_list_id(value: &str) -> Result<Option<i64>, ImportRouteError> {
    let value = value.trim();

    if value.is_empty() {
        return Ok(None);
    }

    value
        .parse::<i64>()
        .map(Some)
        .map_err(|_| ImportRouteError::Validation(format!("{} is not a valid list id", value)))
}
