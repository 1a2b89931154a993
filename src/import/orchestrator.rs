use csv::{ReaderBuilder, StringRecord};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::sync::mpsc;

use crate::error_chain_fmt;
use crate::import::associator::{associate_with_list, DEFAULT_ASSOCIATION_BATCH_SIZE};
use crate::import::batcher::{BatchBuffer, DEFAULT_BATCH_SIZE};
use crate::import::normalizer::{ColumnMap, SubscriberRecord};
use crate::import::report::ImportReport;
use crate::import::store::SubscriberStore;
use crate::import::validator::{validate_row, SkipReason};
use crate::import::writer::write_batch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSettings {
    /// Records per insert statement.
    pub batch_size: usize,
    /// Emails per lookup when associating with a list.
    pub association_batch_size: usize,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            association_batch_size: DEFAULT_ASSOCIATION_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStage {
    Reading,
    Writing,
    Associating,
    Done,
}

impl ImportStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStage::Reading => "reading",
            ImportStage::Writing => "writing",
            ImportStage::Associating => "associating",
            ImportStage::Done => "done",
        }
    }
}

#[derive(thiserror::Error)]
pub enum ImportError {
    #[error("Failed to open the uploaded file.")]
    OpenFile(#[source] csv::Error),
    #[error("Failed to read the uploaded file.")]
    ReadFile(#[source] csv::Error),
    #[error("The CSV reader stopped unexpectedly.")]
    Reader(#[source] tokio::task::JoinError),
}

impl std::fmt::Debug for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// An uploaded file on disk.
///
/// [`UploadedFile::remove`] deletes it without blocking. A value dropped
/// before that still deletes the file, synchronously.
#[derive(Debug)]
pub struct UploadedFile {
    path: PathBuf,
    removed: bool,
}

impl UploadedFile {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            removed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn remove(mut self) {
        self.removed = true;

        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => tracing::debug!("Deleted uploaded file {}", self.path.display()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => tracing::error!(
                "Failed to delete uploaded file {}: {:?}",
                self.path.display(),
                err
            ),
        }
    }
}

impl Drop for UploadedFile {
    fn drop(&mut self) {
        if self.removed {
            return;
        }

        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("Deleted uploaded file {}", self.path.display()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => tracing::error!(
                "Failed to delete uploaded file {}: {:?}",
                self.path.display(),
                err
            ),
        }
    }
}

/// Drives one CSV import: rows are normalized and validated as they are
/// read, written in batches as soon as a batch fills up, and associated with
/// `list_id` once the whole file has been consumed.
///
/// A failing batch only adds its rows to the skipped count. The uploaded
/// file is deleted on every return path.
pub struct Importer<'a, S: ?Sized> {
    store: &'a S,
    settings: ImportSettings,
    report: ImportReport,
    stage: ImportStage,
}

impl<'a, S> Importer<'a, S>
where
    S: SubscriberStore + ?Sized,
{
    pub fn new(store: &'a S, settings: ImportSettings) -> Self {
        Self {
            store,
            settings,
            report: ImportReport::default(),
            stage: ImportStage::Reading,
        }
    }

    #[tracing::instrument(
        name = "Import subscribers from CSV",
        skip(self, file),
        fields(file = %file.path().display(), list_id = ?list_id)
    )]
    pub async fn run(
        mut self,
        file: UploadedFile,
        list_id: Option<i64>,
    ) -> Result<ImportReport, ImportError> {
        let started = Instant::now();

        let result = self.process(file.path(), list_id).await;
        file.remove().await;

        match result {
            Ok(()) => {
                self.report.elapsed = started.elapsed();
                self.enter(ImportStage::Done);

                tracing::info!(
                    "Import complete in {} - Imported: {}, Duplicates: {}, Skipped: {} ({:?})",
                    self.report.duration(),
                    self.report.imported,
                    self.report.duplicates,
                    self.report.skipped_rows(),
                    self.report.skipped
                );

                Ok(self.report)
            }
            Err(err) => {
                tracing::error!(
                    stage = self.stage.as_str(),
                    "Import aborted after {} rows: {:?}",
                    self.report.total,
                    err
                );

                Err(err)
            }
        }
    }

    async fn process(&mut self, path: &Path, list_id: Option<i64>) -> Result<(), ImportError> {
        let (sender, mut rows) = mpsc::channel(self.settings.batch_size.max(1));
        let path = path.to_path_buf();
        let span = tracing::Span::current();
        let reader =
            tokio::task::spawn_blocking(move || span.in_scope(|| read_rows(&path, sender)));

        let mut buffer = BatchBuffer::new(self.settings.batch_size);
        let mut processed_emails: Vec<String> = Vec::new();

        while let Some(row) = rows.recv().await {
            self.report.total += 1;

            match row {
                Ok(record) => {
                    processed_emails.push(record.email.clone());

                    if let Some(batch) = buffer.push(record) {
                        self.commit(batch).await;
                    }
                }
                Err(reason) => self.report.skip(reason, 1),
            }
        }

        reader.await.map_err(ImportError::Reader)??;

        if let Some(batch) = buffer.flush() {
            self.commit(batch).await;
        }

        tracing::info!(
            "Total rows read: {}, Valid: {}, Batches: {}",
            self.report.total,
            processed_emails.len(),
            self.report.batches
        );

        if let Some(list_id) = list_id {
            if !processed_emails.is_empty() {
                self.associate(&processed_emails, list_id).await;
            }
        }

        Ok(())
    }

    async fn commit(&mut self, batch: Vec<SubscriberRecord>) {
        self.enter(ImportStage::Writing);
        self.report.batches += 1;

        match write_batch(self.store, &batch).await {
            Ok(outcome) => {
                self.report.imported += outcome.affected_rows;
                self.report.duplicates += outcome.duplicates;
            }
            Err(err) => {
                tracing::error!(
                    "Error in batch {} ({} rows skipped): {:?}",
                    self.report.batches,
                    batch.len(),
                    err
                );
                self.report.failed_batches += 1;
                self.report.skip(SkipReason::FailedBatch, batch.len() as u64);
            }
        }

        if self.report.batches % 10 == 0 {
            tracing::info!(
                "Processed batch {} - Total imported: {}, Duplicates: {}",
                self.report.batches,
                self.report.imported,
                self.report.duplicates
            );
        }

        self.enter(ImportStage::Reading);
    }

    async fn associate(&mut self, emails: &[String], list_id: i64) {
        self.enter(ImportStage::Associating);

        match associate_with_list(
            self.store,
            emails,
            list_id,
            self.settings.association_batch_size,
        )
        .await
        {
            Ok(outcome) => {
                self.report.memberships_added = outcome.inserted;
                tracing::info!(
                    "List associations complete: {} subscribers resolved, {} added to list {}",
                    outcome.resolved,
                    outcome.inserted,
                    list_id
                );
            }
            Err(err) => {
                tracing::error!("Error adding subscribers to list {}: {:?}", list_id, err);
            }
        }
    }

    fn enter(&mut self, stage: ImportStage) {
        if self.stage != stage {
            tracing::trace!("Import stage {} -> {}", self.stage.as_str(), stage.as_str());
            self.stage = stage;
        }
    }
}

type ValidatedRow = Result<SubscriberRecord, SkipReason>;

/// Parses and validates every row of the CSV at `path`, sending each outcome
/// in file order. Runs on a blocking thread; stops early once the receiver
/// is gone.
fn read_rows(path: &Path, rows: mpsc::Sender<ValidatedRow>) -> Result<(), ImportError> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(ImportError::OpenFile)?;

    let headers = reader.headers().map_err(ImportError::ReadFile)?.clone();
    let columns = ColumnMap::resolve(&headers);

    tracing::info!("CSV columns detected: {:?}", headers.iter().collect::<Vec<_>>());
    if !columns.has_email_column() {
        tracing::warn!("No email column found, every row will be skipped");
    }

    let mut record = StringRecord::new();
    let mut line = 0u64;

    loop {
        let row = match reader.read_record(&mut record) {
            Ok(false) => return Ok(()),
            Ok(true) => {
                line += 1;
                validate_row(columns.normalize(&record))
            }
            Err(err) if err.is_io_error() => return Err(ImportError::ReadFile(err)),
            Err(err) => {
                line += 1;
                tracing::warn!("Row {} could not be parsed: {}", line, err);
                Err(SkipReason::UnreadableRow)
            }
        };

        if let Err(reason) = &row {
            tracing::debug!("Row {} skipped: {}", line, reason.as_str());
        }

        if rows.blocking_send(row).is_err() {
            return Ok(());
        }
    }
}

/// Runs an import with `settings` against `store`.
pub async fn run_import<S>(
    store: &S,
    file: UploadedFile,
    list_id: Option<i64>,
    settings: ImportSettings,
) -> Result<ImportReport, ImportError>
where
    S: SubscriberStore + ?Sized,
{
    Importer::new(store, settings).run(file, list_id).await
}
