//! Bulk subscriber import from CSV files.
//!
//! Rows flow through [`normalizer`] and [`validator`], are grouped by
//! [`batcher`], written by [`writer`] into a [`store::SubscriberStore`] and
//! finally linked to a list by [`associator`]. [`orchestrator`] drives the
//! whole run and produces an [`report::ImportReport`].

pub mod associator;
pub mod batcher;
pub mod normalizer;
pub mod orchestrator;
pub mod report;
pub mod store;
pub mod validator;
pub mod writer;

pub use orchestrator::{run_import, ImportError, ImportSettings, Importer, UploadedFile};
pub use report::{ImportReport, ImportSummary};
pub use store::{PgSubscriberStore, SubscriberStore};
