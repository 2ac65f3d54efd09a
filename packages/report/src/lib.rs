#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Authoritative in-memory report store.
//!
//! The [`store::ReportStore`] owns the live snapshot of breeding-site
//! reports, enforces the `PENDING -> VERIFIED -> RESOLVED` workflow, and
//! fans every applied mutation out to registered change listeners. Durable
//! persistence is delegated to a [`documents::ReportDocuments`] backend and
//! never blocks or fails a store operation.

pub mod documents;
pub mod store;

use foco_map_report_models::{ReportId, TransitionAction};
use thiserror::Error;

pub use documents::{
    DocumentError, InMemoryDocuments, NullDocuments, ReportDocuments, StatusPatch, null_documents,
};
pub use store::{ListenerId, ReportStore};

/// Error cases for report creation and workflow transitions.
///
/// Every variant is raised before the snapshot is touched, so a returned
/// error guarantees the store content is exactly what it was before the
/// call.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Creation input failed validation.
    #[error("invalid report input: {reason}")]
    InvalidInput {
        /// Which constraint the input violated.
        reason: String,
    },
    /// The requested transition is not legal for the report's current
    /// status, or the acting user lacks the agent role.
    #[error("cannot {action} report {id}: {reason}")]
    InvalidTransition {
        /// Target report.
        id: ReportId,
        /// The rejected operation.
        action: TransitionAction,
        /// Why the transition was refused.
        reason: String,
    },
    /// No report with the given identifier exists in the snapshot.
    #[error("report {id} not found")]
    NotFound {
        /// The unknown identifier.
        id: ReportId,
    },
}
