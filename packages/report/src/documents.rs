//! Document-collection backend trait.
//!
//! The store pushes every accepted mutation to a [`ReportDocuments`]
//! implementation: full documents for new reports, partial
//! [`StatusPatch`]es for workflow transitions. Backends are best-effort
//! collaborators; failures are logged by the store and never surface to
//! callers.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use foco_map_report_models::{Report, ReportId, ReportStatus};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error from a document backend write.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The backend rejected or failed the write.
    #[error("document backend error: {message}")]
    Backend {
        /// Backend-specific failure description.
        message: String,
    },
    /// The report or patch could not be serialized into a document.
    #[error("document serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Partial update carrying only the status-workflow fields of a report.
///
/// Serialized camelCase so a patch merges cleanly into the documents the
/// mobile clients subscribe to. Fields that are `None` are omitted and
/// leave the stored document untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPatch {
    /// New workflow status.
    pub status: ReportStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolve_comment: Option<String>,
}

impl StatusPatch {
    /// Captures the status-workflow fields of `report` as a patch.
    #[must_use]
    pub fn from_report(report: &Report) -> Self {
        Self {
            status: report.status,
            verified_by: report.verified_by.clone(),
            verified_at: report.verified_at,
            verify_comment: report.verify_comment.clone(),
            resolved_by: report.resolved_by.clone(),
            resolved_at: report.resolved_at,
            resolve_comment: report.resolve_comment.clone(),
        }
    }
}

/// Write access to the external report document collection.
#[async_trait]
pub trait ReportDocuments: Send + Sync {
    /// Writes the full document for a newly created report.
    ///
    /// # Errors
    ///
    /// * If the backend write fails
    async fn persist_report(&self, report: &Report) -> Result<(), DocumentError>;

    /// Merges a status patch into the document for `id`.
    ///
    /// # Errors
    ///
    /// * If no document exists for `id`
    /// * If the backend write fails
    async fn update_status(&self, id: &ReportId, patch: &StatusPatch) -> Result<(), DocumentError>;
}

/// Backend that discards every write.
pub struct NullDocuments;

#[async_trait]
impl ReportDocuments for NullDocuments {
    async fn persist_report(&self, _report: &Report) -> Result<(), DocumentError> {
        Ok(())
    }

    async fn update_status(
        &self,
        _id: &ReportId,
        _patch: &StatusPatch,
    ) -> Result<(), DocumentError> {
        Ok(())
    }
}

/// Returns a shared backend that discards every write.
#[must_use]
pub fn null_documents() -> Arc<dyn ReportDocuments> {
    Arc::new(NullDocuments)
}

/// Document collection held in process memory, keyed by report id.
///
/// Stands in for the hosted collection in tests and the simulator while
/// keeping the same full-write and merge-patch semantics.
pub struct InMemoryDocuments {
    documents: Mutex<BTreeMap<String, serde_json::Value>>,
}

impl InMemoryDocuments {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self {
            documents: Mutex::new(BTreeMap::new()),
        }
    }

    /// Returns the stored document for `id`, if any.
    ///
    /// # Panics
    ///
    /// * If the collection `Mutex` is poisoned
    #[must_use]
    pub fn document(&self, id: &ReportId) -> Option<serde_json::Value> {
        self.documents
            .lock()
            .expect("document collection mutex poisoned")
            .get(id.as_str())
            .cloned()
    }

    /// Returns the number of stored documents.
    ///
    /// # Panics
    ///
    /// * If the collection `Mutex` is poisoned
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents
            .lock()
            .expect("document collection mutex poisoned")
            .len()
    }

    /// Returns `true` if no documents are stored.
    ///
    /// # Panics
    ///
    /// * If the collection `Mutex` is poisoned
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryDocuments {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReportDocuments for InMemoryDocuments {
    async fn persist_report(&self, report: &Report) -> Result<(), DocumentError> {
        let document = serde_json::to_value(report)?;
        self.documents
            .lock()
            .expect("document collection mutex poisoned")
            .insert(report.id.as_str().to_string(), document);
        Ok(())
    }

    async fn update_status(&self, id: &ReportId, patch: &StatusPatch) -> Result<(), DocumentError> {
        let fields = match serde_json::to_value(patch)? {
            serde_json::Value::Object(fields) => fields,
            _ => {
                return Err(DocumentError::Backend {
                    message: "status patch did not serialize to an object".to_string(),
                });
            }
        };

        let mut documents = self
            .documents
            .lock()
            .expect("document collection mutex poisoned");

        let Some(serde_json::Value::Object(document)) = documents.get_mut(id.as_str()) else {
            return Err(DocumentError::Backend {
                message: format!("no document for report {id}"),
            });
        };

        for (key, value) in fields {
            document.insert(key, value);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use foco_map_geo::GeoPoint;
    use foco_map_report_models::ReportStatus;

    use super::*;

    fn pending_report() -> Report {
        Report {
            id: ReportId::from("r-1"),
            location: GeoPoint::new(-3.1, -60.0),
            description: "standing water in a tire pile".to_string(),
            attachments: Vec::new(),
            status: ReportStatus::Pending,
            created_by: "u-9".to_string(),
            verified_by: None,
            verify_comment: None,
            resolved_by: None,
            resolve_comment: None,
            created_at: Utc::now(),
            verified_at: None,
            resolved_at: None,
        }
    }

    #[tokio::test]
    async fn persisted_document_uses_client_field_names() {
        let documents = InMemoryDocuments::new();
        let report = pending_report();

        documents.persist_report(&report).await.unwrap();

        let document = documents.document(&report.id).unwrap();
        assert_eq!(document["status"], "PENDING");
        assert_eq!(document["createdBy"], "u-9");
        assert_eq!(document["location"]["latitude"], -3.1);
        assert!(document.get("createdAt").is_some());
        assert!(document.get("verifiedBy").is_none());
        assert!(document.get("attachments").is_none());
    }

    #[tokio::test]
    async fn status_patch_merges_into_existing_document() {
        let documents = InMemoryDocuments::new();
        let mut report = pending_report();
        documents.persist_report(&report).await.unwrap();

        report.status = ReportStatus::Verified;
        report.verified_by = Some("a-2".to_string());
        report.verified_at = Some(Utc::now());
        documents
            .update_status(&report.id, &StatusPatch::from_report(&report))
            .await
            .unwrap();

        let document = documents.document(&report.id).unwrap();
        assert_eq!(document["status"], "VERIFIED");
        assert_eq!(document["verifiedBy"], "a-2");
        assert_eq!(document["createdBy"], "u-9");
        assert!(document.get("resolvedBy").is_none());
    }

    #[tokio::test]
    async fn patch_against_missing_document_errors() {
        let documents = InMemoryDocuments::new();
        let report = pending_report();

        let result = documents
            .update_status(&report.id, &StatusPatch::from_report(&report))
            .await;

        assert!(matches!(result, Err(DocumentError::Backend { .. })));
        assert!(documents.is_empty());
    }

    #[test]
    fn patch_serialization_omits_absent_fields() {
        let mut report = pending_report();
        report.status = ReportStatus::Verified;
        report.verified_by = Some("a-2".to_string());

        let value = serde_json::to_value(StatusPatch::from_report(&report)).unwrap();

        assert_eq!(value["status"], "VERIFIED");
        assert_eq!(value["verifiedBy"], "a-2");
        assert!(value.get("resolvedBy").is_none());
        assert!(value.get("verifiedAt").is_none());
    }
}
