//! Live report snapshot and workflow transitions.
//!
//! All mutations are serialized through one `Mutex`. Change listeners run
//! synchronously under that lock, so every listener observes the exact
//! sequence of snapshots the store went through, in order, with no
//! interleaving.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use foco_map_report_models::{Actor, NewReport, Report, ReportId, ReportStatus, TransitionAction};

use crate::ReportError;
use crate::documents::{ReportDocuments, StatusPatch};

/// Handle identifying a registered change listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type ChangeListener = Box<dyn Fn(&[Report]) + Send>;

struct StoreInner {
    reports: Vec<Report>,
    listeners: Vec<(ListenerId, ChangeListener)>,
}

/// Authoritative in-memory collection of breeding-site reports.
///
/// The snapshot is insertion-ordered. Workflow transitions are validated
/// before anything is touched; a rejected call leaves the snapshot exactly
/// as it was. Accepted mutations are pushed to the document backend as
/// detached background writes that are logged on failure and never block
/// the caller.
pub struct ReportStore {
    inner: Mutex<StoreInner>,
    documents: Arc<dyn ReportDocuments>,
    next_listener_id: AtomicU64,
}

impl ReportStore {
    /// Creates an empty store backed by `documents`.
    #[must_use]
    pub fn new(documents: Arc<dyn ReportDocuments>) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                reports: Vec::new(),
                listeners: Vec::new(),
            }),
            documents,
            next_listener_id: AtomicU64::new(0),
        }
    }

    /// Validates and files a new report, returning it in `PENDING` status.
    ///
    /// The description is stored trimmed. Listeners are notified before
    /// this returns; the document write happens in the background.
    ///
    /// # Errors
    ///
    /// * If the description is blank
    /// * If the location is outside valid latitude/longitude range
    ///
    /// # Panics
    ///
    /// * If called outside a tokio runtime (document writes are spawned
    ///   onto it)
    /// * If the store `Mutex` is poisoned
    pub fn create(&self, new_report: NewReport) -> Result<Report, ReportError> {
        let description = new_report.description.trim();
        if description.is_empty() {
            return Err(ReportError::InvalidInput {
                reason: "description must not be blank".to_string(),
            });
        }
        if !new_report.location.is_in_bounds() {
            return Err(ReportError::InvalidInput {
                reason: format!(
                    "location ({}, {}) is out of range",
                    new_report.location.latitude, new_report.location.longitude
                ),
            });
        }

        let report = Report {
            id: ReportId::generate(),
            location: new_report.location,
            description: description.to_string(),
            attachments: new_report.attachments,
            status: ReportStatus::Pending,
            created_by: new_report.created_by,
            verified_by: None,
            verify_comment: None,
            resolved_by: None,
            resolve_comment: None,
            created_at: Utc::now(),
            verified_at: None,
            resolved_at: None,
        };

        {
            let mut inner = self.inner.lock().expect("report store mutex poisoned");
            inner.reports.push(report.clone());
            Self::notify_locked(&inner);
        }

        log::debug!(
            "Created report {} at ({}, {})",
            report.id,
            report.location.latitude,
            report.location.longitude
        );
        self.spawn_persist(report.clone());

        Ok(report)
    }

    /// Marks a `PENDING` report as `VERIFIED` on behalf of an agent.
    ///
    /// # Errors
    ///
    /// * If `actor` does not hold the agent role
    /// * If no report with `id` exists
    /// * If the report is not currently `PENDING`
    ///
    /// # Panics
    ///
    /// * If called outside a tokio runtime (document writes are spawned
    ///   onto it)
    /// * If the store `Mutex` is poisoned
    pub fn verify(
        &self,
        id: &ReportId,
        actor: &Actor,
        comment: Option<String>,
    ) -> Result<Report, ReportError> {
        self.transition(id, actor, comment, TransitionAction::Verify)
    }

    /// Marks a `VERIFIED` report as `RESOLVED` on behalf of an agent.
    ///
    /// # Errors
    ///
    /// * If `actor` does not hold the agent role
    /// * If no report with `id` exists
    /// * If the report is not currently `VERIFIED`
    ///
    /// # Panics
    ///
    /// * If called outside a tokio runtime (document writes are spawned
    ///   onto it)
    /// * If the store `Mutex` is poisoned
    pub fn resolve(
        &self,
        id: &ReportId,
        actor: &Actor,
        comment: Option<String>,
    ) -> Result<Report, ReportError> {
        self.transition(id, actor, comment, TransitionAction::Resolve)
    }

    fn transition(
        &self,
        id: &ReportId,
        actor: &Actor,
        comment: Option<String>,
        action: TransitionAction,
    ) -> Result<Report, ReportError> {
        if !actor.role.is_agent() {
            return Err(ReportError::InvalidTransition {
                id: id.clone(),
                action,
                reason: format!("actor {} ({}) lacks the agent role", actor.id, actor.role),
            });
        }

        let updated = {
            let mut inner = self.inner.lock().expect("report store mutex poisoned");
            let Some(index) = inner.reports.iter().position(|report| &report.id == id) else {
                return Err(ReportError::NotFound { id: id.clone() });
            };

            let current = inner.reports[index].status;
            if current != action.required_status() {
                let reason = if current.is_terminal() {
                    format!("report is {current}, which is terminal")
                } else {
                    format!("report is {current}, expected {}", action.required_status())
                };
                return Err(ReportError::InvalidTransition {
                    id: id.clone(),
                    action,
                    reason,
                });
            }

            let updated = {
                // Wall clocks can step backwards; transition timestamps
                // must not precede the state they extend.
                let report = &mut inner.reports[index];
                match action {
                    TransitionAction::Verify => {
                        report.status = ReportStatus::Verified;
                        report.verified_by = Some(actor.id.clone());
                        report.verify_comment = comment;
                        report.verified_at = Some(Utc::now().max(report.created_at));
                    }
                    TransitionAction::Resolve => {
                        report.status = ReportStatus::Resolved;
                        report.resolved_by = Some(actor.id.clone());
                        report.resolve_comment = comment;
                        let floor = report.verified_at.unwrap_or(report.created_at);
                        report.resolved_at = Some(Utc::now().max(floor));
                    }
                }
                report.clone()
            };
            Self::notify_locked(&inner);
            updated
        };

        log::debug!("Applied {action} to report {} by agent {}", id, actor.id);
        self.spawn_status_patch(updated.id.clone(), StatusPatch::from_report(&updated));

        Ok(updated)
    }

    /// Returns a point-in-time copy of the snapshot, in insertion order.
    ///
    /// The copy does not reflect mutations applied after this returns.
    ///
    /// # Panics
    ///
    /// * If the store `Mutex` is poisoned
    #[must_use]
    pub fn current_reports(&self) -> Vec<Report> {
        self.inner
            .lock()
            .expect("report store mutex poisoned")
            .reports
            .clone()
    }

    /// Replaces the whole snapshot with the remote collection's contents.
    ///
    /// The remote collection is the document of record, so nothing is
    /// written back. Listeners are notified with the new snapshot.
    ///
    /// # Panics
    ///
    /// * If the store `Mutex` is poisoned
    pub fn apply_remote_snapshot(&self, reports: Vec<Report>) {
        let mut inner = self.inner.lock().expect("report store mutex poisoned");
        inner.reports = reports;
        log::debug!(
            "Remote snapshot replaced local state: {} reports",
            inner.reports.len()
        );
        Self::notify_locked(&inner);
    }

    /// Registers a listener invoked after every applied mutation.
    ///
    /// Listeners run synchronously under the store lock, in registration
    /// order, with the full post-mutation snapshot. They must return
    /// quickly, must not panic, and must not call back into the store.
    /// Nothing is delivered at registration time; pair with
    /// [`Self::current_reports`] to prime initial state.
    ///
    /// # Panics
    ///
    /// * If the store `Mutex` is poisoned
    pub fn on_change(&self, listener: impl Fn(&[Report]) + Send + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.inner
            .lock()
            .expect("report store mutex poisoned")
            .listeners
            .push((id, Box::new(listener)));
        id
    }

    /// Unregisters a change listener. Unknown ids are ignored.
    ///
    /// # Panics
    ///
    /// * If the store `Mutex` is poisoned
    pub fn remove_listener(&self, id: ListenerId) {
        self.inner
            .lock()
            .expect("report store mutex poisoned")
            .listeners
            .retain(|(listener_id, _)| *listener_id != id);
    }

    fn notify_locked(inner: &StoreInner) {
        for (_, listener) in &inner.listeners {
            listener(&inner.reports);
        }
    }

    fn spawn_persist(&self, report: Report) {
        let documents = Arc::clone(&self.documents);
        drop(tokio::spawn(async move {
            if let Err(e) = documents.persist_report(&report).await {
                log::warn!("Failed to persist report {}: {e:?}", report.id);
            }
        }));
    }

    fn spawn_status_patch(&self, id: ReportId, patch: StatusPatch) {
        let documents = Arc::clone(&self.documents);
        drop(tokio::spawn(async move {
            if let Err(e) = documents.update_status(&id, &patch).await {
                log::warn!("Failed to patch document for report {id}: {e:?}");
            }
        }));
    }
}
