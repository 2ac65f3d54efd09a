//! Async wiring between the report store and a session engine.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use foco_map_alert::{AlertSink, ProximityEvaluator, SessionId};
use foco_map_geo::GeoPoint;
use foco_map_report::{ListenerId, ReportStore};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::SyncConfig;
use crate::engine::SessionEngine;

/// Starts sync sessions against a shared report store.
pub struct SyncController;

impl SyncController {
    /// Spawns the event loop for one observer session and returns its
    /// handle.
    ///
    /// The session subscribes to store changes before priming from the
    /// current snapshot, so a mutation applied while the session starts
    /// is never lost, at worst it is evaluated twice. Location updates
    /// and report changes are then merged into one loop; each tick runs
    /// a proximity pass.
    ///
    /// # Panics
    ///
    /// * If called outside a tokio runtime
    /// * If the store `Mutex` is poisoned
    #[must_use]
    pub fn start(
        store: Arc<ReportStore>,
        config: SyncConfig,
        session_id: SessionId,
        sink: Arc<dyn AlertSink>,
    ) -> SyncHandle {
        let live = Arc::new(AtomicBool::new(true));
        let (report_tx, mut report_rx) = mpsc::unbounded_channel();
        let (location_tx, mut location_rx) = mpsc::channel(config.location_buffer.max(1));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        // The listener runs under the store lock and must never block,
        // so report ticks go through an unbounded channel.
        let listener_id = store.on_change(move |reports| {
            let _ = report_tx.send(reports.to_vec());
        });

        let mut engine = SessionEngine::new(
            session_id.clone(),
            ProximityEvaluator::new(config.radius_meters),
            sink,
            Arc::clone(&live),
        );
        engine.on_reports(store.current_reports());

        log::info!(
            "Session {session_id} started: alert radius {} m",
            config.radius_meters
        );

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;

                    _ = shutdown_rx.recv() => {
                        log::debug!("Session {}: shutdown signal received", engine.session_id());
                        break;
                    }
                    Some(reports) = report_rx.recv() => {
                        engine.on_reports(reports);
                    }
                    Some(location) = location_rx.recv() => {
                        engine.on_location(location);
                    }
                    else => break,
                }
            }
        });

        SyncHandle {
            session_id,
            live,
            location_tx,
            shutdown_tx,
            listener_id,
            store,
            task: Some(task),
        }
    }
}

/// Running sync session.
///
/// Dropping the handle tears the session down without waiting for the
/// loop to finish; [`SyncHandle::shutdown`] does the same but joins the
/// loop so no evaluation is still running when it returns.
pub struct SyncHandle {
    session_id: SessionId,
    live: Arc<AtomicBool>,
    location_tx: mpsc::Sender<GeoPoint>,
    shutdown_tx: mpsc::Sender<()>,
    listener_id: ListenerId,
    store: Arc<ReportStore>,
    task: Option<JoinHandle<()>>,
}

impl SyncHandle {
    /// Returns the session this handle controls.
    #[must_use]
    pub const fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Returns `false` once shutdown has begun.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Queues an observer position for evaluation.
    ///
    /// Updates sent after shutdown are dropped.
    pub async fn push_location(&self, location: GeoPoint) {
        if self.location_tx.send(location).await.is_err() {
            log::debug!(
                "Session {}: dropped location update, session loop stopped",
                self.session_id
            );
        }
    }

    /// Returns a sender feeding this session's location stream, for
    /// wiring to an external position source.
    #[must_use]
    pub fn location_sender(&self) -> mpsc::Sender<GeoPoint> {
        self.location_tx.clone()
    }

    /// Stops the session: no alert is emitted after this returns.
    ///
    /// The liveness flag is cleared first so ticks already queued cannot
    /// emit, then the store subscription is removed and the loop joined.
    pub async fn shutdown(mut self) {
        self.live.store(false, Ordering::SeqCst);
        self.store.remove_listener(self.listener_id);
        let _ = self.shutdown_tx.send(()).await;
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                log::warn!("Session {}: sync task ended abnormally: {e:?}", self.session_id);
            }
        }
        log::info!("Session {} stopped", self.session_id);
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.live.store(false, Ordering::SeqCst);
        self.store.remove_listener(self.listener_id);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use foco_map_alert::{ProximityAlert, null_alert_sink};
    use foco_map_report::null_documents;
    use foco_map_report_models::{Actor, NewReport};

    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        alerts: Mutex<Vec<ProximityAlert>>,
    }

    impl RecordingSink {
        fn alerts(&self) -> Vec<ProximityAlert> {
            self.alerts.lock().unwrap().clone()
        }
    }

    impl AlertSink for RecordingSink {
        fn notify(&self, alert: &ProximityAlert) {
            self.alerts.lock().unwrap().push(alert.clone());
        }
    }

    fn new_report(latitude: f64, longitude: f64) -> NewReport {
        NewReport {
            location: GeoPoint::new(latitude, longitude),
            description: "standing water".to_string(),
            attachments: Vec::new(),
            created_by: "u-1".to_string(),
        }
    }

    async fn wait_for_alerts(sink: &RecordingSink, count: usize) {
        for _ in 0..500 {
            if sink.alerts().len() >= count {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!(
            "expected {count} alerts, saw {}",
            sink.alerts().len()
        );
    }

    fn session(
        store: &Arc<ReportStore>,
        id: &str,
        radius_meters: f64,
    ) -> (SyncHandle, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let handle = SyncController::start(
            Arc::clone(store),
            SyncConfig {
                radius_meters,
                ..SyncConfig::default()
            },
            SessionId::from(id),
            Arc::clone(&sink) as Arc<dyn AlertSink>,
        );
        (handle, sink)
    }

    #[tokio::test]
    async fn handles_expose_session_identity() {
        let store = Arc::new(ReportStore::new(null_documents()));
        let handle = SyncController::start(
            Arc::clone(&store),
            SyncConfig::default(),
            SessionId::from("s-9"),
            null_alert_sink(),
        );

        assert_eq!(handle.session_id().as_str(), "s-9");
        assert!(handle.is_live());
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn location_update_triggers_an_alert() {
        let store = Arc::new(ReportStore::new(null_documents()));
        let (handle, sink) = session(&store, "s-1", 300.0);

        let report = store.create(new_report(0.0, 0.0)).unwrap();
        store
            .verify(&report.id, &Actor::agent("a-1"), None)
            .unwrap();
        handle.push_location(GeoPoint::new(0.0, 0.001)).await;

        wait_for_alerts(&sink, 1).await;
        let alerts = sink.alerts();
        assert_eq!(alerts[0].report_id, report.id);
        assert_eq!(alerts[0].session_id.as_str(), "s-1");
        assert!(alerts[0].distance_meters > 110.0 && alerts[0].distance_meters < 113.0);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn verification_triggers_an_alert_without_new_locations() {
        let store = Arc::new(ReportStore::new(null_documents()));
        let (handle, sink) = session(&store, "s-1", 300.0);

        let report = store.create(new_report(0.0, 0.0)).unwrap();
        handle.push_location(GeoPoint::new(0.0, 0.0005)).await;

        // The report was pending at the last location fix. No further
        // movement happens; only the verification change can alert.
        store
            .verify(&report.id, &Actor::agent("a-1"), None)
            .unwrap();

        wait_for_alerts(&sink, 1).await;
        assert_eq!(sink.alerts().len(), 1);
        assert_eq!(sink.alerts()[0].report_id, report.id);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn sessions_prime_from_the_existing_snapshot() {
        let store = Arc::new(ReportStore::new(null_documents()));
        let report = store.create(new_report(0.0, 0.0)).unwrap();
        store
            .verify(&report.id, &Actor::agent("a-1"), None)
            .unwrap();

        let (handle, sink) = session(&store, "s-1", 300.0);
        handle.push_location(GeoPoint::new(0.0, 0.001)).await;

        wait_for_alerts(&sink, 1).await;
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn each_session_gets_its_own_alert() {
        let store = Arc::new(ReportStore::new(null_documents()));
        let (handle_a, sink_a) = session(&store, "s-a", 300.0);
        let (handle_b, sink_b) = session(&store, "s-b", 300.0);

        let report = store.create(new_report(0.0, 0.0)).unwrap();
        store
            .verify(&report.id, &Actor::agent("a-1"), None)
            .unwrap();
        handle_a.push_location(GeoPoint::new(0.0, 0.001)).await;
        handle_b.push_location(GeoPoint::new(0.0, 0.001)).await;

        wait_for_alerts(&sink_a, 1).await;
        wait_for_alerts(&sink_b, 1).await;
        assert_eq!(sink_a.alerts().len(), 1);
        assert_eq!(sink_b.alerts().len(), 1);
        assert_eq!(sink_a.alerts()[0].session_id.as_str(), "s-a");
        assert_eq!(sink_b.alerts()[0].session_id.as_str(), "s-b");

        handle_a.shutdown().await;
        handle_b.shutdown().await;
    }

    #[tokio::test]
    async fn configured_radius_limits_alerts() {
        let store = Arc::new(ReportStore::new(null_documents()));
        let (handle, sink) = session(&store, "s-1", 50.0);

        let report = store.create(new_report(0.0, 0.001)).unwrap();
        store
            .verify(&report.id, &Actor::agent("a-1"), None)
            .unwrap();

        // Roughly 111 m away, outside the 50 m radius.
        handle.push_location(GeoPoint::new(0.0, 0.0)).await;
        // Roughly 22 m away.
        handle.push_location(GeoPoint::new(0.0, 0.0008)).await;

        wait_for_alerts(&sink, 1).await;
        let alerts = sink.alerts();
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].distance_meters < 50.0);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_silences_the_session() {
        let store = Arc::new(ReportStore::new(null_documents()));
        let (handle, sink) = session(&store, "s-1", 300.0);

        let report = store.create(new_report(0.0, 0.0)).unwrap();
        handle.push_location(GeoPoint::new(0.0, 0.0)).await;
        assert!(handle.is_live());
        handle.shutdown().await;

        // The subscription is gone, so this mutation reaches no session.
        store
            .verify(&report.id, &Actor::agent("a-1"), None)
            .unwrap();
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }

        assert!(sink.alerts().is_empty());
    }

    #[tokio::test]
    async fn locations_after_shutdown_are_dropped() {
        let store = Arc::new(ReportStore::new(null_documents()));
        let (handle, sink) = session(&store, "s-1", 300.0);
        let sender = handle.location_sender();

        handle.shutdown().await;

        assert!(sender.send(GeoPoint::new(0.0, 0.0)).await.is_err());
        assert!(sink.alerts().is_empty());
    }
}
