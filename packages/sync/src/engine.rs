//! Session evaluation state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use foco_map_alert::{AlertDeduper, AlertSink, ProximityAlert, ProximityEvaluator, SessionId};
use foco_map_geo::GeoPoint;
use foco_map_report_models::Report;

/// Evaluation core of one observer session.
///
/// Holds the last known observer position and report snapshot, and runs a
/// proximity pass whenever either side ticks. Alerts are deduped per
/// session and pushed through the sink; the liveness flag is consulted
/// immediately before each delivery so a session that is being torn down
/// stops emitting even with a pass in flight.
///
/// The engine is single-owner by design. The controller drives it from
/// one task; nothing here is shared.
pub struct SessionEngine {
    session_id: SessionId,
    evaluator: ProximityEvaluator,
    deduper: AlertDeduper,
    sink: Arc<dyn AlertSink>,
    live: Arc<AtomicBool>,
    observer: Option<GeoPoint>,
    reports: Vec<Report>,
}

impl SessionEngine {
    /// Creates an engine with no observer position and an empty snapshot.
    #[must_use]
    pub fn new(
        session_id: SessionId,
        evaluator: ProximityEvaluator,
        sink: Arc<dyn AlertSink>,
        live: Arc<AtomicBool>,
    ) -> Self {
        Self {
            session_id,
            evaluator,
            deduper: AlertDeduper::new(),
            sink,
            live,
            observer: None,
            reports: Vec::new(),
        }
    }

    /// Returns the session this engine evaluates for.
    #[must_use]
    pub const fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Records a new observer position and runs a proximity pass.
    pub fn on_location(&mut self, location: GeoPoint) {
        self.observer = Some(location);
        self.evaluate();
    }

    /// Replaces the report snapshot and runs a proximity pass.
    ///
    /// A pass with no observer position yet is a no-op beyond storing the
    /// snapshot. A report verified into range since the last tick alerts
    /// here without any observer movement.
    pub fn on_reports(&mut self, reports: Vec<Report>) {
        self.reports = reports;
        self.evaluate();
    }

    /// Forgets this session's alert history so in-range reports can alert
    /// again on the next tick.
    pub fn reset_alerts(&mut self) {
        self.deduper.reset(&self.session_id);
    }

    fn evaluate(&mut self) {
        let Some(observer) = self.observer else {
            return;
        };

        for hit in self.evaluator.eligible(observer, &self.reports) {
            if !self.deduper.should_fire(&self.session_id, &hit.report_id) {
                continue;
            }
            if !self.live.load(Ordering::SeqCst) {
                return;
            }
            let alert = ProximityAlert {
                session_id: self.session_id.clone(),
                report_id: hit.report_id,
                distance_meters: hit.distance_meters,
            };
            log::info!(
                "Session {}: proximity alert for report {} at {:.1} m",
                alert.session_id,
                alert.report_id,
                alert.distance_meters
            );
            self.sink.notify(&alert);
        }
    }
}
