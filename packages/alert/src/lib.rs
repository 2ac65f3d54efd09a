#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Proximity alerting over the live report snapshot.
//!
//! [`ProximityEvaluator`] selects the `VERIFIED` reports within alerting
//! range of an observer, [`AlertDeduper`] guarantees each report alerts a
//! session at most once, and [`AlertSink`] is the delivery seam the sync
//! layer pushes [`ProximityAlert`]s through.

use std::collections::HashSet;
use std::sync::Arc;

use foco_map_geo::{GeoPoint, distance_meters};
use foco_map_report_models::{Report, ReportId, ReportStatus};
use serde::{Deserialize, Serialize};

/// Alert radius applied when no override is configured, in meters.
pub const DEFAULT_ALERT_RADIUS_METERS: f64 = 300.0;

// ---------------------------------------------------------------------------
// Session identity
// ---------------------------------------------------------------------------

/// Opaque identifier of one observer session.
///
/// Dedup state is scoped to a session; a fresh session starts with a clean
/// alert history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generates a fresh random session identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// ---------------------------------------------------------------------------
// Radius evaluation
// ---------------------------------------------------------------------------

/// A verified report inside the alert radius of an observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximityHit {
    /// The report that is in range.
    pub report_id: ReportId,
    /// Great-circle distance from the observer to the report, in meters.
    pub distance_meters: f64,
}

/// Selects the reports an observer should be warned about.
///
/// Only `VERIFIED` reports qualify; pending sightings and resolved sites
/// are never alerted regardless of distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityEvaluator {
    radius_meters: f64,
}

impl ProximityEvaluator {
    /// Creates an evaluator with the given alert radius in meters.
    #[must_use]
    pub const fn new(radius_meters: f64) -> Self {
        Self { radius_meters }
    }

    /// Returns the configured alert radius in meters.
    #[must_use]
    pub const fn radius_meters(&self) -> f64 {
        self.radius_meters
    }

    /// Returns the verified reports within range of `observer`, in
    /// snapshot order. Distances exactly on the radius are included.
    #[must_use]
    pub fn eligible(&self, observer: GeoPoint, reports: &[Report]) -> Vec<ProximityHit> {
        let hits: Vec<ProximityHit> = reports
            .iter()
            .filter(|report| report.status == ReportStatus::Verified)
            .filter_map(|report| {
                let distance = distance_meters(observer, report.location);
                (distance <= self.radius_meters).then(|| ProximityHit {
                    report_id: report.id.clone(),
                    distance_meters: distance,
                })
            })
            .collect();

        log::trace!(
            "{} of {} reports within {} m of ({}, {})",
            hits.len(),
            reports.len(),
            self.radius_meters,
            observer.latitude,
            observer.longitude
        );

        hits
    }
}

impl Default for ProximityEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_ALERT_RADIUS_METERS)
    }
}

// ---------------------------------------------------------------------------
// Dedup
// ---------------------------------------------------------------------------

/// Tracks which (session, report) pairs have already alerted.
///
/// A pair stays recorded for the life of the session even if the report
/// later changes status, so status churn cannot re-trigger an alert.
#[derive(Debug, Default)]
pub struct AlertDeduper {
    fired: HashSet<(SessionId, ReportId)>,
}

impl AlertDeduper {
    /// Creates a deduper with no recorded alerts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the pair and returns `true` exactly once per pair; later
    /// calls for the same session and report return `false`.
    pub fn should_fire(&mut self, session: &SessionId, report: &ReportId) -> bool {
        self.fired.insert((session.clone(), report.clone()))
    }

    /// Forgets every alert recorded for `session`, re-arming all of its
    /// reports. Other sessions are untouched.
    pub fn reset(&mut self, session: &SessionId) {
        let before = self.fired.len();
        self.fired
            .retain(|(fired_session, _)| fired_session != session);
        log::debug!(
            "Re-armed {} alerts for session {session}",
            before - self.fired.len()
        );
    }
}

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

/// One proximity warning delivered to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximityAlert {
    /// Session the alert was raised for.
    pub session_id: SessionId,
    /// The verified report in range.
    pub report_id: ReportId,
    /// Distance from the observer at evaluation time, in meters.
    pub distance_meters: f64,
}

/// Delivery channel for proximity alerts.
///
/// Implementations must be cheap and non-blocking; delivery outcomes are
/// the sink's own concern and never propagate back into evaluation.
pub trait AlertSink: Send + Sync {
    /// Delivers one alert.
    fn notify(&self, alert: &ProximityAlert);
}

/// Sink that discards every alert.
pub struct NullAlertSink;

impl AlertSink for NullAlertSink {
    fn notify(&self, _alert: &ProximityAlert) {}
}

/// Returns a shared sink that discards every alert.
#[must_use]
pub fn null_alert_sink() -> Arc<dyn AlertSink> {
    Arc::new(NullAlertSink)
}
