#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Scenario runner for the focomap engine.
//!
//! Plays a scripted [`scenario::Scenario`] against a fresh report store
//! with one live sync session attached, then reports what happened: final
//! report statuses, persisted documents, the map region covering the
//! sites, and every proximity alert the session received.

pub mod alerts;
pub mod scenario;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use foco_map_alert::{AlertSink, ProximityAlert, SessionId};
use foco_map_geo::{GeoPoint, MapRegion};
use foco_map_report::{InMemoryDocuments, ReportDocuments, ReportError, ReportStore};
use foco_map_report_models::{Actor, MediaRef, NewReport, Report, ReportId, ReportStatus};
use foco_map_sync::{SyncConfig, SyncController};
use thiserror::Error;

pub use crate::alerts::AlertRecorder;
use crate::scenario::{Scenario, Step};

/// Grace period for in-flight ticks and document writes after the last
/// step, in milliseconds.
const SETTLE_MILLIS: u64 = 50;

/// Errors from loading or running a scenario.
#[derive(Debug, Error)]
pub enum CliError {
    /// The scenario file could not be read.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The scenario file is not a valid scenario document.
    #[error("invalid scenario file: {0}")]
    Scenario(#[from] toml::de::Error),
    /// A scripted report operation was rejected by the store.
    #[error(transparent)]
    Report(#[from] ReportError),
    /// A step referenced a handle no create step introduced.
    #[error("unknown report handle {handle:?}")]
    UnknownHandle {
        /// The handle the step referenced.
        handle: String,
    },
}

/// Everything a scenario run produced.
#[derive(Debug)]
pub struct ScenarioReport {
    /// Final report snapshot, in insertion order.
    pub reports: Vec<Report>,
    /// Alerts delivered to the session, in order.
    pub alerts: Vec<ProximityAlert>,
    /// Map region covering the final report locations, or centered on
    /// the observer's last position when nothing was reported.
    pub region: Option<MapRegion>,
    /// Number of documents in the backing collection.
    pub documents: usize,
}

impl ScenarioReport {
    /// Counts reports that finished the run in `status`.
    #[must_use]
    pub fn status_count(&self, status: ReportStatus) -> usize {
        self.reports
            .iter()
            .filter(|report| report.status == status)
            .count()
    }
}

/// Plays a scenario against a fresh store with one live session.
///
/// # Errors
///
/// * If a scripted report operation is rejected
/// * If a step references an unknown handle
///
/// # Panics
///
/// * If the store or recorder `Mutex` is poisoned
pub async fn run_scenario(
    scenario: &Scenario,
    config: SyncConfig,
) -> Result<ScenarioReport, CliError> {
    log::info!(
        "Running scenario {:?}: {} steps, alert radius {} m",
        scenario.name,
        scenario.steps.len(),
        config.radius_meters
    );

    let documents = Arc::new(InMemoryDocuments::new());
    let store = Arc::new(ReportStore::new(
        Arc::clone(&documents) as Arc<dyn ReportDocuments>
    ));
    let recorder = Arc::new(AlertRecorder::new());
    let session = SyncController::start(
        Arc::clone(&store),
        config,
        SessionId::generate(),
        Arc::clone(&recorder) as Arc<dyn AlertSink>,
    );

    let mut handles: HashMap<String, ReportId> = HashMap::new();
    let mut last_location: Option<GeoPoint> = None;
    for step in &scenario.steps {
        match step {
            Step::Create {
                handle,
                latitude,
                longitude,
                description,
                reporter,
                attachments,
            } => {
                let report = store.create(NewReport {
                    location: GeoPoint::new(*latitude, *longitude),
                    description: description.clone(),
                    attachments: attachments.iter().cloned().map(MediaRef::from).collect(),
                    created_by: reporter.clone(),
                })?;
                log::info!("Filed report {handle:?} as {}", report.id);
                handles.insert(handle.clone(), report.id);
            }
            Step::Verify {
                handle,
                agent,
                comment,
            } => {
                let id = resolve_handle(&handles, handle)?;
                store.verify(id, &Actor::agent(agent.as_str()), comment.clone())?;
            }
            Step::Resolve {
                handle,
                agent,
                comment,
            } => {
                let id = resolve_handle(&handles, handle)?;
                store.resolve(id, &Actor::agent(agent.as_str()), comment.clone())?;
            }
            Step::Locate {
                latitude,
                longitude,
            } => {
                let location = GeoPoint::new(*latitude, *longitude);
                last_location = Some(location);
                session.push_location(location).await;
            }
            Step::Wait { ms } => {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
        }
    }

    tokio::time::sleep(Duration::from_millis(SETTLE_MILLIS)).await;
    session.shutdown().await;

    let reports = store.current_reports();
    let locations: Vec<GeoPoint> = reports.iter().map(|report| report.location).collect();
    let region =
        MapRegion::containing(&locations).or_else(|| last_location.map(MapRegion::around));
    Ok(ScenarioReport {
        region,
        alerts: recorder.alerts(),
        documents: documents.len(),
        reports,
    })
}

fn resolve_handle<'a>(
    handles: &'a HashMap<String, ReportId>,
    handle: &str,
) -> Result<&'a ReportId, CliError> {
    handles.get(handle).ok_or_else(|| CliError::UnknownHandle {
        handle: handle.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn demo_scenario_plays_end_to_end() {
        let scenario = Scenario::demo();
        let config = SyncConfig {
            radius_meters: scenario.radius_meters.unwrap_or(300.0),
            ..SyncConfig::default()
        };

        let outcome = run_scenario(&scenario, config).await.unwrap();

        assert_eq!(outcome.reports.len(), 2);
        assert_eq!(outcome.status_count(ReportStatus::Resolved), 1);
        assert_eq!(outcome.status_count(ReportStatus::Verified), 1);
        assert_eq!(outcome.documents, 2);
        assert!(outcome.region.is_some());

        // One alert per site: the tire pile on approach, the drum after
        // its own verification and approach.
        assert_eq!(outcome.alerts.len(), 2);
        for alert in &outcome.alerts {
            assert!(alert.distance_meters < 50.0);
        }
    }

    #[tokio::test]
    async fn empty_maps_fall_back_to_an_observer_centered_region() {
        let scenario = Scenario::from_toml(
            r#"
            name = "just-walking"

            [[steps]]
            action = "locate"
            latitude = -3.1
            longitude = -60.0
            "#,
        )
        .unwrap();

        let outcome = run_scenario(&scenario, SyncConfig::default()).await.unwrap();

        assert!(outcome.reports.is_empty());
        let region = outcome.region.unwrap();
        assert!((region.center.latitude + 3.1).abs() < f64::EPSILON);
        assert!((region.center.longitude + 60.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn scripts_with_unknown_handles_fail() {
        let scenario = Scenario::from_toml(
            r#"
            name = "bad"

            [[steps]]
            action = "verify"
            handle = "ghost"
            agent = "agent-1"
            "#,
        )
        .unwrap();

        let err = run_scenario(&scenario, SyncConfig::default())
            .await
            .unwrap_err();

        assert!(matches!(err, CliError::UnknownHandle { .. }));
    }

    #[tokio::test]
    async fn invalid_transitions_surface_as_errors() {
        let scenario = Scenario::from_toml(
            r#"
            name = "skips-verification"

            [[steps]]
            action = "create"
            handle = "a"
            latitude = 0.0
            longitude = 0.0
            description = "x"

            [[steps]]
            action = "resolve"
            handle = "a"
            agent = "agent-1"
            "#,
        )
        .unwrap();

        let err = run_scenario(&scenario, SyncConfig::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CliError::Report(ReportError::InvalidTransition { .. })
        ));
    }
}
