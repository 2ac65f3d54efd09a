//! Alert delivery for the simulator.

use std::sync::Mutex;

use foco_map_alert::{AlertSink, ProximityAlert};

/// Sink that logs each alert as a JSON line and keeps it for the
/// end-of-run summary.
#[derive(Default)]
pub struct AlertRecorder {
    alerts: Mutex<Vec<ProximityAlert>>,
}

impl AlertRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the alerts recorded so far, in delivery order.
    ///
    /// # Panics
    ///
    /// * If the recorder `Mutex` is poisoned
    #[must_use]
    pub fn alerts(&self) -> Vec<ProximityAlert> {
        self.alerts
            .lock()
            .expect("alert recorder mutex poisoned")
            .clone()
    }
}

impl AlertSink for AlertRecorder {
    fn notify(&self, alert: &ProximityAlert) {
        match serde_json::to_string(alert) {
            Ok(line) => log::info!("ALERT {line}"),
            Err(e) => log::warn!(
                "Failed to render alert for report {}: {e:?}",
                alert.report_id
            ),
        }
        self.alerts
            .lock()
            .expect("alert recorder mutex poisoned")
            .push(alert.clone());
    }
}

#[cfg(test)]
mod tests {
    use foco_map_alert::SessionId;
    use foco_map_report_models::ReportId;

    use super::*;

    #[test]
    fn keeps_alerts_in_delivery_order() {
        let recorder = AlertRecorder::new();
        for id in ["r-1", "r-2"] {
            recorder.notify(&ProximityAlert {
                session_id: SessionId::from("s-1"),
                report_id: ReportId::from(id),
                distance_meters: 12.0,
            });
        }

        let alerts = recorder.alerts();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].report_id.as_str(), "r-1");
        assert_eq!(alerts[1].report_id.as_str(), "r-2");
    }
}
