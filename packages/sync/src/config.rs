//! Session configuration.

use foco_map_alert::DEFAULT_ALERT_RADIUS_METERS;

/// Environment variable overriding the alert radius, in meters.
pub const ALERT_RADIUS_ENV: &str = "FOCOMAP_ALERT_RADIUS_M";

/// Location updates buffered while an evaluation pass is running.
///
/// Position providers tick at arbitrary rates; 32 covers several seconds
/// of high-frequency GPS fixes without growing unbounded.
pub const DEFAULT_LOCATION_BUFFER: usize = 32;

/// Tunable parameters for a sync session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncConfig {
    /// Alert radius in meters.
    pub radius_meters: f64,
    /// Capacity of the observer-location channel.
    pub location_buffer: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            radius_meters: DEFAULT_ALERT_RADIUS_METERS,
            location_buffer: DEFAULT_LOCATION_BUFFER,
        }
    }
}

impl SyncConfig {
    /// Builds a config from the environment, falling back to defaults.
    ///
    /// `FOCOMAP_ALERT_RADIUS_M` must parse as a finite positive number of
    /// meters; anything else is logged and ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_radius_value(std::env::var(ALERT_RADIUS_ENV).ok().as_deref())
    }

    fn from_radius_value(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };
        match raw.trim().parse::<f64>() {
            Ok(radius) if radius.is_finite() && radius > 0.0 => Self {
                radius_meters: radius,
                ..Self::default()
            },
            _ => {
                log::warn!(
                    "Ignoring invalid {ALERT_RADIUS_ENV} value {raw:?}, using {DEFAULT_ALERT_RADIUS_METERS} m"
                );
                Self::default()
            }
        }
    }
}
