//! Scripted scenario files.
//!
//! A scenario is a TOML document describing a sequence of report
//! mutations and observer movements to play against a live session. The
//! demo scenario is baked into the binary via [`include_str!`].

use std::path::Path;

use serde::Deserialize;

use crate::CliError;

/// Demo scenario embedded at compile time.
pub const DEMO_SCENARIO: &str = include_str!("../scenarios/demo.toml");

/// A scripted sequence of report and observer events.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Scenario {
    /// Display name for logs and the summary.
    pub name: String,
    /// Alert radius override in meters, if the scenario needs one.
    #[serde(default)]
    pub radius_meters: Option<f64>,
    /// Steps played in order.
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// One scripted event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// File a new report and remember it under `handle`.
    Create {
        handle: String,
        latitude: f64,
        longitude: f64,
        description: String,
        #[serde(default = "default_reporter")]
        reporter: String,
        #[serde(default)]
        attachments: Vec<String>,
    },
    /// Verify the report previously created under `handle`.
    Verify {
        handle: String,
        agent: String,
        #[serde(default)]
        comment: Option<String>,
    },
    /// Resolve the report previously created under `handle`.
    Resolve {
        handle: String,
        agent: String,
        #[serde(default)]
        comment: Option<String>,
    },
    /// Move the observer to a new position.
    Locate { latitude: f64, longitude: f64 },
    /// Pause the script for the given number of milliseconds.
    Wait { ms: u64 },
}

fn default_reporter() -> String {
    "observer".to_string()
}

impl Scenario {
    /// Parses a scenario from TOML text.
    ///
    /// # Errors
    ///
    /// * If the text is not a valid scenario document
    pub fn from_toml(input: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(input)
    }

    /// Loads a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// * If the file cannot be read
    /// * If its contents are not a valid scenario document
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(Self::from_toml(&contents)?)
    }

    /// Returns the embedded demo scenario.
    ///
    /// # Panics
    ///
    /// * If the embedded TOML fails to parse
    #[must_use]
    pub fn demo() -> Self {
        Self::from_toml(DEMO_SCENARIO)
            .unwrap_or_else(|e| panic!("Failed to parse embedded demo scenario: {e}"))
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create {
                handle,
                latitude,
                longitude,
                ..
            } => write!(f, "file report {handle:?} at ({latitude}, {longitude})"),
            Self::Verify { handle, agent, .. } => write!(f, "verify {handle:?} as {agent}"),
            Self::Resolve { handle, agent, .. } => write!(f, "resolve {handle:?} as {agent}"),
            Self::Locate {
                latitude,
                longitude,
            } => write!(f, "observer moves to ({latitude}, {longitude})"),
            Self::Wait { ms } => write!(f, "wait {ms} ms"),
        }
    }
}
