#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Breeding-site report entity and workflow types.
//!
//! This crate defines the canonical report document shape shared across the
//! focomap engine: the [`Report`] entity, its [`ReportStatus`] triage
//! workflow, and the [`Actor`]/[`ActorRole`] pair used to gate status
//! transitions. Field names serialize camelCase to match the document
//! collection the mobile clients subscribe to.

use chrono::{DateTime, Utc};
use foco_map_geo::GeoPoint;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Opaque stable identifier of a report, assigned by the store on creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(String);

impl ReportId {
    /// Generates a fresh random identifier.
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

impl std::fmt::Display for ReportId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ReportId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ReportId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Opaque reference to an uploaded media object (photo of the site).
///
/// The engine never dereferences these; storage and rendering are external.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaRef(String);

impl MediaRef {
    /// Returns the reference as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MediaRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for MediaRef {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// ---------------------------------------------------------------------------
// Actors
// ---------------------------------------------------------------------------

/// Role capability attached to an acting identity.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorRole {
    /// A field user who files reports.
    User,
    /// A verifying agent who triages reports.
    Agent,
}

impl ActorRole {
    /// Returns whether this role may apply status transitions.
    #[must_use]
    pub const fn is_agent(self) -> bool {
        matches!(self, Self::Agent)
    }
}

/// An acting identity as told to the engine by the external auth surface.
///
/// The engine performs no authentication; it only checks the role
/// capability it is handed per operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    /// Identifier of the acting user or agent.
    pub id: String,
    /// Role capability held by the actor.
    pub role: ActorRole,
}

impl Actor {
    /// Creates an actor with the given identifier and role.
    #[must_use]
    pub fn new(id: impl Into<String>, role: ActorRole) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    /// Convenience constructor for a field user.
    #[must_use]
    pub fn user(id: impl Into<String>) -> Self {
        Self::new(id, ActorRole::User)
    }

    /// Convenience constructor for a verifying agent.
    #[must_use]
    pub fn agent(id: impl Into<String>) -> Self {
        Self::new(id, ActorRole::Agent)
    }
}

// ---------------------------------------------------------------------------
// Status workflow
// ---------------------------------------------------------------------------

/// Triage status of a report.
///
/// The only legal transitions are `Pending -> Verified -> Resolved`, both
/// applied by agents. `Resolved` is terminal.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    /// Filed by a user, not yet confirmed by an agent.
    Pending,
    /// An agent has confirmed the site as an active hazard.
    Verified,
    /// An agent has closed the report. Terminal.
    Resolved,
}

impl ReportStatus {
    /// Returns whether no further transition is defined out of this status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved)
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Pending, Self::Verified, Self::Resolved]
    }
}

/// An agent operation requested against a report.
///
/// Used in transition errors and log lines; displays as the lowercase verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum TransitionAction {
    /// `Pending -> Verified`.
    Verify,
    /// `Verified -> Resolved`.
    Resolve,
}

impl TransitionAction {
    /// Returns the status a report must currently hold for this action.
    #[must_use]
    pub const fn required_status(self) -> ReportStatus {
        match self {
            Self::Verify => ReportStatus::Pending,
            Self::Resolve => ReportStatus::Verified,
        }
    }

    /// Returns the status this action transitions a report into.
    #[must_use]
    pub const fn target_status(self) -> ReportStatus {
        match self {
            Self::Verify => ReportStatus::Verified,
            Self::Resolve => ReportStatus::Resolved,
        }
    }
}

// ---------------------------------------------------------------------------
// Report entity
// ---------------------------------------------------------------------------

/// A user-submitted record of a suspected breeding site.
///
/// `location`, `description`, and `attachments` are immutable after
/// creation; only the status fields change, and only through the store's
/// transition operations. The `verified_*` fields are set together on
/// verification and the `resolved_*` fields together on resolution, with
/// `created_at <= verified_at <= resolved_at` whenever present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Store-assigned identifier.
    pub id: ReportId,
    /// Where the site was reported.
    pub location: GeoPoint,
    /// Free-text description from the reporting user.
    pub description: String,
    /// Ordered media references attached at creation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<MediaRef>,
    /// Current triage status.
    pub status: ReportStatus,
    /// Identifier of the reporting user.
    pub created_by: String,
    /// Agent who verified the report, if verified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_by: Option<String>,
    /// Agent who resolved the report, if resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
    /// Agent commentary recorded at verification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_comment: Option<String>,
    /// Agent commentary recorded at resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolve_comment: Option<String>,
    /// When the report was filed.
    pub created_at: DateTime<Utc>,
    /// When the report was verified, if verified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    /// When the report was resolved, if resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Parameters for creating a new report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReport {
    /// Where the site is.
    pub location: GeoPoint,
    /// Free-text description; must not be blank.
    pub description: String,
    /// Ordered media references.
    #[serde(default)]
    pub attachments: Vec<MediaRef>,
    /// Identifier of the reporting user.
    pub created_by: String,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use super::*;

    #[test]
    fn only_resolved_is_terminal() {
        assert!(!ReportStatus::Pending.is_terminal());
        assert!(!ReportStatus::Verified.is_terminal());
        assert!(ReportStatus::Resolved.is_terminal());
    }

    #[test]
    fn status_display_roundtrips_through_from_str() {
        for status in ReportStatus::all() {
            let text = status.to_string();
            assert_eq!(ReportStatus::from_str(&text).unwrap(), *status);
        }
        assert_eq!(ReportStatus::Pending.to_string(), "PENDING");
        assert_eq!(ReportStatus::Verified.to_string(), "VERIFIED");
        assert_eq!(ReportStatus::Resolved.to_string(), "RESOLVED");
    }

    #[test]
    fn only_agents_hold_the_agent_capability() {
        assert!(ActorRole::Agent.is_agent());
        assert!(!ActorRole::User.is_agent());
        assert!(Actor::agent("a1").role.is_agent());
        assert!(!Actor::user("u1").role.is_agent());
    }

    #[test]
    fn generated_report_ids_are_unique() {
        let a = ReportId::generate();
        let b = ReportId::generate();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }

    #[test]
    fn transition_actions_map_the_status_machine() {
        assert_eq!(
            TransitionAction::Verify.required_status(),
            ReportStatus::Pending
        );
        assert_eq!(
            TransitionAction::Verify.target_status(),
            ReportStatus::Verified
        );
        assert_eq!(
            TransitionAction::Resolve.required_status(),
            ReportStatus::Verified
        );
        assert_eq!(
            TransitionAction::Resolve.target_status(),
            ReportStatus::Resolved
        );
        assert_eq!(TransitionAction::Verify.to_string(), "verify");
        assert_eq!(TransitionAction::Resolve.to_string(), "resolve");
    }
}
