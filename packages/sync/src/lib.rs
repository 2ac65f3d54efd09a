#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Per-session live synchronization.
//!
//! A session follows one observer. [`controller::SyncController`] wires a
//! session to the report store: location updates and store change
//! notifications are merged into a single event loop that re-evaluates
//! proximity on every tick and pushes alerts through the session's sink.
//! [`engine::SessionEngine`] holds the evaluation state itself and can be
//! driven directly when no async plumbing is wanted.

pub mod config;
pub mod controller;
pub mod engine;

pub use config::{ALERT_RADIUS_ENV, DEFAULT_LOCATION_BUFFER, SyncConfig};
pub use controller::{SyncController, SyncHandle};
pub use engine::SessionEngine;
