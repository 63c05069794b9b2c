// src/error.rs
use thiserror::Error;

use crate::lead::LeadSource;
use crate::scanner::ScannerState;

/// Errors returned by the scanner controller to its callers.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("{scanner} scanner cannot start: {what}")]
    MissingConfig { scanner: LeadSource, what: String },

    #[error("settings unavailable: {0:#}")]
    Settings(#[source] anyhow::Error),

    #[error("{scanner} scanner is {state:?}; start requires Stopped")]
    InvalidTransition {
        scanner: LeadSource,
        state: ScannerState,
    },

    #[error("no adapter registered for {0}")]
    UnknownSource(LeadSource),
}

impl ControlError {
    pub fn missing(scanner: LeadSource, what: impl Into<String>) -> Self {
        ControlError::MissingConfig {
            scanner,
            what: what.into(),
        }
    }
}

/// Errors from a [`crate::store::LeadStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("lead {0} already exists")]
    Duplicate(String),

    #[error("lead {0} not found")]
    NotFound(String),

    #[error("lead {0} already has a pitch")]
    PitchAlreadySet(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// True for failures that mean the backend itself is down.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}
