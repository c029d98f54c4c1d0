//! Error kinds surfaced by dashboard operations.
//!
//! Most functions return `anyhow::Result`; these variants are attached at
//! the point of failure so that callers (the HTTP server in particular) can
//! `downcast_ref` and map them to a status code.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: Uuid },

    #[error("invalid move: {0}")]
    InvalidMove(String),

    #[error("invalid import document: {0}")]
    Import(String),

    #[error("backend returned {status}: {message}")]
    Backend { status: u16, message: String },
}

impl DashboardError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn not_found(kind: &'static str, id: Uuid) -> Self {
        Self::NotFound { kind, id }
    }

    /// True for errors caused by the caller's input rather than the backend.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl(_) | Self::Validation { .. } | Self::InvalidMove(_) | Self::Import(_)
        )
    }
}
