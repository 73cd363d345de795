//! Claims domain errors

use thiserror::Error;

use core_kernel::{MoneyError, PortError};

/// Errors that can occur in the claims domain
#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("Claim not found: {0}")]
    ClaimNotFound(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Claim is still {status}")]
    StageInProgress { status: String },

    #[error("A claim needs at least one document")]
    NoDocuments,

    #[error("Unknown document type: {0}")]
    UnknownDocumentType(String),

    #[error("Invalid field pattern for {field}: {message}")]
    InvalidFieldPattern { field: String, message: String },

    #[error("Amount error: {0}")]
    Amount(#[from] MoneyError),

    #[error("Storage error: {0}")]
    Storage(#[from] PortError),
}

impl ClaimError {
    /// Returns true if the error means the claim does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            ClaimError::ClaimNotFound(_) => true,
            ClaimError::Storage(port) => port.is_not_found(),
            _ => false,
        }
    }

    /// Returns true if the claim is busy or was changed by another writer
    pub fn is_conflict(&self) -> bool {
        match self {
            ClaimError::StageInProgress { .. } => true,
            ClaimError::Storage(port) => port.is_conflict(),
            _ => false,
        }
    }
}
