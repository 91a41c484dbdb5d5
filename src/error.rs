use thiserror::Error;
use uuid::Uuid;
use validator::ValidationErrors;

use crate::dto::payload::PayloadError;

/// Errors that can occur in service layer operations.
///
/// Every variant is recoverable: the presentation layer reports it and the
/// player tries again. Persistence failures never show up here — they are
/// logged and swallowed, leaving the optimistic in-memory state in place.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Invalid registration input provided by the player.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Scanned string is not a game QR code.
    #[error("invalid QR payload: {0}")]
    InvalidPayload(#[from] PayloadError),
    /// The acting team already scored this QR code.
    #[error("QR code `{scan_id}` already scanned by this team")]
    DuplicateScan {
        /// Identifier of the rejected duplicate.
        scan_id: Uuid,
    },
    /// A scan arrived before any player registered on this device.
    #[error("no player registered on this device")]
    NotRegistered,
}

impl From<ValidationErrors> for ServiceError {
    fn from(err: ValidationErrors) -> Self {
        ServiceError::InvalidInput(format!("validation failed: {err}"))
    }
}
