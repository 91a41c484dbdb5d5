//! Parsing of scanned QR payloads.
//!
//! A game payload is the ASCII string `GameQrcodeFach:<category>:<uuid>`
//! where the category token is one of the three fixed point tiers and the
//! uuid is a 36-character RFC-4122 textual identifier. Parsing is a pure
//! whole-string match; anything the camera decodes that deviates from the
//! grammar is rejected.

use thiserror::Error;
use uuid::Uuid;

use crate::dao::models::ScanCategory;

/// Literal prefix every game QR code starts with.
pub const PAYLOAD_PREFIX: &str = "GameQrcodeFach";

const UUID_TEXT_LEN: usize = 36;
const HYPHEN_POSITIONS: [usize; 4] = [8, 13, 18, 23];

/// Reason a scanned string was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PayloadError {
    /// The string is not `prefix:category:uuid` shaped.
    #[error("payload does not match `{PAYLOAD_PREFIX}:<category>:<uuid>`")]
    Shape,
    /// The category token is outside the fixed set.
    #[error("unknown category token")]
    UnknownCategory,
    /// The identifier is not a canonical 36-character UUID.
    #[error("malformed QR identifier")]
    MalformedId,
}

/// Successfully parsed QR payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QrPayload {
    pub category: ScanCategory,
    pub scan_id: Uuid,
}

impl QrPayload {
    /// Parse a raw scanned string against the payload grammar.
    pub fn parse(raw: &str) -> Result<Self, PayloadError> {
        let rest = raw
            .strip_prefix(PAYLOAD_PREFIX)
            .and_then(|rest| rest.strip_prefix(':'))
            .ok_or(PayloadError::Shape)?;
        let (token, id) = rest.split_once(':').ok_or(PayloadError::Shape)?;

        let category = ScanCategory::from_token(token).ok_or(PayloadError::UnknownCategory)?;

        if !is_canonical_uuid(id) {
            return Err(PayloadError::MalformedId);
        }
        let scan_id = Uuid::parse_str(id).map_err(|_| PayloadError::MalformedId)?;

        Ok(Self { category, scan_id })
    }
}

/// Check the hyphenated RFC-4122 textual layout: hyphens at the four fixed
/// positions, hex digits (either case) everywhere else.
fn is_canonical_uuid(value: &str) -> bool {
    value.len() == UUID_TEXT_LEN
        && value.bytes().enumerate().all(|(index, byte)| {
            if HYPHEN_POSITIONS.contains(&index) {
                byte == b'-'
            } else {
                byte.is_ascii_hexdigit()
            }
        })
}
