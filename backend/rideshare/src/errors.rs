//! Error types for every stage of a ride action.
//!
//! Each collaborator gets its own enum so callers can tell an input mistake
//! apart from a wallet refusal or an on-chain rejection.  The mapping from
//! these errors onto a user-facing failure lives in
//! [`crate::transaction::FailureReason`].

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// The ride form field an [`EncodingError`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    FromLocation,
    ToLocation,
    DepartureTime,
    AvailableSeats,
    PricePerSeat,
    RideId,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FromLocation => "from_location",
            Self::ToLocation => "to_location",
            Self::DepartureTime => "departure_time",
            Self::AvailableSeats => "available_seats",
            Self::PricePerSeat => "price_per_seat",
            Self::RideId => "ride_id",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodingErrorKind {
    /// Missing or whitespace-only input.
    Empty,
    /// Input is not an integer.
    NotANumber(String),
    /// Integer outside the accepted range for the field.
    OutOfRange(i64),
    /// Input is not a recognisable date/time.
    InvalidTime(String),
    /// Date/time resolves to zero or a negative epoch second.
    NonPositiveTime(i64),
}

/// A ride form value that cannot be turned into a contract argument.
///
/// Raised before any wallet or network interaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {}", describe(.kind))]
pub struct EncodingError {
    pub field: Field,
    pub kind: EncodingErrorKind,
}

impl EncodingError {
    pub fn new(field: Field, kind: EncodingErrorKind) -> Self {
        Self { field, kind }
    }
}

fn describe(kind: &EncodingErrorKind) -> String {
    match kind {
        EncodingErrorKind::Empty => "value is required".to_string(),
        EncodingErrorKind::NotANumber(raw) => format!("{raw:?} is not a valid integer"),
        EncodingErrorKind::OutOfRange(v) => format!("{v} is out of range"),
        EncodingErrorKind::InvalidTime(raw) => format!("{raw:?} is not a valid date/time"),
        EncodingErrorKind::NonPositiveTime(secs) => {
            format!("resolves to {secs}s since the Unix epoch, must be positive")
        }
    }
}

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("no wallet account is connected")]
    NotConnected,

    #[error("wallet rejected the request: {0}")]
    Rejected(String),

    #[error("wallet HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("wallet JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum LedgerError {
    /// The transaction was committed but the contract aborted it.
    #[error("{0}")]
    Aborted(String),

    #[error("node returned {status}: {message}")]
    Node { status: u16, message: String },

    #[error("node HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("node JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
#[error("Configuration error: {0}")]
pub struct ConfigError(pub String);

pub type Result<T, E = ConfigError> = std::result::Result<T, E>;
