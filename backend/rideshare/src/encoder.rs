//! Ride form values → positional contract arguments.
//!
//! The carpooling module only accepts byte vectors for text, so locations are
//! sent as raw UTF-8.  Departure time becomes whole seconds since the Unix
//! epoch (floor, never rounded).  Integer fields are parsed strictly; a value
//! the contract would have to guess about is rejected here instead.

use std::fmt;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize, Serializer};

use crate::errors::{EncodingError, EncodingErrorKind, Field};

/// `datetime-local` form values, with and without seconds.
const LOCAL_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Ride details as entered by the user, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RideDraft {
    pub from_location: String,
    pub to_location: String,
    /// `YYYY-MM-DDTHH:MM[:SS[.fff]]` in local time, or RFC 3339 with offset.
    pub departure_time: String,
    pub available_seats: String,
    /// Smallest currency unit.
    pub price_per_seat: String,
}

/// An encoded entry-function argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryArg {
    /// `vector<u8>`
    Bytes(Vec<u8>),
    U64(u64),
}

impl Serialize for EntryArg {
    /// Ledger JSON convention: hex strings for byte vectors, decimal strings
    /// for 64-bit integers.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bytes(bytes) => serializer.serialize_str(&format!("0x{}", hex::encode(bytes))),
            Self::U64(n) => serializer.serialize_str(&n.to_string()),
        }
    }
}

/// Identifies an existing ride for booking or completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RideReference(pub u64);

impl RideReference {
    pub fn parse(raw: &str) -> Result<Self, EncodingError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(EncodingError::new(Field::RideId, EncodingErrorKind::Empty));
        }
        raw.parse().map(Self).map_err(|_| {
            EncodingError::new(Field::RideId, EncodingErrorKind::NotANumber(raw.to_string()))
        })
    }

    pub fn to_args(self) -> Vec<EntryArg> {
        vec![EntryArg::U64(self.0)]
    }
}

impl fmt::Display for RideReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Encode a draft for `create_ride`, reading departure time in the local zone.
pub fn encode_create_ride(draft: &RideDraft) -> Result<Vec<EntryArg>, EncodingError> {
    encode_create_ride_in(draft, &Local)
}

/// Encode a draft for `create_ride`, reading zone-less departure times in `tz`.
///
/// Arguments: `from`, `to`, `departure_secs`, `available_seats`, `price_per_seat`.
pub fn encode_create_ride_in<Tz: TimeZone>(
    draft: &RideDraft,
    tz: &Tz,
) -> Result<Vec<EntryArg>, EncodingError> {
    let from = location_bytes(Field::FromLocation, &draft.from_location)?;
    let to = location_bytes(Field::ToLocation, &draft.to_location)?;
    let departure = departure_epoch_seconds(&draft.departure_time, tz)?;
    let seats = parse_integer(Field::AvailableSeats, &draft.available_seats, 1)?;
    let price = parse_integer(Field::PricePerSeat, &draft.price_per_seat, 0)?;

    Ok(vec![
        EntryArg::Bytes(from),
        EntryArg::Bytes(to),
        // Positive by construction, see `departure_epoch_seconds`.
        EntryArg::U64(departure as u64),
        EntryArg::U64(seats),
        EntryArg::U64(price),
    ])
}

fn location_bytes(field: Field, raw: &str) -> Result<Vec<u8>, EncodingError> {
    if raw.trim().is_empty() {
        return Err(EncodingError::new(field, EncodingErrorKind::Empty));
    }
    Ok(raw.as_bytes().to_vec())
}

/// Convert a departure time to whole seconds since the Unix epoch.
pub fn departure_epoch_seconds<Tz: TimeZone>(raw: &str, tz: &Tz) -> Result<i64, EncodingError> {
    let field = Field::DepartureTime;
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(EncodingError::new(field, EncodingErrorKind::Empty));
    }
    let invalid = || EncodingError::new(field, EncodingErrorKind::InvalidTime(raw.to_string()));

    let secs = match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt.timestamp(),
        Err(_) => {
            let naive = LOCAL_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .ok_or_else(invalid)?;
            // A wall-clock time skipped by a DST change has no instant.
            tz.from_local_datetime(&naive)
                .earliest()
                .ok_or_else(invalid)?
                .timestamp()
        }
    };

    if secs <= 0 {
        return Err(EncodingError::new(field, EncodingErrorKind::NonPositiveTime(secs)));
    }
    Ok(secs)
}

fn parse_integer(field: Field, raw: &str, min: u64) -> Result<u64, EncodingError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(EncodingError::new(field, EncodingErrorKind::Empty));
    }
    match raw.parse::<u64>() {
        Ok(n) if n >= min => Ok(n),
        Ok(n) => Err(EncodingError::new(field, EncodingErrorKind::OutOfRange(n as i64))),
        Err(_) => match raw.parse::<i64>() {
            Ok(negative) => Err(EncodingError::new(
                field,
                EncodingErrorKind::OutOfRange(negative),
            )),
            Err(_) => Err(EncodingError::new(
                field,
                EncodingErrorKind::NotANumber(raw.to_string()),
            )),
        },
    }
}
