//! Field validators
//!
//! Pure parsers that turn raw chat text into typed, range-checked values.
//! Rejection is an ordinary `Err` carrying the corrective message shown to the
//! user; nothing in here panics or logs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use thiserror::Error;

/// Inclusive bounds for the number of hotels shown per search
pub const PAGE_SIZE_BOUNDS: RangeInclusive<u8> = 1..=25;
/// Inclusive bounds for the number of photos shown per hotel
pub const PHOTO_COUNT_BOUNDS: RangeInclusive<u8> = 0..=25;
/// Inclusive bounds for the number of history rows replayed
pub const HISTORY_LIMIT_BOUNDS: RangeInclusive<u8> = 1..=25;

/// Why a piece of user input was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please send a whole number.")]
    NotANumber,
    #[error("The number must be between {min} and {max}.")]
    OutOfBounds { min: u8, max: u8 },
    #[error("Could not read the range. Send it as min-max, for example 50-150.")]
    Malformed,
    #[error("The lower bound must not exceed the upper bound.")]
    Inverted,
}

// ============================================================================
// Counts
// ============================================================================

/// Parse an integer that must fall within `bounds`
pub fn parse_count(text: &str, bounds: &RangeInclusive<u8>) -> Result<u8, ValidationError> {
    let value: i64 = text
        .trim()
        .parse()
        .map_err(|_| ValidationError::NotANumber)?;

    u8::try_from(value)
        .ok()
        .filter(|v| bounds.contains(v))
        .ok_or(ValidationError::OutOfBounds {
            min: *bounds.start(),
            max: *bounds.end(),
        })
}

/// Number of hotels to present, always within 1–25
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageSize(u8);

impl PageSize {
    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        parse_count(text, &PAGE_SIZE_BOUNDS).map(Self)
    }

    pub fn get(self) -> usize {
        usize::from(self.0)
    }
}

/// Number of photos per hotel, always within 0–25
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoCount(u8);

impl PhotoCount {
    pub const NONE: Self = Self(0);

    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        parse_count(text, &PHOTO_COUNT_BOUNDS).map(Self)
    }

    pub fn get(self) -> usize {
        usize::from(self.0)
    }
}

/// Number of history rows to replay
pub fn parse_history_limit(text: &str) -> Result<usize, ValidationError> {
    parse_count(text, &HISTORY_LIMIT_BOUNDS).map(usize::from)
}

// ============================================================================
// Ranges
// ============================================================================

/// Inclusive `(min, max)` pair with `min <= max`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range<T> {
    min: T,
    max: T,
}

impl<T: PartialOrd + Copy> Range<T> {
    pub fn new(min: T, max: T) -> Result<Self, ValidationError> {
        if min > max {
            return Err(ValidationError::Inverted);
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> T {
        self.min
    }

    pub fn max(&self) -> T {
        self.max
    }

    pub fn contains(&self, value: T) -> bool {
        self.min <= value && value <= self.max
    }
}

impl<T: fmt::Display> fmt::Display for Range<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// Price range in whole currency units
pub type PriceRange = Range<u32>;
/// Distance-to-center range in kilometers
pub type DistanceRange = Range<f64>;

fn split_range(text: &str) -> Result<(&str, &str), ValidationError> {
    let (min, max) = text.split_once('-').ok_or(ValidationError::Malformed)?;
    let (min, max) = (min.trim(), max.trim());
    if min.is_empty() || max.is_empty() {
        return Err(ValidationError::Malformed);
    }
    Ok((min, max))
}

/// Parse `"<min>-<max>"` with unsigned integer bounds
pub fn parse_price_range(text: &str) -> Result<PriceRange, ValidationError> {
    let (min, max) = split_range(text)?;
    let min: u32 = min.parse().map_err(|_| ValidationError::Malformed)?;
    let max: u32 = max.parse().map_err(|_| ValidationError::Malformed)?;
    Range::new(min, max)
}

/// Parse `"<min>-<max>"` kilometers; either `.` or `,` works as decimal separator
pub fn parse_distance_range(text: &str) -> Result<DistanceRange, ValidationError> {
    let (min, max) = split_range(text)?;
    Range::new(parse_km(min)?, parse_km(max)?)
}

fn parse_km(text: &str) -> Result<f64, ValidationError> {
    // `f64::from_str` also takes "inf", "NaN" and a leading '+'
    if !text.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
        return Err(ValidationError::Malformed);
    }
    text.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or(ValidationError::Malformed)
}

// ============================================================================
// Yes / no
// ============================================================================

/// Answer to a yes/no question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
}

/// Anything that is not an explicit yes counts as no.
pub fn parse_yes_no(text: &str) -> Answer {
    match text.trim().to_lowercase().as_str() {
        "yes" | "y" | "да" => Answer::Yes,
        _ => Answer::No,
    }
}
