//! Hotel search types shared by the provider, the filter and presentation

use crate::validators::{DistanceRange, PhotoCount, PriceRange};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Provider key identifying a resolved city
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DestinationId(pub String);

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Provider key identifying a single property
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HotelId(pub String);

impl fmt::Display for HotelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A provider field that may be missing or malformed in the response
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Reported<T> {
    Value(T),
    Unavailable,
}

impl<T> Reported<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Reported::Value(v) => Some(v),
            Reported::Unavailable => None,
        }
    }
}

impl<T> From<Option<T>> for Reported<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Reported::Unavailable, Reported::Value)
    }
}

impl<T: fmt::Display> fmt::Display for Reported<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reported::Value(v) => v.fmt(f),
            Reported::Unavailable => f.write_str("unavailable"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// One hotel as returned by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelRecord {
    pub id: HotelId,
    pub name: String,
    pub address: String,
    /// Nightly price in the query currency
    pub price: Reported<f64>,
    pub distance_km: Reported<f64>,
    /// Distance exactly as the provider phrased it
    pub distance_label: String,
    pub coordinates: Option<GeoPoint>,
    pub photos: Vec<String>,
}

impl HotelRecord {
    /// Text card shown to the user for this hotel
    pub fn card(&self) -> String {
        let price = match self.price {
            Reported::Value(p) => format!("{p:.2}"),
            Reported::Unavailable => "unavailable".to_string(),
        };
        format!(
            "Hotel: {}\nAddress: {}\nDistance to center: {}\nPrice: {}",
            self.name, self.address, self.distance_label, price
        )
    }
}

/// Result ordering requested from the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    PriceAscending,
    PriceDescending,
}

/// Everything the provider needs for one property search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub destination_id: DestinationId,
    pub count: usize,
    pub sort_order: SortOrder,
    pub price_range: Option<PriceRange>,
    pub distance_range: Option<DistanceRange>,
    pub photo_count: PhotoCount,
}
