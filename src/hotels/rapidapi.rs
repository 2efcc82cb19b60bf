//! RapidAPI "hotels4" provider implementation
//!
//! Responses are navigated as loose JSON: a property with a missing or
//! malformed price, distance or coordinate is still returned, with the field
//! downgraded to `Reported::Unavailable` / `None`.

use super::types::{
    DestinationId, GeoPoint, HotelId, HotelRecord, Reported, SearchQuery, SortOrder,
};
use super::ProviderError;
use crate::runtime::HotelProvider;
use async_trait::async_trait;
use chrono::Local;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;

const KM_PER_MILE: f64 = 1.609_344;
const CITY_CENTER_LABELS: [&str; 2] = ["City center", "Центр города"];

// Constant patterns, compiled by test_label_patterns_compile
static DISTANCE_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\d+(?:[.,]\d+)?)\s*(km|км|miles?|mi)?\b").expect("valid regex")
});
static PRICE_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d,]*(?:\.\d+)?").expect("valid regex"));

/// Connection settings for the hotels4 API
#[derive(Debug, Clone)]
pub struct RapidApiConfig {
    pub api_key: String,
    pub host: String,
    pub locale: String,
    pub currency: String,
}

/// Hotel provider backed by the RapidAPI hotels4 endpoints
pub struct RapidApiProvider {
    client: Client,
    config: RapidApiConfig,
    base_url: String,
}

impl RapidApiProvider {
    pub fn new(config: RapidApiConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        let base_url = format!("https://{}", config.host);

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ProviderError> {
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .header("x-rapidapi-key", &self.config.api_key)
            .header("x-rapidapi-host", &self.config.host)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ProviderError::auth(format!("{path}: HTTP {status}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::status(format!("{path}: HTTP {status}: {body}")));
        }

        Ok(response.json::<Value>().await?)
    }

    fn sort_param(order: SortOrder) -> &'static str {
        match order {
            SortOrder::PriceAscending => "PRICE",
            SortOrder::PriceDescending => "PRICE_HIGHEST_FIRST",
        }
    }

    fn search_params(&self, query: &SearchQuery) -> Vec<(&'static str, String)> {
        let today = Local::now().date_naive();
        let tomorrow = today.succ_opt().unwrap_or(today);

        let mut params = vec![
            ("destinationId", query.destination_id.to_string()),
            ("pageNumber", "1".to_string()),
            ("pageSize", query.count.to_string()),
            ("adults1", "1".to_string()),
            ("checkIn", today.to_string()),
            ("checkOut", tomorrow.to_string()),
            ("sortOrder", Self::sort_param(query.sort_order).to_string()),
            ("locale", self.config.locale.clone()),
            ("currency", self.config.currency.clone()),
        ];
        if let Some(range) = &query.price_range {
            params.push(("priceMin", range.min().to_string()));
            params.push(("priceMax", range.max().to_string()));
        }
        params
    }
}

#[async_trait]
impl HotelProvider for RapidApiProvider {
    async fn resolve_city(&self, name: &str) -> Result<Option<DestinationId>, ProviderError> {
        let body = self
            .get_json(
                "/locations/search",
                &[("query", name.to_string()), ("locale", self.config.locale.clone())],
            )
            .await?;
        Ok(pick_destination(&body, name))
    }

    async fn search_hotels(&self, query: &SearchQuery) -> Result<Vec<HotelRecord>, ProviderError> {
        let body = self
            .get_json("/properties/list", &self.search_params(query))
            .await?;

        let results = body
            .pointer("/data/body/searchResults/results")
            .and_then(Value::as_array)
            .ok_or_else(|| ProviderError::decode("properties/list: missing searchResults"))?;

        let hotels = collect_hotels(results, query.photo_count.get(), |id, max| async move {
            self.fetch_photos(&id, max).await
        })
        .await;
        Ok(hotels)
    }

    async fn fetch_photos(
        &self,
        hotel_id: &HotelId,
        max: usize,
    ) -> Result<Vec<String>, ProviderError> {
        let body = self
            .get_json("/properties/get-hotel-photos", &[("id", hotel_id.to_string())])
            .await?;
        Ok(photo_urls(&body, max))
    }
}

// ============================================================================
// Response parsing
// ============================================================================

/// Parse every usable property and attach up to `photo_count` photos to each.
/// A failed photo lookup leaves that hotel without photos.
async fn collect_hotels<F, Fut>(
    results: &[Value],
    photo_count: usize,
    photos: F,
) -> Vec<HotelRecord>
where
    F: Fn(HotelId, usize) -> Fut,
    Fut: Future<Output = Result<Vec<String>, ProviderError>>,
{
    let mut hotels = Vec::with_capacity(results.len());
    for raw in results {
        let Some(mut hotel) = parse_property(raw) else {
            continue;
        };
        if photo_count > 0 {
            hotel.photos = match photos(hotel.id.clone(), photo_count).await {
                Ok(urls) => urls,
                Err(e) => {
                    tracing::warn!(hotel_id = %hotel.id, error = %e, "Photo lookup failed");
                    Vec::new()
                }
            };
        }
        hotels.push(hotel);
    }
    hotels
}

fn json_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Pick the destination id of the city named `name` from a locations response
fn pick_destination(body: &Value, name: &str) -> Option<DestinationId> {
    let entities: Vec<&Value> = body
        .get("suggestions")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|group| group.get("group").and_then(Value::as_str) == Some("CITY_GROUP"))
        .filter_map(|group| group.get("entities").and_then(Value::as_array))
        .flatten()
        .collect();

    let wanted = name.trim().to_lowercase();
    let exact = entities.iter().find(|entity| {
        entity
            .get("name")
            .and_then(Value::as_str)
            .is_some_and(|n| n.to_lowercase() == wanted)
    });

    exact
        .or_else(|| entities.first())
        .and_then(|entity| entity.get("destinationId"))
        .and_then(json_text)
        .map(DestinationId)
}

/// Parse one property; `None` only when the property has no id at all
fn parse_property(raw: &Value) -> Option<HotelRecord> {
    let Some(id) = raw.get("id").and_then(json_text) else {
        tracing::warn!("Skipping property without id");
        return None;
    };

    let name = raw
        .get("name")
        .and_then(Value::as_str)
        .map_or_else(|| "(unnamed)".to_string(), str::to_string);

    let address = raw
        .get("address")
        .map(|addr| {
            ["locality", "postalCode", "streetAddress"]
                .iter()
                .filter_map(|key| addr.get(key).and_then(Value::as_str))
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();

    let price = parse_price(raw);
    if price.is_none() {
        tracing::warn!(hotel_id = %id, "Price missing in provider response");
    }

    let distance_label = city_center_distance(raw);
    let distance_km = distance_label.as_deref().and_then(parse_distance_label);
    if distance_km.is_none() {
        tracing::warn!(hotel_id = %id, label = ?distance_label, "Distance to center unavailable");
    }

    let coordinates = raw.get("coordinate").and_then(|c| {
        let lat = c.get("lat").and_then(json_f64)?;
        let lon = c.get("lon").and_then(json_f64)?;
        (lat != 0.0 || lon != 0.0).then_some(GeoPoint { lat, lon })
    });
    if coordinates.is_none() {
        tracing::warn!(hotel_id = %id, "Coordinates unavailable");
    }

    Some(HotelRecord {
        id: HotelId(id),
        name,
        address,
        price: price.into(),
        distance_km: distance_km.into(),
        distance_label: distance_label.unwrap_or_else(|| "unavailable".to_string()),
        coordinates,
        photos: Vec::new(),
    })
}

fn parse_price(raw: &Value) -> Option<f64> {
    let price = raw.pointer("/ratePlan/price")?;
    if let Some(exact) = price.get("exactCurrent").and_then(json_f64) {
        return Some(exact);
    }
    let label = price.get("current").and_then(Value::as_str)?;
    PRICE_LABEL
        .find(label)
        .and_then(|m| m.as_str().replace(',', "").parse().ok())
}

fn city_center_distance(raw: &Value) -> Option<String> {
    raw.get("landmarks")
        .and_then(Value::as_array)?
        .iter()
        .find(|landmark| {
            landmark
                .get("label")
                .and_then(Value::as_str)
                .is_some_and(|label| CITY_CENTER_LABELS.contains(&label))
        })
        .and_then(|landmark| landmark.get("distance"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Kilometers from a label such as "1.2 km", "0,8 км" or "0.5 miles"
pub fn parse_distance_label(label: &str) -> Option<f64> {
    let caps = DISTANCE_LABEL.captures(label)?;
    let value: f64 = caps.get(1)?.as_str().replace(',', ".").parse().ok()?;
    let is_miles = caps
        .get(2)
        .is_some_and(|unit| unit.as_str().to_lowercase().starts_with("mi"));
    Some(if is_miles { value * KM_PER_MILE } else { value })
}

fn photo_urls(body: &Value, max: usize) -> Vec<String> {
    body.get("hotelImages")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|image| image.get("baseUrl").and_then(Value::as_str))
        .map(|url| url.replace("{size}", "y"))
        .take(max)
        .collect()
}
