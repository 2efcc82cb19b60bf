//! Hotel data provider
//!
//! Types describing hotel search requests and results, plus the RapidAPI
//! implementation of the `HotelProvider` port.

mod error;
mod rapidapi;
mod types;

pub use error::{ProviderError, ProviderErrorKind};
pub use rapidapi::{RapidApiConfig, RapidApiProvider};
pub use types::*;

use crate::runtime::HotelProvider;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// Logging wrapper for hotel providers
pub struct LoggingProvider {
    inner: Arc<dyn HotelProvider>,
}

impl LoggingProvider {
    pub fn new(inner: Arc<dyn HotelProvider>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl HotelProvider for LoggingProvider {
    async fn resolve_city(&self, name: &str) -> Result<Option<DestinationId>, ProviderError> {
        let start = Instant::now();
        let result = self.inner.resolve_city(name).await;
        let duration_ms = start.elapsed().as_millis();

        match &result {
            Ok(Some(id)) => {
                tracing::info!(
                    city = %name,
                    destination_id = %id,
                    duration_ms = %duration_ms,
                    "City resolved"
                );
            }
            Ok(None) => tracing::info!(city = %name, duration_ms = %duration_ms, "City not found"),
            Err(e) => tracing::error!(
                city = %name,
                duration_ms = %duration_ms,
                kind = ?e.kind,
                error = %e.message,
                "City lookup failed"
            ),
        }
        result
    }

    async fn search_hotels(&self, query: &SearchQuery) -> Result<Vec<HotelRecord>, ProviderError> {
        let start = Instant::now();
        let result = self.inner.search_hotels(query).await;
        let duration_ms = start.elapsed().as_millis();

        match &result {
            Ok(hotels) => tracing::info!(
                destination_id = %query.destination_id,
                sort_order = ?query.sort_order,
                requested = query.count,
                returned = hotels.len(),
                duration_ms = %duration_ms,
                "Hotel search completed"
            ),
            Err(e) => tracing::error!(
                destination_id = %query.destination_id,
                duration_ms = %duration_ms,
                kind = ?e.kind,
                error = %e.message,
                "Hotel search failed"
            ),
        }
        result
    }

    async fn fetch_photos(
        &self,
        hotel_id: &HotelId,
        max: usize,
    ) -> Result<Vec<String>, ProviderError> {
        let result = self.inner.fetch_photos(hotel_id, max).await;
        if let Err(e) = &result {
            tracing::warn!(hotel_id = %hotel_id, error = %e, "Photo lookup failed");
        }
        result
    }
}
