//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::db::{Database, DbError, HistoryRow, SearchLogEntry};
use crate::hotels::{DestinationId, HotelId, HotelRecord, ProviderError, SearchQuery};
use crate::messenger::{MessengerError, Reply};
use crate::state_machine::UserId;
use async_trait::async_trait;
use std::sync::Arc;

/// Source of hotel data
#[async_trait]
pub trait HotelProvider: Send + Sync {
    /// Resolve a free-text city name; `None` when nothing matches
    async fn resolve_city(&self, name: &str) -> Result<Option<DestinationId>, ProviderError>;

    /// Search hotels in the query's destination, in provider order
    async fn search_hotels(&self, query: &SearchQuery) -> Result<Vec<HotelRecord>, ProviderError>;

    /// Up to `max` photo URLs for one hotel
    async fn fetch_photos(
        &self,
        hotel_id: &HotelId,
        max: usize,
    ) -> Result<Vec<String>, ProviderError>;
}

/// Append-only log of completed searches
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, entry: &SearchLogEntry) -> Result<(), DbError>;

    /// Newest first; `limit` counts hotel rows
    async fn recent_entries(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<HistoryRow>, DbError>;

    /// Distinct cities, most recently searched first
    async fn recent_cities(&self, user_id: UserId, limit: usize) -> Result<Vec<String>, DbError>;
}

/// Outbound chat delivery
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn deliver(&self, user_id: UserId, reply: &Reply) -> Result<(), MessengerError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: HotelProvider + ?Sized> HotelProvider for Arc<T> {
    async fn resolve_city(&self, name: &str) -> Result<Option<DestinationId>, ProviderError> {
        (**self).resolve_city(name).await
    }

    async fn search_hotels(&self, query: &SearchQuery) -> Result<Vec<HotelRecord>, ProviderError> {
        (**self).search_hotels(query).await
    }

    async fn fetch_photos(
        &self,
        hotel_id: &HotelId,
        max: usize,
    ) -> Result<Vec<String>, ProviderError> {
        (**self).fetch_photos(hotel_id, max).await
    }
}

#[async_trait]
impl<T: HistoryStore + ?Sized> HistoryStore for Arc<T> {
    async fn append(&self, entry: &SearchLogEntry) -> Result<(), DbError> {
        (**self).append(entry).await
    }

    async fn recent_entries(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<HistoryRow>, DbError> {
        (**self).recent_entries(user_id, limit).await
    }

    async fn recent_cities(&self, user_id: UserId, limit: usize) -> Result<Vec<String>, DbError> {
        (**self).recent_cities(user_id, limit).await
    }
}

#[async_trait]
impl<T: Messenger + ?Sized> Messenger for Arc<T> {
    async fn deliver(&self, user_id: UserId, reply: &Reply) -> Result<(), MessengerError> {
        (**self).deliver(user_id, reply).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

#[async_trait]
impl HistoryStore for Database {
    async fn append(&self, entry: &SearchLogEntry) -> Result<(), DbError> {
        self.append_search(entry)
    }

    async fn recent_entries(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<HistoryRow>, DbError> {
        Database::recent_entries(self, user_id, limit)
    }

    async fn recent_cities(&self, user_id: UserId, limit: usize) -> Result<Vec<String>, DbError> {
        Database::recent_cities(self, user_id, limit)
    }
}
