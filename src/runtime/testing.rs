//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use crate::db::{DbError, HistoryRow, SearchLogEntry};
use crate::hotels::{DestinationId, HotelId, HotelRecord, ProviderError, SearchQuery};
use crate::messenger::{MessengerError, Reply};
use crate::state_machine::UserId;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

// ============================================================================
// Mock Hotel Provider
// ============================================================================

/// Mock provider that returns queued responses
#[allow(dead_code)]
pub struct MockHotelProvider {
    cities: Mutex<VecDeque<Result<Option<DestinationId>, ProviderError>>>,
    searches: Mutex<VecDeque<Result<Vec<HotelRecord>, ProviderError>>>,
    /// Record of all city lookups made
    pub city_lookups: Mutex<Vec<String>>,
    /// Record of all searches made
    pub queries: Mutex<Vec<SearchQuery>>,
}

#[allow(dead_code)]
impl MockHotelProvider {
    pub fn new() -> Self {
        Self {
            cities: Mutex::new(VecDeque::new()),
            searches: Mutex::new(VecDeque::new()),
            city_lookups: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful city lookup
    pub fn queue_city(&self, id: &str) {
        self.cities
            .lock()
            .unwrap()
            .push_back(Ok(Some(DestinationId(id.to_string()))));
    }

    /// Queue a lookup that finds nothing
    pub fn queue_city_not_found(&self) {
        self.cities.lock().unwrap().push_back(Ok(None));
    }

    /// Queue a successful search
    pub fn queue_hotels(&self, hotels: Vec<HotelRecord>) {
        self.searches.lock().unwrap().push_back(Ok(hotels));
    }

    /// Queue a failed search
    pub fn queue_search_error(&self, error: ProviderError) {
        self.searches.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded search queries
    pub fn recorded_queries(&self) -> Vec<SearchQuery> {
        self.queries.lock().unwrap().clone()
    }
}

impl Default for MockHotelProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HotelProvider for MockHotelProvider {
    async fn resolve_city(&self, name: &str) -> Result<Option<DestinationId>, ProviderError> {
        self.city_lookups.lock().unwrap().push(name.to_string());
        self.cities.lock().unwrap().pop_front().unwrap_or(Ok(None))
    }

    async fn search_hotels(&self, query: &SearchQuery) -> Result<Vec<HotelRecord>, ProviderError> {
        self.queries.lock().unwrap().push(query.clone());
        self.searches
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::network("No mock response queued")))
    }

    async fn fetch_photos(
        &self,
        _hotel_id: &HotelId,
        _max: usize,
    ) -> Result<Vec<String>, ProviderError> {
        Ok(vec![])
    }
}

// ============================================================================
// Mock History Store
// ============================================================================

/// In-memory history log with a switch to fail writes
#[allow(dead_code)]
pub struct MockHistoryStore {
    entries: Mutex<Vec<SearchLogEntry>>,
    fail_writes: AtomicBool,
}

#[allow(dead_code)]
impl MockHistoryStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn insert(&self, entry: SearchLogEntry) {
        self.entries.lock().unwrap().push(entry);
    }

    pub fn recorded_entries(&self) -> Vec<SearchLogEntry> {
        self.entries.lock().unwrap().clone()
    }

    fn newest_first(&self, user_id: UserId) -> Vec<SearchLogEntry> {
        let mut entries: Vec<_> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries
    }
}

impl Default for MockHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for MockHistoryStore {
    async fn append(&self, entry: &SearchLogEntry) -> Result<(), DbError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DbError::Sqlite(rusqlite::Error::InvalidQuery));
        }
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn recent_entries(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<HistoryRow>, DbError> {
        let rows = self
            .newest_first(user_id)
            .into_iter()
            .flat_map(|entry| {
                let scenario = entry.scenario.command().to_string();
                let created_at = entry.created_at;
                if entry.hotel_names.is_empty() {
                    return vec![HistoryRow {
                        scenario,
                        created_at,
                        hotel_name: None,
                    }];
                }
                entry
                    .hotel_names
                    .into_iter()
                    .map(|name| HistoryRow {
                        scenario: scenario.clone(),
                        created_at,
                        hotel_name: Some(name),
                    })
                    .collect()
            })
            .take(limit)
            .collect();
        Ok(rows)
    }

    async fn recent_cities(&self, user_id: UserId, limit: usize) -> Result<Vec<String>, DbError> {
        let mut cities: Vec<String> = Vec::new();
        for entry in self.newest_first(user_id) {
            if !cities.contains(&entry.city_name) {
                cities.push(entry.city_name);
            }
        }
        cities.truncate(limit);
        Ok(cities)
    }
}

// ============================================================================
// Recording Messenger
// ============================================================================

/// Messenger that records every delivered reply
#[allow(dead_code)]
pub struct RecordingMessenger {
    pub replies: Mutex<Vec<(UserId, Reply)>>,
    fail: AtomicBool,
}

#[allow(dead_code)]
impl RecordingMessenger {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    /// Record replies but report every delivery as failed
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn replies_for(&self, user_id: UserId) -> Vec<Reply> {
        self.replies
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == user_id)
            .map(|(_, r)| r.clone())
            .collect()
    }

    pub fn last_for(&self, user_id: UserId) -> Option<Reply> {
        self.replies_for(user_id).pop()
    }
}

impl Default for RecordingMessenger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn deliver(&self, user_id: UserId, reply: &Reply) -> Result<(), MessengerError> {
        self.replies.lock().unwrap().push((user_id, reply.clone()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(MessengerError::Api {
                description: "Forbidden: bot was blocked by the user".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotels::{Reported, SortOrder};
    use crate::runtime::{DialogEngine, Dispatcher};
    use crate::state_machine::Scenario;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use std::sync::Arc;
    use std::time::Duration;

    const USER: UserId = UserId(1001);

    type TestEngine =
        DialogEngine<Arc<MockHotelProvider>, Arc<MockHistoryStore>, Arc<RecordingMessenger>>;

    struct Harness {
        provider: Arc<MockHotelProvider>,
        history: Arc<MockHistoryStore>,
        messenger: Arc<RecordingMessenger>,
        engine: Arc<TestEngine>,
    }

    impl Harness {
        fn new() -> Self {
            let provider = Arc::new(MockHotelProvider::new());
            let history = Arc::new(MockHistoryStore::new());
            let messenger = Arc::new(RecordingMessenger::new());
            let engine = Arc::new(DialogEngine::new(
                Arc::clone(&provider),
                Arc::clone(&history),
                Arc::clone(&messenger),
            ));
            Self {
                provider,
                history,
                messenger,
                engine,
            }
        }

        async fn say(&self, texts: &[&str]) {
            for text in texts {
                self.engine.handle_text(USER, (*text).to_string()).await;
            }
        }

        fn pages(&self) -> Vec<HotelRecord> {
            self.messenger
                .replies_for(USER)
                .into_iter()
                .filter_map(|r| match r {
                    Reply::ResultPage(h) => Some(h),
                    _ => None,
                })
                .collect()
        }

        fn errors(&self) -> Vec<String> {
            self.messenger
                .replies_for(USER)
                .into_iter()
                .filter_map(|r| match r {
                    Reply::Error(text) => Some(text),
                    _ => None,
                })
                .collect()
        }
    }

    fn hotel(name: &str, km: Option<f64>) -> HotelRecord {
        HotelRecord {
            id: HotelId(name.to_string()),
            name: name.to_string(),
            address: "1 Main St".to_string(),
            price: Reported::Value(99.0),
            distance_km: km.into(),
            distance_label: km.map_or_else(|| "unavailable".to_string(), |k| format!("{k} km")),
            coordinates: None,
            photos: vec![],
        }
    }

    fn numbered(count: usize) -> Vec<HotelRecord> {
        (0..count).map(|i| hotel(&format!("Hotel {i}"), Some(1.0))).collect()
    }

    // ============================================================================
    // Scenario flows
    // ============================================================================

    #[tokio::test]
    async fn test_cheapest_paris_end_to_end() {
        let h = Harness::new();
        h.provider.queue_city("504261");
        h.provider.queue_hotels(numbered(15));

        h.say(&["/lowprice", "Paris", "10", "no"]).await;

        let queries = h.provider.recorded_queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].destination_id, DestinationId("504261".into()));
        assert_eq!(queries[0].count, 10);
        assert_eq!(queries[0].photo_count.get(), 0);
        assert_eq!(queries[0].sort_order, SortOrder::PriceAscending);

        assert_eq!(h.pages().len(), 10);
        assert!(matches!(
            h.messenger.last_for(USER),
            Some(Reply::Summary(text)) if text.contains("Hotels found: 10")
        ));

        let logged = h.history.recorded_entries();
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].city_name, "Paris");
        assert_eq!(logged[0].scenario, Scenario::Cheapest);
        assert_eq!(logged[0].hotel_names.len(), 10);
        assert_eq!(logged[0].hotel_names[0], "Hotel 0");

        assert!(h.engine.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_highprice_asks_photo_count() {
        let h = Harness::new();
        h.provider.queue_city("1");
        h.provider.queue_hotels(numbered(3));

        h.say(&["/highprice", "London", "5", "yes", "3"]).await;

        let query = &h.provider.recorded_queries()[0];
        assert_eq!(query.sort_order, SortOrder::PriceDescending);
        assert_eq!(query.photo_count.get(), 3);
        assert_eq!(h.pages().len(), 3);
    }

    #[tokio::test]
    async fn test_bestdeal_ranges_and_distance_filter() {
        let h = Harness::new();
        h.provider.queue_city("2");
        h.provider.queue_hotels(vec![
            hotel("Center", Some(0.0)),
            hotel("Far", Some(3.5)),
            hotel("Unknown", None),
            hotel("Edge", Some(3.0)),
            hotel("Near", Some(1.2)),
        ]);

        h.say(&["/bestdeal", "Rome", "5", "no", "50-150", "0-3"]).await;

        let query = &h.provider.recorded_queries()[0];
        let price = query.price_range.unwrap();
        assert_eq!((price.min(), price.max()), (50, 150));
        let distance = query.distance_range.unwrap();
        assert!((distance.min() - 0.0).abs() < f64::EPSILON);
        assert!((distance.max() - 3.0).abs() < f64::EPSILON);

        let names: Vec<_> = h.pages().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Center", "Edge", "Near"]);
        assert_eq!(h.history.recorded_entries()[0].hotel_names, names);
    }

    #[tokio::test]
    async fn test_invalid_inputs_reprompt_without_advancing() {
        let h = Harness::new();
        h.provider.queue_city("3");
        h.say(&["/bestdeal", "Oslo", "abc"]).await;

        match h.messenger.last_for(USER) {
            Some(Reply::Prompt { text, choices }) => {
                assert!(text.contains("How many hotels"));
                assert_eq!(choices, vec!["5", "10", "15", "20", "25"]);
            }
            other => panic!("expected page size re-prompt, got {other:?}"),
        }

        h.say(&["30"]).await;
        assert!(h.provider.recorded_queries().is_empty());

        h.say(&["5", "no", "200-100"]).await;
        assert!(matches!(
            h.messenger.last_for(USER),
            Some(Reply::Prompt { text, .. }) if text.contains("min-max")
        ));
        assert!(h.provider.recorded_queries().is_empty());
        assert!(h.engine.sessions().contains(USER));
    }

    #[tokio::test]
    async fn test_reset_mid_scenario_clears_session() {
        let h = Harness::new();
        h.provider.queue_city("4");
        h.say(&["/bestdeal", "Rome", "5", "no", "10-20"]).await;
        assert!(h.engine.sessions().contains(USER));

        h.say(&["/start"]).await;
        assert!(h.engine.sessions().is_empty());
        assert!(matches!(
            h.messenger.last_for(USER),
            Some(Reply::Prompt { text, .. }) if text.contains("Back to the start")
        ));

        // A fresh scenario asks for the city again with nothing carried over
        h.provider.queue_city("5");
        h.provider.queue_hotels(numbered(2));
        h.say(&["/lowprice", "Paris", "5", "no"]).await;
        let query = &h.provider.recorded_queries()[0];
        assert_eq!(query.price_range, None);
        assert_eq!(query.distance_range, None);
    }

    #[tokio::test]
    async fn test_scenario_command_mid_scenario_restarts() {
        let h = Harness::new();
        h.provider.queue_city("6");
        h.say(&["/bestdeal", "Rome", "5"]).await;

        h.provider.queue_city("7");
        h.provider.queue_hotels(numbered(1));
        h.say(&["/highprice", "Lima", "5", "no"]).await;

        let query = &h.provider.recorded_queries()[0];
        assert_eq!(query.destination_id, DestinationId("7".into()));
        assert_eq!(query.sort_order, SortOrder::PriceDescending);
        assert_eq!(query.price_range, None);
    }

    #[tokio::test]
    async fn test_city_not_found_loops_back() {
        let h = Harness::new();
        h.provider.queue_city_not_found();
        h.say(&["/lowprice", "Atlantis"]).await;

        assert!(matches!(
            h.messenger.last_for(USER),
            Some(Reply::Prompt { text, .. }) if text.contains("City not found")
        ));

        h.provider.queue_city("8");
        h.say(&["Athens"]).await;
        assert!(matches!(
            h.messenger.last_for(USER),
            Some(Reply::Prompt { text, .. }) if text.contains("How many hotels")
        ));
        assert_eq!(
            *h.provider.city_lookups.lock().unwrap(),
            vec!["Atlantis".to_string(), "Athens".to_string()]
        );
    }

    #[tokio::test]
    async fn test_recent_cities_offered() {
        let h = Harness::new();
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        for (i, city) in ["Paris", "Rome", "Oslo", "Lima"].iter().enumerate() {
            h.history.insert(SearchLogEntry {
                user_id: USER,
                created_at: base + ChronoDuration::hours(i64::try_from(i).unwrap()),
                city_name: (*city).to_string(),
                scenario: Scenario::Cheapest,
                hotel_names: vec![],
            });
        }

        h.say(&["/lowprice"]).await;
        match h.messenger.last_for(USER) {
            Some(Reply::Prompt { choices, .. }) => {
                assert_eq!(choices, vec!["Lima", "Oslo", "Rome"])
            }
            other => panic!("expected city prompt, got {other:?}"),
        }
    }

    // ============================================================================
    // Degraded collaborators
    // ============================================================================

    #[tokio::test]
    async fn test_history_write_failure_still_delivers_results() {
        let h = Harness::new();
        h.history.set_fail_writes(true);
        h.provider.queue_city("9");
        h.provider.queue_hotels(numbered(4));

        h.say(&["/lowprice", "Berlin", "5", "no"]).await;

        assert_eq!(h.pages().len(), 4);
        assert_eq!(h.errors().len(), 1);
        assert!(matches!(
            h.messenger.last_for(USER),
            Some(Reply::Summary(text)) if text.contains("Hotels found: 4")
        ));
        assert!(h.engine.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_search_failure_ends_with_empty_summary() {
        let h = Harness::new();
        h.provider.queue_city("10");
        h.provider.queue_search_error(ProviderError::network("connection reset"));

        h.say(&["/lowprice", "Madrid", "5", "no"]).await;

        assert!(h.pages().is_empty());
        assert_eq!(h.errors().len(), 1);
        assert!(matches!(
            h.messenger.last_for(USER),
            Some(Reply::Summary(text)) if text.contains("Hotels found: 0")
        ));
        assert!(h.engine.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_delivery_failure_does_not_stall_dialogue() {
        let h = Harness::new();
        h.messenger.set_fail(true);
        h.provider.queue_city("11");
        h.provider.queue_hotels(numbered(2));

        h.say(&["/lowprice", "Vienna", "5", "no"]).await;

        assert_eq!(h.history.recorded_entries().len(), 1);
        assert!(h.engine.sessions().is_empty());
    }

    // ============================================================================
    // History
    // ============================================================================

    #[tokio::test]
    async fn test_history_groups_by_search() {
        let h = Harness::new();
        let base = Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap();
        h.history.insert(SearchLogEntry {
            user_id: USER,
            created_at: base,
            city_name: "Paris".into(),
            scenario: Scenario::Cheapest,
            hotel_names: vec!["A".into(), "B".into()],
        });
        h.history.insert(SearchLogEntry {
            user_id: USER,
            created_at: base + ChronoDuration::minutes(5),
            city_name: "Rome".into(),
            scenario: Scenario::BestDeal,
            hotel_names: vec!["C".into()],
        });

        h.say(&["/history", "5"]).await;

        let summaries: Vec<_> = h
            .messenger
            .replies_for(USER)
            .into_iter()
            .filter_map(|r| match r {
                Reply::Summary(text) => Some(text),
                _ => None,
            })
            .collect();
        assert_eq!(summaries.len(), 2);
        assert!(summaries[0].contains("/bestdeal"));
        assert!(summaries[0].contains('C'));
        assert!(summaries[1].contains("/lowprice"));
        assert!(summaries[1].contains("A\nB"));
        assert!(h.engine.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_empty_history() {
        let h = Harness::new();
        h.say(&["/history", "3"]).await;
        assert!(matches!(
            h.messenger.last_for(USER),
            Some(Reply::Summary(text)) if text.contains("empty")
        ));
    }

    // ============================================================================
    // Dispatcher
    // ============================================================================

    #[tokio::test]
    async fn test_dispatcher_keeps_order_and_retires_worker() {
        let h = Harness::new();
        h.provider.queue_city("12");
        h.provider.queue_hotels(numbered(6));

        let dispatcher = Dispatcher::new(Arc::clone(&h.engine), Duration::from_millis(50));
        for text in ["/lowprice", "Prague", "5", "no"] {
            dispatcher.dispatch(USER, text.to_string());
        }
        dispatcher.dispatch(UserId(2), "/help".to_string());

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while dispatcher.active_workers() > 0 {
            assert!(tokio::time::Instant::now() < deadline, "workers never retired");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(h.provider.recorded_queries()[0].count, 5);
        assert_eq!(h.pages().len(), 5);
        assert!(matches!(
            h.messenger.last_for(UserId(2)),
            Some(Reply::Summary(text)) if text.contains("/lowprice")
        ));

        // A retired user gets a new worker on the next message
        dispatcher.dispatch(USER, "/help".to_string());
        assert_eq!(dispatcher.active_workers(), 1);
    }
}
