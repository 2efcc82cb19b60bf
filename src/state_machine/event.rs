//! Events that can occur in a session

use crate::db::HistoryRow;
use crate::hotels::{DestinationId, HotelRecord};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    UserText { text: String },

    // Provider events
    CityResolved { destination_id: DestinationId },
    CityNotFound,
    SearchCompleted { hotels: Vec<HotelRecord> },

    // History events
    HistoryLoaded { rows: Vec<HistoryRow> },
}

impl Event {
    pub fn user_text(text: impl Into<String>) -> Self {
        Event::UserText { text: text.into() }
    }
}
