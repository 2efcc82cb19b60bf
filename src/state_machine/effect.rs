//! Effects produced by state transitions

use crate::db::SearchLogEntry;
use crate::hotels::{HotelRecord, SearchQuery};
use crate::messenger::Reply;

/// Effects to be executed after state transition, in order
#[derive(Debug, Clone)]
pub enum Effect {
    /// Deliver one outbound action to the user
    Reply(Reply),

    /// Prompt for a city, offering the user's recent cities as choices
    OfferCities { text: String },

    /// Look the city up with the provider
    ResolveCity { name: String },

    /// Run the hotel search
    SearchHotels { query: SearchQuery },

    /// Read the user's most recent history rows
    LoadHistory { limit: usize },

    /// Append the completed search to the history log
    PersistSearch { entry: SearchLogEntry },
}

impl Effect {
    pub fn prompt(text: impl Into<String>, choices: &[&str]) -> Self {
        Effect::Reply(Reply::Prompt {
            text: text.into(),
            choices: choices.iter().map(|c| (*c).to_string()).collect(),
        })
    }

    pub fn say(text: impl Into<String>) -> Self {
        Effect::prompt(text, &[])
    }

    pub fn summary(text: impl Into<String>) -> Self {
        Effect::Reply(Reply::Summary(text.into()))
    }

    pub fn result_page(hotel: HotelRecord) -> Self {
        Effect::Reply(Reply::ResultPage(hotel))
    }
}
