//! Session state types

use crate::hotels::{DestinationId, SortOrder};
use crate::validators::{DistanceRange, PageSize, PhotoCount, PriceRange};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Chat user identifier, unique per session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// Scenario
// ============================================================================

/// Top-level search mode chosen by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    #[default]
    None,
    Cheapest,
    MostExpensive,
    BestDeal,
    History,
}

impl Scenario {
    /// Chat command that starts this scenario
    pub fn command(self) -> &'static str {
        match self {
            Scenario::None => "",
            Scenario::Cheapest => "/lowprice",
            Scenario::MostExpensive => "/highprice",
            Scenario::BestDeal => "/bestdeal",
            Scenario::History => "/history",
        }
    }

    pub fn from_command(text: &str) -> Option<Self> {
        match text.trim() {
            "/lowprice" => Some(Scenario::Cheapest),
            "/highprice" => Some(Scenario::MostExpensive),
            "/bestdeal" => Some(Scenario::BestDeal),
            "/history" => Some(Scenario::History),
            _ => None,
        }
    }

    /// Provider ordering for search scenarios
    pub fn sort_order(self) -> Option<SortOrder> {
        match self {
            Scenario::Cheapest | Scenario::BestDeal => Some(SortOrder::PriceAscending),
            Scenario::MostExpensive => Some(SortOrder::PriceDescending),
            Scenario::None | Scenario::History => None,
        }
    }

    /// Whether the scenario asks for price and distance ranges
    pub fn needs_ranges(self) -> bool {
        matches!(self, Scenario::BestDeal)
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

// ============================================================================
// Step
// ============================================================================

/// The kind of input (or I/O outcome) a session is waiting for
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    /// No scenario in progress
    #[default]
    Idle,
    AwaitingCity,
    /// City lookup in flight
    ResolvingCity { city: String },
    AwaitingPageSize,
    AwaitingPhotoChoice,
    AwaitingPhotoCount,
    AwaitingPriceRange,
    AwaitingDistanceRange,
    /// Hotel search in flight; results are presented when they arrive
    Presenting,
    AwaitingHistoryCount,
    /// History read in flight
    LoadingHistory,
}

impl Step {
    /// Waiting on a collaborator rather than on the user
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            Step::ResolvingCity { .. } | Step::Presenting | Step::LoadingHistory
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Step::Idle => "idle",
            Step::AwaitingCity => "awaiting_city",
            Step::ResolvingCity { .. } => "resolving_city",
            Step::AwaitingPageSize => "awaiting_page_size",
            Step::AwaitingPhotoChoice => "awaiting_photo_choice",
            Step::AwaitingPhotoCount => "awaiting_photo_count",
            Step::AwaitingPriceRange => "awaiting_price_range",
            Step::AwaitingDistanceRange => "awaiting_distance_range",
            Step::Presenting => "presenting",
            Step::AwaitingHistoryCount => "awaiting_history_count",
            Step::LoadingHistory => "loading_history",
        }
    }
}

// ============================================================================
// Session State
// ============================================================================

/// Per-user scenario progress and the values collected so far
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub user_id: UserId,
    pub step: Step,
    pub scenario: Scenario,
    pub city_name: Option<String>,
    pub destination_id: Option<DestinationId>,
    pub page_size: Option<PageSize>,
    pub photo_count: PhotoCount,
    pub price_range: Option<PriceRange>,
    pub distance_range: Option<DistanceRange>,
    /// When the scenario started; keys the search log
    pub created_at: DateTime<Utc>,
}

impl SessionState {
    /// Fresh idle session with nothing collected
    pub fn idle(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            step: Step::Idle,
            scenario: Scenario::None,
            city_name: None,
            destination_id: None,
            page_size: None,
            photo_count: PhotoCount::NONE,
            price_range: None,
            distance_range: None,
            created_at: now,
        }
    }

    /// Fresh session for `scenario`, waiting at `step`
    pub fn start(user_id: UserId, scenario: Scenario, step: Step, now: DateTime<Utc>) -> Self {
        Self {
            scenario,
            step,
            ..Self::idle(user_id, now)
        }
    }

    pub fn is_idle(&self) -> bool {
        self.step == Step::Idle
    }

    /// Copy of this session moved to `step`
    pub fn at(&self, step: Step) -> Self {
        Self {
            step,
            ..self.clone()
        }
    }
}

/// Per-turn inputs that are not part of the session itself
#[derive(Debug, Clone)]
pub struct TurnContext {
    pub user_id: UserId,
    pub now: DateTime<Utc>,
}

impl TurnContext {
    pub fn new(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self { user_id, now }
    }
}
