//! Pure state transition function
//!
//! Given the current session, the turn context and one event, decide the next
//! session and the effects to run. No I/O happens here; provider and history
//! outcomes come back in as events.

use super::state::{Scenario, SessionState, Step, TurnContext};
use super::{Effect, Event};
use crate::db::{HistoryRow, SearchLogEntry};
use crate::filter::select_hotels;
use crate::hotels::{HotelRecord, SearchQuery};
use crate::validators::{
    parse_distance_range, parse_history_limit, parse_price_range, parse_yes_no, Answer, PageSize,
    PhotoCount, ValidationError,
};
use thiserror::Error;

pub const RESET_COMMAND: &str = "/start";
pub const HELP_COMMAND: &str = "/help";

const MENU_CHOICES: [&str; 4] = ["/lowprice", "/highprice", "/bestdeal", "/history"];
const PAGE_SIZE_CHOICES: [&str; 5] = ["5", "10", "15", "20", "25"];
const PHOTO_CHOICES: [&str; 2] = ["Yes", "No"];
const PHOTO_COUNT_CHOICES: [&str; 5] = ["1", "3", "5", "10", "15"];
const HISTORY_CHOICES: [&str; 4] = ["3", "5", "10", "15"];

const HELP_TEXT: &str = "Commands:\n\
    /lowprice - cheapest hotels in a city\n\
    /highprice - most expensive hotels in a city\n\
    /bestdeal - hotels within a price range and distance from the center\n\
    /history - your recent searches\n\
    /start - back to the start";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SessionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Still working on your previous request, please wait.")]
    Busy,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
pub fn transition(
    state: &SessionState,
    context: &TurnContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match event {
        Event::UserText { text } => on_user_text(state, context, &text),

        // ============================================================
        // Provider outcomes
        // ============================================================
        Event::CityResolved { destination_id } => match &state.step {
            Step::ResolvingCity { city } => Ok(TransitionResult::new(SessionState {
                city_name: Some(city.clone()),
                destination_id: Some(destination_id),
                ..state.at(Step::AwaitingPageSize)
            })
            .with_effect(prompt_for(&Step::AwaitingPageSize, None))),
            step => Err(unexpected(step, "CityResolved")),
        },

        Event::CityNotFound => match &state.step {
            Step::ResolvingCity { .. } => Ok(TransitionResult::new(SessionState {
                city_name: None,
                destination_id: None,
                ..state.at(Step::AwaitingCity)
            })
            .with_effect(Effect::OfferCities {
                text: "City not found, please try again.".to_string(),
            })),
            step => Err(unexpected(step, "CityNotFound")),
        },

        Event::SearchCompleted { hotels } => match &state.step {
            Step::Presenting => Ok(present(state, context, hotels)),
            step => Err(unexpected(step, "SearchCompleted")),
        },

        // ============================================================
        // History outcomes
        // ============================================================
        Event::HistoryLoaded { rows } => match &state.step {
            Step::LoadingHistory => {
                let mut effects = vec![Effect::say("Your search history:")];
                let groups = group_history(&rows);
                if groups.is_empty() {
                    effects.push(Effect::summary("Your search history is empty."));
                } else {
                    effects.extend(groups.into_iter().map(Effect::summary));
                }
                Ok(TransitionResult::new(SessionState::idle(context.user_id, context.now))
                    .with_effects(effects))
            }
            step => Err(unexpected(step, "HistoryLoaded")),
        },
    }
}

fn on_user_text(
    state: &SessionState,
    context: &TurnContext,
    text: &str,
) -> Result<TransitionResult, TransitionError> {
    let input = text.trim();

    // Commands are intercepted before any step-specific handling
    if input == RESET_COMMAND {
        let reply = if state.is_idle() {
            "Choose a command. Help: /help"
        } else {
            "Back to the start. Choose a command:"
        };
        return Ok(TransitionResult::new(SessionState::idle(context.user_id, context.now))
            .with_effect(Effect::prompt(reply, &MENU_CHOICES)));
    }
    if let Some(scenario) = Scenario::from_command(input) {
        return Ok(start_scenario(context, scenario));
    }

    match &state.step {
        Step::Idle => {
            let effect = if input == HELP_COMMAND {
                Effect::summary(HELP_TEXT)
            } else {
                Effect::prompt("Choose a command. Help: /help", &MENU_CHOICES)
            };
            Ok(TransitionResult::new(state.clone()).with_effect(effect))
        }

        Step::AwaitingCity => {
            if input.is_empty() {
                return Ok(TransitionResult::new(state.clone()).with_effect(Effect::OfferCities {
                    text: "Please send a city name.".to_string(),
                }));
            }
            Ok(TransitionResult::new(SessionState {
                city_name: Some(input.to_string()),
                destination_id: None,
                ..state.at(Step::ResolvingCity {
                    city: input.to_string(),
                })
            })
            .with_effect(Effect::say("Looking up the city..."))
            .with_effect(Effect::ResolveCity {
                name: input.to_string(),
            }))
        }

        Step::AwaitingPageSize => match PageSize::parse(input) {
            Ok(page_size) => Ok(TransitionResult::new(SessionState {
                page_size: Some(page_size),
                ..state.at(Step::AwaitingPhotoChoice)
            })
            .with_effect(prompt_for(&Step::AwaitingPhotoChoice, None))),
            Err(e) => Ok(reject(state, &e)),
        },

        Step::AwaitingPhotoChoice => match parse_yes_no(input) {
            Answer::Yes => Ok(TransitionResult::new(state.at(Step::AwaitingPhotoCount))
                .with_effect(prompt_for(&Step::AwaitingPhotoCount, None))),
            Answer::No => {
                let next = SessionState {
                    photo_count: PhotoCount::NONE,
                    ..state.clone()
                };
                Ok(execute(&next)?.with_effects_first([Effect::say("Photos are off.")]))
            }
        },

        Step::AwaitingPhotoCount => match PhotoCount::parse(input) {
            Ok(photo_count) => execute(&SessionState {
                photo_count,
                ..state.clone()
            }),
            Err(e) => Ok(reject(state, &e)),
        },

        Step::AwaitingPriceRange => match parse_price_range(input) {
            Ok(range) => Ok(TransitionResult::new(SessionState {
                price_range: Some(range),
                ..state.at(Step::AwaitingDistanceRange)
            })
            .with_effect(prompt_for(&Step::AwaitingDistanceRange, None))),
            Err(e) => Ok(reject(state, &e)),
        },

        Step::AwaitingDistanceRange => match parse_distance_range(input) {
            Ok(range) => search(&SessionState {
                distance_range: Some(range),
                ..state.clone()
            }),
            Err(e) => Ok(reject(state, &e)),
        },

        Step::AwaitingHistoryCount => match parse_history_limit(input) {
            Ok(limit) => Ok(TransitionResult::new(state.at(Step::LoadingHistory))
                .with_effect(Effect::LoadHistory { limit })),
            Err(e) => Ok(reject(state, &e)),
        },

        Step::ResolvingCity { .. } | Step::Presenting | Step::LoadingHistory => {
            Err(TransitionError::Busy)
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

impl TransitionResult {
    fn with_effects_first(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        let rest = std::mem::take(&mut self.effects);
        self.effects.extend(effects);
        self.effects.extend(rest);
        self
    }
}

fn unexpected(step: &Step, event: &str) -> TransitionError {
    TransitionError::InvalidTransition(format!("{event} while {}", step.name()))
}

fn start_scenario(context: &TurnContext, scenario: Scenario) -> TransitionResult {
    if scenario == Scenario::History {
        let step = Step::AwaitingHistoryCount;
        let effect = prompt_for(&step, None);
        let state = SessionState::start(context.user_id, scenario, step, context.now);
        return TransitionResult::new(state).with_effect(effect);
    }

    let intro = match scenario {
        Scenario::MostExpensive => "Most expensive hotels in a city.",
        Scenario::BestDeal => "Hotels best matching a price range and distance from the center.",
        _ => "Cheapest hotels in a city.",
    };
    TransitionResult::new(SessionState::start(
        context.user_id,
        scenario,
        Step::AwaitingCity,
        context.now,
    ))
    .with_effect(Effect::OfferCities {
        text: format!("{intro}\n\nEnter a city name or pick a recent one:"),
    })
}

/// The prompt that asks for `step`'s input, optionally led by a correction
fn prompt_for(step: &Step, correction: Option<&ValidationError>) -> Effect {
    let (text, choices): (&str, &[&str]) = match step {
        Step::AwaitingCity => {
            let text = correction.map_or_else(
                || "Enter a city name:".to_string(),
                |e| format!("{e}\nEnter a city name:"),
            );
            return Effect::OfferCities { text };
        }
        Step::AwaitingPageSize => ("How many hotels should I show?", &PAGE_SIZE_CHOICES),
        Step::AwaitingPhotoChoice => ("Show hotel photos?", &PHOTO_CHOICES),
        Step::AwaitingPhotoCount => ("How many photos per hotel?", &PHOTO_COUNT_CHOICES),
        Step::AwaitingPriceRange => ("Price range per night, as min-max:", &[]),
        Step::AwaitingDistanceRange => ("Distance from the city center in km, as min-max:", &[]),
        Step::AwaitingHistoryCount => ("How many recent hotels should I show?", &HISTORY_CHOICES),
        Step::Idle | Step::ResolvingCity { .. } | Step::Presenting | Step::LoadingHistory => {
            ("Choose a command. Help: /help", &MENU_CHOICES)
        }
    };
    match correction {
        Some(e) => Effect::prompt(format!("{e}\n{text}"), choices),
        None => Effect::prompt(text, choices),
    }
}

/// Stay on the current step and ask again
fn reject(state: &SessionState, error: &ValidationError) -> TransitionResult {
    TransitionResult::new(state.clone()).with_effect(prompt_for(&state.step, Some(error)))
}

/// All basic inputs collected: either ask for ranges or search right away
fn execute(state: &SessionState) -> Result<TransitionResult, TransitionError> {
    if state.scenario.needs_ranges() {
        let step = Step::AwaitingPriceRange;
        let effect = prompt_for(&step, None);
        return Ok(TransitionResult::new(state.at(step)).with_effect(effect));
    }
    search(state)
}

fn search(state: &SessionState) -> Result<TransitionResult, TransitionError> {
    let (Some(destination_id), Some(page_size), Some(sort_order)) = (
        state.destination_id.clone(),
        state.page_size,
        state.scenario.sort_order(),
    ) else {
        return Err(TransitionError::InvalidTransition(format!(
            "search requested from {} without city, page size or sort order",
            state.step.name()
        )));
    };

    let query = SearchQuery {
        destination_id,
        count: page_size.get(),
        sort_order,
        price_range: state.price_range,
        distance_range: state.distance_range,
        photo_count: state.photo_count,
    };
    Ok(TransitionResult::new(state.at(Step::Presenting))
        .with_effect(Effect::say("Searching for hotels..."))
        .with_effect(Effect::SearchHotels { query }))
}

/// Filter, show, log, and end the scenario
fn present(
    state: &SessionState,
    context: &TurnContext,
    hotels: Vec<HotelRecord>,
) -> TransitionResult {
    let limit = state.page_size.map_or(0, PageSize::get);
    let shown = select_hotels(hotels, limit, state.distance_range.as_ref());

    let entry = SearchLogEntry {
        user_id: state.user_id,
        created_at: state.created_at,
        city_name: state.city_name.clone().unwrap_or_default(),
        scenario: state.scenario,
        hotel_names: shown.iter().map(|h| h.name.clone()).collect(),
    };
    let count = shown.len();

    TransitionResult::new(SessionState::idle(context.user_id, context.now))
        .with_effects(shown.into_iter().map(Effect::result_page))
        .with_effect(Effect::PersistSearch { entry })
        .with_effect(Effect::summary(format!(
            "Hotels found: {count}.\n\nNew search: /start\nHelp: /help"
        )))
}

/// One summary per logged search; rows arrive newest first
fn group_history(rows: &[HistoryRow]) -> Vec<String> {
    let mut groups: Vec<(&HistoryRow, Vec<&str>)> = Vec::new();
    for row in rows {
        let same_search = groups.last().is_some_and(|(head, _)| {
            head.created_at == row.created_at && head.scenario == row.scenario
        });
        if !same_search {
            groups.push((row, Vec::new()));
        }
        if let Some((_, names)) = groups.last_mut() {
            names.extend(row.hotel_name.as_deref());
        }
    }

    groups
        .into_iter()
        .map(|(head, names)| {
            let results = if names.is_empty() {
                "nothing found".to_string()
            } else {
                names.join("\n")
            };
            format!(
                "Date: {}\nCommand: {}\nResults:\n{results}",
                head.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
                head.scenario
            )
        })
        .collect()
}
