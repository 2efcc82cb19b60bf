//! Dialogue turn executor

use super::sessions::SessionStore;
use super::traits::{HistoryStore, HotelProvider, Messenger};

use crate::messenger::Reply;
use crate::state_machine::{transition, Effect, Event, TurnContext, UserId};
use chrono::Utc;

/// Recent cities offered as quick picks
const RECENT_CITY_CHOICES: usize = 3;

/// Runs user turns: transition, perform effects, feed outcomes back in
pub struct DialogEngine<P, H, M>
where
    P: HotelProvider,
    H: HistoryStore,
    M: Messenger,
{
    provider: P,
    history: H,
    messenger: M,
    sessions: SessionStore,
}

impl<P, H, M> DialogEngine<P, H, M>
where
    P: HotelProvider,
    H: HistoryStore,
    M: Messenger,
{
    pub fn new(provider: P, history: H, messenger: M) -> Self {
        Self {
            provider,
            history,
            messenger,
            sessions: SessionStore::new(),
        }
    }

    #[allow(dead_code)] // Used by tests
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Handle one inbound message to completion
    pub async fn handle_text(&self, user_id: UserId, text: String) {
        let context = TurnContext::new(user_id, Utc::now());
        let session = self.sessions.acquire(user_id, context.now).await;
        let mut state = session.state().clone();

        // Outcomes of effects are fed back in the same turn
        let mut events_to_process = vec![Event::user_text(text)];

        while let Some(event) = events_to_process.pop() {
            let from_user = matches!(event, Event::UserText { .. });

            let result = match transition(&state, &context, event) {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(
                        user_id = %user_id,
                        step = state.step.name(),
                        error = %e,
                        "Transition rejected"
                    );
                    if from_user {
                        self.deliver(user_id, &Reply::Error(e.to_string())).await;
                    }
                    continue;
                }
            };

            if result.new_state.step != state.step {
                tracing::debug!(
                    user_id = %user_id,
                    scenario = %result.new_state.scenario,
                    from = state.step.name(),
                    to = result.new_state.step.name(),
                    "Step changed"
                );
            }
            state = result.new_state;

            for effect in result.effects {
                if let Some(generated_event) = self.execute_effect(&context, effect).await {
                    events_to_process.push(generated_event);
                }
            }
        }

        self.sessions.release(session, state);
    }

    async fn execute_effect(&self, context: &TurnContext, effect: Effect) -> Option<Event> {
        let user_id = context.user_id;
        match effect {
            Effect::Reply(reply) => {
                self.deliver(user_id, &reply).await;
                None
            }

            Effect::OfferCities { text } => {
                let recent = self.history.recent_cities(user_id, RECENT_CITY_CHOICES).await;
                let choices = match recent {
                    Ok(cities) => cities,
                    Err(e) => {
                        tracing::warn!(
                            user_id = %user_id,
                            error = %e,
                            "Could not read recent cities"
                        );
                        vec![]
                    }
                };
                self.deliver(user_id, &Reply::Prompt { text, choices }).await;
                None
            }

            Effect::ResolveCity { name } => match self.provider.resolve_city(&name).await {
                Ok(Some(destination_id)) => Some(Event::CityResolved { destination_id }),
                Ok(None) => Some(Event::CityNotFound),
                Err(e) => {
                    tracing::error!(
                        user_id = %user_id,
                        city = %name,
                        error = %e,
                        "City lookup failed"
                    );
                    Some(Event::CityNotFound)
                }
            },

            Effect::SearchHotels { query } => match self.provider.search_hotels(&query).await {
                Ok(hotels) => Some(Event::SearchCompleted { hotels }),
                Err(e) => {
                    tracing::error!(
                        user_id = %user_id,
                        kind = ?e.kind,
                        error = %e,
                        "Hotel search failed"
                    );
                    self.deliver(
                        user_id,
                        &Reply::Error("The hotel service is unavailable right now.".to_string()),
                    )
                    .await;
                    Some(Event::SearchCompleted { hotels: vec![] })
                }
            },

            Effect::LoadHistory { limit } => {
                let rows = match self.history.recent_entries(user_id, limit).await {
                    Ok(rows) => rows,
                    Err(e) => {
                        tracing::error!(user_id = %user_id, error = %e, "Could not read history");
                        vec![]
                    }
                };
                Some(Event::HistoryLoaded { rows })
            }

            Effect::PersistSearch { entry } => {
                if let Err(e) = self.history.append(&entry).await {
                    tracing::error!(user_id = %user_id, error = %e, "Could not save search");
                    let notice = "This search could not be saved to your history.";
                    self.deliver(user_id, &Reply::Error(notice.to_string())).await;
                } else {
                    tracing::info!(
                        user_id = %user_id,
                        scenario = %entry.scenario,
                        city = %entry.city_name,
                        hotels = entry.hotel_names.len(),
                        "Search logged"
                    );
                }
                None
            }
        }
    }

    /// Delivery failures are logged; the dialogue moves on regardless
    async fn deliver(&self, user_id: UserId, reply: &Reply) {
        if let Err(e) = self.messenger.deliver(user_id, reply).await {
            tracing::warn!(user_id = %user_id, reply = reply.kind(), error = %e, "Delivery failed");
        }
    }
}
