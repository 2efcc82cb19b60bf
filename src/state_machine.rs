//! Dialogue state machine
//!
//! Pure transitions in the Elm style: the runtime feeds events in, runs the
//! returned effects, and feeds their outcomes back as events.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::Event;
pub use state::{Scenario, SessionState, Step, TurnContext, UserId};
pub use transition::{transition, TransitionError, TransitionResult};
