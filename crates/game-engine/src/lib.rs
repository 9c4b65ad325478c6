#![deny(warnings)]

//! The simulation engine: production aggregation, effect application,
//! unlocks, synergies, purchases, and the intent dispatcher.
//!
//! Every operation is a transition `fn(&mut GameState, input) -> Result`
//! with no hidden state. Gameplay-rule violations (insufficient funds,
//! locked content) are ordinary `Err(ActionError)` values; notifications
//! come back as `Vec<GameEvent>` data for the hosting layer to forward.

pub mod effects;
pub mod error;
pub mod event;
pub mod intent;
pub mod production;
pub mod purchase;
pub mod synergy;
pub mod unlocks;

pub use error::ActionError;
pub use event::{GameEvent, Severity};
pub use intent::{apply_offline, step, Intent};
pub use purchase::PurchaseTarget;
