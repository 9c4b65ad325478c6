//! Rejection taxonomy for player intents. These are expected, frequent
//! outcomes returned as values, never panics; each carries enough detail
//! for the UI layer to render a specific message.

use game_core::ResourceId;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ActionError {
    /// The intent referenced a catalog id that does not exist.
    #[error("unknown entity: {id}")]
    UnknownEntity { id: String },
    /// The cost could not be covered; `missing` holds the per-resource
    /// shortfall.
    #[error("insufficient resources for {id}")]
    InsufficientResources {
        id: String,
        missing: BTreeMap<ResourceId, f64>,
    },
    /// Action attempted on content that has not been unlocked.
    #[error("{id} is not unlocked")]
    NotUnlocked { id: String },
    /// One-shot purchase attempted a second time.
    #[error("{id} is already purchased")]
    AlreadyPurchased { id: String },
    /// Sale attempted with nothing owned.
    #[error("no {id} owned to sell")]
    NothingToSell { id: String },
}
