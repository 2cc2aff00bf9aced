//! Error types for catalog loading and chain computation

use thiserror::Error;

/// Catalog validation failure. Fatal at load time: nothing partially
/// indexed is ever returned.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("catalog is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("recipe with an empty name")]
    UnnamedRecipe,

    #[error("producer with an empty name")]
    UnnamedProducer,

    #[error("recipe '{0}' has a non-positive cycle duration")]
    InvalidCycleDuration(String),

    #[error("recipe '{recipe}' has a malformed entry for good '{good}'")]
    InvalidStack { recipe: String, good: String },

    #[error("recipe '{0}' has no outputs")]
    NoOutputs(String),

    #[error("producer '{0}' has an invalid cost")]
    InvalidCost(String),

    #[error("good '{good}' is produced by both '{first}' and '{second}'")]
    AmbiguousProducer {
        good: String,
        first: String,
        second: String,
    },

    #[error("recipe '{recipe}' is listed by both '{first}' and '{second}'")]
    AmbiguousFacility {
        recipe: String,
        first: String,
        second: String,
    },

    #[error("recipe '{0}' is not listed by any producer")]
    UnassignedRecipe(String),
}

/// Per-computation failure. Local to the failing call: the catalog and any
/// previously computed results are left untouched.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("no recipe produces '{0}'")]
    UnknownGood(String),

    #[error("invalid demand for '{good}': {reason}")]
    InvalidDemand { good: String, reason: String },

    #[error("production chain cycle detected at '{0}'")]
    CycleDetected(String),

    #[error("no facility executes recipe '{0}'")]
    MissingFacility(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
