//! Production chain ratio calculator for Rise of Industry
//!
//! Given a JSON catalog of recipes and producers plus one or more demand
//! targets, computes the full production chain: exact facility counts per
//! good, rounded build counts, capital cost, and proportional attribution
//! of every intermediate good to its downstream consumers.

pub mod calculator;
pub mod catalog;
pub mod errors;
pub mod models;
pub mod rational;

pub use calculator::{build_tree, build_tree_from_many, compute_many, format_tree, totals};
pub use catalog::Catalog;
pub use errors::{EngineError, EngineResult, SchemaError};
pub use models::{
    Attribution, Computation, Demand, ProductionNode, TotalsEntry, DEFAULT_PERIOD_DAYS,
};
