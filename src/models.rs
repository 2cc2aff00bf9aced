//! Data models for the catalog and computed production chains

use std::collections::BTreeMap;

use num_bigint::BigInt;
use num_rational::BigRational;
use serde::Deserialize;

/// Raw catalog as exported to JSON, before validation and indexing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCatalog {
    #[serde(default)]
    pub timestamp: Option<String>,
    pub recipes: Vec<RawRecipe>,
    pub producers: Vec<RawProducer>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecipe {
    pub name: String,
    /// Cycle length in days. Fractional durations are floored before use.
    #[serde(alias = "days")]
    pub cycle_duration: serde_json::Number,
    /// Well-type recipes are never selectable as a good's producer.
    #[serde(default)]
    pub excluded_from_selection: bool,
    #[serde(default)]
    pub inputs: Vec<RawStack>,
    pub outputs: Vec<RawStack>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawStack {
    #[serde(alias = "name")]
    pub good: String,
    pub amount: serde_json::Number,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProducer {
    pub name: String,
    pub cost: f64,
    /// Extraction-type facilities price at this instead of `cost`.
    #[serde(default)]
    pub harvester_cost: Option<f64>,
    pub recipes: Vec<String>,
}

/// A good quantity attached to a recipe side.
#[derive(Debug, Clone, PartialEq)]
pub struct Stack {
    pub good: String,
    pub amount: BigRational,
}

/// Validated recipe with exact amounts and a floored whole-day cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub name: String,
    pub cycle_days: u64,
    pub excluded_from_selection: bool,
    pub inputs: Vec<Stack>,
    pub outputs: Vec<Stack>,
}

impl Recipe {
    /// Per-day output of `good` for a single facility running this recipe.
    pub fn output_rate(&self, good: &str) -> Option<BigRational> {
        let stack = self.outputs.iter().find(|s| s.good == good)?;
        Some(&stack.amount / BigRational::from_integer(BigInt::from(self.cycle_days)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Facility {
    pub name: String,
    pub cost: f64,
    pub harvester_cost: Option<f64>,
}

impl Facility {
    pub fn unit_cost(&self) -> f64 {
        self.harvester_cost.unwrap_or(self.cost)
    }

    pub fn is_harvester(&self) -> bool {
        self.harvester_cost.is_some()
    }
}

/// One requested output: a quantity of a good per `period_days`.
#[derive(Debug, Clone, PartialEq)]
pub struct Demand {
    pub good: String,
    pub quantity: BigRational,
    pub period_days: u64,
}

/// Default demand period, in days.
pub const DEFAULT_PERIOD_DAYS: u64 = 15;

impl Demand {
    pub fn new(good: impl Into<String>, quantity: BigRational, period_days: u64) -> Self {
        Self {
            good: good.into(),
            quantity,
            period_days,
        }
    }

    /// Demand normalized to a per-day rate.
    pub fn rate_per_day(&self) -> BigRational {
        &self.quantity / BigRational::from_integer(BigInt::from(self.period_days))
    }
}

/// One expanded recipe instance satisfying a specific demand rate,
/// with its input subtree.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductionNode {
    pub recipe: String,
    pub good: String,
    /// Per-day quantity this node must supply.
    pub demand_rate: BigRational,
    /// Exact number of facility instances; may be fractional.
    pub facility_count: BigRational,
    pub inputs: Vec<ProductionNode>,
    pub facility: String,
}

/// Share of a good's total production consumed by one downstream recipe,
/// or taken directly by the demand set when `recipe` is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribution {
    pub recipe: Option<String>,
    pub quantity: BigRational,
    pub fraction: BigRational,
}

/// Aggregated facility requirement and cost for one good across a tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TotalsEntry {
    pub facility_count: BigRational,
    pub rounded_count: u64,
    pub unit_cost: f64,
    pub total_cost: f64,
    pub demand_rate: BigRational,
    pub facility: String,
    pub is_harvester: bool,
    pub towards: Vec<Attribution>,
}

/// Complete result of one engine run.
#[derive(Debug, Clone, PartialEq)]
pub struct Computation {
    pub tree: ProductionNode,
    pub totals: BTreeMap<String, TotalsEntry>,
    pub grand_total: f64,
}
