//! Production chain calculator logic
//!
//! Expands a demand rate into a tree of facility requirements down to raw
//! harvester recipes, then folds the tree into per-good totals with
//! proportional attribution to each consuming recipe. All arithmetic is
//! exact rational until the final rounding/cost step.

use std::collections::BTreeMap;
use std::fmt;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use tracing::debug;

use crate::catalog::Catalog;
use crate::errors::{EngineError, EngineResult};
use crate::models::{
    Attribution, Computation, Demand, ProductionNode, Recipe, Stack, TotalsEntry,
};
use crate::rational;

/// Name of the synthetic recipe/good used to fan several demands into one
/// tree. Never registered in the catalog and stripped from all totals.
const SYNTHETIC_ROOT: &str = "";

/// Expand a per-day demand for one good into a production tree.
pub fn build_tree(catalog: &Catalog, good: &str, rate_per_day: &BigRational) -> EngineResult<ProductionNode> {
    if !rate_per_day.is_positive() {
        return Err(EngineError::InvalidDemand {
            good: good.to_string(),
            reason: "demand rate must be positive".to_string(),
        });
    }
    debug!(good, rate = %rate_per_day, "building production tree");
    let mut path = Vec::new();
    expand(catalog, None, good, rate_per_day.clone(), &mut path)
}

/// Expand several simultaneous demands under one synthetic root.
///
/// The synthetic recipe consumes each demand at its per-day rate and yields
/// one unit of the empty-name good per day; it stays a local value here
/// rather than being registered into the catalog. Zero-quantity demands are
/// dropped; negative quantities, zero periods, and empty good names are
/// rejected.
pub fn build_tree_from_many(catalog: &Catalog, demands: &[Demand]) -> EngineResult<ProductionNode> {
    let mut inputs = Vec::with_capacity(demands.len());
    for demand in demands {
        if demand.good == SYNTHETIC_ROOT {
            return Err(EngineError::UnknownGood(demand.good.clone()));
        }
        if demand.period_days == 0 {
            return Err(EngineError::InvalidDemand {
                good: demand.good.clone(),
                reason: "period must be positive".to_string(),
            });
        }
        if demand.quantity.is_negative() {
            return Err(EngineError::InvalidDemand {
                good: demand.good.clone(),
                reason: "quantity must not be negative".to_string(),
            });
        }
        if demand.quantity.is_zero() {
            continue;
        }
        inputs.push(Stack {
            good: demand.good.clone(),
            amount: demand.rate_per_day(),
        });
    }
    debug!(demands = inputs.len(), "building combined production tree");

    let root = Recipe {
        name: SYNTHETIC_ROOT.to_string(),
        cycle_days: 1,
        excluded_from_selection: false,
        inputs,
        outputs: vec![Stack {
            good: SYNTHETIC_ROOT.to_string(),
            amount: BigRational::one(),
        }],
    };
    let mut path = Vec::new();
    expand(catalog, Some(&root), SYNTHETIC_ROOT, BigRational::one(), &mut path)
}

fn expand(
    catalog: &Catalog,
    synthetic: Option<&Recipe>,
    good: &str,
    rate: BigRational,
    path: &mut Vec<String>,
) -> EngineResult<ProductionNode> {
    if path.iter().any(|seen| seen == good) {
        return Err(EngineError::CycleDetected(good.to_string()));
    }
    let recipe = match synthetic {
        Some(root) if good == SYNTHETIC_ROOT => root,
        _ => catalog.recipe_for(good)?,
    };
    let output_rate = recipe
        .output_rate(good)
        .ok_or_else(|| EngineError::UnknownGood(good.to_string()))?;
    let facility_count = &rate / output_rate;
    let facility = if recipe.name == SYNTHETIC_ROOT {
        String::new()
    } else {
        catalog.facility_for(&recipe.name)?.name.clone()
    };

    let cycle = BigRational::from_integer(BigInt::from(recipe.cycle_days));
    path.push(good.to_string());
    let mut inputs = Vec::with_capacity(recipe.inputs.len());
    for stack in &recipe.inputs {
        let child_rate = &facility_count * &stack.amount / &cycle;
        inputs.push(expand(catalog, None, &stack.good, child_rate, path)?);
    }
    path.pop();

    Ok(ProductionNode {
        recipe: recipe.name.clone(),
        good: good.to_string(),
        demand_rate: rate,
        facility_count,
        inputs,
        facility,
    })
}

/// Fold a production tree into per-good totals.
pub fn totals(catalog: &Catalog, root: &ProductionNode) -> EngineResult<BTreeMap<String, TotalsEntry>> {
    // Pass 1: one post-order walk summing facility counts per good.
    let mut sums: BTreeMap<String, BigRational> = BTreeMap::new();
    accumulate(root, &mut sums);
    sums.remove(SYNTHETIC_ROOT);

    // Pass 2: one walk over the edges, attributing each child's count to
    // the consuming recipe. Edges sharing a consumer are merged; edges out
    // of the synthetic root become consumer-less direct-demand records, so
    // every entry's fractions sum to exactly one.
    let mut towards: BTreeMap<String, BTreeMap<Option<String>, Attribution>> = BTreeMap::new();
    attribute(root, &sums, &mut towards);

    // Pass 3: enrichment with facility, cost, and rounded counts.
    let mut entries = BTreeMap::new();
    for (good, total) in sums {
        let recipe = catalog.recipe_for(&good)?;
        let facility = catalog.facility_for(&recipe.name)?;
        let output_rate = recipe
            .output_rate(&good)
            .ok_or_else(|| EngineError::UnknownGood(good.clone()))?;
        let rounded_count = rational::ceil_to_u64(&total);
        let unit_cost = facility.unit_cost();
        let records = towards
            .remove(&good)
            .map(|merged| merged.into_values().collect())
            .unwrap_or_default();
        entries.insert(
            good,
            TotalsEntry {
                rounded_count,
                unit_cost,
                total_cost: rounded_count as f64 * unit_cost,
                demand_rate: &total * output_rate,
                facility: facility.name.clone(),
                is_harvester: facility.is_harvester(),
                towards: records,
                facility_count: total,
            },
        );
    }
    Ok(entries)
}

fn accumulate(node: &ProductionNode, sums: &mut BTreeMap<String, BigRational>) {
    let entry = sums
        .entry(node.good.clone())
        .or_insert_with(BigRational::zero);
    *entry += &node.facility_count;
    for input in &node.inputs {
        accumulate(input, sums);
    }
}

fn attribute(
    node: &ProductionNode,
    sums: &BTreeMap<String, BigRational>,
    towards: &mut BTreeMap<String, BTreeMap<Option<String>, Attribution>>,
) {
    for input in &node.inputs {
        // A root edge is demand taken directly, not a consuming recipe.
        let consumer = (node.recipe != SYNTHETIC_ROOT).then(|| node.recipe.clone());
        if let Some(total) = sums.get(&input.good) {
            let record = towards
                .entry(input.good.clone())
                .or_default()
                .entry(consumer.clone())
                .or_insert_with(|| Attribution {
                    recipe: consumer,
                    quantity: BigRational::zero(),
                    fraction: BigRational::zero(),
                });
            record.quantity += &input.facility_count;
            record.fraction += &input.facility_count / total;
        }
        attribute(input, sums, towards);
    }
}

/// Run the full engine for a demand set: tree, totals, and grand total.
pub fn compute_many(catalog: &Catalog, demands: &[Demand]) -> EngineResult<Computation> {
    let tree = build_tree_from_many(catalog, demands)?;
    let totals = totals(catalog, &tree)?;
    let grand_total = totals.values().map(|entry| entry.total_cost).sum();
    Ok(Computation {
        tree,
        totals,
        grand_total,
    })
}

/// Format a production tree as an indented listing.
pub fn format_tree(node: &ProductionNode, indent: usize) -> String {
    let mut output = String::new();
    let prefix = "  ".repeat(indent);
    if node.recipe == SYNTHETIC_ROOT {
        for input in &node.inputs {
            output.push_str(&format_tree(input, indent));
        }
    } else {
        output.push_str(&format!(
            "{}{} x{} ({} @ {}/day)\n",
            prefix,
            node.good,
            rational::mixed(&node.facility_count),
            node.facility,
            rational::mixed(&node.demand_rate),
        ));
        for input in &node.inputs {
            output.push_str(&format_tree(input, indent + 1));
        }
    }
    output
}

impl fmt::Display for Computation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Totals ===")?;
        for (good, entry) in &self.totals {
            writeln!(
                f,
                "{:<20} {:>10} exact, {:>4} to build ({}) @ {:.0} = {:.0}",
                good,
                rational::mixed(&entry.facility_count),
                entry.rounded_count,
                entry.facility,
                entry.unit_cost,
                entry.total_cost,
            )?;
            if entry.towards.len() > 1 {
                for share in &entry.towards {
                    writeln!(
                        f,
                        "  -> {} of all to {} ({})",
                        rational::mixed(&share.fraction),
                        share.recipe.as_deref().unwrap_or("direct demand"),
                        rational::mixed(&share.quantity),
                    )?;
                }
            }
        }
        writeln!(f, "Grand total: {:.0}", self.grand_total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    fn ratio(n: i64, d: i64) -> BigRational {
        BigRational::new(BigInt::from(n), BigInt::from(d))
    }

    fn catalog() -> Catalog {
        Catalog::from_json(
            r#"{
                "timestamp": "t0",
                "recipes": [
                    {"name": "WaterSiphon", "cycleDuration": 2, "inputs": [],
                     "outputs": [{"good": "Water", "amount": 3}]},
                    {"name": "WheatFarm", "cycleDuration": 1,
                     "inputs": [{"good": "Water", "amount": 2}],
                     "outputs": [{"good": "Wheat", "amount": 4}]}
                ],
                "producers": [
                    {"name": "Waterworks", "cost": 400, "harvesterCost": 250,
                     "recipes": ["WaterSiphon"]},
                    {"name": "Farm", "cost": 500, "recipes": ["WheatFarm"]}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn tree_matches_demand_exactly() {
        let catalog = catalog();
        // Wheat comes out at 4/day, so 6/day needs 1+1/2 farms.
        let tree = build_tree(&catalog, "Wheat", &ratio(6, 1)).unwrap();
        assert_eq!(tree.recipe, "WheatFarm");
        assert_eq!(tree.facility, "Farm");
        assert_eq!(tree.facility_count, ratio(3, 2));

        // Each farm pulls 2 Water per 1-day cycle; siphons yield 3/2 per day.
        let water = &tree.inputs[0];
        assert_eq!(water.demand_rate, ratio(3, 1));
        assert_eq!(water.facility_count, ratio(2, 1));
        assert_eq!(water.facility, "Waterworks");
    }

    #[test]
    fn non_positive_rate_is_rejected() {
        let catalog = catalog();
        assert!(matches!(
            build_tree(&catalog, "Wheat", &ratio(0, 1)),
            Err(EngineError::InvalidDemand { .. })
        ));
        assert!(matches!(
            build_tree(&catalog, "Wheat", &ratio(-1, 1)),
            Err(EngineError::InvalidDemand { .. })
        ));
    }

    #[test]
    fn synthetic_root_is_stripped_from_totals() {
        let catalog = catalog();
        let demands = vec![Demand::new("Wheat", ratio(60, 1), 15)];
        let tree = build_tree_from_many(&catalog, &demands).unwrap();
        assert_eq!(tree.good, SYNTHETIC_ROOT);
        assert_eq!(tree.facility_count, ratio(1, 1));

        let totals = totals(&catalog, &tree).unwrap();
        assert!(!totals.contains_key(SYNTHETIC_ROOT));
        assert_eq!(totals["Wheat"].facility_count, ratio(1, 1));
    }

    #[test]
    fn harvester_cost_wins_when_present() {
        let catalog = catalog();
        let result = compute_many(&catalog, &[Demand::new("Water", ratio(3, 1), 1)]).unwrap();
        let water = &result.totals["Water"];
        assert!(water.is_harvester);
        assert_eq!(water.unit_cost, 250.0);
        assert_eq!(water.rounded_count, 2);
        assert_eq!(water.total_cost, 500.0);
    }

    #[test]
    fn cycle_is_detected() {
        let catalog = Catalog::from_json(
            r#"{
                "recipes": [
                    {"name": "MakeA", "cycleDuration": 1,
                     "inputs": [{"good": "B", "amount": 1}],
                     "outputs": [{"good": "A", "amount": 1}]},
                    {"name": "MakeB", "cycleDuration": 1,
                     "inputs": [{"good": "A", "amount": 1}],
                     "outputs": [{"good": "B", "amount": 1}]}
                ],
                "producers": [
                    {"name": "Loop", "cost": 1, "recipes": ["MakeA", "MakeB"]}
                ]
            }"#,
        )
        .unwrap();
        assert!(matches!(
            build_tree(&catalog, "A", &ratio(1, 1)),
            Err(EngineError::CycleDetected(good)) if good == "A"
        ));
    }

    #[test]
    fn tree_listing_skips_synthetic_root() {
        let catalog = catalog();
        let demands = vec![Demand::new("Water", ratio(3, 1), 1)];
        let tree = build_tree_from_many(&catalog, &demands).unwrap();
        let listing = format_tree(&tree, 0);
        assert!(listing.starts_with("Water x2"));
    }
}
