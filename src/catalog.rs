//! Catalog index: validation and lookup tables
//!
//! Built once per loaded catalog and immutable afterwards. Two tables drive
//! the engine: output good -> producing recipe, and recipe name -> facility.

use std::collections::BTreeMap;

use num_traits::Signed;
use tracing::debug;

use crate::errors::{EngineError, SchemaError};
use crate::models::{Facility, RawCatalog, RawRecipe, RawStack, Recipe, Stack};
use crate::rational;

#[derive(Debug, Clone)]
pub struct Catalog {
    timestamp: Option<String>,
    output_to_recipe: BTreeMap<String, Recipe>,
    recipe_to_facility: BTreeMap<String, Facility>,
}

impl Catalog {
    /// Parse and index a JSON catalog export.
    pub fn from_json(text: &str) -> Result<Self, SchemaError> {
        let raw: RawCatalog = serde_json::from_str(text)?;
        Self::build(raw)
    }

    /// Validate a raw catalog and build the lookup tables.
    ///
    /// When two selectable recipes produce the same good, or two producers
    /// list the same recipe, the catalog is rejected as ambiguous rather
    /// than letting catalog order decide.
    pub fn build(raw: RawCatalog) -> Result<Self, SchemaError> {
        let mut output_to_recipe: BTreeMap<String, Recipe> = BTreeMap::new();
        for raw_recipe in &raw.recipes {
            let recipe = validate_recipe(raw_recipe)?;
            if recipe.excluded_from_selection {
                continue;
            }
            for output in &recipe.outputs {
                if let Some(existing) = output_to_recipe.get(&output.good) {
                    return Err(SchemaError::AmbiguousProducer {
                        good: output.good.clone(),
                        first: existing.name.clone(),
                        second: recipe.name.clone(),
                    });
                }
                output_to_recipe.insert(output.good.clone(), recipe.clone());
            }
        }

        let mut recipe_to_facility: BTreeMap<String, Facility> = BTreeMap::new();
        for producer in &raw.producers {
            if producer.name.is_empty() {
                return Err(SchemaError::UnnamedProducer);
            }
            let valid_cost = |c: f64| c.is_finite() && c >= 0.0;
            if !valid_cost(producer.cost) || !producer.harvester_cost.is_none_or(valid_cost) {
                return Err(SchemaError::InvalidCost(producer.name.clone()));
            }
            let facility = Facility {
                name: producer.name.clone(),
                cost: producer.cost,
                harvester_cost: producer.harvester_cost,
            };
            for recipe_name in &producer.recipes {
                if let Some(existing) = recipe_to_facility.get(recipe_name) {
                    return Err(SchemaError::AmbiguousFacility {
                        recipe: recipe_name.clone(),
                        first: existing.name.clone(),
                        second: producer.name.clone(),
                    });
                }
                recipe_to_facility.insert(recipe_name.clone(), facility.clone());
            }
        }

        // Every selectable recipe must be executable somewhere.
        for recipe in output_to_recipe.values() {
            if !recipe_to_facility.contains_key(&recipe.name) {
                return Err(SchemaError::UnassignedRecipe(recipe.name.clone()));
            }
        }

        debug!(
            goods = output_to_recipe.len(),
            recipes = raw.recipes.len(),
            producers = raw.producers.len(),
            "catalog indexed"
        );
        Ok(Self {
            timestamp: raw.timestamp,
            output_to_recipe,
            recipe_to_facility,
        })
    }

    /// The recipe that produces `good`.
    pub fn recipe_for(&self, good: &str) -> Result<&Recipe, EngineError> {
        self.output_to_recipe
            .get(good)
            .ok_or_else(|| EngineError::UnknownGood(good.to_string()))
    }

    /// The facility that executes `recipe_name`.
    pub fn facility_for(&self, recipe_name: &str) -> Result<&Facility, EngineError> {
        self.recipe_to_facility
            .get(recipe_name)
            .ok_or_else(|| EngineError::MissingFacility(recipe_name.to_string()))
    }

    /// All producible goods, sorted by name.
    pub fn goods(&self) -> impl Iterator<Item = &str> {
        self.output_to_recipe.keys().map(String::as_str)
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref()
    }
}

fn validate_recipe(raw: &RawRecipe) -> Result<Recipe, SchemaError> {
    if raw.name.is_empty() {
        return Err(SchemaError::UnnamedRecipe);
    }
    let cycle_days = rational::from_number(&raw.cycle_duration)
        .map(|d| d.floor().to_integer())
        .and_then(|d| u64::try_from(d).ok())
        .filter(|d| *d >= 1)
        .ok_or_else(|| SchemaError::InvalidCycleDuration(raw.name.clone()))?;
    if raw.outputs.is_empty() {
        return Err(SchemaError::NoOutputs(raw.name.clone()));
    }
    let inputs = validate_stacks(&raw.name, &raw.inputs)?;
    let outputs = validate_stacks(&raw.name, &raw.outputs)?;
    Ok(Recipe {
        name: raw.name.clone(),
        cycle_days,
        excluded_from_selection: raw.excluded_from_selection,
        inputs,
        outputs,
    })
}

fn validate_stacks(recipe: &str, raw: &[RawStack]) -> Result<Vec<Stack>, SchemaError> {
    raw.iter()
        .map(|stack| {
            let amount = rational::from_number(&stack.amount)
                .filter(|a| a.is_positive())
                .ok_or_else(|| SchemaError::InvalidStack {
                    recipe: recipe.to_string(),
                    good: stack.good.clone(),
                })?;
            if stack.good.is_empty() {
                return Err(SchemaError::InvalidStack {
                    recipe: recipe.to_string(),
                    good: stack.good.clone(),
                });
            }
            Ok(Stack {
                good: stack.good.clone(),
                amount,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog_json(recipes: &str, producers: &str) -> String {
        format!(r#"{{"timestamp":"t0","recipes":[{recipes}],"producers":[{producers}]}}"#)
    }

    #[test]
    fn indexes_outputs_and_facilities() {
        let json = catalog_json(
            r#"{"name":"WheatFarm","cycleDuration":2,"inputs":[],"outputs":[{"good":"Wheat","amount":10}]}"#,
            r#"{"name":"Farm","cost":500,"recipes":["WheatFarm"]}"#,
        );
        let catalog = Catalog::from_json(&json).unwrap();
        assert_eq!(catalog.goods().collect::<Vec<_>>(), vec!["Wheat"]);
        assert_eq!(catalog.recipe_for("Wheat").unwrap().cycle_days, 2);
        assert_eq!(catalog.facility_for("WheatFarm").unwrap().name, "Farm");
        assert_eq!(catalog.timestamp(), Some("t0"));
    }

    #[test]
    fn fractional_cycle_duration_is_floored() {
        let json = catalog_json(
            r#"{"name":"WheatFarm","cycleDuration":2.9,"inputs":[],"outputs":[{"good":"Wheat","amount":10}]}"#,
            r#"{"name":"Farm","cost":500,"recipes":["WheatFarm"]}"#,
        );
        let catalog = Catalog::from_json(&json).unwrap();
        assert_eq!(catalog.recipe_for("Wheat").unwrap().cycle_days, 2);
    }

    #[test]
    fn rejects_non_positive_cycle_duration() {
        for duration in ["0", "-1", "0.5"] {
            let json = catalog_json(
                &format!(
                    r#"{{"name":"WheatFarm","cycleDuration":{duration},"inputs":[],"outputs":[{{"good":"Wheat","amount":10}}]}}"#
                ),
                r#"{"name":"Farm","cost":500,"recipes":["WheatFarm"]}"#,
            );
            assert!(matches!(
                Catalog::from_json(&json),
                Err(SchemaError::InvalidCycleDuration(name)) if name == "WheatFarm"
            ));
        }
    }

    #[test]
    fn rejects_ambiguous_producers() {
        let json = catalog_json(
            r#"{"name":"WheatFarm","cycleDuration":1,"inputs":[],"outputs":[{"good":"Wheat","amount":10}]},
               {"name":"WheatPaddy","cycleDuration":1,"inputs":[],"outputs":[{"good":"Wheat","amount":6}]}"#,
            r#"{"name":"Farm","cost":500,"recipes":["WheatFarm","WheatPaddy"]}"#,
        );
        assert!(matches!(
            Catalog::from_json(&json),
            Err(SchemaError::AmbiguousProducer { good, .. }) if good == "Wheat"
        ));
    }

    #[test]
    fn excluded_recipes_do_not_register_outputs() {
        let json = catalog_json(
            r#"{"name":"WaterWell","cycleDuration":1,"excludedFromSelection":true,"inputs":[],"outputs":[{"good":"Water","amount":5}]},
               {"name":"WaterSiphon","cycleDuration":1,"inputs":[],"outputs":[{"good":"Water","amount":3}]}"#,
            r#"{"name":"Waterworks","cost":400,"recipes":["WaterWell","WaterSiphon"]}"#,
        );
        let catalog = Catalog::from_json(&json).unwrap();
        assert_eq!(catalog.recipe_for("Water").unwrap().name, "WaterSiphon");
    }

    #[test]
    fn rejects_recipe_without_facility() {
        let json = catalog_json(
            r#"{"name":"WheatFarm","cycleDuration":1,"inputs":[],"outputs":[{"good":"Wheat","amount":10}]}"#,
            r#"{"name":"Farm","cost":500,"recipes":[]}"#,
        );
        assert!(matches!(
            Catalog::from_json(&json),
            Err(SchemaError::UnassignedRecipe(name)) if name == "WheatFarm"
        ));
    }

    #[test]
    fn rejects_duplicate_recipe_listings() {
        let json = catalog_json(
            r#"{"name":"WheatFarm","cycleDuration":1,"inputs":[],"outputs":[{"good":"Wheat","amount":10}]}"#,
            r#"{"name":"Farm","cost":500,"recipes":["WheatFarm"]},
               {"name":"Estate","cost":900,"recipes":["WheatFarm"]}"#,
        );
        assert!(matches!(
            Catalog::from_json(&json),
            Err(SchemaError::AmbiguousFacility { recipe, .. }) if recipe == "WheatFarm"
        ));
    }

    #[test]
    fn rejects_bad_costs_and_stacks() {
        let json = catalog_json(
            r#"{"name":"WheatFarm","cycleDuration":1,"inputs":[],"outputs":[{"good":"Wheat","amount":10}]}"#,
            r#"{"name":"Farm","cost":-1,"recipes":["WheatFarm"]}"#,
        );
        assert!(matches!(
            Catalog::from_json(&json),
            Err(SchemaError::InvalidCost(name)) if name == "Farm"
        ));

        let json = catalog_json(
            r#"{"name":"WheatFarm","cycleDuration":1,"inputs":[{"good":"Seed","amount":0}],"outputs":[{"good":"Wheat","amount":10}]}"#,
            r#"{"name":"Farm","cost":500,"recipes":["WheatFarm"]}"#,
        );
        assert!(matches!(
            Catalog::from_json(&json),
            Err(SchemaError::InvalidStack { good, .. }) if good == "Seed"
        ));
    }

    #[test]
    fn unknown_good_lookup_fails() {
        let json = catalog_json(
            r#"{"name":"WheatFarm","cycleDuration":1,"inputs":[],"outputs":[{"good":"Wheat","amount":10}]}"#,
            r#"{"name":"Farm","cost":500,"recipes":["WheatFarm"]}"#,
        );
        let catalog = Catalog::from_json(&json).unwrap();
        assert!(matches!(
            catalog.recipe_for("Plutonium"),
            Err(EngineError::UnknownGood(name)) if name == "Plutonium"
        ));
    }
}
