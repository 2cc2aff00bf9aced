//! Rise of Industry Ratio Calculator
//!
//! CLI over the production chain engine: load a JSON catalog export, list
//! goods, inspect a recipe, and compute facility counts and costs for one
//! or more simultaneous demands.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use roi_calculator::models::DEFAULT_PERIOD_DAYS;
use roi_calculator::{calculator, rational, Catalog, Demand};

#[derive(Parser)]
#[command(name = "roi-calculator")]
#[command(about = "Production chain ratio calculator for Rise of Industry")]
struct Cli {
    /// Path to the catalog JSON export
    #[arg(short, long, default_value = "exports.json")]
    catalog: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Calculate the production chain for one or more demands
    Calc {
        /// Demands as GOOD=QTY, quantity per period (fractions allowed)
        #[arg(required = true)]
        demands: Vec<String>,

        /// Period length in days
        #[arg(short, long, default_value_t = DEFAULT_PERIOD_DAYS)]
        period: u64,

        /// Show the full build tree
        #[arg(short, long)]
        verbose: bool,
    },

    /// List all producible goods
    ListGoods,

    /// Show recipe and facility details for a good
    Good {
        /// Good name (e.g. "Water", "Steel")
        name: String,
    },

    /// Check that the catalog loads and indexes cleanly
    Validate,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let text = fs::read_to_string(&cli.catalog)
        .with_context(|| format!("failed to read {}", cli.catalog.display()))?;
    let catalog = Catalog::from_json(&text)
        .with_context(|| format!("failed to load {}", cli.catalog.display()))?;

    match cli.command {
        Commands::Calc {
            demands,
            period,
            verbose,
        } => {
            let demands = demands
                .iter()
                .map(|arg| parse_demand(arg, period))
                .collect::<Result<Vec<_>>>()?;
            let result = calculator::compute_many(&catalog, &demands)?;

            if verbose {
                println!("Build tree:\n");
                println!("{}", calculator::format_tree(&result.tree, 0));
            }
            println!("{result}");
        }

        Commands::ListGoods => {
            println!("Producible goods:");
            for good in catalog.goods() {
                println!("  {good}");
            }
        }

        Commands::Good { name } => {
            let recipe = catalog.recipe_for(&name)?;
            let facility = catalog.facility_for(&recipe.name)?;
            println!("Good: {name}");
            println!("  Recipe: {} ({} day cycle)", recipe.name, recipe.cycle_days);
            if !recipe.inputs.is_empty() {
                println!("  Inputs per cycle:");
                for stack in &recipe.inputs {
                    println!("    {} x{}", stack.good, rational::mixed(&stack.amount));
                }
            }
            println!("  Outputs per cycle:");
            for stack in &recipe.outputs {
                println!("    {} x{}", stack.good, rational::mixed(&stack.amount));
            }
            print!("  Facility: {} @ {:.0}", facility.name, facility.unit_cost());
            if facility.is_harvester() {
                print!(" (harvester)");
            }
            println!();
        }

        Commands::Validate => {
            let goods = catalog.goods().count();
            match catalog.timestamp() {
                Some(timestamp) => {
                    println!("Catalog ok: {goods} producible goods, exported {timestamp}")
                }
                None => println!("Catalog ok: {goods} producible goods"),
            }
        }
    }

    Ok(())
}

/// Parse a `GOOD=QTY` demand argument.
fn parse_demand(arg: &str, period: u64) -> Result<Demand> {
    let Some((good, quantity)) = arg.split_once('=') else {
        bail!("expected GOOD=QTY, got '{arg}'");
    };
    let quantity = rational::parse_quantity(quantity)
        .with_context(|| format!("invalid quantity '{quantity}' for '{good}'"))?;
    Ok(Demand::new(good, quantity, period))
}
