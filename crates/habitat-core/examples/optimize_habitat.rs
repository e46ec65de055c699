//! Place a handful of stock modules, score the layout, then optimize it.
//!
//! Prints the score breakdown before and after, plus the optimized layout
//! as a JSON document.
//!
//! Run with: `cargo run -p habitat-core --example optimize_habitat`

use habitat_core::document::{DEFAULT_CELL_SIZE, LayoutDocument};
use habitat_core::prelude::*;
use habitat_core::scoring::ScoreResult;

fn print_score(label: &str, result: &ScoreResult) {
    let b = &result.breakdown;
    println!("{label}: score {}", result.score);
    println!(
        "  resource {} | accessibility {} | adjacency {} | clustering {} | safety {}",
        b.resource_score, b.accessibility_score, b.adjacency_score, b.clustering_score, b.safety_score
    );
    for violation in &result.hard_violations {
        println!("  ! {}", violation.message);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Catalog::default_habitat();
    let constraints = Constraints::builder()
        .affinity("sleep", Affinity::new(["medical"], ["gym"]))
        .affinity("galley", Affinity::new(["life"], ["recycling"]))
        .airlock_key(Some("airlock"))
        .build()?;

    // --- Step 1: Lay out the modules far apart ---

    let mut layout = LayoutStore::new(constraints.grid());
    let start = [
        ("galley", 0, 0),
        ("life", 14, 11),
        ("medical", 15, 0),
        ("sleep", 0, 11),
        ("gym", 1, 10),
        ("lab", 7, 0),
        ("recycling", 10, 5),
        ("airlock", 12, 8),
    ];
    for (key, x, y) in start {
        layout.place(catalog.require(key)?, GridPosition::new(x, y), Rotation::None)?;
    }
    print_score("before", &evaluate(&layout, &constraints));

    // --- Step 2: Optimize ---

    let outcome = Optimizer::new(OptimizerConfig::default()).run(&layout, &constraints, None);
    print_score("after", &evaluate(&outcome.layout, &constraints));
    println!(
        "  {} iterations, {} accepted, {} improvements, {} swaps discarded",
        outcome.stats.iterations_run,
        outcome.stats.accepted,
        outcome.stats.improvements,
        outcome.stats.swaps_discarded
    );

    // --- Step 3: Export ---

    let doc = LayoutDocument::from_store(&outcome.layout, DEFAULT_CELL_SIZE);
    println!("{}", doc.to_json()?);
    Ok(())
}
