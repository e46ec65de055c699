//! Stochastic hill-climbing over layouts.
//!
//! Each iteration clones the best layout so far, perturbs it once, and keeps
//! the candidate if it scores at least as well. Two perturbations exist:
//!
//! - **relocate** one random placement to the first of up to N random cells
//!   where it is free, and
//! - **swap** the origins of two random placements. A swap that leaves either
//!   placement colliding or out of bounds is discarded before scoring.
//!
//! The search never returns a layout that scores below its input and never
//! produces an overlapping layout. Runs are deterministic for a given seed
//! and can be cancelled between iterations through a [`CancelToken`].

use crate::constraints::Constraints;
use crate::grid::{self, GridPosition};
use crate::layout::LayoutStore;
use crate::rng::SearchRng;
use crate::scoring::evaluate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

/// Seed used when the caller does not pick one.
pub const DEFAULT_SEED: u64 = 0x4841_4249_5441_5401;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tuning knobs for a search run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Number of perturb-and-evaluate cycles.
    pub iterations: u32,
    /// Probability of a relocation rather than a swap.
    pub relocate_probability: f64,
    /// Random cells tried per relocation.
    pub relocation_attempts: u32,
    /// Re-draws allowed when the second swap pick equals the first.
    pub swap_pick_attempts: u32,
    pub seed: u64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            iterations: 800,
            relocate_probability: 0.6,
            relocation_attempts: 40,
            swap_pick_attempts: 12,
            seed: DEFAULT_SEED,
        }
    }
}

impl OptimizerConfig {
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Errors from running the optimizer on a background thread.
#[derive(Debug, thiserror::Error)]
pub enum OptimizerError {
    #[error("failed to spawn optimizer thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("optimizer thread panicked")]
    WorkerPanicked,
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Shared flag checked at every iteration boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Counters describing what a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimizerStats {
    pub iterations_run: u32,
    /// Candidates that replaced the best layout (score >= best).
    pub accepted: u32,
    /// Accepted candidates that strictly raised the score.
    pub improvements: u32,
    /// Relocations that found no free cell.
    pub relocations_failed: u32,
    /// Swaps thrown away because they produced a collision.
    pub swaps_discarded: u32,
    pub cancelled: bool,
}

/// Best layout found and its score.
#[derive(Debug, Clone)]
pub struct OptimizeOutcome {
    pub layout: LayoutStore,
    pub score: u32,
    pub stats: OptimizerStats,
}

// ---------------------------------------------------------------------------
// Optimizer
// ---------------------------------------------------------------------------

/// A seeded local-search driver.
#[derive(Debug, Clone)]
pub struct Optimizer {
    config: OptimizerConfig,
    rng: SearchRng,
}

impl Optimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        let rng = SearchRng::new(config.seed);
        Self { config, rng }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Search from `layout`. The input is cloned; it is never modified.
    pub fn run(
        &mut self,
        layout: &LayoutStore,
        constraints: &Constraints,
        cancel: Option<&CancelToken>,
    ) -> OptimizeOutcome {
        let mut best = layout.clone();
        let mut best_score = evaluate(&best, constraints).score;
        let mut stats = OptimizerStats::default();

        if best.is_empty() {
            return OptimizeOutcome {
                layout: best,
                score: best_score,
                stats,
            };
        }

        log::debug!(
            "optimizing {} placements for {} iterations (start score {best_score})",
            best.len(),
            self.config.iterations
        );

        for _ in 0..self.config.iterations {
            if cancel.is_some_and(CancelToken::is_cancelled) {
                stats.cancelled = true;
                break;
            }
            stats.iterations_run += 1;

            let mut candidate = best.clone();
            if self.rng.chance(self.config.relocate_probability) {
                if !self.relocate(&mut candidate) {
                    stats.relocations_failed += 1;
                }
            } else if !self.swap(&mut candidate) {
                stats.swaps_discarded += 1;
                continue;
            }

            let score = evaluate(&candidate, constraints).score;
            if score >= best_score {
                if score > best_score {
                    stats.improvements += 1;
                    log::trace!("iteration {}: score {best_score} -> {score}", stats.iterations_run);
                }
                stats.accepted += 1;
                best = candidate;
                best_score = score;
            }
        }

        log::info!(
            "optimizer finished: score {best_score} after {} iterations ({} improvements{})",
            stats.iterations_run,
            stats.improvements,
            if stats.cancelled { ", cancelled" } else { "" }
        );

        OptimizeOutcome {
            layout: best,
            score: best_score,
            stats,
        }
    }

    /// Move one random placement to a random free cell. Returns `false` when
    /// every attempt collided, leaving the candidate unchanged.
    fn relocate(&mut self, candidate: &mut LayoutStore) -> bool {
        let index = self.rng.below(candidate.len());
        let placement = &candidate.placements()[index];
        let id = placement.id;
        let footprint = placement.footprint();
        let grid = candidate.grid();
        let max_x = i32::try_from(grid.cols).unwrap_or(i32::MAX) - 1;
        let max_y = i32::try_from(grid.rows).unwrap_or(i32::MAX) - 1;

        for _ in 0..self.config.relocation_attempts {
            let position = GridPosition::new(
                self.rng.range_inclusive(0, max_x),
                self.rng.range_inclusive(0, max_y),
            );
            let rect = footprint.at(position);
            if grid::is_free(candidate.placements(), Some(id), &rect, grid) {
                candidate.set_position_unchecked(index, position);
                return true;
            }
        }
        false
    }

    /// Swap the origins of two random placements. Returns `false` when the
    /// result is illegal, in which case the candidate must be dropped.
    fn swap(&mut self, candidate: &mut LayoutStore) -> bool {
        let n = candidate.len();
        if n < 2 {
            return true;
        }

        let first = self.rng.below(n);
        let mut second = self.rng.below(n);
        let mut attempts = 0;
        while second == first && attempts < self.config.swap_pick_attempts {
            second = self.rng.below(n);
            attempts += 1;
        }
        if first == second {
            return true;
        }

        let a = candidate.placements()[first].id;
        let b = candidate.placements()[second].id;
        if candidate.swap_positions(a, b).is_err() {
            return false;
        }

        [a, b].into_iter().all(|id| {
            candidate
                .get(id)
                .is_some_and(|p| candidate.is_free(Some(id), &p.rect()))
        })
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Run `iterations` search steps with the default seed and tuning.
pub fn optimize(layout: &LayoutStore, constraints: &Constraints, iterations: u32) -> OptimizeOutcome {
    Optimizer::new(OptimizerConfig::default().with_iterations(iterations)).run(layout, constraints, None)
}

/// Handle to an optimizer running on its own thread.
#[derive(Debug)]
pub struct OptimizerHandle {
    cancel: CancelToken,
    worker: JoinHandle<OptimizeOutcome>,
}

impl OptimizerHandle {
    /// Ask the worker to stop at the next iteration boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Wait for the run to end and take its result.
    pub fn join(self) -> Result<OptimizeOutcome, OptimizerError> {
        self.worker.join().map_err(|_| OptimizerError::WorkerPanicked)
    }
}

/// Start a search on a background thread. The worker owns its own copies of
/// the layout and constraints; the caller reconciles the result.
pub fn spawn(
    layout: LayoutStore,
    constraints: Constraints,
    config: OptimizerConfig,
) -> Result<OptimizerHandle, OptimizerError> {
    let cancel = CancelToken::new();
    let token = cancel.clone();
    let worker = std::thread::Builder::new()
        .name("habitat-optimizer".into())
        .spawn(move || Optimizer::new(config).run(&layout, &constraints, Some(&token)))?;
    Ok(OptimizerHandle { cancel, worker })
}

/// Run `starts` independently seeded searches and keep the best result.
///
/// Seeds are derived from `config.seed`, so the result is reproducible. Ties
/// go to the earliest start. With the `parallel` feature the starts run on
/// the rayon thread pool.
pub fn optimize_multi_start(
    layout: &LayoutStore,
    constraints: &Constraints,
    config: &OptimizerConfig,
    starts: usize,
) -> OptimizeOutcome {
    let mut seeder = SearchRng::new(config.seed);
    let seeds: Vec<u64> = (0..starts.max(1)).map(|_| seeder.next_u64()).collect();

    let run_one = |seed: &u64| {
        let config = config.clone().with_seed(*seed);
        Optimizer::new(config).run(layout, constraints, None)
    };

    #[cfg(feature = "parallel")]
    let outcomes: Vec<OptimizeOutcome> = {
        use rayon::prelude::*;
        seeds.par_iter().map(run_one).collect()
    };
    #[cfg(not(feature = "parallel"))]
    let outcomes: Vec<OptimizeOutcome> = seeds.iter().map(run_one).collect();

    let mut best: Option<OptimizeOutcome> = None;
    for outcome in outcomes {
        if best.as_ref().is_none_or(|b| outcome.score > b.score) {
            best = Some(outcome);
        }
    }
    match best {
        Some(outcome) => outcome,
        // `starts.max(1)` guarantees one run; keep the input as a fallback.
        None => OptimizeOutcome {
            score: evaluate(layout, constraints).score,
            layout: layout.clone(),
            stats: OptimizerStats::default(),
        },
    }
}
