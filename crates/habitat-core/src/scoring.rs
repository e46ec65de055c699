//! Multi-criteria layout scoring.
//!
//! [`evaluate`] is a pure function of a layout and its constraints. It reads
//! placements in store order and uses no randomness, so the same inputs
//! always produce a bit-identical [`ScoreResult`].
//!
//! # Criteria
//!
//! | Criterion | Measures |
//! |-----------|----------|
//! | resource | volume and power usage against the budgets |
//! | accessibility | how central the anchor modules sit |
//! | adjacency | liked / hated neighbours within one cell |
//! | clustering | bounding-box spread of the large modules |
//! | safety | crew-area distance to the airlock |
//!
//! The weighted mean of the five is `normalized_soft`. Exceeding a budget by
//! more than 20% records a hard violation and scales the final score by 0.35.

use crate::constraints::Constraints;
use crate::layout::{LayoutStore, Placement};
use serde::{Deserialize, Serialize};

/// Usage above `budget * HARD_LIMIT_FACTOR` is a hard violation.
pub const HARD_LIMIT_FACTOR: f64 = 1.2;

/// Multiplier applied to the soft score when any hard violation exists.
pub const HARD_VIOLATION_PENALTY: f64 = 0.35;

/// Modules with more volume than this count towards clustering.
pub const LARGE_MODULE_VOLUME: f64 = 10.0;

const LIKE_BONUS: i32 = 8;
const HATE_PENALTY: i32 = 10;
const NO_ANCHOR_SCORE: u32 = 75;
const NO_CREW_SCORE: u32 = 60;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// The budget a hard violation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    PowerExcess,
    VolumeExcess,
}

/// A budget overrun that caps the score without invalidating the layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardViolation {
    pub kind: ViolationKind,
    pub message: String,
    /// The offending total.
    pub value: f64,
}

/// Every intermediate value, for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub total_volume: f64,
    pub total_power: f64,
    pub volume_ratio: f64,
    pub power_ratio: f64,
    pub volume_score: f64,
    pub power_score: f64,
    pub resource_score: u32,
    pub accessibility_score: u32,
    pub adjacency_score: u32,
    pub clustering_score: u32,
    pub safety_score: u32,
    pub normalized_soft: u32,
}

/// Output of [`evaluate`]. Recomputed on demand, never stored as state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub total_volume: f64,
    pub total_power: f64,
    pub hard_violations: Vec<HardViolation>,
    pub breakdown: ScoreBreakdown,
    /// Final score in `0..=100`.
    pub score: u32,
}

impl ScoreResult {
    pub fn has_hard_violations(&self) -> bool {
        !self.hard_violations.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Score a layout against a set of constraints.
///
/// An empty layout scores exactly 0 with every field zeroed.
pub fn evaluate(layout: &LayoutStore, constraints: &Constraints) -> ScoreResult {
    evaluate_placements(layout.placements(), constraints)
}

pub(crate) fn evaluate_placements(placements: &[Placement], constraints: &Constraints) -> ScoreResult {
    if placements.is_empty() {
        return ScoreResult::default();
    }

    let total_volume: f64 = placements.iter().map(|p| p.module.volume()).sum();
    let total_power: f64 = placements.iter().map(|p| p.module.power()).sum();

    let hard_violations = hard_violations(total_volume, total_power, constraints);

    let volume_ratio = total_volume / constraints.max_volume();
    let power_ratio = total_power / constraints.max_power();
    let volume_score = resource_curve(volume_ratio);
    let power_score = resource_curve(power_ratio);
    let resource_score = round_score(0.5 * volume_score + 0.5 * power_score);

    let adjacency_score = adjacency_score(placements, constraints);
    let accessibility_score = accessibility_score(placements, constraints);
    let clustering_score = clustering_score(placements, constraints);
    let safety_score = safety_score(placements, constraints);

    let w = constraints.weights();
    let soft = f64::from(resource_score) * w.resource
        + f64::from(accessibility_score) * w.accessibility
        + f64::from(adjacency_score) * w.adjacency
        + f64::from(clustering_score) * w.clustering
        + f64::from(safety_score) * w.safety;
    let normalized_soft = round_score(soft / w.sum());

    let capped = if hard_violations.is_empty() {
        normalized_soft
    } else {
        round_score(f64::from(normalized_soft) * HARD_VIOLATION_PENALTY)
    };
    let score = capped.min(100);

    ScoreResult {
        total_volume,
        total_power,
        hard_violations,
        breakdown: ScoreBreakdown {
            total_volume,
            total_power,
            volume_ratio,
            power_ratio,
            volume_score,
            power_score,
            resource_score,
            accessibility_score,
            adjacency_score,
            clustering_score,
            safety_score,
            normalized_soft,
        },
        score,
    }
}

/// Piecewise usage curve: 80→100 up to 60% of budget, 100→80 up to the
/// budget, then a steep fall to 0 at 150%.
pub fn resource_curve(ratio: f64) -> f64 {
    if ratio <= 0.6 {
        80.0 + 20.0 * (ratio / 0.6)
    } else if ratio <= 1.0 {
        100.0 - (ratio - 0.6) * 50.0
    } else {
        (100.0 - (ratio - 1.0) * 200.0).max(0.0)
    }
}

/// Round a non-negative score to the nearest integer, halves up.
fn round_score(value: f64) -> u32 {
    value.max(0.0).round() as u32
}

fn hard_violations(total_volume: f64, total_power: f64, constraints: &Constraints) -> Vec<HardViolation> {
    let mut violations = Vec::new();
    let power_limit = constraints.max_power() * HARD_LIMIT_FACTOR;
    if total_power > power_limit {
        violations.push(HardViolation {
            kind: ViolationKind::PowerExcess,
            message: format!("Power exceeds safe limit ({} W).", power_limit.round()),
            value: total_power,
        });
    }
    let volume_limit = constraints.max_volume() * HARD_LIMIT_FACTOR;
    if total_volume > volume_limit {
        violations.push(HardViolation {
            kind: ViolationKind::VolumeExcess,
            message: format!("Volume exceeds safe limit ({} m³).", volume_limit.round()),
            value: total_volume,
        });
    }
    violations
}

fn adjacency_score(placements: &[Placement], constraints: &Constraints) -> u32 {
    let affinities = constraints.affinities();
    if affinities.is_empty() {
        return 100;
    }

    let likes = |a: &Placement, b: &Placement| {
        affinities
            .get(a.key())
            .is_some_and(|aff| aff.likes.contains(b.key()))
    };
    let hates = |a: &Placement, b: &Placement| {
        affinities
            .get(a.key())
            .is_some_and(|aff| aff.hates.contains(b.key()))
    };

    // Bonus and penalty clamp after every pair, so pair order matters.
    let mut score: i32 = 100;
    for (i, a) in placements.iter().enumerate() {
        for b in &placements[i + 1..] {
            if a.position.manhattan_distance(&b.position) > 1 {
                continue;
            }
            if likes(a, b) || likes(b, a) {
                score = (score + LIKE_BONUS).min(100);
            }
            if hates(a, b) || hates(b, a) {
                score = (score - HATE_PENALTY).max(0);
            }
        }
    }
    score as u32
}

fn accessibility_score(placements: &[Placement], constraints: &Constraints) -> u32 {
    let anchors: Vec<&Placement> = placements
        .iter()
        .filter(|p| constraints.is_anchor(p.key()))
        .collect();
    if anchors.is_empty() {
        return NO_ANCHOR_SCORE;
    }

    let grid = constraints.grid();
    let (cx, cy) = grid.center();
    let avg_dist = anchors
        .iter()
        .map(|p| p.position.manhattan_distance_to_point(cx, cy))
        .sum::<f64>()
        / anchors.len() as f64;
    let max_possible = f64::from(grid.cols) + f64::from(grid.rows);
    round_score(100.0 - (avg_dist / max_possible) * 120.0)
}

fn clustering_score(placements: &[Placement], constraints: &Constraints) -> u32 {
    let mut large = placements
        .iter()
        .filter(|p| p.module.volume() > LARGE_MODULE_VOLUME)
        .map(|p| p.position);
    let Some(first) = large.next() else {
        return 100;
    };

    let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x, first.x, first.y, first.y);
    let mut count = 1;
    for pos in large {
        min_x = min_x.min(pos.x);
        max_x = max_x.max(pos.x);
        min_y = min_y.min(pos.y);
        max_y = max_y.max(pos.y);
        count += 1;
    }
    if count <= 1 {
        return 100;
    }

    let bbox_area = (f64::from(max_x) - f64::from(min_x) + 1.0) * (f64::from(max_y) - f64::from(min_y) + 1.0);
    let spread = bbox_area / constraints.grid().cell_count() as f64;
    round_score(100.0 - (1.0 - spread) * 50.0)
}

fn safety_score(placements: &[Placement], constraints: &Constraints) -> u32 {
    let Some(airlock_key) = constraints.airlock_key() else {
        return 100;
    };
    let Some(airlock) = placements.iter().find(|p| p.key() == airlock_key) else {
        return 0;
    };

    let distances: Vec<f64> = placements
        .iter()
        .filter(|p| constraints.is_crew(p.key()))
        .map(|p| p.position.manhattan_distance(&airlock.position) as f64)
        .collect();
    if distances.is_empty() {
        return NO_CREW_SCORE;
    }

    let avg = distances.iter().sum::<f64>() / distances.len() as f64;
    round_score(100.0 - avg * 5.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ModuleType;
    use crate::constraints::{Affinity, Weights};
    use crate::grid::{GridPosition, GridSize, Rotation};
    use crate::layout::PlacementId;
    use std::sync::Arc;

    fn module(key: &str, volume: f64, power: f64) -> Arc<ModuleType> {
        Arc::new(ModuleType::new(key, key, volume, power, 1, 1).unwrap())
    }

    fn layout_with(items: &[(Arc<ModuleType>, i32, i32)]) -> LayoutStore {
        let mut layout = LayoutStore::new(GridSize::new(16, 12));
        for (m, x, y) in items {
            layout
                .place(m.clone(), GridPosition::new(*x, *y), Rotation::None)
                .unwrap();
        }
        layout
    }

    // -----------------------------------------------------------------------
    // Empty layout / curve
    // -----------------------------------------------------------------------

    #[test]
    fn empty_layout_scores_zero() {
        let layout = LayoutStore::new(GridSize::new(16, 12));
        let result = evaluate(&layout, &Constraints::default());
        assert_eq!(result, ScoreResult::default());
        assert_eq!(result.score, 0);
        assert_eq!(result.breakdown.safety_score, 0);
    }

    #[test]
    fn resource_curve_breakpoints() {
        assert_eq!(resource_curve(0.0), 80.0);
        assert_eq!(resource_curve(0.6), 100.0);
        assert!((resource_curve(1.0) - 80.0).abs() < 1e-9);
        assert!((resource_curve(1.2) - 60.0).abs() < 1e-9);
        assert_eq!(resource_curve(1.5), 0.0);
        assert_eq!(resource_curve(3.0), 0.0);
    }

    // -----------------------------------------------------------------------
    // Resource + hard violations
    // -----------------------------------------------------------------------

    #[test]
    fn volume_at_sixty_percent_scores_full() {
        let layout = layout_with(&[(module("tank", 360.0, 0.0), 0, 0)]);
        let result = evaluate(&layout, &Constraints::default());

        assert_eq!(result.breakdown.volume_ratio, 0.6);
        assert_eq!(result.breakdown.volume_score, 100.0);
        assert_eq!(result.breakdown.power_score, 80.0);
        assert_eq!(result.breakdown.resource_score, 90);
        assert!(result.hard_violations.is_empty());
        // 90*.30 + 75*.25 + 100*.20 + 100*.15 + 100*.10 = 90.75
        assert_eq!(result.breakdown.normalized_soft, 91);
        assert_eq!(result.score, 91);
    }

    #[test]
    fn volume_overrun_is_hard_violation() {
        let layout = layout_with(&[(module("tank", 750.0, 0.0), 0, 0)]);
        let result = evaluate(&layout, &Constraints::default());

        assert_eq!(result.hard_violations.len(), 1);
        let v = &result.hard_violations[0];
        assert_eq!(v.kind, ViolationKind::VolumeExcess);
        assert_eq!(v.message, "Volume exceeds safe limit (720 m³).");
        assert_eq!(v.value, 750.0);

        // resource = round((50 + 80) / 2) = 65; soft = 83.25 -> 83
        assert_eq!(result.breakdown.resource_score, 65);
        assert_eq!(result.breakdown.normalized_soft, 83);
        assert_eq!(result.score, 29);
        assert!(f64::from(result.score) <= f64::from(result.breakdown.normalized_soft) * 0.35 + 0.5);
    }

    #[test]
    fn exactly_at_limit_is_not_a_violation() {
        let layout = layout_with(&[(module("reactor", 0.0, 360.0), 0, 0)]);
        let result = evaluate(&layout, &Constraints::default());
        assert!(!result.has_hard_violations());

        let layout = layout_with(&[(module("reactor", 0.0, 361.0), 0, 0)]);
        let result = evaluate(&layout, &Constraints::default());
        assert_eq!(result.hard_violations[0].kind, ViolationKind::PowerExcess);
        assert_eq!(result.hard_violations[0].message, "Power exceeds safe limit (360 W).");
    }

    // -----------------------------------------------------------------------
    // Adjacency
    // -----------------------------------------------------------------------

    #[test]
    fn adjacency_fixed_without_affinities() {
        let layout = layout_with(&[(module("sleep", 4.0, 5.0), 0, 0), (module("gym", 12.0, 30.0), 1, 0)]);
        let result = evaluate(&layout, &Constraints::default());
        assert_eq!(result.breakdown.adjacency_score, 100);
    }

    #[test]
    fn adjacency_applies_in_pair_order() {
        let constraints = Constraints::builder()
            .affinity("sleep", Affinity::new(["medical"], ["gym"]))
            .build()
            .unwrap();
        let layout = layout_with(&[
            (module("sleep", 4.0, 5.0), 0, 0),
            (module("medical", 8.0, 20.0), 1, 0),
            (module("gym", 12.0, 30.0), 0, 1),
        ]);
        // +8 capped at 100, then -10.
        assert_eq!(evaluate(&layout, &constraints).breakdown.adjacency_score, 90);

        let reordered = layout_with(&[
            (module("gym", 12.0, 30.0), 0, 1),
            (module("sleep", 4.0, 5.0), 0, 0),
            (module("medical", 8.0, 20.0), 1, 0),
        ]);
        // -10 first, then +8.
        assert_eq!(evaluate(&reordered, &constraints).breakdown.adjacency_score, 98);
    }

    #[test]
    fn adjacency_checks_both_directions() {
        let constraints = Constraints::builder()
            .affinity("gym", Affinity::new(Vec::<String>::new(), ["sleep"]))
            .build()
            .unwrap();
        let layout = layout_with(&[(module("sleep", 4.0, 5.0), 3, 3), (module("gym", 12.0, 30.0), 3, 4)]);
        assert_eq!(evaluate(&layout, &constraints).breakdown.adjacency_score, 90);
    }

    // -----------------------------------------------------------------------
    // Accessibility
    // -----------------------------------------------------------------------

    #[test]
    fn accessibility_without_anchors() {
        let layout = layout_with(&[(module("storage", 6.0, 2.0), 0, 0)]);
        assert_eq!(evaluate(&layout, &Constraints::default()).breakdown.accessibility_score, 75);
    }

    #[test]
    fn accessibility_from_center_distance() {
        let centered = layout_with(&[(module("medical", 8.0, 20.0), 8, 6)]);
        assert_eq!(evaluate(&centered, &Constraints::default()).breakdown.accessibility_score, 100);

        // distance 14 of 28 -> 100 - 60
        let corner = layout_with(&[(module("medical", 8.0, 20.0), 0, 0)]);
        assert_eq!(evaluate(&corner, &Constraints::default()).breakdown.accessibility_score, 40);

        // mean of 0 and 14 -> 100 - 30
        let both = layout_with(&[(module("medical", 8.0, 20.0), 8, 6), (module("galley", 10.0, 40.0), 0, 0)]);
        assert_eq!(evaluate(&both, &Constraints::default()).breakdown.accessibility_score, 70);
    }

    // -----------------------------------------------------------------------
    // Clustering
    // -----------------------------------------------------------------------

    #[test]
    fn clustering_trivial_with_one_large_module() {
        let layout = layout_with(&[(module("lab", 16.0, 35.0), 0, 0), (module("sleep", 4.0, 5.0), 9, 9)]);
        assert_eq!(evaluate(&layout, &Constraints::default()).breakdown.clustering_score, 100);
    }

    #[test]
    fn clustering_from_bounding_box() {
        let layout = layout_with(&[(module("lab", 16.0, 35.0), 0, 0), (module("gym", 12.0, 30.0), 3, 2)]);
        // bbox 4x3 = 12 of 192 cells -> 100 - 0.9375 * 50 = 53.125
        assert_eq!(evaluate(&layout, &Constraints::default()).breakdown.clustering_score, 53);
    }

    // -----------------------------------------------------------------------
    // Safety
    // -----------------------------------------------------------------------

    #[test]
    fn safety_cases() {
        let with_airlock = Constraints::builder().airlock_key(Some("airlock")).build().unwrap();

        let no_key = layout_with(&[(module("sleep", 4.0, 5.0), 0, 0)]);
        assert_eq!(evaluate(&no_key, &Constraints::default()).breakdown.safety_score, 100);

        assert_eq!(evaluate(&no_key, &with_airlock).breakdown.safety_score, 0);

        let no_crew = layout_with(&[(module("airlock", 10.0, 25.0), 0, 0)]);
        assert_eq!(evaluate(&no_crew, &with_airlock).breakdown.safety_score, 60);

        let crew = layout_with(&[(module("airlock", 10.0, 25.0), 0, 0), (module("sleep", 4.0, 5.0), 5, 0)]);
        assert_eq!(evaluate(&crew, &with_airlock).breakdown.safety_score, 75);
    }

    #[test]
    fn safety_with_crew_far_from_airlock_bottoms_out() {
        let constraints = Constraints::builder().airlock_key(Some("airlock")).build().unwrap();
        let at = |id: u64, key: &str, x: i32, y: i32| Placement {
            id: PlacementId(id),
            module: module(key, 1.0, 1.0),
            position: GridPosition::new(x, y),
            rotation: Rotation::None,
        };
        // Each distance is about 4e9, so their sum does not fit in 32 bits.
        let placements = [
            at(1, "airlock", 2_000_000_000, 2_000_000_000),
            at(2, "sleep", -100, 0),
            at(3, "sleep", -100, 1),
        ];
        assert_eq!(safety_score(&placements, &constraints), 0);
    }

    // -----------------------------------------------------------------------
    // Combination
    // -----------------------------------------------------------------------

    #[test]
    fn weights_are_normalized() {
        let layout = layout_with(&[(module("tank", 360.0, 0.0), 0, 0)]);
        let only_accessibility = Weights {
            resource: 0.0,
            accessibility: 2.0,
            adjacency: 0.0,
            clustering: 0.0,
            safety: 0.0,
        };
        let constraints = Constraints::builder().weights(only_accessibility).build().unwrap();
        assert_eq!(evaluate(&layout, &constraints).score, 75);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let constraints = Constraints::builder()
            .affinity("sleep", Affinity::new(["medical"], ["gym"]))
            .airlock_key(Some("airlock"))
            .build()
            .unwrap();
        let layout = layout_with(&[
            (module("airlock", 10.0, 25.0), 0, 0),
            (module("sleep", 4.0, 5.0), 3, 1),
            (module("medical", 8.0, 20.0), 4, 1),
            (module("lab", 16.0, 35.0), 10, 7),
        ]);
        let a = evaluate(&layout, &constraints);
        let b = evaluate(&layout, &constraints);
        assert_eq!(a, b);
        assert_eq!(a.breakdown.volume_ratio.to_bits(), b.breakdown.volume_ratio.to_bits());
    }
}
