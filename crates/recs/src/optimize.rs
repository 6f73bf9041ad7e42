//! Parameter Optimizer
//!
//! Black-box minimization over the full recommender parameter vector.
//! Seeded random exploration followed by Gaussian perturbation of the
//! incumbent; the objective is the negated validation NDCG, so lower
//! is better. Parameter vectors that break the event-weight ordering
//! are rejected with a constant penalty before the objective runs.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::feedback::EventWeights;

/// Objective value assigned to infeasible parameter vectors. Any
/// feasible vector scores at most 0.0 (negated NDCG), so the penalty
/// never wins.
pub const CONSTRAINT_PENALTY: f32 = 1.0;

const ORDERING_EPSILON: f32 = 1e-6;

/// One complete parameter vector for an evaluation trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialParams {
    pub view_weight: f32,
    pub add_to_cart_weight: f32,
    pub wishlist_weight: f32,
    pub purchase_weight: f32,
    pub hybrid_alpha: f32,
    pub cold_start_threshold: u32,
    pub frequency_decay: f32,
    pub final_hybrid_threshold: f32,
    pub cosine_threshold: f32,
    pub top_k: usize,
    pub top_n: usize,
    pub min_alpha_floor: f32,
}

impl TrialParams {
    pub fn weights(&self) -> EventWeights {
        EventWeights {
            view: self.view_weight,
            add_to_cart: self.add_to_cart_weight,
            wishlist: self.wishlist_weight,
            purchase: self.purchase_weight,
        }
    }

    /// Event weights must reflect increasing commitment:
    /// view < wishlist < add_to_cart < purchase.
    pub fn satisfies_ordering(&self) -> bool {
        self.view_weight + ORDERING_EPSILON < self.wishlist_weight
            && self.wishlist_weight + ORDERING_EPSILON < self.add_to_cart_weight
            && self.add_to_cart_weight + ORDERING_EPSILON < self.purchase_weight
    }
}

impl Default for TrialParams {
    fn default() -> Self {
        Self {
            view_weight: 0.15,
            add_to_cart_weight: 0.5,
            wishlist_weight: 0.3,
            purchase_weight: 1.0,
            hybrid_alpha: 0.7,
            cold_start_threshold: 5,
            frequency_decay: 0.1,
            final_hybrid_threshold: 0.1,
            cosine_threshold: 0.1,
            top_k: 10,
            top_n: 10,
            min_alpha_floor: 0.1,
        }
    }
}

/// Bounded search space. Purchase weight is fixed at 1.0 and anchors
/// the ordering constraint.
#[derive(Debug, Clone, Copy)]
pub struct SearchSpace {
    pub view_weight: (f32, f32),
    pub add_to_cart_weight: (f32, f32),
    pub wishlist_weight: (f32, f32),
    pub hybrid_alpha: (f32, f32),
    pub cold_start_threshold: (u32, u32),
    pub frequency_decay: (f32, f32),
    pub final_hybrid_threshold: (f32, f32),
    pub cosine_threshold: (f32, f32),
    pub top_k: (usize, usize),
    pub top_n: (usize, usize),
    pub min_alpha_floor: (f32, f32),
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self {
            view_weight: (0.1, 0.2),
            add_to_cart_weight: (0.2, 0.7),
            wishlist_weight: (0.1, 0.4),
            hybrid_alpha: (0.0, 1.0),
            cold_start_threshold: (1, 20),
            frequency_decay: (0.01, 0.5),
            final_hybrid_threshold: (0.0, 0.5),
            cosine_threshold: (0.0, 1.0),
            top_k: (5, 100),
            top_n: (5, 10),
            min_alpha_floor: (0.0, 0.5),
        }
    }
}

impl SearchSpace {
    /// Uniform sample from every dimension.
    pub fn sample(&self, rng: &mut StdRng) -> TrialParams {
        TrialParams {
            view_weight: rng.gen_range(self.view_weight.0..=self.view_weight.1),
            add_to_cart_weight: rng
                .gen_range(self.add_to_cart_weight.0..=self.add_to_cart_weight.1),
            wishlist_weight: rng.gen_range(self.wishlist_weight.0..=self.wishlist_weight.1),
            purchase_weight: 1.0,
            hybrid_alpha: rng.gen_range(self.hybrid_alpha.0..=self.hybrid_alpha.1),
            cold_start_threshold: rng
                .gen_range(self.cold_start_threshold.0..=self.cold_start_threshold.1),
            frequency_decay: rng.gen_range(self.frequency_decay.0..=self.frequency_decay.1),
            final_hybrid_threshold: rng
                .gen_range(self.final_hybrid_threshold.0..=self.final_hybrid_threshold.1),
            cosine_threshold: rng.gen_range(self.cosine_threshold.0..=self.cosine_threshold.1),
            top_k: rng.gen_range(self.top_k.0..=self.top_k.1),
            top_n: rng.gen_range(self.top_n.0..=self.top_n.1),
            min_alpha_floor: rng.gen_range(self.min_alpha_floor.0..=self.min_alpha_floor.1),
        }
    }

    /// Gaussian perturbation of the incumbent, sigma at 10% of each
    /// dimension's range, clamped back into bounds.
    pub fn perturb(&self, base: &TrialParams, rng: &mut StdRng) -> TrialParams {
        let jitter = |rng: &mut StdRng, value: f32, (lo, hi): (f32, f32)| {
            let sigma = (hi - lo) * 0.1;
            (value + sample_normal(rng) * sigma).clamp(lo, hi)
        };
        let jitter_int = |rng: &mut StdRng, value: f32, lo: f32, hi: f32| {
            let sigma = (hi - lo) * 0.1;
            (value + sample_normal(rng) * sigma).round().clamp(lo, hi)
        };
        TrialParams {
            view_weight: jitter(rng, base.view_weight, self.view_weight),
            add_to_cart_weight: jitter(rng, base.add_to_cart_weight, self.add_to_cart_weight),
            wishlist_weight: jitter(rng, base.wishlist_weight, self.wishlist_weight),
            purchase_weight: 1.0,
            hybrid_alpha: jitter(rng, base.hybrid_alpha, self.hybrid_alpha),
            cold_start_threshold: jitter_int(
                rng,
                base.cold_start_threshold as f32,
                self.cold_start_threshold.0 as f32,
                self.cold_start_threshold.1 as f32,
            ) as u32,
            frequency_decay: jitter(rng, base.frequency_decay, self.frequency_decay),
            final_hybrid_threshold: jitter(
                rng,
                base.final_hybrid_threshold,
                self.final_hybrid_threshold,
            ),
            cosine_threshold: jitter(rng, base.cosine_threshold, self.cosine_threshold),
            top_k: jitter_int(rng, base.top_k as f32, self.top_k.0 as f32, self.top_k.1 as f32)
                as usize,
            top_n: jitter_int(rng, base.top_n as f32, self.top_n.0 as f32, self.top_n.1 as f32)
                as usize,
            min_alpha_floor: jitter(rng, base.min_alpha_floor, self.min_alpha_floor),
        }
    }
}

// Standard normal via Box-Muller.
fn sample_normal(rng: &mut StdRng) -> f32 {
    let u1: f32 = rng.gen_range(f32::EPSILON..1.0);
    let u2: f32 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos()
}

#[derive(Debug, Clone)]
pub struct Optimizer {
    pub space: SearchSpace,
    /// Total candidate vectors considered, feasible or not.
    pub n_calls: usize,
    /// Pure-exploration trials before perturbation starts.
    pub n_initial: usize,
    pub seed: u64,
}

impl Default for Optimizer {
    fn default() -> Self {
        Self {
            space: SearchSpace::default(),
            n_calls: 50,
            n_initial: 10,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationOutcome {
    pub best: TrialParams,
    /// Best objective value (negated NDCG; lower is better).
    pub best_objective: f32,
    /// Times the objective actually ran (excludes fast rejects).
    pub evaluations: usize,
}

impl Optimizer {
    /// Minimize `objective` over the search space.
    ///
    /// Infeasible vectors receive [`CONSTRAINT_PENALTY`] without
    /// invoking the objective. The search is deterministic for a
    /// given seed.
    pub fn minimize<F>(&self, objective: F) -> OptimizationOutcome
    where
        F: Fn(&TrialParams) -> f32,
    {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<(TrialParams, f32)> = None;
        let mut evaluations = 0;

        for call in 0..self.n_calls {
            let candidate = match &best {
                Some((incumbent, _)) if call >= self.n_initial => {
                    self.space.perturb(incumbent, &mut rng)
                }
                _ => self.space.sample(&mut rng),
            };

            let value = if candidate.satisfies_ordering() {
                evaluations += 1;
                objective(&candidate)
            } else {
                CONSTRAINT_PENALTY
            };
            debug!(call, value, "optimizer trial");

            let improved = best.as_ref().map_or(true, |(_, b)| value < *b);
            if improved {
                best = Some((candidate, value));
            }
        }

        let (best, best_objective) =
            best.unwrap_or_else(|| (TrialParams::default(), CONSTRAINT_PENALTY));
        info!(best_objective, evaluations, "optimization finished");
        OptimizationOutcome {
            best,
            best_objective,
            evaluations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn ordering_constraint_checks_all_three_inequalities() {
        let mut params = TrialParams::default();
        assert!(params.satisfies_ordering());
        params.wishlist_weight = params.add_to_cart_weight;
        assert!(!params.satisfies_ordering());
        params.wishlist_weight = 0.05;
        assert!(!params.satisfies_ordering());
    }

    #[test]
    fn infeasible_vectors_never_reach_the_objective() {
        // Bounds forcing wishlist above add_to_cart: every sample is
        // infeasible.
        let space = SearchSpace {
            add_to_cart_weight: (0.2, 0.25),
            wishlist_weight: (0.3, 0.4),
            ..SearchSpace::default()
        };
        let optimizer = Optimizer {
            space,
            n_calls: 20,
            n_initial: 5,
            seed: 7,
        };
        let calls = AtomicUsize::new(0);
        let outcome = optimizer.minimize(|_| {
            calls.fetch_add(1, Ordering::SeqCst);
            0.0
        });
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(outcome.evaluations, 0);
        assert_eq!(outcome.best_objective, CONSTRAINT_PENALTY);
    }

    #[test]
    fn sampled_params_stay_in_bounds() {
        let space = SearchSpace::default();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..200 {
            let p = space.sample(&mut rng);
            assert!(p.view_weight >= 0.1 && p.view_weight <= 0.2);
            assert!(p.top_k >= 5 && p.top_k <= 100);
            assert!(p.top_n >= 5 && p.top_n <= 10);
            assert_eq!(p.purchase_weight, 1.0);
        }
    }

    #[test]
    fn perturbed_params_stay_in_bounds() {
        let space = SearchSpace::default();
        let mut rng = StdRng::seed_from_u64(2);
        let base = space.sample(&mut rng);
        for _ in 0..200 {
            let p = space.perturb(&base, &mut rng);
            assert!(p.hybrid_alpha >= 0.0 && p.hybrid_alpha <= 1.0);
            assert!(p.cold_start_threshold >= 1 && p.cold_start_threshold <= 20);
            assert!(p.frequency_decay >= 0.01 && p.frequency_decay <= 0.5);
        }
    }

    #[test]
    fn search_is_deterministic_for_a_seed() {
        let optimizer = Optimizer::default();
        let objective = |p: &TrialParams| -p.hybrid_alpha;
        let a = optimizer.minimize(objective);
        let b = optimizer.minimize(objective);
        assert_eq!(a.best, b.best);
        assert_eq!(a.best_objective, b.best_objective);
    }

    #[test]
    fn minimizer_keeps_the_lowest_objective() {
        let optimizer = Optimizer {
            n_calls: 30,
            ..Optimizer::default()
        };
        let outcome = optimizer.minimize(|p| -p.hybrid_alpha);
        assert!(outcome.best_objective <= 0.0);
        assert!((outcome.best_objective + outcome.best.hybrid_alpha).abs() < 1e-6);
    }
}
