#![deny(warnings)]

//! Monte Carlo draw simulation over a rarity model's base distribution.
//!
//! Every draw is an independent weighted categorical sample using the base
//! probabilities only; the pity curve is not consulted. Counts per tier are
//! therefore Binomial(N, p_tier) and converge to the base percentages.
//!
//! The draw loop is a map-reduce over per-tier counts, so large runs can be
//! split across rayon workers with [`DrawSimulator::simulate_partitioned`].

use loot_core::{
    round_for_display, ConfigurationError, InvalidParameterError, LootError, RarityModel,
};
use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

/// Number of hits for one tier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TierCount {
    /// Tier name.
    pub tier: String,
    /// Draws that landed on this tier.
    pub count: u64,
}

/// One reporting row: count plus percentage rounded for display.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulationRow {
    /// Tier name.
    pub tier: String,
    /// Draws that landed on this tier.
    pub count: u64,
    /// Share of all draws in percent, two decimals.
    pub percent: Decimal,
}

/// Aggregated outcome of a batch of draws.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SimulationSummary {
    draws: u64,
    tiers: Vec<TierCount>,
}

impl SimulationSummary {
    fn from_counts(names: &[String], counts: Vec<u64>) -> Self {
        let tiers: Vec<TierCount> = names
            .iter()
            .zip(counts)
            .map(|(tier, count)| TierCount {
                tier: tier.clone(),
                count,
            })
            .collect();
        let draws = tiers.iter().map(|t| t.count).sum();
        Self { draws, tiers }
    }

    /// Total number of draws.
    pub fn draws(&self) -> u64 {
        self.draws
    }

    /// Counts in tier order.
    pub fn tiers(&self) -> &[TierCount] {
        &self.tiers
    }

    /// Hits for `tier`, `None` if the tier is unknown.
    pub fn count(&self, tier: &str) -> Option<u64> {
        self.tiers.iter().find(|t| t.tier == tier).map(|t| t.count)
    }

    /// Share of draws for `tier` in percent, unrounded.
    pub fn percent(&self, tier: &str) -> Option<f64> {
        self.count(tier).map(|c| self.share(c))
    }

    /// `(tier, percent)` pairs in tier order, unrounded.
    pub fn percentages(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.tiers
            .iter()
            .map(|t| (t.tier.as_str(), self.share(t.count)))
    }

    /// Rows for the simulation results table.
    pub fn rows(&self) -> Vec<SimulationRow> {
        self.tiers
            .iter()
            .map(|t| SimulationRow {
                tier: t.tier.clone(),
                count: t.count,
                percent: round_for_display(self.share(t.count)).unwrap_or(Decimal::ZERO),
            })
            .collect()
    }

    /// Add the counts of another batch. Tiers are matched by name; tiers only
    /// present in `other` are appended.
    pub fn merge(&mut self, other: &SimulationSummary) {
        for t in &other.tiers {
            match self.tiers.iter_mut().find(|s| s.tier == t.tier) {
                Some(s) => s.count += t.count,
                None => self.tiers.push(t.clone()),
            }
        }
        self.draws += other.draws;
    }

    fn share(&self, count: u64) -> f64 {
        if self.draws == 0 {
            return 0.0;
        }
        count as f64 / self.draws as f64 * 100.0
    }
}

/// Weighted sampler over a model's tiers.
#[derive(Clone, Debug)]
pub struct DrawSimulator {
    names: Vec<String>,
    sampler: WeightedIndex<f64>,
}

impl DrawSimulator {
    /// Build the sampler from the model's base probabilities.
    pub fn new(model: &RarityModel) -> Result<Self, ConfigurationError> {
        let sampler = WeightedIndex::new(model.weights().map(|(_, w)| w)).map_err(|_| {
            ConfigurationError::ProbabilitySum {
                sum: model.weights().map(|(_, w)| w).sum(),
            }
        })?;
        let names = model.tiers().iter().map(|t| t.name.clone()).collect();
        Ok(Self { names, sampler })
    }

    /// Tier names in sampling order.
    pub fn tier_names(&self) -> &[String] {
        &self.names
    }

    /// One draw; returns the tier index.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        self.sampler.sample(rng)
    }

    /// Run `draws` independent draws with the given RNG.
    ///
    /// # Errors
    /// [`InvalidParameterError::NonPositiveDrawCount`] when `draws == 0`.
    pub fn simulate<R: Rng + ?Sized>(
        &self,
        draws: u64,
        rng: &mut R,
    ) -> Result<SimulationSummary, InvalidParameterError> {
        if draws == 0 {
            return Err(InvalidParameterError::NonPositiveDrawCount);
        }
        let summary = SimulationSummary::from_counts(&self.names, self.tally(draws, rng));
        debug!(draws, "simulation finished");
        Ok(summary)
    }

    /// Run with a ChaCha8 generator seeded from `seed`, or from entropy when
    /// `seed` is `None`.
    pub fn simulate_seeded(
        &self,
        draws: u64,
        seed: Option<u64>,
    ) -> Result<SimulationSummary, InvalidParameterError> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed.unwrap_or_else(rand::random));
        self.simulate(draws, &mut rng)
    }

    /// Split `draws` across `partitions` rayon workers and sum the counts.
    ///
    /// Worker `i` uses ChaCha8 stream `i` of the shared seed, so the result is
    /// reproducible for a fixed `(seed, partitions)`. With one partition the
    /// output equals [`simulate_seeded`](Self::simulate_seeded). `partitions`
    /// is capped at `draws`.
    pub fn simulate_partitioned(
        &self,
        draws: u64,
        seed: Option<u64>,
        partitions: usize,
    ) -> Result<SimulationSummary, InvalidParameterError> {
        if draws == 0 {
            return Err(InvalidParameterError::NonPositiveDrawCount);
        }
        if partitions == 0 {
            return Err(InvalidParameterError::NonPositivePartitions);
        }
        let base_seed = seed.unwrap_or_else(rand::random);
        // no partition runs empty
        let parts = (partitions as u64).min(draws);
        let chunk = draws / parts;
        let rem = draws % parts;
        let width = self.names.len();
        let counts = (0..parts)
            .into_par_iter()
            .map(|i| {
                let mut rng = ChaCha8Rng::seed_from_u64(base_seed);
                rng.set_stream(i);
                self.tally(chunk + u64::from(i < rem), &mut rng)
            })
            .reduce(
                || vec![0u64; width],
                |mut acc, part| {
                    for (a, p) in acc.iter_mut().zip(part) {
                        *a += p;
                    }
                    acc
                },
            );
        debug!(draws, partitions, "partitioned simulation finished");
        Ok(SimulationSummary::from_counts(&self.names, counts))
    }

    fn tally<R: Rng + ?Sized>(&self, draws: u64, rng: &mut R) -> Vec<u64> {
        let mut counts = vec![0u64; self.names.len()];
        for _ in 0..draws {
            counts[self.draw(rng)] += 1;
        }
        counts
    }
}

/// Simulate `draws` draws from the model's base weights.
pub fn simulate_draws(
    model: &RarityModel,
    draws: u64,
    seed: Option<u64>,
) -> Result<SimulationSummary, LootError> {
    let sim = DrawSimulator::new(model)?;
    Ok(sim.simulate_seeded(draws, seed)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use loot_core::ModelConfig;
    use proptest::prelude::*;

    fn model() -> RarityModel {
        RarityModel::from_config(&ModelConfig::default()).unwrap()
    }

    #[test]
    fn zero_draws_rejected() {
        let m = model();
        assert_eq!(
            simulate_draws(&m, 0, Some(1)).unwrap_err(),
            LootError::InvalidParameter(InvalidParameterError::NonPositiveDrawCount)
        );
        let sim = DrawSimulator::new(&m).unwrap();
        assert!(sim.simulate_partitioned(0, Some(1), 4).is_err());
        assert_eq!(
            sim.simulate_partitioned(10, Some(1), 0).unwrap_err(),
            InvalidParameterError::NonPositivePartitions
        );
    }

    #[test]
    fn converges_to_base_rates() {
        let m = model();
        let summary = simulate_draws(&m, 1_000_000, Some(42)).unwrap();
        assert_eq!(summary.draws(), 1_000_000);
        for (tier, pct) in summary.percentages() {
            let base = m.base_probability(tier).unwrap();
            assert!((pct - base).abs() < 0.5, "{tier}: {pct} vs {base}");
        }
    }

    #[test]
    fn counts_within_binomial_bounds() {
        let m = model();
        let n = 20_000u64;
        let summary = simulate_draws(&m, n, Some(7)).unwrap();
        for (tier, base) in m.weights() {
            let p = base / 100.0;
            let mean = n as f64 * p;
            let sd = (n as f64 * p * (1.0 - p)).sqrt();
            let c = summary.count(tier).unwrap() as f64;
            assert!((c - mean).abs() < 5.0 * sd, "{tier}: {c} vs {mean}");
        }
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let m = model();
        let a = simulate_draws(&m, 10_000, Some(99)).unwrap();
        let b = simulate_draws(&m, 10_000, Some(99)).unwrap();
        let c = simulate_draws(&m, 10_000, Some(100)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn partitioned_matches_contract() {
        let sim = DrawSimulator::new(&model()).unwrap();
        let a = sim.simulate_partitioned(100_003, Some(5), 8).unwrap();
        let b = sim.simulate_partitioned(100_003, Some(5), 8).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.tiers().iter().map(|t| t.count).sum::<u64>(), 100_003);
        for (tier, pct) in a.percentages() {
            let base = model().base_probability(tier).unwrap();
            assert!((pct - base).abs() < 1.0, "{tier}: {pct} vs {base}");
        }
    }

    #[test]
    fn single_partition_equals_sequential() {
        let sim = DrawSimulator::new(&model()).unwrap();
        let seq = sim.simulate_seeded(5_000, Some(11)).unwrap();
        let par = sim.simulate_partitioned(5_000, Some(11), 1).unwrap();
        assert_eq!(seq, par);
    }

    #[test]
    fn more_partitions_than_draws() {
        let sim = DrawSimulator::new(&model()).unwrap();
        let s = sim.simulate_partitioned(3, Some(1), 16).unwrap();
        assert_eq!(s.draws(), 3);
        // surplus partitions are dropped, so this matches three partitions
        assert_eq!(s, sim.simulate_partitioned(3, Some(1), 3).unwrap());
        let huge = sim.simulate_partitioned(3, Some(1), 2_000_000).unwrap();
        assert_eq!(huge, s);
    }

    #[test]
    fn singleton_model_always_hits() {
        let m = RarityModel::from_pairs([("Only", 100.0)]).unwrap();
        let s = simulate_draws(&m, 1_000, None).unwrap();
        assert_eq!(s.count("Only"), Some(1_000));
        assert_eq!(s.rows()[0].percent, Decimal::new(10000, 2));
    }

    #[test]
    fn zero_weight_tier_never_drawn() {
        let m = RarityModel::from_pairs([("A", 100.0), ("Never", 0.0)]).unwrap();
        let s = simulate_draws(&m, 5_000, Some(3)).unwrap();
        assert_eq!(s.count("Never"), Some(0));
    }

    #[test]
    fn merge_adds_counts() {
        let sim = DrawSimulator::new(&model()).unwrap();
        let mut a = sim.simulate_seeded(1_000, Some(1)).unwrap();
        let b = sim.simulate_seeded(2_000, Some(2)).unwrap();
        let common = a.count("Common").unwrap() + b.count("Common").unwrap();
        a.merge(&b);
        assert_eq!(a.draws(), 3_000);
        assert_eq!(a.count("Common"), Some(common));
    }

    proptest! {
        #[test]
        fn counts_sum_to_draws(n in 1u64..5_000, seed in any::<u64>()) {
            let s = simulate_draws(&model(), n, Some(seed)).unwrap();
            prop_assert_eq!(s.tiers().iter().map(|t| t.count).sum::<u64>(), n);
            let total: f64 = s.percentages().map(|(_, p)| p).sum();
            prop_assert!((total - 100.0).abs() < 1e-9);
        }
    }
}
