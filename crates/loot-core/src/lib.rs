#![deny(warnings)]

//! Core domain models and invariants for the loot-box reward model.
//!
//! This crate defines the rarity tiers and their validated base distribution,
//! the pity escalation curve, and the error taxonomy shared by the simulation
//! and economics crates.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::debug;

mod pity;

pub use pity::{generate_pity_table, PityCurveGenerator, PityCurveRow, PityPolicy, TierChance};

/// Allowed absolute deviation of the summed base probabilities from 100.
pub const PROBABILITY_EPSILON: f64 = 1e-6;

/// Number of decimals kept when values are rendered for reports.
pub const DISPLAY_DECIMALS: u32 = 2;

/// Invalid model configuration. The model cannot be constructed.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigurationError {
    /// The tier list is empty.
    #[error("rarity model must define at least one tier")]
    NoTiers,
    /// A tier name is empty or whitespace.
    #[error("rarity tier name must not be blank")]
    BlankTierName,
    /// Two tiers share a name.
    #[error("duplicate rarity tier: {0}")]
    DuplicateTier(String),
    /// Probability is negative, NaN or infinite.
    #[error("probability for {tier} must be finite and >= 0, got {value}")]
    InvalidProbability { tier: String, value: f64 },
    /// Base probabilities do not form a distribution over 100%.
    #[error("base probabilities sum to {sum}, expected 100")]
    ProbabilitySum { sum: f64 },
    /// Pity threshold must be a positive attempt count.
    #[error("pity threshold for {tier} must be > 0")]
    NonPositiveThreshold { tier: String },
    /// A pity policy refers to a tier the model does not have.
    #[error("unknown rarity tier: {0}")]
    UnknownTier(String),
    /// A tier has more than one pity policy.
    #[error("rarity {0} has more than one pity policy")]
    DuplicatePolicy(String),
    /// Economic model parameter is negative.
    #[error("economic parameter {name} must be >= 0")]
    NegativeParameter { name: &'static str },
}

/// A caller-supplied argument is out of range for a single operation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidParameterError {
    /// Draw count must be at least one.
    #[error("number of draws must be > 0")]
    NonPositiveDrawCount,
    /// Partitioned simulation needs at least one worker.
    #[error("number of partitions must be > 0")]
    NonPositivePartitions,
    /// ARPU is undefined without players.
    #[error("scenario {scenario} must have at least one player")]
    NonPositivePlayers { scenario: String },
    /// Decimal arithmetic overflowed.
    #[error("projection for scenario {scenario} overflowed")]
    Overflow { scenario: String },
}

/// Any failure surfaced by the loot model crates.
#[derive(Debug, Error, PartialEq)]
pub enum LootError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    InvalidParameter(#[from] InvalidParameterError),
}

/// A named reward category with its base drop chance in percent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RarityTier {
    /// Display name, e.g. "Legendary".
    pub name: String,
    /// Base probability in percent, in [0, 100].
    pub base_probability_percent: f64,
}

impl RarityTier {
    /// Tier with the given name and base chance in percent.
    pub fn new(name: impl Into<String>, base_probability_percent: f64) -> Self {
        Self {
            name: name.into(),
            base_probability_percent,
        }
    }
}

/// One row of the drop-rate table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DropRate {
    /// Tier name.
    pub tier: String,
    /// Base probability in percent.
    pub base_percent: f64,
}

/// Validated, ordered set of rarity tiers whose probabilities sum to 100.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RarityModel {
    tiers: Vec<RarityTier>,
}

impl RarityModel {
    /// Build a model from tiers in display order.
    ///
    /// # Errors
    /// [`ConfigurationError`] if the list is empty, a name is blank or repeated,
    /// a probability is negative or non-finite, or the total is not 100 ± ε.
    pub fn new<I>(tiers: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = RarityTier>,
    {
        let tiers: Vec<RarityTier> = tiers.into_iter().collect();
        if tiers.is_empty() {
            return Err(ConfigurationError::NoTiers);
        }
        let mut seen = BTreeSet::new();
        let mut sum = 0.0f64;
        for t in &tiers {
            if t.name.trim().is_empty() {
                return Err(ConfigurationError::BlankTierName);
            }
            if !seen.insert(t.name.as_str()) {
                return Err(ConfigurationError::DuplicateTier(t.name.clone()));
            }
            let p = t.base_probability_percent;
            if !p.is_finite() || p < 0.0 {
                return Err(ConfigurationError::InvalidProbability {
                    tier: t.name.clone(),
                    value: p,
                });
            }
            sum += p;
        }
        if (sum - 100.0).abs() > PROBABILITY_EPSILON {
            return Err(ConfigurationError::ProbabilitySum { sum });
        }
        debug!(tiers = tiers.len(), "rarity model validated");
        Ok(Self { tiers })
    }

    /// Convenience constructor from `(name, percent)` pairs.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        Self::new(pairs.into_iter().map(|(n, p)| RarityTier::new(n, p)))
    }

    /// Build the rarity part of a [`ModelConfig`].
    pub fn from_config(cfg: &ModelConfig) -> Result<Self, ConfigurationError> {
        Self::new(cfg.rarities.iter().cloned())
    }

    /// Tiers in configuration order.
    pub fn tiers(&self) -> &[RarityTier] {
        &self.tiers
    }

    /// Number of tiers.
    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    /// Always false for a constructed model.
    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Position of a tier by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.tiers.iter().position(|t| t.name == name)
    }

    /// Base probability in percent for the named tier.
    pub fn base_probability(&self, name: &str) -> Option<f64> {
        self.tiers
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.base_probability_percent)
    }

    /// Sampling categories with their weights, in tier order.
    pub fn weights(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.tiers
            .iter()
            .map(|t| (t.name.as_str(), t.base_probability_percent))
    }

    /// The drop-rate table: `(tier, base percent)` in tier order.
    pub fn drop_rates(&self) -> Vec<DropRate> {
        self.tiers
            .iter()
            .map(|t| DropRate {
                tier: t.name.clone(),
                base_percent: t.base_probability_percent,
            })
            .collect()
    }
}

/// Rarity and pity configuration for one model run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Tiers in display order.
    pub rarities: Vec<RarityTier>,
    /// Pity thresholds for the escalating tiers. Absent means every tier is flat.
    #[serde(default)]
    pub pity: Vec<PityPolicy>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            rarities: vec![
                RarityTier::new("Common", 60.0),
                RarityTier::new("Rare", 25.0),
                RarityTier::new("Epic", 10.0),
                RarityTier::new("Legendary", 5.0),
            ],
            pity: vec![
                PityPolicy::new("Rare", 10),
                PityPolicy::new("Epic", 50),
                PityPolicy::new("Legendary", 200),
            ],
        }
    }
}

/// Round a value to [`DISPLAY_DECIMALS`] places, half to even.
///
/// Only for presentation; returns `None` for NaN or infinite input.
pub fn round_for_display(value: f64) -> Option<Decimal> {
    Decimal::from_f64(value).map(|d| {
        d.round_dp_with_strategy(DISPLAY_DECIMALS, RoundingStrategy::MidpointNearestEven)
    })
}
