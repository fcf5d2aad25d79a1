//! Pity escalation curve.
//!
//! A pity policy guarantees a tier within `threshold` attempts. The chance of
//! that tier rises linearly from its base probability by `(100 - base) / T`
//! per attempt and is pinned to 100% from attempt `T` onward. Tiers without a
//! policy keep their base chance. The curve is a closed-form schedule over the
//! attempt index; it does not track actual draw outcomes.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ConfigurationError, RarityModel};

/// Attempt count at which a tier is guaranteed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PityPolicy {
    /// Name of the tier this policy escalates.
    pub rarity: String,
    /// Attempt index (1-based) at which the chance reaches 100%.
    pub threshold: u32,
}

impl PityPolicy {
    pub fn new(rarity: impl Into<String>, threshold: u32) -> Self {
        Self {
            rarity: rarity.into(),
            threshold,
        }
    }
}

/// Chance of one tier at a given attempt, in percent (unrounded).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TierChance {
    /// Tier name.
    pub tier: String,
    /// Chance of this tier at the row's attempt, in percent.
    pub chance_percent: f64,
}

/// All tier chances for one attempt index.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PityCurveRow {
    /// 1-based attempt index.
    pub attempt: u32,
    /// Chances in tier order.
    pub chances: Vec<TierChance>,
}

impl PityCurveRow {
    pub fn chance(&self, tier: &str) -> Option<f64> {
        self.chances
            .iter()
            .find(|c| c.tier == tier)
            .map(|c| c.chance_percent)
    }
}

#[derive(Clone, Copy, Debug)]
enum Schedule {
    Flat,
    Escalating { threshold: u32, increment: f64 },
}

#[derive(Clone, Debug)]
struct TierSchedule {
    name: String,
    base: f64,
    schedule: Schedule,
}

impl TierSchedule {
    fn chance_at(&self, attempt: u32) -> f64 {
        match self.schedule {
            Schedule::Flat => self.base,
            Schedule::Escalating { threshold, .. } if attempt >= threshold => 100.0,
            Schedule::Escalating { increment, .. } => {
                (self.base + increment * f64::from(attempt - 1)).min(100.0)
            }
        }
    }
}

/// Produces the per-attempt chance table for a rarity model and its policies.
#[derive(Clone, Debug)]
pub struct PityCurveGenerator {
    tiers: Vec<TierSchedule>,
    max_threshold: u32,
}

impl PityCurveGenerator {
    /// Attach pity policies to a model.
    ///
    /// # Errors
    /// [`ConfigurationError::NonPositiveThreshold`] for a zero threshold,
    /// [`ConfigurationError::UnknownTier`] when a policy names a tier the model
    /// lacks and [`ConfigurationError::DuplicatePolicy`] when a tier has two.
    pub fn new(model: &RarityModel, policies: &[PityPolicy]) -> Result<Self, ConfigurationError> {
        let mut tiers: Vec<TierSchedule> = model
            .tiers()
            .iter()
            .map(|t| TierSchedule {
                name: t.name.clone(),
                base: t.base_probability_percent,
                schedule: Schedule::Flat,
            })
            .collect();
        let mut max_threshold = 0;
        for p in policies {
            if p.threshold == 0 {
                return Err(ConfigurationError::NonPositiveThreshold {
                    tier: p.rarity.clone(),
                });
            }
            let idx = model
                .index_of(&p.rarity)
                .ok_or_else(|| ConfigurationError::UnknownTier(p.rarity.clone()))?;
            let tier = &mut tiers[idx];
            if let Schedule::Escalating { .. } = tier.schedule {
                return Err(ConfigurationError::DuplicatePolicy(p.rarity.clone()));
            }
            tier.schedule = Schedule::Escalating {
                threshold: p.threshold,
                increment: (100.0 - tier.base) / f64::from(p.threshold),
            };
            max_threshold = max_threshold.max(p.threshold);
        }
        debug!(policies = policies.len(), max_threshold, "pity curve configured");
        Ok(Self {
            tiers,
            max_threshold,
        })
    }

    /// Largest threshold among all policies, 0 when there are none.
    pub fn max_threshold(&self) -> u32 {
        self.max_threshold
    }

    /// Whether the named tier has a pity policy.
    pub fn is_pity_eligible(&self, tier: &str) -> bool {
        self.tiers
            .iter()
            .any(|t| t.name == tier && matches!(t.schedule, Schedule::Escalating { .. }))
    }

    /// Names of the escalating tiers, in tier order.
    pub fn pity_tiers(&self) -> impl Iterator<Item = &str> + '_ {
        self.tiers
            .iter()
            .filter(|t| matches!(t.schedule, Schedule::Escalating { .. }))
            .map(|t| t.name.as_str())
    }

    /// Unrounded chance for `tier` at a 1-based `attempt`.
    ///
    /// Returns `None` for an unknown tier or `attempt == 0`.
    pub fn chance(&self, tier: &str, attempt: u32) -> Option<f64> {
        if attempt == 0 {
            return None;
        }
        self.tiers
            .iter()
            .find(|t| t.name == tier)
            .map(|t| t.chance_at(attempt))
    }

    /// The table for attempts `1..=max_threshold`.
    pub fn generate(&self) -> Vec<PityCurveRow> {
        self.generate_through(self.max_threshold)
    }

    /// The table for attempts `1..=attempts`, which may run past the largest
    /// threshold.
    pub fn generate_through(&self, attempts: u32) -> Vec<PityCurveRow> {
        (1..=attempts)
            .map(|attempt| PityCurveRow {
                attempt,
                chances: self
                    .tiers
                    .iter()
                    .map(|t| TierChance {
                        tier: t.name.clone(),
                        chance_percent: t.chance_at(attempt),
                    })
                    .collect(),
            })
            .collect()
    }

    /// One-line summary of the guarantees, e.g.
    /// "Guaranteed Rare within 10 opens, Epic within 50 opens. Chance rises linearly to 100%."
    pub fn describe_policies(&self) -> String {
        let parts: Vec<String> = self
            .tiers
            .iter()
            .filter_map(|t| match t.schedule {
                Schedule::Escalating { threshold, .. } => {
                    Some(format!("{} within {} opens", t.name, threshold))
                }
                Schedule::Flat => None,
            })
            .collect();
        if parts.is_empty() {
            return "No pity guarantees; every tier keeps its base chance.".to_string();
        }
        format!(
            "Guaranteed {}. Chance rises linearly to 100%.",
            parts.join(", ")
        )
    }
}

/// Build the full pity table for a model, attempts `1..=max threshold`.
pub fn generate_pity_table(
    model: &RarityModel,
    policies: &[PityPolicy],
) -> Result<Vec<PityCurveRow>, ConfigurationError> {
    Ok(PityCurveGenerator::new(model, policies)?.generate())
}
