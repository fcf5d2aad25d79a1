#![deny(warnings)]

//! Economic projections for loot-box usage scenarios.
//!
//! For each scenario:
//! - revenue = players × opens per player × unit price
//! - profit = revenue × margin rate
//! - ARPU = revenue / players
//! - LTV = ARPU × retention multiplier
//!
//! All amounts are exact decimals; ARPU and LTV are rounded only for display.

use loot_core::{ConfigurationError, InvalidParameterError, LootError, DISPLAY_DECIMALS};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Model parameters shared by all scenarios.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EconomicParams {
    /// Price of one open.
    pub unit_price: Decimal,
    /// Share of revenue kept as profit.
    pub margin_rate: Decimal,
    /// LTV as a multiple of ARPU.
    pub retention_multiplier: Decimal,
}

impl Default for EconomicParams {
    fn default() -> Self {
        Self {
            unit_price: Decimal::new(2, 0),
            margin_rate: Decimal::new(5, 1),
            retention_multiplier: Decimal::new(3, 0),
        }
    }
}

impl EconomicParams {
    /// Reject negative parameters.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let fields = [
            ("unit_price", self.unit_price),
            ("margin_rate", self.margin_rate),
            ("retention_multiplier", self.retention_multiplier),
        ];
        for (name, value) in fields {
            if value < Decimal::ZERO {
                return Err(ConfigurationError::NegativeParameter { name });
            }
        }
        Ok(())
    }
}

/// A named usage scenario.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomicScenario {
    /// Display name, e.g. "Optimistic".
    pub name: String,
    /// Paying players in the scenario (> 0).
    pub players: u64,
    /// Loot boxes opened by each player.
    pub opens_per_player: u64,
}

impl EconomicScenario {
    pub fn new(name: impl Into<String>, players: u64, opens_per_player: u64) -> Self {
        Self {
            name: name.into(),
            players,
            opens_per_player,
        }
    }
}

/// Optimistic, average and pessimistic reference scenarios.
pub fn default_scenarios() -> Vec<EconomicScenario> {
    vec![
        EconomicScenario::new("Optimistic", 10_000, 20),
        EconomicScenario::new("Average", 5_000, 15),
        EconomicScenario::new("Pessimistic", 2_000, 10),
    ]
}

/// A scenario together with its projected figures.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScenarioProjection {
    pub scenario: EconomicScenario,
    pub revenue: Decimal,
    pub profit: Decimal,
    pub arpu: Decimal,
    pub ltv: Decimal,
}

impl ScenarioProjection {
    /// ARPU rounded half-even to two decimals.
    pub fn arpu_display(&self) -> Decimal {
        display(self.arpu)
    }

    /// LTV rounded half-even to two decimals.
    pub fn ltv_display(&self) -> Decimal {
        display(self.ltv)
    }
}

fn display(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DISPLAY_DECIMALS, RoundingStrategy::MidpointNearestEven)
}

/// Project one scenario.
///
/// # Errors
/// [`InvalidParameterError::NonPositivePlayers`] when `players == 0` and
/// [`InvalidParameterError::Overflow`] if an amount exceeds the decimal range.
pub fn project_scenario(
    scenario: &EconomicScenario,
    params: &EconomicParams,
) -> Result<ScenarioProjection, InvalidParameterError> {
    if scenario.players == 0 {
        return Err(InvalidParameterError::NonPositivePlayers {
            scenario: scenario.name.clone(),
        });
    }
    let overflow = || InvalidParameterError::Overflow {
        scenario: scenario.name.clone(),
    };
    let players = Decimal::from(scenario.players);
    let revenue = players
        .checked_mul(Decimal::from(scenario.opens_per_player))
        .and_then(|v| v.checked_mul(params.unit_price))
        .ok_or_else(overflow)?;
    let profit = revenue
        .checked_mul(params.margin_rate)
        .ok_or_else(overflow)?;
    let arpu = revenue.checked_div(players).ok_or_else(overflow)?;
    let ltv = arpu
        .checked_mul(params.retention_multiplier)
        .ok_or_else(overflow)?;
    Ok(ScenarioProjection {
        scenario: scenario.clone(),
        revenue,
        profit,
        arpu,
        ltv,
    })
}

/// Project every scenario, in order.
pub fn project_economics(
    scenarios: &[EconomicScenario],
    params: &EconomicParams,
) -> Result<Vec<ScenarioProjection>, LootError> {
    params.validate()?;
    let out = scenarios
        .iter()
        .map(|s| project_scenario(s, params))
        .collect::<Result<Vec<_>, _>>()?;
    debug!(scenarios = out.len(), "economic projection finished");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn project(name: &str, players: u64, opens: u64) -> ScenarioProjection {
        project_scenario(
            &EconomicScenario::new(name, players, opens),
            &EconomicParams::default(),
        )
        .unwrap()
    }

    #[test]
    fn optimistic_reference_values() {
        let p = project("Optimistic", 10_000, 20);
        assert_eq!(p.revenue, Decimal::new(400_000, 0));
        assert_eq!(p.profit, Decimal::new(200_000, 0));
        assert_eq!(p.arpu_display(), Decimal::new(4000, 2));
        assert_eq!(p.ltv_display(), Decimal::new(12000, 2));
    }

    #[test]
    fn pessimistic_reference_values() {
        let p = project("Pessimistic", 2_000, 10);
        assert_eq!(p.revenue, Decimal::new(40_000, 0));
        assert_eq!(p.profit, Decimal::new(20_000, 0));
        assert_eq!(p.arpu_display(), Decimal::new(2000, 2));
        assert_eq!(p.ltv_display(), Decimal::new(6000, 2));
    }

    #[test]
    fn default_scenarios_project_in_order() {
        let out = project_economics(&default_scenarios(), &EconomicParams::default()).unwrap();
        let names: Vec<_> = out.iter().map(|p| p.scenario.name.as_str()).collect();
        assert_eq!(names, ["Optimistic", "Average", "Pessimistic"]);
        assert_eq!(out[1].revenue, Decimal::new(150_000, 0));
        assert_eq!(out[1].ltv, Decimal::new(90, 0));
    }

    #[test]
    fn zero_players_rejected() {
        let err = project_economics(
            &[EconomicScenario::new("Empty", 0, 10)],
            &EconomicParams::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            LootError::InvalidParameter(InvalidParameterError::NonPositivePlayers {
                scenario: "Empty".into()
            })
        );
    }

    #[test]
    fn negative_params_rejected() {
        let params = EconomicParams {
            margin_rate: Decimal::new(-1, 1),
            ..EconomicParams::default()
        };
        assert_eq!(
            project_economics(&default_scenarios(), &params).unwrap_err(),
            LootError::Configuration(ConfigurationError::NegativeParameter {
                name: "margin_rate"
            })
        );
    }

    #[test]
    fn alternative_params() {
        let params = EconomicParams {
            unit_price: Decimal::new(199, 2),
            margin_rate: Decimal::new(3, 1),
            retention_multiplier: Decimal::new(5, 0),
        };
        let p = project_scenario(&EconomicScenario::new("Promo", 3, 1), &params).unwrap();
        assert_eq!(p.revenue, Decimal::new(597, 2));
        assert_eq!(p.profit, Decimal::new(1791, 3));
        assert_eq!(p.arpu, Decimal::new(199, 2));
        assert_eq!(p.ltv_display(), Decimal::new(995, 2));
    }

    #[test]
    fn display_rounds_half_even() {
        let params = EconomicParams {
            unit_price: Decimal::new(125, 3),
            ..EconomicParams::default()
        };
        // revenue of 1 spread over eight players
        let p = project_scenario(&EconomicScenario::new("Thin", 8, 1), &params).unwrap();
        assert_eq!(p.revenue, Decimal::ONE);
        assert_eq!(p.arpu, Decimal::new(125, 3));
        assert_eq!(p.ltv, Decimal::new(375, 3));
        assert_eq!(p.arpu_display(), Decimal::new(12, 2));
        assert_eq!(p.ltv_display(), Decimal::new(38, 2));
    }

    #[test]
    fn overflow_is_reported() {
        let params = EconomicParams {
            unit_price: Decimal::MAX,
            ..EconomicParams::default()
        };
        let err = project_scenario(&EconomicScenario::new("Huge", u64::MAX, u64::MAX), &params)
            .unwrap_err();
        assert!(matches!(err, InvalidParameterError::Overflow { .. }));
    }

    #[test]
    fn params_roundtrip_json() {
        let s = serde_json::to_string(&EconomicParams::default()).unwrap();
        let back: EconomicParams = serde_json::from_str(&s).unwrap();
        assert_eq!(back, EconomicParams::default());
    }

    proptest! {
        #[test]
        fn revenue_scales_linearly(players in 1u64..1_000_000, opens in 0u64..1_000) {
            let p = project("Prop", players, opens);
            prop_assert_eq!(p.revenue, Decimal::from(players * opens * 2));
            prop_assert_eq!(p.profit, Decimal::from(players * opens));
            prop_assert_eq!(p.arpu, Decimal::from(opens * 2));
            prop_assert_eq!(p.ltv, Decimal::from(opens * 6));
        }
    }
}
