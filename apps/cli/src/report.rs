//! Report tables and their JSON/Markdown rendering.

use anyhow::{Context, Result};
use loot_core::{round_for_display, DropRate, PityCurveRow};
use loot_econ::ScenarioProjection;
use loot_sim::{SimulationRow, SimulationSummary};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const JSON_FILE: &str = "lootbox_model.json";
pub const MARKDOWN_FILE: &str = "lootbox_model.md";

/// One row of the seven-column economics table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EconomicsRow {
    pub scenario: String,
    pub players: u64,
    pub opens_per_player: u64,
    pub revenue: Decimal,
    pub profit: Decimal,
    pub arpu: Decimal,
    pub ltv: Decimal,
}

impl From<&ScenarioProjection> for EconomicsRow {
    fn from(p: &ScenarioProjection) -> Self {
        Self {
            scenario: p.scenario.name.clone(),
            players: p.scenario.players,
            opens_per_player: p.scenario.opens_per_player,
            revenue: p.revenue.normalize(),
            profit: p.profit.normalize(),
            arpu: p.arpu_display(),
            ltv: p.ltv_display(),
        }
    }
}

/// All tables of one run.
#[derive(Clone, Debug, Serialize)]
pub struct ModelReport {
    pub generated_at: String,
    pub draws: u64,
    pub seed: Option<u64>,
    pub drop_rates: Vec<DropRate>,
    pub pity_policy: String,
    pub pity_tiers: Vec<String>,
    pub pity_table: Vec<PityCurveRow>,
    pub simulation: Vec<SimulationRow>,
    pub economics: Vec<EconomicsRow>,
}

impl ModelReport {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        generated_at: String,
        seed: Option<u64>,
        drop_rates: Vec<DropRate>,
        pity_policy: String,
        pity_tiers: Vec<String>,
        pity_table: Vec<PityCurveRow>,
        simulation: &SimulationSummary,
        projections: &[ScenarioProjection],
    ) -> Self {
        Self {
            generated_at,
            draws: simulation.draws(),
            seed,
            drop_rates,
            pity_policy,
            pity_tiers,
            pity_table,
            simulation: simulation.rows(),
            economics: projections.iter().map(EconomicsRow::from).collect(),
        }
    }

    /// Document view: headings, drop rates, pity rule, simulation line,
    /// economics table, then the per-attempt pity table.
    pub fn render_markdown(&self) -> String {
        let mut out = String::new();
        self.render(&mut out).expect("formatting into a String cannot fail");
        out
    }

    fn render(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "# Loot Box Drop Model\n")?;
        writeln!(out, "_Generated {}_\n", self.generated_at)?;

        writeln!(out, "## 1. Base Drop Rates\n")?;
        writeln!(out, "| Rarity | Probability |")?;
        writeln!(out, "|---|---|")?;
        for r in &self.drop_rates {
            writeln!(out, "| {} | {:.1}% |", r.tier, r.base_percent)?;
        }

        writeln!(out, "\n## 2. Pity System\n")?;
        writeln!(out, "{}", self.pity_policy)?;

        writeln!(out, "\n## 3. Simulation Results\n")?;
        writeln!(
            out,
            "Simulated {} opens; observed frequencies are listed below.\n",
            self.draws
        )?;
        writeln!(out, "| Category | Count | Percent |")?;
        writeln!(out, "|---|---|---|")?;
        for r in &self.simulation {
            writeln!(out, "| {} | {} | {:.2} |", r.tier, r.count, r.percent)?;
        }

        writeln!(out, "\n## 4. Economic Model\n")?;
        writeln!(
            out,
            "| Scenario | Players | Opens | Revenue | Profit | ARPU | LTV |"
        )?;
        writeln!(out, "|---|---|---|---|---|---|---|")?;
        for e in &self.economics {
            writeln!(
                out,
                "| {} | {} | {} | {} | {} | {:.2} | {:.2} |",
                e.scenario, e.players, e.opens_per_player, e.revenue, e.profit, e.arpu, e.ltv
            )?;
        }

        if let Some(first) = self.pity_table.first() {
            writeln!(out, "\n## Appendix: Pity Chance per Open\n")?;
            let header: Vec<&str> = first.chances.iter().map(|c| c.tier.as_str()).collect();
            writeln!(out, "| Open | {} |", header.join(" | "))?;
            writeln!(out, "|---|{}", "---|".repeat(header.len()))?;
            for row in &self.pity_table {
                let cells: Vec<String> = row
                    .chances
                    .iter()
                    .map(|c| {
                        round_for_display(c.chance_percent)
                            .map(|d| format!("{d:.2}"))
                            .unwrap_or_default()
                    })
                    .collect();
                writeln!(out, "| {} | {} |", row.attempt, cells.join(" | "))?;
            }
        }
        Ok(())
    }
}

/// Write both files under `base/stamp`, returning that directory.
pub fn write_outputs(report: &ModelReport, base: &Path, stamp: &str) -> Result<PathBuf> {
    let dir = base.join(stamp);
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    let json = serde_json::to_string_pretty(report).context("serializing report")?;
    fs::write(dir.join(JSON_FILE), json).context("writing JSON report")?;
    fs::write(dir.join(MARKDOWN_FILE), report.render_markdown())
        .context("writing Markdown report")?;
    info!(dir = %dir.display(), "report written");
    Ok(dir)
}
