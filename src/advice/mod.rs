use std::fmt::Write as _;

use thiserror::Error;

use crate::core::{Holding, HoldingKind, Phase, ScheduleConfig, net_worth_totals};

#[derive(Error, Debug)]
pub enum AdviceError {
    #[error("no advice backend is configured")]
    Unconfigured,
    #[error("advice backend failed: {0}")]
    Backend(String),
}

/// Text-generation collaborator. The server is handed an implementation at
/// startup; the crate ships only the explicit "not configured" one.
pub trait AdviceGenerator {
    fn generate(&self, prompt: &str) -> Result<String, AdviceError>;
}

pub struct UnconfiguredAdvisor;

impl AdviceGenerator for UnconfiguredAdvisor {
    fn generate(&self, _prompt: &str) -> Result<String, AdviceError> {
        Err(AdviceError::Unconfigured)
    }
}

/// Renders the holdings and schedule into the request text for the advice
/// backend. Plain prose plus a bullet list; the backend is asked for a
/// Markdown report.
pub fn build_advice_prompt(holdings: &[Holding], schedule: &ScheduleConfig) -> String {
    let totals = net_worth_totals(holdings);

    let mut prompt = String::new();
    prompt.push_str(
        "Act as a family wealth advisor. Review the following household finances:\n\n",
    );

    prompt.push_str("Holdings:\n");
    if holdings.is_empty() {
        prompt.push_str("- (none recorded)\n");
    }
    for holding in holdings {
        let kind = match holding.kind {
            HoldingKind::Asset => "asset",
            HoldingKind::Liability => "liability",
        };
        let _ = writeln!(prompt, "- {}: ${:.0} ({kind})", holding.name, holding.amount);
    }

    let _ = writeln!(
        prompt,
        "\nTotals: assets ${:.0}, liabilities ${:.0}, net worth ${:.0}.",
        totals.assets, totals.liabilities, totals.net_worth
    );
    if totals.assets > 0.0 {
        let _ = writeln!(
            prompt,
            "Debt-to-asset ratio: {:.2}.",
            totals.liabilities / totals.assets
        );
    }

    let _ = writeln!(
        prompt,
        "\nContribution schedule starting {}: {}",
        schedule.start_year,
        [Phase::Foundation, Phase::Discipline, Phase::Velocity]
            .map(|phase| format!(
                "{} ${:.0}/mo",
                phase.label(),
                schedule.monthly_contribution(phase)
            ))
            .join(", ")
    );
    let _ = writeln!(
        prompt,
        "Assumed annual return: {}%.",
        schedule.global_return_pct.unwrap_or(0.0)
    );

    prompt.push_str(
        "\nWrite a concise wealth control report in Markdown covering:\n\
         1. Health check: net worth and debt-to-asset standing.\n\
         2. Risk: concentration in any single holding or category.\n\
         3. Growth: whether the contribution schedule fits the stated goal.\n\
         4. Liabilities: how to prioritise the debts.\n\
         Keep it professional but encouraging.\n",
    );

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedAdvisor;

    impl AdviceGenerator for CannedAdvisor {
        fn generate(&self, prompt: &str) -> Result<String, AdviceError> {
            Ok(format!("ok: {} chars", prompt.len()))
        }
    }

    fn sample_holdings() -> Vec<Holding> {
        vec![
            Holding {
                name: "Brokerage".to_string(),
                amount: 320_000.0,
                kind: HoldingKind::Asset,
            },
            Holding {
                name: "Mortgage".to_string(),
                amount: 80_000.0,
                kind: HoldingKind::Liability,
            },
        ]
    }

    fn sample_schedule() -> ScheduleConfig {
        ScheduleConfig {
            phase_monthly: [Some(3_000.0), Some(1_500.0), Some(4_000.0)],
            global_return_pct: Some(8.0),
            ..ScheduleConfig::default()
        }
    }

    #[test]
    fn prompt_includes_holdings_totals_and_schedule() {
        let prompt = build_advice_prompt(&sample_holdings(), &sample_schedule());

        assert!(prompt.contains("Brokerage: $320000 (asset)"));
        assert!(prompt.contains("Mortgage: $80000 (liability)"));
        assert!(prompt.contains("net worth $240000"));
        assert!(prompt.contains("Debt-to-asset ratio: 0.25."));
        assert!(prompt.contains("Foundation $3000/mo"));
        assert!(prompt.contains("Assumed annual return: 8%."));
    }

    #[test]
    fn prompt_omits_debt_ratio_without_assets() {
        let holdings = vec![Holding {
            name: "Credit card".to_string(),
            amount: 4_000.0,
            kind: HoldingKind::Liability,
        }];
        let prompt = build_advice_prompt(&holdings, &sample_schedule());
        assert!(!prompt.contains("Debt-to-asset"));
    }

    #[test]
    fn unconfigured_advisor_refuses() {
        let err = UnconfiguredAdvisor
            .generate("anything")
            .expect_err("must refuse");
        assert!(matches!(err, AdviceError::Unconfigured));
    }

    #[test]
    fn custom_advisor_receives_the_prompt() {
        let prompt = build_advice_prompt(&sample_holdings(), &sample_schedule());
        let reply = CannedAdvisor.generate(&prompt).expect("generate");
        assert!(reply.starts_with("ok: "));
    }
}
