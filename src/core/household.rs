use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HoldingKind {
    Asset,
    Liability,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub name: String,
    pub amount: f64,
    pub kind: HoldingKind,
}

#[derive(Copy, Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetWorthTotals {
    pub assets: f64,
    pub liabilities: f64,
    pub net_worth: f64,
}

/// Sums the snapshot: assets minus liabilities. The net worth is the starting
/// balance the projections compound from.
pub fn net_worth_totals(holdings: &[Holding]) -> NetWorthTotals {
    let assets: f64 = holdings
        .iter()
        .filter(|h| h.kind == HoldingKind::Asset)
        .map(|h| h.amount)
        .sum();
    let liabilities: f64 = holdings
        .iter()
        .filter(|h| h.kind == HoldingKind::Liability)
        .map(|h| h.amount)
        .sum();
    NetWorthTotals {
        assets,
        liabilities,
        net_worth: assets - liabilities,
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetItem {
    pub name: String,
    #[serde(default)]
    pub monthly: f64,
}

/// Monthly budget worksheet. Shock expenses are the irregular heavy hitters
/// (daycare, repairs, medical) tracked separately from routine spending.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BudgetInputs {
    pub income: Vec<BudgetItem>,
    pub fixed_expenses: Vec<BudgetItem>,
    pub variable_expenses: Vec<BudgetItem>,
    pub shock_expenses: Vec<BudgetItem>,
    pub stretch_pct: f64,
}

impl Default for BudgetInputs {
    fn default() -> Self {
        Self {
            income: Vec::new(),
            fixed_expenses: Vec::new(),
            variable_expenses: Vec::new(),
            shock_expenses: Vec::new(),
            stretch_pct: 80.0,
        }
    }
}

#[derive(Copy, Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacitySummary {
    pub total_income: f64,
    pub total_fixed: f64,
    pub total_variable: f64,
    pub total_shock: f64,
    pub monthly_surplus: f64,
    pub safe_capacity: f64,
    pub stretch_capacity: f64,
}

/// Share of a positive surplus considered safe to commit every month.
pub const SAFE_CAPACITY_SHARE: f64 = 0.65;

fn sum_items(items: &[BudgetItem]) -> f64 {
    items.iter().map(|item| item.monthly).sum()
}

/// Derives how much of the monthly surplus can go to investments. A negative
/// surplus yields zero capacity rather than a negative contribution.
pub fn investment_capacity(budget: &BudgetInputs) -> CapacitySummary {
    let total_income = sum_items(&budget.income);
    let total_fixed = sum_items(&budget.fixed_expenses);
    let total_variable = sum_items(&budget.variable_expenses);
    let total_shock = sum_items(&budget.shock_expenses);
    let monthly_surplus = total_income - total_fixed - total_variable - total_shock;

    let (safe_capacity, stretch_capacity) = if monthly_surplus > 0.0 {
        (
            monthly_surplus * SAFE_CAPACITY_SHARE,
            monthly_surplus * budget.stretch_pct / 100.0,
        )
    } else {
        (0.0, 0.0)
    };

    CapacitySummary {
        total_income,
        total_fixed,
        total_variable,
        total_shock,
        monthly_surplus,
        safe_capacity,
        stretch_capacity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn holding(name: &str, amount: f64, kind: HoldingKind) -> Holding {
        Holding {
            name: name.to_string(),
            amount,
            kind,
        }
    }

    fn item(name: &str, monthly: f64) -> BudgetItem {
        BudgetItem {
            name: name.to_string(),
            monthly,
        }
    }

    #[test]
    fn net_worth_sums_assets_minus_liabilities() {
        let holdings = vec![
            holding("Primary home", 450_000.0, HoldingKind::Asset),
            holding("Retirement accounts", 120_000.0, HoldingKind::Asset),
            holding("Cash savings", 25_000.0, HoldingKind::Asset),
            holding("Mortgage", 380_000.0, HoldingKind::Liability),
            holding("Car loan", 15_000.0, HoldingKind::Liability),
        ];
        let totals = net_worth_totals(&holdings);
        assert_approx(totals.assets, 595_000.0);
        assert_approx(totals.liabilities, 395_000.0);
        assert_approx(totals.net_worth, 200_000.0);
    }

    #[test]
    fn net_worth_of_empty_snapshot_is_zero() {
        let totals = net_worth_totals(&[]);
        assert_approx(totals.assets, 0.0);
        assert_approx(totals.liabilities, 0.0);
        assert_approx(totals.net_worth, 0.0);
    }

    #[test]
    fn capacity_splits_surplus_into_safe_and_stretch() {
        let budget = BudgetInputs {
            income: vec![item("Net pay", 7_000.0), item("Side income", 2_000.0)],
            fixed_expenses: vec![item("Mortgage", 2_500.0), item("Car", 1_100.0)],
            variable_expenses: vec![item("Groceries", 1_200.0), item("Going out", 500.0)],
            shock_expenses: vec![item("Daycare", 1_200.0)],
            stretch_pct: 80.0,
        };
        let summary = investment_capacity(&budget);
        assert_approx(summary.total_income, 9_000.0);
        assert_approx(summary.monthly_surplus, 2_500.0);
        assert_approx(summary.safe_capacity, 1_625.0);
        assert_approx(summary.stretch_capacity, 2_000.0);
    }

    #[test]
    fn capacity_floors_at_zero_when_expenses_exceed_income() {
        let budget = BudgetInputs {
            income: vec![item("Net pay", 3_000.0)],
            fixed_expenses: vec![item("Rent", 3_500.0)],
            ..BudgetInputs::default()
        };
        let summary = investment_capacity(&budget);
        assert_approx(summary.monthly_surplus, -500.0);
        assert_approx(summary.safe_capacity, 0.0);
        assert_approx(summary.stretch_capacity, 0.0);
    }

    #[test]
    fn stretch_percentage_defaults_to_eighty() {
        assert_approx(BudgetInputs::default().stretch_pct, 80.0);
    }
}
