use super::types::{
    ActualRecord, HORIZON_YEARS, Phase, PlanStatus, SERIES_LEN, ScheduleConfig, VarianceSummary,
    YearRow, YearSchedule,
};

impl ScheduleConfig {
    /// Resolves the phase, monthly contribution, and return rate for one plan
    /// year. Overrides win over the default banding and the global rate; unset
    /// values degrade to zero. Removing an override key restores the fallback.
    pub fn resolve(&self, year_index: u32) -> YearSchedule {
        let phase = self
            .stage_overrides
            .get(&year_index)
            .copied()
            .unwrap_or_else(|| Phase::for_year(year_index));
        let return_rate_pct = self
            .return_overrides
            .get(&year_index)
            .copied()
            .unwrap_or_else(|| self.global_return_pct.unwrap_or(0.0));
        YearSchedule {
            phase,
            monthly_contribution: self.monthly_contribution(phase),
            return_rate_pct,
        }
    }
}

/// The canonical one-year recurrence shared by the baseline and rebased paths.
/// Contributions arrive evenly through the year, so they earn roughly half the
/// annual return.
pub fn carry_forward(balance: f64, schedule: &YearSchedule) -> f64 {
    let rate = schedule.return_rate_pct / 100.0;
    let annual_contribution = schedule.monthly_contribution * 12.0;
    balance * (1.0 + rate) + annual_contribution * (1.0 + rate / 2.0)
}

/// Sparse year-indexed view over the actual records. Out-of-range indices are
/// ignored; the API boundary rejects them before they get here.
struct ActualLedger<'a> {
    by_year: [Option<&'a ActualRecord>; SERIES_LEN],
}

impl<'a> ActualLedger<'a> {
    fn new(actuals: &'a [ActualRecord]) -> Self {
        let mut by_year = [None; SERIES_LEN];
        for record in actuals {
            let idx = record.year_index as usize;
            if (1..SERIES_LEN).contains(&idx) {
                by_year[idx] = Some(record);
            }
        }
        Self { by_year }
    }

    fn end_of_year_balance(&self, year_index: u32) -> Option<f64> {
        self.by_year[year_index as usize].and_then(|r| r.end_of_year_balance)
    }

    fn invested(&self, year_index: u32) -> f64 {
        self.by_year[year_index as usize]
            .and_then(|r| r.total_invested)
            .unwrap_or(0.0)
    }
}

/// The "if nothing changes" compounding path. Never consults actual data.
pub fn project_baseline(starting_balance: f64, schedule: &ScheduleConfig) -> Vec<f64> {
    let mut series = Vec::with_capacity(SERIES_LEN);
    series.push(starting_balance);
    for year in 1..=HORIZON_YEARS {
        let prev = series[year as usize - 1];
        series.push(carry_forward(prev, &schedule.resolve(year)));
    }
    series
}

/// The reality-adjusted path: snaps to each recorded year-end balance and
/// compounds forward from the most recent known point otherwise. Once an
/// actual is recorded, later gap years stay on the corrected trajectory.
pub fn project_rebased(
    starting_balance: f64,
    schedule: &ScheduleConfig,
    actuals: &[ActualRecord],
) -> Vec<f64> {
    project_rebased_with(starting_balance, schedule, &ActualLedger::new(actuals))
}

fn project_rebased_with(
    starting_balance: f64,
    schedule: &ScheduleConfig,
    ledger: &ActualLedger<'_>,
) -> Vec<f64> {
    let mut series = Vec::with_capacity(SERIES_LEN);
    series.push(starting_balance);
    for year in 1..=HORIZON_YEARS {
        let next = match ledger.end_of_year_balance(year) {
            Some(actual) => actual,
            None => {
                let prev = series[year as usize - 1];
                carry_forward(prev, &schedule.resolve(year))
            }
        };
        series.push(next);
    }
    series
}

/// Backs out the annual growth rate implied by an actual year: the return that
/// remains once the year's own contributions are removed, using the same
/// mid-year contribution timing as the projection recurrence.
pub fn implied_growth(year_index: u32, actuals: &[ActualRecord], rebased: &[f64]) -> Option<f64> {
    implied_growth_with(year_index, &ActualLedger::new(actuals), rebased)
}

fn implied_growth_with(
    year_index: u32,
    ledger: &ActualLedger<'_>,
    rebased: &[f64],
) -> Option<f64> {
    // Year 1 has no prior year boundary other than the starting snapshot; the
    // figure is suppressed there.
    if year_index <= 1 || year_index > HORIZON_YEARS {
        return None;
    }
    let eoy = ledger.end_of_year_balance(year_index)?;
    // A gap in the records chains through the rebased path, not the original
    // projection.
    let boy = ledger
        .end_of_year_balance(year_index - 1)
        .unwrap_or(rebased[year_index as usize - 1]);
    let invested = ledger.invested(year_index);
    let denominator = boy + invested / 2.0;
    if denominator == 0.0 {
        return None;
    }
    Some((eoy - boy - invested) / denominator * 100.0)
}

fn balance_ratio(value: f64, baseline: f64) -> Option<f64> {
    if baseline != 0.0 {
        Some(value / baseline)
    } else if value == 0.0 {
        Some(1.0)
    } else {
        None
    }
}

/// Full 16-row series for the forecast view. Identical to `compute_rebased`
/// with no actual records, which is what keeps the two views from diverging.
pub fn compute_baseline(starting_balance: f64, schedule: &ScheduleConfig) -> Vec<YearRow> {
    compute_rebased(starting_balance, schedule, &[])
}

/// Full 16-row series for the actuals/outlook view: baseline and rebased
/// balances, pass-through actuals, comparison ratios, and implied growth.
pub fn compute_rebased(
    starting_balance: f64,
    schedule: &ScheduleConfig,
    actuals: &[ActualRecord],
) -> Vec<YearRow> {
    let ledger = ActualLedger::new(actuals);
    let baseline = project_baseline(starting_balance, schedule);
    let rebased = project_rebased_with(starting_balance, schedule, &ledger);

    let mut rows = Vec::with_capacity(SERIES_LEN);
    rows.push(YearRow {
        calendar_year: schedule.start_year - 1,
        year_index: 0,
        phase: None,
        return_rate_pct: 0.0,
        monthly_contribution: 0.0,
        baseline_balance: starting_balance,
        rebased_balance: starting_balance,
        actual_balance: Some(starting_balance),
        actual_vs_baseline: Some(1.0),
        rebased_vs_baseline: Some(1.0),
        implied_growth_pct: None,
    });
    for year in 1..=HORIZON_YEARS {
        let idx = year as usize;
        let sched = schedule.resolve(year);
        let actual = ledger.end_of_year_balance(year);
        rows.push(YearRow {
            calendar_year: schedule.start_year + year as i32 - 1,
            year_index: year,
            phase: Some(sched.phase),
            return_rate_pct: sched.return_rate_pct,
            monthly_contribution: sched.monthly_contribution,
            baseline_balance: baseline[idx],
            rebased_balance: rebased[idx],
            actual_balance: actual,
            actual_vs_baseline: actual.and_then(|a| balance_ratio(a, baseline[idx])),
            rebased_vs_baseline: balance_ratio(rebased[idx], baseline[idx]),
            implied_growth_pct: implied_growth_with(year, &ledger, &rebased),
        });
    }
    rows
}

/// Comparison metrics for presentation: the most recent recorded year and its
/// ahead/behind standing, plus the terminal divergence between the rebased and
/// baseline paths.
pub fn compute_variance(rows: &[YearRow]) -> VarianceSummary {
    let latest = rows
        .iter()
        .rfind(|row| row.year_index >= 1 && row.actual_balance.is_some());
    let (terminal_baseline, terminal_rebased) = rows
        .last()
        .map(|row| (row.baseline_balance, row.rebased_balance))
        .unwrap_or((0.0, 0.0));
    let terminal_variance_pct = if terminal_baseline != 0.0 {
        Some((terminal_rebased - terminal_baseline) / terminal_baseline * 100.0)
    } else if terminal_rebased == 0.0 {
        Some(0.0)
    } else {
        None
    };

    VarianceSummary {
        latest_actual_year: latest.map(|row| row.year_index),
        latest_actual_calendar_year: latest.map(|row| row.calendar_year),
        plan_status: latest.and_then(|row| row.actual_vs_baseline).map(|ratio| {
            if ratio >= 1.0 {
                PlanStatus::AheadOfPlan
            } else {
                PlanStatus::BehindPlan
            }
        }),
        terminal_baseline,
        terminal_rebased,
        terminal_variance_pct,
    }
}
