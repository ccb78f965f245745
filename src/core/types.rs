use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Planning horizon in years; year index 0 is the starting snapshot.
pub const HORIZON_YEARS: u32 = 15;

pub const SERIES_LEN: usize = (HORIZON_YEARS + 1) as usize;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Foundation,
    Discipline,
    Velocity,
}

impl Phase {
    /// Default banding when no stage override pins the year.
    pub fn for_year(year_index: u32) -> Phase {
        match year_index {
            0..=3 => Phase::Foundation,
            4..=8 => Phase::Discipline,
            _ => Phase::Velocity,
        }
    }

    pub fn from_number(n: u8) -> Option<Phase> {
        match n {
            1 => Some(Phase::Foundation),
            2 => Some(Phase::Discipline),
            3 => Some(Phase::Velocity),
            _ => None,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Phase::Foundation => 1,
            Phase::Discipline => 2,
            Phase::Velocity => 3,
        }
    }

    pub fn index(self) -> usize {
        (self.number() - 1) as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Foundation => "Foundation",
            Phase::Discipline => "Discipline",
            Phase::Velocity => "Velocity",
        }
    }
}

/// User-editable contribution and return assumptions for the 15-year plan.
/// Percentages are whole numbers: 8 means 8% and is divided by 100 at the
/// single point where the recurrence applies it.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScheduleConfig {
    pub start_year: i32,
    pub phase_monthly: [Option<f64>; 3],
    pub global_return_pct: Option<f64>,
    pub stage_overrides: BTreeMap<u32, Phase>,
    pub return_overrides: BTreeMap<u32, f64>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            start_year: 2026,
            phase_monthly: [None; 3],
            global_return_pct: None,
            stage_overrides: BTreeMap::new(),
            return_overrides: BTreeMap::new(),
        }
    }
}

impl ScheduleConfig {
    pub fn monthly_contribution(&self, phase: Phase) -> f64 {
        self.phase_monthly[phase.index()].unwrap_or(0.0)
    }
}

/// Resolved assumptions for a single plan year.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct YearSchedule {
    pub phase: Phase,
    pub monthly_contribution: f64,
    pub return_rate_pct: f64,
}

/// One user-entered year-end observation. A record without an end-of-year
/// balance carries no actual data for projection purposes, even when the
/// invested amount is filled in.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActualRecord {
    pub year_index: u32,
    pub total_invested: Option<f64>,
    pub end_of_year_balance: Option<f64>,
    #[serde(default)]
    pub notes: String,
}

/// One computed row of the 16-row plan table (year 0 is the start anchor).
/// Balances keep full f64 precision; rounding to whole currency units is a
/// presentation concern.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearRow {
    pub calendar_year: i32,
    pub year_index: u32,
    pub phase: Option<Phase>,
    pub return_rate_pct: f64,
    pub monthly_contribution: f64,
    pub baseline_balance: f64,
    pub rebased_balance: f64,
    pub actual_balance: Option<f64>,
    pub actual_vs_baseline: Option<f64>,
    pub rebased_vs_baseline: Option<f64>,
    pub implied_growth_pct: Option<f64>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlanStatus {
    AheadOfPlan,
    BehindPlan,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VarianceSummary {
    pub latest_actual_year: Option<u32>,
    pub latest_actual_calendar_year: Option<i32>,
    pub plan_status: Option<PlanStatus>,
    pub terminal_baseline: f64,
    pub terminal_rebased: f64,
    pub terminal_variance_pct: Option<f64>,
}
