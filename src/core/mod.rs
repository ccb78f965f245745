mod engine;
mod household;
mod solver;
mod types;

pub use engine::{
    compute_baseline, compute_rebased, compute_variance, implied_growth, project_baseline,
    project_rebased,
};
pub use household::{
    BudgetInputs, BudgetItem, CapacitySummary, Holding, HoldingKind, NetWorthTotals,
    SAFE_CAPACITY_SHARE, investment_capacity, net_worth_totals,
};
pub use solver::{
    GoalSolveConfig, GoalSolveIteration, GoalSolveResult, solve_required_monthly,
};
pub use types::{
    ActualRecord, HORIZON_YEARS, Phase, PlanStatus, SERIES_LEN, ScheduleConfig, VarianceSummary,
    YearRow, YearSchedule,
};
