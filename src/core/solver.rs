use serde::Serialize;

use super::{SERIES_LEN, ScheduleConfig, project_baseline};

#[derive(Debug, Clone, Copy)]
pub struct GoalSolveConfig {
    pub target_terminal_balance: f64,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSolveIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_monthly: f64,
    pub terminal_balance: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSolveResult {
    pub target_terminal_balance: f64,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
    pub solved_monthly: Option<f64>,
    pub achieved_terminal_balance: Option<f64>,
    pub iterations: Vec<GoalSolveIteration>,
    pub converged: bool,
    pub feasible: bool,
    pub message: String,
}

/// Finds the flat monthly contribution, applied to all three phases, whose
/// baseline year-15 balance meets the target. The terminal balance is
/// monotonic in the contribution, so bisection converges.
pub fn solve_required_monthly(
    starting_balance: f64,
    schedule: &ScheduleConfig,
    config: GoalSolveConfig,
) -> Result<GoalSolveResult, String> {
    validate_config(starting_balance, config)?;

    let mut iterations = Vec::with_capacity(config.max_iterations as usize);
    let low_terminal = evaluate_candidate(starting_balance, schedule, config.search_min);
    let high_terminal = evaluate_candidate(starting_balance, schedule, config.search_max);

    let mut solved_monthly = None;
    let mut converged = false;
    let feasible;
    let message;

    if low_terminal >= config.target_terminal_balance {
        solved_monthly = Some(config.search_min);
        converged = true;
        feasible = true;
        message = "Already meets the target at the lower contribution bound.".to_string();
    } else if high_terminal < config.target_terminal_balance {
        feasible = false;
        message = "No feasible contribution found within the search bounds.".to_string();
    } else {
        let mut lo = config.search_min;
        let mut hi = config.search_max;
        let mut it = 0;
        while it < config.max_iterations {
            it += 1;
            let mid = (lo + hi) * 0.5;
            let terminal = evaluate_candidate(starting_balance, schedule, mid);
            iterations.push(GoalSolveIteration {
                iteration: it,
                lower_bound: lo,
                upper_bound: hi,
                candidate_monthly: mid,
                terminal_balance: terminal,
            });

            if terminal >= config.target_terminal_balance {
                hi = mid;
            } else {
                lo = mid;
            }

            if (hi - lo).abs() <= config.tolerance {
                converged = true;
                solved_monthly = Some(hi);
                break;
            }
        }
        if solved_monthly.is_none() {
            solved_monthly = Some(hi);
        }
        feasible = true;
        message = if converged {
            "Solved required monthly contribution.".to_string()
        } else {
            "Reached max iterations before tolerance was met; returning best estimate.".to_string()
        };
    }

    let achieved_terminal_balance =
        solved_monthly.map(|monthly| evaluate_candidate(starting_balance, schedule, monthly));

    Ok(GoalSolveResult {
        target_terminal_balance: config.target_terminal_balance,
        search_min: config.search_min,
        search_max: config.search_max,
        tolerance: config.tolerance,
        max_iterations: config.max_iterations,
        solved_monthly,
        achieved_terminal_balance,
        iterations,
        converged,
        feasible,
        message,
    })
}

fn evaluate_candidate(starting_balance: f64, schedule: &ScheduleConfig, monthly: f64) -> f64 {
    let candidate = ScheduleConfig {
        phase_monthly: [Some(monthly.max(0.0)); 3],
        ..schedule.clone()
    };
    project_baseline(starting_balance, &candidate)[SERIES_LEN - 1]
}

fn validate_config(starting_balance: f64, config: GoalSolveConfig) -> Result<(), String> {
    if !starting_balance.is_finite() {
        return Err("starting balance must be finite".to_string());
    }
    if !config.target_terminal_balance.is_finite() {
        return Err("target_terminal_balance must be finite".to_string());
    }
    if !config.search_min.is_finite() || !config.search_max.is_finite() {
        return Err("search bounds must be finite".to_string());
    }
    if config.search_min < 0.0 {
        return Err("search_min must be >= 0".to_string());
    }
    if config.search_max <= config.search_min {
        return Err("search_max must be greater than search_min".to_string());
    }
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return Err("tolerance must be > 0".to_string());
    }
    if config.max_iterations == 0 {
        return Err("max_iterations must be > 0".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn zero_return_schedule() -> ScheduleConfig {
        ScheduleConfig {
            phase_monthly: [Some(0.0); 3],
            global_return_pct: Some(0.0),
            ..ScheduleConfig::default()
        }
    }

    fn sample_config() -> GoalSolveConfig {
        GoalSolveConfig {
            target_terminal_balance: 180_000.0,
            search_min: 0.0,
            search_max: 5_000.0,
            tolerance: 0.5,
            max_iterations: 48,
        }
    }

    #[test]
    fn solver_finds_deterministic_zero_return_solution() {
        // With a 0% return the terminal balance is start + 180 * monthly, so
        // a 180000 target from zero needs exactly 1000/mo.
        let result = solve_required_monthly(0.0, &zero_return_schedule(), sample_config())
            .expect("must solve");

        assert!(result.feasible);
        assert!(result.converged);
        let solved = result.solved_monthly.expect("value expected");
        assert_close(solved, 1_000.0, sample_config().tolerance + 0.5);
        assert!(
            result.achieved_terminal_balance.expect("terminal expected")
                >= result.target_terminal_balance
        );
        assert!(!result.iterations.is_empty());
    }

    #[test]
    fn solver_short_circuits_when_lower_bound_already_meets_target() {
        let config = GoalSolveConfig {
            target_terminal_balance: 150_000.0,
            ..sample_config()
        };
        let result = solve_required_monthly(200_000.0, &zero_return_schedule(), config)
            .expect("must solve");

        assert!(result.feasible);
        assert!(result.converged);
        assert_eq!(result.solved_monthly, Some(0.0));
        assert!(result.iterations.is_empty());
        assert!(result.message.contains("Already meets"));
    }

    #[test]
    fn solver_reports_infeasible_when_bounds_are_too_low() {
        let config = GoalSolveConfig {
            target_terminal_balance: 1_000_000_000.0,
            search_max: 100.0,
            ..sample_config()
        };
        let result =
            solve_required_monthly(0.0, &zero_return_schedule(), config).expect("must return");

        assert!(!result.feasible);
        assert_eq!(result.solved_monthly, None);
        assert_eq!(result.achieved_terminal_balance, None);
    }

    #[test]
    fn solver_rejects_invalid_bounds() {
        let config = GoalSolveConfig {
            search_min: 500.0,
            search_max: 100.0,
            ..sample_config()
        };
        let err = solve_required_monthly(0.0, &zero_return_schedule(), config)
            .expect_err("must reject inverted bounds");
        assert!(err.contains("search_max"));
    }

    #[test]
    fn solver_respects_return_schedule() {
        // At 8% the same target needs less than the zero-return answer.
        let schedule = ScheduleConfig {
            global_return_pct: Some(8.0),
            ..zero_return_schedule()
        };
        let with_growth =
            solve_required_monthly(0.0, &schedule, sample_config()).expect("must solve");
        let without_growth =
            solve_required_monthly(0.0, &zero_return_schedule(), sample_config())
                .expect("must solve");

        assert!(
            with_growth.solved_monthly.expect("value expected")
                < without_growth.solved_monthly.expect("value expected")
        );
    }
}
