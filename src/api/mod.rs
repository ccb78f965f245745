use std::collections::{BTreeMap, BTreeSet};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Json, Path, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use crate::advice::{AdviceError, AdviceGenerator, UnconfiguredAdvisor, build_advice_prompt};
use crate::core::{
    ActualRecord, BudgetInputs, GoalSolveConfig, HORIZON_YEARS, Holding, Phase, ScheduleConfig,
    VarianceSummary, YearRow, compute_rebased, compute_variance, investment_capacity,
    solve_required_monthly,
};
use crate::store::{JsonFileStore, PlanRepository, PlanSnapshot, StoreError};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

/// Defaults carrier for the API: every scalar the projection needs, with its
/// documented default. Sparse HTTP payloads are overlaid on top of this before
/// validation. Defaults mirror the sample household plan.
#[derive(Parser, Debug)]
#[command(
    name = "wealthpanel",
    about = "Household net-worth projection with actuals rebasing"
)]
struct Cli {
    #[arg(
        long,
        default_value_t = 200_000.0,
        help = "Net worth at the start of plan year 1"
    )]
    starting_balance: f64,
    #[arg(
        long,
        default_value_t = 2026,
        help = "Calendar year mapped to plan year 1"
    )]
    start_year: i32,
    #[arg(
        long,
        default_value_t = 3000.0,
        help = "Monthly investment in years 1-3 (foundation)"
    )]
    foundation_monthly: f64,
    #[arg(
        long,
        default_value_t = 1500.0,
        help = "Monthly investment in years 4-8 (discipline)"
    )]
    discipline_monthly: f64,
    #[arg(
        long,
        default_value_t = 4000.0,
        help = "Monthly investment in years 9-15 (velocity)"
    )]
    velocity_monthly: f64,
    #[arg(
        long,
        default_value_t = 8.0,
        help = "Default annual return in percent applied to every year"
    )]
    annual_return: f64,
    #[arg(
        long,
        value_name = "YEAR=PHASE",
        help = "Pin a year to a life stage (phase 1-3), e.g. 5=1; repeatable"
    )]
    stage_override: Vec<String>,
    #[arg(
        long,
        value_name = "YEAR=PCT",
        help = "Per-year return override in percent, e.g. 3=0; repeatable"
    )]
    return_override: Vec<String>,
}

#[derive(Debug)]
struct ProjectionRequest {
    starting_balance: f64,
    schedule: ScheduleConfig,
    actuals: Vec<ActualRecord>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectionPayload {
    starting_balance: Option<f64>,
    start_year: Option<i32>,
    foundation_monthly: Option<f64>,
    discipline_monthly: Option<f64>,
    velocity_monthly: Option<f64>,
    annual_return: Option<f64>,
    stage_overrides: Option<BTreeMap<u32, u8>>,
    return_overrides: Option<BTreeMap<u32, f64>>,
    actuals: Option<Vec<ActualPayload>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ActualPayload {
    year_index: Option<u32>,
    total_invested: Option<f64>,
    end_of_year_balance: Option<f64>,
    notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SolvePayload {
    #[serde(flatten)]
    projection: ProjectionPayload,
    target_terminal_balance: Option<f64>,
    search_min: Option<f64>,
    search_max: Option<f64>,
    tolerance: Option<f64>,
    max_iterations: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AdvicePayload {
    holdings: Vec<Holding>,
    #[serde(flatten)]
    projection: ProjectionPayload,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectionResponse {
    start_year: i32,
    starting_balance: f64,
    rows: Vec<YearRowDto>,
    variance: VarianceSummary,
}

/// Presentation view of a plan year. Balances are rounded to whole currency
/// units here and only here; the engine series keep full precision.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct YearRowDto {
    year_index: u32,
    calendar_year: i32,
    phase: Option<u8>,
    life_stage: Option<&'static str>,
    monthly_contribution: f64,
    annual_invested: f64,
    invested_source: &'static str,
    return_rate_pct: f64,
    baseline_balance: i64,
    rebased_balance: i64,
    actual_balance: Option<i64>,
    actual_vs_baseline: Option<f64>,
    rebased_vs_baseline: Option<f64>,
    implied_growth_pct: Option<f64>,
}

#[derive(Debug, Serialize)]
struct SlotsResponse {
    slots: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanResponse {
    slot: String,
    starting_balance: f64,
    plan: PlanSnapshot,
}

#[derive(Debug, Serialize)]
struct SavedResponse {
    saved: String,
}

#[derive(Debug, Serialize)]
struct AdviceResponse {
    advice: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn default_cli_for_api() -> Cli {
    Cli {
        starting_balance: 200_000.0,
        start_year: 2026,
        foundation_monthly: 3_000.0,
        discipline_monthly: 1_500.0,
        velocity_monthly: 4_000.0,
        annual_return: 8.0,
        stage_override: Vec::new(),
        return_override: Vec::new(),
    }
}

fn parse_year_assignment<'a>(raw: &'a str, flag: &str) -> Result<(u32, &'a str), String> {
    let Some((year_raw, value_raw)) = raw.split_once('=') else {
        return Err(format!("{flag} expects YEAR=VALUE, got {raw:?}"));
    };
    let year = year_raw
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("{flag} has a non-numeric year in {raw:?}"))?;
    validate_year_index(year, flag)?;
    Ok((year, value_raw.trim()))
}

fn validate_year_index(year: u32, context: &str) -> Result<(), String> {
    if !(1..=HORIZON_YEARS).contains(&year) {
        return Err(format!(
            "{context} year index must be between 1 and {HORIZON_YEARS}, got {year}"
        ));
    }
    Ok(())
}

fn phase_from_number(number: u8, context: &str) -> Result<Phase, String> {
    Phase::from_number(number)
        .ok_or_else(|| format!("{context} phase must be 1, 2, or 3, got {number}"))
}

fn validate_return_pct(value: f64, context: &str) -> Result<(), String> {
    if !value.is_finite() || value <= -100.0 {
        return Err(format!("{context} must be a finite percentage > -100"));
    }
    Ok(())
}

fn build_schedule(cli: &Cli) -> Result<(f64, ScheduleConfig), String> {
    if !cli.starting_balance.is_finite() {
        return Err("--starting-balance must be finite".to_string());
    }
    if !(1900..=2200).contains(&cli.start_year) {
        return Err("--start-year must be between 1900 and 2200".to_string());
    }
    for (name, value) in [
        ("--foundation-monthly", cli.foundation_monthly),
        ("--discipline-monthly", cli.discipline_monthly),
        ("--velocity-monthly", cli.velocity_monthly),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(format!("{name} must be >= 0"));
        }
    }
    validate_return_pct(cli.annual_return, "--annual-return")?;

    let mut schedule = ScheduleConfig {
        start_year: cli.start_year,
        phase_monthly: [
            Some(cli.foundation_monthly),
            Some(cli.discipline_monthly),
            Some(cli.velocity_monthly),
        ],
        global_return_pct: Some(cli.annual_return),
        ..ScheduleConfig::default()
    };

    for raw in &cli.stage_override {
        let (year, value_raw) = parse_year_assignment(raw, "--stage-override")?;
        let number = value_raw
            .parse::<u8>()
            .map_err(|_| format!("--stage-override has a non-numeric phase in {raw:?}"))?;
        let phase = phase_from_number(number, "--stage-override")?;
        schedule.stage_overrides.insert(year, phase);
    }
    for raw in &cli.return_override {
        let (year, value_raw) = parse_year_assignment(raw, "--return-override")?;
        let pct = value_raw
            .parse::<f64>()
            .map_err(|_| format!("--return-override has a non-numeric rate in {raw:?}"))?;
        validate_return_pct(pct, "--return-override")?;
        schedule.return_overrides.insert(year, pct);
    }

    Ok((cli.starting_balance, schedule))
}

fn validate_actuals(payloads: Vec<ActualPayload>) -> Result<Vec<ActualRecord>, String> {
    let mut seen = BTreeSet::new();
    let mut records = Vec::with_capacity(payloads.len());
    for payload in payloads {
        let Some(year_index) = payload.year_index else {
            return Err("each actual record needs a yearIndex".to_string());
        };
        validate_year_index(year_index, "actuals")?;
        if !seen.insert(year_index) {
            return Err(format!("duplicate actual record for year {year_index}"));
        }
        for (name, value) in [
            ("totalInvested", payload.total_invested),
            ("endOfYearBalance", payload.end_of_year_balance),
        ] {
            if let Some(value) = value {
                if !value.is_finite() {
                    return Err(format!("{name} for year {year_index} must be finite"));
                }
            }
        }
        records.push(ActualRecord {
            year_index,
            total_invested: payload.total_invested,
            end_of_year_balance: payload.end_of_year_balance,
            notes: payload.notes.unwrap_or_default(),
        });
    }
    Ok(records)
}

fn api_request_from_payload(payload: ProjectionPayload) -> Result<ProjectionRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.starting_balance {
        cli.starting_balance = v;
    }
    if let Some(v) = payload.start_year {
        cli.start_year = v;
    }
    if let Some(v) = payload.foundation_monthly {
        cli.foundation_monthly = v;
    }
    if let Some(v) = payload.discipline_monthly {
        cli.discipline_monthly = v;
    }
    if let Some(v) = payload.velocity_monthly {
        cli.velocity_monthly = v;
    }
    if let Some(v) = payload.annual_return {
        cli.annual_return = v;
    }

    let (starting_balance, mut schedule) = build_schedule(&cli)?;

    if let Some(overrides) = payload.stage_overrides {
        for (year, number) in overrides {
            validate_year_index(year, "stageOverrides")?;
            let phase = phase_from_number(number, "stageOverrides")?;
            schedule.stage_overrides.insert(year, phase);
        }
    }
    if let Some(overrides) = payload.return_overrides {
        for (year, pct) in overrides {
            validate_year_index(year, "returnOverrides")?;
            validate_return_pct(pct, "returnOverrides")?;
            schedule.return_overrides.insert(year, pct);
        }
    }

    let actuals = validate_actuals(payload.actuals.unwrap_or_default())?;

    Ok(ProjectionRequest {
        starting_balance,
        schedule,
        actuals,
    })
}

fn validate_budget(budget: &BudgetInputs) -> Result<(), String> {
    if !budget.stretch_pct.is_finite() || !(0.0..=100.0).contains(&budget.stretch_pct) {
        return Err("stretchPct must be between 0 and 100".to_string());
    }
    for items in [
        &budget.income,
        &budget.fixed_expenses,
        &budget.variable_expenses,
        &budget.shock_expenses,
    ] {
        for item in items.iter() {
            if !item.monthly.is_finite() || item.monthly < 0.0 {
                return Err(format!("budget item {:?} must have a finite amount >= 0", item.name));
            }
        }
    }
    Ok(())
}

fn validate_snapshot(plan: &PlanSnapshot) -> Result<(), String> {
    for year in plan.schedule.stage_overrides.keys() {
        validate_year_index(*year, "stageOverrides")?;
    }
    for (year, pct) in &plan.schedule.return_overrides {
        validate_year_index(*year, "returnOverrides")?;
        validate_return_pct(*pct, "returnOverrides")?;
    }
    let mut seen = BTreeSet::new();
    for record in &plan.actuals {
        validate_year_index(record.year_index, "actuals")?;
        if !seen.insert(record.year_index) {
            return Err(format!(
                "duplicate actual record for year {}",
                record.year_index
            ));
        }
    }
    for holding in &plan.holdings {
        if !holding.amount.is_finite() || holding.amount < 0.0 {
            return Err(format!(
                "holding {:?} must have a finite amount >= 0",
                holding.name
            ));
        }
    }
    validate_budget(&plan.budget)
}

fn round_currency(value: f64) -> i64 {
    value.round() as i64
}

fn build_projection_response(request: &ProjectionRequest) -> ProjectionResponse {
    let rows = compute_rebased(
        request.starting_balance,
        &request.schedule,
        &request.actuals,
    );
    let variance = compute_variance(&rows);

    let invested_by_year: BTreeMap<u32, f64> = request
        .actuals
        .iter()
        .filter_map(|record| record.total_invested.map(|v| (record.year_index, v)))
        .collect();

    let dto_rows = rows.iter().map(|row| year_row_dto(row, &invested_by_year)).collect();
    ProjectionResponse {
        start_year: request.schedule.start_year,
        starting_balance: request.starting_balance,
        rows: dto_rows,
        variance,
    }
}

fn year_row_dto(row: &YearRow, invested_by_year: &BTreeMap<u32, f64>) -> YearRowDto {
    let (annual_invested, invested_source) = match invested_by_year.get(&row.year_index) {
        Some(actual) => (*actual, "actual"),
        None => (row.monthly_contribution * 12.0, "plan"),
    };
    YearRowDto {
        year_index: row.year_index,
        calendar_year: row.calendar_year,
        phase: row.phase.map(Phase::number),
        life_stage: row.phase.map(Phase::label),
        monthly_contribution: row.monthly_contribution,
        annual_invested,
        invested_source,
        return_rate_pct: row.return_rate_pct,
        baseline_balance: round_currency(row.baseline_balance),
        rebased_balance: round_currency(row.rebased_balance),
        actual_balance: row.actual_balance.map(round_currency),
        actual_vs_baseline: row.actual_vs_baseline,
        rebased_vs_baseline: row.rebased_vs_baseline,
        implied_growth_pct: row.implied_growth_pct,
    }
}

fn solve_request_from_payload(
    payload: SolvePayload,
) -> Result<(ProjectionRequest, GoalSolveConfig), String> {
    let request = api_request_from_payload(payload.projection)?;
    let Some(target) = payload.target_terminal_balance else {
        return Err("targetTerminalBalance is required".to_string());
    };
    let config = GoalSolveConfig {
        target_terminal_balance: target,
        search_min: payload.search_min.unwrap_or(0.0),
        search_max: payload.search_max.unwrap_or(50_000.0),
        tolerance: payload.tolerance.unwrap_or(1.0),
        max_iterations: payload.max_iterations.unwrap_or(48),
    };
    Ok((request, config))
}

pub struct ApiState {
    repo: Box<dyn PlanRepository + Send + Sync>,
    advisor: Box<dyn AdviceGenerator + Send + Sync>,
}

pub async fn run_http_server(port: u16, data_dir: PathBuf) -> std::io::Result<()> {
    let state = Arc::new(ApiState {
        repo: Box::new(JsonFileStore::new(data_dir.clone())),
        advisor: Box::new(UnconfiguredAdvisor),
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route(
            "/api/projection",
            get(projection_get_handler).post(projection_post_handler),
        )
        .route("/api/capacity", post(capacity_handler))
        .route("/api/solve", post(solve_handler))
        .route("/api/plans", get(plans_list_handler))
        .route(
            "/api/plans/:slot",
            get(plan_get_handler).put(plan_put_handler),
        )
        .route("/api/advice", post(advice_handler))
        .fallback(not_found_handler)
        .with_state(state);

    let listener = TcpListener::bind(addr).await?;
    println!("wealthpanel HTTP API listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/");
    println!("Plan slots stored under {}", data_dir.display());

    axum::serve(listener, app).await
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn projection_get_handler(Query(payload): Query<ProjectionPayload>) -> Response {
    projection_handler_impl(payload).await
}

async fn projection_post_handler(Json(payload): Json<ProjectionPayload>) -> Response {
    projection_handler_impl(payload).await
}

async fn projection_handler_impl(payload: ProjectionPayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };
    json_response(StatusCode::OK, build_projection_response(&request))
}

async fn capacity_handler(Json(budget): Json<BudgetInputs>) -> Response {
    if let Err(msg) = validate_budget(&budget) {
        return error_response(StatusCode::BAD_REQUEST, &msg);
    }
    json_response(StatusCode::OK, investment_capacity(&budget))
}

async fn solve_handler(Json(payload): Json<SolvePayload>) -> Response {
    let (request, config) = match solve_request_from_payload(payload) {
        Ok(parts) => parts,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };
    match solve_required_monthly(request.starting_balance, &request.schedule, config) {
        Ok(result) => json_response(StatusCode::OK, result),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

async fn plans_list_handler(State(state): State<Arc<ApiState>>) -> Response {
    match state.repo.list() {
        Ok(slots) => json_response(StatusCode::OK, SlotsResponse { slots }),
        Err(err) => store_error_response(&err),
    }
}

async fn plan_get_handler(
    State(state): State<Arc<ApiState>>,
    Path(slot): Path<String>,
) -> Response {
    match state.repo.load(&slot) {
        Ok(Some(plan)) => json_response(
            StatusCode::OK,
            PlanResponse {
                starting_balance: plan.starting_balance(),
                slot,
                plan,
            },
        ),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "plan not found"),
        Err(err) => store_error_response(&err),
    }
}

async fn plan_put_handler(
    State(state): State<Arc<ApiState>>,
    Path(slot): Path<String>,
    Json(plan): Json<PlanSnapshot>,
) -> Response {
    if let Err(msg) = validate_snapshot(&plan) {
        return error_response(StatusCode::BAD_REQUEST, &msg);
    }
    match state.repo.save(&slot, &plan) {
        Ok(()) => json_response(StatusCode::OK, SavedResponse { saved: slot }),
        Err(err) => store_error_response(&err),
    }
}

async fn advice_handler(
    State(state): State<Arc<ApiState>>,
    Json(payload): Json<AdvicePayload>,
) -> Response {
    for holding in &payload.holdings {
        if !holding.amount.is_finite() || holding.amount < 0.0 {
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("holding {:?} must have a finite amount >= 0", holding.name),
            );
        }
    }
    let request = match api_request_from_payload(payload.projection) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    let prompt = build_advice_prompt(&payload.holdings, &request.schedule);
    match state.advisor.generate(&prompt) {
        Ok(advice) => json_response(StatusCode::OK, AdviceResponse { advice }),
        Err(AdviceError::Unconfigured) => {
            error_response(StatusCode::SERVICE_UNAVAILABLE, "no advice backend is configured")
        }
        Err(AdviceError::Backend(msg)) => {
            error_response(StatusCode::BAD_GATEWAY, &format!("advice backend failed: {msg}"))
        }
    }
}

fn store_error_response(err: &StoreError) -> Response {
    let status = match err {
        StoreError::InvalidSlot(_) => StatusCode::BAD_REQUEST,
        StoreError::Io(_) | StoreError::Decode(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, &err.to_string())
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ProjectionRequest, String> {
    let payload = serde_json::from_str::<ProjectionPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}
