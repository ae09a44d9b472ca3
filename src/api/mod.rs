use axum::{
    Router,
    extract::{
        Json, Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::core::{
    BudgetSummary, EligibilityAssessment, EligibilityInputs, EmiSchedule, EngineConfig,
    EngineError, EsgLookup, EsgTable, ExpenseLine, Feature, Holding, LoanTerms,
    PortfolioValuation, PriceBook, PriceLookup, RetirementInputs, RetirementProjection,
    TAX_SAVING_SUGGESTIONS, TaxAssessment, TaxBracket, Trend, check_quiz_answer,
    classify_eligibility, compute_emi, compute_tax, default_expense_lines, market_insight,
    project_retirement, summarize_budget, value_portfolio,
};

const ESG_UNAVAILABLE: &str = "No data available";

/// Immutable per-server state. Lookups are collaborators; handlers only read.
pub struct AppState {
    pub config: EngineConfig,
    pub prices: Arc<dyn PriceLookup>,
    pub esg: Arc<dyn EsgLookup>,
}

impl AppState {
    pub fn new(
        config: EngineConfig,
        prices: Arc<dyn PriceLookup>,
        esg: Arc<dyn EsgLookup>,
    ) -> Self {
        Self {
            config,
            prices,
            esg,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(
            EngineConfig::default(),
            Arc::new(PriceBook::new()),
            Arc::new(EsgTable::default()),
        )
    }
}

type SharedState = Arc<AppState>;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TaxPayload {
    annual_income: Option<f64>,
    deductions: Option<f64>,
    brackets: Option<Vec<TaxBracket>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct EmiPayload {
    principal: Option<f64>,
    #[serde(alias = "interestRate", alias = "rate")]
    annual_rate_percent: Option<f64>,
    #[serde(alias = "tenure")]
    tenure_years: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct EligibilityPayload {
    #[serde(alias = "income")]
    annual_income: Option<f64>,
    current_debts: Option<f64>,
    #[serde(alias = "principal")]
    proposed_loan_amount: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RetirementPayload {
    current_age: Option<u32>,
    retirement_age: Option<u32>,
    current_savings: Option<f64>,
    annual_expenses: Option<f64>,
    inflation_rate: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct BudgetPayload {
    #[serde(alias = "income")]
    monthly_income: Option<f64>,
    expenses: Option<Vec<ExpenseLine>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PortfolioPayload {
    holdings: Option<Vec<Holding>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct QuizPayload {
    answer: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TaxResponse {
    #[serde(flatten)]
    assessment: TaxAssessment,
    suggestions: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmiResponse {
    principal: f64,
    annual_rate_percent: f64,
    tenure_years: u32,
    #[serde(flatten)]
    schedule: EmiSchedule,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EligibilityResponse {
    #[serde(flatten)]
    assessment: EligibilityAssessment,
    label: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BudgetResponse {
    #[serde(flatten)]
    summary: BudgetSummary,
    advice: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StockResponse {
    symbol: String,
    available: bool,
    latest_price: Option<f64>,
    trend: Option<Trend>,
    observations: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EsgResponse {
    symbol: String,
    available: bool,
    score: Option<u32>,
    message: Option<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QuizResponse {
    correct: bool,
    message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FeatureEntry {
    id: Feature,
    title: &'static str,
    route: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    kind: &'static str,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/features", get(features_handler))
        .route("/api/tax", get(tax_get_handler).post(tax_post_handler))
        .route("/api/emi", get(emi_get_handler).post(emi_post_handler))
        .route(
            "/api/eligibility",
            get(eligibility_get_handler).post(eligibility_post_handler),
        )
        .route(
            "/api/retirement",
            get(retirement_get_handler).post(retirement_post_handler),
        )
        .route("/api/budget", post(budget_handler))
        .route("/api/portfolio", post(portfolio_handler))
        .route("/api/quiz", post(quiz_handler))
        .route("/api/stocks/:symbol", get(stock_handler))
        .route("/api/esg/:symbol", get(esg_handler))
        .fallback(not_found_handler)
        .with_state(Arc::new(state))
}

pub async fn run_http_server(port: u16, state: AppState) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = build_router(state);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "finsuite HTTP API listening");
    info!("Local access: http://127.0.0.1:{port}/api/features");

    axum::serve(listener, app).await
}

async fn features_handler() -> Response {
    json_response(StatusCode::OK, feature_entries())
}

async fn not_found_handler() -> Response {
    error_body(StatusCode::NOT_FOUND, "Not found".to_string(), "not-found")
}

async fn tax_get_handler(
    State(state): State<SharedState>,
    payload: Result<Query<TaxPayload>, QueryRejection>,
) -> Response {
    match payload {
        Ok(Query(payload)) => respond("tax", tax_response(payload, &state.config)),
        Err(rejection) => payload_rejected(rejection.status(), rejection.body_text()),
    }
}

async fn tax_post_handler(
    State(state): State<SharedState>,
    payload: Result<Json<TaxPayload>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(payload)) => respond("tax", tax_response(payload, &state.config)),
        Err(rejection) => payload_rejected(rejection.status(), rejection.body_text()),
    }
}

async fn emi_get_handler(payload: Result<Query<EmiPayload>, QueryRejection>) -> Response {
    match payload {
        Ok(Query(payload)) => respond("emi", emi_response(payload)),
        Err(rejection) => payload_rejected(rejection.status(), rejection.body_text()),
    }
}

async fn emi_post_handler(payload: Result<Json<EmiPayload>, JsonRejection>) -> Response {
    match payload {
        Ok(Json(payload)) => respond("emi", emi_response(payload)),
        Err(rejection) => payload_rejected(rejection.status(), rejection.body_text()),
    }
}

async fn eligibility_get_handler(
    State(state): State<SharedState>,
    payload: Result<Query<EligibilityPayload>, QueryRejection>,
) -> Response {
    match payload {
        Ok(Query(payload)) => respond("eligibility", eligibility_response(payload, &state.config)),
        Err(rejection) => payload_rejected(rejection.status(), rejection.body_text()),
    }
}

async fn eligibility_post_handler(
    State(state): State<SharedState>,
    payload: Result<Json<EligibilityPayload>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(payload)) => respond("eligibility", eligibility_response(payload, &state.config)),
        Err(rejection) => payload_rejected(rejection.status(), rejection.body_text()),
    }
}

async fn retirement_get_handler(
    State(state): State<SharedState>,
    payload: Result<Query<RetirementPayload>, QueryRejection>,
) -> Response {
    match payload {
        Ok(Query(payload)) => respond("retirement", retirement_response(payload, &state.config)),
        Err(rejection) => payload_rejected(rejection.status(), rejection.body_text()),
    }
}

async fn retirement_post_handler(
    State(state): State<SharedState>,
    payload: Result<Json<RetirementPayload>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(payload)) => respond("retirement", retirement_response(payload, &state.config)),
        Err(rejection) => payload_rejected(rejection.status(), rejection.body_text()),
    }
}

async fn budget_handler(payload: Result<Json<BudgetPayload>, JsonRejection>) -> Response {
    match payload {
        Ok(Json(payload)) => respond("budget", budget_response(payload)),
        Err(rejection) => payload_rejected(rejection.status(), rejection.body_text()),
    }
}

async fn portfolio_handler(
    State(state): State<SharedState>,
    payload: Result<Json<PortfolioPayload>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(payload)) => respond(
            "portfolio",
            portfolio_response(payload, state.prices.as_ref()),
        ),
        Err(rejection) => payload_rejected(rejection.status(), rejection.body_text()),
    }
}

async fn quiz_handler(payload: Result<Json<QuizPayload>, JsonRejection>) -> Response {
    match payload {
        Ok(Json(payload)) => {
            debug!("quiz answer submitted");
            json_response(StatusCode::OK, quiz_response(payload))
        }
        Err(rejection) => payload_rejected(rejection.status(), rejection.body_text()),
    }
}

async fn stock_handler(
    State(state): State<SharedState>,
    Path(symbol): Path<String>,
) -> Response {
    debug!(%symbol, "stock insight requested");
    json_response(StatusCode::OK, stock_response(&symbol, state.prices.as_ref()))
}

async fn esg_handler(State(state): State<SharedState>, Path(symbol): Path<String>) -> Response {
    debug!(%symbol, "esg score requested");
    json_response(StatusCode::OK, esg_response(&symbol, state.esg.as_ref()))
}

fn feature_entries() -> Vec<FeatureEntry> {
    Feature::ALL
        .into_iter()
        .map(|feature| FeatureEntry {
            id: feature,
            title: feature.title(),
            route: feature.route(),
        })
        .collect()
}

fn tax_response(payload: TaxPayload, config: &EngineConfig) -> Result<TaxResponse, EngineError> {
    let brackets = payload
        .brackets
        .unwrap_or_else(|| config.tax_brackets.clone());
    let assessment = compute_tax(
        payload.annual_income.unwrap_or(0.0),
        payload.deductions.unwrap_or(0.0),
        &brackets,
    )?;
    Ok(TaxResponse {
        assessment,
        suggestions: TAX_SAVING_SUGGESTIONS.to_vec(),
    })
}

fn loan_terms_from_payload(payload: &EmiPayload) -> LoanTerms {
    LoanTerms {
        principal: payload.principal.unwrap_or(0.0),
        annual_rate_percent: payload.annual_rate_percent.unwrap_or(0.0),
        tenure_years: payload.tenure_years.unwrap_or(1),
    }
}

fn emi_response(payload: EmiPayload) -> Result<EmiResponse, EngineError> {
    let terms = loan_terms_from_payload(&payload);
    let schedule = compute_emi(&terms)?;
    Ok(EmiResponse {
        principal: terms.principal,
        annual_rate_percent: terms.annual_rate_percent,
        tenure_years: terms.tenure_years,
        schedule,
    })
}

fn eligibility_response(
    payload: EligibilityPayload,
    config: &EngineConfig,
) -> Result<EligibilityResponse, EngineError> {
    let inputs = EligibilityInputs {
        annual_income: payload.annual_income.unwrap_or(0.0),
        current_debts: payload.current_debts.unwrap_or(0.0),
        proposed_loan_amount: payload.proposed_loan_amount.unwrap_or(0.0),
    };
    let assessment = classify_eligibility(&inputs, config.eligibility_threshold)?;
    Ok(EligibilityResponse {
        label: assessment.eligibility.label(),
        assessment,
    })
}

fn retirement_inputs_from_payload(payload: &RetirementPayload) -> RetirementInputs {
    let current_age = payload.current_age.unwrap_or(18);
    RetirementInputs {
        current_age,
        retirement_age: payload
            .retirement_age
            .unwrap_or_else(|| current_age.saturating_add(1)),
        current_savings: payload.current_savings.unwrap_or(0.0),
        annual_expenses: payload.annual_expenses.unwrap_or(0.0),
        inflation_rate: payload.inflation_rate.unwrap_or(0.0),
    }
}

fn retirement_response(
    payload: RetirementPayload,
    config: &EngineConfig,
) -> Result<RetirementProjection, EngineError> {
    let inputs = retirement_inputs_from_payload(&payload);
    project_retirement(&inputs, config.retirement_multiple)
}

fn budget_response(payload: BudgetPayload) -> Result<BudgetResponse, EngineError> {
    let expenses = payload.expenses.unwrap_or_else(default_expense_lines);
    let summary = summarize_budget(payload.monthly_income.unwrap_or(0.0), &expenses)?;
    Ok(BudgetResponse {
        advice: summary.status.advice(),
        summary,
    })
}

fn default_holdings() -> Vec<Holding> {
    vec![
        Holding {
            symbol: "BTC".to_string(),
            amount: 1.5,
        },
        Holding {
            symbol: "ETH".to_string(),
            amount: 10.0,
        },
    ]
}

fn portfolio_response(
    payload: PortfolioPayload,
    prices: &dyn PriceLookup,
) -> Result<PortfolioValuation, EngineError> {
    let holdings = payload.holdings.unwrap_or_else(default_holdings);
    value_portfolio(prices, &holdings)
}

fn stock_response(symbol: &str, prices: &dyn PriceLookup) -> StockResponse {
    match market_insight(prices, symbol) {
        Some(insight) => StockResponse {
            symbol: insight.symbol,
            available: true,
            latest_price: Some(insight.latest_price),
            trend: Some(insight.trend),
            observations: insight.observations,
        },
        None => StockResponse {
            symbol: symbol.trim().to_ascii_uppercase(),
            available: false,
            latest_price: None,
            trend: None,
            observations: 0,
        },
    }
}

fn esg_response(symbol: &str, esg: &dyn EsgLookup) -> EsgResponse {
    let score = esg.esg_score(symbol);
    EsgResponse {
        symbol: symbol.trim().to_ascii_uppercase(),
        available: score.is_some(),
        score,
        message: score.is_none().then_some(ESG_UNAVAILABLE),
    }
}

fn quiz_response(payload: QuizPayload) -> QuizResponse {
    let correct = check_quiz_answer(payload.answer.as_deref().unwrap_or_default());
    QuizResponse {
        correct,
        message: if correct {
            "Correct! Investing is a key strategy for retirement."
        } else {
            "Incorrect. Try again!"
        },
    }
}

fn respond<T: Serialize>(operation: &'static str, result: Result<T, EngineError>) -> Response {
    match result {
        Ok(body) => {
            debug!(operation, "request served");
            json_response(StatusCode::OK, body)
        }
        Err(err) => {
            warn!(operation, kind = err.kind(), "rejected request: {err}");
            error_response(&err)
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(err: &EngineError) -> Response {
    error_body(StatusCode::BAD_REQUEST, err.to_string(), err.kind())
}

/// Body or query string that failed to deserialize before reaching a calculator.
fn payload_rejected(status: StatusCode, detail: String) -> Response {
    warn!(%status, "rejected request payload: {detail}");
    error_body(status, detail, "invalid-payload")
}

fn error_body(status: StatusCode, error: String, kind: &'static str) -> Response {
    json_response(status, ErrorResponse { error, kind })
}
