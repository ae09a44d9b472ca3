use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::{AppState, run_http_server};
use crate::core::{
    DEFAULT_ELIGIBILITY_THRESHOLD, DEFAULT_RETIREMENT_MULTIPLE, EligibilityInputs, EngineConfig,
    EngineError, EsgLookup, EsgTable, ExpenseLine, Feature, LoanTerms, LookupError, PriceBook,
    RetirementInputs, TAX_SAVING_SUGGESTIONS, check_quiz_answer, classify_eligibility,
    compute_emi, compute_tax, default_expense_lines, market_insight, project_retirement,
    summarize_budget,
};

#[derive(Parser, Debug)]
#[command(
    name = "finsuite",
    about = "Personal finance calculators: income tax, loan EMI and eligibility, retirement savings, budget"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        default_value = "info",
        help = "Log filter used when RUST_LOG is unset"
    )]
    pub log_level: String,
    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_ELIGIBILITY_THRESHOLD,
        help = "Debt-to-income ratio below which a loan applicant is eligible"
    )]
    pub eligibility_threshold: f64,
    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_RETIREMENT_MULTIPLE,
        help = "Retirement corpus as a multiple of annual expenses at retirement"
    )]
    pub retirement_multiple: f64,
    #[arg(
        long = "esg",
        global = true,
        value_parser = parse_esg_score,
        help = "Extra or replacement sustainability score as SYMBOL=SCORE; repeatable"
    )]
    pub esg_scores: Vec<(String, u32)>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP JSON API
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
        #[arg(long, help = "JSON file mapping symbols to recent closing prices")]
        prices: Option<PathBuf>,
    },
    /// Progressive income tax on income less deductions
    Tax {
        #[arg(long)]
        income: f64,
        #[arg(long, default_value_t = 0.0)]
        deductions: f64,
    },
    /// Equal monthly installment for a fixed-rate loan
    Emi {
        #[arg(long)]
        principal: f64,
        #[arg(long, help = "Annual interest rate in percent, e.g. 8.5")]
        rate: f64,
        #[arg(long, default_value_t = 1)]
        tenure_years: u32,
    },
    /// Debt-to-income loan eligibility
    Eligibility {
        #[arg(long)]
        income: f64,
        #[arg(long, default_value_t = 0.0)]
        debts: f64,
        #[arg(long, default_value_t = 0.0)]
        loan_amount: f64,
    },
    /// Savings target and monthly saving needed to retire
    Retirement {
        #[arg(long)]
        current_age: u32,
        #[arg(long)]
        retirement_age: u32,
        #[arg(long, default_value_t = 0.0)]
        current_savings: f64,
        #[arg(long)]
        annual_expenses: f64,
        #[arg(long, default_value_t = 0.0, help = "Annual inflation as a fraction, e.g. 0.06")]
        inflation_rate: f64,
    },
    /// Monthly budget summary
    Budget {
        #[arg(long)]
        income: f64,
        #[arg(
            long = "expense",
            value_parser = parse_expense,
            help = "Expense as CATEGORY=AMOUNT; repeatable"
        )]
        expenses: Vec<ExpenseLine>,
    },
    /// Latest price and trend from a local price file
    Stock {
        symbol: String,
        #[arg(long)]
        prices: PathBuf,
    },
    /// Sustainability score for a stock symbol
    Esg { symbol: String },
    /// Financial literacy quiz: best way to save for retirement?
    Quiz { answer: String },
    /// List the feature menu, or look one feature up by its title
    Menu { title: Option<String> },
}

impl Command {
    pub fn feature(&self) -> Option<Feature> {
        match self {
            Command::Serve { .. } => None,
            Command::Tax { .. } => Some(Feature::TaxCalculator),
            Command::Emi { .. } | Command::Eligibility { .. } => Some(Feature::LoanCalculator),
            Command::Retirement { .. } => Some(Feature::RetirementPlanner),
            Command::Budget { .. } => Some(Feature::BudgetPlanner),
            Command::Stock { .. } => Some(Feature::StockMarketInsights),
            Command::Esg { .. } => Some(Feature::SustainabilityScore),
            Command::Quiz { .. } => Some(Feature::FinancialLiteracy),
            Command::Menu { .. } => Some(Feature::Home),
        }
    }
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("failed to encode output: {0}")]
    Output(#[from] serde_json::Error),

    #[error("server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("no feature titled '{0}'")]
    UnknownFeature(String),

    #[error("`{0}` is long-running and has no one-shot output")]
    NotOneShot(&'static str),
}

impl Cli {
    pub fn engine_config(&self) -> Result<EngineConfig, EngineError> {
        let config = EngineConfig {
            eligibility_threshold: self.eligibility_threshold,
            retirement_multiple: self.retirement_multiple,
            ..EngineConfig::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Built-in scores with any `--esg` overrides applied.
    pub fn esg_table(&self) -> EsgTable {
        self.esg_scores
            .iter()
            .fold(EsgTable::default(), |table, (symbol, score)| {
                table.with_score(symbol, *score)
            })
    }
}

pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub async fn run(cli: Cli) -> ExitCode {
    match run_inner(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run_inner(cli: Cli) -> Result<(), CliError> {
    let config = cli.engine_config()?;
    let esg = cli.esg_table();
    match cli.command {
        Command::Serve { port, prices } => {
            let book = match prices {
                Some(path) => PriceBook::from_path(&path)?,
                None => PriceBook::new(),
            };
            info!(symbols = book.len(), "loaded price data");
            let state = AppState::new(config, Arc::new(book), Arc::new(esg));
            run_http_server(port, state).await?;
            Ok(())
        }
        command => {
            if let Some(feature) = command.feature() {
                info!(feature = feature.title(), "running calculation");
            }
            let output = execute(&command, &config, &esg)?;
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
    }
}

/// Runs a one-shot calculation and returns its JSON rendering.
pub fn execute(
    command: &Command,
    config: &EngineConfig,
    esg: &dyn EsgLookup,
) -> Result<Value, CliError> {
    let value = match command {
        Command::Serve { .. } => return Err(CliError::NotOneShot("serve")),
        Command::Tax { income, deductions } => {
            let assessment = compute_tax(*income, *deductions, &config.tax_brackets)?;
            with_field(
                serde_json::to_value(&assessment)?,
                "suggestions",
                json!(TAX_SAVING_SUGGESTIONS),
            )
        }
        Command::Emi {
            principal,
            rate,
            tenure_years,
        } => serde_json::to_value(compute_emi(&LoanTerms {
            principal: *principal,
            annual_rate_percent: *rate,
            tenure_years: *tenure_years,
        })?)?,
        Command::Eligibility {
            income,
            debts,
            loan_amount,
        } => {
            let assessment = classify_eligibility(
                &EligibilityInputs {
                    annual_income: *income,
                    current_debts: *debts,
                    proposed_loan_amount: *loan_amount,
                },
                config.eligibility_threshold,
            )?;
            with_field(
                serde_json::to_value(assessment)?,
                "label",
                json!(assessment.eligibility.label()),
            )
        }
        Command::Retirement {
            current_age,
            retirement_age,
            current_savings,
            annual_expenses,
            inflation_rate,
        } => serde_json::to_value(project_retirement(
            &RetirementInputs {
                current_age: *current_age,
                retirement_age: *retirement_age,
                current_savings: *current_savings,
                annual_expenses: *annual_expenses,
                inflation_rate: *inflation_rate,
            },
            config.retirement_multiple,
        )?)?,
        Command::Budget { income, expenses } => {
            let expenses = if expenses.is_empty() {
                default_expense_lines()
            } else {
                expenses.clone()
            };
            let summary = summarize_budget(*income, &expenses)?;
            let advice = summary.status.advice();
            with_field(serde_json::to_value(summary)?, "advice", json!(advice))
        }
        Command::Stock { symbol, prices } => {
            let book = PriceBook::from_path(prices)?;
            match market_insight(&book, symbol) {
                Some(insight) => with_field(serde_json::to_value(insight)?, "available", json!(true)),
                None => json!({ "symbol": symbol.to_ascii_uppercase(), "available": false }),
            }
        }
        Command::Esg { symbol } => match esg.esg_score(symbol) {
            Some(score) => json!({ "symbol": symbol.to_ascii_uppercase(), "score": score }),
            None => json!({ "symbol": symbol.to_ascii_uppercase(), "score": "No data available" }),
        },
        Command::Quiz { answer } => json!({ "correct": check_quiz_answer(answer) }),
        Command::Menu { title: None } => json!(Feature::ALL.map(menu_entry)),
        Command::Menu { title: Some(title) } => Feature::from_title(title)
            .map(menu_entry)
            .ok_or_else(|| CliError::UnknownFeature(title.clone()))?,
    };
    Ok(value)
}

fn with_field(mut value: Value, key: &str, field: Value) -> Value {
    if let Some(object) = value.as_object_mut() {
        object.insert(key.to_string(), field);
    }
    value
}

fn menu_entry(feature: Feature) -> Value {
    json!({ "title": feature.title(), "route": feature.route() })
}

fn parse_esg_score(raw: &str) -> Result<(String, u32), String> {
    let (symbol, score) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected SYMBOL=SCORE, got '{raw}'"))?;
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err("ESG symbol must not be empty".to_string());
    }
    let score = score
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid score for {symbol}: {e}"))?;
    Ok((symbol.to_string(), score))
}

fn parse_expense(raw: &str) -> Result<ExpenseLine, String> {
    let (category, amount) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected CATEGORY=AMOUNT, got '{raw}'"))?;
    let category = category.trim();
    if category.is_empty() {
        return Err("expense category must not be empty".to_string());
    }
    let amount = amount
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid amount for {category}: {e}"))?;
    Ok(ExpenseLine {
        category: category.to_string(),
        amount,
    })
}
