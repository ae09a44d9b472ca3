mod config;
mod engine;
mod error;
mod lookup;
mod planner;
mod types;

pub use config::{
    DEFAULT_ELIGIBILITY_THRESHOLD, DEFAULT_ESG_SCORES, DEFAULT_RETIREMENT_MULTIPLE,
    DEFAULT_TAX_BRACKETS, EngineConfig, TAX_SAVING_SUGGESTIONS, validate_brackets,
};
pub use engine::{classify_eligibility, compute_emi, compute_tax, project_retirement};
pub use error::{EngineError, Result};
pub use lookup::{EsgLookup, EsgTable, LookupError, PriceBook, PriceLookup};
pub use planner::{
    DEFAULT_EXPENSE_CATEGORIES, check_quiz_answer, default_expense_lines, market_insight,
    summarize_budget, value_portfolio,
};
pub use types::{
    BudgetStatus, BudgetSummary, Eligibility, EligibilityAssessment, EligibilityInputs,
    EmiSchedule, ExpenseLine, ExpenseShare, Feature, Holding, HoldingValue, LoanTerms,
    MarketInsight, PortfolioValuation, RetirementInputs, RetirementProjection, TaxAssessment,
    TaxBracket, TaxSlice, Trend,
};
