use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxBracket {
    pub lower: f64,
    /// `None` marks the open-ended top bracket.
    pub upper: Option<f64>,
    pub rate: f64,
}

impl TaxBracket {
    pub const fn new(lower: f64, upper: Option<f64>, rate: f64) -> Self {
        Self { lower, upper, rate }
    }

    pub fn upper_or_infinity(&self) -> f64 {
        self.upper.unwrap_or(f64::INFINITY)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LoanTerms {
    pub principal: f64,
    pub annual_rate_percent: f64,
    pub tenure_years: u32,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RetirementInputs {
    pub current_age: u32,
    pub retirement_age: u32,
    pub current_savings: f64,
    pub annual_expenses: f64,
    pub inflation_rate: f64,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EligibilityInputs {
    pub annual_income: f64,
    pub current_debts: f64,
    pub proposed_loan_amount: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxSlice {
    pub lower: f64,
    pub upper: Option<f64>,
    pub rate: f64,
    pub taxed_amount: f64,
    pub tax: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxAssessment {
    pub taxable_income: f64,
    pub total_tax: f64,
    pub effective_rate: f64,
    pub slices: Vec<TaxSlice>,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmiSchedule {
    pub emi: f64,
    pub months: u32,
    pub total_payment: f64,
    pub total_interest: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Eligibility {
    Eligible,
    NotEligible,
}

impl Eligibility {
    pub fn label(self) -> &'static str {
        match self {
            Eligibility::Eligible => "Eligible",
            Eligibility::NotEligible => "Not Eligible",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityAssessment {
    pub debt_to_income_ratio: f64,
    pub threshold: f64,
    pub proposed_loan_amount: f64,
    pub eligibility: Eligibility,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetirementProjection {
    pub years_to_retirement: u32,
    pub future_annual_expenses: f64,
    pub savings_needed: f64,
    pub monthly_savings_required: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BudgetStatus {
    Overspending,
    BreakEven,
    Saving,
}

impl BudgetStatus {
    pub fn advice(self) -> &'static str {
        match self {
            BudgetStatus::Overspending => {
                "You are overspending! Consider reducing your expenses."
            }
            BudgetStatus::BreakEven => {
                "You are breaking even. Try to save more for unexpected expenses."
            }
            BudgetStatus::Saving => "Great! You are saving money!",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseLine {
    pub category: String,
    pub amount: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseShare {
    pub category: String,
    pub amount: f64,
    pub share_percent: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSummary {
    pub monthly_income: f64,
    pub total_expenses: f64,
    pub savings: f64,
    pub status: BudgetStatus,
    pub distribution: Vec<ExpenseShare>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketInsight {
    pub symbol: String,
    pub latest_price: f64,
    pub trend: Trend,
    pub observations: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub symbol: String,
    pub amount: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingValue {
    pub symbol: String,
    pub amount: f64,
    pub price: f64,
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioValuation {
    pub total_value: f64,
    pub holdings: Vec<HoldingValue>,
    pub unavailable: Vec<String>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Feature {
    Home,
    BudgetPlanner,
    TaxCalculator,
    RetirementPlanner,
    LoanCalculator,
    StockMarketInsights,
    CryptoTracker,
    SustainabilityScore,
    FinancialLiteracy,
}

impl Feature {
    pub const ALL: [Feature; 9] = [
        Feature::Home,
        Feature::BudgetPlanner,
        Feature::TaxCalculator,
        Feature::RetirementPlanner,
        Feature::LoanCalculator,
        Feature::StockMarketInsights,
        Feature::CryptoTracker,
        Feature::SustainabilityScore,
        Feature::FinancialLiteracy,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Feature::Home => "Home",
            Feature::BudgetPlanner => "Budget Planner",
            Feature::TaxCalculator => "Tax Calculator",
            Feature::RetirementPlanner => "Retirement Planner",
            Feature::LoanCalculator => "Loan Calculator",
            Feature::StockMarketInsights => "Stock Market Insights",
            Feature::CryptoTracker => "Crypto Tracker",
            Feature::SustainabilityScore => "Sustainability Score",
            Feature::FinancialLiteracy => "Financial Literacy",
        }
    }

    /// API path serving the feature. Loan calculator covers both EMI and
    /// eligibility, so it points at the EMI endpoint.
    pub fn route(self) -> &'static str {
        match self {
            Feature::Home => "/api/features",
            Feature::BudgetPlanner => "/api/budget",
            Feature::TaxCalculator => "/api/tax",
            Feature::RetirementPlanner => "/api/retirement",
            Feature::LoanCalculator => "/api/emi",
            Feature::StockMarketInsights => "/api/stocks/:symbol",
            Feature::CryptoTracker => "/api/portfolio",
            Feature::SustainabilityScore => "/api/esg/:symbol",
            Feature::FinancialLiteracy => "/api/quiz",
        }
    }

    pub fn from_title(title: &str) -> Option<Feature> {
        Feature::ALL
            .into_iter()
            .find(|feature| feature.title().eq_ignore_ascii_case(title.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_titles_round_trip_through_lookup() {
        for feature in Feature::ALL {
            assert_eq!(Feature::from_title(feature.title()), Some(feature));
        }
        assert_eq!(
            Feature::from_title(" tax calculator "),
            Some(Feature::TaxCalculator)
        );
        assert_eq!(Feature::from_title("Exit"), None);
    }

    #[test]
    fn feature_routes_are_unique() {
        let mut routes: Vec<&str> = Feature::ALL.iter().map(|f| f.route()).collect();
        routes.sort_unstable();
        routes.dedup();
        assert_eq!(routes.len(), Feature::ALL.len());
    }

    #[test]
    fn open_bracket_upper_is_infinite() {
        assert_eq!(
            TaxBracket::new(10.0, None, 0.3).upper_or_infinity(),
            f64::INFINITY
        );
        assert_eq!(TaxBracket::new(0.0, Some(5.0), 0.0).upper_or_infinity(), 5.0);
    }

    #[test]
    fn eligibility_serializes_kebab_case() {
        let json = serde_json::to_string(&Eligibility::NotEligible).expect("should serialize");
        assert_eq!(json, "\"not-eligible\"");
        assert_eq!(Eligibility::NotEligible.label(), "Not Eligible");
    }
}
