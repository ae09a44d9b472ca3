use super::error::{Result, ensure_non_negative};
use super::lookup::PriceLookup;
use super::types::{
    BudgetStatus, BudgetSummary, ExpenseLine, ExpenseShare, Holding, HoldingValue, MarketInsight,
    PortfolioValuation, Trend,
};

pub const DEFAULT_EXPENSE_CATEGORIES: [&str; 6] = [
    "Rent",
    "Groceries",
    "Utilities",
    "Transportation",
    "Entertainment",
    "Others",
];

const QUIZ_ANSWER: &str = "investing";

pub fn default_expense_lines() -> Vec<ExpenseLine> {
    DEFAULT_EXPENSE_CATEGORIES
        .iter()
        .map(|category| ExpenseLine {
            category: category.to_string(),
            amount: 0.0,
        })
        .collect()
}

pub fn summarize_budget(monthly_income: f64, expenses: &[ExpenseLine]) -> Result<BudgetSummary> {
    ensure_non_negative(monthly_income, "monthly income")?;
    for line in expenses {
        ensure_non_negative(line.amount, "expense amount")?;
    }

    let total_expenses: f64 = expenses.iter().map(|line| line.amount).sum();
    let savings = monthly_income - total_expenses;
    let status = if savings < 0.0 {
        BudgetStatus::Overspending
    } else if savings == 0.0 {
        BudgetStatus::BreakEven
    } else {
        BudgetStatus::Saving
    };

    let distribution = expenses
        .iter()
        .map(|line| ExpenseShare {
            category: line.category.clone(),
            amount: line.amount,
            share_percent: if total_expenses > 0.0 {
                line.amount / total_expenses * 100.0
            } else {
                0.0
            },
        })
        .collect();

    Ok(BudgetSummary {
        monthly_income,
        total_expenses,
        savings,
        status,
        distribution,
    })
}

/// Latest close and direction over the window the lookup returns. A flat
/// window counts as `Down`.
pub fn market_insight(prices: &dyn PriceLookup, symbol: &str) -> Option<MarketInsight> {
    let closes = prices.recent_closes(symbol)?;
    let first = *closes.first()?;
    let latest_price = *closes.last()?;
    let trend = if latest_price > first {
        Trend::Up
    } else {
        Trend::Down
    };
    Some(MarketInsight {
        symbol: symbol.trim().to_ascii_uppercase(),
        latest_price,
        trend,
        observations: closes.len(),
    })
}

/// Holdings without a price are listed under `unavailable` and left out of
/// the total.
pub fn value_portfolio(
    prices: &dyn PriceLookup,
    holdings: &[Holding],
) -> Result<PortfolioValuation> {
    for holding in holdings {
        ensure_non_negative(holding.amount, "holding amount")?;
    }

    let mut total_value = 0.0;
    let mut valued = Vec::with_capacity(holdings.len());
    let mut unavailable = Vec::new();
    for holding in holdings {
        match prices.latest_price(&holding.symbol) {
            Some(price) => {
                let value = price * holding.amount;
                total_value += value;
                valued.push(HoldingValue {
                    symbol: holding.symbol.clone(),
                    amount: holding.amount,
                    price,
                    value,
                });
            }
            None => unavailable.push(holding.symbol.clone()),
        }
    }

    Ok(PortfolioValuation {
        total_value,
        holdings: valued,
        unavailable,
    })
}

pub fn check_quiz_answer(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case(QUIZ_ANSWER)
}
