use std::collections::HashMap;
use std::fs;
use std::path::Path;

use thiserror::Error;

use super::config::DEFAULT_ESG_SCORES;

/// Source of recent closing prices. `None` means the symbol is unavailable.
pub trait PriceLookup: Send + Sync {
    /// Closing prices, oldest first.
    fn recent_closes(&self, symbol: &str) -> Option<Vec<f64>>;

    fn latest_price(&self, symbol: &str) -> Option<f64> {
        self.recent_closes(symbol)
            .and_then(|closes| closes.last().copied())
    }
}

pub trait EsgLookup: Send + Sync {
    fn esg_score(&self, symbol: &str) -> Option<u32>;
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("failed to read price file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid price file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("price for {symbol} must be finite and >= 0")]
    InvalidPrice { symbol: String },
}

fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

/// In-memory price history keyed by upper-case symbol.
#[derive(Debug, Clone, Default)]
pub struct PriceBook {
    closes: HashMap<String, Vec<f64>>,
}

impl PriceBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_closes(mut self, symbol: &str, closes: Vec<f64>) -> Self {
        self.insert(symbol, closes);
        self
    }

    pub fn insert(&mut self, symbol: &str, closes: Vec<f64>) {
        self.closes.insert(normalize_symbol(symbol), closes);
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    /// Parses `{"SYMBOL": [close, ...], ...}`.
    pub fn from_json_str(json: &str) -> Result<Self, LookupError> {
        let raw: HashMap<String, Vec<f64>> = serde_json::from_str(json)?;
        let mut book = Self::new();
        for (symbol, closes) in raw {
            if closes.iter().any(|price| !price.is_finite() || *price < 0.0) {
                return Err(LookupError::InvalidPrice { symbol });
            }
            book.insert(&symbol, closes);
        }
        Ok(book)
    }

    pub fn from_path(path: &Path) -> Result<Self, LookupError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

impl PriceLookup for PriceBook {
    fn recent_closes(&self, symbol: &str) -> Option<Vec<f64>> {
        self.closes
            .get(&normalize_symbol(symbol))
            .filter(|closes| !closes.is_empty())
            .cloned()
    }
}

#[derive(Debug, Clone)]
pub struct EsgTable {
    scores: HashMap<String, u32>,
}

impl Default for EsgTable {
    fn default() -> Self {
        Self {
            scores: DEFAULT_ESG_SCORES
                .iter()
                .map(|(symbol, score)| (symbol.to_string(), *score))
                .collect(),
        }
    }
}

impl EsgTable {
    /// Adds a score or replaces the one already held for `symbol`.
    pub fn with_score(mut self, symbol: &str, score: u32) -> Self {
        self.scores.insert(normalize_symbol(symbol), score);
        self
    }
}

impl EsgLookup for EsgTable {
    fn esg_score(&self, symbol: &str) -> Option<u32> {
        self.scores.get(&normalize_symbol(symbol)).copied()
    }
}
