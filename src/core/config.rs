use super::error::{EngineError, Result, ensure_finite};
use super::types::TaxBracket;

pub const DEFAULT_ELIGIBILITY_THRESHOLD: f64 = 0.4;
/// 25x annual expenses, the inverse of a 4% withdrawal rate.
pub const DEFAULT_RETIREMENT_MULTIPLE: f64 = 25.0;

pub const DEFAULT_TAX_BRACKETS: [TaxBracket; 4] = [
    TaxBracket::new(0.0, Some(250_000.0), 0.0),
    TaxBracket::new(250_001.0, Some(500_000.0), 0.05),
    TaxBracket::new(500_001.0, Some(1_000_000.0), 0.2),
    TaxBracket::new(1_000_001.0, None, 0.3),
];

pub const DEFAULT_ESG_SCORES: [(&str, u32); 3] = [("AAPL", 85), ("TSLA", 60), ("AMZN", 70)];

pub const TAX_SAVING_SUGGESTIONS: [&str; 4] = [
    "Invest in 80C: claim deductions up to 1,50,000 by investing in ELSS, PPF, or other tax-saving instruments.",
    "Medical Insurance (80D): claim deductions for health insurance premiums paid for yourself or family.",
    "Home Loan Interest (Section 24): deduct interest paid on your home loan (up to 2,00,000).",
    "Other Deductions: explore sections 80G (donations), 80E (education loans), and more.",
];

/// Business constants the calculators depend on.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub tax_brackets: Vec<TaxBracket>,
    pub eligibility_threshold: f64,
    pub retirement_multiple: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tax_brackets: DEFAULT_TAX_BRACKETS.to_vec(),
            eligibility_threshold: DEFAULT_ELIGIBILITY_THRESHOLD,
            retirement_multiple: DEFAULT_RETIREMENT_MULTIPLE,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        validate_brackets(&self.tax_brackets)?;

        validate_eligibility_threshold(self.eligibility_threshold)?;
        validate_retirement_multiple(self.retirement_multiple)?;
        Ok(())
    }
}

/// The debt-to-income cut-off must lie in `(0, 1]`.
pub(crate) fn validate_eligibility_threshold(threshold: f64) -> Result<()> {
    ensure_finite(threshold, "eligibility threshold")?;
    if threshold <= 0.0 || threshold > 1.0 {
        return Err(EngineError::OutOfRange {
            field: "eligibility threshold",
            min: 0.0,
            max: 1.0,
        });
    }
    Ok(())
}

pub(crate) fn validate_retirement_multiple(multiple: f64) -> Result<()> {
    ensure_finite(multiple, "retirement multiple")?;
    if multiple <= 0.0 {
        return Err(EngineError::OutOfRange {
            field: "retirement multiple",
            min: 0.0,
            max: f64::INFINITY,
        });
    }
    Ok(())
}

/// Checks the ordering and shape of a bracket table. Gaps between brackets are
/// allowed (the default table steps from 250000 to 250001), overlaps are not.
pub fn validate_brackets(brackets: &[TaxBracket]) -> Result<()> {
    let Some(last) = brackets.last() else {
        return Err(EngineError::InvalidBracketTable(
            "at least one bracket is required".to_string(),
        ));
    };
    if last.upper.is_some() {
        return Err(EngineError::InvalidBracketTable(
            "the final bracket must be unbounded".to_string(),
        ));
    }

    let mut prev_upper: Option<f64> = None;
    for (idx, bracket) in brackets.iter().enumerate() {
        if !bracket.lower.is_finite() || bracket.lower < 0.0 {
            return Err(EngineError::InvalidBracketTable(format!(
                "bracket {idx} lower bound must be finite and >= 0"
            )));
        }
        if !(0.0..=1.0).contains(&bracket.rate) {
            return Err(EngineError::InvalidBracketTable(format!(
                "bracket {idx} rate must be between 0 and 1"
            )));
        }
        if let Some(prev) = prev_upper {
            if bracket.lower < prev {
                return Err(EngineError::InvalidBracketTable(format!(
                    "bracket {idx} overlaps the previous bracket"
                )));
            }
        }
        match bracket.upper {
            Some(upper) => {
                if !upper.is_finite() || upper <= bracket.lower {
                    return Err(EngineError::InvalidBracketTable(format!(
                        "bracket {idx} upper bound must be finite and above its lower bound"
                    )));
                }
                prev_upper = Some(upper);
            }
            None if idx + 1 != brackets.len() => {
                return Err(EngineError::InvalidBracketTable(format!(
                    "only the final bracket may be unbounded, found one at {idx}"
                )));
            }
            None => {}
        }
    }
    Ok(())
}
