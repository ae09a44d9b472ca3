use thiserror::Error;

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Input validation failures. Arithmetic past validation is total, so these are
/// the only ways an engine call can fail.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("{field} must be >= 0")]
    NegativeInput { field: &'static str },

    #[error("annual income must be > 0 to compute a debt-to-income ratio")]
    ZeroIncomeDivision,

    #[error("{field} must be > 0")]
    NonPositiveTenure { field: &'static str },

    #[error("{field} must be a finite number")]
    NonFiniteInput { field: &'static str },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
    },

    #[error("invalid tax bracket table: {0}")]
    InvalidBracketTable(String),
}

impl EngineError {
    /// Stable tag used by the API error body.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::NegativeInput { .. } => "negative-input",
            EngineError::ZeroIncomeDivision => "zero-income-division",
            EngineError::NonPositiveTenure { .. } => "non-positive-tenure",
            EngineError::NonFiniteInput { .. } => "non-finite-input",
            EngineError::OutOfRange { .. } => "out-of-range",
            EngineError::InvalidBracketTable(_) => "invalid-bracket-table",
        }
    }
}

pub(crate) fn ensure_finite(value: f64, field: &'static str) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(EngineError::NonFiniteInput { field })
    }
}

pub(crate) fn ensure_non_negative(value: f64, field: &'static str) -> Result<()> {
    ensure_finite(value, field)?;
    if value < 0.0 {
        return Err(EngineError::NegativeInput { field });
    }
    Ok(())
}

pub(crate) fn ensure_in_range(value: f64, field: &'static str, min: f64, max: f64) -> Result<()> {
    ensure_finite(value, field)?;
    if !(min..=max).contains(&value) {
        return Err(EngineError::OutOfRange { field, min, max });
    }
    Ok(())
}
