use thiserror::Error;

/// Validation and contract errors exposed by `dcfdesk-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter: '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("invalid source '{value}', expected one of yahoo, static")]
    InvalidSource { value: String },
    #[error("invalid history range '{value}', expected one of 1y, 2y, 5y, 10y, max")]
    InvalidRange { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
    #[error("date must be YYYY-MM-DD: '{value}'")]
    InvalidDate { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },

    #[error("request_id must be at least 8 characters")]
    InvalidRequestId,
    #[error("trace_id must be 32 hex characters")]
    InvalidTraceId,
    #[error("schema_version must match vMAJOR.MINOR.PATCH: '{value}'")]
    InvalidSchemaVersion { value: String },
    #[error("source_chain must contain at least one source")]
    EmptySourceChain,

    #[error("error code cannot be empty")]
    EmptyErrorCode,
    #[error("error message cannot be empty")]
    EmptyErrorMessage,
}

/// Failures raised by the valuation calculators.
///
/// Every calculator reports one of these instead of returning zero, `NaN`
/// or a value with the wrong sign; the caller decides how to present it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValuationError {
    /// The provider had no value for a field the calculation needs.
    #[error("missing data: {field}")]
    MissingData { field: &'static str },

    /// A caller-supplied assumption violates a precondition.
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// A denominator collapsed to (near) zero.
    #[error("degenerate arithmetic: {reason}")]
    ArithmeticDegenerate { reason: String },
}

impl ValuationError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn degenerate(reason: impl Into<String>) -> Self {
        Self::ArithmeticDegenerate {
            reason: reason.into(),
        }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingData { .. } => "valuation.missing_data",
            Self::InvalidInput { .. } => "valuation.invalid_input",
            Self::ArithmeticDegenerate { .. } => "valuation.arithmetic_degenerate",
        }
    }
}
