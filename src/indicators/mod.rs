// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the overlays drawn on the chart.
// Every series function takes an immutable slice and returns a new `Vec<f64>`
// of the same length, with `NaN` wherever the trailing window does not yet
// hold enough history.  `table::derive_table` validates a price table and
// assembles all columns for one chart request.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod table;

pub use table::{derive_table, DerivedTable, IndicatorParams};

// =============================================================================
// Errors
// =============================================================================

/// Error raised when the input table cannot be processed.
///
/// Empty or all-`NaN` inputs are *not* errors; they simply produce undefined
/// columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndicatorError {
    /// Malformed price data (infinite values, unordered dates).
    InvalidInput { message: String },

    /// A window, period or span that cannot be computed.
    InvalidPeriod { name: &'static str, period: usize },
}

impl IndicatorError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn invalid_period(name: &'static str, period: usize) -> Self {
        Self::InvalidPeriod { name, period }
    }
}

impl std::fmt::Display for IndicatorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput { message } => write!(f, "invalid input: {message}"),
            Self::InvalidPeriod { name, period } => {
                write!(f, "invalid {name} {period}: must be greater than zero")
            }
        }
    }
}

impl std::error::Error for IndicatorError {}
