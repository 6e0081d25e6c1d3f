// =============================================================================
// Dashboard request flow
// =============================================================================
//
// One chart request, start to finish:
//
//   1. normalise the ticker            (empty => rejected)
//   2. check the date range            (start after end => rejected, no fetch)
//   3. check slider values             (outside bounds => rejected, no fetch)
//   4. fetch daily rows                (error => generic message)
//   5. empty result                    => warning, no chart
//   6. derive overlay columns          (error => generic message)
//   7. build the chart description
//
// Every failure carries the exact text shown to the user.
// =============================================================================

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::chart::{build_chart_spec, ChartOptions, ChartSpec};
use crate::indicators::{derive_table, IndicatorParams};
use crate::market_data::MarketDataSource;
use crate::runtime_config::ChartDefaults;
use crate::types::SliderBounds;

/// Fully resolved inputs for one chart view.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRequest {
    pub ticker: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub ma_window: usize,
    pub bb_window: usize,
    pub rsi_period: usize,
    pub show_volume: bool,
    pub show_table: bool,
}

/// What the view shows when the request was valid.
#[derive(Debug, Clone)]
pub enum DashboardOutcome {
    Chart(Box<ChartSpec>),
    NoData { ticker: String, warning: String },
}

/// Why a request produced no view.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardError {
    EmptyTicker,
    DateOrder { start: NaiveDate, end: NaiveDate },
    InvalidParameter {
        name: &'static str,
        value: usize,
        bounds: SliderBounds,
    },
    Fetch(String),
    Compute(String),
}

impl std::fmt::Display for DashboardError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTicker => write!(f, "Please enter a ticker symbol."),
            Self::DateOrder { .. } => write!(f, "Start date must be before end date."),
            Self::InvalidParameter { name, value, bounds } => write!(
                f,
                "{name} must be between {} and {} (got {value}).",
                bounds.min, bounds.max
            ),
            Self::Fetch(msg) | Self::Compute(msg) => write!(
                f,
                "An error occurred: {msg}. Please check the ticker symbol and date range."
            ),
        }
    }
}

impl std::error::Error for DashboardError {}

fn check_bounds(name: &'static str, value: usize, bounds: SliderBounds) -> Result<(), DashboardError> {
    if bounds.contains(value) {
        Ok(())
    } else {
        Err(DashboardError::InvalidParameter { name, value, bounds })
    }
}

/// Run one chart request against `source`.
pub async fn build_dashboard(
    source: &dyn MarketDataSource,
    defaults: &ChartDefaults,
    request: &ChartRequest,
) -> Result<DashboardOutcome, DashboardError> {
    let ticker = request.ticker.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(DashboardError::EmptyTicker);
    }

    if request.start > request.end {
        warn!(start = %request.start, end = %request.end, "rejected: start date after end date");
        return Err(DashboardError::DateOrder {
            start: request.start,
            end: request.end,
        });
    }

    check_bounds("Moving average window", request.ma_window, defaults.ma_window)?;
    check_bounds("Bollinger window", request.bb_window, defaults.bb_window)?;
    check_bounds("RSI period", request.rsi_period, defaults.rsi_period)?;

    let rows = source
        .fetch(&ticker, request.start, request.end)
        .await
        .map_err(|e| {
            warn!(ticker = %ticker, error = %e, "market data fetch failed");
            DashboardError::Fetch(e.to_string())
        })?;

    if rows.is_empty() {
        warn!(ticker = %ticker, "no rows for requested range");
        return Ok(DashboardOutcome::NoData {
            warning: format!("No data found for ticker {ticker} in the selected date range."),
            ticker,
        });
    }

    let params = IndicatorParams {
        ma_window: request.ma_window,
        bb_window: request.bb_window,
        rsi_period: request.rsi_period,
        band_multiplier: defaults.band_multiplier,
    };

    let table = derive_table(&rows, &params).map_err(|e| {
        warn!(ticker = %ticker, error = %e, "indicator computation failed");
        DashboardError::Compute(e.to_string())
    })?;

    let options = ChartOptions {
        show_volume: request.show_volume,
        show_table: request.show_table,
    };
    let spec = build_chart_spec(&ticker, request.start, request.end, &table, options);

    info!(ticker = %ticker, rows = table.len(), "chart built");
    Ok(DashboardOutcome::Chart(Box::new(spec)))
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::StaticSource;
    use crate::types::PriceRow;
    use chrono::Duration;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn rising_rows(n: usize) -> Vec<PriceRow> {
        (0..n)
            .map(|i| {
                let c = 10.0 + i as f64;
                PriceRow::new(d(2021, 1, 1) + Duration::days(i as i64), c, c, c, c, 100)
            })
            .collect()
    }

    fn request(ticker: &str, start: NaiveDate, end: NaiveDate) -> ChartRequest {
        ChartRequest {
            ticker: ticker.to_string(),
            start,
            end,
            ma_window: 5,
            bb_window: 5,
            rsi_period: 14,
            show_volume: false,
            show_table: false,
        }
    }

    #[tokio::test]
    async fn builds_chart_for_known_ticker() {
        let source = StaticSource::new().with_table("AAPL", rising_rows(11));
        let outcome = build_dashboard(&source, &ChartDefaults::default(), &request("aapl ", d(2021, 1, 1), d(2021, 2, 1)))
            .await
            .unwrap();

        let DashboardOutcome::Chart(spec) = outcome else {
            panic!("expected a chart");
        };
        assert_eq!(spec.ticker, "AAPL");
        assert_eq!(spec.row_count, 11);

        let crate::chart::Points::Line(ma) = &spec.panels[0].series[1].points else {
            panic!("MA should be a line series");
        };
        assert!(ma[3].y.is_none());
        assert_eq!(ma[4].y, Some(12.0));
        assert_eq!(ma[10].y, Some(18.0));
    }

    #[tokio::test]
    async fn empty_fetch_is_a_warning() {
        let source = StaticSource::new();
        let outcome = build_dashboard(&source, &ChartDefaults::default(), &request("ZZZZ", d(2020, 1, 1), d(2021, 1, 1)))
            .await
            .unwrap();

        match outcome {
            DashboardOutcome::NoData { ticker, warning } => {
                assert_eq!(ticker, "ZZZZ");
                assert_eq!(warning, "No data found for ticker ZZZZ in the selected date range.");
            }
            DashboardOutcome::Chart(_) => panic!("no chart expected"),
        }
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test]
    async fn start_after_end_rejected_before_fetch() {
        let source = StaticSource::new().with_table("AAPL", rising_rows(30));
        let err = build_dashboard(&source, &ChartDefaults::default(), &request("AAPL", d(2021, 6, 1), d(2021, 1, 1)))
            .await
            .unwrap_err();

        assert!(matches!(err, DashboardError::DateOrder { .. }));
        assert_eq!(err.to_string(), "Start date must be before end date.");
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn out_of_bounds_slider_rejected_before_fetch() {
        let source = StaticSource::new();
        let mut req = request("AAPL", d(2021, 1, 1), d(2021, 2, 1));
        req.rsi_period = 21;
        let err = build_dashboard(&source, &ChartDefaults::default(), &req).await.unwrap_err();

        assert!(matches!(err, DashboardError::InvalidParameter { name: "RSI period", value: 21, .. }));
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn empty_ticker_rejected() {
        let source = StaticSource::new();
        let err = build_dashboard(&source, &ChartDefaults::default(), &request("  ", d(2021, 1, 1), d(2021, 2, 1)))
            .await
            .unwrap_err();
        assert_eq!(err, DashboardError::EmptyTicker);
    }

    #[tokio::test]
    async fn fetch_failure_becomes_generic_message() {
        let source = StaticSource::failing("connection reset");
        let err = build_dashboard(&source, &ChartDefaults::default(), &request("AAPL", d(2021, 1, 1), d(2021, 2, 1)))
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "An error occurred: connection reset. Please check the ticker symbol and date range."
        );
    }

    #[tokio::test]
    async fn malformed_rows_become_generic_message() {
        let mut rows = rising_rows(10);
        rows[3].close = f64::INFINITY;
        let source = StaticSource::new().with_table("AAPL", rows);
        let err = build_dashboard(&source, &ChartDefaults::default(), &request("AAPL", d(2021, 1, 1), d(2021, 2, 1)))
            .await
            .unwrap_err();

        assert!(matches!(err, DashboardError::Compute(_)));
        assert!(err.to_string().starts_with("An error occurred: invalid input"));
    }
}
