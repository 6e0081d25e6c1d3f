// =============================================================================
// Yahoo Finance chart client — daily OHLCV history
// =============================================================================
//
// GET {base}/v8/finance/chart/{ticker}?period1=..&period2=..&interval=1d
//
// `period1` / `period2` are UNIX seconds at midnight UTC of the start and
// end dates; the end date is exclusive.  Timestamps in the response mark the
// session open, shifted by the exchange `gmtoffset` before taking the
// calendar date.  An unknown symbol comes back as a 404 with
// `chart.error.code == "Not Found"`, which maps to an empty result.
// =============================================================================

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::MarketDataSource;
use crate::types::PriceRow;

const NOT_FOUND_CODE: &str = "Not Found";

/// HTTP client for the Yahoo Finance chart endpoint.
#[derive(Clone)]
pub struct YahooClient {
    base_url: String,
    client: reqwest::Client,
}

impl YahooClient {
    /// Create a client against `base_url` with the given request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let mut default_headers = HeaderMap::new();
        // The endpoint rejects requests without a browser-like agent.
        default_headers.insert(USER_AGENT, HeaderValue::from_static("Mozilla/5.0 ticker-dashboard"));

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(timeout)
            .build()
            .context("failed to build reqwest client")?;

        debug!(base_url = %base_url, "YahooClient initialised");

        Ok(Self { base_url, client })
    }

    /// The ticker is pushed as a single path segment, so `/`, `?` and `#`
    /// are percent-encoded rather than reshaping the request.
    fn chart_url(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("invalid market data base URL {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("market data base URL {} cannot take a path", self.base_url))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", ticker]);
        url.query_pairs_mut()
            .append_pair("period1", &midnight_utc(start).to_string())
            .append_pair("period2", &midnight_utc(end).to_string())
            .append_pair("interval", "1d")
            .append_pair("events", "history");
        Ok(url)
    }

    /// GET /v8/finance/chart/{ticker} (public).
    #[instrument(skip(self), name = "yahoo::get_daily_history")]
    pub async fn get_daily_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceRow>> {
        if start >= end {
            debug!("empty date range — nothing to fetch");
            return Ok(Vec::new());
        }

        let url = self.chart_url(ticker, start, end)?;

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .context("GET /v8/finance/chart request failed")?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .context("failed to read chart response body")?;

        let envelope: ChartEnvelope = match serde_json::from_str(&body) {
            Ok(env) => env,
            Err(e) if !status.is_success() => {
                anyhow::bail!("Yahoo GET /v8/finance/chart returned {status}: {e}")
            }
            Err(e) => return Err(e).context("failed to parse chart response"),
        };

        if let Some(err) = &envelope.chart.error {
            if err.code == NOT_FOUND_CODE {
                warn!(ticker, "ticker not found — returning no rows");
                return Ok(Vec::new());
            }
            anyhow::bail!(
                "Yahoo chart error {}: {}",
                err.code,
                err.description.as_deref().unwrap_or("no description")
            );
        }

        if !status.is_success() {
            anyhow::bail!("Yahoo GET /v8/finance/chart returned {status}");
        }

        let rows = rows_from_envelope(envelope)?;
        debug!(ticker, count = rows.len(), "daily history fetched");
        Ok(rows)
    }
}

#[async_trait]
impl MarketDataSource for YahooClient {
    async fn fetch(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PriceRow>> {
        self.get_daily_history(ticker, start, end).await
    }
}

impl std::fmt::Debug for YahooClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

// =============================================================================
// Response model
// =============================================================================

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

// =============================================================================
// Internal helpers
// =============================================================================

fn midnight_utc(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

fn value_at(column: &[Option<f64>], i: usize) -> Option<f64> {
    column.get(i).copied().flatten()
}

/// Turn a parsed chart response into ascending, date-unique rows.
///
/// Rows with no price at all are dropped; remaining gaps become NaN.  When a
/// date repeats (the provider sometimes appends the live session), the later
/// row wins.
fn rows_from_envelope(envelope: ChartEnvelope) -> Result<Vec<PriceRow>> {
    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };

    if result.timestamp.is_empty() {
        return Ok(Vec::new());
    }

    let quote = result
        .indicators
        .quote
        .into_iter()
        .next()
        .context("chart response missing quote block")?;

    let mut by_date: BTreeMap<NaiveDate, PriceRow> = BTreeMap::new();
    for (i, &ts) in result.timestamp.iter().enumerate() {
        let open = value_at(&quote.open, i);
        let high = value_at(&quote.high, i);
        let low = value_at(&quote.low, i);
        let close = value_at(&quote.close, i);

        if open.is_none() && high.is_none() && low.is_none() && close.is_none() {
            continue;
        }

        let date = DateTime::from_timestamp(ts + result.meta.gmtoffset, 0)
            .with_context(|| format!("timestamp {ts} out of range"))?
            .date_naive();

        let volume = value_at(&quote.volume, i)
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v.round() as u64)
            .unwrap_or(0);

        by_date.insert(
            date,
            PriceRow::new(
                date,
                open.unwrap_or(f64::NAN),
                high.unwrap_or(f64::NAN),
                low.unwrap_or(f64::NAN),
                close.unwrap_or(f64::NAN),
                volume,
            ),
        );
    }

    Ok(by_date.into_values().collect())
}

#[cfg(test)]
fn parse_chart(body: &str) -> Result<Vec<PriceRow>> {
    let envelope: ChartEnvelope = serde_json::from_str(body).context("failed to parse chart response")?;
    if let Some(err) = &envelope.chart.error {
        if err.code == NOT_FOUND_CODE {
            return Ok(Vec::new());
        }
        anyhow::bail!("Yahoo chart error {}", err.code);
    }
    rows_from_envelope(envelope)
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn parses_daily_rows() {
        // 2021-01-04 and 2021-01-05 at 14:30 UTC.
        let body = r#"{"chart":{"result":[{
            "meta":{"gmtoffset":-18000},
            "timestamp":[1609770600,1609857000],
            "indicators":{"quote":[{
                "open":[133.52,128.89],
                "high":[133.61,131.74],
                "low":[126.76,128.43],
                "close":[129.41,131.01],
                "volume":[143301900,97664900]
            }]}
        }],"error":null}}"#;

        let rows = parse_chart(body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, d(2021, 1, 4));
        assert_eq!(rows[1].date, d(2021, 1, 5));
        assert!((rows[0].close - 129.41).abs() < 1e-9);
        assert_eq!(rows[1].volume, 97_664_900);
    }

    #[test]
    fn not_found_is_empty() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        assert!(parse_chart(body).unwrap().is_empty());
    }

    #[test]
    fn other_chart_errors_bubble_up() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"Invalid input"}}}"#;
        assert!(parse_chart(body).is_err());
    }

    #[test]
    fn result_without_timestamps_is_empty() {
        let body = r#"{"chart":{"result":[{"meta":{},"indicators":{"quote":[{}]}}],"error":null}}"#;
        assert!(parse_chart(body).unwrap().is_empty());
    }

    #[test]
    fn null_rows_are_dropped_and_gaps_become_nan() {
        let body = r#"{"chart":{"result":[{
            "timestamp":[1609770600,1609857000,1609943400],
            "indicators":{"quote":[{
                "open":[1.0,null,3.0],
                "high":[1.0,null,3.5],
                "low":[1.0,null,2.5],
                "close":[1.0,null,null],
                "volume":[10,null,null]
            }]}
        }],"error":null}}"#;

        let rows = parse_chart(body).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[1].close.is_nan());
        assert_eq!(rows[1].volume, 0);
    }

    #[test]
    fn duplicate_dates_keep_the_later_row() {
        let body = r#"{"chart":{"result":[{
            "timestamp":[1609770600,1609790000],
            "indicators":{"quote":[{
                "open":[1.0,2.0],"high":[1.0,2.0],"low":[1.0,2.0],"close":[1.0,2.0],"volume":[1,2]
            }]}
        }],"error":null}}"#;

        let rows = parse_chart(body).unwrap();
        assert_eq!(rows.len(), 1);
        assert!((rows[0].close - 2.0).abs() < 1e-12);
    }

    #[test]
    fn non_numeric_price_is_an_error() {
        let body = r#"{"chart":{"result":[{
            "timestamp":[1609770600],
            "indicators":{"quote":[{"open":["abc"],"high":[1.0],"low":[1.0],"close":[1.0]}]}
        }],"error":null}}"#;
        assert!(parse_chart(body).is_err());
    }

    #[test]
    fn chart_url_uses_midnight_bounds() {
        let client = YahooClient::new("https://example.test/", Duration::from_secs(1)).unwrap();
        let url = client.chart_url("AAPL", d(2021, 1, 1), d(2021, 1, 2)).unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.test/v8/finance/chart/AAPL?period1=1609459200&period2=1609545600&interval=1d&events=history"
        );
    }

    #[test]
    fn chart_url_encodes_reserved_ticker_characters() {
        let client = YahooClient::new("https://example.test", Duration::from_secs(1)).unwrap();
        let url = client
            .chart_url("BRK/B?period1=0&x#frag", d(2021, 1, 1), d(2021, 1, 2))
            .unwrap();

        let segments: Vec<&str> = url.path_segments().unwrap().collect();
        assert_eq!(segments.len(), 4);
        assert_eq!(segments[..3], ["v8", "finance", "chart"]);
        assert!(!segments[3].contains('/'));
        assert!(url.fragment().is_none());

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("period1".to_string(), "1609459200".to_string()),
                ("period2".to_string(), "1609545600".to_string()),
                ("interval".to_string(), "1d".to_string()),
                ("events".to_string(), "history".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn empty_range_skips_the_request() {
        let client = YahooClient::new("http://127.0.0.1:9", Duration::from_millis(50)).unwrap();
        let rows = client
            .fetch("AAPL", d(2021, 1, 1), d(2021, 1, 1))
            .await
            .unwrap();
        assert!(rows.is_empty());
    }
}
