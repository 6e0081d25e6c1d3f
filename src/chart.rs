// =============================================================================
// Chart description — the JSON handed to the browser
// =============================================================================
//
// Three panels, each a list of role-tagged series sharing the date axis:
//
//   price  — candlesticks, MA, upper/lower Bollinger band, optional volume
//            bars on a secondary axis
//   rsi    — RSI line, fixed [0, 100] range
//   macd   — MACD line and signal line
//
// Undefined values (leading windows, gaps) are serialised as `null` so the
// renderer breaks the line instead of drawing to zero.
// =============================================================================

use chrono::NaiveDate;
use serde::Serialize;

use crate::indicators::rsi::rsi_zone;
use crate::indicators::DerivedTable;
use crate::types::SeriesRole;

/// Which optional parts of the view were requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChartOptions {
    pub show_volume: bool,
    pub show_table: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartSpec {
    pub ticker: String,
    pub title: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub row_count: usize,
    pub panels: Vec<Panel>,
    pub latest: LatestReadings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<TableDump>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Panel {
    pub id: &'static str,
    pub title: String,
    pub x_axis_title: &'static str,
    pub y_axis_title: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_range: Option<[f64; 2]>,
    pub series: Vec<Series>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Serialize)]
pub struct Series {
    pub name: String,
    pub role: SeriesRole,
    pub axis: Axis,
    pub points: Points,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Points {
    Line(Vec<LinePoint>),
    Candles(Vec<CandlePoint>),
}

#[cfg(test)]
impl Points {
    pub fn len(&self) -> usize {
        match self {
            Self::Line(p) => p.len(),
            Self::Candles(p) => p.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinePoint {
    pub x: NaiveDate,
    pub y: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CandlePoint {
    pub x: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
}

/// Most recent reading of each overlay, for the summary strip above the
/// chart.
#[derive(Debug, Clone, Serialize)]
pub struct LatestReadings {
    pub date: Option<NaiveDate>,
    pub close: Option<f64>,
    pub ma: Option<f64>,
    pub rsi: Option<f64>,
    pub rsi_zone: Option<&'static str>,
    pub macd: Option<f64>,
    pub signal: Option<f64>,
}

/// Full derived table as rows of JSON cells.
#[derive(Debug, Clone, Serialize)]
pub struct TableDump {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

fn defined(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

fn line(table: &DerivedTable, values: &[f64]) -> Points {
    Points::Line(
        table
            .rows
            .iter()
            .zip(values)
            .map(|(row, &v)| LinePoint {
                x: row.date,
                y: defined(v),
            })
            .collect(),
    )
}

fn series(name: impl Into<String>, role: SeriesRole, points: Points) -> Series {
    Series {
        name: name.into(),
        role,
        axis: Axis::Primary,
        points,
    }
}

/// Build the chart description for `table`.
pub fn build_chart_spec(
    ticker: &str,
    start: NaiveDate,
    end: NaiveDate,
    table: &DerivedTable,
    options: ChartOptions,
) -> ChartSpec {
    let candles = Points::Candles(
        table
            .rows
            .iter()
            .map(|r| CandlePoint {
                x: r.date,
                open: defined(r.open),
                high: defined(r.high),
                low: defined(r.low),
                close: defined(r.close),
            })
            .collect(),
    );

    let mut price_series = vec![
        series("Price", SeriesRole::Candlestick, candles),
        series(
            format!("MA {}", table.params.ma_window),
            SeriesRole::Ma,
            line(table, &table.ma),
        ),
        series("Upper Band", SeriesRole::BandUpper, line(table, &table.bb_upper)),
        series("Lower Band", SeriesRole::BandLower, line(table, &table.bb_lower)),
    ];

    if options.show_volume {
        let volumes: Vec<f64> = table.rows.iter().map(|r| r.volume as f64).collect();
        price_series.push(Series {
            axis: Axis::Secondary,
            ..series("Volume", SeriesRole::Volume, line(table, &volumes))
        });
    }

    let panels = vec![
        Panel {
            id: "price",
            title: format!("{ticker} Stock Price"),
            x_axis_title: "Date",
            y_axis_title: "Price",
            y_range: None,
            series: price_series,
        },
        Panel {
            id: "rsi",
            title: format!("RSI {ticker}"),
            x_axis_title: "Date",
            y_axis_title: "RSI",
            y_range: Some([0.0, 100.0]),
            series: vec![series(
                format!("RSI {}", table.params.rsi_period),
                SeriesRole::Rsi,
                line(table, &table.rsi),
            )],
        },
        Panel {
            id: "macd",
            title: format!("MACD {ticker}"),
            x_axis_title: "Date",
            y_axis_title: "MACD",
            y_range: None,
            series: vec![
                series("MACD", SeriesRole::Macd, line(table, &table.macd)),
                series("Signal Line", SeriesRole::Signal, line(table, &table.signal)),
            ],
        },
    ];

    ChartSpec {
        ticker: ticker.to_string(),
        title: format!("{ticker} Stock Price"),
        start,
        end,
        row_count: table.len(),
        panels,
        latest: latest_readings(table),
        table: options.show_table.then(|| table_dump(table)),
    }
}

fn latest_readings(table: &DerivedTable) -> LatestReadings {
    let last = table.len().checked_sub(1);
    let pick = |col: &[f64]| last.and_then(|i| defined(col[i]));
    let rsi = pick(&table.rsi);

    LatestReadings {
        date: last.map(|i| table.rows[i].date),
        close: last.and_then(|i| defined(table.rows[i].close)),
        ma: pick(&table.ma),
        rsi,
        rsi_zone: rsi.and_then(rsi_zone),
        macd: pick(&table.macd),
        signal: pick(&table.signal),
    }
}

fn table_dump(table: &DerivedTable) -> TableDump {
    let cell = |v: f64| defined(v).map_or(serde_json::Value::Null, serde_json::Value::from);

    let rows = table
        .rows
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let mut out = vec![
                serde_json::Value::from(r.date.to_string()),
                cell(r.open),
                cell(r.high),
                cell(r.low),
                cell(r.close),
                serde_json::Value::from(r.volume),
            ];
            out.extend(table.derived_at(i).into_iter().map(&cell));
            out
        })
        .collect();

    TableDump {
        columns: table.column_names(),
        rows,
    }
}
