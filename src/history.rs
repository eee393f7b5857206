//! Market-data collaborators
//!
//! The detector never fetches data itself. A [`MarketData`] provider is asked
//! for history and a live price first; any failure there surfaces as
//! [`ChannelError::DataUnavailable`] before a scan starts.
//!
//! [`CsvMarketData`] reads an exported history file (`Datetime,Open,High,Low,Close,...`)
//! and pairs it with a fixed live price.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use tracing::debug;

use crate::{detect, ChannelError, DetectOptions, Detection, Result, Sample};

/// What history to ask a provider for
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HistoryRequest {
    pub symbol: String,
    /// Look-back span, e.g. "1mo"
    pub period: String,
    /// Bar size, e.g. "30m"
    pub interval: String,
}

impl HistoryRequest {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self { symbol: symbol.into(), period: "1mo".to_string(), interval: "30m".to_string() }
    }

    pub fn period(mut self, period: impl Into<String>) -> Self {
        self.period = period.into();
        self
    }

    pub fn interval(mut self, interval: impl Into<String>) -> Self {
        self.interval = interval.into();
        self
    }
}

/// Source of price history and live prices
pub trait MarketData {
    /// Ordered samples for the requested symbol/period/interval
    fn history(&self, request: &HistoryRequest) -> Result<Vec<Sample>>;

    /// Most recent traded price
    fn live_price(&self, symbol: &str) -> Result<f64>;
}

fn unavailable(e: ChannelError) -> ChannelError {
    match e {
        ChannelError::DataUnavailable(_) => e,
        other => ChannelError::DataUnavailable(other.to_string()),
    }
}

/// Fetch history and live price from `provider`, then run [`detect`].
pub fn analyze<P: MarketData + ?Sized>(
    provider: &P,
    request: &HistoryRequest,
    owns_position: bool,
    options: &DetectOptions,
) -> Result<Detection> {
    let history = provider.history(request).map_err(unavailable)?;
    if history.is_empty() {
        return Err(ChannelError::DataUnavailable(format!(
            "no price history for {}",
            request.symbol
        )));
    }

    let live_price = provider.live_price(&request.symbol).map_err(unavailable)?;
    if !live_price.is_finite() {
        return Err(ChannelError::DataUnavailable(format!(
            "live price for {} is not finite",
            request.symbol
        )));
    }

    debug!(
        symbol = %request.symbol,
        period = %request.period,
        interval = %request.interval,
        bars = history.len(),
        live_price,
        "market data loaded"
    );

    detect(&history, live_price, owns_position, options)
}

// ============================================================
// CSV PROVIDER
// ============================================================

/// History from a CSV export with a fixed live price
#[derive(Debug, Clone)]
pub struct CsvMarketData {
    path: PathBuf,
    live_price: f64,
}

impl CsvMarketData {
    pub fn new(path: impl AsRef<Path>, live_price: f64) -> Self {
        Self { path: path.as_ref().to_path_buf(), live_price }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MarketData for CsvMarketData {
    fn history(&self, request: &HistoryRequest) -> Result<Vec<Sample>> {
        let file = File::open(&self.path).map_err(|e| {
            ChannelError::DataUnavailable(format!("{}: {e}", self.path.display()))
        })?;
        debug!(path = %self.path.display(), symbol = %request.symbol, "reading price history");
        read_samples(BufReader::new(file))
    }

    fn live_price(&self, _symbol: &str) -> Result<f64> {
        Ok(self.live_price)
    }
}

const TIME_COLUMNS: [&str; 4] = ["datetime", "date", "time", "timestamp"];

fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
}

fn parse_number(field: Option<&str>, row: usize, column: &str) -> Result<f64> {
    let raw = field.unwrap_or("").trim();
    raw.parse::<f64>().map_err(|_| {
        ChannelError::DataUnavailable(format!("row {row}: invalid {column} value '{raw}'"))
    })
}

/// Parse a timestamp cell into seconds since the epoch.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS±HH:MM`, naive `YYYY-MM-DD HH:MM:SS`
/// (taken as UTC), plain dates, and integer epoch seconds.
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(dt.timestamp());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc().timestamp());
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp());
    }
    raw.parse::<i64>().ok()
}

/// Read samples from CSV with a header row.
///
/// Needs a time column and `High`/`Low` columns (case-insensitive); every
/// other column is ignored.
pub fn read_samples<R: Read>(reader: R) -> Result<Vec<Sample>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).flexible(true).from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| ChannelError::DataUnavailable(format!("unreadable header: {e}")))?
        .clone();
    let missing = |name: &str| ChannelError::DataUnavailable(format!("missing {name} column"));
    let time_col = find_column(&headers, &TIME_COLUMNS).ok_or_else(|| missing("time"))?;
    let high_col = find_column(&headers, &["high"]).ok_or_else(|| missing("high"))?;
    let low_col = find_column(&headers, &["low"]).ok_or_else(|| missing("low"))?;

    let mut samples = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| ChannelError::DataUnavailable(e.to_string()))?;
        let raw_time = record.get(time_col).unwrap_or("");
        let timestamp = parse_timestamp(raw_time).ok_or_else(|| {
            ChannelError::DataUnavailable(format!("row {row}: invalid timestamp '{raw_time}'"))
        })?;
        let high = parse_number(record.get(high_col), row, "high")?;
        let low = parse_number(record.get(low_col), row, "low")?;
        samples.push(Sample::new(timestamp, high, low));
    }

    Ok(samples)
}
