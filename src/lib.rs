//! # chanfind - trading channel detection
//!
//! Finds price channels (two boundary lines enclosing every high/low extreme of
//! a detrended window) over growing trailing windows of a price series, and
//! turns the live price's position inside each channel into trade advice.
//!
//! ## Quick Start
//!
//! ```rust
//! use chanfind::prelude::*;
//!
//! // A gently rising series oscillating inside a band
//! let series: Vec<Sample> = (0..120i64)
//!     .map(|i| {
//!         let t = i as f64;
//!         let wave = (t * 0.7).sin();
//!         Sample::new(i * 1800, 101.0 + 0.05 * t + wave, 99.0 + 0.05 * t + wave)
//!     })
//!     .collect();
//!
//! let detection = detect(&series, 104.0, false, &DetectOptions::default()).unwrap();
//! println!("{} ({} channels)", detection.verdict, detection.channels().count());
//! ```

pub mod channel;
pub mod history;
pub mod params;

pub mod prelude {
    pub use crate::{
        // Pipeline stages
        channel::*,
        // Entry points
        detect,
        detect_whole,
        fit_channel,
        // Market data
        history::{analyze, CsvMarketData, HistoryRequest, MarketData},
        // Parameters
        params::{ParamMeta, ParamType, Parameterized},
        // Types
        ChannelDetection,
        // Errors
        ChannelError,
        ChannelFit,
        ChannelScanner,
        DetectOptions,
        Detection,
        ErrorKind,
        Period,
        // Core traits
        PriceBar,
        PriceBarExt,
        Quote,
        Result,
        Sample,
        Tolerance,
        WindowIter,
        WindowOutcome,
        WindowReport,
    };
}

use channel::{
    build_channel, contains_all, detrend, locate, match_side, recommend, verdict, Advice, Channel,
    ChannelLimits, Recommendation, Side, TrendLine, Verdict,
};
use rayon::prelude::*;
use tracing::{debug, info, warn};

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, ChannelError>;

/// Errors that can occur during channel detection
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChannelError {
    #[error("Empty series")]
    EmptySeries,

    #[error("Insufficient data: need {need} bars, got {got}")]
    InsufficientData { need: usize, got: usize },

    #[error("Invalid sample at index {index}: {reason}")]
    InvalidSample { index: usize, reason: &'static str },

    #[error("Zero deviation at candidate position {position}")]
    ZeroDeviation { position: usize },

    #[error("Timestamps not strictly increasing at index {index}")]
    UnorderedTimestamps { index: usize },

    #[error("Invalid live price: {0}")]
    InvalidLivePrice(f64),

    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Data unavailable: {0}")]
    DataUnavailable(String),
}

/// Error category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Degenerate input. Inside a scan it skips one window; found while
    /// checking the series or live price it rejects the whole call
    Data,
    /// Invalid options; fatal for the whole scan
    Config,
    /// The market-data collaborator could not deliver
    Unavailable,
}

impl ChannelError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChannelError::EmptySeries
            | ChannelError::InsufficientData { .. }
            | ChannelError::InvalidSample { .. }
            | ChannelError::ZeroDeviation { .. }
            | ChannelError::UnorderedTimestamps { .. }
            | ChannelError::InvalidLivePrice(_) => ErrorKind::Data,
            ChannelError::InvalidValue(_)
            | ChannelError::OutOfRange { .. }
            | ChannelError::InvalidConfig(_) => ErrorKind::Config,
            ChannelError::DataUnavailable(_) => ErrorKind::Unavailable,
        }
    }

    #[inline]
    pub fn is_data_error(&self) -> bool {
        self.kind() == ErrorKind::Data
    }

    #[inline]
    pub fn is_config_error(&self) -> bool {
        self.kind() == ErrorKind::Config
    }
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Match tolerance in percent, in (0, 100]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Tolerance(f64);

impl Tolerance {
    /// Create a new Tolerance from a percentage (4.3 means 4.3%)
    pub fn new(pct: f64) -> Result<Self> {
        if pct.is_nan() || pct.is_infinite() {
            return Err(ChannelError::InvalidValue("Tolerance cannot be NaN or infinite"));
        }
        if pct <= 0.0 || pct > 100.0 {
            return Err(ChannelError::OutOfRange {
                field: "tolerance_pct",
                value: pct,
                min: 0.0,
                max: 100.0,
            });
        }
        Ok(Self(pct))
    }

    #[doc(hidden)]
    pub const fn new_const(pct: f64) -> Self {
        Self(pct)
    }

    /// Percentage value
    #[inline]
    pub fn pct(self) -> f64 {
        self.0
    }

    /// Value as a fraction (0.043 for 4.3%)
    #[inline]
    pub fn fraction(self) -> f64 {
        self.0 / 100.0
    }
}

impl serde::Serialize for Tolerance {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Tolerance {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Tolerance::new(value).map_err(serde::de::Error::custom)
    }
}

/// Period (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(ChannelError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// PRICE BAR TRAITS
// ============================================================

/// Core price sample trait
pub trait PriceBar {
    fn high(&self) -> f64;
    fn low(&self) -> f64;

    /// Seconds since the epoch, if known
    fn timestamp(&self) -> Option<i64> {
        None
    }
}

/// Extension trait with computed properties for price samples
pub trait PriceBarExt: PriceBar {
    /// Midpoint of the bar, the value the trend is fitted on
    #[inline]
    fn average(&self) -> f64 {
        (self.high() + self.low()) / 2.0
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    /// Validate sample consistency
    fn validate(&self) -> Result<()> {
        if self.high().is_nan() || self.low().is_nan() {
            return Err(ChannelError::InvalidSample { index: 0, reason: "NaN in high/low" });
        }
        if self.high().is_infinite() || self.low().is_infinite() {
            return Err(ChannelError::InvalidSample {
                index: 0,
                reason: "Infinite value in high/low",
            });
        }
        if self.high() < self.low() {
            return Err(ChannelError::InvalidSample { index: 0, reason: "high < low" });
        }
        Ok(())
    }
}

impl<T: PriceBar + ?Sized> PriceBarExt for T {}

/// One time step of price history
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Sample {
    pub timestamp: i64,
    pub high: f64,
    pub low: f64,
}

impl Sample {
    pub fn new(timestamp: i64, high: f64, low: f64) -> Self {
        Self { timestamp, high, low }
    }
}

impl PriceBar for Sample {
    #[inline]
    fn high(&self) -> f64 {
        self.high
    }

    #[inline]
    fn low(&self) -> f64 {
        self.low
    }

    #[inline]
    fn timestamp(&self) -> Option<i64> {
        Some(self.timestamp)
    }
}

// ============================================================
// OPTIONS
// ============================================================

pub const DEFAULT_TOLERANCE_PCT: f64 = 4.3;
pub const DEFAULT_TIME_MARGIN: usize = 6;
pub const DEFAULT_STEP: usize = 20;
/// Smallest window the pipeline accepts
pub const MIN_WINDOW: usize = 3;

/// Channel detection options
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DetectOptions {
    /// Maximum relative deviation error of a matching touch, in percent
    #[serde(rename = "tolerance_pct")]
    pub tolerance: Tolerance,
    /// Positions excluded on each side of a candidate when matching
    pub time_margin: usize,
    /// Window length increment
    pub step: Period,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            tolerance: Tolerance::new_const(DEFAULT_TOLERANCE_PCT),
            time_margin: DEFAULT_TIME_MARGIN,
            step: Period::new_const(DEFAULT_STEP),
        }
    }
}

impl DetectOptions {
    pub fn with_tolerance_pct(mut self, pct: f64) -> Result<Self> {
        self.tolerance = Tolerance::new(pct)?;
        Ok(self)
    }

    pub fn with_time_margin(mut self, margin: usize) -> Self {
        self.time_margin = margin;
        self
    }

    pub fn with_step(mut self, step: usize) -> Result<Self> {
        self.step = Period::new(step)?;
        Ok(self)
    }

    /// Check the options against the smallest window a scan will produce.
    pub fn validate(&self) -> Result<()> {
        let step = self.step.get();
        if step < MIN_WINDOW {
            return Err(ChannelError::InvalidConfig(format!(
                "step {step} is below the minimum window of {MIN_WINDOW} bars"
            )));
        }
        self.validate_window(step)
    }

    /// Check that `time_margin` leaves room for a match in a window of `len` bars.
    pub fn validate_window(&self, len: usize) -> Result<()> {
        if self.time_margin >= len {
            return Err(ChannelError::InvalidConfig(format!(
                "time_margin {} must be smaller than the window length {len}",
                self.time_margin
            )));
        }
        Ok(())
    }
}

// ============================================================
// SINGLE WINDOW PIPELINE
// ============================================================

/// An accepted channel with its window's trend
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ChannelFit {
    pub channel: Channel,
    /// Boundary values at the most recent position
    pub limits: ChannelLimits,
    /// Least-squares trend of the window, for rendering
    pub trend: TrendLine,
}

/// Run detrend, candidate search, matching, line construction and boundary
/// validation over one window. `Ok(None)` means no trend at this scale.
pub fn fit_channel<T: PriceBar>(
    bars: &[T],
    options: &DetectOptions,
) -> Result<Option<ChannelFit>> {
    if bars.len() < MIN_WINDOW {
        return Err(ChannelError::InsufficientData { need: MIN_WINDOW, got: bars.len() });
    }

    let window = detrend(bars)?;
    let candidates = locate(&window)?;

    let tolerance = options.tolerance.fraction();
    let margin = options.time_margin;
    let peak_match = match_side(&window, &candidates, Side::Peak, tolerance, margin)?;
    let valley_match = match_side(&window, &candidates, Side::Valley, tolerance, margin)?;

    let Some(channel) = build_channel(&window.extreme, &candidates, peak_match, valley_match)
    else {
        return Ok(None);
    };
    if !contains_all(&channel, &window.extreme) {
        return Ok(None);
    }
    let Some(limits) = channel.limits() else {
        return Ok(None);
    };

    Ok(Some(ChannelFit { channel, limits, trend: window.trend }))
}

// ============================================================
// SCANNER
// ============================================================

/// Live market state the advice is conditioned on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub live_price: f64,
    pub owns_position: bool,
}

impl Quote {
    pub fn new(live_price: f64, owns_position: bool) -> Result<Self> {
        if !live_price.is_finite() {
            return Err(ChannelError::InvalidLivePrice(live_price));
        }
        Ok(Self { live_price, owns_position })
    }
}

/// An accepted channel and the advice derived from it
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ChannelDetection {
    pub fit: ChannelFit,
    pub recommendation: Recommendation,
}

/// Result for one window
#[derive(Debug, Clone, PartialEq)]
pub enum WindowOutcome {
    /// No channel, or the channel failed boundary validation
    NoTrend,
    /// The window's data could not be processed
    Skipped(ChannelError),
    Trend(ChannelDetection),
}

/// One window of a scan
#[derive(Debug, Clone, PartialEq)]
pub struct WindowReport {
    /// Number of trailing bars in the window
    pub length: usize,
    pub outcome: WindowOutcome,
}

impl WindowReport {
    pub fn detection(&self) -> Option<&ChannelDetection> {
        match &self.outcome {
            WindowOutcome::Trend(d) => Some(d),
            _ => None,
        }
    }
}

/// Multi-window channel scanner
#[derive(Debug, Clone, Copy)]
pub struct ChannelScanner {
    options: DetectOptions,
}

impl ChannelScanner {
    /// Create a scanner, rejecting invalid options up front
    pub fn new(options: DetectOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    #[inline]
    pub fn options(&self) -> &DetectOptions {
        &self.options
    }

    /// Trailing window lengths for a series of `len` bars: step, 2*step, ... <= len.
    pub fn window_lengths(&self, len: usize) -> impl Iterator<Item = usize> {
        let step = self.options.step.get();
        (1..=len / step).map(move |k| k * step)
    }

    /// Analyse the trailing `length` bars.
    pub fn report<T: PriceBar>(&self, bars: &[T], length: usize, quote: &Quote) -> WindowReport {
        let offset = bars.len().saturating_sub(length);
        let window = &bars[offset..];

        let outcome = match fit_channel(window, &self.options) {
            Ok(Some(fit)) => {
                let recommendation =
                    recommend(quote.live_price, &fit.limits, quote.owns_position);
                debug!(
                    window = length,
                    lower = fit.limits.lower,
                    upper = fit.limits.upper,
                    advice = %recommendation.advice,
                    "trend identified"
                );
                WindowOutcome::Trend(ChannelDetection { fit, recommendation })
            },
            Ok(None) => {
                debug!(window = length, "no trend");
                WindowOutcome::NoTrend
            },
            Err(e) => {
                let e = match e {
                    ChannelError::InvalidSample { index, reason } => {
                        ChannelError::InvalidSample { index: index + offset, reason }
                    },
                    other => other,
                };
                warn!(window = length, error = %e, "window skipped");
                WindowOutcome::Skipped(e)
            },
        };

        WindowReport { length, outcome }
    }

    /// Lazy iterator over all windows, shortest first.
    pub fn iter<'a, T: PriceBar>(&'a self, bars: &'a [T], quote: Quote) -> WindowIter<'a, T> {
        WindowIter::new(self, bars, quote)
    }

    /// Scan all windows sequentially.
    pub fn scan<T: PriceBar>(&self, bars: &[T], quote: &Quote) -> Vec<WindowReport> {
        self.iter(bars, *quote).collect()
    }

    /// Scan all windows on the rayon pool. Same reports, same order as [`scan`](Self::scan).
    pub fn scan_parallel<T>(&self, bars: &[T], quote: &Quote) -> Vec<WindowReport>
    where
        T: PriceBar + Sync,
    {
        let step = self.options.step.get();
        (1..=bars.len() / step)
            .into_par_iter()
            .map(|k| self.report(bars, k * step, quote))
            .collect()
    }
}

// ============================================================
// WINDOW ITERATOR
// ============================================================

/// Iterator over trailing windows with their outcomes
pub struct WindowIter<'a, T: PriceBar> {
    scanner: &'a ChannelScanner,
    bars: &'a [T],
    quote: Quote,
    next_length: usize,
}

impl<'a, T: PriceBar> WindowIter<'a, T> {
    fn new(scanner: &'a ChannelScanner, bars: &'a [T], quote: Quote) -> Self {
        Self { scanner, bars, quote, next_length: scanner.options.step.get() }
    }
}

impl<'a, T: PriceBar> Iterator for WindowIter<'a, T> {
    type Item = WindowReport;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_length > self.bars.len() {
            return None;
        }

        let length = self.next_length;
        self.next_length += self.scanner.options.step.get();

        Some(self.scanner.report(self.bars, length, &self.quote))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let step = self.scanner.options.step.get();
        let remaining = if self.next_length > self.bars.len() {
            0
        } else {
            (self.bars.len() - self.next_length) / step + 1
        };
        (remaining, Some(remaining))
    }
}

impl<'a, T: PriceBar> ExactSizeIterator for WindowIter<'a, T> {}

// ============================================================
// ENTRY POINTS
// ============================================================

/// Result of a full scan
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// One report per window, ascending length
    pub windows: Vec<WindowReport>,
    pub verdict: Verdict,
}

impl Detection {
    fn from_windows(windows: Vec<WindowReport>) -> Self {
        let verdict = verdict(
            windows.iter().filter_map(|w| w.detection()).map(|d| d.recommendation.advice),
        );
        info!(
            found = windows.iter().filter(|w| w.detection().is_some()).count(),
            windows = windows.len(),
            verdict = %verdict,
            "channel scan finished"
        );
        Self { windows, verdict }
    }

    /// Accepted channels, ascending window length
    pub fn channels(&self) -> impl Iterator<Item = &ChannelDetection> {
        self.windows.iter().filter_map(|w| w.detection())
    }

    /// Advice of every accepted channel, ascending window length
    pub fn recommendations(&self) -> Vec<Advice> {
        self.channels().map(|d| d.recommendation.advice).collect()
    }
}

fn validate_series<T: PriceBar>(series: &[T]) -> Result<()> {
    if series.is_empty() {
        return Err(ChannelError::EmptySeries);
    }
    for (i, pair) in series.windows(2).enumerate() {
        if let (Some(prev), Some(curr)) = (pair[0].timestamp(), pair[1].timestamp()) {
            if curr <= prev {
                return Err(ChannelError::UnorderedTimestamps { index: i + 1 });
            }
        }
    }
    Ok(())
}

/// Scan every trailing window of `series` and aggregate the advice.
pub fn detect<T: PriceBar>(
    series: &[T],
    live_price: f64,
    owns_position: bool,
    options: &DetectOptions,
) -> Result<Detection> {
    let scanner = ChannelScanner::new(*options)?;
    let quote = Quote::new(live_price, owns_position)?;
    validate_series(series)?;

    Ok(Detection::from_windows(scanner.scan(series, &quote)))
}

/// Analyse the whole series as a single window.
///
/// Unlike [`detect`], a data error here has no other window to fall back to
/// and is returned.
pub fn detect_whole<T: PriceBar>(
    series: &[T],
    live_price: f64,
    owns_position: bool,
    options: &DetectOptions,
) -> Result<Detection> {
    let quote = Quote::new(live_price, owns_position)?;
    validate_series(series)?;
    options.validate_window(series.len())?;

    let outcome = match fit_channel(series, options)? {
        Some(fit) => {
            let recommendation = recommend(quote.live_price, &fit.limits, quote.owns_position);
            WindowOutcome::Trend(ChannelDetection { fit, recommendation })
        },
        None => WindowOutcome::NoTrend,
    };

    Ok(Detection::from_windows(vec![WindowReport { length: series.len(), outcome }]))
}

// ============================================================
// TESTS
// ============================================================
