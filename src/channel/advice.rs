//! Trade advice from channel position, and the scan-wide verdict

use std::fmt;

use super::ChannelLimits;

/// Fraction of the channel span forming the lower band
pub const LOWER_BAND: f64 = 0.2;
/// Fraction of the channel span where the upper band starts
pub const UPPER_BAND: f64 = 0.8;

/// Trade direction advised for one window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Advice {
    Buy,
    Sell,
    Hold,
}

impl Advice {
    pub fn as_str(self) -> &'static str {
        match self {
            Advice::Buy => "Buy",
            Advice::Sell => "Sell",
            Advice::Hold => "Hold",
        }
    }

    /// Display colour for the live-price marker.
    pub fn color(self) -> &'static str {
        match self {
            Advice::Buy => "#21d952",
            Advice::Sell => "red",
            Advice::Hold => "grey",
        }
    }
}

impl fmt::Display for Advice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the live price sits relative to the channel limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Zone {
    BelowLower,
    LowerBand,
    Middle,
    UpperBand,
    AboveUpper,
}

impl Zone {
    /// Classify `price` against `limits`. Band edges belong to the bands,
    /// the upper limit itself counts as a breakout.
    pub fn classify(price: f64, limits: &ChannelLimits) -> Self {
        let lower_band_top = limits.lower + LOWER_BAND * limits.span();
        let upper_band_start = limits.lower + UPPER_BAND * limits.span();

        if price < limits.lower {
            Zone::BelowLower
        } else if price <= lower_band_top {
            Zone::LowerBand
        } else if price >= limits.upper {
            Zone::AboveUpper
        } else if price >= upper_band_start {
            Zone::UpperBand
        } else {
            Zone::Middle
        }
    }
}

/// Advice for one window with a valid channel
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Recommendation {
    pub advice: Advice,
    pub zone: Zone,
    pub color: &'static str,
}

/// Position the live price inside the channel and pick an action.
///
/// Breaking support while holding exits; breaking resistance while flat enters.
/// Near a boundary the action depends on ownership, mid-channel always holds.
pub fn recommend(live_price: f64, limits: &ChannelLimits, owns_position: bool) -> Recommendation {
    let zone = Zone::classify(live_price, limits);
    let advice = match (zone, owns_position) {
        (Zone::BelowLower, true) => Advice::Sell,
        (Zone::BelowLower, false) => Advice::Hold,
        (Zone::LowerBand, true) => Advice::Hold,
        (Zone::LowerBand, false) => Advice::Buy,
        (Zone::UpperBand, true) => Advice::Sell,
        (Zone::UpperBand, false) => Advice::Hold,
        (Zone::AboveUpper, true) => Advice::Hold,
        (Zone::AboveUpper, false) => Advice::Buy,
        (Zone::Middle, _) => Advice::Hold,
    };
    Recommendation { advice, zone, color: advice.color() }
}

// ============================================================
// VERDICT
// ============================================================

/// Overall call for a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Verdict {
    pub advice: Advice,
    /// The leading advice outnumbers the runner-up more than two to one
    pub strong: bool,
}

impl Default for Verdict {
    fn default() -> Self {
        Self { advice: Advice::Hold, strong: false }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.strong {
            write!(f, "Strong {}", self.advice)
        } else {
            write!(f, "{}", self.advice)
        }
    }
}

/// Majority vote over per-window advice.
///
/// Equal counts rank by first appearance. No advice at all yields plain Hold.
pub fn verdict<I>(advice: I) -> Verdict
where
    I: IntoIterator<Item = Advice>,
{
    let mut tally: Vec<(Advice, usize)> = Vec::with_capacity(3);
    for a in advice {
        match tally.iter_mut().find(|(seen, _)| *seen == a) {
            Some((_, count)) => *count += 1,
            None => tally.push((a, 1)),
        }
    }
    // stable: ties keep first-seen order
    tally.sort_by(|a, b| b.1.cmp(&a.1));

    match tally.as_slice() {
        [] => Verdict::default(),
        [(first, _)] => Verdict { advice: *first, strong: true },
        [(first, freq1), (_, freq2), ..] => Verdict {
            advice: *first,
            strong: *freq1 > 2 * *freq2,
        },
    }
}
