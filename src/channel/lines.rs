//! Channel line construction
//!
//! Lines live in position-extreme space. A matched side gets the line through
//! its candidate and match; an unmatched side gets the parallel through its
//! own candidate. Without any match there is no channel.

use super::{Candidates, Match};

/// One boundary line, materialized over every position of its window
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChannelLine {
    pub slope: f64,
    pub intercept: f64,
    pub values: Vec<f64>,
}

impl ChannelLine {
    /// Line through two `(position, value)` points. Positions must differ.
    pub fn through(a: (usize, f64), b: (usize, f64), len: usize) -> Self {
        let slope = (b.1 - a.1) / (b.0 as f64 - a.0 as f64);
        Self::parallel(slope, a, len)
    }

    /// Line with `slope` through `point`.
    pub fn parallel(slope: f64, point: (usize, f64), len: usize) -> Self {
        let intercept = point.1 - slope * point.0 as f64;
        let values = (0..len).map(|pos| slope * pos as f64 + intercept).collect();
        Self { slope, intercept, values }
    }

    #[inline]
    pub fn at(&self, position: usize) -> f64 {
        self.slope * position as f64 + self.intercept
    }

    /// Value at the most recent position.
    #[inline]
    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }
}

/// Which side(s) of the channel were confirmed by a second touch
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Anchor {
    /// Both lines built independently (slopes may differ)
    Both,
    /// Peak line matched, valley line derived as its parallel
    Peak,
    /// Valley line matched, peak line derived as its parallel
    Valley,
}

/// Most recent boundary values of a channel, ordered by value
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChannelLimits {
    pub lower: f64,
    pub upper: f64,
}

impl ChannelLimits {
    pub fn new(a: f64, b: f64) -> Self {
        Self { lower: a.min(b), upper: a.max(b) }
    }

    #[inline]
    pub fn span(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Two boundary lines over one window
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Channel {
    /// Line through the peak side
    pub peak_line: ChannelLine,
    /// Line through the valley side
    pub valley_line: ChannelLine,
    pub anchor: Anchor,
}

impl Channel {
    #[inline]
    pub fn len(&self) -> usize {
        self.peak_line.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.peak_line.values.is_empty()
    }

    /// `(lower, upper)` at a position, whichever line is numerically higher there.
    #[inline]
    pub fn bounds_at(&self, position: usize) -> (f64, f64) {
        let a = self.peak_line.at(position);
        let b = self.valley_line.at(position);
        (a.min(b), a.max(b))
    }

    /// Boundary values at the last position of the window.
    pub fn limits(&self) -> Option<ChannelLimits> {
        Some(ChannelLimits::new(self.peak_line.last()?, self.valley_line.last()?))
    }

    pub fn is_parallel(&self) -> bool {
        self.peak_line.slope == self.valley_line.slope
    }
}

/// Build the channel for a window from its candidates and matches.
///
/// `extreme` is the window's extreme column; it supplies the y-value of every
/// anchor point.
pub fn build_channel(
    extreme: &[f64],
    candidates: &Candidates,
    peak_match: Option<Match>,
    valley_match: Option<Match>,
) -> Option<Channel> {
    let len = extreme.len();
    let point = |pos: usize| (pos, extreme[pos]);

    let peak_anchor = point(candidates.peak);
    let valley_anchor = point(candidates.valley);

    match (peak_match, valley_match) {
        (Some(p), Some(v)) => Some(Channel {
            peak_line: ChannelLine::through(peak_anchor, point(p.position), len),
            valley_line: ChannelLine::through(valley_anchor, point(v.position), len),
            anchor: Anchor::Both,
        }),
        (Some(p), None) => {
            let peak_line = ChannelLine::through(peak_anchor, point(p.position), len);
            let valley_line = ChannelLine::parallel(peak_line.slope, valley_anchor, len);
            Some(Channel { peak_line, valley_line, anchor: Anchor::Peak })
        },
        (None, Some(v)) => {
            let valley_line = ChannelLine::through(valley_anchor, point(v.position), len);
            let peak_line = ChannelLine::parallel(valley_line.slope, peak_anchor, len);
            Some(Channel { peak_line, valley_line, anchor: Anchor::Valley })
        },
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(peak: usize, valley: usize, extreme: &[f64]) -> Candidates {
        Candidates {
            peak,
            valley,
            peak_value: extreme[peak],
            valley_value: extreme[valley],
        }
    }

    fn hit(position: usize) -> Option<Match> {
        Some(Match { position, deviation: 0.0 })
    }

    #[test]
    fn test_line_through_two_points() {
        let line = ChannelLine::through((2, 12.0), (6, 20.0), 8);
        assert!((line.slope - 2.0).abs() < 1e-12);
        assert!((line.intercept - 8.0).abs() < 1e-12);
        assert_eq!(line.values.len(), 8);
        assert!((line.values[7] - 22.0).abs() < 1e-12);
        assert_eq!(line.last(), Some(line.values[7]));
    }

    #[test]
    fn test_both_sides_matched() {
        let extreme = [110.0, 90.0, 101.0, 99.0, 111.0, 92.0];
        let c = candidates(4, 1, &extreme);
        let ch = build_channel(&extreme, &c, hit(0), hit(5)).unwrap();
        assert_eq!(ch.anchor, Anchor::Both);
        assert!((ch.peak_line.slope - 0.25).abs() < 1e-12);
        assert!((ch.valley_line.slope - 0.5).abs() < 1e-12);
        assert!(!ch.is_parallel());
    }

    #[test]
    fn test_peak_only_derives_parallel_valley() {
        let extreme = [110.0, 90.0, 101.0, 99.0, 112.0, 95.0];
        let c = candidates(4, 1, &extreme);
        let ch = build_channel(&extreme, &c, hit(0), None).unwrap();
        assert_eq!(ch.anchor, Anchor::Peak);
        assert!(ch.is_parallel());
        assert!((ch.valley_line.at(1) - 90.0).abs() < 1e-12);
    }

    #[test]
    fn test_valley_only_derives_parallel_peak() {
        let extreme = [108.0, 90.0, 101.0, 99.0, 112.0, 91.0];
        let c = candidates(4, 1, &extreme);
        let ch = build_channel(&extreme, &c, None, hit(5)).unwrap();
        assert_eq!(ch.anchor, Anchor::Valley);
        assert!(ch.is_parallel());
        assert!((ch.peak_line.at(4) - 112.0).abs() < 1e-12);
        assert!((ch.valley_line.slope - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_no_match_no_channel() {
        let extreme = [110.0, 90.0, 100.0];
        let c = candidates(0, 1, &extreme);
        assert!(build_channel(&extreme, &c, None, None).is_none());
    }

    #[test]
    fn test_limits_are_ordered() {
        let ch = Channel {
            peak_line: ChannelLine::parallel(-1.0, (0, 10.0), 20),
            valley_line: ChannelLine::parallel(1.0, (0, 0.0), 20),
            anchor: Anchor::Both,
        };
        // lines cross; at the last position the valley line is on top
        let limits = ch.limits().unwrap();
        assert_eq!(limits.lower, -9.0);
        assert_eq!(limits.upper, 19.0);
        assert_eq!(ch.bounds_at(0), (0.0, 10.0));
    }
}
