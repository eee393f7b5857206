//! Extreme location and symmetric matching
//!
//! The peak candidate is the largest `delta_peak`, the valley candidate the
//! smallest `delta_valley`. Each candidate then looks for a second touch of
//! similar depth outside its quiet zone, preferring the furthest one.

use super::Detrended;
use crate::{ChannelError, Result};

/// Peak and valley candidates of a window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidates {
    pub peak: usize,
    pub valley: usize,
    /// Extreme (price space) value at the peak candidate
    pub peak_value: f64,
    /// Extreme (price space) value at the valley candidate
    pub valley_value: f64,
}

/// A second touch point found for a candidate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    pub position: usize,
    pub deviation: f64,
}

/// Which deviation column a search runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Peak,
    Valley,
}

/// Locate peak/valley candidates. Ties resolve to the earliest position.
pub fn locate(window: &Detrended) -> Result<Candidates> {
    if window.is_empty() {
        return Err(ChannelError::EmptySeries);
    }

    let mut peak = 0;
    let mut valley = 0;
    for pos in 1..window.len() {
        if window.delta_peak[pos] > window.delta_peak[peak] {
            peak = pos;
        }
        if window.delta_valley[pos] < window.delta_valley[valley] {
            valley = pos;
        }
    }

    Ok(Candidates {
        peak,
        valley,
        peak_value: window.extreme[peak],
        valley_value: window.extreme[valley],
    })
}

/// Relative deviation error between a point and its candidate.
///
/// Divides by the absolute candidate deviation on both sides so the measure
/// does not change sign with the deviation.
#[inline]
pub fn relative_error(value: f64, reference: f64) -> f64 {
    (value - reference).abs() / reference.abs()
}

/// Find the furthest position whose deviation is within `tolerance` (a fraction)
/// of `deltas[candidate]`, excluding `candidate ± time_margin`.
///
/// `Ok(None)` means this side has no second touch, which is a normal outcome.
/// Equal distances on both sides resolve to the earlier position.
pub fn find_match(
    deltas: &[f64],
    candidate: usize,
    tolerance: f64,
    time_margin: usize,
) -> Result<Option<Match>> {
    let reference = *deltas.get(candidate).ok_or(ChannelError::InsufficientData {
        need: candidate + 1,
        got: deltas.len(),
    })?;
    if reference == 0.0 {
        return Err(ChannelError::ZeroDeviation { position: candidate });
    }

    let mut best: Option<Match> = None;
    for (pos, &value) in deltas.iter().enumerate() {
        let distance = pos.abs_diff(candidate);
        if distance <= time_margin {
            continue;
        }
        // NaN never qualifies
        if !(relative_error(value, reference) <= tolerance) {
            continue;
        }
        let further = match best {
            Some(m) => distance > m.position.abs_diff(candidate),
            None => true,
        };
        if further {
            best = Some(Match { position: pos, deviation: value });
        }
    }

    Ok(best)
}

/// Run [`find_match`] for one side of a detrended window.
pub fn match_side(
    window: &Detrended,
    candidates: &Candidates,
    side: Side,
    tolerance: f64,
    time_margin: usize,
) -> Result<Option<Match>> {
    match side {
        Side::Peak => find_match(&window.delta_peak, candidates.peak, tolerance, time_margin),
        Side::Valley => {
            find_match(&window.delta_valley, candidates.valley, tolerance, time_margin)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::TrendLine;

    fn window(delta_peak: Vec<f64>, delta_valley: Vec<f64>) -> Detrended {
        let extreme = delta_peak
            .iter()
            .zip(&delta_valley)
            .map(|(&p, &v): (&f64, &f64)| if v.abs() > p.abs() { v } else { p })
            .collect();
        Detrended {
            trend: TrendLine { slope: 0.0, intercept: 0.0 },
            delta_peak,
            delta_valley,
            extreme,
        }
    }

    #[test]
    fn test_locate_first_occurrence() {
        let w = window(vec![1.0, 3.0, 1.5, 3.0], vec![-1.0, -0.5, -2.0, -2.0]);
        let c = locate(&w).unwrap();
        assert_eq!(c.peak, 1);
        assert_eq!(c.valley, 2);
        assert_eq!(c.peak_value, 3.0);
        assert_eq!(c.valley_value, -2.0);
    }

    #[test]
    fn test_locate_empty() {
        let w = window(vec![], vec![]);
        assert!(matches!(locate(&w), Err(ChannelError::EmptySeries)));
    }

    #[test]
    fn test_match_skips_quiet_zone() {
        // position 1 equals the candidate but sits inside the margin
        let deltas = [0.1, 2.0, 2.0, 0.0, 0.0, 1.96, 0.2];
        let m = find_match(&deltas, 2, 0.043, 2).unwrap().unwrap();
        assert_eq!(m.position, 5);
        assert_eq!(m.deviation, 1.96);
    }

    #[test]
    fn test_match_prefers_furthest() {
        let deltas = [0.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 2.05, 2.01];
        let m = find_match(&deltas, 4, 0.05, 1).unwrap().unwrap();
        assert_eq!(m.position, 8);
    }

    #[test]
    fn test_match_tie_goes_to_earlier() {
        let deltas = [2.0, 0.0, 0.0, 2.0, 0.0, 0.0, 2.0];
        let m = find_match(&deltas, 3, 0.01, 1).unwrap().unwrap();
        assert_eq!(m.position, 0);
    }

    #[test]
    fn test_match_none_outside_tolerance() {
        let deltas = [1.0, 0.0, 0.0, 2.0, 0.0, 0.0, 1.5];
        assert_eq!(find_match(&deltas, 3, 0.043, 1).unwrap(), None);
    }

    #[test]
    fn test_match_negative_deviation_uses_absolute_reference() {
        let deltas = [-1.97, 0.0, 0.0, -2.0, 0.0, 0.0, 0.0];
        let m = find_match(&deltas, 3, 0.043, 2).unwrap().unwrap();
        assert_eq!(m.position, 0);
    }

    #[test]
    fn test_match_skips_nan_deviation() {
        let deltas = [f64::NAN, 0.0, 0.0, 2.0, 0.0, 0.0, f64::NAN];
        assert_eq!(find_match(&deltas, 3, 0.043, 1).unwrap(), None);

        let deltas = [f64::NAN, 1.99, 0.0, 2.0, 0.0, 0.0, f64::NAN];
        assert_eq!(find_match(&deltas, 3, 0.043, 1).unwrap().unwrap().position, 1);
    }

    #[test]
    fn test_match_nan_reference_finds_nothing() {
        let deltas = [1.0, 0.0, f64::NAN, 0.0, 1.0];
        assert_eq!(find_match(&deltas, 2, 0.043, 0).unwrap(), None);
    }

    #[test]
    fn test_match_zero_reference() {
        let deltas = [0.0, 1.0, 0.0];
        assert!(matches!(
            find_match(&deltas, 0, 0.043, 0),
            Err(ChannelError::ZeroDeviation { position: 0 })
        ));
    }
}
