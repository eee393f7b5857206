//! Linear detrending of a window
//!
//! Fits `average ~ slope * position + intercept` by ordinary least squares and
//! derives the peak/valley deviations and the combined extreme column in a
//! single pass over the window.

use crate::{ChannelError, PriceBar, PriceBarExt, Result};

/// Straight line over the window's position axis
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrendLine {
    pub slope: f64,
    pub intercept: f64,
}

impl TrendLine {
    #[inline]
    pub fn at(&self, position: usize) -> f64 {
        self.slope * position as f64 + self.intercept
    }

    /// Values at the first and last position of a window of `len` bars.
    pub fn endpoints(&self, len: usize) -> (f64, f64) {
        (self.at(0), self.at(len.saturating_sub(1)))
    }
}

/// A window enriched with its trend and deviation columns
#[derive(Debug, Clone)]
pub struct Detrended {
    pub trend: TrendLine,
    /// `high - trend(pos)`
    pub delta_peak: Vec<f64>,
    /// `low - trend(pos)`
    pub delta_valley: Vec<f64>,
    /// Larger-magnitude deviation added back onto the trend (price space)
    pub extreme: Vec<f64>,
}

impl Detrended {
    #[inline]
    pub fn len(&self) -> usize {
        self.extreme.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.extreme.is_empty()
    }
}

/// Ordinary least-squares fit of `ys` against positions `0..ys.len()`.
pub fn fit_line(ys: &[f64]) -> Result<TrendLine> {
    let n = ys.len();
    if n == 0 {
        return Err(ChannelError::EmptySeries);
    }
    if n < 2 {
        return Err(ChannelError::InsufficientData { need: 2, got: n });
    }

    let count = n as f64;
    let mean_x = (count - 1.0) / 2.0;
    let mean_y = ys.iter().sum::<f64>() / count;

    let (sxy, sxx) = ys.iter().enumerate().fold((0.0, 0.0), |(sxy, sxx), (i, &y)| {
        let dx = i as f64 - mean_x;
        (sxy + dx * (y - mean_y), sxx + dx * dx)
    });

    let slope = sxy / sxx;
    Ok(TrendLine { slope, intercept: mean_y - slope * mean_x })
}

/// Detrend a window of bars.
///
/// Errors carry window positions; the scanner maps them back to series indices.
pub fn detrend<T: PriceBar>(bars: &[T]) -> Result<Detrended> {
    for (i, bar) in bars.iter().enumerate() {
        bar.validate().map_err(|e| match e {
            ChannelError::InvalidSample { reason, .. } => {
                ChannelError::InvalidSample { index: i, reason }
            },
            other => other,
        })?;
        // finite high/low can still overflow the midpoint
        if !bar.average().is_finite() {
            return Err(ChannelError::InvalidSample {
                index: i,
                reason: "non-finite average",
            });
        }
    }

    let averages: Vec<f64> = bars.iter().map(|b| b.average()).collect();
    let trend = fit_line(&averages)?;

    let len = bars.len();
    let mut delta_peak = Vec::with_capacity(len);
    let mut delta_valley = Vec::with_capacity(len);
    let mut extreme = Vec::with_capacity(len);

    for (pos, bar) in bars.iter().enumerate() {
        let fit = trend.at(pos);
        let dp = bar.high() - fit;
        let dv = bar.low() - fit;
        // ties go to the high side
        let dominant = if dv.abs() > dp.abs() { dv } else { dp };
        delta_peak.push(dp);
        delta_valley.push(dv);
        extreme.push(fit + dominant);
    }

    Ok(Detrended { trend, delta_peak, delta_valley, extreme })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sample;

    fn bars(hl: &[(f64, f64)]) -> Vec<Sample> {
        hl.iter()
            .enumerate()
            .map(|(i, &(h, l))| Sample::new(i as i64 * 60, h, l))
            .collect()
    }

    #[test]
    fn test_fit_exact_line() {
        let ys: Vec<f64> = (0..10).map(|i| 3.0 + 0.5 * i as f64).collect();
        let line = fit_line(&ys).unwrap();
        assert!((line.slope - 0.5).abs() < 1e-12);
        assert!((line.intercept - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_fit_residuals_sum_to_zero() {
        let ys = [10.0, 12.5, 9.0, 14.0, 11.0, 13.5, 10.5];
        let line = fit_line(&ys).unwrap();
        let residuals: f64 = ys.iter().enumerate().map(|(i, y)| y - line.at(i)).sum();
        assert!(residuals.abs() < 1e-9);
    }

    #[test]
    fn test_fit_degenerate() {
        assert!(matches!(fit_line(&[]), Err(ChannelError::EmptySeries)));
        assert!(matches!(
            fit_line(&[1.0]),
            Err(ChannelError::InsufficientData { need: 2, got: 1 })
        ));
    }

    #[test]
    fn test_extreme_picks_larger_deviation() {
        // flat trend at 100: bar 1 dips further than it rises
        let data = bars(&[(101.0, 99.0), (100.5, 96.0), (104.0, 99.5), (101.0, 99.0)]);
        let d = detrend(&data).unwrap();
        assert_eq!(d.len(), 4);
        let fit1 = d.trend.at(1);
        assert!((d.extreme[1] - 96.0).abs() < 1e-9);
        assert!((d.delta_valley[1] - (96.0 - fit1)).abs() < 1e-12);
        assert!((d.extreme[2] - 104.0).abs() < 1e-9);
    }

    #[test]
    fn test_detrend_rejects_non_finite() {
        let data = bars(&[(101.0, 99.0), (f64::NAN, 99.0), (101.0, 99.0)]);
        let err = detrend(&data).unwrap_err();
        assert!(matches!(err, ChannelError::InvalidSample { index: 1, .. }));
    }

    #[test]
    fn test_detrend_rejects_overflowing_average() {
        let data = bars(&[(101.0, 99.0), (1.7e308, 1.6e308), (101.0, 99.0)]);
        assert_eq!(
            detrend(&data).unwrap_err(),
            ChannelError::InvalidSample { index: 1, reason: "non-finite average" }
        );
    }

    #[test]
    fn test_trend_endpoints() {
        let line = TrendLine { slope: 2.0, intercept: 1.0 };
        assert_eq!(line.endpoints(5), (1.0, 9.0));
    }
}
