//! Boundary validation
//!
//! A channel holds only if every extreme of its window lies between the two
//! lines. One violation rejects the whole channel.

use super::Channel;

/// Relative slack for boundary comparisons.
///
/// Anchor points sit on their own lines up to floating-point rounding.
pub const BOUNDARY_EPSILON: f64 = 1e-9;

#[inline]
fn slack(value: f64) -> f64 {
    BOUNDARY_EPSILON * value.abs().max(1.0)
}

/// First position whose extreme lies outside the channel, if any.
pub fn first_violation(channel: &Channel, extreme: &[f64]) -> Option<usize> {
    extreme.iter().enumerate().find_map(|(pos, &value)| {
        let (lower, upper) = channel.bounds_at(pos);
        // NaN on either side counts as outside
        let inside = value <= upper + slack(upper) && value >= lower - slack(lower);
        (!inside).then_some(pos)
    })
}

/// `true` when every extreme is contained by the channel.
#[inline]
pub fn contains_all(channel: &Channel, extreme: &[f64]) -> bool {
    first_violation(channel, extreme).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{Anchor, ChannelLine};

    fn flat_channel(lower: f64, upper: f64, len: usize) -> Channel {
        Channel {
            peak_line: ChannelLine::parallel(0.0, (0, upper), len),
            valley_line: ChannelLine::parallel(0.0, (0, lower), len),
            anchor: Anchor::Peak,
        }
    }

    #[test]
    fn test_contained() {
        let ch = flat_channel(90.0, 110.0, 4);
        assert!(contains_all(&ch, &[90.0, 100.0, 110.0, 95.0]));
    }

    #[test]
    fn test_single_violation_rejects() {
        let ch = flat_channel(90.0, 110.0, 4);
        assert_eq!(first_violation(&ch, &[90.0, 100.0, 110.5, 95.0]), Some(2));
        assert_eq!(first_violation(&ch, &[89.0, 100.0, 105.0, 95.0]), Some(0));
    }

    #[test]
    fn test_nan_is_a_violation() {
        let ch = flat_channel(90.0, 110.0, 4);
        assert_eq!(first_violation(&ch, &[100.0, f64::NAN, 100.0, 100.0]), Some(1));

        let nan_lines = flat_channel(f64::NAN, f64::NAN, 3);
        assert!(!contains_all(&nan_lines, &[100.0, 100.0, 100.0]));
    }

    #[test]
    fn test_crossing_lines_sorted_per_position() {
        // lines swap order halfway through the window
        let ch = Channel {
            peak_line: ChannelLine::parallel(-2.0, (0, 10.0), 11),
            valley_line: ChannelLine::parallel(2.0, (0, -10.0), 11),
            anchor: Anchor::Both,
        };
        // at pos 10 the valley line is at 10 and the peak line at -10
        assert!(contains_all(&ch, &[0.0; 11]));
        assert_eq!(first_violation(&ch, &[0.0, 0.0, 0.0, 0.0, 0.0, 0.5]), Some(5));
    }
}
