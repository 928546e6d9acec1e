// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Linear scaling between device units and percentages.
//!
//! Devices report and accept positions in their own units (for example
//! 80-180 motor steps). The hub always works in [`Percent`], where 0 is fully
//! closed and 100 is fully open. [`RangeMapper`] converts in both directions.
//!
//! The mapping itself only knows about a lower and an upper bound and an
//! inversion flag; bound order is irrelevant. The two axis constructors
//! decide what inversion means:
//!
//! - [`RangeMapper::position`] inverts when the `open` bound is numerically
//!   below the `closed` bound, so the percentage always measures the distance
//!   from closed toward open.
//! - [`RangeMapper::tilt`] takes an explicit flag for blades whose reading
//!   direction is reversed.
//!
//! # Examples
//!
//! ```
//! use mqtt_cover::range::RangeMapper;
//! use mqtt_cover::types::Percent;
//!
//! // Device reports 180 when open and 80 when closed
//! let mapper = RangeMapper::position(180, 80).unwrap();
//! assert_eq!(mapper.to_percent(120.0).value(), 40);
//! assert_eq!(mapper.from_percent(Percent::new(40).unwrap()), 120);
//!
//! // Device reports 0 when open and 100 when closed
//! let inverted = RangeMapper::position(0, 100).unwrap();
//! assert_eq!(inverted.to_percent(100.0), Percent::CLOSED);
//! ```

use crate::error::ConfigError;
use crate::types::Percent;

/// Converts a raw device value to a percentage.
///
/// The bounds may be given in either order. Raw values outside the range are
/// clamped. When `invert` is set the result is mirrored (`100 - percent`).
///
/// # Errors
///
/// Returns `ConfigError::EmptyRange` if both bounds are equal.
///
/// ```
/// use mqtt_cover::range::to_percent;
///
/// assert_eq!(to_percent(150.0, 0.0, 100.0, false).unwrap().value(), 100);
/// assert_eq!(to_percent(44.0, 0.0, 100.0, true).unwrap().value(), 56);
/// assert!(to_percent(1.0, 5.0, 5.0, false).is_err());
/// ```
pub fn to_percent(
    raw: f64,
    bound_a: f64,
    bound_b: f64,
    invert: bool,
) -> Result<Percent, ConfigError> {
    Ok(RangeMapper::new("range", bound_a, bound_b, invert)?.to_percent(raw))
}

/// Converts a percentage back to a raw device value, rounded to the nearest
/// integer.
///
/// # Errors
///
/// Returns `ConfigError::EmptyRange` if both bounds are equal.
pub fn from_percent(
    percent: Percent,
    bound_a: f64,
    bound_b: f64,
    invert: bool,
) -> Result<i64, ConfigError> {
    Ok(RangeMapper::new("range", bound_a, bound_b, invert)?.from_percent(percent))
}

/// A validated, non-empty range with an inversion flag.
///
/// Construction is the only fallible step: once built, conversions cannot
/// fail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeMapper {
    lower: f64,
    upper: f64,
    invert: bool,
}

impl RangeMapper {
    /// Creates a mapper over the given bounds (in any order).
    ///
    /// `axis` only names the range in the error message.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EmptyRange` if both bounds are equal.
    #[allow(clippy::float_cmp)]
    pub fn new(
        axis: &'static str,
        bound_a: f64,
        bound_b: f64,
        invert: bool,
    ) -> Result<Self, ConfigError> {
        if bound_a == bound_b {
            return Err(ConfigError::EmptyRange {
                axis,
                bound: bound_a,
            });
        }
        Ok(Self {
            lower: bound_a.min(bound_b),
            upper: bound_a.max(bound_b),
            invert,
        })
    }

    /// Creates the mapper for a cover position axis.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EmptyRange` if `open == closed`.
    #[allow(clippy::cast_precision_loss)]
    pub fn position(open: i64, closed: i64) -> Result<Self, ConfigError> {
        Self::new("position", open as f64, closed as f64, open < closed)
    }

    /// Creates the mapper for a tilt axis.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EmptyRange` if `min == max`.
    #[allow(clippy::cast_precision_loss)]
    pub fn tilt(min: i64, max: i64, invert: bool) -> Result<Self, ConfigError> {
        Self::new("tilt", min as f64, max as f64, invert)
    }

    /// Returns whether the mapping is mirrored.
    #[must_use]
    pub const fn is_inverted(&self) -> bool {
        self.invert
    }

    /// Converts a raw value to a percentage, clamping out-of-range input.
    #[must_use]
    pub fn to_percent(&self, raw: f64) -> Percent {
        let span = self.upper - self.lower;
        let fraction = ((raw - self.lower) / span).clamp(0.0, 1.0);
        let percent = Percent::from_f64_clamped(fraction * 100.0);
        if self.invert {
            percent.inverted()
        } else {
            percent
        }
    }

    /// Converts a percentage to the nearest integer raw value.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_percent(&self, percent: Percent) -> i64 {
        let percent = if self.invert {
            percent.inverted()
        } else {
            percent
        };
        let raw = self.lower + percent.as_fraction() * (self.upper - self.lower);
        // Safe: raw lies between two bounds that came from i64 or finite f64
        raw.round() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pct(value: u8) -> Percent {
        Percent::new(value).unwrap()
    }

    #[test]
    fn defaults_are_identity() {
        let mapper = RangeMapper::position(100, 0).unwrap();
        assert_eq!(mapper.to_percent(44.0), pct(44));
        assert_eq!(mapper.from_percent(pct(44)), 44);
    }

    #[test]
    fn altered_range() {
        let mapper = RangeMapper::position(180, 80).unwrap();
        assert_eq!(mapper.to_percent(120.0), pct(40));
        assert_eq!(mapper.from_percent(pct(40)), 120);
    }

    #[test]
    fn position_open_below_closed_is_inverted() {
        let mapper = RangeMapper::position(0, 100).unwrap();
        assert!(mapper.is_inverted());
        assert_eq!(mapper.to_percent(44.0), pct(56));
        assert_eq!(mapper.from_percent(pct(56)), 44);
        assert_eq!(mapper.to_percent(100.0), Percent::CLOSED);
        assert_eq!(mapper.to_percent(0.0), Percent::OPEN);
        assert_eq!(mapper.to_percent(101.0), Percent::CLOSED);
    }

    #[test]
    fn altered_range_inverted() {
        let mapper = RangeMapper::position(80, 180).unwrap();
        assert_eq!(mapper.to_percent(120.0), pct(60));
        assert_eq!(mapper.from_percent(pct(60)), 120);
    }

    #[test]
    fn tilt_flag_inverts_independently_of_order() {
        let mapper = RangeMapper::tilt(0, 100, true).unwrap();
        assert_eq!(mapper.to_percent(44.0), pct(56));
        assert_eq!(mapper.from_percent(pct(56)), 44);

        let altered = RangeMapper::tilt(80, 180, true).unwrap();
        assert_eq!(altered.to_percent(120.0), pct(60));
        assert_eq!(altered.from_percent(pct(60)), 120);
    }

    #[test]
    fn tilt_altered_range() {
        let mapper = RangeMapper::tilt(0, 50, false).unwrap();
        assert_eq!(mapper.to_percent(50.0), Percent::OPEN);
        assert_eq!(mapper.to_percent(25.0), pct(50));
        assert_eq!(mapper.from_percent(pct(50)), 25);
    }

    #[test]
    fn clamps_out_of_range_raw_values() {
        assert_eq!(to_percent(150.0, 0.0, 100.0, false).unwrap(), Percent::OPEN);
        assert_eq!(to_percent(-20.0, 0.0, 100.0, false).unwrap(), Percent::CLOSED);
    }

    #[test]
    fn free_functions_match_scenarios() {
        assert_eq!(to_percent(44.0, 0.0, 100.0, true).unwrap(), pct(56));
        assert_eq!(to_percent(120.0, 180.0, 80.0, false).unwrap(), pct(40));
        assert_eq!(from_percent(pct(40), 180.0, 80.0, false).unwrap(), 120);
    }

    #[test]
    fn equal_bounds_are_rejected() {
        assert!(matches!(
            RangeMapper::position(50, 50),
            Err(ConfigError::EmptyRange {
                axis: "position",
                ..
            })
        ));
        assert!(to_percent(3.0, 7.0, 7.0, false).is_err());
        assert!(from_percent(Percent::OPEN, 7.0, 7.0, true).is_err());
    }

    #[test]
    fn inversion_symmetry() {
        for (lo, hi) in [(0.0, 100.0), (80.0, 180.0), (-40.0, 7.0), (125.0, 400.0)] {
            let mut raw = lo - 20.0;
            while raw <= hi + 20.0 {
                let plain = to_percent(raw, lo, hi, false).unwrap();
                let mirrored = to_percent(raw, lo, hi, true).unwrap();
                assert_eq!(mirrored.value(), 100 - plain.value(), "raw {raw} in {lo}..{hi}");
                raw += 3.5;
            }
        }
    }

    #[test]
    fn round_trip_within_one_percent() {
        for (lo, hi) in [(0.0, 100.0), (180.0, 80.0), (0.0, 50.0), (125.0, 400.0), (0.0, 7.0)] {
            for invert in [false, true] {
                for p in 0..=100 {
                    let raw = from_percent(pct(p), lo, hi, invert).unwrap();
                    #[allow(clippy::cast_precision_loss)]
                    let back = to_percent(raw as f64, lo, hi, invert).unwrap();
                    // Coarse ranges lose resolution; allow the rounding of one raw step
                    let step = (100.0_f64 / (hi - lo).abs()).ceil().max(1.0);
                    let diff = (f64::from(back.value()) - f64::from(p)).abs();
                    assert!(diff <= step, "p={p} raw={raw} back={back} range {lo}..{hi}");
                }
            }
        }
    }

    #[test]
    fn round_trip_exact_for_percent_resolution_ranges() {
        for (lo, hi) in [(0.0, 100.0), (180.0, 80.0), (125.0, 400.0)] {
            for invert in [false, true] {
                for p in 0..=100 {
                    let raw = from_percent(pct(p), lo, hi, invert).unwrap();
                    #[allow(clippy::cast_precision_loss)]
                    let back = to_percent(raw as f64, lo, hi, invert).unwrap();
                    assert!(back.value().abs_diff(p) <= 1, "p={p} back={back}");
                }
            }
        }
    }
}
