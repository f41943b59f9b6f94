//! Degrees-and-minutes angle value type.
//!
//! Navigation angles are written as `xdy.y`: `x` whole degrees, a literal `d`
//! separator, and `y.y` minutes of arc (1 degree = 60 minutes). [`Angle`]
//! keeps the two parts separately and only normalizes them when it is
//! emitted, either as a decimal number of degrees or as its canonical string.

use core::cmp::Ordering;
use core::fmt;
use core::ops::{Add, Sub};
use core::str::FromStr;

use crate::math::{floored_mod, round_tenth, tenths};
use crate::SightError;

const SEPARATOR: char = 'd';

/// A decimal number of degrees, either whole or fractional.
///
/// Whole values produce an angle with exactly zero minutes; fractional values
/// are split into a floor and a remainder scaled to minutes.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum DecimalDegrees {
    Whole(i64),
    Fractional(f64),
}

impl From<i32> for DecimalDegrees {
    fn from(value: i32) -> Self {
        DecimalDegrees::Whole(i64::from(value))
    }
}

impl From<i64> for DecimalDegrees {
    fn from(value: i64) -> Self {
        DecimalDegrees::Whole(value)
    }
}

impl From<f32> for DecimalDegrees {
    fn from(value: f32) -> Self {
        DecimalDegrees::Fractional(f64::from(value))
    }
}

impl From<f64> for DecimalDegrees {
    fn from(value: f64) -> Self {
        DecimalDegrees::Fractional(value)
    }
}

/// An amount of rotation expressed in whole degrees and minutes.
///
/// The degrees part may be negative or beyond 360 and the minutes part may
/// leave `[0, 60)` after arithmetic; both are reduced only on output.
///
/// # Example
///
/// ```
/// use sight_reduction::Angle;
///
/// let sha: Angle = "10d15.0".parse().unwrap();
/// let gha: Angle = "350d50.0".parse().unwrap();
/// let sum = gha + sha;
/// assert_eq!(sum.to_string(), "1d5.0");
/// ```
#[derive(Copy, Clone, Debug, Default)]
pub struct Angle {
    degrees: i64,
    minutes: f64,
}

impl Angle {
    /// Builds an angle from decimal degrees.
    ///
    /// # Errors
    ///
    /// [`SightError::InvalidInput`] when a fractional value is not finite or
    /// its floor does not fit in an `i64`.
    ///
    /// # Example
    ///
    /// ```
    /// use sight_reduction::Angle;
    ///
    /// assert_eq!(Angle::from_decimal_degrees(45).unwrap().to_string(), "45d0.0");
    /// assert_eq!(Angle::from_decimal_degrees(45.5).unwrap().to_string(), "45d30.0");
    /// assert!(Angle::from_decimal_degrees(f64::NAN).is_err());
    /// ```
    pub fn from_decimal_degrees(value: impl Into<DecimalDegrees>) -> Result<Self, SightError> {
        match value.into() {
            DecimalDegrees::Whole(degrees) => Ok(Self { degrees, minutes: 0.0 }),
            DecimalDegrees::Fractional(value) => {
                let floor = value.floor();
                if !floor.is_finite() || floor < i64::MIN as f64 || floor >= i64::MAX as f64 {
                    return Err(SightError::InvalidInput(format!(
                        "degrees must be a finite integer or float, got {value}"
                    )));
                }
                Ok(Self {
                    degrees: floor as i64,
                    minutes: (value - floor) * 60.0,
                })
            }
        }
    }

    /// Parses the `xdy.y` notation.
    ///
    /// The degrees part is a signed integer, the minutes part a non-negative
    /// integer or a number with exactly one digit after the point. Minutes are
    /// reduced modulo 60 without carrying into the degrees.
    pub fn from_degree_minute_string(text: &str) -> Result<Self, SightError> {
        let invalid = |reason: &str| SightError::InvalidInput(format!("{reason} in angle {text:?}"));

        if text.is_empty() {
            return Err(SightError::InvalidInput("blank angle string".to_string()));
        }
        if !text.contains(SEPARATOR) {
            return Err(invalid("'d' separator is missing"));
        }
        if text.starts_with(SEPARATOR) {
            return Err(invalid("degrees part is missing"));
        }
        if text.ends_with(SEPARATOR) {
            return Err(invalid("minutes part is missing"));
        }

        let mut parts = text.split(SEPARATOR);
        let (Some(degrees), Some(minutes), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid("more than one 'd' separator"));
        };

        if !is_signed_integer(degrees) {
            return Err(invalid("invalid degrees"));
        }
        if !is_minutes(minutes) {
            return Err(invalid("invalid minutes"));
        }

        let degrees: i64 = degrees.parse().map_err(|_| invalid("degrees out of range"))?;
        let minutes: f64 = minutes.parse().map_err(|_| invalid("invalid minutes"))?;

        Ok(Self {
            degrees,
            minutes: floored_mod(minutes, 60.0),
        })
    }

    /// Whole degrees as stored, before any normalization.
    pub fn degrees(&self) -> i64 {
        self.degrees
    }

    /// Minutes as stored, before any rounding.
    pub fn minutes(&self) -> f64 {
        self.minutes
    }

    /// Adds `other`, combining the degree and minute parts of both operands'
    /// canonical renderings.
    pub fn add(&self, other: &Angle) -> Angle {
        let (degrees, minutes) = self.canonical_parts();
        let (other_degrees, other_minutes) = other.canonical_parts();
        Angle {
            degrees: degrees + other_degrees,
            minutes: minutes + other_minutes,
        }
    }

    /// Subtracts `other`, combining the degree and minute parts of both
    /// operands' canonical renderings.
    pub fn subtract(&self, other: &Angle) -> Angle {
        let (degrees, minutes) = self.canonical_parts();
        let (other_degrees, other_minutes) = other.canonical_parts();
        Angle {
            degrees: degrees - other_degrees,
            minutes: minutes - other_minutes,
        }
    }

    /// Orders two angles by their decimal projections.
    pub fn compare(&self, other: &Angle) -> Ordering {
        self.to_decimal_degrees()
            .partial_cmp(&other.to_decimal_degrees())
            .unwrap_or(Ordering::Equal)
    }

    /// [`Angle::compare`] as `-1`, `0` or `1`.
    pub fn compare_signum(&self, other: &Angle) -> i8 {
        match self.compare(other) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        }
    }

    /// Degrees and portions of degrees modulo 360.
    ///
    /// The minute fraction is rounded to one decimal of a degree before it is
    /// added, so this projection is coarser than the minutes it came from.
    pub fn to_decimal_degrees(&self) -> f64 {
        floored_mod(self.degrees as f64 + round_tenth(self.minutes / 60.0), 360.0)
    }

    /// The `xdy.y` rendering: degrees modulo 360, minutes rounded to one
    /// decimal in `[0, 60)`, no leading zeros.
    pub fn to_canonical_string(&self) -> String {
        self.to_string()
    }

    /// Degree and minute parts exactly as [`Angle::to_canonical_string`]
    /// writes them.
    ///
    /// Arithmetic takes its operands from here, so the one-decimal minute
    /// rounding of the string form carries into every sum and difference.
    fn canonical_parts(&self) -> (i64, f64) {
        let minute_tenths = tenths(self.minutes);
        let carry = minute_tenths.div_euclid(600);
        let degrees = (self.degrees.rem_euclid(360) + carry).rem_euclid(360);
        let minutes = minute_tenths.rem_euclid(600) as f64 / 10.0;
        (degrees, minutes)
    }
}

fn is_signed_integer(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn is_minutes(text: &str) -> bool {
    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (text, None),
    };
    let whole_ok = !whole.is_empty() && whole.bytes().all(|b| b.is_ascii_digit());
    let fraction_ok = fraction.map_or(true, |f| f.len() == 1 && f.bytes().all(|b| b.is_ascii_digit()));
    whole_ok && fraction_ok
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (degrees, minutes) = self.canonical_parts();
        write!(f, "{degrees}d{minutes:.1}")
    }
}

impl FromStr for Angle {
    type Err = SightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Angle::from_degree_minute_string(s)
    }
}

impl Add for Angle {
    type Output = Angle;

    fn add(self, rhs: Angle) -> Angle {
        Angle::add(&self, &rhs)
    }
}

impl Sub for Angle {
    type Output = Angle;

    fn sub(self, rhs: Angle) -> Angle {
        Angle::subtract(&self, &rhs)
    }
}

impl PartialEq for Angle {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl PartialOrd for Angle {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}
