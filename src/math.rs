/// Computes the floored modulo operation (Python-style modulo).
///
/// Unlike Rust's `%` operator which can return negative values, this function
/// always returns a non-negative result in the range [0, m). Every "mod 360"
/// and "mod 60" in the angle arithmetic goes through here.
///
/// # Arguments
///
/// * `x` - The dividend
/// * `m` - The modulus (must be positive)
///
/// # Examples
///
/// ```
/// # fn floored_mod(x: f64, m: f64) -> f64 { ((x % m) + m) % m }
/// assert_eq!(floored_mod(7.0, 3.0), 1.0);
/// assert_eq!(floored_mod(-7.0, 3.0), 2.0);  // Unlike -7 % 3 which would be -1
/// assert_eq!(floored_mod(370.0, 360.0), 10.0);
/// ```
pub(crate) fn floored_mod(x: f64, m: f64) -> f64 {
    ((x % m) + m) % m
}

/// Rounds to one decimal place, resolving ties on the exact binary value
/// (half to even), which is how the canonical `DdM.m` form has always rounded.
///
/// Going through the exact decimal expansion avoids the double rounding of
/// `(x * 10.0).round() / 10.0`.
pub(crate) fn round_tenth(x: f64) -> f64 {
    if !x.is_finite() {
        return x;
    }
    format!("{x:.1}").parse().unwrap_or(x)
}

/// Number of tenths in `x` once rounded to one decimal place.
pub(crate) fn tenths(x: f64) -> i64 {
    (round_tenth(x) * 10.0).round() as i64
}
