//! Altitude corrections: dip of the horizon and atmospheric refraction.

use core::str::FromStr;

use crate::angle::Angle;
use crate::math::floored_mod;
use crate::SightError;

/// Temperature at which the refraction denominator `273 + °C` vanishes.
const ABSOLUTE_ZERO_FAHRENHEIT: f64 = 32.0 - 273.0 * 9.0 / 5.0;

/// Dip coefficient, minutes of arc per square root of height of eye.
const DIP_COEFFICIENT: f64 = -0.97;

/// Refraction coefficient applied to pressure in hPa.
const REFRACTION_COEFFICIENT: f64 = -0.00452;

/// The horizon the observation was taken against.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Horizon {
    /// Sea horizon; the observer's height of eye produces dip.
    #[default]
    Natural,
    /// Bubble or mirror horizon; no dip.
    Artificial,
}

impl FromStr for Horizon {
    type Err = SightError;

    /// Case-insensitive `natural` / `artificial`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "natural" => Ok(Horizon::Natural),
            "artificial" => Ok(Horizon::Artificial),
            other => Err(SightError::InvalidInput(format!("unrecognised horizon {other:?}"))),
        }
    }
}

/// Observing conditions for one sighting.
///
/// [`Environment::default`] gives the values used when a sighting leaves a
/// field out: sea level, 72 °F, 1010 hPa, natural horizon.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Environment {
    height: f64,
    temperature: f64,
    pressure: f64,
    horizon: Horizon,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            height: 0.0,
            temperature: 72.0,
            pressure: 1010.0,
            horizon: Horizon::Natural,
        }
    }
}

impl Environment {
    /// Creates a validated set of observing conditions.
    ///
    /// # Arguments
    ///
    /// * `height` - Height of eye above the horizon, non-negative
    /// * `temperature` - Air temperature in degrees Fahrenheit
    /// * `pressure` - Barometric pressure in hPa, positive
    /// * `horizon` - Horizon type
    ///
    /// # Errors
    ///
    /// [`SightError::RangeViolation`] for a negative or non-finite height, a
    /// non-positive pressure, or a temperature at or below the point where
    /// the refraction formula divides by zero.
    pub fn new(height: f64, temperature: f64, pressure: f64, horizon: Horizon) -> Result<Self, SightError> {
        if !height.is_finite() || height < 0.0 {
            return Err(SightError::RangeViolation(format!("height {height} must be non-negative")));
        }
        if !temperature.is_finite() || temperature <= ABSOLUTE_ZERO_FAHRENHEIT {
            return Err(SightError::RangeViolation(format!(
                "temperature {temperature}F is below absolute zero"
            )));
        }
        if !pressure.is_finite() || pressure <= 0.0 {
            return Err(SightError::RangeViolation(format!("pressure {pressure} must be positive")));
        }
        Ok(Self {
            height,
            temperature,
            pressure,
            horizon,
        })
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Degrees Fahrenheit.
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// hPa.
    pub fn pressure(&self) -> f64 {
        self.pressure
    }

    pub fn horizon(&self) -> Horizon {
        self.horizon
    }

    /// Dip in degrees; zero against an artificial horizon.
    pub fn dip(&self) -> f64 {
        dip(self.height, self.horizon)
    }

    /// Refraction in degrees at the given apparent altitude.
    pub fn refraction(&self, altitude: f64) -> f64 {
        refraction(self.pressure, fahrenheit_to_celsius(self.temperature), altitude)
    }
}

/// Dip of the horizon in degrees for a height of eye.
pub fn dip(height: f64, horizon: Horizon) -> f64 {
    match horizon {
        Horizon::Natural => DIP_COEFFICIENT * height.sqrt() / 60.0,
        Horizon::Artificial => 0.0,
    }
}

pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// Atmospheric refraction in degrees.
///
/// # Arguments
///
/// * `pressure` - Barometric pressure in hPa
/// * `celsius` - Air temperature in degrees Celsius
/// * `altitude` - Apparent altitude in degrees
pub fn refraction(pressure: f64, celsius: f64, altitude: f64) -> f64 {
    REFRACTION_COEFFICIENT * pressure / (273.0 + celsius) / altitude.to_radians().tan()
}

/// Observed altitude in decimal degrees from the raw angle fields.
///
/// Unlike [`Angle::to_decimal_degrees`] the minutes are not rounded.
pub fn observed_altitude(observation: &Angle) -> f64 {
    observation.degrees() as f64 + floored_mod(observation.minutes() / 60.0, 360.0)
}

/// The corrections applied to one observation, all in decimal degrees.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AltitudeCorrection {
    pub altitude: f64,
    pub dip: f64,
    pub refraction: f64,
    pub adjusted: f64,
}

impl AltitudeCorrection {
    /// Applies dip and refraction to an observation.
    ///
    /// # Errors
    ///
    /// [`SightError::RangeViolation`] when the observation is so close to the
    /// horizon that the refraction is not finite.
    pub fn compute(observation: &Angle, environment: &Environment) -> Result<Self, SightError> {
        let altitude = observed_altitude(observation);
        let dip = environment.dip();
        let refraction = environment.refraction(altitude);
        if !refraction.is_finite() {
            return Err(SightError::RangeViolation(format!(
                "refraction is undefined at altitude {observation}"
            )));
        }
        Ok(Self {
            altitude,
            dip,
            refraction,
            adjusted: altitude + dip + refraction,
        })
    }

    /// The adjusted altitude as an angle.
    pub fn adjusted_angle(&self) -> Result<Angle, SightError> {
        Angle::from_decimal_degrees(self.adjusted)
    }
}
