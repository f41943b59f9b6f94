//! The sight reduction pipeline and the run object that drives it.
//!
//! Each sighting passes through a fixed sequence of stages. A stage either
//! lets the sighting continue, skips that one sighting (counted in the run's
//! [`Diagnostics`]), or aborts the whole run. The severity is chosen by the
//! stage, not by the error kind: a missing tag only means an incomplete
//! sighting, while an observation outside `[0, 90]` degrees means the file
//! itself is malformed.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use tracing::{debug, info, warn};

use crate::almanac::{Almanac, AriesBracket, StarFix};
use crate::angle::Angle;
use crate::correction::{AltitudeCorrection, Environment, Horizon};
use crate::log::SightLog;
use crate::sighting::{SightingFile, SightingRecord, SightingSource};
use crate::{SightError, SourceKind};

/// Placeholder position returned by [`Fix::get_sightings`].
const APPROXIMATE_POSITION: &str = "0d0.0";

const STAR_DATE_FORMAT: &str = "%m/%d/%y";

/// How a stage stopped a sighting.
#[derive(Debug)]
pub enum Interrupt {
    /// Drop this sighting, count it, and carry on with the next one.
    SkipRecord(SightError),
    /// Stop the run.
    AbortRun(SightError),
}

impl Interrupt {
    pub fn error(&self) -> &SightError {
        match self {
            Interrupt::SkipRecord(e) | Interrupt::AbortRun(e) => e,
        }
    }
}

/// `Ok` lets the sighting continue to the next stage.
pub type StageResult<T> = Result<T, Interrupt>;

/// Sightings skipped during a run, with a message for each.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    error_count: usize,
    messages: Vec<String>,
}

impl Diagnostics {
    pub fn record(&mut self, error: &SightError) {
        self.error_count += 1;
        self.messages.push(error.to_string());
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

/// A reduced sighting: one line of position.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedSighting {
    pub body: String,
    /// Date as written in the sighting source.
    pub date: String,
    /// Time as written in the sighting source.
    pub time: String,
    pub timestamp: NaiveDateTime,
    pub corrected_altitude: Angle,
    /// Reference value from the star almanac.
    pub latitude: String,
    /// GHA of the observation.
    pub longitude: Angle,
    /// Warnings raised for this sighting that did not prevent its reduction.
    pub errors: Vec<String>,
}

/// The outcome of a run: sightings in log order and what was skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reduction {
    pub sightings: Vec<ComputedSighting>,
    pub diagnostics: Diagnostics,
}

/// The tags every sighting must carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Mandatory<'a> {
    pub body: &'a str,
    pub date: &'a str,
    pub time: &'a str,
    pub observation: &'a str,
}

fn require<'a>(value: &'a Option<String>, tag: &'static str) -> StageResult<&'a str> {
    value
        .as_deref()
        .ok_or(Interrupt::SkipRecord(SightError::MissingMandatoryField(tag)))
}

pub(crate) fn validate_mandatory(record: &SightingRecord) -> StageResult<Mandatory<'_>> {
    Ok(Mandatory {
        body: require(&record.body, "body")?,
        date: require(&record.date, "date")?,
        time: require(&record.time, "time")?,
        observation: require(&record.observation, "observation")?,
    })
}

/// Fills absent fields from `defaults` and validates the result.
///
/// An unparsable temperature falls back to the default and an unrecognised
/// horizon applies no dip; both are reported in the returned warnings.
pub(crate) fn apply_defaults(
    record: &SightingRecord,
    defaults: &Environment,
) -> StageResult<(Environment, Vec<String>)> {
    let number = |value: &Option<String>, name: &str, default: f64| -> StageResult<f64> {
        match value.as_deref() {
            None => Ok(default),
            Some(text) => text.parse().map_err(|_| {
                Interrupt::AbortRun(SightError::InvalidInput(format!("{name} {text:?} is not a number")))
            }),
        }
    };

    let height = number(&record.height, "height", defaults.height())?;
    let pressure = number(&record.pressure, "pressure", defaults.pressure())?;

    let mut warnings = Vec::new();
    let temperature = number(&record.temperature, "temperature", defaults.temperature()).unwrap_or_else(|e| {
        warnings.push(format!("{}; default temperature applied", e.error()));
        defaults.temperature()
    });
    let horizon = match record.horizon.as_deref() {
        None => defaults.horizon(),
        Some(text) => text.parse::<Horizon>().unwrap_or_else(|e| {
            warnings.push(format!("{e}; no dip applied"));
            Horizon::Artificial
        }),
    };

    let environment = Environment::new(height, temperature, pressure, horizon).map_err(Interrupt::AbortRun)?;
    Ok((environment, warnings))
}

/// Parses the observation and checks it lies in `[0, 90]` degrees and
/// `[0, 60]` minutes.
pub(crate) fn validate_observation(observation: &str) -> StageResult<Angle> {
    let angle: Angle = observation.parse().map_err(Interrupt::AbortRun)?;
    if !(0..=90).contains(&angle.degrees()) {
        return Err(Interrupt::AbortRun(SightError::RangeViolation(format!(
            "observation degrees in {observation:?} must lie in [0, 90]"
        ))));
    }
    if !(0.0..=60.0).contains(&angle.minutes()) {
        return Err(Interrupt::AbortRun(SightError::RangeViolation(format!(
            "observation minutes in {observation:?} must lie in [0, 60]"
        ))));
    }
    Ok(angle)
}

pub(crate) fn parse_timestamp(date: &str, time: &str) -> StageResult<NaiveDateTime> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| Interrupt::AbortRun(SightError::InvalidInput(format!("date {date:?}: {e}"))))?;
    let time = NaiveTime::parse_from_str(time, "%H:%M:%S")
        .map_err(|e| Interrupt::AbortRun(SightError::InvalidInput(format!("time {time:?}: {e}"))))?;
    Ok(date.and_time(time))
}

pub(crate) fn correct_altitude(observation: &Angle, environment: &Environment) -> StageResult<Angle> {
    AltitudeCorrection::compute(observation, environment)
        .and_then(|correction| correction.adjusted_angle())
        .map_err(Interrupt::AbortRun)
}

pub(crate) fn resolve_star(almanac: &Almanac, body: &str, timestamp: &NaiveDateTime) -> StageResult<StarFix> {
    let date = timestamp.format(STAR_DATE_FORMAT).to_string();
    almanac
        .resolve_star(body, &date)
        .ok_or_else(|| Interrupt::SkipRecord(SightError::AlmanacMismatch(format!("star {body} on {date}"))))
}

pub(crate) fn resolve_aries(almanac: &Almanac, timestamp: &NaiveDateTime) -> StageResult<AriesBracket> {
    let date = timestamp.format(STAR_DATE_FORMAT).to_string();
    let hour = timestamp.hour();
    almanac
        .resolve_aries_bracket(&date, hour)
        .map_err(Interrupt::AbortRun)?
        .ok_or_else(|| {
            Interrupt::SkipRecord(SightError::AlmanacMismatch(format!("Aries on {date} hour {hour}")))
        })
}

/// Seconds past the hour from the minute and second of the sighting time.
pub(crate) fn seconds_into_hour(timestamp: &NaiveDateTime) -> u32 {
    timestamp.minute() * 60 + timestamp.second()
}

/// GHA of the observation: interpolated GHA of Aries plus the star's SHA.
pub(crate) fn observation_gha(bracket: &AriesBracket, star: &StarFix, seconds: u32) -> StageResult<Angle> {
    let gha_aries = Angle::from_decimal_degrees(bracket.interpolate(seconds)).map_err(Interrupt::AbortRun)?;
    Ok(gha_aries.add(&star.sha))
}

fn reduce_record(
    record: &SightingRecord,
    almanac: &Almanac,
    defaults: &Environment,
) -> StageResult<ComputedSighting> {
    let mandatory = validate_mandatory(record)?;
    let (environment, errors) = apply_defaults(record, defaults)?;
    let observation = validate_observation(mandatory.observation)?;
    let timestamp = parse_timestamp(mandatory.date, mandatory.time)?;
    let corrected_altitude = correct_altitude(&observation, &environment)?;
    let star = resolve_star(almanac, mandatory.body, &timestamp)?;
    let bracket = resolve_aries(almanac, &timestamp)?;
    let longitude = observation_gha(&bracket, &star, seconds_into_hour(&timestamp))?;

    Ok(ComputedSighting {
        body: mandatory.body.to_string(),
        date: mandatory.date.to_string(),
        time: mandatory.time.to_string(),
        timestamp,
        corrected_altitude,
        latitude: star.reference,
        longitude,
        errors,
    })
}

/// Reduces every sighting against the almanac.
///
/// Sightings that cannot be reduced are skipped and counted. The result is
/// ordered by timestamp, ties broken by body name.
///
/// # Errors
///
/// The first stage error that aborts the run: a malformed observation, date,
/// time or environmental value, an observation outside `[0, 90]` degrees, or
/// an Aries match on the last row of the table.
pub fn reduce_sightings(
    records: &[SightingRecord],
    almanac: &Almanac,
    defaults: &Environment,
) -> Result<Reduction, SightError> {
    let mut reduction = Reduction::default();

    for (index, record) in records.iter().enumerate() {
        match reduce_record(record, almanac, defaults) {
            Ok(sighting) => {
                debug!(
                    body = %sighting.body,
                    altitude = %sighting.corrected_altitude,
                    longitude = %sighting.longitude,
                    "reduced sighting"
                );
                reduction.sightings.push(sighting);
            }
            Err(Interrupt::SkipRecord(error)) => {
                warn!(sighting = index + 1, %error, "skipping sighting");
                reduction.diagnostics.record(&error);
            }
            Err(Interrupt::AbortRun(error)) => return Err(error),
        }
    }

    // Both sorts are stable: the second decides the order, the first breaks
    // its ties.
    reduction.sightings.sort_by(|a, b| a.body.cmp(&b.body));
    reduction.sightings.sort_by_key(|sighting| sighting.timestamp);

    Ok(reduction)
}

/// One sight reduction run, from source registration to the closed log.
///
/// The log is opened when the `Fix` is created and closed when
/// [`Fix::reduce`] (or [`Fix::get_sightings`]) finishes, whether it succeeds
/// or aborts. A `Fix` therefore reduces exactly once.
pub struct Fix {
    log: SightLog,
    sightings: Option<Box<dyn SightingSource>>,
    star_file: Option<PathBuf>,
    aries_file: Option<PathBuf>,
    defaults: Environment,
}

impl Fix {
    /// Opens the sight log at `log_path` and writes the startup line.
    pub fn new<P: AsRef<Path>>(log_path: P) -> Result<Self, SightError> {
        Ok(Self {
            log: SightLog::open(log_path)?,
            sightings: None,
            star_file: None,
            aries_file: None,
            defaults: Environment::default(),
        })
    }

    /// Replaces the values used for absent height, temperature, pressure and
    /// horizon tags.
    pub fn with_defaults(mut self, defaults: Environment) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn log_path(&self) -> &Path {
        self.log.path()
    }

    /// Registers the XML sighting file. Returns its absolute path.
    pub fn set_sighting_file<P: AsRef<Path>>(&mut self, path: P) -> Result<PathBuf, SightError> {
        let path = self.register_source(SourceKind::Sighting, path.as_ref())?;
        self.sightings = Some(Box::new(SightingFile::new(&path)));
        Ok(path)
    }

    /// Registers the star almanac. Returns its absolute path.
    pub fn set_star_file<P: AsRef<Path>>(&mut self, path: P) -> Result<PathBuf, SightError> {
        let path = self.register_source(SourceKind::Star, path.as_ref())?;
        self.star_file = Some(path.clone());
        Ok(path)
    }

    /// Registers the Aries almanac. Returns its absolute path.
    pub fn set_aries_file<P: AsRef<Path>>(&mut self, path: P) -> Result<PathBuf, SightError> {
        let path = self.register_source(SourceKind::Aries, path.as_ref())?;
        self.aries_file = Some(path.clone());
        Ok(path)
    }

    /// Registers sightings that do not come from a file.
    pub fn set_sighting_source<S: SightingSource + 'static>(&mut self, source: S) {
        self.sightings = Some(Box::new(source));
    }

    /// Runs the reduction, logs every sighting and the error tally, and
    /// closes the log.
    ///
    /// # Errors
    ///
    /// [`SightError::LogClosed`] on a second call, [`SightError::SourceNotSet`]
    /// or [`SightError::MissingSource`] for sources, and any error that
    /// aborts [`reduce_sightings`].
    pub fn reduce(&mut self) -> Result<Reduction, SightError> {
        let outcome = self.run();
        if self.log.is_closed() {
            return outcome;
        }
        let closed = self.log.close();
        let reduction = outcome?;
        closed?;
        Ok(reduction)
    }

    /// Runs [`Fix::reduce`] and returns the approximate latitude and
    /// longitude, which are always `("0d0.0", "0d0.0")`.
    ///
    /// The reduced sightings are only available in the log; use
    /// [`Fix::reduce`] to get them as values.
    pub fn get_sightings(&mut self) -> Result<(String, String), SightError> {
        self.reduce()?;
        Ok((APPROXIMATE_POSITION.to_string(), APPROXIMATE_POSITION.to_string()))
    }

    fn run(&mut self) -> Result<Reduction, SightError> {
        if self.log.is_closed() {
            return Err(SightError::LogClosed);
        }
        let sightings = self
            .sightings
            .as_ref()
            .ok_or(SightError::SourceNotSet(SourceKind::Sighting))?;
        let star_file = self.star_file.as_ref().ok_or(SightError::SourceNotSet(SourceKind::Star))?;
        let aries_file = self.aries_file.as_ref().ok_or(SightError::SourceNotSet(SourceKind::Aries))?;

        let records = sightings.read_sightings()?;
        let almanac = Almanac::load(star_file, aries_file)?;
        info!(
            sightings = records.len(),
            stars = almanac.stars().len(),
            aries = almanac.aries().len(),
            "reducing sightings"
        );

        let reduction = reduce_sightings(&records, &almanac, &self.defaults)?;
        for sighting in &reduction.sightings {
            self.log.log_sighting(sighting)?;
        }
        self.log.log_error_tally(reduction.diagnostics.error_count())?;
        info!(
            reduced = reduction.sightings.len(),
            errors = reduction.diagnostics.error_count(),
            "sight reduction finished"
        );
        Ok(reduction)
    }

    /// Validates, logs and probes a source path, returning it made absolute.
    fn register_source(&mut self, kind: SourceKind, path: &Path) -> Result<PathBuf, SightError> {
        if path.as_os_str().is_empty() {
            return Err(SightError::InvalidInput(format!("{kind} file name is empty")));
        }
        let absolute = std::path::absolute(path)
            .map_err(|e| SightError::InvalidInput(format!("{kind} file path {}: {e}", path.display())))?;
        self.log.log_source(kind, &absolute)?;
        std::fs::File::open(&absolute).map_err(|source| SightError::MissingSource {
            kind,
            path: absolute.clone(),
            source,
        })?;
        Ok(absolute)
    }
}
