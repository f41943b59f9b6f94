//! # Sight Reduction
//!
//! Celestial navigation sight reduction: turns sextant observations of stars
//! into lines of position.
//!
//! Each sighting is corrected for the observer's height of eye (dip) and for
//! atmospheric refraction, the star's Sidereal Hour Angle is looked up in a
//! star almanac, the Greenwich Hour Angle of Aries is interpolated between two
//! hourly almanac entries, and the resulting corrected altitude, reference
//! latitude and longitude are written to an append-only sight log.
//!
//! ## Basic Usage
//!
//! ```no_run
//! use sight_reduction::Fix;
//!
//! let mut fix = Fix::new("log.txt")?;
//! fix.set_sighting_file("sightings.xml")?;
//! fix.set_star_file("stars.txt")?;
//! fix.set_aries_file("aries.txt")?;
//!
//! // Results are appended to log.txt in chronological order.
//! let (latitude, longitude) = fix.get_sightings()?;
//! assert_eq!((latitude.as_str(), longitude.as_str()), ("0d0.0", "0d0.0"));
//! # Ok::<(), sight_reduction::SightError>(())
//! ```
//!
//! Without files, [`reduce_sightings`] runs the same pipeline over in-memory
//! records and tables:
//!
//! ```
//! use sight_reduction::{reduce_sightings, Almanac, AriesTable, Environment, SightingRecord, StarTable};
//!
//! let stars = StarTable::parse("Sirius\t01/01/24\t258d31.7\tS16d44.3\n")?;
//! let aries = AriesTable::parse("01/01/24\t10\t250d25.6\n01/01/24\t11\t265d28.0\n")?;
//! let almanac = Almanac::new(stars, aries);
//!
//! let sighting = SightingRecord {
//!     body: Some("Sirius".into()),
//!     date: Some("2024-01-01".into()),
//!     time: Some("10:30:00".into()),
//!     observation: Some("45d0.0".into()),
//!     ..Default::default()
//! };
//!
//! let reduction = reduce_sightings(&[sighting], &almanac, &Environment::default())?;
//! assert_eq!(reduction.sightings.len(), 1);
//! assert_eq!(reduction.diagnostics.error_count(), 0);
//! # Ok::<(), sight_reduction::SightError>(())
//! ```

use core::fmt;
use std::path::PathBuf;

use thiserror::Error;

pub mod almanac;
pub mod angle;
pub mod correction;
pub mod log;
pub(crate) mod math;
pub mod reduction;
pub mod sighting;


pub use almanac::{Almanac, AriesBracket, AriesEntry, AriesTable, StarEntry, StarFix, StarTable};
pub use angle::{Angle, DecimalDegrees};
pub use correction::{AltitudeCorrection, Environment, Horizon};
pub use log::SightLog;
pub use reduction::{
    reduce_sightings, ComputedSighting, Diagnostics, Fix, Interrupt, Reduction, StageResult,
};
pub use sighting::{SightingFile, SightingRecord, SightingSource};

/// The external inputs a reduction run reads from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Sighting,
    Star,
    Aries,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::Sighting => "Sighting",
            SourceKind::Star => "Star",
            SourceKind::Aries => "Aries",
        };
        f.write_str(name)
    }
}

/// Errors raised while parsing angles, loading sources or reducing sightings.
///
/// Whether an error skips a single sighting or aborts the whole run is decided
/// by the pipeline stage that raises it, see [`Interrupt`].
#[derive(Error, Debug)]
pub enum SightError {
    /// Malformed angle text, a bad numeric field, or an out-of-range value
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A sighting, star or Aries source could not be opened
    #[error("{kind} file could not be opened: {}", .path.display())]
    MissingSource {
        kind: SourceKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A reduction was requested before the source was registered
    #[error("{0} file has not been set")]
    SourceNotSet(SourceKind),

    /// A source was readable but its content could not be parsed
    #[error("{kind} file is malformed: {reason}")]
    MalformedSource { kind: SourceKind, reason: String },

    /// A sighting lacks one of its required tags
    #[error("{0} tag is missing")]
    MissingMandatoryField(&'static str),

    /// No star or Aries entry matches a sighting
    #[error("no almanac entry matches {0}")]
    AlmanacMismatch(String),

    /// An observation or environmental value lies outside its valid range
    #[error("range violation: {0}")]
    RangeViolation(String),

    /// The Aries entry bracketing a sighting is the last row of the table
    #[error("Aries table ends at {date} hour {hour}; no following entry to interpolate against")]
    EndOfTable { date: String, hour: u32 },

    /// The sight log was already closed by an earlier run
    #[error("sight log is closed")]
    LogClosed,

    /// Writing the sight log failed
    #[error("sight log could not be written")]
    Log(#[from] std::io::Error),
}
