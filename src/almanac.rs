//! Star and Aries almanac tables.
//!
//! Both tables are tab-delimited text, one entry per line, with dates written
//! `MM/DD/YY`:
//!
//! ```text
//! Sirius	01/01/24	258d31.7	S16d44.3        (star: name, date, SHA, reference)
//! 01/01/24	10	250d25.6                        (Aries: date, hour, GHA)
//! ```
//!
//! Aries rows run in increasing hour order and roll over into the next date,
//! so the row after a match is the next hour.

use std::path::Path;

use crate::angle::Angle;
use crate::{SightError, SourceKind};

/// One row of the star almanac.
#[derive(Debug, Clone, PartialEq)]
pub struct StarEntry {
    pub body: String,
    pub date: String,
    pub sha: Angle,
    /// Reference value reported as the sighting's latitude, kept as written.
    pub reference: String,
}

/// One row of the Aries almanac.
#[derive(Debug, Clone, PartialEq)]
pub struct AriesEntry {
    pub date: String,
    pub hour: u32,
    pub gha: Angle,
}

/// A resolved star: its SHA and reference value.
#[derive(Debug, Clone, PartialEq)]
pub struct StarFix {
    pub sha: Angle,
    pub reference: String,
}

/// GHA of Aries at the start of the sighting's hour and at the row after it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AriesBracket {
    pub lower: Angle,
    pub upper: Angle,
}

impl AriesBracket {
    /// Linear interpolation between the two entries, in decimal degrees.
    ///
    /// Uses the rounded decimal projections of both entries and does not
    /// unwrap a bracket that crosses 360.
    pub fn interpolate(&self, seconds_into_hour: u32) -> f64 {
        let lower = self.lower.to_decimal_degrees();
        let upper = self.upper.to_decimal_degrees();
        lower + (upper - lower) * (f64::from(seconds_into_hour) / 3600.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StarTable {
    entries: Vec<StarEntry>,
}

impl StarTable {
    pub fn new(entries: Vec<StarEntry>) -> Self {
        Self { entries }
    }

    /// Parses a star table held in memory. Blank lines are skipped.
    ///
    /// # Errors
    ///
    /// [`SightError::MalformedSource`] naming the first line with fewer than
    /// four fields or an unparsable SHA.
    pub fn parse(data: &str) -> Result<Self, SightError> {
        let entries = data
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| parse_star_entry(line).map_err(|reason| malformed(SourceKind::Star, index, reason)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SightError> {
        Self::parse(&read_source(SourceKind::Star, path.as_ref())?)
    }

    pub fn entries(&self) -> &[StarEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AriesTable {
    entries: Vec<AriesEntry>,
}

impl AriesTable {
    pub fn new(entries: Vec<AriesEntry>) -> Self {
        Self { entries }
    }

    /// Parses an Aries table held in memory. Blank lines are skipped.
    ///
    /// # Errors
    ///
    /// [`SightError::MalformedSource`] naming the first line with fewer than
    /// three fields, a non-integer hour, or an unparsable GHA.
    pub fn parse(data: &str) -> Result<Self, SightError> {
        let entries = data
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| parse_aries_entry(line).map_err(|reason| malformed(SourceKind::Aries, index, reason)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SightError> {
        Self::parse(&read_source(SourceKind::Aries, path.as_ref())?)
    }

    pub fn entries(&self) -> &[AriesEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Both almanac tables, answering the lookups a sight reduction needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Almanac {
    stars: StarTable,
    aries: AriesTable,
}

impl Almanac {
    pub fn new(stars: StarTable, aries: AriesTable) -> Self {
        Self { stars, aries }
    }

    pub fn load<S: AsRef<Path>, A: AsRef<Path>>(star_path: S, aries_path: A) -> Result<Self, SightError> {
        Ok(Self::new(StarTable::load(star_path)?, AriesTable::load(aries_path)?))
    }

    pub fn stars(&self) -> &StarTable {
        &self.stars
    }

    pub fn aries(&self) -> &AriesTable {
        &self.aries
    }

    /// SHA and reference value for `body` on `date` (`MM/DD/YY`).
    ///
    /// Every matching row replaces the previous candidate, so when the table
    /// lists the same body and date twice the later row is returned.
    pub fn resolve_star(&self, body: &str, date: &str) -> Option<StarFix> {
        self.stars
            .entries
            .iter()
            .rev()
            .find(|entry| entry.body == body && entry.date == date)
            .map(|entry| StarFix {
                sha: entry.sha,
                reference: entry.reference.clone(),
            })
    }

    /// GHA bracket for `hour` on `date` (`MM/DD/YY`).
    ///
    /// The upper value is the row that follows the match in file order,
    /// whatever its date or hour. That row is consumed with the match and is
    /// not itself tested as a candidate. A later match replaces an earlier
    /// one. Returns `Ok(None)` when nothing matches.
    ///
    /// # Errors
    ///
    /// [`SightError::EndOfTable`] when the matching row is the last row.
    pub fn resolve_aries_bracket(&self, date: &str, hour: u32) -> Result<Option<AriesBracket>, SightError> {
        let entries = &self.aries.entries;
        let mut bracket = None;
        let mut index = 0;
        while index < entries.len() {
            let entry = &entries[index];
            if entry.date == date && entry.hour == hour {
                let next = entries.get(index + 1).ok_or_else(|| SightError::EndOfTable {
                    date: date.to_string(),
                    hour,
                })?;
                bracket = Some(AriesBracket {
                    lower: entry.gha,
                    upper: next.gha,
                });
                index += 2;
            } else {
                index += 1;
            }
        }
        Ok(bracket)
    }
}

fn parse_star_entry(line: &str) -> Result<StarEntry, String> {
    let fields: Vec<&str> = line.split('\t').collect();
    let [body, date, sha, reference, ..] = fields.as_slice() else {
        return Err(format!("expected 4 tab-separated fields, found {}", fields.len()));
    };
    Ok(StarEntry {
        body: (*body).to_string(),
        date: (*date).to_string(),
        sha: sha.trim().parse().map_err(|e: SightError| e.to_string())?,
        reference: reference.trim().to_string(),
    })
}

fn parse_aries_entry(line: &str) -> Result<AriesEntry, String> {
    let fields: Vec<&str> = line.split('\t').collect();
    let [date, hour, gha, ..] = fields.as_slice() else {
        return Err(format!("expected 3 tab-separated fields, found {}", fields.len()));
    };
    Ok(AriesEntry {
        date: (*date).to_string(),
        hour: hour.trim().parse().map_err(|_| format!("invalid hour {hour:?}"))?,
        gha: gha.trim().parse().map_err(|e: SightError| e.to_string())?,
    })
}

fn malformed(kind: SourceKind, index: usize, reason: String) -> SightError {
    SightError::MalformedSource {
        kind,
        reason: format!("line {}: {reason}", index + 1),
    }
}

pub(crate) fn read_source(kind: SourceKind, path: &Path) -> Result<String, SightError> {
    std::fs::read_to_string(path).map_err(|source| SightError::MissingSource {
        kind,
        path: path.to_path_buf(),
        source,
    })
}
