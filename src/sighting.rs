//! Sighting records and the XML sighting file.
//!
//! A sighting file looks like:
//!
//! ```xml
//! <fix>
//!     <sighting>
//!         <body>Aldebaran</body>
//!         <date>2016-03-01</date>
//!         <time>23:40:01</time>
//!         <observation>15d04.9</observation>
//!         <height>6.0</height>
//!         <temperature>72</temperature>
//!         <pressure>1010</pressure>
//!         <horizon>Artificial</horizon>
//!     </sighting>
//! </fix>
//! ```

use std::path::{Path, PathBuf};

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::almanac::read_source;
use crate::{SightError, SourceKind};

/// One raw sighting as read from the source.
///
/// Every field holds the trimmed text of its tag; an absent or blank tag is
/// `None`. Interpretation happens in the reduction pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SightingRecord {
    pub body: Option<String>,
    /// `YYYY-MM-DD`
    pub date: Option<String>,
    /// `HH:MM:SS`
    pub time: Option<String>,
    /// `xdy.y`
    pub observation: Option<String>,
    pub height: Option<String>,
    /// Degrees Fahrenheit
    pub temperature: Option<String>,
    /// hPa
    pub pressure: Option<String>,
    /// `natural` or `artificial`
    pub horizon: Option<String>,
}

/// Something that yields the sightings for one reduction run.
pub trait SightingSource {
    fn read_sightings(&self) -> Result<Vec<SightingRecord>, SightError>;
}

impl SightingSource for Vec<SightingRecord> {
    fn read_sightings(&self) -> Result<Vec<SightingRecord>, SightError> {
        Ok(self.clone())
    }
}

/// An XML sighting file on disk, read when the run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SightingFile {
    path: PathBuf,
}

impl SightingFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SightingSource for SightingFile {
    fn read_sightings(&self) -> Result<Vec<SightingRecord>, SightError> {
        parse_sightings(&read_source(SourceKind::Sighting, &self.path)?)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Field {
    Body,
    Date,
    Time,
    Observation,
    Height,
    Temperature,
    Pressure,
    Horizon,
}

impl Field {
    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"body" => Some(Field::Body),
            b"date" => Some(Field::Date),
            b"time" => Some(Field::Time),
            b"observation" => Some(Field::Observation),
            b"height" => Some(Field::Height),
            b"temperature" => Some(Field::Temperature),
            b"pressure" => Some(Field::Pressure),
            b"horizon" => Some(Field::Horizon),
            _ => None,
        }
    }

    fn slot<'a>(&self, record: &'a mut SightingRecord) -> &'a mut Option<String> {
        match self {
            Field::Body => &mut record.body,
            Field::Date => &mut record.date,
            Field::Time => &mut record.time,
            Field::Observation => &mut record.observation,
            Field::Height => &mut record.height,
            Field::Temperature => &mut record.temperature,
            Field::Pressure => &mut record.pressure,
            Field::Horizon => &mut record.horizon,
        }
    }
}

/// State of the sighting currently being read.
struct OpenSighting {
    record: SightingRecord,
    /// Tags already seen; only the first occurrence of each is kept.
    seen: Vec<Field>,
    field: Option<(Field, String)>,
}

/// Parses every `<sighting>` element in an XML document, in document order.
///
/// # Errors
///
/// [`SightError::MalformedSource`] for malformed XML, a document without a
/// root element, or one that ends before its elements are closed.
pub fn parse_sightings(xml: &str) -> Result<Vec<SightingRecord>, SightError> {
    let malformed = |reason: String| SightError::MalformedSource {
        kind: SourceKind::Sighting,
        reason,
    };

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut sightings = Vec::new();
    let mut current: Option<OpenSighting> = None;
    let mut saw_root = false;
    let mut depth = 0_usize;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| malformed(format!("at byte {}: {e}", reader.error_position())))?;
        match event {
            Event::Start(start) => {
                saw_root = true;
                depth += 1;
                let name = start.name();
                if name.as_ref() == b"sighting" {
                    current = Some(OpenSighting {
                        record: SightingRecord::default(),
                        seen: Vec::new(),
                        field: None,
                    });
                } else if let (Some(open), Some(field)) = (current.as_mut(), Field::from_tag(name.as_ref())) {
                    if open.field.is_none() {
                        open.field = Some((field, String::new()));
                    }
                }
            }
            Event::Empty(empty) => {
                saw_root = true;
                if let (Some(open), Some(field)) = (current.as_mut(), Field::from_tag(empty.name().as_ref())) {
                    if !open.seen.contains(&field) {
                        open.seen.push(field);
                    }
                }
            }
            Event::Text(text) => {
                if let Some((_, buffer)) = current.as_mut().and_then(|open| open.field.as_mut()) {
                    let text = text.unescape().map_err(|e| malformed(e.to_string()))?;
                    buffer.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some((_, buffer)) = current.as_mut().and_then(|open| open.field.as_mut()) {
                    buffer.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::End(end) => {
                depth = depth.saturating_sub(1);
                let name = end.name();
                if name.as_ref() == b"sighting" {
                    if let Some(open) = current.take() {
                        sightings.push(open.record);
                    }
                } else if let Some(open) = current.as_mut() {
                    let closes_field = matches!(
                        (&open.field, Field::from_tag(name.as_ref())),
                        (Some((field, _)), Some(tag)) if *field == tag
                    );
                    if closes_field {
                        if let Some((field, buffer)) = open.field.take() {
                            if !open.seen.contains(&field) {
                                open.seen.push(field);
                                let value = buffer.trim();
                                *field.slot(&mut open.record) = (!value.is_empty()).then(|| value.to_string());
                            }
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(malformed("document has no root element".to_string()));
    }
    if depth > 0 || current.is_some() {
        return Err(malformed(format!(
            "document ends with {depth} unclosed element(s) at byte {}",
            reader.buffer_position()
        )));
    }
    Ok(sightings)
}
