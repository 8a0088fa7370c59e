use hashbrown::HashSet;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::grid::Coordinate;

// Separators that may surround a record in a JSON-array style dump.
const RECORD_TRIM: &[char] = &['\n', '\r', ' ', '\t', ','];

/// Why a line was not accepted as a record. Never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    #[error("line is not a single JSON object")]
    NotAnObject,
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("malformed coordinate pair")]
    BadCoordinates,
}

/// A decoded post: where it was made and which hashtags it carries.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub coordinate: Option<Coordinate>,
    pub hashtags: HashSet<String>,
}

#[derive(Deserialize)]
struct RawPost {
    doc: Option<RawDoc>,
}

#[derive(Deserialize)]
struct RawDoc {
    coordinates: Option<RawGeometry>,
    text: Option<String>,
}

#[derive(Deserialize)]
struct RawGeometry {
    coordinates: Option<Vec<Value>>,
}

#[derive(Debug, Clone)]
pub struct RecordParser {
    hashtag: Regex,
    delimiter: char,
}

impl RecordParser {
    /// A hashtag only counts when `delimiter` sits directly on both sides of it.
    pub fn new(delimiter: char) -> Self {
        RecordParser {
            hashtag: Regex::new(&format!(
                r"#[^\s{}]+",
                regex::escape(&delimiter.to_string())
            ))
            .expect("escaped hashtag pattern is valid"),
            delimiter,
        }
    }

    pub fn parse(&self, raw_line: &str) -> Result<Record, ParseFailure> {
        let line = raw_line.trim_matches(RECORD_TRIM);
        if !(line.starts_with('{') && line.ends_with('}')) {
            return Err(ParseFailure::NotAnObject);
        }

        let post: RawPost =
            serde_json::from_str(line).map_err(|e| ParseFailure::InvalidJson(e.to_string()))?;
        let doc = post.doc.ok_or(ParseFailure::MissingField("doc"))?;
        let points = doc
            .coordinates
            .and_then(|geometry| geometry.coordinates)
            .ok_or(ParseFailure::MissingField("doc.coordinates.coordinates"))?;
        let text = doc.text.ok_or(ParseFailure::MissingField("doc.text"))?;

        Ok(Record {
            coordinate: coordinate_from(&points)?,
            hashtags: self.hashtags(&text),
        })
    }

    /// Lower-cased, de-duplicated hashtags of one post body.
    pub fn hashtags(&self, text: &str) -> HashSet<String> {
        let text = text.to_lowercase();
        self.hashtag
            .find_iter(&text)
            .filter(|m| {
                text[..m.start()].ends_with(self.delimiter)
                    && text[m.end()..].starts_with(self.delimiter)
            })
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

impl Default for RecordParser {
    fn default() -> Self {
        RecordParser::new(' ')
    }
}

// An empty list means the post carries no geo data; it decodes but never classifies.
fn coordinate_from(points: &[Value]) -> Result<Option<Coordinate>, ParseFailure> {
    match points {
        [] => Ok(None),
        [x, y, ..] => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => Ok(Some(Coordinate::new(x, y))),
            _ => Err(ParseFailure::BadCoordinates),
        },
        [_] => Err(ParseFailure::BadCoordinates),
    }
}
