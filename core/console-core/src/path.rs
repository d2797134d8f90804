//! History-token parsing: `ViewId` segments and the `ViewPath` cursor.
//!
//! A history token is the URL-fragment encoding of navigation state:
//! `Segment(/Segment)*`. A segment that is purely numeric, or carries the
//! `0id_` prefix, is not a navigable name of its own; it attaches as the
//! identifier of the preceding named segment. `Resource/10001` is therefore
//! one segment, not two.
//!
//! Identifier validation happens here, eagerly, with typed errors. The
//! alternative (carrying malformed ids as opaque strings and failing at the
//! point of use) makes the failure surface unpredictable.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ConsoleError, Result};

/// Prefix marking a non-numeric identifier segment, e.g. `0id_abcdef`.
/// Starts with a digit so id segments are recognizable by their first byte:
/// view names never start with one.
pub const STRING_ID_PREFIX: &str = "0id_";

static NUMERIC_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+$").expect("static regex"));
static STRING_ID_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0id_[^/]+$").expect("static regex"));

/// Identifier embedded in a path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewKey {
    Numeric(i64),
    /// Stored without the `0id_` prefix.
    Text(String),
}

impl fmt::Display for ViewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewKey::Numeric(id) => write!(f, "{}", id),
            ViewKey::Text(id) => write!(f, "{}{}", STRING_ID_PREFIX, id),
        }
    }
}

/// One parsed path segment: a view name plus an optional identifier.
/// Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewId {
    name: String,
    key: Option<ViewKey>,
}

impl ViewId {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: None,
        }
    }

    pub fn with_key(name: impl Into<String>, key: ViewKey) -> Self {
        Self {
            name: name.into(),
            key: Some(key),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> Option<&ViewKey> {
        self.key.as_ref()
    }

    pub fn numeric_key(&self) -> Option<i64> {
        match self.key {
            Some(ViewKey::Numeric(id)) => Some(id),
            _ => None,
        }
    }

    /// Token form: `name` or `name/id`.
    pub fn token(&self) -> String {
        match &self.key {
            Some(key) => format!("{}/{}", self.name, key),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// Ordered segment sequence with a consumption cursor.
///
/// The cursor lets nested views consume prefix segments and hand the
/// remainder onward: it only moves forward, and `is_end()` holds once it
/// reaches the length. The `refresh` flag forces re-render of an unchanged
/// segment; it is set by the navigation core, never by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewPath {
    segments: Vec<ViewId>,
    index: usize,
    refresh: bool,
}

impl ViewPath {
    /// Parses a raw history token. The token may be URL-query-encoded.
    pub fn parse(token: &str) -> Result<Self> {
        let decoded = decode_query_string(token)?;
        let mut segments: Vec<ViewId> = Vec::new();

        for raw in decoded.split('/') {
            if raw.is_empty() {
                // trailing slash or doubled separator
                continue;
            }
            if NUMERIC_SEGMENT.is_match(raw) {
                let id = raw.parse::<i64>().map_err(|e| ConsoleError::MalformedSegment {
                    segment: raw.to_string(),
                    details: e.to_string(),
                })?;
                attach_key(&mut segments, raw, ViewKey::Numeric(id))?;
            } else if STRING_ID_SEGMENT.is_match(raw) {
                let id = raw[STRING_ID_PREFIX.len()..].to_string();
                attach_key(&mut segments, raw, ViewKey::Text(id))?;
            } else if raw.starts_with(|c: char| c.is_ascii_digit()) {
                // View names never start with a digit; a digit-led segment
                // that is not a well-formed id is a defect in the link.
                return Err(ConsoleError::MalformedSegment {
                    segment: raw.to_string(),
                    details: "digit-led segment is neither numeric nor a string id".to_string(),
                });
            } else {
                segments.push(ViewId::named(raw));
            }
        }

        Ok(Self {
            segments,
            index: 0,
            refresh: false,
        })
    }

    pub fn from_segments(segments: Vec<ViewId>) -> Self {
        Self {
            segments,
            index: 0,
            refresh: false,
        }
    }

    pub fn segments(&self) -> &[ViewId] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segment at the cursor, `None` once the path is consumed.
    pub fn current(&self) -> Option<&ViewId> {
        self.segments.get(self.index)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_end(&self) -> bool {
        self.index >= self.segments.len()
    }

    /// Advances the cursor one segment. Saturates at the end; the cursor
    /// never moves backwards.
    pub fn advance(&mut self) {
        if self.index < self.segments.len() {
            self.index += 1;
        }
    }

    /// Consuming variant of [`advance`](Self::advance), for handing the
    /// remainder to a nested view.
    pub fn next(mut self) -> Self {
        self.advance();
        self
    }

    pub fn is_refresh(&self) -> bool {
        self.refresh
    }

    pub fn set_refresh(&mut self, refresh: bool) {
        self.refresh = refresh;
    }

    /// Reconstructs the history token. Round-trips `parse` for valid tokens
    /// modulo trailing-slash normalization.
    pub fn token(&self) -> String {
        self.segments
            .iter()
            .map(ViewId::token)
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl fmt::Display for ViewPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

fn attach_key(segments: &mut [ViewId], raw: &str, key: ViewKey) -> Result<()> {
    let owner = segments
        .last_mut()
        .ok_or_else(|| ConsoleError::DanglingIdentifier {
            segment: raw.to_string(),
        })?;
    if owner.key.is_some() {
        // Two consecutive id segments: the second has no named owner.
        return Err(ConsoleError::DanglingIdentifier {
            segment: raw.to_string(),
        });
    }
    owner.key = Some(key);
    Ok(())
}

/// Decodes URL-query encoding: `+` as space, `%hh` as a byte. History tokens
/// arrive this way when lifted from anchor hrefs.
fn decode_query_string(token: &str) -> Result<String> {
    if !token.contains('%') && !token.contains('+') {
        return Ok(token.to_string());
    }

    let bytes = token.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' => {
                let hex = bytes.get(i + 1..i + 3).and_then(|pair| {
                    std::str::from_utf8(pair)
                        .ok()
                        .and_then(|s| u8::from_str_radix(s, 16).ok())
                });
                match hex {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    None => {
                        return Err(ConsoleError::MalformedSegment {
                            segment: token.to_string(),
                            details: "truncated percent escape".to_string(),
                        })
                    }
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8(out).map_err(|e| ConsoleError::MalformedSegment {
        segment: token.to_string(),
        details: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_token_is_empty_path() {
        let path = ViewPath::parse("").expect("parse");
        assert_eq!(path.len(), 0);
        assert!(path.is_end());
    }

    #[test]
    fn plain_segments_parse_in_order() {
        let path = ViewPath::parse("Administration/Security/Users").expect("parse");
        let names: Vec<&str> = path.segments().iter().map(ViewId::name).collect();
        assert_eq!(names, vec!["Administration", "Security", "Users"]);
    }

    #[test]
    fn numeric_segment_attaches_to_preceding_name() {
        let path = ViewPath::parse("Resource/10001").expect("parse");
        assert_eq!(path.len(), 1);
        let top = path.current().expect("segment");
        assert_eq!(top.name(), "Resource");
        assert_eq!(top.numeric_key(), Some(10001));
    }

    #[test]
    fn string_id_segment_attaches_to_preceding_name() {
        let path = ViewPath::parse("Drift/History/0id_abcdefghijk").expect("parse");
        assert_eq!(path.len(), 2);
        assert_eq!(
            path.segments()[1].key(),
            Some(&ViewKey::Text("abcdefghijk".to_string()))
        );
    }

    #[test]
    fn trailing_slash_is_normalized() {
        let path = ViewPath::parse("Dashboards/").expect("parse");
        assert_eq!(path.token(), "Dashboards");
    }

    #[test]
    fn token_round_trips() {
        for token in [
            "Dashboards",
            "Resource/10001",
            "Resource/10001/Operations/History",
            "Drift/History/0id_abc",
            "Inventory/Groups/DynaGroupDefinitions/10042",
        ] {
            let path = ViewPath::parse(token).expect("parse");
            assert_eq!(path.token(), token);
        }
    }

    #[test]
    fn leading_identifier_is_rejected() {
        assert!(matches!(
            ViewPath::parse("10001/Resource"),
            Err(ConsoleError::DanglingIdentifier { .. })
        ));
    }

    #[test]
    fn doubled_identifier_is_rejected() {
        assert!(matches!(
            ViewPath::parse("Resource/10001/10002"),
            Err(ConsoleError::DanglingIdentifier { .. })
        ));
    }

    #[test]
    fn digit_led_garbage_is_malformed() {
        assert!(matches!(
            ViewPath::parse("Resource/10x01"),
            Err(ConsoleError::MalformedSegment { .. })
        ));
    }

    #[test]
    fn numeric_overflow_is_malformed() {
        assert!(matches!(
            ViewPath::parse("Resource/99999999999999999999999999"),
            Err(ConsoleError::MalformedSegment { .. })
        ));
    }

    #[test]
    fn percent_encoding_is_decoded() {
        let path = ViewPath::parse("Reports/Drift%20Compliance").expect("parse");
        assert_eq!(path.segments()[1].name(), "Drift Compliance");
    }

    #[test]
    fn truncated_escape_is_malformed() {
        assert!(matches!(
            ViewPath::parse("Reports/Bad%2"),
            Err(ConsoleError::MalformedSegment { .. })
        ));
    }

    #[test]
    fn cursor_is_monotonic_and_saturates() {
        let mut path = ViewPath::parse("Resource/10001/Operations").expect("parse");
        assert_eq!(path.index(), 0);
        path.advance();
        assert_eq!(path.index(), 1);
        path.advance();
        assert!(path.is_end());
        path.advance();
        assert_eq!(path.index(), 2);
        assert!(path.is_end());
    }

    #[test]
    fn refresh_defaults_off_after_parse() {
        let path = ViewPath::parse("Inventory").expect("parse");
        assert!(!path.is_refresh());
    }
}
