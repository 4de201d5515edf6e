//! Virtual module ids: `<real file path>?<query>`.
//!
//! The query carries the compiler marker (`prang`), the request `type`, the
//! owning `scopeId` and, for inline styles, a numeric `styleIndex`. Any other
//! key is preserved verbatim so ids round-trip. In the path only `%`, `?`
//! and `&` are percent-encoded.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MARKER_KEY: &str = "prang";
const TYPE_KEY: &str = "type";
const SCOPE_ID_KEY: &str = "scopeId";
const STYLE_INDEX_KEY: &str = "styleIndex";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VirtualKind {
    Template,
    InlineTemplate,
    Style,
    InlineStyle,
}

impl VirtualKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VirtualKind::Template => "template",
            VirtualKind::InlineTemplate => "inline-template",
            VirtualKind::Style => "style",
            VirtualKind::InlineStyle => "inline-style",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "template" => Some(VirtualKind::Template),
            "inline-template" => Some(VirtualKind::InlineTemplate),
            "style" => Some(VirtualKind::Style),
            "inline-style" => Some(VirtualKind::InlineStyle),
            _ => None,
        }
    }

    pub fn is_style(&self) -> bool {
        matches!(self, VirtualKind::Style | VirtualKind::InlineStyle)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VirtualIdError {
    #[error("unknown virtual module type `{0}`")]
    UnknownKind(String),
    #[error("styleIndex `{0}` is not a non-negative integer")]
    InvalidStyleIndex(String),
    #[error("malformed percent-encoding in `{0}`")]
    MalformedEncoding(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualQuery {
    pub prang: bool,
    pub kind: Option<VirtualKind>,
    pub scope_id: Option<String>,
    pub style_index: Option<usize>,
    /// Unrecognized keys in order of appearance; an empty value is a bare flag.
    pub extra: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualId {
    pub path: String,
    pub query: VirtualQuery,
}

impl VirtualId {
    pub fn new(path: impl Into<String>, query: VirtualQuery) -> Self {
        VirtualId {
            path: path.into(),
            query,
        }
    }

    pub fn template(path: &str, scope_id: &str, inline: bool) -> Self {
        let kind = if inline {
            VirtualKind::InlineTemplate
        } else {
            VirtualKind::Template
        };
        VirtualId::new(
            path,
            VirtualQuery {
                prang: true,
                kind: Some(kind),
                scope_id: Some(scope_id.to_string()),
                ..Default::default()
            },
        )
    }

    pub fn style(path: &str, scope_id: &str, index: Option<usize>) -> Self {
        let mut query = VirtualQuery {
            prang: true,
            kind: Some(if index.is_some() {
                VirtualKind::InlineStyle
            } else {
                VirtualKind::Style
            }),
            scope_id: Some(scope_id.to_string()),
            style_index: index,
            ..Default::default()
        };
        if index.is_some() {
            // Lets the host's CSS pipeline pick the module up by extension.
            query.extra.insert("lang.css".to_string(), String::new());
        }
        VirtualId::new(path, query)
    }

    pub fn is_virtual(&self) -> bool {
        self.query.prang
    }
}

/// Splits on the first `?` and decodes the query.
pub fn parse_virtual_id(id: &str) -> Result<VirtualId, VirtualIdError> {
    let (path, raw_query) = match id.split_once('?') {
        Some((path, query)) => (path, query),
        None => (id, ""),
    };

    let mut query = VirtualQuery::default();
    for pair in raw_query.split('&').filter(|p| !p.is_empty()) {
        let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_component(raw_key)?;
        let value = decode_component(raw_value)?;
        match key.as_str() {
            MARKER_KEY => query.prang = true,
            TYPE_KEY => {
                query.kind = Some(VirtualKind::parse(&value).ok_or(VirtualIdError::UnknownKind(value))?)
            }
            SCOPE_ID_KEY => query.scope_id = Some(value),
            STYLE_INDEX_KEY => {
                query.style_index = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| VirtualIdError::InvalidStyleIndex(value.clone()))?,
                )
            }
            _ => {
                query.extra.insert(key, value);
            }
        }
    }

    Ok(VirtualId::new(decode_path(path), query))
}

pub fn format_virtual_id(path: &str, query: &VirtualQuery) -> String {
    let mut pairs: Vec<String> = Vec::new();
    if query.prang {
        pairs.push(MARKER_KEY.to_string());
    }
    if let Some(kind) = query.kind {
        pairs.push(format!("{TYPE_KEY}={}", kind.as_str()));
    }
    if let Some(scope_id) = &query.scope_id {
        pairs.push(format!("{SCOPE_ID_KEY}={}", encode_component(scope_id)));
    }
    if let Some(index) = query.style_index {
        pairs.push(format!("{STYLE_INDEX_KEY}={index}"));
    }
    for (key, value) in &query.extra {
        if value.is_empty() {
            pairs.push(encode_component(key));
        } else {
            pairs.push(format!("{}={}", encode_component(key), encode_component(value)));
        }
    }

    let path = encode_path(path);
    if pairs.is_empty() {
        path
    } else {
        format!("{path}?{}", pairs.join("&"))
    }
}

impl fmt::Display for VirtualId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_virtual_id(&self.path, &self.query))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// URL QUERY ENCODING
// ═══════════════════════════════════════════════════════════════════════════════

fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~' | b'*')
}

fn encode_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for &byte in raw.as_bytes() {
        if is_unreserved(byte) {
            out.push(byte as char);
        } else if byte == b' ' {
            out.push('+');
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

fn decode_component(raw: &str) -> Result<String, VirtualIdError> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' => {
                let hex = raw
                    .get(i + 1..i + 3)
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
                    .ok_or_else(|| VirtualIdError::MalformedEncoding(raw.to_string()))?;
                out.push(hex);
                i += 2;
            }
            byte => out.push(byte),
        }
        i += 1;
    }
    String::from_utf8(out).map_err(|_| VirtualIdError::MalformedEncoding(raw.to_string()))
}

const PATH_ESCAPES: [(u8, &str); 3] = [(b'%', "%25"), (b'?', "%3F"), (b'&', "%26")];

fn encode_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        match PATH_ESCAPES.iter().find(|(byte, _)| c == *byte as char) {
            Some((_, escaped)) => out.push_str(escaped),
            None => out.push(c),
        }
    }
    out
}

/// Inverse of `encode_path`. Any other `%` sequence is kept as written.
fn decode_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut rest = path;
    while let Some(i) = rest.find('%') {
        out.push_str(&rest[..i]);
        rest = &rest[i..];
        let escape = PATH_ESCAPES
            .iter()
            .find(|(_, escaped)| rest.get(..3).is_some_and(|head| head.eq_ignore_ascii_case(escaped)));
        match escape {
            Some((byte, _)) => {
                out.push(*byte as char);
                rest = &rest[3..];
            }
            None => {
                out.push('%');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_template_and_style_ids() {
        let id = VirtualId::template("/src/app.component.ts", "1a2b3c4d", true);
        assert_eq!(
            id.to_string(),
            "/src/app.component.ts?prang&type=inline-template&scopeId=1a2b3c4d"
        );

        let style = VirtualId::style("/src/app.component.ts", "1a2b3c4d", Some(2));
        assert_eq!(
            style.to_string(),
            "/src/app.component.ts?prang&type=inline-style&scopeId=1a2b3c4d&styleIndex=2&lang.css"
        );
    }

    #[test]
    fn parses_marker_and_style_index() {
        let id = parse_virtual_id("/a/b.css?prang&type=style&scopeId=abc&styleIndex=3").unwrap();
        assert_eq!(id.path, "/a/b.css");
        assert!(id.query.prang);
        assert_eq!(id.query.kind, Some(VirtualKind::Style));
        assert_eq!(id.query.style_index, Some(3));
    }

    #[test]
    fn splits_on_first_question_mark_only() {
        let id = parse_virtual_id("/a.html?prang&note=what%3F&x=a?b").unwrap();
        assert_eq!(id.path, "/a.html");
        assert_eq!(id.query.extra["note"], "what?");
        assert_eq!(id.query.extra["x"], "a?b");
    }

    #[test]
    fn question_marks_in_paths_are_escaped() {
        let id = VirtualId::template("/src/a?b.html", "ab", false);
        assert_eq!(id.to_string(), "/src/a%3Fb.html?prang&type=template&scopeId=ab");
        let parsed = parse_virtual_id(&id.to_string()).unwrap();
        assert_eq!(parsed.path, "/src/a?b.html");
        assert_eq!(parsed.query.scope_id.as_deref(), Some("ab"));

        // Sequences the formatter never writes are left alone.
        assert_eq!(parse_virtual_id("/src/a%20b.ts").unwrap().path, "/src/a%20b.ts");
    }

    #[test]
    fn plain_paths_are_not_virtual() {
        let id = parse_virtual_id("/src/main.ts").unwrap();
        assert!(!id.is_virtual());
        assert_eq!(format_virtual_id(&id.path, &id.query), "/src/main.ts");
    }

    #[test]
    fn rejects_bad_type_and_index() {
        assert!(matches!(
            parse_virtual_id("/a?prang&type=script"),
            Err(VirtualIdError::UnknownKind(_))
        ));
        assert!(matches!(
            parse_virtual_id("/a?prang&styleIndex=-1"),
            Err(VirtualIdError::InvalidStyleIndex(_))
        ));
        assert!(matches!(
            parse_virtual_id("/a?x=%zz"),
            Err(VirtualIdError::MalformedEncoding(_))
        ));
    }

    #[test]
    fn round_trips_arbitrary_queries() {
        let paths = [
            "/src/app.component.ts",
            "C:\\proj\\a b.ts",
            "/ünï/cödé.html",
            "relative/x.ts",
            "/src/a?b.html",
            "/src/100%.ts",
            "/src/a&b%3F.ts",
        ];
        let mut extras = IndexMap::new();
        extras.insert("lang.css".to_string(), String::new());
        extras.insert("weird key&=".to_string(), "va lue/%?".to_string());

        let queries = vec![
            VirtualQuery::default(),
            VirtualQuery {
                prang: true,
                kind: Some(VirtualKind::InlineStyle),
                scope_id: Some("deadbeef".into()),
                style_index: Some(0),
                extra: extras.clone(),
            },
            VirtualQuery {
                prang: false,
                kind: Some(VirtualKind::Template),
                scope_id: None,
                style_index: Some(42),
                extra: IndexMap::new(),
            },
            VirtualQuery {
                prang: true,
                extra: extras,
                ..Default::default()
            },
        ];

        for path in paths {
            for query in &queries {
                let formatted = format_virtual_id(path, query);
                let parsed = parse_virtual_id(&formatted).unwrap();
                assert_eq!(parsed.path, path);
                assert_eq!(&parsed.query, query, "round trip of {formatted}");
            }
        }
    }
}
