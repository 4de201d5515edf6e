//! Version 3 source map generation.
//!
//! Segments are recorded per generated line in output order and VLQ encoded
//! when the map is serialized.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

const VERSION: u32 = 3;
const B64_DIGITS: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

#[derive(Debug, Clone, Copy)]
struct Segment {
    col0: u32,
    source_index: usize,
    source_line0: u32,
    source_col0: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub source_root: String,
    pub sources: Vec<String>,
    pub sources_content: Vec<Option<String>>,
    pub names: Vec<String>,
    pub mappings: String,
}

impl SourceMap {
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[derive(Debug, Default)]
pub struct SourceMapGenerator {
    file: Option<String>,
    sources: IndexMap<String, Option<String>>,
    lines: Vec<Vec<Segment>>,
    has_mappings: bool,
}

impl SourceMapGenerator {
    pub fn new(file: Option<String>) -> Self {
        SourceMapGenerator {
            file,
            ..Default::default()
        }
    }

    /// Registers a source and returns its index. The content is `None` when
    /// the consumer is expected to load it from the url.
    pub fn add_source(&mut self, url: &str, content: Option<String>) -> usize {
        let entry = self.sources.entry(url.to_string());
        let index = entry.index();
        entry.or_insert(content);
        index
    }

    /// Maps generated `(line0, col0)` to `(source_line0, source_col0)` of source `source_index`.
    /// Segments must arrive in output order within a line; out-of-order ones are dropped.
    pub fn add_mapping(
        &mut self,
        line0: u32,
        col0: u32,
        source_index: usize,
        source_line0: u32,
        source_col0: u32,
    ) {
        while self.lines.len() <= line0 as usize {
            self.lines.push(Vec::new());
        }
        let line = &mut self.lines[line0 as usize];
        if line.last().map_or(false, |last| last.col0 > col0) {
            tracing::trace!(line0, col0, "dropping out-of-order source map segment");
            return;
        }
        if line.last().map_or(false, |last| last.col0 == col0) {
            return;
        }
        line.push(Segment {
            col0,
            source_index,
            source_line0,
            source_col0,
        });
        self.has_mappings = true;
    }

    pub fn to_json(&self) -> Option<SourceMap> {
        if !self.has_mappings {
            return None;
        }

        let mut mappings = String::new();
        let mut last_source_index = 0i64;
        let mut last_source_line0 = 0i64;
        let mut last_source_col0 = 0i64;

        for (i, segments) in self.lines.iter().enumerate() {
            if i > 0 {
                mappings.push(';');
            }
            let mut last_col0 = 0i64;
            let encoded: Vec<String> = segments
                .iter()
                .map(|segment| {
                    let mut out = to_base64_vlq(segment.col0 as i64 - last_col0);
                    last_col0 = segment.col0 as i64;

                    out += &to_base64_vlq(segment.source_index as i64 - last_source_index);
                    last_source_index = segment.source_index as i64;

                    out += &to_base64_vlq(segment.source_line0 as i64 - last_source_line0);
                    last_source_line0 = segment.source_line0 as i64;

                    out += &to_base64_vlq(segment.source_col0 as i64 - last_source_col0);
                    last_source_col0 = segment.source_col0 as i64;
                    out
                })
                .collect();
            mappings += &encoded.join(",");
        }

        Some(SourceMap {
            version: VERSION,
            file: self.file.clone(),
            source_root: String::new(),
            sources: self.sources.keys().cloned().collect(),
            sources_content: self.sources.values().cloned().collect(),
            names: Vec::new(),
            mappings,
        })
    }
}

fn to_base64_vlq(value: i64) -> String {
    let mut value = if value < 0 { ((-value) << 1) + 1 } else { value << 1 };

    let mut out = String::new();
    loop {
        let mut digit = value & 31;
        value >>= 5;
        if value > 0 {
            digit |= 32;
        }
        out.push(B64_DIGITS[digit as usize] as char);
        if value <= 0 {
            break;
        }
    }
    out
}

/// Tracks the generated line/column while text is appended.
#[derive(Debug, Default, Clone, Copy)]
pub struct OutputCursor {
    pub line0: u32,
    pub col0: u32,
}

impl OutputCursor {
    pub fn advance(&mut self, text: &str) {
        for ch in text.chars() {
            if ch == '\n' {
                self.line0 += 1;
                self.col0 = 0;
            } else {
                self.col0 += ch.len_utf16() as u32;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vlq_encoding() {
        assert_eq!(to_base64_vlq(0), "A");
        assert_eq!(to_base64_vlq(1), "C");
        assert_eq!(to_base64_vlq(-1), "D");
        assert_eq!(to_base64_vlq(16), "gB");
        assert_eq!(to_base64_vlq(-17), "jB");
    }

    #[test]
    fn empty_generator_has_no_map() {
        assert!(SourceMapGenerator::new(None).to_json().is_none());
    }

    #[test]
    fn mappings_are_delta_encoded_per_line() {
        let mut gen = SourceMapGenerator::new(Some("out.js".into()));
        let src = gen.add_source("a.html", Some("<p></p>".into()));
        gen.add_mapping(0, 0, src, 0, 0);
        gen.add_mapping(0, 4, src, 0, 2);
        gen.add_mapping(2, 2, src, 1, 0);

        let map = gen.to_json().unwrap();
        assert_eq!(map.sources, vec!["a.html".to_string()]);
        assert_eq!(map.mappings, "AAAA,IAAE;;EACF");
        let json = map.to_json_string();
        assert!(json.contains("\"sourcesContent\":[\"<p></p>\"]"));
    }

    #[test]
    fn out_of_order_segments_are_dropped() {
        let mut gen = SourceMapGenerator::new(None);
        let src = gen.add_source("a", None);
        gen.add_mapping(0, 5, src, 0, 0);
        gen.add_mapping(0, 2, src, 0, 1);
        assert_eq!(gen.to_json().unwrap().mappings, "KAAA");
    }
}
