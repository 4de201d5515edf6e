//! Position-indexed text edits.
//!
//! Rewrites never mutate source text directly. Callers record replacements
//! against byte offsets of the original text and apply them once; edits are
//! ordered by position (insertion order breaks ties) and must not overlap.

use crate::ast::Position;
use crate::diagnostics::{CompilerError, PRANG_INTERNAL_EDIT_CONFLICT};
use crate::sourcemap::{OutputCursor, SourceMap, SourceMapGenerator};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub start: u32,
    pub end: u32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("edit {start}..{end} is outside of the {len} byte source")]
    OutOfBounds { start: u32, end: u32, len: usize },
    #[error("edit {start}..{end} overlaps a previous edit ending at {previous_end}")]
    Overlap { start: u32, end: u32, previous_end: u32 },
    #[error("edit {start}..{end} does not fall on a character boundary")]
    NotCharBoundary { start: u32, end: u32 },
}

impl From<EditError> for CompilerError {
    fn from(err: EditError) -> Self {
        CompilerError::new(PRANG_INTERNAL_EDIT_CONFLICT, err.to_string(), "", 0, 0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EditList {
    edits: Vec<Edit>,
}

impl EditList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, start: u32, end: u32, text: impl Into<String>) {
        self.edits.push(Edit {
            start,
            end,
            text: text.into(),
        });
    }

    pub fn insert(&mut self, at: u32, text: impl Into<String>) {
        self.replace(at, at, text);
    }

    /// Inserts ahead of every edit already recorded at `at`.
    pub fn prepend(&mut self, at: u32, text: impl Into<String>) {
        self.edits.insert(
            0,
            Edit {
                start: at,
                end: at,
                text: text.into(),
            },
        );
    }

    pub fn remove(&mut self, start: u32, end: u32) {
        self.replace(start, end, "");
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    fn sorted(&self, source: &str) -> Result<Vec<&Edit>, EditError> {
        let mut edits: Vec<&Edit> = self.edits.iter().collect();
        // Stable: inserts at the same offset keep their recording order.
        edits.sort_by_key(|e| (e.start, e.end));

        let mut previous_end = 0u32;
        for edit in &edits {
            if edit.start > edit.end || edit.end as usize > source.len() {
                return Err(EditError::OutOfBounds {
                    start: edit.start,
                    end: edit.end,
                    len: source.len(),
                });
            }
            if !source.is_char_boundary(edit.start as usize) || !source.is_char_boundary(edit.end as usize) {
                return Err(EditError::NotCharBoundary {
                    start: edit.start,
                    end: edit.end,
                });
            }
            if edit.start < previous_end {
                return Err(EditError::Overlap {
                    start: edit.start,
                    end: edit.end,
                    previous_end,
                });
            }
            previous_end = previous_end.max(edit.end);
        }
        Ok(edits)
    }

    pub fn apply(&self, source: &str) -> Result<String, EditError> {
        let edits = self.sorted(source)?;
        let mut out = String::with_capacity(source.len());
        let mut cursor = 0usize;
        for edit in edits {
            out.push_str(&source[cursor..edit.start as usize]);
            out.push_str(&edit.text);
            cursor = edit.end as usize;
        }
        out.push_str(&source[cursor..]);
        Ok(out)
    }

    /// Applies the edits and maps every unchanged line start and every edit
    /// back to the original text.
    pub fn apply_with_map(&self, source: &str, source_name: &str) -> Result<(String, SourceMap), EditError> {
        let edits = self.sorted(source)?;
        let mut gen = SourceMapGenerator::new(Some(source_name.to_string()));
        let src = gen.add_source(source_name, Some(source.to_string()));

        let mut out = String::with_capacity(source.len());
        let mut out_cursor = OutputCursor::default();
        let mut src_pos = Position::start();
        let mut cursor = 0usize;

        for edit in edits {
            copy_unchanged(&mut out, &mut out_cursor, &mut src_pos, &source[cursor..edit.start as usize], &mut gen, src);
            if !edit.text.is_empty() {
                gen.add_mapping(out_cursor.line0, out_cursor.col0, src, src_pos.line - 1, src_pos.column - 1);
                out.push_str(&edit.text);
                out_cursor.advance(&edit.text);
            }
            src_pos = src_pos.advance(&source[edit.start as usize..edit.end as usize]);
            cursor = edit.end as usize;
        }
        copy_unchanged(&mut out, &mut out_cursor, &mut src_pos, &source[cursor..], &mut gen, src);

        let map = gen.to_json().unwrap_or(SourceMap {
            version: 3,
            file: Some(source_name.to_string()),
            source_root: String::new(),
            sources: vec![source_name.to_string()],
            sources_content: vec![Some(source.to_string())],
            names: Vec::new(),
            mappings: String::new(),
        });
        Ok((out, map))
    }
}

fn copy_unchanged(
    out: &mut String,
    out_cursor: &mut OutputCursor,
    src_pos: &mut Position,
    text: &str,
    gen: &mut SourceMapGenerator,
    src: usize,
) {
    for line in text.split_inclusive('\n') {
        gen.add_mapping(out_cursor.line0, out_cursor.col0, src, src_pos.line - 1, src_pos.column - 1);
        out.push_str(line);
        out_cursor.advance(line);
        *src_pos = src_pos.advance(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_in_position_order_regardless_of_recording_order() {
        let mut edits = EditList::new();
        edits.replace(8, 9, "$setup.b");
        edits.replace(0, 1, "$setup.a");
        assert_eq!(edits.apply("a + 1 + b").unwrap(), "$setup.a + 1 + $setup.b");
    }

    #[test]
    fn inserts_at_same_offset_keep_recording_order() {
        let mut edits = EditList::new();
        edits.insert(0, "1");
        edits.insert(0, "2");
        edits.replace(0, 1, "x");
        assert_eq!(edits.apply("ab").unwrap(), "12xb");
    }

    #[test]
    fn prepend_goes_ahead_of_earlier_inserts() {
        let mut edits = EditList::new();
        edits.insert(0, "b");
        edits.prepend(0, "a");
        assert_eq!(edits.apply("c").unwrap(), "abc");
    }

    #[test]
    fn overlapping_edits_are_rejected() {
        let mut edits = EditList::new();
        edits.replace(0, 4, "x");
        edits.replace(2, 6, "y");
        assert!(matches!(edits.apply("abcdefgh"), Err(EditError::Overlap { .. })));
    }

    #[test]
    fn out_of_bounds_edits_are_rejected() {
        let mut edits = EditList::new();
        edits.replace(2, 10, "x");
        assert!(matches!(edits.apply("abc"), Err(EditError::OutOfBounds { .. })));
    }

    #[test]
    fn map_points_unchanged_lines_back_to_their_origin() {
        let mut edits = EditList::new();
        edits.insert(0, "import x;\n");
        let (code, map) = edits.apply_with_map("a\nb\n", "file.ts").unwrap();
        assert_eq!(code, "import x;\na\nb\n");
        // line 0 -> inserted text at 0:0, line 1 -> 0:0, line 2 -> 1:0
        assert_eq!(map.mappings, "AAAA;AAAA;AACA");
    }
}
