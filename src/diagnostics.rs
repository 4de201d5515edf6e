//! Compiler diagnostics.
//!
//! Every failure the compiler can report to its host is a [`CompilerError`].
//! Fatal conditions are returned as `Err`, recoverable ones are collected as
//! warnings and compilation continues with a runtime fallback.

use serde::{Deserialize, Serialize};

use crate::ast::SourceLocation;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const PRANG_PARSE_UNCLOSED_TAG: &str = "PRANG-PARSE-001";
pub const PRANG_PARSE_MISMATCHED_END_TAG: &str = "PRANG-PARSE-002";
pub const PRANG_PARSE_UNTERMINATED_INTERPOLATION: &str = "PRANG-PARSE-003";
pub const PRANG_PARSE_UNTERMINATED_ATTRIBUTE: &str = "PRANG-PARSE-004";
pub const PRANG_PARSE_UNTERMINATED_COMMENT: &str = "PRANG-PARSE-005";
pub const PRANG_PARSE_UNEXPECTED_EOF: &str = "PRANG-PARSE-006";
pub const PRANG_PARSE_DUPLICATE_ATTRIBUTE: &str = "PRANG-PARSE-007";
pub const PRANG_PARSE_INVALID_EXPRESSION: &str = "PRANG-PARSE-008";

pub const PRANG_SCAN_SYNTAX: &str = "PRANG-SCAN-001";
pub const PRANG_SCAN_ANONYMOUS_CLASS: &str = "PRANG-SCAN-002";

pub const PRANG_DIRECTIVE_NO_EXPRESSION: &str = "PRANG-DIRECTIVE-001";
pub const PRANG_DIRECTIVE_ELSE_WITHOUT_IF: &str = "PRANG-DIRECTIVE-002";
pub const PRANG_DIRECTIVE_MALFORMED_FOR: &str = "PRANG-DIRECTIVE-003";

pub const PRANG_MODEL_NO_EXPRESSION: &str = "PRANG-MODEL-001";
pub const PRANG_MODEL_MALFORMED: &str = "PRANG-MODEL-002";
pub const PRANG_MODEL_ON_PROPS: &str = "PRANG-MODEL-003";
pub const PRANG_MODEL_ON_SCOPE_VARIABLE: &str = "PRANG-MODEL-004";
pub const PRANG_MODEL_ARG_ON_ELEMENT: &str = "PRANG-MODEL-005";
pub const PRANG_MODEL_ON_FILE_INPUT: &str = "PRANG-MODEL-006";
pub const PRANG_MODEL_UNNECESSARY_VALUE: &str = "PRANG-MODEL-007";
pub const PRANG_MODEL_ON_INVALID_ELEMENT: &str = "PRANG-MODEL-008";

pub const PRANG_STYLE_COMPILE: &str = "PRANG-STYLE-001";

pub const PRANG_INTERNAL_EDIT_CONFLICT: &str = "PRANG-INTERNAL-001";

pub const PRANG_W_UNRESOLVED_FILTER: &str = "PRANG-W-001";
pub const PRANG_W_UNRESOLVED_IMPORT: &str = "PRANG-W-002";
pub const PRANG_W_UNRESOLVED_TEMPLATE: &str = "PRANG-W-003";
pub const PRANG_W_UNRESOLVED_STYLE: &str = "PRANG-W-004";
pub const PRANG_W_SCRIPT_RECOVERED: &str = "PRANG-W-005";

/// One line explanation attached as the first hint of every diagnostic.
pub fn describe(code: &str) -> &'static str {
    match code {
        PRANG_PARSE_UNCLOSED_TAG => "Every non-void element needs a matching end tag.",
        PRANG_PARSE_MISMATCHED_END_TAG => "End tags must close the innermost open element.",
        PRANG_PARSE_UNTERMINATED_INTERPOLATION => "Interpolations are closed with `}}`.",
        PRANG_PARSE_UNTERMINATED_ATTRIBUTE => "Quoted attribute values need a closing quote and dynamic arguments a closing `]`.",
        PRANG_PARSE_UNTERMINATED_COMMENT => "Comments are closed with `-->`.",
        PRANG_PARSE_UNEXPECTED_EOF => "The template ended inside a tag.",
        PRANG_PARSE_DUPLICATE_ATTRIBUTE => "An attribute may appear only once per element.",
        PRANG_PARSE_INVALID_EXPRESSION => "Template expressions must be valid JavaScript expressions.",
        PRANG_SCAN_SYNTAX => "The component source could not be parsed.",
        PRANG_SCAN_ANONYMOUS_CLASS => "Decorated classes are registered by name and must have one.",
        PRANG_DIRECTIVE_NO_EXPRESSION => "This directive requires an expression.",
        PRANG_DIRECTIVE_ELSE_WITHOUT_IF => "v-else/v-else-if must directly follow a v-if or v-else-if element.",
        PRANG_DIRECTIVE_MALFORMED_FOR => "v-for expects `item in list` or `(item, index) in list`.",
        PRANG_MODEL_NO_EXPRESSION => "v-model requires a bound expression.",
        PRANG_MODEL_MALFORMED => "v-model value must be an assignable member expression or identifier.",
        PRANG_MODEL_ON_PROPS => "Inputs are read-only; use model() for two-way bindings.",
        PRANG_MODEL_ON_SCOPE_VARIABLE => "v-model cannot bind to a v-for or v-slot scope variable.",
        PRANG_MODEL_ARG_ON_ELEMENT => "v-model arguments are only supported on components.",
        PRANG_MODEL_ON_FILE_INPUT => "File inputs are read-only; use a change listener instead.",
        PRANG_MODEL_UNNECESSARY_VALUE => "v-model already binds value; remove the static value attribute.",
        PRANG_MODEL_ON_INVALID_ELEMENT => "v-model works on input, select, textarea and components.",
        PRANG_STYLE_COMPILE => "The style compiler rejected this stylesheet.",
        PRANG_INTERNAL_EDIT_CONFLICT => "Two source edits overlapped; this is a compiler bug.",
        PRANG_W_UNRESOLVED_FILTER => "The pipe will be looked up in the global registry at render time.",
        PRANG_W_UNRESOLVED_IMPORT => "The import is not a known component or pipe and is ignored.",
        PRANG_W_UNRESOLVED_TEMPLATE => "The templateUrl could not be resolved.",
        PRANG_W_UNRESOLVED_STYLE => "The styleUrl could not be resolved.",
        PRANG_W_SCRIPT_RECOVERED => "The parser recovered from syntax errors in this file.",
        _ => "Unknown diagnostic.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER ERROR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("[{code}] {message} ({file}:{line}:{column})")]
pub struct CompilerError {
    pub code: String,
    pub severity: Severity,
    pub message: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub offset: u32,
    pub context: Option<String>,
    pub hints: Vec<String>,
}

impl CompilerError {
    pub fn new(code: &str, message: impl Into<String>, file: &str, line: u32, column: u32) -> Self {
        CompilerError {
            code: code.to_string(),
            severity: Severity::Error,
            message: message.into(),
            file: file.to_string(),
            line,
            column,
            offset: 0,
            context: None,
            hints: vec![describe(code).to_string()],
        }
    }

    /// Error positioned at a template or script location.
    pub fn at(code: &str, message: impl Into<String>, loc: &SourceLocation, file: &str) -> Self {
        let mut err = Self::new(code, message, file, loc.start.line, loc.start.column);
        err.offset = loc.start.offset;
        err.context = Some(loc.source.clone()).filter(|s| !s.is_empty());
        err
    }

    pub fn warning(code: &str, message: impl Into<String>, file: &str, line: u32, column: u32) -> Self {
        Self::new(code, message, file, line, column).into_warning()
    }

    pub fn into_warning(mut self) -> Self {
        self.severity = Severity::Warning;
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }

    /// Shift the reported position by the location the snippet was embedded at.
    pub fn relocate(mut self, file: &str, base_line: u32, base_column: u32) -> Self {
        if self.line <= 1 {
            self.column += base_column.saturating_sub(1);
        }
        self.line += base_line.saturating_sub(1);
        self.file = file.to_string();
        self
    }
}

pub type CompileResult<T> = Result<T, CompilerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code_and_position() {
        let err = CompilerError::new(PRANG_MODEL_ON_FILE_INPUT, "bad", "a.html", 3, 7);
        assert_eq!(err.to_string(), "[PRANG-MODEL-006] bad (a.html:3:7)");
        assert_eq!(err.hints[0], describe(PRANG_MODEL_ON_FILE_INPUT));
    }

    #[test]
    fn relocate_shifts_first_line_columns_only() {
        let first = CompilerError::new(PRANG_STYLE_COMPILE, "x", "", 1, 4).relocate("c.ts", 10, 21);
        assert_eq!((first.line, first.column), (10, 24));

        let later = CompilerError::new(PRANG_STYLE_COMPILE, "x", "", 3, 4).relocate("c.ts", 10, 21);
        assert_eq!((later.line, later.column), (12, 4));
        assert_eq!(later.file, "c.ts");
    }
}
