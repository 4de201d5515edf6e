//! Style compilation bridge.
//!
//! CSS scoping is done by an external compiler behind [`StyleCompiler`]. This
//! module only prepares the request and maps reported error positions from the
//! virtual stylesheet back to the file the style was written in.

use serde::{Deserialize, Serialize};

use crate::ast::SourceLocation;
use crate::diagnostics::{CompileResult, CompilerError, PRANG_STYLE_COMPILE};
use crate::meta::ScopeId;
use crate::sourcemap::SourceMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleRequest<'a> {
    pub source: &'a str,
    pub filename: &'a str,
    /// Scoping attribute, `data-v-<scopeId>`.
    pub id: String,
    pub scoped: bool,
    pub is_production: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleOutput {
    pub code: String,
    pub map: Option<SourceMap>,
}

/// Failure reported by a style compiler, positioned in the stylesheet text (1-based).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct StyleError {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

pub trait StyleCompiler {
    fn compile(&self, request: &StyleRequest<'_>) -> Result<StyleOutput, StyleError>;
}

/// Returns stylesheets unchanged. Used when the host brings no style compiler.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughStyles;

impl StyleCompiler for PassthroughStyles {
    fn compile(&self, request: &StyleRequest<'_>) -> Result<StyleOutput, StyleError> {
        Ok(StyleOutput {
            code: request.source.to_string(),
            map: None,
        })
    }
}

pub struct StyleOptions<'a> {
    /// File the stylesheet text belongs to; the class file for inline styles.
    pub filename: &'a str,
    pub scope_id: &'a ScopeId,
    pub is_production: bool,
    /// Location of the style literal in the class file, for inline styles.
    pub embedded_at: Option<&'a SourceLocation>,
}

pub fn compile_style(
    compiler: &dyn StyleCompiler,
    source: &str,
    options: &StyleOptions<'_>,
) -> CompileResult<StyleOutput> {
    let request = StyleRequest {
        source,
        filename: options.filename,
        id: options.scope_id.data_attribute(),
        scoped: true,
        is_production: options.is_production,
    };
    compiler.compile(&request).map_err(|err| {
        let located = CompilerError::new(
            PRANG_STYLE_COMPILE,
            err.message,
            options.filename,
            err.line.max(1),
            err.column.max(1),
        );
        let located = match options.embedded_at {
            Some(loc) => located.relocate(options.filename, loc.start.line, loc.start.column + 1),
            None => located,
        };
        tracing::debug!(file = options.filename, scope_id = %options.scope_id, "style compile failed");
        located
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Position;

    struct Failing;

    impl StyleCompiler for Failing {
        fn compile(&self, _request: &StyleRequest<'_>) -> Result<StyleOutput, StyleError> {
            Err(StyleError {
                message: "Unclosed block".to_string(),
                line: 2,
                column: 5,
            })
        }
    }

    struct Recording(std::cell::RefCell<Option<String>>);

    impl StyleCompiler for Recording {
        fn compile(&self, request: &StyleRequest<'_>) -> Result<StyleOutput, StyleError> {
            *self.0.borrow_mut() = Some(request.id.clone());
            PassthroughStyles.compile(request)
        }
    }

    fn options<'a>(scope_id: &'a ScopeId, embedded_at: Option<&'a SourceLocation>) -> StyleOptions<'a> {
        StyleOptions {
            filename: "/src/app.component.ts",
            scope_id,
            is_production: false,
            embedded_at,
        }
    }

    #[test]
    fn request_carries_the_scope_attribute() {
        let scope_id = ScopeId::from_raw("1a2b3c4d");
        let compiler = Recording(Default::default());
        let out = compile_style(&compiler, "p { color: red }", &options(&scope_id, None)).unwrap();
        assert_eq!(out.code, "p { color: red }");
        assert_eq!(compiler.0.borrow().as_deref(), Some("data-v-1a2b3c4d"));
    }

    #[test]
    fn external_errors_keep_their_position() {
        let scope_id = ScopeId::from_raw("1a2b3c4d");
        let err = compile_style(&Failing, "p {", &options(&scope_id, None)).unwrap_err();
        assert_eq!(err.code, PRANG_STYLE_COMPILE);
        assert_eq!((err.line, err.column), (2, 5));
    }

    #[test]
    fn inline_errors_map_to_the_decorator_literal() {
        let scope_id = ScopeId::from_raw("1a2b3c4d");
        let start = Position {
            offset: 200,
            line: 9,
            column: 14,
        };
        let loc = SourceLocation::new(start, start, "'p {'");
        let err = compile_style(&Failing, "p {", &options(&scope_id, Some(&loc))).unwrap_err();
        assert_eq!((err.line, err.column), (10, 5));
        assert_eq!(err.file, "/src/app.component.ts");
    }
}
