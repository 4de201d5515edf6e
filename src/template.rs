//! Template compilation: parse, transform, generate.
//!
//! The result is either a module exporting `render` (external templates and
//! dev-mode inline templates) or an inline render arrow plus its helper import
//! (build mode). Module output carries the analyzed bindings as a trailing
//! comment and, when hot reload is on, an accept handler that swaps the render
//! function of the component registered under the scope id.

use indexmap::IndexSet;
use serde::Serialize;

use crate::ast::{RuntimeHelper, SourceLocation};
use crate::codegen::{generate, CodegenMode, CodegenOptions};
use crate::diagnostics::{CompileResult, CompilerError};
use crate::meta::{BindingMetadata, FieldBinding, ScopeId};
use crate::parse::{parse_template, ParseOptions};
use crate::registry::TemplateImports;
use crate::sourcemap::SourceMap;
use crate::transform::{transform_root, TransformOptions};

pub struct TemplateOptions<'a> {
    /// File the template text belongs to; the class file for inline templates.
    pub filename: &'a str,
    pub scope_id: &'a ScopeId,
    pub mode: CodegenMode,
    pub hmr: bool,
    pub runtime_module: &'a str,
    pub source_map: bool,
    pub bindings: &'a BindingMetadata,
    pub fields: &'a [FieldBinding],
    pub imports: &'a TemplateImports,
    /// Location of the template literal in the class file, for inline templates.
    pub embedded_at: Option<&'a SourceLocation>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledTemplate {
    pub code: String,
    pub preamble: String,
    pub map: Option<SourceMap>,
    /// Runtime helpers the render code refers to through `_name` aliases.
    pub helpers: IndexSet<RuntimeHelper>,
    pub warnings: Vec<CompilerError>,
}

pub fn compile_template(source: &str, options: &TemplateOptions<'_>) -> CompileResult<CompiledTemplate> {
    let relocate = |err: CompilerError| match options.embedded_at {
        // Column + 1 skips the opening quote of the literal.
        Some(loc) => err.relocate(options.filename, loc.start.line, loc.start.column + 1),
        None => err,
    };

    let parse_options = ParseOptions {
        filename: options.filename.to_string(),
        bindings: options.bindings.clone(),
    };
    let mut root = parse_template(source, &parse_options).map_err(relocate)?;
    let warnings = transform_root(
        &mut root,
        &TransformOptions {
            filename: options.filename,
            imports: options.imports,
            fields: options.fields,
        },
    )
    .map_err(relocate)?;

    let generated = generate(
        &root,
        &CodegenOptions {
            mode: options.mode,
            runtime_module: options.runtime_module,
            source_map: options.source_map.then_some(options.filename),
        },
    );

    let mut code = generated.code;
    if options.mode == CodegenMode::Module {
        code.push_str(&bindings_comment(options.bindings));
        if options.hmr {
            code.push_str(&hmr_epilogue(options.scope_id));
        }
    }

    tracing::debug!(
        file = options.filename,
        scope_id = %options.scope_id,
        warnings = warnings.len(),
        "template compiled"
    );
    Ok(CompiledTemplate {
        code,
        preamble: generated.preamble,
        map: generated.map,
        helpers: generated.helpers,
        warnings: warnings.into_iter().map(relocate).collect(),
    })
}

/// Trailing block comment listing the analyzed bindings, one JSON line per row.
pub fn bindings_comment(bindings: &BindingMetadata) -> String {
    if bindings.is_empty() {
        return String::new();
    }
    let json = serde_json::to_string_pretty(bindings).unwrap_or_default();
    let body: Vec<String> = json
        .lines()
        .map(|line| if line.is_empty() { String::new() } else { format!(" * {line}") })
        .collect();
    format!("\n\n/**\n * Analyzed bindings:\n{}\n */\n", body.join("\n"))
}

/// Re-registers the render function of `scope_id` when this module is replaced.
pub fn hmr_epilogue(scope_id: &ScopeId) -> String {
    let id = serde_json::to_string(scope_id.as_str()).unwrap_or_default();
    format!(
        "\nimport.meta.hot.on('file-changed', ({{ file }}) => {{\n  __VUE_HMR_RUNTIME__.CHANGED_FILE = file\n}});\n\
         import.meta.hot.accept(mod => {{\n  if (!mod) return;\n  const {{ render: updated }} = mod;\n  __VUE_HMR_RUNTIME__.rerender({id}, updated);\n}})\n"
    )
}
