//! Node bindings.
//!
//! Options and results cross the boundary as JSON strings. Diagnostics are
//! thrown as errors whose reason is the serialized `CompilerError`.

use indexmap::IndexMap;
use napi::bindgen_prelude::*;
use napi_derive::napi;
use serde::Deserialize;
use std::path::Path;

use crate::codegen::CodegenMode;
use crate::diagnostics::CompilerError;
use crate::discovery::FileSystemHost;
use crate::meta::{BindingMetadata, FieldBinding, ScopeId};
use crate::pipeline::{Compiler, CompilerOptions};
use crate::registry::{InMemoryRegistry, TemplateImports};
use crate::scanner::{ScanOptions, Scanner};
use crate::template::{compile_template, TemplateOptions};
use crate::virtual_id::{format_virtual_id, parse_virtual_id, VirtualQuery};

fn to_napi(err: CompilerError) -> Error {
    Error::from_reason(serde_json::to_string(&err).unwrap_or(err.message))
}

fn invalid_json(err: serde_json::Error) -> Error {
    Error::new(Status::InvalidArg, format!("invalid options: {err}"))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::from_reason(e.to_string()))
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER
// ═══════════════════════════════════════════════════════════════════════════════

#[napi(js_name = "PrangCompiler")]
pub struct NativeCompiler {
    inner: Compiler,
}

#[napi]
impl NativeCompiler {
    #[napi(constructor)]
    pub fn new(options_json: Option<String>) -> Result<Self> {
        let options: CompilerOptions = match options_json {
            Some(json) => serde_json::from_str(&json).map_err(invalid_json)?,
            None => CompilerOptions::default(),
        };
        Ok(NativeCompiler {
            inner: Compiler::new(options),
        })
    }

    #[napi]
    pub fn resolve_id(&self, id: String) -> Option<String> {
        self.inner.resolve_id(&id)
    }

    #[napi]
    pub fn load(&self, id: String) -> Result<Option<String>> {
        self.inner.load(&id, &FileSystemHost).map_err(to_napi)
    }

    /// Returns the `{ code, map }` JSON, or nothing when the id is not ours.
    #[napi]
    pub fn transform(&self, code: String, id: String) -> Result<Option<String>> {
        match self.inner.transform(&code, &id, &FileSystemHost).map_err(to_napi)? {
            Some(output) => to_json(&output).map(Some),
            None => Ok(None),
        }
    }

    #[napi]
    pub fn on_file_changed(&self, file: String) -> Vec<String> {
        self.inner
            .on_file_changed(&file)
            .into_iter()
            .map(|id| id.as_str().to_string())
            .collect()
    }

    #[napi]
    pub fn prescan(&self, root: String) -> u32 {
        self.inner.prescan(Path::new(&root), &FileSystemHost) as u32
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STANDALONE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NativeTemplateOptions {
    filename: String,
    scope_id: String,
    #[serde(default)]
    mode: CodegenMode,
    #[serde(default)]
    hmr: bool,
    #[serde(default = "default_runtime")]
    runtime_module: String,
    #[serde(default)]
    source_map: bool,
    #[serde(default)]
    bindings: BindingMetadata,
    #[serde(default)]
    fields: Vec<FieldBinding>,
    #[serde(default)]
    components: IndexMap<String, String>,
    #[serde(default)]
    pipes: IndexMap<String, String>,
}

fn default_runtime() -> String {
    CompilerOptions::default().runtime_module
}

/// Compiles one template outside of any build. Returns the `CompiledTemplate` JSON.
#[napi]
pub fn compile_template_native(source: String, options_json: String) -> Result<String> {
    let options: NativeTemplateOptions = serde_json::from_str(&options_json).map_err(invalid_json)?;
    let scope_id = ScopeId::from_raw(options.scope_id);
    let imports = TemplateImports {
        components: options.components,
        pipes: options.pipes,
    };
    let compiled = compile_template(
        &source,
        &TemplateOptions {
            filename: &options.filename,
            scope_id: &scope_id,
            mode: options.mode,
            hmr: options.hmr,
            runtime_module: &options.runtime_module,
            source_map: options.source_map,
            bindings: &options.bindings,
            fields: &options.fields,
            imports: &imports,
            embedded_at: None,
        },
    )
    .map_err(to_napi)?;
    to_json(&compiled)
}

/// Scans one file, following its imports on disk. Returns the `ScanOutcome` JSON.
#[napi]
pub fn scan_source_native(file: String, source: String, options_json: Option<String>) -> Result<String> {
    let options: CompilerOptions = match options_json {
        Some(json) => serde_json::from_str(&json).map_err(invalid_json)?,
        None => CompilerOptions::default(),
    };
    let registry = InMemoryRegistry::new();
    let scanner = Scanner::new(
        &registry,
        &FileSystemHost,
        ScanOptions {
            framework_module: &options.framework_module,
            runtime_module: &options.runtime_module,
        },
    );
    let outcome = scanner
        .scan_file(&file, &source, &mut IndexMap::new())
        .map_err(to_napi)?;
    to_json(&outcome)
}

#[napi]
pub fn parse_virtual_id_native(id: String) -> Result<String> {
    let parsed = parse_virtual_id(&id).map_err(|e| Error::new(Status::InvalidArg, e.to_string()))?;
    to_json(&parsed)
}

#[napi]
pub fn format_virtual_id_native(path: String, query_json: String) -> Result<String> {
    let query: VirtualQuery = serde_json::from_str(&query_json).map_err(invalid_json)?;
    Ok(format_virtual_id(&path, &query))
}
