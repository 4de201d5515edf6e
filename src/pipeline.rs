//! Module pipeline adapter.
//!
//! The host build tool drives the compiler through `resolve_id`, `load` and
//! `transform`, and reports edits through `on_file_changed`. Plain script
//! files are scanned and rewritten; virtual ids (`?prang&type=...`) carry the
//! scope id of the class whose template or stylesheet they stand for.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use crate::codegen::CodegenMode;
use crate::component::{rewrite_module, RewriteOptions};
use crate::diagnostics::{CompileResult, CompilerError};
use crate::discovery::{discover_sources, is_dependency, is_script_file};
use crate::meta::{ClassMeta, ComponentMeta, ScopeId};
use crate::registry::{template_imports, InMemoryRegistry, MetadataRegistry};
use crate::scanner::{ScanOptions, ScanOutcome, Scanner};
use crate::sourcemap::SourceMap;
use crate::style::{compile_style, PassthroughStyles, StyleCompiler, StyleOptions};
use crate::template::{compile_template, TemplateOptions};
use crate::virtual_id::{parse_virtual_id, VirtualId, VirtualKind};

// ═══════════════════════════════════════════════════════════════════════════════
// HOST
// ═══════════════════════════════════════════════════════════════════════════════

/// Capabilities the host build tool lends the compiler.
pub trait ModuleHost {
    /// Resolves `specifier` as imported from `importer` to a file id.
    fn resolve(&self, specifier: &str, importer: &str) -> Option<String>;
    /// Source text of a file id.
    fn load(&self, id: &str) -> Option<String>;
    /// Reports a fatal diagnostic; the host stops building the current file.
    fn error(&self, error: &CompilerError);
    fn warn(&self, warning: &CompilerError);
}

// ═══════════════════════════════════════════════════════════════════════════════
// OPTIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BuildMode {
    #[default]
    Dev,
    Build,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompilerOptions {
    pub mode: BuildMode,
    /// Hot reload epilogues; ignored in build mode.
    pub hmr: bool,
    pub framework_module: String,
    pub runtime_module: String,
    pub source_map: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        CompilerOptions {
            mode: BuildMode::Dev,
            hmr: true,
            framework_module: "@prang/core".to_string(),
            runtime_module: "@prang/core/runtime".to_string(),
            source_map: true,
        }
    }
}

impl CompilerOptions {
    pub fn use_hmr(&self) -> bool {
        self.mode == BuildMode::Dev && self.hmr
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformOutput {
    pub code: String,
    pub map: Option<SourceMap>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER
// ═══════════════════════════════════════════════════════════════════════════════

pub struct Compiler {
    options: CompilerOptions,
    registry: Box<dyn MetadataRegistry>,
    styles: Box<dyn StyleCompiler>,
    /// Files scanned during this build; cleared per file by `on_file_changed`.
    visited: Mutex<IndexMap<String, String>>,
}

impl Compiler {
    pub fn new(options: CompilerOptions) -> Self {
        Self::with_registry(options, Box::new(InMemoryRegistry::new()))
    }

    pub fn with_registry(options: CompilerOptions, registry: Box<dyn MetadataRegistry>) -> Self {
        Compiler {
            options,
            registry,
            styles: Box::new(PassthroughStyles),
            visited: Mutex::new(IndexMap::new()),
        }
    }

    pub fn with_style_compiler(mut self, styles: Box<dyn StyleCompiler>) -> Self {
        self.styles = styles;
        self
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn registry(&self) -> &dyn MetadataRegistry {
        self.registry.as_ref()
    }

    fn scan_options(&self) -> ScanOptions<'_> {
        ScanOptions {
            framework_module: &self.options.framework_module,
            runtime_module: &self.options.runtime_module,
        }
    }

    /// Scans `file` unless this exact source was already scanned in this build.
    pub fn scan(&self, file: &str, source: &str, host: &dyn ModuleHost) -> CompileResult<ScanOutcome> {
        let scanner = Scanner::new(self.registry.as_ref(), host, self.scan_options());
        let mut visited = self.visited.lock().unwrap_or_else(PoisonError::into_inner);
        let outcome = scanner.scan_file(file, source, &mut visited)?;
        for warning in &outcome.warnings {
            report_warning(host, warning);
        }
        Ok(outcome)
    }

    /// Claims virtual ids carrying the compiler marker.
    pub fn resolve_id(&self, id: &str) -> Option<String> {
        match parse_virtual_id(id) {
            Ok(virtual_id) if virtual_id.is_virtual() => {
                tracing::trace!(id, "virtual id claimed");
                Some(id.to_string())
            }
            _ => None,
        }
    }

    /// Serves the text of inline templates and styles from registry metadata.
    pub fn load(&self, id: &str, host: &dyn ModuleHost) -> CompileResult<Option<String>> {
        let Ok(virtual_id) = parse_virtual_id(id) else {
            return Ok(None);
        };
        if !virtual_id.is_virtual() {
            return Ok(None);
        }
        let kind = virtual_id.query.kind;
        if !matches!(kind, Some(VirtualKind::InlineTemplate) | Some(VirtualKind::InlineStyle)) {
            return Ok(None);
        }
        let Some(meta) = self.component_for(&virtual_id, host)? else {
            return Ok(None);
        };
        let text = match kind {
            Some(VirtualKind::InlineTemplate) => meta.template.map(|template| template.source),
            _ => virtual_id
                .query
                .style_index
                .and_then(|index| meta.styles.into_iter().nth(index))
                .map(|style| style.source),
        };
        tracing::debug!(id, found = text.is_some(), "virtual module loaded");
        Ok(text)
    }

    /// Compiles `code` according to `id`. Fatal diagnostics are also reported
    /// through `host.error`, warnings through `host.warn`.
    pub fn transform(&self, code: &str, id: &str, host: &dyn ModuleHost) -> CompileResult<Option<TransformOutput>> {
        self.transform_inner(code, id, host).map_err(|err| {
            tracing::debug!(id, code = %err.code, "transform failed");
            host.error(&err);
            err
        })
    }

    fn transform_inner(&self, code: &str, id: &str, host: &dyn ModuleHost) -> CompileResult<Option<TransformOutput>> {
        let virtual_id = match parse_virtual_id(id) {
            Ok(virtual_id) => virtual_id,
            Err(err) => {
                tracing::trace!(id, error = %err, "not a compiler id");
                return Ok(None);
            }
        };
        if !virtual_id.is_virtual() {
            return self.transform_script(code, &virtual_id.path, host);
        }

        let (Some(kind), Some(scope)) = (virtual_id.query.kind, virtual_id.query.scope_id.as_deref()) else {
            return Ok(None);
        };
        let scope_id = ScopeId::from_raw(scope);
        let Some(meta) = self.component_for(&virtual_id, host)? else {
            tracing::debug!(id, scope_id = %scope_id, "metadata not yet available");
            return Ok(None);
        };
        tracing::debug!(id, kind = kind.as_str(), scope_id = %scope_id, "virtual module dispatched");

        match kind {
            VirtualKind::Template | VirtualKind::InlineTemplate => {
                let inline = kind == VirtualKind::InlineTemplate;
                let imports = template_imports(&meta, self.registry.as_ref());
                let embedded_at = meta
                    .template
                    .as_ref()
                    .filter(|_| inline)
                    .map(|template| &template.location);
                let compiled = compile_template(
                    code,
                    &TemplateOptions {
                        filename: &virtual_id.path,
                        scope_id: &scope_id,
                        mode: CodegenMode::Module,
                        hmr: self.options.use_hmr(),
                        runtime_module: &self.options.runtime_module,
                        source_map: self.options.source_map,
                        bindings: &meta.bindings,
                        fields: &meta.fields,
                        imports: &imports,
                        embedded_at,
                    },
                )?;
                for warning in &compiled.warnings {
                    report_warning(host, warning);
                }
                Ok(Some(TransformOutput {
                    code: compiled.code,
                    map: compiled.map,
                }))
            }
            VirtualKind::Style | VirtualKind::InlineStyle => {
                let embedded_at = match (kind, virtual_id.query.style_index) {
                    (VirtualKind::InlineStyle, Some(index)) => meta.styles.get(index).map(|style| &style.location),
                    _ => None,
                };
                let output = compile_style(
                    self.styles.as_ref(),
                    code,
                    &StyleOptions {
                        filename: &virtual_id.path,
                        scope_id: &scope_id,
                        is_production: self.options.mode == BuildMode::Build,
                        embedded_at,
                    },
                )?;
                Ok(Some(TransformOutput {
                    code: output.code,
                    map: output.map,
                }))
            }
        }
    }

    fn transform_script(&self, code: &str, file: &str, host: &dyn ModuleHost) -> CompileResult<Option<TransformOutput>> {
        if is_dependency(file)
            || !is_script_file(file)
            || !code.contains(self.options.framework_module.as_str())
            || !code.contains("class")
        {
            return Ok(None);
        }

        self.scan(file, code, host)?;
        let rewritten = rewrite_module(
            file,
            code,
            self.registry.as_ref(),
            host,
            &RewriteOptions {
                mode: self.options.mode,
                hmr: self.options.hmr,
                framework_module: &self.options.framework_module,
                runtime_module: &self.options.runtime_module,
                source_map: self.options.source_map,
            },
        )?;
        Ok(rewritten.map(|module| {
            for warning in &module.warnings {
                report_warning(host, warning);
            }
            TransformOutput {
                code: module.code,
                map: module.map,
            }
        }))
    }

    /// Component metadata for the scope id of a virtual id. For inline ids the
    /// owning class file is scanned once when the metadata is missing.
    fn component_for(&self, virtual_id: &VirtualId, host: &dyn ModuleHost) -> CompileResult<Option<ComponentMeta>> {
        let Some(scope) = virtual_id.query.scope_id.as_deref() else {
            return Ok(None);
        };
        let scope_id = ScopeId::from_raw(scope);
        if let Some(meta) = self.registry.get(&scope_id) {
            return Ok(meta.as_component().cloned());
        }

        let inline = matches!(
            virtual_id.query.kind,
            Some(VirtualKind::InlineTemplate) | Some(VirtualKind::InlineStyle)
        );
        if !inline {
            return Ok(None);
        }
        let Some(source) = host.load(&virtual_id.path) else {
            return Ok(None);
        };
        self.scan(&virtual_id.path, &source, host)?;
        Ok(self
            .registry
            .get(&scope_id)
            .and_then(|meta| meta.as_component().cloned()))
    }

    /// Forgets that `file` was scanned. Returns the scope ids of components
    /// whose external template or stylesheet is `file`.
    pub fn on_file_changed(&self, file: &str) -> Vec<ScopeId> {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .shift_remove(file);

        let owners: Vec<ScopeId> = self
            .registry
            .entries()
            .into_iter()
            .filter(|(_, meta)| match meta {
                ClassMeta::Component(component) => {
                    let template = !component.inline_template
                        && component.template.as_ref().map_or(false, |t| t.source == file);
                    let style = component.styles.iter().any(|s| s.external && s.source == file);
                    template || style
                }
                _ => false,
            })
            .map(|(id, _)| id)
            .collect();
        tracing::debug!(file, owners = owners.len(), "file changed");
        owners
    }

    /// Scans every framework script below `root`. Files that fail to scan are
    /// reported as warnings. Returns the number of files scanned.
    pub fn prescan(&self, root: &Path, host: &dyn ModuleHost) -> usize {
        let mut scanned = 0;
        for (file, source) in discover_sources(root, &self.options.framework_module) {
            match self.scan(&file, &source, host) {
                Ok(_) => scanned += 1,
                Err(err) => report_warning(host, &err.into_warning()),
            }
        }
        tracing::debug!(root = %root.display(), scanned, "prescan finished");
        scanned
    }
}

fn report_warning(host: &dyn ModuleHost, warning: &CompilerError) {
    tracing::warn!(file = %warning.file, code = %warning.code, "{}", warning.message);
    host.warn(warning);
}
