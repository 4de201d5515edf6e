//! Class/decorator scanner.
//!
//! Turns one script file into `ScopeId -> ClassMeta` entries without running it.
//! Component and module imports are resolved through the host and scanned
//! recursively; the caller-owned `visited` map (file to source digest) stops
//! re-entrant scans on circular imports and repeated scans of unchanged text. Entries for a file are written in one step after its
//! scan succeeds.

use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use oxc_span::Span;
use serde::Serialize;

use crate::ast::SourceLocation;
use crate::casing::camel_case;
use crate::diagnostics::{
    CompileResult, CompilerError, PRANG_SCAN_ANONYMOUS_CLASS, PRANG_W_SCRIPT_RECOVERED, PRANG_W_UNRESOLVED_IMPORT,
    PRANG_W_UNRESOLVED_STYLE, PRANG_W_UNRESOLVED_TEMPLATE,
};
use crate::meta::{
    BindingKind, BindingMetadata, ClassMeta, ClassType, ComponentMeta, FieldBinding, FieldRole, ImportBinding,
    ModuleMeta, PipeMeta, ScopeId, StyleRef, TemplateRef, DEFAULT_EXPORT, NAMESPACE_EXPORT,
};
use crate::pipeline::ModuleHost;
use crate::registry::MetadataRegistry;
use crate::script::{
    analyze_script, ClassSite, DecoratorSite, ListItem, MemberKind, PropertyValue, ScriptModule,
};

/// Calls whose result is a signal.
const SIGNAL_CONSTRUCTORS: &[&str] = &["signal", "input", "model", "computed", "viewChild"];
/// Calls whose result is a plain reactive ref.
const REF_CONSTRUCTORS: &[&str] = &["ref", "shallowRef"];

#[derive(Debug, Clone, Copy)]
pub struct ScanOptions<'a> {
    pub framework_module: &'a str,
    pub runtime_module: &'a str,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanOutcome {
    pub entries: Vec<(ScopeId, ClassMeta)>,
    pub warnings: Vec<CompilerError>,
}

pub struct Scanner<'a> {
    registry: &'a dyn MetadataRegistry,
    host: &'a dyn ModuleHost,
    options: ScanOptions<'a>,
}

/// A decorated class of the file being scanned, known before its metadata is built.
struct LocalClass {
    name: String,
    scope_id: ScopeId,
    kind: ClassType,
}

/// Per-file state threaded through the handlers.
struct FileScan<'s> {
    file: &'s str,
    source: &'s str,
    module: ScriptModule,
    locals: Vec<LocalClass>,
    warnings: Vec<CompilerError>,
}

impl FileScan<'_> {
    fn location(&self, span: Span) -> SourceLocation {
        SourceLocation::from_offsets(self.source, span.start as usize, span.end as usize)
    }

    fn warn(&mut self, code: &str, message: String, span: Span) {
        let loc = self.location(span);
        self.warnings
            .push(CompilerError::at(code, message, &loc, self.file).into_warning());
    }
}

impl<'a> Scanner<'a> {
    pub fn new(registry: &'a dyn MetadataRegistry, host: &'a dyn ModuleHost, options: ScanOptions<'a>) -> Self {
        Scanner {
            registry,
            host,
            options,
        }
    }

    /// Scans `source` as `file` and writes its entries to the registry.
    ///
    /// A file already in `visited` with the same source digest is not scanned
    /// again; its current registry entries are returned instead. Different
    /// text for a visited file replaces its entries.
    pub fn scan_file(&self, file: &str, source: &str, visited: &mut IndexMap<String, String>) -> CompileResult<ScanOutcome> {
        let digest = source_digest(source);
        if visited.get(file) == Some(&digest) {
            tracing::trace!(file, "scan short-circuited");
            return Ok(ScanOutcome {
                entries: self.registry.entries_for_file(file),
                warnings: Vec::new(),
            });
        }
        if visited.contains_key(file) {
            tracing::debug!(file, "source changed since last scan");
        }
        visited.insert(file.to_string(), digest);

        let result = self.scan_uncached(file, source, visited);
        if result.is_err() {
            visited.shift_remove(file);
        }
        result
    }

    fn scan_uncached(&self, file: &str, source: &str, visited: &mut IndexMap<String, String>) -> CompileResult<ScanOutcome> {
        let module = analyze_script(file, source, self.options.framework_module)?;
        let mut scan = FileScan {
            file,
            source,
            module,
            locals: Vec::new(),
            warnings: Vec::new(),
        };
        if let Some(first) = scan.module.recovered.first() {
            scan.warnings.push(CompilerError::warning(
                PRANG_W_SCRIPT_RECOVERED,
                format!("recovered from syntax error: {first}"),
                file,
                1,
                1,
            ));
        }

        for class in &scan.module.classes {
            let Some(decorator) = &class.decorator else {
                continue;
            };
            let Some(name) = &class.name else {
                let loc = scan.location(class.span);
                return Err(CompilerError::at(
                    PRANG_SCAN_ANONYMOUS_CLASS,
                    format!("@{:?} requires the class to have a name", decorator.kind),
                    &loc,
                    file,
                ));
            };
            scan.locals.push(LocalClass {
                name: name.clone(),
                scope_id: ScopeId::derive(file, class.index),
                kind: decorator.kind,
            });
        }

        let mut entries = Vec::new();
        let classes = scan.module.classes.clone();
        for class in &classes {
            let (Some(decorator), Some(name)) = (&class.decorator, &class.name) else {
                continue;
            };
            let scope_id = ScopeId::derive(file, class.index);
            let meta = match decorator.kind {
                ClassType::Component => {
                    ClassMeta::Component(self.component_meta(&mut scan, class, name, decorator, visited))
                }
                ClassType::Pipe => ClassMeta::Pipe(pipe_meta(file, class, name, decorator)),
                ClassType::Module => ClassMeta::Module(ModuleMeta {
                    source_id: file.to_string(),
                    class_name: name.clone(),
                    imports: self.resolve_imports(&mut scan, decorator, visited),
                    default_export: class.default_export,
                }),
            };
            tracing::debug!(file, scope_id = %scope_id, class = %name, kind = ?decorator.kind, "class scanned");
            entries.push((scope_id, meta));
        }

        self.registry.replace_file(file, entries.clone());
        Ok(ScanOutcome {
            entries,
            warnings: scan.warnings,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // COMPONENT
    // ═══════════════════════════════════════════════════════════════════════════

    fn component_meta(
        &self,
        scan: &mut FileScan<'_>,
        class: &ClassSite,
        name: &str,
        decorator: &DecoratorSite,
        visited: &mut IndexMap<String, String>,
    ) -> ComponentMeta {
        let (bindings, fields) = class_bindings(class, &scan.module, self.options);
        let mut meta = ComponentMeta {
            source_id: scan.file.to_string(),
            class_name: name.to_string(),
            selectors: Vec::new(),
            template: None,
            inline_template: false,
            styles: Vec::new(),
            imports: Vec::new(),
            bindings,
            fields,
            default_export: class.default_export,
        };

        for prop in &decorator.properties {
            match (prop.key.as_str(), &prop.value) {
                ("selector", PropertyValue::Text { value, .. }) => meta.selectors.push(value.clone()),
                ("templateUrl", PropertyValue::Text { value, span }) => {
                    match self.host.resolve(value, scan.file) {
                        Some(resolved) => {
                            meta.template = Some(TemplateRef {
                                location: scan.location(*span),
                                source: resolved,
                            });
                            meta.inline_template = false;
                        }
                        None => scan.warn(
                            PRANG_W_UNRESOLVED_TEMPLATE,
                            format!("template `{value}` could not be resolved"),
                            *span,
                        ),
                    }
                }
                ("template", PropertyValue::Text { value, span }) => {
                    if value.is_empty() {
                        continue;
                    }
                    meta.template = Some(TemplateRef {
                        location: scan.location(*span),
                        source: value.clone(),
                    });
                    meta.inline_template = true;
                }
                ("imports", PropertyValue::List(_)) => {
                    meta.imports = self.resolve_imports(scan, decorator, visited);
                }
                ("styleUrls", PropertyValue::List(items)) => {
                    for item in items {
                        let ListItem::Text { value, span } = item else {
                            continue;
                        };
                        match self.host.resolve(value, scan.file) {
                            Some(resolved) => meta.styles.push(StyleRef {
                                location: scan.location(*span),
                                source: resolved,
                                external: true,
                            }),
                            None => scan.warn(
                                PRANG_W_UNRESOLVED_STYLE,
                                format!("stylesheet `{value}` could not be resolved"),
                                *span,
                            ),
                        }
                    }
                }
                ("styles", PropertyValue::Text { value, span }) => meta.styles.push(StyleRef {
                    location: scan.location(*span),
                    source: value.clone(),
                    external: false,
                }),
                ("styles", PropertyValue::List(items)) => {
                    for item in items {
                        if let ListItem::Text { value, span } = item {
                            meta.styles.push(StyleRef {
                                location: scan.location(*span),
                                source: value.clone(),
                                external: false,
                            });
                        }
                    }
                }
                _ => {}
            }
        }
        meta
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // IMPORTS
    // ═══════════════════════════════════════════════════════════════════════════

    fn resolve_imports(
        &self,
        scan: &mut FileScan<'_>,
        decorator: &DecoratorSite,
        visited: &mut IndexMap<String, String>,
    ) -> Vec<ImportBinding> {
        let identifiers: Vec<(String, Span)> = decorator
            .properties
            .iter()
            .filter(|prop| prop.key == "imports")
            .filter_map(|prop| match &prop.value {
                PropertyValue::List(items) => Some(items),
                _ => None,
            })
            .flatten()
            .filter_map(|item| match item {
                ListItem::Identifier { name, span } => Some((name.clone(), *span)),
                _ => None,
            })
            .collect();

        identifiers
            .into_iter()
            .filter_map(|(local, span)| self.resolve_import(scan, &local, span, visited))
            .collect()
    }

    fn resolve_import(
        &self,
        scan: &mut FileScan<'_>,
        local: &str,
        span: Span,
        visited: &mut IndexMap<String, String>,
    ) -> Option<ImportBinding> {
        if let Some(class) = scan.locals.iter().find(|class| class.name == local) {
            let mut binding = ImportBinding::new(local, local, scan.file);
            binding.resolved_file = Some(scan.file.to_string());
            binding.resolved_type = Some(class.kind);
            binding.resolved_scope = Some(class.scope_id.clone());
            return Some(binding);
        }

        let Some(mut binding) = scan
            .module
            .imports
            .iter()
            .find(|binding| !binding.is_type && binding.local_name == local)
            .cloned()
        else {
            scan.warn(
                PRANG_W_UNRESOLVED_IMPORT,
                format!("`{local}` is neither imported nor declared in this file"),
                span,
            );
            return None;
        };

        let Some(resolved) = self.host.resolve(&binding.source, scan.file) else {
            scan.warn(
                PRANG_W_UNRESOLVED_IMPORT,
                format!("module `{}` could not be resolved", binding.source),
                span,
            );
            return Some(binding);
        };
        binding.resolved_file = Some(resolved.clone());

        if !visited.contains_key(&resolved) {
            if let Some(text) = self.host.load(&resolved) {
                match self.scan_file(&resolved, &text, visited) {
                    Ok(outcome) => scan.warnings.extend(outcome.warnings),
                    Err(err) => scan.warnings.push(err.into_warning()),
                }
            }
        }

        let entries = self.registry.entries_for_file(&resolved);
        match pick_export(&entries, &binding.imported_name) {
            Some((scope_id, meta)) => {
                binding.resolved_type = Some(meta.class_type());
                binding.resolved_scope = Some(scope_id.clone());
            }
            None => scan.warn(
                PRANG_W_UNRESOLVED_IMPORT,
                format!("`{local}` from `{}` is not a component, pipe or module", binding.source),
                span,
            ),
        }
        Some(binding)
    }
}

/// The entry an import of `imported` refers to: the class with that name, the
/// default-exported class, or the first decorated class of the file.
fn source_digest(source: &str) -> String {
    format!("{:x}", Sha256::digest(source.as_bytes()))
}

fn pick_export<'e>(entries: &'e [(ScopeId, ClassMeta)], imported: &str) -> Option<&'e (ScopeId, ClassMeta)> {
    let exact = match imported {
        NAMESPACE_EXPORT => None,
        DEFAULT_EXPORT => entries.iter().find(|(_, meta)| meta.is_default_export()),
        name => entries.iter().find(|(_, meta)| meta.class_name() == name),
    };
    exact.or_else(|| entries.first())
}

fn pipe_meta(file: &str, class: &ClassSite, name: &str, decorator: &DecoratorSite) -> PipeMeta {
    let explicit = decorator.properties.iter().find_map(|prop| match (&*prop.key, &prop.value) {
        ("name", PropertyValue::Text { value, .. }) if !value.is_empty() => Some(value.clone()),
        _ => None,
    });
    PipeMeta {
        source_id: file.to_string(),
        class_name: name.to_string(),
        name: explicit.unwrap_or_else(|| camel_case(name)),
        default_export: class.default_export,
    }
}

/// Binding kinds of the public instance members, plus input/model/output roles.
fn class_bindings(
    class: &ClassSite,
    module: &ScriptModule,
    options: ScanOptions<'_>,
) -> (BindingMetadata, Vec<FieldBinding>) {
    let framework = |names: &[&str]| -> Vec<String> {
        names
            .iter()
            .filter_map(|name| module.local_for(options.framework_module, name))
            .map(str::to_string)
            .collect()
    };
    let signals = framework(SIGNAL_CONSTRUCTORS);
    let mut refs = framework(REF_CONSTRUCTORS);
    refs.extend(
        REF_CONSTRUCTORS
            .iter()
            .filter_map(|name| module.local_for(options.runtime_module, name))
            .map(str::to_string),
    );
    let role_of = |callee: &str| -> Option<FieldRole> {
        [("input", FieldRole::Input), ("model", FieldRole::Model), ("output", FieldRole::Output)]
            .into_iter()
            .find(|(name, _)| module.local_for(options.framework_module, name) == Some(callee))
            .map(|(_, role)| role)
    };

    let mut bindings = BindingMetadata::new();
    let mut fields = Vec::new();
    for member in &class.members {
        if member.is_static || member.is_private {
            continue;
        }
        let kind = match member.kind {
            MemberKind::Constructor => continue,
            MemberKind::Method | MemberKind::Accessor => BindingKind::Constant,
            MemberKind::Property => {
                let callee = member.call.as_ref().map(|call| call.callee.as_str());
                if let Some(role) = callee.and_then(role_of) {
                    fields.push(FieldBinding {
                        name: member.name.clone(),
                        role,
                    });
                }
                match callee {
                    Some(c) if signals.iter().any(|s| s == c) => BindingKind::Signal,
                    Some(c) if refs.iter().any(|r| r == c) => BindingKind::ReactiveRef,
                    _ => BindingKind::Constant,
                }
            }
        };
        bindings.insert(member.name.clone(), kind);
    }
    (bindings, fields)
}
