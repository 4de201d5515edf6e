//! Class rewriter.
//!
//! Splices a scanned component class into a runtime registration: the
//! framework decorator goes away, `input`/`model`/`output` calls learn their
//! field names, and a static initializer block attaches the options object
//! the runtime mounts. All changes are recorded in one [`EditList`] so the
//! result carries a source map back to the authored file.

use indexmap::IndexSet;

use crate::ast::RuntimeHelper;
use crate::casing::camelize;
use crate::codegen::{helper_import, js_string, CodegenMode};
use crate::diagnostics::{CompileResult, CompilerError, PRANG_W_UNRESOLVED_TEMPLATE};
use crate::edit::{EditError, EditList};
use crate::meta::{ClassMeta, ComponentMeta, ScopeId};
use crate::pipeline::{BuildMode, ModuleHost};
use crate::registry::{template_imports, MetadataRegistry, TemplateImports};
use crate::script::{analyze_script, ClassSite, MemberKind, ScriptModule};
use crate::sourcemap::SourceMap;
use crate::template::{compile_template, TemplateOptions};
use crate::virtual_id::VirtualId;

const CLASS_COMPONENT: &str = "CLASS_COMPONENT";
const WRAP_CLASS_COMPONENT: &str = "wrapClassComponent";
const ON_MOUNTED: &str = "onMounted";
const ON_BEFORE_UNMOUNT: &str = "onBeforeUnmount";

#[derive(Debug, Clone, Copy)]
pub struct RewriteOptions<'a> {
    pub mode: BuildMode,
    pub hmr: bool,
    pub framework_module: &'a str,
    pub runtime_module: &'a str,
    pub source_map: bool,
}

#[derive(Debug, Clone)]
pub struct RewrittenModule {
    pub code: String,
    pub map: Option<SourceMap>,
    pub warnings: Vec<CompilerError>,
}

/// Rewrites every scanned component class of `file`. Returns `None` when the
/// file has no component registered for it.
pub fn rewrite_module(
    file: &str,
    source: &str,
    registry: &dyn MetadataRegistry,
    host: &dyn ModuleHost,
    options: &RewriteOptions<'_>,
) -> CompileResult<Option<RewrittenModule>> {
    let module = analyze_script(file, source, options.framework_module)?;
    let mut rewriter = ClassRewriter {
        file,
        registry,
        host,
        options,
        module: &module,
        edits: EditList::new(),
        class_helpers: IndexSet::new(),
        render_helpers: IndexSet::new(),
        warnings: Vec::new(),
    };

    let mut rewritten = 0usize;
    for class in &module.classes {
        if class.decorator.is_none() {
            continue;
        }
        let scope_id = ScopeId::derive(file, class.index);
        let Some(ClassMeta::Component(meta)) = registry.get(&scope_id) else {
            continue;
        };
        rewriter.rewrite_component(class, &scope_id, &meta)?;
        rewritten += 1;
    }
    if rewritten == 0 {
        return Ok(None);
    }

    let ClassRewriter {
        mut edits,
        class_helpers,
        render_helpers,
        warnings,
        ..
    } = rewriter;
    if !render_helpers.is_empty() {
        edits.prepend(0, format!("{};\n", helper_import(&render_helpers, options.runtime_module)));
    }
    edits.prepend(0, class_helper_import(&class_helpers, options.runtime_module));

    let located = |err: EditError| {
        let mut err = CompilerError::from(err);
        err.file = file.to_string();
        err
    };
    let (code, map) = if options.source_map {
        let (code, map) = edits.apply_with_map(source, file).map_err(located)?;
        (code, Some(map))
    } else {
        (edits.apply(source).map_err(located)?, None)
    };

    tracing::debug!(file, classes = rewritten, edits = edits.len(), "component classes rewritten");
    Ok(Some(RewrittenModule { code, map, warnings }))
}

fn class_helper_import(helpers: &IndexSet<&'static str>, runtime_module: &str) -> String {
    let specifiers: Vec<String> = helpers.iter().map(|name| format!("{name} as _{name}")).collect();
    format!("import {{ {} }} from {};\n", specifiers.join(", "), js_string(runtime_module))
}

/// Prop and event names collected from compiled field calls.
#[derive(Default)]
struct FieldSchema {
    inputs: IndexSet<String>,
    models: IndexSet<String>,
    outputs: IndexSet<String>,
}

impl FieldSchema {
    fn props(&self) -> String {
        let mut entries: Vec<String> = self.inputs.iter().map(|name| format!("{}: {{}}", js_string(name))).collect();
        for model in &self.models {
            entries.push(format!("{}: {{}}", js_string(model)));
            entries.push(format!("{}: {{}}", js_string(&format!("{model}Modifiers"))));
        }
        object_literal(entries)
    }

    fn emits(&self) -> String {
        let mut entries: Vec<String> = self.outputs.iter().map(|name| js_string(name)).collect();
        entries.extend(self.models.iter().map(|model| js_string(&format!("update:{model}"))));
        if entries.is_empty() {
            "[]".to_string()
        } else {
            format!("[{}]", entries.join(", "))
        }
    }
}

fn object_literal(entries: Vec<String>) -> String {
    if entries.is_empty() {
        "{}".to_string()
    } else {
        format!("{{ {} }}", entries.join(", "))
    }
}

struct ClassRewriter<'r> {
    file: &'r str,
    registry: &'r dyn MetadataRegistry,
    host: &'r dyn ModuleHost,
    options: &'r RewriteOptions<'r>,
    module: &'r ScriptModule,
    edits: EditList,
    class_helpers: IndexSet<&'static str>,
    render_helpers: IndexSet<RuntimeHelper>,
    warnings: Vec<CompilerError>,
}

impl ClassRewriter<'_> {
    fn helper(&mut self, name: &'static str) -> String {
        self.class_helpers.insert(name);
        format!("_{name}")
    }

    fn rewrite_component(&mut self, class: &ClassSite, scope_id: &ScopeId, meta: &ComponentMeta) -> CompileResult<()> {
        let dev = self.options.mode == BuildMode::Dev;
        let hmr = dev && self.options.hmr;

        if let Some(decorator) = &class.decorator {
            self.edits.remove(decorator.span.start, decorator.span.end);
        }

        let imports = template_imports(meta, self.registry);
        let mut preamble = String::new();
        if dev {
            if let Some(template) = &meta.template {
                let path = if meta.inline_template { self.file } else { template.source.as_str() };
                let id = VirtualId::template(path, scope_id.as_str(), meta.inline_template);
                preamble.push_str(&format!(
                    "import {{ render as {} }} from {};\n",
                    scope_id.render_alias(),
                    js_string(&id.to_string())
                ));
            }
        }
        for (index, style) in meta.styles.iter().enumerate() {
            let id = if style.external {
                VirtualId::style(&style.source, scope_id.as_str(), None)
            } else {
                VirtualId::style(self.file, scope_id.as_str(), Some(index))
            };
            preamble.push_str(&format!("import {};\n", js_string(&id.to_string())));
        }
        if !preamble.is_empty() {
            self.edits.insert(class.statement_start, preamble);
        }

        let schema = self.compile_fields(class);
        let render = if dev {
            None
        } else {
            Some(self.inline_render(scope_id, meta, &imports)?)
        };

        let block = self.static_block(scope_id, meta, &schema, &imports, render.as_deref(), hmr);
        self.edits.insert(class.body_span.end.saturating_sub(1), block);

        if hmr {
            let export_name = if meta.default_export { "default" } else { meta.class_name.as_str() };
            self.edits.insert(class.span.end, hmr_epilogue(scope_id, &meta.class_name, export_name));
        }
        tracing::debug!(file = self.file, scope_id = %scope_id, class = %meta.class_name, "component rewritten");
        Ok(())
    }

    /// `value = input(...)` becomes `value = _compiledInput("value", ...)`, and
    /// likewise for `model` and `output`.
    fn compile_fields(&mut self, class: &ClassSite) -> FieldSchema {
        let framework = self.options.framework_module;
        let input = self.module.local_for(framework, "input").map(str::to_string);
        let model = self.module.local_for(framework, "model").map(str::to_string);
        let output = self.module.local_for(framework, "output").map(str::to_string);

        let mut schema = FieldSchema::default();
        for member in &class.members {
            if member.kind != MemberKind::Property || member.is_static || member.is_private {
                continue;
            }
            let Some(call) = &member.call else {
                continue;
            };
            let callee = Some(call.callee.as_str());
            let compiled = if callee == input.as_deref() {
                schema.inputs.insert(member.name.clone());
                "compiledInput"
            } else if callee == model.as_deref() {
                schema.models.insert(camelize(&member.name));
                "compiledModel"
            } else if callee == output.as_deref() {
                schema.outputs.insert(member.name.clone());
                "compiledOutput"
            } else {
                continue;
            };
            let alias = self.helper(compiled);
            self.edits.replace(call.callee_span.start, call.callee_span.end, alias);
            let separator = if call.has_arguments { ", " } else { "" };
            self.edits
                .insert(call.args_insert_at, format!("{}{separator}", js_string(&member.name)));
        }
        schema
    }

    /// Build mode: the template compiled to an inline render arrow.
    fn inline_render(&mut self, scope_id: &ScopeId, meta: &ComponentMeta, imports: &TemplateImports) -> CompileResult<String> {
        let Some(template) = &meta.template else {
            return Ok("() => null".to_string());
        };
        let (filename, source) = if meta.inline_template {
            (self.file, template.source.clone())
        } else {
            match self.host.load(&template.source) {
                Some(text) => (template.source.as_str(), text),
                None => {
                    self.warnings.push(CompilerError::at(
                        PRANG_W_UNRESOLVED_TEMPLATE,
                        format!("template `{}` could not be loaded", template.source),
                        &template.location,
                        self.file,
                    ).into_warning());
                    return Ok("() => null".to_string());
                }
            }
        };

        let compiled = compile_template(
            &source,
            &TemplateOptions {
                filename,
                scope_id,
                mode: CodegenMode::Inline,
                hmr: false,
                runtime_module: self.options.runtime_module,
                source_map: false,
                bindings: &meta.bindings,
                fields: &meta.fields,
                imports,
                embedded_at: meta.inline_template.then_some(&template.location),
            },
        )?;
        self.render_helpers.extend(compiled.helpers);
        self.warnings.extend(compiled.warnings);
        Ok(compiled.code)
    }

    fn static_block(
        &mut self,
        scope_id: &ScopeId,
        meta: &ComponentMeta,
        schema: &FieldSchema,
        imports: &TemplateImports,
        inline_render: Option<&str>,
        hmr: bool,
    ) -> String {
        let class_component = self.helper(CLASS_COMPONENT);
        let wrap = self.helper(WRAP_CLASS_COMPONENT);
        let on_mounted = self.helper(ON_MOUNTED);
        let on_before_unmount = self.helper(ON_BEFORE_UNMOUNT);

        let components = object_literal(
            imports
                .components
                .iter()
                .map(|(tag, local)| format!("{}: {local}", js_string(tag)))
                .collect(),
        );
        let filters = object_literal(
            imports
                .pipes
                .iter()
                .map(|(name, local)| format!("{}: {local}", js_string(name)))
                .collect(),
        );

        let mut opts = vec![
            format!("__name: {}", js_string(&meta.class_name)),
            format!("__file: {}", js_string(self.file)),
            format!("__scopeId: {}", js_string(&scope_id.data_attribute())),
        ];
        if hmr {
            opts.push(format!("__hmrId: {}", js_string(scope_id.as_str())));
        }
        opts.push(format!("props: {}", schema.props()));
        opts.push(format!("emits: {}", schema.emits()));
        opts.push(format!("components: {components}"));
        opts.push(format!("filters: {filters}"));

        let returned = match inline_render {
            Some(render) => render.to_string(),
            None if meta.template.is_some() => {
                "(_ctx, _cache) => this.__vccOpts.render(_ctx, _cache, _p, $setup, $setup, this.__vccOpts)".to_string()
            }
            None => "() => null".to_string(),
        };
        opts.push(format!(
            "setup: (_p, {{ expose }}) => {{\n\
             \x20           const $setup = {wrap}(new this());\n\
             \x20           $setup.__isScriptSetup = true;\n\
             \x20           if ('onInit' in $setup && typeof $setup['onInit'] === 'function')\n\
             \x20               {on_mounted}(() => $setup.onInit());\n\
             \x20           if ('onDestroy' in $setup && typeof $setup['onDestroy'] === 'function')\n\
             \x20               {on_before_unmount}(() => $setup.onDestroy());\n\
             \x20           expose($setup);\n\
             \x20           return {returned};\n\
             \x20       }}"
        ));
        if inline_render.is_none() && meta.template.is_some() {
            opts.push(format!("render: {}", scope_id.render_alias()));
        }

        format!(
            "\n    static {{\n\
             \x20       this.__vType = {class_component};\n\
             \x20       this.__vInjectionId = Symbol(this.name);\n\
             \x20       this.__vSelector = {selector};\n\
             \x20       this.__vccOpts = {{\n\
             \x20           {opts}\n\
             \x20       }};\n\
             \x20   }}\n",
            selector = js_string(&meta.display_name()),
            opts = opts.join(",\n            "),
        )
    }
}

/// Registers the class with the HMR runtime and reloads it when the module is replaced.
fn hmr_epilogue(scope_id: &ScopeId, class_name: &str, export_name: &str) -> String {
    let id = js_string(scope_id.as_str());
    format!(
        "\n__VUE_HMR_RUNTIME__?.createRecord({id}, {class_name})\n\
         import.meta.hot.on('file-changed', ({{ file }}) => {{\n  __VUE_HMR_RUNTIME__.CHANGED_FILE = file\n}});\n\
         import.meta.hot.accept(mod => {{\n  if (!mod) return;\n  const {{ {export_name}: updated }} = mod;\n  __VUE_HMR_RUNTIME__.reload({id}, updated);\n}})\n"
    )
}
