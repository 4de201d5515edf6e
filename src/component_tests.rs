#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use crate::component::{rewrite_module, RewriteOptions, RewrittenModule};
    use crate::diagnostics::PRANG_W_UNRESOLVED_TEMPLATE;
    use crate::meta::ScopeId;
    use crate::pipeline::BuildMode;
    use crate::registry::InMemoryRegistry;
    use crate::scanner::{ScanOptions, Scanner};
    use crate::test_support::MemoryHost;

    const APP: &str = r#"import { Component, input, model, output, signal } from '@prang/core';
import { ChildItem } from './child.component';

@Component({
    selector: 'app-root',
    templateUrl: './app.component.html',
    styles: ['p { color: red }'],
    imports: [ChildItem],
})
export class AppComponent {
    label = input<string>();
    count = model(0);
    changed = output<number>();
    value = signal(1);
    private hidden = input();
}
"#;

    const CHILD: &str = r#"import { Component, input as prop } from '@prang/core';

@Component({ selector: 'child-item', template: '<span>{{ label }}</span>' })
export default class ChildItem {
    label = prop('');
}
"#;

    fn project() -> MemoryHost {
        MemoryHost::new()
            .file("/src/app.component.ts", APP)
            .file("/src/app.component.html", "<child-item></child-item>")
            .file("/src/child.component.ts", CHILD)
    }

    fn try_rewrite(host: &MemoryHost, file: &str, mode: BuildMode, hmr: bool) -> Option<RewrittenModule> {
        let registry = InMemoryRegistry::new();
        let source = host.files[file].clone();
        Scanner::new(
            &registry,
            host,
            ScanOptions {
                framework_module: "@prang/core",
                runtime_module: "@prang/core/runtime",
            },
        )
        .scan_file(file, &source, &mut IndexMap::new())
        .unwrap();
        rewrite_module(
            file,
            &source,
            &registry,
            host,
            &RewriteOptions {
                mode,
                hmr,
                framework_module: "@prang/core",
                runtime_module: "@prang/core/runtime",
                source_map: true,
            },
        )
        .unwrap()
    }

    fn rewrite(host: &MemoryHost, file: &str, mode: BuildMode, hmr: bool) -> RewrittenModule {
        try_rewrite(host, file, mode, hmr).unwrap()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // DEV MODE
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn decorator_becomes_virtual_imports() {
        let out = rewrite(&project(), "/src/app.component.ts", BuildMode::Dev, false);
        let id = ScopeId::derive("/src/app.component.ts", 0);
        assert!(!out.code.contains("@Component("));
        assert!(out.code.contains(&format!(
            "import {{ render as __render_{id} }} from \"/src/app.component.html?prang&type=template&scopeId={id}\";\n"
        )));
        assert!(out.code.contains(&format!(
            "import \"/src/app.component.ts?prang&type=inline-style&scopeId={id}&styleIndex=0&lang.css\";\n"
        )));
    }

    #[test]
    fn helper_import_is_a_single_line_at_the_top() {
        let out = rewrite(&project(), "/src/app.component.ts", BuildMode::Dev, false);
        let first = out.code.lines().next().unwrap();
        assert_eq!(
            first,
            "import { compiledInput as _compiledInput, compiledModel as _compiledModel, \
             compiledOutput as _compiledOutput, CLASS_COMPONENT as _CLASS_COMPONENT, \
             wrapClassComponent as _wrapClassComponent, onMounted as _onMounted, \
             onBeforeUnmount as _onBeforeUnmount } from \"@prang/core/runtime\";"
        );
    }

    #[test]
    fn field_calls_receive_their_names() {
        let out = rewrite(&project(), "/src/app.component.ts", BuildMode::Dev, false);
        assert!(out.code.contains("label = _compiledInput<string>(\"label\");"));
        assert!(out.code.contains("count = _compiledModel(\"count\", 0);"));
        assert!(out.code.contains("changed = _compiledOutput<number>(\"changed\");"));
        assert!(out.code.contains("value = signal(1);"));
        assert!(out.code.contains("private hidden = input();"));
    }

    #[test]
    fn registration_lists_props_emits_and_components() {
        let out = rewrite(&project(), "/src/app.component.ts", BuildMode::Dev, false);
        let id = ScopeId::derive("/src/app.component.ts", 0);
        assert!(out.code.contains("    static {\n        this.__vType = _CLASS_COMPONENT;\n"));
        assert!(out.code.contains("this.__vInjectionId = Symbol(this.name);"));
        assert!(out.code.contains("this.__vSelector = \"app-root\";"));
        assert!(out.code.contains("__name: \"AppComponent\""));
        assert!(out.code.contains("__file: \"/src/app.component.ts\""));
        assert!(out.code.contains(&format!("__scopeId: \"data-v-{id}\"")));
        assert!(out.code.contains("props: { \"label\": {}, \"count\": {}, \"countModifiers\": {} }"));
        assert!(out.code.contains("emits: [\"changed\", \"update:count\"]"));
        assert!(out.code.contains("components: { \"child-item\": ChildItem, \"ChildItem\": ChildItem }"));
        assert!(out.code.contains("filters: {}"));
        assert!(out.code.contains(&format!("render: __render_{id}")));
        assert!(out
            .code
            .contains("return (_ctx, _cache) => this.__vccOpts.render(_ctx, _cache, _p, $setup, $setup, this.__vccOpts);"));
        assert!(out.code.contains("_onMounted(() => $setup.onInit());"));
        assert!(out.code.contains("_onBeforeUnmount(() => $setup.onDestroy());"));
        assert!(!out.code.contains("__hmrId"));
        assert!(out.code.trim_end().ends_with('}'));
    }

    #[test]
    fn hmr_registers_and_reloads_the_class() {
        let out = rewrite(&project(), "/src/app.component.ts", BuildMode::Dev, true);
        let id = ScopeId::derive("/src/app.component.ts", 0);
        assert!(out.code.contains(&format!("__hmrId: \"{id}\"")));
        assert!(out
            .code
            .contains(&format!("__VUE_HMR_RUNTIME__?.createRecord(\"{id}\", AppComponent)")));
        assert!(out.code.contains("const { AppComponent: updated } = mod;"));
        assert!(out.code.contains(&format!("__VUE_HMR_RUNTIME__.reload(\"{id}\", updated);")));
    }

    #[test]
    fn default_exports_reload_through_default() {
        let out = rewrite(&project(), "/src/child.component.ts", BuildMode::Dev, true);
        let id = ScopeId::derive("/src/child.component.ts", 0);
        assert!(out.code.contains("const { default: updated } = mod;"));
        assert!(out.code.contains("label = _compiledInput(\"label\", '');"));
        assert!(out.code.contains(&format!(
            "from \"/src/child.component.ts?prang&type=inline-template&scopeId={id}\""
        )));
    }

    #[test]
    fn rewrite_map_points_at_the_class_file() {
        let out = rewrite(&project(), "/src/app.component.ts", BuildMode::Dev, false);
        let map = out.map.unwrap();
        assert_eq!(map.sources, vec!["/src/app.component.ts".to_string()]);
        assert!(!map.mappings.is_empty());
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // BUILD MODE
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn build_mode_inlines_the_render_function() {
        let out = rewrite(&project(), "/src/child.component.ts", BuildMode::Build, true);
        assert!(out.code.contains("return (_ctx, _cache) => {"));
        assert!(out.code.contains("_toDisplayString($setup.label())"));
        assert!(out.code.contains("import { createVNode as _createVNode"));
        assert!(!out.code.contains("?prang&type=inline-template"));
        assert!(!out.code.contains("render: __render_"));
        assert!(!out.code.contains("import.meta.hot"));
        assert!(!out.code.contains("__hmrId"));
    }

    #[test]
    fn build_mode_loads_external_templates() {
        let host = project();
        let out = rewrite(&host, "/src/app.component.ts", BuildMode::Build, false);
        assert!(host.loads.borrow().iter().any(|id| id == "/src/app.component.html"));
        assert!(out.code.contains("_createVNode(_component_child_item, null)"));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn build_mode_warns_when_the_template_cannot_be_loaded() {
        let host = MemoryHost::new()
            .file(
                "/src/a.ts",
                "import { Component } from '@prang/core';\n@Component({ templateUrl: './a.html' })\nexport class A {}\n",
            )
            .file("/src/a.html", "<p></p>");
        let registry = InMemoryRegistry::new();
        let source = host.files["/src/a.ts"].clone();
        let options = ScanOptions {
            framework_module: "@prang/core",
            runtime_module: "@prang/core/runtime",
        };
        Scanner::new(&registry, &host, options)
            .scan_file("/src/a.ts", &source, &mut IndexMap::new())
            .unwrap();

        let without_template = MemoryHost::new();
        let out = rewrite_module(
            "/src/a.ts",
            &source,
            &registry,
            &without_template,
            &RewriteOptions {
                mode: BuildMode::Build,
                hmr: false,
                framework_module: "@prang/core",
                runtime_module: "@prang/core/runtime",
                source_map: false,
            },
        )
        .unwrap()
        .unwrap();
        assert_eq!(out.warnings[0].code, PRANG_W_UNRESOLVED_TEMPLATE);
        assert!(out.code.contains("return () => null;"));
        assert!(out.map.is_none());
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PASS-THROUGH
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn pipes_and_plain_classes_are_left_alone() {
        let host = MemoryHost::new()
            .file(
                "/src/upper.pipe.ts",
                "import { Pipe } from '@prang/core';\n@Pipe({})\nexport class Upper {}\n",
            )
            .file("/src/plain.ts", "import { signal } from '@prang/core';\nexport class Plain {}\n");
        assert!(try_rewrite(&host, "/src/upper.pipe.ts", BuildMode::Dev, true).is_none());
        assert!(try_rewrite(&host, "/src/plain.ts", BuildMode::Dev, true).is_none());
    }

    #[test]
    fn component_without_template_renders_nothing() {
        let host = MemoryHost::new().file(
            "/src/empty.ts",
            "import { Component } from '@prang/core';\n@Component({ selector: 'x-empty' })\nclass Empty {}\n",
        );
        let out = rewrite(&host, "/src/empty.ts", BuildMode::Dev, false);
        assert!(out.code.contains("return () => null;"));
        assert!(!out.code.contains("render: __render_"));
        assert!(!out.code.contains("?prang&type=template"));
    }
}
