#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use crate::diagnostics::{PRANG_SCAN_ANONYMOUS_CLASS, PRANG_W_UNRESOLVED_IMPORT, PRANG_W_UNRESOLVED_TEMPLATE};
    use crate::meta::{BindingKind, ClassMeta, ClassType, ComponentMeta, FieldRole, ScopeId};
    use crate::registry::{template_imports, InMemoryRegistry, MetadataRegistry};
    use crate::scanner::{ScanOptions, ScanOutcome, Scanner};
    use crate::test_support::MemoryHost;

    const OPTIONS: ScanOptions<'static> = ScanOptions {
        framework_module: "@prang/core",
        runtime_module: "@prang/core/runtime",
    };

    const CHILD: &str = r#"import { Component, input } from '@prang/core';

@Component({ selector: 'child-item', template: '<span>{{ label }}</span>' })
export class ChildItem {
    label = input('');
}
"#;

    const PIPE: &str = r#"import { Pipe } from '@prang/core';

@Pipe({})
export class Capitalize {
    transform(value) { return value; }
}
"#;

    const APP: &str = r#"import { Component, signal, computed as derived, model, output } from '@prang/core';
import { ref } from '@prang/core/runtime';
import { ChildItem } from './child.component';
import { Capitalize } from './capitalize.pipe';

@Component({
    selector: 'app-root',
    templateUrl: './app.component.html',
    styleUrls: ['./app.component.css'],
    styles: ['p { color: red }'],
    imports: [ChildItem, Capitalize],
})
export class AppComponent {
    value = signal(0);
    double = derived(() => this.value() * 2);
    open = model(false);
    closed = output();
    raw = ref(1);
    title = 'hello';
    private secret = 1;
    #hidden = 2;
    static count = 0;
    constructor() {}
    increment() { this.value.update(v => v + 1); }
}
"#;

    fn project() -> MemoryHost {
        MemoryHost::new()
            .file("/src/app.component.ts", APP)
            .file("/src/app.component.html", "<p>{{ value }}</p>")
            .file("/src/app.component.css", "p {}")
            .file("/src/child.component.ts", CHILD)
            .file("/src/capitalize.pipe.ts", PIPE)
    }

    fn scan(registry: &InMemoryRegistry, host: &MemoryHost, file: &str) -> ScanOutcome {
        let source = host.files.get(file).cloned().unwrap();
        Scanner::new(registry, host, OPTIONS)
            .scan_file(file, &source, &mut IndexMap::new())
            .unwrap()
    }

    fn component(registry: &InMemoryRegistry, file: &str, index: usize) -> ComponentMeta {
        registry
            .get(&ScopeId::derive(file, index))
            .and_then(|meta| meta.as_component().cloned())
            .unwrap()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // COMPONENT METADATA
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn bindings_follow_reactive_constructors() {
        let registry = InMemoryRegistry::new();
        let host = project();
        scan(&registry, &host, "/src/app.component.ts");
        let meta = component(&registry, "/src/app.component.ts", 0);

        let bindings: Vec<(&str, BindingKind)> = meta.bindings.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        assert_eq!(
            bindings,
            vec![
                ("value", BindingKind::Signal),
                ("double", BindingKind::Signal),
                ("open", BindingKind::Signal),
                ("closed", BindingKind::Constant),
                ("raw", BindingKind::ReactiveRef),
                ("title", BindingKind::Constant),
                ("increment", BindingKind::Constant),
            ]
        );
        let roles: Vec<(&str, FieldRole)> = meta.fields.iter().map(|f| (f.name.as_str(), f.role)).collect();
        assert_eq!(roles, vec![("open", FieldRole::Model), ("closed", FieldRole::Output)]);
    }

    #[test]
    fn decorator_keys_are_recorded() {
        let registry = InMemoryRegistry::new();
        let host = project();
        let outcome = scan(&registry, &host, "/src/app.component.ts");
        assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);

        let meta = component(&registry, "/src/app.component.ts", 0);
        assert_eq!(meta.class_name, "AppComponent");
        assert_eq!(meta.selectors, vec!["app-root".to_string()]);
        let template = meta.template.as_ref().unwrap();
        assert_eq!(template.source, "/src/app.component.html");
        assert!(!meta.inline_template);
        assert_eq!(template.location.start.line, 8);

        assert_eq!(meta.styles.len(), 2);
        assert!(meta.styles[0].external);
        assert_eq!(meta.styles[0].source, "/src/app.component.css");
        assert!(!meta.styles[1].external);
        assert_eq!(meta.styles[1].source, "p { color: red }");
        assert_eq!(meta.styles[1].location.start.line, 10);
    }

    #[test]
    fn inline_template_is_marked() {
        let registry = InMemoryRegistry::new();
        let host = project();
        scan(&registry, &host, "/src/child.component.ts");
        let meta = component(&registry, "/src/child.component.ts", 0);
        assert!(meta.inline_template);
        assert_eq!(meta.template.unwrap().source, "<span>{{ label }}</span>");
        assert_eq!(meta.fields[0].role, FieldRole::Input);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // IMPORTS
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn imports_are_scanned_and_classified() {
        let registry = InMemoryRegistry::new();
        let host = project();
        let outcome = scan(&registry, &host, "/src/app.component.ts");
        assert_eq!(outcome.entries.len(), 1);
        assert_eq!(registry.len(), 3);

        let meta = component(&registry, "/src/app.component.ts", 0);
        assert_eq!(meta.imports.len(), 2);
        let child = &meta.imports[0];
        assert_eq!(child.local_name, "ChildItem");
        assert_eq!(child.resolved_file.as_deref(), Some("/src/child.component.ts"));
        assert_eq!(child.resolved_type, Some(ClassType::Component));
        assert_eq!(child.resolved_scope, Some(ScopeId::derive("/src/child.component.ts", 0)));
        assert_eq!(meta.imports[1].resolved_type, Some(ClassType::Pipe));

        let imports = template_imports(&meta, &registry);
        assert_eq!(imports.component_for("child-item"), Some("ChildItem"));
        assert_eq!(imports.component_for("ChildItem"), Some("ChildItem"));
        assert_eq!(imports.pipe_for("capitalize"), Some("Capitalize"));
    }

    #[test]
    fn pipe_names_default_to_camel_case() {
        let registry = InMemoryRegistry::new();
        let host = MemoryHost::new()
            .file("/src/capitalize.pipe.ts", PIPE)
            .file(
                "/src/named.pipe.ts",
                "import { Pipe } from '@prang/core';\n@Pipe({ name: 'shout' })\nexport class LoudText {}\n",
            );
        scan(&registry, &host, "/src/capitalize.pipe.ts");
        scan(&registry, &host, "/src/named.pipe.ts");
        let name = |file: &str| match registry.get(&ScopeId::derive(file, 0)) {
            Some(ClassMeta::Pipe(pipe)) => pipe.name,
            other => panic!("expected pipe, got {other:?}"),
        };
        assert_eq!(name("/src/capitalize.pipe.ts"), "capitalize");
        assert_eq!(name("/src/named.pipe.ts"), "shout");
    }

    #[test]
    fn same_file_and_default_imports_resolve() {
        let registry = InMemoryRegistry::new();
        let host = MemoryHost::new()
            .file(
                "/src/card.ts",
                "import { Component } from '@prang/core';\n@Component({ selector: 'x-card' })\nexport default class Card {}\n",
            )
            .file(
                "/src/page.ts",
                "import { Component as Cmp, Module } from '@prang/core';\n\
                 import Card from './card';\n\
                 @Cmp({ imports: [Card, Badge] }) export class Page {}\n\
                 @Cmp({ selector: 'x-badge' }) class Badge {}\n\
                 @Module({ imports: [Page] }) export class Feature {}\n",
            );
        scan(&registry, &host, "/src/page.ts");

        let page = component(&registry, "/src/page.ts", 0);
        assert_eq!(page.imports[0].resolved_scope, Some(ScopeId::derive("/src/card.ts", 0)));
        assert_eq!(page.imports[1].resolved_scope, Some(ScopeId::derive("/src/page.ts", 1)));
        assert_eq!(page.imports[1].resolved_file.as_deref(), Some("/src/page.ts"));

        match registry.get(&ScopeId::derive("/src/page.ts", 2)) {
            Some(ClassMeta::Module(module)) => {
                assert_eq!(module.imports[0].resolved_type, Some(ClassType::Component))
            }
            other => panic!("expected module, got {other:?}"),
        }
    }

    #[test]
    fn unresolved_imports_and_templates_warn() {
        let registry = InMemoryRegistry::new();
        let host = MemoryHost::new().file(
            "/src/app.ts",
            "import { Component } from '@prang/core';\n\
             import { Missing } from './missing';\n\
             @Component({ templateUrl: './nope.html', imports: [Missing, Undeclared] })\n\
             export class App {}\n",
        );
        let outcome = scan(&registry, &host, "/src/app.ts");
        let codes: Vec<&str> = outcome.warnings.iter().map(|w| w.code.as_str()).collect();
        assert_eq!(
            codes,
            vec![PRANG_W_UNRESOLVED_TEMPLATE, PRANG_W_UNRESOLVED_IMPORT, PRANG_W_UNRESOLVED_IMPORT]
        );
        assert!(outcome.warnings.iter().all(|w| w.is_warning()));

        let meta = component(&registry, "/src/app.ts", 0);
        assert!(meta.template.is_none());
        assert_eq!(meta.imports.len(), 1);
        assert_eq!(meta.imports[0].resolved_file, None);
    }

    #[test]
    fn circular_imports_terminate() {
        let registry = InMemoryRegistry::new();
        let host = MemoryHost::new()
            .file(
                "/src/a.ts",
                "import { Component } from '@prang/core';\nimport { B } from './b';\n@Component({ imports: [B] }) export class A {}\n",
            )
            .file(
                "/src/b.ts",
                "import { Component } from '@prang/core';\nimport { A } from './a';\n@Component({ imports: [A] }) export class B {}\n",
            );
        let mut visited = IndexMap::new();
        let source = host.files["/src/a.ts"].clone();
        Scanner::new(&registry, &host, OPTIONS)
            .scan_file("/src/a.ts", &source, &mut visited)
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(host.loads.borrow().as_slice(), ["/src/b.ts".to_string()]);
        let a = component(&registry, "/src/a.ts", 0);
        assert_eq!(a.imports[0].resolved_type, Some(ClassType::Component));
        assert!(visited.contains_key("/src/a.ts") && visited.contains_key("/src/b.ts"));
    }

    #[test]
    fn visited_files_are_not_rescanned() {
        let registry = InMemoryRegistry::new();
        let host = project();
        let mut visited = IndexMap::new();
        let scanner = Scanner::new(&registry, &host, OPTIONS);
        scanner.scan_file("/src/app.component.ts", APP, &mut visited).unwrap();
        let loads = host.loads.borrow().len();

        let again = scanner.scan_file("/src/app.component.ts", APP, &mut visited).unwrap();
        assert_eq!(again.entries.len(), 1);
        assert_eq!(host.loads.borrow().len(), loads);
    }

    #[test]
    fn visited_files_with_new_text_are_rescanned() {
        let registry = InMemoryRegistry::new();
        let host = project();
        let mut visited = IndexMap::new();
        let scanner = Scanner::new(&registry, &host, OPTIONS);
        scanner.scan_file("/src/app.component.ts", APP, &mut visited).unwrap();

        let edited = APP.replace("title = 'hello';", "title = signal('hello');");
        let again = scanner.scan_file("/src/app.component.ts", &edited, &mut visited).unwrap();
        assert_eq!(again.entries.len(), 1);
        let app = component(&registry, "/src/app.component.ts", 0);
        assert_eq!(app.bindings["title"], BindingKind::Signal);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // REGISTRY WRITES
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn rescans_replace_entries_of_the_file() {
        let registry = InMemoryRegistry::new();
        let host = MemoryHost::new();
        let scanner = Scanner::new(&registry, &host, OPTIONS);
        let two = "import { Component } from '@prang/core';\n@Component({}) class A {}\n@Component({}) class B {}\n";
        let one = "import { Component } from '@prang/core';\n@Component({}) class A {}\n";

        scanner.scan_file("/src/x.ts", two, &mut IndexMap::new()).unwrap();
        scanner.scan_file("/src/x.ts", two, &mut IndexMap::new()).unwrap();
        assert_eq!(registry.len(), 2);

        scanner.scan_file("/src/x.ts", one, &mut IndexMap::new()).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.get(&ScopeId::derive("/src/x.ts", 1)).is_none());
    }

    #[test]
    fn rescanning_one_file_leaves_others_alone() {
        let registry = InMemoryRegistry::new();
        let host = project();
        scan(&registry, &host, "/src/app.component.ts");
        let child_before = registry.file_hash("/src/child.component.ts");

        Scanner::new(&registry, &host, OPTIONS)
            .scan_file("/src/capitalize.pipe.ts", &format!("// edited\n{PIPE}"), &mut IndexMap::new())
            .unwrap();
        assert_eq!(registry.file_hash("/src/child.component.ts"), child_before);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn anonymous_decorated_class_is_fatal() {
        let registry = InMemoryRegistry::new();
        let host = MemoryHost::new();
        let mut visited = IndexMap::new();
        let err = Scanner::new(&registry, &host, OPTIONS)
            .scan_file(
                "/src/anon.ts",
                "import { Component } from '@prang/core';\n\n@Component({})\nexport default class {}\n",
                &mut visited,
            )
            .unwrap_err();
        assert_eq!(err.code, PRANG_SCAN_ANONYMOUS_CLASS);
        assert_eq!(err.file, "/src/anon.ts");
        assert!(err.line >= 3);
        assert!(registry.is_empty());
        assert!(!visited.contains_key("/src/anon.ts"));
    }

    #[test]
    fn foreign_decorators_are_ignored() {
        let registry = InMemoryRegistry::new();
        let host = MemoryHost::new();
        let outcome = Scanner::new(&registry, &host, OPTIONS)
            .scan_file(
                "/src/other.ts",
                "import { Component } from 'other-framework';\n@Component({ selector: 'x' }) export class X {}\n",
                &mut IndexMap::new(),
            )
            .unwrap();
        assert!(outcome.entries.is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn scope_ids_count_undecorated_classes() {
        let registry = InMemoryRegistry::new();
        let host = MemoryHost::new();
        let outcome = Scanner::new(&registry, &host, OPTIONS)
            .scan_file(
                "/src/x.ts",
                "import { Component } from '@prang/core';\nclass Plain {}\n@Component({}) export class Second {}\n",
                &mut IndexMap::new(),
            )
            .unwrap();
        assert_eq!(outcome.entries[0].0, ScopeId::derive("/src/x.ts", 1));
    }
}
