//! Script analysis shared by the scanner and the class rewriter.
//!
//! One parse of a class file yields its import bindings and, for every
//! top-level class declaration, the spans the rewriter splices at plus the
//! framework decorator arguments the scanner interprets. Everything is copied
//! out of the arena so callers never hold AST lifetimes.

use std::path::Path;

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Argument, ArrayExpressionElement, Class, ClassElement, Declaration, Decorator,
    ExportDefaultDeclarationKind, Expression, ImportDeclarationSpecifier, MethodDefinitionKind,
    ObjectPropertyKind, PropertyKey, Statement, TSAccessibility, TemplateLiteral,
};
use oxc_ast_visit::{walk, Visit};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span};

use crate::diagnostics::{CompileResult, CompilerError, PRANG_SCAN_SYNTAX};
use crate::meta::{ClassType, ImportBinding, DEFAULT_EXPORT, NAMESPACE_EXPORT};

// ═══════════════════════════════════════════════════════════════════════════════
// TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptModule {
    pub imports: Vec<ImportBinding>,
    pub classes: Vec<ClassSite>,
    /// Messages of syntax errors the parser recovered from.
    pub recovered: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassSite {
    /// Position among all class declarations of the file, nested ones included.
    pub index: usize,
    pub name: Option<String>,
    pub span: Span,
    pub body_span: Span,
    /// Start of the statement, or of the first decorator when it comes earlier.
    pub statement_start: u32,
    pub default_export: bool,
    pub decorator: Option<DecoratorSite>,
    pub members: Vec<MemberSite>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecoratorSite {
    pub kind: ClassType,
    pub span: Span,
    pub properties: Vec<DecoratorProperty>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecoratorProperty {
    pub key: String,
    pub span: Span,
    pub value: PropertyValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// String literal or a template literal without substitutions.
    Text { value: String, span: Span },
    List(Vec<ListItem>),
    Other(Span),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListItem {
    Text { value: String, span: Span },
    Identifier { name: String, span: Span },
    Other(Span),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Constructor,
    Method,
    Accessor,
    Property,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberSite {
    pub name: String,
    pub kind: MemberKind,
    pub is_static: bool,
    pub is_private: bool,
    /// Initializer of a property when it is a call to a plain identifier.
    pub call: Option<CallSite>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallSite {
    pub callee: String,
    pub callee_span: Span,
    /// Where a leading argument is inserted: the first argument, or the closing paren.
    pub args_insert_at: u32,
    pub has_arguments: bool,
}

impl ScriptModule {
    /// Local name bound to export `name` of `module`, ignoring type-only imports.
    pub fn local_for(&self, module: &str, name: &str) -> Option<&str> {
        local_for(&self.imports, module, name)
    }
}

pub fn local_for<'i>(imports: &'i [ImportBinding], module: &str, name: &str) -> Option<&'i str> {
    imports
        .iter()
        .find(|binding| !binding.is_type && binding.source == module && binding.imported_name == name)
        .map(|binding| binding.local_name.as_str())
}

// ═══════════════════════════════════════════════════════════════════════════════
// ANALYSIS
// ═══════════════════════════════════════════════════════════════════════════════

fn source_type_for(file: &str) -> SourceType {
    SourceType::from_path(Path::new(file)).unwrap_or_else(|_| SourceType::ts())
}

/// Parses `source` and extracts imports and top-level classes. Decorators count
/// only when they call a `Component`, `Pipe` or `Module` import of `framework_module`.
pub fn analyze_script(file: &str, source: &str, framework_module: &str) -> CompileResult<ScriptModule> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, source_type_for(file)).parse();
    if ret.panicked {
        let message = ret
            .errors
            .first()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unrecoverable syntax error".to_string());
        return Err(CompilerError::new(PRANG_SCAN_SYNTAX, message, file, 1, 1));
    }
    let program = ret.program;

    let mut counter = ClassCounter::default();
    counter.visit_program(&program);

    let mut imports = Vec::new();
    for stmt in &program.body {
        if let Statement::ImportDeclaration(decl) = stmt {
            let module = decl.source.value.to_string();
            let type_only = decl.import_kind.is_type();
            for specifier in decl.specifiers.iter().flatten() {
                let mut binding = match specifier {
                    ImportDeclarationSpecifier::ImportSpecifier(s) => {
                        let mut b = ImportBinding::new(&s.local.name, &s.imported.name(), &module);
                        b.is_type = s.import_kind.is_type();
                        b
                    }
                    ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                        ImportBinding::new(&s.local.name, DEFAULT_EXPORT, &module)
                    }
                    ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                        ImportBinding::new(&s.local.name, NAMESPACE_EXPORT, &module)
                    }
                };
                binding.is_type |= type_only;
                imports.push(binding);
            }
        }
    }

    let mut classes = Vec::new();
    for stmt in &program.body {
        let (class, default_export) = match stmt {
            Statement::ClassDeclaration(class) => (&**class, false),
            Statement::ExportNamedDeclaration(decl) => match &decl.declaration {
                Some(Declaration::ClassDeclaration(class)) => (&**class, false),
                _ => continue,
            },
            Statement::ExportDefaultDeclaration(decl) => match &decl.declaration {
                ExportDefaultDeclarationKind::ClassDeclaration(class) => (&**class, true),
                _ => continue,
            },
            _ => continue,
        };
        let index = counter
            .starts
            .iter()
            .position(|start| *start == class.span.start)
            .unwrap_or(counter.starts.len());
        classes.push(class_site(class, stmt.span().start, index, default_export, &imports, framework_module));
    }

    tracing::trace!(file, imports = imports.len(), classes = classes.len(), "script analyzed");
    Ok(ScriptModule {
        imports,
        classes,
        recovered: ret.errors.iter().map(|e| e.to_string()).collect(),
    })
}

/// Start offsets of every class declaration, in source order.
#[derive(Default)]
struct ClassCounter {
    starts: Vec<u32>,
}

impl<'a> Visit<'a> for ClassCounter {
    fn visit_class(&mut self, class: &Class<'a>) {
        if class.is_declaration() {
            self.starts.push(class.span.start);
        }
        walk::walk_class(self, class);
    }
}

fn class_site(
    class: &Class<'_>,
    statement_start: u32,
    index: usize,
    default_export: bool,
    imports: &[ImportBinding],
    framework_module: &str,
) -> ClassSite {
    let decorator = class
        .decorators
        .iter()
        .find_map(|decorator| decorator_site(decorator, imports, framework_module));
    let first_decorator = class.decorators.iter().map(|d| d.span.start).min();
    ClassSite {
        index,
        name: class.id.as_ref().map(|id| id.name.to_string()),
        span: class.span,
        body_span: class.body.span,
        statement_start: first_decorator.map_or(statement_start, |start| start.min(statement_start)),
        default_export,
        decorator,
        members: class.body.body.iter().filter_map(member_site).collect(),
    }
}

fn decorator_site(decorator: &Decorator<'_>, imports: &[ImportBinding], framework_module: &str) -> Option<DecoratorSite> {
    let Expression::CallExpression(call) = &decorator.expression else {
        return None;
    };
    let Expression::Identifier(callee) = &call.callee else {
        return None;
    };
    let binding = imports.iter().find(|binding| {
        !binding.is_type && binding.local_name == callee.name.as_str() && binding.source == framework_module
    })?;
    let kind = match binding.imported_name.as_str() {
        "Component" => ClassType::Component,
        "Pipe" => ClassType::Pipe,
        "Module" => ClassType::Module,
        _ => return None,
    };

    let mut properties = Vec::new();
    if let Some(Argument::ObjectExpression(object)) = call.arguments.first() {
        for prop in &object.properties {
            let ObjectPropertyKind::ObjectProperty(prop) = prop else {
                continue;
            };
            let Some(key) = static_key(&prop.key) else {
                continue;
            };
            properties.push(DecoratorProperty {
                key,
                span: prop.span,
                value: property_value(&prop.value),
            });
        }
    }
    Some(DecoratorSite {
        kind,
        span: decorator.span,
        properties,
    })
}

fn static_key(key: &PropertyKey<'_>) -> Option<String> {
    match key {
        PropertyKey::StaticIdentifier(id) => Some(id.name.to_string()),
        PropertyKey::StringLiteral(lit) => Some(lit.value.to_string()),
        _ => None,
    }
}

fn template_text(template: &TemplateLiteral<'_>) -> Option<String> {
    if !template.expressions.is_empty() {
        return None;
    }
    template.quasis.first().map(|quasi| {
        quasi
            .value
            .cooked
            .as_ref()
            .unwrap_or(&quasi.value.raw)
            .to_string()
    })
}

fn property_value(value: &Expression<'_>) -> PropertyValue {
    match value {
        Expression::StringLiteral(lit) => PropertyValue::Text {
            value: lit.value.to_string(),
            span: lit.span,
        },
        Expression::TemplateLiteral(template) => match template_text(template) {
            Some(text) => PropertyValue::Text {
                value: text,
                span: template.span,
            },
            None => PropertyValue::Other(template.span),
        },
        Expression::ArrayExpression(array) => PropertyValue::List(
            array
                .elements
                .iter()
                .map(|element| match element {
                    ArrayExpressionElement::StringLiteral(lit) => ListItem::Text {
                        value: lit.value.to_string(),
                        span: lit.span,
                    },
                    ArrayExpressionElement::TemplateLiteral(template) => match template_text(template) {
                        Some(text) => ListItem::Text {
                            value: text,
                            span: template.span,
                        },
                        None => ListItem::Other(template.span),
                    },
                    ArrayExpressionElement::Identifier(id) => ListItem::Identifier {
                        name: id.name.to_string(),
                        span: id.span,
                    },
                    other => ListItem::Other(other.span()),
                })
                .collect(),
        ),
        other => PropertyValue::Other(other.span()),
    }
}

fn member_site(element: &ClassElement<'_>) -> Option<MemberSite> {
    match element {
        ClassElement::MethodDefinition(method) => {
            let kind = match method.kind {
                MethodDefinitionKind::Constructor => MemberKind::Constructor,
                MethodDefinitionKind::Method => MemberKind::Method,
                MethodDefinitionKind::Get | MethodDefinitionKind::Set => MemberKind::Accessor,
            };
            Some(MemberSite {
                name: member_name(&method.key)?,
                kind,
                is_static: method.r#static,
                is_private: is_private(&method.key, method.accessibility),
                call: None,
            })
        }
        ClassElement::PropertyDefinition(prop) => {
            let call = match &prop.value {
                Some(Expression::CallExpression(call)) => match &call.callee {
                    Expression::Identifier(callee) => Some(CallSite {
                        callee: callee.name.to_string(),
                        callee_span: callee.span,
                        args_insert_at: call
                            .arguments
                            .first()
                            .map_or(call.span.end.saturating_sub(1), |arg| arg.span().start),
                        has_arguments: !call.arguments.is_empty(),
                    }),
                    _ => None,
                },
                _ => None,
            };
            Some(MemberSite {
                name: member_name(&prop.key)?,
                kind: MemberKind::Property,
                is_static: prop.r#static,
                is_private: is_private(&prop.key, prop.accessibility),
                call,
            })
        }
        _ => None,
    }
}

fn member_name(key: &PropertyKey<'_>) -> Option<String> {
    match key {
        PropertyKey::PrivateIdentifier(id) => Some(format!("#{}", id.name)),
        other => static_key(other),
    }
}

fn is_private(key: &PropertyKey<'_>, accessibility: Option<TSAccessibility>) -> bool {
    matches!(key, PropertyKey::PrivateIdentifier(_)) || accessibility == Some(TSAccessibility::Private)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAMEWORK: &str = "@prang/core";

    #[test]
    fn imports_keep_renames_and_kinds() {
        let module = analyze_script(
            "/src/a.ts",
            "import { Component as C, signal } from '@prang/core';\n\
             import Child from './child';\n\
             import * as pipes from './pipes';\n\
             import type { Shape } from './shape';\n",
            FRAMEWORK,
        )
        .unwrap();
        assert_eq!(module.imports.len(), 5);
        assert_eq!(module.local_for(FRAMEWORK, "Component"), Some("C"));
        assert_eq!(module.imports[2].imported_name, DEFAULT_EXPORT);
        assert_eq!(module.imports[3].imported_name, NAMESPACE_EXPORT);
        assert!(module.imports[4].is_type);
    }

    #[test]
    fn class_indices_count_nested_declarations() {
        let source = "function f() { class Inner {} }\nclass A {}\nexport class B {}\nexport default class C {}\n";
        let module = analyze_script("/src/a.ts", source, FRAMEWORK).unwrap();
        let indices: Vec<usize> = module.classes.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert!(module.classes[2].default_export);
    }

    #[test]
    fn only_framework_decorators_are_recognized() {
        let source = "import { Component } from '@prang/core';\n\
                      import { Component as Other } from 'elsewhere';\n\
                      @Component({ selector: 'x-a', imports: [B] }) export class A {}\n\
                      @Other({}) class D {}\n";
        let module = analyze_script("/src/a.ts", source, FRAMEWORK).unwrap();
        let class_named = |name: &str| module.classes.iter().find(|class| class.name.as_deref() == Some(name));
        let a = class_named("A").unwrap();
        let decorator = a.decorator.as_ref().unwrap();
        assert_eq!(decorator.kind, ClassType::Component);
        assert_eq!(decorator.properties[0].key, "selector");
        assert!(matches!(&decorator.properties[0].value, PropertyValue::Text { value, .. } if value == "x-a"));
        assert!(matches!(&decorator.properties[1].value, PropertyValue::List(items) if items.len() == 1));
        assert_eq!(a.statement_start, source.find("@Component(").unwrap() as u32);
        assert!(class_named("D").unwrap().decorator.is_none());
    }

    #[test]
    fn members_record_calls_and_privacy() {
        let source = "class A {\n  count = signal(0);\n  label = input<string>();\n  private secret = 1;\n  #hidden = 2;\n  static shared = 3;\n  constructor() {}\n  save() {}\n  get total() { return 1 }\n}\n";
        let module = analyze_script("/src/a.ts", source, FRAMEWORK).unwrap();
        let members = &module.classes[0].members;
        assert_eq!(members[0].call.as_ref().unwrap().callee, "signal");
        assert!(members[0].call.as_ref().unwrap().has_arguments);
        let label = members[1].call.as_ref().unwrap();
        assert!(!label.has_arguments);
        assert_eq!(&source[label.args_insert_at as usize..label.args_insert_at as usize + 1], ")");
        assert!(members[2].is_private);
        assert_eq!(members[3].name, "#hidden");
        assert!(members[3].is_private);
        assert!(members[4].is_static);
        assert_eq!(members[5].kind, MemberKind::Constructor);
        assert_eq!(members[6].kind, MemberKind::Method);
        assert_eq!(members[7].kind, MemberKind::Accessor);
    }

    #[test]
    fn broken_source_is_a_scan_error() {
        let err = analyze_script("/src/a.ts", "class {{{", FRAMEWORK);
        assert!(err.is_err() || !err.unwrap().recovered.is_empty());
    }
}
