//! Binding-aware identifier rewriting for template expressions.
//!
//! Walks one parsed expression, decides for every free identifier where it
//! lives at render time and records the replacement as a splice against the
//! expression text. Text outside the rewritten identifiers is kept as written.

use indexmap::IndexSet;
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    ArrowFunctionExpression, AssignmentExpression, AssignmentTarget, CallExpression, Expression,
    Function, IdentifierReference, ObjectProperty, SimpleAssignmentTarget, StaticMemberExpression,
    UpdateExpression,
};
use oxc_ast_visit::{walk, Visit};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType};
use oxc_syntax::operator::{AssignmentOperator, UpdateOperator};
use oxc_syntax::scope::ScopeFlags;

use crate::ast::RuntimeHelper;
use crate::casing::to_valid_identifier;
use crate::edit::EditList;
use crate::meta::{BindingKind, BindingMetadata};
use crate::scope::{is_global, BindingCollector, TemplateScope};

/// Name of the render-scope local bound to the component instance.
pub const SETUP_IDENTIFIER: &str = "$setup";
pub const CONTEXT_IDENTIFIER: &str = "_ctx";

pub fn filter_alias(name: &str) -> String {
    format!("_filter_{}", to_valid_identifier(name))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Usage {
    Read,
    Callee,
    /// Object of `.set(...)` / `.update(...)`: the signal itself, not its value.
    Handle,
    AssignTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Bare,
    Filter,
    Binding(BindingKind),
    Context,
}

pub struct RenameContext<'c> {
    pub bindings: &'c BindingMetadata,
    pub scope: &'c TemplateScope,
    pub pipes: &'c IndexSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Renamed {
    pub content: String,
    pub helpers: IndexSet<RuntimeHelper>,
    pub filters: IndexSet<String>,
}

/// Rewrites every free identifier of `source`. Errors carry the parser message.
pub fn rename_expression(source: &str, ctx: &RenameContext<'_>) -> Result<Renamed, String> {
    let allocator = Allocator::default();
    let expr = Parser::new(&allocator, source, SourceType::mjs())
        .parse_expression()
        .map_err(|errors| {
            errors
                .first()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "invalid expression".to_string())
        })?;

    let mut renamer = TemplateRenamer {
        ctx,
        locals: Vec::new(),
        edits: EditList::new(),
        helpers: IndexSet::new(),
        filters: IndexSet::new(),
    };
    renamer.visit_expression(&expr);

    let content = renamer.edits.apply(source).map_err(|e| e.to_string())?;
    Ok(Renamed {
        content,
        helpers: renamer.helpers,
        filters: renamer.filters,
    })
}

struct TemplateRenamer<'c> {
    ctx: &'c RenameContext<'c>,
    locals: Vec<Vec<String>>,
    edits: EditList,
    helpers: IndexSet<RuntimeHelper>,
    filters: IndexSet<String>,
}

impl<'c> TemplateRenamer<'c> {
    fn classify(&self, name: &str, usage: Usage) -> Target {
        if self.locals.iter().any(|frame| frame.iter().any(|n| n == name))
            || self.ctx.scope.contains(name)
            || is_global(name)
        {
            return Target::Bare;
        }
        if usage == Usage::Callee && self.ctx.pipes.contains(name) {
            return Target::Filter;
        }
        match self.ctx.bindings.get(name) {
            Some(kind) => Target::Binding(*kind),
            None => Target::Context,
        }
    }

    fn replacement(&mut self, name: &str, usage: Usage) -> Option<String> {
        let text = match (self.classify(name, usage), usage) {
            (Target::Bare, _) => return None,
            (Target::Filter, _) => {
                self.filters.insert(name.to_string());
                filter_alias(name)
            }
            (Target::Binding(BindingKind::Signal), Usage::Read) => format!("{SETUP_IDENTIFIER}.{name}()"),
            (Target::Binding(BindingKind::Signal), _) => format!("{SETUP_IDENTIFIER}.{name}"),
            (Target::Binding(BindingKind::ReactiveRef), Usage::AssignTarget) => {
                format!("{SETUP_IDENTIFIER}.{name}.value")
            }
            (Target::Binding(BindingKind::ReactiveRef), _) => {
                self.helpers.insert(RuntimeHelper::Unref);
                format!("{}({SETUP_IDENTIFIER}.{name})", RuntimeHelper::Unref.alias())
            }
            (Target::Binding(BindingKind::Constant), _) => format!("{SETUP_IDENTIFIER}.{name}"),
            (Target::Context, _) => format!("{CONTEXT_IDENTIFIER}.{name}"),
        };
        Some(text)
    }

    fn rewrite(&mut self, ident: &IdentifierReference<'_>, usage: Usage) {
        if let Some(text) = self.replacement(ident.name.as_str(), usage) {
            self.edits.replace(ident.span.start, ident.span.end, text);
        }
    }

    fn is_signal(&self, name: &str) -> bool {
        self.classify(name, Usage::AssignTarget) == Target::Binding(BindingKind::Signal)
    }
}

impl<'a, 'c> Visit<'a> for TemplateRenamer<'c> {
    fn visit_identifier_reference(&mut self, ident: &IdentifierReference<'a>) {
        self.rewrite(ident, Usage::Read);
    }

    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        if let Expression::Identifier(ident) = &call.callee {
            self.rewrite(ident, Usage::Callee);
            for arg in &call.arguments {
                self.visit_argument(arg);
            }
            return;
        }
        walk::walk_call_expression(self, call);
    }

    fn visit_static_member_expression(&mut self, member: &StaticMemberExpression<'a>) {
        if let Expression::Identifier(ident) = &member.object {
            if matches!(member.property.name.as_str(), "set" | "update" | "asReadonly") {
                self.rewrite(ident, Usage::Handle);
                return;
            }
        }
        walk::walk_static_member_expression(self, member);
    }

    fn visit_assignment_expression(&mut self, assign: &AssignmentExpression<'a>) {
        let AssignmentTarget::AssignmentTargetIdentifier(ident) = &assign.left else {
            walk::walk_assignment_expression(self, assign);
            return;
        };
        let name = ident.name.as_str();
        if self.is_signal(name) {
            // `count = v` -> `$setup.count.set(v)`, `count += v` -> `$setup.count.set($setup.count() + (v))`
            let (head, tail) = if assign.operator == AssignmentOperator::Assign {
                (format!("{SETUP_IDENTIFIER}.{name}.set("), ")")
            } else {
                let op = assign.operator.as_str().trim_end_matches('=');
                (
                    format!("{SETUP_IDENTIFIER}.{name}.set({SETUP_IDENTIFIER}.{name}() {op} ("),
                    "))",
                )
            };
            self.edits.replace(assign.span.start, assign.right.span().start, head);
            self.visit_expression(&assign.right);
            self.edits.insert(assign.span.end, tail);
            return;
        }
        self.rewrite(ident, Usage::AssignTarget);
        self.visit_expression(&assign.right);
    }

    fn visit_update_expression(&mut self, update: &UpdateExpression<'a>) {
        let SimpleAssignmentTarget::AssignmentTargetIdentifier(ident) = &update.argument else {
            walk::walk_update_expression(self, update);
            return;
        };
        let name = ident.name.as_str();
        if self.is_signal(name) {
            let op = if update.operator == UpdateOperator::Increment { "+" } else { "-" };
            self.edits.replace(
                update.span.start,
                update.span.end,
                format!("{SETUP_IDENTIFIER}.{name}.set({SETUP_IDENTIFIER}.{name}() {op} 1)"),
            );
            return;
        }
        self.rewrite(ident, Usage::AssignTarget);
    }

    fn visit_object_property(&mut self, prop: &ObjectProperty<'a>) {
        if prop.shorthand {
            if let Expression::Identifier(ident) = &prop.value {
                if let Some(text) = self.replacement(ident.name.as_str(), Usage::Read) {
                    self.edits
                        .replace(ident.span.start, ident.span.end, format!("{}: {}", ident.name, text));
                }
                return;
            }
        }
        walk::walk_object_property(self, prop);
    }

    fn visit_arrow_function_expression(&mut self, arrow: &ArrowFunctionExpression<'a>) {
        let mut names = BindingCollector::params(&arrow.params);
        names.extend(BindingCollector::body(&arrow.body));
        self.locals.push(names);
        walk::walk_arrow_function_expression(self, arrow);
        self.locals.pop();
    }

    fn visit_function(&mut self, func: &Function<'a>, flags: ScopeFlags) {
        let mut names = BindingCollector::params(&func.params);
        if let Some(id) = &func.id {
            names.push(id.name.to_string());
        }
        if let Some(body) = &func.body {
            names.extend(BindingCollector::body(body));
        }
        self.locals.push(names);
        walk::walk_function(self, func, flags);
        self.locals.pop();
    }
}
