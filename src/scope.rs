//! Name scoping for template expressions.

use oxc_allocator::Allocator;
use oxc_ast::ast::{BindingIdentifier, Expression, FormalParameters, FunctionBody};
use oxc_ast_visit::Visit;
use oxc_parser::Parser;
use oxc_span::SourceType;
use std::collections::HashSet;

lazy_static::lazy_static! {
    /// Globals a template expression may reference without going through the instance.
    pub static ref TEMPLATE_GLOBALS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        s.insert("Infinity");
        s.insert("undefined");
        s.insert("NaN");
        s.insert("isFinite");
        s.insert("isNaN");
        s.insert("parseFloat");
        s.insert("parseInt");
        s.insert("decodeURI");
        s.insert("decodeURIComponent");
        s.insert("encodeURI");
        s.insert("encodeURIComponent");
        s.insert("Math");
        s.insert("Number");
        s.insert("Date");
        s.insert("Array");
        s.insert("Object");
        s.insert("Boolean");
        s.insert("String");
        s.insert("RegExp");
        s.insert("Map");
        s.insert("Set");
        s.insert("JSON");
        s.insert("Intl");
        s.insert("BigInt");
        s.insert("Symbol");
        s.insert("Error");
        s.insert("console");
        s
    };

    /// Render-function locals that are never prefixed or shadowable.
    pub static ref PROTECTED_IDENTIFIERS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        s.insert("$setup");
        s.insert("_ctx");
        s.insert("_cache");
        s.insert("$props");
        s.insert("$data");
        s.insert("$options");
        s
    };
}

pub fn is_global(name: &str) -> bool {
    TEMPLATE_GLOBALS.contains(name) || PROTECTED_IDENTIFIERS.contains(name)
}

/// Template scope: variables introduced by `v-for` and `v-slot`, innermost last.
#[derive(Debug, Default, Clone)]
pub struct TemplateScope {
    frames: Vec<Vec<String>>,
}

impl TemplateScope {
    pub fn push(&mut self, names: Vec<String>) {
        self.frames.push(names);
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    pub fn contains(&self, name: &str) -> bool {
        self.frames.iter().any(|frame| frame.iter().any(|n| n == name))
    }
}

/// Collects every name bound by a pattern or parameter list.
#[derive(Default)]
pub struct BindingCollector {
    pub names: Vec<String>,
}

impl BindingCollector {
    pub fn params(params: &FormalParameters<'_>) -> Vec<String> {
        let mut collector = BindingCollector::default();
        collector.visit_formal_parameters(params);
        collector.names
    }

    /// Names declared directly in a function body.
    pub fn body(body: &FunctionBody<'_>) -> Vec<String> {
        let mut collector = BindingCollector::default();
        for stmt in &body.statements {
            collector.visit_statement(stmt);
        }
        collector.names
    }
}

/// Names bound by a parameter list written as source, e.g. a `v-for` alias or slot props.
pub fn parameter_names(params: &str) -> Result<Vec<String>, String> {
    let allocator = Allocator::default();
    let source = format!("({params}) => 0");
    let expr = Parser::new(&allocator, &source, SourceType::mjs())
        .parse_expression()
        .map_err(|errors| {
            errors
                .first()
                .map(|e| e.to_string())
                .unwrap_or_else(|| format!("invalid parameter list `{params}`"))
        })?;
    match &expr {
        Expression::ArrowFunctionExpression(arrow) => Ok(BindingCollector::params(&arrow.params)),
        _ => Err(format!("invalid parameter list `{params}`")),
    }
}

impl<'a> Visit<'a> for BindingCollector {
    fn visit_binding_identifier(&mut self, ident: &BindingIdentifier<'a>) {
        self.names.push(ident.name.to_string());
    }

    // Default values may reference outer names but bind nothing.
    fn visit_expression(&mut self, _expr: &oxc_ast::ast::Expression<'a>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_destructured_parameters() {
        let allocator = Allocator::default();
        let expr = Parser::new(&allocator, "({ a, b: [c] }, d = e) => a", SourceType::mjs())
            .parse_expression()
            .unwrap();
        let Expression::ArrowFunctionExpression(arrow) = &expr else {
            panic!("expected arrow");
        };
        assert_eq!(BindingCollector::params(&arrow.params), vec!["a", "c", "d"]);
    }

    #[test]
    fn parameter_names_from_source() {
        assert_eq!(parameter_names("item, index").unwrap(), vec!["item", "index"]);
        assert_eq!(parameter_names("{ row, col: c }").unwrap(), vec!["row", "c"]);
        assert!(parameter_names("a +").is_err());
    }

    #[test]
    fn template_scope_lookup() {
        let mut scope = TemplateScope::default();
        scope.push(vec!["item".into(), "index".into()]);
        assert!(scope.contains("item"));
        scope.pop();
        assert!(!scope.contains("item"));
        assert!(is_global("Math") && is_global("$setup"));
        assert!(!is_global("value"));
    }
}
