//! Pipe desugaring: `value | name`, `value | name(arg)`.
//!
//! A pipe chain is a left-nested run of `|` operators whose right operands are
//! all callable (identifier, member or call). Chains are rewritten into nested
//! calls with the piped value as the first argument, so `a | f | g(1)` becomes
//! `g(f(a), 1)`. Any other `|` stays a bitwise or.

use indexmap::IndexSet;
use oxc_allocator::Allocator;
use oxc_ast::ast::{Argument, BinaryExpression, Expression};
use oxc_ast_visit::{walk, Visit};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span};
use oxc_syntax::operator::BinaryOperator;

use crate::edit::EditList;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Desugared {
    pub content: String,
    /// Identifier callees introduced by the rewrite, in order of application.
    pub pipes: IndexSet<String>,
}

/// Rewrites every pipe chain of `source`. `Ok(None)` when there is none.
pub fn desugar_pipes(source: &str) -> Result<Option<Desugared>, String> {
    let allocator = Allocator::default();
    let expr = Parser::new(&allocator, source, SourceType::mjs())
        .parse_expression()
        .map_err(|errors| {
            errors
                .first()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "invalid expression".to_string())
        })?;

    let mut finder = PipeFinder {
        source,
        edits: EditList::new(),
        pipes: IndexSet::new(),
        error: None,
    };
    finder.visit_expression(&expr);
    if let Some(error) = finder.error {
        return Err(error);
    }
    if finder.edits.is_empty() {
        return Ok(None);
    }
    let content = finder.edits.apply(source).map_err(|e| e.to_string())?;
    Ok(Some(Desugared {
        content,
        pipes: finder.pipes,
    }))
}

fn is_pipe_target(expr: &Expression<'_>) -> bool {
    matches!(expr, Expression::Identifier(_) | Expression::CallExpression(_)) || expr.is_member_expression()
}

struct PipeFinder<'s> {
    source: &'s str,
    edits: EditList,
    pipes: IndexSet<String>,
    error: Option<String>,
}

impl<'s> PipeFinder<'s> {
    fn slice(&self, span: Span) -> &'s str {
        &self.source[span.start as usize..span.end as usize]
    }

    /// Sub-expression text with its own pipe chains already rewritten.
    fn nested(&mut self, span: Span) -> String {
        let text = self.slice(span);
        match desugar_pipes(text) {
            Ok(Some(inner)) => {
                self.pipes.extend(inner.pipes);
                inner.content
            }
            Ok(None) => text.to_string(),
            Err(error) => {
                self.error.get_or_insert(error);
                text.to_string()
            }
        }
    }

    /// Splits a chain into its head value and the pipes applied to it, innermost first.
    fn chain<'e, 'a>(expr: &'e BinaryExpression<'a>) -> Option<(&'e Expression<'a>, Vec<&'e Expression<'a>>)> {
        let mut targets = vec![&expr.right];
        let mut head = &expr.left;
        while let Expression::BinaryExpression(inner) = head {
            if inner.operator != BinaryOperator::BitwiseOR {
                break;
            }
            targets.push(&inner.right);
            head = &inner.left;
        }
        if !targets.iter().all(|t| is_pipe_target(t)) {
            return None;
        }
        targets.reverse();
        Some((head, targets))
    }

    fn apply(&mut self, value: String, target: &Expression<'_>) -> String {
        match target {
            Expression::Identifier(ident) => {
                self.pipes.insert(ident.name.to_string());
                format!("{}({value})", ident.name)
            }
            Expression::CallExpression(call) => {
                let callee = match &call.callee {
                    Expression::Identifier(ident) => {
                        self.pipes.insert(ident.name.to_string());
                        ident.name.to_string()
                    }
                    other => self.slice(other.span()).to_string(),
                };
                let mut args = vec![value];
                for arg in &call.arguments {
                    let text = match arg {
                        Argument::SpreadElement(spread) => self.slice(spread.span).to_string(),
                        _ => self.nested(arg.span()),
                    };
                    args.push(text);
                }
                format!("{callee}({})", args.join(", "))
            }
            other => format!("{}({value})", self.slice(other.span())),
        }
    }
}

impl<'a, 's> Visit<'a> for PipeFinder<'s> {
    fn visit_binary_expression(&mut self, expr: &BinaryExpression<'a>) {
        if expr.operator != BinaryOperator::BitwiseOR {
            walk::walk_binary_expression(self, expr);
            return;
        }
        let Some((head, targets)) = Self::chain(expr) else {
            walk::walk_binary_expression(self, expr);
            return;
        };
        let mut value = self.nested(head.span());
        for target in targets {
            value = self.apply(value, target);
        }
        self.edits.replace(expr.span.start, expr.span.end, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desugar(source: &str) -> String {
        desugar_pipes(source).unwrap().map(|d| d.content).unwrap_or_else(|| source.to_string())
    }

    #[test]
    fn chains_are_left_associative() {
        let out = desugar_pipes("a | f | g(1)").unwrap().unwrap();
        assert_eq!(out.content, "g(f(a), 1)");
        assert_eq!(out.pipes.iter().collect::<Vec<_>>(), vec!["f", "g"]);
    }

    #[test]
    fn pipes_inside_larger_expressions() {
        assert_eq!(desugar("'Hi ' + (name | capitalize)"), "'Hi ' + (capitalize(name))");
        assert_eq!(desugar("ok ? (a | f) : b"), "ok ? (f(a)) : b");
    }

    #[test]
    fn member_callees_are_kept() {
        assert_eq!(desugar("price | this.format('EUR')"), "this.format(price, 'EUR')");
        let out = desugar_pipes("price | this.format").unwrap().unwrap();
        assert_eq!(out.content, "this.format(price)");
        assert!(out.pipes.is_empty());
    }

    #[test]
    fn pipe_arguments_are_desugared() {
        assert_eq!(desugar("a | f(b | g)"), "f(a, g(b))");
    }

    #[test]
    fn bitwise_or_with_literals_is_left_alone() {
        assert!(desugar_pipes("flags | 4").unwrap().is_none());
        assert!(desugar_pipes("a || b").unwrap().is_none());
    }

    #[test]
    fn invalid_source_is_an_error() {
        assert!(desugar_pipes("a | ").is_err());
    }
}
