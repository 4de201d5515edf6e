//! `this` qualifier rewrite for template expressions.
//!
//! `this.x` and bare `this` both refer to the component instance, which the
//! render function receives as `$setup`. Only the `this` tokens are replaced;
//! every other byte of the expression is kept.

use oxc_allocator::Allocator;
use oxc_ast::ast::{Function, ThisExpression};
use oxc_ast_visit::Visit;
use oxc_parser::Parser;
use oxc_span::SourceType;
use oxc_syntax::scope::ScopeFlags;

use crate::edit::EditList;
use crate::renamer::SETUP_IDENTIFIER;

/// `Ok(None)` when `source` does not use `this` at template level.
pub fn rewrite_this(source: &str) -> Result<Option<String>, String> {
    if !source.contains("this") {
        return Ok(None);
    }
    let allocator = Allocator::default();
    let expr = Parser::new(&allocator, source, SourceType::mjs())
        .parse_expression()
        .map_err(|errors| {
            errors
                .first()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "invalid expression".to_string())
        })?;

    let mut finder = ThisFinder { edits: EditList::new() };
    finder.visit_expression(&expr);
    if finder.edits.is_empty() {
        return Ok(None);
    }
    finder.edits.apply(source).map(Some).map_err(|e| e.to_string())
}

struct ThisFinder {
    edits: EditList,
}

impl<'a> Visit<'a> for ThisFinder {
    fn visit_this_expression(&mut self, expr: &ThisExpression) {
        self.edits.replace(expr.span.start, expr.span.end, SETUP_IDENTIFIER);
    }

    // A non-arrow function has its own `this`.
    fn visit_function(&mut self, _func: &Function<'a>, _flags: ScopeFlags) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewrite(source: &str) -> String {
        rewrite_this(source).unwrap().unwrap_or_else(|| source.to_string())
    }

    #[test]
    fn member_and_bare_this() {
        assert_eq!(rewrite("this.count + 1"), "$setup.count + 1");
        assert_eq!(rewrite("format(this)"), "format($setup)");
    }

    #[test]
    fn formatting_outside_this_is_kept() {
        assert_eq!(rewrite("a  +\n  this.b  /*c*/"), "a  +\n  $setup.b  /*c*/");
    }

    #[test]
    fn arrow_functions_share_this_but_functions_do_not() {
        assert_eq!(rewrite("() => this.x"), "() => $setup.x");
        assert_eq!(
            rewrite("function () { return this.x }"),
            "function () { return this.x }"
        );
    }

    #[test]
    fn rewrite_is_idempotent() {
        let once = rewrite("this.a(this.b, `${this.c}`)");
        assert_eq!(once, "$setup.a($setup.b, `${$setup.c}`)");
        assert_eq!(rewrite(&once), once);
    }

    #[test]
    fn identifiers_containing_this_are_untouched() {
        assert!(rewrite_this("thisValue + other.this").unwrap().is_none());
    }
}
