//! Node transforms.
//!
//! One depth-first walk over the template applies, per node and in this order:
//! pipe desugaring, identifier resolution, imported-component promotion, the
//! `v-model` expansion and the `this` rewrite. Scope variables introduced by
//! `v-for` and `v-slot` are live for the element that declares them and its
//! descendants.

use indexmap::{IndexMap, IndexSet};
use lazy_static::lazy_static;
use oxc_allocator::Allocator;
use oxc_ast::ast::Expression;
use oxc_parser::Parser;
use oxc_span::SourceType;
use regex::Regex;

use crate::ast::{
    DirectiveNode, ElementNode, ElementType, ExpressionNode, InterpolationNode, PropKey, PropNode,
    RootNode, RuntimeHelper, SimpleExpression, SourceLocation, TemplateNode,
};
use crate::casing::camelize;
use crate::diagnostics::{
    CompileResult, CompilerError, PRANG_DIRECTIVE_ELSE_WITHOUT_IF, PRANG_DIRECTIVE_MALFORMED_FOR,
    PRANG_DIRECTIVE_NO_EXPRESSION, PRANG_PARSE_INVALID_EXPRESSION, PRANG_W_UNRESOLVED_FILTER,
};
use crate::meta::{BindingMetadata, FieldBinding};
use crate::pipe::desugar_pipes;
use crate::promote::promote_imported_component;
use crate::registry::TemplateImports;
use crate::renamer::{rename_expression, RenameContext};
use crate::scope::{parameter_names, TemplateScope};
use crate::this_ref::rewrite_this;
use crate::visitor::{walk_children, walk_element, TemplateVisitor};

lazy_static! {
    static ref FOR_ALIAS: Regex = Regex::new(r"^([\s\S]*?)\s+(?:in|of)\s+(\S[\s\S]*)$").unwrap();
}

/// Directives with a meaning of their own; anything else is a custom directive.
const BUILTIN_DIRECTIVES: &[&str] = &[
    "bind", "on", "model", "if", "else-if", "else", "for", "slot", "show", "html", "text", "once",
    "pre", "memo", "cloak",
];

const NEEDS_EXPRESSION: &[&str] = &["if", "else-if", "for", "show", "html", "text"];

pub fn is_builtin_directive(name: &str) -> bool {
    BUILTIN_DIRECTIVES.contains(&name)
}

// ═══════════════════════════════════════════════════════════════════════════════
// V-FOR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForParts<'s> {
    /// Alias list without surrounding parentheses, e.g. `item, index`.
    pub aliases: &'s str,
    pub source: &'s str,
    /// Byte offset of `source` within the directive value.
    pub source_offset: usize,
}

/// Splits `(item, index) in list`.
pub fn parse_for_expression(content: &str) -> Option<ForParts<'_>> {
    let caps = FOR_ALIAS.captures(content)?;
    let lhs = caps.get(1)?.as_str().trim();
    let source = caps.get(2)?;
    let aliases = lhs
        .strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
        .unwrap_or(lhs)
        .trim();
    let source_text = source.as_str().trim_end();
    if aliases.is_empty() || source_text.is_empty() {
        return None;
    }
    Some(ForParts {
        aliases,
        source: source_text,
        source_offset: source.start(),
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// DRIVER
// ═══════════════════════════════════════════════════════════════════════════════

pub struct TransformOptions<'a> {
    pub filename: &'a str,
    pub imports: &'a TemplateImports,
    /// Field roles of the owning class, used to reject `v-model` on inputs.
    pub fields: &'a [FieldBinding],
}

/// Runs every node transform over `root`. Returns the non-fatal diagnostics.
pub fn transform_root(root: &mut RootNode, options: &TransformOptions<'_>) -> CompileResult<Vec<CompilerError>> {
    let mut transformer = NodeTransformer {
        filename: options.filename,
        imports: options.imports,
        fields: options.fields,
        bindings: root.bindings.clone(),
        scope: TemplateScope::default(),
        components: IndexSet::new(),
        filters: IndexMap::new(),
        directives: IndexSet::new(),
        helpers: IndexSet::new(),
        warnings: Vec::new(),
    };
    transformer.visit_root(root)?;

    root.components.extend(transformer.components);
    root.filters.extend(transformer.filters);
    root.directives.extend(transformer.directives);
    root.helpers.extend(transformer.helpers);
    tracing::debug!(
        file = options.filename,
        components = root.components.len(),
        filters = root.filters.len(),
        warnings = transformer.warnings.len(),
        "template transformed"
    );
    Ok(transformer.warnings)
}

pub(crate) struct NodeTransformer<'a> {
    pub(crate) filename: &'a str,
    pub(crate) imports: &'a TemplateImports,
    pub(crate) fields: &'a [FieldBinding],
    pub(crate) bindings: BindingMetadata,
    pub(crate) scope: TemplateScope,
    components: IndexSet<String>,
    filters: IndexMap<String, bool>,
    directives: IndexSet<String>,
    pub(crate) helpers: IndexSet<RuntimeHelper>,
    warnings: Vec<CompilerError>,
}

impl<'a> NodeTransformer<'a> {
    pub(crate) fn error(&self, code: &str, message: impl Into<String>, loc: &SourceLocation) -> CompilerError {
        CompilerError::at(code, message, loc, self.filename)
    }

    /// Resolves the free identifiers of `source` against bindings and scope.
    pub(crate) fn rename(
        &mut self,
        source: &str,
        loc: &SourceLocation,
        pipes: &IndexSet<String>,
    ) -> CompileResult<String> {
        let ctx = RenameContext {
            bindings: &self.bindings,
            scope: &self.scope,
            pipes,
        };
        let renamed = rename_expression(source, &ctx).map_err(|message| {
            self.error(
                PRANG_PARSE_INVALID_EXPRESSION,
                format!("Invalid expression `{}`: {message}", source.trim()),
                loc,
            )
        })?;
        self.helpers.extend(renamed.helpers);
        for name in renamed.filters {
            self.register_filter(&name, loc);
        }
        Ok(renamed.content)
    }

    fn register_filter(&mut self, name: &str, loc: &SourceLocation) {
        if self.filters.contains_key(name) {
            return;
        }
        let resolved = self.imports.pipe_for(name).is_some();
        self.filters.insert(name.to_string(), resolved);
        self.helpers.insert(RuntimeHelper::ResolveFilter);
        if !resolved {
            tracing::warn!(file = self.filename, pipe = name, "unresolved pipe, falling back to runtime lookup");
            self.warnings.push(
                self.error(
                    PRANG_W_UNRESOLVED_FILTER,
                    format!("Pipe `{name}` is not provided by any resolved import"),
                    loc,
                )
                .into_warning(),
            );
        }
    }

    /// Pipe desugaring followed by identifier resolution, once per expression.
    fn process_expression(&mut self, exp: &mut SimpleExpression, allow_pipes: bool) -> CompileResult<()> {
        if exp.resolved || exp.is_static {
            return Ok(());
        }
        if allow_pipes {
            let desugared = desugar_pipes(&exp.content).map_err(|message| {
                self.error(
                    PRANG_PARSE_INVALID_EXPRESSION,
                    format!("Invalid expression `{}`: {message}", exp.content.trim()),
                    &exp.loc,
                )
            })?;
            if let Some(desugared) = desugared {
                exp.content = desugared.content;
                exp.pipes.extend(desugared.pipes);
            }
        }
        let pipes = exp.pipes.clone();
        exp.content = self.rename(&exp.content, &exp.loc, &pipes)?;
        exp.resolved = true;
        Ok(())
    }

    fn rewrite_this_in(&self, exp: &mut SimpleExpression) -> CompileResult<()> {
        if exp.is_static {
            return Ok(());
        }
        let rewritten = rewrite_this(&exp.content).map_err(|message| {
            self.error(
                PRANG_PARSE_INVALID_EXPRESSION,
                format!("Invalid expression `{}`: {message}", exp.content.trim()),
                &exp.loc,
            )
        })?;
        if let Some(content) = rewritten {
            exp.content = content;
        }
        Ok(())
    }

    fn rewrite_this_in_node(&self, exp: &mut ExpressionNode) -> CompileResult<()> {
        for part in exp.simple_parts_mut() {
            self.rewrite_this_in(part)?;
        }
        Ok(())
    }

    /// `v-for`: resolves the source in the enclosing scope, then opens a frame for the aliases.
    fn enter_for(&mut self, dir: &mut DirectiveNode) -> CompileResult<bool> {
        let Some(ExpressionNode::Simple(exp)) = dir.exp.as_mut() else {
            return Ok(false);
        };
        let Some(parts) = parse_for_expression(&exp.content) else {
            return Err(self.error(
                PRANG_DIRECTIVE_MALFORMED_FOR,
                format!("`v-for` expects `alias in source`, got `{}`", exp.content),
                &exp.loc,
            ));
        };
        let aliases = parts.aliases.to_string();
        let names = parameter_names(&aliases).map_err(|message| {
            self.error(PRANG_DIRECTIVE_MALFORMED_FOR, format!("Invalid `v-for` alias: {message}"), &exp.loc)
        })?;

        let source_start = exp.loc.start.advance(&exp.content[..parts.source_offset]);
        let source_loc = SourceLocation::new(source_start, source_start.advance(parts.source), parts.source);
        let mut source = SimpleExpression::new(parts.source, false, source_loc);
        self.process_expression(&mut source, false)?;
        self.rewrite_this_in(&mut source)?;

        exp.content = format!("({aliases}) in {}", source.content);
        exp.resolved = true;
        self.scope.push(names);
        Ok(true)
    }

    /// `v-slot="{ item }"`: slot props become scope variables.
    fn enter_slot(&mut self, dir: &mut DirectiveNode) -> CompileResult<bool> {
        let Some(ExpressionNode::Simple(exp)) = dir.exp.as_mut() else {
            return Ok(false);
        };
        if exp.is_empty() {
            return Ok(false);
        }
        let names = parameter_names(&exp.content).map_err(|message| {
            self.error(PRANG_PARSE_INVALID_EXPRESSION, format!("Invalid slot props: {message}"), &exp.loc)
        })?;
        exp.resolved = true;
        self.scope.push(names);
        Ok(true)
    }

    fn transform_directive(&mut self, dir: &mut DirectiveNode) -> CompileResult<()> {
        if NEEDS_EXPRESSION.contains(&dir.name.as_str()) && dir.exp.as_ref().map_or(true, |e| e.render().trim().is_empty()) {
            return Err(self.error(
                PRANG_DIRECTIVE_NO_EXPRESSION,
                format!("`{}` requires an expression", dir.raw_name),
                &dir.loc,
            ));
        }

        if let Some(arg) = dir.arg.as_mut() {
            self.process_expression(arg, false)?;
            self.rewrite_this_in(arg)?;
        }

        match dir.name.as_str() {
            "for" | "slot" | "model" | "else" => return Ok(()),
            "bind" if dir.exp.is_none() => {
                // `:title` is shorthand for `:title="title"`.
                if let Some(arg) = dir.arg.as_ref().filter(|arg| arg.is_static) {
                    dir.exp = Some(ExpressionNode::Simple(SimpleExpression::new(
                        camelize(&arg.content),
                        false,
                        arg.loc.clone(),
                    )));
                }
            }
            "on" => {
                if let Some(ExpressionNode::Simple(exp)) = dir.exp.as_mut() {
                    if !exp.is_empty() && !is_handler_reference(&exp.content) {
                        exp.content = if exp.content.contains(';') {
                            format!("$event => {{{}}}", exp.content)
                        } else {
                            format!("$event => ({})", exp.content)
                        };
                    }
                }
            }
            name if !is_builtin_directive(name) => {
                self.directives.insert(name.to_string());
                self.helpers.insert(RuntimeHelper::ResolveDirective);
                self.helpers.insert(RuntimeHelper::WithDirectives);
            }
            _ => {}
        }

        if let Some(exp) = dir.exp.as_mut() {
            for part in exp.simple_parts_mut() {
                self.process_expression(part, true)?;
            }
        }
        Ok(())
    }

    /// `v-else`/`v-else-if` must directly follow a `v-if` or `v-else-if` sibling.
    fn check_conditional_chains(&self, children: &[TemplateNode]) -> CompileResult<()> {
        let mut previous: Option<&ElementNode> = None;
        for node in children {
            match node {
                TemplateNode::Element(el) => {
                    for name in ["else", "else-if"] {
                        if let Some(dir) = el.directive(name) {
                            let chained = previous
                                .map_or(false, |prev| prev.directive("if").is_some() || prev.directive("else-if").is_some());
                            if !chained {
                                return Err(self.error(
                                    PRANG_DIRECTIVE_ELSE_WITHOUT_IF,
                                    format!("`{}` has no adjacent `v-if` or `v-else-if`", dir.raw_name),
                                    &dir.loc,
                                ));
                            }
                        }
                    }
                    previous = Some(el);
                }
                TemplateNode::Text(_) if node.is_whitespace() => {}
                _ => previous = None,
            }
        }
        Ok(())
    }
}

impl<'a> TemplateVisitor for NodeTransformer<'a> {
    fn visit_children(&mut self, children: &mut Vec<TemplateNode>) -> CompileResult<()> {
        self.check_conditional_chains(children)?;
        walk_children(self, children)
    }

    fn visit_element(&mut self, element: &mut ElementNode) -> CompileResult<()> {
        let mut frames = 0;
        for prop in element.props.iter_mut() {
            if let PropNode::Directive(dir) = prop {
                let opened = match dir.name.as_str() {
                    "for" => self.enter_for(dir)?,
                    "slot" => self.enter_slot(dir)?,
                    _ => false,
                };
                frames += usize::from(opened);
            }
        }

        for prop in element.props.iter_mut() {
            if let PropNode::Directive(dir) = prop {
                self.transform_directive(dir)?;
            }
        }

        promote_imported_component(element, self.imports);
        if element.tag_type == ElementType::Component
            && RuntimeHelper::core_component(&element.tag).is_none()
            && element.tag != "component"
        {
            self.components.insert(element.tag.clone());
            self.helpers.insert(RuntimeHelper::ResolveComponent);
        }

        self.transform_model(element)?;

        for prop in element.props.iter_mut() {
            match prop {
                PropNode::Directive(dir) if !matches!(dir.name.as_str(), "for" | "slot") => {
                    if let Some(exp) = dir.exp.as_mut() {
                        self.rewrite_this_in_node(exp)?;
                    }
                }
                PropNode::Generated(generated) => {
                    self.rewrite_this_in_node(&mut generated.value)?;
                    if let PropKey::Dynamic { expression } = &mut generated.key {
                        self.rewrite_this_in_node(expression)?;
                    }
                }
                _ => {}
            }
        }
        for directive in element.runtime_directives.iter_mut() {
            if let Some(value) = directive.value.as_mut() {
                self.rewrite_this_in_node(value)?;
            }
        }

        walk_element(self, element)?;
        for _ in 0..frames {
            self.scope.pop();
        }
        Ok(())
    }

    fn visit_interpolation(&mut self, interpolation: &mut InterpolationNode) -> CompileResult<()> {
        if interpolation.content.render().trim().is_empty() {
            return Err(self.error(
                PRANG_PARSE_INVALID_EXPRESSION,
                "Interpolation is empty",
                &interpolation.loc,
            ));
        }
        for part in interpolation.content.simple_parts_mut() {
            self.process_expression(part, true)?;
        }
        self.rewrite_this_in_node(&mut interpolation.content)
    }
}

/// Handler value that is already callable: a path like `onSave` / `this.save`, or a function.
fn is_handler_reference(source: &str) -> bool {
    let allocator = Allocator::default();
    let Ok(expr) = Parser::new(&allocator, source, SourceType::mjs()).parse_expression() else {
        return false;
    };
    matches!(
        expr,
        Expression::Identifier(_) | Expression::ArrowFunctionExpression(_) | Expression::FunctionExpression(_)
    ) || expr.is_member_expression()
}
