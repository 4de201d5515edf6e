//! Template AST.
//!
//! The parser produces this tree, the node transforms mutate it in place and
//! the code generator consumes it. Every node keeps the byte offsets of the
//! template text it came from so expressions can be spliced and mapped back.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::meta::BindingMetadata;

// ═══════════════════════════════════════════════════════════════════════════════
// LOCATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// 1-based line/column plus a 0-based byte offset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub offset: u32,
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn start() -> Self {
        Position {
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    /// Position reached after consuming `text` from `self`.
    pub fn advance(&self, text: &str) -> Position {
        let mut pos = *self;
        for ch in text.chars() {
            pos.offset += ch.len_utf8() as u32;
            if ch == '\n' {
                pos.line += 1;
                pos.column = 1;
            } else {
                pos.column += 1;
            }
        }
        pos
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub start: Position,
    pub end: Position,
    pub source: String,
}

impl SourceLocation {
    pub fn new(start: Position, end: Position, source: impl Into<String>) -> Self {
        SourceLocation {
            start,
            end,
            source: source.into(),
        }
    }

    /// Location of `source[start..end]` computed by scanning from the beginning.
    pub fn from_offsets(source: &str, start: usize, end: usize) -> Self {
        let start_pos = Position::start().advance(&source[..start]);
        let end_pos = start_pos.advance(&source[start..end]);
        SourceLocation::new(start_pos, end_pos, &source[start..end])
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXPRESSIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleExpression {
    pub content: String,
    pub is_static: bool,
    pub loc: SourceLocation,
    /// Set once identifier resolution has run; guards against double prefixing.
    pub resolved: bool,
    /// Pipe names introduced by desugaring; their callees resolve to filters.
    pub pipes: IndexSet<String>,
}

impl SimpleExpression {
    pub fn new(content: impl Into<String>, is_static: bool, loc: SourceLocation) -> Self {
        SimpleExpression {
            content: content.into(),
            is_static,
            loc,
            resolved: false,
            pipes: IndexSet::new(),
        }
    }

    /// Generated expression that must not be rewritten again.
    pub fn synthetic(content: impl Into<String>, loc: SourceLocation) -> Self {
        let mut exp = SimpleExpression::new(content, false, loc);
        exp.resolved = true;
        exp
    }

    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CompoundPart {
    Text { text: String },
    Expression { expression: SimpleExpression },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompoundExpression {
    pub parts: Vec<CompoundPart>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ExpressionNode {
    Simple(SimpleExpression),
    Compound(CompoundExpression),
}

impl ExpressionNode {
    /// Flattened source text of the expression.
    pub fn render(&self) -> String {
        match self {
            ExpressionNode::Simple(exp) => exp.content.clone(),
            ExpressionNode::Compound(exp) => exp
                .parts
                .iter()
                .map(|part| match part {
                    CompoundPart::Text { text } => text.as_str(),
                    CompoundPart::Expression { expression } => expression.content.as_str(),
                })
                .collect(),
        }
    }

    pub fn as_simple(&self) -> Option<&SimpleExpression> {
        match self {
            ExpressionNode::Simple(exp) => Some(exp),
            ExpressionNode::Compound(_) => None,
        }
    }

    /// Every simple fragment, in source order.
    pub fn simple_parts_mut(&mut self) -> Vec<&mut SimpleExpression> {
        match self {
            ExpressionNode::Simple(exp) => vec![exp],
            ExpressionNode::Compound(exp) => exp
                .parts
                .iter_mut()
                .filter_map(|part| match part {
                    CompoundPart::Expression { expression } => Some(expression),
                    CompoundPart::Text { .. } => None,
                })
                .collect(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NODES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementType {
    NativeElement,
    Component,
    Slot,
    Template,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeNode {
    pub name: String,
    pub value: Option<TextNode>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectiveNode {
    /// Normalized name without the `v-` prefix (`bind`, `on`, `model`, ...).
    pub name: String,
    pub raw_name: String,
    pub arg: Option<SimpleExpression>,
    pub exp: Option<ExpressionNode>,
    pub modifiers: Vec<String>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PropKey {
    Static { name: String },
    Dynamic { expression: ExpressionNode },
}

/// A prop produced by a directive transform instead of written by the author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedProp {
    pub key: PropKey,
    pub value: ExpressionNode,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PropNode {
    Attribute(AttributeNode),
    Directive(DirectiveNode),
    Generated(GeneratedProp),
}

/// Runtime directive attached to a native element by a transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeDirective {
    pub helper: RuntimeHelper,
    pub value: Option<ExpressionNode>,
    pub arg: Option<String>,
    pub modifiers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementNode {
    pub tag: String,
    pub tag_type: ElementType,
    pub props: Vec<PropNode>,
    pub children: Vec<TemplateNode>,
    pub is_self_closing: bool,
    pub runtime_directives: Vec<RuntimeDirective>,
    pub loc: SourceLocation,
}

impl ElementNode {
    pub fn directive(&self, name: &str) -> Option<&DirectiveNode> {
        self.props.iter().find_map(|prop| match prop {
            PropNode::Directive(dir) if dir.name == name => Some(dir),
            _ => None,
        })
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeNode> {
        self.props.iter().find_map(|prop| match prop {
            PropNode::Attribute(attr) if attr.name == name => Some(attr),
            _ => None,
        })
    }

    /// `v-bind:<name>` with a static argument.
    pub fn bound_prop(&self, name: &str) -> Option<&DirectiveNode> {
        self.props.iter().find_map(|prop| match prop {
            PropNode::Directive(dir)
                if dir.name == "bind"
                    && dir.arg.as_ref().map_or(false, |arg| arg.is_static && arg.content == name) =>
            {
                Some(dir)
            }
            _ => None,
        })
    }

    pub fn has_dynamic_keys(&self) -> bool {
        self.props.iter().any(|prop| match prop {
            PropNode::Directive(dir) if dir.name == "bind" => {
                dir.arg.as_ref().map_or(true, |arg| !arg.is_static)
            }
            _ => false,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextNode {
    pub content: String,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpolationNode {
    pub content: ExpressionNode,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TemplateNode {
    Element(ElementNode),
    Text(TextNode),
    Interpolation(InterpolationNode),
}

impl TemplateNode {
    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            TemplateNode::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn is_whitespace(&self) -> bool {
        matches!(self, TemplateNode::Text(text) if text.content.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootNode {
    pub children: Vec<TemplateNode>,
    pub source: String,
    pub filename: String,
    pub bindings: BindingMetadata,
    /// Component tags to resolve at render time, in first-use order.
    pub components: IndexSet<String>,
    /// Pipe name to whether an import resolved it.
    pub filters: IndexMap<String, bool>,
    pub directives: IndexSet<String>,
    pub helpers: IndexSet<RuntimeHelper>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// RUNTIME HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuntimeHelper {
    Fragment,
    CreateVNode,
    CreateTextVNode,
    CreateCommentVNode,
    ToDisplayString,
    RenderList,
    RenderSlot,
    ResolveComponent,
    ResolveDirective,
    ResolveFilter,
    WithDirectives,
    WithCtx,
    WithModifiers,
    WithKeys,
    ToHandlerKey,
    Unref,
    IsRef,
    VShow,
    VModelText,
    VModelCheckbox,
    VModelRadio,
    VModelSelect,
    VModelDynamic,
    Teleport,
    Suspense,
    KeepAlive,
    BaseTransition,
}

impl RuntimeHelper {
    pub fn name(&self) -> &'static str {
        match self {
            RuntimeHelper::Fragment => "Fragment",
            RuntimeHelper::CreateVNode => "createVNode",
            RuntimeHelper::CreateTextVNode => "createTextVNode",
            RuntimeHelper::CreateCommentVNode => "createCommentVNode",
            RuntimeHelper::ToDisplayString => "toDisplayString",
            RuntimeHelper::RenderList => "renderList",
            RuntimeHelper::RenderSlot => "renderSlot",
            RuntimeHelper::ResolveComponent => "resolveComponent",
            RuntimeHelper::ResolveDirective => "resolveDirective",
            RuntimeHelper::ResolveFilter => "resolveFilter",
            RuntimeHelper::WithDirectives => "withDirectives",
            RuntimeHelper::WithCtx => "withCtx",
            RuntimeHelper::WithModifiers => "withModifiers",
            RuntimeHelper::WithKeys => "withKeys",
            RuntimeHelper::ToHandlerKey => "toHandlerKey",
            RuntimeHelper::Unref => "unref",
            RuntimeHelper::IsRef => "isRef",
            RuntimeHelper::VShow => "vShow",
            RuntimeHelper::VModelText => "vModelText",
            RuntimeHelper::VModelCheckbox => "vModelCheckbox",
            RuntimeHelper::VModelRadio => "vModelRadio",
            RuntimeHelper::VModelSelect => "vModelSelect",
            RuntimeHelper::VModelDynamic => "vModelDynamic",
            RuntimeHelper::Teleport => "Teleport",
            RuntimeHelper::Suspense => "Suspense",
            RuntimeHelper::KeepAlive => "KeepAlive",
            RuntimeHelper::BaseTransition => "BaseTransition",
        }
    }

    /// Built-in component implemented by the runtime itself.
    pub fn core_component(tag: &str) -> Option<RuntimeHelper> {
        match tag {
            "Teleport" | "teleport" => Some(RuntimeHelper::Teleport),
            "Suspense" | "suspense" => Some(RuntimeHelper::Suspense),
            "KeepAlive" | "keep-alive" => Some(RuntimeHelper::KeepAlive),
            "BaseTransition" | "base-transition" => Some(RuntimeHelper::BaseTransition),
            _ => None,
        }
    }

    /// Local alias used inside generated code (`_createVNode`).
    pub fn alias(&self) -> String {
        format!("_{}", self.name())
    }
}
