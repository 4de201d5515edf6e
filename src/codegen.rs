//! Render function generation.
//!
//! Emits a transformed template tree as a render function for the runtime
//! module, either as a standalone `export function render` (module mode) or as
//! an arrow expression to be returned from `setup` (inline mode). Every node and
//! expression written out records a source map segment pointing back at its
//! template location.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::ast::{
    CompoundPart, DirectiveNode, ElementNode, ElementType, ExpressionNode, PropKey, PropNode, RootNode,
    RuntimeHelper, SimpleExpression, SourceLocation, TemplateNode,
};
use crate::casing::{camelize, capitalize, to_handler_key, to_valid_identifier};
use crate::model::modifiers_object;
use crate::renamer::filter_alias;
use crate::sourcemap::{OutputCursor, SourceMap, SourceMapGenerator};
use crate::transform::{is_builtin_directive, parse_for_expression};

const MODULE_RENDER_PARAMS: &str = "_ctx, _cache, $props, $setup, $data, $options";
const INLINE_RENDER_PARAMS: &str = "_ctx, _cache";

// ═══════════════════════════════════════════════════════════════════════════════
// OPTIONS / RESULT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CodegenMode {
    #[default]
    Module,
    Inline,
}

#[derive(Debug, Clone)]
pub struct CodegenOptions<'a> {
    pub mode: CodegenMode,
    pub runtime_module: &'a str,
    /// Source name recorded in the map. `None` skips map generation.
    pub source_map: Option<&'a str>,
}

#[derive(Debug, Clone, Default)]
pub struct CodegenResult {
    /// Module mode: helper import plus `export function render`. Inline mode: the arrow only.
    pub code: String,
    /// The helper import line on its own.
    pub preamble: String,
    pub map: Option<SourceMap>,
    pub helpers: IndexSet<RuntimeHelper>,
}

pub fn generate(root: &RootNode, options: &CodegenOptions<'_>) -> CodegenResult {
    let mut gen = Generator {
        writer: CodeWriter::default(),
        helpers: IndexSet::new(),
    };
    match options.mode {
        CodegenMode::Module => gen.writer.push(&format!("export function render({MODULE_RENDER_PARAMS}) {{")),
        CodegenMode::Inline => gen.writer.push(&format!("({INLINE_RENDER_PARAMS}) => {{")),
    }
    gen.writer.indent += 1;
    gen.gen_assets(root);
    gen.writer.newline();
    gen.writer.push("return ");
    gen.gen_root(root);
    gen.writer.deindent();
    gen.writer.push("}");

    let mut helpers = gen.helpers;
    helpers.extend(root.helpers.iter().copied());
    helpers.sort();
    let preamble = helper_import(&helpers, options.runtime_module);

    let body = gen.writer.code;
    let (code, line_offset) = match options.mode {
        CodegenMode::Module if !preamble.is_empty() => (format!("{preamble}\n\n{body}"), 2),
        _ => (body, 0),
    };

    let map = options.source_map.and_then(|name| {
        let mut generator = SourceMapGenerator::new(None);
        let source_index = generator.add_source(name, Some(root.source.clone()));
        for mapping in &gen.writer.mappings {
            generator.add_mapping(
                mapping.line0 + line_offset,
                mapping.col0,
                source_index,
                mapping.source_line0,
                mapping.source_col0,
            );
        }
        generator.to_json()
    });

    tracing::trace!(file = %root.filename, helpers = helpers.len(), "render function generated");
    CodegenResult {
        code,
        preamble,
        map,
        helpers,
    }
}

/// `import { createVNode as _createVNode } from "<runtime>"`
pub fn helper_import(helpers: &IndexSet<RuntimeHelper>, runtime_module: &str) -> String {
    if helpers.is_empty() {
        return String::new();
    }
    let specifiers: Vec<String> = helpers
        .iter()
        .map(|helper| format!("{} as {}", helper.name(), helper.alias()))
        .collect();
    format!("import {{ {} }} from {}", specifiers.join(", "), js_string(runtime_module))
}

pub fn component_alias(tag: &str) -> String {
    format!("_component_{}", to_valid_identifier(tag))
}

pub fn directive_alias(name: &str) -> String {
    format!("_directive_{}", to_valid_identifier(name))
}

pub(crate) fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\""))
}

fn is_simple_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn object_key(name: &str) -> String {
    if is_simple_identifier(name) {
        name.to_string()
    } else {
        js_string(name)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// WRITER
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy)]
struct Mapping {
    line0: u32,
    col0: u32,
    source_line0: u32,
    source_col0: u32,
}

#[derive(Debug, Default)]
struct CodeWriter {
    code: String,
    cursor: OutputCursor,
    mappings: Vec<Mapping>,
    indent: usize,
}

impl CodeWriter {
    fn push(&mut self, text: &str) {
        self.cursor.advance(text);
        self.code.push_str(text);
    }

    fn push_mapped(&mut self, text: &str, loc: &SourceLocation) {
        // Line 0 marks a location that never came from the template.
        if loc.start.line > 0 {
            self.mappings.push(Mapping {
                line0: self.cursor.line0,
                col0: self.cursor.col0,
                source_line0: loc.start.line - 1,
                source_col0: loc.start.column.saturating_sub(1),
            });
        }
        self.push(text);
    }

    fn newline(&mut self) {
        self.push("\n");
        let pad = "  ".repeat(self.indent);
        self.push(&pad);
    }

    fn indent(&mut self) {
        self.indent += 1;
        self.newline();
    }

    fn deindent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
        self.newline();
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHILD GROUPING
// ═══════════════════════════════════════════════════════════════════════════════

enum Item<'r> {
    /// Adjacent text and interpolations, concatenated into one string.
    Text(Vec<&'r TemplateNode>),
    /// A `v-if` element followed by its `v-else-if`/`v-else` siblings.
    Branches(Vec<&'r ElementNode>),
    Element(&'r ElementNode),
}

impl Item<'_> {
    fn is_whitespace(&self) -> bool {
        matches!(self, Item::Text(run) if run.iter().all(|node| node.is_whitespace()))
    }
}

fn group_children<'r>(children: &[&'r TemplateNode]) -> Vec<Item<'r>> {
    let mut items = Vec::new();
    let mut i = 0;
    while i < children.len() {
        match children[i] {
            TemplateNode::Element(el) if el.directive("if").is_some() => {
                let mut branches = vec![el];
                i += 1;
                loop {
                    let mut next = i;
                    while next < children.len() && children[next].is_whitespace() {
                        next += 1;
                    }
                    let Some(TemplateNode::Element(sibling)) = children.get(next).copied() else {
                        break;
                    };
                    let is_else = sibling.directive("else").is_some();
                    if !is_else && sibling.directive("else-if").is_none() {
                        break;
                    }
                    branches.push(sibling);
                    i = next + 1;
                    if is_else {
                        break;
                    }
                }
                items.push(Item::Branches(branches));
            }
            TemplateNode::Element(el) => {
                items.push(Item::Element(el));
                i += 1;
            }
            _ => {
                let mut run = Vec::new();
                while let Some(node) = children.get(i).copied() {
                    if matches!(node, TemplateNode::Element(_)) {
                        break;
                    }
                    run.push(node);
                    i += 1;
                }
                items.push(Item::Text(run));
            }
        }
    }

    while items.first().map_or(false, Item::is_whitespace) {
        items.remove(0);
    }
    while items.last().map_or(false, Item::is_whitespace) {
        items.pop();
    }
    items
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROPS
// ═══════════════════════════════════════════════════════════════════════════════

enum EntryKey<'r> {
    Static(String),
    /// `[prefix arg suffix]`
    ComputedArg {
        prefix: String,
        arg: &'r SimpleExpression,
        suffix: &'static str,
    },
    Computed(&'r ExpressionNode),
    Spread,
}

enum EntryValue<'r> {
    Literal(String),
    Expression(&'r ExpressionNode),
    Display(&'r ExpressionNode),
    Handler {
        exp: Option<&'r ExpressionNode>,
        modifiers: Vec<String>,
        keys: Vec<String>,
    },
    Merged(Vec<EntryValue<'r>>),
}

struct PropEntry<'r> {
    key: EntryKey<'r>,
    value: EntryValue<'r>,
    loc: &'r SourceLocation,
}

const EVENT_OPTION_MODIFIERS: &[&str] = &["passive", "once", "capture"];
const NON_KEY_MODIFIERS: &[&str] = &["stop", "prevent", "self", "ctrl", "shift", "alt", "meta", "exact", "middle"];

fn is_keyboard_event(event: &str) -> bool {
    matches!(event, "keyup" | "keydown" | "keypress")
}

/// Keys whose repeated occurrences are merged into an array the runtime normalizes.
fn is_mergeable_key(key: &str) -> bool {
    key == "class" || key == "style" || (key.starts_with("on") && key.len() > 2)
}

struct EventModifiers {
    options: Vec<String>,
    event: Vec<String>,
    keys: Vec<String>,
}

fn classify_modifiers(event: Option<&str>, modifiers: &[String]) -> EventModifiers {
    let keyboard = event.map_or(true, is_keyboard_event);
    let mut out = EventModifiers {
        options: Vec::new(),
        event: Vec::new(),
        keys: Vec::new(),
    };
    for modifier in modifiers {
        let name = modifier.as_str();
        if EVENT_OPTION_MODIFIERS.contains(&name) {
            out.options.push(modifier.clone());
        } else if NON_KEY_MODIFIERS.contains(&name) || (!keyboard && matches!(name, "left" | "right")) {
            out.event.push(modifier.clone());
        } else if keyboard {
            out.keys.push(modifier.clone());
        }
    }
    out
}

fn prop_entries<'r>(el: &'r ElementNode, skip: &[&str]) -> Vec<PropEntry<'r>> {
    let mut entries: Vec<PropEntry<'r>> = Vec::new();
    for prop in &el.props {
        let entry = match prop {
            PropNode::Attribute(attr) => {
                if skip.contains(&attr.name.as_str()) {
                    continue;
                }
                let value = attr
                    .value
                    .as_ref()
                    .map(|text| js_string(&text.content))
                    .unwrap_or_else(|| "\"\"".to_string());
                PropEntry {
                    key: EntryKey::Static(attr.name.clone()),
                    value: EntryValue::Literal(value),
                    loc: &attr.loc,
                }
            }
            PropNode::Directive(dir) => match directive_entry(dir, skip) {
                Some(entry) => entry,
                None => continue,
            },
            PropNode::Generated(generated) => PropEntry {
                key: match &generated.key {
                    PropKey::Static { name } => EntryKey::Static(name.clone()),
                    PropKey::Dynamic { expression } => EntryKey::Computed(expression),
                },
                value: EntryValue::Expression(&generated.value),
                loc: &generated.loc,
            },
        };

        if let EntryKey::Static(name) = &entry.key {
            if is_mergeable_key(name) {
                let existing = entries
                    .iter_mut()
                    .find(|e| matches!(&e.key, EntryKey::Static(other) if other == name));
                if let Some(existing) = existing {
                    let previous = std::mem::replace(&mut existing.value, EntryValue::Merged(Vec::new()));
                    let mut values = match previous {
                        EntryValue::Merged(values) => values,
                        other => vec![other],
                    };
                    values.push(entry.value);
                    existing.value = EntryValue::Merged(values);
                    continue;
                }
            }
        }
        entries.push(entry);
    }
    entries
}

fn directive_entry<'r>(dir: &'r DirectiveNode, skip: &[&str]) -> Option<PropEntry<'r>> {
    let loc = &dir.loc;
    match dir.name.as_str() {
        "bind" => {
            let exp = dir.exp.as_ref()?;
            let key = match &dir.arg {
                None => EntryKey::Spread,
                Some(arg) if arg.is_static => {
                    if skip.contains(&arg.content.as_str()) {
                        return None;
                    }
                    if dir.modifiers.iter().any(|m| m == "camel") {
                        EntryKey::Static(camelize(&arg.content))
                    } else {
                        EntryKey::Static(arg.content.clone())
                    }
                }
                Some(arg) => EntryKey::ComputedArg {
                    prefix: String::new(),
                    arg,
                    suffix: " || \"\"",
                },
            };
            Some(PropEntry {
                key,
                value: EntryValue::Expression(exp),
                loc,
            })
        }
        "on" => {
            let arg = dir.arg.as_ref()?;
            let event = arg.is_static.then_some(arg.content.as_str());
            let mods = classify_modifiers(event, &dir.modifiers);
            let key = match event {
                Some(event) => {
                    let event = match event {
                        "click" if dir.modifiers.iter().any(|m| m == "right") => "contextmenu",
                        "click" if dir.modifiers.iter().any(|m| m == "middle") => "mouseup",
                        other => other,
                    };
                    let mut key = to_handler_key(event);
                    for option in &mods.options {
                        key.push_str(&capitalize(option));
                    }
                    EntryKey::Static(key)
                }
                None => EntryKey::ComputedArg {
                    prefix: format!("{}(", RuntimeHelper::ToHandlerKey.alias()),
                    arg,
                    suffix: ")",
                },
            };
            let exp = dir.exp.as_ref().filter(|exp| !exp.render().trim().is_empty());
            Some(PropEntry {
                key,
                value: EntryValue::Handler {
                    exp,
                    modifiers: mods.event,
                    keys: mods.keys,
                },
                loc,
            })
        }
        "html" => Some(PropEntry {
            key: EntryKey::Static("innerHTML".to_string()),
            value: EntryValue::Expression(dir.exp.as_ref()?),
            loc,
        }),
        "text" => Some(PropEntry {
            key: EntryKey::Static("textContent".to_string()),
            value: EntryValue::Display(dir.exp.as_ref()?),
            loc,
        }),
        _ => None,
    }
}

/// Entry of a `withDirectives` array.
struct DirectiveCall<'r> {
    name: String,
    value: Option<&'r ExpressionNode>,
    arg: Option<String>,
    modifiers: Vec<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// GENERATOR
// ═══════════════════════════════════════════════════════════════════════════════

struct Generator {
    writer: CodeWriter,
    helpers: IndexSet<RuntimeHelper>,
}

impl Generator {
    fn helper(&mut self, helper: RuntimeHelper) -> String {
        self.helpers.insert(helper);
        helper.alias()
    }

    fn push(&mut self, text: &str) {
        self.writer.push(text);
    }

    fn gen_assets(&mut self, root: &RootNode) {
        let mut any = false;
        for tag in &root.components {
            let resolve = self.helper(RuntimeHelper::ResolveComponent);
            self.writer.newline();
            self.push(&format!("const {} = {resolve}({})", component_alias(tag), js_string(tag)));
            any = true;
        }
        for name in root.filters.keys() {
            let resolve = self.helper(RuntimeHelper::ResolveFilter);
            self.writer.newline();
            self.push(&format!("const {} = {resolve}({})", filter_alias(name), js_string(name)));
            any = true;
        }
        for name in &root.directives {
            let resolve = self.helper(RuntimeHelper::ResolveDirective);
            self.writer.newline();
            self.push(&format!("const {} = {resolve}({})", directive_alias(name), js_string(name)));
            any = true;
        }
        if any {
            self.push("\n");
        }
    }

    fn gen_root(&mut self, root: &RootNode) {
        let children: Vec<&TemplateNode> = root.children.iter().collect();
        let mut items = group_children(&children);
        match items.len() {
            0 => self.push("null"),
            1 => {
                if let Some(item) = items.pop() {
                    self.gen_item(&item);
                }
            }
            _ => {
                let vnode = self.helper(RuntimeHelper::CreateVNode);
                let fragment = self.helper(RuntimeHelper::Fragment);
                self.push(&format!("{vnode}({fragment}, null, "));
                self.gen_item_array(&items);
                self.push(")");
            }
        }
    }

    fn gen_item(&mut self, item: &Item<'_>) {
        match item {
            Item::Text(run) => {
                let text = self.helper(RuntimeHelper::CreateTextVNode);
                self.push(&format!("{text}("));
                self.gen_text_concat(run);
                self.push(")");
            }
            Item::Branches(branches) => self.gen_branches(branches),
            Item::Element(el) => self.gen_node(el),
        }
    }

    fn gen_item_array(&mut self, items: &[Item<'_>]) {
        if items.is_empty() {
            self.push("[]");
            return;
        }
        self.push("[");
        self.writer.indent();
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.push(",");
                self.writer.newline();
            }
            self.gen_item(item);
        }
        self.writer.deindent();
        self.push("]");
    }

    fn gen_children_array(&mut self, children: &[&TemplateNode]) {
        let items = group_children(children);
        self.gen_item_array(&items);
    }

    fn gen_text_concat(&mut self, run: &[&TemplateNode]) {
        for (i, node) in run.iter().enumerate() {
            if i > 0 {
                self.push(" + ");
            }
            match node {
                TemplateNode::Text(text) => self.writer.push_mapped(&js_string(&text.content), &text.loc),
                TemplateNode::Interpolation(interpolation) => {
                    let display = self.helper(RuntimeHelper::ToDisplayString);
                    self.writer.push_mapped(&format!("{display}("), &interpolation.loc);
                    self.gen_expression(&interpolation.content);
                    self.push(")");
                }
                TemplateNode::Element(_) => {}
            }
        }
    }

    fn gen_expression(&mut self, exp: &ExpressionNode) {
        match exp {
            ExpressionNode::Simple(simple) => self.gen_simple(simple),
            ExpressionNode::Compound(compound) => {
                for part in &compound.parts {
                    match part {
                        CompoundPart::Text { text } => self.push(text),
                        CompoundPart::Expression { expression } => self.gen_simple(expression),
                    }
                }
            }
        }
    }

    fn gen_simple(&mut self, exp: &SimpleExpression) {
        if exp.is_static {
            self.writer.push_mapped(&js_string(&exp.content), &exp.loc);
        } else {
            self.writer.push_mapped(&exp.content, &exp.loc);
        }
    }

    fn gen_branches(&mut self, branches: &[&ElementNode]) {
        let mut depth = 0;
        let mut has_else = false;
        for branch in branches {
            let condition = branch
                .directive("if")
                .or_else(|| branch.directive("else-if"))
                .and_then(|dir| dir.exp.as_ref());
            match condition {
                Some(condition) => {
                    self.push("(");
                    self.gen_expression(condition);
                    self.push(")");
                    self.writer.indent();
                    self.push("? ");
                    self.gen_node(branch);
                    self.writer.newline();
                    self.push(": ");
                    depth += 1;
                }
                None => {
                    self.gen_node(branch);
                    has_else = true;
                    break;
                }
            }
        }
        if !has_else {
            let comment = self.helper(RuntimeHelper::CreateCommentVNode);
            self.push(&format!("{comment}(\"v-if\", true)"));
        }
        self.writer.indent = self.writer.indent.saturating_sub(depth);
    }

    /// Element with its `v-for`, if any.
    fn gen_node(&mut self, el: &ElementNode) {
        let for_parts = el
            .directive("for")
            .and_then(|dir| dir.exp.as_ref().and_then(ExpressionNode::as_simple).map(|exp| (dir, exp)));
        let Some((dir, exp)) = for_parts else {
            self.gen_element(el);
            return;
        };
        let Some(parts) = parse_for_expression(&exp.content) else {
            self.gen_element(el);
            return;
        };
        let vnode = self.helper(RuntimeHelper::CreateVNode);
        let fragment = self.helper(RuntimeHelper::Fragment);
        let render_list = self.helper(RuntimeHelper::RenderList);
        self.writer
            .push_mapped(&format!("{vnode}({fragment}, null, {render_list}("), &dir.loc);
        self.writer.push_mapped(parts.source, &exp.loc);
        self.push(&format!(", ({}) => {{", parts.aliases));
        self.writer.indent();
        self.push("return ");
        self.gen_element(el);
        self.writer.deindent();
        self.push("}))");
    }

    fn gen_element(&mut self, el: &ElementNode) {
        let directives = self.runtime_directives(el);
        if !directives.is_empty() {
            let with = self.helper(RuntimeHelper::WithDirectives);
            self.push(&format!("{with}("));
        }

        match el.tag_type {
            ElementType::Slot => self.gen_slot_outlet(el),
            ElementType::Template => self.gen_fragment(el),
            ElementType::Component => self.gen_component(el),
            ElementType::NativeElement => self.gen_native(el),
        }

        if !directives.is_empty() {
            self.push(", [");
            for (i, call) in directives.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.gen_directive_call(call);
            }
            self.push("])");
        }
    }

    fn gen_native(&mut self, el: &ElementNode) {
        let vnode = self.helper(RuntimeHelper::CreateVNode);
        self.writer.push_mapped(&format!("{vnode}("), &el.loc);
        self.push(&js_string(&el.tag));
        self.push(", ");
        let entries = prop_entries(el, &[]);
        self.gen_props(&entries, "null");

        let owns_content = el.directive("html").is_some() || el.directive("text").is_some();
        let children: Vec<&TemplateNode> = el.children.iter().collect();
        let items = group_children(&children);
        if !owns_content && !items.is_empty() {
            self.push(", ");
            match items.as_slice() {
                [Item::Text(run)] => self.gen_text_concat(run),
                _ => self.gen_item_array(&items),
            }
        }
        self.push(")");
    }

    fn gen_fragment(&mut self, el: &ElementNode) {
        let vnode = self.helper(RuntimeHelper::CreateVNode);
        let fragment = self.helper(RuntimeHelper::Fragment);
        self.writer.push_mapped(&format!("{vnode}({fragment}, null, "), &el.loc);
        let children: Vec<&TemplateNode> = el.children.iter().collect();
        self.gen_children_array(&children);
        self.push(")");
    }

    fn gen_component(&mut self, el: &ElementNode) {
        let vnode = self.helper(RuntimeHelper::CreateVNode);
        self.writer.push_mapped(&format!("{vnode}("), &el.loc);
        self.gen_component_tag(el);
        self.push(", ");
        let skip: &[&str] = if el.tag == "component" { &["is"] } else { &[] };
        let entries = prop_entries(el, skip);
        let has_slots = has_slot_content(el);
        self.gen_props(&entries, "null");
        if has_slots {
            self.push(", ");
            self.gen_slots(el);
        }
        self.push(")");
    }

    fn gen_component_tag(&mut self, el: &ElementNode) {
        if let Some(core) = RuntimeHelper::core_component(&el.tag) {
            let alias = self.helper(core);
            self.push(&alias);
            return;
        }
        if el.tag != "component" {
            self.push(&component_alias(&el.tag));
            return;
        }
        if let Some(exp) = el.bound_prop("is").and_then(|dir| dir.exp.as_ref()) {
            self.gen_expression(exp);
            return;
        }
        let name = el
            .attribute("is")
            .and_then(|attr| attr.value.as_ref())
            .map(|value| value.content.clone())
            .unwrap_or_else(|| el.tag.clone());
        let resolve = self.helper(RuntimeHelper::ResolveComponent);
        self.push(&format!("{resolve}({})", js_string(&name)));
    }

    fn gen_slots(&mut self, el: &ElementNode) {
        let with_ctx = self.helper(RuntimeHelper::WithCtx);
        self.push("{");
        self.writer.indent();

        if let Some(dir) = el.directive("slot") {
            let children: Vec<&TemplateNode> = el.children.iter().collect();
            self.gen_slot_function(&with_ctx, dir.arg.as_ref(), slot_params(dir), &children);
        } else {
            let mut default: Vec<&TemplateNode> = Vec::new();
            for child in &el.children {
                let named = child
                    .as_element()
                    .filter(|child| child.tag_type == ElementType::Template)
                    .and_then(|child| child.directive("slot").map(|dir| (child, dir)));
                match named {
                    Some((template, dir)) => {
                        let children: Vec<&TemplateNode> = template.children.iter().collect();
                        self.gen_slot_function(&with_ctx, dir.arg.as_ref(), slot_params(dir), &children);
                    }
                    None => default.push(child),
                }
            }
            if default.iter().any(|node| !node.is_whitespace()) {
                self.gen_slot_function(&with_ctx, None, "", &default);
            }
        }

        self.push("_: 1");
        self.writer.deindent();
        self.push("}");
    }

    fn gen_slot_function(
        &mut self,
        with_ctx: &str,
        name: Option<&SimpleExpression>,
        params: &str,
        children: &[&TemplateNode],
    ) {
        match name {
            None => self.push("default"),
            Some(arg) if arg.is_static => self.writer.push_mapped(&object_key(&arg.content), &arg.loc),
            Some(arg) => {
                self.push("[");
                self.writer.push_mapped(&arg.content, &arg.loc);
                self.push("]");
            }
        }
        self.push(&format!(": {with_ctx}(({params}) => "));
        self.gen_children_array(children);
        self.push("),");
        self.writer.newline();
    }

    fn gen_slot_outlet(&mut self, el: &ElementNode) {
        let render_slot = self.helper(RuntimeHelper::RenderSlot);
        self.writer
            .push_mapped(&format!("{render_slot}(_ctx.$slots, "), &el.loc);
        if let Some(exp) = el.bound_prop("name").and_then(|dir| dir.exp.as_ref()) {
            self.gen_expression(exp);
        } else {
            let name = el
                .attribute("name")
                .and_then(|attr| attr.value.as_ref())
                .map(|value| value.content.as_str())
                .unwrap_or("default");
            self.push(&js_string(name));
        }

        let entries = prop_entries(el, &["name"]);
        let children: Vec<&TemplateNode> = el.children.iter().collect();
        let has_fallback = children.iter().any(|node| !node.is_whitespace());
        if !entries.is_empty() || has_fallback {
            self.push(", ");
            self.gen_props(&entries, "{}");
        }
        if has_fallback {
            self.push(", () => ");
            self.gen_children_array(&children);
        }
        self.push(")");
    }

    fn gen_props(&mut self, entries: &[PropEntry<'_>], empty: &str) {
        if entries.is_empty() {
            self.push(empty);
            return;
        }
        self.push("{ ");
        for (i, entry) in entries.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            match &entry.key {
                EntryKey::Spread => {
                    self.writer.push_mapped("...", entry.loc);
                    self.gen_entry_value(&entry.value);
                    continue;
                }
                EntryKey::Static(name) => self.writer.push_mapped(&object_key(name), entry.loc),
                EntryKey::ComputedArg { prefix, arg, suffix } => {
                    if !prefix.is_empty() {
                        self.helpers.insert(RuntimeHelper::ToHandlerKey);
                    }
                    self.writer.push_mapped(&format!("[{prefix}"), entry.loc);
                    self.gen_simple(arg);
                    self.push(&format!("{suffix}]"));
                }
                EntryKey::Computed(exp) => {
                    self.writer.push_mapped("[", entry.loc);
                    self.gen_expression(exp);
                    self.push("]");
                }
            }
            self.push(": ");
            self.gen_entry_value(&entry.value);
        }
        self.push(" }");
    }

    fn gen_entry_value(&mut self, value: &EntryValue<'_>) {
        match value {
            EntryValue::Literal(text) => self.push(text),
            EntryValue::Expression(exp) => self.gen_expression(exp),
            EntryValue::Display(exp) => {
                let display = self.helper(RuntimeHelper::ToDisplayString);
                self.push(&format!("{display}("));
                self.gen_expression(exp);
                self.push(")");
            }
            EntryValue::Handler { exp, modifiers, keys } => {
                let with_keys = (!keys.is_empty()).then(|| self.helper(RuntimeHelper::WithKeys));
                let with_modifiers = (!modifiers.is_empty()).then(|| self.helper(RuntimeHelper::WithModifiers));
                if let Some(with_keys) = &with_keys {
                    self.push(&format!("{with_keys}("));
                }
                if let Some(with_modifiers) = &with_modifiers {
                    self.push(&format!("{with_modifiers}("));
                }
                match exp {
                    Some(exp) => self.gen_expression(exp),
                    None => self.push("() => {}"),
                }
                if with_modifiers.is_some() {
                    self.push(&format!(", {})", string_array(modifiers)));
                }
                if with_keys.is_some() {
                    self.push(&format!(", {})", string_array(keys)));
                }
            }
            EntryValue::Merged(values) => {
                self.push("[");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.gen_entry_value(value);
                }
                self.push("]");
            }
        }
    }

    fn runtime_directives<'r>(&mut self, el: &'r ElementNode) -> Vec<DirectiveCall<'r>> {
        let mut calls = Vec::new();
        for prop in &el.props {
            let PropNode::Directive(dir) = prop else {
                continue;
            };
            if dir.name == "show" {
                calls.push(DirectiveCall {
                    name: self.helper(RuntimeHelper::VShow),
                    value: dir.exp.as_ref(),
                    arg: None,
                    modifiers: Vec::new(),
                });
            } else if !is_builtin_directive(&dir.name) {
                let arg = dir.arg.as_ref().map(|arg| {
                    if arg.is_static {
                        js_string(&arg.content)
                    } else {
                        arg.content.clone()
                    }
                });
                calls.push(DirectiveCall {
                    name: directive_alias(&dir.name),
                    value: dir.exp.as_ref(),
                    arg,
                    modifiers: dir.modifiers.clone(),
                });
            }
        }
        for directive in &el.runtime_directives {
            calls.push(DirectiveCall {
                name: self.helper(directive.helper),
                value: directive.value.as_ref(),
                arg: directive.arg.as_ref().map(|arg| js_string(arg)),
                modifiers: directive.modifiers.clone(),
            });
        }
        calls
    }

    /// `[dir, value, arg, modifiers]` with trailing empty slots omitted.
    fn gen_directive_call(&mut self, call: &DirectiveCall<'_>) {
        self.push("[");
        self.push(&call.name);
        let has_modifiers = !call.modifiers.is_empty();
        if call.value.is_some() || call.arg.is_some() || has_modifiers {
            self.push(", ");
            match call.value {
                Some(value) => self.gen_expression(value),
                None => self.push("void 0"),
            }
        }
        if call.arg.is_some() || has_modifiers {
            self.push(", ");
            self.push(call.arg.as_deref().unwrap_or("void 0"));
        }
        if has_modifiers {
            self.push(", ");
            self.push(&modifiers_object(&call.modifiers));
        }
        self.push("]");
    }
}

fn string_array(values: &[String]) -> String {
    let quoted: Vec<String> = values.iter().map(|value| js_string(value)).collect();
    format!("[{}]", quoted.join(","))
}

fn slot_params(dir: &DirectiveNode) -> &str {
    dir.exp
        .as_ref()
        .and_then(ExpressionNode::as_simple)
        .map(|exp| exp.content.trim())
        .unwrap_or("")
}

fn has_slot_content(el: &ElementNode) -> bool {
    el.directive("slot").is_some() || el.children.iter().any(|node| !node.is_whitespace())
}
