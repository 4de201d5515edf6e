//! Template parser.
//!
//! Hand-written tokenizer for the component template dialect: elements,
//! attributes and directives, `{{ }}` interpolation, comments and text.
//! Directive recognition is syntactic only; what a directive means is decided
//! by the node transforms. Every node and expression keeps the byte offsets it
//! was read from.

use indexmap::{IndexMap, IndexSet};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

use crate::ast::{
    AttributeNode, DirectiveNode, ElementNode, ElementType, ExpressionNode, InterpolationNode,
    Position, PropNode, RootNode, SimpleExpression, SourceLocation, TemplateNode, TextNode,
};
use crate::diagnostics::{
    CompileResult, CompilerError, PRANG_PARSE_DUPLICATE_ATTRIBUTE, PRANG_PARSE_INVALID_EXPRESSION,
    PRANG_PARSE_MISMATCHED_END_TAG, PRANG_PARSE_UNCLOSED_TAG, PRANG_PARSE_UNEXPECTED_EOF, PRANG_PARSE_UNTERMINATED_ATTRIBUTE,
    PRANG_PARSE_UNTERMINATED_COMMENT, PRANG_PARSE_UNTERMINATED_INTERPOLATION,
};
use crate::meta::BindingMetadata;

// ═══════════════════════════════════════════════════════════════════════════════
// TAG TABLES
// ═══════════════════════════════════════════════════════════════════════════════

lazy_static! {
    static ref HTML_TAGS: HashSet<&'static str> = [
        "html", "body", "base", "head", "link", "meta", "style", "title", "address", "article",
        "aside", "footer", "header", "hgroup", "h1", "h2", "h3", "h4", "h5", "h6", "nav",
        "section", "div", "dd", "dl", "dt", "figcaption", "figure", "picture", "hr", "img", "li",
        "main", "ol", "p", "pre", "ul", "a", "b", "abbr", "bdi", "bdo", "br", "cite", "code",
        "data", "dfn", "em", "i", "kbd", "mark", "q", "rp", "rt", "ruby", "s", "samp", "small",
        "span", "strong", "sub", "sup", "time", "u", "var", "wbr", "area", "audio", "map",
        "track", "video", "embed", "object", "param", "source", "canvas", "script", "noscript",
        "del", "ins", "caption", "col", "colgroup", "table", "thead", "tbody", "td", "th", "tr",
        "button", "datalist", "fieldset", "form", "input", "label", "legend", "meter",
        "optgroup", "option", "output", "progress", "select", "textarea", "details", "dialog",
        "menu", "summary", "template", "blockquote", "iframe", "tfoot", "search", "slot",
    ]
    .into_iter()
    .collect();

    /// SVG tags, compared lowercased.
    static ref SVG_TAGS: HashSet<&'static str> = [
        "svg", "animate", "animatemotion", "animatetransform", "circle", "clippath",
        "color-profile", "defs", "desc", "discard", "ellipse", "feblend", "fecolormatrix",
        "fecomponenttransfer", "fecomposite", "feconvolvematrix", "fediffuselighting",
        "fedisplacementmap", "fedistantlight", "fedropshadow", "feflood", "fefunca", "fefuncb",
        "fefuncg", "fefuncr", "fegaussianblur", "feimage", "femerge", "femergenode",
        "femorphology", "feoffset", "fepointlight", "fespecularlighting", "fespotlight",
        "fetile", "feturbulence", "filter", "foreignobject", "g", "hatch", "hatchpath", "image",
        "line", "lineargradient", "marker", "mask", "mesh", "meshgradient", "meshpatch",
        "meshrow", "metadata", "mpath", "path", "pattern", "polygon", "polyline",
        "radialgradient", "rect", "set", "solidcolor", "stop", "switch", "symbol", "text",
        "textpath", "tspan", "unknown", "use", "view",
    ]
    .into_iter()
    .collect();

    static ref VOID_TAGS: HashSet<&'static str> = [
        "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
        "track", "wbr",
    ]
    .into_iter()
    .collect();

    static ref CORE_COMPONENTS: HashSet<&'static str> = [
        "Teleport", "teleport", "Suspense", "suspense", "KeepAlive", "keep-alive",
        "BaseTransition", "base-transition", "Transition", "transition", "TransitionGroup",
        "transition-group", "component",
    ]
    .into_iter()
    .collect();

    static ref WHITESPACE_RUN: Regex = Regex::new(r"[\t\r\n\f ]+").unwrap();
}

/// Native HTML or SVG tag name.
pub fn is_intrinsic_tag(tag: &str) -> bool {
    let lower = tag.to_ascii_lowercase();
    HTML_TAGS.contains(lower.as_str()) || SVG_TAGS.contains(lower.as_str())
}

/// Built-in component implemented by the runtime.
pub fn is_core_component(tag: &str) -> bool {
    CORE_COMPONENTS.contains(tag)
}

pub fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.contains(tag.to_ascii_lowercase().as_str())
}

fn is_raw_text_tag(tag: &str) -> bool {
    matches!(tag, "script" | "style" | "textarea")
}

const STRUCTURAL_DIRECTIVES: &[&str] = &["if", "else-if", "else", "for", "slot"];

fn classify(tag: &str, props: &[PropNode]) -> ElementType {
    if tag == "slot" {
        return ElementType::Slot;
    }
    if tag == "template" {
        let structural = props.iter().any(|prop| {
            matches!(prop, PropNode::Directive(dir) if STRUCTURAL_DIRECTIVES.contains(&dir.name.as_str()))
        });
        return if structural {
            ElementType::Template
        } else {
            ElementType::NativeElement
        };
    }
    if is_core_component(tag) {
        return ElementType::Component;
    }
    if !is_intrinsic_tag(tag) && (tag.chars().any(|c| c.is_ascii_uppercase()) || tag.contains('.')) {
        return ElementType::Component;
    }
    ElementType::NativeElement
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY POINT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    pub filename: String,
    pub bindings: BindingMetadata,
}

/// Parses template text into a root node. Fails on the first syntax error.
pub fn parse_template(source: &str, options: &ParseOptions) -> CompileResult<RootNode> {
    let mut parser = TemplateParser::new(source, &options.filename);
    let mut open = Vec::new();
    let children = parser.parse_children(&mut open, false)?;
    tracing::trace!(file = %options.filename, nodes = children.len(), "template parsed");

    Ok(RootNode {
        children,
        source: source.to_string(),
        filename: options.filename.clone(),
        bindings: options.bindings.clone(),
        components: IndexSet::new(),
        filters: IndexMap::new(),
        directives: IndexSet::new(),
        helpers: IndexSet::new(),
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// TOKENIZER
// ═══════════════════════════════════════════════════════════════════════════════

/// An element whose end tag has not been seen yet.
struct OpenTag {
    tag: String,
    start: usize,
    head_end: usize,
}

struct TemplateParser<'s> {
    source: &'s str,
    filename: &'s str,
    pos: usize,
    line_starts: Vec<usize>,
}

impl<'s> TemplateParser<'s> {
    fn new(source: &'s str, filename: &'s str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        TemplateParser {
            source,
            filename,
            pos: 0,
            line_starts,
        }
    }

    fn position(&self, offset: usize) -> Position {
        let line = self.line_starts.partition_point(|&start| start <= offset).max(1);
        let line_start = self.line_starts[line - 1];
        Position {
            offset: offset as u32,
            line: line as u32,
            column: self.source[line_start..offset].chars().count() as u32 + 1,
        }
    }

    fn loc(&self, start: usize, end: usize) -> SourceLocation {
        SourceLocation::new(self.position(start), self.position(end), &self.source[start..end])
    }

    fn error(&self, code: &str, message: impl Into<String>, start: usize, end: usize) -> CompilerError {
        CompilerError::at(code, message, &self.loc(start, end), self.filename)
    }

    fn rest(&self) -> &'s str {
        &self.source[self.pos..]
    }

    fn eof(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn starts_tag(&self) -> bool {
        let mut chars = self.rest().chars();
        chars.next() == Some('<')
            && matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '/' || c == '!')
    }

    fn parse_children(&mut self, open: &mut Vec<OpenTag>, in_pre: bool) -> CompileResult<Vec<TemplateNode>> {
        let mut nodes = Vec::new();
        loop {
            if self.eof() {
                if let Some(parent) = open.last() {
                    return Err(self.error(
                        PRANG_PARSE_UNCLOSED_TAG,
                        format!("Element <{}> is missing its end tag", parent.tag),
                        parent.start,
                        parent.head_end,
                    ));
                }
                break;
            }

            let rest = self.rest();
            if rest.starts_with("</") {
                let (name, end) = self.peek_end_tag();
                if open.last().map_or(false, |parent| parent.tag == name) {
                    break;
                }
                if let Some(parent) = open.last().filter(|_| open.iter().any(|o| o.tag == name)) {
                    return Err(self.error(
                        PRANG_PARSE_UNCLOSED_TAG,
                        format!("Element <{}> is missing its end tag", parent.tag),
                        parent.start,
                        parent.head_end,
                    ));
                }
                return Err(self.error(
                    PRANG_PARSE_MISMATCHED_END_TAG,
                    format!("Unexpected end tag </{name}>"),
                    self.pos,
                    end,
                ));
            } else if rest.starts_with("<!--") {
                self.skip_comment()?;
            } else if rest.starts_with("<!") {
                let start = self.pos;
                match rest.find('>') {
                    Some(i) => self.pos += i + 1,
                    None => {
                        return Err(self.error(
                            PRANG_PARSE_UNEXPECTED_EOF,
                            "Unexpected end of template inside a declaration",
                            start,
                            self.source.len(),
                        ))
                    }
                }
            } else if self.starts_tag() {
                let element = self.parse_element(open, in_pre)?;
                nodes.push(TemplateNode::Element(element));
            } else if rest.starts_with("{{") {
                nodes.push(self.parse_interpolation()?);
            } else {
                nodes.push(self.parse_text());
            }
        }

        let nodes = self.merge_text(nodes);
        Ok(if in_pre { nodes } else { condense_whitespace(nodes) })
    }

    /// Name and end offset of the end tag at the cursor, without consuming it.
    fn peek_end_tag(&self) -> (String, usize) {
        let rest = &self.rest()[2..];
        let name_len = rest
            .find(|c: char| c.is_whitespace() || c == '>')
            .unwrap_or(rest.len());
        let name = rest[..name_len].to_string();
        let end = rest.find('>').map_or(self.source.len(), |i| self.pos + 2 + i + 1);
        (name, end)
    }

    fn skip_comment(&mut self) -> CompileResult<()> {
        let start = self.pos;
        match self.rest()[4..].find("-->") {
            Some(i) => {
                self.pos += 4 + i + 3;
                Ok(())
            }
            None => Err(self.error(
                PRANG_PARSE_UNTERMINATED_COMMENT,
                "Comment is never closed",
                start,
                (start + 4).min(self.source.len()),
            )),
        }
    }

    fn parse_interpolation(&mut self) -> CompileResult<TemplateNode> {
        let start = self.pos;
        let inner_start = start + 2;
        let Some(close) = self.source[inner_start..].find("}}") else {
            return Err(self.error(
                PRANG_PARSE_UNTERMINATED_INTERPOLATION,
                "Interpolation is missing its closing `}}`",
                start,
                inner_start,
            ));
        };
        let inner_end = inner_start + close;
        self.pos = inner_end + 2;

        let raw = &self.source[inner_start..inner_end];
        let lead = raw.len() - raw.trim_start().len();
        let content_start = inner_start + lead;
        let content_end = content_start + raw.trim().len();
        let exp = SimpleExpression::new(
            &self.source[content_start..content_end],
            false,
            self.loc(content_start, content_end),
        );
        Ok(TemplateNode::Interpolation(InterpolationNode {
            content: ExpressionNode::Simple(exp),
            loc: self.loc(start, self.pos),
        }))
    }

    fn parse_text(&mut self) -> TemplateNode {
        let start = self.pos;
        // The first character is always text, even a lone `<` or `{`.
        let first = self.rest().chars().next().map_or(0, char::len_utf8);
        self.pos += first;
        while !self.eof() && !self.starts_tag() && !self.rest().starts_with("{{") {
            self.pos += self.rest().chars().next().map_or(1, char::len_utf8);
        }
        TemplateNode::Text(TextNode {
            content: decode_entities(&self.source[start..self.pos]),
            loc: self.loc(start, self.pos),
        })
    }

    fn parse_element(&mut self, open: &mut Vec<OpenTag>, in_pre: bool) -> CompileResult<ElementNode> {
        let start = self.pos;
        self.pos += 1;
        let name_len = self
            .rest()
            .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
            .unwrap_or(self.rest().len());
        let tag = self.rest()[..name_len].to_string();
        self.pos += name_len;

        let mut props = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let is_self_closing = loop {
            self.skip_whitespace();
            if self.eof() {
                return Err(self.error(
                    PRANG_PARSE_UNEXPECTED_EOF,
                    format!("Unexpected end of template inside <{tag}>"),
                    start,
                    self.source.len(),
                ));
            }
            if self.rest().starts_with("/>") {
                self.pos += 2;
                break true;
            }
            if self.rest().starts_with('>') {
                self.pos += 1;
                break false;
            }
            if self.rest().starts_with('/') {
                self.pos += 1;
                continue;
            }
            let attr_start = self.pos;
            let prop = self.parse_attribute()?;
            let raw_name = match &prop {
                PropNode::Attribute(attr) => attr.name.clone(),
                PropNode::Directive(dir) => dir.raw_name.clone(),
                PropNode::Generated(_) => continue,
            };
            if !seen.insert(raw_name.clone()) {
                return Err(self.error(
                    PRANG_PARSE_DUPLICATE_ATTRIBUTE,
                    format!("Duplicate attribute `{raw_name}` on <{tag}>"),
                    attr_start,
                    self.pos,
                ));
            }
            props.push(prop);
        };
        let head_end = self.pos;

        let mut children = Vec::new();
        if !is_self_closing && !is_void_tag(&tag) {
            if is_raw_text_tag(&tag) {
                children = self.parse_raw_text(&tag, start, head_end)?;
            } else {
                open.push(OpenTag {
                    tag: tag.clone(),
                    start,
                    head_end,
                });
                children = self.parse_children(open, in_pre || tag == "pre")?;
                open.pop();
                let (_, end) = self.peek_end_tag();
                self.pos = end;
            }
        }

        Ok(ElementNode {
            tag_type: classify(&tag, &props),
            tag,
            props,
            children,
            is_self_closing,
            runtime_directives: Vec::new(),
            loc: self.loc(start, self.pos),
        })
    }

    /// Body of `<script>`, `<style>` and `<textarea>` up to the matching end tag.
    fn parse_raw_text(&mut self, tag: &str, start: usize, head_end: usize) -> CompileResult<Vec<TemplateNode>> {
        let close = format!("</{tag}");
        let Some(i) = self.rest().find(&close) else {
            return Err(self.error(
                PRANG_PARSE_UNCLOSED_TAG,
                format!("Element <{tag}> is missing its end tag"),
                start,
                head_end,
            ));
        };
        let text_start = self.pos;
        let text_end = self.pos + i;
        self.pos = text_end;
        let (_, end) = self.peek_end_tag();
        self.pos = end;
        if text_start == text_end {
            return Ok(Vec::new());
        }
        Ok(vec![TemplateNode::Text(TextNode {
            content: self.source[text_start..text_end].to_string(),
            loc: self.loc(text_start, text_end),
        })])
    }

    fn parse_attribute(&mut self) -> CompileResult<PropNode> {
        let start = self.pos;
        let rest = self.rest();
        let mut name_len = 0;
        let mut depth = 0usize;
        for (i, c) in rest.char_indices() {
            match c {
                '[' => depth += 1,
                ']' => depth = depth.saturating_sub(1),
                c if depth == 0 && (c.is_whitespace() || c == '=' || c == '>' || c == '/') => break,
                _ => {}
            }
            name_len = i + c.len_utf8();
        }
        // A name cannot be empty; a stray `=` is consumed as a one-character name.
        let name_len = name_len.max(rest.chars().next().map_or(0, char::len_utf8));
        let name_end = start + name_len;
        self.pos = name_end;

        let mut value: Option<(usize, usize)> = None;
        self.skip_whitespace();
        if self.rest().starts_with('=') {
            self.pos += 1;
            self.skip_whitespace();
            let quote = self.rest().chars().next().filter(|c| *c == '"' || *c == '\'');
            if let Some(quote) = quote {
                let value_start = self.pos + 1;
                let Some(close) = self.source[value_start..].find(quote) else {
                    return Err(self.error(
                        PRANG_PARSE_UNTERMINATED_ATTRIBUTE,
                        format!("Attribute value for `{}` is never closed", &self.source[start..name_end]),
                        start,
                        value_start,
                    ));
                };
                value = Some((value_start, value_start + close));
                self.pos = value_start + close + 1;
            } else {
                let value_start = self.pos;
                let len = self
                    .rest()
                    .find(|c: char| c.is_whitespace() || c == '>')
                    .unwrap_or(self.rest().len());
                value = Some((value_start, value_start + len));
                self.pos += len;
            }
        } else {
            // Whitespace after a bare attribute belongs to the next token.
            self.pos = name_end;
        }

        let raw_name = &self.source[start..name_end];
        let attr_end = self.pos;
        Ok(match parse_directive_name(raw_name) {
            Some(parts) => PropNode::Directive(self.build_directive(raw_name, parts, start, value, attr_end)?),
            None => PropNode::Attribute(AttributeNode {
                name: raw_name.to_string(),
                value: value.map(|(vs, ve)| TextNode {
                    content: decode_entities(&self.source[vs..ve]),
                    loc: self.loc(vs, ve),
                }),
                loc: self.loc(start, attr_end),
            }),
        })
    }

    fn build_directive(
        &self,
        raw_name: &str,
        parts: DirectiveName,
        start: usize,
        value: Option<(usize, usize)>,
        end: usize,
    ) -> CompileResult<DirectiveNode> {
        let arg = match parts.arg {
            Some((arg_start, arg_end, dynamic)) => {
                let abs_start = start + arg_start;
                let abs_end = start + arg_end;
                let raw_arg = &self.source[abs_start..abs_end];
                let content = if dynamic {
                    if raw_arg.len() < 2 || !raw_arg.ends_with(']') {
                        return Err(self.error(
                            PRANG_PARSE_UNTERMINATED_ATTRIBUTE,
                            format!("Dynamic argument in `{raw_name}` is missing its closing `]`"),
                            abs_start,
                            abs_end,
                        ));
                    }
                    let inner = &raw_arg[1..raw_arg.len() - 1];
                    if inner.trim().is_empty() {
                        return Err(self.error(
                            PRANG_PARSE_INVALID_EXPRESSION,
                            format!("Dynamic argument in `{raw_name}` is empty"),
                            abs_start,
                            abs_end,
                        ));
                    }
                    inner
                } else {
                    raw_arg
                };
                Some(SimpleExpression::new(content, !dynamic, self.loc(abs_start, abs_end)))
            }
            None => None,
        };
        let exp = value.map(|(vs, ve)| {
            ExpressionNode::Simple(SimpleExpression::new(&self.source[vs..ve], false, self.loc(vs, ve)))
        });
        Ok(DirectiveNode {
            name: parts.name,
            raw_name: raw_name.to_string(),
            arg,
            exp,
            modifiers: parts.modifiers,
            loc: self.loc(start, end),
        })
    }

    /// Folds text nodes left adjacent by dropped comments into one.
    fn merge_text(&self, nodes: Vec<TemplateNode>) -> Vec<TemplateNode> {
        let mut merged: Vec<TemplateNode> = Vec::with_capacity(nodes.len());
        for node in nodes {
            if let (Some(TemplateNode::Text(prev)), TemplateNode::Text(next)) = (merged.last_mut(), &node) {
                prev.content.push_str(&next.content);
                prev.loc = self.loc(prev.loc.start.offset as usize, next.loc.end.offset as usize);
                continue;
            }
            merged.push(node);
        }
        merged
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DIRECTIVE NAMES
// ═══════════════════════════════════════════════════════════════════════════════

struct DirectiveName {
    name: String,
    /// Offsets of the argument relative to the attribute name, and whether it is `[dynamic]`.
    arg: Option<(usize, usize, bool)>,
    modifiers: Vec<String>,
}

fn parse_directive_name(raw: &str) -> Option<DirectiveName> {
    let (name, rest_start) = if let Some(rest) = raw.strip_prefix("v-") {
        let len = rest.find(|c: char| c == ':' || c == '.').unwrap_or(rest.len());
        if len == 0 {
            return None;
        }
        let after = 2 + len;
        let rest_start = if raw[after..].starts_with(':') { after + 1 } else { after };
        (rest[..len].to_string(), rest_start)
    } else if raw.len() > 1 {
        let name = match raw.as_bytes()[0] {
            b':' => "bind",
            b'@' => "on",
            b'#' => "slot",
            _ => return None,
        };
        (name.to_string(), 1)
    } else {
        return None;
    };

    let has_arg = rest_start < raw.len() && !raw[rest_start..].starts_with('.');
    let arg_end = if has_arg {
        if raw[rest_start..].starts_with('[') {
            raw[rest_start..]
                .find(']')
                .map_or(raw.len(), |i| rest_start + i + 1)
        } else {
            raw[rest_start..].find('.').map_or(raw.len(), |i| rest_start + i)
        }
    } else {
        rest_start
    };
    let arg = has_arg.then(|| (rest_start, arg_end, raw[rest_start..].starts_with('[')));
    let modifiers = raw[arg_end..]
        .split('.')
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect();

    Some(DirectiveName { name, arg, modifiers })
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEXT
// ═══════════════════════════════════════════════════════════════════════════════

pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').filter(|&semi| semi <= 10).and_then(|semi| {
            let entity = &rest[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity.strip_prefix('#').and_then(|num| {
                    let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => num.parse::<u32>().ok(),
                    };
                    code.and_then(char::from_u32)
                }),
            };
            ch.map(|c| (c, semi))
        });
        match decoded {
            Some((ch, semi)) => {
                out.push(ch);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Whitespace condensing between and around elements.
fn condense_whitespace(nodes: Vec<TemplateNode>) -> Vec<TemplateNode> {
    let count = nodes.len();
    let is_element: Vec<bool> = nodes.iter().map(|n| n.as_element().is_some()).collect();
    let mut out = Vec::with_capacity(count);
    for (i, node) in nodes.into_iter().enumerate() {
        let TemplateNode::Text(mut text) = node else {
            out.push(node);
            continue;
        };
        if text.content.trim_matches(|c: char| c.is_ascii_whitespace()).is_empty() {
            let at_edge = i == 0 || i + 1 == count;
            let between_elements = !at_edge
                && is_element[i - 1]
                && is_element[i + 1]
                && text.content.contains(['\n', '\r']);
            if at_edge || between_elements {
                continue;
            }
            text.content = " ".to_string();
        } else {
            text.content = WHITESPACE_RUN.replace_all(&text.content, " ").into_owned();
        }
        out.push(TemplateNode::Text(text));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_name_shapes() {
        let d = parse_directive_name("v-on:click.stop.prevent").unwrap();
        assert_eq!(d.name, "on");
        assert_eq!(d.arg, Some((5, 10, false)));
        assert_eq!(d.modifiers, vec!["stop", "prevent"]);

        let d = parse_directive_name(":[key].camel").unwrap();
        assert_eq!(d.name, "bind");
        assert_eq!(d.arg, Some((1, 6, true)));
        assert_eq!(d.modifiers, vec!["camel"]);

        let d = parse_directive_name("v-model.trim").unwrap();
        assert_eq!((d.name.as_str(), d.arg), ("model", None));
        assert_eq!(d.modifiers, vec!["trim"]);

        assert!(parse_directive_name("class").is_none());
        assert!(parse_directive_name(":").is_none());
    }

    #[test]
    fn entities() {
        assert_eq!(decode_entities("a &amp;&lt;b&gt; &#65;&#x42; &unknown; &"), "a &<b> AB &unknown; &");
    }

    #[test]
    fn tag_tables() {
        assert!(is_intrinsic_tag("div") && is_intrinsic_tag("linearGradient"));
        assert!(!is_intrinsic_tag("child-item"));
        assert!(is_core_component("KeepAlive") && is_core_component("transition"));
        assert!(is_void_tag("input") && !is_void_tag("div"));
    }
}
