use crate::ast::{ElementNode, InterpolationNode, RootNode, TemplateNode, TextNode};
use crate::diagnostics::CompileResult;

/// The TemplateVisitor trait is the single traversal mechanism for template ASTs.
///
/// Rules:
/// 1. Traversal order is depth-first and fixed: an element is visited before its children.
/// 2. Implementers override `visit_*` methods to add behavior.
/// 3. Implementers call the matching `walk_*` function to continue traversal unless pruning is intended.
/// 4. The first error aborts the walk.
pub trait TemplateVisitor {
    fn visit_root(&mut self, root: &mut RootNode) -> CompileResult<()> {
        walk_root(self, root)
    }

    fn visit_children(&mut self, children: &mut Vec<TemplateNode>) -> CompileResult<()> {
        walk_children(self, children)
    }

    fn visit_node(&mut self, node: &mut TemplateNode) -> CompileResult<()> {
        walk_node(self, node)
    }

    fn visit_element(&mut self, element: &mut ElementNode) -> CompileResult<()> {
        walk_element(self, element)
    }

    fn visit_text(&mut self, _text: &mut TextNode) -> CompileResult<()> {
        Ok(())
    }

    fn visit_interpolation(&mut self, _interpolation: &mut InterpolationNode) -> CompileResult<()> {
        Ok(())
    }
}

pub fn walk_root<V: TemplateVisitor + ?Sized>(visitor: &mut V, root: &mut RootNode) -> CompileResult<()> {
    visitor.visit_children(&mut root.children)
}

pub fn walk_children<V: TemplateVisitor + ?Sized>(
    visitor: &mut V,
    children: &mut Vec<TemplateNode>,
) -> CompileResult<()> {
    for node in children {
        visitor.visit_node(node)?;
    }
    Ok(())
}

pub fn walk_node<V: TemplateVisitor + ?Sized>(visitor: &mut V, node: &mut TemplateNode) -> CompileResult<()> {
    match node {
        TemplateNode::Element(el) => visitor.visit_element(el),
        TemplateNode::Text(t) => visitor.visit_text(t),
        TemplateNode::Interpolation(i) => visitor.visit_interpolation(i),
    }
}

pub fn walk_element<V: TemplateVisitor + ?Sized>(visitor: &mut V, element: &mut ElementNode) -> CompileResult<()> {
    visitor.visit_children(&mut element.children)
}
