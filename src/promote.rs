//! Imported-component tag promotion.

use crate::ast::{ElementNode, ElementType};
use crate::parse::{is_core_component, is_intrinsic_tag};
use crate::registry::TemplateImports;

/// Marks `element` as a component when its tag is a spelling of a resolved
/// component import. Native and built-in tag names always win. Returns whether
/// the tag matched an import.
pub fn promote_imported_component(element: &mut ElementNode, imports: &TemplateImports) -> bool {
    if element.tag_type != ElementType::NativeElement && element.tag_type != ElementType::Component {
        return false;
    }
    if is_intrinsic_tag(&element.tag) || is_core_component(&element.tag) {
        return false;
    }
    if imports.component_for(&element.tag).is_none() {
        return false;
    }
    if element.tag_type == ElementType::NativeElement {
        tracing::trace!(tag = %element.tag, "promoted to component");
        element.tag_type = ElementType::Component;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{parse_template, ParseOptions};

    fn imports(tags: &[&str]) -> TemplateImports {
        let mut imports = TemplateImports::default();
        for tag in tags {
            imports.components.insert(tag.to_string(), "Imported".to_string());
        }
        imports
    }

    fn first_element(source: &str) -> ElementNode {
        let root = parse_template(source, &ParseOptions::default()).unwrap();
        root.children[0].as_element().unwrap().clone()
    }

    #[test]
    fn matching_selector_promotes() {
        let mut el = first_element("<child-item></child-item>");
        assert_eq!(el.tag_type, ElementType::NativeElement);
        assert!(promote_imported_component(&mut el, &imports(&["child-item"])));
        assert_eq!(el.tag_type, ElementType::Component);
    }

    #[test]
    fn unknown_tags_stay_native() {
        let mut el = first_element("<child-item></child-item>");
        assert!(!promote_imported_component(&mut el, &imports(&["other-item"])));
        assert_eq!(el.tag_type, ElementType::NativeElement);
    }

    #[test]
    fn builtins_win_over_selectors() {
        let registered = imports(&["button", "keep-alive"]);
        let mut button = first_element("<button></button>");
        assert!(!promote_imported_component(&mut button, &registered));
        assert_eq!(button.tag_type, ElementType::NativeElement);

        let mut keep_alive = first_element("<keep-alive></keep-alive>");
        assert!(!promote_imported_component(&mut keep_alive, &registered));
    }
}
