#[cfg(test)]
mod tests {
    use crate::ast::{ElementType, ExpressionNode, PropNode, TemplateNode};
    use crate::diagnostics::*;
    use crate::parse::{parse_template, ParseOptions};

    fn parse(source: &str) -> crate::ast::RootNode {
        parse_template(source, &ParseOptions::default()).unwrap()
    }

    fn parse_err(source: &str) -> CompilerError {
        parse_template(
            source,
            &ParseOptions {
                filename: "t.html".into(),
                ..Default::default()
            },
        )
        .unwrap_err()
    }

    #[test]
    fn test_nested_elements_and_interpolation() {
        let root = parse("<div class=\"card\"><p>Hello {{ name }}!</p></div>");
        assert_eq!(root.children.len(), 1);
        let div = root.children[0].as_element().unwrap();
        assert_eq!(div.tag, "div");
        assert_eq!(div.tag_type, ElementType::NativeElement);
        assert_eq!(div.attribute("class").unwrap().value.as_ref().unwrap().content, "card");

        let p = div.children[0].as_element().unwrap();
        assert_eq!(p.children.len(), 3);
        let TemplateNode::Interpolation(interp) = &p.children[1] else {
            panic!("expected interpolation");
        };
        let exp = interp.content.as_simple().unwrap();
        assert_eq!(exp.content, "name");
        // Offsets point at the trimmed expression inside the braces.
        assert_eq!(exp.loc.start.offset, 30);
        assert_eq!(exp.loc.source, "name");
        assert_eq!(interp.loc.source, "{{ name }}");
    }

    #[test]
    fn test_directive_syntax() {
        let root = parse(r#"<input v-model.trim="query" :[attr]="v" @keyup.enter="submit()" #item="{ row }">"#);
        let input = root.children[0].as_element().unwrap();
        assert_eq!(input.props.len(), 4);

        let model = input.directive("model").unwrap();
        assert_eq!(model.modifiers, vec!["trim"]);
        assert!(model.arg.is_none());
        let exp = model.exp.as_ref().and_then(ExpressionNode::as_simple).unwrap();
        assert_eq!(exp.content, "query");
        assert_eq!(&root.source[exp.loc.start.offset as usize..exp.loc.end.offset as usize], "query");

        let bind = input.directive("bind").unwrap();
        let arg = bind.arg.as_ref().unwrap();
        assert!(!arg.is_static);
        assert_eq!(arg.content, "attr");
        assert!(input.has_dynamic_keys());

        let on = input.directive("on").unwrap();
        assert_eq!(on.arg.as_ref().unwrap().content, "keyup");
        assert_eq!(on.modifiers, vec!["enter"]);

        let slot = input.directive("slot").unwrap();
        assert_eq!(slot.arg.as_ref().unwrap().content, "item");
    }

    #[test]
    fn test_tag_classification() {
        let root = parse(
            "<section><UserCard/><child-item></child-item><KeepAlive></KeepAlive><slot name=\"a\"/>\
             <template v-if=\"ok\"><b/></template><template><i/></template><ui.Button/></section>",
        );
        let kinds: Vec<ElementType> = root.children[0]
            .as_element()
            .unwrap()
            .children
            .iter()
            .map(|n| n.as_element().unwrap().tag_type)
            .collect();
        assert_eq!(
            kinds,
            vec![
                ElementType::Component,
                ElementType::NativeElement,
                ElementType::Component,
                ElementType::Slot,
                ElementType::Template,
                ElementType::NativeElement,
                ElementType::Component,
            ]
        );
    }

    #[test]
    fn test_void_and_self_closing() {
        let root = parse("<p>a<br>b<img src=x /><span/>c</p>");
        let p = root.children[0].as_element().unwrap();
        let tags: Vec<&str> = p
            .children
            .iter()
            .filter_map(|n| n.as_element().map(|e| e.tag.as_str()))
            .collect();
        assert_eq!(tags, vec!["br", "img", "span"]);
        let img = p.children[3].as_element().unwrap();
        assert!(img.is_self_closing);
        assert_eq!(img.attribute("src").unwrap().value.as_ref().unwrap().content, "x");
    }

    #[test]
    fn test_whitespace_condense_and_comments() {
        let root = parse("\n  <ul>\n    <li>a</li>\n    <li>b  <!-- c -->\n  c</li>\n  </ul>\n");
        assert_eq!(root.children.len(), 1);
        let ul = root.children[0].as_element().unwrap();
        assert_eq!(ul.children.len(), 2);
        let second = ul.children[1].as_element().unwrap();
        let TemplateNode::Text(text) = &second.children[0] else {
            panic!("expected text");
        };
        assert_eq!(text.content, "b c");
    }

    #[test]
    fn test_pre_keeps_whitespace() {
        let root = parse("<pre>\n  x\n  </pre>");
        let pre = root.children[0].as_element().unwrap();
        let TemplateNode::Text(text) = &pre.children[0] else {
            panic!("expected text");
        };
        assert_eq!(text.content, "\n  x\n  ");
    }

    #[test]
    fn test_inline_whitespace_between_elements_is_kept() {
        let root = parse("<p><b>a</b> <i>b</i></p>");
        let p = root.children[0].as_element().unwrap();
        assert_eq!(p.children.len(), 3);
        assert!(p.children[1].is_whitespace());
    }

    #[test]
    fn test_entities_in_text_and_attributes() {
        let root = parse("<p title=\"a &amp; b\">1 &lt; 2</p>");
        let p = root.children[0].as_element().unwrap();
        assert_eq!(p.attribute("title").unwrap().value.as_ref().unwrap().content, "a & b");
        let TemplateNode::Text(text) = &p.children[0] else {
            panic!("expected text");
        };
        assert_eq!(text.content, "1 < 2");
    }

    #[test]
    fn test_stray_angle_bracket_is_text() {
        let root = parse("<p>a < b</p>");
        let p = root.children[0].as_element().unwrap();
        let TemplateNode::Text(text) = &p.children[0] else {
            panic!("expected text");
        };
        assert_eq!(text.content, "a < b");
    }

    #[test]
    fn test_locations_are_one_based() {
        let root = parse("<div>\n  <span :title=\"t\"></span>\n</div>");
        let span = root.children[0].as_element().unwrap().children[0].as_element().unwrap();
        assert_eq!((span.loc.start.line, span.loc.start.column), (2, 3));
        let PropNode::Directive(dir) = &span.props[0] else {
            panic!("expected directive");
        };
        assert_eq!((dir.loc.start.line, dir.loc.start.column), (2, 9));
    }

    #[test]
    fn test_unclosed_tag() {
        let err = parse_err("<div><span></div>");
        assert_eq!(err.code, PRANG_PARSE_UNCLOSED_TAG);
        assert!(err.message.contains("<span>"));
        assert_eq!(err.file, "t.html");

        let err = parse_err("<div>");
        assert_eq!(err.code, PRANG_PARSE_UNCLOSED_TAG);
    }

    #[test]
    fn test_mismatched_end_tag() {
        let err = parse_err("<div></span></div>");
        assert_eq!(err.code, PRANG_PARSE_MISMATCHED_END_TAG);
        assert_eq!(err.column, 6);
    }

    #[test]
    fn test_unterminated_constructs() {
        assert_eq!(parse_err("<p>{{ a </p>").code, PRANG_PARSE_UNTERMINATED_INTERPOLATION);
        assert_eq!(parse_err("<!-- nope").code, PRANG_PARSE_UNTERMINATED_COMMENT);
        assert_eq!(parse_err("<p title=\"x></p>").code, PRANG_PARSE_UNTERMINATED_ATTRIBUTE);
        assert_eq!(parse_err("<p title").code, PRANG_PARSE_UNEXPECTED_EOF);
    }

    #[test]
    fn test_malformed_dynamic_argument() {
        let err = parse_err("<div :[");
        assert_eq!(err.code, PRANG_PARSE_UNTERMINATED_ATTRIBUTE);
        assert_eq!(err.file, "t.html");
        assert_eq!((err.line, err.column), (1, 7));

        assert_eq!(parse_err("<div :[]").code, PRANG_PARSE_INVALID_EXPRESSION);
        assert_eq!(parse_err("<div :[ ]=\"x\"></div>").code, PRANG_PARSE_INVALID_EXPRESSION);
        assert_eq!(parse_err("<div v-on:[evt=\"x\"></div>").code, PRANG_PARSE_UNTERMINATED_ATTRIBUTE);
    }

    #[test]
    fn test_duplicate_attribute() {
        let err = parse_err("<p a=\"1\" a=\"2\"></p>");
        assert_eq!(err.code, PRANG_PARSE_DUPLICATE_ATTRIBUTE);
        // `:a` and `a` are different attributes.
        parse("<p :a=\"x\" a=\"2\"></p>");
    }
}
