//! `v-model` expansion.
//!
//! The directive becomes a value prop plus an `onUpdate:<name>` callback prop.
//! Signals are read by calling them and written through `.set`, refs are
//! guarded with `isRef` and anything else is assigned directly. Native form
//! elements additionally get a runtime model directive picked from the tag
//! and its `type`.

use indexmap::IndexSet;
use oxc_allocator::Allocator;
use oxc_ast::ast::Expression;
use oxc_parser::Parser;
use oxc_span::SourceType;

use crate::ast::{
    CompoundExpression, CompoundPart, DirectiveNode, ElementNode, ElementType, ExpressionNode,
    GeneratedProp, PropKey, PropNode, RuntimeDirective, RuntimeHelper, SimpleExpression, SourceLocation,
};
use crate::casing::camelize;
use crate::diagnostics::{
    CompileResult, PRANG_MODEL_ARG_ON_ELEMENT, PRANG_MODEL_MALFORMED, PRANG_MODEL_NO_EXPRESSION,
    PRANG_MODEL_ON_FILE_INPUT, PRANG_MODEL_ON_INVALID_ELEMENT, PRANG_MODEL_ON_PROPS,
    PRANG_MODEL_ON_SCOPE_VARIABLE, PRANG_MODEL_UNNECESSARY_VALUE,
};
use crate::meta::{BindingKind, FieldRole};
use crate::renamer::SETUP_IDENTIFIER;
use crate::transform::NodeTransformer;

const DEFAULT_MODEL_PROP: &str = "modelValue";

enum ModelTarget {
    Identifier,
    Member,
    Invalid,
}

fn classify_target(source: &str) -> ModelTarget {
    let allocator = Allocator::default();
    match Parser::new(&allocator, source, SourceType::mjs()).parse_expression() {
        Ok(Expression::Identifier(_)) => ModelTarget::Identifier,
        Ok(expr) if expr.is_member_expression() => ModelTarget::Member,
        _ => ModelTarget::Invalid,
    }
}

fn is_simple_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// `{ trim: true, "bar-baz": true }`
pub(crate) fn modifiers_object(modifiers: &[String]) -> String {
    let entries: Vec<String> = modifiers
        .iter()
        .map(|m| {
            let key = if is_simple_identifier(m) {
                m.clone()
            } else {
                serde_json::to_string(m).unwrap_or_else(|_| format!("\"{m}\""))
            };
            format!("{key}: true")
        })
        .collect();
    format!("{{ {} }}", entries.join(", "))
}

fn synthetic(content: String, loc: &SourceLocation) -> ExpressionNode {
    ExpressionNode::Simple(SimpleExpression::synthetic(content, loc.clone()))
}

impl<'a> NodeTransformer<'a> {
    pub(crate) fn transform_model(&mut self, element: &mut ElementNode) -> CompileResult<()> {
        let Some(index) = element
            .props
            .iter()
            .position(|prop| matches!(prop, PropNode::Directive(dir) if dir.name == "model"))
        else {
            return Ok(());
        };
        let dir = match element.props.remove(index) {
            PropNode::Directive(dir) => dir,
            other => {
                element.props.insert(index, other);
                return Ok(());
            }
        };

        let Some(exp) = dir.exp.as_ref().and_then(ExpressionNode::as_simple).filter(|e| !e.is_empty()) else {
            return Err(self.error(PRANG_MODEL_NO_EXPRESSION, "`v-model` requires an expression", &dir.loc));
        };
        let exp_loc = exp.loc.clone();
        let raw = exp.loc.source.trim();
        let target = raw.strip_prefix("this.").unwrap_or(raw).trim();

        let shape = classify_target(target);
        let binding = match shape {
            ModelTarget::Identifier => self.bindings.get(target).copied(),
            _ => None,
        };

        if self
            .fields
            .iter()
            .any(|field| field.name == target && field.role == FieldRole::Input)
        {
            return Err(self.error(
                PRANG_MODEL_ON_PROPS,
                format!("`v-model` cannot bind to input `{target}`; declare it with model() instead"),
                &exp_loc,
            ));
        }
        if matches!(shape, ModelTarget::Invalid) {
            return Err(self.error(
                PRANG_MODEL_MALFORMED,
                format!("`v-model` target `{raw}` is not assignable"),
                &exp_loc,
            ));
        }
        if matches!(shape, ModelTarget::Identifier) && self.scope.contains(target) {
            return Err(self.error(
                PRANG_MODEL_ON_SCOPE_VARIABLE,
                format!("`v-model` cannot bind to scope variable `{target}`"),
                &exp_loc,
            ));
        }

        let no_pipes = IndexSet::new();
        let (value, handler) = match binding {
            Some(BindingKind::Signal) => {
                let value = self.rename(&format!("{target}()"), &exp_loc, &no_pipes)?;
                let handler = self.rename(&format!("$event => ({target}.set($event))"), &exp_loc, &no_pipes)?;
                (synthetic(value, &exp_loc), synthetic(handler, &exp_loc))
            }
            Some(BindingKind::ReactiveRef) => {
                let value = self.rename(target, &exp_loc, &no_pipes)?;
                self.helpers.insert(RuntimeHelper::IsRef);
                let handler = format!(
                    "$event => ({is_ref}({SETUP_IDENTIFIER}.{target}) ? {SETUP_IDENTIFIER}.{target}.value = $event : null)",
                    is_ref = RuntimeHelper::IsRef.alias(),
                );
                (synthetic(value, &exp_loc), synthetic(handler, &exp_loc))
            }
            _ => {
                let value = self.rename(target, &exp_loc, &no_pipes)?;
                let assigned = SimpleExpression::synthetic(value.clone(), exp_loc.clone());
                let handler = ExpressionNode::Compound(CompoundExpression {
                    parts: vec![
                        CompoundPart::Text {
                            text: "$event => (".to_string(),
                        },
                        CompoundPart::Expression { expression: assigned },
                        CompoundPart::Text {
                            text: " = $event)".to_string(),
                        },
                    ],
                    loc: exp_loc.clone(),
                });
                (synthetic(value, &exp_loc), handler)
            }
        };

        let (value_key, event_key, modifiers_key) = model_keys(&dir);

        if element.tag_type == ElementType::Component {
            element.props.insert(
                index,
                PropNode::Generated(GeneratedProp {
                    key: value_key,
                    value,
                    loc: dir.loc.clone(),
                }),
            );
            element.props.insert(
                index + 1,
                PropNode::Generated(GeneratedProp {
                    key: event_key,
                    value: handler,
                    loc: dir.loc.clone(),
                }),
            );
            if !dir.modifiers.is_empty() {
                element.props.insert(
                    index + 2,
                    PropNode::Generated(GeneratedProp {
                        key: modifiers_key,
                        value: synthetic(modifiers_object(&dir.modifiers), &dir.loc),
                        loc: dir.loc.clone(),
                    }),
                );
            }
            return Ok(());
        }

        if let Some(arg) = &dir.arg {
            return Err(self.error(
                PRANG_MODEL_ARG_ON_ELEMENT,
                "`v-model` argument is not supported on plain elements",
                &arg.loc,
            ));
        }
        let helper = self.native_model_helper(element, &dir)?;
        self.helpers.insert(helper);
        self.helpers.insert(RuntimeHelper::WithDirectives);

        element.props.insert(
            index,
            PropNode::Generated(GeneratedProp {
                key: event_key,
                value: handler,
                loc: dir.loc.clone(),
            }),
        );
        element.runtime_directives.push(RuntimeDirective {
            helper,
            value: Some(value),
            arg: None,
            modifiers: dir.modifiers.clone(),
        });
        Ok(())
    }

    fn native_model_helper(&self, element: &ElementNode, dir: &DirectiveNode) -> CompileResult<RuntimeHelper> {
        let helper = match element.tag.as_str() {
            "input" => {
                if element.bound_prop("type").is_some() {
                    RuntimeHelper::VModelDynamic
                } else {
                    let input_type = element
                        .attribute("type")
                        .and_then(|attr| attr.value.as_ref())
                        .map(|value| value.content.as_str());
                    match input_type {
                        Some("radio") => RuntimeHelper::VModelRadio,
                        Some("checkbox") => RuntimeHelper::VModelCheckbox,
                        Some("file") => {
                            return Err(self.error(
                                PRANG_MODEL_ON_FILE_INPUT,
                                "`v-model` cannot be used on file inputs; use `@change` instead",
                                &dir.loc,
                            ))
                        }
                        None if element.has_dynamic_keys() => RuntimeHelper::VModelDynamic,
                        _ => {
                            self.check_duplicated_value(element)?;
                            RuntimeHelper::VModelText
                        }
                    }
                }
            }
            "textarea" => {
                self.check_duplicated_value(element)?;
                RuntimeHelper::VModelText
            }
            "select" => RuntimeHelper::VModelSelect,
            tag => {
                return Err(self.error(
                    PRANG_MODEL_ON_INVALID_ELEMENT,
                    format!("`v-model` is not supported on <{tag}>"),
                    &dir.loc,
                ))
            }
        };
        Ok(helper)
    }

    /// A text-like control cannot also carry a `value`.
    fn check_duplicated_value(&self, element: &ElementNode) -> CompileResult<()> {
        let loc = element
            .bound_prop("value")
            .map(|dir| &dir.loc)
            .or_else(|| element.attribute("value").map(|attr| &attr.loc));
        match loc {
            Some(loc) => Err(self.error(
                PRANG_MODEL_UNNECESSARY_VALUE,
                "`value` is redundant next to `v-model` and would be overwritten",
                loc,
            )),
            None => Ok(()),
        }
    }
}

/// Value, update and modifiers prop keys for a (possibly dynamic) model argument.
fn model_keys(dir: &DirectiveNode) -> (PropKey, PropKey, PropKey) {
    match &dir.arg {
        Some(arg) if !arg.is_static => {
            let dynamic = |content: String| PropKey::Dynamic {
                expression: ExpressionNode::Simple(SimpleExpression::synthetic(content, arg.loc.clone())),
            };
            (
                dynamic(arg.content.clone()),
                dynamic(format!("\"onUpdate:\" + {}", arg.content)),
                dynamic(format!("{} + \"Modifiers\"", arg.content)),
            )
        }
        Some(arg) => (
            PropKey::Static {
                name: arg.content.clone(),
            },
            PropKey::Static {
                name: format!("onUpdate:{}", camelize(&arg.content)),
            },
            PropKey::Static {
                name: format!("{}Modifiers", arg.content),
            },
        ),
        None => (
            PropKey::Static {
                name: DEFAULT_MODEL_PROP.to_string(),
            },
            PropKey::Static {
                name: format!("onUpdate:{DEFAULT_MODEL_PROP}"),
            },
            PropKey::Static {
                name: "modelModifiers".to_string(),
            },
        ),
    }
}
