//! Identifier casing helpers shared by the scanner, the transforms and the
//! class rewriter.

use regex::{Captures, Regex};

lazy_static::lazy_static! {
    static ref CAMELIZE_RE: Regex = Regex::new(r"-(\w)").unwrap();
}

/// Split an identifier into words on separators and case boundaries
/// (`HTMLParser` -> `HTML`, `Parser`).
pub fn split_words(input: &str) -> Vec<String> {
    let chars: Vec<char> = input.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &ch) in chars.iter().enumerate() {
        if matches!(ch, '-' | '_' | ' ' | '.' | '/') {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if ch.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).map_or(false, |c| c.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower) {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(ch);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn upper_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn lower_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn pascal_case(input: &str) -> String {
    split_words(input).iter().map(|w| upper_first(w)).collect()
}

/// `Capitalize` -> `capitalize`, `formatted-number` -> `formattedNumber`.
pub fn camel_case(input: &str) -> String {
    lower_first(&pascal_case(input))
}

/// `ChildItem` -> `child-item`.
pub fn kebab_case(input: &str) -> String {
    split_words(input)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

/// `model-value` -> `modelValue`; leaves everything else untouched.
pub fn camelize(input: &str) -> String {
    CAMELIZE_RE
        .replace_all(input, |caps: &Captures| caps[1].to_uppercase())
        .into_owned()
}

pub fn capitalize(input: &str) -> String {
    upper_first(input)
}

/// Event name to handler prop key: `click` -> `onClick`, `update:model-value` -> `onUpdate:modelValue`.
pub fn to_handler_key(event: &str) -> String {
    if event.is_empty() {
        return String::new();
    }
    format!("on{}", capitalize(&camelize(event)))
}

/// Sanitized identifier suffix for generated locals (`child-item` -> `child_item`).
pub fn to_valid_identifier(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '$' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_of_class_names() {
        assert_eq!(camel_case("Capitalize"), "capitalize");
        assert_eq!(camel_case("FormattedNumber"), "formattedNumber");
        assert_eq!(camel_case("currency-pipe"), "currencyPipe");
    }

    #[test]
    fn kebab_case_splits_acronyms() {
        assert_eq!(kebab_case("ChildItem"), "child-item");
        assert_eq!(kebab_case("ShoppingItemComponent"), "shopping-item-component");
        assert_eq!(kebab_case("HTMLParser"), "html-parser");
        assert_eq!(pascal_case("child-item"), "ChildItem");
    }

    #[test]
    fn vue_style_helpers() {
        assert_eq!(camelize("model-value"), "modelValue");
        assert_eq!(to_handler_key("click"), "onClick");
        assert_eq!(to_handler_key("update:model-value"), "onUpdate:modelValue");
        assert_eq!(to_valid_identifier("child-item"), "child_item");
    }
}
