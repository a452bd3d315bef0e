//! Attribute list rewrites applied before an element's attributes are bound.
//!
//! All passes keep source order: a rewritten attribute takes the position of
//! the one it replaces.

use crate::escape::escape_backticks;
use crate::ir::{AttrValue, Expr, JsxAttribute, Prop, PropKey};
use crate::static_eval::{evaluate, evaluate_truthiness};

fn is_named(attr: &JsxAttribute, names: &[&str]) -> bool {
    attr.name().map(|n| names.contains(&n)).unwrap_or(false)
}

fn attribute(name: &str, value: AttrValue) -> JsxAttribute {
    JsxAttribute::Attribute {
        name: name.to_string(),
        value: Some(value),
    }
}

/// Static text of an attribute value, when it has one.
fn static_text(value: &Option<AttrValue>) -> Option<String> {
    match value {
        None => Some(String::new()),
        Some(AttrValue::Str(s)) => Some(s.clone()),
        Some(AttrValue::Expr(e)) => evaluate(e).map(|v| v.to_text()),
    }
}

/// Merges every `class`/`className` into the first one.
///
/// Static parts are joined with spaces; dynamic parts become `${expr || ""}`
/// slots of a template literal.
pub fn merge_classes(attributes: Vec<JsxAttribute>) -> Vec<JsxAttribute> {
    let count = attributes
        .iter()
        .filter(|a| is_named(a, &["class", "className"]))
        .count();
    if count < 2 {
        return attributes;
    }

    let mut quasis = vec![String::new()];
    let mut exprs = Vec::new();
    let mut seen = 0;
    let mut first_name = String::from("class");
    let mut first_index = None;
    let mut rest = Vec::with_capacity(attributes.len());

    for attr in attributes {
        if !is_named(&attr, &["class", "className"]) {
            rest.push(attr);
            continue;
        }
        seen += 1;
        let is_last = seen == count;
        let JsxAttribute::Attribute { name, value } = attr else {
            continue;
        };
        if first_index.is_none() {
            first_index = Some(rest.len());
            first_name = name;
        }
        let separator = if is_last { "" } else { " " };
        match (static_text(&value), value) {
            (Some(text), _) => {
                if let Some(last) = quasis.last_mut() {
                    last.push_str(&text);
                    last.push_str(separator);
                }
            }
            (None, Some(AttrValue::Expr(e))) => {
                exprs.push(Expr::logical("||", e, Expr::str("")));
                quasis.push(separator.to_string());
            }
            (None, _) => {}
        }
    }

    let value = if exprs.is_empty() {
        AttrValue::Str(quasis.concat())
    } else {
        AttrValue::Expr(Expr::Template {
            quasis: quasis.iter().map(|q| escape_backticks(q)).collect(),
            exprs,
        })
    };
    let index = first_index.unwrap_or(0);
    rest.insert(index, attribute(&first_name, value));
    rest
}

/// Splits an object-literal `style` into a static `style` string and
/// `style:name` bindings for the values that are not known up front.
pub fn explode_style(attributes: Vec<JsxAttribute>) -> Vec<JsxAttribute> {
    if attributes.iter().filter(|a| is_named(a, &["style"])).count() != 1 {
        return attributes;
    }
    let mut out = Vec::with_capacity(attributes.len());
    for attr in attributes {
        let props = match &attr {
            JsxAttribute::Attribute {
                name,
                value: Some(AttrValue::Expr(Expr::Object(props))),
            } if name == "style" => props.clone(),
            _ => {
                out.push(attr);
                continue;
            }
        };
        let mut inline = Vec::new();
        let mut bindings = Vec::new();
        let mut remaining = Vec::new();
        for prop in props {
            match prop {
                Prop::Init { key, value } if key.name().is_some() => {
                    let name = key.name().unwrap_or_default().to_string();
                    match evaluate(&value) {
                        Some(v) => inline.push(format!("{}:{}", name, v.to_text())),
                        None => bindings.push(attribute(
                            &format!("style:{}", name),
                            AttrValue::Expr(value),
                        )),
                    }
                }
                other => remaining.push(other),
            }
        }
        if !inline.is_empty() {
            out.push(attribute("style", AttrValue::Str(inline.join(";"))));
        }
        if !remaining.is_empty() {
            out.push(attribute("style", AttrValue::Expr(Expr::Object(remaining))));
        }
        out.extend(bindings);
    }
    out
}

/// Splits an object-literal `classList` into static class names, `class:name`
/// toggles and whatever cannot be split (computed keys, spreads, keys with
/// whitespace).
pub fn explode_class_list(attributes: Vec<JsxAttribute>) -> Vec<JsxAttribute> {
    if attributes.iter().filter(|a| is_named(a, &["classList"])).count() != 1 {
        return attributes;
    }
    let mut out = Vec::with_capacity(attributes.len());
    for attr in attributes {
        let props = match &attr {
            JsxAttribute::Attribute {
                name,
                value: Some(AttrValue::Expr(Expr::Object(props))),
            } if name == "classList" => props.clone(),
            _ => {
                out.push(attr);
                continue;
            }
        };
        let mut always = Vec::new();
        let mut toggles = Vec::new();
        let mut remaining = Vec::new();
        for prop in props {
            match prop {
                Prop::Init { key, value } if is_class_name(&key) => {
                    let name = key.name().unwrap_or_default().to_string();
                    match evaluate_truthiness(&value) {
                        Some(true) => always.push(name),
                        Some(false) => {}
                        None => toggles.push(attribute(
                            &format!("class:{}", name),
                            AttrValue::Expr(value),
                        )),
                    }
                }
                other => remaining.push(other),
            }
        }
        if !always.is_empty() {
            out.push(attribute("class", AttrValue::Str(always.join(" "))));
        }
        if !remaining.is_empty() {
            out.push(attribute("classList", AttrValue::Expr(Expr::Object(remaining))));
        }
        out.extend(toggles);
    }
    out
}

fn is_class_name(key: &PropKey) -> bool {
    key.name()
        .map(|n| !n.is_empty() && !n.contains(char::is_whitespace))
        .unwrap_or(false)
}

/// Folds `ns:name={v}` attributes into the object literal of `target`
/// (`style:` into `style`, `class:` into `classList`), creating it when absent.
///
/// When `target` exists but is not an object literal the namespaced
/// attributes are dropped.
pub fn gather_namespace(attributes: Vec<JsxAttribute>, ns: &str, target: &str) -> Vec<JsxAttribute> {
    let prefix = format!("{}:", ns);
    let has_namespaced = attributes
        .iter()
        .any(|a| a.name().map(|n| n.starts_with(&prefix)).unwrap_or(false));
    if !has_namespaced {
        return attributes;
    }

    let mut gathered = Vec::new();
    let mut out: Vec<JsxAttribute> = Vec::with_capacity(attributes.len());
    let mut slot = None;
    let mut target_index = None;
    for attr in attributes {
        match attr {
            JsxAttribute::Attribute { name, value } if name.starts_with(&prefix) => {
                let key = &name[prefix.len()..];
                let value = match value {
                    None => Expr::Bool(true),
                    Some(AttrValue::Str(s)) => Expr::Str(s),
                    Some(AttrValue::Expr(e)) => e,
                };
                gathered.push(Prop::Init {
                    key: PropKey::from_name(key),
                    value,
                });
                if slot.is_none() {
                    slot = Some(out.len());
                }
            }
            other => {
                if other.name() == Some(target) {
                    target_index = Some(out.len());
                }
                out.push(other);
            }
        }
    }

    match target_index {
        Some(index) => match &mut out[index] {
            JsxAttribute::Attribute {
                value: Some(AttrValue::Expr(Expr::Object(props))),
                ..
            } => props.extend(gathered),
            _ => {
                tracing::debug!(namespace = ns, "namespaced attributes dropped next to a non-literal {}", target);
            }
        },
        None => {
            let index = slot.unwrap_or(out.len());
            out.insert(index, attribute(target, AttrValue::Expr(Expr::Object(gathered))));
        }
    }
    out
}
