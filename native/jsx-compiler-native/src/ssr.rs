//! SSR element compilation.
//!
//! Markup is collected as alternating string chunks and value slots and
//! rendered with a single `ssr` call. Every dynamic value is escaped on its
//! way into the string; component output is markup already and is not.

use crate::attributes::attribute_name;
use crate::constants::{BOOLEANS, CHILD_PROPERTIES, SVG_ELEMENTS, VOID_ELEMENTS};
use crate::context::CompileContext;
use crate::escape::{escape_expression, escape_html};
use crate::ir::{AttrValue, CompileResult, Expr, JsxAttribute, JsxElement, JsxNode, Prop, PropKey};
use crate::normalize;
use crate::static_eval::{
    check_length, evaluate, evaluate_truthiness, filter_children, trim_whitespace,
};
use crate::transform::{lower, transform_node, TransformInfo};

fn append(results: &mut CompileResult, text: &str) {
    match results.chunks.last_mut() {
        Some(last) => last.push_str(text),
        None => results.chunks.push(text.to_string()),
    }
}

fn push_value(results: &mut CompileResult, value: Expr) {
    if results.chunks.is_empty() {
        results.chunks.push(String::new());
    }
    results.values.push(value);
    results.chunks.push(String::new());
}

/// Appends another result's chunks and values, keeping them interleaved.
fn append_result(results: &mut CompileResult, child: CompileResult) {
    let mut chunks = child.chunks.into_iter();
    if let Some(first) = chunks.next() {
        append(results, &first);
    }
    for (value, chunk) in child.values.into_iter().zip(chunks) {
        push_value(results, value);
        append(results, &chunk);
    }
}

pub fn transform_element(
    ctx: &mut CompileContext,
    element: &JsxElement,
    info: &TransformInfo,
) -> CompileResult {
    let tag = element.name.as_str();
    let mut results = CompileResult {
        chunks: vec![format!("<{}", tag)],
        tag_name: Some(tag.to_string()),
        is_svg: SVG_ELEMENTS.contains(tag),
        ..Default::default()
    };

    if info.top_level && ctx.options.hydratable {
        let key = ctx.helper("getHydrationKey");
        append(&mut results, " data-hk=\"");
        push_value(&mut results, Expr::call(key, vec![]));
        append(&mut results, "\"");
    }

    let (children, raw_children) = transform_attributes(ctx, element, &mut results);
    append(&mut results, ">");

    if !VOID_ELEMENTS.contains(tag) {
        let do_not_escape = raw_children || tag == "script" || tag == "style";
        transform_children(ctx, &children, &mut results, do_not_escape);
        append(&mut results, &format!("</{}>", tag));
    }
    results
}

// ═══════════════════════════════════════════════════════════════════════════════
// ATTRIBUTES
// ═══════════════════════════════════════════════════════════════════════════════

/// Attributes with no meaning in a string render.
fn is_client_only(key: &str) -> bool {
    key == "ref" || key.starts_with("on") || key.starts_with("use:") || key.starts_with("prop:")
}

/// Writes attributes into the chunks. Returns the children to render and
/// whether they are raw markup (`innerHTML`).
fn transform_attributes(
    ctx: &mut CompileContext,
    element: &JsxElement,
    results: &mut CompileResult,
) -> (Vec<JsxNode>, bool) {
    let is_svg = results.is_svg;
    let has_children = !element.children.is_empty();

    if element
        .attributes
        .iter()
        .any(|a| matches!(a, JsxAttribute::Spread(_)))
    {
        let props = spread_props(ctx, &element.attributes);
        let spread = ctx.helper("ssrSpread");
        append(results, " ");
        push_value(
            results,
            Expr::call(spread, vec![props, Expr::Bool(is_svg), Expr::Bool(has_children)]),
        );
        return (element.children.clone(), false);
    }

    let attributes = normalize::gather_namespace(element.attributes.clone(), "style", "style");
    let attributes = normalize::gather_namespace(attributes, "class", "classList");
    let attributes = normalize::merge_classes(attributes);
    let (attributes, mut class_list) = take_class_list(attributes);

    let mut children = None;
    let mut raw_children = false;

    for attr in attributes {
        let JsxAttribute::Attribute { name: key, value } = attr else {
            continue;
        };
        if is_client_only(&key) {
            continue;
        }
        let key = key.strip_prefix("attr:").unwrap_or(&key).to_string();

        if key == "class" || key == "className" {
            if let Some(list) = class_list.take() {
                class_with_list(ctx, results, value, list);
                continue;
            }
        }

        if key == "children" || CHILD_PROPERTIES.contains(key.as_str()) {
            let Some(value) = value else {
                continue;
            };
            if has_children {
                continue;
            }
            let expr = match value {
                AttrValue::Str(s) => Expr::Str(s),
                AttrValue::Expr(e) => e,
            };
            raw_children = key == "innerHTML";
            let expr = if key == "textContent" && ctx.options.hydratable && evaluate(&expr).is_none() {
                Expr::logical("||", expr, Expr::str(" "))
            } else {
                expr
            };
            children = Some(match expr {
                Expr::Str(s) if key == "children" => JsxNode::Text(s),
                e => JsxNode::Expression(Some(e)),
            });
            continue;
        }

        let name = attribute_name(&key, is_svg);
        let expr = match value {
            None => {
                append(results, &format!(" {}", name));
                continue;
            }
            Some(AttrValue::Str(s)) => Expr::Str(s),
            Some(AttrValue::Expr(e)) => e,
        };

        let is_boolean = BOOLEANS.contains(name.as_str());
        if is_boolean {
            match evaluate_truthiness(&expr) {
                Some(true) => append(results, &format!(" {}", name)),
                Some(false) => {}
                None => {
                    let helper = ctx.helper("ssrBoolean");
                    let value = lower(ctx, expr);
                    push_value(results, Expr::call(helper, vec![Expr::str(&name), value]));
                }
            }
            continue;
        }

        if let Some(text) = evaluate(&expr) {
            static_attribute(results, &name, text.to_text());
            continue;
        }

        let value = match (key.as_str(), expr) {
            ("style", Expr::Object(props)) => match style_value(ctx, &props) {
                Some(Expr::Str(text)) => {
                    escaped_attribute(results, &name, &text);
                    continue;
                }
                Some(value) => value,
                None => runtime_helper(ctx, "ssrStyle", Expr::Object(props)),
            },
            ("style", e) => runtime_helper(ctx, "ssrStyle", e),
            ("classList", Expr::Object(props)) => match static_class_list(&props) {
                Some(text) => {
                    static_attribute(results, "class", text);
                    continue;
                }
                None => runtime_helper(ctx, "ssrClassList", Expr::Object(props)),
            },
            ("classList", e) => runtime_helper(ctx, "ssrClassList", e),
            (_, e) => {
                let escaped = escape_expression(ctx, e, true, true);
                lower(ctx, escaped)
            }
        };
        let name = if key == "classList" { "class".to_string() } else { name };
        append(results, &format!(" {}=\"", name));
        push_value(results, value);
        append(results, "\"");
    }

    let children = match children {
        Some(child) => vec![child],
        None => element.children.clone(),
    };
    (children, raw_children)
}

fn runtime_helper(ctx: &mut CompileContext, name: &str, value: Expr) -> Expr {
    let helper = ctx.helper(name);
    let value = lower(ctx, value);
    Expr::call(helper, vec![value])
}

fn static_attribute(results: &mut CompileResult, name: &str, text: String) {
    let mut text = text;
    if name == "style" || name == "class" {
        text = trim_whitespace(&text);
        if name == "style" {
            text = text.replace("; ", ";").replace(": ", ":");
        }
    }
    escaped_attribute(results, name, &escape_html(&text, true));
}

/// Writes an attribute whose text is already escaped.
fn escaped_attribute(results: &mut CompileResult, name: &str, text: &str) {
    if text.is_empty() {
        append(results, &format!(" {}", name));
    } else {
        append(results, &format!(" {}=\"{}\"", name, text));
    }
}

/// Pulls out a `classList` that has to share the element's `class` attribute.
fn take_class_list(mut attributes: Vec<JsxAttribute>) -> (Vec<JsxAttribute>, Option<Expr>) {
    let has_class = attributes
        .iter()
        .any(|a| matches!(a.name(), Some("class" | "className")));
    let index = attributes.iter().position(|a| a.name() == Some("classList"));
    match index {
        Some(index) if has_class => match attributes.remove(index) {
            JsxAttribute::Attribute {
                value: Some(AttrValue::Expr(list)),
                ..
            } => (attributes, Some(list)),
            _ => (attributes, None),
        },
        _ => (attributes, None),
    }
}

enum ClassPart {
    Text(String),
    Value(Expr),
}

/// `class` and `classList` rendered as a single `class` attribute.
fn class_with_list(
    ctx: &mut CompileContext,
    results: &mut CompileResult,
    class: Option<AttrValue>,
    list: Expr,
) {
    let class = match class {
        None => None,
        Some(AttrValue::Str(s)) => Some(Expr::Str(s)),
        Some(AttrValue::Expr(e)) => Some(e),
    };
    let mut parts = Vec::with_capacity(2);
    if let Some(class) = class {
        parts.push(match evaluate(&class) {
            Some(v) => ClassPart::Text(escape_html(&trim_whitespace(&v.to_text()), true).into_owned()),
            None => {
                let escaped = escape_expression(ctx, class, true, true);
                ClassPart::Value(lower(ctx, escaped))
            }
        });
    }
    let known = match &list {
        Expr::Object(props) => static_class_list(props),
        _ => None,
    };
    parts.push(match known {
        Some(names) => ClassPart::Text(escape_html(&names, true).into_owned()),
        None => ClassPart::Value(runtime_helper(ctx, "ssrClassList", list)),
    });

    let mut first = true;
    let mut text = String::from(" class=\"");
    let mut slots = Vec::new();
    for part in parts {
        match part {
            ClassPart::Text(t) if t.is_empty() => continue,
            ClassPart::Text(t) => {
                if !first {
                    text.push(' ');
                }
                text.push_str(&t);
            }
            ClassPart::Value(v) => {
                if !first {
                    text.push(' ');
                }
                slots.push((std::mem::take(&mut text), v));
            }
        }
        first = false;
    }
    for (before, value) in slots {
        append(results, &before);
        push_value(results, value);
    }
    append(results, &text);
    append(results, "\"");
}

/// `{ color: c, width: "1px" }` as `"color:" + escape(c) + ";width:1px"`.
///
/// `None` when the object has spreads, computed keys or accessors.
fn style_value(ctx: &mut CompileContext, props: &[Prop]) -> Option<Expr> {
    let mut parts: Vec<Expr> = Vec::new();
    let mut pending = String::new();
    for (index, prop) in props.iter().enumerate() {
        let Prop::Init { key, value } = prop else {
            return None;
        };
        let name = key.name()?;
        if index > 0 {
            pending.push(';');
        }
        pending.push_str(name);
        pending.push(':');
        match evaluate(value) {
            Some(v) => pending.push_str(&escape_html(&v.to_text(), true)),
            None => {
                parts.push(Expr::Str(std::mem::take(&mut pending)));
                let escaped = escape_expression(ctx, value.clone(), true, true);
                parts.push(lower(ctx, escaped));
            }
        }
    }
    if !pending.is_empty() {
        parts.push(Expr::Str(pending));
    }
    let mut parts = parts.into_iter();
    let first = parts.next().unwrap_or_else(|| Expr::str(""));
    Some(parts.fold(first, |acc, part| Expr::binary("+", acc, part)))
}

/// Class names of a `classList` literal whose every toggle is known.
fn static_class_list(props: &[Prop]) -> Option<String> {
    let mut names = Vec::new();
    for prop in props {
        let Prop::Init { key, value } = prop else {
            return None;
        };
        let name = match key {
            PropKey::Ident(n) | PropKey::Str(n) => n,
            PropKey::Computed(_) => return None,
        };
        if evaluate_truthiness(value)? {
            names.push(name.as_str());
        }
    }
    Some(names.join(" "))
}

/// Props object for `ssrSpread`: spread sources and plain attributes in
/// source order, merged with `assignProps` when there are several.
fn spread_props(ctx: &mut CompileContext, attributes: &[JsxAttribute]) -> Expr {
    let mut sources = Vec::new();
    let mut running = Vec::new();
    for attr in attributes {
        match attr {
            JsxAttribute::Spread(arg) => {
                if !running.is_empty() {
                    sources.push(Expr::Object(std::mem::take(&mut running)));
                }
                sources.push(lower(ctx, arg.clone()));
            }
            JsxAttribute::Attribute { name, value } => {
                if is_client_only(name) {
                    continue;
                }
                let value = match value {
                    None => Expr::Bool(true),
                    Some(AttrValue::Str(s)) => Expr::Str(s.clone()),
                    Some(AttrValue::Expr(e)) => lower(ctx, e.clone()),
                };
                running.push(Prop::Init {
                    key: PropKey::from_name(name),
                    value,
                });
            }
        }
    }
    if !running.is_empty() {
        sources.push(Expr::Object(running));
    }
    if sources.len() == 1 {
        return sources.pop().unwrap_or_else(|| Expr::Object(vec![]));
    }
    let assign = ctx.helper("assignProps");
    Expr::call(assign, sources)
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHILDREN
// ═══════════════════════════════════════════════════════════════════════════════

fn transform_children(
    ctx: &mut CompileContext,
    children: &[JsxNode],
    results: &mut CompileResult,
    do_not_escape: bool,
) {
    let filtered = filter_children(children);
    let markers = ctx.options.hydratable && check_length(&filtered);
    let info = TransformInfo {
        do_not_escape,
        ..Default::default()
    };

    for node in filtered {
        let Some(mut child) = transform_node(ctx, node, &info) else {
            continue;
        };
        if child.has_markup() {
            append_result(results, child);
            continue;
        }
        let Some(expr) = child.take_first_expr() else {
            continue;
        };
        let expr = if child.no_escape || do_not_escape {
            expr
        } else {
            escape_expression(ctx, expr, false, true)
        };
        let value = lower(ctx, expr);
        if markers {
            append(results, "<!--#-->");
        }
        push_value(results, value);
        if markers {
            append(results, "<!--/-->");
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPLATE
// ═══════════════════════════════════════════════════════════════════════════════

/// `ssr(_tmpl$, ...values)` for markup, the bare expression otherwise.
pub fn create_template(ctx: &mut CompileContext, mut result: CompileResult) -> Expr {
    if result.chunks.is_empty() {
        let expr = result.take_first_expr().unwrap_or_else(Expr::undefined);
        return lower(ctx, expr);
    }
    let template = ctx.register_ssr_template(&result.chunks);
    let ssr = ctx.helper("ssr");
    let mut args = vec![Expr::Ident(template)];
    args.append(&mut result.values);
    Expr::call(ssr, args)
}
