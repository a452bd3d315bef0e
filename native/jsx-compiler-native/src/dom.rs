//! DOM element compilation.
//!
//! An element contributes markup to the enclosing template and, for whatever
//! cannot be expressed as markup, statements that run against the cloned
//! node: event wiring, one-time assignments, `insert` calls and reactive
//! bindings collected into `dynamics`.

use std::collections::HashSet;

use crate::attributes::{set_attr, AttrOptions};
use crate::constants::{
    split_reserved_namespace, ALIASES, BOOLEANS, CHILD_PROPERTIES, DELEGATED_EVENTS, PROPERTIES,
    SVG_ELEMENTS, VOID_ELEMENTS,
};
use crate::context::CompileContext;
use crate::escape::escape_html;
use crate::ir::{
    AttrValue, CompileResult, Declarator, DynamicBinding, Expr, JsxAttribute, JsxElement,
    JsxNode, Pattern, Prop, Stmt,
};
use crate::normalize;
use crate::static_eval::{
    evaluate, filter_children, check_length, is_component, is_dynamic, to_event_name,
    trim_whitespace, DynamicCheck, StaticValue,
};
use crate::transform::{getter, lower, spread_accessor, transform_node, TransformInfo};

pub fn is_custom_element(element: &JsxElement) -> bool {
    element.name.contains('-') || element.attributes.iter().any(|a| a.name() == Some("is"))
}

pub fn transform_element(
    ctx: &mut CompileContext,
    element: &JsxElement,
    info: &TransformInfo,
) -> CompileResult {
    let tag = element.name.as_str();
    let wrap_svg = info.top_level && tag != "svg" && SVG_ELEMENTS.contains(tag);
    let custom_element = is_custom_element(element);

    let mut results = CompileResult {
        template: format!("<{}", tag),
        tag_name: Some(tag.to_string()),
        is_svg: wrap_svg,
        has_custom_element: custom_element,
        ..Default::default()
    };
    if wrap_svg {
        results.template.insert_str(0, "<svg>");
    }
    if !info.skip_id {
        results.id = Some(ctx.uid("el$"));
    }

    let children = transform_attributes(ctx, element, &mut results);
    if ctx.options.context_to_custom_elements && (tag == "slot" || custom_element) {
        let el = Expr::ident(results.id.as_deref().unwrap_or_default());
        let current = ctx.helper("currentContext");
        results.exprs.push(Stmt::Expr(Expr::assign(
            Expr::member(el, "_context"),
            Expr::call(current, vec![]),
        )));
    }
    results.template.push('>');

    if !VOID_ELEMENTS.contains(tag) {
        let do_not_escape = tag == "script" || tag == "style";
        transform_children(ctx, &children, &mut results, do_not_escape);
        results.template.push_str(&format!("</{}>", tag));
    }

    if info.top_level && ctx.options.hydratable && results.has_hydratable_event {
        let run = ctx.helper("runHydrationEvents");
        results.post_exprs.push(Stmt::Expr(Expr::call(run, vec![])));
    }
    if wrap_svg {
        results.template.push_str("</svg>");
    }
    results
}

// ═══════════════════════════════════════════════════════════════════════════════
// ATTRIBUTES
// ═══════════════════════════════════════════════════════════════════════════════

/// Binds every attribute and returns the children to compile, which a
/// `children` attribute or a dynamic `textContent` can replace.
fn transform_attributes(
    ctx: &mut CompileContext,
    element: &JsxElement,
    results: &mut CompileResult,
) -> Vec<JsxNode> {
    let elem = results.id.clone().unwrap_or_default();
    let tag = element.name.as_str();
    let is_svg = SVG_ELEMENTS.contains(tag);
    let has_children = !element.children.is_empty();
    let opts = AttrOptions {
        is_svg,
        is_custom_element: results.has_custom_element,
        dynamic: false,
        tag_name: tag,
    };

    let mut attributes = element.attributes.clone();
    let mut spread = None;
    if attributes.iter().any(|a| matches!(a, JsxAttribute::Spread(_))) {
        let (rest, stmt) = process_spreads(ctx, attributes, &elem, is_svg, has_children);
        attributes = rest;
        spread = Some(stmt);
        // handlers inside a spread are unknown until runtime
        results.has_hydratable_event = true;
    }
    let attributes = normalize::merge_classes(normalize::explode_class_list(
        normalize::explode_style(attributes),
    ));

    let mut leading = Vec::new();
    let mut exprs = Vec::new();
    let mut children = None;

    for attr in attributes {
        let JsxAttribute::Attribute { name: key, value } = attr else {
            continue;
        };
        let reserved = split_reserved_namespace(&key).is_some();
        let value = fold_value(&key, value, reserved);

        if key == "children" {
            children = value.map(|v| match v {
                Expr::Str(s) => JsxNode::Text(s),
                e => JsxNode::Expression(Some(e)),
            });
            continue;
        }
        if !reserved
            && value == Some(Expr::Bool(false))
            && BOOLEANS.contains(key.to_lowercase().as_str())
        {
            continue;
        }
        let bound = reserved || matches!(value, Some(ref e) if !matches!(e, Expr::Str(_) | Expr::Num(_)));
        if !bound {
            static_attribute(ctx, results, &mut exprs, &elem, &key, value, opts);
            continue;
        }
        let Some(expr) = value else {
            continue;
        };

        if key == "ref" {
            leading.extend(ref_binding(ctx, &elem, expr));
        } else if let Some(directive) = key.strip_prefix("use:") {
            let accessor = Expr::thunk(lower(ctx, expr));
            leading.push(Stmt::Expr(Expr::call(
                Expr::ident(directive),
                vec![Expr::ident(&elem), accessor],
            )));
        } else if key == "children" {
            children = Some(JsxNode::Expression(Some(expr)));
        } else if key == "on" || key == "oncapture" {
            exprs.extend(listener_bag(ctx, &elem, expr, key == "oncapture"));
        } else if key.starts_with("on") {
            let hydratable = event_binding(ctx, &elem, &key, expr, &mut leading, &mut exprs);
            results.has_hydratable_event |= hydratable;
        } else if !ctx.options.effect_wrapper.is_empty()
            && (is_dynamic(ctx, &expr, DynamicCheck::member())
                || ((key == "classList" || key == "style") && !is_confident(&expr)))
        {
            let value = lower(ctx, expr);
            if key == "value" || key == "checked" {
                let effect = effect_helper(ctx);
                let set = set_attr(ctx, &elem, &key, value, None, opts);
                results
                    .post_exprs
                    .push(Stmt::Expr(Expr::call(effect, vec![Expr::thunk(set)])));
                continue;
            }
            let mut target = elem.clone();
            if key == "textContent" {
                target = ctx.uid("el$");
                children = Some(JsxNode::Text(" ".to_string()));
                results.declarations.push(Declarator::new(
                    &target,
                    Expr::member(Expr::ident(&elem), "firstChild"),
                ));
            }
            results.dynamics.push(DynamicBinding {
                elem: target,
                key,
                value,
                is_svg,
                is_custom_element: opts.is_custom_element,
                tag_name: tag.to_string(),
            });
        } else {
            let value = lower(ctx, expr);
            exprs.push(Stmt::Expr(set_attr(ctx, &elem, &key, value, None, opts)));
        }
    }

    leading.append(&mut exprs);
    results.exprs.append(&mut leading);
    results.exprs.extend(spread);

    match children {
        Some(child) if !has_children => vec![child],
        _ => element.children.clone(),
    }
}

/// Folds literal values: a number stays a number for DOM properties, every
/// other compile-time value becomes a string. Namespaced attributes without
/// a value read as `true`.
fn fold_value(key: &str, value: Option<AttrValue>, reserved: bool) -> Option<Expr> {
    let value = match value {
        None => None,
        Some(AttrValue::Str(s)) => Some(Expr::Str(s)),
        Some(AttrValue::Expr(e)) if key.starts_with("use:") => Some(e),
        Some(AttrValue::Expr(e)) => Some(match evaluate(&e) {
            Some(StaticValue::Num(n)) if PROPERTIES.contains(key) || key.starts_with("prop:") => {
                Expr::Num(n)
            }
            Some(v) => Expr::Str(v.to_text()),
            None => e,
        }),
    };
    match value {
        None if reserved => Some(Expr::Bool(true)),
        Some(Expr::Bool(true)) if !reserved && BOOLEANS.contains(key.to_lowercase().as_str()) => {
            Some(Expr::str(""))
        }
        v => v,
    }
}

/// Whether a `style`/`classList` value is fully known at compile time.
fn is_confident(expr: &Expr) -> bool {
    match expr.inner() {
        Expr::Object(props) => props.iter().all(|p| match p {
            Prop::Init { key, value } => key.name().is_some() && evaluate(value).is_some(),
            _ => false,
        }),
        e => evaluate(e).is_some(),
    }
}

fn static_attribute(
    ctx: &mut CompileContext,
    results: &mut CompileResult,
    exprs: &mut Vec<Stmt>,
    elem: &str,
    key: &str,
    value: Option<Expr>,
    opts: AttrOptions<'_>,
) {
    let key = ALIASES.get(key).copied().unwrap_or(key);
    if let Some(value) = value.as_ref().filter(|_| CHILD_PROPERTIES.contains(key)) {
        exprs.push(Stmt::Expr(set_attr(ctx, elem, key, value.clone(), None, opts)));
        return;
    }
    let name = if opts.is_svg {
        key.to_string()
    } else {
        key.to_lowercase()
    };
    results.template.push(' ');
    results.template.push_str(&name);

    let mut text = match value {
        Some(Expr::Str(s)) => s,
        Some(Expr::Num(n)) => StaticValue::Num(n).to_text(),
        _ => return,
    };
    if key == "style" || key == "class" {
        text = trim_whitespace(&text);
        if key == "style" {
            text = text.replace("; ", ";").replace(": ", ":");
        }
    }
    if !text.is_empty() {
        results.template.push_str("=\"");
        results.template.push_str(&escape_html(&text, true));
        results.template.push('"');
    }
}

fn effect_helper(ctx: &mut CompileContext) -> Expr {
    let name = ctx.options.effect_wrapper.clone();
    ctx.helper(&name)
}

/// Wires `ref={value}` to the element.
fn ref_binding(ctx: &mut CompileContext, elem: &str, value: Expr) -> Vec<Stmt> {
    let el = Expr::ident(elem);
    let is_const = matches!(value.inner(), Expr::Ident(name) if ctx.scope.is_const(name));
    if !is_const && value.inner().is_lval() {
        let target = value.inner().clone();
        let id = ctx.uid("_ref$");
        let call = Expr::call(Expr::ident(&id), vec![el.clone()]);
        return vec![
            Stmt::Const(vec![Declarator::new(&id, lower(ctx, value))]),
            Stmt::Expr(Expr::conditional(
                Expr::is_function_check(Expr::ident(&id)),
                call,
                Expr::assign(target, el),
            )),
        ];
    }
    if is_const || value.is_function() {
        return vec![Stmt::Expr(Expr::call(lower(ctx, value), vec![el]))];
    }
    if value.inner().is_call() {
        let id = ctx.uid("_ref$");
        return vec![
            Stmt::Const(vec![Declarator::new(&id, lower(ctx, value))]),
            Stmt::Expr(Expr::logical(
                "&&",
                Expr::is_function_check(Expr::ident(&id)),
                Expr::call(Expr::ident(&id), vec![el]),
            )),
        ];
    }
    tracing::debug!(element = elem, "ref value is not assignable, callable or a call; no binding");
    Vec::new()
}

fn is_delegated(ctx: &CompileContext, event: &str) -> bool {
    ctx.options.delegate_events
        && (DELEGATED_EVENTS.contains(event)
            || ctx.options.delegated_events.iter().any(|e| e == event))
        && !ctx.options.non_delegate_events.iter().any(|e| e == event)
}

/// Binds `onX` / `on:x` / `oncapture:x`. Returns whether the element now
/// carries a handler that hydration has to replay.
fn event_binding(
    ctx: &mut CompileContext,
    elem: &str,
    key: &str,
    handler: Expr,
    leading: &mut Vec<Stmt>,
    exprs: &mut Vec<Stmt>,
) -> bool {
    let el = Expr::ident(elem);
    if let Some((ns, name)) = key.split_once(':') {
        let mut args = vec![Expr::str(name), lower(ctx, handler)];
        if ns == "oncapture" {
            args.push(Expr::Bool(true));
        }
        exprs.push(Stmt::Expr(Expr::method_call(el, "addEventListener", args)));
        return false;
    }

    let event = to_event_name(key);
    if is_delegated(ctx, &event) {
        ctx.delegate_event(&event);
        let slot = format!("__{}", event);
        match handler {
            Expr::Array(items) => {
                let mut items = items.into_iter();
                if let Some(h) = items.next() {
                    let h = lower(ctx, h);
                    leading.push(Stmt::Expr(Expr::assign(Expr::member(el.clone(), &slot), h)));
                }
                if let Some(data) = items.next() {
                    let data = lower(ctx, data);
                    let data_slot = format!("{}Data", slot);
                    leading.push(Stmt::Expr(Expr::assign(Expr::member(el, &data_slot), data)));
                }
            }
            h => {
                let h = lower(ctx, h);
                leading.push(Stmt::Expr(Expr::assign(Expr::member(el, &slot), h)));
            }
        }
        return match &ctx.options.hydratable_events {
            Some(events) => events.iter().any(|e| *e == event),
            None => true,
        };
    }

    let handler = match handler {
        Expr::Array(items) => {
            let mut items = items.into_iter();
            let h = items.next().unwrap_or_else(Expr::undefined);
            match items.next() {
                Some(data) => Expr::arrow(
                    &["e"],
                    Expr::call(h, vec![data, Expr::ident("e")]),
                ),
                None => h,
            }
        }
        h => h,
    };
    let handler = lower(ctx, handler);
    leading.push(Stmt::Expr(Expr::method_call(
        el,
        "addEventListener",
        vec![Expr::str(&event), handler],
    )));
    false
}

/// `on={{ click: f }}` and `oncapture={{ ... }}` listener bags.
fn listener_bag(ctx: &mut CompileContext, elem: &str, bag: Expr, capture: bool) -> Vec<Stmt> {
    let Expr::Object(props) = bag else {
        tracing::debug!(element = elem, "listener bag is not an object literal; ignored");
        return Vec::new();
    };
    let mut out = Vec::new();
    for prop in props {
        let Prop::Init { key, value } = prop else {
            continue;
        };
        let Some(name) = key.name() else {
            continue;
        };
        let mut args = vec![Expr::str(name), lower(ctx, value)];
        if capture {
            args.push(Expr::Bool(true));
        }
        out.push(Stmt::Expr(Expr::method_call(
            Expr::ident(elem),
            "addEventListener",
            args,
        )));
    }
    out
}

// ═══════════════════════════════════════════════════════════════════════════════
// SPREADS
// ═══════════════════════════════════════════════════════════════════════════════

fn can_native_spread(key: &str) -> bool {
    if let Some((ns, _)) = key.split_once(':') {
        if crate::constants::NON_SPREAD_NAMESPACES.contains(ns) {
            return false;
        }
    }
    key != "ref"
}

/// Moves spreads, and every spreadable attribute after the first spread or
/// with a reactive value, into one `spread(el, props, isSVG, hasChildren)`.
fn process_spreads(
    ctx: &mut CompileContext,
    attributes: Vec<JsxAttribute>,
    elem: &str,
    is_svg: bool,
    has_children: bool,
) -> (Vec<JsxAttribute>, Stmt) {
    let mut kept = Vec::new();
    let mut sources = Vec::new();
    let mut running: Vec<Prop> = Vec::new();
    let mut dynamic_spread = false;
    let mut seen_spread = false;

    for attr in attributes {
        match attr {
            JsxAttribute::Spread(arg) => {
                seen_spread = true;
                if !running.is_empty() {
                    sources.push(Expr::Object(std::mem::take(&mut running)));
                }
                if is_dynamic(ctx, &arg, DynamicCheck::member()) {
                    dynamic_spread = true;
                    sources.push(spread_accessor(ctx, arg));
                } else {
                    sources.push(lower(ctx, arg));
                }
            }
            JsxAttribute::Attribute { name, value } => {
                let dynamic = match &value {
                    Some(AttrValue::Expr(e)) => is_dynamic(ctx, e, DynamicCheck::member()),
                    _ => false,
                };
                if !((seen_spread || dynamic) && can_native_spread(&name)) {
                    kept.push(JsxAttribute::Attribute { name, value });
                    continue;
                }
                if dynamic {
                    if let Some(AttrValue::Expr(e)) = value {
                        let conditions = ctx.options.memoizes_conditions();
                        running.push(getter(ctx, &name, e, conditions));
                    }
                    continue;
                }
                let value = match value {
                    Some(AttrValue::Expr(e)) => lower(ctx, e),
                    Some(AttrValue::Str(s)) => Expr::Str(s),
                    None if PROPERTIES.contains(name.as_str()) => Expr::Bool(true),
                    None => Expr::str(""),
                };
                running.push(Prop::Init {
                    key: crate::ir::PropKey::Str(name),
                    value,
                });
            }
        }
    }
    if !running.is_empty() {
        sources.push(Expr::Object(running));
    }

    let props = if sources.len() == 1 && !dynamic_spread {
        sources.pop().unwrap_or_else(|| Expr::Object(vec![]))
    } else {
        let assign = ctx.helper("assignProps");
        Expr::call(assign, sources)
    };
    let spread = ctx.helper("spread");
    let stmt = Stmt::Expr(Expr::call(
        spread,
        vec![
            Expr::ident(elem),
            props,
            Expr::Bool(is_svg),
            Expr::Bool(has_children),
        ],
    ));
    (kept, stmt)
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
    let parent = results.id.clone().unwrap_or_default();
    let filtered = filter_children(children);
    let multi = check_length(&filtered);

    let mut nodes: Vec<CompileResult> = Vec::new();
    for index in 0..filtered.len() {
        let info = TransformInfo {
            skip_id: results.id.is_none() || !detect_expressions(ctx, &filtered, index),
            do_not_escape,
            ..Default::default()
        };
        let Some(child) = transform_node(ctx, filtered[index], &info) else {
            continue;
        };
        // adjacent text collapses into one DOM text node
        if child.text {
            if let Some(last) = nodes.last_mut().filter(|last| last.text) {
                last.template.push_str(&child.template);
                continue;
            }
        }
        nodes.push(child);
    }

    let inserted = nodes
        .iter()
        .filter(|n| n.id.is_none() && !n.exprs.is_empty())
        .count();
    let markers = (ctx.options.hydratable && multi) || inserted > 1;

    let mut walk_path = parent.clone();
    let mut walked = 0usize;
    let mut next_placeholder: Option<String> = None;
    let mut child_post_exprs = Vec::new();
    // text references are only read as a walk source or an insert anchor
    let mut text_ids: Vec<String> = Vec::new();
    let mut read: HashSet<String> = HashSet::new();

    for index in 0..nodes.len() {
        results.template.push_str(&nodes[index].template);

        if let Some(id) = nodes[index].id.clone() {
            let step = if walked == 0 { "firstChild" } else { "nextSibling" };
            results
                .declarations
                .push(Declarator::new(&id, Expr::member(Expr::ident(&walk_path), step)));
            read.insert(walk_path.clone());
            if nodes[index].text {
                text_ids.push(id.clone());
            }
            let child = &mut nodes[index];
            results.declarations.append(&mut child.declarations);
            results.exprs.append(&mut child.exprs);
            results.dynamics.append(&mut child.dynamics);
            child_post_exprs.append(&mut child.post_exprs);
            results.has_hydratable_event |= child.has_hydratable_event;
            results.has_custom_element |= child.has_custom_element;
            walk_path = id;
            next_placeholder = None;
            walked += 1;
            continue;
        }

        let Some(expr) = nodes[index].take_first_expr() else {
            next_placeholder = None;
            continue;
        };
        let expr = lower(ctx, expr);
        let insert = ctx.helper("insert");
        let mut args = vec![Expr::ident(&parent), expr];

        if markers || wrapped_by_text(&nodes, index) {
            let mut content = None;
            if markers {
                read.insert(walk_path.clone());
                walk_path = create_placeholder(ctx, results, &walk_path, walked, "#").0;
                walked += 1;
            }
            let anchor = match next_placeholder.clone() {
                Some(anchor) => anchor,
                None => {
                    read.insert(walk_path.clone());
                    let marker = if markers { "/" } else { "" };
                    let (anchor, content_id) =
                        create_placeholder(ctx, results, &walk_path, walked, marker);
                    walked += 1;
                    content = content_id;
                    anchor
                }
            };
            if !markers {
                next_placeholder = Some(anchor.clone());
            }
            args.push(Expr::ident(&anchor));
            if let Some(content) = content {
                args.push(Expr::ident(&content));
            }
            walk_path = anchor;
        } else if multi {
            args.push(match next_child(&nodes, index) {
                Some(id) => {
                    read.insert(id.clone());
                    Expr::ident(&id)
                }
                None => Expr::Null,
            });
        }
        results.exprs.push(Stmt::Expr(Expr::call(insert, args)));
    }

    results.declarations.retain(|decl| match &decl.pattern {
        Pattern::Ident(id) => !text_ids.contains(id) || read.contains(id),
        Pattern::Array(_) => true,
    });

    child_post_exprs.append(&mut results.post_exprs);
    results.post_exprs = child_post_exprs;
}

/// Appends a `<!--marker-->` comment and declares a reference to it.
fn create_placeholder(
    ctx: &mut CompileContext,
    results: &mut CompileResult,
    walk_path: &str,
    walked: usize,
    marker: &str,
) -> (String, Option<String>) {
    let id = ctx.uid("el$");
    results.template.push_str(&format!("<!--{}-->", marker));
    if ctx.options.hydratable && marker == "/" {
        let content = ctx.uid("co$");
        let next_marker = ctx.helper("getNextMarker");
        results.declarations.push(Declarator {
            pattern: Pattern::Array(vec![id.clone(), content.clone()]),
            init: Expr::call(
                next_marker,
                vec![Expr::member(Expr::ident(walk_path), "nextSibling")],
            ),
        });
        return (id, Some(content));
    }
    let step = if walked == 0 { "firstChild" } else { "nextSibling" };
    results
        .declarations
        .push(Declarator::new(&id, Expr::member(Expr::ident(walk_path), step)));
    (id, None)
}

fn next_child(nodes: &[CompileResult], index: usize) -> Option<String> {
    nodes.iter().skip(index + 1).find_map(|n| n.id.clone())
}

/// Text on both sides (before any addressed sibling) would merge into one
/// text node once parsed, so the insertion needs its own anchor.
fn wrapped_by_text(nodes: &[CompileResult], index: usize) -> bool {
    let before = nodes[..index]
        .iter()
        .rev()
        .find(|n| n.text || n.id.is_some())
        .map(|n| n.text)
        .unwrap_or(false);
    before
        && nodes
            .iter()
            .skip(index + 1)
            .find(|n| n.text || n.id.is_some())
            .map(|n| n.text)
            .unwrap_or(false)
}

fn is_literal_container(node: &JsxNode) -> bool {
    matches!(node, JsxNode::Expression(Some(e)) if evaluate(e).is_some())
}

fn attribute_needs_reference(attr: &JsxAttribute) -> bool {
    match attr {
        JsxAttribute::Spread(_) => true,
        JsxAttribute::Attribute { name, value } => {
            CHILD_PROPERTIES.contains(name.as_str())
                || split_reserved_namespace(name).is_some()
                || matches!(value, Some(AttrValue::Expr(e)) if evaluate(e).is_none())
        }
    }
}

/// Whether the child at `index` has to be addressable: some sibling from
/// here on (or nested inside one) is bound at runtime.
fn detect_expressions(ctx: &CompileContext, children: &[&JsxNode], index: usize) -> bool {
    if index > 0 {
        match children[index - 1] {
            node @ JsxNode::Expression(Some(_)) if !is_literal_container(node) => return true,
            JsxNode::Element(el) if is_component(&el.name) => return true,
            _ => {}
        }
    }
    children[index..].iter().any(|child| match child {
        JsxNode::Expression(Some(_)) => !is_literal_container(child),
        JsxNode::Spread(_) | JsxNode::Fragment(_) => true,
        JsxNode::Element(el) => {
            if is_component(&el.name) || ctx.options.is_built_in(&el.name) {
                return true;
            }
            if ctx.options.context_to_custom_elements
                && (el.name == "slot" || is_custom_element(el))
            {
                return true;
            }
            if el.attributes.iter().any(attribute_needs_reference) {
                return true;
            }
            let nested = filter_children(&el.children);
            !nested.is_empty() && detect_expressions(ctx, &nested, 0)
        }
        _ => false,
    })
}
