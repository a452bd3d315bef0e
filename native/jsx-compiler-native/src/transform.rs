//! Node dispatch shared by both backends.
//!
//! `transform_node` turns one JSX node into a `CompileResult`; the backend
//! specific pieces (element markup, template creation) live in `dom`,
//! `template` and `ssr`. `lower` compiles JSX that is nested inside ordinary
//! expressions and is applied to every user expression before it is emitted.

use crate::codegen::print_expr;
use crate::component::transform_component;
use crate::condition::transform_condition;
use crate::context::CompileContext;
use crate::escape::escape_html;
use crate::ir::{ArrowBody, CompileResult, Expr, JsxNode, MemberProp, Prop, PropKey, RawExpr, Stmt};
use crate::static_eval::{
    decode_entities, evaluate, filter_children, is_component, is_dynamic, trim_whitespace,
    DynamicCheck,
};
use crate::{dom, ssr, template};

/// Where a node sits relative to its parent.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformInfo {
    pub top_level: bool,
    /// The parent never addresses this node, so no reference is created.
    pub skip_id: bool,
    pub component_child: bool,
    pub fragment_child: bool,
    /// Static text folded into `script`/`style`/`innerHTML` content stays raw.
    pub do_not_escape: bool,
}

impl TransformInfo {
    pub fn top_level() -> Self {
        TransformInfo {
            top_level: true,
            ..Default::default()
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY POINTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Compiles an outermost JSX node to its replacement expression.
pub fn transform_jsx(ctx: &mut CompileContext, node: &JsxNode) -> Expr {
    let info = match node {
        JsxNode::Fragment(_) => TransformInfo::default(),
        _ => TransformInfo::top_level(),
    };
    match transform_node(ctx, node, &info) {
        Some(result) => create_template(ctx, result, false),
        None => Expr::undefined(),
    }
}

pub fn create_template(ctx: &mut CompileContext, result: CompileResult, wrap: bool) -> Expr {
    if ctx.is_ssr() {
        ssr::create_template(ctx, result)
    } else {
        template::create_template(ctx, result, wrap)
    }
}

/// Compiles one node. `None` for nodes that produce nothing (blank text,
/// empty expression containers).
pub fn transform_node(
    ctx: &mut CompileContext,
    node: &JsxNode,
    info: &TransformInfo,
) -> Option<CompileResult> {
    match node {
        JsxNode::Element(element) => {
            let result = if is_component(&element.name) || ctx.options.is_built_in(&element.name) {
                transform_component(ctx, element)
            } else if ctx.is_ssr() {
                ssr::transform_element(ctx, element, info)
            } else {
                dom::transform_element(ctx, element, info)
            };
            Some(result)
        }
        JsxNode::Fragment(children) => {
            let expr = transform_fragment_children(ctx, children);
            Some(CompileResult::expression(expr, false))
        }
        JsxNode::Text(raw) => text_result(ctx, trim_whitespace(raw), info),
        JsxNode::Expression(None) => None,
        JsxNode::Expression(Some(expr)) => {
            if let Some(value) = evaluate(expr) {
                let text = value.to_text();
                let text = if info.do_not_escape {
                    text
                } else {
                    escape_html(&text, false).into_owned()
                };
                return text_result(ctx, text, info);
            }
            Some(expression_result(ctx, expr.clone(), info))
        }
        JsxNode::Spread(expr) => {
            if !is_dynamic(ctx, expr, DynamicCheck::member()) {
                return Some(CompileResult::expression(expr.clone(), false));
            }
            Some(CompileResult::expression(Expr::thunk(expr.clone()), true))
        }
    }
}

fn text_result(ctx: &mut CompileContext, text: String, info: &TransformInfo) -> Option<CompileResult> {
    if text.is_empty() {
        return None;
    }
    let mut result = CompileResult {
        text: true,
        ..Default::default()
    };
    if ctx.is_ssr() {
        result.chunks.push(text);
    } else {
        result.template = text;
        if !info.skip_id {
            result.id = Some(ctx.uid("el$"));
        }
    }
    Some(result)
}

fn expression_result(ctx: &mut CompileContext, expr: Expr, info: &TransformInfo) -> CompileResult {
    let check = DynamicCheck::member()
        .with_tags(info.component_child)
        .with_native(!info.component_child);
    if !is_dynamic(ctx, &expr, check) {
        return CompileResult::expression(expr, false);
    }

    let ssr = ctx.is_ssr();
    let expr = if ctx.options.memoizes_conditions() && expr.is_logical_or_conditional() {
        let inline = info.component_child || info.fragment_child;
        transform_condition(ctx, expr, inline, false).into_expr()
    } else if !info.component_child && (!ssr || info.fragment_child) && expr.bare_call_callee().is_some() {
        match expr {
            Expr::Call { callee, .. } => *callee,
            other => other,
        }
    } else {
        Expr::thunk(expr)
    };
    CompileResult::expression(expr, true)
}

/// `<>a{b}<C/></>`: each child becomes one value; several become an array.
fn transform_fragment_children(ctx: &mut CompileContext, children: &[JsxNode]) -> Expr {
    let info = TransformInfo {
        top_level: true,
        fragment_child: true,
        ..Default::default()
    };
    let mut values = Vec::new();
    for child in filter_children(children) {
        if let JsxNode::Text(raw) = child {
            let text = decode_entities(&trim_whitespace(raw));
            if !text.is_empty() {
                values.push(Expr::Str(text));
            }
            continue;
        }
        if let Some(result) = transform_node(ctx, child, &info) {
            values.push(create_template(ctx, result, true));
        }
    }
    if values.len() == 1 {
        values.pop().unwrap_or_else(Expr::undefined)
    } else {
        Expr::Array(values)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SHARED PROP HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Accessor for a reactive spread source: `props` for `props()`, a memo when
/// `wrapSpreads` is on, a thunk otherwise.
pub fn spread_accessor(ctx: &mut CompileContext, arg: Expr) -> Expr {
    let arg = lower(ctx, arg);
    if ctx.options.wrap_spreads && !ctx.options.memo_wrapper.is_empty() {
        let memo_name = ctx.options.memo_wrapper.clone();
        let memo = ctx.helper(&memo_name);
        return Expr::call(memo, vec![Expr::thunk(arg)]);
    }
    if let Some(callee) = arg.bare_call_callee() {
        return callee.clone();
    }
    Expr::thunk(arg)
}

/// `get key() { return value; }`, memoizing a reactive condition when asked.
pub fn getter(ctx: &mut CompileContext, key: &str, value: Expr, conditions: bool) -> Prop {
    let accessor = if conditions && value.is_logical_or_conditional() {
        transform_condition(ctx, value, true, false).into_expr()
    } else {
        Expr::thunk(value)
    };
    let body = match accessor {
        Expr::Arrow {
            params,
            body: ArrowBody::Expr(body),
        } if params.is_empty() => *body,
        other => Expr::call(other, vec![]),
    };
    Prop::Getter {
        key: PropKey::from_name(key),
        body: vec![Stmt::Return(lower(ctx, body))],
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOWERING
// ═══════════════════════════════════════════════════════════════════════════════

/// Compiles every JSX node nested in `expr`.
pub fn lower(ctx: &mut CompileContext, expr: Expr) -> Expr {
    match expr {
        Expr::Jsx(node) => transform_jsx(ctx, &node),
        Expr::Raw(raw) => Expr::Raw(lower_raw(ctx, raw)),
        Expr::Template { quasis, exprs } => Expr::Template {
            quasis,
            exprs: lower_all(ctx, exprs),
        },
        Expr::Member {
            object,
            property,
            optional,
        } => Expr::Member {
            object: Box::new(lower(ctx, *object)),
            property: match property {
                MemberProp::Computed(p) => MemberProp::Computed(Box::new(lower(ctx, *p))),
                p => p,
            },
            optional,
        },
        Expr::Call {
            callee,
            args,
            optional,
        } => Expr::Call {
            callee: Box::new(lower(ctx, *callee)),
            args: lower_all(ctx, args),
            optional,
        },
        Expr::Unary { op, arg } => Expr::Unary {
            op,
            arg: Box::new(lower(ctx, *arg)),
        },
        Expr::Binary { op, left, right } => Expr::Binary {
            op,
            left: Box::new(lower(ctx, *left)),
            right: Box::new(lower(ctx, *right)),
        },
        Expr::Logical { op, left, right } => Expr::Logical {
            op,
            left: Box::new(lower(ctx, *left)),
            right: Box::new(lower(ctx, *right)),
        },
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => Expr::Conditional {
            test: Box::new(lower(ctx, *test)),
            consequent: Box::new(lower(ctx, *consequent)),
            alternate: Box::new(lower(ctx, *alternate)),
        },
        Expr::Assign { op, target, value } => Expr::Assign {
            op,
            target: Box::new(lower(ctx, *target)),
            value: Box::new(lower(ctx, *value)),
        },
        Expr::Arrow { params, body } => Expr::Arrow {
            params,
            body: match body {
                ArrowBody::Expr(e) => ArrowBody::Expr(Box::new(lower(ctx, *e))),
                ArrowBody::Block(stmts) => ArrowBody::Block(lower_stmts(ctx, stmts)),
            },
        },
        Expr::Object(props) => Expr::Object(
            props
                .into_iter()
                .map(|p| lower_prop(ctx, p))
                .collect(),
        ),
        Expr::Array(items) => Expr::Array(lower_all(ctx, items)),
        Expr::Sequence(items) => Expr::Sequence(lower_all(ctx, items)),
        Expr::Spread(arg) => Expr::Spread(Box::new(lower(ctx, *arg))),
        Expr::Static(inner) => Expr::Static(Box::new(lower(ctx, *inner))),
        Expr::Pure(inner) => Expr::Pure(Box::new(lower(ctx, *inner))),
        leaf => leaf,
    }
}

fn lower_all(ctx: &mut CompileContext, exprs: Vec<Expr>) -> Vec<Expr> {
    exprs.into_iter().map(|e| lower(ctx, e)).collect()
}

pub fn lower_stmts(ctx: &mut CompileContext, stmts: Vec<Stmt>) -> Vec<Stmt> {
    stmts
        .into_iter()
        .map(|stmt| match stmt {
            Stmt::Expr(e) => Stmt::Expr(lower(ctx, e)),
            Stmt::Return(e) => Stmt::Return(lower(ctx, e)),
            Stmt::Const(decls) => Stmt::Const(
                decls
                    .into_iter()
                    .map(|mut d| {
                        d.init = lower(ctx, d.init);
                        d
                    })
                    .collect(),
            ),
        })
        .collect()
}

fn lower_prop(ctx: &mut CompileContext, prop: Prop) -> Prop {
    let key = |ctx: &mut CompileContext, key: PropKey| match key {
        PropKey::Computed(k) => PropKey::Computed(Box::new(lower(ctx, *k))),
        k => k,
    };
    match prop {
        Prop::Init { key: k, value } => Prop::Init {
            key: key(ctx, k),
            value: lower(ctx, value),
        },
        Prop::Getter { key: k, body } => Prop::Getter {
            key: key(ctx, k),
            body: lower_stmts(ctx, body),
        },
        Prop::Method {
            key: k,
            params,
            body,
        } => Prop::Method {
            key: key(ctx, k),
            params,
            body: lower_stmts(ctx, body),
        },
        Prop::Spread(arg) => Prop::Spread(lower(ctx, arg)),
        Prop::Raw(raw) => Prop::Raw(lower_raw(ctx, raw)),
    }
}

/// Splices compiled JSX into verbatim source text.
fn lower_raw(ctx: &mut CompileContext, mut raw: RawExpr) -> RawExpr {
    if raw.jsx.is_empty() {
        return raw;
    }
    let pieces = std::mem::take(&mut raw.jsx);
    // compile in source order so generated names follow the source
    let mut edits: Vec<(usize, usize, String)> = pieces
        .into_iter()
        .map(|piece| {
            let compiled = transform_jsx(ctx, &piece.node);
            (piece.start, piece.end, print_expr(&compiled))
        })
        .collect();
    edits.sort_by(|a, b| b.0.cmp(&a.0));
    for (start, end, code) in edits {
        let in_bounds = start <= end
            && end <= raw.code.len()
            && raw.code.is_char_boundary(start)
            && raw.code.is_char_boundary(end);
        if in_bounds {
            raw.code.replace_range(start..end, &code);
        } else {
            tracing::warn!(start, end, "JSX span outside of its enclosing expression");
        }
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompileOptions;
    use crate::ir::{RawJsx, RawTraits};
    use pretty_assertions::assert_eq;

    fn dom() -> CompileContext {
        CompileContext::new(CompileOptions::default())
    }

    #[test]
    fn bare_calls_are_passed_as_accessors() {
        let mut ctx = dom();
        let result = transform_node(
            &mut ctx,
            &JsxNode::Expression(Some(Expr::call(Expr::ident("count"), vec![]))),
            &TransformInfo::default(),
        )
        .expect("expression result");
        assert!(result.dynamic);
        assert_eq!(result.first_expr(), Some(&Expr::ident("count")));
    }

    #[test]
    fn component_children_keep_their_thunk() {
        let mut ctx = dom();
        let info = TransformInfo {
            component_child: true,
            ..Default::default()
        };
        let result = transform_node(
            &mut ctx,
            &JsxNode::Expression(Some(Expr::call(Expr::ident("count"), vec![]))),
            &info,
        )
        .expect("expression result");
        assert_eq!(
            result.first_expr().map(print_expr).as_deref(),
            Some("() => count()")
        );
    }

    #[test]
    fn literal_children_fold_to_escaped_text() {
        let mut ctx = dom();
        let info = TransformInfo {
            skip_id: true,
            ..Default::default()
        };
        let result = transform_node(
            &mut ctx,
            &JsxNode::Expression(Some(Expr::str("a<b"))),
            &info,
        )
        .expect("text result");
        assert!(result.text);
        assert_eq!(result.template, "a&lt;b");
        assert_eq!(result.id, None);
    }

    #[test]
    fn blank_text_produces_nothing() {
        let mut ctx = dom();
        let node = JsxNode::Text("\n    ".into());
        assert!(transform_node(&mut ctx, &node, &TransformInfo::default()).is_none());
    }

    #[test]
    fn fragments_become_arrays() {
        let mut ctx = dom();
        let node = JsxNode::Fragment(vec![
            JsxNode::Text("a &amp; b".into()),
            JsxNode::Expression(Some(Expr::ident("x"))),
        ]);
        let out = transform_jsx(&mut ctx, &node);
        assert_eq!(print_expr(&out), "[\"a & b\", x]");
    }

    #[test]
    fn raw_expressions_get_jsx_spliced_in() {
        let mut ctx = dom();
        let code = "list.map(item => <li/>)".to_string();
        let start = code.find('<').unwrap_or_default();
        let raw = RawExpr {
            code: code.clone(),
            prec: 18,
            traits: RawTraits {
                call: true,
                member: true,
                jsx: true,
                ..Default::default()
            },
            jsx: vec![RawJsx {
                start,
                end: code.len() - 1,
                node: JsxNode::element("li", vec![], vec![]),
            }],
        };
        let lowered = lower(&mut ctx, Expr::Raw(raw));
        assert_eq!(print_expr(&lowered), "list.map(item => _tmpl$.cloneNode(true))");
        assert_eq!(ctx.templates.len(), 1);
    }
}
