//! DOM template building and reactive binding emission.

use crate::attributes::{set_attr, AttrOptions};
use crate::context::CompileContext;
use crate::ir::{ArrowBody, CompileResult, Declarator, DynamicBinding, Expr, Prop, PropKey, Stmt};
use crate::transform::lower;

/// Turns a compiled node into its replacement expression.
///
/// Nodes with markup register their template and clone it; the remaining
/// statements run in an IIFE that returns the root. Expression-only nodes
/// return their expression, memoized when `wrap` asks for it.
pub fn create_template(ctx: &mut CompileContext, mut result: CompileResult, wrap: bool) -> Expr {
    let Some(id) = result.id.clone() else {
        let expr = result.take_first_expr().unwrap_or_else(Expr::undefined);
        let expr = lower(ctx, expr);
        if wrap && result.dynamic && !ctx.options.memo_wrapper.is_empty() {
            let memo_name = ctx.options.memo_wrapper.clone();
            let memo = ctx.helper(&memo_name);
            return Expr::call(memo, vec![expr]);
        }
        return expr;
    };

    let template = ctx.register_dom_template(&result.template, result.is_svg);
    let init = if ctx.options.hydratable {
        let next = ctx.helper("getNextElement");
        Expr::call(next, vec![Expr::Ident(template)])
    } else {
        Expr::method_call(Expr::Ident(template), "cloneNode", vec![Expr::Bool(true)])
    };

    if result.declarations.is_empty()
        && result.exprs.is_empty()
        && result.dynamics.is_empty()
        && result.post_exprs.is_empty()
    {
        return init;
    }

    result.declarations.insert(0, Declarator::new(&id, init));
    let mut body = vec![Stmt::Const(result.declarations)];
    body.append(&mut result.exprs);
    body.extend(wrap_dynamics(ctx, result.dynamics));
    body.append(&mut result.post_exprs);
    body.push(Stmt::Return(Expr::Ident(id)));
    Expr::iife(body)
}

fn binding_options(binding: &DynamicBinding) -> AttrOptions<'_> {
    AttrOptions {
        is_svg: binding.is_svg,
        is_custom_element: binding.is_custom_element,
        dynamic: true,
        tag_name: &binding.tag_name,
    }
}

fn diffs_previous(key: &str) -> bool {
    key == "classList" || key == "style"
}

fn class_toggle_value(key: &str, value: Expr) -> Expr {
    let coerced = key.starts_with("class:") && !matches!(value, Expr::Bool(_) | Expr::Unary { .. });
    if coerced {
        value.to_boolean()
    } else {
        value
    }
}

/// One `effect` for all reactive attribute bindings of a node.
///
/// With several bindings every value is computed into a local and compared
/// against the previous run, kept on the effect's state object, so unrelated
/// updates skip the DOM write.
pub fn wrap_dynamics(ctx: &mut CompileContext, dynamics: Vec<DynamicBinding>) -> Option<Stmt> {
    if dynamics.is_empty() {
        return None;
    }
    let effect_name = ctx.options.effect_wrapper.clone();
    let effect = ctx.helper(&effect_name);

    if dynamics.len() == 1 {
        let binding = &dynamics[0];
        let value = class_toggle_value(&binding.key, binding.value.clone());
        let opts = binding_options(binding);
        let (params, prev) = if diffs_previous(&binding.key) {
            let prev = ctx.uid("$p");
            (vec![prev.clone()], Some(Expr::Ident(prev)))
        } else {
            (vec![], None)
        };
        let set = set_attr(ctx, &binding.elem, &binding.key, value, prev, opts);
        let callback = Expr::Arrow {
            params,
            body: ArrowBody::Expr(Box::new(set)),
        };
        return Some(Stmt::Expr(Expr::call(effect, vec![callback])));
    }

    let state = ctx.uid("p$");
    let mut decls = Vec::with_capacity(dynamics.len());
    let mut updates = Vec::with_capacity(dynamics.len());
    let mut initial = Vec::with_capacity(dynamics.len());

    for binding in &dynamics {
        let local = ctx.uid("v$");
        let value = class_toggle_value(&binding.key, binding.value.clone());
        decls.push(Declarator::new(&local, value));
        initial.push(Prop::Init {
            key: PropKey::Ident(local.clone()),
            value: Expr::undefined(),
        });

        let cached = Expr::member(Expr::ident(&state), &local);
        let opts = binding_options(binding);
        if diffs_previous(&binding.key) {
            let set = set_attr(
                ctx,
                &binding.elem,
                &binding.key,
                Expr::ident(&local),
                Some(cached.clone()),
                opts,
            );
            updates.push(Stmt::Expr(Expr::assign(cached, set)));
        } else {
            let store = Expr::assign(cached.clone(), Expr::ident(&local));
            let set = set_attr(ctx, &binding.elem, &binding.key, store, None, opts);
            let changed = Expr::binary("!==", Expr::ident(&local), cached);
            updates.push(Stmt::Expr(Expr::logical("&&", changed, set)));
        }
    }

    let mut body = vec![Stmt::Const(decls)];
    body.append(&mut updates);
    body.push(Stmt::Return(Expr::ident(&state)));
    let callback = Expr::Arrow {
        params: vec![state],
        body: ArrowBody::Block(body),
    };
    Some(Stmt::Expr(Expr::call(effect, vec![callback, Expr::Object(initial)])))
}
