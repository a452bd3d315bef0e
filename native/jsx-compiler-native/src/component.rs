//! Component compilation.
//!
//! `<Comp a={x} {...rest}>children</Comp>` becomes
//! `createComponent(Comp, props)`. Reactive props are getters so the
//! component reads them lazily; several prop sources are merged with
//! `assignProps`.

use crate::context::CompileContext;
use crate::ir::{AttrValue, CompileResult, Declarator, Expr, JsxAttribute, JsxElement, JsxNode, Prop, PropKey, Stmt};
use crate::static_eval::{decode_entities, filter_children, is_dynamic, trim_whitespace, DynamicCheck};
use crate::transform::{create_template, getter, lower, spread_accessor, transform_node, TransformInfo};

pub fn transform_component(ctx: &mut CompileContext, element: &JsxElement) -> CompileResult {
    let tag = component_identifier(ctx, &element.name);
    let has_children = !filter_children(&element.children).is_empty();

    let mut sources = Vec::new();
    let mut running: Vec<Prop> = Vec::new();
    let mut dynamic_spread = false;

    for attr in &element.attributes {
        let (key, value) = match attr {
            JsxAttribute::Spread(arg) => {
                if !running.is_empty() {
                    sources.push(Expr::Object(std::mem::take(&mut running)));
                }
                if is_dynamic(ctx, arg, DynamicCheck::member()) {
                    dynamic_spread = true;
                    sources.push(spread_accessor(ctx, arg.clone()));
                } else {
                    sources.push(lower(ctx, arg.clone()));
                }
                continue;
            }
            JsxAttribute::Attribute { name, value } => (name.as_str(), value),
        };

        if key == "children" && has_children {
            continue;
        }
        if key == "ref" {
            if ctx.is_ssr() {
                continue;
            }
            if let Some(AttrValue::Expr(e)) = value {
                running.extend(ref_prop(ctx, e.clone()));
            }
            continue;
        }

        let prop = match value {
            None => Prop::Init {
                key: PropKey::from_name(key),
                value: Expr::Bool(true),
            },
            Some(AttrValue::Str(s)) => Prop::Init {
                key: PropKey::from_name(key),
                value: Expr::Str(s.clone()),
            },
            Some(AttrValue::Expr(e)) => {
                if is_dynamic(ctx, e, DynamicCheck::member().with_tags(true)) {
                    let conditions = ctx.options.memoizes_conditions();
                    getter(ctx, key, e.clone(), conditions)
                } else {
                    Prop::Init {
                        key: PropKey::from_name(key),
                        value: lower(ctx, e.clone()),
                    }
                }
            }
        };
        running.push(prop);
    }

    running.extend(component_children(ctx, &element.children));
    if !running.is_empty() || sources.is_empty() {
        sources.push(Expr::Object(running));
    }

    let props = if sources.len() == 1 && !dynamic_spread {
        sources.pop().unwrap_or_else(|| Expr::Object(vec![]))
    } else {
        let assign = ctx.helper("assignProps");
        Expr::call(assign, sources)
    };

    let create = ctx.helper("createComponent");
    CompileResult {
        component: true,
        no_escape: true,
        ..CompileResult::expression(Expr::call(create, vec![tag, props]), false)
    }
}

/// The expression a tag name refers to: `Foo`, `Foo.Bar`, or the imported
/// helper for a built-in that is not shadowed by a local binding.
fn component_identifier(ctx: &mut CompileContext, name: &str) -> Expr {
    if name.contains('.') {
        let mut parts = name.split('.');
        let root = Expr::ident(parts.next().unwrap_or_default());
        return parts.fold(root, Expr::member);
    }
    if ctx.options.is_built_in(name) && !ctx.scope.has_binding(name) {
        return ctx.helper(name);
    }
    Expr::ident(name)
}

/// `ref` as a component prop: assignment-or-callback for a variable, the
/// function itself when callable, invoke-if-function for a call result.
fn ref_prop(ctx: &mut CompileContext, value: Expr) -> Option<Prop> {
    let key = PropKey::Ident("ref".into());
    let is_const = matches!(value.inner(), Expr::Ident(name) if ctx.scope.is_const(name));

    if value.is_function() || is_const {
        return Some(Prop::Init {
            key,
            value: lower(ctx, value),
        });
    }

    let param = ctx.uid("r$");
    let local = ctx.uid("_ref$");
    let el = Expr::ident(&param);
    let call = Expr::call(Expr::ident(&local), vec![el.clone()]);

    let last = if value.inner().is_lval() {
        let target = value.inner().clone();
        Expr::conditional(
            Expr::is_function_check(Expr::ident(&local)),
            call,
            Expr::assign(target, el),
        )
    } else if value.inner().is_call() {
        Expr::logical("&&", Expr::is_function_check(Expr::ident(&local)), call)
    } else {
        tracing::debug!(component_ref = true, "ref value is not assignable, callable or a call; no binding");
        return None;
    };

    let init = lower(ctx, value);
    Some(Prop::Method {
        key,
        params: vec![param],
        body: vec![
            Stmt::Const(vec![Declarator::new(&local, init)]),
            Stmt::Expr(last),
        ],
    })
}

/// The `children` prop: a string for text, a getter whenever creating the
/// value would build nodes or read reactive state, an array for several.
fn component_children(ctx: &mut CompileContext, children: &[JsxNode]) -> Option<Prop> {
    let filtered = filter_children(children);
    if filtered.is_empty() {
        return None;
    }
    let multiple = filtered.len() > 1;
    let ssr = ctx.is_ssr();
    let info = TransformInfo {
        top_level: true,
        component_child: true,
        ..Default::default()
    };

    let mut values = Vec::new();
    let mut dynamic = false;
    for child in filtered {
        if let JsxNode::Text(raw) = child {
            let text = decode_entities(&trim_whitespace(raw));
            if !text.is_empty() {
                values.push(Expr::Str(text));
            }
            continue;
        }
        let Some(mut result) = transform_node(ctx, child, &info) else {
            continue;
        };
        let builds_nodes = result.has_markup() || result.component || result.id.is_some();
        dynamic |= result.dynamic || builds_nodes;

        if result.dynamic && !builds_nodes && (!multiple || ssr) {
            // the getter already defers evaluation
            if let Some(expr) = result.take_first_expr() {
                let expr = match expr.thunk_body() {
                    Some(body) => body.clone(),
                    None => expr,
                };
                values.push(lower(ctx, expr));
                continue;
            }
        }
        values.push(create_template(ctx, result, multiple));
    }

    let value = match values.len() {
        0 => return None,
        1 => values.pop().unwrap_or_else(Expr::undefined),
        _ => Expr::Array(values),
    };
    let key = PropKey::Ident("children".into());
    if dynamic {
        Some(Prop::Getter {
            key,
            body: vec![Stmt::Return(value)],
        })
    } else {
        Some(Prop::Init { key, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::print_expr;
    use crate::config::CompileOptions;
    use pretty_assertions::assert_eq;

    fn compile(ctx: &mut CompileContext, node: JsxNode) -> String {
        let JsxNode::Element(el) = node else {
            panic!("element expected");
        };
        let mut result = transform_component(ctx, &el);
        print_expr(&result.take_first_expr().expect("createComponent call"))
    }

    fn attr(name: &str, value: Expr) -> JsxAttribute {
        JsxAttribute::Attribute {
            name: name.into(),
            value: Some(AttrValue::Expr(value)),
        }
    }

    #[test]
    fn static_props_are_plain_values() {
        let mut ctx = CompileContext::new(CompileOptions::default());
        let node = JsxNode::element(
            "Greeting",
            vec![
                attr("name", Expr::ident("user")),
                JsxAttribute::Attribute {
                    name: "loud".into(),
                    value: None,
                },
            ],
            vec![JsxNode::Text("Hello".into())],
        );
        assert_eq!(
            compile(&mut ctx, node),
            "_$createComponent(Greeting, { name: user, loud: true, children: \"Hello\" })"
        );
    }

    #[test]
    fn reactive_props_become_getters() {
        let mut ctx = CompileContext::new(CompileOptions::default());
        let node = JsxNode::element(
            "Counter",
            vec![attr("count", Expr::member(Expr::ident("state"), "count"))],
            vec![],
        );
        assert_eq!(
            compile(&mut ctx, node),
            "_$createComponent(Counter, {\n  get count() {\n    return state.count;\n  }\n})"
        );
    }

    fn conditional_prop() -> JsxNode {
        let branch = |name: &str| Expr::Jsx(Box::new(JsxNode::element(name, vec![], vec![])));
        let test = Expr::member(Expr::ident("cond"), "x");
        JsxNode::element(
            "Comp",
            vec![attr("b", Expr::conditional(test, branch("A"), branch("B")))],
            vec![],
        )
    }

    #[test]
    fn conditional_props_are_memoized_on_the_client() {
        let mut ctx = CompileContext::new(CompileOptions::default());
        let printed = compile(&mut ctx, conditional_prop());
        assert!(printed.contains("return _$memo(() => !!cond.x)() ? "));
    }

    #[test]
    fn server_render_reads_conditional_props_directly() {
        let mut ctx = CompileContext::new(CompileOptions::ssr());
        let printed = compile(&mut ctx, conditional_prop());
        assert!(printed.contains("return cond.x ? "));
        assert!(!ctx.imports.contains_key("memo"));
    }

    #[test]
    fn streaming_render_memoizes_conditional_props() {
        let mut ctx = CompileContext::new(CompileOptions {
            is_async: true,
            ..CompileOptions::ssr()
        });
        let printed = compile(&mut ctx, conditional_prop());
        assert!(printed.contains("return _$memo(() => !!cond.x)() ? "));
    }

    #[test]
    fn empty_memo_wrapper_leaves_conditional_props_unwrapped() {
        let mut ctx = CompileContext::new(CompileOptions {
            memo_wrapper: String::new(),
            ..Default::default()
        });
        let printed = compile(&mut ctx, conditional_prop());
        assert!(printed.contains("return cond.x ? "));
        assert!(!ctx.imports.contains_key(""));
        assert!(!printed.contains("_$("));
    }

    #[test]
    fn spreads_are_merged() {
        let mut ctx = CompileContext::new(CompileOptions::default());
        let node = JsxNode::element(
            "Button",
            vec![
                JsxAttribute::Spread(Expr::ident("props")),
                attr("kind", Expr::str("primary")),
            ],
            vec![],
        );
        assert_eq!(
            compile(&mut ctx, node),
            "_$createComponent(Button, _$assignProps(props, { kind: \"primary\" }))"
        );
    }

    #[test]
    fn member_and_built_in_tags() {
        let mut ctx = CompileContext::new(CompileOptions {
            built_ins: vec!["For".into()],
            ..Default::default()
        });
        assert_eq!(
            print_expr(&component_identifier(&mut ctx, "Foo.Bar")),
            "Foo.Bar"
        );
        assert_eq!(print_expr(&component_identifier(&mut ctx, "For")), "_$For");
        assert!(ctx.imports.contains_key("For"));
    }

    #[test]
    fn variable_ref_assigns_or_calls() {
        let mut ctx = CompileContext::new(CompileOptions::default());
        let prop = ref_prop(&mut ctx, Expr::ident("el")).expect("ref prop");
        let printed = print_expr(&Expr::Object(vec![prop]));
        assert!(printed.contains("ref(_r$) {"));
        assert!(printed.contains("const _ref$ = el;"));
        assert!(printed.contains("typeof _ref$ === \"function\" ? _ref$(_r$) : el = _r$;"));
    }

    #[test]
    fn element_children_are_deferred() {
        let mut ctx = CompileContext::new(CompileOptions::default());
        let node = JsxNode::element(
            "Card",
            vec![],
            vec![JsxNode::element("p", vec![], vec![])],
        );
        let printed = compile(&mut ctx, node);
        assert!(printed.contains("get children() {"));
        assert!(printed.contains("return _tmpl$.cloneNode(true);"));
    }
}
