use crate::codegen::print_expr;
use crate::config::CompileOptions;
use crate::context::{CompileContext, TemplateKind};
use crate::ir::{AttrValue, Expr, JsxAttribute, JsxNode};
use crate::transform::transform_jsx;
use pretty_assertions::assert_eq;

fn dom() -> CompileContext {
    CompileContext::new(CompileOptions::default())
}

fn compile(ctx: &mut CompileContext, node: &JsxNode) -> String {
    print_expr(&transform_jsx(ctx, node))
}

fn attr(name: &str, value: Expr) -> JsxAttribute {
    JsxAttribute::Attribute {
        name: name.into(),
        value: Some(AttrValue::Expr(value)),
    }
}

fn text(s: &str) -> JsxNode {
    JsxNode::Text(s.into())
}

fn child(expr: Expr) -> JsxNode {
    JsxNode::Expression(Some(expr))
}

fn call(name: &str) -> Expr {
    Expr::call(Expr::ident(name), vec![])
}

fn template_html(ctx: &CompileContext, index: usize) -> String {
    match &ctx.templates.entries()[index].kind {
        TemplateKind::Dom { html, .. } => html.clone(),
        other => panic!("dom template expected, got {:?}", other),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPLATES
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn identical_elements_share_one_template() {
    let mut ctx = dom();
    let node = JsxNode::element("p", vec![], vec![text("hi")]);
    let first = compile(&mut ctx, &node);
    let second = compile(&mut ctx, &node);
    assert_eq!(first, "_tmpl$.cloneNode(true)");
    assert_eq!(second, "_tmpl$.cloneNode(true)");
    assert_eq!(ctx.templates.len(), 1);
    assert_eq!(template_html(&ctx, 0), "<p>hi</p>");
}

#[test]
fn different_markup_gets_its_own_template() {
    let mut ctx = dom();
    compile(&mut ctx, &JsxNode::element("p", vec![], vec![]));
    let out = compile(&mut ctx, &JsxNode::element("span", vec![], vec![]));
    assert_eq!(out, "_tmpl$2.cloneNode(true)");
}

#[test]
fn void_elements_are_not_closed() {
    let mut ctx = dom();
    compile(&mut ctx, &JsxNode::element("input", vec![], vec![]));
    assert_eq!(template_html(&ctx, 0), "<input>");
}

// ═══════════════════════════════════════════════════════════════════════════════
// ATTRIBUTES
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn class_attributes_merge_into_one_template_literal() {
    let mut ctx = dom();
    let node = JsxNode::element(
        "div",
        vec![
            JsxAttribute::Attribute {
                name: "class".into(),
                value: Some(AttrValue::Str("a".into())),
            },
            attr("class", Expr::ident("b")),
        ],
        vec![],
    );
    assert_eq!(
        compile(&mut ctx, &node),
        "(() => {\n  const _el$ = _tmpl$.cloneNode(true);\n  _el$.className = `a ${b || \"\"}`;\n  return _el$;\n})()"
    );
    assert_eq!(template_html(&ctx, 0), "<div></div>");
}

#[test]
fn static_marker_skips_the_effect() {
    let mut ctx = dom();
    let title = Expr::Static(Box::new(Expr::member(Expr::ident("props"), "title")));
    let node = JsxNode::element("div", vec![attr("title", title)], vec![]);
    let out = compile(&mut ctx, &node);
    assert!(out.contains("_$setAttribute(_el$, \"title\", props.title);"));
    assert!(!ctx.imports.contains_key("effect"));
}

#[test]
fn reactive_attributes_share_one_effect() {
    let mut ctx = dom();
    let node = JsxNode::element(
        "a",
        vec![
            attr("href", Expr::member(Expr::ident("props"), "url")),
            attr("title", Expr::member(Expr::ident("props"), "title")),
        ],
        vec![],
    );
    let out = compile(&mut ctx, &node);
    assert_eq!(out.matches("_$effect(").count(), 1);
    assert!(out.contains("_v$ !== _p$._v$ && _$setAttribute(_el$, \"href\", _p$._v$ = _v$);"));
    assert!(out.contains("_v$2 !== _p$._v$2 && _$setAttribute(_el$, \"title\", _p$._v$2 = _v$2);"));
}

#[test]
fn variable_ref_is_assigned_or_called() {
    let mut ctx = dom();
    let node = JsxNode::element("div", vec![attr("ref", Expr::ident("el"))], vec![]);
    let out = compile(&mut ctx, &node);
    assert!(out.contains("const _ref$ = el;"));
    assert!(out.contains("typeof _ref$ === \"function\" ? _ref$(_el$) : el = _el$;"));
}

#[test]
fn spreads_go_through_the_spread_helper() {
    let mut ctx = dom();
    let node = JsxNode::element(
        "div",
        vec![
            JsxAttribute::Spread(Expr::ident("props")),
            JsxAttribute::Attribute {
                name: "id".into(),
                value: Some(AttrValue::Str("x".into())),
            },
        ],
        vec![],
    );
    let out = compile(&mut ctx, &node);
    assert!(out.contains("_$spread(_el$, _$assignProps(props, { \"id\": \"x\" }), false, false);"));
    assert_eq!(template_html(&ctx, 0), "<div></div>");
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn delegated_event_is_registered_once() {
    let mut ctx = dom();
    let node = JsxNode::element("div", vec![attr("onClick", Expr::ident("f"))], vec![]);
    let out = compile(&mut ctx, &node);
    compile(&mut ctx, &node);
    assert!(out.contains("_el$.__click = f;"));
    assert!(!out.contains("addEventListener"));
    assert_eq!(ctx.delegated_events.iter().collect::<Vec<_>>(), vec!["click"]);
}

#[test]
fn excluded_event_is_bound_directly() {
    let mut ctx = CompileContext::new(CompileOptions {
        non_delegate_events: vec!["click".into()],
        ..Default::default()
    });
    let node = JsxNode::element("div", vec![attr("onClick", Expr::ident("f"))], vec![]);
    let out = compile(&mut ctx, &node);
    assert!(out.contains("_el$.addEventListener(\"click\", f);"));
    assert!(ctx.delegated_events.is_empty());
}

#[test]
fn namespaced_listener_is_never_delegated() {
    let mut ctx = dom();
    let node = JsxNode::element("div", vec![attr("on:click", Expr::ident("f"))], vec![]);
    let out = compile(&mut ctx, &node);
    assert!(out.contains("_el$.addEventListener(\"click\", f);"));
    assert!(ctx.delegated_events.is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHILDREN & MARKERS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn text_wrapped_insert_anchors_without_markers() {
    let mut ctx = dom();
    let node = JsxNode::element(
        "div",
        vec![],
        vec![text("Hello "), child(call("name")), text(" world")],
    );
    assert_eq!(
        compile(&mut ctx, &node),
        [
            "(() => {",
            "  const _el$ = _tmpl$.cloneNode(true),",
            "    _el$2 = _el$.firstChild,",
            "    _el$4 = _el$2.nextSibling;",
            "  _$insert(_el$, name, _el$4);",
            "  return _el$;",
            "})()",
        ]
        .join("\n")
    );
    let html = template_html(&ctx, 0);
    assert_eq!(html, "<div>Hello <!----> world</div>");
    assert!(!html.contains("<!--#-->"));
}

#[test]
fn trailing_text_is_not_referenced() {
    let mut ctx = dom();
    let node = JsxNode::element("div", vec![], vec![text("a"), child(call("x")), text("b")]);
    let out = compile(&mut ctx, &node);
    assert!(!out.contains("_el$3"));
    assert!(out.contains("_$insert(_el$, x, _el$4);"));
}

#[test]
fn text_used_as_an_anchor_keeps_its_reference() {
    let mut ctx = dom();
    let node = JsxNode::element("div", vec![], vec![child(call("x")), text("b")]);
    let out = compile(&mut ctx, &node);
    assert!(out.contains("const _el$ = _tmpl$.cloneNode(true),\n    _el$2 = _el$.firstChild;"));
    assert!(out.contains("_$insert(_el$, x, _el$2);"));
}

#[test]
fn insert_anchors_on_the_following_element() {
    let mut ctx = dom();
    let node = JsxNode::element(
        "div",
        vec![],
        vec![
            JsxNode::element("b", vec![], vec![]),
            child(call("x")),
            JsxNode::element("i", vec![], vec![]),
        ],
    );
    let out = compile(&mut ctx, &node);
    assert!(out.contains("_el$2 = _el$.firstChild,"));
    assert!(out.contains("_el$3 = _el$2.nextSibling;"));
    assert!(out.contains("_$insert(_el$, x, _el$3);"));
    assert_eq!(template_html(&ctx, 0), "<div><b></b><i></i></div>");
}

#[test]
fn hydration_bounds_the_region_with_markers() {
    let mut ctx = CompileContext::new(CompileOptions {
        hydratable: true,
        ..Default::default()
    });
    let node = JsxNode::element(
        "div",
        vec![],
        vec![text("Hello "), child(call("name")), text(" world")],
    );
    let out = compile(&mut ctx, &node);
    assert!(out.contains("const _el$ = _$getNextElement(_tmpl$),"));
    assert!(out.contains("[_el$5, _co$] = _$getNextMarker(_el$4.nextSibling)"));
    assert!(out.contains("_$insert(_el$, name, _el$5, _co$);"));
    let html = template_html(&ctx, 0);
    assert_eq!(html, "<div>Hello <!--#--><!--/--> world</div>");
    assert_eq!(html.matches("<!--#-->").count(), 1);
}

#[test]
fn several_dynamic_regions_get_markers() {
    let mut ctx = dom();
    let node = JsxNode::element("div", vec![], vec![child(call("a")), child(call("b"))]);
    let out = compile(&mut ctx, &node);
    assert!(out.contains("_$insert(_el$, a, _el$3);"));
    assert!(out.contains("_$insert(_el$, b, _el$5);"));
    assert_eq!(
        template_html(&ctx, 0),
        "<div><!--#--><!--/--><!--#--><!--/--></div>"
    );
}

#[test]
fn static_child_is_inserted_once() {
    let mut ctx = dom();
    let once = Expr::Static(Box::new(call("count")));
    let node = JsxNode::element("div", vec![], vec![child(once)]);
    let out = compile(&mut ctx, &node);
    assert!(out.contains("_$insert(_el$, count());"));
}

#[test]
fn literal_children_are_escaped_into_the_template() {
    let mut ctx = dom();
    let node = JsxNode::element("p", vec![], vec![child(Expr::str("<b>&"))]);
    assert_eq!(compile(&mut ctx, &node), "_tmpl$.cloneNode(true)");
    assert_eq!(template_html(&ctx, 0), "<p>&lt;b&gt;&amp;</p>");
}

#[test]
fn dynamic_conditional_child_is_memoized() {
    let mut ctx = dom();
    let cond = Expr::logical(
        "&&",
        Expr::member(Expr::ident("cond"), "a"),
        Expr::Jsx(Box::new(JsxNode::element("Dynamic", vec![], vec![]))),
    );
    let node = JsxNode::element("div", vec![], vec![child(cond)]);
    let out = compile(&mut ctx, &node);
    assert!(out.contains("const _c$ = _$memo(() => !!cond.a);"));
    assert!(out.contains("return () => _c$() && _$createComponent(Dynamic, {});"));
    assert_eq!(out.matches("_c$()").count(), 1);
}

#[test]
fn top_level_svg_child_is_wrapped() {
    let mut ctx = dom();
    compile(&mut ctx, &JsxNode::element("rect", vec![], vec![]));
    match &ctx.templates.entries()[0].kind {
        TemplateKind::Dom { html, is_svg, .. } => {
            assert_eq!(html, "<svg><rect></rect></svg>");
            assert!(*is_svg);
        }
        other => panic!("dom template expected, got {:?}", other),
    }
}
