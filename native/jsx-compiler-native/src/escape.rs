//! HTML escaping at compile time and escape pushdown for SSR slots.

use std::borrow::Cow;

use crate::context::CompileContext;
use crate::ir::{ArrowBody, Expr, JsxNode, Stmt};

/// Escapes markup-significant characters for the given context.
///
/// Strings with neither `&` nor the context delimiter (`"` for attributes,
/// `<` for text) are returned borrowed. Otherwise one left-to-right pass
/// rewrites `&`, `<`, `>` and, in attribute context, `"`.
pub fn escape_html(s: &str, attr: bool) -> Cow<'_, str> {
    let delim = if attr { '"' } else { '<' };
    if !s.contains('&') && !s.contains(delim) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 16);
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attr => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Makes text safe inside a template literal.
pub fn escape_backticks(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${")
}

/// Pushes escaping down to the leaves of `expr`.
///
/// Literals stay as they are (escaped at compile time when `escape_literals`),
/// JSX elements are left for the SSR compiler, everything else goes through the
/// runtime `escape` helper.
pub fn escape_expression(
    ctx: &mut CompileContext,
    expr: Expr,
    attr: bool,
    escape_literals: bool,
) -> Expr {
    match expr {
        Expr::Str(s) => {
            if escape_literals {
                Expr::Str(escape_html(&s, attr).into_owned())
            } else {
                Expr::Str(s)
            }
        }
        Expr::Num(_) | Expr::Bool(_) | Expr::Null => expr,
        Expr::Template { quasis, exprs } if exprs.is_empty() => {
            let quasis = if escape_literals {
                quasis
                    .iter()
                    .map(|q| escape_html(q, attr).into_owned())
                    .collect()
            } else {
                quasis
            };
            Expr::Template { quasis, exprs }
        }
        Expr::Template { quasis, exprs } => Expr::Template {
            quasis,
            exprs: exprs
                .into_iter()
                .map(|e| escape_expression(ctx, e, attr, escape_literals))
                .collect(),
        },
        Expr::Arrow { params, body } => Expr::Arrow {
            params,
            body: escape_body(ctx, body, attr, escape_literals),
        },
        Expr::Unary { .. } => expr,
        Expr::Binary { op, left, right } => Expr::Binary {
            op,
            left: Box::new(escape_expression(ctx, *left, attr, escape_literals)),
            right: Box::new(escape_expression(ctx, *right, attr, escape_literals)),
        },
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => Expr::Conditional {
            test,
            consequent: Box::new(escape_expression(ctx, *consequent, attr, escape_literals)),
            alternate: Box::new(escape_expression(ctx, *alternate, attr, escape_literals)),
        },
        Expr::Logical { op, left, right } => {
            let left = if op == "&&" {
                left
            } else {
                Box::new(escape_expression(ctx, *left, attr, escape_literals))
            };
            Expr::Logical {
                op,
                left,
                right: Box::new(escape_expression(ctx, *right, attr, escape_literals)),
            }
        }
        Expr::Call {
            callee,
            args,
            optional,
        } if matches!(callee.as_ref(), Expr::Arrow { .. }) => {
            let callee = match *callee {
                Expr::Arrow { params, body } => Expr::Arrow {
                    params,
                    body: escape_body(ctx, body, attr, escape_literals),
                },
                other => other,
            };
            Expr::Call {
                callee: Box::new(callee),
                args,
                optional,
            }
        }
        Expr::Jsx(node) if is_rendered_element(&node) => Expr::Jsx(node),
        Expr::Static(inner) => {
            Expr::Static(Box::new(escape_expression(ctx, *inner, attr, escape_literals)))
        }
        other => {
            let helper = ctx.helper("escape");
            let mut args = vec![other];
            if attr {
                args.push(Expr::Bool(true));
            }
            Expr::call(helper, args)
        }
    }
}

fn escape_body(
    ctx: &mut CompileContext,
    body: ArrowBody,
    attr: bool,
    escape_literals: bool,
) -> ArrowBody {
    match body {
        ArrowBody::Expr(e) => ArrowBody::Expr(Box::new(escape_expression(
            ctx,
            *e,
            attr,
            escape_literals,
        ))),
        ArrowBody::Block(stmts) => ArrowBody::Block(
            stmts
                .into_iter()
                .map(|s| match s {
                    Stmt::Return(e) => Stmt::Return(escape_expression(ctx, e, attr, escape_literals)),
                    other => other,
                })
                .collect(),
        ),
    }
}

/// Compiled elements and components already render to markup.
fn is_rendered_element(node: &JsxNode) -> bool {
    matches!(node, JsxNode::Element(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::print_expr;
    use crate::config::CompileOptions;
    use pretty_assertions::assert_eq;

    #[test]
    fn escapes_text_and_attribute_contexts() {
        assert_eq!(
            escape_html("<a>&\"b\"</a>", false),
            "&lt;a&gt;&amp;\"b\"&lt;/a&gt;"
        );
        assert_eq!(
            escape_html("<a>&\"b\"</a>", true),
            "&lt;a&gt;&amp;&quot;b&quot;&lt;/a&gt;"
        );
    }

    #[test]
    fn untouched_input_is_borrowed() {
        let input = "plain text > still plain";
        match escape_html(input, false) {
            Cow::Borrowed(s) => assert!(std::ptr::eq(s, input)),
            Cow::Owned(_) => panic!("expected the input back"),
        }
    }

    #[test]
    fn backticks_and_interpolations() {
        assert_eq!(escape_backticks("a`b${c}\\"), "a\\`b\\${c}\\\\");
    }

    #[test]
    fn escaping_is_pushed_to_leaves() {
        let mut ctx = CompileContext::new(CompileOptions::ssr());
        let e = Expr::conditional(
            Expr::ident("ok"),
            Expr::ident("name"),
            Expr::str("<none>"),
        );
        let escaped = escape_expression(&mut ctx, e, false, true);
        assert_eq!(print_expr(&escaped), "ok ? _$escape(name) : \"&lt;none&gt;\"");
    }

    #[test]
    fn logical_and_keeps_its_test() {
        let mut ctx = CompileContext::new(CompileOptions::ssr());
        let e = Expr::logical("&&", Expr::ident("show"), Expr::ident("text"));
        let escaped = escape_expression(&mut ctx, e, true, false);
        assert_eq!(print_expr(&escaped), "show && _$escape(text, true)");
    }
}
