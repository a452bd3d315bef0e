//! Conditional memoization.
//!
//! `cond && <A/>` and `cond ? <A/> : <B/>` re-run their branch whenever
//! anything they read changes. When the test itself is reactive, it is moved
//! behind a memo so the branch is only recreated when its truth value flips.

use crate::context::CompileContext;
use crate::ir::{Declarator, Expr, Stmt};
use crate::static_eval::{is_dynamic, DynamicCheck};

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Accessor (or, for `deep`, the rewritten expression itself).
    Expr(Expr),
    /// A memo declaration the caller has to emit before `body`.
    Memoized { decl: Stmt, body: Expr },
}

impl Condition {
    /// Folds a memoized condition into one expression: an IIFE that declares
    /// the memo and returns the accessor.
    pub fn into_expr(self) -> Expr {
        match self {
            Condition::Expr(e) => e,
            Condition::Memoized { decl, body } => Expr::iife(vec![decl, Stmt::Return(body)]),
        }
    }
}

fn boolean_test(test: Expr) -> Expr {
    match test {
        Expr::Binary { .. } => test,
        other => other.to_boolean(),
    }
}

struct Memo {
    /// Local id (`_c$`) when not inline.
    id: Option<String>,
    cond: Expr,
}

/// Rewrites `expr` so a reactive test is read through a memo.
///
/// `inline` puts the memo call directly in the test position (used for props
/// and spreads); otherwise a `_c$` local is declared. `deep` returns the bare
/// rewritten expression rather than an accessor.
pub fn transform_condition(ctx: &mut CompileContext, expr: Expr, inline: bool, deep: bool) -> Condition {
    let memo_name = ctx.options.memo_wrapper.clone();
    // an inline memo is a call, so without a wrapper the test is read directly
    if inline && memo_name.is_empty() {
        return if deep {
            Condition::Expr(expr)
        } else {
            Condition::Expr(Expr::thunk(expr))
        };
    }
    let mut memo: Option<Memo> = None;

    let expr = match expr {
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } if is_dynamic(ctx, &consequent, DynamicCheck::tags())
            || is_dynamic(ctx, &alternate, DynamicCheck::tags()) =>
        {
            if is_dynamic(ctx, &test, DynamicCheck::member()) {
                let cond = boolean_test(*test);
                let (accessor, id) = accessor(ctx, &memo_name, &cond, inline);
                memo = Some(Memo { id, cond });
                let consequent = nested(ctx, *consequent, inline);
                let alternate = nested(ctx, *alternate, inline);
                Expr::conditional(Expr::call(accessor, vec![]), consequent, alternate)
            } else {
                Expr::Conditional {
                    test,
                    consequent,
                    alternate,
                }
            }
        }
        Expr::Logical { op, left, right } => {
            let (rewritten, found) = rewrite_logical(ctx, op, *left, *right, &memo_name, inline);
            memo = found;
            rewritten
        }
        other => other,
    };

    match memo {
        Some(Memo { id: Some(id), cond }) => {
            let init = if memo_name.is_empty() {
                Expr::thunk(cond)
            } else {
                Expr::call(ctx.helper(&memo_name), vec![Expr::thunk(cond)])
            };
            let decl = Stmt::Const(vec![Declarator::new(&id, init)]);
            let body = Expr::thunk(expr);
            if deep {
                Condition::Expr(Expr::iife(vec![decl, Stmt::Return(body)]))
            } else {
                Condition::Memoized { decl, body }
            }
        }
        _ if deep => Condition::Expr(expr),
        _ => Condition::Expr(Expr::thunk(expr)),
    }
}

fn nested(ctx: &mut CompileContext, branch: Expr, inline: bool) -> Expr {
    if branch.is_logical_or_conditional() {
        transform_condition(ctx, branch, inline, true).into_expr()
    } else {
        branch
    }
}

fn accessor(
    ctx: &mut CompileContext,
    memo_name: &str,
    cond: &Expr,
    inline: bool,
) -> (Expr, Option<String>) {
    if inline {
        let memo = ctx.helper(memo_name);
        (Expr::call(memo, vec![Expr::thunk(cond.clone())]), None)
    } else {
        let id = ctx.uid("_c$");
        (Expr::Ident(id.clone()), Some(id))
    }
}

/// Finds the innermost `&&` along the left spine (`a && <A/> || <B/>`) and
/// memoizes its test.
fn rewrite_logical(
    ctx: &mut CompileContext,
    op: &'static str,
    left: Expr,
    right: Expr,
    memo_name: &str,
    inline: bool,
) -> (Expr, Option<Memo>) {
    if op != "&&" {
        if let Expr::Logical {
            op: inner_op,
            left: inner_left,
            right: inner_right,
        } = left
        {
            let (rewritten, memo) =
                rewrite_logical(ctx, inner_op, *inner_left, *inner_right, memo_name, inline);
            return (Expr::logical(op, rewritten, right), memo);
        }
        return (Expr::logical(op, left, right), None);
    }
    if is_dynamic(ctx, &right, DynamicCheck::tags()) && is_dynamic(ctx, &left, DynamicCheck::member()) {
        let cond = boolean_test(left);
        let (accessor, id) = accessor(ctx, memo_name, &cond, inline);
        let rewritten = Expr::logical("&&", Expr::call(accessor, vec![]), right);
        return (rewritten, Some(Memo { id, cond }));
    }
    (Expr::logical(op, left, right), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::{print_expr, print_stmt};
    use crate::config::CompileOptions;
    use crate::ir::JsxNode;
    use pretty_assertions::assert_eq;

    fn jsx(name: &str) -> Expr {
        Expr::Jsx(Box::new(JsxNode::element(name, vec![], vec![])))
    }

    fn member(obj: &str, prop: &str) -> Expr {
        Expr::member(Expr::ident(obj), prop)
    }

    #[test]
    fn memoizes_dynamic_and_test() {
        let mut ctx = CompileContext::new(CompileOptions::default());
        let expr = Expr::logical("&&", member("cond", "a"), jsx("Dynamic"));
        match transform_condition(&mut ctx, expr, false, false) {
            Condition::Memoized { decl, body } => {
                assert_eq!(print_stmt(&decl), "const _c$ = _$memo(() => !!cond.a);");
                let Expr::Arrow { .. } = &body else {
                    panic!("expected accessor")
                };
                let printed = print_expr(&body);
                assert!(printed.starts_with("() => _c$() && "));
                assert_eq!(printed.matches("_c$()").count(), 1);
            }
            other => panic!("expected memoized condition, got {:?}", other),
        }
    }

    #[test]
    fn static_test_is_left_alone() {
        let mut ctx = CompileContext::new(CompileOptions::default());
        let expr = Expr::logical("&&", Expr::ident("flag"), jsx("div"));
        let cond = transform_condition(&mut ctx, expr, false, false);
        assert!(matches!(cond, Condition::Expr(Expr::Arrow { .. })));
        assert!(ctx.imports.is_empty());
    }

    #[test]
    fn inline_ternary_with_comparison() {
        let mut ctx = CompileContext::new(CompileOptions::default());
        let test = Expr::binary("===", member("state", "mode"), Expr::str("a"));
        let expr = Expr::conditional(test, jsx("A"), jsx("B"));
        let Condition::Expr(accessor) = transform_condition(&mut ctx, expr, true, false) else {
            panic!("inline conditions never need a declaration");
        };
        let Some(Expr::Conditional { test, .. }) = accessor.thunk_body() else {
            panic!("expected a ternary accessor");
        };
        assert_eq!(
            print_expr(test),
            "_$memo(() => state.mode === \"a\")()"
        );
    }

    #[test]
    fn inline_condition_without_memo_wrapper_reads_the_test() {
        let mut ctx = CompileContext::new(CompileOptions {
            memo_wrapper: String::new(),
            ..Default::default()
        });
        let expr = Expr::conditional(member("cond", "x"), jsx("A"), jsx("B"));
        let Condition::Expr(accessor) = transform_condition(&mut ctx, expr, true, false) else {
            panic!("inline conditions never need a declaration");
        };
        let Some(Expr::Conditional { test, .. }) = accessor.thunk_body() else {
            panic!("expected a ternary accessor");
        };
        assert_eq!(print_expr(test), "cond.x");
        assert!(ctx.imports.is_empty());
    }

    #[test]
    fn chained_or_memoizes_inner_and() {
        let mut ctx = CompileContext::new(CompileOptions::default());
        let expr = Expr::logical(
            "||",
            Expr::logical("&&", member("s", "ok"), jsx("A")),
            jsx("B"),
        );
        let cond = transform_condition(&mut ctx, expr, true, true);
        let Condition::Expr(Expr::Logical { left, .. }) = cond else {
            panic!("expected the rewritten logical");
        };
        let Expr::Logical { left: test, .. } = *left else {
            panic!("expected inner &&");
        };
        assert_eq!(print_expr(&test), "_$memo(() => !!s.ok)()");
    }
}
