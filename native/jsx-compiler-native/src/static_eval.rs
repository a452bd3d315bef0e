//! Dynamic-ness classification and compile-time evaluation.
//!
//! `is_dynamic` decides whether an expression has to be deferred behind a
//! closure. It never descends into nested functions and stops at the first
//! match.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::codegen::format_number;
use crate::context::CompileContext;
use crate::ir::{Expr, JsxNode, MemberProp, Prop, PropKey};

#[derive(Debug, Clone, Copy)]
pub struct DynamicCheck {
    pub check_member: bool,
    pub check_tags: bool,
    pub check_call_expressions: bool,
    pub native: bool,
}

impl Default for DynamicCheck {
    fn default() -> Self {
        DynamicCheck {
            check_member: false,
            check_tags: false,
            check_call_expressions: true,
            native: false,
        }
    }
}

impl DynamicCheck {
    pub fn member() -> Self {
        DynamicCheck {
            check_member: true,
            ..Default::default()
        }
    }

    pub fn tags() -> Self {
        DynamicCheck {
            check_tags: true,
            ..Default::default()
        }
    }

    pub fn with_tags(mut self, check_tags: bool) -> Self {
        self.check_tags = check_tags;
        self
    }

    pub fn with_native(mut self, native: bool) -> Self {
        self.native = native;
        self
    }
}

pub fn is_dynamic(ctx: &CompileContext, expr: &Expr, check: DynamicCheck) -> bool {
    let mut check = check;
    // a single synchronous string render never re-reads anything
    if ctx.is_ssr() && check.native && !ctx.options.is_async {
        check.check_member = false;
        check.check_call_expressions = false;
    }
    if matches!(expr, Expr::Static(_)) || expr.is_function() {
        return false;
    }
    Scan { ctx, check }.expr(expr)
}

struct Scan<'c> {
    ctx: &'c CompileContext,
    check: DynamicCheck,
}

impl Scan<'_> {
    fn any(&self, exprs: &[Expr]) -> bool {
        exprs.iter().any(|e| self.expr(e))
    }

    fn expr(&self, expr: &Expr) -> bool {
        let check = &self.check;
        match expr {
            Expr::Ident(_) | Expr::Str(_) | Expr::Num(_) | Expr::Bool(_) | Expr::Null => false,
            Expr::Static(_) | Expr::Arrow { .. } => false,
            Expr::Pure(inner) => self.expr(inner),
            Expr::Template { exprs, .. } => self.any(exprs),
            Expr::Member {
                object, property, ..
            } => {
                let computed_dynamic = match property {
                    MemberProp::Computed(p) => self.expr(p),
                    MemberProp::Static(_) => false,
                };
                if check.check_member {
                    if let Expr::Ident(name) = object.as_ref() {
                        if self.ctx.scope.is_namespace_import(name) && !computed_dynamic {
                            return false;
                        }
                    }
                    return true;
                }
                self.expr(object) || computed_dynamic
            }
            Expr::Call { callee, args, .. } => {
                check.check_call_expressions || self.expr(callee) || self.any(args)
            }
            Expr::Unary { arg, .. } => self.expr(arg),
            Expr::Binary { op, left, right } => {
                (check.check_member && *op == "in") || self.expr(left) || self.expr(right)
            }
            Expr::Logical { left, right, .. } => self.expr(left) || self.expr(right),
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => self.expr(test) || self.expr(consequent) || self.expr(alternate),
            Expr::Assign { target, value, .. } => self.expr(target) || self.expr(value),
            Expr::Object(props) => props.iter().any(|p| match p {
                Prop::Init { key, value } => {
                    let key_dynamic = match key {
                        PropKey::Computed(k) => self.expr(k),
                        _ => false,
                    };
                    key_dynamic || self.expr(value)
                }
                Prop::Spread(arg) => check.check_member || self.expr(arg),
                Prop::Getter { .. } | Prop::Method { .. } | Prop::Raw(_) => false,
            }),
            Expr::Array(items) | Expr::Sequence(items) => self.any(items),
            Expr::Spread(arg) => check.check_member || self.expr(arg),
            Expr::Jsx(node) => {
                check.check_tags && !matches!(node.as_ref(), JsxNode::Fragment(c) if c.is_empty())
            }
            Expr::Raw(raw) => {
                !raw.traits.function
                    && ((check.check_call_expressions && raw.traits.call)
                        || (check.check_member && raw.traits.member)
                        || (check.check_tags && raw.traits.jsx))
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATIC EVALUATION
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum StaticValue {
    Str(String),
    Num(f64),
}

impl StaticValue {
    pub fn to_text(&self) -> String {
        match self {
            StaticValue::Str(s) => s.clone(),
            StaticValue::Num(n) => format_number(*n),
        }
    }
}

/// Folds string and number literals (and `+` over them) to a value.
pub fn evaluate(expr: &Expr) -> Option<StaticValue> {
    match expr {
        Expr::Str(s) => Some(StaticValue::Str(s.clone())),
        Expr::Num(n) => Some(StaticValue::Num(*n)),
        Expr::Template { quasis, exprs } if exprs.is_empty() => {
            Some(StaticValue::Str(quasis.concat()))
        }
        Expr::Unary { op: "-", arg } => match evaluate(arg)? {
            StaticValue::Num(n) => Some(StaticValue::Num(-n)),
            StaticValue::Str(_) => None,
        },
        Expr::Binary {
            op: "+",
            left,
            right,
        } => match (evaluate(left)?, evaluate(right)?) {
            (StaticValue::Num(a), StaticValue::Num(b)) => Some(StaticValue::Num(a + b)),
            (a, b) => Some(StaticValue::Str(a.to_text() + &b.to_text())),
        },
        Expr::Static(inner) => evaluate(inner),
        _ => None,
    }
}

/// Truthiness of a literal, when known at compile time.
pub fn evaluate_truthiness(expr: &Expr) -> Option<bool> {
    match expr.inner() {
        Expr::Bool(b) => Some(*b),
        Expr::Null => Some(false),
        Expr::Ident(name) if name == "undefined" => Some(false),
        e => evaluate(e).map(|v| match v {
            StaticValue::Str(s) => !s.is_empty(),
            StaticValue::Num(n) => n != 0.0 && !n.is_nan(),
        }),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// JSX TEXT & NAMES
// ═══════════════════════════════════════════════════════════════════════════════

lazy_static! {
    static ref LEADING_SPACE: Regex = Regex::new(r"^\s*").unwrap();
    static ref BLANK: Regex = Regex::new(r"^\s*$").unwrap();
    static ref SPACES: Regex = Regex::new(r"\s+").unwrap();
    static ref NEWLINE_ONLY: Regex = Regex::new(r"^[\r\n]\s*$").unwrap();
    static ref PLAIN_SPACES: Regex = Regex::new(r"^ *$").unwrap();
    static ref DASH_LETTER: Regex = Regex::new(r"-([a-z])").unwrap();
}

/// Collapses JSX text whitespace the way JSX semantics require.
pub fn trim_whitespace(text: &str) -> String {
    let text = text.replace('\r', "");
    let text = if text.contains('\n') {
        text.split('\n')
            .enumerate()
            .map(|(i, line)| {
                if i > 0 {
                    LEADING_SPACE.replace(line, "").into_owned()
                } else {
                    line.to_string()
                }
            })
            .filter(|line| !BLANK.is_match(line))
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        text
    };
    SPACES.replace_all(&text, " ").into_owned()
}

/// Drops empty expression containers and newline-only whitespace text.
pub fn filter_children(children: &[JsxNode]) -> Vec<&JsxNode> {
    children
        .iter()
        .filter(|child| match child {
            JsxNode::Expression(None) => false,
            JsxNode::Text(raw) => !NEWLINE_ONLY.is_match(raw),
            _ => true,
        })
        .collect()
}

/// Whether more than one child would produce output.
pub fn check_length(children: &[&JsxNode]) -> bool {
    children
        .iter()
        .filter(|child| match child {
            JsxNode::Expression(None) => false,
            JsxNode::Text(raw) => !BLANK.is_match(raw) || PLAIN_SPACES.is_match(raw),
            _ => true,
        })
        .count()
        > 1
}

pub fn is_component(tag_name: &str) -> bool {
    match tag_name.chars().next() {
        Some(first) => {
            first.to_lowercase().next() != Some(first)
                || tag_name.contains('.')
                || !first.is_ascii_alphabetic()
        }
        None => false,
    }
}

pub fn to_event_name(name: &str) -> String {
    name.get(2..).unwrap_or_default().to_lowercase()
}

/// `my-prop` to `myProp` for custom element properties.
pub fn to_property_name(name: &str) -> String {
    let lower = name.to_lowercase();
    DASH_LETTER
        .replace_all(&lower, |caps: &Captures| caps[1].to_uppercase())
        .into_owned()
}

/// Decodes HTML character references in JSX text that becomes a JS string.
pub fn decode_entities(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompileOptions;
    use crate::ir::RawExpr;

    fn dom() -> CompileContext {
        CompileContext::new(CompileOptions::default())
    }

    fn member(obj: &str, prop: &str) -> Expr {
        Expr::member(Expr::ident(obj), prop)
    }

    #[test]
    fn literals_and_functions_are_static() {
        let ctx = dom();
        assert!(!is_dynamic(&ctx, &Expr::str("a"), DynamicCheck::member()));
        assert!(!is_dynamic(&ctx, &Expr::ident("a"), DynamicCheck::member()));
        let f = Expr::thunk(Expr::call(Expr::ident("a"), vec![]));
        assert!(!is_dynamic(&ctx, &f, DynamicCheck::member()));
    }

    #[test]
    fn calls_and_members_are_dynamic() {
        let ctx = dom();
        assert!(is_dynamic(&ctx, &Expr::call(Expr::ident("a"), vec![]), DynamicCheck::default()));
        assert!(is_dynamic(&ctx, &member("a", "b"), DynamicCheck::member()));
        assert!(!is_dynamic(&ctx, &member("a", "b"), DynamicCheck::default()));
        let nested = Expr::binary("+", Expr::str("x"), member("a", "b"));
        assert!(is_dynamic(&ctx, &nested, DynamicCheck::member()));
    }

    #[test]
    fn static_marker_wins() {
        let ctx = dom();
        let marked = Expr::Static(Box::new(Expr::call(member("a", "b"), vec![])));
        assert!(!is_dynamic(&ctx, &marked, DynamicCheck::member()));
    }

    #[test]
    fn namespace_import_members_are_static() {
        let mut ctx = dom();
        ctx.scope.namespace_imports.insert("icons".to_string());
        assert!(!is_dynamic(&ctx, &member("icons", "Home"), DynamicCheck::member()));
    }

    #[test]
    fn ssr_native_ignores_member_and_calls() {
        let ctx = CompileContext::new(CompileOptions::ssr());
        let e = Expr::call(member("a", "b"), vec![]);
        assert!(!is_dynamic(&ctx, &e, DynamicCheck::member().with_native(true)));
        assert!(is_dynamic(&ctx, &e, DynamicCheck::member()));

        let mut opts = CompileOptions::ssr();
        opts.is_async = true;
        let ctx = CompileContext::new(opts);
        assert!(is_dynamic(&ctx, &e, DynamicCheck::member().with_native(true)));
    }

    #[test]
    fn jsx_only_counts_with_tags() {
        let ctx = dom();
        let jsx = Expr::Jsx(Box::new(JsxNode::element("div", vec![], vec![])));
        assert!(!is_dynamic(&ctx, &jsx, DynamicCheck::member()));
        assert!(is_dynamic(&ctx, &jsx, DynamicCheck::tags()));
    }

    #[test]
    fn raw_traits_drive_classification() {
        let ctx = dom();
        let raw = Expr::Raw(RawExpr {
            code: "new Foo(a.b)".into(),
            prec: 17,
            traits: crate::ir::RawTraits {
                member: true,
                ..Default::default()
            },
            jsx: vec![],
        });
        assert!(is_dynamic(&ctx, &raw, DynamicCheck::member()));
        assert!(!is_dynamic(&ctx, &raw, DynamicCheck::default()));
    }

    #[test]
    fn evaluates_literals() {
        assert_eq!(evaluate(&Expr::str("a")), Some(StaticValue::Str("a".into())));
        assert_eq!(
            evaluate(&Expr::unary("-", Expr::Num(2.0))),
            Some(StaticValue::Num(-2.0))
        );
        assert_eq!(
            evaluate(&Expr::binary("+", Expr::str("a"), Expr::Num(1.0))),
            Some(StaticValue::Str("a1".into()))
        );
        assert_eq!(evaluate(&Expr::ident("a")), None);
    }

    #[test]
    fn trims_jsx_whitespace() {
        assert_eq!(trim_whitespace("\n    Hello\n    World\n  "), "Hello World");
        assert_eq!(trim_whitespace("  a  b "), " a b ");
        assert_eq!(trim_whitespace("a\n\n   b"), "a b");
    }

    #[test]
    fn filters_and_counts_children() {
        let children = vec![
            JsxNode::Text("\n  ".into()),
            JsxNode::Expression(None),
            JsxNode::Text(" ".into()),
            JsxNode::element("b", vec![], vec![]),
        ];
        let filtered = filter_children(&children);
        assert_eq!(filtered.len(), 2);
        assert!(check_length(&filtered));
        assert!(!check_length(&filtered[1..]));
    }

    #[test]
    fn component_names() {
        assert!(is_component("Foo"));
        assert!(is_component("foo.bar"));
        assert!(is_component("_x"));
        assert!(!is_component("div"));
        assert!(!is_component("my-element"));
    }

    #[test]
    fn event_and_property_names() {
        assert_eq!(to_event_name("onClick"), "click");
        assert_eq!(to_property_name("my-prop"), "myProp");
    }

    #[test]
    fn decodes_entities() {
        assert_eq!(decode_entities("a &amp; b&nbsp;&#65;&#x42;"), "a & b\u{a0}AB");
        assert_eq!(decode_entities("&unknown;"), "&unknown;");
        assert_eq!(decode_entities("&Alpha;&rarr;&hellip;&frac12;"), "\u{391}\u{2192}\u{2026}\u{bd}");
    }
}
