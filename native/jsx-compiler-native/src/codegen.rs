//! JavaScript printer for the compiler's output tree.
//!
//! Parentheses are derived from operator precedence, so the tree never stores
//! them. Blocks are indented two spaces per level relative to the line the
//! expression starts on.

use crate::ir::{ArrowBody, Declarator, Expr, MemberProp, Pattern, Prop, PropKey, Stmt};

const PREC_SEQUENCE: u8 = 1;
const PREC_ASSIGN: u8 = 2;
const PREC_CONDITIONAL: u8 = 3;
const PREC_UNARY: u8 = 16;
const PREC_CALL: u8 = 18;
const PREC_PRIMARY: u8 = 19;

pub fn print_expr(expr: &Expr) -> String {
    let mut printer = Printer::default();
    printer.expr(expr, PREC_SEQUENCE);
    printer.out
}

pub fn print_stmt(stmt: &Stmt) -> String {
    let mut printer = Printer::default();
    printer.stmt(stmt);
    printer.out
}

#[cfg(test)]
pub fn print_stmts(stmts: &[Stmt]) -> String {
    stmts.iter().map(print_stmt).collect::<Vec<_>>().join("\n")
}

/// JSON string escaping is a valid JS double-quoted literal.
pub fn quote(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value))
}

pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        format!("{}", value)
    }
}

fn binary_precedence(op: &str) -> u8 {
    match op {
        "??" => 4,
        "||" => 5,
        "&&" => 6,
        "|" => 7,
        "^" => 8,
        "&" => 9,
        "==" | "!=" | "===" | "!==" => 10,
        "<" | ">" | "<=" | ">=" | "instanceof" | "in" => 11,
        "<<" | ">>" | ">>>" => 12,
        "+" | "-" => 13,
        "*" | "/" | "%" => 14,
        "**" => 15,
        _ => 13,
    }
}

pub fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Sequence(_) => PREC_SEQUENCE,
        Expr::Assign { .. } | Expr::Arrow { .. } | Expr::Spread(_) => PREC_ASSIGN,
        Expr::Conditional { .. } => PREC_CONDITIONAL,
        Expr::Binary { op, .. } | Expr::Logical { op, .. } => binary_precedence(op),
        Expr::Unary { .. } => PREC_UNARY,
        Expr::Call { .. } | Expr::Member { .. } => PREC_CALL,
        Expr::Static(inner) | Expr::Pure(inner) => precedence(inner),
        Expr::Raw(raw) => raw.prec,
        Expr::Num(n) if *n < 0.0 => PREC_UNARY,
        _ => PREC_PRIMARY,
    }
}

fn is_nullish_mix(parent: &str, child: &Expr) -> bool {
    match child {
        Expr::Logical { op, .. } => {
            (parent == "??" && (*op == "||" || *op == "&&"))
                || ((parent == "||" || parent == "&&") && *op == "??")
        }
        _ => false,
    }
}

#[derive(Default)]
struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    fn push(&mut self, s: &str) {
        self.out.push_str(s);
    }

    fn newline(&mut self) {
        self.out.push('\n');
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
    }

    fn wrapped(&mut self, expr: &Expr, min: u8, force: bool) {
        if force || precedence(expr) < min {
            self.push("(");
            self.expr(expr, PREC_SEQUENCE);
            self.push(")");
        } else {
            self.expr(expr, min);
        }
    }

    fn expr(&mut self, expr: &Expr, min: u8) {
        if precedence(expr) < min {
            self.wrapped(expr, min, true);
            return;
        }
        match expr {
            Expr::Ident(name) => self.push(name),
            Expr::Str(value) => self.push(&quote(value)),
            Expr::Num(value) => self.push(&format_number(*value)),
            Expr::Bool(value) => self.push(if *value { "true" } else { "false" }),
            Expr::Null => self.push("null"),
            Expr::Template { quasis, exprs } => {
                self.push("`");
                for (i, quasi) in quasis.iter().enumerate() {
                    self.push(quasi);
                    if let Some(e) = exprs.get(i) {
                        self.push("${");
                        self.expr(e, PREC_SEQUENCE);
                        self.push("}");
                    }
                }
                self.push("`");
            }
            Expr::Member {
                object,
                property,
                optional,
            } => {
                let numeric_object = matches!(object.as_ref(), Expr::Num(_));
                self.wrapped(object, PREC_CALL, numeric_object);
                match property {
                    MemberProp::Static(name) => {
                        self.push(if *optional { "?." } else { "." });
                        self.push(name);
                    }
                    MemberProp::Computed(prop) => {
                        self.push(if *optional { "?.[" } else { "[" });
                        self.expr(prop, PREC_SEQUENCE);
                        self.push("]");
                    }
                }
            }
            Expr::Call {
                callee,
                args,
                optional,
            } => {
                self.wrapped(callee, PREC_CALL, false);
                self.push(if *optional { "?.(" } else { "(" });
                self.list(args);
                self.push(")");
            }
            Expr::Unary { op, arg } => {
                self.push(op);
                let word = op.chars().all(|c| c.is_ascii_alphabetic());
                let mut inner = Printer {
                    out: String::new(),
                    indent: self.indent,
                };
                inner.wrapped(arg, PREC_UNARY, false);
                let clash = (*op == "-" && inner.out.starts_with('-'))
                    || (*op == "+" && inner.out.starts_with('+'));
                if word || clash {
                    self.push(" ");
                }
                self.push(&inner.out);
            }
            Expr::Binary { op, left, right } | Expr::Logical { op, left, right } => {
                let prec = binary_precedence(op);
                let (left_min, right_min) = if *op == "**" {
                    (PREC_UNARY + 1, prec)
                } else {
                    (prec, prec + 1)
                };
                self.wrapped(left, left_min, is_nullish_mix(op, left));
                self.push(" ");
                self.push(op);
                self.push(" ");
                self.wrapped(right, right_min, is_nullish_mix(op, right));
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.wrapped(test, PREC_CONDITIONAL + 1, false);
                self.push(" ? ");
                self.wrapped(consequent, PREC_ASSIGN, false);
                self.push(" : ");
                self.wrapped(alternate, PREC_ASSIGN, false);
            }
            Expr::Assign { op, target, value } => {
                self.wrapped(target, PREC_CALL, false);
                self.push(" ");
                self.push(op);
                self.push(" ");
                self.wrapped(value, PREC_ASSIGN, false);
            }
            Expr::Arrow { params, body } => {
                match params.len() {
                    1 => self.push(&params[0]),
                    _ => {
                        self.push("(");
                        self.push(&params.join(", "));
                        self.push(")");
                    }
                }
                self.push(" => ");
                match body {
                    ArrowBody::Expr(e) => {
                        let object_body = matches!(e.inner(), Expr::Object(_));
                        self.wrapped(e, PREC_ASSIGN, object_body);
                    }
                    ArrowBody::Block(stmts) => self.block(stmts),
                }
            }
            Expr::Object(props) => self.object(props),
            Expr::Array(items) => {
                self.push("[");
                self.list(items);
                self.push("]");
            }
            Expr::Spread(arg) => {
                self.push("...");
                self.wrapped(arg, PREC_ASSIGN, false);
            }
            Expr::Sequence(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.wrapped(item, PREC_ASSIGN, false);
                }
            }
            Expr::Jsx(_) => {
                tracing::warn!("uncompiled JSX reached the printer");
                self.push("undefined");
            }
            Expr::Static(inner) => self.expr(inner, min),
            Expr::Pure(inner) => {
                self.push("/*#__PURE__*/");
                self.expr(inner, min);
            }
            Expr::Raw(raw) => self.push(&raw.code),
        }
    }

    fn list(&mut self, items: &[Expr]) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.wrapped(item, PREC_ASSIGN, false);
        }
    }

    fn key(&mut self, key: &PropKey) {
        match key {
            PropKey::Ident(name) => self.push(name),
            PropKey::Str(name) => self.push(&quote(name)),
            PropKey::Computed(e) => {
                self.push("[");
                self.expr(e, PREC_ASSIGN);
                self.push("]");
            }
        }
    }

    fn object(&mut self, props: &[Prop]) {
        if props.is_empty() {
            self.push("{}");
            return;
        }
        let multiline = props
            .iter()
            .any(|p| matches!(p, Prop::Getter { .. } | Prop::Method { .. }));
        if !multiline {
            self.push("{ ");
            for (i, prop) in props.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.prop(prop);
            }
            self.push(" }");
            return;
        }
        self.push("{");
        self.indent += 1;
        for (i, prop) in props.iter().enumerate() {
            self.newline();
            self.prop(prop);
            if i + 1 < props.len() {
                self.push(",");
            }
        }
        self.indent -= 1;
        self.newline();
        self.push("}");
    }

    fn prop(&mut self, prop: &Prop) {
        match prop {
            Prop::Init { key, value } => {
                self.key(key);
                self.push(": ");
                self.wrapped(value, PREC_ASSIGN, false);
            }
            Prop::Getter { key, body } => {
                self.push("get ");
                self.key(key);
                self.push("() ");
                self.block(body);
            }
            Prop::Method { key, params, body } => {
                self.key(key);
                self.push("(");
                self.push(&params.join(", "));
                self.push(") ");
                self.block(body);
            }
            Prop::Spread(arg) => {
                self.push("...");
                self.wrapped(arg, PREC_ASSIGN, false);
            }
            Prop::Raw(raw) => self.push(&raw.code),
        }
    }

    fn block(&mut self, stmts: &[Stmt]) {
        self.push("{");
        self.indent += 1;
        for stmt in stmts {
            self.newline();
            self.stmt(stmt);
        }
        self.indent -= 1;
        self.newline();
        self.push("}");
    }

    fn declarator(&mut self, decl: &Declarator) {
        match &decl.pattern {
            Pattern::Ident(name) => self.push(name),
            Pattern::Array(names) => {
                self.push("[");
                self.push(&names.join(", "));
                self.push("]");
            }
        }
        self.push(" = ");
        self.wrapped(&decl.init, PREC_ASSIGN, false);
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Const(decls) => {
                self.push("const ");
                self.indent += 1;
                for (i, decl) in decls.iter().enumerate() {
                    if i > 0 {
                        self.push(",");
                        self.newline();
                    }
                    self.declarator(decl);
                }
                self.indent -= 1;
                self.push(";");
            }
            Stmt::Expr(e) => {
                let mut inner = Printer {
                    out: String::new(),
                    indent: self.indent,
                };
                inner.expr(e, PREC_SEQUENCE);
                let ambiguous = inner.out.starts_with('{')
                    || inner.out.starts_with("function")
                    || inner.out.starts_with("class");
                if ambiguous {
                    self.push("(");
                    self.push(&inner.out);
                    self.push(")");
                } else {
                    self.push(&inner.out);
                }
                self.push(";");
            }
            Stmt::Return(e) => {
                self.push("return ");
                self.expr(e, PREC_SEQUENCE);
                self.push(";");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parenthesizes_by_precedence() {
        let e = Expr::binary(
            "*",
            Expr::binary("+", Expr::ident("a"), Expr::ident("b")),
            Expr::ident("c"),
        );
        assert_eq!(print_expr(&e), "(a + b) * c");

        let e = Expr::binary(
            "-",
            Expr::ident("a"),
            Expr::binary("-", Expr::ident("b"), Expr::ident("c")),
        );
        assert_eq!(print_expr(&e), "a - (b - c)");
    }

    #[test]
    fn nullish_mixing_is_parenthesized() {
        let e = Expr::logical(
            "??",
            Expr::logical("||", Expr::ident("a"), Expr::ident("b")),
            Expr::ident("c"),
        );
        assert_eq!(print_expr(&e), "(a || b) ?? c");
    }

    #[test]
    fn arrow_callee_and_object_body() {
        let e = Expr::call(Expr::thunk(Expr::ident("x")), vec![]);
        assert_eq!(print_expr(&e), "(() => x)()");

        let e = Expr::thunk(Expr::Object(vec![Prop::Init {
            key: PropKey::Ident("a".into()),
            value: Expr::Num(1.0),
        }]));
        assert_eq!(print_expr(&e), "() => ({ a: 1 })");
    }

    #[test]
    fn iife_block_is_indented() {
        let e = Expr::iife(vec![
            Stmt::Const(vec![
                Declarator::new("_el$", Expr::ident("a")),
                Declarator::new("_el$2", Expr::member(Expr::ident("_el$"), "firstChild")),
            ]),
            Stmt::Return(Expr::ident("_el$")),
        ]);
        assert_eq!(
            print_expr(&e),
            "(() => {\n  const _el$ = a,\n    _el$2 = _el$.firstChild;\n  return _el$;\n})()"
        );
    }

    #[test]
    fn getters_force_multiline_objects() {
        let e = Expr::Object(vec![
            Prop::Init {
                key: PropKey::from_name("aria-label"),
                value: Expr::str("x"),
            },
            Prop::Getter {
                key: PropKey::Ident("children".into()),
                body: vec![Stmt::Return(Expr::ident("c"))],
            },
        ]);
        assert_eq!(
            print_expr(&e),
            "{\n  \"aria-label\": \"x\",\n  get children() {\n    return c;\n  }\n}"
        );
    }

    #[test]
    fn unary_spacing() {
        assert_eq!(print_expr(&Expr::unary("typeof", Expr::ident("a"))), "typeof a");
        assert_eq!(print_expr(&Expr::ident("a").to_boolean()), "!!a");
        assert_eq!(
            print_expr(&Expr::unary("-", Expr::unary("-", Expr::ident("a")))),
            "- -a"
        );
    }

    #[test]
    fn strings_and_numbers() {
        assert_eq!(print_expr(&Expr::str("a\"b\n")), "\"a\\\"b\\n\"");
        assert_eq!(print_expr(&Expr::Num(5.0)), "5");
        assert_eq!(print_expr(&Expr::Num(0.5)), "0.5");
    }
}
