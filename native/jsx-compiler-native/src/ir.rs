//! Host-independent tree types.
//!
//! `JsxNode` is what the compiler consumes, `Expr`/`Stmt` is what it produces.
//! The host adapter (`parse.rs`) converts oxc nodes into these and the printer
//! (`codegen.rs`) turns them back into JavaScript source.

// ═══════════════════════════════════════════════════════════════════════════════
// JSX INPUT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum JsxNode {
    Element(JsxElement),
    Fragment(Vec<JsxNode>),
    /// Raw JSX text exactly as written in the source.
    Text(String),
    /// `{expr}`; `None` for an empty container such as `{/* comment */}`.
    Expression(Option<Expr>),
    /// `{...expr}` as a child.
    Spread(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct JsxElement {
    /// Tag as written: `div`, `Foo`, `Foo.Bar`, `svg:rect`.
    pub name: String,
    pub attributes: Vec<JsxAttribute>,
    pub children: Vec<JsxNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JsxAttribute {
    /// `name` carries the namespace when present (`on:click`, `style:color`).
    Attribute {
        name: String,
        value: Option<AttrValue>,
    },
    Spread(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    Expr(Expr),
}

impl JsxAttribute {
    pub fn name(&self) -> Option<&str> {
        match self {
            JsxAttribute::Attribute { name, .. } => Some(name),
            JsxAttribute::Spread(_) => None,
        }
    }

    #[cfg(test)]
    pub fn expression(&self) -> Option<&Expr> {
        match self {
            JsxAttribute::Attribute {
                value: Some(AttrValue::Expr(e)),
                ..
            } => Some(e),
            _ => None,
        }
    }
}

impl JsxNode {
    #[cfg(test)]
    pub fn element(name: &str, attributes: Vec<JsxAttribute>, children: Vec<JsxNode>) -> Self {
        JsxNode::Element(JsxElement {
            name: name.to_string(),
            attributes,
            children,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXPRESSIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Ident(String),
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
    /// Quasis hold raw (already escaped) template text.
    Template {
        quasis: Vec<String>,
        exprs: Vec<Expr>,
    },
    Member {
        object: Box<Expr>,
        property: MemberProp,
        optional: bool,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        optional: bool,
    },
    Unary {
        op: &'static str,
        arg: Box<Expr>,
    },
    Binary {
        op: &'static str,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: &'static str,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Assign {
        op: &'static str,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Arrow {
        params: Vec<String>,
        body: ArrowBody,
    },
    Object(Vec<Prop>),
    Array(Vec<Expr>),
    Spread(Box<Expr>),
    Sequence(Vec<Expr>),
    /// JSX nested inside an expression; compiled by the lowering pass.
    Jsx(Box<JsxNode>),
    /// Expression preceded by the static marker comment.
    Static(Box<Expr>),
    /// `/*#__PURE__*/` annotated expression.
    Pure(Box<Expr>),
    /// Host source kept verbatim.
    Raw(RawExpr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberProp {
    Static(String),
    Computed(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrowBody {
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Prop {
    Init { key: PropKey, value: Expr },
    Getter { key: PropKey, body: Vec<Stmt> },
    Method {
        key: PropKey,
        params: Vec<String>,
        body: Vec<Stmt>,
    },
    Spread(Expr),
    /// Accessors and methods taken verbatim from the host source.
    Raw(RawExpr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropKey {
    Ident(String),
    Str(String),
    Computed(Box<Expr>),
}

/// Source text the compiler does not need to look inside.
///
/// `traits` records what the dynamic-ness classifier would have found in the
/// subtree and `jsx` lists JSX pieces (offsets relative to `code`) that still
/// need compiling.
#[derive(Debug, Clone, PartialEq)]
pub struct RawExpr {
    pub code: String,
    pub prec: u8,
    pub traits: RawTraits,
    pub jsx: Vec<RawJsx>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawTraits {
    pub function: bool,
    pub call: bool,
    pub member: bool,
    pub jsx: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawJsx {
    pub start: usize,
    pub end: usize,
    pub node: JsxNode,
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATEMENTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Const(Vec<Declarator>),
    Expr(Expr),
    Return(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    pub pattern: Pattern,
    pub init: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Ident(String),
    Array(Vec<String>),
}

impl Declarator {
    pub fn new(name: &str, init: Expr) -> Self {
        Declarator {
            pattern: Pattern::Ident(name.to_string()),
            init,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONSTRUCTORS & PREDICATES
// ═══════════════════════════════════════════════════════════════════════════════

impl Expr {
    pub fn ident(name: &str) -> Self {
        Expr::Ident(name.to_string())
    }

    pub fn str(value: &str) -> Self {
        Expr::Str(value.to_string())
    }

    pub fn undefined() -> Self {
        Expr::ident("undefined")
    }

    pub fn call(callee: Expr, args: Vec<Expr>) -> Self {
        Expr::Call {
            callee: Box::new(callee),
            args,
            optional: false,
        }
    }

    pub fn member(object: Expr, property: &str) -> Self {
        Expr::Member {
            object: Box::new(object),
            property: MemberProp::Static(property.to_string()),
            optional: false,
        }
    }

    pub fn method_call(object: Expr, method: &str, args: Vec<Expr>) -> Self {
        Expr::call(Expr::member(object, method), args)
    }

    pub fn assign(target: Expr, value: Expr) -> Self {
        Expr::Assign {
            op: "=",
            target: Box::new(target),
            value: Box::new(value),
        }
    }

    pub fn binary(op: &'static str, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn logical(op: &'static str, left: Expr, right: Expr) -> Self {
        Expr::Logical {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: &'static str, arg: Expr) -> Self {
        Expr::Unary {
            op,
            arg: Box::new(arg),
        }
    }

    pub fn conditional(test: Expr, consequent: Expr, alternate: Expr) -> Self {
        Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        }
    }

    /// `() => body`
    pub fn thunk(body: Expr) -> Self {
        Expr::Arrow {
            params: vec![],
            body: ArrowBody::Expr(Box::new(body)),
        }
    }

    pub fn arrow(params: &[&str], body: Expr) -> Self {
        Expr::Arrow {
            params: params.iter().map(|p| p.to_string()).collect(),
            body: ArrowBody::Expr(Box::new(body)),
        }
    }

    /// `(() => { ...body })()`
    pub fn iife(body: Vec<Stmt>) -> Self {
        Expr::call(
            Expr::Arrow {
                params: vec![],
                body: ArrowBody::Block(body),
            },
            vec![],
        )
    }

    /// `!!expr`
    pub fn to_boolean(self) -> Self {
        Expr::unary("!", Expr::unary("!", self))
    }

    /// `typeof target === "function"`
    pub fn is_function_check(target: Expr) -> Self {
        Expr::binary("===", Expr::unary("typeof", target), Expr::str("function"))
    }

    /// Peels static-marker and purity wrappers.
    pub fn inner(&self) -> &Expr {
        match self {
            Expr::Static(e) | Expr::Pure(e) => e.inner(),
            e => e,
        }
    }

    pub fn is_function(&self) -> bool {
        match self {
            Expr::Arrow { .. } => true,
            Expr::Raw(raw) => raw.traits.function,
            _ => false,
        }
    }

    pub fn is_call(&self) -> bool {
        matches!(self, Expr::Call { .. })
    }

    pub fn is_member(&self) -> bool {
        matches!(self, Expr::Member { .. })
    }

    pub fn is_logical_or_conditional(&self) -> bool {
        matches!(self, Expr::Logical { .. } | Expr::Conditional { .. })
    }

    /// Something that can sit on the left of an assignment.
    pub fn is_lval(&self) -> bool {
        matches!(self, Expr::Ident(_) | Expr::Member { .. })
    }

    /// A call with no arguments whose callee is a plain identifier, `count()`.
    pub fn bare_call_callee(&self) -> Option<&Expr> {
        match self {
            Expr::Call {
                callee,
                args,
                optional: false,
            } if args.is_empty() && !callee.is_member() && !callee.is_call() => Some(callee),
            _ => None,
        }
    }

    /// Returns the body of a zero-parameter expression arrow.
    pub fn thunk_body(&self) -> Option<&Expr> {
        match self {
            Expr::Arrow {
                params,
                body: ArrowBody::Expr(body),
            } if params.is_empty() => Some(body),
            _ => None,
        }
    }
}

impl PropKey {
    /// Identifier key when `name` is a valid JS identifier, string key otherwise.
    pub fn from_name(name: &str) -> Self {
        if is_valid_identifier(name) {
            PropKey::Ident(name.to_string())
        } else {
            PropKey::Str(name.to_string())
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            PropKey::Ident(n) | PropKey::Str(n) => Some(n),
            PropKey::Computed(_) => None,
        }
    }
}

pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILE RESULT
// ═══════════════════════════════════════════════════════════════════════════════

/// A dynamic attribute binding destined for the shared effect of its node.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicBinding {
    pub elem: String,
    pub key: String,
    pub value: Expr,
    pub is_svg: bool,
    pub is_custom_element: bool,
    pub tag_name: String,
}

/// What compiling one JSX node yields.
///
/// DOM mode accumulates `template`; SSR mode accumulates `chunks` and
/// `values`, where `chunks.len() == values.len() + 1` whenever chunks are
/// non-empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompileResult {
    pub template: String,
    pub chunks: Vec<String>,
    pub values: Vec<Expr>,
    pub declarations: Vec<Declarator>,
    pub exprs: Vec<Stmt>,
    pub dynamics: Vec<DynamicBinding>,
    pub post_exprs: Vec<Stmt>,
    pub id: Option<String>,
    pub tag_name: Option<String>,
    pub is_svg: bool,
    pub has_custom_element: bool,
    pub has_hydratable_event: bool,
    pub dynamic: bool,
    pub component: bool,
    pub text: bool,
    /// SSR: the produced value is already markup and must not be escaped.
    pub no_escape: bool,
}

impl CompileResult {
    /// Result carrying a single expression and no markup.
    pub fn expression(expr: Expr, dynamic: bool) -> Self {
        CompileResult {
            exprs: vec![Stmt::Expr(expr)],
            dynamic,
            ..Default::default()
        }
    }

    /// First expression of an expression-only result.
    #[cfg(test)]
    pub fn first_expr(&self) -> Option<&Expr> {
        match self.exprs.first() {
            Some(Stmt::Expr(e)) => Some(e),
            _ => None,
        }
    }

    pub fn take_first_expr(&mut self) -> Option<Expr> {
        if self.exprs.is_empty() {
            return None;
        }
        match self.exprs.remove(0) {
            Stmt::Expr(e) => Some(e),
            _ => None,
        }
    }

    pub fn has_markup(&self) -> bool {
        !self.template.is_empty() || !self.chunks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_validity() {
        assert!(is_valid_identifier("children"));
        assert!(is_valid_identifier("_$el"));
        assert!(!is_valid_identifier("aria-label"));
        assert!(!is_valid_identifier("1a"));
        assert!(!is_valid_identifier(""));
    }

    #[test]
    fn bare_call_detection() {
        let call = Expr::call(Expr::ident("count"), vec![]);
        assert_eq!(call.bare_call_callee(), Some(&Expr::ident("count")));

        let member_call = Expr::method_call(Expr::ident("a"), "b", vec![]);
        assert_eq!(member_call.bare_call_callee(), None);

        let with_args = Expr::call(Expr::ident("f"), vec![Expr::Num(1.0)]);
        assert_eq!(with_args.bare_call_callee(), None);
    }
}
