//! oxc AST visitors used by the host adapter.
//!
//! `RawTraitScan` precomputes what the dynamic-ness classifier needs to know
//! about an expression that is kept as verbatim source. `JsxRootCollector`
//! reports the outermost JSX nodes of a subtree.

use oxc_ast::ast::{
    ArrowFunctionExpression, CallExpression, Class, ComputedMemberExpression, Expression,
    Function, JSXElement, JSXFragment, NewExpression, PrivateFieldExpression, Program,
    StaticMemberExpression, TaggedTemplateExpression,
};
use oxc_ast_visit::{walk, Visit};
use oxc_span::{GetSpan, Span};
use oxc_syntax::scope::ScopeFlags;

use crate::ir::RawTraits;
use crate::scope::ModuleScope;

// ═══════════════════════════════════════════════════════════════════════════════
// RAW TRAITS
// ═══════════════════════════════════════════════════════════════════════════════

/// Never descends into nested functions or classes: what happens inside
/// them only runs when they are called.
pub struct RawTraitScan<'s> {
    scope: &'s ModuleScope,
    traits: RawTraits,
}

impl<'s> RawTraitScan<'s> {
    pub fn scan(scope: &'s ModuleScope, expr: &Expression<'_>) -> RawTraits {
        let function = matches!(
            expr.without_parentheses(),
            Expression::ArrowFunctionExpression(_) | Expression::FunctionExpression(_)
        );
        let mut scan = RawTraitScan {
            scope,
            traits: RawTraits {
                function,
                ..Default::default()
            },
        };
        if !function {
            scan.visit_expression(expr);
        }
        scan.traits
    }
}

impl<'a> Visit<'a> for RawTraitScan<'_> {
    fn visit_call_expression(&mut self, it: &CallExpression<'a>) {
        self.traits.call = true;
        walk::walk_call_expression(self, it);
    }

    fn visit_new_expression(&mut self, it: &NewExpression<'a>) {
        self.traits.call = true;
        walk::walk_new_expression(self, it);
    }

    fn visit_tagged_template_expression(&mut self, it: &TaggedTemplateExpression<'a>) {
        self.traits.call = true;
        walk::walk_tagged_template_expression(self, it);
    }

    fn visit_static_member_expression(&mut self, it: &StaticMemberExpression<'a>) {
        let namespace_access = matches!(
            &it.object,
            Expression::Identifier(id) if self.scope.is_namespace_import(&id.name)
        );
        if !namespace_access {
            self.traits.member = true;
        }
        walk::walk_static_member_expression(self, it);
    }

    fn visit_computed_member_expression(&mut self, it: &ComputedMemberExpression<'a>) {
        self.traits.member = true;
        walk::walk_computed_member_expression(self, it);
    }

    fn visit_private_field_expression(&mut self, it: &PrivateFieldExpression<'a>) {
        self.traits.member = true;
        walk::walk_private_field_expression(self, it);
    }

    fn visit_jsx_element(&mut self, _it: &JSXElement<'a>) {
        self.traits.jsx = true;
    }

    fn visit_jsx_fragment(&mut self, _it: &JSXFragment<'a>) {
        self.traits.jsx = true;
    }

    fn visit_function(&mut self, _it: &Function<'a>, _flags: ScopeFlags) {}

    fn visit_arrow_function_expression(&mut self, _it: &ArrowFunctionExpression<'a>) {}

    fn visit_class(&mut self, _it: &Class<'a>) {}
}

// ═══════════════════════════════════════════════════════════════════════════════
// JSX ROOTS
// ═══════════════════════════════════════════════════════════════════════════════

pub enum JsxRoot<'r, 'a> {
    Element(&'r JSXElement<'a>),
    Fragment(&'r JSXFragment<'a>),
}

impl JsxRoot<'_, '_> {
    pub fn span(&self) -> Span {
        match self {
            JsxRoot::Element(el) => el.span(),
            JsxRoot::Fragment(frag) => frag.span(),
        }
    }
}

/// Hands every outermost JSX element or fragment to `on_root`. JSX nested in
/// a reported node is the callback's business.
pub struct JsxRootCollector<F> {
    on_root: F,
}

impl<F> JsxRootCollector<F> {
    pub fn new(on_root: F) -> Self {
        JsxRootCollector { on_root }
    }
}

/// Outermost JSX of a whole module.
pub fn jsx_roots_in_program<'a, F>(program: &Program<'a>, on_root: F)
where
    F: for<'r> FnMut(JsxRoot<'r, 'a>),
{
    JsxRootCollector::new(on_root).visit_program(program);
}

/// Outermost JSX inside one expression, the expression itself included.
pub fn jsx_roots_in_expression<'a, F>(expr: &Expression<'a>, on_root: F)
where
    F: for<'r> FnMut(JsxRoot<'r, 'a>),
{
    JsxRootCollector::new(on_root).visit_expression(expr);
}

impl<'a, F> Visit<'a> for JsxRootCollector<F>
where
    F: for<'r> FnMut(JsxRoot<'r, 'a>),
{
    fn visit_jsx_element(&mut self, it: &JSXElement<'a>) {
        (self.on_root)(JsxRoot::Element(it));
    }

    fn visit_jsx_fragment(&mut self, it: &JSXFragment<'a>) {
        (self.on_root)(JsxRoot::Fragment(it));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_allocator::Allocator;
    use oxc_ast::ast::Statement;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    fn traits_of(src: &str, scope: &ModuleScope) -> RawTraits {
        let allocator = Allocator::default();
        let source_type = SourceType::default().with_module(true).with_jsx(true);
        let ret = Parser::new(&allocator, src, source_type).parse();
        match ret.program.body.first() {
            Some(Statement::ExpressionStatement(stmt)) => RawTraitScan::scan(scope, &stmt.expression),
            _ => panic!("expected an expression statement"),
        }
    }

    #[test]
    fn nested_functions_are_not_scanned() {
        let scope = ModuleScope::default();
        let t = traits_of("[a, () => b.c(), function () { d.e }]", &scope);
        assert!(!t.call);
        assert!(!t.member);
        assert!(!t.function);
    }

    #[test]
    fn calls_members_and_jsx_are_found() {
        let scope = ModuleScope::default();
        let t = traits_of("[x.y, f(), <div/>]", &scope);
        assert!(t.call && t.member && t.jsx);
    }

    #[test]
    fn namespace_members_are_static() {
        let mut scope = ModuleScope::default();
        scope.namespace_imports.insert("icons".to_string());
        assert!(!traits_of("[icons.Home]", &scope).member);
    }

    #[test]
    fn collector_stops_at_outermost_jsx() {
        let src = "const a = <div><span/></div>; const b = [<p/>, <>x</>];";
        let allocator = Allocator::default();
        let source_type = SourceType::default().with_module(true).with_jsx(true);
        let ret = Parser::new(&allocator, src, source_type).parse();
        let mut spans = Vec::new();
        jsx_roots_in_program(&ret.program, |root| spans.push(root.span()));
        let texts: Vec<_> = spans
            .iter()
            .map(|s| &src[s.start as usize..s.end as usize])
            .collect();
        assert_eq!(texts, vec!["<div><span/></div>", "<p/>", "<>x</>"]);
    }
}
