//! Host adapter: oxc parsing and module-level compilation.
//!
//! The module is parsed once, every outermost JSX node is converted to the
//! compiler's `JsxNode` tree and compiled, and the printed replacements are
//! spliced back into the original source. Everything that is not JSX stays
//! byte-for-byte as written.

use std::collections::HashSet;

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Argument, ArrayExpressionElement, ArrowFunctionExpression, Comment, Expression,
    JSXAttributeItem, JSXAttributeName, JSXAttributeValue, JSXChild, JSXElement, JSXElementName,
    JSXFragment, JSXMemberExpression, JSXMemberExpressionObject, ObjectPropertyKind,
    PropertyKey, PropertyKind, Statement,
};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::codegen::print_expr;
use crate::config::CompileOptions;
use crate::context::CompileContext;
use crate::finalize::finalize_module;
use crate::ir::{
    ArrowBody, AttrValue, Expr, JsxAttribute, JsxElement, JsxNode, MemberProp, Prop, PropKey,
    RawExpr, RawJsx,
};
use crate::scope::ModuleScope;
use crate::static_eval::decode_entities;
use crate::transform::transform_jsx;
use crate::validate::{line_column, CompilerError, ERR_PARSE};
use crate::visitor::{jsx_roots_in_expression, jsx_roots_in_program, JsxRoot, RawTraitScan};

// ═══════════════════════════════════════════════════════════════════════════════
// PUBLIC API
// ═══════════════════════════════════════════════════════════════════════════════

/// One compiled module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleOutput {
    pub code: String,
    /// Runtime helpers the module imports, in import order.
    pub helpers: Vec<String>,
    pub delegated_events: Vec<String>,
    pub template_count: usize,
}

/// Input for batch compilation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFile {
    pub filename: String,
    pub code: String,
}

/// Compiles every JSX expression of one module.
pub fn compile_module(
    source: &str,
    filename: &str,
    options: &CompileOptions,
) -> Result<ModuleOutput, CompilerError> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, source_type_for(filename)).parse();

    if let Some(err) = ret.errors.first() {
        let offset = err
            .labels
            .as_ref()
            .and_then(|labels| labels.first())
            .map(|label| label.offset())
            .unwrap_or(0);
        let (line, column) = line_column(source, offset);
        tracing::warn!(file = filename, errors = ret.errors.len(), "parse failed");
        return Err(CompilerError::new(
            ERR_PARSE,
            &err.message,
            filename,
            line,
            column,
        ));
    }
    let program = ret.program;

    let scope = ModuleScope::from_program(&program);
    let markers = static_marker_positions(source, &program.comments, &options.static_marker);

    let mut roots: Vec<(Span, JsxNode)> = Vec::new();
    {
        let mut converter = Converter::new(source, &scope, &markers);
        jsx_roots_in_program(&program, |root| {
            let span = root.span();
            roots.push((span, converter.root(root)));
        });
    }

    if roots.is_empty() {
        tracing::debug!(file = filename, "no JSX, module left untouched");
        return Ok(ModuleOutput {
            code: source.to_string(),
            helpers: vec![],
            delegated_events: vec![],
            template_count: 0,
        });
    }

    let mut ctx = CompileContext::with_scope(options.clone(), scope);
    // compile in source order so template and element names follow the source
    let mut edits: Vec<(usize, usize, String)> = roots
        .iter()
        .map(|(span, node)| {
            let compiled = transform_jsx(&mut ctx, node);
            (span.start as usize, span.end as usize, print_expr(&compiled))
        })
        .collect();
    edits.sort_by(|a, b| b.0.cmp(&a.0));

    let mut body = source.to_string();
    for (start, end, code) in edits {
        body.replace_range(start..end, &code);
    }

    let code = finalize_module(&mut ctx, &body);
    let output = ModuleOutput {
        code,
        helpers: ctx.imports.keys().cloned().collect(),
        delegated_events: ctx.delegated_events.iter().cloned().collect(),
        template_count: ctx.templates.len(),
    };
    tracing::debug!(
        file = filename,
        roots = roots.len(),
        templates = output.template_count,
        helpers = output.helpers.len(),
        delegated = output.delegated_events.len(),
        "compiled module"
    );
    Ok(output)
}

/// Compiles independent modules in parallel. Results keep input order.
pub fn compile_modules(
    files: &[SourceFile],
    options: &CompileOptions,
) -> Vec<Result<ModuleOutput, CompilerError>> {
    files
        .par_iter()
        .map(|file| compile_module(&file.code, &file.filename, options))
        .collect()
}

fn source_type_for(filename: &str) -> SourceType {
    let typescript = filename.ends_with(".ts") || filename.ends_with(".tsx");
    SourceType::default()
        .with_module(true)
        .with_jsx(true)
        .with_typescript(typescript)
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATIC MARKERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Byte offsets of the first token following each static marker comment.
pub fn static_marker_positions(source: &str, comments: &[Comment], marker: &str) -> HashSet<u32> {
    let mut positions = HashSet::new();
    if marker.is_empty() {
        return positions;
    }
    for comment in comments {
        let (start, end) = (comment.span.start as usize, comment.span.end as usize);
        let Some(text) = source.get(start..end) else {
            continue;
        };
        let body = text
            .trim_start_matches("/*")
            .trim_start_matches("//")
            .trim_end_matches("*/");
        if body.trim() != marker {
            continue;
        }
        let rest = &source[end..];
        let rest = rest.strip_prefix("*/").unwrap_or(rest);
        let skipped = rest.len() - rest.trim_start().len();
        let after = source.len() - rest.len() + skipped;
        positions.insert(after as u32);
    }
    positions
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONVERSION
// ═══════════════════════════════════════════════════════════════════════════════

struct Converter<'s> {
    source: &'s str,
    scope: &'s ModuleScope,
    markers: &'s HashSet<u32>,
    /// Marker positions already given to an enclosing expression.
    claimed: HashSet<u32>,
}

impl<'s> Converter<'s> {
    fn new(source: &'s str, scope: &'s ModuleScope, markers: &'s HashSet<u32>) -> Self {
        Converter {
            source,
            scope,
            markers,
            claimed: HashSet::new(),
        }
    }

    fn slice(&self, span: Span) -> &'s str {
        self.source
            .get(span.start as usize..span.end as usize)
            .unwrap_or_default()
    }

    fn root(&mut self, root: JsxRoot<'_, '_>) -> JsxNode {
        match root {
            JsxRoot::Element(el) => self.element(el),
            JsxRoot::Fragment(frag) => self.fragment(frag),
        }
    }

    fn element(&mut self, el: &JSXElement<'_>) -> JsxNode {
        let opening = &el.opening_element;
        let name = element_name(&opening.name);

        let mut attributes = Vec::with_capacity(opening.attributes.len());
        for item in &opening.attributes {
            match item {
                JSXAttributeItem::Attribute(attr) => {
                    let name = match &attr.name {
                        JSXAttributeName::Identifier(id) => id.name.to_string(),
                        JSXAttributeName::NamespacedName(ns) => {
                            format!("{}:{}", ns.namespace.name, ns.name.name)
                        }
                    };
                    let value = attr.value.as_ref().and_then(|value| self.attribute_value(value));
                    attributes.push(JsxAttribute::Attribute { name, value });
                }
                JSXAttributeItem::SpreadAttribute(spread) => {
                    attributes.push(JsxAttribute::Spread(self.expr(&spread.argument)));
                }
            }
        }

        let children = self.children(&el.children);
        JsxNode::Element(JsxElement {
            name,
            attributes,
            children,
        })
    }

    fn fragment(&mut self, frag: &JSXFragment<'_>) -> JsxNode {
        JsxNode::Fragment(self.children(&frag.children))
    }

    fn attribute_value(&mut self, value: &JSXAttributeValue<'_>) -> Option<AttrValue> {
        match value {
            JSXAttributeValue::StringLiteral(s) => Some(AttrValue::Str(decode_entities(&s.value))),
            JSXAttributeValue::ExpressionContainer(container) => container
                .expression
                .as_expression()
                .map(|e| AttrValue::Expr(self.expr(e))),
            JSXAttributeValue::Element(el) => {
                Some(AttrValue::Expr(Expr::Jsx(Box::new(self.element(el)))))
            }
            JSXAttributeValue::Fragment(frag) => {
                Some(AttrValue::Expr(Expr::Jsx(Box::new(self.fragment(frag)))))
            }
        }
    }

    fn children(&mut self, children: &[JSXChild<'_>]) -> Vec<JsxNode> {
        children
            .iter()
            .map(|child| match child {
                JSXChild::Text(text) => JsxNode::Text(self.slice(text.span).to_string()),
                JSXChild::Element(el) => self.element(el),
                JSXChild::Fragment(frag) => self.fragment(frag),
                JSXChild::ExpressionContainer(container) => {
                    JsxNode::Expression(container.expression.as_expression().map(|e| self.expr(e)))
                }
                JSXChild::Spread(spread) => JsxNode::Spread(self.expr(&spread.expression)),
            })
            .collect()
    }

    fn expr(&mut self, e: &Expression<'_>) -> Expr {
        let start = e.span().start;
        // the outermost expression at a marker owns it
        let marked = self.markers.contains(&start) && self.claimed.insert(start);
        let converted = self.expr_inner(e);
        if marked {
            Expr::Static(Box::new(converted))
        } else {
            converted
        }
    }

    fn expr_inner(&mut self, e: &Expression<'_>) -> Expr {
        match e {
            Expression::BooleanLiteral(b) => Expr::Bool(b.value),
            Expression::NullLiteral(_) => Expr::Null,
            Expression::NumericLiteral(n) => Expr::Num(n.value),
            Expression::StringLiteral(s) => Expr::Str(s.value.to_string()),
            Expression::Identifier(id) => Expr::Ident(id.name.to_string()),
            Expression::TemplateLiteral(t) => Expr::Template {
                quasis: t.quasis.iter().map(|q| q.value.raw.to_string()).collect(),
                exprs: t.expressions.iter().map(|e| self.expr(e)).collect(),
            },
            Expression::StaticMemberExpression(m) => Expr::Member {
                object: Box::new(self.expr(&m.object)),
                property: MemberProp::Static(m.property.name.to_string()),
                optional: m.optional,
            },
            Expression::ComputedMemberExpression(m) => Expr::Member {
                object: Box::new(self.expr(&m.object)),
                property: MemberProp::Computed(Box::new(self.expr(&m.expression))),
                optional: m.optional,
            },
            Expression::CallExpression(call) if call.type_arguments.is_none() => {
                let callee = self.expr(&call.callee);
                let args = call
                    .arguments
                    .iter()
                    .map(|arg| self.argument(arg))
                    .collect::<Option<Vec<_>>>();
                match args {
                    Some(args) => Expr::Call {
                        callee: Box::new(callee),
                        args,
                        optional: call.optional,
                    },
                    None => self.raw(e),
                }
            }
            Expression::UnaryExpression(u) => Expr::Unary {
                op: u.operator.as_str(),
                arg: Box::new(self.expr(&u.argument)),
            },
            Expression::BinaryExpression(b) => Expr::Binary {
                op: b.operator.as_str(),
                left: Box::new(self.expr(&b.left)),
                right: Box::new(self.expr(&b.right)),
            },
            Expression::LogicalExpression(l) => Expr::Logical {
                op: l.operator.as_str(),
                left: Box::new(self.expr(&l.left)),
                right: Box::new(self.expr(&l.right)),
            },
            Expression::ConditionalExpression(c) => Expr::Conditional {
                test: Box::new(self.expr(&c.test)),
                consequent: Box::new(self.expr(&c.consequent)),
                alternate: Box::new(self.expr(&c.alternate)),
            },
            Expression::ArrowFunctionExpression(arrow) => match self.thunk(arrow) {
                Some(thunk) => thunk,
                None => self.raw(e),
            },
            Expression::ObjectExpression(obj) => {
                let mut props = Vec::with_capacity(obj.properties.len());
                for prop in &obj.properties {
                    match prop {
                        ObjectPropertyKind::SpreadProperty(spread) => {
                            props.push(Prop::Spread(self.expr(&spread.argument)));
                        }
                        ObjectPropertyKind::ObjectProperty(p) => {
                            let key = if p.kind == PropertyKind::Init && !p.method {
                                self.property_key(&p.key, p.computed)
                            } else {
                                None
                            };
                            match key {
                                Some(key) => props.push(Prop::Init {
                                    key,
                                    value: self.expr(&p.value),
                                }),
                                None => props.push(Prop::Raw(self.raw_span(p.span, Some(&p.value)))),
                            }
                        }
                    }
                }
                Expr::Object(props)
            }
            Expression::ArrayExpression(arr) => {
                let items = arr
                    .elements
                    .iter()
                    .map(|item| match item {
                        ArrayExpressionElement::SpreadElement(spread) => {
                            Some(Expr::Spread(Box::new(self.expr(&spread.argument))))
                        }
                        ArrayExpressionElement::Elision(_) => None,
                        other => other.as_expression().map(|e| self.expr(e)),
                    })
                    .collect::<Option<Vec<_>>>();
                match items {
                    Some(items) => Expr::Array(items),
                    None => self.raw(e),
                }
            }
            Expression::SequenceExpression(seq) => {
                Expr::Sequence(seq.expressions.iter().map(|e| self.expr(e)).collect())
            }
            Expression::ParenthesizedExpression(p) => self.expr(&p.expression),
            Expression::JSXElement(el) => Expr::Jsx(Box::new(self.element(el))),
            Expression::JSXFragment(frag) => Expr::Jsx(Box::new(self.fragment(frag))),
            Expression::TSAsExpression(ts) => self.expr(&ts.expression),
            Expression::TSSatisfiesExpression(ts) => self.expr(&ts.expression),
            Expression::TSNonNullExpression(ts) => self.expr(&ts.expression),
            _ => self.raw(e),
        }
    }

    fn argument(&mut self, arg: &Argument<'_>) -> Option<Expr> {
        match arg {
            Argument::SpreadElement(spread) => Some(Expr::Spread(Box::new(self.expr(&spread.argument)))),
            other => other.as_expression().map(|e| self.expr(e)),
        }
    }

    fn property_key(&mut self, key: &PropertyKey<'_>, computed: bool) -> Option<PropKey> {
        if computed {
            return key
                .as_expression()
                .map(|e| PropKey::Computed(Box::new(self.expr(e))));
        }
        match key {
            PropertyKey::StaticIdentifier(id) => Some(PropKey::Ident(id.name.to_string())),
            PropertyKey::StringLiteral(s) => Some(PropKey::Str(s.value.to_string())),
            _ => None,
        }
    }

    /// `() => expr`, the only arrow shape the compiler looks inside.
    fn thunk(&mut self, arrow: &ArrowFunctionExpression<'_>) -> Option<Expr> {
        let plain = !arrow.r#async
            && arrow.expression
            && arrow.params.items.is_empty()
            && arrow.params.rest.is_none()
            && arrow.type_parameters.is_none()
            && arrow.return_type.is_none();
        if !plain {
            return None;
        }
        match arrow.body.statements.first() {
            Some(Statement::ExpressionStatement(stmt)) => Some(Expr::Arrow {
                params: vec![],
                body: ArrowBody::Expr(Box::new(self.expr(&stmt.expression))),
            }),
            _ => None,
        }
    }

    fn raw(&mut self, e: &Expression<'_>) -> Expr {
        let traits = RawTraitScan::scan(self.scope, e);
        let mut raw = self.raw_span(e.span(), Some(e));
        raw.prec = raw_precedence(e);
        raw.traits = traits;
        Expr::Raw(raw)
    }

    /// Source text of `span` with the JSX pieces found in `expr`, which must
    /// lie inside `span`.
    fn raw_span(&mut self, span: Span, expr: Option<&Expression<'_>>) -> RawExpr {
        let code = self.slice(span).to_string();
        let mut jsx = Vec::new();
        if let Some(expr) = expr {
            let base = span.start;
            jsx_roots_in_expression(expr, |root| {
                let piece = root.span();
                let node = self.root(root);
                jsx.push(RawJsx {
                    start: (piece.start - base) as usize,
                    end: (piece.end - base) as usize,
                    node,
                });
            });
        }
        RawExpr {
            code,
            prec: 19,
            traits: Default::default(),
            jsx,
        }
    }
}

fn element_name(name: &JSXElementName<'_>) -> String {
    match name {
        JSXElementName::Identifier(id) => id.name.to_string(),
        JSXElementName::IdentifierReference(id) => id.name.to_string(),
        JSXElementName::NamespacedName(ns) => format!("{}:{}", ns.namespace.name, ns.name.name),
        JSXElementName::MemberExpression(member) => member_name(member),
        JSXElementName::ThisExpression(_) => "this".to_string(),
    }
}

fn member_name(member: &JSXMemberExpression<'_>) -> String {
    let object = match &member.object {
        JSXMemberExpressionObject::IdentifierReference(id) => id.name.to_string(),
        JSXMemberExpressionObject::MemberExpression(inner) => member_name(inner),
        JSXMemberExpressionObject::ThisExpression(_) => "this".to_string(),
    };
    format!("{}.{}", object, member.property.name)
}

/// Binding strength of verbatim source, on the printer's scale.
fn raw_precedence(e: &Expression<'_>) -> u8 {
    match e {
        Expression::SequenceExpression(_) => 1,
        Expression::AssignmentExpression(_)
        | Expression::ArrowFunctionExpression(_)
        | Expression::YieldExpression(_) => 2,
        Expression::ConditionalExpression(_) => 3,
        Expression::LogicalExpression(l) => match l.operator.as_str() {
            "??" => 4,
            "||" => 5,
            _ => 6,
        },
        Expression::BinaryExpression(_) | Expression::PrivateInExpression(_) => 10,
        Expression::TSAsExpression(_) | Expression::TSSatisfiesExpression(_) => 11,
        Expression::UnaryExpression(_)
        | Expression::UpdateExpression(_)
        | Expression::AwaitExpression(_)
        | Expression::TSTypeAssertion(_) => 16,
        Expression::CallExpression(_)
        | Expression::NewExpression(_)
        | Expression::ChainExpression(_)
        | Expression::TaggedTemplateExpression(_)
        | Expression::StaticMemberExpression(_)
        | Expression::ComputedMemberExpression(_)
        | Expression::PrivateFieldExpression(_)
        | Expression::TSNonNullExpression(_)
        | Expression::TSInstantiationExpression(_) => 18,
        _ => 19,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn convert_first(src: &str) -> JsxNode {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, src, source_type_for("test.jsx")).parse();
        assert!(ret.errors.is_empty(), "{:?}", ret.errors);
        let scope = ModuleScope::from_program(&ret.program);
        let markers = static_marker_positions(src, &ret.program.comments, "@once");
        let mut converter = Converter::new(src, &scope, &markers);
        let mut nodes = Vec::new();
        jsx_roots_in_program(&ret.program, |root| nodes.push(converter.root(root)));
        nodes.into_iter().next().expect("a JSX root")
    }

    fn attribute(node: &JsxNode, index: usize) -> &JsxAttribute {
        match node {
            JsxNode::Element(el) => &el.attributes[index],
            _ => panic!("element expected"),
        }
    }

    #[test]
    fn names_keep_namespaces_and_members() {
        let node = convert_first("<Foo.Bar.Baz on:click={f} svg:x='1' />;");
        let JsxNode::Element(el) = &node else {
            panic!("element expected");
        };
        assert_eq!(el.name, "Foo.Bar.Baz");
        assert_eq!(el.attributes[0].name(), Some("on:click"));
        assert_eq!(el.attributes[1].name(), Some("svg:x"));
    }

    #[test]
    fn string_attributes_are_entity_decoded() {
        let node = convert_first("<a title=\"a &amp; b\" />;");
        assert_eq!(
            attribute(&node, 0),
            &JsxAttribute::Attribute {
                name: "title".into(),
                value: Some(AttrValue::Str("a & b".into())),
            }
        );
    }

    #[test]
    fn text_is_kept_raw() {
        let node = convert_first("<p>\n  a &lt; b\n</p>;");
        let JsxNode::Element(el) = &node else {
            panic!("element expected");
        };
        assert_eq!(el.children, vec![JsxNode::Text("\n  a &lt; b\n".into())]);
    }

    #[test]
    fn marker_wraps_only_the_outermost_expression() {
        let node = convert_first("<p title={/*@once*/ a.b.c} />;");
        let Some(Expr::Static(inner)) = attribute(&node, 0).expression() else {
            panic!("static marker expected");
        };
        let Expr::Member { object, .. } = inner.as_ref() else {
            panic!("member expected");
        };
        assert!(matches!(object.as_ref(), Expr::Member { .. }));
    }

    #[test]
    fn unsupported_shapes_become_raw_with_traits() {
        let node = convert_first("<p onClick={(e) => go(e)} x={async () => a.b} />;");
        let Some(Expr::Raw(raw)) = attribute(&node, 0).expression() else {
            panic!("raw expected");
        };
        assert_eq!(raw.code, "(e) => go(e)");
        assert!(raw.traits.function);
        assert!(!raw.traits.call);
    }

    #[test]
    fn raw_code_carries_nested_jsx_offsets() {
        let node = convert_first("<ul>{items.map((i) => <li>{i}</li>)}</ul>;");
        let JsxNode::Element(el) = &node else {
            panic!("element expected");
        };
        let JsxNode::Expression(Some(Expr::Call { args, .. })) = &el.children[0] else {
            panic!("call expected");
        };
        let Expr::Raw(raw) = &args[0] else {
            panic!("raw arrow expected");
        };
        assert_eq!(raw.jsx.len(), 1);
        let piece = &raw.jsx[0];
        assert_eq!(&raw.code[piece.start..piece.end], "<li>{i}</li>");
    }

    #[test]
    fn marker_positions_skip_whitespace() {
        let src = "x = {/* @once */   a};";
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, src, source_type_for("a.js")).parse();
        let positions = static_marker_positions(src, &ret.program.comments, "@once");
        let expected = src.find('a').map(|i| i as u32);
        assert_eq!(positions.into_iter().next(), expected);
    }
}
