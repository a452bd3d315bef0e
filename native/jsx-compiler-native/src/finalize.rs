//! Module output assembly.
//!
//! Generated code around the transformed body is emitted in a fixed order:
//! helper imports, hoisted templates, the body, then the delegated event
//! registration.

use crate::codegen::{print_stmt, quote};
use crate::context::{CompileContext, TemplateKind};
use crate::escape::escape_backticks;
use crate::ir::{Declarator, Expr, Stmt};

/// `const _tmpl$ = /*#__PURE__*/_$template(`...`, 2), ...;`
pub fn template_declarations(ctx: &mut CompileContext) -> Option<String> {
    if ctx.templates.is_empty() {
        return None;
    }
    let entries = ctx.templates.entries().to_vec();
    let mut decls = Vec::with_capacity(entries.len());
    for entry in entries {
        let init = match entry.kind {
            TemplateKind::Dom {
                html,
                element_count,
                is_svg,
            } => {
                let template = ctx.helper("template");
                let mut args = vec![
                    Expr::Template {
                        quasis: vec![escape_backticks(&html)],
                        exprs: vec![],
                    },
                    Expr::Num(element_count as f64),
                ];
                if is_svg {
                    args.push(Expr::Bool(true));
                }
                Expr::Pure(Box::new(Expr::call(template, args)))
            }
            TemplateKind::Ssr { mut chunks } => {
                if chunks.len() == 1 {
                    Expr::Str(chunks.remove(0))
                } else {
                    Expr::Array(chunks.into_iter().map(Expr::Str).collect())
                }
            }
        };
        decls.push(Declarator::new(&entry.id, init));
    }
    Some(print_stmt(&Stmt::Const(decls)))
}

/// `_$delegateEvents(["click", ...]);` when any event was delegated.
pub fn delegate_events_call(ctx: &mut CompileContext) -> Option<String> {
    if ctx.delegated_events.is_empty() {
        return None;
    }
    let events = ctx
        .delegated_events
        .iter()
        .map(|e| Expr::str(e))
        .collect();
    let delegate = ctx.helper("delegateEvents");
    Some(print_stmt(&Stmt::Expr(Expr::call(
        delegate,
        vec![Expr::Array(events)],
    ))))
}

/// One import line per requested helper, in request order.
pub fn import_statements(ctx: &CompileContext) -> Option<String> {
    if ctx.imports.is_empty() {
        return None;
    }
    let module = quote(&ctx.options.module_name);
    let lines: Vec<String> = ctx
        .imports
        .iter()
        .map(|(name, local)| format!("import {{ {} as {} }} from {};", name, local, module))
        .collect();
    Some(lines.join("\n"))
}

/// Wraps a transformed module body with everything the compile requested.
pub fn finalize_module(ctx: &mut CompileContext, body: &str) -> String {
    // templates and the delegation call request helpers, so imports go last
    let templates = template_declarations(ctx);
    let delegate = delegate_events_call(ctx);
    let imports = import_statements(ctx);

    let mut parts: Vec<String> = Vec::with_capacity(4);
    parts.extend(imports);
    parts.extend(templates);
    parts.push(body.trim_end().to_string());
    parts.extend(delegate);
    let mut out = parts.join("\n");
    out.push('\n');
    out
}
