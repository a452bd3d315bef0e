//! Per-module compile state.
//!
//! A `CompileContext` owns the template registry, the helper import registry
//! and the delegated event set for exactly one module. It is created fresh for
//! every module and drained by `finalize`.

use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;

use crate::config::CompileOptions;
use crate::ir::Expr;
use crate::scope::ModuleScope;

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateKind {
    Dom {
        html: String,
        element_count: usize,
        is_svg: bool,
    },
    Ssr {
        chunks: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateEntry {
    pub id: String,
    pub kind: TemplateKind,
}

#[derive(Debug, Default)]
pub struct TemplateRegistry {
    entries: Vec<TemplateEntry>,
}

impl TemplateRegistry {
    pub fn entries(&self) -> &[TemplateEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find(&self, kind: &TemplateKind) -> Option<&str> {
        self.entries.iter().find_map(|entry| {
            let same = match (&entry.kind, kind) {
                (TemplateKind::Dom { html: a, .. }, TemplateKind::Dom { html: b, .. }) => a == b,
                (TemplateKind::Ssr { chunks: a }, TemplateKind::Ssr { chunks: b }) => a == b,
                _ => false,
            };
            same.then_some(entry.id.as_str())
        })
    }
}

/// Number of opening tags in a template string. Quoted attribute values are
/// skipped, they may hold a raw `<`.
pub fn count_elements(html: &str) -> usize {
    let bytes = html.as_bytes();
    let mut count = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'<' && bytes.get(i + 1).is_some_and(u8::is_ascii_alphabetic) {
            count += 1;
            i = tag_end(bytes, i + 1);
        } else {
            i += 1;
        }
    }
    count
}

/// Index past the `>` that closes the tag containing `i`.
fn tag_end(bytes: &[u8], mut i: usize) -> usize {
    let mut quote = None;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return i + 1,
            None => {}
        }
        i += 1;
    }
    i
}

pub struct CompileContext {
    pub options: CompileOptions,
    pub scope: ModuleScope,
    pub templates: TemplateRegistry,
    /// Logical helper name to local identifier, in request order.
    pub imports: IndexMap<String, String>,
    pub delegated_events: IndexSet<String>,
    uids: HashMap<String, usize>,
}

impl CompileContext {
    #[cfg(test)]
    pub fn new(options: CompileOptions) -> Self {
        Self::with_scope(options, ModuleScope::default())
    }

    pub fn with_scope(options: CompileOptions, scope: ModuleScope) -> Self {
        CompileContext {
            options,
            scope,
            templates: TemplateRegistry::default(),
            imports: IndexMap::new(),
            delegated_events: IndexSet::new(),
            uids: HashMap::new(),
        }
    }

    pub fn is_ssr(&self) -> bool {
        self.options.is_ssr()
    }

    /// Local identifier for a runtime helper, registering its import on first use.
    pub fn helper(&mut self, name: &str) -> Expr {
        if let Some(local) = self.imports.get(name) {
            return Expr::Ident(local.clone());
        }
        let local = format!("_${}", name);
        self.imports.insert(name.to_string(), local.clone());
        Expr::Ident(local)
    }

    /// Fresh identifier `_{base}`, `_{base}2`, ... that no module binding uses.
    pub fn uid(&mut self, base: &str) -> String {
        let base = base.trim_start_matches('_');
        loop {
            let counter = self.uids.entry(base.to_string()).or_insert(0);
            *counter += 1;
            let name = if *counter == 1 {
                format!("_{}", base)
            } else {
                format!("_{}{}", base, counter)
            };
            if !self.scope.has_binding(&name) {
                return name;
            }
        }
    }

    pub fn register_dom_template(&mut self, html: &str, is_svg: bool) -> String {
        let kind = TemplateKind::Dom {
            html: html.to_string(),
            element_count: count_elements(html),
            is_svg,
        };
        self.register(kind)
    }

    pub fn register_ssr_template(&mut self, chunks: &[String]) -> String {
        self.register(TemplateKind::Ssr {
            chunks: chunks.to_vec(),
        })
    }

    fn register(&mut self, kind: TemplateKind) -> String {
        if let Some(id) = self.templates.find(&kind) {
            return id.to_string();
        }
        let id = self.uid("tmpl$");
        tracing::trace!(id = %id, "registered template");
        self.templates.entries.push(TemplateEntry {
            id: id.clone(),
            kind,
        });
        id
    }

    pub fn delegate_event(&mut self, name: &str) {
        self.delegated_events.insert(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_are_deduplicated() {
        let mut ctx = CompileContext::new(CompileOptions::default());
        let a = ctx.register_dom_template("<div></div>", false);
        let b = ctx.register_dom_template("<span></span>", false);
        let c = ctx.register_dom_template("<div></div>", false);
        assert_eq!(a, "_tmpl$");
        assert_eq!(b, "_tmpl$2");
        assert_eq!(a, c);
        assert_eq!(ctx.templates.len(), 2);
    }

    #[test]
    fn helpers_are_imported_once() {
        let mut ctx = CompileContext::new(CompileOptions::default());
        assert_eq!(ctx.helper("insert"), Expr::ident("_$insert"));
        assert_eq!(ctx.helper("insert"), Expr::ident("_$insert"));
        assert_eq!(ctx.imports.len(), 1);
    }

    #[test]
    fn uids_skip_module_bindings() {
        let mut scope = ModuleScope::default();
        scope.declared.insert("_el$2".to_string());
        let mut ctx = CompileContext::with_scope(CompileOptions::default(), scope);
        assert_eq!(ctx.uid("el$"), "_el$");
        assert_eq!(ctx.uid("el$"), "_el$3");
        assert_eq!(ctx.uid("_ref$"), "_ref$");
    }

    #[test]
    fn element_count_ignores_closing_tags_and_comments() {
        assert_eq!(count_elements("<div><span>a</span><!--#--></div>"), 2);
        assert_eq!(count_elements("<svg><rect></rect></svg>"), 2);
    }

    #[test]
    fn element_count_skips_quoted_attribute_text() {
        assert_eq!(count_elements("<div title=\"a<b\"><i data-x='<p>'></i></div>"), 2);
        assert_eq!(count_elements("<p>x</p><input value=\"1>0\"><b></b>"), 3);
    }
}
