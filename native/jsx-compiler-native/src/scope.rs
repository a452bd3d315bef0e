//! Module-level binding facts the compiler needs from the host.

use oxc_ast::ast::{
    BindingIdentifier, BindingPattern, ImportNamespaceSpecifier, Program, VariableDeclaration,
    VariableDeclarationKind,
};
use oxc_ast_visit::{walk, Visit};
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct ModuleScope {
    /// Every name bound anywhere in the module.
    pub declared: HashSet<String>,
    /// Locals bound by `import * as ns`.
    pub namespace_imports: HashSet<String>,
    /// Locals bound by `const x = ...`.
    pub const_bindings: HashSet<String>,
}

impl ModuleScope {
    pub fn from_program(program: &Program<'_>) -> Self {
        let mut collector = ScopeCollector::default();
        collector.visit_program(program);
        collector.scope
    }

    pub fn has_binding(&self, name: &str) -> bool {
        self.declared.contains(name)
    }

    pub fn is_namespace_import(&self, name: &str) -> bool {
        self.namespace_imports.contains(name)
    }

    pub fn is_const(&self, name: &str) -> bool {
        self.const_bindings.contains(name)
    }
}

#[derive(Default)]
struct ScopeCollector {
    scope: ModuleScope,
}

impl<'a> Visit<'a> for ScopeCollector {
    fn visit_binding_identifier(&mut self, it: &BindingIdentifier<'a>) {
        self.scope.declared.insert(it.name.to_string());
    }

    fn visit_import_namespace_specifier(&mut self, it: &ImportNamespaceSpecifier<'a>) {
        self.scope.namespace_imports.insert(it.local.name.to_string());
        walk::walk_import_namespace_specifier(self, it);
    }

    fn visit_variable_declaration(&mut self, it: &VariableDeclaration<'a>) {
        if it.kind == VariableDeclarationKind::Const {
            for decl in &it.declarations {
                if let BindingPattern::BindingIdentifier(id) = &decl.id {
                    self.scope.const_bindings.insert(id.name.to_string());
                }
            }
        }
        walk::walk_variable_declaration(self, it);
    }
}
