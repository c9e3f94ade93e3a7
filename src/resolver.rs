//! Name resolution and scope analysis.
//!
//! Two passes over one module: a hoist pass that inserts every
//! top-level function, struct and enum into the global scope in
//! source order, then a body pass that walks each item threading
//! lexically nested scopes through blocks, loops and match arms.
//!
//! The resolver never stops at the first problem — it keeps walking
//! to maximize the diagnostics reported per run. Type inference and
//! type compatibility are stub seams ([`Resolver::infer_expr_type`],
//! [`Resolver::types_compatible`]) for a future checker.

use std::collections::HashMap;

use crate::ast::{Expr, ExprKind, Item, ItemKind, Module, Pattern, PatternKind, Stmt, StmtKind, Type};
use crate::errors::Diagnostics;
use crate::lexer::token::SourceLocation;

/// A resolved binding.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub ty: Option<Type>,
    pub is_mutable: bool,
    pub is_initialized: bool,
    pub location: SourceLocation,
}

type ScopeId = usize;

/// A lexical region owning a name → symbol map and a parent link.
/// Scopes live in an arena owned by the resolver; block scopes are
/// siblings under their function scope, forming a forest overall.
struct Scope {
    parent: Option<ScopeId>,
    symbols: HashMap<String, Symbol>,
}

impl Scope {
    fn new(parent: Option<ScopeId>) -> Self {
        Self { parent, symbols: HashMap::new() }
    }
}

pub struct Resolver {
    scopes: Vec<Scope>,
    current: ScopeId,
    diags: Diagnostics,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    pub fn new() -> Self {
        // Scope 0 is the global scope.
        Self { scopes: vec![Scope::new(None)], current: 0, diags: Diagnostics::new() }
    }

    pub fn has_errors(&self) -> bool {
        self.diags.has_errors()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diags
    }

    // ── scope management ────────────────────────────────────────────

    fn push_scope(&mut self) {
        let id = self.scopes.len();
        self.scopes.push(Scope::new(Some(self.current)));
        self.current = id;
    }

    fn pop_scope(&mut self) {
        if let Some(parent) = self.scopes[self.current].parent {
            self.current = parent;
        }
    }

    /// Walk the scope-parent chain; the first match wins.
    fn lookup(&self, name: &str) -> Option<&Symbol> {
        let mut scope = Some(self.current);
        while let Some(id) = scope {
            if let Some(symbol) = self.scopes[id].symbols.get(name) {
                return Some(symbol);
            }
            scope = self.scopes[id].parent;
        }
        None
    }

    /// Insert into the current scope. Returns `false` when the name
    /// is already defined there (the first definition wins).
    fn define(&mut self, symbol: Symbol) -> bool {
        let scope = &mut self.scopes[self.current];
        if scope.symbols.contains_key(&symbol.name) {
            return false;
        }
        scope.symbols.insert(symbol.name.clone(), symbol);
        true
    }

    fn error(&mut self, location: SourceLocation, message: impl Into<String>) {
        self.diags.error(location, message);
    }

    // ── entry point ─────────────────────────────────────────────────

    /// Analyze one module. Returns `true` when no errors were found.
    pub fn analyze(&mut self, module: &Module) -> bool {
        // First pass: hoist top-level declarations so bodies can
        // reference items defined later in the file.
        for item in &module.items {
            if matches!(
                item.kind,
                ItemKind::Function { .. } | ItemKind::Struct { .. } | ItemKind::Enum { .. }
            ) {
                let symbol = Symbol {
                    name: item.name.clone(),
                    ty: None,
                    is_mutable: false,
                    is_initialized: true,
                    location: item.location.clone(),
                };
                if !self.define(symbol) {
                    self.error(item.location.clone(), format!("Redefinition of '{}'", item.name));
                }
            }
        }

        // Second pass: analyze item bodies.
        for item in &module.items {
            self.analyze_item(item);
        }

        !self.has_errors()
    }

    fn analyze_item(&mut self, item: &Item) {
        match &item.kind {
            ItemKind::Function { params, body, .. } => self.analyze_function(params, body.as_ref()),
            ItemKind::Struct { fields } => self.analyze_struct(fields),
            ItemKind::Enum { variants } => self.analyze_enum(variants),
            // Trait, impl, alias, module and import resolution are
            // future work.
            _ => {}
        }
    }

    fn analyze_function(&mut self, params: &[crate::ast::FunctionParam], body: Option<&Expr>) {
        self.push_scope();

        for param in params {
            let symbol = Symbol {
                name: param.name.clone(),
                ty: Some(param.ty.clone()),
                is_mutable: false,
                is_initialized: true,
                location: param.location.clone(),
            };
            if !self.define(symbol) {
                self.error(
                    param.location.clone(),
                    format!("Redefinition of parameter '{}'", param.name),
                );
            }
        }

        if let Some(body) = body {
            self.analyze_expr(body);
        }

        self.pop_scope();
    }

    fn analyze_struct(&mut self, fields: &[crate::ast::StructField]) {
        for i in 0..fields.len() {
            for j in (i + 1)..fields.len() {
                if fields[i].name == fields[j].name {
                    self.error(
                        fields[j].location.clone(),
                        format!("Duplicate field '{}'", fields[j].name),
                    );
                }
            }
        }
    }

    fn analyze_enum(&mut self, variants: &[crate::ast::EnumVariant]) {
        for i in 0..variants.len() {
            for j in (i + 1)..variants.len() {
                if variants[i].name == variants[j].name {
                    self.error(
                        variants[j].location.clone(),
                        format!("Duplicate variant '{}'", variants[j].name),
                    );
                }
            }
        }
    }

    // ── statements ──────────────────────────────────────────────────

    fn analyze_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Let { pattern, ty, initializer } => {
                // Initializer first: `let x = x;` refers to the outer x.
                if let Some(init) = initializer {
                    self.analyze_expr(init);
                }

                match &pattern.kind {
                    PatternKind::Identifier { name, is_mutable } => {
                        let symbol = Symbol {
                            name: name.clone(),
                            ty: ty.clone(),
                            is_mutable: *is_mutable,
                            is_initialized: initializer.is_some(),
                            location: stmt.location.clone(),
                        };
                        if !self.define(symbol) {
                            self.error(stmt.location.clone(), format!("Redefinition of '{name}'"));
                        }
                    }
                    // Wildcards bind nothing; destructuring lets are
                    // not supported downstream and bind nothing here.
                    _ => {}
                }
            }

            StmtKind::Expr { expr, .. } => self.analyze_expr(expr),

            StmtKind::Item(item) => self.analyze_item(item),
        }
    }

    // ── expressions ─────────────────────────────────────────────────

    fn analyze_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Literal(_) => {}

            ExprKind::Identifier(name) => {
                self.resolve_name(name, &expr.location);
            }

            ExprKind::Binary { op, left, right } if op.is_assignment() => {
                // An identifier target must exist and be mutable; any
                // other lvalue form is analyzed as a plain expression.
                if let ExprKind::Identifier(name) = &left.kind {
                    match self.lookup(name).map(|symbol| symbol.is_mutable) {
                        None => {
                            self.error(
                                left.location.clone(),
                                format!("Undefined identifier '{name}'"),
                            );
                        }
                        Some(false) => {
                            self.error(
                                left.location.clone(),
                                format!("Cannot assign to immutable variable '{name}'"),
                            );
                        }
                        Some(true) => {}
                    }
                } else {
                    self.analyze_expr(left);
                }
                self.analyze_expr(right);
            }

            ExprKind::Binary { left, right, .. } => {
                self.analyze_expr(left);
                self.analyze_expr(right);
            }

            ExprKind::Unary { operand, .. } => self.analyze_expr(operand),

            ExprKind::Call { callee, arguments } => {
                self.analyze_expr(callee);
                for argument in arguments {
                    self.analyze_expr(argument);
                }
            }

            ExprKind::Index { base, index } => {
                self.analyze_expr(base);
                self.analyze_expr(index);
            }

            // Field existence is checked once struct types are
            // inferred; only the object resolves today.
            ExprKind::FieldAccess { object, .. } => self.analyze_expr(object),

            ExprKind::Cast { value, .. } => self.analyze_expr(value),

            ExprKind::StructLiteral { fields, .. } => {
                for field in fields {
                    self.analyze_expr(&field.value);
                }
            }

            ExprKind::ArrayLiteral { elements, repeat } => {
                for element in elements {
                    self.analyze_expr(element);
                }
                if let Some(repeat) = repeat {
                    self.analyze_expr(&repeat.value);
                    self.analyze_expr(&repeat.count);
                }
            }

            ExprKind::Tuple(elements) => {
                for element in elements {
                    self.analyze_expr(element);
                }
            }

            ExprKind::Block { stmts, tail } => {
                self.push_scope();
                for stmt in stmts {
                    self.analyze_stmt(stmt);
                }
                if let Some(tail) = tail {
                    self.analyze_expr(tail);
                }
                self.pop_scope();
            }

            ExprKind::If { condition, then_branch, else_branch } => {
                self.analyze_expr(condition);
                self.analyze_expr(then_branch);
                if let Some(else_branch) = else_branch {
                    self.analyze_expr(else_branch);
                }
            }

            ExprKind::Match { scrutinee, arms } => {
                self.analyze_expr(scrutinee);
                for arm in arms {
                    self.push_scope();
                    self.bind_pattern(&arm.pattern);
                    if let Some(guard) = &arm.guard {
                        self.analyze_expr(guard);
                    }
                    self.analyze_expr(&arm.body);
                    self.pop_scope();
                }
            }

            ExprKind::Range { start, end, .. } => {
                self.analyze_expr(start);
                self.analyze_expr(end);
            }

            ExprKind::Return(value) => {
                if let Some(value) = value {
                    self.analyze_expr(value);
                }
            }

            ExprKind::While { condition, body } => {
                self.analyze_expr(condition);
                self.analyze_expr(body);
            }

            ExprKind::For { pattern, iterator, body } => {
                self.analyze_expr(iterator);
                self.push_scope();
                self.bind_pattern(pattern);
                self.analyze_expr(body);
                self.pop_scope();
            }

            // Loop-context checking (break/continue outside a loop)
            // is future work.
            ExprKind::Break | ExprKind::Continue => {}
        }
    }

    // ── patterns and names ──────────────────────────────────────────

    /// Collect every binding a pattern introduces into the current
    /// scope. Or-pattern alternatives may repeat a name; collisions
    /// are ignored rather than reported.
    fn bind_pattern(&mut self, pattern: &Pattern) {
        match &pattern.kind {
            PatternKind::Wildcard | PatternKind::Literal(_) => {}

            PatternKind::Identifier { name, is_mutable } => {
                let symbol = Symbol {
                    name: name.clone(),
                    ty: None,
                    is_mutable: *is_mutable,
                    is_initialized: true,
                    location: pattern.location.clone(),
                };
                let _ = self.define(symbol);
            }

            PatternKind::Tuple(patterns) | PatternKind::Or(patterns) => {
                for pattern in patterns {
                    self.bind_pattern(pattern);
                }
            }

            PatternKind::Struct { fields, .. } => {
                for (_, pattern) in fields {
                    self.bind_pattern(pattern);
                }
            }

            PatternKind::Enum { args, .. } => {
                for pattern in args {
                    self.bind_pattern(pattern);
                }
            }

            PatternKind::Range { start, end, .. } => {
                self.bind_pattern(start);
                self.bind_pattern(end);
            }
        }
    }

    fn resolve_name(&mut self, name: &str, location: &SourceLocation) -> bool {
        if self.lookup(name).is_none() {
            self.error(location.clone(), format!("Undefined identifier '{name}'"));
            return false;
        }
        true
    }

    // ── future type-checking seams ──────────────────────────────────

    #[allow(dead_code)]
    fn infer_expr_type(&self, _expr: &Expr) -> Option<Type> {
        None
    }

    #[allow(dead_code)]
    fn types_compatible(&self, _left: &Type, _right: &Type) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn analyze(source: &str) -> (bool, Vec<String>) {
        let tokens = Lexer::new(source, "test.apex").tokenize_all();
        let mut parser = Parser::new(tokens);
        let module = parser.parse_module();
        assert!(!parser.has_errors(), "parse errors in {source:?}");

        let mut resolver = Resolver::new();
        let ok = resolver.analyze(&module);
        let errors = resolver.diagnostics().errors().iter().map(|d| d.to_string()).collect();
        (ok, errors)
    }

    #[test]
    fn resolves_identity_function() {
        let (ok, errors) = analyze("fn id(x: i32) -> i32 { x }");
        assert!(ok, "{errors:?}");
        assert!(errors.is_empty());
    }

    #[test]
    fn undefined_identifier_reports_exactly_one_error() {
        let (ok, errors) = analyze("fn f() -> i32 { missing }");
        assert!(!ok);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("error: Undefined identifier 'missing'"), "{}", errors[0]);
    }

    #[test]
    fn duplicate_struct_field() {
        let (ok, errors) = analyze("struct S { a: i32, a: i32 }");
        assert!(!ok);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Duplicate field 'a'"));
    }

    #[test]
    fn duplicate_enum_variant() {
        let (ok, errors) = analyze("enum E { A, B, A }");
        assert!(!ok);
        assert!(errors[0].contains("Duplicate variant 'A'"));
    }

    #[test]
    fn duplicate_parameter() {
        let (ok, errors) = analyze("fn f(a: i32, a: i32) { }");
        assert!(!ok);
        assert!(errors[0].contains("Redefinition of parameter 'a'"));
    }

    #[test]
    fn top_level_redefinition() {
        let (ok, errors) = analyze("fn f() { } fn f() { }");
        assert!(!ok);
        assert!(errors[0].contains("Redefinition of 'f'"));
    }

    #[test]
    fn functions_resolve_regardless_of_declaration_order() {
        let (ok, errors) = analyze("fn first() -> i32 { second() } fn second() -> i32 { 1 }");
        assert!(ok, "{errors:?}");
    }

    #[test]
    fn let_redefinition_in_same_scope() {
        let (ok, errors) = analyze("fn f() { let x = 1; let x = 2; }");
        assert!(!ok);
        assert!(errors[0].contains("Redefinition of 'x'"));
    }

    #[test]
    fn shadowing_in_nested_block_is_allowed() {
        let (ok, errors) = analyze("fn f() { let x = 1; { let x = 2; x; } x; }");
        assert!(ok, "{errors:?}");
    }

    #[test]
    fn block_scope_bindings_do_not_leak() {
        let (ok, errors) = analyze("fn f() { { let x = 1; } x; }");
        assert!(!ok);
        assert!(errors[0].contains("Undefined identifier 'x'"));
    }

    #[test]
    fn assignment_to_immutable_is_an_error() {
        let (ok, errors) = analyze("fn f() { let x = 1; x = 2; }");
        assert!(!ok);
        assert!(errors[0].contains("Cannot assign to immutable variable 'x'"));
    }

    #[test]
    fn compound_assignment_checks_mutability() {
        let (ok, errors) = analyze("fn f() { let x = 1; x <<= 2; }");
        assert!(!ok);
        assert!(errors[0].contains("Cannot assign to immutable variable 'x'"));
    }

    #[test]
    fn assignment_to_mutable_is_fine() {
        let (ok, errors) = analyze("fn f() { let mut x = 1; x = 2; x += 3; }");
        assert!(ok, "{errors:?}");
    }

    #[test]
    fn assignment_to_undefined_target() {
        let (ok, errors) = analyze("fn f() { y = 2; }");
        assert!(!ok);
        assert!(errors[0].contains("Undefined identifier 'y'"));
    }

    #[test]
    fn parameters_are_immutable() {
        let (ok, errors) = analyze("fn f(x: i32) { x = 1; }");
        assert!(!ok);
        assert!(errors[0].contains("Cannot assign to immutable variable 'x'"));
    }

    #[test]
    fn for_loop_binds_its_pattern_inside_the_body_only() {
        let (ok, errors) = analyze("fn f(n: i32) { for i in 0..n { i; } }");
        assert!(ok, "{errors:?}");

        let (ok, errors) = analyze("fn f(n: i32) { for i in 0..n { } i; }");
        assert!(!ok);
        assert!(errors[0].contains("Undefined identifier 'i'"));
    }

    #[test]
    fn match_arms_bind_patterns_for_guard_and_body() {
        let (ok, errors) = analyze(
            "fn f(x: i32) -> i32 { match x { n if n > 0 => n, (a, b) => a, _ => 0 } }",
        );
        assert!(ok, "{errors:?}");
    }

    #[test]
    fn match_arm_bindings_do_not_leak() {
        let (ok, errors) = analyze("fn f(x: i32) { match x { n => n, }; n; }");
        assert!(!ok);
        assert!(errors.iter().any(|e| e.contains("Undefined identifier 'n'")));
    }

    #[test]
    fn keeps_reporting_after_first_error() {
        let (ok, errors) = analyze("fn f() { missing_one; missing_two; }");
        assert!(!ok);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn diagnostics_are_in_source_order() {
        let (_, errors) = analyze("fn f() { first_missing; } fn g() { second_missing; }");
        assert!(errors[0].contains("first_missing"));
        assert!(errors[1].contains("second_missing"));
    }
}
