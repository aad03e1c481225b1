//! Declaration collection: builds the scope table lowering consumes.
//!
//! One scope per block keyed by where the block starts, a function scope per
//! function body (holding its parameters), and a class scope per class
//! (holding fields and methods). Loop, foreach and catch variables belong to
//! their body's scope. Only names, kinds and declared types are recorded;
//! storage is assigned later by lowering.

use crate::compiler::ast::*;
use crate::compiler::span::Span;
use crate::compiler::symbols::{DeclaredType, ScopeId, ScopeKey, ScopeKind, ScopeTable, Symbol, SymbolKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("duplicate definition '{name}' at line {line}")]
    Duplicate { name: String, line: usize },
    #[error("two blocks start at line {line}, column {col}")]
    ScopeCollision { line: usize, col: usize },
}

impl ResolveError {
    pub fn line(&self) -> usize {
        match self {
            ResolveError::Duplicate { line, .. } | ResolveError::ScopeCollision { line, .. } => *line,
        }
    }
}

/// Collect all declarations in `program`.
pub fn resolve(program: &Program) -> Result<ScopeTable, Vec<ResolveError>> {
    let (table, errors) = resolve_partial(program);
    if errors.is_empty() {
        Ok(table)
    } else {
        Err(errors)
    }
}

/// Collect declarations, keeping the table even when errors were found.
pub fn resolve_partial(program: &Program) -> (ScopeTable, Vec<ResolveError>) {
    let mut resolver = Resolver { table: ScopeTable::new(), errors: Vec::new(), class: None };
    let global = resolver.table.global();
    for stmt in &program.statements {
        resolver.stmt(global, stmt);
    }
    (resolver.table, resolver.errors)
}

struct Resolver {
    table: ScopeTable,
    errors: Vec<ResolveError>,
    class: Option<String>,
}

impl Resolver {
    fn declare(&mut self, scope: ScopeId, symbol: Symbol) {
        let (name, line) = (symbol.name.clone(), symbol.span.line);
        if self.table.declare(scope, symbol).is_err() {
            self.errors.push(ResolveError::Duplicate { name, line });
        }
    }

    fn open_scope(&mut self, span: Span, kind: ScopeKind, parent: ScopeId) -> ScopeId {
        let key = ScopeKey::of(span);
        match self.table.add_scope(key, kind, parent) {
            Ok(id) => id,
            Err(existing) => {
                self.errors.push(ResolveError::ScopeCollision { line: key.line, col: key.col });
                existing
            }
        }
    }

    fn block(&mut self, parent: ScopeId, block: &Block) -> ScopeId {
        let id = self.open_scope(block.span, ScopeKind::Block, parent);
        self.stmts(id, &block.statements);
        id
    }

    fn stmts(&mut self, scope: ScopeId, stmts: &[Stmt]) {
        for stmt in stmts {
            self.stmt(scope, stmt);
        }
    }

    fn stmt(&mut self, scope: ScopeId, stmt: &Stmt) {
        match stmt {
            Stmt::Let(ls) => self.variable(scope, ls, SymbolKind::Variable),
            Stmt::Block(b) => {
                self.block(scope, b);
            }
            Stmt::If(s) => {
                self.block(scope, &s.then_block);
                if let Some(else_block) = &s.else_block {
                    self.block(scope, else_block);
                }
            }
            Stmt::While(s) => {
                self.block(scope, &s.body);
            }
            Stmt::DoWhile(s) => {
                self.block(scope, &s.body);
            }
            Stmt::For(s) => {
                let body = self.open_scope(s.body.span, ScopeKind::Block, scope);
                if let Some(init) = &s.init {
                    self.stmt(body, init);
                }
                self.stmts(body, &s.body.statements);
            }
            Stmt::Foreach(s) => {
                let body = self.open_scope(s.body.span, ScopeKind::Block, scope);
                let item_type = self.infer(scope, &s.collection).indexed();
                self.declare(body, Symbol::new(&s.item, item_type, SymbolKind::Variable, s.span));
                self.stmts(body, &s.body.statements);
            }
            Stmt::Switch(s) => {
                for case in &s.cases {
                    self.stmts(scope, &case.body);
                }
                if let Some(default) = &s.default {
                    self.stmts(scope, default);
                }
            }
            Stmt::TryCatch(s) => {
                self.block(scope, &s.try_block);
                let handler = self.open_scope(s.catch_block.span, ScopeKind::Block, scope);
                let exception = DeclaredType::Class("Exception".to_string());
                self.declare(handler, Symbol::new(&s.catch_name, exception, SymbolKind::Variable, s.span));
                self.stmts(handler, &s.catch_block.statements);
            }
            Stmt::Function(f) => self.function(scope, f),
            Stmt::Class(c) => self.class(scope, c),
            Stmt::Assign(_)
            | Stmt::Print(_)
            | Stmt::Expr(_)
            | Stmt::Break(_)
            | Stmt::Continue(_)
            | Stmt::Return(_) => {}
        }
    }

    fn variable(&mut self, scope: ScopeId, ls: &LetStmt, kind: SymbolKind) {
        let declared_type = match (&ls.ty, &ls.value) {
            (Some(ty), _) => DeclaredType::from_type_expr(ty),
            (None, Some(value)) => self.infer(scope, value),
            (None, None) => DeclaredType::Unknown,
        };
        let mut symbol = Symbol::new(&ls.name, declared_type, kind, ls.span).with_class(self.class.clone());
        symbol.is_const = ls.is_const;
        self.declare(scope, symbol);
    }

    fn function(&mut self, scope: ScopeId, f: &FunctionDecl) {
        let body = self.open_scope(f.body.span, ScopeKind::Function, scope);
        let return_type = f.return_type.as_ref().map(DeclaredType::from_type_expr).unwrap_or(DeclaredType::Void);
        let mut symbol = Symbol::new(&f.name, return_type, SymbolKind::Function, f.span)
            .with_class(self.class.clone())
            .with_members(body);
        symbol.param_count = f.params.len();
        self.declare(scope, symbol);

        // Locals of a method are not members of its class.
        let outer_class = self.class.take();
        for param in &f.params {
            let ty = param.ty.as_ref().map(DeclaredType::from_type_expr).unwrap_or(DeclaredType::Unknown);
            self.declare(body, Symbol::new(&param.name, ty, SymbolKind::Parameter, param.span));
        }
        self.stmts(body, &f.body.statements);
        self.class = outer_class;
    }

    fn class(&mut self, scope: ScopeId, c: &ClassDecl) {
        let members = self.open_scope(c.span, ScopeKind::Class, scope);
        let symbol = Symbol::new(&c.name, DeclaredType::Class(c.name.clone()), SymbolKind::Class, c.span)
            .with_members(members);
        self.declare(scope, symbol);

        let outer_class = self.class.replace(c.name.clone());
        for member in &c.members {
            match member {
                ClassMember::Field(ls) => self.variable(members, ls, SymbolKind::Field),
                ClassMember::Method(f) => self.function(members, f),
            }
        }
        self.class = outer_class;
    }

    /// Best-effort type of an initializer, for declarations without an
    /// annotation.
    fn infer(&self, scope: ScopeId, expr: &Expr) -> DeclaredType {
        match expr {
            Expr::IntLit(..) => DeclaredType::Integer,
            Expr::StringLit(..) => DeclaredType::String,
            Expr::BoolLit(..) => DeclaredType::Boolean,
            Expr::NullLit(_) => DeclaredType::Null,
            Expr::ArrayLit(elems, _) => {
                let leaf = elems.first().map(|e| self.infer(scope, e)).unwrap_or(DeclaredType::Unknown);
                leaf.array_of(1)
            }
            Expr::New(class, _, _) => DeclaredType::Class(class.clone()),
            Expr::Ident(name, _) => self
                .table
                .lookup(scope, name)
                .map(|id| self.table.symbol(id).declared_type.clone())
                .unwrap_or(DeclaredType::Unknown),
            Expr::Call(callee, _, _) => match callee.as_ref() {
                Expr::Ident(name, _) => self
                    .table
                    .lookup(scope, name)
                    .map(|id| self.table.symbol(id))
                    .filter(|s| s.is_callable())
                    .map(|s| s.declared_type.clone())
                    .filter(|ty| *ty != DeclaredType::Void)
                    .unwrap_or(DeclaredType::Unknown),
                _ => DeclaredType::Unknown,
            },
            Expr::BinOp(l, op, r, _) => {
                if op.is_comparison() {
                    return DeclaredType::Boolean;
                }
                let (lt, rt) = (self.infer(scope, l), self.infer(scope, r));
                if *op == BinOp::Add && (lt == DeclaredType::String || rt == DeclaredType::String) {
                    DeclaredType::String
                } else {
                    DeclaredType::Integer
                }
            }
            Expr::UnaryOp(UnaryOp::Not, _, _) | Expr::Logical(..) => DeclaredType::Boolean,
            Expr::UnaryOp(UnaryOp::Neg, _, _) => DeclaredType::Integer,
            Expr::Ternary(_, a, _, _) => self.infer(scope, a),
            Expr::Index(base, _, _) => self.infer(scope, base).indexed(),
            Expr::This(_) | Expr::Property(..) => DeclaredType::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::builders::*;

    #[test]
    fn collects_globals_with_inferred_types() {
        let prog = program(vec![
            let_stmt("a", Some(TypeExpr::Integer), None),
            let_stmt("s", None, Some(string("hi"))),
            let_stmt("m", None, Some(array(vec![array(vec![int(1)]), array(vec![int(2)])]))),
        ]);
        let table = resolve(&prog).unwrap();
        let global = table.global();
        let ty = |name: &str| table.symbol(table.lookup(global, name).unwrap()).declared_type.clone();
        assert_eq!(ty("a"), DeclaredType::Integer);
        assert_eq!(ty("s"), DeclaredType::String);
        assert_eq!(ty("m"), DeclaredType::Integer.array_of(2));
    }

    #[test]
    fn function_parameters_live_in_the_function_scope() {
        let prog = program(vec![function(
            "sum",
            vec![param("a", TypeExpr::Integer), param("b", TypeExpr::Integer)],
            Some(TypeExpr::Integer),
            vec![return_stmt(Some(binary(ident("a"), BinOp::Add, ident("b"))))],
        )]);
        let table = resolve(&prog).unwrap();
        let sum = table.lookup(table.global(), "sum").unwrap();
        let symbol = table.symbol(sum);
        assert_eq!(symbol.kind, SymbolKind::Function);
        assert_eq!(symbol.param_count, 2);
        let body = symbol.members.unwrap();
        assert_eq!(table.scope(body).kind, ScopeKind::Function);
        assert!(table.lookup_local(body, "a").is_some());
        assert!(table.lookup(table.global(), "a").is_none());
    }

    #[test]
    fn class_members_record_their_class() {
        let prog = program(vec![class(
            "Animal",
            None,
            vec![
                field("name", Some(TypeExpr::String), None),
                method("speak", vec![], None, vec![print_stmt(ident("name"))]),
            ],
        )]);
        let table = resolve(&prog).unwrap();
        let animal = table.lookup(table.global(), "Animal").unwrap();
        let members = table.symbol(animal).members.unwrap();
        let name = table.symbol(table.lookup_local(members, "name").unwrap());
        assert_eq!(name.kind, SymbolKind::Field);
        assert_eq!(name.enclosing_class.as_deref(), Some("Animal"));
        let speak = table.symbol(table.lookup_local(members, "speak").unwrap());
        assert_eq!(speak.qualified_name(), "Animal.speak");
    }

    #[test]
    fn loop_and_catch_variables_belong_to_their_body() {
        let prog = program(vec![
            let_stmt("xs", None, Some(array(vec![int(1), int(2)]))),
            foreach_stmt("x", ident("xs"), vec![print_stmt(ident("x"))]),
            try_catch(vec![], "e", vec![print_stmt(ident("e"))]),
        ]);
        let table = resolve(&prog).unwrap();
        let global = table.global();
        assert!(table.lookup(global, "x").is_none());
        assert!(table.lookup(global, "e").is_none());
        let x = table.iter().find(|s| s.name == "x").unwrap();
        assert_eq!(x.declared_type, DeclaredType::Integer);
    }

    #[test]
    fn reports_duplicates_in_one_scope() {
        let prog = program(vec![
            let_stmt("a", Some(TypeExpr::Integer), None),
            let_stmt("a", Some(TypeExpr::String), None),
        ]);
        let errors = resolve(&prog).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], ResolveError::Duplicate { name, .. } if name == "a"));
    }
}
