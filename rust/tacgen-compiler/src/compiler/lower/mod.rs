//! AST → TAC lowering. Walks a resolved tree once, appending instructions
//! and writing storage facts back into the scope table.

mod arrays;
mod expr;
mod frame;
mod stmt;

use crate::compiler::ast::*;
use crate::compiler::generator::Generator;
use crate::compiler::span::Span;
use crate::compiler::symbols::{ScopeId, ScopeKey, ScopeTable, Symbol, SymbolId};
use crate::compiler::tac::{Instruction, Operand, TacProgram, Temp};
use crate::CompileOptions;
use thiserror::Error;
use tracing::warn;

/// A problem found while lowering. None of these stop the pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LowerError {
    #[error("unresolved symbol '{name}' at line {line}")]
    UnresolvedSymbol { name: String, line: usize },
    #[error("'break' outside of a loop or switch at line {line}")]
    BreakOutsideLoop { line: usize },
    #[error("'continue' outside of a loop at line {line}")]
    ContinueOutsideLoop { line: usize },
    #[error("ragged array literal for '{name}' at line {line}")]
    RaggedArrayLiteral { name: String, line: usize },
}

impl LowerError {
    pub fn line(&self) -> usize {
        match self {
            LowerError::UnresolvedSymbol { line, .. }
            | LowerError::BreakOutsideLoop { line }
            | LowerError::ContinueOutsideLoop { line }
            | LowerError::RaggedArrayLiteral { line, .. } => *line,
        }
    }
}

/// Result of one lowering run: the instruction log and every diagnostic
/// recorded along the way.
#[derive(Debug, Clone)]
pub struct Lowered {
    pub program: TacProgram,
    pub diagnostics: Vec<LowerError>,
}

impl Lowered {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Lower an entire program, annotating `scopes` in place.
pub fn lower(program: &Program, scopes: &mut ScopeTable, options: &CompileOptions) -> Lowered {
    let mut lowerer = Lowerer::new(scopes, options);
    for stmt in &program.statements {
        lowerer.lower_stmt(stmt);
    }
    lowerer.finish()
}

pub(crate) struct Lowerer<'a> {
    scopes: &'a mut ScopeTable,
    options: &'a CompileOptions,
    gen: Generator,
    scope: ScopeId,
    diagnostics: Vec<LowerError>,
}

impl<'a> Lowerer<'a> {
    fn new(scopes: &'a mut ScopeTable, options: &'a CompileOptions) -> Self {
        let scope = scopes.global();
        Self { scopes, options, gen: Generator::new(options.nested_frames), scope, diagnostics: Vec::new() }
    }

    fn finish(self) -> Lowered {
        debug_assert_eq!(self.gen.frame_depth(), 0, "unbalanced frames");
        debug_assert_eq!(self.gen.loop_depth(), 0, "unbalanced loops");
        Lowered { program: TacProgram::new(self.gen.into_instructions()), diagnostics: self.diagnostics }
    }

    fn report(&mut self, error: LowerError) {
        warn!(%error, function = ?self.gen.current_function(), "lowering diagnostic");
        self.diagnostics.push(error);
    }

    fn report_unresolved(&mut self, name: &str, span: Span) {
        self.report(LowerError::UnresolvedSymbol { name: name.to_string(), line: span.line });
    }

    // ── Scopes ──────────────────────────────────────────────────────

    fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.scopes.lookup(self.scope, name)
    }

    fn symbol(&self, id: SymbolId) -> &Symbol {
        self.scopes.symbol(id)
    }

    /// Switch to the scope keyed by `span`, returning the scope to restore.
    /// A block the scope table does not know keeps the current scope.
    fn enter_scope(&mut self, span: Span) -> ScopeId {
        let outer = self.scope;
        match self.scopes.scope_for(ScopeKey::of(span)) {
            Some(id) => self.scope = id,
            None => warn!(line = span.line, col = span.col, "no scope recorded for block"),
        }
        outer
    }

    // ── Storage ─────────────────────────────────────────────────────

    /// Size of one value of the symbol's declared type.
    fn value_size(&self, id: SymbolId) -> u32 {
        self.symbol(id).declared_type.size(self.options.pointer_size)
    }

    /// Reserve `size` bytes for `id` in the current frame and record its
    /// offset, size and address.
    fn bind_storage(&mut self, id: SymbolId, size: u32) -> u32 {
        let offset = self.gen.allocate(size);
        let symbol = self.scopes.symbol_mut(id);
        debug_assert!(symbol.offset.is_none(), "'{}' bound twice", symbol.name);
        symbol.offset = Some(offset);
        symbol.size = size;
        symbol.address = Some(symbol.name.clone());
        offset
    }

    // ── Operand helpers ─────────────────────────────────────────────

    fn emit_assign(&mut self, result: Operand, arg: Operand) {
        self.gen.emit(Instruction::Assign { result, arg });
    }

    /// Copy `value` into a fresh temp.
    fn copy_to_temp(&mut self, value: Operand) -> Temp {
        let t = self.gen.new_temp();
        self.emit_assign(t.into(), value);
        t
    }

    /// `value` itself when it already is a temp, otherwise a fresh copy.
    fn ensure_temp(&mut self, value: Operand) -> Operand {
        if value.is_temp() {
            return value;
        }
        self.copy_to_temp(value).into()
    }

    // ── Name checks ─────────────────────────────────────────────────

    /// Report every name in `stmt`'s expressions that does not resolve.
    /// Returns `false` when the statement must be skipped.
    fn check_names(&mut self, stmt: &Stmt) -> bool {
        let mut missing = Vec::new();
        match stmt {
            Stmt::Let(ls) => self.collect_let_unresolved(ls, &mut missing),
            Stmt::Assign(a) => {
                match &a.target {
                    AssignTarget::Ident(name) => {
                        if self.lookup(name).is_none() {
                            missing.push((name.clone(), a.span));
                        }
                    }
                    AssignTarget::Index { base, indices } => {
                        self.collect_unresolved(base, &mut missing);
                        for i in indices {
                            self.collect_unresolved(i, &mut missing);
                        }
                    }
                    AssignTarget::Property { object, .. } => self.collect_unresolved(object, &mut missing),
                }
                self.collect_unresolved(&a.value, &mut missing);
            }
            Stmt::Print(p) => self.collect_unresolved(&p.value, &mut missing),
            Stmt::Expr(e) => self.collect_unresolved(&e.expr, &mut missing),
            Stmt::Return(r) => {
                if let Some(value) = &r.value {
                    self.collect_unresolved(value, &mut missing);
                }
            }
            _ => {}
        }
        self.report_missing(&missing, stmt.span())
    }

    /// `check_names` for a field declaration.
    fn check_let_names(&mut self, ls: &LetStmt) -> bool {
        let mut missing = Vec::new();
        self.collect_let_unresolved(ls, &mut missing);
        self.report_missing(&missing, ls.span)
    }

    fn collect_let_unresolved(&self, ls: &LetStmt, out: &mut Vec<(String, Span)>) {
        if self.lookup(&ls.name).is_none() {
            out.push((ls.name.clone(), ls.span));
        }
        if let Some(value) = &ls.value {
            self.collect_unresolved(value, out);
        }
    }

    /// Report each missing name once; `true` when nothing was missing.
    fn report_missing(&mut self, missing: &[(String, Span)], fallback: Span) -> bool {
        let mut reported: Vec<&str> = Vec::new();
        for (name, span) in missing {
            if reported.contains(&name.as_str()) {
                continue;
            }
            reported.push(name);
            let span = if span.line == 0 { fallback } else { *span };
            self.report_unresolved(name, span);
        }
        missing.is_empty()
    }

    fn collect_unresolved(&self, expr: &Expr, out: &mut Vec<(String, Span)>) {
        match expr {
            Expr::Ident(name, span) => {
                if self.lookup(name).is_none() {
                    out.push((name.clone(), *span));
                }
            }
            Expr::New(class, args, span) => {
                if self.lookup(class).is_none() {
                    out.push((class.clone(), *span));
                }
                for a in args {
                    self.collect_unresolved(a, out);
                }
            }
            Expr::ArrayLit(elems, _) => {
                for e in elems {
                    self.collect_unresolved(e, out);
                }
            }
            Expr::BinOp(l, _, r, _) | Expr::Logical(l, _, r, _) | Expr::Index(l, r, _) => {
                self.collect_unresolved(l, out);
                self.collect_unresolved(r, out);
            }
            Expr::UnaryOp(_, inner, _) | Expr::Property(inner, _, _) => self.collect_unresolved(inner, out),
            Expr::Ternary(c, a, b, _) => {
                self.collect_unresolved(c, out);
                self.collect_unresolved(a, out);
                self.collect_unresolved(b, out);
            }
            Expr::Call(callee, args, _) => {
                // Method names resolve against the receiver's class at run time.
                match callee.as_ref() {
                    Expr::Property(receiver, _, _) => self.collect_unresolved(receiver, out),
                    other => self.collect_unresolved(other, out),
                }
                for a in args {
                    self.collect_unresolved(a, out);
                }
            }
            Expr::IntLit(..) | Expr::StringLit(..) | Expr::BoolLit(..) | Expr::NullLit(_) | Expr::This(_) => {}
        }
    }
}
