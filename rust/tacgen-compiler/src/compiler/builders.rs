//! Free-standing constructors for assembling trees by hand.
//!
//! Blocks, functions, classes and jump statements get a fresh line each so
//! their scope keys never collide; expression nodes carry a dummy span.

use crate::compiler::ast::*;
use crate::compiler::span::Span;
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_LINE: AtomicUsize = AtomicUsize::new(1);

fn fresh_span() -> Span {
    Span::at_line(NEXT_LINE.fetch_add(1, Ordering::Relaxed))
}

fn boxed(e: Expr) -> Box<Expr> {
    Box::new(e)
}

// ── Program structure ───────────────────────────────────────────────

pub fn program(statements: Vec<Stmt>) -> Program {
    Program { statements, span: Span::dummy() }
}

pub fn block(statements: Vec<Stmt>) -> Block {
    Block { statements, span: fresh_span() }
}

pub fn block_stmt(statements: Vec<Stmt>) -> Stmt {
    Stmt::Block(block(statements))
}

// ── Expressions ─────────────────────────────────────────────────────

pub fn int(n: i64) -> Expr {
    Expr::IntLit(n, Span::dummy())
}

pub fn string(s: &str) -> Expr {
    Expr::StringLit(s.to_string(), Span::dummy())
}

pub fn boolean(b: bool) -> Expr {
    Expr::BoolLit(b, Span::dummy())
}

pub fn null() -> Expr {
    Expr::NullLit(Span::dummy())
}

pub fn ident(name: &str) -> Expr {
    Expr::Ident(name.to_string(), Span::dummy())
}

pub fn this() -> Expr {
    Expr::This(Span::dummy())
}

pub fn array(elements: Vec<Expr>) -> Expr {
    Expr::ArrayLit(elements, Span::dummy())
}

pub fn binary(left: Expr, op: BinOp, right: Expr) -> Expr {
    Expr::BinOp(boxed(left), op, boxed(right), Span::dummy())
}

pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
    Expr::UnaryOp(op, boxed(operand), Span::dummy())
}

pub fn and(left: Expr, right: Expr) -> Expr {
    Expr::Logical(boxed(left), LogicalOp::And, boxed(right), Span::dummy())
}

pub fn or(left: Expr, right: Expr) -> Expr {
    Expr::Logical(boxed(left), LogicalOp::Or, boxed(right), Span::dummy())
}

pub fn ternary(condition: Expr, then_value: Expr, else_value: Expr) -> Expr {
    Expr::Ternary(boxed(condition), boxed(then_value), boxed(else_value), Span::dummy())
}

pub fn call(callee: &str, args: Vec<Expr>) -> Expr {
    Expr::Call(boxed(ident(callee)), args, Span::dummy())
}

pub fn method_call(receiver: Expr, method: &str, args: Vec<Expr>) -> Expr {
    Expr::Call(boxed(property(receiver, method)), args, Span::dummy())
}

pub fn new_object(class: &str, args: Vec<Expr>) -> Expr {
    Expr::New(class.to_string(), args, Span::dummy())
}

pub fn index(base: Expr, idx: Expr) -> Expr {
    Expr::Index(boxed(base), boxed(idx), Span::dummy())
}

pub fn property(object: Expr, name: &str) -> Expr {
    Expr::Property(boxed(object), name.to_string(), Span::dummy())
}

// ── Statements ──────────────────────────────────────────────────────

pub fn let_stmt(name: &str, ty: Option<TypeExpr>, value: Option<Expr>) -> Stmt {
    Stmt::Let(LetStmt { name: name.to_string(), ty, value, is_const: false, span: fresh_span() })
}

pub fn const_stmt(name: &str, ty: Option<TypeExpr>, value: Expr) -> Stmt {
    Stmt::Let(LetStmt { name: name.to_string(), ty, value: Some(value), is_const: true, span: fresh_span() })
}

pub fn assign(name: &str, value: Expr) -> Stmt {
    Stmt::Assign(AssignStmt { target: AssignTarget::Ident(name.to_string()), value, span: fresh_span() })
}

pub fn assign_index(base: Expr, indices: Vec<Expr>, value: Expr) -> Stmt {
    Stmt::Assign(AssignStmt { target: AssignTarget::Index { base, indices }, value, span: fresh_span() })
}

pub fn assign_property(object: Expr, field: &str, value: Expr) -> Stmt {
    Stmt::Assign(AssignStmt {
        target: AssignTarget::Property { object, field: field.to_string() },
        value,
        span: fresh_span(),
    })
}

pub fn print_stmt(value: Expr) -> Stmt {
    Stmt::Print(PrintStmt { value, span: fresh_span() })
}

pub fn expr_stmt(expr: Expr) -> Stmt {
    Stmt::Expr(ExprStmt { expr, span: fresh_span() })
}

pub fn if_stmt(condition: Expr, then_body: Vec<Stmt>, else_body: Option<Vec<Stmt>>) -> Stmt {
    Stmt::If(IfStmt {
        condition,
        then_block: block(then_body),
        else_block: else_body.map(block),
        span: fresh_span(),
    })
}

pub fn while_stmt(condition: Expr, body: Vec<Stmt>) -> Stmt {
    Stmt::While(WhileStmt { condition, body: block(body), span: fresh_span() })
}

pub fn do_while_stmt(body: Vec<Stmt>, condition: Expr) -> Stmt {
    Stmt::DoWhile(DoWhileStmt { body: block(body), condition, span: fresh_span() })
}

pub fn for_stmt(init: Option<Stmt>, condition: Option<Expr>, update: Option<Stmt>, body: Vec<Stmt>) -> Stmt {
    Stmt::For(ForStmt {
        init: init.map(Box::new),
        condition,
        update: update.map(Box::new),
        body: block(body),
        span: fresh_span(),
    })
}

pub fn foreach_stmt(item: &str, collection: Expr, body: Vec<Stmt>) -> Stmt {
    Stmt::Foreach(ForeachStmt { item: item.to_string(), collection, body: block(body), span: fresh_span() })
}

pub fn case(value: Expr, body: Vec<Stmt>) -> SwitchCase {
    SwitchCase { value, body, span: fresh_span() }
}

pub fn switch_stmt(subject: Expr, cases: Vec<SwitchCase>, default: Option<Vec<Stmt>>) -> Stmt {
    Stmt::Switch(SwitchStmt { subject, cases, default, span: fresh_span() })
}

pub fn break_stmt() -> Stmt {
    Stmt::Break(fresh_span())
}

pub fn continue_stmt() -> Stmt {
    Stmt::Continue(fresh_span())
}

pub fn return_stmt(value: Option<Expr>) -> Stmt {
    Stmt::Return(ReturnStmt { value, span: fresh_span() })
}

pub fn try_catch(try_body: Vec<Stmt>, catch_name: &str, catch_body: Vec<Stmt>) -> Stmt {
    Stmt::TryCatch(TryCatchStmt {
        try_block: block(try_body),
        catch_name: catch_name.to_string(),
        catch_block: block(catch_body),
        span: fresh_span(),
    })
}

// ── Declarations ────────────────────────────────────────────────────

pub fn param(name: &str, ty: TypeExpr) -> Param {
    Param { name: name.to_string(), ty: Some(ty), span: fresh_span() }
}

fn function_decl(name: &str, params: Vec<Param>, return_type: Option<TypeExpr>, body: Vec<Stmt>) -> FunctionDecl {
    FunctionDecl { name: name.to_string(), params, return_type, body: block(body), span: fresh_span() }
}

pub fn function(name: &str, params: Vec<Param>, return_type: Option<TypeExpr>, body: Vec<Stmt>) -> Stmt {
    Stmt::Function(function_decl(name, params, return_type, body))
}

pub fn field(name: &str, ty: Option<TypeExpr>, value: Option<Expr>) -> ClassMember {
    ClassMember::Field(LetStmt { name: name.to_string(), ty, value, is_const: false, span: fresh_span() })
}

pub fn method(name: &str, params: Vec<Param>, return_type: Option<TypeExpr>, body: Vec<Stmt>) -> ClassMember {
    ClassMember::Method(function_decl(name, params, return_type, body))
}

pub fn class(name: &str, parent: Option<&str>, members: Vec<ClassMember>) -> Stmt {
    Stmt::Class(ClassDecl {
        name: name.to_string(),
        parent: parent.map(str::to_string),
        members,
        span: fresh_span(),
    })
}
