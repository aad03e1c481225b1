//! Syntax tree handed to the lowering pass by the front end.

use crate::compiler::span::Span;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// A complete source program
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

/// A braced statement list. Its span keys the block's scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

/// A type annotation as written in the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeExpr {
    Boolean,
    Integer,
    String,
    Void,
    /// `T[]`; nesting gives the rank
    Array(Box<TypeExpr>),
    /// Class name
    Named(String),
}

impl TypeExpr {
    /// `element` wrapped in `rank` array levels.
    pub fn array_of(element: TypeExpr, rank: usize) -> TypeExpr {
        (0..rank).fold(element, |inner, _| TypeExpr::Array(Box::new(inner)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stmt {
    Let(LetStmt),
    Assign(AssignStmt),
    Print(PrintStmt),
    Expr(ExprStmt),
    Block(Block),
    If(IfStmt),
    While(WhileStmt),
    DoWhile(DoWhileStmt),
    For(ForStmt),
    Foreach(ForeachStmt),
    Switch(SwitchStmt),
    Break(Span),
    Continue(Span),
    Return(ReturnStmt),
    TryCatch(TryCatchStmt),
    Function(FunctionDecl),
    Class(ClassDecl),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Let(s) => s.span,
            Stmt::Assign(s) => s.span,
            Stmt::Print(s) => s.span,
            Stmt::Expr(s) => s.span,
            Stmt::Block(b) => b.span,
            Stmt::If(s) => s.span,
            Stmt::While(s) => s.span,
            Stmt::DoWhile(s) => s.span,
            Stmt::For(s) => s.span,
            Stmt::Foreach(s) => s.span,
            Stmt::Switch(s) => s.span,
            Stmt::Break(span) | Stmt::Continue(span) => *span,
            Stmt::Return(s) => s.span,
            Stmt::TryCatch(s) => s.span,
            Stmt::Function(f) => f.span,
            Stmt::Class(c) => c.span,
        }
    }
}

/// `let`, `var` and `const` declarations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LetStmt {
    pub name: String,
    pub ty: Option<TypeExpr>,
    pub value: Option<Expr>,
    pub is_const: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AssignTarget {
    Ident(String),
    /// `base[i][j]`
    Index { base: Expr, indices: Vec<Expr> },
    /// `object.field`
    Property { object: Expr, field: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignStmt {
    pub target: AssignTarget,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintStmt {
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExprStmt {
    pub expr: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_block: Block,
    pub else_block: Option<Block>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoWhileStmt {
    pub body: Block,
    pub condition: Expr,
    pub span: Span,
}

/// `for (init; condition; update) body`. The init declaration lives in the
/// body's scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForStmt {
    pub init: Option<Box<Stmt>>,
    pub condition: Option<Expr>,
    pub update: Option<Box<Stmt>>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeachStmt {
    pub item: String,
    pub collection: Expr,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchCase {
    pub value: Expr,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchStmt {
    pub subject: Expr,
    pub cases: Vec<SwitchCase>,
    pub default: Option<Vec<Stmt>>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TryCatchStmt {
    pub try_block: Block,
    pub catch_name: String,
    pub catch_block: Block,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: Option<TypeExpr>,
    pub span: Span,
}

/// A function or method. Parameters are declared in the body's scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Option<TypeExpr>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClassMember {
    Field(LetStmt),
    Method(FunctionDecl),
}

/// A class declaration. Its own span keys the class scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: String,
    pub parent: Option<String>,
    pub members: Vec<ClassMember>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    /// Integer literal
    IntLit(i64, Span),
    /// String literal
    StringLit(String, Span),
    /// Boolean literal
    BoolLit(bool, Span),
    /// Null literal
    NullLit(Span),
    /// Variable, parameter, field or function name
    Ident(String, Span),
    /// `this`
    This(Span),
    /// `[a, b, ...]`, possibly nested
    ArrayLit(Vec<Expr>, Span),
    /// Arithmetic and comparison operators
    BinOp(Box<Expr>, BinOp, Box<Expr>, Span),
    UnaryOp(UnaryOp, Box<Expr>, Span),
    /// Short-circuit `&&` / `||`
    Logical(Box<Expr>, LogicalOp, Box<Expr>, Span),
    /// `cond ? a : b`
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>, Span),
    /// Callee is an identifier or a property access (method call)
    Call(Box<Expr>, Vec<Expr>, Span),
    /// `new Class(args)`
    New(String, Vec<Expr>, Span),
    /// `base[index]`
    Index(Box<Expr>, Box<Expr>, Span),
    /// `object.field`
    Property(Box<Expr>, String, Span),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::IntLit(_, s)
            | Expr::StringLit(_, s)
            | Expr::BoolLit(_, s)
            | Expr::NullLit(s)
            | Expr::Ident(_, s)
            | Expr::This(s)
            | Expr::ArrayLit(_, s)
            | Expr::BinOp(_, _, _, s)
            | Expr::UnaryOp(_, _, s)
            | Expr::Logical(_, _, _, s)
            | Expr::Ternary(_, _, _, s)
            | Expr::Call(_, _, s)
            | Expr::New(_, _, s)
            | Expr::Index(_, _, s)
            | Expr::Property(_, _, s) => *s,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter)]
pub enum BinOp {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "*")]
    Mul,
    #[strum(serialize = "/")]
    Div,
    #[strum(serialize = "%")]
    Mod,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    LtEq,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    GtEq,
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    NotEq,
}

impl BinOp {
    /// Comparison operators yield a boolean regardless of operand types.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Lt | BinOp::LtEq | BinOp::Gt | BinOp::GtEq | BinOp::Eq | BinOp::NotEq
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter)]
pub enum UnaryOp {
    #[strum(serialize = "-")]
    Neg,
    #[strum(serialize = "!")]
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter)]
pub enum LogicalOp {
    #[strum(serialize = "&&")]
    And,
    #[strum(serialize = "||")]
    Or,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn operator_spellings_round_trip() {
        for op in BinOp::iter() {
            assert_eq!(BinOp::from_str(&op.to_string()).unwrap(), op);
        }
        assert_eq!(UnaryOp::Not.to_string(), "!");
        assert_eq!(LogicalOp::Or.to_string(), "||");
    }

    #[test]
    fn array_of_nests_rank_levels() {
        let ty = TypeExpr::array_of(TypeExpr::Integer, 2);
        assert_eq!(
            ty,
            TypeExpr::Array(Box::new(TypeExpr::Array(Box::new(TypeExpr::Integer))))
        );
    }
}
