//! AST node types produced by [`super::Parser`] (spec §4.2).
//!
//! Every node carries a [`SourceRange`] (spec invariant I1) so the evaluator's
//! diagnostics always point at real source text. The tree is plain owned `Box`/`Vec`
//! with no arena and no cycles — a program is parsed once and never mutated (spec §3
//! "Lifecycle", §9 "Scenes form a tree (no cycles)").

use crate::diagnostics::SourceRange;
use crate::value::Color;

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub range: SourceRange,
}

impl Stmt {
    #[must_use]
    pub fn new(kind: StmtKind, range: SourceRange) -> Self {
        Self { kind, range }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `name [args]` — a side-effecting command or a zero-arg/const symbol reference.
    Command { name: String, args: Option<Expr> },
    Define { name: String, definition: Definition },
    Option { name: String, default: Expr },
    ForLoop { index: Option<String>, source: Expr, body: Vec<Stmt> },
    If { cond: Expr, then_branch: Vec<Stmt>, else_ifs: Vec<(Expr, Vec<Stmt>)>, else_branch: Option<Vec<Stmt>> },
    Switch { subject: Expr, cases: Vec<(Expr, Vec<Stmt>)>, else_branch: Option<Vec<Stmt>> },
    /// A bare expression statement, e.g. a member-access expression evaluated only for
    /// its (possibly discarded) value — the evaluator raises `unusedValue` for these.
    Expression(Expr),
    Import(Expr),
    /// `name [args] { body }` — a block invocation with a trailing body.
    BlockCall { name: String, args: Option<Expr>, body: Vec<Stmt> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Expression(Expr),
    /// `parameters: Some(vec![])` for `define f() {...}` (a function with zero params);
    /// `None` for `define f {...}` (a block, parameters declared via `option` instead).
    Block { parameters: Option<Vec<String>>, body: Vec<Stmt> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub range: SourceRange,
}

impl Expr {
    #[must_use]
    pub fn new(kind: ExprKind, range: SourceRange) -> Self {
        Self { kind, range }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StringPart {
    Literal(String),
    Expr(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Number(f64),
    StringLiteral(String),
    InterpolatedString(Vec<StringPart>),
    ColorLiteral(Color),
    Identifier(String),
    Member(Box<Expr>, String),
    /// Juxtaposition tuple construction (spec §4.2 "Juxtaposition is the tuple
    /// constructor"); always has at least 2 elements — a single element is returned
    /// unwrapped by the parser rather than boxed in a 1-tuple.
    Tuple(Vec<Expr>),
    Call(String, Vec<Expr>),
    Infix(InfixOp, Box<Expr>, Box<Expr>),
    Prefix(PrefixOp, Box<Expr>),
    Range { from: Box<Expr>, to: Option<Box<Expr>>, step: Option<Box<Expr>> },
    In(Box<Expr>, Box<Expr>),
    IfElse { cond: Box<Expr>, then_value: Box<Expr>, else_value: Box<Expr> },
    /// A bare `{ ... }` appearing where an expression is expected, e.g. the value of a
    /// `define`.
    Block(Vec<Stmt>),
}
