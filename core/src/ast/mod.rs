//! Expression tree produced by the parser.

mod parser;


pub use parser::{parse_program, ParseOutcome};

use crate::op::BinOp;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i64),
    Float(f64),
    Str(String),
    Undefined,
    Null,
    Ident(String),
    /// `&name`: load without executing a computed value.
    RawRef(String),
    Array(Vec<Expr>),
    /// `&(expr)` — the source text, compiled lazily on first read.
    Computed(String),
    /// `func name?(params) { body }` — body kept as source text.
    Function {
        expr: String,
        name: String,
        params: Vec<String>,
    },
    Bin(Box<Expr>, BinOp, Box<Expr>),
    Neg(Box<Expr>),
    Pos(Box<Expr>),
    Index(Box<Expr>, Box<Expr>),
    Slice(Box<Expr>, Option<Box<Expr>>, Option<Box<Expr>>),
    Attr(Box<Expr>, String),
    MethodCall(Box<Expr>, String, Vec<Expr>),
    Call(Box<Expr>, Vec<Expr>),
    /// Dice roll. A missing count means one die, a missing side count
    /// defers to the context's default-faces flags.
    Roll {
        count: Option<Box<Expr>>,
        sides: Option<Box<Expr>>,
        keep: Option<(bool, Box<Expr>)>,
    },
    Assign(AssignTarget, Box<Expr>),
    /// `;`-separated statements; the last one's value is the result.
    Seq(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssignTarget {
    Name(String),
    Attr(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Slice(Box<Expr>, Option<Box<Expr>>, Option<Box<Expr>>),
}
