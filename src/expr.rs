use std::sync::atomic::{AtomicU32, Ordering};

use crate::token::Token;

/// Stable identity for the expression nodes the resolver binds.  Depths
/// are recorded in a side table keyed by this id; ids come from a
/// process-wide counter so REPL lines never collide with ASTs retained by
/// earlier closures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(u32);

impl ExprId {
    pub fn fresh() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(0);

        ExprId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Number(f64),
    Str(String),
    True,
    False,
    Nil,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(LiteralValue),

    Grouping(Box<Expr>),

    Unary {
        operator: Token,
        right: Box<Expr>,
    },

    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    Variable {
        name: Token,
        id: ExprId,
    },

    Assign {
        name: Token,
        value: Box<Expr>,
        id: ExprId,
    },

    Call {
        callee: Box<Expr>,
        paren: Token,
        arguments: Vec<Expr>,
    },

    Get {
        object: Box<Expr>,
        name: Token,
    },

    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    This {
        keyword: Token,
        id: ExprId,
    },

    Super {
        keyword: Token,
        method: Token,
        id: ExprId,
    },
}
