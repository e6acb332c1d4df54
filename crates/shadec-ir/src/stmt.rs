//! Statements of the shader IR.

use crate::expr::Expr;
use crate::types::ValueType;

/// A sequence of statements.
pub type Block = Vec<Statement>;

/// A statement in the IR.
#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    /// Placeholder for a statement that failed to lower. Always
    /// accompanied by a recorded diagnostic.
    Error,
    /// `let name: ty = init;`
    DeclareLocal {
        ty: ValueType,
        name: String,
        init: Option<Expr>,
    },
    /// An expression evaluated for its side effects.
    Expression(Expr),
    /// `return expr;` — rewritten by the emitter inside entry functions.
    Return(Option<Expr>),
    /// A nested block of statements.
    Block(Block),
    /// Conditional branch.
    If {
        condition: Expr,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
    },
}
