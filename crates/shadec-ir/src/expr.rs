//! Expressions of the shader IR.

use crate::types::ValueType;

/// Binary and prefix operators supported in shader code.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum Op {
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    ShiftLeft,
    ShiftRight,
    BitAnd,
    BitOr,
    Equals,
    Not,
    NotEquals,
    LessThan,
    GreaterThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
}

/// Operations that exist only on the GPU and lower to fixed GLSL builtins.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum IntrinsicOp {
    /// `sample(texture, coords)` → the texture-lookup builtin.
    TextureSample,
    /// `rgba(r, g, b, a)` → the 4-vector constructor.
    RgbaConstruct,
    /// `discard()` → the fragment discard statement.
    Discard,
}

/// A literal constant value.
///
/// Restricted to 32-bit values; double-precision literals are rejected
/// during lowering.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Literal {
    F32(f32),
    Bool(bool),
    I32(i32),
    U32(u32),
}

/// An expression in the IR.
///
/// Expressions are immutable trees owned by the function body that
/// contains them; there is no sharing between nodes.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Placeholder for an expression that failed to lower. Always
    /// accompanied by a recorded diagnostic.
    Error,
    /// Reference to a parameter, local, or shader global.
    Identifier(String),
    /// `obj.field` — struct field access or vector swizzle.
    FieldAccess { obj: Box<Expr>, field: String },
    /// `target = value`.
    Assignment { target: Box<Expr>, value: Box<Expr> },
    /// Positional construction of a value, `Vec4(x, y, z, w)`.
    Construct { ty: ValueType, args: Vec<Expr> },
    /// Call of a helper function or intrinsic.
    Invoke { func: Box<Expr>, args: Vec<Expr> },
    /// Binary operator application.
    BinOp {
        left: Box<Expr>,
        op: Op,
        right: Box<Expr>,
    },
    /// Prefix operator application.
    PrefixOp { op: Op, operand: Box<Expr> },
    /// Parenthesised sub-expression, kept so emitted text matches source.
    Paren(Box<Expr>),
    /// A GPU-only intrinsic in callee position.
    Intrinsic(IntrinsicOp),
    /// A literal constant.
    Literal(Literal),
}

impl Expr {
    /// Convenience constructor for identifier expressions.
    pub fn ident(name: impl Into<String>) -> Self {
        Self::Identifier(name.into())
    }

    /// Convenience constructor for binary operations.
    pub fn binary(left: Expr, op: Op, right: Expr) -> Self {
        Self::BinOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_binary_expression() {
        let e = Expr::binary(
            Expr::ident("a"),
            Op::Plus,
            Expr::Literal(Literal::F32(1.0)),
        );
        if let Expr::BinOp { op, left, .. } = &e {
            assert_eq!(*op, Op::Plus);
            assert_eq!(**left, Expr::Identifier("a".into()));
        } else {
            panic!("expected BinOp");
        }
    }

    #[test]
    fn field_access_chain() {
        let e = Expr::FieldAccess {
            obj: Box::new(Expr::FieldAccess {
                obj: Box::new(Expr::ident("v")),
                field: "Tint".into(),
            }),
            field: "r".into(),
        };
        if let Expr::FieldAccess { field, .. } = &e {
            assert_eq!(field, "r");
        } else {
            panic!("expected FieldAccess");
        }
    }

    #[test]
    fn literal_equality() {
        assert_eq!(Literal::U32(255), Literal::U32(255));
        assert_ne!(Literal::I32(1), Literal::I32(2));
    }
}
