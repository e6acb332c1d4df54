//! AST for the shader DSL.
//!
//! Every node carries the span it was parsed from so that analyzer and IR
//! builder diagnostics point at the exact offending source range.

use shadec_ir::Span;

/// A parsed source file: zero or more shader definitions.
#[derive(Clone, Debug, Default)]
pub struct SourceFile {
    pub shaders: Vec<ShaderDef>,
}

/// An attribute, `#[repr(C)]` or `#[program]`.
#[derive(Clone, Debug)]
pub struct Attr {
    pub name: String,
    pub arg: Option<String>,
    pub span: Span,
}

/// A `shader` block.
#[derive(Clone, Debug)]
pub struct ShaderDef {
    pub name: String,
    pub is_pub: bool,
    pub attrs: Vec<Attr>,
    /// Instance fields, i.e. the uniform set, in declaration order.
    pub fields: Vec<FieldDef>,
    /// Nested struct definitions in declaration order.
    pub structs: Vec<StructDef>,
    /// Methods in declaration order (entry points and helpers alike).
    pub methods: Vec<MethodDef>,
    pub span: Span,
}

/// A field declaration, in a shader body or a struct body.
#[derive(Clone, Debug)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeRef,
    pub is_static: bool,
    pub span: Span,
}

/// A nested struct definition.
#[derive(Clone, Debug)]
pub struct StructDef {
    pub name: String,
    pub attrs: Vec<Attr>,
    pub fields: Vec<FieldDef>,
    /// Whether the body contained `fn` items. The grammar accepts them so
    /// the type catalog can reject non-simple structs with a diagnostic.
    pub has_methods: bool,
    pub span: Span,
}

impl StructDef {
    /// Whether the struct is declared `#[repr(C)]`.
    pub fn is_repr_c(&self) -> bool {
        self.attrs
            .iter()
            .any(|a| a.name == "repr" && a.arg.as_deref() == Some("C"))
    }
}

/// Parameter passing mode.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParamMode {
    /// By value.
    Value,
    /// Read-only reference (`&T`), allowed.
    Ref,
    /// Mutable reference (`&mut T`), rejected by the analyzer.
    RefMut,
}

/// A method parameter.
#[derive(Clone, Debug)]
pub struct Param {
    pub name: String,
    pub ty: TypeRef,
    pub mode: ParamMode,
    pub span: Span,
}

/// A method definition.
#[derive(Clone, Debug)]
pub struct MethodDef {
    pub name: String,
    pub is_static: bool,
    pub params: Vec<Param>,
    /// Declared return type; `None` means void.
    pub ret: Option<TypeRef>,
    pub body: Block,
    pub span: Span,
}

/// A reference to a type by name.
#[derive(Clone, Debug)]
pub struct TypeRef {
    pub name: String,
    pub span: Span,
}

/// A `{ ... }` statement block.
#[derive(Clone, Debug)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

/// A statement with its source span.
#[derive(Clone, Debug)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum StmtKind {
    /// `let name[: ty] [= init];`
    Let {
        name: String,
        ty: Option<TypeRef>,
        init: Option<Expr>,
    },
    /// An expression statement.
    Expr(Expr),
    /// `return [expr];`
    Return(Option<Expr>),
    /// `if (cond) stmt [else stmt]`
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    /// A nested block.
    Block(Block),
}

/// An expression with its source span.
#[derive(Clone, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    Lit(Lit),
    Ident(String),
    /// `obj.name`
    Field { obj: Box<Expr>, name: String },
    /// `callee(args)` — plain call or type constructor, resolved later.
    Call { callee: Box<Expr>, args: Vec<Expr> },
    /// `Type { field: expr, ... }` — parsed, rejected during lowering.
    StructLit {
        ty: TypeRef,
        fields: Vec<(String, Expr)>,
    },
    /// `target = value`
    Assign { target: Box<Expr>, value: Box<Expr> },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary { op: UnOp, operand: Box<Expr> },
    Paren(Box<Expr>),
}

/// Literal constants as written in the source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Lit {
    F32(f32),
    /// Explicitly `f64`-suffixed; rejected during lowering.
    F64(f64),
    I32(i32),
    U32(u32),
    Bool(bool),
}

/// Binary operators as written; a superset of what shaders support, so
/// the IR builder can reject the extras with a diagnostic.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
}

/// Prefix operators as written.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnOp {
    Neg,
    Not,
    BitNot,
}
