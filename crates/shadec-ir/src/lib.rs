//! Shadec intermediate representation.
//!
//! The typed statement/expression tree that sits between shader-definition
//! analysis and GLSL text emission, together with the value-type model and
//! the shared diagnostic list every pipeline stage appends to.

mod diag;
mod display;
mod expr;
mod func;
mod stmt;
mod types;
mod writer;

pub use diag::{Diagnostic, Diagnostics, Location, Severity, Span};
pub use display::{dump_program, dump_shader};
pub use expr::{Expr, IntrinsicOp, Literal, Op};
pub use func::{Function, Program, Shader};
pub use stmt::{Block, Statement};
pub use types::{CustomStruct, NamedValue, ValueType};
pub use writer::SrcWriter;
