//! Functions, per-stage shaders, and the compiled program pair.

use std::sync::Arc;

use crate::stmt::Block;
use crate::types::{CustomStruct, NamedValue, ValueType};

/// A lowered function: an entry point or a helper.
#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    pub name: String,
    pub return_type: ValueType,
    /// Formal parameters in declaration order.
    pub args: Vec<NamedValue>,
    pub body: Block,
}

/// Everything needed to emit one GLSL stage.
#[derive(Clone, Debug, PartialEq)]
pub struct Shader {
    /// Uniform globals in the fixed declaration order.
    pub globals: Vec<NamedValue>,
    /// Custom structs referenced by this stage.
    pub structs: Vec<Arc<CustomStruct>>,
    /// Helper functions, ordered so that every callee precedes its
    /// callers in the emitted text.
    pub helpers: Vec<Function>,
    /// The stage entry function (`Vertex` or `Fragment`).
    pub entry: Function,
}

/// A fully lowered shader program: one vertex stage, one fragment stage.
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub vertex: Shader,
    pub fragment: Shader,
}
