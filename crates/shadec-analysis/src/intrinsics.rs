//! The fixed table of intrinsic shader functions.
//!
//! These are the only free functions shader code may call besides helpers
//! defined on the same shader. Each maps 1:1 onto a GLSL builtin of the
//! same name, except for `sample`, `rgba`, and `discard`, which the IR
//! builder turns into dedicated intrinsic nodes.

use shadec_ir::ValueType;

/// How an intrinsic's return type is derived during inference.
#[derive(Clone, Debug, PartialEq)]
pub enum RetRule {
    /// Always the given type.
    Fixed(ValueType),
    /// The type of the first argument (component-wise functions).
    FirstArg,
}

/// An entry in the intrinsic table.
#[derive(Clone, Debug)]
pub struct Intrinsic {
    pub name: &'static str,
    pub ret: RetRule,
}

const fn fixed(name: &'static str, ty: ValueType) -> Intrinsic {
    Intrinsic {
        name,
        ret: RetRule::Fixed(ty),
    }
}

const fn first_arg(name: &'static str) -> Intrinsic {
    Intrinsic {
        name,
        ret: RetRule::FirstArg,
    }
}

/// The intrinsic function table.
pub const INTRINSICS: &[Intrinsic] = &[
    // Constructors
    fixed("vec2", ValueType::Vec2),
    fixed("vec3", ValueType::Vec3),
    fixed("vec4", ValueType::Vec4),
    fixed("rgba", ValueType::Rgba),
    // Texturing
    fixed("sample", ValueType::Rgba),
    // Linear algebra
    fixed("dot", ValueType::Float),
    fixed("length", ValueType::Float),
    first_arg("normalize"),
    // Component-wise math
    first_arg("sqrt"),
    first_arg("pow"),
    first_arg("abs"),
    first_arg("floor"),
    first_arg("fract"),
    first_arg("min"),
    first_arg("max"),
    first_arg("clamp"),
    first_arg("mix"),
    // Trigonometry
    first_arg("sin"),
    first_arg("cos"),
    first_arg("tan"),
    first_arg("asin"),
    first_arg("acos"),
    first_arg("atan"),
    // Fragment-only control flow
    fixed("discard", ValueType::Void),
];

/// Looks up an intrinsic by name.
pub fn lookup(name: &str) -> Option<&'static Intrinsic> {
    INTRINSICS.iter().find(|i| i.name == name)
}
