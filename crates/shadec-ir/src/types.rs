//! The value-type model shared by every stage of the pipeline.

use std::sync::Arc;

use crate::diag::Span;

/// A value type representable in shader code.
///
/// This is a closed set: a host type either maps onto one of these through
/// the type catalog or it cannot appear in a shader at all.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ValueType {
    /// 32-bit float.
    Float,
    /// 2-component float vector.
    Vec2,
    /// 3-component float vector.
    Vec3,
    /// 4-component float vector.
    Vec4,
    /// 32-bit unsigned integer.
    Uint,
    /// 4x4 float matrix.
    Mat4,
    /// 4-component color, emitted as `vec4`.
    Rgba,
    /// 2D texture handle.
    Texture2D,
    /// No value; the return type of side-effect-only helpers.
    Void,
    /// A user-defined plain-data struct.
    Custom(Arc<CustomStruct>),
}

impl ValueType {
    /// Returns `true` if values of this type may be copied byte-for-byte
    /// into a GPU buffer.
    ///
    /// A custom struct qualifies only if it is declared `#[repr(C)]` and
    /// every field type qualifies recursively; texture handles never do.
    pub fn is_transferable(&self) -> bool {
        match self {
            Self::Texture2D | Self::Void => false,
            Self::Custom(cs) => cs.repr_c && cs.fields.iter().all(|f| f.ty.is_transferable()),
            _ => true,
        }
    }

    /// The custom struct behind this type, if any.
    pub fn as_custom(&self) -> Option<&Arc<CustomStruct>> {
        match self {
            Self::Custom(cs) => Some(cs),
            _ => None,
        }
    }
}

/// A user-defined struct usable from shader code.
///
/// Registered once per fully-qualified name in the type catalog; later
/// lookups return the same description, so field order and transferability
/// can never diverge between uses.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CustomStruct {
    /// Short name as written in the source.
    pub name: String,
    /// Fully-qualified name (`Shader::Struct`), the deduplication key.
    pub full_name: String,
    /// Whether the struct is declared `#[repr(C)]`.
    pub repr_c: bool,
    /// Ordered fields.
    pub fields: Vec<NamedValue>,
    /// Declaration site, for diagnostics.
    pub span: Span,
}

impl CustomStruct {
    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&NamedValue> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A (name, type) pair: function parameters, return slots, struct fields,
/// and shader globals once ordering is fixed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NamedValue {
    pub name: String,
    pub ty: ValueType,
}

impl NamedValue {
    pub fn new(name: impl Into<String>, ty: ValueType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}
