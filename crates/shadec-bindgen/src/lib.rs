//! CPU-side binding codegen.
//!
//! Consumes a validated [`ShaderProgram`] plus the two emitted GLSL blobs
//! and produces the binding descriptor the host needs to drive the shader:
//! the vertex attribute layout (which must match the GLSL
//! `layout(location=n)` declarations byte-for-byte), the ordered uniform
//! name list, and generated Rust glue — wire structs with positional
//! constructors, an attribute table, and a `set_shader_vars` function.

mod rustgen;

use shadec_analysis::ShaderProgram;
use shadec_ir::{Diagnostics, ValueType};

/// Scalar component type of a vertex attribute.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AttribScalar {
    F32,
    U32,
}

/// One entry of the vertex attribute layout.
///
/// Order and component layout must exactly match the byte layout the host
/// serialiser writes into vertex buffers; the GLSL locations were derived
/// from the same order, so a mismatch corrupts geometry silently instead
/// of erroring.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VertexAttribute {
    pub name: String,
    pub components: u32,
    pub scalar: AttribScalar,
}

/// The structured output of binding codegen.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BindingDescriptor {
    /// Rust spelling of the wire vertex type (an existing type for a
    /// single input, a synthesised `VertexData` otherwise).
    pub vertex_type: String,
    /// Rust spelling of the uniform bundle (an existing type for a
    /// single global, a synthesised `Vars` otherwise).
    pub vars_type: String,
    /// Attribute layout in declaration order.
    pub attributes: Vec<VertexAttribute>,
    /// Uniform names in the fixed global order, struct uniforms flattened
    /// to one `outer.field` entry per leaf. The host resolves locations
    /// for these names once, then the generated setter indexes the
    /// resulting array positionally.
    pub var_names: Vec<String>,
    /// Texture uniforms with their assigned texture units, in increasing
    /// order of appearance.
    pub texture_units: Vec<(String, u32)>,
}

/// Everything binding codegen produces for one shader.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CodegenOutput {
    pub bindings: BindingDescriptor,
    /// Generated Rust glue source (wire types, tables, setter).
    pub rust_src: String,
    pub vertex_src: String,
    pub fragment_src: String,
}

/// Uniform-upload interface the generated glue targets.
///
/// Implemented by the host's GL wrapper; `Texture` is its texture handle
/// type. Locations are the host's one-time lookups of the generated
/// `VAR_NAMES`, in order.
pub trait UniformSetter {
    type Texture;

    fn set_f32(&mut self, location: i32, value: f32);
    fn set_u32(&mut self, location: i32, value: u32);
    fn set_vec2(&mut self, location: i32, value: pod::Vec2);
    fn set_vec3(&mut self, location: i32, value: pod::Vec3);
    fn set_vec4(&mut self, location: i32, value: pod::Vec4);
    fn set_mat4(&mut self, location: i32, value: pod::Mat4);
    fn set_rgba(&mut self, location: i32, value: pod::RGBA);
    fn set_texture(&mut self, location: i32, unit: u32, texture: &Self::Texture);
}

pub mod pod {
    //! Plain byte-layout aliases used by generated wire types.

    pub type Vec2 = [f32; 2];
    pub type Vec3 = [f32; 3];
    pub type Vec4 = [f32; 4];
    pub type Mat4 = [f32; 16];
    pub type RGBA = [f32; 4];
}

/// Component count and scalar type for a vertex attribute, from the fixed
/// table. `None` for types that cannot be vertex data.
pub fn attrib_info(ty: &ValueType) -> Option<(u32, AttribScalar)> {
    match ty {
        ValueType::Float => Some((1, AttribScalar::F32)),
        ValueType::Vec2 => Some((2, AttribScalar::F32)),
        ValueType::Vec3 => Some((3, AttribScalar::F32)),
        ValueType::Vec4 | ValueType::Rgba => Some((4, AttribScalar::F32)),
        ValueType::Uint => Some((1, AttribScalar::U32)),
        ValueType::Mat4 => Some((16, AttribScalar::F32)),
        ValueType::Texture2D | ValueType::Void | ValueType::Custom(_) => None,
    }
}

/// Generates the binding descriptor and Rust glue for a compiled shader.
///
/// Returns `None` when the diagnostic list holds any error: the
/// descriptor must only ever be derived from a fully valid program and
/// GLSL pair.
pub fn generate(
    program: &ShaderProgram,
    vertex_src: &str,
    fragment_src: &str,
    diags: &mut Diagnostics,
) -> Option<CodegenOutput> {
    if diags.has_errors() {
        return None;
    }

    let attributes = build_attributes(program, diags);
    if diags.has_errors() {
        return None;
    }
    let var_names = build_var_names(program);
    let texture_units = build_texture_units(program);
    Some(rustgen::generate(
        program,
        vertex_src,
        fragment_src,
        attributes,
        var_names,
        texture_units,
    ))
}

fn build_attributes(program: &ShaderProgram, diags: &mut Diagnostics) -> Vec<VertexAttribute> {
    let mut attributes = Vec::new();
    for input in &program.vertex.inputs {
        match &input.ty {
            // A struct input was flattened to one GLSL attribute per
            // field; the CPU table must match that layout exactly.
            ValueType::Custom(cs) => {
                for field in &cs.fields {
                    let (components, scalar) = match attrib_info(&field.ty) {
                        Some(info) => info,
                        None => {
                            diags.error("Can't pass custom structs as vertex data", input.span);
                            (1, AttribScalar::F32)
                        }
                    };
                    attributes.push(VertexAttribute {
                        name: format!("{}_{}", input.name, field.name),
                        components,
                        scalar,
                    });
                }
            }
            other => {
                let (components, scalar) = match attrib_info(other) {
                    Some(info) => info,
                    None => {
                        // Unreachable for analyzed programs; the analyzer
                        // rejects textures and friends as vertex input.
                        diags.error("Can't pass textures as vertex data", input.span);
                        (1, AttribScalar::F32)
                    }
                };
                attributes.push(VertexAttribute {
                    name: input.name.clone(),
                    components,
                    scalar,
                });
            }
        }
    }
    attributes
}

fn build_var_names(program: &ShaderProgram) -> Vec<String> {
    let mut names = Vec::new();
    for global in &program.globals {
        flatten_var_names(&global.name, &global.ty, &mut names);
    }
    names
}

/// GLSL resolves struct uniform locations member by member
/// (`"light.color"`), so the name list carries one entry per leaf.
fn flatten_var_names(prefix: &str, ty: &ValueType, out: &mut Vec<String>) {
    match ty {
        ValueType::Custom(cs) => {
            for field in &cs.fields {
                flatten_var_names(&format!("{prefix}.{}", field.name), &field.ty, out);
            }
        }
        _ => out.push(prefix.to_string()),
    }
}

fn build_texture_units(program: &ShaderProgram) -> Vec<(String, u32)> {
    let mut units = Vec::new();
    for global in &program.globals {
        if global.ty == ValueType::Texture2D {
            let unit = units.len() as u32;
            units.push((global.name.clone(), unit));
        }
    }
    units
}
