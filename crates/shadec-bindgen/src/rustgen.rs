//! Generated Rust glue source.

use std::collections::HashSet;
use std::sync::Arc;

use shadec_analysis::ShaderProgram;
use shadec_ir::{CustomStruct, SrcWriter, ValueType};

use crate::{AttribScalar, BindingDescriptor, CodegenOutput, VertexAttribute};

pub(crate) fn generate(
    program: &ShaderProgram,
    vertex_src: &str,
    fragment_src: &str,
    attributes: Vec<VertexAttribute>,
    var_names: Vec<String>,
    texture_units: Vec<(String, u32)>,
) -> CodegenOutput {
    let inputs = &program.vertex.inputs;
    let globals = &program.globals;
    let has_texture = !texture_units.is_empty();

    let vertex_type = match inputs.len() {
        1 => rust_type_name(&inputs[0].ty),
        _ => "VertexData".to_string(),
    };
    let vars_type = match globals.len() {
        1 => rust_type_name(&globals[0].ty),
        _ => "Vars".to_string(),
    };

    let mut w = SrcWriter::new();
    w.line(&format!(
        "// Generated bindings for the `{}` shader. Do not edit.",
        program.name
    ));
    w.line("#![allow(non_snake_case)]");
    w.blank();
    w.line("use shadec_bindgen::pod::*;");
    w.line("use shadec_bindgen::{AttribScalar, UniformSetter};");
    w.blank();
    w.line(&format!(
        "pub static VERTEX_SOURCE: &str = r#\"{vertex_src}\"#;"
    ));
    w.blank();
    w.line(&format!(
        "pub static FRAGMENT_SOURCE: &str = r#\"{fragment_src}\"#;"
    ));
    w.blank();
    let quoted: Vec<String> = var_names.iter().map(|n| format!("\"{n}\"")).collect();
    w.line(&format!(
        "pub static VAR_NAMES: &[&str] = &[{}];",
        quoted.join(", ")
    ));
    w.blank();

    for cs in referenced_structs(program) {
        write_struct(
            &mut w,
            &cs.name,
            cs.fields
                .iter()
                .map(|f| (f.name.as_str(), rust_type_name(&f.ty))),
        );
    }

    if inputs.len() != 1 {
        write_struct(
            &mut w,
            "VertexData",
            inputs
                .iter()
                .map(|i| (i.name.as_str(), rust_type_name(&i.ty))),
        );
    }

    write_attribute_table(&mut w, &attributes);
    write_vars(&mut w, program, has_texture);

    let bindings = BindingDescriptor {
        vertex_type,
        vars_type,
        attributes,
        var_names,
        texture_units,
    };
    CodegenOutput {
        bindings,
        rust_src: w.finish(),
        vertex_src: vertex_src.to_string(),
        fragment_src: fragment_src.to_string(),
    }
}

/// Custom structs the glue must define in Rust: wire vertex inputs and
/// uniform bundles, each emitted once.
fn referenced_structs(program: &ShaderProgram) -> Vec<Arc<CustomStruct>> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let referenced = program
        .vertex
        .inputs
        .iter()
        .chain(program.globals.iter());
    for arg in referenced {
        collect_structs(&arg.ty, &mut seen, &mut out);
    }
    out
}

fn collect_structs(
    ty: &ValueType,
    seen: &mut HashSet<String>,
    out: &mut Vec<Arc<CustomStruct>>,
) {
    if let ValueType::Custom(cs) = ty {
        if seen.insert(cs.full_name.clone()) {
            out.push(cs.clone());
            for field in &cs.fields {
                collect_structs(&field.ty, seen, out);
            }
        }
    }
}

/// A `#[repr(C)]` struct with a positional constructor.
fn write_struct<'f>(
    w: &mut SrcWriter,
    name: &str,
    fields: impl Iterator<Item = (&'f str, String)> + Clone,
) {
    w.line("#[repr(C)]");
    w.line(&format!("pub struct {name} {{"));
    w.indented(|w| {
        for (field, ty) in fields.clone() {
            w.line(&format!("pub {field}: {ty},"));
        }
    });
    w.line("}");
    w.blank();
    let params: Vec<String> = fields
        .clone()
        .map(|(field, ty)| format!("{field}: {ty}"))
        .collect();
    let names: Vec<String> = fields.map(|(field, _)| field.to_string()).collect();
    w.line(&format!("impl {name} {{"));
    w.indented(|w| {
        w.line(&format!("pub fn new({}) -> Self {{", params.join(", ")));
        w.indented(|w| {
            w.line(&format!("Self {{ {} }}", names.join(", ")));
        });
        w.line("}");
    });
    w.line("}");
    w.blank();
}

fn write_attribute_table(w: &mut SrcWriter, attributes: &[VertexAttribute]) {
    w.line("pub static VERTEX_ATTRIBUTES: &[(&str, u32, AttribScalar)] = &[");
    w.indented(|w| {
        for attr in attributes {
            w.line(&format!(
                "(\"{}\", {}, {}),",
                attr.name,
                attr.components,
                scalar_path(attr.scalar)
            ));
        }
    });
    w.line("];");
    w.blank();
}

fn write_vars(w: &mut SrcWriter, program: &ShaderProgram, has_texture: bool) {
    let globals = &program.globals;

    if globals.len() == 1 {
        let global = &globals[0];
        let param_ty = setter_param_type(&global.ty);
        w.line(&format!(
            "pub fn set_shader_vars<S: UniformSetter>(shader: &mut S, var_locations: &[i32], v: &{param_ty}) {{"
        ));
        let mut index = 0;
        let mut next_unit = 0;
        w.indented(|w| {
            write_set_calls(w, &global.ty, "v", &mut index, &mut next_unit);
        });
        w.line("}");
        return;
    }

    // Multiple (or zero) globals: a synthesised bundle with one field per
    // global, generic over the texture handle when textures are present.
    let (decl, generics, param_ty) = if has_texture {
        ("Vars<T>", "<T>", "Vars<S::Texture>")
    } else {
        ("Vars", "", "Vars")
    };
    w.line(&format!("pub struct {decl} {{"));
    w.indented(|w| {
        for global in globals {
            w.line(&format!(
                "pub {}: {},",
                global.name,
                vars_field_type(&global.ty)
            ));
        }
    });
    w.line("}");
    w.blank();
    w.line(&format!("impl{generics} {decl} {{"));
    w.indented(|w| {
        let params: Vec<String> = globals
            .iter()
            .map(|g| format!("{}: {}", g.name, vars_field_type(&g.ty)))
            .collect();
        let names: Vec<String> = globals.iter().map(|g| g.name.clone()).collect();
        w.line(&format!("pub fn new({}) -> Self {{", params.join(", ")));
        w.indented(|w| {
            w.line(&format!("Self {{ {} }}", names.join(", ")));
        });
        w.line("}");
    });
    w.line("}");
    w.blank();
    w.line(&format!(
        "pub fn set_shader_vars<S: UniformSetter>(shader: &mut S, var_locations: &[i32], v: &{param_ty}) {{"
    ));
    let mut index = 0;
    let mut next_unit = 0;
    w.indented(|w| {
        for global in globals {
            write_set_calls(
                w,
                &global.ty,
                &format!("v.{}", global.name),
                &mut index,
                &mut next_unit,
            );
        }
    });
    w.line("}");
}

/// One `shader.set_*` call per uniform leaf, indexed positionally into
/// the location array resolved from `VAR_NAMES`.
fn write_set_calls(
    w: &mut SrcWriter,
    ty: &ValueType,
    base: &str,
    index: &mut usize,
    next_unit: &mut u32,
) {
    match ty {
        ValueType::Custom(cs) => {
            for field in &cs.fields {
                write_set_calls(w, &field.ty, &format!("{base}.{}", field.name), index, next_unit);
            }
        }
        ValueType::Texture2D => {
            let value = if base == "v" {
                "v".to_string()
            } else {
                format!("&{base}")
            };
            w.line(&format!(
                "shader.set_texture(var_locations[{index}], {next_unit}, {value});"
            ));
            *index += 1;
            *next_unit += 1;
        }
        _ => {
            let value = if base == "v" {
                "*v".to_string()
            } else {
                base.to_string()
            };
            w.line(&format!(
                "shader.{}(var_locations[{index}], {value});",
                set_method(ty)
            ));
            *index += 1;
        }
    }
}

fn set_method(ty: &ValueType) -> &'static str {
    match ty {
        ValueType::Float => "set_f32",
        ValueType::Uint => "set_u32",
        ValueType::Vec2 => "set_vec2",
        ValueType::Vec3 => "set_vec3",
        ValueType::Vec4 => "set_vec4",
        ValueType::Mat4 => "set_mat4",
        ValueType::Rgba => "set_rgba",
        ValueType::Texture2D | ValueType::Void | ValueType::Custom(_) => {
            unreachable!("handled by write_set_calls")
        }
    }
}

fn scalar_path(scalar: AttribScalar) -> &'static str {
    match scalar {
        AttribScalar::F32 => "AttribScalar::F32",
        AttribScalar::U32 => "AttribScalar::U32",
    }
}

/// The Rust spelling of a value type in generated code.
fn rust_type_name(ty: &ValueType) -> String {
    match ty {
        ValueType::Float => "f32".into(),
        ValueType::Uint => "u32".into(),
        ValueType::Vec2 => "Vec2".into(),
        ValueType::Vec3 => "Vec3".into(),
        ValueType::Vec4 => "Vec4".into(),
        ValueType::Mat4 => "Mat4".into(),
        ValueType::Rgba => "RGBA".into(),
        ValueType::Texture2D => "Texture2D".into(),
        ValueType::Void => "()".into(),
        ValueType::Custom(cs) => cs.name.clone(),
    }
}

/// Field type inside the synthesised `Vars` bundle.
fn vars_field_type(ty: &ValueType) -> String {
    match ty {
        ValueType::Texture2D => "T".into(),
        other => rust_type_name(other),
    }
}

/// Parameter type of `set_shader_vars` when a single global collapses the
/// bundle away.
fn setter_param_type(ty: &ValueType) -> String {
    match ty {
        ValueType::Texture2D => "S::Texture".into(),
        other => rust_type_name(other),
    }
}
