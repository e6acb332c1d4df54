//! The program analyzer: shader definition → validated [`ShaderProgram`].
//!
//! Runs the full validation sequence and keeps going past individual
//! failures so every problem in a shader is reported in one pass; the
//! result is withheld whenever any error was recorded.

use std::sync::Arc;

use shadec_ir::{CustomStruct, Diagnostics, Span, ValueType};
use shadec_parser::ast;

use crate::catalog::{StructScope, TypeCatalog};

/// A named, typed slot with its declaration site: a uniform field or a
/// method parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct ArgumentInfo {
    pub name: String,
    pub ty: ValueType,
    pub span: Span,
}

/// A validated shader method: `Vertex`, `Fragment`, or a helper.
#[derive(Clone, Debug, PartialEq)]
pub struct MethodInfo {
    pub name: String,
    pub span: Span,
    /// Parameters in declaration order.
    pub inputs: Vec<ArgumentInfo>,
    pub output: ValueType,
    /// Index of the method in the shader definition's AST, for lowering.
    pub ast_index: usize,
}

/// The analyzer's output: everything later stages need to know about one
/// shader definition. Immutable once constructed.
#[derive(Clone, Debug)]
pub struct ShaderProgram {
    pub name: String,
    pub span: Span,
    /// Uniform globals ordered by source position. This order is
    /// load-bearing: it fixes uniform-location lookup order on the CPU
    /// side and must be reproducible from identical source.
    pub globals: Vec<ArgumentInfo>,
    pub vertex: MethodInfo,
    pub fragment: MethodInfo,
    pub helpers: Vec<MethodInfo>,
    /// Custom structs declared by the shader, in declaration order.
    pub structs: Vec<Arc<CustomStruct>>,
}

/// Analyzes a shader definition against the catalog.
///
/// Returns `None` if any error was recorded during this call; earlier
/// diagnostics on the list do not affect the outcome.
pub fn analyze(
    def: &ast::ShaderDef,
    catalog: &mut TypeCatalog,
    diags: &mut Diagnostics,
) -> Option<ShaderProgram> {
    let errors_before = diags.error_count();
    let scope = StructScope::new(&def.name, &def.structs);
    let mut analyzer = Analyzer {
        def,
        catalog,
        diags,
        scope,
    };
    let program = analyzer.run();
    if analyzer.diags.error_count() > errors_before {
        None
    } else {
        program
    }
}

struct Analyzer<'a> {
    def: &'a ast::ShaderDef,
    catalog: &'a mut TypeCatalog,
    diags: &'a mut Diagnostics,
    scope: StructScope<'a>,
}

impl<'a> Analyzer<'a> {
    fn run(&mut self) -> Option<ShaderProgram> {
        let def = self.def;

        // The generated bindings sit alongside the shader definition, so
        // the definition itself must be visible to them.
        if !def.is_pub {
            self.diags.error(
                format!(
                    "Shader '{}' must be declared `pub` so that generated bindings can extend it",
                    def.name
                ),
                def.span,
            );
        }

        // Instance members only: statics would be ambiguous against the
        // CPU/GPU split.
        for field in &def.fields {
            if field.is_static {
                self.diags
                    .error("Shader members may not be static", field.span);
            }
        }
        for method in &def.methods {
            if method.is_static {
                self.diags
                    .error("Shader members may not be static", method.span);
            }
        }

        // Register every nested struct, in declaration order.
        let mut structs = Vec::new();
        for s in &def.structs {
            if let Some(cs) = self.catalog.register_struct(s, &self.scope, self.diags) {
                structs.push(cs);
            }
        }

        // Every instance field is a uniform global.
        let mut globals = Vec::new();
        for field in &def.fields {
            if let Some(ty) = self
                .catalog
                .resolve(&field.ty.name, field.ty.span, &self.scope, self.diags)
            {
                if self.check_external_type(&ty, field.ty.span) {
                    globals.push(ArgumentInfo {
                        name: field.name.clone(),
                        ty,
                        span: field.span,
                    });
                }
            }
        }
        globals.sort_by_key(|g| g.span.start);

        // Entry points and helpers.
        let mut vertex: Option<MethodInfo> = None;
        let mut fragment: Option<MethodInfo> = None;
        let mut helpers: Vec<MethodInfo> = Vec::new();
        for (index, method) in def.methods.iter().enumerate() {
            match method.name.as_str() {
                "Vertex" => self.unique_method(&mut vertex, index, method),
                "Fragment" => self.unique_method(&mut fragment, index, method),
                _ => {
                    if helpers.iter().any(|h| h.name == method.name) {
                        self.duplicate_error(method);
                    } else {
                        helpers.push(self.method_info(index, method));
                    }
                }
            }
        }

        match &vertex {
            None => self
                .diags
                .error("Shader requires 'Vertex' method", def.span),
            Some(v) => self.check_vertex(v),
        }
        match &fragment {
            None => self
                .diags
                .error("Shader requires 'Fragment' method", def.span),
            Some(f) => self.check_fragment(f, vertex.as_ref()),
        }

        let (vertex, fragment) = (vertex?, fragment?);
        Some(ShaderProgram {
            name: def.name.clone(),
            span: def.span,
            globals,
            vertex,
            fragment,
            helpers,
            structs,
        })
    }

    fn method_info(&mut self, index: usize, method: &ast::MethodDef) -> MethodInfo {
        let mut inputs = Vec::new();
        for param in &method.params {
            if let Some(ty) =
                self.catalog
                    .resolve(&param.ty.name, param.ty.span, &self.scope, self.diags)
            {
                inputs.push(ArgumentInfo {
                    name: param.name.clone(),
                    ty,
                    span: param.span,
                });
            }
            if param.mode == ast::ParamMode::RefMut {
                self.diags
                    .error("Unsupported parameter mode `&mut`", param.span);
            }
        }
        let output = match &method.ret {
            Some(ret) => self
                .catalog
                .resolve(&ret.name, ret.span, &self.scope, self.diags)
                .unwrap_or(ValueType::Void),
            None => ValueType::Void,
        };
        MethodInfo {
            name: method.name.clone(),
            span: method.span,
            inputs,
            output,
            ast_index: index,
        }
    }

    fn unique_method(
        &mut self,
        slot: &mut Option<MethodInfo>,
        index: usize,
        method: &ast::MethodDef,
    ) {
        if slot.is_some() {
            self.duplicate_error(method);
            return;
        }
        *slot = Some(self.method_info(index, method));
    }

    fn duplicate_error(&mut self, method: &ast::MethodDef) {
        self.diags.error(
            format!(
                "Function '{}' can only be defined once, but more than one definition was found",
                method.name
            ),
            method.span,
        );
    }

    fn check_vertex(&mut self, vertex: &MethodInfo) {
        // The emitter needs a position to write to gl_Position.
        let has_pos = vertex.output == ValueType::Vec4
            || vertex
                .output
                .as_custom()
                .is_some_and(|cs| cs.field("Pos").is_some_and(|f| f.ty == ValueType::Vec4));
        if !has_pos {
            self.diags.error(
                "Vertex method must either return Vec4, or a struct with 'Vec4 Pos' field",
                vertex.span,
            );
        }

        // Every vertex input is read from a GPU buffer the CPU fills, so
        // its layout must be byte-exact.
        for input in &vertex.inputs {
            match &input.ty {
                ValueType::Texture2D => {
                    self.diags
                        .error("Can't pass textures as vertex data", input.span);
                }
                ValueType::Custom(cs) => {
                    self.check_external_type(&input.ty, input.span);
                    if cs.fields.iter().any(|f| f.ty.as_custom().is_some()) {
                        self.diags.error(
                            "Nested structs are not supported as vertex input",
                            input.span,
                        );
                    }
                }
                _ => {}
            }
        }
    }

    fn check_fragment(&mut self, fragment: &MethodInfo, vertex: Option<&MethodInfo>) {
        if fragment.output != ValueType::Rgba {
            self.diags
                .error("Fragment method must return RGBA value", fragment.span);
        }
        if fragment.inputs.len() > 1 {
            self.diags.error(
                "Fragment method can take at most one input parameter",
                fragment.span,
            );
        }
        // The stages hand values across by a name/type convention, so a
        // mismatch must be caught here rather than at GLSL link time.
        if let (Some(vertex), Some(input)) = (vertex, fragment.inputs.first()) {
            if input.ty != vertex.output {
                self.diags.error(
                    "Fragment input type must match the Vertex return type",
                    input.span,
                );
            }
        }
    }

    /// Checks that a type can be serialised to a GPU buffer.
    ///
    /// Primitives qualify; a custom struct must be `#[repr(C)]` and all
    /// of its fields must qualify recursively. Without the layout
    /// guarantee the byte copy would silently corrupt data, so this is a
    /// hard compile error.
    fn check_external_type(&mut self, ty: &ValueType, use_span: Span) -> bool {
        let ValueType::Custom(cs) = ty else {
            return true;
        };
        if !cs.repr_c {
            self.diags.error(
                format!(
                    "Shader struct '{}' must be declared #[repr(C)], or it cannot be safely serialised to the GPU",
                    cs.name
                ),
                cs.span,
            );
            return false;
        }
        for field in &cs.fields {
            if let ValueType::Custom(_) = &field.ty {
                if !self.check_external_type(&field.ty, use_span) {
                    return false;
                }
            } else if !field.ty.is_transferable() {
                self.diags.error(
                    format!(
                        "Field '{}' of shader struct '{}' cannot be stored in a GPU buffer",
                        field.name, cs.name
                    ),
                    cs.span,
                );
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze_source(source: &str) -> (Option<ShaderProgram>, Diagnostics) {
        let file = shadec_parser::parse(source).expect("should parse");
        let mut catalog = TypeCatalog::new();
        let mut diags = Diagnostics::new();
        let program = analyze(&file.shaders[0], &mut catalog, &mut diags);
        (program, diags)
    }

    fn analyze_ok(source: &str) -> ShaderProgram {
        let (program, diags) = analyze_source(source);
        assert!(
            !diags.has_errors(),
            "unexpected diagnostics: {:?}",
            diags.iter().collect::<Vec<_>>()
        );
        program.expect("analysis should succeed")
    }

    fn messages(diags: &Diagnostics) -> Vec<String> {
        diags.iter().map(|d| d.message.clone()).collect()
    }

    const VALID: &str = r#"
        pub shader Basic {
            transform: Mat4,

            fn Vertex(pos: Vec3) -> Vec4 {
                return Vec4(pos.x, pos.y, pos.z, 1.0) * transform;
            }

            fn Fragment() -> RGBA {
                return rgba(1.0, 1.0, 1.0, 1.0);
            }
        }
    "#;

    #[test]
    fn valid_shader_analyzes() {
        let program = analyze_ok(VALID);
        assert_eq!(program.name, "Basic");
        assert_eq!(program.globals.len(), 1);
        assert_eq!(program.globals[0].name, "transform");
        assert_eq!(program.globals[0].ty, ValueType::Mat4);
        assert_eq!(program.vertex.inputs.len(), 1);
        assert_eq!(program.fragment.output, ValueType::Rgba);
        assert!(program.helpers.is_empty());
    }

    #[test]
    fn globals_ordered_by_source_position() {
        let program = analyze_ok(
            r#"
            pub shader S {
                first: Mat4,
                second: Vec2,
                third: f32,
                fn Vertex(p: Vec3) -> Vec4 { return Vec4(p.x, p.y, p.z, 1.0); }
                fn Fragment() -> RGBA { return rgba(1.0, 1.0, 1.0, 1.0); }
            }
            "#,
        );
        let names: Vec<_> = program.globals.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["first", "second", "third"]);
    }

    #[test]
    fn missing_vertex_method() {
        let (program, diags) = analyze_source(
            "pub shader S { fn Fragment() -> RGBA { return rgba(1.0, 1.0, 1.0, 1.0); } }",
        );
        assert!(program.is_none());
        assert!(messages(&diags).contains(&"Shader requires 'Vertex' method".into()));
    }

    #[test]
    fn missing_fragment_method() {
        let (program, diags) = analyze_source(
            "pub shader S { fn Vertex(p: Vec3) -> Vec4 { return Vec4(p.x, p.y, p.z, 1.0); } }",
        );
        assert!(program.is_none());
        assert!(messages(&diags).contains(&"Shader requires 'Fragment' method".into()));
    }

    #[test]
    fn duplicate_entry_method() {
        let (program, diags) = analyze_source(
            r#"
            pub shader S {
                fn Vertex(p: Vec3) -> Vec4 { return Vec4(p.x, p.y, p.z, 1.0); }
                fn Vertex(p: Vec2) -> Vec4 { return Vec4(p.x, p.y, 0.0, 1.0); }
                fn Fragment() -> RGBA { return rgba(1.0, 1.0, 1.0, 1.0); }
            }
            "#,
        );
        assert!(program.is_none());
        assert!(messages(&diags).iter().any(|m| m.starts_with(
            "Function 'Vertex' can only be defined once"
        )));
    }

    #[test]
    fn duplicate_helper_method() {
        let (program, _diags) = analyze_source(
            r#"
            pub shader S {
                fn util(x: f32) -> f32 { return x; }
                fn util(x: Vec2) -> Vec2 { return x; }
                fn Vertex(p: Vec3) -> Vec4 { return Vec4(p.x, p.y, p.z, 1.0); }
                fn Fragment() -> RGBA { return rgba(1.0, 1.0, 1.0, 1.0); }
            }
            "#,
        );
        assert!(program.is_none());
    }

    #[test]
    fn wrong_vertex_return_type() {
        let (program, diags) = analyze_source(
            r#"
            pub shader S {
                fn Vertex(p: Vec3) -> Vec3 { return p; }
                fn Fragment() -> RGBA { return rgba(1.0, 1.0, 1.0, 1.0); }
            }
            "#,
        );
        assert!(program.is_none());
        assert!(messages(&diags).contains(
            &"Vertex method must either return Vec4, or a struct with 'Vec4 Pos' field".into()
        ));
    }

    #[test]
    fn struct_return_needs_pos_field() {
        let (program, _) = analyze_source(
            r#"
            pub shader S {
                #[repr(C)]
                struct Out { Colour: Vec4, }
                fn Vertex(p: Vec3) -> Out { return Out(Vec4(p.x, p.y, p.z, 1.0)); }
                fn Fragment(v: Out) -> RGBA { return rgba(1.0, 1.0, 1.0, 1.0); }
            }
            "#,
        );
        assert!(program.is_none());
    }

    #[test]
    fn struct_return_with_pos_field_is_accepted() {
        let program = analyze_ok(
            r#"
            pub shader S {
                #[repr(C)]
                struct Out { Pos: Vec4, Tint: RGBA, }
                fn Vertex(p: Vec3) -> Out { return Out(Vec4(p.x, p.y, p.z, 1.0), rgba(1.0, 1.0, 1.0, 1.0)); }
                fn Fragment(v: Out) -> RGBA { return v.Tint; }
            }
            "#,
        );
        assert!(program.vertex.output.as_custom().is_some());
        assert_eq!(program.structs.len(), 1);
    }

    #[test]
    fn wrong_fragment_return_type() {
        let (program, diags) = analyze_source(
            r#"
            pub shader S {
                fn Vertex(p: Vec3) -> Vec4 { return Vec4(p.x, p.y, p.z, 1.0); }
                fn Fragment() -> Vec4 { return x; }
            }
            "#,
        );
        assert!(program.is_none());
        assert!(messages(&diags).contains(&"Fragment method must return RGBA value".into()));
    }

    #[test]
    fn fragment_input_must_match_vertex_output() {
        let (program, diags) = analyze_source(
            r#"
            pub shader S {
                fn Vertex(p: Vec3) -> Vec4 { return Vec4(p.x, p.y, p.z, 1.0); }
                fn Fragment(v: Vec2) -> RGBA { return rgba(v.x, v.y, 0.0, 1.0); }
            }
            "#,
        );
        assert!(program.is_none());
        assert!(messages(&diags)
            .contains(&"Fragment input type must match the Vertex return type".into()));
    }

    #[test]
    fn static_member_rejected() {
        let (program, diags) = analyze_source(
            r#"
            pub shader S {
                static transform: Mat4,
                fn Vertex(p: Vec3) -> Vec4 { return Vec4(p.x, p.y, p.z, 1.0); }
                fn Fragment() -> RGBA { return rgba(1.0, 1.0, 1.0, 1.0); }
            }
            "#,
        );
        assert!(program.is_none());
        assert!(messages(&diags).contains(&"Shader members may not be static".into()));
    }

    #[test]
    fn non_pub_shader_rejected() {
        let (program, diags) = analyze_source(
            r#"
            shader S {
                fn Vertex(p: Vec3) -> Vec4 { return Vec4(p.x, p.y, p.z, 1.0); }
                fn Fragment() -> RGBA { return rgba(1.0, 1.0, 1.0, 1.0); }
            }
            "#,
        );
        assert!(program.is_none());
        assert!(messages(&diags).iter().any(|m| m.contains("must be declared `pub`")));
    }

    #[test]
    fn mut_ref_parameter_rejected() {
        let (program, diags) = analyze_source(
            r#"
            pub shader S {
                fn Vertex(p: &mut Vec3) -> Vec4 { return Vec4(p.x, p.y, p.z, 1.0); }
                fn Fragment() -> RGBA { return rgba(1.0, 1.0, 1.0, 1.0); }
            }
            "#,
        );
        assert!(program.is_none());
        assert!(messages(&diags).contains(&"Unsupported parameter mode `&mut`".into()));
    }

    #[test]
    fn readonly_ref_parameter_accepted() {
        analyze_ok(
            r#"
            pub shader S {
                fn Vertex(p: &Vec3) -> Vec4 { return Vec4(p.x, p.y, p.z, 1.0); }
                fn Fragment() -> RGBA { return rgba(1.0, 1.0, 1.0, 1.0); }
            }
            "#,
        );
    }

    #[test]
    fn unsupported_uniform_type_single_diagnostic() {
        let (program, diags) = analyze_source(
            r#"
            pub shader S {
                weird: Quaternion,
                fn Vertex(p: Vec3) -> Vec4 { return Vec4(p.x, p.y, p.z, 1.0); }
                fn Fragment() -> RGBA { return rgba(1.0, 1.0, 1.0, 1.0); }
            }
            "#,
        );
        assert!(program.is_none());
        assert_eq!(diags.error_count(), 1);
        assert!(messages(&diags)
            .contains(&"Type 'Quaternion' is not supported in shaders".into()));
    }

    #[test]
    fn texture_as_vertex_input_rejected() {
        let (program, diags) = analyze_source(
            r#"
            pub shader S {
                fn Vertex(t: Texture2D) -> Vec4 { return Vec4(0.0, 0.0, 0.0, 1.0); }
                fn Fragment() -> RGBA { return rgba(1.0, 1.0, 1.0, 1.0); }
            }
            "#,
        );
        assert!(program.is_none());
        assert!(messages(&diags).contains(&"Can't pass textures as vertex data".into()));
    }

    #[test]
    fn non_repr_c_vertex_input_rejected() {
        let (program, diags) = analyze_source(
            r#"
            pub shader S {
                struct V { pos: Vec3, }
                fn Vertex(v: V) -> Vec4 { return Vec4(v.pos.x, v.pos.y, v.pos.z, 1.0); }
                fn Fragment() -> RGBA { return rgba(1.0, 1.0, 1.0, 1.0); }
            }
            "#,
        );
        assert!(program.is_none());
        assert!(messages(&diags)
            .iter()
            .any(|m| m.contains("must be declared #[repr(C)]")));
    }

    #[test]
    fn nested_struct_vertex_input_rejected() {
        let (program, diags) = analyze_source(
            r#"
            pub shader S {
                #[repr(C)]
                struct Inner { x: f32, }
                #[repr(C)]
                struct V { pos: Vec3, extra: Inner, }
                fn Vertex(v: V) -> Vec4 { return Vec4(v.pos.x, v.pos.y, v.pos.z, 1.0); }
                fn Fragment() -> RGBA { return rgba(1.0, 1.0, 1.0, 1.0); }
            }
            "#,
        );
        assert!(program.is_none());
        assert!(
            messages(&diags).contains(&"Nested structs are not supported as vertex input".into())
        );
    }

    #[test]
    fn texture_uniform_is_accepted() {
        let program = analyze_ok(
            r#"
            pub shader S {
                tex: Texture2D,
                fn Vertex(p: Vec3) -> Vec4 { return Vec4(p.x, p.y, p.z, 1.0); }
                fn Fragment() -> RGBA { return sample(tex, vec2(0.0, 0.0)); }
            }
            "#,
        );
        assert_eq!(program.globals[0].ty, ValueType::Texture2D);
    }

    #[test]
    fn struct_uniform_must_be_fully_transferable() {
        let (program, diags) = analyze_source(
            r#"
            pub shader S {
                #[repr(C)]
                struct Material { tint: RGBA, tex: Texture2D, }
                mat: Material,
                fn Vertex(p: Vec3) -> Vec4 { return Vec4(p.x, p.y, p.z, 1.0); }
                fn Fragment() -> RGBA { return rgba(1.0, 1.0, 1.0, 1.0); }
            }
            "#,
        );
        assert!(program.is_none());
        assert!(messages(&diags)
            .iter()
            .any(|m| m.contains("cannot be stored in a GPU buffer")));
    }

    #[test]
    fn all_errors_reported_in_one_pass() {
        let (program, diags) = analyze_source(
            r#"
            shader S {
                static bad: Quaternion,
                fn Vertex(p: Vec3) -> Vec3 { return p; }
            }
            "#,
        );
        assert!(program.is_none());
        // pub, static, unsupported type, vertex return, missing fragment.
        assert!(diags.error_count() >= 4);
    }
}
