//! The type catalog: DSL type names → shader value types.
//!
//! Built-in names resolve through a fixed table. Custom structs are
//! registered on first use, keyed by fully-qualified name, and later
//! lookups return the cached description — so identical structs can never
//! produce divergent field orders or transferability flags within one
//! compilation run. The catalog is not synchronised; batch callers that
//! compile shaders in parallel must either pre-populate it serially or
//! guard it themselves.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use shadec_ir::{CustomStruct, Diagnostics, NamedValue, Span, ValueType};
use shadec_parser::ast;

/// Name-resolution scope for one shader definition: its name (used to
/// qualify nested structs) and the structs declared in its body.
pub struct StructScope<'a> {
    owner: &'a str,
    defs: HashMap<&'a str, &'a ast::StructDef>,
}

impl<'a> StructScope<'a> {
    pub fn new(owner: &'a str, structs: &'a [ast::StructDef]) -> Self {
        Self {
            owner,
            defs: structs.iter().map(|s| (s.name.as_str(), s)).collect(),
        }
    }

    /// The fully-qualified name of a struct declared in this scope.
    pub fn qualify(&self, name: &str) -> String {
        format!("{}::{}", self.owner, name)
    }

    fn get(&self, name: &str) -> Option<&'a ast::StructDef> {
        self.defs.get(name).copied()
    }
}

/// Registry mapping type names to shader value types.
#[derive(Debug, Default)]
pub struct TypeCatalog {
    structs: HashMap<String, Arc<CustomStruct>>,
    in_progress: HashSet<String>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The fixed built-in table.
    pub fn builtin(name: &str) -> Option<ValueType> {
        match name {
            "f32" => Some(ValueType::Float),
            "u32" => Some(ValueType::Uint),
            "Vec2" => Some(ValueType::Vec2),
            "Vec3" => Some(ValueType::Vec3),
            "Vec4" => Some(ValueType::Vec4),
            "Mat4" => Some(ValueType::Mat4),
            "RGBA" => Some(ValueType::Rgba),
            "Texture2D" => Some(ValueType::Texture2D),
            _ => None,
        }
    }

    /// Non-erroring lookup: a built-in, or a custom struct already
    /// registered under the scope's qualified name.
    pub fn lookup(&self, scope: &StructScope<'_>, name: &str) -> Option<ValueType> {
        Self::builtin(name).or_else(|| {
            self.structs
                .get(&scope.qualify(name))
                .map(|cs| ValueType::Custom(cs.clone()))
        })
    }

    /// A registered struct by fully-qualified name.
    pub fn registered(&self, full_name: &str) -> Option<&Arc<CustomStruct>> {
        self.structs.get(full_name)
    }

    /// Resolves a type name, registering it as a custom struct if the
    /// scope declares one. Records a diagnostic and returns `None` for
    /// anything else.
    pub fn resolve(
        &mut self,
        name: &str,
        span: Span,
        scope: &StructScope<'_>,
        diags: &mut Diagnostics,
    ) -> Option<ValueType> {
        if let Some(ty) = Self::builtin(name) {
            return Some(ty);
        }
        if let Some(def) = scope.get(name) {
            return self
                .register_struct(def, scope, diags)
                .map(ValueType::Custom);
        }
        if let Some(cs) = self.structs.get(&scope.qualify(name)) {
            return Some(ValueType::Custom(cs.clone()));
        }
        diags.error(format!("Type '{name}' is not supported in shaders"), span);
        None
    }

    /// Registers a struct definition as a [`CustomStruct`].
    ///
    /// Idempotent: a second registration under the same fully-qualified
    /// name returns the cached description. Field types resolve through
    /// the catalog, recursively registering nested structs; a struct that
    /// (transitively) contains itself is an error rather than a loop.
    pub fn register_struct(
        &mut self,
        def: &ast::StructDef,
        scope: &StructScope<'_>,
        diags: &mut Diagnostics,
    ) -> Option<Arc<CustomStruct>> {
        let full_name = scope.qualify(&def.name);
        if let Some(cs) = self.structs.get(&full_name) {
            return Some(cs.clone());
        }
        if !self.in_progress.insert(full_name.clone()) {
            diags.error(
                format!("Shader struct '{}' cannot contain itself", def.name),
                def.span,
            );
            return None;
        }

        let mut fields = Vec::new();
        for field in &def.fields {
            if field.is_static {
                diags.error("Shader struct may not contain static members", field.span);
            }
            if let Some(ty) = self.resolve(&field.ty.name, field.ty.span, scope, diags) {
                fields.push(NamedValue::new(field.name.clone(), ty));
            }
        }
        if def.has_methods {
            diags.error("Only simple structs are permitted in shaders", def.span);
        }
        self.in_progress.remove(&full_name);

        let cs = Arc::new(CustomStruct {
            name: def.name.clone(),
            full_name: full_name.clone(),
            repr_c: def.is_repr_c(),
            fields,
            span: def.span,
        });
        self.structs.insert(full_name, cs.clone());
        Some(cs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shader_structs(source: &str) -> (String, Vec<ast::StructDef>) {
        let file = shadec_parser::parse(source).expect("should parse");
        let shader = file.shaders.into_iter().next().unwrap();
        (shader.name, shader.structs)
    }

    #[test]
    fn builtin_table() {
        assert_eq!(TypeCatalog::builtin("f32"), Some(ValueType::Float));
        assert_eq!(TypeCatalog::builtin("u32"), Some(ValueType::Uint));
        assert_eq!(TypeCatalog::builtin("Mat4"), Some(ValueType::Mat4));
        assert_eq!(TypeCatalog::builtin("RGBA"), Some(ValueType::Rgba));
        assert_eq!(TypeCatalog::builtin("Texture2D"), Some(ValueType::Texture2D));
        assert_eq!(TypeCatalog::builtin("double"), None);
    }

    #[test]
    fn register_repr_c_struct() {
        let (owner, structs) = shader_structs(
            "pub shader S { #[repr(C)] struct V { Pos: Vec4, Tint: RGBA, } fn Vertex() -> Vec4 { return p; } fn Fragment() -> RGBA { return c; } }",
        );
        let scope = StructScope::new(&owner, &structs);
        let mut catalog = TypeCatalog::new();
        let mut diags = Diagnostics::new();
        let cs = catalog
            .register_struct(&structs[0], &scope, &mut diags)
            .unwrap();
        assert!(!diags.has_errors());
        assert_eq!(cs.full_name, "S::V");
        assert!(cs.repr_c);
        assert_eq!(cs.fields.len(), 2);
        assert_eq!(cs.fields[0].name, "Pos");
        assert_eq!(cs.fields[0].ty, ValueType::Vec4);
    }

    #[test]
    fn registration_is_idempotent() {
        let (owner, structs) = shader_structs(
            "pub shader S { struct V { a: f32, b: Vec2, } fn Vertex() -> Vec4 { return p; } fn Fragment() -> RGBA { return c; } }",
        );
        let scope = StructScope::new(&owner, &structs);
        let mut catalog = TypeCatalog::new();
        let mut diags = Diagnostics::new();
        let first = catalog
            .register_struct(&structs[0], &scope, &mut diags)
            .unwrap();
        let second = catalog
            .register_struct(&structs[0], &scope, &mut diags)
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.fields, second.fields);
    }

    #[test]
    fn nested_struct_registers_recursively() {
        let (owner, structs) = shader_structs(
            "pub shader S { struct Outer { inner: Inner, } struct Inner { x: f32, } fn Vertex() -> Vec4 { return p; } fn Fragment() -> RGBA { return c; } }",
        );
        let scope = StructScope::new(&owner, &structs);
        let mut catalog = TypeCatalog::new();
        let mut diags = Diagnostics::new();
        let outer = catalog
            .register_struct(&structs[0], &scope, &mut diags)
            .unwrap();
        assert!(!diags.has_errors());
        let inner = outer.fields[0].ty.as_custom().expect("inner is custom");
        assert_eq!(inner.full_name, "S::Inner");
        assert!(catalog.registered("S::Inner").is_some());
    }

    #[test]
    fn self_referential_struct_is_an_error() {
        let (owner, structs) = shader_structs(
            "pub shader S { struct T { next: T, } fn Vertex() -> Vec4 { return p; } fn Fragment() -> RGBA { return c; } }",
        );
        let scope = StructScope::new(&owner, &structs);
        let mut catalog = TypeCatalog::new();
        let mut diags = Diagnostics::new();
        catalog.register_struct(&structs[0], &scope, &mut diags);
        assert!(diags.has_errors());
        assert!(diags.iter().any(|d| d.message.contains("contain itself")));
    }

    #[test]
    fn struct_with_methods_is_rejected() {
        let (owner, structs) = shader_structs(
            "pub shader S { struct T { x: f32, fn f() -> f32 { return x; } } fn Vertex() -> Vec4 { return p; } fn Fragment() -> RGBA { return c; } }",
        );
        let scope = StructScope::new(&owner, &structs);
        let mut catalog = TypeCatalog::new();
        let mut diags = Diagnostics::new();
        catalog.register_struct(&structs[0], &scope, &mut diags);
        assert!(diags
            .iter()
            .any(|d| d.message == "Only simple structs are permitted in shaders"));
    }

    #[test]
    fn static_struct_member_is_rejected() {
        let (owner, structs) = shader_structs(
            "pub shader S { struct T { static x: f32, } fn Vertex() -> Vec4 { return p; } fn Fragment() -> RGBA { return c; } }",
        );
        let scope = StructScope::new(&owner, &structs);
        let mut catalog = TypeCatalog::new();
        let mut diags = Diagnostics::new();
        catalog.register_struct(&structs[0], &scope, &mut diags);
        assert!(diags
            .iter()
            .any(|d| d.message == "Shader struct may not contain static members"));
    }

    #[test]
    fn unknown_type_is_reported_once() {
        let (owner, structs) = shader_structs(
            "pub shader S { struct T { x: Quaternion, } fn Vertex() -> Vec4 { return p; } fn Fragment() -> RGBA { return c; } }",
        );
        let scope = StructScope::new(&owner, &structs);
        let mut catalog = TypeCatalog::new();
        let mut diags = Diagnostics::new();
        catalog.register_struct(&structs[0], &scope, &mut diags);
        assert_eq!(diags.error_count(), 1);
        assert!(diags
            .iter()
            .any(|d| d.message == "Type 'Quaternion' is not supported in shaders"));
    }
}
