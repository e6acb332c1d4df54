//! Integration tests for the shader DSL parser.

use shadec_parser::ast::{ExprKind, Lit, StmtKind};
use shadec_parser::parse;

const SPRITE: &str = r#"
pub shader Sprite {
    transform: Mat4,
    tex: Texture2D,

    #[repr(C)]
    struct ShadeInput {
        Pos: Vec4,
        TexCoord: Vec2,
        Tint: RGBA,
    }

    fn to_colour(col: u32) -> RGBA {
        return vec4(col >> 24u, (col >> 16u) & 255u, (col >> 8u) & 255u, col & 255u) / 255.0;
    }

    fn Vertex(pos: Vec2, tc: Vec2, col: u32) -> ShadeInput {
        return ShadeInput(transform * vec4(pos, 0.0, 1.0), tc, to_colour(col));
    }

    fn Fragment(v: ShadeInput) -> RGBA {
        let texel = sample(tex, v.TexCoord);
        if (texel.a < 0.5) {
            discard();
        }
        return vec4(v.Tint.r * texel.r, v.Tint.g * texel.g, v.Tint.b * texel.b, texel.a);
    }
}
"#;

#[test]
fn parse_sprite_shader() {
    let file = parse(SPRITE).expect("sprite shader should parse");
    assert_eq!(file.shaders.len(), 1);

    let shader = &file.shaders[0];
    assert_eq!(shader.name, "Sprite");
    assert!(shader.is_pub);

    // Uniform fields in declaration order.
    let names: Vec<_> = shader.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["transform", "tex"]);

    // Nested struct with its attribute.
    assert_eq!(shader.structs.len(), 1);
    assert!(shader.structs[0].is_repr_c());

    // Methods in declaration order.
    let names: Vec<_> = shader.methods.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["to_colour", "Vertex", "Fragment"]);
}

#[test]
fn spans_resolve_to_lines() {
    let file = parse(SPRITE).unwrap();
    let shader = &file.shaders[0];
    // `transform` is declared on line 3 of the source above.
    assert_eq!(shader.fields[0].span.location(SPRITE).line, 3);
    // Fields are ordered by span.
    assert!(shader.fields[0].span.start < shader.fields[1].span.start);
}

#[test]
fn multiple_shaders_in_one_file() {
    let file = parse(
        r#"
        pub shader A {
            fn Vertex(p: Vec3) -> Vec4 { return Vec4(p.x, p.y, p.z, 1.0); }
            fn Fragment() -> RGBA { return rgba(1.0, 1.0, 1.0, 1.0); }
        }
        pub shader B {
            fn Vertex(p: Vec3) -> Vec4 { return Vec4(p.x, p.y, p.z, 1.0); }
            fn Fragment() -> RGBA { return rgba(0.0, 0.0, 0.0, 1.0); }
        }
        "#,
    )
    .expect("both shaders should parse");
    assert_eq!(file.shaders.len(), 2);
    assert_eq!(file.shaders[0].name, "A");
    assert_eq!(file.shaders[1].name, "B");
}

#[test]
fn let_with_annotation() {
    let file = parse(
        "pub shader S { fn Vertex() -> Vec4 { let p: Vec4 = base; return p; } fn Fragment() -> RGBA { return c; } }",
    )
    .unwrap();
    let StmtKind::Let { name, ty, init } = &file.shaders[0].methods[0].body.stmts[0].kind else {
        panic!("expected let");
    };
    assert_eq!(name, "p");
    assert_eq!(ty.as_ref().unwrap().name, "Vec4");
    assert!(init.is_some());
}

#[test]
fn f64_suffix_reaches_ast() {
    // The parser accepts the literal; the IR builder rejects it later.
    let file = parse(
        "pub shader S { fn Vertex() -> Vec4 { return f(1.5f64); } fn Fragment() -> RGBA { return c; } }",
    )
    .unwrap();
    let StmtKind::Return(Some(expr)) = &file.shaders[0].methods[0].body.stmts[0].kind else {
        panic!("expected return");
    };
    let ExprKind::Call { args, .. } = &expr.kind else {
        panic!("expected call");
    };
    assert!(matches!(args[0].kind, ExprKind::Lit(Lit::F64(_))));
}

#[test]
fn garbage_is_rejected() {
    assert!(parse("this is not a shader @@@ {{{").is_err());
    assert!(parse("pub shader {").is_err());
    assert!(parse("pub shader S { fn Vertex( {} }").is_err());
}

#[test]
fn empty_file_is_ok() {
    let file = parse("").expect("empty input parses to an empty file");
    assert!(file.shaders.is_empty());
}
