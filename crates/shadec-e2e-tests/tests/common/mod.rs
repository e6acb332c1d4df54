use shadec_analysis::TypeCatalog;
use shadec_bindgen::CodegenOutput;
use shadec_ir::Diagnostics;

/// Runs the full pipeline (parse → analyze → lower → emit → bindgen) on
/// the first shader in `source`.
#[allow(dead_code)]
pub fn compile(source: &str) -> Result<CodegenOutput, Diagnostics> {
    let file = shadec_parser::parse(source).expect("source should parse");
    let shader = file.shaders.first().expect("source should contain a shader");

    let mut catalog = TypeCatalog::new();
    let mut diags = Diagnostics::new();
    let Some(program) = shadec_analysis::analyze(shader, &mut catalog, &mut diags) else {
        return Err(diags);
    };
    let lowered = shadec_analysis::lower(shader, &program, &catalog, &mut diags);
    let Some(glsl) = shadec_glsl::emit(&lowered, &diags) else {
        return Err(diags);
    };
    match shadec_bindgen::generate(&program, &glsl.vertex, &glsl.fragment, &mut diags) {
        Some(output) => Ok(output),
        None => Err(diags),
    }
}

/// Compiles a shader expected to succeed.
#[allow(dead_code)]
pub fn compile_ok(source: &str) -> CodegenOutput {
    compile(source).unwrap_or_else(|diags| {
        panic!(
            "compilation failed: {:?}",
            diags.iter().collect::<Vec<_>>()
        )
    })
}

/// Compiles a shader expected to fail and returns its diagnostics.
#[allow(dead_code)]
pub fn compile_err(source: &str) -> Diagnostics {
    match compile(source) {
        Ok(_) => panic!("expected compilation to fail"),
        Err(diags) => diags,
    }
}

/// All error messages from a diagnostics list.
#[allow(dead_code)]
pub fn messages(diags: &Diagnostics) -> Vec<String> {
    diags.iter().map(|d| d.message.clone()).collect()
}
