#![no_main]

use libfuzzer_sys::fuzz_target;

use shadec_analysis::TypeCatalog;
use shadec_ir::Diagnostics;

fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };
    // The full parse + analyze + lower + emit pipeline should never
    // panic on any parseable input.
    let Ok(file) = shadec_parser::parse(source) else {
        return;
    };
    let mut catalog = TypeCatalog::new();
    for shader in &file.shaders {
        let mut diags = Diagnostics::new();
        let Some(program) = shadec_analysis::analyze(shader, &mut catalog, &mut diags) else {
            continue;
        };
        let lowered = shadec_analysis::lower(shader, &program, &catalog, &mut diags);
        if let Some(glsl) = shadec_glsl::emit(&lowered, &diags) {
            let _ = shadec_bindgen::generate(&program, &glsl.vertex, &glsl.fragment, &mut diags);
        }
    }
});
