use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use miette::{Context, IntoDiagnostic};

use shadec_analysis::TypeCatalog;
use shadec_ir::{Diagnostics, Severity};

/// shadec — shader DSL to GLSL compiler
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Input shader definition file
    input: PathBuf,

    /// Output directory (default: alongside the input)
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Dump the lowered IR to stderr before emission
    #[arg(long)]
    emit_ir: bool,

    /// Validate without writing any output
    #[arg(long)]
    dry_run: bool,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();

    // 1. Read the source file.
    let source = std::fs::read_to_string(&cli.input)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read {}", cli.input.display()))?;

    // 2. Parse.
    let file = shadec_parser::parse(&source).map_err(|e| {
        let loc = e.span().location(&source);
        miette::miette!("{}:{loc}: {e}", cli.input.display())
    })?;
    if file.shaders.is_empty() {
        return Err(miette::miette!(
            "{} contains no shader definitions",
            cli.input.display()
        ));
    }

    let out_dir = match &cli.out_dir {
        Some(dir) => dir.clone(),
        None => cli
            .input
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".")),
    };

    // 3. Compile every shader in the file; the catalog is shared so
    // struct registrations stay consistent across shaders, but each
    // shader gets its own diagnostics run.
    let mut catalog = TypeCatalog::new();
    let mut failed = 0usize;
    for shader in &file.shaders {
        let mut diags = Diagnostics::new();
        let output = compile_shader(shader, &mut catalog, &mut diags, cli.emit_ir);

        report(&cli.input, &source, &diags);
        let Some(output) = output else {
            failed += 1;
            continue;
        };

        if cli.dry_run {
            continue;
        }

        // 4. Write <name>.vert, <name>.frag, <name>.rs.
        let stem = snake_case(&shader.name);
        write_output(&out_dir, &format!("{stem}.vert"), &output.vertex_src)?;
        write_output(&out_dir, &format!("{stem}.frag"), &output.fragment_src)?;
        write_output(&out_dir, &format!("{stem}.rs"), &output.rust_src)?;
    }

    if failed > 0 {
        return Err(miette::miette!("{failed} shader(s) failed to compile"));
    }
    Ok(())
}

fn compile_shader(
    shader: &shadec_parser::ast::ShaderDef,
    catalog: &mut TypeCatalog,
    diags: &mut Diagnostics,
    emit_ir: bool,
) -> Option<shadec_bindgen::CodegenOutput> {
    let program = shadec_analysis::analyze(shader, catalog, diags)?;
    let lowered = shadec_analysis::lower(shader, &program, catalog, diags);
    if emit_ir {
        eprintln!("{}", shadec_ir::dump_program(&lowered));
    }
    let glsl = shadec_glsl::emit(&lowered, diags)?;
    shadec_bindgen::generate(&program, &glsl.vertex, &glsl.fragment, diags)
}

fn report(input: &std::path::Path, source: &str, diags: &Diagnostics) {
    for diag in diags.iter() {
        let loc = diag.span.location(source);
        let severity = match diag.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        eprintln!("{}:{loc}: {severity}: {}", input.display(), diag.message);
    }
}

fn write_output(dir: &std::path::Path, name: &str, contents: &str) -> miette::Result<()> {
    let path = dir.join(name);
    std::fs::write(&path, contents)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to write {}", path.display()))
}

/// `SpriteShader` → `sprite_shader`, for output file names.
fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
