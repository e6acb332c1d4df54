//! GLSL 330-core emitter.
//!
//! Walks the lowered IR and prints one source blob per stage. The output
//! is handed verbatim to the GPU shader compiler downstream, so the
//! emitter refuses to run at all once any diagnostic error is on record:
//! placeholder `Error` nodes must never leak into shader text.

mod emit;

use shadec_ir::{Diagnostics, Program};

/// The two emitted stage sources.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GlslOutput {
    pub vertex: String,
    pub fragment: String,
}

/// Emits GLSL for both stages of a lowered program.
///
/// Returns `None` when the diagnostic list holds any error: IR produced
/// alongside errors contains placeholder nodes, and emitting it would
/// yield plausible-looking but wrong shader text.
pub fn emit(program: &Program, diags: &Diagnostics) -> Option<GlslOutput> {
    if diags.has_errors() {
        return None;
    }
    Some(GlslOutput {
        vertex: emit::emit_stage(program, emit::Mode::VertexEntry),
        fragment: emit::emit_stage(program, emit::Mode::FragmentEntry),
    })
}
