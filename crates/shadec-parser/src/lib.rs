//! Parser for the shadec shader-definition language.
//!
//! Shaders are written in a small, GPU-shaped DSL: a `shader` block whose
//! fields are uniforms, whose nested structs are GPU value types, and whose
//! methods are the `Vertex`/`Fragment` entry points plus helpers. This
//! crate turns source text into a spanned AST; all semantic validation
//! happens later, in the analyzer and IR builder.

pub mod ast;
mod lex;
mod parse;

pub use lex::{tokenize, Token, TokenKind};

use shadec_ir::Span;

/// Parse a source file into its AST.
pub fn parse(source: &str) -> Result<ast::SourceFile, ParseError> {
    let tokens = tokenize(source)?;
    parse::Parser::new(tokens).source_file()
}

/// Errors produced while lexing or parsing.
///
/// Syntax errors are fail-fast: the later pipeline stages require a
/// well-formed tree, and recovery happens at the granularity of whole
/// shader definitions, not tokens.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("unexpected character '{found}'")]
    UnexpectedChar { found: char, span: Span },

    #[error("unexpected {found}, expected {expected}")]
    Unexpected {
        found: String,
        expected: String,
        span: Span,
    },

    #[error("invalid numeric literal: {reason}")]
    BadLiteral { reason: String, span: Span },
}

impl ParseError {
    /// The source span the error points at.
    pub fn span(&self) -> Span {
        match self {
            Self::UnexpectedChar { span, .. }
            | Self::Unexpected { span, .. }
            | Self::BadLiteral { span, .. } => *span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_shader() {
        let file = parse(
            r#"
            pub shader Basic {
                transform: Mat4,

                fn Vertex(pos: Vec3) -> Vec4 {
                    return Vec4(pos.x, pos.y, pos.z, 1.0) * transform;
                }

                fn Fragment() -> RGBA {
                    return RGBA(1.0, 1.0, 1.0, 1.0);
                }
            }
            "#,
        )
        .expect("shader should parse");
        assert_eq!(file.shaders.len(), 1);
        let shader = &file.shaders[0];
        assert_eq!(shader.name, "Basic");
        assert!(shader.is_pub);
        assert_eq!(shader.fields.len(), 1);
        assert_eq!(shader.methods.len(), 2);
    }

    #[test]
    fn syntax_error_reports_span() {
        let err = parse("pub shader Broken {").unwrap_err();
        assert!(err.span().start > 0);
        assert!(!format!("{err}").is_empty());
    }
}
