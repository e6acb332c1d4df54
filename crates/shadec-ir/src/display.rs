//! Display implementations and a text dump for debugging.

use std::fmt;

use crate::expr::{Expr, IntrinsicOp, Literal, Op};
use crate::func::{Function, Program, Shader};
use crate::stmt::Statement;
use crate::types::ValueType;
use crate::writer::SrcWriter;

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::ShiftLeft => "<<",
            Self::ShiftRight => ">>",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::Equals => "==",
            Self::Not => "!",
            Self::NotEquals => "!=",
            Self::LessThan => "<",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::LessThanOrEqual => "<=",
        })
    }
}

impl fmt::Display for IntrinsicOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TextureSample => "sample",
            Self::RgbaConstruct => "rgba",
            Self::Discard => "discard",
        })
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::F32(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}u"),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float => f.write_str("f32"),
            Self::Vec2 => f.write_str("Vec2"),
            Self::Vec3 => f.write_str("Vec3"),
            Self::Vec4 => f.write_str("Vec4"),
            Self::Uint => f.write_str("u32"),
            Self::Mat4 => f.write_str("Mat4"),
            Self::Rgba => f.write_str("RGBA"),
            Self::Texture2D => f.write_str("Texture2D"),
            Self::Void => f.write_str("void"),
            Self::Custom(cs) => f.write_str(&cs.name),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => f.write_str("<error>"),
            Self::Identifier(name) => f.write_str(name),
            Self::FieldAccess { obj, field } => write!(f, "{obj}.{field}"),
            Self::Assignment { target, value } => write!(f, "{target} = {value}"),
            Self::Construct { ty, args } => {
                write!(f, "{ty}(")?;
                write_list(f, args)?;
                f.write_str(")")
            }
            Self::Invoke { func, args } => {
                write!(f, "{func}(")?;
                write_list(f, args)?;
                f.write_str(")")
            }
            Self::BinOp { left, op, right } => write!(f, "{left} {op} {right}"),
            Self::PrefixOp { op, operand } => write!(f, "{op}{operand}"),
            Self::Paren(inner) => write!(f, "({inner})"),
            Self::Intrinsic(op) => write!(f, "{op}"),
            Self::Literal(lit) => write!(f, "{lit}"),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{arg}")?;
    }
    Ok(())
}

fn dump_statement(w: &mut SrcWriter, stmt: &Statement) {
    match stmt {
        Statement::Error => w.line("<error>;"),
        Statement::DeclareLocal { ty, name, init } => match init {
            Some(init) => w.line(&format!("let {name}: {ty} = {init};")),
            None => w.line(&format!("let {name}: {ty};")),
        },
        Statement::Expression(expr) => w.line(&format!("{expr};")),
        Statement::Return(Some(expr)) => w.line(&format!("return {expr};")),
        Statement::Return(None) => w.line("return;"),
        Statement::Block(stmts) => {
            w.line("{");
            w.indented(|w| {
                for s in stmts {
                    dump_statement(w, s);
                }
            });
            w.line("}");
        }
        Statement::If {
            condition,
            then_branch,
            else_branch,
        } => {
            w.line(&format!("if ({condition})"));
            w.indented(|w| dump_statement(w, then_branch));
            if let Some(else_branch) = else_branch {
                w.line("else");
                w.indented(|w| dump_statement(w, else_branch));
            }
        }
    }
}

fn dump_function(w: &mut SrcWriter, func: &Function) {
    let args = func
        .args
        .iter()
        .map(|a| format!("{}: {}", a.name, a.ty))
        .collect::<Vec<_>>()
        .join(", ");
    w.line(&format!(
        "fn {}({}) -> {} {{",
        func.name, args, func.return_type
    ));
    w.indented(|w| {
        for s in &func.body {
            dump_statement(w, s);
        }
    });
    w.line("}");
}

/// Renders one stage of the IR as text, for `--emit-ir` style debugging.
pub fn dump_shader(shader: &Shader, label: &str) -> String {
    let mut w = SrcWriter::new();
    w.line(&format!("stage {label}:"));
    w.indented(|w| {
        w.line("globals:");
        w.indented(|w| {
            for g in &shader.globals {
                w.line(&format!("{}: {}", g.name, g.ty));
            }
        });
        if !shader.structs.is_empty() {
            w.line("structs:");
            w.indented(|w| {
                for cs in &shader.structs {
                    let fields = cs
                        .fields
                        .iter()
                        .map(|f| format!("{}: {}", f.name, f.ty))
                        .collect::<Vec<_>>()
                        .join(", ");
                    w.line(&format!("struct {} {{ {} }}", cs.name, fields));
                }
            });
        }
        for h in &shader.helpers {
            dump_function(w, h);
        }
        dump_function(w, &shader.entry);
    });
    w.finish()
}

/// Renders a full program (both stages) as text.
pub fn dump_program(program: &Program) -> String {
    let mut out = dump_shader(&program.vertex, "vertex");
    out.push_str(&dump_shader(&program.fragment, "fragment"));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NamedValue;

    #[test]
    fn op_tokens() {
        assert_eq!(format!("{}", Op::ShiftRight), ">>");
        assert_eq!(format!("{}", Op::GreaterThanOrEqual), ">=");
        assert_eq!(format!("{}", Op::BitAnd), "&");
    }

    #[test]
    fn expr_rendering() {
        let e = Expr::binary(
            Expr::ident("a"),
            Op::Multiply,
            Expr::Paren(Box::new(Expr::binary(
                Expr::ident("b"),
                Op::Plus,
                Expr::Literal(Literal::U32(1)),
            ))),
        );
        assert_eq!(format!("{e}"), "a * (b + 1u)");
    }

    #[test]
    fn dump_contains_entry() {
        let shader = Shader {
            globals: vec![NamedValue::new("transform", ValueType::Mat4)],
            structs: vec![],
            helpers: vec![],
            entry: Function {
                name: "Vertex".into(),
                return_type: ValueType::Vec4,
                args: vec![NamedValue::new("pos", ValueType::Vec3)],
                body: vec![Statement::Return(Some(Expr::ident("p")))],
            },
        };
        let dump = dump_shader(&shader, "vertex");
        assert!(dump.contains("stage vertex:"));
        assert!(dump.contains("transform: Mat4"));
        assert!(dump.contains("fn Vertex(pos: Vec3) -> Vec4 {"));
        assert!(dump.contains("return p;"));
    }
}
