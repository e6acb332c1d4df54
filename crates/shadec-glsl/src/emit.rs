//! The stage emitter.

use shadec_ir::{
    Expr, Function, IntrinsicOp, Literal, NamedValue, Program, Shader, SrcWriter, Statement,
    ValueType,
};

/// What the current function is being emitted as.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Mode {
    VertexEntry,
    FragmentEntry,
    SharedFunction,
}

/// Emits one full stage: header, helpers, then `main`.
pub(crate) fn emit_stage(program: &Program, mode: Mode) -> String {
    let shader = match mode {
        Mode::VertexEntry => &program.vertex,
        Mode::FragmentEntry => &program.fragment,
        Mode::SharedFunction => unreachable!("a stage is never emitted as a shared function"),
    };
    let mut writer = SrcWriter::new();
    let mut emitter = Emitter::new(&mut writer, program, &shader.entry, mode);
    emitter.header(shader);
    emitter.helpers(shader);
    emitter.function();
    writer.finish()
}

struct Emitter<'a> {
    w: &'a mut SrcWriter,
    program: &'a Program,
    function: &'a Function,
    mode: Mode,
    output_var: Option<NamedValue>,
}

impl<'a> Emitter<'a> {
    fn new(
        w: &'a mut SrcWriter,
        program: &'a Program,
        function: &'a Function,
        mode: Mode,
    ) -> Self {
        // The vertex output and the fragment input name the same interface
        // variable; the convention is derived from the fragment's sole
        // parameter so the two stages agree without a shared declaration.
        let frag_args = &program.fragment.entry.args;
        let output_var = match mode {
            Mode::VertexEntry => Some(NamedValue::new(
                match frag_args.first() {
                    Some(arg) => format!("_fragment_input_{}", arg.name),
                    None => "_fragment_input".to_string(),
                },
                function.return_type.clone(),
            )),
            Mode::FragmentEntry => Some(NamedValue::new("out_color", ValueType::Rgba)),
            Mode::SharedFunction => None,
        };
        Self {
            w,
            program,
            function,
            mode,
            output_var,
        }
    }

    // -----------------------------------------------------------------
    // Header
    // -----------------------------------------------------------------

    fn header(&mut self, shader: &Shader) {
        self.w.line("#version 330 core");
        // Struct declarations come first: a struct-typed uniform must see
        // its definition.
        for cs in &shader.structs {
            self.w.line(&format!("struct {} {{", cs.name));
            for field in &cs.fields {
                self.w
                    .line(&format!("    {} {};", type_name(&field.ty), field.name));
            }
            self.w.line("};");
            self.w.blank();
        }
        for global in &shader.globals {
            self.w
                .line(&format!("uniform {} {};", type_name(&global.ty), global.name));
        }
        self.w.blank();

        if self.mode == Mode::VertexEntry {
            let mut location = 0;
            for arg in &self.function.args {
                if let ValueType::Custom(cs) = &arg.ty {
                    // GLSL vertex inputs cannot be aggregates; flatten to
                    // one attribute per field.
                    for field in &cs.fields {
                        self.w.line(&format!(
                            "layout(location={location}) in {} _attrib_{}_{};",
                            type_name(&field.ty),
                            arg.name,
                            field.name
                        ));
                        location += 1;
                    }
                } else {
                    self.w.line(&format!(
                        "layout(location={location}) in {} {};",
                        type_name(&arg.ty),
                        arg.name
                    ));
                    location += 1;
                }
            }
        } else {
            for arg in &self.function.args {
                if arg.ty == ValueType::Uint && self.mode == Mode::FragmentEntry {
                    self.w.write("flat ");
                }
                self.w.line(&format!(
                    "in {} _fragment_input_{};",
                    type_name(&arg.ty),
                    arg.name
                ));
            }
        }

        if let Some(output) = &self.output_var {
            if output.ty == ValueType::Uint && self.mode == Mode::VertexEntry {
                self.w.write("flat ");
            }
            self.w
                .line(&format!("out {} {};", type_name(&output.ty), output.name));
        }
    }

    fn helpers(&mut self, shader: &Shader) {
        for helper in &shader.helpers {
            Emitter::new(self.w, self.program, helper, Mode::SharedFunction).function();
        }
    }

    // -----------------------------------------------------------------
    // Functions
    // -----------------------------------------------------------------

    fn function(&mut self) {
        match self.mode {
            Mode::VertexEntry => {
                self.w.line("void main() {");
                self.indented_body(|e| {
                    for arg in &e.function.args {
                        if let ValueType::Custom(cs) = &arg.ty {
                            let parts = cs
                                .fields
                                .iter()
                                .map(|f| format!("_attrib_{}_{}", arg.name, f.name))
                                .collect::<Vec<_>>()
                                .join(", ");
                            e.w.line(&format!(
                                "{} {} = {}({});",
                                cs.name, arg.name, cs.name, parts
                            ));
                        }
                    }
                });
                self.body();
                self.w.line("}");
            }
            Mode::FragmentEntry => {
                self.w.line("void main() {");
                self.indented_body(|e| {
                    for arg in &e.function.args {
                        e.w.line(&format!(
                            "{} {} = _fragment_input_{};",
                            type_name(&arg.ty),
                            arg.name,
                            arg.name
                        ));
                    }
                });
                self.body();
                self.w.line("}");
            }
            Mode::SharedFunction => {
                let params = self
                    .function
                    .args
                    .iter()
                    .map(|a| format!("{} {}", type_name(&a.ty), a.name))
                    .collect::<Vec<_>>()
                    .join(", ");
                self.w.line(&format!(
                    "{} {}({}) {{",
                    type_name(&self.function.return_type),
                    self.function.name,
                    params
                ));
                self.body();
                self.w.line("}");
            }
        }
    }

    fn body(&mut self) {
        let function = self.function;
        self.indented_body(|e| {
            for stmt in &function.body {
                e.statement(stmt);
            }
        });
    }

    fn indented_body(&mut self, f: impl FnOnce(&mut Self)) {
        self.w.indent();
        f(self);
        self.w.dedent();
    }

    // -----------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------

    fn statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Block(stmts) => {
                for s in stmts {
                    self.statement(s);
                }
            }
            Statement::Expression(expr) => {
                self.expr(expr);
                self.w.line(";");
            }
            Statement::DeclareLocal { ty, name, init } => {
                self.w.write(&format!("{} {}", type_name(ty), name));
                match init {
                    Some(init) => {
                        self.w.write(" = ");
                        self.expr(init);
                        self.w.line(";");
                    }
                    None => self.w.line(";"),
                }
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.w.write("if (");
                self.expr(condition);
                self.w.line(") {");
                self.indented_body(|e| e.statement(then_branch));
                self.w.line("}");
                if let Some(else_branch) = else_branch {
                    self.w.line("else {");
                    self.indented_body(|e| e.statement(else_branch));
                    self.w.line("}");
                }
            }
            Statement::Return(value) => self.return_statement(value.as_ref()),
            // Unreachable: emission is gated on an error-free diagnostic
            // list, and Error nodes only exist alongside recorded errors.
            Statement::Error => {}
        }
    }

    fn return_statement(&mut self, value: Option<&Expr>) {
        let Some(value) = value else {
            self.w.line("return;");
            return;
        };
        match self.output_var.clone() {
            Some(output) => {
                // Entry functions return by assigning the stage output;
                // the vertex stage additionally feeds gl_Position.
                self.w.write(&output.name);
                self.w.write(" = ");
                self.expr(value);
                self.w.line(";");
                if self.mode == Mode::VertexEntry {
                    if self.function.return_type == ValueType::Vec4 {
                        self.w.line(&format!("gl_Position = {};", output.name));
                    } else {
                        self.w.line(&format!("gl_Position = {}.Pos;", output.name));
                    }
                }
                self.w.line("return;");
            }
            None => {
                self.w.write("return ");
                self.expr(value);
                self.w.line(";");
            }
        }
    }

    // -----------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Assignment { target, value } => {
                self.expr(target);
                self.w.write(" = ");
                self.expr(value);
            }
            Expr::BinOp { left, op, right } => {
                self.expr(left);
                self.w.write(&format!(" {op} "));
                self.expr(right);
            }
            Expr::PrefixOp { op, operand } => {
                self.w.write(&op.to_string());
                self.expr(operand);
            }
            Expr::FieldAccess { obj, field } => {
                self.expr(obj);
                self.w.write(".");
                self.w.write(field);
            }
            Expr::Construct { ty, args } => {
                self.w.write(type_name(ty).as_ref());
                self.w.write("(");
                self.expr_list(args);
                self.w.write(")");
            }
            Expr::Invoke { func, args } => {
                self.expr(func);
                self.w.write("(");
                self.expr_list(args);
                self.w.write(")");
            }
            Expr::Literal(lit) => self.literal(lit),
            Expr::Identifier(name) => self.w.write(name),
            Expr::Paren(inner) => {
                self.w.write("(");
                self.expr(inner);
                self.w.write(")");
            }
            Expr::Intrinsic(op) => self.w.write(match op {
                IntrinsicOp::TextureSample => "texture",
                IntrinsicOp::RgbaConstruct => "vec4",
                IntrinsicOp::Discard => "discard",
            }),
            // Unreachable behind the error gate; see `statement`.
            Expr::Error => {}
        }
    }

    fn expr_list(&mut self, args: &[Expr]) {
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.w.write(", ");
            }
            self.expr(arg);
        }
    }

    fn literal(&mut self, lit: &Literal) {
        match lit {
            Literal::F32(v) => self.w.write(&float_text(*v)),
            Literal::Bool(v) => self.w.write(if *v { "true" } else { "false" }),
            Literal::I32(v) => self.w.write(&v.to_string()),
            Literal::U32(v) => self.w.write(&format!("{v}u")),
        }
    }
}

/// Formats an `f32` so the emitted token is unambiguously a GLSL float.
fn float_text(v: f32) -> String {
    let text = v.to_string();
    if text.contains('.') || text.contains('e') || text.contains("inf") || text.contains("NaN") {
        text
    } else {
        format!("{text}.0")
    }
}

/// The fixed GLSL spelling for each value type.
fn type_name(ty: &ValueType) -> std::borrow::Cow<'static, str> {
    use std::borrow::Cow;
    match ty {
        ValueType::Void => Cow::Borrowed("void"),
        ValueType::Float => Cow::Borrowed("float"),
        ValueType::Vec2 => Cow::Borrowed("vec2"),
        ValueType::Vec3 => Cow::Borrowed("vec3"),
        ValueType::Vec4 => Cow::Borrowed("vec4"),
        ValueType::Uint => Cow::Borrowed("uint"),
        ValueType::Mat4 => Cow::Borrowed("mat4"),
        ValueType::Rgba => Cow::Borrowed("vec4"),
        ValueType::Texture2D => Cow::Borrowed("sampler2D"),
        ValueType::Custom(cs) => Cow::Owned(cs.name.clone()),
    }
}
