//! The IR builder: lowers analyzed method bodies into the typed IR.
//!
//! Lowering is a direct structural translation of the restricted statement
//! and expression grammar, plus the two stateful parts: symbol validation
//! against a lightweight scope stack (parameters, locals, shader fields,
//! intrinsics) and demand-driven helper discovery. Local failures record a
//! diagnostic and substitute an `Error` node so the rest of the shader
//! still gets checked.

use std::collections::{HashMap, HashSet, VecDeque};

use shadec_ir as ir;
use shadec_ir::{Diagnostics, NamedValue, Span, ValueType};
use shadec_parser::ast;

use crate::analyze::{MethodInfo, ShaderProgram};
use crate::catalog::{StructScope, TypeCatalog};
use crate::intrinsics::{self, RetRule};

/// Which kind of function a body is being lowered as.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StageMode {
    Vertex,
    Fragment,
    /// A helper shared by either stage. `discard` is illegal here.
    Helper,
}

/// Lowers a validated shader program to IR, one shader per stage.
pub fn lower(
    def: &ast::ShaderDef,
    program: &ShaderProgram,
    catalog: &TypeCatalog,
    diags: &mut Diagnostics,
) -> ir::Program {
    ir::Program {
        vertex: lower_stage(def, program, catalog, diags, StageMode::Vertex),
        fragment: lower_stage(def, program, catalog, diags, StageMode::Fragment),
    }
}

fn lower_stage(
    def: &ast::ShaderDef,
    program: &ShaderProgram,
    catalog: &TypeCatalog,
    diags: &mut Diagnostics,
    mode: StageMode,
) -> ir::Shader {
    let entry_info = match mode {
        StageMode::Vertex => &program.vertex,
        StageMode::Fragment => &program.fragment,
        StageMode::Helper => unreachable!("helpers are not stage entry points"),
    };

    let mut ctx = StageCtx {
        def,
        program,
        catalog,
        diags,
        scope: StructScope::new(&def.name, &def.structs),
        helper_queue: VecDeque::new(),
        helpers_used: HashSet::new(),
        call_edges: Vec::new(),
    };

    let entry = ctx.lower_function(entry_info, mode, None);

    // Drain the discovery queue; a dequeued helper may enqueue more.
    let mut helpers = Vec::new();
    while let Some(index) = ctx.helper_queue.pop_front() {
        helpers.push(ctx.lower_function(&program.helpers[index], StageMode::Helper, Some(index)));
    }
    ctx.report_helper_cycles();

    // Discovery order has every caller before its callees, so the reverse
    // puts callee text before caller text, which is what GLSL requires.
    helpers.reverse();

    ir::Shader {
        globals: program
            .globals
            .iter()
            .map(|g| NamedValue::new(g.name.clone(), g.ty.clone()))
            .collect(),
        structs: program.structs.clone(),
        helpers,
        entry,
    }
}

/// Per-stage lowering state: helper discovery is shared by the entry
/// function and every helper lowered for this stage.
struct StageCtx<'a> {
    def: &'a ast::ShaderDef,
    program: &'a ShaderProgram,
    catalog: &'a TypeCatalog,
    diags: &'a mut Diagnostics,
    scope: StructScope<'a>,
    helper_queue: VecDeque<usize>,
    helpers_used: HashSet<usize>,
    /// (caller helper, callee helper) pairs; `None` caller is the entry.
    call_edges: Vec<(Option<usize>, usize)>,
}

impl<'a> StageCtx<'a> {
    fn lower_function(
        &mut self,
        info: &MethodInfo,
        mode: StageMode,
        current: Option<usize>,
    ) -> ir::Function {
        let method = &self.def.methods[info.ast_index];
        let mut lowerer = FnLowerer {
            ctx: self,
            mode,
            current,
            scopes: vec![HashMap::new()],
        };
        for input in &info.inputs {
            lowerer.define_local(&input.name, input.ty.clone());
        }
        let body = lowerer.lower_block(&method.body);
        ir::Function {
            name: info.name.clone(),
            return_type: info.output.clone(),
            args: info
                .inputs
                .iter()
                .map(|i| NamedValue::new(i.name.clone(), i.ty.clone()))
                .collect(),
            body,
        }
    }

    fn helper_index(&self, name: &str) -> Option<usize> {
        self.program.helpers.iter().position(|h| h.name == name)
    }

    /// GLSL has no recursion, so a cycle among helpers can never be
    /// emitted; the queue's visited set keeps discovery from looping, and
    /// this reports the cycle as an error afterwards.
    fn report_helper_cycles(&mut self) {
        let mut adjacency: HashMap<usize, Vec<usize>> = HashMap::new();
        for (caller, callee) in &self.call_edges {
            if let Some(caller) = caller {
                adjacency.entry(*caller).or_default().push(*callee);
            }
        }

        let mut visited = HashSet::new();
        for start in 0..self.program.helpers.len() {
            if visited.contains(&start) {
                continue;
            }
            let mut path = Vec::new();
            if let Some(offender) = find_cycle(&adjacency, start, &mut visited, &mut path) {
                self.diags.error(
                    "Recursive helper functions are not supported in shaders",
                    self.program.helpers[offender].span,
                );
                return;
            }
        }
    }
}

fn find_cycle(
    adjacency: &HashMap<usize, Vec<usize>>,
    node: usize,
    visited: &mut HashSet<usize>,
    path: &mut Vec<usize>,
) -> Option<usize> {
    if path.contains(&node) {
        return Some(node);
    }
    if !visited.insert(node) {
        return None;
    }
    path.push(node);
    if let Some(next) = adjacency.get(&node) {
        for &callee in next {
            if let Some(found) = find_cycle(adjacency, callee, visited, path) {
                return Some(found);
            }
        }
    }
    path.pop();
    None
}

/// Per-function lowering state: the mode and the block-scoped symbol
/// table.
struct FnLowerer<'s, 'a> {
    ctx: &'s mut StageCtx<'a>,
    mode: StageMode,
    current: Option<usize>,
    scopes: Vec<HashMap<String, ValueType>>,
}

impl FnLowerer<'_, '_> {
    fn define_local(&mut self, name: &str, ty: ValueType) {
        self.scopes
            .last_mut()
            .expect("scope stack is never empty")
            .insert(name.to_string(), ty);
    }

    fn lookup_local(&self, name: &str) -> Option<&ValueType> {
        self.scopes.iter().rev().find_map(|s| s.get(name))
    }

    fn lookup_global(&self, name: &str) -> Option<&ValueType> {
        self.ctx
            .program
            .globals
            .iter()
            .find(|g| g.name == name)
            .map(|g| &g.ty)
    }

    fn note_helper_use(&mut self, index: usize) {
        if self.ctx.helpers_used.insert(index) {
            self.ctx.helper_queue.push_back(index);
        }
        self.ctx.call_edges.push((self.current, index));
    }

    /// A type name usable in constructor-call position.
    fn constructor_type(&self, name: &str) -> Option<ValueType> {
        self.ctx.catalog.lookup(&self.ctx.scope, name)
    }

    // -----------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------

    fn lower_block(&mut self, block: &ast::Block) -> ir::Block {
        self.scopes.push(HashMap::new());
        let stmts = block.stmts.iter().map(|s| self.lower_stmt(s)).collect();
        self.scopes.pop();
        stmts
    }

    fn lower_stmt(&mut self, stmt: &ast::Stmt) -> ir::Statement {
        match &stmt.kind {
            ast::StmtKind::Block(block) => ir::Statement::Block(self.lower_block(block)),
            ast::StmtKind::Expr(expr) => ir::Statement::Expression(self.lower_expr(expr)),
            ast::StmtKind::Return(value) => {
                ir::Statement::Return(value.as_ref().map(|e| self.lower_expr(e)))
            }
            ast::StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => ir::Statement::If {
                condition: self.lower_expr(cond),
                then_branch: Box::new(self.lower_stmt(then_branch)),
                else_branch: else_branch
                    .as_ref()
                    .map(|s| Box::new(self.lower_stmt(s))),
            },
            ast::StmtKind::Let { name, ty, init } => self.lower_let(stmt, name, ty, init),
        }
    }

    fn lower_let(
        &mut self,
        stmt: &ast::Stmt,
        name: &str,
        ty: &Option<ast::TypeRef>,
        init: &Option<ast::Expr>,
    ) -> ir::Statement {
        let declared = match ty {
            Some(ty_ref) => {
                let resolved = self.constructor_type(&ty_ref.name);
                if resolved.is_none() {
                    self.ctx.diags.error(
                        format!("Type '{}' is not supported in shaders", ty_ref.name),
                        ty_ref.span,
                    );
                    return ir::Statement::Error;
                }
                resolved
            }
            None => init
                .as_ref()
                .and_then(|e| self.infer(e))
                .filter(|t| *t != ValueType::Void),
        };
        let lowered_init = init.as_ref().map(|e| self.lower_expr(e));
        match declared {
            Some(ty) => {
                self.define_local(name, ty.clone());
                ir::Statement::DeclareLocal {
                    ty,
                    name: name.to_string(),
                    init: lowered_init,
                }
            }
            None => {
                self.ctx.diags.error(
                    format!("Cannot infer the type of '{name}'; add a type annotation"),
                    stmt.span,
                );
                ir::Statement::Error
            }
        }
    }

    // -----------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------

    fn lower_expr(&mut self, expr: &ast::Expr) -> ir::Expr {
        match &expr.kind {
            ast::ExprKind::Lit(lit) => self.lower_literal(*lit, expr.span),
            ast::ExprKind::Ident(name) => self.lower_ident(name, expr.span),
            ast::ExprKind::Field { obj, name } => ir::Expr::FieldAccess {
                obj: Box::new(self.lower_expr(obj)),
                field: name.clone(),
            },
            ast::ExprKind::Assign { target, value } => ir::Expr::Assignment {
                target: Box::new(self.lower_expr(target)),
                value: Box::new(self.lower_expr(value)),
            },
            ast::ExprKind::Paren(inner) => ir::Expr::Paren(Box::new(self.lower_expr(inner))),
            ast::ExprKind::Unary { op, operand } => match prefix_op(*op) {
                Some(op) => ir::Expr::PrefixOp {
                    op,
                    operand: Box::new(self.lower_expr(operand)),
                },
                None => {
                    self.ctx.diags.error(
                        format!("operator '{}' is not supported in shader code", un_op_token(*op)),
                        expr.span,
                    );
                    ir::Expr::Error
                }
            },
            ast::ExprKind::Binary { op, left, right } => match binary_op(*op) {
                Some(op) => ir::Expr::BinOp {
                    left: Box::new(self.lower_expr(left)),
                    op,
                    right: Box::new(self.lower_expr(right)),
                },
                None => {
                    self.ctx.diags.error(
                        format!("operator '{}' is not supported in shader code", bin_op_token(*op)),
                        expr.span,
                    );
                    ir::Expr::Error
                }
            },
            ast::ExprKind::StructLit { .. } => {
                self.ctx
                    .diags
                    .error("Cannot use struct initializer blocks in shaders", expr.span);
                ir::Expr::Error
            }
            ast::ExprKind::Call { callee, args } => self.lower_call(callee, args, expr.span),
        }
    }

    fn lower_literal(&mut self, lit: ast::Lit, span: Span) -> ir::Expr {
        match lit {
            ast::Lit::F32(v) => ir::Expr::Literal(ir::Literal::F32(v)),
            ast::Lit::I32(v) => ir::Expr::Literal(ir::Literal::I32(v)),
            ast::Lit::U32(v) => ir::Expr::Literal(ir::Literal::U32(v)),
            ast::Lit::Bool(v) => ir::Expr::Literal(ir::Literal::Bool(v)),
            ast::Lit::F64(_) => {
                self.ctx.diags.error(
                    "Double precision floats are not supported in shader code",
                    span,
                );
                ir::Expr::Error
            }
        }
    }

    fn lower_ident(&mut self, name: &str, span: Span) -> ir::Expr {
        if self.lookup_local(name).is_some() || self.lookup_global(name).is_some() {
            return ir::Expr::Identifier(name.to_string());
        }
        if let Some(index) = self.ctx.helper_index(name) {
            self.note_helper_use(index);
            return ir::Expr::Identifier(name.to_string());
        }
        match name {
            "sample" => return ir::Expr::Intrinsic(ir::IntrinsicOp::TextureSample),
            "rgba" => return ir::Expr::Intrinsic(ir::IntrinsicOp::RgbaConstruct),
            "discard" => {
                if self.mode != StageMode::Fragment {
                    self.ctx
                        .diags
                        .error("Can only use discard in the fragment shader", span);
                }
                return ir::Expr::Intrinsic(ir::IntrinsicOp::Discard);
            }
            _ => {}
        }
        if intrinsics::lookup(name).is_some() {
            return ir::Expr::Identifier(name.to_string());
        }
        self.ctx
            .diags
            .error(format!("Unknown symbol '{name}'"), span);
        ir::Expr::Identifier(name.to_string())
    }

    fn lower_call(&mut self, callee: &ast::Expr, args: &[ast::Expr], span: Span) -> ir::Expr {
        if let ast::ExprKind::Ident(name) = &callee.kind {
            if name == "discard" {
                if self.mode != StageMode::Fragment {
                    self.ctx
                        .diags
                        .error("Can only use discard in the fragment shader", span);
                }
                if !args.is_empty() {
                    self.ctx.diags.error("discard takes no arguments", span);
                }
                return ir::Expr::Intrinsic(ir::IntrinsicOp::Discard);
            }
            // A type name in call position is positional construction.
            if self.lookup_local(name).is_none() {
                if let Some(ty) = self.constructor_type(name) {
                    let args = args.iter().map(|a| self.lower_expr(a)).collect();
                    return ir::Expr::Construct { ty, args };
                }
            }
        }
        let func = self.lower_expr(callee);
        let args = args.iter().map(|a| self.lower_expr(a)).collect();
        ir::Expr::Invoke {
            func: Box::new(func),
            args,
        }
    }

    // -----------------------------------------------------------------
    // Type inference
    // -----------------------------------------------------------------

    /// Bounded type inference for `let` initialisers.
    ///
    /// The type of a local is derived from the symbol table, constructor
    /// calls, intrinsic return rules, field and swizzle access, and
    /// arithmetic shape. Returns `None` when the type cannot be derived;
    /// an explicit annotation always works.
    fn infer(&self, expr: &ast::Expr) -> Option<ValueType> {
        match &expr.kind {
            ast::ExprKind::Lit(ast::Lit::F32(_)) => Some(ValueType::Float),
            ast::ExprKind::Lit(ast::Lit::U32(_)) => Some(ValueType::Uint),
            ast::ExprKind::Lit(_) => None,
            ast::ExprKind::Ident(name) => self
                .lookup_local(name)
                .or_else(|| self.lookup_global(name))
                .cloned(),
            ast::ExprKind::Paren(inner) => self.infer(inner),
            ast::ExprKind::Assign { value, .. } => self.infer(value),
            ast::ExprKind::Unary {
                op: ast::UnOp::Neg,
                operand,
            } => self.infer(operand),
            ast::ExprKind::Unary { .. } => None,
            ast::ExprKind::Binary { op, left, right } => self.infer_binary(*op, left, right),
            ast::ExprKind::Field { obj, name } => {
                let obj_ty = self.infer(obj)?;
                field_type(&obj_ty, name)
            }
            ast::ExprKind::Call { callee, args } => self.infer_call(callee, args),
            ast::ExprKind::StructLit { .. } => None,
        }
    }

    fn infer_binary(
        &self,
        op: ast::BinOp,
        left: &ast::Expr,
        right: &ast::Expr,
    ) -> Option<ValueType> {
        use ast::BinOp::*;
        match op {
            Add | Sub | Mul | Div | Rem => {
                combine_arithmetic(self.infer(left), self.infer(right))
            }
            Shl | Shr => self.infer(left),
            BitAnd | BitOr | BitXor => self.infer(left).or_else(|| self.infer(right)),
            // Comparisons produce booleans, which are not declarable
            // value types; conditions never need a declared type.
            Eq | Ne | Lt | Gt | Le | Ge | And | Or => None,
        }
    }

    fn infer_call(&self, callee: &ast::Expr, args: &[ast::Expr]) -> Option<ValueType> {
        let ast::ExprKind::Ident(name) = &callee.kind else {
            return None;
        };
        if self.lookup_local(name).is_none() {
            if let Some(ty) = self.constructor_type(name) {
                return Some(ty);
            }
        }
        if let Some(index) = self.ctx.helper_index(name) {
            let output = self.ctx.program.helpers[index].output.clone();
            return (output != ValueType::Void).then_some(output);
        }
        match intrinsics::lookup(name).map(|i| &i.ret) {
            Some(RetRule::Fixed(ty)) => (*ty != ValueType::Void).then(|| ty.clone()),
            Some(RetRule::FirstArg) => args.first().and_then(|a| self.infer(a)),
            None => None,
        }
    }
}

fn combine_arithmetic(
    left: Option<ValueType>,
    right: Option<ValueType>,
) -> Option<ValueType> {
    use ValueType::*;
    match (left, right) {
        (Some(a), Some(b)) => {
            if a == b {
                return Some(a);
            }
            match (a, b) {
                (Mat4, Vec4) | (Vec4, Mat4) => Some(Vec4),
                (v @ (Vec2 | Vec3 | Vec4 | Rgba), Float) => Some(v),
                (Float, v @ (Vec2 | Vec3 | Vec4 | Rgba)) => Some(v),
                _ => None,
            }
        }
        (Some(t), None) | (None, Some(t)) => Some(t),
        (None, None) => None,
    }
}

/// Field and swizzle typing for the built-in vector types.
fn field_type(ty: &ValueType, field: &str) -> Option<ValueType> {
    let components = match ty {
        ValueType::Custom(cs) => return cs.field(field).map(|f| f.ty.clone()),
        ValueType::Vec2 => "xy",
        ValueType::Vec3 => "xyz",
        ValueType::Vec4 => "xyzw",
        ValueType::Rgba => "rgba",
        _ => return None,
    };
    if field.is_empty() || !field.chars().all(|c| components.contains(c)) {
        return None;
    }
    match field.len() {
        1 => Some(ValueType::Float),
        2 => Some(ValueType::Vec2),
        3 => Some(ValueType::Vec3),
        4 => Some(ValueType::Vec4),
        _ => None,
    }
}

fn binary_op(op: ast::BinOp) -> Option<ir::Op> {
    use ast::BinOp::*;
    match op {
        Add => Some(ir::Op::Plus),
        Sub => Some(ir::Op::Minus),
        Mul => Some(ir::Op::Multiply),
        Div => Some(ir::Op::Divide),
        Rem => Some(ir::Op::Modulo),
        Shl => Some(ir::Op::ShiftLeft),
        Shr => Some(ir::Op::ShiftRight),
        BitAnd => Some(ir::Op::BitAnd),
        BitOr => Some(ir::Op::BitOr),
        Eq => Some(ir::Op::Equals),
        Ne => Some(ir::Op::NotEquals),
        Lt => Some(ir::Op::LessThan),
        Gt => Some(ir::Op::GreaterThan),
        Le => Some(ir::Op::LessThanOrEqual),
        Ge => Some(ir::Op::GreaterThanOrEqual),
        BitXor | And | Or => None,
    }
}

fn prefix_op(op: ast::UnOp) -> Option<ir::Op> {
    match op {
        ast::UnOp::Neg => Some(ir::Op::Minus),
        ast::UnOp::Not => Some(ir::Op::Not),
        ast::UnOp::BitNot => None,
    }
}

fn bin_op_token(op: ast::BinOp) -> &'static str {
    use ast::BinOp::*;
    match op {
        Add => "+",
        Sub => "-",
        Mul => "*",
        Div => "/",
        Rem => "%",
        Shl => "<<",
        Shr => ">>",
        BitAnd => "&",
        BitOr => "|",
        BitXor => "^",
        Eq => "==",
        Ne => "!=",
        Lt => "<",
        Gt => ">",
        Le => "<=",
        Ge => ">=",
        And => "&&",
        Or => "||",
    }
}

fn un_op_token(op: ast::UnOp) -> &'static str {
    match op {
        ast::UnOp::Neg => "-",
        ast::UnOp::Not => "!",
        ast::UnOp::BitNot => "~",
    }
}
