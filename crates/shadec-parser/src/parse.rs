//! Recursive-descent parser for the shader DSL.

use shadec_ir::Span;

use crate::ast::*;
use crate::lex::{Token, TokenKind};
use crate::ParseError;

pub(crate) struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub(crate) fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn peek_span(&self) -> Span {
        self.peek().span
    }

    fn prev_span(&self) -> Span {
        self.tokens[self.pos.saturating_sub(1)].span
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> Result<Span, ParseError> {
        if self.at(kind) {
            Ok(self.advance().span)
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_ident(&mut self, expected: &str) -> Result<(String, Span), ParseError> {
        match self.peek_kind().clone() {
            TokenKind::Ident(name) => {
                let span = self.advance().span;
                Ok((name, span))
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::Unexpected {
            found: self.peek_kind().describe(),
            expected: expected.into(),
            span: self.peek_span(),
        }
    }

    // -----------------------------------------------------------------
    // Items
    // -----------------------------------------------------------------

    pub(crate) fn source_file(&mut self) -> Result<SourceFile, ParseError> {
        let mut shaders = Vec::new();
        while !self.at(&TokenKind::Eof) {
            let attrs = self.attributes()?;
            let is_pub = self.eat(&TokenKind::Pub);
            shaders.push(self.shader_def(attrs, is_pub)?);
        }
        Ok(SourceFile { shaders })
    }

    fn attributes(&mut self) -> Result<Vec<Attr>, ParseError> {
        let mut attrs = Vec::new();
        while self.at(&TokenKind::Hash) {
            let start = self.advance().span;
            self.expect(&TokenKind::LBracket, "'['")?;
            let (name, _) = self.expect_ident("attribute name")?;
            let arg = if self.eat(&TokenKind::LParen) {
                let (arg, _) = self.expect_ident("attribute argument")?;
                self.expect(&TokenKind::RParen, "')'")?;
                Some(arg)
            } else {
                None
            };
            let end = self.expect(&TokenKind::RBracket, "']'")?;
            attrs.push(Attr {
                name,
                arg,
                span: start.to(end),
            });
        }
        Ok(attrs)
    }

    fn shader_def(&mut self, attrs: Vec<Attr>, is_pub: bool) -> Result<ShaderDef, ParseError> {
        let start = self.expect(&TokenKind::Shader, "'shader'")?;
        let (name, _) = self.expect_ident("shader name")?;
        self.expect(&TokenKind::LBrace, "'{'")?;

        let mut fields = Vec::new();
        let mut structs = Vec::new();
        let mut methods = Vec::new();
        while !self.at(&TokenKind::RBrace) {
            let member_attrs = self.attributes()?;
            if self.at(&TokenKind::Struct) {
                structs.push(self.struct_def(member_attrs)?);
                continue;
            }
            if !member_attrs.is_empty() {
                return Err(self.unexpected("'struct' after attribute"));
            }
            let is_static = self.eat(&TokenKind::Static);
            if self.at(&TokenKind::Fn) {
                methods.push(self.method_def(is_static)?);
            } else {
                fields.push(self.field_def(is_static)?);
            }
        }
        let end = self.expect(&TokenKind::RBrace, "'}'")?;

        Ok(ShaderDef {
            name,
            is_pub,
            attrs,
            fields,
            structs,
            methods,
            span: start.to(end),
        })
    }

    fn field_def(&mut self, is_static: bool) -> Result<FieldDef, ParseError> {
        let (name, start) = self.expect_ident("field name")?;
        self.expect(&TokenKind::Colon, "':'")?;
        let ty = self.type_ref()?;
        let end = self.expect(&TokenKind::Comma, "','")?;
        Ok(FieldDef {
            name,
            ty,
            is_static,
            span: start.to(end),
        })
    }

    fn struct_def(&mut self, attrs: Vec<Attr>) -> Result<StructDef, ParseError> {
        let start = self.expect(&TokenKind::Struct, "'struct'")?;
        let (name, _) = self.expect_ident("struct name")?;
        self.expect(&TokenKind::LBrace, "'{'")?;

        let mut fields = Vec::new();
        let mut has_methods = false;
        while !self.at(&TokenKind::RBrace) {
            let is_static = self.eat(&TokenKind::Static);
            if self.at(&TokenKind::Fn) {
                // Parsed for error recovery; the catalog rejects the struct.
                let _ = self.method_def(is_static)?;
                has_methods = true;
            } else {
                fields.push(self.field_def(is_static)?);
            }
        }
        let end = self.expect(&TokenKind::RBrace, "'}'")?;

        Ok(StructDef {
            name,
            attrs,
            fields,
            has_methods,
            span: start.to(end),
        })
    }

    fn method_def(&mut self, is_static: bool) -> Result<MethodDef, ParseError> {
        let start = self.expect(&TokenKind::Fn, "'fn'")?;
        let (name, _) = self.expect_ident("method name")?;
        self.expect(&TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        while !self.at(&TokenKind::RParen) {
            params.push(self.param()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen, "')'")?;
        let ret = if self.eat(&TokenKind::Arrow) {
            Some(self.type_ref()?)
        } else {
            None
        };
        let body = self.block()?;
        let end = self.prev_span();
        Ok(MethodDef {
            name,
            is_static,
            params,
            ret,
            body,
            span: start.to(end),
        })
    }

    fn param(&mut self) -> Result<Param, ParseError> {
        let (name, start) = self.expect_ident("parameter name")?;
        self.expect(&TokenKind::Colon, "':'")?;
        let mode = if self.eat(&TokenKind::Amp) {
            if self.eat(&TokenKind::Mut) {
                ParamMode::RefMut
            } else {
                ParamMode::Ref
            }
        } else {
            ParamMode::Value
        };
        let ty = self.type_ref()?;
        let end = self.prev_span();
        Ok(Param {
            name,
            ty,
            mode,
            span: start.to(end),
        })
    }

    fn type_ref(&mut self) -> Result<TypeRef, ParseError> {
        let (name, span) = self.expect_ident("type name")?;
        Ok(TypeRef { name, span })
    }

    // -----------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------

    fn block(&mut self) -> Result<Block, ParseError> {
        let start = self.expect(&TokenKind::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        while !self.at(&TokenKind::RBrace) {
            stmts.push(self.statement()?);
        }
        let end = self.expect(&TokenKind::RBrace, "'}'")?;
        Ok(Block {
            stmts,
            span: start.to(end),
        })
    }

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        let start = self.peek_span();
        let kind = match self.peek_kind() {
            TokenKind::Let => {
                self.advance();
                let (name, _) = self.expect_ident("local variable name")?;
                let ty = if self.eat(&TokenKind::Colon) {
                    Some(self.type_ref()?)
                } else {
                    None
                };
                let init = if self.eat(&TokenKind::Eq) {
                    Some(self.expression()?)
                } else {
                    None
                };
                self.expect(&TokenKind::Semi, "';'")?;
                StmtKind::Let { name, ty, init }
            }
            TokenKind::Return => {
                self.advance();
                let value = if self.at(&TokenKind::Semi) {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.expect(&TokenKind::Semi, "';'")?;
                StmtKind::Return(value)
            }
            TokenKind::If => {
                self.advance();
                self.expect(&TokenKind::LParen, "'('")?;
                let cond = self.expression()?;
                self.expect(&TokenKind::RParen, "')'")?;
                let then_branch = Box::new(self.statement()?);
                let else_branch = if self.eat(&TokenKind::Else) {
                    Some(Box::new(self.statement()?))
                } else {
                    None
                };
                StmtKind::If {
                    cond,
                    then_branch,
                    else_branch,
                }
            }
            TokenKind::LBrace => StmtKind::Block(self.block()?),
            _ => {
                let expr = self.expression()?;
                self.expect(&TokenKind::Semi, "';'")?;
                StmtKind::Expr(expr)
            }
        };
        Ok(Stmt {
            kind,
            span: start.to(self.prev_span()),
        })
    }

    // -----------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------

    fn expression(&mut self) -> Result<Expr, ParseError> {
        let left = self.binary_expr(1)?;
        if self.eat(&TokenKind::Eq) {
            let value = self.expression()?;
            let span = left.span.to(value.span);
            return Ok(Expr {
                kind: ExprKind::Assign {
                    target: Box::new(left),
                    value: Box::new(value),
                },
                span,
            });
        }
        Ok(left)
    }

    fn binary_op(&self) -> Option<(BinOp, u8)> {
        let (op, prec) = match self.peek_kind() {
            TokenKind::PipePipe => (BinOp::Or, 1),
            TokenKind::AmpAmp => (BinOp::And, 2),
            TokenKind::Pipe => (BinOp::BitOr, 3),
            TokenKind::Caret => (BinOp::BitXor, 4),
            TokenKind::Amp => (BinOp::BitAnd, 5),
            TokenKind::EqEq => (BinOp::Eq, 6),
            TokenKind::BangEq => (BinOp::Ne, 6),
            TokenKind::Lt => (BinOp::Lt, 7),
            TokenKind::Gt => (BinOp::Gt, 7),
            TokenKind::Le => (BinOp::Le, 7),
            TokenKind::Ge => (BinOp::Ge, 7),
            TokenKind::Shl => (BinOp::Shl, 8),
            TokenKind::Shr => (BinOp::Shr, 8),
            TokenKind::Plus => (BinOp::Add, 9),
            TokenKind::Minus => (BinOp::Sub, 9),
            TokenKind::Star => (BinOp::Mul, 10),
            TokenKind::Slash => (BinOp::Div, 10),
            TokenKind::Percent => (BinOp::Rem, 10),
            _ => return None,
        };
        Some((op, prec))
    }

    fn binary_expr(&mut self, min_prec: u8) -> Result<Expr, ParseError> {
        let mut left = self.unary_expr()?;
        while let Some((op, prec)) = self.binary_op() {
            if prec < min_prec {
                break;
            }
            self.advance();
            let right = self.binary_expr(prec + 1)?;
            let span = left.span.to(right.span);
            left = Expr {
                kind: ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            };
        }
        Ok(left)
    }

    fn unary_expr(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek_kind() {
            TokenKind::Minus => Some(UnOp::Neg),
            TokenKind::Bang => Some(UnOp::Not),
            TokenKind::Tilde => Some(UnOp::BitNot),
            _ => None,
        };
        if let Some(op) = op {
            let start = self.advance().span;
            let operand = self.unary_expr()?;
            let span = start.to(operand.span);
            return Ok(Expr {
                kind: ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                span,
            });
        }
        self.postfix_expr()
    }

    fn postfix_expr(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary_expr()?;
        loop {
            if self.eat(&TokenKind::Dot) {
                let (name, end) = self.expect_ident("field name")?;
                let span = expr.span.to(end);
                expr = Expr {
                    kind: ExprKind::Field {
                        obj: Box::new(expr),
                        name,
                    },
                    span,
                };
            } else if self.eat(&TokenKind::LParen) {
                let mut args = Vec::new();
                while !self.at(&TokenKind::RParen) {
                    args.push(self.expression()?);
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                let end = self.expect(&TokenKind::RParen, "')'")?;
                let span = expr.span.to(end);
                expr = Expr {
                    kind: ExprKind::Call {
                        callee: Box::new(expr),
                        args,
                    },
                    span,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary_expr(&mut self) -> Result<Expr, ParseError> {
        let span = self.peek_span();
        let kind = match self.peek_kind().clone() {
            TokenKind::LitFloat { value, wide } => {
                self.advance();
                if wide {
                    ExprKind::Lit(Lit::F64(value))
                } else {
                    ExprKind::Lit(Lit::F32(value as f32))
                }
            }
            TokenKind::LitInt { value, unsigned } => {
                self.advance();
                if unsigned {
                    ExprKind::Lit(Lit::U32(value as u32))
                } else {
                    ExprKind::Lit(Lit::I32(value as i32))
                }
            }
            TokenKind::True => {
                self.advance();
                ExprKind::Lit(Lit::Bool(true))
            }
            TokenKind::False => {
                self.advance();
                ExprKind::Lit(Lit::Bool(false))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.expression()?;
                self.expect(&TokenKind::RParen, "')'")?;
                ExprKind::Paren(Box::new(inner))
            }
            TokenKind::Ident(name) => {
                let ident_span = self.advance().span;
                if self.at(&TokenKind::LBrace) {
                    return self.struct_literal(TypeRef {
                        name,
                        span: ident_span,
                    });
                }
                ExprKind::Ident(name)
            }
            _ => return Err(self.unexpected("an expression")),
        };
        Ok(Expr {
            kind,
            span: span.to(self.prev_span()),
        })
    }

    fn struct_literal(&mut self, ty: TypeRef) -> Result<Expr, ParseError> {
        let start = ty.span;
        self.expect(&TokenKind::LBrace, "'{'")?;
        let mut fields = Vec::new();
        while !self.at(&TokenKind::RBrace) {
            let (name, _) = self.expect_ident("field name")?;
            self.expect(&TokenKind::Colon, "':'")?;
            fields.push((name, self.expression()?));
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        let end = self.expect(&TokenKind::RBrace, "'}'")?;
        Ok(Expr {
            kind: ExprKind::StructLit { ty, fields },
            span: start.to(end),
        })
    }
}
