//! Recursive-descent / precedence-climbing parser (spec §4.3)
//!
//! Turns the lexer's flat `Token` stream into a `Module`. Errors are
//! accumulated into a shared `Diagnostics` rather than aborting: on a
//! malformed statement the parser enters panic mode and resynchronises at
//! the next token for which `Token::starts_statement()` is true.

use crate::arena::Arena;
use crate::ast::*;
use crate::diagnostics::Diagnostics;
use crate::lexer::tokenize_all;
use crate::token::{Literal, Token, TokenKind};
use std::collections::HashSet;
use std::sync::Arc;

pub struct Parser<'a> {
    arena: &'a Arena,
    tokens: Vec<Token>,
    pos: usize,
    filename: Arc<str>,
    diags: Diagnostics,
    /// Names introduced by `type T = opaque`/`type T = native fn(...)`
    /// declarations seen so far, consulted by `is_static_call_prefix` to
    /// recognise `T::method(...)` static dispatch on a user type (spec §3
    /// `EXPR_STATIC_CALL`) the same way the primitive-keyword types do.
    declared_types: HashSet<String>,
}

type PResult<T> = Result<T, ()>;

impl<'a> Parser<'a> {
    pub fn new(arena: &'a Arena, source: &str, filename: impl Into<Arc<str>>) -> Self {
        let filename = filename.into();
        let tokens = tokenize_all(arena, source, filename.clone());
        Parser { arena, tokens, pos: 0, filename, diags: Diagnostics::new(), declared_types: HashSet::new() }
    }

    pub fn parse_module(mut self) -> (Module, Diagnostics) {
        let mut module = Module::new(self.filename.to_string());
        self.skip_newlines();
        while !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => module.stmts.push(stmt),
                Err(()) => self.synchronize(),
            }
            self.skip_newlines();
        }
        (module, self.diags)
    }

    // ---- token stream helpers ----

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.pos.saturating_sub(1).min(self.tokens.len() - 1)]
    }

    fn is_at_end(&self) -> bool {
        self.peek_kind() == TokenKind::Eof
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if !self.is_at_end() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn check_next(&self, kind: TokenKind) -> bool {
        self.tokens.get(self.pos + 1).is_some_and(|t| t.kind == kind)
    }

    fn check_at(&self, offset: usize, kind: TokenKind) -> bool {
        self.tokens.get(self.pos + offset).is_some_and(|t| t.kind == kind)
    }

    fn match_tok(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn skip_newlines(&mut self) {
        while self.check(TokenKind::Newline) {
            self.advance();
        }
    }

    fn error_at(&mut self, msg: impl Into<String>) -> PResult<Token> {
        let tok = self.peek().clone();
        self.diags.error(self.filename.to_string(), tok.line, msg);
        Err(())
    }

    fn expect(&mut self, kind: TokenKind, msg: &str) -> PResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let found = self.peek().lexeme.to_string();
            self.error_at(format!("{msg}, found '{found}'"))
        }
    }

    /// Panic-mode recovery: discard tokens until one starts a new statement
    /// (spec §4.3).
    fn synchronize(&mut self) {
        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Newline {
                return;
            }
            if self.peek().starts_statement() {
                return;
            }
            self.advance();
        }
    }

    // ---- declarations / statements ----

    fn declaration(&mut self) -> PResult<Stmt> {
        if self.check(TokenKind::Error) {
            let tok = self.advance();
            self.diags.error(self.filename.to_string(), tok.line, tok.lexeme.to_string());
            return Err(());
        }
        if self.check(TokenKind::Include) || self.check(TokenKind::Link) {
            return self.pragma();
        }
        if self.check(TokenKind::Import) {
            return self.import_stmt();
        }
        if self.check(TokenKind::Type) {
            return self.type_decl();
        }
        if self.check(TokenKind::Shared) || self.check(TokenKind::Private) {
            return self.modified_function_or_block();
        }
        if self.check(TokenKind::Native) {
            return self.native_decl();
        }
        if self.check(TokenKind::Fn) {
            return self.function_decl(FuncModifier::Default);
        }
        self.statement()
    }

    fn pragma(&mut self) -> PResult<Stmt> {
        let tok = self.advance();
        let kind = if tok.kind == TokenKind::Include { PragmaKind::Include } else { PragmaKind::Link };
        let value = self.expect(TokenKind::Str, "expected a quoted pragma argument")?;
        let value_str = value.literal.map(|l| match l {
            Literal::Str(s) => s.to_string(),
            _ => value.lexeme.to_string(),
        }).unwrap_or_else(|| value.lexeme.to_string());
        Ok(Stmt::new(StmtKind::Pragma { kind, value: value_str }, tok.line))
    }

    fn import_stmt(&mut self) -> PResult<Stmt> {
        let tok = self.advance();
        let module = self.expect(TokenKind::Str, "expected module path string after 'import'")?;
        let module_str = self.string_literal_text(&module);
        let namespace = if self.match_tok(TokenKind::As) {
            Some(self.expect(TokenKind::Ident, "expected namespace name after 'as'")?.lexeme.to_string())
        } else {
            None
        };
        Ok(Stmt::new(
            StmtKind::Import { module: module_str, namespace, imported_stmts: None, also_imported_directly: false },
            tok.line,
        ))
    }

    fn string_literal_text(&self, tok: &Token) -> String {
        match &tok.literal {
            Some(Literal::Str(s)) => s.to_string(),
            _ => tok.lexeme.trim_matches('"').to_string(),
        }
    }

    fn type_decl(&mut self) -> PResult<Stmt> {
        let tok = self.advance();
        let name = self.expect(TokenKind::Ident, "expected type name")?.lexeme.to_string();
        self.expect(TokenKind::Assign, "expected '=' in type declaration")?;
        let ty = if self.match_tok(TokenKind::Opaque) {
            Type::Opaque(name.clone())
        } else {
            self.parse_type()?
        };
        self.declared_types.insert(name.clone());
        Ok(Stmt::new(StmtKind::TypeDecl { name, ty }, tok.line))
    }

    fn native_decl(&mut self) -> PResult<Stmt> {
        self.advance();
        self.function_decl_inner(FuncModifier::Default, true)
    }

    fn modified_function_or_block(&mut self) -> PResult<Stmt> {
        // `shared while`/`shared for` (spec §4.3 grammar: `['shared'] 'while'|'for'`)
        // sets `is_shared` on the loop node itself rather than producing a
        // function/block modifier; only `shared` applies to loops, never `private`.
        if self.check(TokenKind::Shared) {
            if self.check_next(TokenKind::While) {
                self.advance();
                return self.while_stmt(true);
            }
            if self.check_next(TokenKind::For) {
                self.advance();
                return self.for_or_foreach_stmt(true);
            }
        }
        let modifier_tok = self.advance();
        let modifier = if modifier_tok.kind == TokenKind::Shared { FuncModifier::Shared } else { FuncModifier::Private };
        if self.check(TokenKind::Native) {
            self.advance();
            return self.function_decl_inner(modifier, true);
        }
        if self.check(TokenKind::Fn) {
            return self.function_decl(modifier);
        }
        // `shared =>` / `private =>` block modifier on an arbitrary block.
        self.expect(TokenKind::FatArrow, "expected 'fn' or '=>' after memory modifier")?;
        let block_mod = if modifier == FuncModifier::Shared { BlockModifier::Shared } else { BlockModifier::Private };
        let stmts = self.suite()?;
        Ok(Stmt::new(StmtKind::Block { stmts, modifier: block_mod }, modifier_tok.line))
    }

    fn function_decl(&mut self, modifier: FuncModifier) -> PResult<Stmt> {
        self.advance(); // 'fn'
        self.function_decl_inner(modifier, false)
    }

    fn function_decl_inner(&mut self, modifier: FuncModifier, is_native: bool) -> PResult<Stmt> {
        let name_tok = self.expect(TokenKind::Ident, "expected function name")?;
        self.expect(TokenKind::LParen, "expected '(' after function name")?;
        let mut params = Vec::new();
        let mut is_variadic = false;
        if !self.check(TokenKind::RParen) {
            loop {
                if self.match_tok(TokenKind::DotDotDot) {
                    is_variadic = true;
                    break;
                }
                let mem_qual = self.opt_mem_qual();
                let pname = self.expect(TokenKind::Ident, "expected parameter name")?.lexeme.to_string();
                let ty = if self.match_tok(TokenKind::Colon) { Some(self.parse_type()?) } else { None };
                params.push(LambdaParam { name: pname, ty, mem_qual });
                if !self.match_tok(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "expected ')' after parameter list")?;
        let return_type = if self.match_tok(TokenKind::Colon) { Some(self.parse_type()?) } else { None };
        let body = if self.match_tok(TokenKind::FatArrow) {
            self.suite()?
        } else if is_native {
            self.end_of_statement()?;
            Vec::new()
        } else {
            self.expect(TokenKind::FatArrow, "expected '=>' before function body")?;
            Vec::new()
        };
        Ok(Stmt::new(
            StmtKind::Function { name: name_tok.lexeme.to_string(), params, return_type, body, modifier, is_native, is_variadic },
            name_tok.line,
        ))
    }

    fn opt_mem_qual(&mut self) -> MemQual {
        if self.match_tok(TokenKind::Val) {
            MemQual::Val
        } else if self.match_tok(TokenKind::Ref) {
            MemQual::Ref
        } else {
            MemQual::None
        }
    }

    /// `suite := NEWLINE INDENT declaration+ DEDENT | single-statement`
    /// (spec §4.3). A suite follows a header's `=>`; if a newline comes
    /// next it's the indented multi-statement form, otherwise the rest of
    /// the line is parsed as a single inline statement.
    fn suite(&mut self) -> PResult<Vec<Stmt>> {
        if self.check(TokenKind::Newline) {
            self.indented_block()
        } else {
            Ok(vec![self.declaration()?])
        }
    }

    /// Consumes the `NEWLINE INDENT stmt* DEDENT` block that follows a
    /// header ending in `:`-less layout (spec §4.2 indentation protocol).
    fn indented_block(&mut self) -> PResult<Vec<Stmt>> {
        self.skip_newlines();
        self.expect(TokenKind::Indent, "expected an indented block")?;
        let mut stmts = Vec::new();
        self.skip_newlines();
        while !self.check(TokenKind::Dedent) && !self.is_at_end() {
            match self.declaration() {
                Ok(s) => stmts.push(s),
                Err(()) => self.synchronize(),
            }
            self.skip_newlines();
        }
        self.expect(TokenKind::Dedent, "expected dedent to close block")?;
        Ok(stmts)
    }

    fn end_of_statement(&mut self) -> PResult<()> {
        if self.check(TokenKind::Newline) || self.is_at_end() || self.check(TokenKind::Dedent) {
            self.skip_newlines();
            Ok(())
        } else {
            self.error_at("expected end of line").map(|_| ())
        }
    }

    fn statement(&mut self) -> PResult<Stmt> {
        match self.peek_kind() {
            TokenKind::Var => self.var_decl(),
            TokenKind::If => self.if_stmt(),
            TokenKind::While => self.while_stmt(false),
            TokenKind::For => self.for_or_foreach_stmt(false),
            TokenKind::Return => self.return_stmt(),
            TokenKind::Break => {
                let tok = self.advance();
                self.end_of_statement()?;
                Ok(Stmt::new(StmtKind::Break, tok.line))
            }
            TokenKind::Continue => {
                let tok = self.advance();
                self.end_of_statement()?;
                Ok(Stmt::new(StmtKind::Continue, tok.line))
            }
            _ => self.expr_stmt(),
        }
    }

    fn var_decl(&mut self) -> PResult<Stmt> {
        let tok = self.advance();
        let name = self.expect(TokenKind::Ident, "expected variable name")?.lexeme.to_string();
        let ty = if self.match_tok(TokenKind::Colon) { Some(self.parse_type()?) } else { None };
        // `'as' ('val'|'ref')` (spec §4.3 varDecl grammar) only makes sense
        // following a type annotation.
        let mem_qual = if ty.is_some() && self.match_tok(TokenKind::As) {
            if self.match_tok(TokenKind::Val) {
                MemQual::Val
            } else if self.match_tok(TokenKind::Ref) {
                MemQual::Ref
            } else {
                self.error_at("expected 'val' or 'ref' after 'as'")?;
                MemQual::None
            }
        } else {
            MemQual::None
        };
        let init = if self.match_tok(TokenKind::Assign) { Some(self.expression()?) } else { None };
        self.end_of_statement()?;
        Ok(Stmt::new(StmtKind::VarDecl { name, ty, init, mem_qual }, tok.line))
    }

    fn if_stmt(&mut self) -> PResult<Stmt> {
        let tok = self.advance();
        let cond = self.expression()?;
        self.expect(TokenKind::FatArrow, "expected '=>' after 'if' condition")?;
        let then_branch = self.suite()?;
        let else_branch = if self.peek_kind() == TokenKind::Else {
            self.advance();
            if self.check(TokenKind::If) {
                Some(vec![self.if_stmt()?])
            } else {
                self.expect(TokenKind::FatArrow, "expected '=>' after 'else'")?;
                Some(self.suite()?)
            }
        } else {
            None
        };
        Ok(Stmt::new(StmtKind::If { cond, then_branch, else_branch }, tok.line))
    }

    fn while_stmt(&mut self, is_shared: bool) -> PResult<Stmt> {
        let tok = self.advance();
        let cond = self.expression()?;
        self.expect(TokenKind::FatArrow, "expected '=>' after 'while' condition")?;
        let body = self.suite()?;
        Ok(Stmt::new(StmtKind::While { cond, body, is_shared }, tok.line))
    }

    fn for_or_foreach_stmt(&mut self, is_shared: bool) -> PResult<Stmt> {
        let tok = self.advance();
        let var = self.expect(TokenKind::Ident, "expected loop variable name")?.lexeme.to_string();
        if self.match_tok(TokenKind::In) {
            let iterable = self.expression()?;
            self.expect(TokenKind::FatArrow, "expected '=>' after 'for ... in' header")?;
            let body = self.suite()?;
            return Ok(Stmt::new(StmtKind::ForEach { var, iterable, body, is_shared }, tok.line));
        }
        self.expect(TokenKind::Assign, "expected '=' or 'in' in 'for' header")?;
        let init_expr = self.expression()?;
        let init = Some(Box::new(Stmt::new(
            StmtKind::VarDecl { name: var, ty: None, init: Some(init_expr), mem_qual: MemQual::None },
            tok.line,
        )));
        self.expect(TokenKind::Semi, "expected ';' after 'for' initializer")?;
        let cond = if !self.check(TokenKind::Semi) { Some(self.expression()?) } else { None };
        self.expect(TokenKind::Semi, "expected ';' after 'for' condition")?;
        let incr = if !self.check(TokenKind::FatArrow) { Some(self.expression()?) } else { None };
        self.expect(TokenKind::FatArrow, "expected '=>' after 'for' header")?;
        let body = self.suite()?;
        Ok(Stmt::new(StmtKind::For { init, cond, incr, body, is_shared }, tok.line))
    }

    fn return_stmt(&mut self) -> PResult<Stmt> {
        let tok = self.advance();
        let value = if self.check(TokenKind::Newline) || self.is_at_end() || self.check(TokenKind::Dedent) {
            None
        } else {
            Some(self.expression()?)
        };
        self.end_of_statement()?;
        Ok(Stmt::new(StmtKind::Return(value), tok.line))
    }

    fn expr_stmt(&mut self) -> PResult<Stmt> {
        let line = self.peek().line;
        let expr = self.expression()?;
        self.end_of_statement()?;
        Ok(Stmt::new(StmtKind::Expr(expr), line))
    }

    // ---- expressions: precedence-climbing (spec §4.3 precedence table) ----

    fn expression(&mut self) -> PResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> PResult<Expr> {
        let expr = self.logic_or()?;
        if self.match_tok(TokenKind::Assign) {
            let line = self.previous().line;
            let value = self.assignment()?;
            return Ok(match expr.kind {
                ExprKind::ArrayAccess { array, index } => {
                    Expr::new(ExprKind::IndexAssign { array, index, value: Box::new(value) }, line)
                }
                _ => Expr::new(ExprKind::Assign { target: Box::new(expr), value: Box::new(value) }, line),
            });
        }
        Ok(expr)
    }

    fn logic_or(&mut self) -> PResult<Expr> {
        let mut expr = self.logic_and()?;
        while self.match_tok(TokenKind::OrOr) {
            let line = self.previous().line;
            let right = self.logic_and()?;
            expr = Expr::new(ExprKind::Binary { op: BinOp::Or, left: Box::new(expr), right: Box::new(right) }, line);
        }
        Ok(expr)
    }

    fn logic_and(&mut self) -> PResult<Expr> {
        let mut expr = self.equality()?;
        while self.match_tok(TokenKind::AndAnd) {
            let line = self.previous().line;
            let right = self.equality()?;
            expr = Expr::new(ExprKind::Binary { op: BinOp::And, left: Box::new(expr), right: Box::new(right) }, line);
        }
        Ok(expr)
    }

    fn equality(&mut self) -> PResult<Expr> {
        let mut expr = self.comparison()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Eq => BinOp::Eq,
                TokenKind::NotEq => BinOp::NotEq,
                _ => break,
            };
            let line = self.advance().line;
            let right = self.comparison()?;
            expr = Expr::new(ExprKind::Binary { op, left: Box::new(expr), right: Box::new(right) }, line);
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> PResult<Expr> {
        let mut expr = self.range()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Lt => BinOp::Lt,
                TokenKind::Le => BinOp::Le,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::Ge => BinOp::Ge,
                _ => break,
            };
            let line = self.advance().line;
            let right = self.range()?;
            expr = Expr::new(ExprKind::Binary { op, left: Box::new(expr), right: Box::new(right) }, line);
        }
        Ok(expr)
    }

    fn range(&mut self) -> PResult<Expr> {
        let expr = self.term()?;
        if self.match_tok(TokenKind::DotDot) {
            let line = self.previous().line;
            let end = self.term()?;
            return Ok(Expr::new(ExprKind::Range { start: Box::new(expr), end: Box::new(end) }, line));
        }
        Ok(expr)
    }

    fn term(&mut self) -> PResult<Expr> {
        let mut expr = self.factor()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            let line = self.advance().line;
            let right = self.factor()?;
            expr = Expr::new(ExprKind::Binary { op, left: Box::new(expr), right: Box::new(right) }, line);
        }
        Ok(expr)
    }

    fn factor(&mut self) -> PResult<Expr> {
        let mut expr = self.unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            let line = self.advance().line;
            let right = self.unary()?;
            expr = Expr::new(ExprKind::Binary { op, left: Box::new(expr), right: Box::new(right) }, line);
        }
        Ok(expr)
    }

    fn unary(&mut self) -> PResult<Expr> {
        if self.check(TokenKind::Minus) || self.check(TokenKind::Bang) {
            let tok = self.advance();
            let op = if tok.kind == TokenKind::Minus { UnOp::Neg } else { UnOp::Not };
            let operand = self.unary()?;
            return Ok(Expr::new(ExprKind::Unary { op, operand: Box::new(operand) }, tok.line));
        }
        if self.check(TokenKind::Spawn) {
            let tok = self.advance();
            let modifier = if self.match_tok(TokenKind::Shared) {
                FuncModifier::Shared
            } else if self.match_tok(TokenKind::Private) {
                FuncModifier::Private
            } else {
                FuncModifier::Default
            };
            let call = self.unary()?;
            return Ok(Expr::new(ExprKind::ThreadSpawn { call: Box::new(call), modifier }, tok.line));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            expr = match self.peek_kind() {
                TokenKind::LParen => {
                    self.advance();
                    let args = self.arg_list()?;
                    self.expect(TokenKind::RParen, "expected ')' after arguments")?;
                    let line = expr.line;
                    Expr::new(ExprKind::Call { callee: Box::new(expr), args }, line)
                }
                TokenKind::LBracket => {
                    self.advance();
                    let line = expr.line;
                    if self.check(TokenKind::Colon) {
                        self.advance();
                        let end = if !self.check(TokenKind::RBracket) { Some(Box::new(self.expression()?)) } else { None };
                        self.expect(TokenKind::RBracket, "expected ']' after slice")?;
                        Expr::new(ExprKind::ArraySlice { array: Box::new(expr), start: None, end, step: None, is_from_pointer: false }, line)
                    } else {
                        let index = self.expression()?;
                        if self.match_tok(TokenKind::Colon) {
                            let end = if !self.check(TokenKind::RBracket) { Some(Box::new(self.expression()?)) } else { None };
                            self.expect(TokenKind::RBracket, "expected ']' after slice")?;
                            Expr::new(
                                ExprKind::ArraySlice { array: Box::new(expr), start: Some(Box::new(index)), end, step: None, is_from_pointer: false },
                                line,
                            )
                        } else {
                            self.expect(TokenKind::RBracket, "expected ']' after index")?;
                            Expr::new(ExprKind::ArrayAccess { array: Box::new(expr), index: Box::new(index) }, line)
                        }
                    }
                }
                TokenKind::Dot => {
                    self.advance();
                    let name = self.expect(TokenKind::Ident, "expected member name after '.'")?.lexeme.to_string();
                    let line = expr.line;
                    Expr::new(ExprKind::Member { object: Box::new(expr), name }, line)
                }
                TokenKind::PlusPlus => {
                    let line = self.advance().line;
                    Expr::new(ExprKind::Increment(Box::new(expr)), line)
                }
                TokenKind::MinusMinus => {
                    let line = self.advance().line;
                    Expr::new(ExprKind::Decrement(Box::new(expr)), line)
                }
                // Postfix `!` syncs a pending thread handle (spec §1, §4.3);
                // `[h1, h2]!` batch-syncs a list in source order.
                TokenKind::Bang => {
                    let line = self.advance().line;
                    match expr.kind {
                        ExprKind::Array(elems) => {
                            let list = Expr::new(ExprKind::SyncList(elems), line);
                            Expr::new(ExprKind::ThreadSync { handle: Box::new(list), is_array: true }, line)
                        }
                        _ => Expr::new(ExprKind::ThreadSync { handle: Box::new(expr), is_array: false }, line),
                    }
                }
                // `expr as val` forces a deep copy, lifting the escape
                // restriction on a reference-typed value assigned out of a
                // private scope (spec §4.5). Only `val` applies here; `as
                // ref` is a var-decl-only qualifier (spec §4.3 varDecl).
                TokenKind::As if self.check_next(TokenKind::Val) => {
                    let line = self.advance().line;
                    self.advance();
                    Expr::new(ExprKind::AsVal { operand: Box::new(expr), is_cstr_to_str: false, is_noop: false }, line)
                }
                _ => break,
            };
        }
        Ok(expr)
    }

    fn arg_list(&mut self) -> PResult<Vec<Expr>> {
        let mut args = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                if self.match_tok(TokenKind::DotDotDot) {
                    let line = self.previous().line;
                    let inner = self.expression()?;
                    args.push(Expr::new(ExprKind::Spread(Box::new(inner)), line));
                } else {
                    args.push(self.expression()?);
                }
                if !self.match_tok(TokenKind::Comma) {
                    break;
                }
            }
        }
        Ok(args)
    }

    fn primary(&mut self) -> PResult<Expr> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Int => {
                self.advance();
                let v = match tok.literal { Some(Literal::Int(v)) => v, _ => 0 };
                Ok(Expr::new(ExprKind::IntLiteral(v), tok.line))
            }
            TokenKind::Long => {
                self.advance();
                let v = match tok.literal { Some(Literal::Long(v)) => v, _ => 0 };
                Ok(Expr::new(ExprKind::LongLiteral(v), tok.line))
            }
            TokenKind::Double => {
                self.advance();
                let v = match tok.literal { Some(Literal::Double(v)) => v, _ => 0.0 };
                Ok(Expr::new(ExprKind::DoubleLiteral(v), tok.line))
            }
            TokenKind::Char => {
                self.advance();
                let v = match tok.literal { Some(Literal::Char(v)) => v, _ => '\0' };
                Ok(Expr::new(ExprKind::CharLiteral(v), tok.line))
            }
            TokenKind::Str => {
                self.advance();
                Ok(Expr::new(ExprKind::StringLiteral(self.string_literal_text(&tok)), tok.line))
            }
            TokenKind::InterpolString => {
                self.advance();
                Ok(self.parse_interpolated(&tok))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::new(ExprKind::BoolLiteral(true), tok.line))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::new(ExprKind::BoolLiteral(false), tok.line))
            }
            TokenKind::Nil => {
                self.advance();
                Ok(Expr::new(ExprKind::NilLiteral, tok.line))
            }
            TokenKind::Ident => {
                if self.is_static_call_prefix() {
                    return self.static_call();
                }
                self.advance();
                Ok(Expr::new(ExprKind::Variable(tok.lexeme.to_string()), tok.line))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.expression()?;
                self.expect(TokenKind::RParen, "expected ')' to close grouped expression")?;
                Ok(inner)
            }
            TokenKind::LBracket => self.array_literal(),
            TokenKind::KwInt | TokenKind::KwLong | TokenKind::KwDouble | TokenKind::KwChar
            | TokenKind::KwStr | TokenKind::KwBool | TokenKind::KwByte | TokenKind::KwVoid => {
                self.static_call()
            }
            TokenKind::Fn => self.lambda_expr(FuncModifier::Default),
            TokenKind::Shared | TokenKind::Private => {
                let modifier_tok = self.advance();
                let modifier = if modifier_tok.kind == TokenKind::Shared { FuncModifier::Shared } else { FuncModifier::Private };
                self.expect(TokenKind::Fn, "expected 'fn' after memory modifier in lambda")?;
                self.lambda_expr(modifier)
            }
            _ => {
                self.advance();
                self.error_at(format!("unexpected token '{}' in expression", tok.lexeme))?;
                unreachable!()
            }
        }
    }

    /// True when the parser is sitting on `T::` for a previously declared
    /// `type T = opaque`/`type T = native fn(...)` name, i.e. the start of
    /// a static call on a user type (spec §3 `EXPR_STATIC_CALL`) rather
    /// than an ordinary variable reference.
    fn is_static_call_prefix(&self) -> bool {
        self.check(TokenKind::Ident)
            && self.declared_types.contains(self.peek().lexeme)
            && self.check_at(1, TokenKind::Colon)
            && self.check_at(2, TokenKind::Colon)
    }

    /// `Type::method(args)` static dispatch (e.g. `Array::sized(...)`, spec §3 `EXPR_STATIC_CALL`).
    fn static_call(&mut self) -> PResult<Expr> {
        let type_tok = self.advance();
        if self.match_tok(TokenKind::LBracket) {
            // sized array allocation: `int[n]` / `int[n, default]`
            let elem_type = self.token_as_type(&type_tok)?;
            let size = Box::new(self.expression()?);
            let default = if self.match_tok(TokenKind::Comma) { Some(Box::new(self.expression()?)) } else { None };
            self.expect(TokenKind::RBracket, "expected ']' after array size")?;
            return Ok(Expr::new(ExprKind::SizedArrayAlloc { elem_type, size, default }, type_tok.line));
        }
        self.expect(TokenKind::Colon, "expected ':' in static call")?;
        self.expect(TokenKind::Colon, "expected '::' in static call")?;
        let method_name = self.expect(TokenKind::Ident, "expected method name after '::'")?.lexeme.to_string();
        self.expect(TokenKind::LParen, "expected '(' after static method name")?;
        let args = self.arg_list()?;
        self.expect(TokenKind::RParen, "expected ')' after static call arguments")?;
        Ok(Expr::new(ExprKind::StaticCall { type_name: type_tok.lexeme.to_string(), method_name, args }, type_tok.line))
    }

    fn token_as_type(&self, tok: &Token) -> PResult<Type> {
        Ok(match tok.kind {
            TokenKind::KwInt => Type::Int,
            TokenKind::KwLong => Type::Long,
            TokenKind::KwDouble => Type::Double,
            TokenKind::KwChar => Type::Char,
            TokenKind::KwStr => Type::String,
            TokenKind::KwBool => Type::Bool,
            TokenKind::KwByte => Type::Byte,
            TokenKind::KwVoid => Type::Void,
            _ => Type::Any,
        })
    }

    fn array_literal(&mut self) -> PResult<Expr> {
        let tok = self.advance();
        let mut elems = Vec::new();
        if !self.check(TokenKind::RBracket) {
            loop {
                elems.push(self.expression()?);
                if !self.match_tok(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBracket, "expected ']' to close array literal")?;
        Ok(Expr::new(ExprKind::Array(elems), tok.line))
    }

    fn lambda_expr(&mut self, modifier: FuncModifier) -> PResult<Expr> {
        let tok = self.advance();
        self.expect(TokenKind::LParen, "expected '(' in lambda parameter list")?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                let mem_qual = self.opt_mem_qual();
                let name = self.expect(TokenKind::Ident, "expected lambda parameter name")?.lexeme.to_string();
                let ty = if self.match_tok(TokenKind::Colon) { Some(self.parse_type()?) } else { None };
                params.push(LambdaParam { name, ty, mem_qual });
                if !self.match_tok(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "expected ')' after lambda parameters")?;
        let return_type = if self.match_tok(TokenKind::Colon) { Some(self.parse_type()?) } else { None };
        self.expect(TokenKind::FatArrow, "expected '=>' in lambda")?;
        let body = if self.check(TokenKind::Newline) {
            LambdaBody::Stmts(self.indented_block()?)
        } else {
            LambdaBody::Expr(Box::new(self.expression()?))
        };
        Ok(Expr::new(
            ExprKind::Lambda { params, return_type, body, modifier, is_native: false, captures: Vec::new(), lambda_id: tok.line },
            tok.line,
        ))
    }

    /// `{ part, "literal" {expr:fmt} part }` interpolation (spec §4.2).
    /// The lexer has already split the literal into alternating
    /// text/brace segments joined by `\u{0}`; here we re-lex each
    /// `{...}` segment as a nested expression.
    fn parse_interpolated(&mut self, tok: &Token) -> Expr {
        let raw = match &tok.literal {
            Some(Literal::Str(s)) => *s,
            _ => tok.lexeme,
        };
        let mut parts = Vec::new();
        let mut chars = raw.chars().peekable();
        let mut text = String::new();
        while let Some(c) = chars.next() {
            if c == '{' {
                if !text.is_empty() {
                    parts.push(InterpolPart { text: Some(std::mem::take(&mut text)), expr: None, format_spec: None });
                }
                let mut depth = 1;
                let mut inner = String::new();
                for c2 in chars.by_ref() {
                    if c2 == '{' {
                        depth += 1;
                    } else if c2 == '}' {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    inner.push(c2);
                }
                let (expr_src, fmt_spec) = match inner.split_once(':') {
                    Some((e, f)) => (e.to_string(), Some(f.to_string())),
                    None => (inner, None),
                };
                let sub_parser = Parser::new(self.arena, &expr_src, self.filename.clone());
                let (mut sub_diags, expr) = {
                    let mut p = sub_parser;
                    let e = p.expression();
                    (p.diags, e)
                };
                self.diags.extend(std::mem::take(&mut sub_diags));
                let expr_box = match expr {
                    Ok(e) => Some(Box::new(e)),
                    Err(()) => None,
                };
                parts.push(InterpolPart { text: None, expr: expr_box, format_spec: fmt_spec });
            } else {
                text.push(c);
            }
        }
        if !text.is_empty() {
            parts.push(InterpolPart { text: Some(text), expr: None, format_spec: None });
        }
        Expr::new(ExprKind::Interpolated(parts), tok.line)
    }

    // ---- types ----

    fn parse_type(&mut self) -> PResult<Type> {
        let mut ty = self.parse_atomic_type()?;
        while self.match_tok(TokenKind::LBracket) {
            self.expect(TokenKind::RBracket, "expected ']' in array type")?;
            ty = Type::array(ty);
        }
        Ok(ty)
    }

    fn parse_atomic_type(&mut self) -> PResult<Type> {
        let tok = self.advance();
        Ok(match tok.kind {
            TokenKind::KwInt => Type::Int,
            TokenKind::KwLong => Type::Long,
            TokenKind::KwDouble => Type::Double,
            TokenKind::KwChar => Type::Char,
            TokenKind::KwStr => Type::String,
            TokenKind::KwBool => Type::Bool,
            TokenKind::KwByte => Type::Byte,
            TokenKind::KwVoid => Type::Void,
            TokenKind::Ident => Type::Opaque(tok.lexeme.to_string()),
            TokenKind::Fn => {
                self.expect(TokenKind::LParen, "expected '(' in function type")?;
                let mut params = Vec::new();
                let mut quals = Vec::new();
                let mut is_variadic = false;
                if !self.check(TokenKind::RParen) {
                    loop {
                        if self.match_tok(TokenKind::DotDotDot) {
                            is_variadic = true;
                            break;
                        }
                        quals.push(self.opt_mem_qual());
                        params.push(self.parse_type()?);
                        if !self.match_tok(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RParen, "expected ')' in function type")?;
                let ret = if self.match_tok(TokenKind::Colon) { self.parse_type()? } else { Type::Void };
                Type::function(ret, params, quals, is_variadic, false)
            }
            _ => {
                self.diags.error(self.filename.to_string(), tok.line, format!("expected a type name, found '{}'", tok.lexeme));
                Type::Any
            }
        })
    }
}

pub fn parse_source(arena: &Arena, source: &str, filename: impl Into<Arc<str>>) -> (Module, Diagnostics) {
    Parser::new(arena, source, filename).parse_module()
}

/// Resolves `import` statements across files (spec §4.3 "Import
/// resolution"): canonicalises each import's path, parses a given file at
/// most once per compilation keyed by canonical path (spec invariant 8),
/// and either splices a bare import's statements before the importer's
/// remaining statements or attaches a namespaced import's statements to its
/// `Import` node for the symbol table to register under that namespace
/// (spec §4.3 semantic notes; DESIGN.md "(ADDED) `ImportResolver`").
pub struct ImportResolver {
    /// canonical path -> fully resolved (nested imports already spliced or
    /// attached) top-level statements of that file.
    cache: std::collections::HashMap<std::path::PathBuf, Vec<Stmt>>,
    /// Canonical paths on the current resolution stack; re-entering one is
    /// a true import cycle rather than a diamond-shaped dedup.
    in_progress: std::collections::HashSet<std::path::PathBuf>,
    /// Canonical paths already spliced into the module by a bare import; a
    /// second bare import of the same path is silently dropped.
    spliced: std::collections::HashSet<std::path::PathBuf>,
}

impl ImportResolver {
    pub fn new() -> Self {
        ImportResolver { cache: std::collections::HashMap::new(), in_progress: std::collections::HashSet::new(), spliced: std::collections::HashSet::new() }
    }

    /// Parses `root_path` and recursively resolves every `import` reachable
    /// from it into one flattened `Module`.
    pub fn resolve_root(&mut self, arena: &Arena, root_path: &std::path::Path, diags: &mut Diagnostics) -> Module {
        let Some(canon) = canonicalize_or_report(root_path, diags) else {
            return Module::new(root_path.to_string_lossy().to_string());
        };
        let stmts = self.load(arena, &canon, diags);
        let mut module = Module::new(canon.to_string_lossy().to_string());
        module.stmts = stmts;
        module
    }

    fn load(&mut self, arena: &Arena, canon: &std::path::Path, diags: &mut Diagnostics) -> Vec<Stmt> {
        if let Some(cached) = self.cache.get(canon) {
            return cached.clone();
        }
        if !self.in_progress.insert(canon.to_path_buf()) {
            diags.error(canon.to_string_lossy().to_string(), 0, format!("import cycle detected at '{}'", canon.display()));
            return Vec::new();
        }
        let filename = canon.to_string_lossy().to_string();
        let source = match std::fs::read_to_string(canon) {
            Ok(s) => s,
            Err(e) => {
                diags.error(filename, 0, format!("cannot read imported module '{}': {e}", canon.display()));
                self.in_progress.remove(canon);
                return Vec::new();
            }
        };
        let (module, parse_diags) = parse_source(arena, &source, filename);
        diags.extend(parse_diags);
        let base_dir = canon.parent().map(std::path::Path::to_path_buf).unwrap_or_default();
        let resolved = self.resolve_imports(arena, module.stmts, &base_dir, diags);
        self.in_progress.remove(canon);
        self.cache.insert(canon.to_path_buf(), resolved.clone());
        resolved
    }

    fn resolve_imports(&mut self, arena: &Arena, stmts: Vec<Stmt>, base_dir: &std::path::Path, diags: &mut Diagnostics) -> Vec<Stmt> {
        let mut out = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            let StmtKind::Import { module, namespace, .. } = &stmt.kind else {
                out.push(stmt);
                continue;
            };
            let target = base_dir.join(format!("{module}.sn"));
            let Some(canon) = canonicalize_or_report(&target, diags) else {
                continue;
            };
            let nested = self.load(arena, &canon, diags);
            match namespace {
                None => {
                    // Bare import: splice once per canonical path; a diamond-shaped
                    // import graph drops every later occurrence silently (spec §4.3
                    // steps 3-4).
                    if !self.spliced.insert(canon.clone()) {
                        continue;
                    }
                    out.extend(nested);
                }
                Some(ns) => {
                    // Namespaced import: the symbol table registers `nested` inside
                    // `ns` rather than merging it into the current module (spec §4.3
                    // semantic notes). A bare and namespaced import of the same file
                    // are different forms and do not collapse (SPEC_FULL.md S10),
                    // though both still hit this resolver's per-canonical-path cache.
                    let also_imported_directly = self.spliced.contains(&canon);
                    out.push(Stmt::new(
                        StmtKind::Import {
                            module: module.clone(),
                            namespace: Some(ns.clone()),
                            imported_stmts: Some(nested),
                            also_imported_directly,
                        },
                        stmt.line,
                    ));
                }
            }
        }
        out
    }
}

impl Default for ImportResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn canonicalize_or_report(path: &std::path::Path, diags: &mut Diagnostics) -> Option<std::path::PathBuf> {
    match std::fs::canonicalize(path) {
        Ok(p) => Some(p),
        Err(e) => {
            diags.error(path.to_string_lossy().to_string(), 0, format!("cannot resolve import path '{}': {e}", path.display()));
            None
        }
    }
}

/// Driver entry point (spec §4.3 `parse_module_with_imports`): parses
/// `root_path` and recursively splices/attaches every reachable `import`,
/// returning one `Module` plus the diagnostics accumulated across every
/// file touched.
pub fn parse_module_with_imports(arena: &Arena, root_path: &std::path::Path) -> (Module, Diagnostics) {
    let mut diags = Diagnostics::new();
    let module = ImportResolver::new().resolve_root(arena, root_path, &mut diags);
    (module, diags)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> (Module, Diagnostics) {
        let arena = Arena::new();
        parse_source(&arena, src, "test.sn")
    }

    #[test]
    fn parses_simple_function() {
        let (module, diags) = parse("fn main() =>\n    var x = 1\n    return x\n");
        assert!(!diags.has_errors(), "{diags}");
        assert_eq!(module.stmts.len(), 1);
        match &module.stmts[0].kind {
            StmtKind::Function { name, body, .. } => {
                assert_eq!(name, "main");
                assert_eq!(body.len(), 2);
            }
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn static_call_on_user_declared_opaque_type_parses_as_static_call() {
        let (module, diags) = parse("type Handle = opaque\nfn f() =>\n    var h = Handle::open(\"x\")\n");
        assert!(!diags.has_errors(), "{diags}");
        let body = match &module.stmts[1].kind {
            StmtKind::Function { body, .. } => body,
            other => panic!("expected function, got {other:?}"),
        };
        let StmtKind::VarDecl { init: Some(e), .. } = &body[0].kind else {
            panic!("expected var decl with init");
        };
        match &e.kind {
            ExprKind::StaticCall { type_name, method_name, args } => {
                assert_eq!(type_name, "Handle");
                assert_eq!(method_name, "open");
                assert_eq!(args.len(), 1);
            }
            other => panic!("expected static call, got {other:?}"),
        }
    }

    #[test]
    fn plain_identifier_call_still_parses_as_ordinary_call() {
        let (module, diags) = parse("type Handle = opaque\nfn g(x: int): int =>\n    return x\nfn f() =>\n    var y = g(1)\n");
        assert!(!diags.has_errors(), "{diags}");
        let body = match &module.stmts[1].kind {
            StmtKind::Function { body, .. } => body,
            other => panic!("expected function, got {other:?}"),
        };
        let StmtKind::VarDecl { init: Some(e), .. } = &body[0].kind else {
            panic!("expected var decl with init");
        };
        assert!(matches!(e.kind, ExprKind::Call { .. }), "expected ordinary call, got {:?}", e.kind);
    }

    #[test]
    fn parses_if_else_chain() {
        let (module, diags) = parse("fn f(x: int): int =>\n    if x > 0 =>\n        return 1\n    else =>\n        return 0\n");
        assert!(!diags.has_errors(), "{diags}");
        let body = match &module.stmts[0].kind {
            StmtKind::Function { body, .. } => body,
            _ => panic!("expected function"),
        };
        assert!(matches!(body[0].kind, StmtKind::If { .. }));
    }

    #[test]
    fn parses_binary_precedence() {
        let (module, diags) = parse("fn f() =>\n    var x = 1 + 2 * 3\n");
        assert!(!diags.has_errors(), "{diags}");
        let body = match &module.stmts[0].kind {
            StmtKind::Function { body, .. } => body,
            _ => panic!("expected function"),
        };
        if let StmtKind::VarDecl { init: Some(e), .. } = &body[0].kind {
            match &e.kind {
                ExprKind::Binary { op: BinOp::Add, right, .. } => {
                    assert!(matches!(right.kind, ExprKind::Binary { op: BinOp::Mul, .. }));
                }
                other => panic!("expected Add at top, got {other:?}"),
            }
        } else {
            panic!("expected var init");
        }
    }

    #[test]
    fn parses_thread_spawn() {
        let (module, diags) = parse("fn f() =>\n    var h = @spawn g()\n");
        assert!(!diags.has_errors(), "{diags}");
        let body = match &module.stmts[0].kind {
            StmtKind::Function { body, .. } => body,
            _ => panic!("expected function"),
        };
        if let StmtKind::VarDecl { init: Some(e), .. } = &body[0].kind {
            assert!(matches!(e.kind, ExprKind::ThreadSpawn { .. }));
        } else {
            panic!("expected var init");
        }
    }

    #[test]
    fn parses_postfix_sync_operator() {
        let (module, diags) = parse("fn f() =>\n    var r = h!\n");
        assert!(!diags.has_errors(), "{diags}");
        let body = match &module.stmts[0].kind {
            StmtKind::Function { body, .. } => body,
            _ => panic!("expected function"),
        };
        if let StmtKind::VarDecl { init: Some(e), .. } = &body[0].kind {
            match &e.kind {
                ExprKind::ThreadSync { is_array, .. } => assert!(!is_array),
                other => panic!("expected ThreadSync, got {other:?}"),
            }
        } else {
            panic!("expected var init");
        }
    }

    #[test]
    fn parses_batch_sync_list() {
        let (module, diags) = parse("fn f() =>\n    var r = [h1, h2]!\n");
        assert!(!diags.has_errors(), "{diags}");
        let body = match &module.stmts[0].kind {
            StmtKind::Function { body, .. } => body,
            _ => panic!("expected function"),
        };
        if let StmtKind::VarDecl { init: Some(e), .. } = &body[0].kind {
            match &e.kind {
                ExprKind::ThreadSync { is_array, handle } => {
                    assert!(*is_array);
                    assert!(matches!(handle.kind, ExprKind::SyncList(_)));
                }
                other => panic!("expected ThreadSync, got {other:?}"),
            }
        } else {
            panic!("expected var init");
        }
    }

    #[test]
    fn distinguishes_prefix_not_from_postfix_sync() {
        let (module, diags) = parse("fn f() =>\n    var r = !done\n");
        assert!(!diags.has_errors(), "{diags}");
        let body = match &module.stmts[0].kind {
            StmtKind::Function { body, .. } => body,
            _ => panic!("expected function"),
        };
        if let StmtKind::VarDecl { init: Some(e), .. } = &body[0].kind {
            assert!(matches!(e.kind, ExprKind::Unary { op: UnOp::Not, .. }));
        } else {
            panic!("expected var init");
        }
    }

    #[test]
    fn recovers_from_malformed_statement() {
        let (module, diags) = parse("fn f() =>\n    var = = =\n    return 1\n");
        assert!(diags.has_errors());
        let body = match &module.stmts[0].kind {
            StmtKind::Function { body, .. } => body,
            _ => panic!("expected function"),
        };
        assert!(body.iter().any(|s| matches!(s.kind, StmtKind::Return(_))));
    }

    #[test]
    fn parses_array_index_and_slice() {
        let (module, diags) = parse("fn f() =>\n    var a = xs[1]\n    var b = xs[1:2]\n");
        assert!(!diags.has_errors(), "{diags}");
        let body = match &module.stmts[0].kind {
            StmtKind::Function { body, .. } => body,
            _ => panic!("expected function"),
        };
        if let StmtKind::VarDecl { init: Some(e), .. } = &body[0].kind {
            assert!(matches!(e.kind, ExprKind::ArrayAccess { .. }));
        }
        if let StmtKind::VarDecl { init: Some(e), .. } = &body[1].kind {
            assert!(matches!(e.kind, ExprKind::ArraySlice { .. }));
        }
    }

    #[test]
    fn parses_var_decl_mem_quals() {
        let (module, diags) = parse("fn f() =>\n    var s: str as val = \"\"\n    var x: int as ref = 1\n");
        assert!(!diags.has_errors(), "{diags}");
        let body = match &module.stmts[0].kind {
            StmtKind::Function { body, .. } => body,
            _ => panic!("expected function"),
        };
        assert!(matches!(body[0].kind, StmtKind::VarDecl { mem_qual: MemQual::Val, .. }));
        assert!(matches!(body[1].kind, StmtKind::VarDecl { mem_qual: MemQual::Ref, .. }));
    }

    #[test]
    fn parses_shared_while_and_for_loops() {
        let (module, diags) = parse("fn f() =>\n    shared while true =>\n        break\n    shared for i = 0; i < 1; i = i + 1 =>\n        break\n");
        assert!(!diags.has_errors(), "{diags}");
        let body = match &module.stmts[0].kind {
            StmtKind::Function { body, .. } => body,
            _ => panic!("expected function"),
        };
        assert!(matches!(body[0].kind, StmtKind::While { is_shared: true, .. }));
        assert!(matches!(body[1].kind, StmtKind::For { is_shared: true, .. }));
    }

    #[test]
    fn parses_postfix_as_val_on_assignment_value() {
        let (module, diags) = parse("fn f() =>\n    var s: str = \"\"\n    s = \"hello\" as val\n");
        assert!(!diags.has_errors(), "{diags}");
        let body = match &module.stmts[0].kind {
            StmtKind::Function { body, .. } => body,
            _ => panic!("expected function"),
        };
        if let StmtKind::Expr(e) = &body[1].kind {
            if let ExprKind::Assign { value, .. } = &e.kind {
                assert!(matches!(value.kind, ExprKind::AsVal { .. }));
            } else {
                panic!("expected assignment, got {:?}", e.kind);
            }
        } else {
            panic!("expected expr statement");
        }
    }

    fn write_module(dir: &std::path::Path, name: &str, src: &str) {
        std::fs::write(dir.join(format!("{name}.sn")), src).unwrap();
    }

    /// SPEC_FULL.md S6: `a` imports `b` and `c`, `c` imports `b`; `b`'s
    /// definitions appear exactly once, ahead of both `a`'s and `c`'s.
    #[test]
    fn import_resolution_dedups_diamond_shaped_imports() {
        let dir = tempfile::tempdir().unwrap();
        write_module(dir.path(), "b", "fn from_b() =>\n    return\n");
        write_module(dir.path(), "c", "import \"b\"\nfn from_c() =>\n    return\n");
        write_module(dir.path(), "a", "import \"b\"\nimport \"c\"\nfn from_a() =>\n    return\n");

        let arena = Arena::new();
        let (module, diags) = parse_module_with_imports(&arena, &dir.path().join("a.sn"));
        assert!(!diags.has_errors(), "{diags}");

        let names: Vec<&str> = module
            .stmts
            .iter()
            .filter_map(|s| match &s.kind {
                StmtKind::Function { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(names.iter().filter(|n| **n == "from_b").count(), 1, "{names:?}");
        let b_pos = names.iter().position(|n| *n == "from_b").unwrap();
        let a_pos = names.iter().position(|n| *n == "from_a").unwrap();
        let c_pos = names.iter().position(|n| *n == "from_c").unwrap();
        assert!(b_pos < a_pos && b_pos < c_pos, "{names:?}");
    }

    #[test]
    fn namespaced_import_is_not_spliced_into_top_level() {
        let dir = tempfile::tempdir().unwrap();
        write_module(dir.path(), "utils", "fn helper() =>\n    return\n");
        write_module(dir.path(), "main", "import \"utils\" as utils\nfn entry() =>\n    return\n");

        let arena = Arena::new();
        let (module, diags) = parse_module_with_imports(&arena, &dir.path().join("main.sn"));
        assert!(!diags.has_errors(), "{diags}");
        assert!(!module.stmts.iter().any(|s| matches!(&s.kind, StmtKind::Function { name, .. } if name == "helper")));
        let import_stmt = module.stmts.iter().find(|s| matches!(&s.kind, StmtKind::Import { .. })).unwrap();
        let StmtKind::Import { imported_stmts, namespace, .. } = &import_stmt.kind else { unreachable!() };
        assert_eq!(namespace.as_deref(), Some("utils"));
        let nested = imported_stmts.as_ref().unwrap();
        assert!(nested.iter().any(|s| matches!(&s.kind, StmtKind::Function { name, .. } if name == "helper")));
    }

    #[test]
    fn import_cycle_is_reported_as_a_diagnostic_not_infinite_recursion() {
        let dir = tempfile::tempdir().unwrap();
        write_module(dir.path(), "a", "import \"b\"\nfn from_a() =>\n    return\n");
        write_module(dir.path(), "b", "import \"a\"\nfn from_b() =>\n    return\n");

        let arena = Arena::new();
        let (_module, diags) = parse_module_with_imports(&arena, &dir.path().join("a.sn"));
        assert!(diags.has_errors());
        assert!(diags.iter().any(|d| d.message.contains("cycle")));
    }
}
