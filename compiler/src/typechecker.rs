//! Type checker (spec §4.5)
//!
//! Walks a parsed `Module`, assigning a `Type` to every `Expr` (memoized via
//! `Expr::set_type`) and validating numeric promotion, memory-qualifier
//! escape analysis, and the thread-handle state machine. Diagnostics
//! accumulate in a shared `Diagnostics` rather than aborting on the first
//! mismatch, mirroring the parser's recovery discipline.

use crate::ast::*;
use crate::builtins::builtin_signature;
use crate::diagnostics::Diagnostics;
use crate::symbol::{Symbol, SymbolKind, SymbolTable};

pub struct TypeChecker {
    symbols: SymbolTable,
    diags: Diagnostics,
    filename: String,
    loop_depth: usize,
    /// Function-modifier context, used by escape analysis when a `private`
    /// function returns or assigns a reference-typed value outward (spec §4.5).
    func_mod_stack: Vec<FuncModifier>,
}

impl TypeChecker {
    pub fn new(filename: impl Into<String>) -> Self {
        TypeChecker {
            symbols: SymbolTable::new(),
            diags: Diagnostics::new(),
            filename: filename.into(),
            loop_depth: 0,
            func_mod_stack: vec![FuncModifier::Default],
        }
    }

    pub fn check(mut self, module: &Module) -> Diagnostics {
        self.declare_top_level(module);
        for stmt in &module.stmts {
            self.check_stmt(stmt);
        }
        self.diags
    }

    fn err(&mut self, line: usize, msg: impl Into<String>) {
        self.diags.error(self.filename.clone(), line, msg);
    }

    /// First pass: register every top-level function/type/var so forward
    /// references between sibling functions resolve (spec §4.4).
    fn declare_top_level(&mut self, module: &Module) {
        for stmt in &module.stmts {
            match &stmt.kind {
                StmtKind::Function { name, params, return_type, modifier, is_native, is_variadic, .. } => {
                    let ty = self.function_type(params, return_type, *is_variadic, *is_native);
                    self.symbols.add_symbol(Symbol::function(name.clone(), ty, *modifier, *is_native));
                }
                StmtKind::TypeDecl { name, ty } => {
                    self.symbols.add_symbol_with_kind(name.clone(), ty.clone(), SymbolKind::TypeDecl);
                }
                // `import "m" as ns` registers `m`'s top-level functions inside a
                // namespace symbol rather than the current scope (spec §4.3
                // semantic notes); a bare import has already been spliced by the
                // resolver, so its functions appear as ordinary `Function` stmts above.
                StmtKind::Import { namespace: Some(ns), imported_stmts: Some(nested), .. } => {
                    self.symbols.add_namespace(ns.clone());
                    for nstmt in nested {
                        if let StmtKind::Function { name, params, return_type, modifier, is_native, is_variadic, .. } = &nstmt.kind {
                            let ty = self.function_type(params, return_type, *is_variadic, *is_native);
                            let _ = self.symbols.add_function_to_namespace(ns, name.clone(), ty, *modifier, *is_native);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn function_type(&self, params: &[LambdaParam], return_type: &Option<Type>, is_variadic: bool, is_native: bool) -> Type {
        let param_types: Vec<Type> = params.iter().map(|p| p.ty.clone().unwrap_or(Type::Any)).collect();
        let mem_quals: Vec<MemQual> = params.iter().map(|p| p.mem_qual).collect();
        Type::function(return_type.clone().unwrap_or(Type::Void), param_types, mem_quals, is_variadic, is_native)
    }

    // ---- statements ----

    fn check_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Expr(e) => {
                self.check_expr(e);
            }
            StmtKind::VarDecl { name, ty, init, .. } => {
                let init_ty = init.as_ref().map(|e| self.check_expr(e));
                let declared = ty.clone().or_else(|| init_ty.clone()).unwrap_or(Type::Any);
                if let (Some(declared), Some(actual)) = (ty, &init_ty) {
                    self.check_assignable(stmt.line, declared, actual);
                }
                self.symbols.add_symbol_with_kind(name.clone(), declared, SymbolKind::Local);
            }
            StmtKind::Function { name, params, return_type, body, modifier, is_native, is_variadic } => {
                self.check_function_body(name, params, return_type, body, *modifier, *is_native, *is_variadic);
            }
            StmtKind::Return(value) => {
                if let Some(e) = value {
                    self.check_expr(e);
                }
            }
            StmtKind::Block { stmts, modifier } => {
                self.symbols.push_scope();
                let func_mod = match modifier {
                    BlockModifier::Shared => FuncModifier::Shared,
                    BlockModifier::Private => FuncModifier::Private,
                    BlockModifier::Default => *self.func_mod_stack.last().unwrap(),
                };
                self.func_mod_stack.push(func_mod);
                // Only a `private` block creates its own arena (spec §4.6 arena
                // plumbing table); `shared` and default blocks reuse the
                // enclosing one, so nothing can dangle by escaping them.
                let owns_arena = matches!(modifier, BlockModifier::Private);
                if owns_arena {
                    self.symbols.enter_arena_context();
                }
                for s in stmts {
                    self.check_stmt(s);
                }
                if owns_arena {
                    self.symbols.exit_arena_context();
                }
                self.func_mod_stack.pop();
                if let Err(e) = self.symbols.pop_scope() {
                    self.err(stmt.line, e);
                }
            }
            StmtKind::If { cond, then_branch, else_branch } => {
                let cond_ty = self.check_expr(cond);
                if cond_ty != Type::Bool && cond_ty != Type::Any {
                    self.err(stmt.line, format!("'if' condition must be bool, found {cond_ty:?}"));
                }
                self.check_sub_block(then_branch);
                if let Some(eb) = else_branch {
                    self.check_sub_block(eb);
                }
            }
            StmtKind::While { cond, body, is_shared } => {
                let cond_ty = self.check_expr(cond);
                if cond_ty != Type::Bool && cond_ty != Type::Any {
                    self.err(stmt.line, format!("'while' condition must be bool, found {cond_ty:?}"));
                }
                self.loop_depth += 1;
                self.symbols.push_scope();
                if !*is_shared {
                    self.symbols.enter_arena_context();
                }
                for s in body {
                    self.check_stmt(s);
                }
                if !*is_shared {
                    self.symbols.exit_arena_context();
                }
                if let Err(e) = self.symbols.pop_scope() {
                    self.err(stmt.line, e);
                }
                self.loop_depth -= 1;
            }
            StmtKind::For { init, cond, incr, body, is_shared } => {
                self.symbols.push_scope();
                if let Some(init) = init {
                    self.check_stmt(init);
                }
                if let Some(cond) = cond {
                    let cond_ty = self.check_expr(cond);
                    if cond_ty != Type::Bool && cond_ty != Type::Any {
                        self.err(stmt.line, format!("'for' condition must be bool, found {cond_ty:?}"));
                    }
                }
                if let Some(incr) = incr {
                    self.check_expr(incr);
                }
                self.loop_depth += 1;
                if !*is_shared {
                    self.symbols.enter_arena_context();
                }
                for s in body {
                    self.check_stmt(s);
                }
                if !*is_shared {
                    self.symbols.exit_arena_context();
                }
                self.loop_depth -= 1;
                if let Err(e) = self.symbols.pop_scope() {
                    self.err(stmt.line, e);
                }
            }
            StmtKind::ForEach { var, iterable, body, is_shared } => {
                let iter_ty = self.check_expr(iterable);
                let elem_ty = match &iter_ty {
                    Type::Array(inner) => (**inner).clone(),
                    Type::String => Type::Char,
                    _ => Type::Any,
                };
                self.symbols.push_scope();
                self.symbols.add_symbol_with_kind(var.clone(), elem_ty, SymbolKind::Local);
                self.loop_depth += 1;
                if !*is_shared {
                    self.symbols.enter_arena_context();
                }
                for s in body {
                    self.check_stmt(s);
                }
                if !*is_shared {
                    self.symbols.exit_arena_context();
                }
                self.loop_depth -= 1;
                if let Err(e) = self.symbols.pop_scope() {
                    self.err(stmt.line, e);
                }
            }
            StmtKind::Break | StmtKind::Continue => {
                if self.loop_depth == 0 {
                    self.err(stmt.line, "'break'/'continue' used outside of a loop");
                }
            }
            StmtKind::Import { namespace: Some(_), imported_stmts: Some(nested), .. } => {
                // Type-check the namespaced module's own statements in an isolated
                // symbol table (its functions resolve each other by bare name, the
                // same as within any standalone module) so every nested `Expr` gets
                // an `expr_type` for the code generator (spec invariant 1).
                let nested_module = Module { filename: self.filename.clone(), stmts: nested.clone() };
                let nested_diags = TypeChecker::new(self.filename.clone()).check(&nested_module);
                self.diags.extend(nested_diags);
            }
            StmtKind::Import { .. } => {}
            StmtKind::Pragma { .. } => {}
            StmtKind::TypeDecl { name, ty } => {
                self.symbols.add_symbol_with_kind(name.clone(), ty.clone(), SymbolKind::TypeDecl);
            }
        }
    }

    fn check_sub_block(&mut self, stmts: &[Stmt]) {
        self.symbols.push_scope();
        for s in stmts {
            self.check_stmt(s);
        }
        if let Err(e) = self.symbols.pop_scope() {
            self.err(stmts.first().map(|s| s.line).unwrap_or(0), e);
        }
    }

    fn check_function_body(
        &mut self,
        _name: &str,
        params: &[LambdaParam],
        return_type: &Option<Type>,
        body: &[Stmt],
        modifier: FuncModifier,
        is_native: bool,
        _is_variadic: bool,
    ) {
        if is_native {
            return;
        }
        self.symbols.push_scope();
        self.func_mod_stack.push(modifier);
        // `shared` functions receive the caller's arena rather than creating
        // their own, and one returning a reference type is implicitly
        // promoted to `shared` so the return value outlives the function's
        // own arena (spec §4.6 arena plumbing table) — neither bumps depth.
        let promoted_shared = return_type.as_ref().is_some_and(Type::is_reference_type);
        let owns_arena = !matches!(modifier, FuncModifier::Shared) && !promoted_shared;
        if owns_arena {
            self.symbols.enter_arena_context();
        }
        for p in params {
            self.symbols.add_symbol_with_kind(p.name.clone(), p.ty.clone().unwrap_or(Type::Any), SymbolKind::Param);
        }
        for s in body {
            self.check_stmt(s);
        }
        if owns_arena {
            self.symbols.exit_arena_context();
        }
        self.func_mod_stack.pop();
        let _ = self.symbols.pop_scope();
    }

    // ---- expressions ----

    fn check_expr(&mut self, expr: &Expr) -> Type {
        if let Some(cached) = expr.get_type() {
            return cached;
        }
        let ty = self.infer_expr(expr);
        expr.set_type(ty.clone());
        ty
    }

    fn infer_expr(&mut self, expr: &Expr) -> Type {
        match &expr.kind {
            ExprKind::IntLiteral(_) => Type::Int,
            ExprKind::LongLiteral(_) => Type::Long,
            ExprKind::DoubleLiteral(_) => Type::Double,
            ExprKind::CharLiteral(_) => Type::Char,
            ExprKind::StringLiteral(_) => Type::String,
            ExprKind::BoolLiteral(_) => Type::Bool,
            ExprKind::NilLiteral => Type::Nil,
            ExprKind::Interpolated(parts) => {
                for part in parts {
                    if let Some(e) = &part.expr {
                        self.check_expr(e);
                    }
                }
                Type::String
            }
            ExprKind::Variable(name) => match self.symbols.lookup_symbol(name) {
                Some(sym) => sym.ty.clone(),
                None => {
                    self.err(expr.line, format!("undefined variable '{name}'"));
                    Type::Any
                }
            },
            ExprKind::Binary { op, left, right } => self.check_binary(expr.line, *op, left, right),
            ExprKind::Unary { op, operand } => {
                let ty = self.check_expr(operand);
                match op {
                    UnOp::Neg if ty.is_numeric() => ty,
                    UnOp::Not if ty == Type::Bool => Type::Bool,
                    UnOp::Neg | UnOp::Not => {
                        self.err(expr.line, format!("unary operator not defined for {ty:?}"));
                        ty
                    }
                }
            }
            ExprKind::Assign { target, value } => {
                let target_ty = self.check_expr(target);
                let value_ty = self.check_expr(value);
                self.check_assignable(expr.line, &target_ty, &value_ty);
                if let ExprKind::Variable(name) = &target.kind {
                    self.check_escape(expr.line, name, &value_ty, value);
                }
                target_ty
            }
            ExprKind::IndexAssign { array, index, value } => {
                let arr_ty = self.check_expr(array);
                let idx_ty = self.check_expr(index);
                if idx_ty != Type::Int && idx_ty != Type::Any {
                    self.err(expr.line, "array index must be int");
                }
                let val_ty = self.check_expr(value);
                if let Type::Array(elem) = &arr_ty {
                    self.check_assignable(expr.line, elem, &val_ty);
                    (**elem).clone()
                } else {
                    val_ty
                }
            }
            ExprKind::Call { callee, args } => self.check_call(expr.line, callee, args),
            ExprKind::Array(elems) => {
                let mut elem_ty = None;
                for e in elems {
                    let t = self.check_expr(e);
                    elem_ty.get_or_insert(t);
                }
                Type::array(elem_ty.unwrap_or(Type::Any))
            }
            ExprKind::ArrayAccess { array, index } => {
                let arr_ty = self.check_expr(array);
                let idx_ty = self.check_expr(index);
                if idx_ty != Type::Int && idx_ty != Type::Any {
                    self.err(expr.line, "array index must be int");
                }
                match arr_ty {
                    Type::Array(inner) => *inner,
                    Type::String => Type::Char,
                    _ => Type::Any,
                }
            }
            ExprKind::ArraySlice { array, start, end, step, .. } => {
                let arr_ty = self.check_expr(array);
                if let Some(s) = start {
                    self.check_expr(s);
                }
                if let Some(e) = end {
                    self.check_expr(e);
                }
                if let Some(s) = step {
                    self.check_expr(s);
                }
                arr_ty
            }
            ExprKind::Range { start, end } => {
                let s = self.check_expr(start);
                let e = self.check_expr(end);
                if !s.is_numeric() || !e.is_numeric() {
                    self.err(expr.line, "range bounds must be numeric");
                }
                Type::array(Type::Int)
            }
            ExprKind::Spread(inner) => self.check_expr(inner),
            ExprKind::Increment(inner) | ExprKind::Decrement(inner) => {
                let ty = self.check_expr(inner);
                if !ty.is_numeric() {
                    self.err(expr.line, "increment/decrement requires a numeric operand");
                }
                ty
            }
            ExprKind::Member { object, name } => {
                if let ExprKind::Variable(ns) = &object.kind {
                    if self.symbols.is_namespace(ns) {
                        self.check_expr(object);
                        return match self.symbols.lookup_in_namespace(ns, name) {
                            Some(sym) => sym.ty.clone(),
                            None => {
                                self.err(expr.line, format!("'{ns}' has no member '{name}'"));
                                Type::Any
                            }
                        };
                    }
                }
                let object_ty = self.check_expr(object);
                if let Type::Array(elem) = &object_ty {
                    if let Some(ty) = array_member_type(elem, name) {
                        return ty;
                    }
                    self.err(expr.line, format!("array has no member '{name}'"));
                    return Type::Any;
                }
                Type::Any
            }
            ExprKind::StaticCall { args, .. } => {
                for a in args {
                    self.check_expr(a);
                }
                Type::Any
            }
            ExprKind::SizedArrayAlloc { elem_type, size, default } => {
                let size_ty = self.check_expr(size);
                if size_ty != Type::Int && size_ty != Type::Any {
                    self.err(expr.line, "array size must be int");
                }
                if let Some(d) = default {
                    let dty = self.check_expr(d);
                    self.check_assignable(expr.line, elem_type, &dty);
                }
                Type::array(elem_type.clone())
            }
            ExprKind::ThreadSpawn { call, .. } => {
                let ret = self.check_expr(call);
                Type::ThreadHandle { inner: Box::new(ret), state: ThreadState::Pending }
            }
            ExprKind::ThreadSync { handle, is_array } => {
                let handle_ty = self.check_expr(handle);
                if let ExprKind::Variable(name) = &handle.kind {
                    if let Err(e) = self.symbols.sync_variable(name) {
                        self.err(expr.line, e);
                    }
                }
                match handle_ty {
                    Type::ThreadHandle { inner, .. } if *is_array => Type::array(*inner),
                    Type::ThreadHandle { inner, .. } => *inner,
                    _ => Type::Any,
                }
            }
            ExprKind::SyncList(handles) => {
                for h in handles {
                    self.check_expr(h);
                    if let ExprKind::Variable(name) = &h.kind {
                        if let Err(e) = self.symbols.sync_variable(name) {
                            self.err(expr.line, e);
                        }
                    }
                }
                Type::Void
            }
            ExprKind::AsVal { operand, .. } => self.check_expr(operand),
            ExprKind::Lambda { params, return_type, body, modifier, .. } => {
                self.symbols.push_scope();
                self.func_mod_stack.push(*modifier);
                let promoted_shared = return_type.as_ref().is_some_and(Type::is_reference_type);
                let owns_arena = !matches!(modifier, FuncModifier::Shared) && !promoted_shared;
                if owns_arena {
                    self.symbols.enter_arena_context();
                }
                for p in params {
                    self.symbols.add_symbol_with_kind(p.name.clone(), p.ty.clone().unwrap_or(Type::Any), SymbolKind::Param);
                }
                match body {
                    LambdaBody::Expr(e) => {
                        self.check_expr(e);
                    }
                    LambdaBody::Stmts(stmts) => {
                        for s in stmts {
                            self.check_stmt(s);
                        }
                    }
                }
                if owns_arena {
                    self.symbols.exit_arena_context();
                }
                self.func_mod_stack.pop();
                let _ = self.symbols.pop_scope();
                self.function_type(params, return_type, false, false)
            }
        }
    }

    fn check_binary(&mut self, line: usize, op: BinOp, left: &Expr, right: &Expr) -> Type {
        let lt = self.check_expr(left);
        let rt = self.check_expr(right);
        match op {
            BinOp::Add if (lt == Type::String && rt.is_printable()) || (rt == Type::String && lt.is_printable()) => {
                Type::String
            }
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => {
                if let Some(promoted) = lt.promote(&rt) {
                    promoted
                } else if lt == Type::Any || rt == Type::Any {
                    Type::Any
                } else {
                    self.err(line, format!("arithmetic operator not defined for {lt:?} and {rt:?}"));
                    Type::Any
                }
            }
            BinOp::Eq | BinOp::NotEq => Type::Bool,
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                if lt.promote(&rt).is_none() && lt != Type::Any && rt != Type::Any {
                    self.err(line, format!("comparison not defined for {lt:?} and {rt:?}"));
                }
                Type::Bool
            }
            BinOp::And | BinOp::Or => {
                if lt != Type::Bool && lt != Type::Any {
                    self.err(line, "logical operator requires bool operands");
                }
                if rt != Type::Bool && rt != Type::Any {
                    self.err(line, "logical operator requires bool operands");
                }
                Type::Bool
            }
        }
    }

    fn check_call(&mut self, line: usize, callee: &Expr, args: &[Expr]) -> Type {
        let arg_types: Vec<Type> = args.iter().map(|a| self.check_expr(a)).collect();
        if let ExprKind::Member { object, name } = &callee.kind {
            if let ExprKind::Variable(ns) = &object.kind {
                if self.symbols.is_namespace(ns) {
                    self.check_expr(object);
                    return match self.symbols.lookup_in_namespace(ns, name) {
                        Some(Symbol { ty: Type::Function { ret, params, is_variadic, .. }, .. }) => {
                            if !*is_variadic && params.len() != arg_types.len() {
                                self.err(line, format!("'{ns}.{name}' expects {} argument(s), found {}", params.len(), arg_types.len()));
                            }
                            (**ret).clone()
                        }
                        Some(_) => {
                            self.err(line, format!("'{ns}.{name}' is not callable"));
                            Type::Any
                        }
                        None => {
                            self.err(line, format!("'{ns}' has no member '{name}'"));
                            Type::Any
                        }
                    };
                }
            }
            let object_ty = self.check_expr(object);
            if let Type::Array(elem) = &object_ty {
                let Some(Type::Function { ret, params, .. }) = array_member_type(elem, name) else {
                    self.err(line, format!("array has no method '{name}'"));
                    return Type::Any;
                };
                if params.len() != arg_types.len() {
                    self.err(line, format!("'{name}' expects {} argument(s), found {}", params.len(), arg_types.len()));
                }
                return *ret;
            }
        }
        if let ExprKind::Variable(name) = &callee.kind {
            if let Some(sig) = builtin_signature(name) {
                return match &sig.ty {
                    Type::Function { ret, .. } => (**ret).clone(),
                    _ => Type::Any,
                };
            }
            if let Some(sym) = self.symbols.lookup_symbol(name) {
                if let Type::Function { ret, params, is_variadic, .. } = &sym.ty {
                    if !*is_variadic && params.len() != arg_types.len() {
                        self.err(
                            line,
                            format!("'{name}' expects {} argument(s), found {}", params.len(), arg_types.len()),
                        );
                    }
                    return (**ret).clone();
                }
                self.err(line, format!("'{name}' is not callable"));
                return Type::Any;
            }
            self.err(line, format!("call to undefined function '{name}'"));
            return Type::Any;
        }
        let callee_ty = self.check_expr(callee);
        match callee_ty {
            Type::Function { ret, .. } => *ret,
            _ => Type::Any,
        }
    }

    fn check_assignable(&mut self, line: usize, declared: &Type, actual: &Type) {
        if declared == &Type::Any || actual == &Type::Any {
            return;
        }
        if declared == actual {
            return;
        }
        if declared.is_numeric() && actual.is_numeric() && declared.promote(actual) == Some(declared.clone()) {
            return;
        }
        self.err(line, format!("cannot assign {actual:?} to a variable of type {declared:?}"));
    }

    /// A reference-typed value (string, array, function) allocated in a
    /// deeper arena — a `private` block/function, a non-`shared` lambda, or
    /// a non-`shared` loop iteration — cannot be assigned into a variable
    /// declared in a shallower one: that arena is destroyed before the
    /// assignment's target is next read, leaving a dangling reference (spec
    /// §4.5 escape analysis, §4.6 arena plumbing). `as val` forces a deep
    /// copy and lifts the restriction.
    fn check_escape(&mut self, line: usize, target_name: &str, value_ty: &Type, value: &Expr) {
        if !value_ty.is_reference_type() || matches!(value.kind, ExprKind::AsVal { .. }) {
            return;
        }
        let Some(target_depth) = self.symbols.lookup_symbol(target_name).map(|s| s.arena_depth) else {
            return;
        };
        if target_depth < self.symbols.current_arena_depth {
            self.err(
                line,
                format!(
                    "reference-typed value may not escape a private scope into outer variable '{target_name}'; use 'as val' to copy it"
                ),
            );
        }
    }
}

/// Array built-in member types (spec §4.5 Member rule, DESIGN.md Open
/// Question 2 — the "precise" resolution: each array method/property has its
/// exact type rather than a blanket `nil`/`any`).
fn array_member_type(elem: &Type, name: &str) -> Option<Type> {
    let arr = Type::array(elem.clone());
    Some(match name {
        "length" => Type::Int,
        "push" => Type::function(Type::Void, vec![elem.clone()], vec![MemQual::Val], false, false),
        "pop" => Type::function(elem.clone(), vec![], vec![], false, false),
        "clear" => Type::function(Type::Void, vec![], vec![], false, false),
        "concat" => Type::function(arr, vec![Type::array(elem.clone())], vec![MemQual::Val], false, false),
        _ => return None,
    })
}

pub fn check_module(filename: impl Into<String>, module: &Module) -> Diagnostics {
    TypeChecker::new(filename).check(module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;
    use crate::arena::Arena;

    fn check(src: &str) -> Diagnostics {
        let arena = Arena::new();
        let (module, parse_diags) = parse_source(&arena, src, "test.sn");
        assert!(!parse_diags.has_errors(), "{parse_diags}");
        check_module("test.sn", &module)
    }

    #[test]
    fn accepts_well_typed_function() {
        let diags = check("fn add(a: int, b: int): int =>\n    return a + b\n");
        assert!(!diags.has_errors(), "{diags}");
    }

    #[test]
    fn rejects_undefined_variable() {
        let diags = check("fn f() =>\n    return y\n");
        assert!(diags.has_errors());
    }

    #[test]
    fn promotes_int_to_double_on_assign() {
        let diags = check("fn f() =>\n    var x: double = 1\n");
        assert!(!diags.has_errors(), "{diags}");
    }

    #[test]
    fn rejects_break_outside_loop() {
        let diags = check("fn f() =>\n    break\n");
        assert!(diags.has_errors());
    }

    #[test]
    fn string_plus_printable_concatenates_to_string() {
        let diags = check("fn f() =>\n    var x: str = \"count: \" + 1\n");
        assert!(!diags.has_errors(), "{diags}");
        let diags = check("fn f() =>\n    var x: str = 1 + \"count\"\n");
        assert!(!diags.has_errors(), "{diags}");
    }

    #[test]
    fn thread_sync_after_spawn_resolves_inner_type() {
        let diags = check("fn g(): int =>\n    return 1\nfn f() =>\n    var h = @spawn g()\n    var r = h!\n");
        assert!(!diags.has_errors(), "{diags}");
    }

    #[test]
    fn rejects_private_block_string_escape() {
        let diags = check("fn main() =>\n    var s: str = \"\"\n    private =>\n        s = \"hello\"\n");
        assert!(diags.has_errors(), "{diags}");
    }

    #[test]
    fn as_val_lifts_private_block_escape_restriction() {
        let diags = check("fn main() =>\n    var s: str = \"\"\n    private =>\n        s = \"hello\" as val\n");
        assert!(!diags.has_errors(), "{diags}");
    }

    #[test]
    fn shared_block_may_assign_reference_value_to_outer_variable() {
        let diags = check("fn main() =>\n    var s: str = \"\"\n    shared =>\n        s = \"hello\"\n");
        assert!(!diags.has_errors(), "{diags}");
    }

    #[test]
    fn private_block_may_freely_escape_primitive_values() {
        let diags = check("fn main() =>\n    var x: int = 0\n    private =>\n        x = 5\n");
        assert!(!diags.has_errors(), "{diags}");
    }

    #[test]
    fn function_returning_string_is_promoted_shared_and_may_assign_into_its_own_locals() {
        let diags = check("fn make(): str =>\n    var s: str = \"\"\n    s = \"hello\"\n    return s\n");
        assert!(!diags.has_errors(), "{diags}");
    }
}
