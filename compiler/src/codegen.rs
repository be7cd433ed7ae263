//! C code generation (spec §4.6)
//!
//! # Code Generation Strategy
//!
//! Every non-native function receives a trailing hidden `RtArena *__arena`
//! parameter. At entry:
//! - a `default`-modifier function creates a fresh child arena from the
//!   incoming one (`rt_arena_create(__arena)`) and destroys it on every
//!   return path;
//! - a `shared`-modifier function reuses the incoming arena directly, no
//!   create/destroy pair;
//! - a `private`-modifier function behaves like `default`, plus the type
//!   checker has already rejected `ref`-qualified reference values escaping
//!   it (spec §4.5).
//!
//! `main` has no caller arena, so it creates the process's root arena
//! itself and destroys it just before returning.
//!
//! # Runtime Function Declarations
//!
//! Every call into the runtime crate follows `rt_<name>(RtArena *arena, ...)`
//! — the arena parameter always comes first, ahead of any variadic tail
//! (spec REDESIGN FLAGS / Open Question resolutions, DESIGN.md item 4).

use crate::ast::*;
use crate::builtins::builtin_signature;
use std::collections::HashMap;
use std::fmt::Write as _;

#[derive(Debug)]
pub enum CodeGenError {
    Logic(String),
    Format(std::fmt::Error),
}

impl std::fmt::Display for CodeGenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodeGenError::Logic(s) => write!(f, "{s}"),
            CodeGenError::Format(e) => write!(f, "C generation error: {e}"),
        }
    }
}

impl std::error::Error for CodeGenError {}

impl From<String> for CodeGenError {
    fn from(s: String) -> Self {
        CodeGenError::Logic(s)
    }
}

impl From<std::fmt::Error> for CodeGenError {
    fn from(e: std::fmt::Error) -> Self {
        CodeGenError::Format(e)
    }
}

type CgResult<T> = Result<T, CodeGenError>;

/// Mangle a source identifier into a valid C identifier, escaping
/// characters the lexer accepts in names (spec §4.2 identifier grammar)
/// but C does not.
fn mangle_name(name: &str) -> String {
    let mut result = String::from("sn_");
    for c in name.chars() {
        match c {
            '_' => result.push('_'),
            c if c.is_alphanumeric() => result.push(c),
            _ => {
                let _ = write!(result, "_{:02X}_", c as u32);
            }
        }
    }
    result
}

pub struct CodeGen {
    out: String,
    indent: usize,
    lambda_counter: usize,
    arena_depth: usize,
    loop_counter: usize,
    /// Lambdas hoisted to top-level C functions, emitted after the triggering statement's
    /// enclosing function (spec §4.6 "Lambda/closure emission").
    hoisted: Vec<String>,
    /// Per-iteration loop arena stack (spec §4.6 arena plumbing table): the
    /// innermost entry is consulted by `break`/`continue` lowering. `None`
    /// marks a `shared` loop, which owns no per-iteration arena and lowers
    /// `break`/`continue` as plain C statements.
    loop_stack: Vec<Option<LoopArena>>,
}

#[derive(Clone)]
struct LoopArena {
    arena_var: String,
    cleanup_label: String,
}

impl CodeGen {
    pub fn new() -> Self {
        CodeGen {
            out: String::new(),
            indent: 0,
            lambda_counter: 0,
            arena_depth: 0,
            loop_counter: 0,
            hoisted: Vec::new(),
            loop_stack: Vec::new(),
        }
    }

    pub fn codegen_module(mut self, module: &Module) -> CgResult<String> {
        self.emit_preamble(module)?;
        for stmt in &module.stmts {
            match &stmt.kind {
                StmtKind::Function { .. } => self.emit_function(stmt)?,
                // Namespaced imports (`import "m" as ns`) carry their source
                // module's statements along for codegen too (spec §4.3); a
                // bare import has already been spliced into `module.stmts`
                // as ordinary `Function` stmts by the import resolver, so
                // only the namespaced form needs handling here.
                StmtKind::Import { namespace: Some(ns), imported_stmts: Some(nested), .. } => {
                    for nstmt in nested {
                        if let StmtKind::Function { .. } = &nstmt.kind {
                            self.emit_namespaced_function(ns, nstmt)?;
                        }
                    }
                }
                _ => {}
            }
        }
        for decl in std::mem::take(&mut self.hoisted) {
            self.out.push_str(&decl);
        }
        Ok(self.out)
    }

    fn emit_preamble(&mut self, module: &Module) -> CgResult<()> {
        writeln!(self.out, "/* generated from {} */", module.filename)?;
        writeln!(self.out, "#include \"sn_runtime.h\"")?;
        for stmt in &module.stmts {
            if let StmtKind::Pragma { kind, value } = &stmt.kind {
                match kind {
                    PragmaKind::Include => writeln!(self.out, "#include \"{value}\"")?,
                    PragmaKind::Link => writeln!(self.out, "/* link: {value} */")?,
                }
            }
        }
        writeln!(self.out)?;
        Ok(())
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
    }

    // ---- types ----

    fn c_type(&self, ty: &Type) -> String {
        match ty {
            Type::Int | Type::Int32 => "int32_t".to_string(),
            Type::Long => "int64_t".to_string(),
            Type::Uint | Type::Uint32 => "uint32_t".to_string(),
            Type::Double | Type::Float => "double".to_string(),
            Type::Char => "char".to_string(),
            Type::Bool => "bool".to_string(),
            Type::Byte => "uint8_t".to_string(),
            Type::Void => "void".to_string(),
            Type::Nil | Type::Any => "void*".to_string(),
            Type::String => "SnString*".to_string(),
            Type::Array(inner) => format!("SnArray_{}*", self.array_suffix(inner)),
            Type::Pointer(inner) => format!("{}*", self.c_type(inner)),
            Type::Opaque(name) => format!("{name}*"),
            Type::ThreadHandle { .. } => "RtThreadHandle*".to_string(),
            Type::Function { .. } => "__Closure__*".to_string(),
        }
    }

    fn array_suffix(&self, elem: &Type) -> &'static str {
        match elem {
            Type::Long => "long",
            Type::Double | Type::Float => "double",
            Type::Char => "char",
            Type::Bool => "bool",
            Type::Byte => "byte",
            Type::String => "string",
            _ => "ptr",
        }
    }

    // ---- functions ----

    fn emit_function(&mut self, stmt: &Stmt) -> CgResult<()> {
        let StmtKind::Function { name, .. } = &stmt.kind else { unreachable!() };
        let mangled = if name == "main" { "main".to_string() } else { mangle_name(name) };
        self.emit_function_named(stmt, mangled)
    }

    /// Emits a function belonging to a namespaced import under a mangled
    /// name that folds the namespace in, so `ns.f` and a same-named
    /// top-level `f` never collide (spec §4.3 namespace semantics).
    fn emit_namespaced_function(&mut self, ns: &str, stmt: &Stmt) -> CgResult<()> {
        let StmtKind::Function { name, .. } = &stmt.kind else { unreachable!() };
        self.emit_function_named(stmt, mangle_name(&format!("{ns}.{name}")))
    }

    fn emit_function_named(&mut self, stmt: &Stmt, mangled: String) -> CgResult<()> {
        let StmtKind::Function { name, params, return_type, body, modifier, is_native, is_variadic } = &stmt.kind else {
            unreachable!()
        };
        let is_main = name == "main" && mangled == "main";
        let ret_c = if is_main { "int".to_string() } else { self.c_type(&return_type.clone().unwrap_or(Type::Void)) };

        let mut param_decls: Vec<String> = params
            .iter()
            .map(|p| format!("{} {}", self.c_type(p.ty.as_ref().unwrap_or(&Type::Any)), p.name))
            .collect();
        if *is_variadic {
            param_decls.push("...".to_string());
        }

        if *is_native {
            writeln!(self.out, "extern {ret_c} {mangled}({});", if param_decls.is_empty() { "void".to_string() } else { param_decls.join(", ") })?;
            return Ok(());
        }

        if !is_main {
            param_decls.push("RtArena *__caller_arena".to_string());
        }
        let params_joined = if param_decls.is_empty() { "void".to_string() } else { param_decls.join(", ") };
        writeln!(self.out, "{ret_c} {mangled}({params_joined}) {{")?;
        self.indent += 1;
        self.arena_depth += 1;

        // A function returning a reference type is implicitly promoted to
        // `shared` regardless of its declared modifier, so the returned
        // value lives in the caller's arena rather than one destroyed on
        // the way out (spec §4.6 arena plumbing table).
        let promoted_shared = !is_main && return_type.as_ref().is_some_and(Type::is_reference_type);
        let owns_arena = is_main || (!matches!(modifier, FuncModifier::Shared) && !promoted_shared);

        self.write_indent();
        if is_main {
            writeln!(self.out, "RtArena *__arena = rt_arena_create(NULL);")?;
        } else if owns_arena {
            writeln!(self.out, "RtArena *__arena = rt_arena_create(__caller_arena);")?;
        } else {
            writeln!(self.out, "RtArena *__arena = __caller_arena;")?;
        }
        for s in body {
            self.emit_stmt(s, owns_arena)?;
        }

        self.write_indent();
        if owns_arena {
            writeln!(self.out, "rt_arena_destroy(__arena);")?;
        }
        self.write_indent();
        if is_main {
            writeln!(self.out, "return 0;")?;
        } else if ret_c == "void" {
            writeln!(self.out, "return;")?;
        } else {
            writeln!(self.out, "return ({ret_c}){{0}};")?;
        }

        self.arena_depth -= 1;
        self.indent -= 1;
        writeln!(self.out, "}}\n")?;
        Ok(())
    }

    // ---- statements ----

    fn emit_stmt(&mut self, stmt: &Stmt, owns_arena: bool) -> CgResult<()> {
        match &stmt.kind {
            StmtKind::Expr(e) => {
                self.write_indent();
                let rendered = self.emit_expr(e)?;
                writeln!(self.out, "{rendered};")?;
            }
            StmtKind::VarDecl { name, ty, init, .. } => {
                let declared = ty.clone().unwrap_or(Type::Any);
                let c_ty = self.c_type(&declared);
                self.write_indent();
                match init {
                    Some(e) => {
                        let rendered = self.emit_expr(e)?;
                        writeln!(self.out, "{c_ty} {name} = {rendered};")?;
                    }
                    None => writeln!(self.out, "{c_ty} {name} = {{0}};")?,
                }
            }
            StmtKind::Return(value) => {
                let rendered = match value {
                    Some(e) => Some(self.emit_expr(e)?),
                    None => None,
                };
                if owns_arena {
                    self.write_indent();
                    writeln!(self.out, "rt_arena_destroy(__arena);")?;
                }
                self.write_indent();
                match rendered {
                    Some(r) => writeln!(self.out, "return {r};")?,
                    None => writeln!(self.out, "return;")?,
                }
            }
            StmtKind::Block { stmts, modifier } => {
                self.write_indent();
                writeln!(self.out, "{{")?;
                self.indent += 1;
                let block_owns = match modifier {
                    BlockModifier::Shared => false,
                    BlockModifier::Private | BlockModifier::Default => {
                        self.write_indent();
                        writeln!(self.out, "RtArena *__block_arena = rt_arena_create(__arena);")?;
                        self.write_indent();
                        writeln!(self.out, "RtArena *__arena = __block_arena;")?;
                        true
                    }
                };
                for s in stmts {
                    self.emit_stmt(s, owns_arena)?;
                }
                if block_owns {
                    self.write_indent();
                    writeln!(self.out, "rt_arena_destroy(__arena);")?;
                }
                self.indent -= 1;
                self.write_indent();
                writeln!(self.out, "}}")?;
            }
            StmtKind::If { cond, then_branch, else_branch } => {
                let c = self.emit_expr(cond)?;
                self.write_indent();
                writeln!(self.out, "if ({c}) {{")?;
                self.indent += 1;
                for s in then_branch {
                    self.emit_stmt(s, owns_arena)?;
                }
                self.indent -= 1;
                self.write_indent();
                if let Some(eb) = else_branch {
                    writeln!(self.out, "}} else {{")?;
                    self.indent += 1;
                    for s in eb {
                        self.emit_stmt(s, owns_arena)?;
                    }
                    self.indent -= 1;
                    self.write_indent();
                }
                writeln!(self.out, "}}")?;
            }
            StmtKind::While { cond, body, is_shared } => {
                let c = self.emit_expr(cond)?;
                self.write_indent();
                writeln!(self.out, "while ({c}) {{")?;
                self.indent += 1;
                let loop_arena = self.enter_loop(*is_shared);
                self.emit_loop_prologue(&loop_arena)?;
                self.emit_loop_body(body, owns_arena)?;
                self.emit_loop_epilogue(&loop_arena)?;
                self.exit_loop();
                self.indent -= 1;
                self.write_indent();
                writeln!(self.out, "}}")?;
            }
            StmtKind::For { init, cond, incr, body, is_shared } => {
                self.write_indent();
                write!(self.out, "for (")?;
                if let Some(init) = init {
                    if let StmtKind::VarDecl { name, ty, init: Some(e), .. } = &init.kind {
                        let c_ty = self.c_type(ty.as_ref().unwrap_or(&Type::Int));
                        let r = self.emit_expr(e)?;
                        write!(self.out, "{c_ty} {name} = {r}")?;
                    }
                }
                write!(self.out, "; ")?;
                if let Some(cond) = cond {
                    let c = self.emit_expr(cond)?;
                    write!(self.out, "{c}")?;
                }
                write!(self.out, "; ")?;
                if let Some(incr) = incr {
                    let r = self.emit_expr(incr)?;
                    write!(self.out, "{r}")?;
                }
                writeln!(self.out, ") {{")?;
                self.indent += 1;
                let loop_arena = self.enter_loop(*is_shared);
                self.emit_loop_prologue(&loop_arena)?;
                self.emit_loop_body(body, owns_arena)?;
                self.emit_loop_epilogue(&loop_arena)?;
                self.exit_loop();
                self.indent -= 1;
                self.write_indent();
                writeln!(self.out, "}}")?;
            }
            StmtKind::ForEach { var, iterable, body, is_shared } => {
                // Hoist the iterable and its length into scratch vars (spec §4.6
                // for-each lowering template: `__arr__`/`__len__`/`__idx__`) so an
                // iterable with side effects (e.g. a call) is evaluated once, not
                // once per bound-check and once per element access.
                let arr_ty = self.c_type(&iterable.get_type().unwrap_or_else(|| Type::array(Type::Any)));
                let arr_expr = self.emit_expr(iterable)?;
                let id = self.loop_counter;
                self.loop_counter += 1;
                let arr_var = format!("__arr_{id}__");
                let len_var = format!("__len_{id}__");
                let idx = format!("__idx_{id}__");
                self.write_indent();
                writeln!(self.out, "{{")?;
                self.indent += 1;
                self.write_indent();
                writeln!(self.out, "{arr_ty} {arr_var} = {arr_expr};")?;
                self.write_indent();
                writeln!(self.out, "int64_t {len_var} = rt_array_length((void*){arr_var});")?;
                self.write_indent();
                writeln!(self.out, "for (int64_t {idx} = 0; {idx} < {len_var}; {idx}++) {{")?;
                self.indent += 1;
                let loop_arena = self.enter_loop(*is_shared);
                self.emit_loop_prologue(&loop_arena)?;
                self.write_indent();
                writeln!(self.out, "__auto_type {var} = {arr_var}->items[{idx}];")?;
                self.emit_loop_body(body, owns_arena)?;
                self.emit_loop_epilogue(&loop_arena)?;
                self.exit_loop();
                self.indent -= 1;
                self.write_indent();
                writeln!(self.out, "}}")?;
                self.indent -= 1;
                self.write_indent();
                writeln!(self.out, "}}")?;
            }
            StmtKind::Break => {
                self.write_indent();
                match self.loop_stack.last() {
                    Some(Some(arena)) => writeln!(self.out, "{{ rt_arena_destroy({}); break; }}", arena.arena_var)?,
                    _ => writeln!(self.out, "break;")?,
                }
            }
            StmtKind::Continue => {
                self.write_indent();
                match self.loop_stack.last() {
                    Some(Some(arena)) => writeln!(self.out, "goto {};", arena.cleanup_label)?,
                    _ => writeln!(self.out, "continue;")?,
                }
            }
            StmtKind::Function { .. } => {
                // Nested function declarations are hoisted to top level by the parser's
                // caller (the driver flattens modules before codegen); nothing to do here.
            }
            StmtKind::Import { .. } | StmtKind::Pragma { .. } | StmtKind::TypeDecl { .. } => {}
        }
        Ok(())
    }

    /// Allocates the per-iteration arena bookkeeping for a non-`shared` loop
    /// (spec §4.6 arena plumbing table); `shared` loops push `None` so
    /// `break`/`continue` lower to plain C statements.
    fn enter_loop(&mut self, is_shared: bool) -> Option<LoopArena> {
        let arena = if is_shared {
            None
        } else {
            let id = self.loop_counter;
            self.loop_counter += 1;
            Some(LoopArena { arena_var: format!("__loop_arena_{id}__"), cleanup_label: format!("__loop_cleanup_{id}__") })
        };
        self.loop_stack.push(arena.clone());
        arena
    }

    fn exit_loop(&mut self) {
        self.loop_stack.pop();
    }

    /// Creates the per-iteration arena at the top of the loop body and
    /// shadows `__arena` so nested allocations route through it without
    /// every emission site needing to know the loop's arena variable name.
    /// The two-declaration form avoids self-referential initialization
    /// (`RtArena *__arena = rt_arena_create(__arena)` would read `__arena`
    /// before it is initialized, since the new binding's scope begins at
    /// its declarator, not after the initializer).
    fn emit_loop_prologue(&mut self, arena: &Option<LoopArena>) -> CgResult<()> {
        if let Some(arena) = arena {
            self.write_indent();
            writeln!(self.out, "RtArena *{} = rt_arena_create(__arena);", arena.arena_var)?;
            self.write_indent();
            writeln!(self.out, "RtArena *__arena = {};", arena.arena_var)?;
        }
        Ok(())
    }

    /// Destroys the per-iteration arena at the natural end of the loop
    /// body; `continue` jumps straight to this label, so every path out of
    /// an iteration passes through the same destroy call (spec invariant 4).
    fn emit_loop_epilogue(&mut self, arena: &Option<LoopArena>) -> CgResult<()> {
        if let Some(arena) = arena {
            self.write_indent();
            writeln!(self.out, "{}: rt_arena_destroy({});", arena.cleanup_label, arena.arena_var)?;
        }
        Ok(())
    }

    fn emit_loop_body(&mut self, body: &[Stmt], owns_arena: bool) -> CgResult<()> {
        for s in body {
            self.emit_stmt(s, owns_arena)?;
        }
        Ok(())
    }

    // ---- expressions ----

    fn emit_expr(&mut self, expr: &Expr) -> CgResult<String> {
        Ok(match &expr.kind {
            ExprKind::IntLiteral(v) => v.to_string(),
            ExprKind::LongLiteral(v) => format!("{v}L"),
            ExprKind::DoubleLiteral(v) => format!("{v}"),
            ExprKind::CharLiteral(c) => format!("'{}'", escape_c_char(*c)),
            ExprKind::StringLiteral(s) => format!("rt_string_literal(__arena, \"{}\")", escape_c_string(s)),
            ExprKind::BoolLiteral(b) => if *b { "true".to_string() } else { "false".to_string() },
            ExprKind::NilLiteral => "NULL".to_string(),
            ExprKind::Variable(name) => name.clone(),
            ExprKind::Binary { op, left, right } => {
                let l = self.emit_expr(left)?;
                let r = self.emit_expr(right)?;
                let lty = left.get_type();
                let rty = right.get_type();
                if *op == BinOp::Add && (lty == Some(Type::String) || rty == Some(Type::String)) {
                    let l = self.render_to_string(lty, l);
                    let r = self.render_to_string(rty, r);
                    return Ok(format!("rt_string_concat(__arena, {l}, {r})"));
                }
                if let Some(suffix) = checked_arith_suffix(left.get_type().as_ref()) {
                    if let Some(rt_name) = checked_arith_name(*op) {
                        return Ok(format!("{rt_name}_{suffix}(__arena, {l}, {r})"));
                    }
                }
                format!("({l} {} {r})", c_binop(*op))
            }
            ExprKind::Unary { op, operand } => {
                let o = self.emit_expr(operand)?;
                match op {
                    UnOp::Neg => match checked_arith_suffix(operand.get_type().as_ref()) {
                        Some(suffix) => format!("rt_neg_{suffix}(__arena, {o})"),
                        None => format!("(-{o})"),
                    },
                    UnOp::Not => format!("(!{o})"),
                }
            }
            ExprKind::Assign { target, value } => {
                let t = self.emit_expr(target)?;
                let v = self.emit_expr(value)?;
                format!("({t} = {v})")
            }
            ExprKind::IndexAssign { array, index, value } => {
                let a = self.emit_expr(array)?;
                let i = self.emit_expr(index)?;
                let v = self.emit_expr(value)?;
                format!("({a}->items[{i}] = {v})")
            }
            ExprKind::Call { callee, args } => self.emit_call(callee, args)?,
            ExprKind::Array(elems) => {
                let mut rendered = Vec::new();
                for e in elems {
                    rendered.push(self.emit_expr(e)?);
                }
                format!("rt_array_create(__arena, {}, (void*[]){{{}}})", rendered.len(), rendered.join(", "))
            }
            ExprKind::ArrayAccess { array, index } => {
                let a = self.emit_expr(array)?;
                let i = self.emit_expr(index)?;
                format!("{a}->items[{i}]")
            }
            ExprKind::ArraySlice { array, start, end, .. } => {
                let a = self.emit_expr(array)?;
                let s = match start { Some(e) => self.emit_expr(e)?, None => "0".to_string() };
                let en = match end { Some(e) => self.emit_expr(e)?, None => format!("rt_array_length((void*){a})") };
                format!("rt_array_slice(__arena, (void*){a}, {s}, {en})")
            }
            ExprKind::Range { start, end } => {
                let s = self.emit_expr(start)?;
                let e = self.emit_expr(end)?;
                format!("rt_array_range(__arena, {s}, {e})")
            }
            ExprKind::Spread(inner) => self.emit_expr(inner)?,
            ExprKind::Increment(inner) => {
                let i = self.emit_expr(inner)?;
                format!("({i}++)")
            }
            ExprKind::Decrement(inner) => {
                let i = self.emit_expr(inner)?;
                format!("({i}--)")
            }
            ExprKind::Interpolated(parts) => self.emit_interpolated(parts)?,
            ExprKind::Member { object, name } => {
                let o = self.emit_expr(object)?;
                match name.as_str() {
                    "length" => match object.get_type() {
                        Some(Type::String) => format!("rt_string_length({o})"),
                        _ => format!("rt_array_length((void*){o})"),
                    },
                    _ => format!("{o}->{name}"),
                }
            }
            ExprKind::StaticCall { type_name, method_name, args } => {
                let mut rendered = vec!["__arena".to_string()];
                for a in args {
                    rendered.push(self.emit_expr(a)?);
                }
                format!("rt_{}_{}({})", type_name.to_lowercase(), method_name, rendered.join(", "))
            }
            ExprKind::SizedArrayAlloc { elem_type, size, default } => {
                let s = self.emit_expr(size)?;
                let d = match default { Some(e) => self.emit_expr(e)?, None => "0".to_string() };
                format!("rt_array_sized(__arena, sizeof({}), {s}, {d})", self.c_type(elem_type))
            }
            ExprKind::ThreadSpawn { call, .. } => self.emit_thread_spawn(call)?,
            ExprKind::ThreadSync { handle, .. } => {
                let h = self.emit_expr(handle)?;
                let inner_c = match handle.get_type() {
                    Some(Type::ThreadHandle { inner, .. }) => self.c_type(&inner),
                    _ => "void*".to_string(),
                };
                if inner_c == "void" {
                    format!("(rt_thread_join({h}), (void)0)")
                } else {
                    format!("(*({inner_c}*)rt_thread_join({h}))")
                }
            }
            ExprKind::SyncList(handles) => {
                let mut rendered = Vec::new();
                for h in handles {
                    rendered.push(self.emit_expr(h)?);
                }
                format!("rt_thread_join_all(__arena, {}, (RtThreadHandle*[]){{{}}})", rendered.len(), rendered.join(", "))
            }
            ExprKind::AsVal { operand, .. } => {
                let o = self.emit_expr(operand)?;
                format!("rt_as_val(__arena, {o})")
            }
            ExprKind::Lambda { params, return_type, body, modifier, lambda_id, .. } => {
                self.emit_lambda(params, return_type, body, *modifier, *lambda_id)?
            }
        })
    }

    /// Renders a value of the given static type as a `SnString*`, picking
    /// the matching `rt_*_to_string` conversion helper. Shared by
    /// interpolated-string emission and by `+`'s string-concat dispatch,
    /// both of which need to coerce a printable non-string operand before
    /// handing it to `rt_string_concat` (spec §4.5 "+").
    fn render_to_string(&self, ty: Option<Type>, rendered: String) -> String {
        match ty {
            Some(Type::String) => rendered,
            Some(Type::Int) | Some(Type::Int32) => format!("rt_int_to_string(__arena, {rendered})"),
            Some(Type::Long) => format!("rt_long_to_string(__arena, {rendered})"),
            Some(Type::Double) | Some(Type::Float) => format!("rt_double_to_string(__arena, {rendered})"),
            Some(Type::Bool) => format!("rt_bool_to_string(__arena, {rendered})"),
            _ => format!("rt_to_string_any(__arena, {rendered})"),
        }
    }

    fn emit_interpolated(&mut self, parts: &[InterpolPart]) -> CgResult<String> {
        let builder = format!("__sb{}", self.lambda_counter);
        self.lambda_counter += 1;
        let mut prelude = format!("({{ RtStringBuilder *{builder} = rt_mutstring_new(__arena); ");
        for part in parts {
            if let Some(text) = &part.text {
                write!(prelude, "rt_mutstring_append(__arena, {builder}, rt_string_literal(__arena, \"{}\")); ", escape_c_string(text))?;
            } else if let Some(e) = &part.expr {
                let rendered = self.emit_expr(e)?;
                let to_string = self.render_to_string(e.get_type(), rendered);
                write!(prelude, "rt_mutstring_append(__arena, {builder}, {to_string}); ")?;
            }
        }
        write!(prelude, "rt_mutstring_to_string(__arena, {builder}); }})")?;
        Ok(prelude)
    }

    fn emit_call(&mut self, callee: &Expr, args: &[Expr]) -> CgResult<String> {
        if let ExprKind::Member { object, name } = &callee.kind {
            // `ns.func(args)` (spec §4.3): the type checker leaves a
            // namespace-qualified variable's own type as `Void` (it names a
            // compile-time namespace, not a runtime value), which
            // distinguishes it here from the array-method case below.
            if let ExprKind::Variable(ns) = &object.kind {
                if object.get_type() == Some(Type::Void) {
                    let mut rendered_args = Vec::new();
                    for a in args {
                        rendered_args.push(self.emit_expr(a)?);
                    }
                    rendered_args.push("__arena".to_string());
                    return Ok(format!("{}({})", mangle_name(&format!("{ns}.{name}")), rendered_args.join(", ")));
                }
            }
            if let Some(Type::Array(_)) = object.get_type() {
                let obj = self.emit_expr(object)?;
                let mut rendered_args = vec!["__arena".to_string(), format!("(void*){obj}")];
                for a in args {
                    rendered_args.push(self.emit_expr(a)?);
                }
                return Ok(match name.as_str() {
                    "push" => format!("({obj} = rt_array_push({}))", rendered_args.join(", ")),
                    "pop" => format!("rt_array_pop({})", rendered_args.join(", ")),
                    "clear" => format!("({obj} = rt_array_clear({}))", rendered_args.join(", ")),
                    "concat" => format!("rt_array_concat({})", rendered_args.join(", ")),
                    other => return Err(CodeGenError::Logic(format!("unknown array method '{other}'"))),
                });
            }
        }
        let mut rendered_args = Vec::new();
        for a in args {
            rendered_args.push(self.emit_expr(a)?);
        }
        if let ExprKind::Variable(name) = &callee.kind {
            if let Some(sig) = builtin_signature(name) {
                if sig.needs_arena {
                    rendered_args.insert(0, "__arena".to_string());
                }
                return Ok(format!("{}({})", sig.symbol, rendered_args.join(", ")));
            }
            rendered_args.push("__arena".to_string());
            return Ok(format!("{}({})", mangle_name(name), rendered_args.join(", ")));
        }
        let c = self.emit_expr(callee)?;
        rendered_args.push("__arena".to_string());
        let Some(Type::Function { ret, params, .. }) = callee.get_type() else {
            return Err(CodeGenError::Logic("call target is not a closure-typed value".to_string()));
        };
        let mut cast_params: Vec<String> = params.iter().map(|p| self.c_type(p)).collect();
        cast_params.push("RtArena*".to_string());
        let ret_c = self.c_type(&ret);
        Ok(format!(
            "(({ret_c} (*)({}))({c})->func)({})",
            cast_params.join(", "),
            rendered_args.join(", ")
        ))
    }

    /// A `thread_spawn(call)` gets a per-call-site captured-args struct and
    /// a wrapper function matching `rt_thread_spawn`'s `void *(*)(void*)`
    /// contract (spec §5 "Each `thread_spawn` gets a wrapper function
    /// taking a captured-arg struct and calling the target"). The wrapped
    /// return value is boxed into an arena slot so `rt_thread_join` can
    /// hand back an opaque `void*` regardless of the target's return type.
    fn emit_thread_spawn(&mut self, call: &Expr) -> CgResult<String> {
        let ExprKind::Call { callee, args } = &call.kind else {
            return Err(CodeGenError::Logic("thread_spawn operand must be a call expression".to_string()));
        };
        let ExprKind::Variable(fn_name) = &callee.kind else {
            // Closures/member calls spawned directly aren't common in practice;
            // fall back to running them eagerly and boxing the result so `!`
            // still has something to join on.
            let c = self.emit_expr(call)?;
            let ret_c = self.c_type(&call.get_type().unwrap_or(Type::Void));
            return Ok(format!(
                "rt_thread_spawn_sync(__arena, ({{ {ret_c} *__r = rt_arena_alloc(__arena, sizeof({ret_c})); *__r = {c}; (void*)__r; }}))"
            ));
        };

        let id = self.lambda_counter;
        self.lambda_counter += 1;
        let struct_name = format!("__spawn_args_{id}");
        let wrapper_name = format!("__spawn_fn_{id}");
        let ret_ty = call.get_type().unwrap_or(Type::Void);
        let ret_c = self.c_type(&ret_ty);

        let arg_types: Vec<Type> = args.iter().map(|a| a.get_type().unwrap_or(Type::Any)).collect();
        let mut rendered_args = Vec::new();
        for a in args {
            rendered_args.push(self.emit_expr(a)?);
        }

        let mut def = String::new();
        writeln!(def, "struct {struct_name} {{")?;
        for (i, ty) in arg_types.iter().enumerate() {
            writeln!(def, "    {} arg{i};", self.c_type(ty))?;
        }
        writeln!(def, "    RtArena *arena;")?;
        writeln!(def, "}};")?;
        writeln!(def, "static void *{wrapper_name}(void *__raw) {{")?;
        writeln!(def, "    struct {struct_name} *__a = ({struct_name}*)__raw;")?;
        let call_args: Vec<String> = (0..arg_types.len()).map(|i| format!("__a->arg{i}")).chain(std::iter::once("__a->arena".to_string())).collect();
        if ret_c == "void" {
            writeln!(def, "    {}({});", mangle_name(fn_name), call_args.join(", "))?;
            writeln!(def, "    return NULL;")?;
        } else {
            writeln!(def, "    {ret_c} *__r = rt_arena_alloc(__a->arena, sizeof({ret_c}));")?;
            writeln!(def, "    *__r = {}({});", mangle_name(fn_name), call_args.join(", "))?;
            writeln!(def, "    return (void*)__r;")?;
        }
        writeln!(def, "}}\n")?;
        self.hoisted.push(def);

        let mut ctor = format!("({{ struct {struct_name} *__a = rt_arena_alloc(__arena, sizeof(struct {struct_name})); ");
        for (i, rendered) in rendered_args.iter().enumerate() {
            write!(ctor, "__a->arg{i} = {rendered}; ")?;
        }
        write!(ctor, "__a->arena = __arena; rt_thread_spawn(__arena, {wrapper_name}, __a); }})")?;
        Ok(ctor)
    }

    /// Lambdas are hoisted into their own top-level C function plus a
    /// `__Closure__` wrapper capturing the enclosing arena (spec §4.6,
    /// DESIGN.md Open Question 3).
    fn emit_lambda(
        &mut self,
        params: &[LambdaParam],
        return_type: &Option<Type>,
        body: &LambdaBody,
        modifier: FuncModifier,
        lambda_id: usize,
    ) -> CgResult<String> {
        let name = format!("__lambda_{lambda_id}_{}", self.lambda_counter);
        self.lambda_counter += 1;
        let ret_c = self.c_type(&return_type.clone().unwrap_or(Type::Void));
        let mut param_decls: Vec<String> =
            params.iter().map(|p| format!("{} {}", self.c_type(p.ty.as_ref().unwrap_or(&Type::Any)), p.name)).collect();
        param_decls.push("RtArena *__caller_arena".to_string());

        let mut fn_src = String::new();
        writeln!(fn_src, "static {ret_c} {name}({}) {{", param_decls.join(", "))?;
        let promoted_shared = return_type.as_ref().is_some_and(Type::is_reference_type);
        let owns_arena = !matches!(modifier, FuncModifier::Shared) && !promoted_shared;
        if owns_arena {
            writeln!(fn_src, "    RtArena *__arena = rt_arena_create(__caller_arena);")?;
        } else {
            writeln!(fn_src, "    RtArena *__arena = __caller_arena;")?;
        }

        let mut sub = CodeGen::new();
        sub.indent = 1;
        sub.lambda_counter = self.lambda_counter;
        sub.arena_depth = self.arena_depth + 1;
        match body {
            LambdaBody::Expr(e) => {
                let rendered = sub.emit_expr(e)?;
                if owns_arena {
                    sub.write_indent();
                    writeln!(sub.out, "rt_arena_destroy(__arena);")?;
                }
                sub.write_indent();
                writeln!(sub.out, "return {rendered};")?;
            }
            LambdaBody::Stmts(stmts) => {
                for s in stmts {
                    sub.emit_stmt(s, owns_arena)?;
                }
                if owns_arena {
                    sub.write_indent();
                    writeln!(sub.out, "rt_arena_destroy(__arena);")?;
                }
                sub.write_indent();
                if ret_c == "void" {
                    writeln!(sub.out, "return;")?;
                } else {
                    writeln!(sub.out, "return ({ret_c}){{0}};")?;
                }
            }
        }
        self.lambda_counter = sub.lambda_counter;
        fn_src.push_str(&sub.out);
        writeln!(fn_src, "}}\n")?;
        self.hoisted.push(fn_src);
        Ok(format!("rt_closure_make((void*){name}, __arena)"))
    }
}

impl Default for CodeGen {
    fn default() -> Self {
        Self::new()
    }
}

/// `Long`/`Double` arithmetic routes through the checked `rt_*_<suffix>`
/// runtime calls (spec §4.6's `rt_add/sub/mul/div/mod/neg_long/double`
/// contract); every other numeric type keeps the native C operator.
fn checked_arith_suffix(ty: Option<&Type>) -> Option<&'static str> {
    match ty {
        Some(Type::Long) => Some("long"),
        Some(Type::Double) | Some(Type::Float) => Some("double"),
        _ => None,
    }
}

fn checked_arith_name(op: BinOp) -> Option<&'static str> {
    Some(match op {
        BinOp::Add => "rt_add",
        BinOp::Sub => "rt_sub",
        BinOp::Mul => "rt_mul",
        BinOp::Div => "rt_div",
        BinOp::Mod => "rt_mod",
        _ => return None,
    })
}

fn c_binop(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Mod => "%",
        BinOp::Eq => "==",
        BinOp::NotEq => "!=",
        BinOp::Lt => "<",
        BinOp::Le => "<=",
        BinOp::Gt => ">",
        BinOp::Ge => ">=",
        BinOp::And => "&&",
        BinOp::Or => "||",
    }
}

fn escape_c_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_c_char(c: char) -> String {
    match c {
        '\'' => "\\'".to_string(),
        '\\' => "\\\\".to_string(),
        '\n' => "\\n".to_string(),
        '\t' => "\\t".to_string(),
        _ => c.to_string(),
    }
}

pub fn codegen_module(module: &Module) -> CgResult<String> {
    CodeGen::new().codegen_module(module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::parser::parse_source;
    use crate::typechecker::check_module;

    fn generate(src: &str) -> String {
        let arena = Arena::new();
        let (module, parse_diags) = parse_source(&arena, src, "test.sn");
        assert!(!parse_diags.has_errors(), "{parse_diags}");
        let type_diags = check_module("test.sn", &module);
        assert!(!type_diags.has_errors(), "{type_diags}");
        codegen_module(&module).unwrap()
    }

    #[test]
    fn emits_main_with_root_arena() {
        let c = generate("fn main() =>\n    return\n");
        assert!(c.contains("int main"));
        assert!(c.contains("rt_arena_create(NULL)"));
        assert!(c.contains("rt_arena_destroy(__arena)"));
    }

    #[test]
    fn default_function_creates_child_arena() {
        let c = generate("fn f(): int =>\n    return 1\n");
        assert!(c.contains("sn_f(RtArena *__caller_arena)"));
        assert!(c.contains("rt_arena_create(__caller_arena)"));
    }

    #[test]
    fn shared_function_reuses_caller_arena() {
        let c = generate("shared fn f() =>\n    return\n");
        assert!(c.contains("RtArena *__arena = __caller_arena;"));
    }

    #[test]
    fn string_literal_uses_runtime_literal_helper() {
        let c = generate("fn f() =>\n    var s = \"hi\"\n    return\n");
        assert!(c.contains("rt_string_literal(__arena, \"hi\")"));
    }

    #[test]
    fn string_concat_dispatches_on_either_operand_type() {
        let c = generate("fn f(): str =>\n    return \"hi\"\nfn main() =>\n    var s = f() + \"!\"\n    var t = 5 + \"x\"\n    return\n");
        assert!(c.contains("rt_string_concat(__arena, sn_f(__arena), rt_string_literal(__arena, \"!\"))"), "{c}");
        assert!(c.contains("rt_string_concat(__arena, rt_int_to_string(__arena, 5), rt_string_literal(__arena, \"x\"))"), "{c}");
    }

    #[test]
    fn thread_spawn_and_sync_emit_runtime_calls() {
        let c = generate("fn g(): int =>\n    return 1\nfn f() =>\n    var h = @spawn g()\n    var r = h!\n");
        assert!(c.contains("rt_thread_spawn"));
        assert!(c.contains("rt_thread_join"));
    }

    #[test]
    fn native_function_emits_extern_declaration() {
        let c = generate("native fn raw_call(x: int): int\nfn main() =>\n    return\n");
        assert!(c.contains("extern int32_t sn_raw_call"));
    }

    #[test]
    fn for_each_creates_per_iteration_arena_with_cleanup_label() {
        let c = generate("fn main() =>\n    var xs: int[] = {1, 2, 3}\n    for x in xs =>\n        var s = x\n    return\n");
        assert!(c.contains("__loop_arena_"), "{c}");
        assert!(c.contains("rt_arena_create(__arena)"));
        assert!(c.contains("__loop_cleanup_"));
        assert!(c.contains("__len_"), "{c}");
    }

    #[test]
    fn shared_loop_has_no_per_iteration_arena() {
        let c = generate("fn main() =>\n    var i: int = 0\n    shared while i < 3 =>\n        i = i + 1\n    return\n");
        assert!(!c.contains("__loop_arena_"), "{c}");
    }

    #[test]
    fn break_in_loop_destroys_iteration_arena_first() {
        let c = generate("fn main() =>\n    var xs: int[] = {1, 2, 3}\n    for x in xs =>\n        break\n    return\n");
        assert!(c.contains("rt_arena_destroy(__loop_arena_"), "{c}");
    }

    #[test]
    fn continue_in_loop_jumps_to_cleanup_label() {
        let c = generate("fn main() =>\n    var xs: int[] = {1, 2, 3}\n    for x in xs =>\n        continue\n    return\n");
        assert!(c.contains("goto __loop_cleanup_"), "{c}");
    }
}
