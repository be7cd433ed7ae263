//! Symbol table: `Symbol`, `Scope`, `SymbolTable` (spec §3, §4.4)
//!
//! A stack of lexical `Scope`s reachable from `current`, a retained
//! `global_scope`, and a `current_arena_depth` counter the code generator
//! bumps as it enters arena-owning contexts (spec §3 `SymbolTable`
//! invariants). Built-ins `print(any): void` and `to_string(any): str` are
//! injected into the global scope at construction (spec §4.4).

use crate::ast::{FuncModifier, MemQual, ThreadState, Type};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Global,
    Local,
    Param,
    Namespace,
    TypeDecl,
}

#[derive(Debug, Clone, Default)]
pub struct FrozenState {
    pub freeze_count: u32,
}

impl FrozenState {
    pub fn is_frozen(&self) -> bool {
        self.freeze_count > 0
    }
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub ty: Type,
    pub kind: SymbolKind,
    pub offset: usize,
    pub arena_depth: usize,
    pub mem_qual: MemQual,
    pub func_mod: FuncModifier,
    pub declared_func_mod: FuncModifier,
    pub is_function: bool,
    pub is_native: bool,
    pub thread_state: ThreadState,
    pub frozen: FrozenState,
    /// Names of arguments frozen when this symbol (a thread handle) was
    /// spawned; unfrozen together on sync (spec §4.4 `sync_variable`).
    pub frozen_args: Vec<String>,
    pub is_namespace: bool,
    pub namespace_symbols: Vec<Symbol>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, ty: Type, kind: SymbolKind) -> Self {
        Symbol {
            name: name.into(),
            ty,
            kind,
            offset: 0,
            arena_depth: 0,
            mem_qual: MemQual::None,
            func_mod: FuncModifier::Default,
            declared_func_mod: FuncModifier::Default,
            is_function: false,
            is_native: false,
            thread_state: ThreadState::Normal,
            frozen: FrozenState::default(),
            frozen_args: Vec::new(),
            is_namespace: false,
            namespace_symbols: Vec::new(),
        }
    }

    pub fn function(name: impl Into<String>, ty: Type, modifier: FuncModifier, is_native: bool) -> Self {
        let mut s = Symbol::new(name, ty, SymbolKind::Global);
        s.is_function = true;
        s.is_native = is_native;
        s.func_mod = modifier;
        s.declared_func_mod = modifier;
        s
    }

    pub fn namespace(name: impl Into<String>) -> Self {
        let mut s = Symbol::new(name, Type::Void, SymbolKind::Namespace);
        s.is_namespace = true;
        s
    }
}

pub struct Scope {
    pub symbols: Vec<Symbol>,
    pub next_local_offset: usize,
    pub next_param_offset: usize,
    pub arena_depth: usize,
}

impl Scope {
    fn new(arena_depth: usize) -> Self {
        Scope { symbols: Vec::new(), next_local_offset: 0, next_param_offset: 0, arena_depth }
    }

    /// Insertion is LIFO; a later lookup in the same scope finds the most
    /// recently added symbol of a given name first, and redeclaration in the
    /// same scope updates the type in place rather than shadowing (spec §4.4).
    fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.symbols.iter().rev().find(|s| s.name == name)
    }

    fn lookup_mut(&mut self, name: &str) -> Option<&mut Symbol> {
        self.symbols.iter_mut().rev().find(|s| s.name == name)
    }
}

pub struct SymbolTable {
    scopes: Vec<Scope>,
    pub current_arena_depth: usize,
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut table = SymbolTable { scopes: vec![Scope::new(0)], current_arena_depth: 0 };
        table.inject_builtins();
        table
    }

    fn inject_builtins(&mut self) {
        let print_ty = Type::function(Type::Void, vec![Type::Any], vec![MemQual::None], false, true);
        let to_string_ty = Type::function(Type::String, vec![Type::Any], vec![MemQual::None], false, true);
        self.add_symbol(Symbol::function("print", print_ty, FuncModifier::Default, true));
        self.add_symbol(Symbol::function("to_string", to_string_ty, FuncModifier::Default, true));
    }

    pub fn push_scope(&mut self) {
        let depth = self.current_arena_depth;
        self.scopes.push(Scope::new(depth));
    }

    /// Refuses to pop the permanent global scope (spec §4.4).
    pub fn pop_scope(&mut self) -> Result<(), String> {
        if self.scopes.len() <= 1 {
            return Err("cannot pop the global scope".to_string());
        }
        let popped = self.scopes.pop().unwrap();
        let pending: Vec<&str> = popped
            .symbols
            .iter()
            .filter(|s| s.thread_state == ThreadState::Pending)
            .map(|s| s.name.as_str())
            .collect();
        if !pending.is_empty() {
            return Err(format!(
                "scope closed with unsynchronised thread handle(s): {}",
                pending.join(", ")
            ));
        }
        Ok(())
    }

    pub fn add_symbol(&mut self, symbol: Symbol) {
        let depth = self.current_arena_depth;
        let scope = self.scopes.last_mut().unwrap();
        if let Some(existing) = scope.lookup_mut(&symbol.name) {
            existing.ty = symbol.ty;
            return;
        }
        let mut symbol = symbol;
        symbol.arena_depth = depth;
        scope.symbols.push(symbol);
    }

    pub fn add_symbol_with_kind(&mut self, name: impl Into<String>, ty: Type, kind: SymbolKind) {
        self.add_symbol(Symbol::new(name, ty, kind));
    }

    pub fn add_function(&mut self, name: impl Into<String>, ty: Type, modifier: FuncModifier, is_native: bool) {
        self.add_symbol(Symbol::function(name, ty, modifier, is_native));
    }

    pub fn add_namespace(&mut self, name: impl Into<String>) -> &mut Symbol {
        let name = name.into();
        self.add_symbol(Symbol::namespace(name.clone()));
        self.scopes.last_mut().unwrap().lookup_mut(&name).unwrap()
    }

    pub fn add_symbol_to_namespace(&mut self, ns: &str, symbol: Symbol) -> Result<(), String> {
        let target = self
            .scopes
            .last_mut()
            .unwrap()
            .lookup_mut(ns)
            .filter(|s| s.is_namespace)
            .ok_or_else(|| format!("unknown namespace '{ns}'"))?;
        target.namespace_symbols.push(symbol);
        Ok(())
    }

    pub fn add_function_to_namespace(
        &mut self,
        ns: &str,
        name: impl Into<String>,
        ty: Type,
        modifier: FuncModifier,
        is_native: bool,
    ) -> Result<(), String> {
        self.add_symbol_to_namespace(ns, Symbol::function(name, ty, modifier, is_native))
    }

    /// Walks the scope chain from innermost to `global_scope`.
    pub fn lookup_symbol(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|scope| scope.lookup(name))
    }

    pub fn lookup_symbol_mut(&mut self, name: &str) -> Option<&mut Symbol> {
        self.scopes.iter_mut().rev().find_map(|scope| scope.lookup_mut(name))
    }

    pub fn lookup_symbol_current(&self, name: &str) -> Option<&Symbol> {
        self.scopes.last().and_then(|scope| scope.lookup(name))
    }

    pub fn is_namespace(&self, name: &str) -> bool {
        self.lookup_symbol(name).map(|s| s.is_namespace).unwrap_or(false)
    }

    /// Two-phase lookup used for `ns.member` member access (spec §4.4):
    /// resolve `ns` in the ordinary scope chain, then search its
    /// `namespace_symbols`.
    pub fn lookup_in_namespace(&self, ns: &str, member: &str) -> Option<&Symbol> {
        self.lookup_symbol(ns)
            .filter(|s| s.is_namespace)
            .and_then(|s| s.namespace_symbols.iter().find(|m| m.name == member))
    }

    pub fn mark_pending(&mut self, name: &str) -> Result<(), String> {
        let sym = self.lookup_symbol_mut(name).ok_or_else(|| format!("unknown variable '{name}'"))?;
        if sym.thread_state != ThreadState::Normal {
            return Err(format!("'{name}' is not in normal thread state"));
        }
        sym.thread_state = ThreadState::Pending;
        Ok(())
    }

    pub fn mark_synchronized(&mut self, name: &str) -> Result<(), String> {
        let sym = self.lookup_symbol_mut(name).ok_or_else(|| format!("unknown variable '{name}'"))?;
        if sym.thread_state != ThreadState::Pending {
            return Err(format!("'{name}' is not pending; cannot sync"));
        }
        sym.thread_state = ThreadState::Synchronised;
        Ok(())
    }

    /// Syncs `name` and unfreezes every variable it froze at spawn time
    /// (spec §4.4, §5 "freezing").
    pub fn sync_variable(&mut self, name: &str) -> Result<Vec<String>, String> {
        let frozen_args = {
            let sym = self.lookup_symbol_mut(name).ok_or_else(|| format!("unknown variable '{name}'"))?;
            if sym.thread_state != ThreadState::Pending {
                return Err(format!("'{name}' is not pending; cannot sync"));
            }
            sym.thread_state = ThreadState::Synchronised;
            std::mem::take(&mut sym.frozen_args)
        };
        for arg in &frozen_args {
            self.unfreeze_symbol(arg)?;
        }
        Ok(frozen_args)
    }

    pub fn freeze_symbol(&mut self, name: &str) -> Result<(), String> {
        let sym = self.lookup_symbol_mut(name).ok_or_else(|| format!("unknown variable '{name}'"))?;
        sym.frozen.freeze_count += 1;
        Ok(())
    }

    pub fn unfreeze_symbol(&mut self, name: &str) -> Result<(), String> {
        let sym = self.lookup_symbol_mut(name).ok_or_else(|| format!("unknown variable '{name}'"))?;
        if sym.frozen.freeze_count > 0 {
            sym.frozen.freeze_count -= 1;
        }
        Ok(())
    }

    pub fn enter_arena_context(&mut self) {
        self.current_arena_depth += 1;
    }

    pub fn exit_arena_context(&mut self) {
        self.current_arena_depth = self.current_arena_depth.saturating_sub(1);
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

/// A small map of imported-module namespaces, used by the parser when
/// splicing `import "m" as ns` (spec §4.3).
pub type NamespaceMap = HashMap<String, Vec<Symbol>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_available_globally() {
        let table = SymbolTable::new();
        let print_sym = table.lookup_symbol("print").expect("print should be built in");
        assert!(print_sym.is_function);
        assert!(print_sym.is_native);
    }

    #[test]
    fn push_pop_scope_and_shadowing() {
        let mut table = SymbolTable::new();
        table.add_symbol_with_kind("x", Type::Int, SymbolKind::Global);
        table.push_scope();
        table.add_symbol_with_kind("x", Type::String, SymbolKind::Local);
        assert_eq!(table.lookup_symbol_current("x").unwrap().ty, Type::String);
        assert_eq!(table.lookup_symbol("x").unwrap().ty, Type::String);
        table.pop_scope().unwrap();
        assert_eq!(table.lookup_symbol("x").unwrap().ty, Type::Int);
    }

    #[test]
    fn cannot_pop_global_scope() {
        let mut table = SymbolTable::new();
        assert!(table.pop_scope().is_err());
    }

    #[test]
    fn thread_state_machine_transitions() {
        let mut table = SymbolTable::new();
        table.add_symbol_with_kind("h", Type::Int, SymbolKind::Local);
        table.mark_pending("h").unwrap();
        assert!(table.mark_pending("h").is_err());
        table.mark_synchronized("h").unwrap();
        assert!(table.mark_synchronized("h").is_err());
    }

    #[test]
    fn sync_unfreezes_captured_args() {
        let mut table = SymbolTable::new();
        table.add_symbol_with_kind("captured", Type::Int, SymbolKind::Local);
        table.add_symbol_with_kind("h", Type::Int, SymbolKind::Local);
        table.freeze_symbol("captured").unwrap();
        table.mark_pending("h").unwrap();
        table.lookup_symbol_mut("h").unwrap().frozen_args.push("captured".to_string());
        assert!(table.lookup_symbol("captured").unwrap().frozen.is_frozen());
        table.sync_variable("h").unwrap();
        assert!(!table.lookup_symbol("captured").unwrap().frozen.is_frozen());
    }

    #[test]
    fn scope_pop_rejects_pending_handle() {
        let mut table = SymbolTable::new();
        table.push_scope();
        table.add_symbol_with_kind("h", Type::Int, SymbolKind::Local);
        table.mark_pending("h").unwrap();
        assert!(table.pop_scope().is_err());
    }

    #[test]
    fn namespace_two_phase_lookup() {
        let mut table = SymbolTable::new();
        table.add_namespace("ns");
        table.add_function_to_namespace("ns", "helper", Type::function(Type::Void, vec![], vec![], false, false), FuncModifier::Default, false).unwrap();
        assert!(table.lookup_in_namespace("ns", "helper").is_some());
        assert!(table.lookup_in_namespace("ns", "missing").is_none());
    }
}
