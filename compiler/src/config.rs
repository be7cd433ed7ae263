//! Compiler configuration for extensibility
//!
//! Allows embedding projects to extend the compiler with additional native
//! function bindings and link/include directives without modifying the core
//! compiler.
//!
//! # Example
//!
//! ```rust,ignore
//! use snc_lib::{CompilerConfig, ExternalBuiltin};
//!
//! let config = CompilerConfig::new()
//!     .with_builtin(ExternalBuiltin::new("journal_append", "my_runtime_journal_append"))
//!     .with_include_path("/opt/sn/include")
//!     .with_library("myruntime");
//! ```

use crate::ast::Type;

/// Definition of an external native function, provided by a runtime
/// extension, that should be callable from source without an explicit
/// `native` declaration.
#[derive(Debug, Clone)]
pub struct ExternalBuiltin {
    /// The name used in source (e.g. `journal_append`).
    pub sn_name: String,
    /// The C symbol name for linking (e.g. `my_runtime_journal_append`).
    pub symbol: String,
    /// Optional function type for checking; `None` means arguments are
    /// accepted without static type checking.
    pub ty: Option<Type>,
}

impl ExternalBuiltin {
    pub fn new(sn_name: impl Into<String>, symbol: impl Into<String>) -> Self {
        ExternalBuiltin { sn_name: sn_name.into(), symbol: symbol.into(), ty: None }
    }

    pub fn with_type(sn_name: impl Into<String>, symbol: impl Into<String>, ty: Type) -> Self {
        ExternalBuiltin { sn_name: sn_name.into(), symbol: symbol.into(), ty: Some(ty) }
    }
}

/// Configuration accumulated by the driver: external builtins, `#include`
/// search paths, and `#link` directives gathered while processing pragmas
/// and imports (spec §4.2, §4.3).
#[derive(Debug, Clone, Default)]
pub struct CompilerConfig {
    pub external_builtins: Vec<ExternalBuiltin>,
    pub include_paths: Vec<String>,
    pub libraries: Vec<String>,
    /// Emit the generated C source alongside the binary instead of deleting it.
    pub keep_generated_c: bool,
}

impl CompilerConfig {
    pub fn new() -> Self {
        CompilerConfig::default()
    }

    pub fn with_builtin(mut self, builtin: ExternalBuiltin) -> Self {
        self.external_builtins.push(builtin);
        self
    }

    pub fn with_builtins(mut self, builtins: impl IntoIterator<Item = ExternalBuiltin>) -> Self {
        self.external_builtins.extend(builtins);
        self
    }

    pub fn with_include_path(mut self, path: impl Into<String>) -> Self {
        self.include_paths.push(path.into());
        self
    }

    pub fn with_include_paths(mut self, paths: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.include_paths.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn with_library(mut self, lib: impl Into<String>) -> Self {
        self.libraries.push(lib.into());
        self
    }

    pub fn with_libraries(mut self, libs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.libraries.extend(libs.into_iter().map(Into::into));
        self
    }

    pub fn with_keep_generated_c(mut self, keep: bool) -> Self {
        self.keep_generated_c = keep;
        self
    }

    /// Record a `#link <name>` pragma encountered while parsing (spec §4.2).
    pub fn record_link_pragma(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.libraries.contains(&name) {
            self.libraries.push(name);
        }
    }

    /// Record a `#include <path>` pragma encountered while parsing.
    pub fn record_include_pragma(&mut self, path: impl Into<String>) {
        let path = path.into();
        if !self.include_paths.contains(&path) {
            self.include_paths.push(path);
        }
    }

    pub fn external_names(&self) -> Vec<&str> {
        self.external_builtins.iter().map(|b| b.sn_name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates_settings() {
        let config = CompilerConfig::new()
            .with_builtin(ExternalBuiltin::new("func_a", "sym_a"))
            .with_include_path("/custom/include")
            .with_library("myruntime");

        assert_eq!(config.external_builtins.len(), 1);
        assert_eq!(config.include_paths, vec!["/custom/include"]);
        assert_eq!(config.libraries, vec!["myruntime"]);
    }

    #[test]
    fn link_pragma_dedups() {
        let mut config = CompilerConfig::new();
        config.record_link_pragma("m");
        config.record_link_pragma("m");
        assert_eq!(config.libraries, vec!["m"]);
    }

    #[test]
    fn external_names_lists_sn_side_names() {
        let config = CompilerConfig::new()
            .with_builtin(ExternalBuiltin::new("func_a", "sym_a"))
            .with_builtin(ExternalBuiltin::new("func_b", "sym_b"));
        assert_eq!(config.external_names(), vec!["func_a", "func_b"]);
    }
}
