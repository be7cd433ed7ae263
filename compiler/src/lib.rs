//! Compiler library: lex, parse, type-check, and lower `.sn` source to C,
//! then drive the system C compiler to produce a linked executable.

pub mod arena;
pub mod ast;
pub mod builtins;
pub mod codegen;
pub mod config;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
pub mod symbol;
pub mod token;
pub mod typechecker;

pub use ast::{Module, PragmaKind, StmtKind, Type};
pub use codegen::{codegen_module, CodeGen, CodeGenError};
pub use config::{CompilerConfig, ExternalBuiltin};
pub use diagnostics::{Diagnostic, Diagnostics};
pub use parser::{parse_module_with_imports, parse_source};

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, instrument};

#[derive(Debug)]
pub enum CompileError {
    Io(std::io::Error),
    Diagnostics(Diagnostics),
    CodeGen(CodeGenError),
    Link { status: String, stderr: String },
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Io(e) => write!(f, "I/O error: {e}"),
            CompileError::Diagnostics(d) => write!(f, "{d}"),
            CompileError::CodeGen(e) => write!(f, "{e}"),
            CompileError::Link { status, stderr } => write!(f, "linking failed ({status}): {stderr}"),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<std::io::Error> for CompileError {
    fn from(e: std::io::Error) -> Self {
        CompileError::Io(e)
    }
}

impl From<CodeGenError> for CompileError {
    fn from(e: CodeGenError) -> Self {
        CompileError::CodeGen(e)
    }
}

/// Compile one `.sn` source file to a linked executable at `output_path`.
#[instrument(skip(config))]
pub fn compile_file(source_path: &Path, output_path: &Path, config: &CompilerConfig) -> Result<(), CompileError> {
    let arena = arena::Arena::new();
    let (module, parse_diags) = parse_module_with_imports(&arena, source_path);
    if parse_diags.has_errors() {
        return Err(CompileError::Diagnostics(parse_diags));
    }

    let type_diags = typechecker::check_module(source_path.to_string_lossy().to_string(), &module);
    if type_diags.has_errors() {
        return Err(CompileError::Diagnostics(type_diags));
    }

    let c_source = codegen_module(&module)?;

    let c_path = output_path.with_extension("c");
    fs::write(&c_path, &c_source)?;
    debug!(path = %c_path.display(), "wrote generated C source");

    let mut effective_config = config.clone();
    for name in link_pragma_names(&module) {
        effective_config.record_link_pragma(name);
    }
    link(&c_path, output_path, &effective_config)?;

    if !config.keep_generated_c {
        let _ = fs::remove_file(&c_path);
    }
    info!(output = %output_path.display(), "compiled");
    Ok(())
}

/// Run every phase (lex → parse → type-check → codegen) and return the
/// generated C translation unit, or the accumulated diagnostics on failure.
pub fn compile_source(source: &str, filename: &str) -> Result<String, CompileError> {
    let arena = arena::Arena::new();
    let (module, parse_diags) = parse_source(&arena, source, filename.to_string());
    if parse_diags.has_errors() {
        return Err(CompileError::Diagnostics(parse_diags));
    }

    let type_diags = typechecker::check_module(filename.to_string(), &module);
    if type_diags.has_errors() {
        return Err(CompileError::Diagnostics(type_diags));
    }

    let c_source = codegen_module(&module)?;
    Ok(c_source)
}

/// Collects the library names named by `#link "lib"` pragmas at the top
/// level of a module, in source order (spec §6 "`#link "lib"` is recorded
/// for the driver's downstream linker invocation").
fn link_pragma_names(module: &Module) -> Vec<String> {
    module
        .stmts
        .iter()
        .filter_map(|stmt| match &stmt.kind {
            StmtKind::Pragma { kind: PragmaKind::Link, value } => Some(value.clone()),
            _ => None,
        })
        .collect()
}

fn link(c_path: &Path, output_path: &Path, config: &CompilerConfig) -> Result<(), CompileError> {
    let mut cmd = Command::new("cc");
    cmd.arg(c_path).arg("-o").arg(output_path);
    for include in &config.include_paths {
        cmd.arg("-I").arg(include);
    }
    for lib in &config.libraries {
        cmd.arg(format!("-l{lib}"));
    }
    cmd.arg("-lsn_runtime");

    let output = cmd.output()?;
    if !output.status.success() {
        return Err(CompileError::Link {
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }
    Ok(())
}

pub fn default_output_path(source_path: &Path) -> PathBuf {
    source_path.with_extension("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_source_reports_parse_errors() {
        let err = compile_source("fn f(:\n", "t.sn").unwrap_err();
        assert!(matches!(err, CompileError::Diagnostics(_)));
    }

    #[test]
    fn compile_source_reports_type_errors() {
        let err = compile_source("fn f() =>\n    return y\n", "t.sn").unwrap_err();
        assert!(matches!(err, CompileError::Diagnostics(_)));
    }

    #[test]
    fn compile_source_succeeds_on_valid_program() {
        let c = compile_source("fn main() =>\n    return\n", "t.sn").unwrap();
        assert!(c.contains("int main"));
    }

    #[test]
    fn link_pragma_names_collects_link_directives_in_order() {
        let arena = arena::Arena::new();
        let (module, diags) = parse_source(&arena, "#link \"m\"\n#link \"pthread\"\nfn main() =>\n    return\n", "t.sn");
        assert!(!diags.has_errors(), "{diags}");
        assert_eq!(link_pragma_names(&module), vec!["m".to_string(), "pthread".to_string()]);
    }

    #[test]
    fn link_pragma_is_fed_into_effective_config_libraries() {
        let mut config = CompilerConfig::new().with_library("preexisting");
        for name in ["m", "preexisting"] {
            config.record_link_pragma(name);
        }
        assert_eq!(config.libraries, vec!["preexisting".to_string(), "m".to_string()]);
    }
}
