//! Sn Compiler CLI
//!
//! Command-line interface for compiling `.sn` programs to executables.

use clap::Parser as ClapParser;
use snc_lib::{compile_file, default_output_path, CompilerConfig};
use std::path::PathBuf;
use std::process;
use tracing::error;

#[derive(ClapParser)]
#[command(name = "snc")]
#[command(about = "Sn compiler - compile .sn programs to executables", long_about = None)]
struct Cli {
    /// Input .sn source file
    input: PathBuf,

    /// Output executable path (defaults to the input path without its extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Keep the generated C source alongside the executable
    #[arg(long)]
    keep_c: bool,

    /// Additional include search path (repeatable)
    #[arg(short = 'I', long = "include")]
    includes: Vec<String>,

    /// Additional library to link (repeatable)
    #[arg(short = 'l', long = "link")]
    libraries: Vec<String>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    install_tracing(cli.verbose);

    let output = cli.output.clone().unwrap_or_else(|| default_output_path(&cli.input));
    let config = CompilerConfig::new()
        .with_keep_generated_c(cli.keep_c)
        .with_include_paths(cli.includes.iter().cloned())
        .with_libraries(cli.libraries.iter().cloned());

    match compile_file(&cli.input, &output, &config) {
        Ok(()) => {
            println!("Compiled {} -> {}", cli.input.display(), output.display());
        }
        Err(e) => {
            error!(%e, "compilation failed");
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

fn install_tracing(verbosity: u8) {
    use tracing_subscriber::EnvFilter;
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}
