use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use protoforge_compiler::{CompileError, Compiler, CompilerOptions};

#[derive(Parser)]
#[command(name = "pforge")]
#[command(about = "Generate source code from .pfs schema files", long_about = None)]
struct Cli {
    /// Directory to search for schema files; may repeat
    #[arg(long = "proto-path", value_name = "DIR")]
    proto_paths: Vec<PathBuf>,

    /// Output directory for generated Rust
    #[arg(long = "rust-out", value_name = "DIR")]
    rust_out: Option<PathBuf>,

    /// Output directory for generated TypeScript
    #[arg(long = "ts-out", value_name = "DIR")]
    ts_out: Option<PathBuf>,

    /// File listing schema files to compile, one per line
    #[arg(long = "files", value_name = "LIST")]
    files: Option<PathBuf>,

    /// Prune the schema to these roots, e.g. demo.Person or demo.*
    #[arg(long = "includes", value_delimiter = ',', value_name = "RULES")]
    includes: Vec<String>,

    /// Drop these identifiers and everything only reachable through them
    #[arg(long = "excludes", value_delimiter = ',', value_name = "RULES")]
    excludes: Vec<String>,

    /// Log warnings and errors only
    #[arg(long)]
    quiet: bool,

    /// Run the whole pipeline but write nothing
    #[arg(long = "dry-run")]
    dry_run: bool,

    /// Emit only the named schema files instead of everything loaded
    #[arg(long = "named-files-only")]
    named_files_only: bool,

    /// Add serde derives to generated Rust
    #[arg(long = "serde-interop")]
    serde_interop: bool,

    /// Schema files to compile, by root-relative path
    sources: Vec<String>,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.quiet { Level::WARN } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_level.to_string())),
        )
        .with_target(false)
        .init();

    if let Err(error) = run(cli) {
        eprintln!("Fatal: {}", error);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CompileError> {
    let mut source_files = cli.sources;
    if let Some(list) = &cli.files {
        let text = fs::read_to_string(list)?;
        source_files.extend(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_owned),
        );
    }

    let compiler = Compiler::new(CompilerOptions {
        proto_paths: cli.proto_paths,
        rust_out: cli.rust_out,
        ts_out: cli.ts_out,
        source_files,
        includes: cli.includes,
        excludes: cli.excludes,
        dry_run: cli.dry_run,
        named_files_only: cli.named_files_only,
        serde_interop: cli.serde_interop,
    })?;
    let emitted = compiler.compile()?;
    tracing::info!(artifacts = emitted, "done");
    Ok(())
}
