use std::path::PathBuf;

use protoforge_schema::{IdentifierSet, Schema, SchemaLoader};
use tracing::{info, warn};

use crate::emit::{Emitter, RustEmitter, TypeScriptEmitter};
use crate::error::CompileError;
use crate::queue::{GenerationUnit, WorkQueue};
use crate::sink::FsSink;
use crate::workers::run_workers;

/// The descriptor schema ships with every installation and is always
/// emitted, even when an explicit file list would otherwise skip it.
pub const DESCRIPTOR_FILE: &str = "protoforge/descriptor.pfs";

/// Everything the orchestrator needs to run one compilation.
#[derive(Debug, Clone, Default)]
pub struct CompilerOptions {
    /// Directories searched for `.pfs` files. Every schema file under a
    /// root is loaded.
    pub proto_paths:      Vec<PathBuf>,
    /// Output directory for generated Rust. Mutually exclusive with
    /// `ts_out`.
    pub rust_out:         Option<PathBuf>,
    /// Output directory for generated TypeScript. Mutually exclusive with
    /// `rust_out`.
    pub ts_out:           Option<PathBuf>,
    /// Schema files named explicitly, by root-relative path.
    pub source_files:     Vec<String>,
    /// Include rules for pruning; see [`IdentifierSet`].
    pub includes:         Vec<String>,
    /// Exclude rules for pruning.
    pub excludes:         Vec<String>,
    /// Run the whole pipeline but write nothing.
    pub dry_run:          bool,
    /// Emit only declarations from `source_files` (plus the descriptor)
    /// instead of everything loaded.
    pub named_files_only: bool,
    /// Add serde derives to generated Rust.
    pub serde_interop:    bool,
}

/// Loads, prunes, and emits a schema with a pool of worker threads.
pub struct Compiler {
    options: CompilerOptions,
}

impl Compiler {
    pub fn new(options: CompilerOptions) -> Result<Compiler, CompileError> {
        match (&options.rust_out, &options.ts_out) {
            (Some(_), Some(_)) => Err(CompileError::Config(
                "rust_out and ts_out are mutually exclusive".to_owned(),
            )),
            (None, None) => Err(CompileError::Config(
                "one of rust_out or ts_out is required".to_owned(),
            )),
            _ => Ok(Compiler { options }),
        }
    }

    /// Runs the full pipeline. Returns the number of artifacts emitted.
    pub fn compile(&self) -> Result<usize, CompileError> {
        let schema = self.load()?;
        info!(
            files = schema.files.len(),
            types = schema.types().count(),
            services = schema.services().count(),
            "schema loaded"
        );

        let schema = self.prune(schema)?;

        let queue = WorkQueue::new();
        queue.push_all(self.units(&schema));
        info!(units = queue.len(), "generation queue built");

        let (emitter, out_dir): (Box<dyn Emitter>, &PathBuf) =
            match (&self.options.rust_out, &self.options.ts_out) {
                (Some(dir), None) => (
                    Box::new(RustEmitter::new(self.options.serde_interop)),
                    dir,
                ),
                (None, Some(dir)) => (Box::new(TypeScriptEmitter::new()), dir),
                _ => {
                    return Err(CompileError::Config(
                        "one of rust_out or ts_out is required".to_owned(),
                    ))
                }
            };

        let sink = FsSink::new(out_dir);
        run_workers(&schema, &queue, emitter.as_ref(), &sink, self.options.dry_run)
    }

    fn load(&self) -> Result<Schema, CompileError> {
        let mut loader = SchemaLoader::new();
        for root in &self.options.proto_paths {
            loader.add_root(root);
        }
        for name in &self.options.source_files {
            loader.add_file(name);
        }
        Ok(loader.load()?)
    }

    fn prune(&self, schema: Schema) -> Result<Schema, CompileError> {
        let set = IdentifierSet::new(&self.options.includes, &self.options.excludes)?;
        if set.is_empty() {
            return Ok(schema);
        }
        let result = schema.prune(&set);
        for rule in &result.unused_includes {
            warn!(rule = %rule, "unused include");
        }
        for rule in &result.unused_excludes {
            warn!(rule = %rule, "unused exclude");
        }
        info!(
            types = result.schema.types().count(),
            services = result.schema.services().count(),
            "schema pruned"
        );
        Ok(result.schema)
    }

    fn units(&self, schema: &Schema) -> Vec<GenerationUnit> {
        let filter = self.options.named_files_only && !self.options.source_files.is_empty();
        let mut units = Vec::new();
        for (file, proto_file) in schema.files.iter().enumerate() {
            if filter
                && proto_file.path != DESCRIPTOR_FILE
                && !self.options.source_files.contains(&proto_file.path)
            {
                continue;
            }
            for index in 0..proto_file.types.len() {
                units.push(GenerationUnit::Type { file, index });
            }
            for index in 0..proto_file.services.len() {
                units.push(GenerationUnit::Service { file, index });
            }
        }
        units
    }
}
