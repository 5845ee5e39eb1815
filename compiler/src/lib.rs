//! The Protoforge code generation pipeline: load `.pfs` schema files, prune
//! the type graph to what an identifier set keeps, and emit one source file
//! per type or service with a pool of worker threads.

pub mod compiler;
pub mod emit;
pub mod error;
pub mod queue;
pub mod sink;
pub mod workers;

pub use compiler::{Compiler, CompilerOptions, DESCRIPTOR_FILE};
pub use emit::{Emitter, RustEmitter, SourceFile, TypeScriptEmitter};
pub use error::CompileError;
pub use queue::{GenerationUnit, WorkQueue};
pub use sink::{ArtifactSink, FsSink};
pub use workers::{run_workers, MAX_WRITE_CONCURRENCY};
