use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use protoforge_schema::Schema;
use tracing::info;

use crate::emit::Emitter;
use crate::error::CompileError;
use crate::queue::{GenerationUnit, WorkQueue};
use crate::sink::ArtifactSink;

/// Upper bound on concurrent artifact writers.
pub const MAX_WRITE_CONCURRENCY: usize = 8;

/// Drains the queue with a fixed pool of worker threads, emitting one
/// artifact per unit. A worker stops at its own first failure; the rest
/// keep draining, and the first error reported wins. Returns the number of
/// artifacts emitted.
pub fn run_workers(
    schema: &Schema,
    queue: &WorkQueue,
    emitter: &dyn Emitter,
    sink: &dyn ArtifactSink,
    dry_run: bool,
) -> Result<usize, CompileError> {
    let worker_count = queue.len().clamp(1, MAX_WRITE_CONCURRENCY);
    let emitted = AtomicUsize::new(0);

    let results: Vec<Result<(), CompileError>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..worker_count)
            .map(|_| scope.spawn(|| drain_queue(schema, queue, emitter, sink, dry_run, &emitted)))
            .collect();
        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(result) => result,
                Err(_) => Err(CompileError::WorkerPanic),
            })
            .collect()
    });

    for result in results {
        result?;
    }
    Ok(emitted.load(Ordering::Relaxed))
}

fn drain_queue(
    schema: &Schema,
    queue: &WorkQueue,
    emitter: &dyn Emitter,
    sink: &dyn ArtifactSink,
    dry_run: bool,
    emitted: &AtomicUsize,
) -> Result<(), CompileError> {
    while let Some(unit) = queue.pop() {
        let file = match unit {
            GenerationUnit::Type { .. } => {
                let Some(ty) = unit.resolve_type(schema) else {
                    continue;
                };
                emitter.emit_type(schema, ty)
            }
            GenerationUnit::Service { .. } => {
                let Some(service) = unit.resolve_service(schema) else {
                    continue;
                };
                emitter.emit_service(schema, service)
            }
        };

        info!(
            artifact = %unit.name(schema),
            path = %file.path.display(),
            dry_run,
            "emitting artifact"
        );
        if !dry_run {
            sink.write(&file).map_err(|source| CompileError::Emit {
                type_name: file.type_name.clone(),
                path:      file.path.clone(),
                source,
            })?;
        }
        emitted.fetch_add(1, Ordering::Relaxed);
    }
    Ok(())
}
