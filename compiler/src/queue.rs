use std::collections::VecDeque;
use std::sync::Mutex;

use protoforge_schema::{Schema, Service, Type};

/// One unit of code generation: a single type or service, addressed by file
/// and declaration index so units stay `Copy` and the schema stays shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationUnit {
    Type { file: usize, index: usize },
    Service { file: usize, index: usize },
}

impl GenerationUnit {
    pub fn resolve_type(self, schema: &Schema) -> Option<&Type> {
        match self {
            GenerationUnit::Type { file, index } => schema.files.get(file)?.types.get(index),
            GenerationUnit::Service { .. } => None,
        }
    }

    pub fn resolve_service(self, schema: &Schema) -> Option<&Service> {
        match self {
            GenerationUnit::Service { file, index } => schema.files.get(file)?.services.get(index),
            GenerationUnit::Type { .. } => None,
        }
    }

    pub fn name(self, schema: &Schema) -> &str {
        match self {
            GenerationUnit::Type { .. } => {
                self.resolve_type(schema).map(Type::name).unwrap_or("?")
            }
            GenerationUnit::Service { .. } => self
                .resolve_service(schema)
                .map(|service| service.name.as_str())
                .unwrap_or("?"),
        }
    }
}

/// A thread-safe pool of pending generation units. Workers pop until empty;
/// each unit is handed out exactly once.
#[derive(Debug, Default)]
pub struct WorkQueue {
    items: Mutex<VecDeque<GenerationUnit>>,
}

impl WorkQueue {
    pub fn new() -> WorkQueue {
        WorkQueue::default()
    }

    pub fn push_all(&self, units: impl IntoIterator<Item = GenerationUnit>) {
        let mut items = match self.items.lock() {
            Ok(items) => items,
            Err(poisoned) => poisoned.into_inner(),
        };
        items.extend(units);
    }

    pub fn pop(&self) -> Option<GenerationUnit> {
        let mut items = match self.items.lock() {
            Ok(items) => items,
            Err(poisoned) => poisoned.into_inner(),
        };
        items.pop_front()
    }

    pub fn len(&self) -> usize {
        match self.items.lock() {
            Ok(items) => items.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    use protoforge_schema::parser::parse_schema;
    use protoforge_schema::tokenizer::tokenize_schema;
    use protoforge_schema::verifier::verify_schema;

    #[test]
    fn unit_names_resolve_against_the_schema() {
        let text = "package demo; message M {} service S { rpc run (M) returns (M); }";
        let file = parse_schema(&tokenize_schema(text).unwrap()).unwrap();
        let mut schema = Schema::new(vec![file]);
        verify_schema(&mut schema).unwrap();

        assert_eq!(GenerationUnit::Type { file: 0, index: 0 }.name(&schema), "demo.M");
        assert_eq!(
            GenerationUnit::Service { file: 0, index: 0 }.name(&schema),
            "demo.S"
        );
        // Out-of-range units still produce a loggable name.
        assert_eq!(GenerationUnit::Type { file: 0, index: 9 }.name(&schema), "?");
    }

    #[test]
    fn pop_drains_in_push_order() {
        let queue = WorkQueue::new();
        queue.push_all([
            GenerationUnit::Type { file: 0, index: 0 },
            GenerationUnit::Service { file: 0, index: 0 },
        ]);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop(), Some(GenerationUnit::Type { file: 0, index: 0 }));
        assert_eq!(
            queue.pop(),
            Some(GenerationUnit::Service { file: 0, index: 0 })
        );
        assert_eq!(queue.pop(), None);
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn concurrent_pops_hand_out_each_unit_exactly_once() {
        let queue = WorkQueue::new();
        queue.push_all((0..1000).map(|index| GenerationUnit::Type { file: 0, index }));

        let popped: Vec<Vec<GenerationUnit>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        let mut mine = Vec::new();
                        while let Some(unit) = queue.pop() {
                            mine.push(unit);
                        }
                        mine
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .collect()
        });

        let all: Vec<GenerationUnit> = popped.into_iter().flatten().collect();
        assert_eq!(all.len(), 1000);
        let unique: HashSet<_> = all
            .iter()
            .map(|unit| match unit {
                GenerationUnit::Type { index, .. } => *index,
                GenerationUnit::Service { index, .. } => *index,
            })
            .collect();
        assert_eq!(unique.len(), 1000);
    }
}
