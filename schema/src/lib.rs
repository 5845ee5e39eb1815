//! Schema model for the Protoforge compiler: the resolved type graph, the
//! include/exclude identifier set, and the reachability pruner that reduces a
//! schema to the subset reachable from user-selected roots.
//!
//! ```
//! use protoforge_schema::{IdentifierSet, SchemaLoader};
//! # use protoforge_schema::{Schema, parser::parse_schema, tokenizer::tokenize_schema, verifier::verify_schema};
//!
//! let mut file = parse_schema(&tokenize_schema(
//!     "package demo; message A { optional B b = 1; } message B {} message C {}",
//! ).unwrap()).unwrap();
//! file.path = "demo.pfs".to_owned();
//! let mut schema = Schema::new(vec![file]);
//! verify_schema(&mut schema).unwrap();
//!
//! let set = IdentifierSet::new(&["demo.A".to_owned()], &[]).unwrap();
//! let pruned = schema.prune(&set);
//! assert!(pruned.schema.get_message("demo.B").is_some());
//! assert!(pruned.schema.get_message("demo.C").is_none());
//! ```

pub mod error;
pub mod ident;
pub mod loader;
pub mod model;
pub mod parser;
pub mod pruner;
pub mod tokenizer;
pub mod utils;
pub mod verifier;

pub use error::SchemaError;
pub use ident::{IdentifierSet, Rule};
pub use loader::{SchemaLoader, SCHEMA_EXTENSION};
pub use model::{
    EnumConstant, EnumType, Field, FieldType, Label, MessageType, ProtoFile, Rpc, Schema, Service,
    Type,
};
pub use pruner::PruneResult;
