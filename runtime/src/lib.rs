//! Schema-driven wire codec: encode, decode, and redact message values
//! against a verified [`protoforge_schema::Schema`] without generated code.
//!
//! ```
//! use protoforge_runtime::{FieldValue, MessageAdapter};
//! use protoforge_schema::{parser::parse_schema, tokenizer::tokenize_schema};
//! use protoforge_schema::{verifier::verify_schema, Schema};
//!
//! let file = parse_schema(&tokenize_schema(
//!     "message Ping { required uint32 seq = 1; }",
//! ).unwrap()).unwrap();
//! let mut schema = Schema::new(vec![file]);
//! verify_schema(&mut schema).unwrap();
//!
//! let adapter = MessageAdapter::new(&schema, "Ping").unwrap();
//! let ping = adapter
//!     .builder()
//!     .set("seq", FieldValue::UInt32(42)).unwrap()
//!     .build().unwrap();
//! assert_eq!(adapter.decode(&adapter.encode_to_vec(&ping)).unwrap(), ping);
//! ```

pub mod error;
pub mod value;
pub mod wire;

pub use error::CodecError;
pub use value::{FieldValue, MessageAdapter, MessageBuilder, MessageValue};
pub use wire::{ProtoReader, ProtoWriter, WireKind};
