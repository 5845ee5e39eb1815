use protoforge_runtime::{CodecError, FieldValue, MessageAdapter};
use protoforge_schema::parser::parse_schema;
use protoforge_schema::tokenizer::tokenize_schema;
use protoforge_schema::verifier::verify_schema;
use protoforge_schema::{Schema, SchemaError};

const SCHEMA: &str = r#"
    package demo;

    enum Status { ACTIVE = 1; SUSPENDED = 2; }

    message Account {
      required string name = 1;
      optional Status status = 2;
      optional string api_key = 3 [sensitive];
      repeated uint32 logins = 4;
    }
"#;

fn load_schema() -> Result<Schema, SchemaError> {
    let file = parse_schema(&tokenize_schema(SCHEMA)?)?;
    let mut schema = Schema::new(vec![file]);
    verify_schema(&mut schema)?;
    Ok(schema)
}

fn main() -> Result<(), CodecError> {
    let schema = match load_schema() {
        Ok(schema) => schema,
        Err(error) => {
            eprintln!("schema error: {}", error);
            std::process::exit(1);
        }
    };

    let adapter = MessageAdapter::new(&schema, "demo.Account")?;

    let account = adapter
        .builder()
        .set("name", FieldValue::String("ada".to_owned()))?
        .set("status", FieldValue::Enum(1))?
        .set("api_key", FieldValue::String("s3cret".to_owned()))?
        .set(
            "logins",
            FieldValue::Repeated(vec![FieldValue::UInt32(3), FieldValue::UInt32(7)]),
        )?
        .build()?;

    let encoded = adapter.encode_to_vec(&account);
    println!("encoded {} bytes: {:?}", encoded.len(), encoded);

    let decoded = adapter.decode(&encoded)?;
    println!("round trip equal: {}", decoded == account);

    let redacted = adapter.redact(&decoded);
    println!("api_key after redact: {:?}", redacted.get(3));

    Ok(())
}
