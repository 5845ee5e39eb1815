//! End-to-end pipeline tests: schema files on disk in, generated sources out.

use std::fs;
use std::path::Path;

use protoforge_compiler::{Compiler, CompilerOptions, DESCRIPTOR_FILE};

const API: &str = r#"
    package demo;

    enum Status { OK = 1; GONE = 2; }

    message Person {
      required string name = 1;
      optional Status status = 2;
    }

    message Audit { optional string detail = 1; }

    service Directory {
      rpc lookup (Person) returns (Person);
    }
"#;

fn write_schema(root: &Path, name: &str, text: &str) {
    let path = root.join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn options(root: &Path, out: &Path) -> CompilerOptions {
    CompilerOptions {
        proto_paths: vec![root.to_path_buf()],
        rust_out: Some(out.to_path_buf()),
        ..Default::default()
    }
}

#[test]
fn compiles_every_declaration_to_one_file_each() {
    let root = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_schema(root.path(), "api.pfs", API);

    let emitted = Compiler::new(options(root.path(), out.path()))
        .unwrap()
        .compile()
        .unwrap();
    assert_eq!(emitted, 4);

    let person = fs::read_to_string(out.path().join("demo/person.rs")).unwrap();
    assert!(person.contains("pub struct Person {"));
    assert!(person.contains("pub status: Option<Status>,"));
    let directory = fs::read_to_string(out.path().join("demo/directory.rs")).unwrap();
    assert!(directory.contains("pub trait Directory {"));
}

#[test]
fn pruning_limits_what_is_emitted() {
    let root = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_schema(root.path(), "api.pfs", API);

    let mut options = options(root.path(), out.path());
    options.includes = vec!["demo.Person".to_owned()];
    let emitted = Compiler::new(options).unwrap().compile().unwrap();

    // Person plus its Status dependency; Audit and Directory are unreachable.
    assert_eq!(emitted, 2);
    assert!(out.path().join("demo/person.rs").is_file());
    assert!(out.path().join("demo/status.rs").is_file());
    assert!(!out.path().join("demo/audit.rs").exists());
    assert!(!out.path().join("demo/directory.rs").exists());
}

#[test]
fn dry_run_writes_nothing() {
    let root = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_schema(root.path(), "api.pfs", API);

    let mut options = options(root.path(), out.path());
    options.dry_run = true;
    let emitted = Compiler::new(options).unwrap().compile().unwrap();
    assert_eq!(emitted, 4);
    assert!(fs::read_dir(out.path()).unwrap().next().is_none());
}

#[test]
fn named_files_only_skips_other_files_but_keeps_the_descriptor() {
    let root = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_schema(root.path(), "api.pfs", API);
    write_schema(root.path(), "extra.pfs", "package extra; message Widget {}");
    write_schema(
        root.path(),
        DESCRIPTOR_FILE,
        "package protoforge; message FileDescriptor { optional string path = 1; }",
    );

    let mut options = options(root.path(), out.path());
    options.source_files = vec!["api.pfs".to_owned()];
    options.named_files_only = true;
    let emitted = Compiler::new(options).unwrap().compile().unwrap();

    // Everything in api.pfs, plus the descriptor, but not extra.pfs.
    assert_eq!(emitted, 5);
    assert!(out.path().join("protoforge/file_descriptor.rs").is_file());
    assert!(!out.path().join("extra/widget.rs").exists());
}

#[test]
fn typescript_output_is_selectable() {
    let root = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_schema(root.path(), "api.pfs", API);

    let options = CompilerOptions {
        proto_paths: vec![root.path().to_path_buf()],
        ts_out: Some(out.path().to_path_buf()),
        ..Default::default()
    };
    Compiler::new(options).unwrap().compile().unwrap();
    let person = fs::read_to_string(out.path().join("demo/Person.ts")).unwrap();
    assert!(person.contains("export interface Person {"));
}

#[test]
fn missing_schema_file_is_an_error() {
    let root = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    let mut options = options(root.path(), out.path());
    options.source_files = vec!["ghost.pfs".to_owned()];
    assert!(Compiler::new(options).unwrap().compile().is_err());
}
