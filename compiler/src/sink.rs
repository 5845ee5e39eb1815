use std::fs;
use std::io;
use std::path::PathBuf;

use crate::emit::SourceFile;

/// Destination for generated artifacts. Sinks are shared across worker
/// threads and so must be `Sync`.
pub trait ArtifactSink: Sync {
    fn write(&self, file: &SourceFile) -> io::Result<()>;
}

/// Writes artifacts under one output directory, creating intermediate
/// directories as needed.
#[derive(Debug)]
pub struct FsSink {
    out_dir: PathBuf,
}

impl FsSink {
    pub fn new(out_dir: impl Into<PathBuf>) -> FsSink {
        FsSink {
            out_dir: out_dir.into(),
        }
    }
}

impl ArtifactSink for FsSink {
    fn write(&self, file: &SourceFile) -> io::Result<()> {
        let path = self.out_dir.join(&file.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &file.contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_into_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsSink::new(dir.path());
        let file = SourceFile {
            type_name: "demo.Thing".to_owned(),
            path:      PathBuf::from("demo/thing.rs"),
            contents:  "pub struct Thing;\n".to_owned(),
        };
        sink.write(&file).unwrap();
        let written = fs::read_to_string(dir.path().join("demo/thing.rs")).unwrap();
        assert_eq!(written, "pub struct Thing;\n");
    }
}
