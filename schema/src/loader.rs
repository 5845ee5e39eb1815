use std::fs;
use std::path::{Path, PathBuf};

use crate::{
    error::SchemaError, model::Schema, parser::parse_schema, tokenizer::tokenize_schema,
    verifier::verify_schema,
};

/// Schema file extension.
pub const SCHEMA_EXTENSION: &str = "pfs";

/// Reads schema files from a set of search roots and produces one immutable,
/// verified [`Schema`]. Every `.pfs` file under the roots is loaded, plus
/// any files named explicitly (which may live outside the roots).
#[derive(Debug, Default)]
pub struct SchemaLoader {
    roots: Vec<PathBuf>,
    files: Vec<String>,
}

impl SchemaLoader {
    pub fn new() -> SchemaLoader {
        SchemaLoader::default()
    }

    pub fn add_root(&mut self, root: impl Into<PathBuf>) -> &mut Self {
        self.roots.push(root.into());
        self
    }

    pub fn add_file(&mut self, name: impl Into<String>) -> &mut Self {
        self.files.push(name.into());
        self
    }

    pub fn load(&self) -> Result<Schema, SchemaError> {
        let mut names = self.discover()?;
        names.extend(self.files.iter().cloned());
        names.sort();
        names.dedup();

        let mut files = Vec::with_capacity(names.len());
        for name in names {
            let path = self.locate(&name)?;
            let text = fs::read_to_string(&path)?;
            let tokens = tokenize_schema(&text)?;
            let mut file = parse_schema(&tokens)?;
            file.path = name;
            files.push(file);
        }

        let mut schema = Schema::new(files);
        verify_schema(&mut schema)?;
        Ok(schema)
    }

    fn locate(&self, name: &str) -> Result<PathBuf, SchemaError> {
        for root in &self.roots {
            let candidate = root.join(name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
        let direct = PathBuf::from(name);
        if direct.is_file() {
            return Ok(direct);
        }
        Err(SchemaError::FileNotFound(name.to_owned()))
    }

    fn discover(&self) -> Result<Vec<String>, SchemaError> {
        let mut names = Vec::new();
        for root in &self.roots {
            walk(root, root, &mut names)?;
        }
        names.sort();
        names.dedup();
        Ok(names)
    }
}

fn walk(root: &Path, dir: &Path, names: &mut Vec<String>) -> Result<(), SchemaError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk(root, &path, names)?;
        } else if path.extension().is_some_and(|ext| ext == SCHEMA_EXTENSION) {
            let relative = path.strip_prefix(root).unwrap_or(&path);
            names.push(relative.to_string_lossy().replace('\\', "/"));
        }
    }
    Ok(())
}
