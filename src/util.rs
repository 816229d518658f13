use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;

/// Opens `path`, naming the `kind` of file in the error.
pub fn open(path: &Path, kind: &str) -> Result<File> {
    File::open(path).with_context(|| format!("Opening {} file `{}`", kind, path.display()))
}

/// Reads `path` to a string, naming the `kind` of file in the error.
pub fn read_to_string(path: &Path, kind: &str) -> Result<String> {
    use std::io::Read;
    let mut contents = String::new();
    open(path, kind)?
        .read_to_string(&mut contents)
        .with_context(|| format!("Reading {} file `{}`", kind, path.display()))?;
    Ok(contents)
}
