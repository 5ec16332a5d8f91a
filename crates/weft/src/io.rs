//! File-access collaborator.
//!
//! Imports are the only I/O the pipeline performs, and they go through this
//! trait so hosts control where template source comes from. The engine maps
//! loader failures onto the normal error type for the current compile call.

use std::io;
use std::path::PathBuf;

use ahash::AHashMap;

/// Source provider for top-level compiles and `import`/`file` directives.
pub trait Loader {
    /// Reads the source for `path`, returning the canonical name used in
    /// diagnostics and cycle detection together with the contents.
    ///
    /// # Errors
    /// Any I/O failure; the engine surfaces it as a compile error.
    fn load(&self, path: &str) -> io::Result<(String, String)>;
}

/// Default loader reading from the file system under a root directory.
#[derive(Debug, Clone)]
pub struct FsLoader {
    root: PathBuf,
}

impl FsLoader {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Loader for FsLoader {
    fn load(&self, path: &str) -> io::Result<(String, String)> {
        let full = self.root.join(path);
        let text = std::fs::read_to_string(&full)?;
        Ok((full.display().to_string(), text))
    }
}

/// In-memory loader for tests and embedded template sets.
#[derive(Debug, Default, Clone)]
pub struct MemLoader {
    files: AHashMap<String, String>,
}

impl MemLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a template, builder-style.
    #[must_use]
    pub fn with(mut self, path: impl Into<String>, text: impl Into<String>) -> Self {
        self.files.insert(path.into(), text.into());
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, text: impl Into<String>) {
        self.files.insert(path.into(), text.into());
    }
}

impl Loader for MemLoader {
    fn load(&self, path: &str) -> io::Result<(String, String)> {
        self.files.get(path).map_or_else(
            || {
                Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no such template: {path}"),
                ))
            },
            |text| Ok((path.to_owned(), text.clone())),
        )
    }
}
