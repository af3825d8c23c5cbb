//! Module source fetchers

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Supplies the source text of a module by name
pub trait SourceFetcher {
    /// Returns the source of `module`, or [`Error::ImportError`] when there is none
    fn fetch(&mut self, module: &str) -> Result<String>;
}

/// Looks modules up as files along a search path
///
/// Module `m` is the first existing `<dir>/m<ext>` over the directories in
/// order and the extensions in order.
#[derive(Debug, Clone)]
pub struct FileSources {
    paths: Vec<PathBuf>,
    extensions: Vec<String>,
}

impl FileSources {
    /// Empty search path with the `.vl` extension
    pub fn new() -> Self {
        FileSources {
            paths: Vec::new(),
            extensions: vec![".vl".to_string()],
        }
    }

    /// Search path from a list of directories
    pub fn with_paths<P: AsRef<Path>>(paths: impl IntoIterator<Item = P>) -> Self {
        let mut sources = FileSources::new();
        for path in paths {
            sources.add(path);
        }
        sources
    }

    /// Appends a directory; adding one twice keeps the first position
    pub fn add(&mut self, dir: impl AsRef<Path>) {
        let dir = dir.as_ref().to_path_buf();
        if !self.paths.contains(&dir) {
            self.paths.push(dir);
        }
    }

    /// Removes a directory from the search path
    pub fn remove(&mut self, dir: impl AsRef<Path>) {
        let dir = dir.as_ref();
        self.paths.retain(|p| p != dir);
    }

    /// Replaces the extension list
    pub fn set_extensions(&mut self, extensions: Vec<String>) {
        self.extensions = extensions;
    }

    /// Current search path
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl Default for FileSources {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceFetcher for FileSources {
    fn fetch(&mut self, module: &str) -> Result<String> {
        for dir in &self.paths {
            for ext in &self.extensions {
                let path = dir.join(format!("{}{}", module, ext));
                match std::fs::read_to_string(&path) {
                    Ok(text) => {
                        debug!(module, path = %path.display(), "read module source");
                        return Ok(text);
                    }
                    Err(e) if e.kind() == IoErrorKind::NotFound => continue,
                    Err(e) => return Err(Error::Io(format!("{}: {}", path.display(), e))),
                }
            }
        }
        Err(Error::ImportError {
            module: module.to_string(),
        })
    }
}

/// In-memory module sources
#[derive(Debug, Clone, Default)]
pub struct MemorySources {
    modules: HashMap<String, String>,
}

impl MemorySources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`MemorySources::add`]
    pub fn with(mut self, module: &str, source: &str) -> Self {
        self.add(module, source);
        self
    }

    /// Adds or replaces a module
    pub fn add(&mut self, module: &str, source: &str) {
        self.modules.insert(module.to_string(), source.to_string());
    }
}

impl SourceFetcher for MemorySources {
    fn fetch(&mut self, module: &str) -> Result<String> {
        self.modules
            .get(module)
            .cloned()
            .ok_or_else(|| Error::ImportError {
                module: module.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_memory_sources() {
        let mut sources = MemorySources::new().with("main", "on Init {}");
        assert_eq!(sources.fetch("main").unwrap(), "on Init {}");
        assert_eq!(sources.fetch("other").unwrap_err().kind(), ErrorKind::ImportError);
    }

    #[test]
    fn test_file_sources_search_path() {
        let dir = std::env::temp_dir().join(format!("vectorl-sources-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("lib.vl"), "var int x = 1;").unwrap();

        let mut sources = FileSources::new();
        assert_eq!(sources.fetch("lib").unwrap_err().kind(), ErrorKind::ImportError);
        sources.add(&dir);
        sources.add(&dir);
        assert_eq!(sources.paths().len(), 1);
        assert_eq!(sources.fetch("lib").unwrap(), "var int x = 1;");
        sources.remove(&dir);
        assert!(sources.paths().is_empty());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
