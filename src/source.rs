//! Loading of a project's Rust sources.
//!
//! [`SourceSet::load`] walks a project directory, skipping `target` and hidden
//! directories, and parses every `.rs` file with `syn`. Files that cannot be
//! read or parsed are reported as warnings so that partial documentation can
//! still be produced.

use crate::error::{Error, Result};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A successfully parsed Rust file with its abstract syntax tree.
#[derive(Debug)]
pub struct SourceFile {
    pub path: PathBuf,
    pub syntax_tree: syn::File,
}

impl SourceFile {
    /// Parses a single Rust source file
    pub fn parse(path: &Path) -> Result<SourceFile> {
        debug!("Parsing file: {}", path.display());
        let content = fs::read_to_string(path)?;
        let syntax_tree = syn::parse_file(&content).map_err(|e| Error::ParseError {
            file: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(SourceFile {
            path: path.to_path_buf(),
            syntax_tree,
        })
    }
}

/// The parsed sources of a project
#[derive(Debug, Default)]
pub struct SourceSet {
    pub files: Vec<SourceFile>,
    /// Problems encountered while walking or parsing; none of them is fatal
    pub warnings: Vec<String>,
}

impl SourceSet {
    /// Walks `root` and parses every Rust file found.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` does not exist or is not a directory.
    pub fn load(root: &Path) -> Result<SourceSet> {
        if !root.is_dir() {
            return Err(Error::InvalidArgument(format!(
                "Project path is not a directory: {}",
                root.display()
            )));
        }

        let mut set = SourceSet::default();
        let mut paths = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name().into_iter().filter_entry(|e| {
            // Don't filter the root directory itself
            if e.path() == root {
                return true;
            }
            let file_name = e.file_name().to_string_lossy();
            !file_name.starts_with('.') && file_name != "target"
        }) {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("rs") {
                        paths.push(path.to_path_buf());
                    }
                }
                Err(e) => set.warn(format!("Failed to access path: {}", e)),
            }
        }

        for path in paths {
            match SourceFile::parse(&path) {
                Ok(file) => set.files.push(file),
                Err(e) => set.warn(format!("Skipping {}: {}", path.display(), e)),
            }
        }

        debug!(
            "Loaded {} source file(s) with {} warning(s)",
            set.files.len(),
            set.warnings.len()
        );
        Ok(set)
    }

    fn warn(&mut self, warning: String) {
        warn!("{}", warning);
        self.warnings.push(warning);
    }
}
