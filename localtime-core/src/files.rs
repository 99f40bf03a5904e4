//! HTML files on disk: discovery, binding and change detection.

use crate::binder::{BindReport, Binder, Clock, Trigger};
use crate::error::Result;
use crate::markup::HtmlDocument;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Expand input arguments into file paths.
///
/// Arguments naming an existing path are taken literally; anything else is
/// treated as a glob pattern. Matches are returned in pattern order, each
/// pattern's matches sorted, without duplicates.
pub fn discover_files(inputs: &[String]) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();

    for input in inputs {
        let literal = Path::new(input);
        if literal.exists() {
            if !files.iter().any(|f| f == literal) {
                files.push(literal.to_path_buf());
            }
            continue;
        }

        let mut matches: Vec<PathBuf> = glob::glob(input)?
            .flatten()
            .filter(|p| p.is_file())
            .collect();
        matches.sort();

        if matches.is_empty() {
            tracing::warn!(pattern = %input, "Input pattern matched no files");
        }
        for path in matches {
            if !files.contains(&path) {
                files.push(path);
            }
        }
    }

    Ok(files)
}

/// A file after one bind pass.
#[derive(Debug)]
pub struct BoundFile {
    pub path: PathBuf,
    pub document: HtmlDocument,
    pub report: BindReport,
}

impl BoundFile {
    /// Rendered markup with local times applied
    pub fn html(&self) -> String {
        self.document.to_html()
    }

    /// Write the rendered markup to `path`.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.html())?;
        tracing::debug!(path = %path.display(), "Wrote bound document");
        Ok(())
    }
}

/// Read `path` and run one bind pass over it.
pub fn bind_file<C: Clock>(binder: &Binder<C>, trigger: Trigger, path: &Path) -> Result<BoundFile> {
    let source = std::fs::read_to_string(path)?;
    let mut document = HtmlDocument::parse(source);
    let report = binder.handle(trigger, &mut document);

    tracing::info!(
        path = %path.display(),
        %trigger,
        matched = report.matched,
        updated = report.updated,
        diagnostics = report.diagnostics.len(),
        "Bound file"
    );

    Ok(BoundFile {
        path: path.to_path_buf(),
        document,
        report,
    })
}

/// Detects when a file has been replaced or rewritten.
#[derive(Debug)]
pub struct FileWatch {
    path: PathBuf,
    last_modified: Option<SystemTime>,
}

impl FileWatch {
    /// Start watching; the current state counts as already seen.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let last_modified = modified_time(&path);
        Self {
            path,
            last_modified,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether writing to `other` would rewrite the watched file.
    pub fn is_same_file(&self, other: &Path) -> bool {
        match (self.path.canonicalize(), other.canonicalize()) {
            (Ok(watched), Ok(other)) => watched == other,
            _ => false,
        }
    }

    /// Accept the file's current state as seen, so our own write to it is
    /// not reported as a change.
    pub fn refresh(&mut self) {
        self.last_modified = modified_time(&self.path);
    }

    /// True if the modification time changed since the last call.
    ///
    /// A file that disappears is not a change; its reappearance is.
    pub fn changed(&mut self) -> bool {
        match modified_time(&self.path) {
            Some(current) if Some(current) != self.last_modified => {
                self.last_modified = Some(current);
                true
            }
            Some(_) => false,
            None => {
                self.last_modified = None;
                false
            }
        }
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}
