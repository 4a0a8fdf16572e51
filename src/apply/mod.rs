use anyhow::{anyhow, Result};
use fs_err as fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::project::Project;
use crate::safety::path_is_allowed;
use crate::wire::FileEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyKind { Created, Updated, Unchanged }

#[derive(Debug, Clone)]
pub struct FileResult {
    pub kind: ApplyKind,
    pub path: String,
    pub bytes_before: Option<u64>,
    pub bytes_after: u64,
    /// Previous content, kept so the terminal can show a diff.
    pub previous: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ApplySummary {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub bytes_written: u64,
    pub details: Vec<FileResult>,
}

impl ApplySummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.created + self.updated == 0
    }

    fn record(&mut self, path: &str, previous: Option<String>, after: &str) {
        let bytes_after = after.len() as u64;
        let kind = match &previous {
            None => ApplyKind::Created,
            Some(old) if old == after => ApplyKind::Unchanged,
            Some(_) => ApplyKind::Updated,
        };
        match kind {
            ApplyKind::Created => self.created += 1,
            ApplyKind::Updated => self.updated += 1,
            ApplyKind::Unchanged => self.unchanged += 1,
        }
        if kind != ApplyKind::Unchanged {
            self.bytes_written += bytes_after;
        }
        self.details.push(FileResult {
            kind,
            path: path.to_string(),
            bytes_before: previous.as_ref().map(|p| p.len() as u64),
            bytes_after,
            previous,
        });
    }
}

/// Merge model output into the project: create-or-overwrite per path, never delete.
pub fn apply_updates(project: &mut Project, files: &[FileEntry]) -> ApplySummary {
    let mut sum = ApplySummary::new();
    for f in files {
        let previous = project.insert(f.name.clone(), f.content.clone());
        sum.record(&f.name, previous, &f.content);
    }
    sum
}

/// Write every project file under `root`, each through a temp file in the target
/// directory so a crash never leaves a half-written file.
pub fn write_project(root: &Path, project: &Project, dry: bool) -> Result<ApplySummary> {
    let mut sum = ApplySummary::new();

    for (path, content) in project.iter() {
        if !path_is_allowed(path) {
            return Err(anyhow!("refusing to write unsafe path {path:?}"));
        }
        let abs: PathBuf = root.join(path);
        let previous = if abs.is_file() { Some(fs::read_to_string(&abs)?) } else { None };

        if !dry {
            let parent = abs.parent().unwrap_or(root);
            fs::create_dir_all(parent)?;
            let tmp = NamedTempFile::new_in(parent)?;
            fs::write(tmp.path(), content)?;
            tmp.persist(&abs)?;
        }
        sum.record(path, previous, content);
    }

    Ok(sum)
}
