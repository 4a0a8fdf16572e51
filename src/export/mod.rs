use anyhow::{anyhow, Context, Result};
use fs_err as fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::project::Project;
use crate::safety::path_is_allowed;

/// Pack every project file into an in-memory zip, one deflated entry per path.
pub fn build_archive(project: &Project) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (path, content) in project.iter() {
        if !path_is_allowed(path) {
            return Err(anyhow!("refusing to archive unsafe path {path:?}"));
        }
        writer.start_file(path, options).with_context(|| format!("adding {path} to archive"))?;
        writer.write_all(content.as_bytes())?;
    }

    Ok(writer.finish().context("finalizing archive")?.into_inner())
}

/// Write `<dir>/<name>` and return its path.
pub fn export_zip(project: &Project, dir: &Path, name: &str) -> Result<PathBuf> {
    let bytes = build_archive(project)?;
    fs::create_dir_all(dir)?;
    let path = dir.join(name);
    fs::write(&path, &bytes)?;
    info!(path = %path.display(), files = project.len(), bytes = bytes.len(), "exported archive");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::FileEntry;
    use std::io::Read;
    use zip::ZipArchive;

    fn backend() -> Project {
        Project::from_entries(vec![
            FileEntry { name: "README.md".into(), content: "# Todo API\n\nRun `npm start`.".into() },
            FileEntry { name: "src/server.js".into(), content: "app.listen(3000);".into() },
            FileEntry { name: "package.json".into(), content: "{\"name\":\"todo\"}".into() },
        ])
    }

    #[test]
    fn archive_contains_every_file() {
        let project = backend();
        let bytes = build_archive(&project).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 3);

        for (path, content) in project.iter() {
            let mut entry = archive.by_name(path).unwrap();
            assert_eq!(entry.compression(), CompressionMethod::Deflated);
            let mut out = String::new();
            entry.read_to_string(&mut out).unwrap();
            assert_eq!(out, content);
        }
    }

    #[test]
    fn export_writes_named_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = export_zip(&backend(), tmp.path(), "ai-generated-project.zip").unwrap();
        assert_eq!(path, tmp.path().join("ai-generated-project.zip"));
        assert!(fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn unsafe_entries_are_rejected() {
        let project = Project::single("/etc/passwd", "x");
        assert!(build_archive(&project).is_err());
    }
}
