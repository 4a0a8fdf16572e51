use crate::project::Project;
use crate::wire::FileBlob;

/// Take the first `max_bytes` of every project file (cut on a char boundary)
/// and produce FileBlob entries for an edit request.
pub fn snapshot_project(project: &Project, max_bytes: usize) -> Vec<FileBlob> {
    project
        .iter()
        .map(|(path, content)| {
            let bytes = content.len();
            let truncated = bytes > max_bytes;
            let content = if truncated {
                let mut cut = max_bytes;
                while !content.is_char_boundary(cut) {
                    cut -= 1;
                }
                content[..cut].to_string()
            } else {
                content.to_string()
            };
            FileBlob { path: path.to_string(), bytes, truncated, content }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_files_are_whole() {
        let p = Project::single("index.html", "<html></html>");
        let snap = snapshot_project(&p, 1024);
        assert_eq!(snap.len(), 1);
        assert!(!snap[0].truncated);
        assert_eq!(snap[0].content, "<html></html>");
    }

    #[test]
    fn large_files_are_cut_on_char_boundary() {
        let p = Project::single("a.md", "ééé");
        let snap = snapshot_project(&p, 3);
        assert!(snap[0].truncated);
        assert_eq!(snap[0].bytes, 6);
        assert_eq!(snap[0].content, "é");
    }
}
