use std::path::{Component, Path};

/// A generated file name is accepted only as a plain relative path that stays
/// inside the project: no root, no drive prefix, no `..`, nothing empty.
pub fn path_is_allowed(candidate: &str) -> bool {
    let trimmed = candidate.trim();
    if trimmed.is_empty() || trimmed != candidate {
        return false;
    }
    if trimmed.starts_with('/') || trimmed.starts_with('\\') || trimmed.contains('\0') {
        return false;
    }
    // Windows separators would slip past `Path` on unix.
    if trimmed.split(['/', '\\']).any(|seg| seg == "..") {
        return false;
    }

    let mut normal = 0usize;
    for comp in Path::new(trimmed).components() {
        match comp {
            Component::Normal(_) => normal += 1,
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    normal > 0
}
