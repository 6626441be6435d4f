//! Path normalization.
//!
//! File paths normalise by replacing every `/` and `\` with the platform
//! separator and stripping trailing separators. pkg-paths are always
//! forward-slash and project-relative.

use std::path::{Path, PathBuf};

pub fn normalize_path(path: &Path) -> PathBuf {
    let separator = std::path::MAIN_SEPARATOR;
    let normalized: String = path
        .to_string_lossy()
        .chars()
        .map(|c| if c == '/' || c == '\\' { separator } else { c })
        .collect();
    PathBuf::from(normalized.trim_end_matches(separator))
}

/// Derive the pkg-path of a source file from its location under
/// `root_dir`. Files outside the root keep their full path, made
/// forward-slash.
pub fn pkg_path_for(root_dir: &Path, src_path: &Path) -> String {
    let root = normalize_path(root_dir);
    let src = normalize_path(src_path);
    let relative = src.strip_prefix(&root).unwrap_or(&src);
    relative
        .to_string_lossy()
        .replace(std::path::MAIN_SEPARATOR, "/")
        .trim_start_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_strips_trailing_separators() {
        let normalized = normalize_path(Path::new("/proj/src/"));
        assert!(!normalized.to_string_lossy().ends_with(std::path::MAIN_SEPARATOR));
    }

    #[test]
    fn pkg_path_is_forward_slash_and_relative() {
        let pkg = pkg_path_for(Path::new("/proj"), Path::new("/proj/source/main.brs"));
        assert_eq!(pkg, "source/main.brs");
    }

    #[test]
    fn mixed_separators_normalise() {
        let pkg = pkg_path_for(Path::new("/proj"), Path::new("/proj/components\\widget.xml"));
        assert_eq!(pkg, "components/widget.xml");
    }
}
