//! Module discovery.
//!
//! Locality of a referenced symbol depends on whether its declaring package
//! lives inside the analyzed module. The module path comes from the nearest
//! `go.mod` manifest above the analyzed file.

use std::fs;
use std::path::Path;

/// Ascend parent directories from `start_file` until a `go.mod` manifest is
/// found and read the module path from its first `module` declaration line.
/// Returns an empty string when no manifest exists; locality then degrades to
/// package-name comparison.
pub fn find_module_path(start_file: &Path) -> String {
    let mut dir = match start_file.parent() {
        Some(d) => d.to_path_buf(),
        None => return String::new(),
    };
    loop {
        let manifest = dir.join("go.mod");
        if let Ok(content) = fs::read_to_string(&manifest) {
            for line in content.lines() {
                let line = line.trim();
                if let Some(rest) = line.strip_prefix("module ") {
                    return rest.trim().to_string();
                }
            }
            return String::new();
        }
        match dir.parent() {
            Some(parent) => dir = parent.to_path_buf(),
            None => return String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_finds_nearest_manifest() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("pkg").join("sub");
        fs::create_dir_all(&nested).unwrap();
        fs::write(
            temp.path().join("go.mod"),
            "module example.com/project\n\ngo 1.22\n",
        )
        .unwrap();

        let file = nested.join("main.go");
        assert_eq!(find_module_path(&file), "example.com/project");
    }

    #[test]
    fn test_inner_manifest_wins() {
        let temp = TempDir::new().unwrap();
        let inner = temp.path().join("inner");
        fs::create_dir_all(&inner).unwrap();
        fs::write(temp.path().join("go.mod"), "module example.com/outer\n").unwrap();
        fs::write(inner.join("go.mod"), "module example.com/inner\n").unwrap();

        let file = inner.join("a.go");
        assert_eq!(find_module_path(&file), "example.com/inner");
    }

    #[test]
    fn test_no_manifest_yields_empty() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("lone.go");
        assert_eq!(find_module_path(&file), "");
    }

    #[test]
    fn test_manifest_without_module_line() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("go.mod"), "go 1.22\n").unwrap();
        let file = temp.path().join("a.go");
        assert_eq!(find_module_path(&file), "");
    }
}
