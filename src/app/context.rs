//! Context gathering
//!
//! Reads the files named on the command line (directories are walked
//! recursively, in path order) into one string with a header per file.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Concatenate every readable text file under `paths`
pub fn gather(paths: &[PathBuf]) -> Result<String> {
    let mut files = Vec::new();
    for path in paths {
        collect(path, &mut files)?;
    }

    let mut context = String::new();
    for file in files {
        let bytes =
            fs::read(&file).with_context(|| format!("Failed to read {}", file.display()))?;
        match String::from_utf8(bytes) {
            Ok(text) => {
                debug!(path = %file.display(), bytes = text.len(), "context file added");
                context.push_str(&format!("=== {} ===\n{}\n", file.display(), text.trim_end()));
            }
            Err(_) => warn!(path = %file.display(), "skipping non-UTF-8 file"),
        }
    }
    Ok(context)
}

fn collect(path: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let metadata =
        fs::metadata(path).with_context(|| format!("Cannot access {}", path.display()))?;
    if metadata.is_file() {
        files.push(path.to_path_buf());
        return Ok(());
    }

    let mut entries: Vec<PathBuf> = fs::read_dir(path)
        .with_context(|| format!("Failed to list {}", path.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    entries.sort();
    for entry in entries {
        collect(&entry, files)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_files_and_directories_in_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/b.rs"), "fn b() {}\n").unwrap();
        fs::write(dir.path().join("src/a.rs"), "fn a() {}\n").unwrap();
        fs::write(dir.path().join("README.md"), "# readme").unwrap();

        let context = gather(&[dir.path().join("README.md"), dir.path().join("src")]).unwrap();

        let readme = context.find("README.md ===\n# readme").unwrap();
        let a = context.find("a.rs ===\nfn a() {}").unwrap();
        let b = context.find("b.rs ===\nfn b() {}").unwrap();
        assert!(readme < a && a < b);
    }

    #[test]
    fn test_binary_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("blob.bin"), [0xff, 0xfe, 0x00]).unwrap();
        fs::write(dir.path().join("notes.txt"), "keep").unwrap();

        let context = gather(&[dir.path().to_path_buf()]).unwrap();
        assert!(!context.contains("blob.bin"));
        assert!(context.contains("keep"));
    }

    #[test]
    fn test_missing_path_is_an_error() {
        assert!(gather(&[PathBuf::from("/definitely/not/here")]).is_err());
        assert_eq!(gather(&[]).unwrap(), "");
    }
}
