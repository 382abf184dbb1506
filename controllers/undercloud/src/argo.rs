//! Argo workflow step outputs
//!
//! A step exposes a parameter by writing `<dir>/output.<name>`; the workflow
//! template picks it up from there.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Write output parameter `name`, creating `dir` when needed.
pub fn save_output(dir: &Path, name: &str, value: &str) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("output.{name}"));
    fs::write(&path, value)?;
    debug!("Wrote Argo output {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_output_creates_dir() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("argo");

        let path = save_output(&dir, "svm_project_id", "abc").unwrap();
        assert_eq!(path, dir.join("output.svm_project_id"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "abc");

        save_output(&dir, "svm_project_id", "def").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "def");
    }
}
