use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Intermediate files removed when the guard drops
#[derive(Debug, Default)]
pub struct ScratchFiles {
    paths: Vec<PathBuf>,
    keep: bool,
}

impl ScratchFiles {
    pub fn new(keep: bool) -> Self {
        Self {
            paths: Vec::new(),
            keep,
        }
    }

    /// Track `path` and hand it back
    pub fn track(&mut self, path: PathBuf) -> PathBuf {
        self.paths.push(path.clone());
        path
    }

    /// Files tracked so far
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn keeps(&self) -> bool {
        self.keep
    }
}

fn remove(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("Removed intermediate {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove {}: {}", path.display(), e),
    }
}

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        for path in &self.paths {
            remove(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_tracked_files_removed_on_drop() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a_enc.mp4");
        let missing = dir.path().join("never_written.264");
        std::fs::write(&a, b"x").unwrap();
        {
            let mut scratch = ScratchFiles::new(false);
            scratch.track(a.clone());
            scratch.track(missing);
            assert_eq!(scratch.paths().len(), 2);
        }
        assert!(!a.exists());
    }

    #[test]
    fn test_keep_leaves_files() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a_dec.264");
        std::fs::write(&a, b"x").unwrap();
        {
            let mut scratch = ScratchFiles::new(true);
            scratch.track(a.clone());
        }
        assert!(a.exists());
    }
}
