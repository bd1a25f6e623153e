//! Output path helpers that never clobber existing files

use std::path::{Path, PathBuf};

/// Return `path` if it is free, otherwise `<stem>_<k>.<ext>` for the lowest free k >= 2
#[must_use]
pub fn available_path(path: &Path) -> PathBuf {
    available_path_avoiding(path, &[])
}

/// Like [`available_path`], but also skips names already handed out in `reserved`
///
/// Use it when earlier outputs of the same run have a name but no file yet.
#[must_use]
pub fn available_path_avoiding(path: &Path, reserved: &[&Path]) -> PathBuf {
    let free = |candidate: &Path| !candidate.exists() && !reserved.contains(&candidate);
    if free(path) {
        return path.to_path_buf();
    }

    let mut counter = 2u32;
    loop {
        let candidate = with_stem_suffix(path, &format!("_{counter}"));
        if free(candidate.as_path()) {
            return candidate;
        }
        counter += 1;
    }
}

/// Append `suffix` to the file stem, keeping directory and extension
#[must_use]
pub fn with_stem_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let file_name = match path.extension() {
        Some(ext) => format!("{stem}{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}{suffix}"),
    };

    path.with_file_name(file_name)
}
