//! Removal of files generated by an Amesp calculation.
//!
//! A calculation with label `job` leaves `job.aip` (input), `job.aop`
//! (output) and `job.mo` (orbitals) in its working directory. Cleanup is
//! best effort: files that are already gone or cannot be removed are logged
//! and skipped, never reported as errors.

use log::{debug, info};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Extensions of the files written for a calculation.
pub const ARTIFACT_EXTENSIONS: [&str; 3] = ["aip", "aop", "mo"];

/// Removes the artifacts of calculation `label` from `directory`.
///
/// Returns the number of files actually removed.
///
/// ```
/// use amesp::cleanup::clean_artifacts;
///
/// let dir = std::env::temp_dir();
/// assert_eq!(clean_artifacts(&dir, "no-such-amesp-job"), 0);
/// ```
pub fn clean_artifacts(directory: &Path, label: &str) -> usize {
    let mut removed = 0;
    for ext in ARTIFACT_EXTENSIONS {
        let path = directory.join(format!("{}.{}", label, ext));
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed {}", path.display());
                removed += 1;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => debug!("Could not remove {}: {}", path.display(), e),
        }
    }
    if removed > 0 {
        info!("Cleaned {} file(s) for job '{}'", removed, label);
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    #[test]
    fn test_removes_only_job_artifacts() {
        let dir = TempDir::new().unwrap();
        for name in ["job.aip", "job.aop", "job.mo", "job.xyz", "other.aop"] {
            File::create(dir.path().join(name)).unwrap();
        }

        assert_eq!(clean_artifacts(dir.path(), "job"), 3);
        assert!(!dir.path().join("job.aip").exists());
        assert!(!dir.path().join("job.aop").exists());
        assert!(!dir.path().join("job.mo").exists());
        assert!(dir.path().join("job.xyz").exists());
        assert!(dir.path().join("other.aop").exists());
    }

    #[test]
    fn test_missing_files_are_ignored() {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("job.aop")).unwrap();
        assert_eq!(clean_artifacts(dir.path(), "job"), 1);
        assert_eq!(clean_artifacts(dir.path(), "job"), 0);
    }

    #[test]
    fn test_missing_directory_is_ignored() {
        assert_eq!(clean_artifacts(Path::new("/nonexistent/dir"), "job"), 0);
    }
}
