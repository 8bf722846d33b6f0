use std::path::{Path, PathBuf};
use thiserror::Error;

/// Safety checks to keep rewrites inside the source root.
///
/// Transformed files are written back in place (or under an output root), so
/// a bad path must never reach the writer: dependency caches and build output
/// are off limits even when a symlink points into them.
#[derive(Debug, Clone)]
pub struct SourceRootGuard {
    /// Canonical source root
    root: PathBuf,
    /// Canonical paths to forbidden directories
    forbidden_paths: Vec<PathBuf>,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("path is outside the source root: {path} (root: {root})")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("path is in forbidden directory: {path} (forbidden: {forbidden})")]
    ForbiddenPath { path: PathBuf, forbidden: PathBuf },

    #[error("failed to canonicalize path: {0}")]
    Canonicalize(#[from] std::io::Error),
}

impl SourceRootGuard {
    /// Create a guard for the given source root.
    ///
    /// The root is canonicalized so symlinked checkouts behave.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        let root = root.as_ref().canonicalize()?;

        let mut forbidden_paths = Vec::new();

        // Dependency caches: the Maven local repository and the Gradle home.
        if let Some(home) = home::home_dir() {
            if let Ok(m2) = home.join(".m2").canonicalize() {
                forbidden_paths.push(m2);
            }
            if let Ok(gradle) = home.join(".gradle").canonicalize() {
                forbidden_paths.push(gradle);
            }
        }

        // Build output inside the root.
        for out in ["build", "target", "out"] {
            if let Ok(dir) = root.join(out).canonicalize() {
                forbidden_paths.push(dir);
            }
        }

        Ok(Self {
            root,
            forbidden_paths,
        })
    }

    /// Check if a path is safe to write.
    ///
    /// Returns the canonicalized absolute path if safe.
    ///
    /// Note: canonicalization happens at validation time. For maximum TOCTOU
    /// safety, callers should re-validate immediately before the write in
    /// adversarial environments.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let path = path.as_ref();

        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };

        // Canonicalize to resolve symlinks and .. components
        let canonical = absolute.canonicalize()?;

        self.check_canonical(&canonical)?;

        Ok(canonical)
    }

    fn check_canonical(&self, canonical: &Path) -> Result<(), SafetyError> {
        if !canonical.starts_with(&self.root) {
            return Err(SafetyError::OutsideRoot {
                path: canonical.to_path_buf(),
                root: self.root.clone(),
            });
        }

        for forbidden in &self.forbidden_paths {
            if canonical.starts_with(forbidden) {
                return Err(SafetyError::ForbiddenPath {
                    path: canonical.to_path_buf(),
                    forbidden: forbidden.clone(),
                });
            }
        }

        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a guard with custom forbidden paths (for testing).
    #[cfg(test)]
    pub fn with_forbidden(
        root: impl AsRef<Path>,
        forbidden: Vec<PathBuf>,
    ) -> Result<Self, SafetyError> {
        let root = root.as_ref().canonicalize()?;
        Ok(Self {
            root,
            forbidden_paths: forbidden,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn path_inside_root_is_accepted() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        let guard = SourceRootGuard::new(root).unwrap();

        let file = root.join("src/main/java/A.java");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, b"").unwrap();

        assert!(guard.validate_path(&file).is_ok());
    }

    #[test]
    fn path_outside_root_is_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("project");
        fs::create_dir_all(&root).unwrap();
        let guard = SourceRootGuard::new(&root).unwrap();

        let outside = temp_dir.path().join("Outside.java");
        fs::write(&outside, b"").unwrap();

        assert!(matches!(
            guard.validate_path(&outside),
            Err(SafetyError::OutsideRoot { .. })
        ));
    }

    #[test]
    fn forbidden_directory_is_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        let forbidden = root.join("build");
        fs::create_dir_all(&forbidden).unwrap();

        let guard = SourceRootGuard::with_forbidden(root, vec![forbidden.clone()]).unwrap();

        let file = forbidden.join("generated/A.java");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, b"").unwrap();

        assert!(matches!(
            guard.validate_path(&file),
            Err(SafetyError::ForbiddenPath { .. })
        ));
    }

    #[test]
    fn relative_path_resolves_against_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        let guard = SourceRootGuard::new(root).unwrap();

        fs::write(root.join("A.java"), b"").unwrap();

        assert!(guard.validate_path("A.java").is_ok());
    }

    #[test]
    #[cfg(unix)]
    fn symlink_escape_is_rejected() {
        use std::os::unix::fs::symlink;

        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("project");
        fs::create_dir_all(&root).unwrap();

        let outside = temp_dir.path().join("Outside.java");
        fs::write(&outside, b"").unwrap();

        let link = root.join("Escape.java");
        symlink(&outside, &link).unwrap();

        let guard = SourceRootGuard::new(&root).unwrap();
        assert!(matches!(
            guard.validate_path(&link),
            Err(SafetyError::OutsideRoot { .. })
        ));
    }
}
