use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// The fundamental rewrite primitive: byte-span replacement with verification.
///
/// Every modifier change compiles down to this. Intelligence lives in span
/// acquisition (the symbol index), not application: applying is a blind
/// splice guarded by a before-text check.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Edit does nothing until applied"]
pub struct Edit {
    /// Starting byte offset (inclusive)
    pub byte_start: usize,
    /// Ending byte offset (exclusive)
    pub byte_end: usize,
    /// New text to insert at [byte_start, byte_end)
    pub new_text: String,
    /// Verification of what we expect to find before applying
    pub expected_before: EditVerification,
}

/// Verification strategy for edit safety.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditVerification {
    /// Exact text match required
    ExactMatch(String),
    /// xxh3 hash of expected text (faster for large spans)
    Hash(u64),
}

impl EditVerification {
    /// Check if the provided text matches the verification criteria.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            EditVerification::ExactMatch(expected) => text == expected,
            EditVerification::Hash(expected_hash) => xxh3_64(text.as_bytes()) == *expected_hash,
        }
    }

    /// Create verification from text, using hash for text over 1KB.
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            EditVerification::Hash(xxh3_64(text.as_bytes()))
        } else {
            EditVerification::ExactMatch(text.to_string())
        }
    }

    /// Get hash value regardless of variant.
    pub fn hash(&self) -> u64 {
        match self {
            EditVerification::Hash(h) => *h,
            EditVerification::ExactMatch(text) => xxh3_64(text.as_bytes()),
        }
    }
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("before-text verification failed at byte {byte_start}: expected {expected:?}, found {found:?}")]
    BeforeTextMismatch {
        byte_start: usize,
        byte_end: usize,
        expected: String,
        found: String,
    },

    #[error("invalid byte range [{byte_start}, {byte_end}) in source of length {source_len}")]
    InvalidByteRange {
        byte_start: usize,
        byte_end: usize,
        source_len: usize,
    },

    #[error("overlapping edits: [{first_start}, {first_end}) and [{second_start}, {second_end})")]
    Overlap {
        first_start: usize,
        first_end: usize,
        second_start: usize,
        second_end: usize,
    },

    #[error("byte range [{byte_start}, {byte_end}) splits a UTF-8 character")]
    CharBoundary { byte_start: usize, byte_end: usize },

    #[error("I/O error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Edit {
    /// Create a new edit with automatic verification generation.
    pub fn new(
        byte_start: usize,
        byte_end: usize,
        new_text: impl Into<String>,
        expected_before: &str,
    ) -> Self {
        Self {
            byte_start,
            byte_end,
            new_text: new_text.into(),
            expected_before: EditVerification::from_text(expected_before),
        }
    }

    /// Create an insertion at a single offset.
    pub fn insert(at: usize, new_text: impl Into<String>) -> Self {
        Self {
            byte_start: at,
            byte_end: at,
            new_text: new_text.into(),
            expected_before: EditVerification::ExactMatch(String::new()),
        }
    }

    fn validate<'a>(&self, source: &'a str) -> Result<&'a str, EditError> {
        if self.byte_start > self.byte_end || self.byte_end > source.len() {
            return Err(EditError::InvalidByteRange {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                source_len: source.len(),
            });
        }
        if !source.is_char_boundary(self.byte_start) || !source.is_char_boundary(self.byte_end) {
            return Err(EditError::CharBoundary {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
            });
        }

        let current = &source[self.byte_start..self.byte_end];

        // Already-applied spans pass without a verification match (idempotency).
        if current == self.new_text {
            return Ok(current);
        }

        if !self.expected_before.matches(current) {
            return Err(EditError::BeforeTextMismatch {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                expected: format!("{:?}", self.expected_before),
                found: current.to_string(),
            });
        }

        Ok(current)
    }
}

/// Apply a batch of edits to one source text, returning the rewritten text.
///
/// All edits are validated before any byte moves; overlap or verification
/// failure leaves nothing half-applied. Edits are spliced bottom-to-top so
/// earlier offsets stay valid. Two insertions at the same offset are an
/// overlap: there is no meaningful order for them.
pub fn apply_edits(source: &str, mut edits: Vec<Edit>) -> Result<String, EditError> {
    if edits.is_empty() {
        return Ok(source.to_string());
    }

    // Descending by byte_start
    edits.sort_by(|a, b| b.byte_start.cmp(&a.byte_start));

    for edit in &edits {
        edit.validate(source)?;
    }

    for window in edits.windows(2) {
        let (later, earlier) = (&window[0], &window[1]);
        if earlier.byte_end > later.byte_start || earlier.byte_start == later.byte_start {
            return Err(EditError::Overlap {
                first_start: earlier.byte_start,
                first_end: earlier.byte_end,
                second_start: later.byte_start,
                second_end: later.byte_end,
            });
        }
    }

    let mut output = source.to_string();
    for edit in &edits {
        output.replace_range(edit.byte_start..edit.byte_end, &edit.new_text);
    }
    Ok(output)
}

/// Atomic file write: tempfile + fsync + rename, then an mtime touch so
/// downstream build tools notice the change.
pub fn atomic_write(path: &Path, content: &str) -> Result<(), EditError> {
    let io_err = |source| EditError::Io {
        path: path.to_path_buf(),
        source,
    };

    // Tempfile in the same directory to guarantee same-filesystem rename.
    let parent = path.parent().ok_or_else(|| {
        io_err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "path has no parent directory",
        ))
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(io_err)?;
    temp.write_all(content.as_bytes()).map_err(io_err)?;
    temp.as_file().sync_all().map_err(io_err)?;
    temp.persist(path).map_err(|e| io_err(e.error))?;

    filetime::set_file_mtime(path, filetime::FileTime::now()).map_err(io_err)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_exact_match() {
        let verify = EditVerification::ExactMatch("private".to_string());
        assert!(verify.matches("private"));
        assert!(!verify.matches("public"));
    }

    #[test]
    fn verification_hash() {
        let text = "private static final";
        let verify = EditVerification::Hash(xxh3_64(text.as_bytes()));
        assert!(verify.matches(text));
        assert!(!verify.matches("public static final"));
    }

    #[test]
    fn verification_from_text_picks_hash_for_large_spans() {
        assert!(matches!(
            EditVerification::from_text("small"),
            EditVerification::ExactMatch(_)
        ));
        assert!(matches!(
            EditVerification::from_text(&"x".repeat(2000)),
            EditVerification::Hash(_)
        ));
    }

    #[test]
    fn apply_single_replacement() {
        let source = "private int x;";
        let edits = vec![Edit::new(0, 7, "public", "private")];
        assert_eq!(apply_edits(source, edits).unwrap(), "public int x;");
    }

    #[test]
    fn apply_insertion() {
        let source = "int x;";
        let edits = vec![Edit::insert(0, "public ")];
        assert_eq!(apply_edits(source, edits).unwrap(), "public int x;");
    }

    #[test]
    fn apply_multiple_edits_bottom_to_top() {
        let source = "private int x; private int y;";
        let edits = vec![
            Edit::new(0, 7, "public", "private"),
            Edit::new(15, 22, "public", "private"),
        ];
        assert_eq!(
            apply_edits(source, edits).unwrap(),
            "public int x; public int y;"
        );
    }

    #[test]
    fn already_applied_span_passes_verification() {
        let source = "public int x;";
        let edits = vec![Edit::new(0, 6, "public", "private")];
        assert_eq!(apply_edits(source, edits).unwrap(), "public int x;");
    }

    #[test]
    fn mismatched_before_text_is_rejected() {
        let source = "protected int x;";
        let edits = vec![Edit::new(0, 9, "public", "private")];
        assert!(matches!(
            apply_edits(source, edits),
            Err(EditError::BeforeTextMismatch { .. })
        ));
    }

    #[test]
    fn out_of_bounds_range_is_rejected() {
        let edits = vec![Edit::new(5, 20, "x", "")];
        assert!(matches!(
            apply_edits("short", edits),
            Err(EditError::InvalidByteRange { .. })
        ));
    }

    #[test]
    fn overlapping_edits_are_rejected() {
        let source = "private int x;";
        let edits = vec![
            Edit::new(0, 7, "public", "private"),
            Edit::new(4, 11, "xxxxxxx", "ate int"),
        ];
        assert!(matches!(
            apply_edits(source, edits),
            Err(EditError::Overlap { .. })
        ));
    }

    #[test]
    fn no_edit_fails_partially() {
        // Second edit is invalid, so the first must not apply either.
        let source = "private int x;";
        let edits = vec![
            Edit::new(0, 7, "public", "private"),
            Edit::new(8, 11, "long", "str"),
        ];
        assert!(apply_edits(source, edits).is_err());
    }

    #[test]
    fn atomic_write_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("A.java");
        std::fs::write(&path, "class A {}").unwrap();

        atomic_write(&path, "public class A {}").unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "public class A {}"
        );
    }
}
