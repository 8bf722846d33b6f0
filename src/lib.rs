//! AT Patcher: access-transformer application for Java source trees.
//!
//! Parses access-transformer directive files, resolves each directive against
//! a symbol index built from tree-sitter parses of the source set, and writes
//! the requested modifier changes back as minimal byte-span edits.
//!
//! # Architecture
//!
//! All modifier changes compile down to a single primitive: [`Edit`], a
//! verified byte-span replacement. Intelligence lives in span acquisition
//! (the symbol index knows where every modifier region starts and ends), not
//! in the application logic.
//!
//! # Safety
//!
//! - Edits verify expected before-text before applying
//! - Atomic file writes (tempfile + fsync + rename)
//! - Source-root boundary enforcement
//! - Idempotent operations: re-running a transform is a no-op
//!
//! # Example
//!
//! ```
//! use at_patcher::java::SourceFile;
//! use at_patcher::pipeline::{transform, TransformOptions};
//!
//! # fn main() -> Result<(), at_patcher::pipeline::PipelineError> {
//! let sources = vec![SourceFile::new(
//!     "Widget.java",
//!     "package a;\nclass Widget {\n    private int count;\n}\n",
//! )];
//! let outcome = transform("public a.Widget count\n", sources, TransformOptions::default())?;
//! assert_eq!(
//!     outcome.outputs[0].text,
//!     "package a;\nclass Widget {\n    public int count;\n}\n"
//! );
//! # Ok(())
//! # }
//! ```

pub mod at;
pub mod edit;
pub mod java;
pub mod pipeline;
pub mod pool;
pub mod resolve;
pub mod rewrite;
pub mod safety;

// Re-exports
pub use at::{AccessChange, AccessTransform, Directive, DirectiveError, FinalChange, TargetKind};
pub use edit::{apply_edits, atomic_write, Edit, EditError, EditVerification};
pub use java::{IndexError, JavaParseError, SourceFile, SymbolIndex};
pub use pipeline::{transform, PipelineError, TransformOptions, TransformOutcome};
pub use resolve::{Diagnostic, DiagnosticKind, Severity};
pub use rewrite::{MergeSemantics, RewriteOptions, WidenPolicy};
pub use safety::{SafetyError, SourceRootGuard};
