//! End-to-end transform pipeline: directive parse, index build, resolution,
//! edit planning, and in-memory application.
//!
//! The pipeline is all-or-nothing by default: any error diagnostic suppresses
//! every output so a broken directive file never leaves a source tree half
//! transformed. `emit_partial` opts out for callers that want whatever did
//! resolve.

use crate::at::{parse_str, Directive, DirectiveError};
use crate::edit::{apply_edits, EditError};
use crate::java::{IndexError, SourceFile, SymbolIndex};
use crate::resolve::{resolve, Diagnostic, Severity};
use crate::rewrite::{plan, RewriteOptions};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, Default)]
pub struct TransformOptions {
    pub rewrite: RewriteOptions,
    /// Emit outputs for slots that resolved even when other directives
    /// produced errors.
    pub emit_partial: bool,
}

/// One rewritten file, held in memory until the caller decides where it goes.
#[derive(Debug, Clone)]
pub struct FileOutput {
    pub path: PathBuf,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct TransformOutcome {
    pub outputs: Vec<FileOutput>,
    pub diagnostics: Vec<Diagnostic>,
    /// Modifier regions rewritten.
    pub changed_slots: usize,
    /// Directives (or folded directive groups) that were already satisfied.
    pub unchanged_slots: usize,
    pub directive_count: usize,
    pub file_count: usize,
}

impl TransformOutcome {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// True when error diagnostics suppressed the outputs.
    pub fn suppressed(&self) -> bool {
        self.has_errors() && self.outputs.is_empty() && self.changed_slots > 0
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Directive syntax is invalid. Carries every malformed line so one typo
    /// does not hide the rest of them.
    #[error("invalid directive file:\n{}", render_directive_errors(.0))]
    Directives(Vec<DirectiveError>),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn render_directive_errors(errors: &[DirectiveError]) -> String {
    errors
        .iter()
        .map(|e| format!("  {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collect every `.java` file under a root, sorted for deterministic output.
pub fn collect_sources(root: &Path) -> Result<Vec<SourceFile>, PipelineError> {
    let mut sources = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_default();
            match e.into_io_error() {
                Some(source) => PipelineError::Io { path, source },
                None => PipelineError::Io {
                    path,
                    source: std::io::Error::other("filesystem loop"),
                },
            }
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().and_then(|e| e.to_str()) != Some("java") {
            continue;
        }
        let text =
            std::fs::read_to_string(entry.path()).map_err(|source| PipelineError::Io {
                path: entry.path().to_path_buf(),
                source,
            })?;
        sources.push(SourceFile::new(entry.path(), text));
    }
    Ok(sources)
}

/// Run the full transform over in-memory sources.
pub fn transform(
    at_text: &str,
    sources: Vec<SourceFile>,
    options: TransformOptions,
) -> Result<TransformOutcome, PipelineError> {
    // Malformed directive syntax is fatal before any resolution, unlike
    // per-directive resolution failures which are accumulated as diagnostics.
    let (directives, parse_errors) = parse_str(at_text);
    if !parse_errors.is_empty() {
        return Err(PipelineError::Directives(parse_errors));
    }
    let mut outcome = TransformOutcome {
        directive_count: directives.len(),
        ..Default::default()
    };

    let index = SymbolIndex::build(sources)?;
    outcome.file_count = index.files().len();

    apply_directives(&directives, &index, options, &mut outcome)?;
    Ok(outcome)
}

fn apply_directives(
    directives: &[Directive],
    index: &SymbolIndex,
    options: TransformOptions,
    outcome: &mut TransformOutcome,
) -> Result<(), PipelineError> {
    let resolution = resolve(directives, index);
    outcome.diagnostics.extend(resolution.diagnostics);

    let rewrite_plan = plan(&resolution.edits, index, options.rewrite);
    outcome.diagnostics.extend(rewrite_plan.diagnostics);
    outcome.changed_slots = rewrite_plan.changed_slots;
    outcome.unchanged_slots = rewrite_plan.unchanged_slots;

    let errors = outcome.has_errors();
    if errors && !options.emit_partial {
        return Ok(());
    }

    for (file_id, edits) in rewrite_plan.file_edits {
        let file = index.file(file_id);
        let text = apply_edits(&file.text, edits)?;
        outcome.outputs.push(FileOutput {
            path: file.path.clone(),
            text,
        });
    }
    Ok(())
}
