use anyhow::{Context, Result};
use at_patcher::pipeline::{collect_sources, transform, TransformOptions, TransformOutcome};
use at_patcher::resolve::Severity;
use at_patcher::rewrite::{MergeSemantics, RewriteOptions, WidenPolicy};
use at_patcher::safety::SourceRootGuard;
use at_patcher::{atomic_write, Diagnostic};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "at-patcher")]
#[command(about = "Apply access transformers to Java source trees", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply access transformers and write rewritten sources
    Apply {
        #[command(flatten)]
        common: CommonArgs,

        /// Write rewritten files under this directory instead of in place
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Dry run - report what would change without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Resolve directives and report diagnostics without writing anything
    Check {
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(clap::Args)]
struct CommonArgs {
    /// Access-transformer directive file
    #[arg(long)]
    at: PathBuf,

    /// Root directory of the Java sources
    #[arg(long)]
    source_root: PathBuf,

    /// What to do when a directive narrows access
    #[arg(long, value_enum, default_value_t = WidenArg::Allow)]
    widen: WidenArg,

    /// How directives landing on the same declaration combine
    #[arg(long, value_enum, default_value_t = MergeArg::Accumulate)]
    merge: MergeArg,

    /// Emit outputs for resolvable directives even when others error
    #[arg(long)]
    partial: bool,

    /// Machine-readable JSON report on stdout
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum WidenArg {
    Allow,
    Warn,
    Deny,
}

#[derive(Clone, Copy, ValueEnum)]
enum MergeArg {
    Accumulate,
    Replace,
}

impl CommonArgs {
    fn options(&self) -> TransformOptions {
        TransformOptions {
            rewrite: RewriteOptions {
                widen: match self.widen {
                    WidenArg::Allow => WidenPolicy::Allow,
                    WidenArg::Warn => WidenPolicy::Warn,
                    WidenArg::Deny => WidenPolicy::Deny,
                },
                merge: match self.merge {
                    MergeArg::Accumulate => MergeSemantics::Accumulate,
                    MergeArg::Replace => MergeSemantics::Replace,
                },
            },
            emit_partial: self.partial,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Apply {
            common,
            output,
            dry_run,
            diff,
        } => cmd_apply(common, output, dry_run, diff),

        Commands::Check { common } => cmd_check(common),
    }
}

fn run_transform(common: &CommonArgs) -> Result<TransformOutcome> {
    let at_text = fs::read_to_string(&common.at)
        .with_context(|| format!("failed to read {}", common.at.display()))?;
    let sources = collect_sources(&common.source_root)?;
    if sources.is_empty() {
        anyhow::bail!(
            "no .java files found under {}",
            common.source_root.display()
        );
    }
    Ok(transform(&at_text, sources, common.options())?)
}

fn cmd_apply(
    common: CommonArgs,
    output: Option<PathBuf>,
    dry_run: bool,
    show_diff: bool,
) -> Result<()> {
    let outcome = run_transform(&common)?;

    if !common.json {
        print_diagnostics(&outcome.diagnostics);
    }

    let mut written = Vec::new();
    if !outcome.has_errors() || common.partial {
        for file_output in &outcome.outputs {
            if show_diff && !common.json {
                let before = fs::read_to_string(&file_output.path).with_context(|| {
                    format!("failed to read {}", file_output.path.display())
                })?;
                display_diff(&file_output.path, &before, &file_output.text);
            }

            if dry_run {
                if !common.json {
                    println!(
                        "{} would write {}",
                        "✓".green(),
                        file_output.path.display()
                    );
                }
                continue;
            }

            let target = write_target(&common.source_root, output.as_deref(), &file_output.path)?;
            atomic_write(&target, &file_output.text)?;
            written.push(target.clone());
            if !common.json {
                println!("{} wrote {}", "✓".green(), target.display());
            }
        }
    }

    if common.json {
        print_json(&outcome, &written)?;
    } else {
        print_summary(&outcome, written.len(), dry_run);
    }

    if outcome.has_errors() {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_check(common: CommonArgs) -> Result<()> {
    let outcome = run_transform(&common)?;

    if common.json {
        print_json(&outcome, &[])?;
    } else {
        print_diagnostics(&outcome.diagnostics);
        print_summary(&outcome, 0, true);
    }

    if outcome.has_errors() {
        std::process::exit(1);
    }
    Ok(())
}

/// Resolve where a rewritten file goes: in place, or re-rooted under the
/// output directory. Either way the path is guard-checked first.
fn write_target(
    source_root: &Path,
    output: Option<&Path>,
    source_path: &Path,
) -> Result<PathBuf> {
    let Some(output) = output else {
        let guard = SourceRootGuard::new(source_root)?;
        return Ok(guard.validate_path(source_path)?);
    };

    fs::create_dir_all(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    let relative = source_path
        .strip_prefix(source_root)
        .unwrap_or(source_path);
    let target = output.join(relative);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    // Atomic write needs the file present for the guard's canonicalize, so
    // validate the parent instead.
    let guard = SourceRootGuard::new(output)?;
    if let Some(parent) = target.parent() {
        guard.validate_path(parent)?;
    }
    Ok(target)
}

fn print_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        let line = diagnostic.to_string();
        match diagnostic.severity {
            Severity::Error => eprintln!("{} {}", "✗".red(), line.red()),
            Severity::Warning => eprintln!("{} {}", "⚠".yellow(), line.yellow()),
            Severity::Info => println!("{} {}", "·".dimmed(), line.dimmed()),
        }
    }
}

fn print_summary(outcome: &TransformOutcome, written: usize, dry_run: bool) {
    let errors = outcome
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    let warnings = outcome
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .count();

    println!();
    println!("{}", "Summary:".bold());
    println!(
        "  {} directives over {} files",
        outcome.directive_count, outcome.file_count
    );
    println!(
        "  {} changed",
        format!("{}", outcome.changed_slots).green()
    );
    println!(
        "  {} already satisfied",
        format!("{}", outcome.unchanged_slots).yellow()
    );
    if !dry_run {
        println!("  {} files written", format!("{written}").green());
    }
    println!("  {} errors", format!("{errors}").red());
    println!("  {} warnings", format!("{warnings}").yellow());

    if outcome.suppressed() {
        println!(
            "{}",
            "No files were written: fix the errors or pass --partial".red()
        );
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    diagnostics: &'a [Diagnostic],
    directive_count: usize,
    file_count: usize,
    changed_slots: usize,
    unchanged_slots: usize,
    written: &'a [PathBuf],
}

fn print_json(outcome: &TransformOutcome, written: &[PathBuf]) -> Result<()> {
    let report = JsonReport {
        diagnostics: &outcome.diagnostics,
        directive_count: outcome.directive_count,
        file_count: outcome.file_count,
        changed_slots: outcome.changed_slots,
        unchanged_slots: outcome.unchanged_slots,
        written,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Show unified diff between original and rewritten content.
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!(
        "{}",
        format!("+++ {} (transformed)", file.display()).dimmed()
    );

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}
