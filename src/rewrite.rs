//! Edit planning: fold resolved directives per slot and compile the winning
//! transform into byte-span edits.
//!
//! Only modifier regions are ever written. Everything else in the file,
//! including whitespace and comments inside the region, rides through the
//! splice untouched, which is what makes output diffs minimal.

use crate::at::{current_access, render, transform_modifiers, AccessTransform};
use crate::edit::Edit;
use crate::java::{FileId, ModifierList, SlotId, SymbolIndex};
use crate::resolve::{Diagnostic, DiagnosticKind, ResolvedEdit, Severity};
use std::collections::BTreeMap;

/// What to do when a directive narrows access instead of widening it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WidenPolicy {
    /// Apply the narrowing silently.
    #[default]
    Allow,
    /// Apply it but emit a warning.
    Warn,
    /// Reject it: error diagnostic, slot left untouched.
    Deny,
}

/// How multiple directives landing on the same slot combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeSemantics {
    /// Fold in directive order: last access wins, finality is sticky.
    #[default]
    Accumulate,
    /// The last directive wins outright, earlier ones are discarded.
    Replace,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RewriteOptions {
    pub widen: WidenPolicy,
    pub merge: MergeSemantics,
}

/// Planned edits grouped by file, plus rewrite-stage diagnostics.
#[derive(Debug, Default)]
pub struct RewritePlan {
    pub file_edits: BTreeMap<FileId, Vec<Edit>>,
    pub diagnostics: Vec<Diagnostic>,
    /// Slots whose modifier region actually changes.
    pub changed_slots: usize,
    /// Slots already satisfying their folded transform.
    pub unchanged_slots: usize,
}

impl RewritePlan {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }
}

/// Compile resolved edits into a per-file edit plan.
pub fn plan(
    resolved: &[ResolvedEdit],
    index: &SymbolIndex,
    options: RewriteOptions,
) -> RewritePlan {
    let mut plan = RewritePlan::default();

    // Group by slot, preserving directive order within each group.
    let mut by_slot: BTreeMap<SlotId, Vec<&ResolvedEdit>> = BTreeMap::new();
    for edit in resolved {
        by_slot.entry(edit.slot).or_default().push(edit);
    }
    for group in by_slot.values_mut() {
        group.sort_by_key(|e| e.directive_index);
    }

    for (slot_id, group) in by_slot {
        let slot = index.slot(slot_id);
        let transform = fold_group(&group, options.merge);
        let winner = group.last().expect("slot groups are never empty");

        let source = &index.file(slot.file).text;
        let modifiers = &slot.modifiers;

        if transform.access < current_access(&modifiers.tokens) {
            let message = format!(
                "directive narrows access from {} to {}",
                current_access(&modifiers.tokens),
                transform.access
            );
            match options.widen {
                WidenPolicy::Allow => {}
                WidenPolicy::Warn => plan.diagnostics.push(narrowing_diagnostic(
                    Severity::Warning,
                    winner,
                    message,
                )),
                WidenPolicy::Deny => {
                    plan.diagnostics.push(narrowing_diagnostic(
                        Severity::Error,
                        winner,
                        message,
                    ));
                    continue;
                }
            }
        }

        match transform_modifiers(&transform, &modifiers.tokens) {
            None => {
                plan.unchanged_slots += 1;
                if !winner.implicit {
                    plan.diagnostics.push(Diagnostic {
                        severity: Severity::Info,
                        kind: DiagnosticKind::RedundantDirective,
                        line: winner.line,
                        directive: winner.directive.clone(),
                        message: "declaration already has the requested modifiers".to_string(),
                    });
                }
            }
            Some(new_tokens) => {
                plan.changed_slots += 1;
                plan.file_edits
                    .entry(slot.file)
                    .or_default()
                    .push(compile_edit(modifiers, &new_tokens, source));
            }
        }
    }

    plan
}

fn fold_group(group: &[&ResolvedEdit], merge: MergeSemantics) -> AccessTransform {
    match merge {
        MergeSemantics::Replace => {
            group.last().expect("slot groups are never empty").transform
        }
        MergeSemantics::Accumulate => {
            let mut iter = group.iter();
            let first = iter.next().expect("slot groups are never empty").transform;
            iter.fold(first, |acc, e| acc.accumulate(e.transform))
        }
    }
}

fn narrowing_diagnostic(
    severity: Severity,
    winner: &ResolvedEdit,
    message: String,
) -> Diagnostic {
    Diagnostic {
        severity,
        kind: DiagnosticKind::IllegalWidening,
        line: winner.line,
        directive: winner.directive.clone(),
        message,
    }
}

/// Turn one slot's new token list into a byte-span edit.
fn compile_edit(
    modifiers: &ModifierList,
    new_tokens: &[crate::at::ModifierToken],
    source: &str,
) -> Edit {
    let rendered = render(new_tokens);
    match modifiers.span {
        Some((start, end)) => {
            if rendered.is_empty() {
                // The whole keyword region disappears; take the trailing
                // whitespace run with it so no double gap is left behind.
                let mut strip_end = end;
                for c in source[end..].chars() {
                    if c.is_whitespace() {
                        strip_end += c.len_utf8();
                    } else {
                        break;
                    }
                }
                Edit::new(start, strip_end, "", &source[start..strip_end])
            } else {
                Edit::new(start, end, rendered, &source[start..end])
            }
        }
        None => Edit::insert(modifiers.insert_at, format!("{rendered} ")),
    }
}
