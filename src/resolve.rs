//! Directive resolution against the symbol index.
//!
//! Resolution turns each parsed directive into zero or more `(slot,
//! transform)` pairs and a diagnostic stream. It never touches source text;
//! the rewrite step does that. Unresolvable directives produce diagnostics
//! and resolution continues, so one bad line reports every problem in the
//! file rather than the first.

use crate::at::{
    AccessTransform, Directive, JvmElem, JvmType, MethodDescriptor, TargetKind,
};
use crate::java::{MemberDecl, MemberKind, SlotId, SymbolIndex, TypeDecl, TypeId};
use serde::Serialize;
use std::fmt;
use strsim::jaro_winkler;

/// Minimum Jaro-Winkler similarity before a name is offered as a suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
            Severity::Info => f.write_str("info"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    UnresolvedTarget,
    AmbiguousTarget,
    EmptyWildcard,
    IllegalWidening,
    RedundantDirective,
}

/// One problem (or notice) tied to a directive line.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    /// One-based line in the directive file.
    pub line: u32,
    /// The directive as authored, re-rendered.
    pub directive: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        severity: Severity,
        kind: DiagnosticKind,
        directive: &Directive,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            kind,
            line: directive.line,
            directive: directive.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: line {}: {} ({})",
            self.severity, self.line, self.message, self.directive
        )
    }
}

/// A directive pinned to a concrete modifier slot.
#[derive(Debug, Clone)]
pub struct ResolvedEdit {
    pub slot: SlotId,
    /// Directive order drives last-wins merging when slots collide.
    pub directive_index: usize,
    pub line: u32,
    /// Rendered directive text, kept for rewrite-stage diagnostics.
    pub directive: String,
    pub transform: AccessTransform,
    /// Whether this edit came from wildcard expansion or from override
    /// propagation rather than an explicit target. Implicit no-ops are
    /// expected and stay silent; targeted no-ops get an info notice.
    pub implicit: bool,
}

/// Output of the resolution phase.
#[derive(Debug, Default)]
pub struct Resolution {
    pub edits: Vec<ResolvedEdit>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Resolution {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }
}

/// Resolve every directive against the index.
pub fn resolve(directives: &[Directive], index: &SymbolIndex) -> Resolution {
    let mut resolution = Resolution::default();
    for directive in directives {
        resolve_one(directive, index, &mut resolution);
    }
    resolution
}

fn resolve_one(directive: &Directive, index: &SymbolIndex, out: &mut Resolution) {
    let Some(owner) = index.type_named(&directive.owner) else {
        let mut message = format!("type '{}' not found in source set", directive.owner);
        if let Some(suggestion) = closest(&directive.owner, index.type_names()) {
            message.push_str(&format!("; did you mean '{suggestion}'?"));
        }
        out.diagnostics.push(Diagnostic::new(
            Severity::Error,
            DiagnosticKind::UnresolvedTarget,
            directive,
            message,
        ));
        return;
    };

    match &directive.target {
        TargetKind::Class => {
            push_edit(out, directive, owner.slot, false);
        }
        TargetKind::WildcardFields => {
            let slots = wildcard_slots(owner, MemberKind::Field);
            if slots.is_empty() {
                out.diagnostics.push(Diagnostic::new(
                    Severity::Info,
                    DiagnosticKind::EmptyWildcard,
                    directive,
                    format!("'{}' declares no fields", directive.owner),
                ));
            }
            for slot in slots {
                push_edit(out, directive, slot, true);
            }
        }
        TargetKind::WildcardMethods => {
            let slots = wildcard_slots(owner, MemberKind::Method);
            if slots.is_empty() {
                out.diagnostics.push(Diagnostic::new(
                    Severity::Info,
                    DiagnosticKind::EmptyWildcard,
                    directive,
                    format!("'{}' declares no methods", directive.owner),
                ));
            }
            for slot in slots {
                push_edit(out, directive, slot, true);
            }
        }
        TargetKind::Field { name } => {
            resolve_bare_member(directive, owner, name, index, out);
        }
        TargetKind::Method { name, descriptor } => {
            resolve_method(directive, owner, name, descriptor.as_ref(), index, out);
        }
    }
}

/// All distinct slots for members of one kind, in declaration order.
/// Grouped field declarations share a slot, so duplicates are dropped.
fn wildcard_slots(owner: &TypeDecl, kind: MemberKind) -> Vec<SlotId> {
    let mut slots = Vec::new();
    for member in &owner.members {
        if member.kind == kind && !slots.contains(&member.slot) {
            slots.push(member.slot);
        }
    }
    slots
}

/// A bare member name is a field target first; when no field matches, it
/// falls back to a descriptor-less method target.
fn resolve_bare_member(
    directive: &Directive,
    owner: &TypeDecl,
    name: &str,
    index: &SymbolIndex,
    out: &mut Resolution,
) {
    let bucket = owner.members_named(name);
    let fields: Vec<&MemberDecl> = bucket
        .iter()
        .map(|&i| &owner.members[i])
        .filter(|m| m.kind == MemberKind::Field)
        .collect();

    if let Some(field) = fields.first() {
        push_edit(out, directive, field.slot, false);
        return;
    }

    let methods: Vec<&MemberDecl> = bucket
        .iter()
        .map(|&i| &owner.members[i])
        .filter(|m| m.kind != MemberKind::Field)
        .collect();

    match methods.len() {
        0 => {
            let mut message = format!(
                "no member '{name}' in '{owner}'",
                owner = directive.owner
            );
            if let Some(suggestion) =
                closest(name, owner.member_names.keys().map(String::as_str))
            {
                message.push_str(&format!("; did you mean '{suggestion}'?"));
            } else if index.type_names().next().is_none() {
                message.push_str("; source set is empty");
            }
            out.diagnostics.push(Diagnostic::new(
                Severity::Error,
                DiagnosticKind::UnresolvedTarget,
                directive,
                message,
            ));
        }
        1 => {
            push_edit(out, directive, methods[0].slot, false);
            propagate_to_overrides(directive, owner, methods[0], index, out);
        }
        _ => {
            out.diagnostics.push(Diagnostic::new(
                Severity::Error,
                DiagnosticKind::AmbiguousTarget,
                directive,
                format!(
                    "'{name}' has {} overloads in '{}'; add a descriptor: {}",
                    methods.len(),
                    directive.owner,
                    signatures(&methods)
                ),
            ));
        }
    }
}

fn resolve_method(
    directive: &Directive,
    owner: &TypeDecl,
    name: &str,
    descriptor: Option<&MethodDescriptor>,
    index: &SymbolIndex,
    out: &mut Resolution,
) {
    let bucket = owner.members_named(name);
    let candidates: Vec<&MemberDecl> = bucket
        .iter()
        .map(|&i| &owner.members[i])
        .filter(|m| m.kind != MemberKind::Field)
        .collect();

    if candidates.is_empty() {
        let mut message = format!("no method '{name}' in '{}'", directive.owner);
        if let Some(suggestion) = closest(
            name,
            owner.member_names.keys().map(String::as_str),
        ) {
            message.push_str(&format!("; did you mean '{suggestion}'?"));
        }
        out.diagnostics.push(Diagnostic::new(
            Severity::Error,
            DiagnosticKind::UnresolvedTarget,
            directive,
            message,
        ));
        return;
    }

    let Some(descriptor) = descriptor else {
        // Descriptor-less directive: only valid for a single overload.
        if candidates.len() == 1 {
            push_edit(out, directive, candidates[0].slot, false);
            propagate_to_overrides(directive, owner, candidates[0], index, out);
        } else {
            out.diagnostics.push(Diagnostic::new(
                Severity::Error,
                DiagnosticKind::AmbiguousTarget,
                directive,
                format!(
                    "'{name}' has {} overloads in '{}'; add a descriptor: {}",
                    candidates.len(),
                    directive.owner,
                    signatures(&candidates)
                ),
            ));
        }
        return;
    };

    let matching: Vec<&MemberDecl> = candidates
        .iter()
        .copied()
        .filter(|m| descriptor_matches(descriptor, m, owner))
        .collect();

    match matching.len() {
        0 => {
            out.diagnostics.push(Diagnostic::new(
                Severity::Error,
                DiagnosticKind::UnresolvedTarget,
                directive,
                format!(
                    "no overload of '{name}' in '{}' matches {descriptor}; available: {}",
                    directive.owner,
                    signatures(&candidates)
                ),
            ));
        }
        1 => {
            push_edit(out, directive, matching[0].slot, false);
            propagate_to_overrides(directive, owner, matching[0], index, out);
        }
        _ => {
            // Possible when erased type variables make overloads collide.
            out.diagnostics.push(Diagnostic::new(
                Severity::Error,
                DiagnosticKind::AmbiguousTarget,
                directive,
                format!(
                    "{descriptor} matches {} overloads of '{name}' in '{}': {}",
                    matching.len(),
                    directive.owner,
                    signatures(&matching)
                ),
            ));
        }
    }
}

fn push_edit(out: &mut Resolution, directive: &Directive, slot: SlotId, implicit: bool) {
    out.edits.push(ResolvedEdit {
        slot,
        directive_index: directive.index,
        line: directive.line,
        directive: directive.to_string(),
        transform: directive.transform,
        implicit,
    });
}

/// A method transform also applies to overriding declarations in source-set
/// subclasses: widening a base method without widening its overrides would
/// leave the tree uncompilable, since an override may not reduce visibility.
fn propagate_to_overrides(
    directive: &Directive,
    owner: &TypeDecl,
    matched: &MemberDecl,
    index: &SymbolIndex,
    out: &mut Resolution,
) {
    if matched.kind != MemberKind::Method {
        return;
    }
    let mut queue: Vec<TypeId> = index.direct_subtypes(&owner.name).to_vec();
    while let Some(id) = queue.pop() {
        let subtype = index.type_decl(id);
        for &i in subtype.members_named(&matched.name) {
            let member = &subtype.members[i];
            if member.kind == MemberKind::Method && same_erased_params(matched, member) {
                push_edit(out, directive, member.slot, true);
            }
        }
        queue.extend_from_slice(index.direct_subtypes(&subtype.name));
    }
}

fn same_erased_params(a: &MemberDecl, b: &MemberDecl) -> bool {
    match (&a.params, &b.params) {
        (Some(a), Some(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b)
                    .all(|(x, y)| x.dims == y.dims && x.simple_name() == y.simple_name())
        }
        _ => false,
    }
}

fn signatures(members: &[&MemberDecl]) -> String {
    members
        .iter()
        .map(|m| m.signature())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Does an erased descriptor describe this source-level parameter list?
///
/// Object types compare by simple name because imports are not resolved;
/// a type variable of the method or its owner matches any reference type.
fn descriptor_matches(
    descriptor: &MethodDescriptor,
    member: &MemberDecl,
    owner: &TypeDecl,
) -> bool {
    let Some(params) = &member.params else {
        return false;
    };
    if descriptor.params.len() != params.len() {
        return false;
    }
    descriptor
        .params
        .iter()
        .zip(params)
        .all(|(jvm, src)| {
            let is_type_var = member.type_params.iter().any(|t| t == &src.name)
                || owner.type_params.iter().any(|t| t == &src.name);
            jvm_type_matches(jvm, src.dims, src.simple_name(), is_type_var)
        })
}

fn jvm_type_matches(jvm: &JvmType, src_dims: usize, src_simple: &str, is_type_var: bool) -> bool {
    if jvm.dims != src_dims {
        // An erased type variable may itself be an array type's element, but
        // without bounds information dims must still line up.
        return false;
    }
    match &jvm.elem {
        JvmElem::Primitive(base) => !is_type_var && src_simple == base.source_name(),
        JvmElem::Object(_) => {
            if is_type_var {
                return true;
            }
            jvm.simple_name() == Some(src_simple)
        }
        JvmElem::Void => false,
    }
}

fn closest<'a>(query: &str, candidates: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    candidates
        .map(|c| (c, jaro_winkler(query, c)))
        .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(c, _)| c)
}
