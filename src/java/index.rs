//! Symbol index over parsed Java trees.
//!
//! One traversal per file builds lookup tables from qualified type name to
//! type declaration and from member simple name to overload bucket. The index
//! is built once, before resolution starts, and is read-only thereafter, so
//! it can be shared freely across parallel work.
//!
//! Each indexed declaration carries a `ModifierList`: the keyword tokens of
//! its modifier region in source order, the byte span of that region, and the
//! insertion point used when the region is empty. This span is the only part
//! of a declaration the rewrite step ever touches.

use crate::at::merge::ModifierToken;
use crate::java::errors::JavaParseError;
use crate::pool;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use tree_sitter::Node;

pub type FileId = usize;
pub type SlotId = usize;
pub type TypeId = usize;

/// An input source file: path (used for reporting and output) plus text.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub text: String,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("duplicate type '{name}' declared in both {first} and {second}")]
    DuplicateType {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("syntax error in {path} at line {line}, column {column}")]
    Syntax {
        path: PathBuf,
        line: usize,
        column: usize,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: JavaParseError,
    },
}

/// The modifier region of one declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifierList {
    /// Tokens inside the keyword region, source order. Annotations or
    /// comments sitting between keywords are carried as opaque tokens.
    pub tokens: Vec<ModifierToken>,
    /// Byte span of the keyword region, `None` when the declaration has no
    /// keyword modifiers.
    pub span: Option<(usize, usize)>,
    /// Where to insert a rendered modifier list when the region is empty:
    /// the start of the token that follows annotations (the `class` keyword,
    /// the field/method type, or the constructor name).
    pub insert_at: usize,
}

/// One rewritable modifier region. Members declared together (`int x, y;`)
/// share a slot, so overlapping directives on the group merge instead of
/// producing conflicting edits.
#[derive(Debug, Clone)]
pub struct Slot {
    pub file: FileId,
    pub modifiers: ModifierList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Field,
    Method,
    Constructor,
}

/// A parameter type as written in source, after generic-argument erasure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceType {
    /// Array dimensions, varargs counted as one.
    pub dims: usize,
    /// The written element name: `int`, `String`, `Map.Entry`, a type
    /// variable, ...
    pub name: String,
}

impl SourceType {
    /// Last `.`-separated segment, for import-free matching against
    /// descriptor names.
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone)]
pub struct MemberDecl {
    /// Simple name; `<init>` for constructors.
    pub name: String,
    pub kind: MemberKind,
    pub slot: SlotId,
    /// Parameter list for methods and constructors, `None` for fields.
    pub params: Option<Vec<SourceType>>,
    /// Method-level type variables, for erasure-aware descriptor matching.
    pub type_params: Vec<String>,
}

impl MemberDecl {
    /// Human-readable signature for diagnostics: `run(String, int)`.
    pub fn signature(&self) -> String {
        match &self.params {
            None => self.name.clone(),
            Some(params) => {
                let rendered: Vec<String> = params
                    .iter()
                    .map(|p| {
                        let mut s = p.name.clone();
                        for _ in 0..p.dims {
                            s.push_str("[]");
                        }
                        s
                    })
                    .collect();
                format!("{}({})", self.name, rendered.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct TypeDecl {
    /// Qualified name: dot-separated package, `$`-separated nesting.
    pub name: String,
    pub slot: SlotId,
    pub members: Vec<MemberDecl>,
    /// Member simple name -> indices into `members` (overload buckets).
    pub member_names: HashMap<String, Vec<usize>>,
    /// Class-level type variables.
    pub type_params: Vec<String>,
    /// The `extends` clause as written, generic arguments erased. `None` for
    /// interfaces, enums, records, and classes without one.
    pub superclass: Option<String>,
}

impl TypeDecl {
    pub fn members_named(&self, name: &str) -> &[usize] {
        self.member_names
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone)]
pub struct IndexedFile {
    pub path: PathBuf,
    pub text: String,
}

/// Immutable symbol index over a set of source files.
#[derive(Debug)]
pub struct SymbolIndex {
    files: Vec<IndexedFile>,
    slots: Vec<Slot>,
    types: Vec<TypeDecl>,
    by_name: HashMap<String, TypeId>,
    /// Qualified type name -> types whose `extends` clause resolves to it.
    subtypes: HashMap<String, Vec<TypeId>>,
}

impl SymbolIndex {
    /// Parse every file and build the merged index.
    ///
    /// Parsing and per-file extraction run in parallel; the name-keyed merge
    /// is sequential so `DuplicateType` reporting is deterministic. Any file
    /// with ERROR nodes is fatal: resolution against a half-parsed tree would
    /// produce silent misses rather than diagnostics.
    pub fn build(sources: Vec<SourceFile>) -> Result<Self, IndexError> {
        let mut extracted: Vec<FileSymbols> = sources
            .into_par_iter()
            .map(extract_file)
            .collect::<Result<Vec<_>, _>>()?;

        // Deterministic merge order regardless of parallel scheduling.
        extracted.sort_by(|a, b| a.path.cmp(&b.path));

        let mut index = SymbolIndex {
            files: Vec::new(),
            slots: Vec::new(),
            types: Vec::new(),
            by_name: HashMap::new(),
            subtypes: HashMap::new(),
        };

        for file_symbols in extracted {
            let file_id = index.files.len();
            let slot_offset = index.slots.len();

            // File record goes in first so duplicate reporting can name it
            // even when both declarations sit in the same file.
            index.files.push(IndexedFile {
                path: file_symbols.path,
                text: file_symbols.text,
            });

            for modifiers in file_symbols.slots {
                index.slots.push(Slot {
                    file: file_id,
                    modifiers,
                });
            }

            for mut ty in file_symbols.types {
                ty.slot += slot_offset;
                for member in &mut ty.members {
                    member.slot += slot_offset;
                }

                if let Some(&existing) = index.by_name.get(&ty.name) {
                    let first = index.files[index.slots[index.types[existing].slot].file]
                        .path
                        .clone();
                    return Err(IndexError::DuplicateType {
                        name: ty.name,
                        first,
                        second: index.files[file_id].path.clone(),
                    });
                }
                index.by_name.insert(ty.name.clone(), index.types.len());
                index.types.push(ty);
            }
        }

        index.link_subtypes();
        Ok(index)
    }

    /// Resolve each type's written `extends` name against the source set and
    /// record the reverse edges. Written names resolve either as-is (already
    /// qualified) or against the subtype's own package; supertypes outside
    /// the source set simply get no edge.
    fn link_subtypes(&mut self) {
        for (id, ty) in self.types.iter().enumerate() {
            let Some(written) = &ty.superclass else {
                continue;
            };
            let resolved = if self.by_name.contains_key(written) {
                Some(written.clone())
            } else {
                package_of(&ty.name)
                    .map(|pkg| format!("{pkg}.{written}"))
                    .filter(|candidate| self.by_name.contains_key(candidate))
            };
            if let Some(super_name) = resolved {
                self.subtypes.entry(super_name).or_default().push(id);
            }
        }
    }

    pub fn type_named(&self, name: &str) -> Option<&TypeDecl> {
        self.by_name.get(name).map(|&id| &self.types[id])
    }

    pub fn type_decl(&self, id: TypeId) -> &TypeDecl {
        &self.types[id]
    }

    /// Types that directly extend the named type. Transitive chains are
    /// walked by the caller.
    pub fn direct_subtypes(&self, name: &str) -> &[TypeId] {
        self.subtypes.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn slot(&self, id: SlotId) -> &Slot {
        &self.slots[id]
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn file(&self, id: FileId) -> &IndexedFile {
        &self.files[id]
    }

    pub fn files(&self) -> &[IndexedFile] {
        &self.files
    }
}

/// Per-file extraction output with file-local slot ids.
struct FileSymbols {
    path: PathBuf,
    text: String,
    slots: Vec<ModifierList>,
    types: Vec<TypeDecl>,
}

fn extract_file(source: SourceFile) -> Result<FileSymbols, IndexError> {
    let SourceFile { path, text } = source;

    let tree = pool::with_parser(|parser| parser.parse(&text))
        .and_then(|r| r)
        .map_err(|e| IndexError::Parse {
            path: path.clone(),
            source: e,
        })?;

    let root = tree.root_node();
    if let Some(error) = first_error_node(root) {
        let point = error.start_position();
        return Err(IndexError::Syntax {
            path,
            line: point.row + 1,
            column: point.column + 1,
        });
    }

    let mut walker = Walker {
        source: &text,
        slots: Vec::new(),
        types: Vec::new(),
    };

    let package = walker.package_name(root);
    walker.walk_container(root, &package);

    let Walker { slots, types, .. } = walker;
    Ok(FileSymbols {
        path,
        text,
        slots,
        types,
    })
}

/// Package portion of a qualified type name: `a.b.Outer$Inner` -> `a.b`.
fn package_of(name: &str) -> Option<&str> {
    let top_level = name.split('$').next().unwrap_or(name);
    top_level.rsplit_once('.').map(|(pkg, _)| pkg)
}

fn first_error_node(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = first_error_node(child) {
            return Some(found);
        }
    }
    None
}

const TYPE_DECL_KINDS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "annotation_type_declaration",
];

const MODIFIER_KEYWORDS: &[&str] = &[
    "public",
    "protected",
    "private",
    "abstract",
    "static",
    "final",
    "strictfp",
    "default",
    "synchronized",
    "native",
    "transient",
    "volatile",
    "sealed",
    "non-sealed",
];

struct Walker<'a> {
    source: &'a str,
    slots: Vec<ModifierList>,
    types: Vec<TypeDecl>,
}

impl<'a> Walker<'a> {
    fn text(&self, node: Node<'_>) -> &'a str {
        &self.source[node.byte_range()]
    }

    fn package_name(&self, root: Node<'_>) -> String {
        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            if child.kind() == "package_declaration" {
                let mut inner = child.walk();
                for part in child.named_children(&mut inner) {
                    if matches!(part.kind(), "scoped_identifier" | "identifier") {
                        return self.text(part).to_string();
                    }
                }
            }
        }
        String::new()
    }

    /// Walk top-level declarations of a file (`qualifier` is the package) or
    /// the body of a type (`qualifier` is the enclosing qualified name).
    fn walk_container(&mut self, container: Node<'_>, qualifier: &str) {
        let mut cursor = container.walk();
        let nested = container.kind() != "program";
        for child in container.named_children(&mut cursor) {
            if TYPE_DECL_KINDS.contains(&child.kind()) {
                self.index_type(child, qualifier, nested);
            } else if child.kind() == "enum_body_declarations" {
                self.walk_container(child, qualifier);
            }
        }
    }

    fn index_type(&mut self, decl: Node<'_>, qualifier: &str, nested: bool) {
        let Some(name_node) = decl.child_by_field_name("name") else {
            return;
        };
        let simple = self.text(name_node);
        let qualified = if qualifier.is_empty() {
            simple.to_string()
        } else if nested {
            format!("{qualifier}${simple}")
        } else {
            format!("{qualifier}.{simple}")
        };

        let slot = self.record_slot(decl);
        let type_params = self.type_parameters(decl);
        let superclass = decl.child_by_field_name("superclass").and_then(|node| {
            let mut cursor = node.walk();
            let first = node.named_children(&mut cursor).next();
            first.map(|ty| self.source_type(ty).name)
        });

        let mut members = Vec::new();
        if let Some(body) = decl.child_by_field_name("body") {
            self.collect_members(body, &mut members);
        }

        let mut member_names: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, member) in members.iter().enumerate() {
            member_names
                .entry(member.name.clone())
                .or_default()
                .push(i);
        }

        self.types.push(TypeDecl {
            name: qualified.clone(),
            slot,
            members,
            member_names,
            type_params,
            superclass,
        });

        // Nested types are indexed after their owner so `$` chains build up
        // naturally.
        if let Some(body) = decl.child_by_field_name("body") {
            self.walk_container(body, &qualified);
        }
    }

    fn collect_members(&mut self, body: Node<'_>, members: &mut Vec<MemberDecl>) {
        let mut cursor = body.walk();
        for child in body.named_children(&mut cursor) {
            match child.kind() {
                "field_declaration" | "constant_declaration" => {
                    let slot = self.record_slot(child);
                    let mut inner = child.walk();
                    for declarator in child.named_children(&mut inner) {
                        if declarator.kind() != "variable_declarator" {
                            continue;
                        }
                        let Some(name_node) = declarator.child_by_field_name("name") else {
                            continue;
                        };
                        members.push(MemberDecl {
                            name: self.text(name_node).to_string(),
                            kind: MemberKind::Field,
                            slot,
                            params: None,
                            type_params: Vec::new(),
                        });
                    }
                }
                "method_declaration" => {
                    let Some(name_node) = child.child_by_field_name("name") else {
                        continue;
                    };
                    let slot = self.record_slot(child);
                    members.push(MemberDecl {
                        name: self.text(name_node).to_string(),
                        kind: MemberKind::Method,
                        slot,
                        params: Some(self.parameter_types(child)),
                        type_params: self.type_parameters(child),
                    });
                }
                "constructor_declaration" => {
                    let slot = self.record_slot(child);
                    members.push(MemberDecl {
                        name: "<init>".to_string(),
                        kind: MemberKind::Constructor,
                        slot,
                        params: Some(self.parameter_types(child)),
                        type_params: self.type_parameters(child),
                    });
                }
                "enum_body_declarations" => {
                    self.collect_members(child, members);
                }
                _ => {}
            }
        }
    }

    fn record_slot(&mut self, decl: Node<'_>) -> SlotId {
        let id = self.slots.len();
        self.slots.push(self.extract_modifiers(decl));
        id
    }

    /// Extract the keyword-modifier region of a declaration.
    ///
    /// The span runs from the first keyword to the last keyword; leading
    /// annotations stay outside it and are never rewritten. Annotations or
    /// comments *between* keywords land inside the span and are carried as
    /// opaque tokens so a rewrite re-emits them.
    fn extract_modifiers(&self, decl: Node<'_>) -> ModifierList {
        let mut modifiers_node = None;
        let mut cursor = decl.walk();
        for child in decl.named_children(&mut cursor) {
            if child.kind() == "modifiers" {
                modifiers_node = Some(child);
                break;
            }
        }

        let Some(modifiers) = modifiers_node else {
            return ModifierList {
                tokens: Vec::new(),
                span: None,
                insert_at: decl.start_byte(),
            };
        };

        let mut keyword_spans = Vec::new();
        let mut all_children = Vec::new();
        for i in 0..modifiers.child_count() {
            let child = modifiers.child(i).expect("child index within count");
            all_children.push(child);
            if MODIFIER_KEYWORDS.contains(&child.kind()) {
                keyword_spans.push((child.start_byte(), child.end_byte()));
            }
        }

        let insert_at = modifiers
            .next_sibling()
            .map(|s| s.start_byte())
            .unwrap_or_else(|| modifiers.end_byte());

        let Some(&(first_start, _)) = keyword_spans.first() else {
            return ModifierList {
                tokens: Vec::new(),
                span: None,
                insert_at,
            };
        };
        let (_, last_end) = *keyword_spans.last().expect("non-empty keyword list");

        let tokens = all_children
            .iter()
            .filter(|c| c.start_byte() >= first_start && c.end_byte() <= last_end)
            .map(|c| ModifierToken::new(self.text(*c)))
            .collect();

        ModifierList {
            tokens,
            span: Some((first_start, last_end)),
            insert_at: first_start,
        }
    }

    fn type_parameters(&self, decl: Node<'_>) -> Vec<String> {
        let Some(params) = decl.child_by_field_name("type_parameters") else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut cursor = params.walk();
        for child in params.named_children(&mut cursor) {
            if child.kind() == "type_parameter" {
                let mut inner = child.walk();
                for part in child.named_children(&mut inner) {
                    if part.kind() == "type_identifier" {
                        out.push(self.text(part).to_string());
                        break;
                    }
                }
            }
        }
        out
    }

    fn parameter_types(&self, decl: Node<'_>) -> Vec<SourceType> {
        let Some(params) = decl.child_by_field_name("parameters") else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut cursor = params.walk();
        for child in params.named_children(&mut cursor) {
            match child.kind() {
                "formal_parameter" => {
                    if let Some(ty) = child.child_by_field_name("type") {
                        out.push(self.source_type(ty));
                    }
                }
                "spread_parameter" => {
                    // Varargs erase to one extra array dimension.
                    let mut inner = child.walk();
                    for part in child.named_children(&mut inner) {
                        if matches!(part.kind(), "variable_declarator" | "modifiers") {
                            continue;
                        }
                        let mut ty = self.source_type(part);
                        ty.dims += 1;
                        out.push(ty);
                        break;
                    }
                }
                _ => {}
            }
        }
        out
    }

    fn source_type(&self, node: Node<'_>) -> SourceType {
        match node.kind() {
            "array_type" => {
                let dims = node
                    .child_by_field_name("dimensions")
                    .map(|d| self.text(d).matches("[]").count())
                    .unwrap_or(0);
                let element = node
                    .child_by_field_name("element")
                    .map(|e| self.source_type(e))
                    .unwrap_or(SourceType {
                        dims: 0,
                        name: String::new(),
                    });
                SourceType {
                    dims: dims + element.dims,
                    name: element.name,
                }
            }
            "generic_type" => {
                // Erase type arguments: the raw type is the first named child.
                let mut cursor = node.walk();
                let raw = node.named_children(&mut cursor).next();
                raw.map(|raw| self.source_type(raw))
                    .unwrap_or(SourceType {
                        dims: 0,
                        name: self.text(node).to_string(),
                    })
            }
            "annotated_type" => {
                // Type-use annotations precede the underlying type.
                let mut cursor = node.walk();
                node.named_children(&mut cursor)
                    .filter(|c| !matches!(c.kind(), "marker_annotation" | "annotation"))
                    .last()
                    .map(|raw| self.source_type(raw))
                    .unwrap_or(SourceType {
                        dims: 0,
                        name: self.text(node).to_string(),
                    })
            }
            _ => SourceType {
                dims: 0,
                name: self.text(node).to_string(),
            },
        }
    }
}
