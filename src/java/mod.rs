//! Java parsing and symbol indexing.

pub mod errors;
pub mod index;
pub mod parser;

pub use errors::JavaParseError;
pub use index::{
    FileId, IndexError, IndexedFile, MemberDecl, MemberKind, ModifierList, Slot, SlotId,
    SourceFile, SourceType, SymbolIndex, TypeDecl, TypeId,
};
pub use parser::{ErrorNode, JavaParser, ParsedSource};
