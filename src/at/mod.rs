//! Access-transformer directive model, parser, and modifier merging.

pub mod directive;
pub mod merge;
pub mod parser;

pub use directive::{
    AccessChange, AccessTransform, BaseType, Directive, FinalChange, JvmElem, JvmType,
    MethodDescriptor, TargetKind,
};
pub use merge::{current_access, render, transform_modifiers, ModifierToken, TokenKind};
pub use parser::{parse_file, parse_str, DirectiveError};
