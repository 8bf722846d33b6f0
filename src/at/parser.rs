//! Parser for the FML access-transformer directive format.
//!
//! One directive per non-blank, non-comment line; `#` starts a comment.
//! Grammar: `<access>[+f|-f] <owner> [<member>]` where the member is a field
//! name, a method name with an erased JVMS descriptor, `*` for all fields, or
//! `*()` for all methods.

use crate::at::directive::{
    AccessChange, AccessTransform, DescriptorError, Directive, FinalChange, MethodDescriptor,
    TargetKind,
};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DirectiveError {
    #[error("line {line}: unknown access keyword '{found}'")]
    UnknownAccess { line: u32, found: String },

    #[error("line {line}: missing owner class name")]
    MissingOwner { line: u32 },

    #[error("line {line}: malformed qualified name '{found}'")]
    MalformedOwner { line: u32, found: String },

    #[error("line {line}: malformed member '{found}': {cause}")]
    MalformedMember {
        line: u32,
        found: String,
        cause: String,
    },

    #[error("line {line}: invalid method descriptor: {source}")]
    Descriptor {
        line: u32,
        #[source]
        source: DescriptorError,
    },

    #[error("line {line}: unexpected trailing token '{found}'")]
    TrailingToken { line: u32, found: String },

    #[error("failed to read directive file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DirectiveError {
    pub fn line(&self) -> Option<u32> {
        match self {
            DirectiveError::UnknownAccess { line, .. }
            | DirectiveError::MissingOwner { line }
            | DirectiveError::MalformedOwner { line, .. }
            | DirectiveError::MalformedMember { line, .. }
            | DirectiveError::Descriptor { line, .. }
            | DirectiveError::TrailingToken { line, .. } => Some(*line),
            DirectiveError::Io { .. } => None,
        }
    }
}

/// Parse a directive file from disk. Only I/O failure is fatal; malformed
/// lines come back in the error list alongside the directives that did parse.
pub fn parse_file(
    path: impl AsRef<Path>,
) -> Result<(Vec<Directive>, Vec<DirectiveError>), DirectiveError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| DirectiveError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_str(&contents))
}

/// Parse directive-file text into an ordered directive list.
///
/// Blank and comment lines are skipped and not counted as directives. A
/// malformed line is recorded and skipped so one typo does not hide every
/// later problem in the file.
pub fn parse_str(input: &str) -> (Vec<Directive>, Vec<DirectiveError>) {
    let mut directives = Vec::new();
    let mut errors = Vec::new();

    for (line_idx, raw_line) in input.lines().enumerate() {
        let line = (line_idx + 1) as u32;

        // Strip trailing comment, then surrounding whitespace.
        let text = match raw_line.find('#') {
            Some(pos) => &raw_line[..pos],
            None => raw_line,
        };
        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        match parse_line(text, line) {
            Ok((transform, owner, target)) => directives.push(Directive {
                index: directives.len(),
                line,
                transform,
                owner,
                target,
            }),
            Err(error) => errors.push(error),
        }
    }

    (directives, errors)
}

fn parse_line(
    text: &str,
    line: u32,
) -> Result<(AccessTransform, String, TargetKind), DirectiveError> {
    let mut tokens = text.split_whitespace();
    let access_token = tokens.next().expect("non-empty line has a first token");
    let transform = parse_access(access_token, line)?;

    let owner_token = tokens
        .next()
        .ok_or(DirectiveError::MissingOwner { line })?;
    let owner = normalize_owner(owner_token, line)?;

    let target = match tokens.next() {
        None => TargetKind::Class,
        Some(member) => parse_member(member, line)?,
    };

    if let Some(extra) = tokens.next() {
        return Err(DirectiveError::TrailingToken {
            line,
            found: extra.to_string(),
        });
    }

    Ok((transform, owner, target))
}

fn parse_access(token: &str, line: u32) -> Result<AccessTransform, DirectiveError> {
    let (base, final_change) = if let Some(stripped) = token.strip_suffix("+f") {
        (stripped, Some(FinalChange::Add))
    } else if let Some(stripped) = token.strip_suffix("-f") {
        (stripped, Some(FinalChange::Remove))
    } else {
        (token, None)
    };

    let access = match base {
        "public" => AccessChange::Public,
        "protected" => AccessChange::Protected,
        "default" => AccessChange::PackagePrivate,
        "private" => AccessChange::Private,
        _ => {
            return Err(DirectiveError::UnknownAccess {
                line,
                found: token.to_string(),
            })
        }
    };

    Ok(AccessTransform::new(access, final_change))
}

/// Normalize an owner name to the index key form: `.`-separated packages with
/// `$` nesting. `/` separators (JVMS internal names) are accepted and mapped.
fn normalize_owner(token: &str, line: u32) -> Result<String, DirectiveError> {
    let normalized = token.replace('/', ".");
    let valid = !normalized.is_empty()
        && normalized.split(['.', '$']).all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '_')
                && !segment.starts_with(|c: char| c.is_ascii_digit())
        });
    if !valid {
        return Err(DirectiveError::MalformedOwner {
            line,
            found: token.to_string(),
        });
    }
    Ok(normalized)
}

fn parse_member(member: &str, line: u32) -> Result<TargetKind, DirectiveError> {
    if member == "*" {
        return Ok(TargetKind::WildcardFields);
    }
    if member == "*()" {
        return Ok(TargetKind::WildcardMethods);
    }

    match member.find('(') {
        None => {
            if !is_valid_member_name(member) {
                return Err(DirectiveError::MalformedMember {
                    line,
                    found: member.to_string(),
                    cause: "invalid identifier".to_string(),
                });
            }
            // A bare name is a field target; resolution falls back to a
            // descriptor-less method target when no field matches.
            Ok(TargetKind::Field {
                name: member.to_string(),
            })
        }
        Some(paren) => {
            let name = &member[..paren];
            if !is_valid_member_name(name) {
                return Err(DirectiveError::MalformedMember {
                    line,
                    found: member.to_string(),
                    cause: "invalid method name".to_string(),
                });
            }
            let descriptor = MethodDescriptor::parse(&member[paren..])
                .map_err(|source| DirectiveError::Descriptor { line, source })?;
            Ok(TargetKind::Method {
                name: name.to_string(),
                descriptor: Some(descriptor),
            })
        }
    }
}

fn is_valid_member_name(name: &str) -> bool {
    // `<init>` and `<clinit>` are the only names allowed to carry angle
    // brackets, matching JVM special-method naming.
    if name == "<init>" || name == "<clinit>" {
        return true;
    }
    !name.is_empty()
        && name.chars().all(|c| c.is_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit())
}

/// Format a directive list back to canonical AT text, one directive per line.
pub fn format_directives(directives: &[Directive]) -> String {
    let mut out = String::new();
    for directive in directives {
        out.push_str(&directive.to_string());
        out.push('\n');
    }
    out
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::Class => f.write_str("class"),
            TargetKind::Field { name } => write!(f, "field {name}"),
            TargetKind::Method { name, .. } => write!(f, "method {name}"),
            TargetKind::WildcardFields => f.write_str("all fields"),
            TargetKind::WildcardMethods => f.write_str("all methods"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::at::directive::JvmElem;

    fn parse_ok(input: &str) -> Vec<Directive> {
        let (directives, errors) = parse_str(input);
        assert!(errors.is_empty(), "unexpected parse errors: {errors:?}");
        directives
    }

    fn parse_err(input: &str) -> DirectiveError {
        let (_, mut errors) = parse_str(input);
        assert_eq!(errors.len(), 1, "expected exactly one error");
        errors.remove(0)
    }

    #[test]
    fn parse_class_directive() {
        let directives = parse_ok("public net.example.Widget\n");
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].owner, "net.example.Widget");
        assert_eq!(directives[0].target, TargetKind::Class);
        assert_eq!(directives[0].transform.access, AccessChange::Public);
        assert_eq!(directives[0].transform.final_change, None);
    }

    #[test]
    fn parse_field_directive_with_final() {
        let directives = parse_ok("public-f net.example.Widget count");
        assert_eq!(
            directives[0].target,
            TargetKind::Field {
                name: "count".to_string()
            }
        );
        assert_eq!(
            directives[0].transform.final_change,
            Some(FinalChange::Remove)
        );
    }

    #[test]
    fn parse_method_directive_with_descriptor() {
        let directives = parse_ok("protected a.b.C run(Ljava/lang/String;I)V");
        match &directives[0].target {
            TargetKind::Method {
                name,
                descriptor: Some(desc),
            } => {
                assert_eq!(name, "run");
                assert_eq!(desc.params.len(), 2);
                assert_eq!(desc.ret.elem, JvmElem::Void);
            }
            other => panic!("expected method target, got {other:?}"),
        }
    }

    #[test]
    fn parse_constructor_directive() {
        let directives = parse_ok("public a.b.C <init>(I)V");
        assert!(matches!(
            &directives[0].target,
            TargetKind::Method { name, .. } if name == "<init>"
        ));
    }

    #[test]
    fn parse_wildcards() {
        let directives = parse_ok("public a.B *\ndefault+f a.B *()");
        assert_eq!(directives[0].target, TargetKind::WildcardFields);
        assert_eq!(directives[1].target, TargetKind::WildcardMethods);
        assert_eq!(
            directives[1].transform.access,
            AccessChange::PackagePrivate
        );
        assert_eq!(directives[1].transform.final_change, Some(FinalChange::Add));
    }

    #[test]
    fn comments_and_blanks_are_skipped() {
        let input = "\n# full line comment\npublic a.B x # trailing comment\n\n";
        let directives = parse_ok(input);
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].line, 3);
        assert_eq!(directives[0].index, 0);
    }

    #[test]
    fn inner_class_separators_are_normalized() {
        let directives = parse_ok("public net/example/Outer$Inner");
        assert_eq!(directives[0].owner, "net.example.Outer$Inner");
    }

    #[test]
    fn unknown_access_keyword_is_rejected() {
        let err = parse_err("friendly a.B x");
        assert!(matches!(err, DirectiveError::UnknownAccess { line: 1, .. }));
    }

    #[test]
    fn missing_owner_is_rejected() {
        let err = parse_err("public");
        assert!(matches!(err, DirectiveError::MissingOwner { line: 1 }));
    }

    #[test]
    fn malformed_descriptor_is_rejected() {
        let err = parse_err("public a.B run(Ljava/lang/String)V");
        assert!(matches!(err, DirectiveError::Descriptor { line: 1, .. }));
    }

    #[test]
    fn trailing_token_is_rejected() {
        let err = parse_err("public a.B x y");
        assert!(matches!(err, DirectiveError::TrailingToken { .. }));
    }

    #[test]
    fn error_names_offending_line() {
        let input = "public a.B x\n\nbogus a.B y\n";
        let err = parse_err(input);
        assert_eq!(err.line(), Some(3));
    }

    #[test]
    fn directive_display_roundtrip() {
        let input = "public+f a.b.C\nprivate a.b.C x\ndefault a.b.C run(I)V\npublic a.b.C *()\n";
        let directives = parse_ok(input);
        assert_eq!(format_directives(&directives), input);
    }
}
