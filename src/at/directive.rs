use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Requested visibility for a declaration, ordered from narrowest to widest.
///
/// Package-private is the absence of an access keyword in Java source; it is
/// still an explicit level in a directive (`default` in the AT format).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum AccessChange {
    Private,
    PackagePrivate,
    Protected,
    Public,
}

impl AccessChange {
    /// Keyword rendered into source, `None` for package-private.
    pub fn keyword(self) -> Option<&'static str> {
        match self {
            AccessChange::Private => Some("private"),
            AccessChange::PackagePrivate => None,
            AccessChange::Protected => Some("protected"),
            AccessChange::Public => Some("public"),
        }
    }
}

impl fmt::Display for AccessChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword().unwrap_or("default"))
    }
}

/// Requested change to the `final` keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FinalChange {
    Add,
    Remove,
}

/// One directive's requested modifier delta: an access level plus an optional
/// finality change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccessTransform {
    pub access: AccessChange,
    pub final_change: Option<FinalChange>,
}

impl AccessTransform {
    pub fn new(access: AccessChange, final_change: Option<FinalChange>) -> Self {
        Self {
            access,
            final_change,
        }
    }

    /// Fold a later directive on the same declaration into this one.
    ///
    /// The later access level always wins. The finality bit is sticky: a later
    /// directive that does not mention finality keeps the earlier change.
    pub fn accumulate(self, later: AccessTransform) -> AccessTransform {
        AccessTransform {
            access: later.access,
            final_change: later.final_change.or(self.final_change),
        }
    }
}

impl fmt::Display for AccessTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.access)?;
        match self.final_change {
            Some(FinalChange::Add) => f.write_str("+f"),
            Some(FinalChange::Remove) => f.write_str("-f"),
            None => Ok(()),
        }
    }
}

/// What a directive points at inside its owning type.
///
/// Closed set: resolution fully switches on the kind and no open extension is
/// needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetKind {
    /// The owning type declaration itself.
    Class,
    /// A named field. Falls back to a descriptor-less method target during
    /// resolution when no field of that name exists.
    Field { name: String },
    /// A named method, `<init>` for constructors. A missing descriptor is
    /// only valid when the name has exactly one overload.
    Method {
        name: String,
        descriptor: Option<MethodDescriptor>,
    },
    /// All fields of the owning type.
    WildcardFields,
    /// All methods of the owning type, constructors excluded.
    WildcardMethods,
}

/// A single parsed access-transformer directive.
///
/// Directives are totally ordered as authored; `index` is the position in the
/// directive file and drives last-wins merging for overlapping targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Zero-based position in the parsed directive list.
    pub index: usize,
    /// One-based source line in the directive file.
    pub line: u32,
    pub transform: AccessTransform,
    /// Qualified owner type, dot-separated packages with `$` nesting.
    pub owner: String,
    pub target: TargetKind,
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.transform, self.owner)?;
        match &self.target {
            TargetKind::Class => Ok(()),
            TargetKind::Field { name } => write!(f, " {name}"),
            TargetKind::Method { name, descriptor } => match descriptor {
                Some(desc) => write!(f, " {name}{desc}"),
                None => write!(f, " {name}"),
            },
            TargetKind::WildcardFields => f.write_str(" *"),
            TargetKind::WildcardMethods => f.write_str(" *()"),
        }
    }
}

/// JVM primitive types as they appear in erased descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseType {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl BaseType {
    pub fn from_descriptor_char(c: char) -> Option<Self> {
        match c {
            'Z' => Some(BaseType::Boolean),
            'B' => Some(BaseType::Byte),
            'C' => Some(BaseType::Char),
            'S' => Some(BaseType::Short),
            'I' => Some(BaseType::Int),
            'J' => Some(BaseType::Long),
            'F' => Some(BaseType::Float),
            'D' => Some(BaseType::Double),
            _ => None,
        }
    }

    pub fn descriptor_char(self) -> char {
        match self {
            BaseType::Boolean => 'Z',
            BaseType::Byte => 'B',
            BaseType::Char => 'C',
            BaseType::Short => 'S',
            BaseType::Int => 'I',
            BaseType::Long => 'J',
            BaseType::Float => 'F',
            BaseType::Double => 'D',
        }
    }

    /// Java source keyword for this primitive.
    pub fn source_name(self) -> &'static str {
        match self {
            BaseType::Boolean => "boolean",
            BaseType::Byte => "byte",
            BaseType::Char => "char",
            BaseType::Short => "short",
            BaseType::Int => "int",
            BaseType::Long => "long",
            BaseType::Float => "float",
            BaseType::Double => "double",
        }
    }
}

/// The element of an erased descriptor type, before array dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JvmElem {
    Primitive(BaseType),
    /// Dotted binary name, e.g. `java.lang.String` or `a.b.Outer$Inner`.
    Object(String),
    /// Valid only as a return type with zero array dimensions.
    Void,
}

/// One erased type out of a method descriptor: element plus array dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JvmType {
    pub dims: usize,
    pub elem: JvmElem,
}

impl JvmType {
    /// Last segment of the element name, used for source-level matching where
    /// imports are not resolved (`java.lang.String` and `String` both yield
    /// `String`).
    pub fn simple_name(&self) -> Option<&str> {
        match &self.elem {
            JvmElem::Object(name) => {
                let after_dot = name.rsplit('.').next().unwrap_or(name);
                Some(after_dot.rsplit('$').next().unwrap_or(after_dot))
            }
            _ => None,
        }
    }
}

impl fmt::Display for JvmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.dims {
            f.write_str("[")?;
        }
        match &self.elem {
            JvmElem::Primitive(base) => write!(f, "{}", base.descriptor_char()),
            JvmElem::Object(name) => write!(f, "L{};", name.replace('.', "/")),
            JvmElem::Void => f.write_str("V"),
        }
    }
}

/// An erased JVMS method descriptor, e.g. `(Ljava/lang/String;I)V`.
///
/// The return type is parsed for validation and display but is not part of
/// the overload-resolution key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub params: Vec<JvmType>,
    pub ret: JvmType,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("descriptor must start with '(': {0}")]
    MissingOpenParen(String),

    #[error("descriptor has no closing ')': {0}")]
    MissingCloseParen(String),

    #[error("unexpected character '{found}' in descriptor {descriptor}")]
    UnexpectedChar { descriptor: String, found: char },

    #[error("unterminated object type in descriptor {0}")]
    UnterminatedObject(String),

    #[error("missing return type in descriptor {0}")]
    MissingReturnType(String),

    #[error("trailing characters after return type in descriptor {0}")]
    TrailingCharacters(String),

    #[error("void is not a valid parameter or array element in descriptor {0}")]
    InvalidVoid(String),
}

impl MethodDescriptor {
    /// Parse a JVMS descriptor string. Internal `/` package separators are
    /// normalized to `.` so resolution is a pure string match against the
    /// symbol index keys.
    pub fn parse(descriptor: &str) -> Result<Self, DescriptorError> {
        let mut chars = descriptor.char_indices().peekable();
        match chars.next() {
            Some((_, '(')) => {}
            _ => return Err(DescriptorError::MissingOpenParen(descriptor.to_string())),
        }

        let mut params = Vec::new();
        loop {
            match chars.peek() {
                None => return Err(DescriptorError::MissingCloseParen(descriptor.to_string())),
                Some((_, ')')) => {
                    chars.next();
                    break;
                }
                Some(_) => {
                    let ty = parse_type(descriptor, &mut chars)?;
                    if ty.elem == JvmElem::Void {
                        return Err(DescriptorError::InvalidVoid(descriptor.to_string()));
                    }
                    params.push(ty);
                }
            }
        }

        if chars.peek().is_none() {
            return Err(DescriptorError::MissingReturnType(descriptor.to_string()));
        }
        let ret = parse_type(descriptor, &mut chars)?;
        if ret.elem == JvmElem::Void && ret.dims > 0 {
            return Err(DescriptorError::InvalidVoid(descriptor.to_string()));
        }
        if chars.next().is_some() {
            return Err(DescriptorError::TrailingCharacters(descriptor.to_string()));
        }

        Ok(Self { params, ret })
    }
}

fn parse_type(
    descriptor: &str,
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
) -> Result<JvmType, DescriptorError> {
    let mut dims = 0usize;
    while let Some((_, '[')) = chars.peek() {
        chars.next();
        dims += 1;
    }

    let (_, c) = chars
        .next()
        .ok_or_else(|| DescriptorError::MissingReturnType(descriptor.to_string()))?;

    let elem = if let Some(base) = BaseType::from_descriptor_char(c) {
        JvmElem::Primitive(base)
    } else if c == 'V' {
        JvmElem::Void
    } else if c == 'L' {
        let mut name = String::new();
        loop {
            match chars.next() {
                Some((_, ';')) => break,
                Some((_, ch)) => name.push(if ch == '/' { '.' } else { ch }),
                None => return Err(DescriptorError::UnterminatedObject(descriptor.to_string())),
            }
        }
        JvmElem::Object(name)
    } else {
        return Err(DescriptorError::UnexpectedChar {
            descriptor: descriptor.to_string(),
            found: c,
        });
    };

    if elem == JvmElem::Void && dims > 0 {
        return Err(DescriptorError::InvalidVoid(descriptor.to_string()));
    }

    Ok(JvmType { dims, elem })
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for p in &self.params {
            write!(f, "{p}")?;
        }
        write!(f, "){}", self.ret)
    }
}
