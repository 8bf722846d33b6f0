//! Modifier merging: computes the new modifier token list for a declaration
//! given its current tokens and a requested access/finality change.
//!
//! The algorithm preserves the original relative order of every token it does
//! not have to touch. Unwanted visibility keywords are dropped and the first
//! dropped position is remembered; the requested keyword is inserted there
//! (or at the front when the declaration had no access keyword at all).
//! `final` is removed in place or appended at the end.

use crate::at::directive::{AccessChange, AccessTransform, FinalChange};

/// Classification of one token inside a declaration's modifier region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Public,
    Protected,
    Private,
    Final,
    /// Anything the merger never touches: static, abstract, synchronized,
    /// annotations or comments sitting between keywords, and so on.
    Other,
}

impl TokenKind {
    pub fn classify(text: &str) -> TokenKind {
        match text {
            "public" => TokenKind::Public,
            "protected" => TokenKind::Protected,
            "private" => TokenKind::Private,
            "final" => TokenKind::Final,
            _ => TokenKind::Other,
        }
    }

    fn is_visibility(self) -> bool {
        matches!(
            self,
            TokenKind::Public | TokenKind::Protected | TokenKind::Private
        )
    }
}

/// One token of a modifier region, carrying its original source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifierToken {
    pub kind: TokenKind,
    pub text: String,
}

impl ModifierToken {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            kind: TokenKind::classify(&text),
            text,
        }
    }

    fn for_access(access: AccessChange) -> Option<Self> {
        access.keyword().map(ModifierToken::new)
    }
}

/// The access level currently expressed by a token list. Absence of an access
/// keyword is package-private.
pub fn current_access(tokens: &[ModifierToken]) -> AccessChange {
    for token in tokens {
        match token.kind {
            TokenKind::Public => return AccessChange::Public,
            TokenKind::Protected => return AccessChange::Protected,
            TokenKind::Private => return AccessChange::Private,
            _ => {}
        }
    }
    AccessChange::PackagePrivate
}

/// Render a token list to source text, single space between tokens.
pub fn render(tokens: &[ModifierToken]) -> String {
    let mut out = String::new();
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&token.text);
    }
    out
}

/// Transform a modifier token list to satisfy an access transform.
///
/// Returns `None` when the current tokens already satisfy the request, so
/// callers can skip the rewrite entirely and keep the original bytes.
pub fn transform_modifiers(
    transform: &AccessTransform,
    tokens: &[ModifierToken],
) -> Option<Vec<ModifierToken>> {
    let keep = ModifierToken::for_access(transform.access);

    let mut result: Vec<ModifierToken> = Vec::with_capacity(tokens.len() + 1);
    let mut insertion_spot: Option<usize> = None;
    let mut found_target = transform.access == AccessChange::PackagePrivate;
    let mut found_final = false;
    let mut mutated = false;

    for token in tokens {
        if token.kind == TokenKind::Final {
            found_final = true;
            if transform.final_change == Some(FinalChange::Remove) {
                mutated = true;
            } else {
                result.push(token.clone());
            }
            continue;
        }

        if !token.kind.is_visibility() {
            result.push(token.clone());
            continue;
        }

        // A visibility keyword other than the requested one is dropped; the
        // first dropped position is where the replacement goes.
        if keep
            .as_ref()
            .map(|k| k.kind != token.kind)
            .unwrap_or(true)
        {
            if insertion_spot.is_none() {
                insertion_spot = Some(result.len());
            }
            mutated = true;
            continue;
        }

        found_target = true;
        result.push(token.clone());
    }

    if !found_target {
        let token = keep.expect("package private never reaches insertion");
        result.insert(insertion_spot.unwrap_or(0), token);
        mutated = true;
    }

    if !found_final && transform.final_change == Some(FinalChange::Add) {
        result.push(ModifierToken::new("final"));
        mutated = true;
    }

    if mutated {
        Some(result)
    } else {
        None
    }
}
