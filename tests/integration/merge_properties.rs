//! Property tests for the modifier merge algorithm.

use at_patcher::at::{
    current_access, transform_modifiers, AccessChange, AccessTransform, FinalChange,
    ModifierToken, TokenKind,
};
use proptest::prelude::*;

fn access_strategy() -> impl Strategy<Value = AccessChange> {
    prop_oneof![
        Just(AccessChange::Private),
        Just(AccessChange::PackagePrivate),
        Just(AccessChange::Protected),
        Just(AccessChange::Public),
    ]
}

fn final_strategy() -> impl Strategy<Value = Option<FinalChange>> {
    prop_oneof![
        Just(None),
        Just(Some(FinalChange::Add)),
        Just(Some(FinalChange::Remove)),
    ]
}

fn transform_strategy() -> impl Strategy<Value = AccessTransform> {
    (access_strategy(), final_strategy())
        .prop_map(|(access, final_change)| AccessTransform::new(access, final_change))
}

fn token_strategy() -> impl Strategy<Value = ModifierToken> {
    prop_oneof![
        Just("public"),
        Just("protected"),
        Just("private"),
        Just("static"),
        Just("final"),
        Just("abstract"),
        Just("synchronized"),
        Just("transient"),
        Just("@Deprecated"),
    ]
    .prop_map(ModifierToken::new)
}

fn tokens_strategy() -> impl Strategy<Value = Vec<ModifierToken>> {
    prop::collection::vec(token_strategy(), 0..6)
}

proptest! {
    /// Folding a directive chain always lands on the last access level.
    #[test]
    fn accumulate_last_access_wins(
        chain in prop::collection::vec(transform_strategy(), 1..8)
    ) {
        let mut iter = chain.iter();
        let first = *iter.next().unwrap();
        let folded = iter.fold(first, |acc, t| acc.accumulate(*t));
        prop_assert_eq!(folded.access, chain.last().unwrap().access);
    }

    /// The finality bit is the last explicit mention, regardless of what
    /// comes after it.
    #[test]
    fn accumulate_finality_is_sticky(
        chain in prop::collection::vec(transform_strategy(), 1..8)
    ) {
        let mut iter = chain.iter();
        let first = *iter.next().unwrap();
        let folded = iter.fold(first, |acc, t| acc.accumulate(*t));
        let expected = chain.iter().rev().find_map(|t| t.final_change);
        prop_assert_eq!(folded.final_change, expected);
    }

    /// Applying a transform twice is a fixpoint: the second application
    /// reports no change.
    #[test]
    fn transform_is_idempotent(
        transform in transform_strategy(),
        tokens in tokens_strategy()
    ) {
        if let Some(once) = transform_modifiers(&transform, &tokens) {
            prop_assert_eq!(transform_modifiers(&transform, &once), None);
        }
    }

    /// After a transform, the token list expresses the requested access.
    #[test]
    fn transform_result_has_requested_access(
        transform in transform_strategy(),
        tokens in tokens_strategy()
    ) {
        let result = transform_modifiers(&transform, &tokens)
            .unwrap_or_else(|| tokens.clone());
        prop_assert_eq!(current_access(&result), transform.access);
    }

    /// Tokens the merger never touches keep their relative order.
    #[test]
    fn untouched_tokens_keep_relative_order(
        transform in transform_strategy(),
        tokens in tokens_strategy()
    ) {
        let result = transform_modifiers(&transform, &tokens)
            .unwrap_or_else(|| tokens.clone());

        let before: Vec<&str> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Other)
            .map(|t| t.text.as_str())
            .collect();
        let after: Vec<&str> = result
            .iter()
            .filter(|t| t.kind == TokenKind::Other)
            .map(|t| t.text.as_str())
            .collect();
        prop_assert_eq!(before, after);
    }

    /// A no-op report really means no token would change.
    #[test]
    fn noop_means_tokens_already_satisfy(
        transform in transform_strategy(),
        tokens in tokens_strategy()
    ) {
        if transform_modifiers(&transform, &tokens).is_none() {
            prop_assert_eq!(current_access(&tokens), transform.access);
            let has_final = tokens.iter().any(|t| t.kind == TokenKind::Final);
            match transform.final_change {
                Some(FinalChange::Add) => prop_assert!(has_final),
                Some(FinalChange::Remove) => prop_assert!(!has_final),
                None => {}
            }
        }
    }
}
