//! Property-based tests for the correction loop.
//!
//! References are random word sequences mixing in-vocabulary words,
//! prefixes of them and words the model has never seen. Whatever the
//! reference, the loop must reach it in at most one round per character,
//! and the same way every time. With the punctuation tokenizer the
//! references also carry detached `.` and `,`.

use proptest::prelude::*;

use super::{interactive_session, punctuation_session};

fn arb_word() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => prop::sample::select(vec!["the", "dog", "cat", "car", "cap", "sat", "on", "mat"])
            .prop_map(String::from),
        1 => prop::sample::select(vec!["c", "ca", "th", "o", "sa"]).prop_map(String::from),
        1 => "[a-z]{1,6}",
    ]
}

fn arb_reference() -> impl Strategy<Value = String> {
    prop::collection::vec(arb_word(), 1..6).prop_map(|words| words.join(" "))
}

fn arb_punctuated_reference() -> impl Strategy<Value = String> {
    let token = prop_oneof![
        4 => arb_word(),
        1 => prop::sample::select(vec![".", ","]).prop_map(String::from),
    ];
    prop::collection::vec(token, 1..8).prop_map(|words| words.join(" "))
}

fn arb_source() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["le chat assis", "le chien", "assis", "inconnu le"])
        .prop_map(String::from)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn loop_reaches_any_reference(source in arb_source(), reference in arb_reference()) {
        let session = interactive_session();
        let first = session.translate(&source).unwrap();
        let c = session.correct(0, &first, &reference).unwrap();
        prop_assert_eq!(&c.text, &reference);
        prop_assert!(c.rounds <= reference.chars().count());
        // Each round types one character; truncation may add one more.
        prop_assert!(c.counters.errors as usize >= c.rounds);
        prop_assert!(c.counters.errors as usize <= c.rounds + 1);
        prop_assert!(c.counters.mouse_actions >= 1);
        prop_assert!(c.counters.mouse_actions as usize <= c.rounds + 1);
    }

    #[test]
    fn loop_is_deterministic(source in arb_source(), reference in arb_reference()) {
        let session = interactive_session();
        let first = session.translate(&source).unwrap();
        let a = session.correct(0, &first, &reference).unwrap();
        let b = session.correct(0, &first, &reference).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn punctuation_loop_reaches_any_reference(
        source in arb_source(),
        raw in arb_punctuated_reference(),
    ) {
        let session = punctuation_session();
        let reference = session.text().normalize(&raw);
        let first = session.translate(&source).unwrap();
        let c = session.correct(0, &first, &reference).unwrap();
        prop_assert_eq!(&c.text, &reference);
        prop_assert!(c.rounds <= reference.chars().count());
    }
}
