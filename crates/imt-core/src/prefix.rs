//! Character-level prefix reconciliation between a hypothesis and the
//! text the user wants.

/// Result of comparing a hypothesis against a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixMatch<'r> {
    /// Character index of the first divergence, or the reference length in
    /// characters when the reference is a prefix of the hypothesis.
    pub position: usize,
    /// Byte offset matching `position` inside the reference.
    pub byte_offset: usize,
    /// `reference[..byte_offset]`.
    pub validated: &'r str,
    reference: &'r str,
}

impl<'r> PrefixMatch<'r> {
    /// The reference has been fully produced.
    pub fn is_complete(&self) -> bool {
        self.byte_offset == self.reference.len()
    }

    /// The reference character the user types next, `None` once complete.
    pub fn next_char(&self) -> Option<char> {
        self.reference[self.byte_offset..].chars().next()
    }
}

/// Longest common character prefix of `hypothesis` and `reference`.
pub fn longest_common_prefix<'r>(hypothesis: &str, reference: &'r str) -> PrefixMatch<'r> {
    let mut position = 0;
    let mut byte_offset = 0;
    for ((offset, r), h) in reference.char_indices().zip(hypothesis.chars()) {
        if r != h {
            return PrefixMatch {
                position,
                byte_offset: offset,
                validated: &reference[..offset],
                reference,
            };
        }
        position += 1;
        byte_offset = offset + r.len_utf8();
    }
    PrefixMatch {
        position,
        byte_offset,
        validated: &reference[..byte_offset],
        reference,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn divergence_in_the_middle() {
        let m = longest_common_prefix("the dog sat", "the cat sat");
        assert_eq!(m.position, 4);
        assert_eq!(m.validated, "the ");
        assert_eq!(m.next_char(), Some('c'));
        assert!(!m.is_complete());
    }

    #[test]
    fn equal_strings_are_complete() {
        let m = longest_common_prefix("the cat", "the cat");
        assert_eq!(m.position, 7);
        assert!(m.is_complete());
        assert_eq!(m.next_char(), None);
    }

    #[test]
    fn longer_hypothesis_completes_reference() {
        let m = longest_common_prefix("the cat sat down", "the cat sat");
        assert!(m.is_complete());
        assert_eq!(m.validated, "the cat sat");
    }

    #[test]
    fn shorter_hypothesis_stops_at_its_end() {
        let m = longest_common_prefix("the ca", "the cat");
        assert_eq!(m.position, 6);
        assert_eq!(m.next_char(), Some('t'));
    }

    #[test]
    fn empty_inputs() {
        let m = longest_common_prefix("", "abc");
        assert_eq!(m.position, 0);
        assert_eq!(m.next_char(), Some('a'));
        assert!(longest_common_prefix("abc", "").is_complete());
    }

    #[test]
    fn multibyte_characters() {
        let m = longest_common_prefix("niño grande", "niña grande");
        assert_eq!(m.position, 3);
        assert_eq!(m.validated, "niñ");
        assert_eq!(m.byte_offset, "niñ".len());
        assert_eq!(m.next_char(), Some('a'));
    }

    proptest! {
        #[test]
        fn prefix_is_shared_and_maximal(h in "[ab ñ]{0,12}", r in "[ab ñ]{0,12}") {
            let m = longest_common_prefix(&h, &r);
            prop_assert!(h.starts_with(m.validated));
            prop_assert!(r.starts_with(m.validated));
            prop_assert_eq!(m.validated.chars().count(), m.position);
            let hc: Vec<char> = h.chars().collect();
            let rc: Vec<char> = r.chars().collect();
            if m.position < hc.len() && m.position < rc.len() {
                prop_assert_ne!(hc[m.position], rc[m.position]);
            }
            prop_assert_eq!(m.is_complete(), h.starts_with(r.as_str()));
        }
    }
}
