//! Post-editing effort bookkeeping.

use serde::Serialize;

/// Effort spent on one sentence. Committed only once the sentence is
/// validated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EffortCounters {
    /// Keystrokes: one per correction round, plus one for a final
    /// truncation.
    pub errors: u64,
    pub mouse_actions: u64,
}

/// Session-wide totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionTotals {
    pub errors: u64,
    pub mouse_actions: u64,
    /// Reference words of interactively corrected sentences.
    pub words: u64,
    /// Reference characters of interactively corrected sentences.
    pub chars: u64,
    pub sentences: u64,
    pub interactive_sentences: u64,
}

impl SessionTotals {
    /// Fold a validated sentence in.
    pub fn fold(&mut self, counters: &EffortCounters, reference: &str) {
        self.errors += counters.errors;
        self.mouse_actions += counters.mouse_actions;
        self.words += reference.split_whitespace().count() as u64;
        self.chars += reference.chars().count() as u64;
        self.sentences += 1;
        self.interactive_sentences += 1;
    }

    /// A sentence accepted without human correction.
    pub fn accept(&mut self) {
        self.sentences += 1;
    }

    /// Keystroke ratio.
    pub fn ksr(&self) -> Option<f64> {
        ratio(self.errors, self.chars)
    }

    /// Mouse action ratio.
    pub fn mar(&self) -> Option<f64> {
        ratio(self.mouse_actions, self.chars)
    }

    /// Keystroke and mouse-action ratio.
    pub fn ksmr(&self) -> Option<f64> {
        ratio(self.errors + self.mouse_actions, self.chars)
    }

    /// Word stroke ratio.
    pub fn wsr(&self) -> Option<f64> {
        ratio(self.errors, self.words)
    }
}

fn ratio(num: u64, den: u64) -> Option<f64> {
    (den > 0).then(|| num as f64 / den as f64)
}

/// `n/a` for an undefined rate.
pub fn format_rate(rate: Option<f64>) -> String {
    rate.map_or_else(|| "n/a".to_string(), |r| format!("{:.2}%", r * 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rates_need_interactive_sentences() {
        let mut totals = SessionTotals::default();
        totals.accept();
        assert_eq!(totals.sentences, 1);
        assert_eq!(totals.ksr(), None);
        assert_eq!(totals.wsr(), None);
        assert_eq!(format_rate(totals.ksmr()), "n/a");
    }

    #[test]
    fn fold_accumulates() {
        let mut totals = SessionTotals::default();
        let c = EffortCounters {
            errors: 1,
            mouse_actions: 2,
        };
        totals.fold(&c, "the cat sat");
        totals.fold(&c, "a b");
        assert_eq!(totals.words, 5);
        assert_eq!(totals.chars, 14);
        assert_eq!(totals.interactive_sentences, 2);
        assert_eq!(totals.ksr(), Some(2.0 / 14.0));
        assert_eq!(totals.mar(), Some(4.0 / 14.0));
        assert_eq!(totals.ksmr(), Some(6.0 / 14.0));
        assert_eq!(totals.wsr(), Some(2.0 / 5.0));
        assert_eq!(format_rate(Some(0.5)), "50.00%");
    }
}
