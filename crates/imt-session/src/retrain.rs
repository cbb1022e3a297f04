//! When to hand corrected sentences to the online learner.

use tracing::debug;

use imt_core::model::{ModelError, OnlineLearner};
use imt_core::settings::{TrainingSettings, UpdateFrequency};
use imt_core::TokenId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrainPolicy {
    Never,
    PerSentence,
    PerBlock,
}

impl RetrainPolicy {
    pub fn from_settings(training: &TrainingSettings) -> Self {
        match (training.online, training.update) {
            (false, _) => Self::Never,
            (true, UpdateFrequency::Sentence) => Self::PerSentence,
            (true, UpdateFrequency::Block) => Self::PerBlock,
        }
    }
}

/// Buffers validated pairs until the policy says to learn from them.
#[derive(Debug)]
pub struct RetrainTrigger {
    policy: RetrainPolicy,
    pending: Vec<(Vec<TokenId>, Vec<TokenId>)>,
    learned: usize,
}

impl RetrainTrigger {
    pub fn new(policy: RetrainPolicy) -> Self {
        Self {
            policy,
            pending: Vec::new(),
            learned: 0,
        }
    }

    pub fn policy(&self) -> RetrainPolicy {
        self.policy
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Pairs learned from so far.
    pub fn learned(&self) -> usize {
        self.learned
    }

    /// Record an interactively validated sentence. Returns how many pairs
    /// were learned from now. A blank line pair carries nothing to learn
    /// and is dropped.
    pub fn on_sentence<L: OnlineLearner>(
        &mut self,
        learner: &mut L,
        source: Vec<TokenId>,
        target: Vec<TokenId>,
    ) -> Result<usize, ModelError> {
        if self.policy == RetrainPolicy::Never {
            return Ok(0);
        }
        if source.is_empty() && target.is_empty() {
            debug!("empty pair skipped");
            return Ok(0);
        }
        self.pending.push((source, target));
        if self.policy == RetrainPolicy::PerSentence {
            return self.flush(learner);
        }
        Ok(0)
    }

    /// End of a block. Returns how many pairs were learned from now.
    pub fn on_block<L: OnlineLearner>(&mut self, learner: &mut L) -> Result<usize, ModelError> {
        if self.policy == RetrainPolicy::PerBlock {
            return self.flush(learner);
        }
        Ok(0)
    }

    fn flush<L: OnlineLearner>(&mut self, learner: &mut L) -> Result<usize, ModelError> {
        let count = self.pending.len();
        for (source, target) in self.pending.drain(..) {
            learner.learn(&source, &target)?;
        }
        self.learned += count;
        if count > 0 {
            debug!(count, total = self.learned, "online update");
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imt_core::testutil::TableModel;

    #[test]
    fn policy_follows_settings() {
        let mut t = TrainingSettings {
            online: false,
            update: UpdateFrequency::Block,
        };
        assert_eq!(RetrainPolicy::from_settings(&t), RetrainPolicy::Never);
        t.online = true;
        assert_eq!(RetrainPolicy::from_settings(&t), RetrainPolicy::PerBlock);
        t.update = UpdateFrequency::Sentence;
        assert_eq!(RetrainPolicy::from_settings(&t), RetrainPolicy::PerSentence);
    }

    #[test]
    fn per_sentence_learns_immediately() {
        let mut model = TableModel::new(4);
        let mut trigger = RetrainTrigger::new(RetrainPolicy::PerSentence);
        assert_eq!(trigger.on_sentence(&mut model, vec![3], vec![3]).unwrap(), 1);
        assert_eq!(trigger.on_block(&mut model).unwrap(), 0);
        assert_eq!(model.learned.len(), 1);
    }

    #[test]
    fn per_block_waits_for_the_block() {
        let mut model = TableModel::new(4);
        let mut trigger = RetrainTrigger::new(RetrainPolicy::PerBlock);
        trigger.on_sentence(&mut model, vec![3], vec![3]).unwrap();
        trigger.on_sentence(&mut model, vec![3], vec![3, 3]).unwrap();
        assert!(model.learned.is_empty());
        assert_eq!(trigger.pending(), 2);
        assert_eq!(trigger.on_block(&mut model).unwrap(), 2);
        assert_eq!(model.learned[1].1, vec![3, 3]);
        assert_eq!(trigger.learned(), 2);
    }

    #[test]
    fn blank_pairs_are_not_learned() {
        let mut model = TableModel::new(4);
        let mut trigger = RetrainTrigger::new(RetrainPolicy::PerSentence);
        assert_eq!(trigger.on_sentence(&mut model, vec![], vec![]).unwrap(), 0);
        assert_eq!(trigger.on_sentence(&mut model, vec![], vec![3]).unwrap(), 1);
        assert_eq!(model.learned, vec![(vec![], vec![3])]);
        assert_eq!(trigger.learned(), 1);
    }

    #[test]
    fn never_buffers_nothing() {
        let mut model = TableModel::new(4);
        let mut trigger = RetrainTrigger::new(RetrainPolicy::Never);
        trigger.on_sentence(&mut model, vec![3], vec![3]).unwrap();
        assert_eq!(trigger.on_block(&mut model).unwrap(), 0);
        assert_eq!(trigger.pending(), 0);
    }
}
