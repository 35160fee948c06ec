use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    Extracted,
    Stored,
    Retrieved,
    Correlated,
    Done,
}

fn valid_transition(from: PipelineStage, to: PipelineStage) -> bool {
    use PipelineStage::*;
    match (from, to) {
        (Idle, Extracted) => true,
        (Extracted, Stored) => true,
        // Only taken when extraction found nothing.
        (Extracted, Done) => true,
        (Stored, Retrieved) => true,
        (Retrieved, Correlated) => true,
        (Correlated, Done) => true,
        _ => false,
    }
}

/// Current stage plus every stage entered, in order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageTracker {
    stage: PipelineStage,
    history: Vec<PipelineStage>,
}

impl Default for StageTracker {
    fn default() -> Self {
        Self {
            stage: PipelineStage::Idle,
            history: vec![PipelineStage::Idle],
        }
    }
}

impl StageTracker {
    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn history(&self) -> &[PipelineStage] {
        &self.history
    }

    pub fn transition(&mut self, to: PipelineStage) -> CoreResult<()> {
        if !valid_transition(self.stage, to) {
            return Err(CoreError::StateTransition(format!(
                "invalid pipeline transition {:?} -> {:?}",
                self.stage, to
            )));
        }
        tracing::debug!(from = ?self.stage, to = ?to, "pipeline stage");
        self.stage = to;
        self.history.push(to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PipelineStage::*;

    #[test]
    fn full_path_is_accepted() {
        let mut t = StageTracker::default();
        for s in [Extracted, Stored, Retrieved, Correlated, Done] {
            t.transition(s).unwrap();
        }
        assert_eq!(t.history(), &[Idle, Extracted, Stored, Retrieved, Correlated, Done]);
    }

    #[test]
    fn skipping_a_stage_is_rejected() {
        let mut t = StageTracker::default();
        t.transition(Extracted).unwrap();
        assert!(matches!(t.transition(Retrieved), Err(CoreError::StateTransition(_))));
        assert_eq!(t.stage(), Extracted);
        assert!(t.transition(Done).is_ok());
        assert!(t.transition(Extracted).is_err());
    }
}
