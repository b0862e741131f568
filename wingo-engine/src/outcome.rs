use serde::{Deserialize, Serialize};
use wingo_core::issue::IssueId;
use wingo_core::models::{DrawColor, DrawRecord, Outcome, PredictionKind, PredictionValue, Size};

use crate::strategy::{LossState, Prediction};

pub const DEFAULT_LOG_CAPACITY: usize = 50;

/// Prédiction émise pour une période pas encore tirée.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingPrediction {
    pub for_period: IssueId,
    pub prediction: Prediction,
}

/// Entrée du journal des prédictions résolues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionHistoryEntry {
    pub for_period: IssueId,
    pub predicted_kind: PredictionKind,
    pub predicted_value: PredictionValue,
    pub recommended: Vec<u8>,
    pub actual_number: u8,
    pub actual_color: DrawColor,
    pub actual_size: Size,
    pub outcome: Outcome,
}

pub fn evaluate(value: &PredictionValue, draw: &DrawRecord) -> Outcome {
    if value.matches(draw) {
        Outcome::Win
    } else {
        Outcome::Loss
    }
}

/// Résout la prédiction en attente et tient le journal (plus récent en tête, borné, une
/// entrée par période au plus).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeEvaluator {
    log: Vec<PredictionHistoryEntry>,
    capacity: usize,
}

impl OutcomeEvaluator {
    pub fn new(capacity: usize) -> Self {
        Self {
            log: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn log(&self) -> &[PredictionHistoryEntry] {
        &self.log
    }

    /// Cherche dans `draws` le tirage de la période attendue. Sans correspondance, la
    /// prédiction reste en attente et rien n'est modifié.
    pub fn resolve(
        &mut self,
        pending: &mut Option<PendingPrediction>,
        draws: &[DrawRecord],
        losses: &mut LossState,
    ) -> Option<PredictionHistoryEntry> {
        let for_period = &pending.as_ref()?.for_period;
        let draw = draws.iter().find(|d| d.issue == *for_period)?;
        let pending = pending.take()?;

        let value = pending.prediction.value;
        let outcome = evaluate(&value, draw);
        losses.record(value.kind(), outcome);

        let entry = PredictionHistoryEntry {
            for_period: pending.for_period,
            predicted_kind: value.kind(),
            predicted_value: value,
            recommended: pending.prediction.recommended,
            actual_number: draw.number,
            actual_color: draw.color(),
            actual_size: draw.size(),
            outcome,
        };
        self.push(entry.clone());
        Some(entry)
    }

    fn push(&mut self, entry: PredictionHistoryEntry) {
        if self.log.iter().any(|e| e.for_period == entry.for_period) {
            return;
        }
        self.log.insert(0, entry);
        self.log.truncate(self.capacity);
    }
}

impl Default for OutcomeEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::Rule;
    use wingo_core::models::Color;

    fn draw(issue: u64, number: u8) -> DrawRecord {
        DrawRecord::new(IssueId::from(issue), number).unwrap()
    }

    fn pending(issue: u64, value: PredictionValue) -> Option<PendingPrediction> {
        Some(PendingPrediction {
            for_period: IssueId::from(issue),
            prediction: Prediction {
                value,
                rationale: "test".to_string(),
                rule: Rule::BestPattern,
                predicted_number: None,
                recommended: Vec::new(),
                secondary_violet: false,
            },
        })
    }

    #[test]
    fn test_red_matches_red_violet() {
        let red = PredictionValue::Color(Color::Red);
        assert_eq!(evaluate(&red, &draw(1, 0)), Outcome::Win);
        assert_eq!(evaluate(&red, &draw(1, 1)), Outcome::Loss);
    }

    #[test]
    fn test_size_and_number_matching() {
        assert_eq!(evaluate(&PredictionValue::Size(Size::Big), &draw(1, 5)), Outcome::Win);
        assert_eq!(evaluate(&PredictionValue::Size(Size::Big), &draw(1, 4)), Outcome::Loss);
        assert_eq!(evaluate(&PredictionValue::Number(7), &draw(1, 7)), Outcome::Win);
        assert_eq!(evaluate(&PredictionValue::Number(7), &draw(1, 9)), Outcome::Loss);
    }

    #[test]
    fn test_resolves_only_matching_period() {
        let mut evaluator = OutcomeEvaluator::default();
        let mut losses = LossState::default();
        let mut slot = pending(101, PredictionValue::Size(Size::Big));

        assert!(evaluator.resolve(&mut slot, &[draw(100, 9)], &mut losses).is_none());
        assert!(slot.is_some());
        assert!(evaluator.log().is_empty());

        let entry = evaluator
            .resolve(&mut slot, &[draw(102, 1), draw(101, 8)], &mut losses)
            .unwrap();
        assert_eq!(entry.outcome, Outcome::Win);
        assert_eq!(entry.actual_number, 8);
        assert!(slot.is_none());
        assert_eq!(losses.consecutive_losses, 0);
    }

    #[test]
    fn test_loss_streak_and_reset() {
        let mut evaluator = OutcomeEvaluator::default();
        let mut losses = LossState::default();
        for issue in 1..=6u64 {
            let mut slot = pending(issue, PredictionValue::Number(3));
            evaluator.resolve(&mut slot, &[draw(issue, 4)], &mut losses);
        }
        assert_eq!(losses.consecutive_losses, 6);
        assert_eq!(losses.last_kind, Some(PredictionKind::Number));
        assert!(losses.last_was_loss);

        let mut slot = pending(7, PredictionValue::Color(Color::Green));
        evaluator.resolve(&mut slot, &[draw(7, 5)], &mut losses);
        assert_eq!(losses.consecutive_losses, 0);
        assert!(!losses.last_was_loss);
        assert_eq!(evaluator.log().len(), 7);
        assert_eq!(evaluator.log()[0].for_period, IssueId::from(7u64));
        assert_eq!(evaluator.log()[0].actual_color, DrawColor::GreenViolet);
    }

    #[test]
    fn test_log_capped_and_deduplicated() {
        let mut evaluator = OutcomeEvaluator::new(3);
        let mut losses = LossState::default();
        for issue in 1..=5u64 {
            let mut slot = pending(issue, PredictionValue::Number(1));
            evaluator.resolve(&mut slot, &[draw(issue, 1)], &mut losses);
        }
        assert_eq!(evaluator.log().len(), 3);
        assert_eq!(evaluator.log()[2].for_period, IssueId::from(3u64));

        let mut slot = pending(5, PredictionValue::Number(1));
        evaluator.resolve(&mut slot, &[draw(5, 1)], &mut losses);
        assert_eq!(evaluator.log().len(), 3);
        assert_eq!(evaluator.log()[1].for_period, IssueId::from(4u64));
    }
}
