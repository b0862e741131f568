use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use wingo_core::models::{DrawRecord, Outcome, PredictionKind};

use crate::config::StrategyConfig;
use crate::outcome::DEFAULT_LOG_CAPACITY;
use crate::session::PredictionSession;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindStats {
    pub kind: PredictionKind,
    pub wins: usize,
    pub losses: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub draws: usize,
    pub predictions: usize,
    pub wins: usize,
    pub losses: usize,
    pub expired: usize,
    pub longest_loss_streak: usize,
    pub per_kind: Vec<KindStats>,
}

impl BacktestReport {
    pub fn win_rate(&self) -> f64 {
        let resolved = self.wins + self.losses;
        if resolved == 0 {
            return 0.0;
        }
        self.wins as f64 / resolved as f64
    }

    fn record(&mut self, kind: PredictionKind, outcome: Outcome) {
        let idx = match self.per_kind.iter().position(|k| k.kind == kind) {
            Some(i) => i,
            None => {
                self.per_kind.push(KindStats { kind, wins: 0, losses: 0 });
                self.per_kind.len() - 1
            }
        };
        match outcome {
            Outcome::Win => {
                self.wins += 1;
                self.per_kind[idx].wins += 1;
            }
            Outcome::Loss => {
                self.losses += 1;
                self.per_kind[idx].losses += 1;
            }
        }
    }
}

/// Rejoue une séquence de tirages dans une session : pour chaque tirage t, la prédiction
/// est calculée sur les tirages strictement antérieurs, puis t est intégré et résout la
/// prédiction. Aucune fuite du futur.
///
/// `draws` peut être dans un ordre quelconque ; il est trié par période croissante.
/// Les prédictions commencent dès que l'historique atteint `min_history` tirages.
pub fn run_backtest(
    draws: &[DrawRecord],
    strategy: &StrategyConfig,
    history_capacity: usize,
    mut on_step: impl FnMut(usize, usize),
) -> Result<BacktestReport> {
    let mut ordered = draws.to_vec();
    ordered.sort_by(|a, b| a.issue.cmp(&b.issue));
    ordered.dedup_by(|a, b| a.issue == b.issue);

    let warmup = strategy.min_history.max(1);
    if ordered.len() <= warmup {
        bail!(
            "Pas assez de tirages pour le backtest : {} (minimum {})",
            ordered.len(),
            warmup + 1
        );
    }

    let mut session = PredictionSession::new(strategy.clone(), history_capacity, DEFAULT_LOG_CAPACITY);
    let mut report = BacktestReport {
        draws: ordered.len(),
        predictions: 0,
        wins: 0,
        losses: 0,
        expired: 0,
        longest_loss_streak: 0,
        per_kind: Vec::new(),
    };
    let mut streak = 0usize;

    let total = ordered.len();
    for (i, draw) in ordered.iter().enumerate() {
        if session.history().len() >= warmup {
            session.request_prediction()?;
            report.predictions += 1;
        }

        let step = session.ingest(std::slice::from_ref(draw));
        if let Some(entry) = step.resolved {
            report.record(entry.predicted_kind, entry.outcome);
            match entry.outcome {
                Outcome::Win => streak = 0,
                Outcome::Loss => {
                    streak += 1;
                    report.longest_loss_streak = report.longest_loss_streak.max(streak);
                }
            }
        }
        if step.expired.is_some() {
            report.expired += 1;
        }
        on_step(i + 1, total);
    }

    Ok(report)
}
