use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use wingo_core::history::{HistoryBuffer, DEFAULT_HISTORY_CAPACITY};
use wingo_core::issue::IssueId;
use wingo_core::models::DrawRecord;

use crate::config::StrategyConfig;
use crate::outcome::{OutcomeEvaluator, PendingPrediction, PredictionHistoryEntry, DEFAULT_LOG_CAPACITY};
use crate::patterns::{PatternCandidate, PatternLibrary};
use crate::strategy::{LossState, SelectionInput, StrategySelector};

/// Résultat de l'intégration d'une page du flux.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    /// Tirages nouveaux, plus récent en tête.
    pub fresh: Vec<DrawRecord>,
    pub resolved: Option<PredictionHistoryEntry>,
    /// Prédiction abandonnée : sa période est passée sans apparaître dans le flux.
    pub expired: Option<PendingPrediction>,
}

impl IngestReport {
    pub fn advanced(&self) -> bool {
        !self.fresh.is_empty()
    }
}

/// Vue en lecture seule de la session, publiée à l'interface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub history: Vec<DrawRecord>,
    pub next_period: Option<IssueId>,
    pub pending: Option<PendingPrediction>,
    pub losses: LossState,
    pub log: Vec<PredictionHistoryEntry>,
}

/// Contexte d'une session de prédiction : historique, prédiction en attente, état des
/// pertes et journal. Toute mutation passe par `ingest` et `request_prediction_with`.
#[derive(Debug, Clone)]
pub struct PredictionSession {
    history: HistoryBuffer,
    pending: Option<PendingPrediction>,
    losses: LossState,
    evaluator: OutcomeEvaluator,
    library: PatternLibrary,
    selector: StrategySelector,
}

impl PredictionSession {
    pub fn new(strategy: StrategyConfig, history_capacity: usize, log_capacity: usize) -> Self {
        Self {
            history: HistoryBuffer::new(history_capacity),
            pending: None,
            losses: LossState::default(),
            evaluator: OutcomeEvaluator::new(log_capacity),
            library: PatternLibrary::new(&strategy),
            selector: StrategySelector::new(strategy),
        }
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub fn pending(&self) -> Option<&PendingPrediction> {
        self.pending.as_ref()
    }

    pub fn losses(&self) -> &LossState {
        &self.losses
    }

    pub fn log(&self) -> &[PredictionHistoryEntry] {
        self.evaluator.log()
    }

    pub fn next_period(&self) -> Option<IssueId> {
        self.history.head_issue().map(IssueId::next)
    }

    /// Candidats du cycle courant, pour affichage.
    pub fn candidates(&self) -> Vec<PatternCandidate> {
        self.library.candidates(self.history.records())
    }

    /// Intègre une page du flux. Une page sans tirage nouveau ne modifie rien, ce qui rend
    /// l'appel idempotent.
    pub fn ingest(&mut self, page: &[DrawRecord]) -> IngestReport {
        let fresh = self.history.merge(page);
        if fresh.is_empty() {
            return IngestReport::default();
        }
        info!(
            "{} nouveau(x) tirage(s), dernière période {} -> {}",
            fresh.len(),
            fresh[0].issue,
            fresh[0].number
        );

        let resolved = self
            .evaluator
            .resolve(&mut self.pending, &fresh, &mut self.losses);
        if let Some(entry) = &resolved {
            info!(
                "Période {} : {} prédit, {} tiré -> {} ({} perte(s) consécutive(s))",
                entry.for_period,
                entry.predicted_value,
                entry.actual_number,
                entry.outcome,
                self.losses.consecutive_losses
            );
        }

        let overtaken = match (&self.pending, self.history.head_issue()) {
            (Some(p), Some(head)) => p.for_period <= *head,
            _ => false,
        };
        let expired = if overtaken { self.pending.take() } else { None };
        if let Some(p) = &expired {
            warn!("Période {} absente du flux, prédiction abandonnée", p.for_period);
        }

        IngestReport { fresh, resolved, expired }
    }

    pub fn request_prediction(&mut self) -> Result<PendingPrediction> {
        self.request_prediction_with(false)
    }

    /// Calcule la prédiction de la période suivante et la place en attente, en remplaçant
    /// toute prédiction précédente.
    pub fn request_prediction_with(&mut self, force_number: bool) -> Result<PendingPrediction> {
        let next = self
            .next_period()
            .context("Historique vide : période suivante inconnue")?;
        let best = self.library.best(self.history.records());
        let prediction = self.selector.select(&SelectionInput {
            history: self.history.records(),
            best: best.as_ref(),
            losses: &self.losses,
            next_period: Some(&next),
            force_number,
        });
        info!(
            "Prédiction pour {} : {} [{:?}] {}",
            next, prediction.value, prediction.rule, prediction.rationale
        );

        let pending = PendingPrediction { for_period: next, prediction };
        self.pending = Some(pending.clone());
        Ok(pending)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            history: self.history.records().to_vec(),
            next_period: self.next_period(),
            pending: self.pending.clone(),
            losses: self.losses.clone(),
            log: self.evaluator.log().to_vec(),
        }
    }
}

impl Default for PredictionSession {
    fn default() -> Self {
        Self::new(StrategyConfig::default(), DEFAULT_HISTORY_CAPACITY, DEFAULT_LOG_CAPACITY)
    }
}
