use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use wingo_core::issue::IssueId;
use wingo_core::models::DrawRecord;
use wingo_engine::session::{IngestReport, PredictionSession};

use crate::error::FeedError;
use crate::feed::FeedSource;

/// Résultat brut d'un cycle de récupération, avant intégration dans la session.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Page dont la tête dépasse la dernière période connue.
    Page(Vec<DrawRecord>),
    /// Tête inchangée, y compris après le nouvel essai.
    Stale,
    Unavailable(FeedError),
}

#[derive(Debug)]
pub enum PollOutcome {
    Advanced(IngestReport),
    Stale,
    /// Une récupération était déjà en cours.
    Skipped,
    Unavailable(FeedError),
}

/// Libère le verrou « en cours » quand le cycle se termine ou est abandonné.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Synchronise l'historique avec le flux : une seule récupération à la fois, un seul
/// nouvel essai différé si le flux n'a pas encore avancé.
pub struct HistorySync {
    feed: Arc<dyn FeedSource>,
    retry_delay: Duration,
    in_flight: Arc<AtomicBool>,
}

impl HistorySync {
    pub fn new(feed: Arc<dyn FeedSource>, retry_delay: Duration) -> Self {
        Self {
            feed,
            retry_delay,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Démarre un cycle. `None` si un cycle est déjà en cours : le déclenchement est
    /// abandonné, pas mis en file. Le futur retourné ne touche à aucun état de session ;
    /// le lâcher avant son terme annule le cycle.
    pub fn begin(&self, known_head: Option<IssueId>) -> Option<impl Future<Output = FetchOutcome> + Send + 'static> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Récupération déjà en cours, déclenchement ignoré");
            return None;
        }
        let guard = InFlight(Arc::clone(&self.in_flight));
        let feed = Arc::clone(&self.feed);
        let retry_delay = self.retry_delay;

        Some(async move {
            let _guard = guard;
            match fetch_advanced(feed.as_ref(), known_head.as_ref()).await {
                Ok(Some(page)) => return FetchOutcome::Page(page),
                Ok(None) => {}
                Err(e) => return FetchOutcome::Unavailable(e),
            }

            debug!("Flux pas encore à jour, nouvel essai dans {} ms", retry_delay.as_millis());
            tokio::time::sleep(retry_delay).await;
            match fetch_advanced(feed.as_ref(), known_head.as_ref()).await {
                Ok(Some(page)) => FetchOutcome::Page(page),
                Ok(None) => FetchOutcome::Stale,
                Err(e) => FetchOutcome::Unavailable(e),
            }
        })
    }

    /// Intègre le résultat d'un cycle. Seule une page nouvelle modifie la session.
    pub fn apply(session: &mut PredictionSession, outcome: FetchOutcome) -> PollOutcome {
        match outcome {
            FetchOutcome::Page(page) => {
                let report = session.ingest(&page);
                if report.advanced() {
                    PollOutcome::Advanced(report)
                } else {
                    PollOutcome::Stale
                }
            }
            FetchOutcome::Stale => {
                info!("Flux inchangé après nouvel essai, cycle abandonné");
                PollOutcome::Stale
            }
            FetchOutcome::Unavailable(e) => {
                if e.is_transient() {
                    warn!("Données indisponibles : {e}");
                } else {
                    error!("Réponse du flux inexploitable : {e}");
                }
                PollOutcome::Unavailable(e)
            }
        }
    }

    /// Cycle complet sur une session possédée par l'appelant.
    pub async fn poll(&self, session: &mut PredictionSession) -> PollOutcome {
        let known_head = session.history().head_issue().cloned();
        match self.begin(known_head) {
            Some(cycle) => {
                let outcome = cycle.await;
                Self::apply(session, outcome)
            }
            None => PollOutcome::Skipped,
        }
    }
}

/// `Some(page)` si la tête de la page dépasse `known_head`.
async fn fetch_advanced(
    feed: &dyn FeedSource,
    known_head: Option<&IssueId>,
) -> Result<Option<Vec<DrawRecord>>, FeedError> {
    let page = feed.fetch().await?;
    let head = page.iter().map(|r| &r.issue).max();
    let advanced = match (head, known_head) {
        (Some(h), Some(k)) => h > k,
        (Some(_), None) => true,
        (None, _) => false,
    };
    Ok(advanced.then_some(page))
}
