use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use wingo_engine::session::{PredictionSession, SessionSnapshot};

use crate::clock::{Clock, ClockScheduler, Countdown};
use crate::config::LiveConfig;
use crate::feed::FeedSource;
use crate::sync::{FetchOutcome, HistorySync, PollOutcome};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LiveStatus {
    Starting,
    Polling,
    Updated { fresh: usize },
    Stale,
    /// Échec passager (réseau, statut HTTP, page vide) : le prochain tick retente.
    Unavailable(String),
    /// Réponse reçue mais inexploitable (JSON ou tirage invalide).
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveSnapshot {
    pub remaining: Option<u32>,
    pub status: LiveStatus,
    pub session: SessionSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveCommand {
    RequestPrediction { force_number: bool },
    Refresh,
}

type Cycle = Pin<Box<dyn Future<Output = FetchOutcome> + Send>>;

/// Tâche unique propriétaire de la session : elle reçoit les ticks de l'horloge, les
/// commandes de l'interface et au plus une récupération en cours, et publie un
/// instantané après chaque changement.
pub struct LiveRunner {
    commands: mpsc::Sender<LiveCommand>,
    snapshots: watch::Receiver<LiveSnapshot>,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl LiveRunner {
    pub fn spawn(config: LiveConfig, feed: Arc<dyn FeedSource>, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let (command_tx, command_rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (snapshot_tx, snapshot_rx) = watch::channel(LiveSnapshot {
            remaining: None,
            status: LiveStatus::Starting,
            session: SessionSnapshot::default(),
        });

        let handle = tokio::spawn(run(config, feed, clock, command_rx, shutdown_rx, snapshot_tx));

        Ok(Self {
            commands: command_tx,
            snapshots: snapshot_rx,
            shutdown_tx,
            handle,
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<LiveSnapshot> {
        self.snapshots.clone()
    }

    pub fn snapshot(&self) -> LiveSnapshot {
        self.snapshots.borrow().clone()
    }

    pub async fn send(&self, command: LiveCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .context("Session arrêtée, commande ignorée")
    }

    /// Arrête l'horloge, abandonne la récupération en cours et attend la fin de la tâche.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown_tx.send(true);
        self.handle.await.context("Arrêt de la session en échec")
    }
}

async fn run(
    config: LiveConfig,
    feed: Arc<dyn FeedSource>,
    clock: Arc<dyn Clock>,
    mut commands: mpsc::Receiver<LiveCommand>,
    mut shutdown_rx: watch::Receiver<bool>,
    snapshots: watch::Sender<LiveSnapshot>,
) {
    let mut session = PredictionSession::new(
        config.strategy.clone(),
        config.history_capacity,
        config.prediction_log_capacity,
    );
    let sync = HistorySync::new(feed, Duration::from_millis(config.retry_delay_ms));
    let countdown = Countdown::with_phase(config.window_secs, config.phase_secs);
    let (scheduler, mut ticks) = ClockScheduler::spawn(clock, countdown, config.poll_trigger);
    info!(
        "Session {} démarrée (fenêtre {}s, récupération à {}s)",
        config.game.label(),
        config.window_secs,
        config.poll_trigger
    );

    let mut remaining = None;
    let mut status = LiveStatus::Polling;
    // Premier remplissage dès le démarrage
    let mut cycle: Option<Cycle> = start_cycle(&sync, &session);

    loop {
        publish(&snapshots, remaining, &status, &session);

        tokio::select! {
            _ = shutdown_rx.changed() => break,

            Some(tick) = ticks.recv() => {
                remaining = Some(tick.remaining);
                if tick.poll && cycle.is_none() {
                    cycle = start_cycle(&sync, &session);
                    if cycle.is_some() {
                        status = LiveStatus::Polling;
                    }
                }
            }

            Some(command) = commands.recv() => match command {
                LiveCommand::RequestPrediction { force_number } => {
                    if let Err(e) = session.request_prediction_with(force_number) {
                        warn!("{e}");
                    }
                }
                LiveCommand::Refresh => {
                    if cycle.is_none() {
                        cycle = start_cycle(&sync, &session);
                        status = LiveStatus::Polling;
                    }
                }
            },

            outcome = async {
                match cycle.as_mut() {
                    Some(c) => c.await,
                    None => std::future::pending().await,
                }
            }, if cycle.is_some() => {
                cycle = None;
                status = match HistorySync::apply(&mut session, outcome) {
                    PollOutcome::Advanced(report) => {
                        if config.auto_predict {
                            if let Err(e) = session.request_prediction() {
                                warn!("{e}");
                            }
                        }
                        LiveStatus::Updated { fresh: report.fresh.len() }
                    }
                    PollOutcome::Stale | PollOutcome::Skipped => LiveStatus::Stale,
                    PollOutcome::Unavailable(e) if e.is_transient() => LiveStatus::Unavailable(e.to_string()),
                    PollOutcome::Unavailable(e) => LiveStatus::Rejected(e.to_string()),
                };
            }
        }
    }

    // Un résultat tardif ne doit plus toucher la session
    drop(cycle);
    scheduler.stop().await;
    info!("Session {} arrêtée", config.game.label());
}

fn start_cycle(sync: &HistorySync, session: &PredictionSession) -> Option<Cycle> {
    let known_head = session.history().head_issue().cloned();
    sync.begin(known_head).map(|c| Box::pin(c) as Cycle)
}

fn publish(
    snapshots: &watch::Sender<LiveSnapshot>,
    remaining: Option<u32>,
    status: &LiveStatus,
    session: &PredictionSession,
) {
    snapshots.send_replace(LiveSnapshot {
        remaining,
        status: status.clone(),
        session: session.snapshot(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::VirtualClock;
    use crate::config::GameKind;
    use crate::error::FeedError;
    use crate::feed::{make_page, ScriptedFeed};
    use chrono::{TimeZone, Utc};
    use wingo_core::issue::IssueId;

    fn clock_at(second_of_minute: u32) -> Arc<dyn Clock> {
        Arc::new(VirtualClock::starting_at(
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, second_of_minute).unwrap(),
        ))
    }

    async fn wait_for(rx: &mut watch::Receiver<LiveSnapshot>, pred: impl Fn(&LiveSnapshot) -> bool) -> LiveSnapshot {
        loop {
            {
                let current = rx.borrow_and_update();
                if pred(&current) {
                    return current.clone();
                }
            }
            rx.changed().await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_initial_fill_and_auto_prediction() {
        tokio::time::pause();
        let feed = Arc::new(ScriptedFeed::new(vec![Ok(make_page(1009, &[1, 8, 6, 2, 4, 3, 3, 7, 9, 0]))]));
        let runner = LiveRunner::spawn(LiveConfig::default(), feed, clock_at(10)).unwrap();
        let mut rx = runner.subscribe();

        let snap = wait_for(&mut rx, |s| s.session.pending.is_some()).await;
        assert_eq!(snap.session.history.len(), 10);
        assert_eq!(snap.session.next_period, Some(IssueId::from(1010u64)));
        assert_eq!(snap.session.pending.unwrap().for_period, IssueId::from(1010u64));
        assert_eq!(snap.status, LiveStatus::Updated { fresh: 10 });

        runner.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_tick_triggers_poll_and_resolves() {
        tokio::time::pause();
        let feed = Arc::new(ScriptedFeed::new(vec![
            Ok(make_page(1009, &[1, 8, 6, 2, 4, 3])),
            Ok(make_page(1010, &[5, 1, 8, 6, 2, 4, 3])),
        ]));
        let runner = LiveRunner::spawn(LiveConfig::default(), Arc::clone(&feed) as Arc<dyn FeedSource>, clock_at(50)).unwrap();
        let mut rx = runner.subscribe();

        wait_for(&mut rx, |s| s.session.pending.is_some()).await;
        // phase de 56 s : remaining == 1 à la seconde 54
        let snap = wait_for(&mut rx, |s| !s.session.log.is_empty()).await;
        assert_eq!(snap.session.log[0].for_period, IssueId::from(1010u64));
        assert_eq!(snap.session.pending.unwrap().for_period, IssueId::from(1011u64));
        assert_eq!(feed.calls(), 2);

        runner.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_unavailable_status_keeps_history() {
        tokio::time::pause();
        let feed = Arc::new(ScriptedFeed::new(vec![Err(FeedError::Status(502))]));
        let runner = LiveRunner::spawn(LiveConfig::default(), feed, clock_at(0)).unwrap();
        let mut rx = runner.subscribe();

        let snap = wait_for(&mut rx, |s| matches!(s.status, LiveStatus::Unavailable(_))).await;
        assert!(snap.session.history.is_empty());
        runner.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_response_is_rejected() {
        tokio::time::pause();
        let feed = Arc::new(ScriptedFeed::new(vec![Err(FeedError::Malformed { message: "json".into() })]));
        let runner = LiveRunner::spawn(LiveConfig::default(), feed, clock_at(0)).unwrap();
        let mut rx = runner.subscribe();

        let snap = wait_for(&mut rx, |s| matches!(s.status, LiveStatus::Rejected(_))).await;
        assert_eq!(snap.status, LiveStatus::Rejected("réponse malformée : json".to_string()));
        assert!(snap.session.history.is_empty());
        runner.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_manual_prediction_command() {
        tokio::time::pause();
        let feed = Arc::new(ScriptedFeed::new(vec![Ok(make_page(1009, &[1, 8, 6, 2, 4, 3, 3]))]));
        let mut config = LiveConfig::for_game(GameKind::ThirtySeconds);
        config.auto_predict = false;
        let runner = LiveRunner::spawn(config, feed, clock_at(0)).unwrap();
        let mut rx = runner.subscribe();

        let snap = wait_for(&mut rx, |s| !s.session.history.is_empty()).await;
        assert!(snap.session.pending.is_none());

        runner
            .send(LiveCommand::RequestPrediction { force_number: true })
            .await
            .unwrap();
        let snap = wait_for(&mut rx, |s| s.session.pending.is_some()).await;
        assert_eq!(
            snap.session.pending.unwrap().prediction.value,
            wingo_core::models::PredictionValue::Number(0)
        );
        runner.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_discards_in_flight_poll() {
        tokio::time::pause();
        let feed = Arc::new(ScriptedFeed::with_delay(
            vec![Ok(make_page(1009, &[1, 2, 3, 4, 5]))],
            Duration::from_secs(30),
        ));
        let runner = LiveRunner::spawn(LiveConfig::default(), Arc::clone(&feed) as Arc<dyn FeedSource>, clock_at(0)).unwrap();
        let rx = runner.subscribe();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(feed.calls(), 1);
        runner.shutdown().await.unwrap();

        tokio::time::sleep(Duration::from_secs(60)).await;
        let last = rx.borrow().clone();
        assert!(last.session.history.is_empty());
        assert_eq!(last.status, LiveStatus::Polling);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let mut config = LiveConfig::default();
        config.poll_trigger = 99;
        let feed = Arc::new(ScriptedFeed::new(Vec::new()));
        assert!(LiveRunner::spawn(config, feed, clock_at(0)).is_err());
    }
}
