use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use log::debug;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use wingo_engine::export::IST_OFFSET_SECS;

/// Source de l'heure courante.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Horloge partant d'un instant donné et avançant avec le temps de tokio (suspendu
/// en test par `tokio::time::pause`).
pub struct VirtualClock {
    origin: DateTime<Utc>,
    started: Instant,
}

impl VirtualClock {
    pub fn starting_at(origin: DateTime<Utc>) -> Self {
        Self { origin, started: Instant::now() }
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = TimeDelta::from_std(self.started.elapsed()).unwrap_or(TimeDelta::zero());
        self.origin + elapsed
    }
}

/// Secondes écoulées sur l'horloge de référence (UTC+5:30).
pub fn ist_seconds(now: DateTime<Utc>) -> i64 {
    now.timestamp() + IST_OFFSET_SECS as i64
}

/// Compte à rebours d'une fenêtre de tirage de `window` secondes. `phase` décale le
/// début de fenêtre par rapport aux multiples de `window` sur l'horloge de référence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    window: u32,
    phase: u32,
}

impl Countdown {
    pub fn new(window: u32) -> Self {
        Self::with_phase(window, 0)
    }

    pub fn with_phase(window: u32, phase: u32) -> Self {
        assert!(window > 0, "fenêtre nulle");
        Self { window, phase: phase % window }
    }

    pub fn window(&self) -> u32 {
        self.window
    }

    fn shifted(&self, secs: i64) -> i64 {
        secs - self.phase as i64
    }

    /// Secondes restantes : W-1 en début de fenêtre, 0 à la dernière seconde.
    pub fn remaining(&self, secs: i64) -> u32 {
        let w = self.window as i64;
        (w - 1 - self.shifted(secs).rem_euclid(w)) as u32
    }

    pub fn window_index(&self, secs: i64) -> i64 {
        self.shifted(secs).div_euclid(self.window as i64)
    }
}

/// Déclenche au plus une récupération par fenêtre, au premier tick où `remaining` est
/// inférieur ou égal au seuil. Un tick manqué à `remaining == seuil` déclenche donc plus
/// tard dans la même fenêtre, et une horloge démarrée sous le seuil récupère aussitôt.
#[derive(Debug, Clone)]
pub struct TriggerGate {
    trigger: u32,
    last_fired: Option<i64>,
}

impl TriggerGate {
    pub fn new(trigger: u32) -> Self {
        Self { trigger, last_fired: None }
    }

    pub fn observe(&mut self, remaining: u32, window_index: i64) -> bool {
        if remaining > self.trigger || self.last_fired == Some(window_index) {
            return false;
        }
        self.last_fired = Some(window_index);
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub remaining: u32,
    pub window_index: i64,
    /// Vrai au tick qui doit déclencher la récupération du flux.
    pub poll: bool,
}

/// Tâche qui émet un `Tick` par seconde. `stop` garantit qu'aucun tick ne part ensuite.
pub struct ClockScheduler {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl ClockScheduler {
    pub fn spawn(clock: Arc<dyn Clock>, countdown: Countdown, poll_trigger: u32) -> (Self, mpsc::Receiver<Tick>) {
        let (tick_tx, tick_rx) = mpsc::channel(8);
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let mut gate = TriggerGate::new(poll_trigger);

        let handle = tokio::spawn(async move {
            debug!("Horloge démarrée (fenêtre {}s, déclencheur {})", countdown.window(), poll_trigger);
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = interval.tick() => {
                        let secs = ist_seconds(clock.now());
                        let remaining = countdown.remaining(secs);
                        let window_index = countdown.window_index(secs);
                        let tick = Tick {
                            remaining,
                            window_index,
                            poll: gate.observe(remaining, window_index),
                        };
                        match tick_tx.try_send(tick) {
                            Ok(()) => {}
                            Err(mpsc::error::TrySendError::Full(_)) => {
                                debug!("Tick abandonné, consommateur en retard");
                            }
                            Err(mpsc::error::TrySendError::Closed(_)) => break,
                        }
                    }
                }
            }
            debug!("Horloge arrêtée");
        });

        (Self { shutdown_tx, handle }, tick_rx)
    }

    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.handle.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    /// 2025-01-01 00:00:00 UTC, début de fenêtre en heure indienne.
    fn origin() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_remaining_wraps_without_duplicate_zero() {
        let c = Countdown::new(60);
        let seq: Vec<u32> = (0..62).map(|s| c.remaining(s)).collect();
        assert_eq!(seq[0], 59);
        assert_eq!(seq[58], 1);
        assert_eq!(seq[59], 0);
        assert_eq!(seq[60], 59);
        assert!(seq.windows(2).all(|w| !(w[0] == 0 && w[1] == 0)));
    }

    #[test]
    fn test_remaining_thirty_second_window() {
        let c = Countdown::new(30);
        assert_eq!(c.remaining(0), 29);
        assert_eq!(c.remaining(29), 0);
        assert_eq!(c.remaining(30), 29);
        assert_eq!(c.window_index(29), 0);
        assert_eq!(c.window_index(30), 1);
        assert_eq!(c.remaining(-1), 0);
    }

    #[test]
    fn test_phase_shifts_window_start() {
        // Jeu d'une minute : la fenêtre commence à la seconde 56
        let c = Countdown::with_phase(60, 56);
        assert_eq!(c.remaining(56), 59);
        assert_eq!(c.remaining(54), 1);
        assert_eq!(c.remaining(55), 0);
        assert_eq!(c.remaining(0), 55);
        assert_eq!(c.window_index(55), -1);
        assert_eq!(c.window_index(56), 0);
        assert_eq!(Countdown::with_phase(30, 30), Countdown::new(30));
    }

    #[test]
    fn test_ist_offset_applied() {
        let secs = ist_seconds(origin());
        assert_eq!(secs - origin().timestamp(), 19800);
        // 5h30 est un multiple de 60 : la fenêtre d'une minute reste alignée
        assert_eq!(Countdown::new(60).remaining(secs), 59);
    }

    #[test]
    fn test_gate_fires_once_per_window() {
        let mut gate = TriggerGate::new(1);
        assert!(!gate.observe(2, 0));
        assert!(gate.observe(1, 0));
        assert!(!gate.observe(1, 0));
        assert!(!gate.observe(0, 0));
        assert!(!gate.observe(59, 1));
        assert!(gate.observe(1, 1));
    }

    #[test]
    fn test_gate_fires_below_trigger_when_exact_second_missed() {
        let mut gate = TriggerGate::new(1);
        // tick à remaining == 1 manqué : déclenche à 0, pas à l'égalité stricte
        assert!(gate.observe(0, 3));
        assert!(!gate.observe(0, 3));

        // démarrage en milieu de fenêtre sous le seuil : récupération immédiate
        let mut gate = TriggerGate::new(29);
        assert!(gate.observe(12, 7));
        assert!(!gate.observe(11, 7));
        assert!(gate.observe(29, 8));
    }

    #[tokio::test]
    async fn test_scheduler_sequence_and_single_poll() {
        tokio::time::pause();
        let clock: Arc<dyn Clock> = Arc::new(VirtualClock::starting_at(origin()));
        let (scheduler, mut ticks) = ClockScheduler::spawn(clock, Countdown::new(60), 1);

        let mut seen = Vec::new();
        for _ in 0..121 {
            seen.push(ticks.recv().await.unwrap());
        }
        scheduler.stop().await;

        let remaining: Vec<u32> = seen.iter().map(|t| t.remaining).collect();
        let expected: Vec<u32> = (0..121).map(|i| 59 - (i % 60) as u32).collect();
        assert_eq!(remaining, expected);

        let polls: Vec<&Tick> = seen.iter().filter(|t| t.poll).collect();
        assert_eq!(polls.len(), 2);
        assert!(polls.iter().all(|t| t.remaining == 1));
        assert_ne!(polls[0].window_index, polls[1].window_index);
    }

    #[tokio::test]
    async fn test_stop_ends_ticks() {
        tokio::time::pause();
        let clock: Arc<dyn Clock> = Arc::new(VirtualClock::starting_at(origin()));
        let (scheduler, mut ticks) = ClockScheduler::spawn(clock, Countdown::new(30), 29);
        assert!(ticks.recv().await.is_some());
        scheduler.stop().await;
        // vide les ticks déjà émis, puis le canal est fermé
        while ticks.try_recv().is_ok() {}
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(ticks.recv().await.is_none());
    }
}
