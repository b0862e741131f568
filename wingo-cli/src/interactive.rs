use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};

use wingo_engine::export::{now_ist, PredictionSummary};
use wingo_engine::outcome::{PendingPrediction, PredictionHistoryEntry};
use wingo_live::runner::{LiveCommand, LiveRunner, LiveSnapshot, LiveStatus};

use crate::display::{display_draws, display_log, display_prediction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchCommand {
    Predict,
    PredictNumber,
    History,
    Log,
    Export,
    Reverse,
    Refresh,
    Help,
    Quit,
}

pub fn parse_command(input: &str) -> Option<WatchCommand> {
    match input.trim().to_lowercase().as_str() {
        "p" | "predire" | "prédire" | "predict" => Some(WatchCommand::Predict),
        "n" | "numero" | "numéro" | "number" => Some(WatchCommand::PredictNumber),
        "h" | "historique" | "history" | "hist" => Some(WatchCommand::History),
        "j" | "journal" | "log" => Some(WatchCommand::Log),
        "c" | "copier" | "export" => Some(WatchCommand::Export),
        "i" | "inverser" | "reverse" => Some(WatchCommand::Reverse),
        "r" | "rafraichir" | "rafraîchir" | "refresh" => Some(WatchCommand::Refresh),
        "?" | "aide" | "help" => Some(WatchCommand::Help),
        "q" | "quitter" | "quit" | "exit" => Some(WatchCommand::Quit),
        _ => None,
    }
}

fn display_menu() {
    println!();
    println!("── Commandes ──");
    println!("  p. predire     Prédire la prochaine période");
    println!("  n. numero      Prédire le chiffre de la période");
    println!("  h. historique  Derniers tirages");
    println!("  j. journal     Prédictions résolues");
    println!("  c. copier      Résumé de la prédiction");
    println!("  i. inverser    Inverser l'affichage de la prédiction");
    println!("  r. rafraichir  Interroger le flux maintenant");
    println!("  q. quitter     Quitter");
    println!();
}

fn status_text(status: &LiveStatus) -> String {
    match status {
        LiveStatus::Starting => "démarrage".to_string(),
        LiveStatus::Polling => "récupération…".to_string(),
        LiveStatus::Updated { fresh } => format!("{fresh} nouveau(x) tirage(s)"),
        LiveStatus::Stale => "flux inchangé".to_string(),
        LiveStatus::Unavailable(e) => format!("données indisponibles ({e})"),
        LiveStatus::Rejected(e) => format!("réponse rejetée ({e})"),
    }
}

fn progress_message(label: &str, snap: &LiveSnapshot) -> String {
    let period = snap
        .session
        .next_period
        .as_ref()
        .map(|p| p.to_string())
        .unwrap_or_else(|| "-----".to_string());
    let remaining = snap
        .remaining
        .map(|r| format!("{r:02}s"))
        .unwrap_or_else(|| "--".to_string());
    format!("{label} | période {period} | {remaining} | {}", status_text(&snap.status))
}

fn print_resolution(entry: &PredictionHistoryEntry) {
    println!(
        "Période {} : {} prédit, {} tiré ({}) → {}",
        entry.for_period, entry.predicted_value, entry.actual_number, entry.actual_color, entry.outcome
    );
}

/// Boucle interactive de `watch` : affiche le compte à rebours, relaie les commandes
/// au runner et affiche chaque nouvelle prédiction ou résolution.
pub async fn run_watch(runner: LiveRunner, label: &str) -> Result<()> {
    let mut snapshots = runner.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(200));
    pb.suspend(display_menu);

    let mut reversed = false;
    let mut last_pending: Option<PendingPrediction> = None;
    let mut last_resolved: Option<PredictionHistoryEntry> = None;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,

            line = lines.next_line() => {
                let Some(line) = line.context("Erreur de lecture")? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                let Some(command) = parse_command(&line) else {
                    pb.println(format!("Commande inconnue : '{}' (? pour l'aide)", line.trim()));
                    continue;
                };
                let snap = snapshots.borrow().clone();
                match command {
                    WatchCommand::Predict => runner.send(LiveCommand::RequestPrediction { force_number: false }).await?,
                    WatchCommand::PredictNumber => runner.send(LiveCommand::RequestPrediction { force_number: true }).await?,
                    WatchCommand::Refresh => runner.send(LiveCommand::Refresh).await?,
                    WatchCommand::History => pb.suspend(|| display_draws(&snap.session.history[..snap.session.history.len().min(20)])),
                    WatchCommand::Log => pb.suspend(|| display_log(&snap.session.log)),
                    WatchCommand::Export => match &snap.session.pending {
                        Some(pending) => {
                            let mut summary = PredictionSummary::from_pending(label, pending, now_ist());
                            if reversed {
                                summary = summary.reversed();
                            }
                            pb.suspend(|| println!("{summary}"));
                        }
                        None => pb.println("Aucune prédiction en attente."),
                    },
                    WatchCommand::Reverse => {
                        reversed = !reversed;
                        pb.println(if reversed { "Affichage inversé activé." } else { "Affichage inversé désactivé." });
                    }
                    WatchCommand::Help => pb.suspend(display_menu),
                    WatchCommand::Quit => break,
                }
            }

            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snap = snapshots.borrow_and_update().clone();
                pb.set_message(progress_message(label, &snap));

                let resolved = snap.session.log.first().cloned();
                if resolved.is_some() && resolved != last_resolved {
                    if let Some(entry) = &resolved {
                        pb.suspend(|| print_resolution(entry));
                    }
                    last_resolved = resolved;
                }
                if snap.session.pending.is_some() && snap.session.pending != last_pending {
                    if let Some(pending) = &snap.session.pending {
                        pb.suspend(|| display_prediction(pending, &snap.session.losses, reversed));
                    }
                    last_pending = snap.session.pending.clone();
                }
            }
        }
    }

    pb.finish_and_clear();
    runner.shutdown().await?;
    println!("Session terminée.");
    Ok(())
}
