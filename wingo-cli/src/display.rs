use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

use wingo_core::models::{DrawColor, DrawRecord, Outcome};
use wingo_engine::backtest::BacktestReport;
use wingo_engine::outcome::{PendingPrediction, PredictionHistoryEntry};
use wingo_engine::patterns::PatternCandidate;
use wingo_engine::strategy::LossState;
use wingo_live::config::LiveConfig;

use crate::import::ImportResult;

fn color_cell(color: DrawColor) -> Cell {
    let fg = match color {
        DrawColor::Red => Color::Red,
        DrawColor::Green => Color::Green,
        DrawColor::RedViolet | DrawColor::GreenViolet => Color::Magenta,
    };
    Cell::new(color.to_string()).fg(fg)
}

fn outcome_cell(outcome: Outcome) -> Cell {
    let fg = match outcome {
        Outcome::Win => Color::Green,
        Outcome::Loss => Color::Red,
    };
    Cell::new(outcome.to_string()).fg(fg)
}

fn digits(list: &[u8]) -> String {
    list.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(", ")
}

pub fn display_draws(draws: &[DrawRecord]) {
    if draws.is_empty() {
        println!("Aucun tirage à afficher.");
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Période", "Numéro", "Taille", "Couleur"]);

    for draw in draws {
        table.add_row(vec![
            Cell::new(&draw.issue),
            Cell::new(draw.number),
            Cell::new(draw.size()),
            color_cell(draw.color()),
        ]);
    }

    println!("{table}");
}

pub fn display_candidates(candidates: &[PatternCandidate]) {
    if candidates.is_empty() {
        println!("Aucun motif détecté.");
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Priorité", "Type", "Valeur", "Motif"]);

    let mut sorted = candidates.to_vec();
    // tri stable : l'ordre d'évaluation départage les égalités
    sorted.sort_by(|a, b| b.priority.cmp(&a.priority));

    for c in &sorted {
        table.add_row(vec![
            c.priority.to_string(),
            c.kind().to_string(),
            c.value.to_string(),
            c.rationale.clone(),
        ]);
    }

    println!("{table}");
}

pub fn display_prediction(pending: &PendingPrediction, losses: &LossState, reversed: bool) {
    let p = &pending.prediction;
    println!("\n🔮 Prédiction pour la période {}\n", pending.for_period);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Type", "Valeur", "Chiffres", "Représentatif", "Règle"]);

    let representative = match (p.predicted_number, p.secondary_violet) {
        (Some(d), true) => format!("{d} (violet)"),
        (Some(d), false) => d.to_string(),
        (None, _) => "—".to_string(),
    };

    table.add_row(vec![
        p.kind().to_string(),
        p.value.to_string(),
        digits(&p.recommended),
        representative,
        format!("{:?}", p.rule),
    ]);

    println!("{table}");
    println!("  {}", p.rationale);
    if reversed {
        println!("  Affichage inversé : {}", p.value.reversed());
    }
    if losses.consecutive_losses > 0 {
        println!("  Pertes consécutives : {}", losses.consecutive_losses);
    }
}

pub fn display_log(entries: &[PredictionHistoryEntry]) {
    if entries.is_empty() {
        println!("Aucune prédiction résolue.");
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Période", "Prédit", "Chiffres", "Tiré", "Couleur", "Taille", "Résultat"]);

    for e in entries {
        table.add_row(vec![
            Cell::new(&e.for_period),
            Cell::new(format!("{} ({})", e.predicted_value, e.predicted_kind)),
            Cell::new(digits(&e.recommended)),
            Cell::new(e.actual_number),
            color_cell(e.actual_color),
            Cell::new(e.actual_size),
            outcome_cell(e.outcome),
        ]);
    }

    let wins = entries.iter().filter(|e| e.outcome == Outcome::Win).count();
    println!("{table}");
    println!("  {} gagnée(s) sur {}", wins, entries.len());
}

pub fn display_backtest(report: &BacktestReport) {
    println!("\n📊 Backtest sur {} tirages\n", report.draws);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Type", "Gagnées", "Perdues", "Taux"]);

    for k in &report.per_kind {
        let total = k.wins + k.losses;
        let rate = if total > 0 { k.wins as f64 / total as f64 } else { 0.0 };
        table.add_row(vec![
            k.kind.to_string(),
            k.wins.to_string(),
            k.losses.to_string(),
            format!("{:.1}%", rate * 100.0),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total").fg(Color::Cyan),
        Cell::new(report.wins),
        Cell::new(report.losses),
        Cell::new(format!("{:.1}%", report.win_rate() * 100.0)),
    ]);

    println!("{table}");
    println!("  Prédictions émises      : {}", report.predictions);
    println!("  Plus longue série perdue : {}", report.longest_loss_streak);
    if report.expired > 0 {
        println!("  Périodes manquantes      : {}", report.expired);
    }
}

pub fn display_import_summary(result: &ImportResult) {
    println!("Import terminé :");
    println!("  Total lignes lues : {}", result.total_records);
    println!("  Tirages valides   : {}", result.draws.len());
    if result.errors > 0 {
        println!("  Erreurs           : {}", result.errors);
    }
}

pub fn display_config(config: &LiveConfig) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Paramètre", "Valeur"]);

    let s = &config.strategy;
    let rows: Vec<(&str, String)> = vec![
        ("Jeu", config.game.label().to_string()),
        ("Flux", config.feed_url.clone()),
        ("Fenêtre (s)", config.window_secs.to_string()),
        ("Décalage de fenêtre (s)", config.phase_secs.to_string()),
        ("Déclencheur (s restantes)", config.poll_trigger.to_string()),
        ("Nouvel essai (ms)", config.retry_delay_ms.to_string()),
        ("Délai requête (ms)", config.request_timeout_ms.to_string()),
        ("Capacité historique", config.history_capacity.to_string()),
        ("Capacité journal", config.prediction_log_capacity.to_string()),
        ("Prédiction auto", config.auto_predict.to_string()),
        ("Couleur imposée après", format!("{} pertes", s.force_color_losses)),
        ("Repli couleur à", format!("{} perte(s)", s.fallback_color_losses)),
        ("Bascule de type après", format!("{} pertes", s.switch_kind_losses)),
        ("Historique minimal", s.min_history.to_string()),
        ("Fenêtre de fréquence", s.frequency_window.to_string()),
        ("Série minimale", s.dragon_min_length.to_string()),
        ("Confiance de rupture", format!("> {:.2}", s.dragon_min_confidence)),
    ];
    for (name, value) in rows {
        table.add_row(vec![name.to_string(), value]);
    }

    println!("{table}");
}
