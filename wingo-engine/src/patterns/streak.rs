use wingo_core::models::DrawRecord;

use super::{Bucket, Dimension, PatternCandidate};
use crate::config::StrategyConfig;

/// Statistique de rupture d'une valeur : longueur modale à laquelle ses séries
/// (« dragons ») se sont terminées, et part des séries terminées à cette longueur.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakStat {
    pub value: Bucket,
    pub break_point: usize,
    pub confidence: f64,
    pub total_breaks: u32,
}

/// Prédit la rupture d'une série en cours quand elle atteint la longueur
/// qui précède sa longueur de rupture historique la plus fréquente.
#[derive(Debug, Clone)]
pub struct StreakBreak {
    pub dimension: Dimension,
    pub priority: u32,
    pub min_length: usize,
    pub min_confidence: f64,
}

impl StreakBreak {
    pub fn new(dimension: Dimension, priority: u32, config: &StrategyConfig) -> Self {
        Self {
            dimension,
            priority,
            min_length: config.dragon_min_length,
            min_confidence: config.dragon_min_confidence,
        }
    }

    pub fn evaluate(&self, history: &[DrawRecord]) -> Option<PatternCandidate> {
        let (current, run) = current_run(history, self.dimension)?;
        let stat = break_statistics(history, self.dimension, self.min_length)
            .into_iter()
            .find(|s| s.value == current)?;

        if stat.confidence <= self.min_confidence || run + 1 != stat.break_point {
            return None;
        }

        let flip = current.opposite();
        Some(PatternCandidate {
            value: flip.to_value(),
            rationale: format!(
                "Rupture de série : {current} x{run}, rupture habituelle à {} ({:.0}% de {} séries), prédiction {flip}",
                stat.break_point,
                stat.confidence * 100.0,
                stat.total_breaks,
            ),
            priority: self.priority,
        })
    }
}

/// Valeur et longueur de la série en cours (à partir du tirage le plus récent).
pub fn current_run(history: &[DrawRecord], dimension: Dimension) -> Option<(Bucket, usize)> {
    let head = Bucket::of(history.first()?, dimension);
    let len = history
        .iter()
        .take_while(|r| Bucket::of(r, dimension) == head)
        .count();
    Some((head, len))
}

/// Parcourt l'historique du plus ancien au plus récent et relève la longueur de chaque
/// série d'au moins `min_length` tirages. La série en cours compte aussi dès qu'elle
/// atteint cette longueur.
///
/// À égalité d'occurrences, la longueur rencontrée en premier est retenue.
pub fn break_statistics(history: &[DrawRecord], dimension: Dimension, min_length: usize) -> Vec<BreakStat> {
    // (valeur, [(longueur, occurrences)]) dans l'ordre de première apparition
    let mut table: Vec<(Bucket, Vec<(usize, u32)>)> = Vec::new();

    let mut run_value: Option<Bucket> = None;
    let mut run_len = 0usize;

    for record in history.iter().rev() {
        let value = Bucket::of(record, dimension);
        if Some(value) == run_value {
            run_len += 1;
            continue;
        }
        if let Some(ended) = run_value {
            if run_len >= min_length {
                record_break(&mut table, ended, run_len);
            }
        }
        run_value = Some(value);
        run_len = 1;
    }
    if let Some(ongoing) = run_value {
        if run_len >= min_length {
            record_break(&mut table, ongoing, run_len);
        }
    }

    table
        .into_iter()
        .filter_map(|(value, lengths)| {
            let total: u32 = lengths.iter().map(|(_, c)| c).sum();
            let mut best: Option<(usize, u32)> = None;
            for &(len, count) in &lengths {
                match best {
                    Some((_, max)) if count <= max => {}
                    _ => best = Some((len, count)),
                }
            }
            let (break_point, max) = best?;
            if total == 0 {
                return None;
            }
            Some(BreakStat {
                value,
                break_point,
                confidence: max as f64 / total as f64,
                total_breaks: total,
            })
        })
        .collect()
}

fn record_break(table: &mut Vec<(Bucket, Vec<(usize, u32)>)>, value: Bucket, len: usize) {
    let idx = match table.iter().position(|(v, _)| *v == value) {
        Some(i) => i,
        None => {
            table.push((value, Vec::new()));
            table.len() - 1
        }
    };
    let lengths = &mut table[idx].1;
    match lengths.iter_mut().find(|(l, _)| *l == len) {
        Some((_, count)) => *count += 1,
        None => lengths.push((len, 1)),
    }
}
