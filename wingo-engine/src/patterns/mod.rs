pub mod sequence;
pub mod streak;

use log::debug;
use serde::{Deserialize, Serialize};
use wingo_core::models::{Color, DrawRecord, PredictionKind, PredictionValue, Size};

use crate::config::StrategyConfig;
use sequence::{FallbackPattern, LiteralPattern};
use streak::StreakBreak;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dimension {
    Size,
    Color,
}

/// Valeur d'un tirage sur une dimension (taille ou couleur simple).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Size(Size),
    Color(Color),
}

impl Bucket {
    pub fn of(record: &DrawRecord, dimension: Dimension) -> Bucket {
        match dimension {
            Dimension::Size => Bucket::Size(record.size()),
            Dimension::Color => Bucket::Color(record.color().base()),
        }
    }

    pub fn opposite(&self) -> Bucket {
        match self {
            Bucket::Size(s) => Bucket::Size(s.opposite()),
            Bucket::Color(c) => Bucket::Color(c.opposite()),
        }
    }

    pub fn to_value(self) -> PredictionValue {
        match self {
            Bucket::Size(s) => PredictionValue::Size(s),
            Bucket::Color(c) => PredictionValue::Color(c),
        }
    }

    /// Lettre courte utilisée dans les libellés de motifs.
    pub fn letter(&self) -> char {
        match self {
            Bucket::Size(Size::Big) => 'B',
            Bucket::Size(Size::Small) => 'S',
            Bucket::Color(Color::Red) => 'R',
            Bucket::Color(Color::Green) => 'G',
        }
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bucket::Size(s) => write!(f, "{s}"),
            Bucket::Color(c) => write!(f, "{c}"),
        }
    }
}

/// Les `len` tirages les plus récents sur une dimension, du plus ancien au plus récent.
/// `history` est ordonné du plus récent au plus ancien.
pub fn window(history: &[DrawRecord], len: usize, dimension: Dimension) -> Option<Vec<Bucket>> {
    if history.len() < len {
        return None;
    }
    Some(
        history[..len]
            .iter()
            .rev()
            .map(|r| Bucket::of(r, dimension))
            .collect(),
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatternCandidate {
    pub value: PredictionValue,
    pub rationale: String,
    pub priority: u32,
}

impl PatternCandidate {
    pub fn kind(&self) -> PredictionKind {
        self.value.kind()
    }
}

/// Un détecteur du catalogue. Chaque variante évalue l'historique (plus récent en tête)
/// et émet au plus un candidat.
#[derive(Debug, Clone)]
pub enum Detector {
    StreakBreak(StreakBreak),
    Literal(LiteralPattern),
    Alternation(FallbackPattern),
    Repeat(FallbackPattern),
}

impl Detector {
    pub fn name(&self) -> String {
        match self {
            Detector::StreakBreak(d) => format!("StreakBreak({:?})", d.dimension),
            Detector::Literal(d) => format!("Literal({})", d.label),
            Detector::Alternation(d) => format!("Alternation({:?})", d.dimension),
            Detector::Repeat(d) => format!("Repeat({:?})", d.dimension),
        }
    }

    pub fn priority(&self) -> u32 {
        match self {
            Detector::StreakBreak(d) => d.priority,
            Detector::Literal(d) => d.priority,
            Detector::Alternation(d) | Detector::Repeat(d) => d.priority,
        }
    }

    pub fn evaluate(&self, history: &[DrawRecord]) -> Option<PatternCandidate> {
        match self {
            Detector::StreakBreak(d) => d.evaluate(history),
            Detector::Literal(d) => d.evaluate(history),
            Detector::Alternation(d) => d.evaluate_alternation(history),
            Detector::Repeat(d) => d.evaluate_repeat(history),
        }
    }
}

/// Catalogue ordonné des détecteurs. L'ordre d'enregistrement départage les priorités égales.
#[derive(Debug, Clone)]
pub struct PatternLibrary {
    detectors: Vec<Detector>,
    min_history: usize,
}

impl PatternLibrary {
    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            detectors: catalogue(config),
            min_history: config.min_history,
        }
    }

    pub fn detectors(&self) -> &[Detector] {
        &self.detectors
    }

    /// Tous les candidats émis, dans l'ordre d'évaluation.
    pub fn candidates(&self, history: &[DrawRecord]) -> Vec<PatternCandidate> {
        if history.len() < self.min_history {
            return Vec::new();
        }
        self.detectors
            .iter()
            .filter_map(|d| {
                let candidate = d.evaluate(history)?;
                debug!("{} : {} (priorité {})", d.name(), candidate.value, candidate.priority);
                Some(candidate)
            })
            .collect()
    }

    /// Meilleur candidat : priorité maximale, le premier enregistré gagne en cas d'égalité.
    pub fn best(&self, history: &[DrawRecord]) -> Option<PatternCandidate> {
        select_best(self.candidates(history))
    }
}

pub fn select_best(candidates: Vec<PatternCandidate>) -> Option<PatternCandidate> {
    let mut best: Option<PatternCandidate> = None;
    for candidate in candidates {
        match &best {
            Some(b) if candidate.priority <= b.priority => {}
            _ => best = Some(candidate),
        }
    }
    best
}

/// Ordre d'évaluation de référence :
/// ruptures de série, motifs de taille, repli taille, puis motifs de couleur.
pub fn catalogue(config: &StrategyConfig) -> Vec<Detector> {
    let mut detectors = vec![
        Detector::StreakBreak(StreakBreak::new(Dimension::Size, 200, config)),
        Detector::StreakBreak(StreakBreak::new(Dimension::Color, 190, config)),
    ];
    detectors.extend(sequence::size_literals().into_iter().map(Detector::Literal));
    detectors.push(Detector::Alternation(FallbackPattern::new(Dimension::Size, 20)));
    detectors.push(Detector::Repeat(FallbackPattern::new(Dimension::Size, 10)));
    detectors.extend(sequence::color_literals().into_iter().map(Detector::Literal));
    detectors.push(Detector::Alternation(FallbackPattern::new(Dimension::Color, 5)));
    detectors.push(Detector::Repeat(FallbackPattern::new(Dimension::Color, 1)));
    detectors
}

/// Historique de test (plus récent en tête) à partir de chiffres donnés du plus ancien
/// au plus récent. Les périodes partent de 1000.
pub fn make_history(numbers_oldest_first: &[u8]) -> Vec<DrawRecord> {
    let mut issue = wingo_core::issue::IssueId::from(1000u64);
    let mut records = Vec::with_capacity(numbers_oldest_first.len());
    for &n in numbers_oldest_first {
        records.push(DrawRecord { issue: issue.clone(), number: n });
        issue = issue.next();
    }
    records.reverse();
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> PatternLibrary {
        PatternLibrary::new(&StrategyConfig::default())
    }

    #[test]
    fn test_window_order_oldest_to_newest() {
        // plus ancien -> plus récent : 1 (S), 7 (B), 2 (S)
        let history = make_history(&[1, 7, 2]);
        let w = window(&history, 3, Dimension::Size).unwrap();
        assert_eq!(w, vec![Bucket::Size(Size::Small), Bucket::Size(Size::Big), Bucket::Size(Size::Small)]);
        assert!(window(&history, 4, Dimension::Size).is_none());
    }

    #[test]
    fn test_window_uses_base_color() {
        let history = make_history(&[0, 5]);
        let w = window(&history, 2, Dimension::Color).unwrap();
        assert_eq!(w, vec![Bucket::Color(Color::Red), Bucket::Color(Color::Green)]);
    }

    #[test]
    fn test_no_candidates_below_min_history() {
        let history = make_history(&[1, 2, 3, 4]);
        assert!(library().candidates(&history).is_empty());
        assert!(library().best(&history).is_none());
    }

    #[test]
    fn test_catalogue_order_is_fixed() {
        let lib = library();
        let priorities: Vec<u32> = lib.detectors().iter().map(|d| d.priority()).collect();
        assert_eq!(
            priorities,
            vec![200, 190, 99, 100, 90, 90, 90, 90, 90, 90, 80, 70, 20, 10, 60, 55, 5, 1]
        );
    }

    #[test]
    fn test_select_best_first_registered_wins_tie() {
        let a = PatternCandidate { value: PredictionValue::Size(Size::Big), rationale: "a".into(), priority: 90 };
        let b = PatternCandidate { value: PredictionValue::Size(Size::Small), rationale: "b".into(), priority: 90 };
        let c = PatternCandidate { value: PredictionValue::Color(Color::Red), rationale: "c".into(), priority: 5 };
        let best = select_best(vec![c, a.clone(), b]).unwrap();
        assert_eq!(best, a);
        assert!(select_best(Vec::new()).is_none());
    }

    #[test]
    fn test_bbss_end_to_end_pattern() {
        // tailles (ancien -> récent) : S S B B S S B B... on veut B B S S en fin de fenêtre
        // 1 S, 8 B, 6 B, 2 S, 4 S
        let history = make_history(&[1, 8, 6, 2, 4]);
        let candidates = library().candidates(&history);
        assert!(candidates
            .iter()
            .any(|c| c.priority == 90 && c.value == PredictionValue::Size(Size::Big)));
    }

    #[test]
    fn test_always_some_candidate_with_enough_history() {
        let history = make_history(&[1, 2, 3, 4, 5, 6, 7]);
        let best = library().best(&history);
        assert!(best.is_some());
    }
}
