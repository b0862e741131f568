use wingo_core::models::{DrawRecord, Size};

use super::{window, Bucket, Dimension, PatternCandidate};

/// Symbole d'un motif : une valeur littérale, ou une variable (X et Y désignent
/// deux valeurs distinctes de la dimension).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sym {
    Lit(Bucket),
    X,
    Y,
}

const B: Sym = Sym::Lit(Bucket::Size(Size::Big));
const S: Sym = Sym::Lit(Bucket::Size(Size::Small));

/// Motif à correspondance exacte sur les tirages les plus récents (lus du plus ancien au plus récent).
#[derive(Debug, Clone)]
pub struct LiteralPattern {
    pub dimension: Dimension,
    pub sequence: &'static [Sym],
    pub next: Sym,
    pub priority: u32,
    pub label: &'static str,
}

impl LiteralPattern {
    pub const fn new(
        dimension: Dimension,
        sequence: &'static [Sym],
        next: Sym,
        priority: u32,
        label: &'static str,
    ) -> Self {
        Self { dimension, sequence, next, priority, label }
    }

    pub fn evaluate(&self, history: &[DrawRecord]) -> Option<PatternCandidate> {
        let recent = window(history, self.sequence.len(), self.dimension)?;
        let predicted = self.matches(&recent)?;
        let family = match self.dimension {
            Dimension::Size => "Motif taille",
            Dimension::Color => "Motif couleur",
        };
        Some(PatternCandidate {
            value: predicted.to_value(),
            rationale: format!("{family} : {} (ancien → récent)", self.label),
            priority: self.priority,
        })
    }

    /// Retourne la valeur prédite si la fenêtre correspond au motif.
    fn matches(&self, recent: &[Bucket]) -> Option<Bucket> {
        let mut x: Option<Bucket> = None;
        let mut y: Option<Bucket> = None;

        for (sym, &value) in self.sequence.iter().zip(recent) {
            let slot = match sym {
                Sym::Lit(expected) => {
                    if *expected != value {
                        return None;
                    }
                    continue;
                }
                Sym::X => &mut x,
                Sym::Y => &mut y,
            };
            match *slot {
                Some(bound) if bound != value => return None,
                Some(_) => {}
                None => *slot = Some(value),
            }
        }

        if let (Some(a), Some(b)) = (x, y) {
            if a == b {
                return None;
            }
        }

        match self.next {
            Sym::Lit(b) => Some(b),
            Sym::X => x.or_else(|| y.map(|v| v.opposite())),
            Sym::Y => y.or_else(|| x.map(|v| v.opposite())),
        }
    }
}

/// Motifs de taille, dans l'ordre d'évaluation.
pub fn size_literals() -> Vec<LiteralPattern> {
    use Dimension::Size as D;
    use Sym::{X, Y};
    vec![
        LiteralPattern::new(D, &[B, S, B, B], S, 99, "B S B B → S"),
        LiteralPattern::new(D, &[Y, X, X, X], X, 100, "Y X X X → X"),
        LiteralPattern::new(D, &[B, S, S, B], S, 90, "B S S B → S"),
        LiteralPattern::new(D, &[S, B, B, S], B, 90, "S B B S → B"),
        LiteralPattern::new(D, &[S, S, B, B], S, 90, "S S B B → S"),
        LiteralPattern::new(D, &[B, B, S, S], B, 90, "B B S S → B"),
        LiteralPattern::new(D, &[B, B, S, B], S, 90, "B B S B → S"),
        LiteralPattern::new(D, &[S, S, B, S], B, 90, "S S B S → B"),
        LiteralPattern::new(D, &[X, Y, X, Y, X], Y, 80, "alternance X Y X Y X → Y"),
        LiteralPattern::new(D, &[X, X, Y, Y], X, 70, "doubles X X Y Y → X"),
    ]
}

/// Motifs de couleur, dans l'ordre d'évaluation.
pub fn color_literals() -> Vec<LiteralPattern> {
    use Dimension::Color as D;
    use Sym::{X, Y};
    vec![
        LiteralPattern::new(D, &[X, X, X, Y, Y, Y], X, 60, "bascule triple X X X Y Y Y → X"),
        LiteralPattern::new(D, &[X, Y, X, Y], X, 55, "zigzag X Y X Y → X"),
    ]
}

/// Motifs de repli sur les deux derniers tirages.
#[derive(Debug, Clone)]
pub struct FallbackPattern {
    pub dimension: Dimension,
    pub priority: u32,
}

impl FallbackPattern {
    pub fn new(dimension: Dimension, priority: u32) -> Self {
        Self { dimension, priority }
    }

    /// X Y → X : les deux derniers diffèrent, on prédit le retour de l'avant-dernier.
    pub fn evaluate_alternation(&self, history: &[DrawRecord]) -> Option<PatternCandidate> {
        let recent = window(history, 2, self.dimension)?;
        if recent[0] == recent[1] {
            return None;
        }
        Some(PatternCandidate {
            value: recent[0].to_value(),
            rationale: format!("Repli : alternance simple {} {} → {}", recent[0].letter(), recent[1].letter(), recent[0].letter()),
            priority: self.priority,
        })
    }

    /// X X → X : continuation de la répétition.
    pub fn evaluate_repeat(&self, history: &[DrawRecord]) -> Option<PatternCandidate> {
        let recent = window(history, 2, self.dimension)?;
        if recent[0] != recent[1] {
            return None;
        }
        Some(PatternCandidate {
            value: recent[0].to_value(),
            rationale: format!("Repli : répétition simple {} {} → {}", recent[0].letter(), recent[1].letter(), recent[0].letter()),
            priority: self.priority,
        })
    }
}
