use serde::{Deserialize, Serialize};
use wingo_core::issue::IssueId;
use wingo_core::models::{
    color_of, is_violet_digit, Color, DrawRecord, Outcome, PredictionKind, PredictionValue, Size,
};

use crate::config::StrategyConfig;
use crate::patterns::PatternCandidate;

/// État des pertes, mis à jour uniquement à la résolution d'une prédiction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LossState {
    pub consecutive_losses: u32,
    pub last_kind: Option<PredictionKind>,
    pub last_was_loss: bool,
}

impl LossState {
    pub fn record(&mut self, kind: PredictionKind, outcome: Outcome) {
        match outcome {
            Outcome::Win => self.consecutive_losses = 0,
            Outcome::Loss => self.consecutive_losses += 1,
        }
        self.last_kind = Some(kind);
        self.last_was_loss = outcome == Outcome::Loss;
    }
}

/// Règle qui a produit la prédiction finale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rule {
    InsufficientHistory,
    ForcedNumber,
    ForceColor,
    FallbackColor,
    SizeAfterColorLoss,
    SwitchKind,
    BestPattern,
    DerivedDigit,
    Default,
    MostFrequentColor,
    DerivedColor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub value: PredictionValue,
    pub rationale: String,
    pub rule: Rule,
    /// Chiffre représentatif, toujours membre de `recommended`.
    pub predicted_number: Option<u8>,
    pub recommended: Vec<u8>,
    /// Marque violette : le chiffre représentatif est 0 ou 5.
    pub secondary_violet: bool,
}

impl Prediction {
    pub fn kind(&self) -> PredictionKind {
        self.value.kind()
    }
}

pub struct SelectionInput<'a> {
    /// Plus récent en tête.
    pub history: &'a [DrawRecord],
    pub best: Option<&'a PatternCandidate>,
    pub losses: &'a LossState,
    pub next_period: Option<&'a IssueId>,
    pub force_number: bool,
}

struct Draft {
    value: PredictionValue,
    rationale: String,
    rule: Rule,
    is_default: bool,
}

impl Draft {
    fn new(value: PredictionValue, rationale: String, rule: Rule) -> Self {
        Self { value, rationale, rule, is_default: false }
    }

    fn default_with(rationale: &str) -> Self {
        Self {
            value: PredictionValue::Color(Color::Green),
            rationale: rationale.to_string(),
            rule: Rule::Default,
            is_default: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StrategySelector {
    config: StrategyConfig,
}

impl StrategySelector {
    pub fn new(config: StrategyConfig) -> Self {
        Self { config }
    }

    pub fn select(&self, input: &SelectionInput<'_>) -> Prediction {
        let derived = input.next_period.map(|p| p.last_digit());

        if input.history.len() < self.config.min_history {
            let draft = Draft {
                rule: Rule::InsufficientHistory,
                ..Draft::default_with("Défaut : aucun motif, historique insuffisant")
            };
            return self.finish(draft, input.history, None);
        }

        if input.force_number {
            if let Some(d) = derived {
                let draft = Draft::new(
                    PredictionValue::Number(d),
                    format!("Numéro imposé (dernier chiffre de la période suivante : {d})"),
                    Rule::ForcedNumber,
                );
                return self.finish(draft, input.history, derived);
            }
        }

        let mut draft = self.apply_rules(input, derived);

        // Un défaut littéral tente encore la couleur dominante puis la couleur dérivée
        if draft.is_default {
            if let Some(color) = most_frequent_color(self.recent(input.history)) {
                draft = Draft::new(
                    PredictionValue::Color(color),
                    format!(
                        "Couleur la plus fréquente sur les {} derniers, aucun motif fort",
                        self.config.frequency_window
                    ),
                    Rule::MostFrequentColor,
                );
            } else if let Some(d) = derived {
                draft = Draft::new(
                    PredictionValue::Color(color_of(d).base()),
                    format!("Couleur dérivée du dernier chiffre de période ({d}), aucun motif fort"),
                    Rule::DerivedColor,
                );
            }
        }

        self.finish(draft, input.history, derived)
    }

    fn apply_rules(&self, input: &SelectionInput<'_>, derived: Option<u8>) -> Draft {
        let losses = input.losses;
        let best = input.best;

        if losses.consecutive_losses >= self.config.force_color_losses {
            let label = format!("Couleur imposée après {} pertes", losses.consecutive_losses);
            return self.color_fallback(input, derived, label, Rule::ForceColor);
        }

        if losses.consecutive_losses == self.config.fallback_color_losses {
            let label = format!("Repli : couleur après {} perte(s)", losses.consecutive_losses);
            return self.color_fallback(input, derived, label, Rule::FallbackColor);
        }

        if losses.last_was_loss && losses.last_kind == Some(PredictionKind::Color) {
            return match (best, derived) {
                (Some(b), _) if b.kind() == PredictionKind::Size => Draft::new(
                    b.value,
                    format!("Repli : taille après perte couleur ({})", b.rationale),
                    Rule::SizeAfterColorLoss,
                ),
                (Some(b), _) if b.kind() == PredictionKind::Color => Draft::new(
                    b.value,
                    format!("Repli : motif couleur (aucun motif taille) après perte couleur ({})", b.rationale),
                    Rule::SizeAfterColorLoss,
                ),
                (_, Some(d)) => Draft::new(
                    PredictionValue::Number(d),
                    format!("Repli : chiffre dérivé de la période après perte couleur ({d})"),
                    Rule::SizeAfterColorLoss,
                ),
                _ => Draft::default_with("Repli : défaut après perte couleur (aucun motif)"),
            };
        }

        if let Some(b) = best {
            if losses.consecutive_losses >= self.config.switch_kind_losses
                && losses.last_kind != Some(b.kind())
            {
                return Draft::new(
                    b.value,
                    format!(
                        "Bascule vers {} après {} pertes ({})",
                        b.kind(),
                        losses.consecutive_losses,
                        b.rationale
                    ),
                    Rule::SwitchKind,
                );
            }
            return Draft::new(b.value, b.rationale.clone(), Rule::BestPattern);
        }

        if let Some(d) = derived {
            return Draft::new(
                PredictionValue::Number(d),
                format!("Dérivé du dernier chiffre de la période suivante ({d})"),
                Rule::DerivedDigit,
            );
        }

        Draft::default_with("Défaut : aucun motif, historique insuffisant")
    }

    /// Règles 1 et 2 : la couleur est imposée, la source de la valeur varie.
    fn color_fallback(
        &self,
        input: &SelectionInput<'_>,
        derived: Option<u8>,
        label: String,
        rule: Rule,
    ) -> Draft {
        if let Some(b) = input.best.filter(|b| b.kind() == PredictionKind::Color) {
            return Draft::new(b.value, format!("{label} ({})", b.rationale), rule);
        }
        if let Some(color) = most_frequent_color(self.recent(input.history)) {
            return Draft::new(
                PredictionValue::Color(color),
                format!("{label} (plus fréquente sur les {} derniers)", self.config.frequency_window),
                rule,
            );
        }
        if let Some(d) = derived {
            return Draft::new(
                PredictionValue::Color(color_of(d).base()),
                format!("{label} (dérivée du dernier chiffre de période {d})"),
                rule,
            );
        }
        Draft {
            value: PredictionValue::Color(Color::Green),
            rationale: format!("{label} (repli par défaut)"),
            rule,
            is_default: true,
        }
    }

    fn recent<'h>(&self, history: &'h [DrawRecord]) -> &'h [DrawRecord] {
        &history[..self.config.frequency_window.min(history.len())]
    }

    /// Chiffres recommandés et chiffre représentatif.
    fn finish(&self, draft: Draft, history: &[DrawRecord], derived: Option<u8>) -> Prediction {
        let mut rationale = draft.rationale;
        let (recommended, predicted_number) = match draft.value {
            PredictionValue::Color(color) => {
                let digits = color.digits().to_vec();
                (digits, derived.filter(|d| color.contains(*d)))
            }
            PredictionValue::Size(size) => {
                match most_frequent_digit_in(self.recent(history), size) {
                    Some(d) => {
                        rationale.push_str(&format!(
                            " (chiffre le plus fréquent : {d} sur les {} derniers)",
                            self.config.frequency_window
                        ));
                        (vec![d], Some(d))
                    }
                    None => {
                        rationale.push_str(" (aucun chiffre récent dans cette taille, tous recommandés)");
                        (size.digits().to_vec(), derived.filter(|d| size.contains(*d)))
                    }
                }
            }
            PredictionValue::Number(d) => (vec![d], Some(d)),
        };

        Prediction {
            value: draft.value,
            rationale,
            rule: draft.rule,
            secondary_violet: predicted_number.map(is_violet_digit).unwrap_or(false),
            predicted_number,
            recommended,
        }
    }
}

/// Couleur simple majoritaire ; `None` en cas d'égalité.
pub fn most_frequent_color(records: &[DrawRecord]) -> Option<Color> {
    let green = records
        .iter()
        .filter(|r| r.color().base() == Color::Green)
        .count();
    let red = records.len() - green;
    match green.cmp(&red) {
        std::cmp::Ordering::Greater => Some(Color::Green),
        std::cmp::Ordering::Less => Some(Color::Red),
        std::cmp::Ordering::Equal => None,
    }
}

/// Chiffre de la taille le plus fréquent ; le plus petit gagne à égalité.
pub fn most_frequent_digit_in(records: &[DrawRecord], size: Size) -> Option<u8> {
    let mut counts = [0u32; 10];
    for r in records.iter().filter(|r| size.contains(r.number)) {
        counts[r.number as usize] += 1;
    }
    let max = *counts.iter().max()?;
    if max == 0 {
        return None;
    }
    counts.iter().position(|&c| c == max).map(|i| i as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::make_history;

    fn selector() -> StrategySelector {
        StrategySelector::new(StrategyConfig::default())
    }

    fn candidate(value: PredictionValue, priority: u32) -> PatternCandidate {
        PatternCandidate { value, rationale: "motif".to_string(), priority }
    }

    fn losses(n: u32, last_kind: Option<PredictionKind>, last_was_loss: bool) -> LossState {
        LossState { consecutive_losses: n, last_kind, last_was_loss }
    }

    fn select(
        history: &[DrawRecord],
        best: Option<&PatternCandidate>,
        loss: &LossState,
        next: Option<&IssueId>,
    ) -> Prediction {
        selector().select(&SelectionInput {
            history,
            best,
            losses: loss,
            next_period: next,
            force_number: false,
        })
    }

    // 6 verts, 4 rouges (ancien -> récent)
    const MOSTLY_GREEN: [u8; 10] = [1, 2, 3, 4, 7, 6, 9, 8, 1, 3];

    #[test]
    fn test_loss_state_counts_and_resets() {
        let mut state = LossState::default();
        for _ in 0..5 {
            state.record(PredictionKind::Size, Outcome::Loss);
        }
        assert_eq!(state.consecutive_losses, 5);
        assert!(state.last_was_loss);
        state.record(PredictionKind::Color, Outcome::Win);
        assert_eq!(state.consecutive_losses, 0);
        assert_eq!(state.last_kind, Some(PredictionKind::Color));
        assert!(!state.last_was_loss);
    }

    #[test]
    fn test_force_color_overrides_size_pattern() {
        let history = make_history(&MOSTLY_GREEN);
        let best = candidate(PredictionValue::Size(Size::Big), 100);
        let p = select(&history, Some(&best), &losses(4, Some(PredictionKind::Size), true), None);
        assert_eq!(p.kind(), PredictionKind::Color);
        assert_eq!(p.rule, Rule::ForceColor);
    }

    #[test]
    fn test_force_color_prefers_color_pattern() {
        let history = make_history(&MOSTLY_GREEN);
        let best = candidate(PredictionValue::Color(Color::Red), 60);
        let p = select(&history, Some(&best), &losses(6, None, true), None);
        assert_eq!(p.value, PredictionValue::Color(Color::Red));
    }

    #[test]
    fn test_one_loss_uses_most_frequent_color() {
        let history = make_history(&MOSTLY_GREEN);
        let best = candidate(PredictionValue::Size(Size::Small), 20);
        let p = select(&history, Some(&best), &losses(1, Some(PredictionKind::Size), true), None);
        assert_eq!(p.value, PredictionValue::Color(Color::Green));
        assert_eq!(p.rule, Rule::FallbackColor);
    }

    #[test]
    fn test_fallback_rationale_uses_configured_threshold() {
        let config = StrategyConfig { fallback_color_losses: 2, ..StrategyConfig::default() };
        let history = make_history(&MOSTLY_GREEN);
        let p = StrategySelector::new(config).select(&SelectionInput {
            history: &history,
            best: None,
            losses: &losses(2, Some(PredictionKind::Size), true),
            next_period: None,
            force_number: false,
        });
        assert_eq!(p.rule, Rule::FallbackColor);
        assert_eq!(p.value, PredictionValue::Color(Color::Green));
        assert!(p.rationale.starts_with("Repli : couleur après 2 perte(s)"), "{}", p.rationale);
        assert!(p.rationale.contains("sur les 10 derniers"));
    }

    #[test]
    fn test_color_fallback_uses_derived_digit_on_tie() {
        // 5 verts, 5 rouges
        let history = make_history(&[1, 2, 3, 4, 7, 6, 9, 8, 1, 2]);
        let next: IssueId = "20250101100010236".parse().unwrap();
        let p = select(&history, None, &losses(1, None, true), Some(&next));
        assert_eq!(p.value, PredictionValue::Color(Color::Red));
        assert_eq!(p.predicted_number, Some(6));
    }

    #[test]
    fn test_color_fallback_default_then_post_processing() {
        let history = make_history(&[1, 2, 3, 4, 7, 6, 9, 8, 1, 2]);
        let p = select(&history, None, &losses(4, None, true), None);
        assert_eq!(p.value, PredictionValue::Color(Color::Green));
        assert_eq!(p.rule, Rule::ForceColor);
    }

    #[test]
    fn test_size_after_color_loss() {
        let history = make_history(&MOSTLY_GREEN);
        let size = candidate(PredictionValue::Size(Size::Big), 20);
        let p = select(&history, Some(&size), &losses(2, Some(PredictionKind::Color), true), None);
        assert_eq!(p.value, PredictionValue::Size(Size::Big));
        assert_eq!(p.rule, Rule::SizeAfterColorLoss);

        let color = candidate(PredictionValue::Color(Color::Red), 55);
        let p = select(&history, Some(&color), &losses(2, Some(PredictionKind::Color), true), None);
        assert_eq!(p.value, PredictionValue::Color(Color::Red));

        let next: IssueId = "1237".parse().unwrap();
        let p = select(&history, None, &losses(3, Some(PredictionKind::Color), true), Some(&next));
        assert_eq!(p.value, PredictionValue::Number(7));
    }

    #[test]
    fn test_switch_kind_after_two_losses() {
        let history = make_history(&MOSTLY_GREEN);
        let best = candidate(PredictionValue::Color(Color::Red), 55);
        let p = select(&history, Some(&best), &losses(2, Some(PredictionKind::Size), true), None);
        assert_eq!(p.rule, Rule::SwitchKind);
        assert_eq!(p.value, PredictionValue::Color(Color::Red));

        // même type que la dernière prédiction : adoption directe
        let best = candidate(PredictionValue::Size(Size::Small), 90);
        let p = select(&history, Some(&best), &losses(2, Some(PredictionKind::Size), true), None);
        assert_eq!(p.rule, Rule::BestPattern);
    }

    #[test]
    fn test_best_pattern_adopted_verbatim() {
        let history = make_history(&MOSTLY_GREEN);
        let best = candidate(PredictionValue::Size(Size::Big), 90);
        let p = select(&history, Some(&best), &LossState::default(), None);
        assert_eq!(p.value, PredictionValue::Size(Size::Big));
        assert!(p.rationale.starts_with("motif"));
    }

    #[test]
    fn test_derived_digit_without_pattern() {
        let history = make_history(&MOSTLY_GREEN);
        let next: IssueId = "99999999999999999995".parse().unwrap();
        let p = select(&history, None, &LossState::default(), Some(&next));
        assert_eq!(p.value, PredictionValue::Number(5));
        assert_eq!(p.recommended, vec![5]);
        assert!(p.secondary_violet);
    }

    #[test]
    fn test_default_post_processed_to_most_frequent() {
        let history = make_history(&MOSTLY_GREEN);
        let p = select(&history, None, &LossState::default(), None);
        assert_eq!(p.rule, Rule::MostFrequentColor);
        assert_eq!(p.value, PredictionValue::Color(Color::Green));
    }

    #[test]
    fn test_default_kept_when_nothing_else() {
        let history = make_history(&[1, 2, 3, 4, 7, 6, 9, 8, 1, 2]);
        let p = select(&history, None, &LossState::default(), None);
        assert_eq!(p.rule, Rule::Default);
        assert_eq!(p.value, PredictionValue::Color(Color::Green));
        assert_eq!(p.recommended, vec![1, 3, 7, 9, 5]);
    }

    #[test]
    fn test_insufficient_history_returns_default() {
        let history = make_history(&[1, 2, 3]);
        let best = candidate(PredictionValue::Size(Size::Big), 90);
        let p = select(&history, Some(&best), &losses(4, None, true), None);
        assert_eq!(p.rule, Rule::InsufficientHistory);
        assert_eq!(p.value, PredictionValue::Color(Color::Green));
    }

    #[test]
    fn test_forced_number() {
        let history = make_history(&MOSTLY_GREEN);
        let next: IssueId = "1240".parse().unwrap();
        let p = selector().select(&SelectionInput {
            history: &history,
            best: None,
            losses: &LossState::default(),
            next_period: Some(&next),
            force_number: true,
        });
        assert_eq!(p.value, PredictionValue::Number(0));
        assert!(p.secondary_violet);
    }

    #[test]
    fn test_size_recommendation_narrows_to_most_frequent() {
        // Gros récents : 7, 9, 9, 5 -> 9
        let history = make_history(&[1, 7, 9, 2, 9, 5, 3, 4, 1, 2]);
        let best = candidate(PredictionValue::Size(Size::Big), 90);
        let p = select(&history, Some(&best), &LossState::default(), None);
        assert_eq!(p.recommended, vec![9]);
        assert_eq!(p.predicted_number, Some(9));
        assert!(!p.secondary_violet);
    }

    #[test]
    fn test_size_recommendation_tie_smallest_and_violet() {
        // 5 et 8 une fois chacun -> 5, marque violette
        let history = make_history(&[1, 2, 3, 8, 4, 5]);
        let best = candidate(PredictionValue::Size(Size::Big), 90);
        let p = select(&history, Some(&best), &LossState::default(), None);
        assert_eq!(p.predicted_number, Some(5));
        assert!(p.secondary_violet);
    }

    #[test]
    fn test_size_recommendation_all_digits_when_absent() {
        let history = make_history(&[1, 2, 3, 4, 0]);
        let best = candidate(PredictionValue::Size(Size::Big), 90);
        let next: IssueId = "1003".parse().unwrap();
        let p = select(&history, Some(&best), &LossState::default(), Some(&next));
        assert_eq!(p.recommended, vec![5, 6, 7, 8, 9]);
        // 3 n'est pas un gros chiffre
        assert_eq!(p.predicted_number, None);
    }

    #[test]
    fn test_color_recommendation_and_violet_marker() {
        let history = make_history(&MOSTLY_GREEN);
        let best = candidate(PredictionValue::Color(Color::Red), 60);
        let next: IssueId = "1010".parse().unwrap();
        let p = select(&history, Some(&best), &LossState::default(), Some(&next));
        assert_eq!(p.recommended, vec![2, 4, 6, 8, 0]);
        assert_eq!(p.predicted_number, Some(0));
        assert!(p.secondary_violet);

        // chiffre dérivé 5 mais prédiction rouge : pas de marque
        let next: IssueId = "1015".parse().unwrap();
        let p = select(&history, Some(&best), &LossState::default(), Some(&next));
        assert_eq!(p.predicted_number, None);
        assert!(!p.secondary_violet);
    }

    #[test]
    fn test_most_frequent_color_tie_is_none() {
        let history = make_history(&[1, 2]);
        assert_eq!(most_frequent_color(&history), None);
        let history = make_history(&[0, 5, 5]);
        assert_eq!(most_frequent_color(&history), Some(Color::Green));
    }
}
