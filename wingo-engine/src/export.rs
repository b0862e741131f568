use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use wingo_core::issue::IssueId;
use wingo_core::models::{PredictionKind, PredictionValue};

use crate::outcome::PendingPrediction;

/// Décalage de l'horloge de référence du jeu (UTC+5:30).
pub const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

pub fn ist() -> FixedOffset {
    FixedOffset::east_opt(IST_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

pub fn now_ist() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&ist())
}

/// Résumé d'une prédiction, prêt à être copié ou affiché tel quel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSummary {
    pub game: String,
    pub period: IssueId,
    pub kind: PredictionKind,
    pub value: PredictionValue,
    pub recommended: Vec<u8>,
    pub predicted_number: Option<u8>,
    pub violet: bool,
    pub issued_at: DateTime<FixedOffset>,
    /// Affichage inversé : la valeur est remplacée par son opposée, les chiffres restent.
    #[serde(default)]
    pub reversed: bool,
}

impl PredictionSummary {
    pub fn from_pending(game: &str, pending: &PendingPrediction, issued_at: DateTime<FixedOffset>) -> Self {
        let p = &pending.prediction;
        Self {
            game: game.to_string(),
            period: pending.for_period.clone(),
            kind: p.kind(),
            value: p.value,
            recommended: p.recommended.clone(),
            predicted_number: p.predicted_number,
            violet: p.secondary_violet,
            issued_at,
            reversed: false,
        }
    }

    /// Version inversée du résumé. La marque violette tient au chiffre représentatif
    /// de la valeur d'origine, elle disparaît.
    pub fn reversed(self) -> Self {
        if self.reversed {
            return self;
        }
        Self {
            value: self.value.reversed(),
            violet: false,
            reversed: true,
            ..self
        }
    }

    pub fn recommended_text(&self) -> String {
        self.recommended
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for PredictionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prediction = if self.violet {
            format!("{} + Violet", self.value)
        } else {
            self.value.to_string()
        };
        writeln!(f, "╭──────────────────────────╮")?;
        writeln!(f, " DATE : {}", self.issued_at.format("%-m/%-d/%Y, %-I:%M %p"))?;
        writeln!(f, "╰──────────────────────────╯")?;
        writeln!(f, "╭──────────────────────────╮")?;
        writeln!(f, "│ WINGO      : {}", self.game)?;
        writeln!(f, "│ PERIOD     : {}", self.period)?;
        writeln!(f, "│ PREDICTION : {prediction}")?;
        writeln!(f, "│ NUMBER     : {}", self.recommended_text())?;
        write!(f, "╰──────────────────────────╯")
    }
}
