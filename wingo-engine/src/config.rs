use serde::{Deserialize, Serialize};

/// Seuils de la stratégie. Les variantes observées du jeu n'ont jamais convergé sur
/// des valeurs uniques, d'où leur regroupement ici.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Pertes consécutives à partir desquelles la couleur est imposée.
    pub force_color_losses: u32,
    /// Nombre exact de pertes consécutives qui déclenche le repli couleur.
    pub fallback_color_losses: u32,
    /// Pertes consécutives à partir desquelles on change de type de prédiction.
    pub switch_kind_losses: u32,
    /// Historique minimal avant toute détection de motif.
    pub min_history: usize,
    /// Nombre de tirages récents pour les fréquences (couleur dominante, chiffre de taille).
    pub frequency_window: usize,
    /// Longueur minimale d'une série pour entrer dans les statistiques de rupture.
    pub dragon_min_length: usize,
    /// Confiance minimale (strictement dépassée) d'une longueur de rupture.
    pub dragon_min_confidence: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            force_color_losses: 4,
            fallback_color_losses: 1,
            switch_kind_losses: 2,
            min_history: 5,
            frequency_window: 10,
            dragon_min_length: 5,
            dragon_min_confidence: 0.6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StrategyConfig::default();
        assert_eq!(config.force_color_losses, 4);
        assert_eq!(config.fallback_color_losses, 1);
        assert_eq!(config.switch_kind_losses, 2);
        assert_eq!(config.min_history, 5);
        assert!((config.dragon_min_confidence - 0.6).abs() < 1e-10);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: StrategyConfig = serde_json::from_str(r#"{"switch_kind_losses": 1}"#).unwrap();
        assert_eq!(config.switch_kind_losses, 1);
        assert_eq!(config.force_color_losses, 4);
        assert_eq!(config.frequency_window, 10);
    }
}
