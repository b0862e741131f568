use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use wingo_core::history::DEFAULT_HISTORY_CAPACITY;
use wingo_engine::config::StrategyConfig;
use wingo_engine::outcome::DEFAULT_LOG_CAPACITY;

const FEED_BASE: &str = "https://draw.ar-lottery01.com/WinGo";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
pub enum GameKind {
    #[serde(rename = "30s")]
    #[value(name = "30s")]
    ThirtySeconds,
    #[default]
    #[serde(rename = "1m")]
    #[value(name = "1m")]
    OneMinute,
}

impl GameKind {
    pub fn window_secs(&self) -> u32 {
        match self {
            GameKind::ThirtySeconds => 30,
            GameKind::OneMinute => 60,
        }
    }

    /// Valeur de `remaining` à laquelle le flux est interrogé.
    pub fn poll_trigger(&self) -> u32 {
        match self {
            GameKind::ThirtySeconds => 29,
            GameKind::OneMinute => 1,
        }
    }

    /// Décalage du début de fenêtre sur l'horloge de référence. Les tirages d'une
    /// minute basculent à la seconde 56.
    pub fn phase_secs(&self) -> u32 {
        match self {
            GameKind::ThirtySeconds => 0,
            GameKind::OneMinute => 56,
        }
    }

    /// Attente avant le nouvel essai quand le flux n'a pas encore avancé.
    pub fn retry_delay_ms(&self) -> u64 {
        match self {
            GameKind::ThirtySeconds => 1000,
            GameKind::OneMinute => 2000,
        }
    }

    pub fn feed_url(&self) -> String {
        let code = match self {
            GameKind::ThirtySeconds => "WinGo_30S",
            GameKind::OneMinute => "WinGo_1M",
        };
        format!("{FEED_BASE}/{code}/GetHistoryIssuePage.json")
    }

    pub fn label(&self) -> &'static str {
        match self {
            GameKind::ThirtySeconds => "30 Sec WinGo",
            GameKind::OneMinute => "1 MinWinGo",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    pub game: GameKind,
    pub feed_url: String,
    pub window_secs: u32,
    pub phase_secs: u32,
    pub poll_trigger: u32,
    pub retry_delay_ms: u64,
    pub request_timeout_ms: u64,
    pub history_capacity: usize,
    pub prediction_log_capacity: usize,
    /// Prédire automatiquement à chaque nouveau tirage.
    pub auto_predict: bool,
    pub strategy: StrategyConfig,
}

impl LiveConfig {
    pub fn for_game(game: GameKind) -> Self {
        Self {
            game,
            feed_url: game.feed_url(),
            window_secs: game.window_secs(),
            phase_secs: game.phase_secs(),
            poll_trigger: game.poll_trigger(),
            retry_delay_ms: game.retry_delay_ms(),
            request_timeout_ms: 5000,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            prediction_log_capacity: DEFAULT_LOG_CAPACITY,
            auto_predict: true,
            strategy: StrategyConfig::default(),
        }
    }

    /// Change de jeu en réinitialisant les réglages propres au jeu.
    pub fn with_game(self, game: GameKind) -> Self {
        Self {
            game,
            feed_url: game.feed_url(),
            window_secs: game.window_secs(),
            phase_secs: game.phase_secs(),
            poll_trigger: game.poll_trigger(),
            retry_delay_ms: game.retry_delay_ms(),
            ..self
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_secs == 0 {
            bail!("La durée de fenêtre doit être positive");
        }
        if self.poll_trigger >= self.window_secs {
            bail!(
                "Déclencheur {} hors fenêtre (0-{})",
                self.poll_trigger,
                self.window_secs - 1
            );
        }
        if self.phase_secs >= self.window_secs {
            bail!(
                "Décalage {} hors fenêtre (0-{})",
                self.phase_secs,
                self.window_secs - 1
            );
        }
        if self.history_capacity < self.strategy.min_history {
            bail!(
                "Capacité d'historique {} inférieure au minimum de la stratégie ({})",
                self.history_capacity,
                self.strategy.min_history
            );
        }
        if self.feed_url.trim().is_empty() {
            bail!("URL du flux vide");
        }
        Ok(())
    }
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self::for_game(GameKind::default())
    }
}

pub fn save_config(config: &LiveConfig, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json).with_context(|| format!("Impossible d'écrire {:?}", path))?;
    Ok(())
}

pub fn load_config(path: &Path) -> Result<LiveConfig> {
    let json = std::fs::read_to_string(path).with_context(|| format!("Impossible de lire {:?}", path))?;
    let config: LiveConfig =
        serde_json::from_str(&json).with_context(|| format!("Configuration invalide dans {:?}", path))?;
    config.validate()?;
    Ok(config)
}
