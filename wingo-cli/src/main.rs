mod display;
mod import;
mod interactive;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use wingo_core::issue::IssueId;
use wingo_core::simulate::simulate_draws;
use wingo_engine::backtest::run_backtest;
use wingo_engine::export::{now_ist, PredictionSummary};
use wingo_engine::session::PredictionSession;
use wingo_live::clock::SystemClock;
use wingo_live::config::{load_config, save_config, GameKind, LiveConfig};
use wingo_live::feed::{FeedSource, HttpFeed, SimulatedFeed};
use wingo_live::runner::LiveRunner;

use crate::display::{
    display_backtest, display_candidates, display_config, display_draws, display_import_summary,
    display_prediction,
};

#[derive(Parser)]
#[command(name = "wingo", about = "Prédictions WinGo à partir du flux de résultats")]
struct Cli {
    /// Fichier de configuration JSON
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Clone)]
struct SourceArgs {
    /// Jeu (30s ou 1m)
    #[arg(short, long)]
    game: Option<GameKind>,

    /// URL du flux, remplace celle du jeu
    #[arg(long)]
    feed_url: Option<String>,

    /// Utiliser un flux simulé hors ligne
    #[arg(long)]
    simulate: bool,

    /// Seed du flux simulé
    #[arg(long, default_value = "42")]
    seed: u64,
}

#[derive(Subcommand)]
enum Command {
    /// Suivre le jeu en direct (compte à rebours, prédictions, résultats)
    Watch {
        #[command(flatten)]
        source: SourceArgs,

        /// Ne pas prédire automatiquement à chaque nouveau tirage
        #[arg(long)]
        no_auto: bool,
    },

    /// Prédire la prochaine période à partir de la page courante du flux
    Predict {
        #[command(flatten)]
        source: SourceArgs,

        /// Prédire le chiffre dérivé de la période
        #[arg(short, long)]
        number: bool,

        /// Afficher la prédiction inversée (Big/Small, Red/Green)
        #[arg(short, long)]
        reverse: bool,
    },

    /// Lister les derniers tirages du flux
    History {
        #[command(flatten)]
        source: SourceArgs,

        /// Nombre de tirages à afficher
        #[arg(short, long, default_value = "10")]
        last: usize,
    },

    /// Rejouer une séquence de tirages et mesurer la stratégie
    Backtest {
        /// Fichier CSV `periode;numero` (tirages simulés sinon)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Nombre de tirages simulés
        #[arg(short = 'n', long, default_value = "500")]
        count: usize,

        /// Seed de la simulation
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Gérer la configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Afficher la configuration effective
    Show {
        #[arg(short, long)]
        game: Option<GameKind>,
    },

    /// Écrire une configuration par défaut
    Init {
        /// Chemin du fichier
        #[arg(default_value = "wingo.json")]
        path: PathBuf,

        #[arg(short, long)]
        game: Option<GameKind>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Command::Watch { source, no_auto } => {
            let mut config = resolve_config(config_path, &source)?;
            if no_auto {
                config.auto_predict = false;
            }
            cmd_watch(config, &source).await
        }
        Command::Predict { source, number, reverse } => {
            let config = resolve_config(config_path, &source)?;
            cmd_predict(&config, &source, number, reverse).await
        }
        Command::History { source, last } => {
            let config = resolve_config(config_path, &source)?;
            cmd_history(&config, &source, last).await
        }
        Command::Backtest { file, count, seed } => {
            let config = base_config(config_path)?;
            cmd_backtest(&config, file.as_deref(), count, seed)
        }
        Command::Config { action } => match action {
            ConfigAction::Show { game } => {
                let mut config = base_config(config_path)?;
                if let Some(game) = game {
                    config = config.with_game(game);
                }
                display_config(&config);
                Ok(())
            }
            ConfigAction::Init { path, game } => {
                if path.exists() {
                    bail!("{:?} existe déjà", path);
                }
                let config = LiveConfig::for_game(game.unwrap_or_default());
                save_config(&config, &path)?;
                println!("Configuration écrite dans {}", path.display());
                Ok(())
            }
        },
    }
}

fn base_config(path: Option<&Path>) -> Result<LiveConfig> {
    match path {
        Some(p) => load_config(p),
        None => Ok(LiveConfig::default()),
    }
}

/// Fichier de configuration, puis options de la ligne de commande.
fn resolve_config(path: Option<&Path>, source: &SourceArgs) -> Result<LiveConfig> {
    let mut config = base_config(path)?;
    if let Some(game) = source.game {
        config = config.with_game(game);
    }
    if let Some(url) = &source.feed_url {
        config.feed_url = url.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Première période simulée : date du jour en heure indienne suivie d'un compteur.
fn simulated_first_issue() -> Result<IssueId> {
    IssueId::parse(&format!("{}100010001", now_ist().format("%Y%m%d")))
}

fn make_feed(config: &LiveConfig, source: &SourceArgs) -> Result<Arc<dyn FeedSource>> {
    if source.simulate {
        log::info!("Flux simulé (seed {})", source.seed);
        return Ok(Arc::new(SimulatedFeed::new(
            simulated_first_issue()?,
            source.seed,
            Duration::from_secs(config.window_secs as u64),
            config.history_capacity,
        )));
    }
    let feed = HttpFeed::new(&config.feed_url, Duration::from_millis(config.request_timeout_ms))
        .context("Impossible de créer le client HTTP")?;
    Ok(Arc::new(feed))
}

async fn fetch_session(config: &LiveConfig, source: &SourceArgs) -> Result<PredictionSession> {
    let feed = make_feed(config, source)?;
    let page = feed
        .fetch()
        .await
        .with_context(|| format!("Flux indisponible ({})", config.feed_url))?;
    let mut session = PredictionSession::new(
        config.strategy.clone(),
        config.history_capacity,
        config.prediction_log_capacity,
    );
    session.ingest(&page);
    Ok(session)
}

async fn cmd_watch(config: LiveConfig, source: &SourceArgs) -> Result<()> {
    let feed = make_feed(&config, source)?;
    let label = config.game.label();
    let runner = LiveRunner::spawn(config, feed, Arc::new(SystemClock))?;
    interactive::run_watch(runner, label).await
}

async fn cmd_predict(config: &LiveConfig, source: &SourceArgs, number: bool, reverse: bool) -> Result<()> {
    let mut session = fetch_session(config, source).await?;

    println!("\n── Motifs détectés ──");
    display_candidates(&session.candidates());

    let pending = session.request_prediction_with(number)?;
    display_prediction(&pending, session.losses(), reverse);

    let mut summary = PredictionSummary::from_pending(config.game.label(), &pending, now_ist());
    if reverse {
        summary = summary.reversed();
    }
    println!("\n{summary}");
    Ok(())
}

async fn cmd_history(config: &LiveConfig, source: &SourceArgs, last: usize) -> Result<()> {
    let session = fetch_session(config, source).await?;
    if let Some(next) = session.next_period() {
        println!("Prochaine période : {next}");
    }
    display_draws(session.history().recent(last));
    Ok(())
}

fn cmd_backtest(config: &LiveConfig, file: Option<&Path>, count: usize, seed: u64) -> Result<()> {
    let draws = match file {
        Some(path) => {
            let result = import::import_csv(path)?;
            display_import_summary(&result);
            result.draws
        }
        None => {
            println!("Simulation de {} tirages (seed {})", count, seed);
            simulate_draws(IssueId::from(1u64), count, seed)
        }
    };

    let pb = ProgressBar::new(draws.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    let report = run_backtest(&draws, &config.strategy, config.history_capacity, |done, _| {
        pb.set_position(done as u64);
    })?;
    pb.finish_with_message("Backtest terminé");

    display_backtest(&report);
    Ok(())
}
