//! PUNTER — sports bet recommendation engine
//!
//! Entry point. Loads configuration, initialises structured logging,
//! loads the configured models and datasets, optionally cross-validates the
//! better on history, then recommends and sizes bets on upcoming matches.

use anyhow::Result;
use tracing::info;

use punter::config::AppConfig;
use punter::dropper::Dropper;
use punter::engine::{recommend_bets, render_recommendations, Accountant, AccountantKind};
use punter::predict::PredictorKind;
use punter::storage::{describe, load_model, read_dataset, write_dataset, DatasetKind};
use punter::strategy::BetterKind;

const BANNER: &str = r#"
 ____  _   _ _   _ _____ _____ ____
|  _ \| | | | \ | |_   _| ____|  _ \
| |_) | | | |  \| | | | |  _| | |_) |
|  __/| |_| | |\  | | | | |___|  _ <
|_|    \___/|_| \_| |_| |_____|_| \_\

  Predict, bet, account
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path = std::env::var("PUNTER_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let cfg = AppConfig::load(&config_path)?;

    init_logging(&cfg);

    println!("{BANNER}");
    info!(
        data_dir = %cfg.engine.data_dir.display(),
        balance = cfg.recommend.balance,
        version = env!("CARGO_PKG_VERSION"),
        "PUNTER starting up"
    );

    // -- Models ----------------------------------------------------------

    let models = cfg.models_dir();
    let predictor: PredictorKind = load_model(&models, cfg.recommend.predictor.as_deref())?;
    let better: BetterKind = load_model(&models, cfg.recommend.better.as_deref())?;
    let mut accountant: AccountantKind = load_model(&models, cfg.recommend.accountant.as_deref())?;
    accountant.set_balance(cfg.recommend.balance);

    let match_dir = cfg.datasets_dir(DatasetKind::Match);

    // -- Out-of-sample check ---------------------------------------------

    if let Some(validator) = cfg.cross_validator() {
        let name = cfg.evaluate.as_ref().and_then(|e| e.dataset.as_deref());
        let history = read_dataset(DatasetKind::Match, &match_dir, name)?;
        println!("Cross-validating better on {}", describe(&history));
        let evaluation = validator.evaluate(&better, &history).await?;
        println!("{}", evaluation.scores.render());
        for metric in &evaluation.scores.metrics {
            info!(metric = %metric, mean = evaluation.scores.mean(metric), "Cross-validated");
        }
    }

    // -- Recommendation --------------------------------------------------

    let mut droppers = cfg.recommend.droppers.clone();
    if let Some(name) = cfg.recommend.history.as_deref() {
        let history = read_dataset(DatasetKind::Match, &match_dir, Some(name))?;
        for dropper in &mut droppers {
            dropper.fit(&history)?;
        }
    }

    let mut upcoming = read_dataset(DatasetKind::Match, &match_dir, cfg.recommend.dataset.as_deref())?;
    if let Some(after) = cfg.played_after() {
        let keep: Vec<bool> = upcoming
            .times("match.played_at")?
            .iter()
            .map(|t| t.is_some_and(|t| t >= after))
            .collect();
        upcoming = upcoming.filter(&keep);
    }
    println!("Upcoming: {}", describe(&upcoming));

    let recommended = recommend_bets(&upcoming, &predictor, &better, &mut accountant, &droppers)?;
    if recommended.is_empty() {
        println!("No bets recommended.");
        return Ok(());
    }
    println!("{}", render_recommendations(&recommended)?);

    let path = write_dataset(&recommended, &cfg.datasets_dir(DatasetKind::AccountedMatch), None)?;
    info!(path = %path.display(), bets = recommended.len(), "Recommendations saved");
    Ok(())
}

fn init_logging(cfg: &AppConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("punter=info"));

    let json_logging = cfg.logging.json || std::env::var("PUNTER_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
