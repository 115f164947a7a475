//! TAP rewards node
//!
//! Operator binary around the rewards engine: opens the sled database, wires
//! the local token ledger and the configured collaborators, then runs one
//! command against the engine.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{Config, Environment, File as ConfigFile};
use serde::Deserialize;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tap_storage::{SledStorage, SledTokenLedger};
use tap_treasury::{
    BatchOutcome, Collaborators, EngineConfig, FixedBatchSize, RewardsEngine, StaticProfitSharing,
};
use tap_types::{format_tap, AccountId, Amount, REWARD_TOKEN_SYMBOL};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_CONFIG_PATH: &str = "config/tap-node.toml";

#[derive(Parser)]
#[command(name = "tap-node")]
#[command(about = "TAP daily rewards engine", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Data directory, overrides the configured one
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Log format (pretty or compact)
    #[arg(long)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record one wager as the configured game
    Wager {
        participant: String,
        amount: Amount,
        /// Day index parity (0 or 1)
        day: u64,
    },
    /// Record wagers from a JSON-lines file
    Replay {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
    /// Deliver reward tokens to the treasury through the deposit callback
    Deposit {
        #[arg(long)]
        from: String,
        amount: Amount,
    },
    /// Pay the next batch of a pending distribution
    Advance,
    /// Print engine status as JSON
    Status,
    /// Print both day buckets as JSON
    Summary,
    /// Print the expected pool and a participant's expected share
    Expected { participant: String },
}

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct AppConfig {
    data_dir: PathBuf,
    log_level: String,
    log_format: String,
    owner: String,
    treasury_account: String,
    token_symbol: String,
    game_address: Option<String>,
    token_address: Option<String>,
    dividends_address: Option<String>,
    batch_size: usize,
    profit_sharing_ready: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/tap"),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            owner: "owner".to_string(),
            treasury_account: "treasury".to_string(),
            token_symbol: REWARD_TOKEN_SYMBOL.to_string(),
            game_address: None,
            token_address: None,
            dividends_address: None,
            batch_size: 50,
            profit_sharing_ready: true,
        }
    }
}

impl AppConfig {
    fn load(config_path_override: Option<&Path>) -> Result<Self> {
        let resolved_path = match config_path_override {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!(
                        "Configuration file {} not found (specified via --config)",
                        path.display()
                    );
                }
                Some(path.to_path_buf())
            }
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_PATH);
                path.exists().then_some(path)
            }
        };

        let mut builder = Config::builder();
        if let Some(path) = &resolved_path {
            builder = builder.add_source(ConfigFile::from(path.as_path()));
        }
        builder = builder.add_source(Environment::with_prefix("TAP").try_parsing(true));

        let config: AppConfig = builder
            .build()?
            .try_deserialize()
            .context("invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(data_dir) = &cli.data_dir {
            self.data_dir = data_dir.clone();
        }
        if let Some(level) = &cli.log_level {
            self.log_level = level.clone();
        }
        if let Some(format) = &cli.log_format {
            self.log_format = format.clone();
        }
    }

    fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            anyhow::bail!("batch_size must be at least 1");
        }
        if !matches!(self.log_format.as_str(), "pretty" | "compact") {
            anyhow::bail!(
                "Invalid log_format '{}'; expected 'pretty' or 'compact'",
                self.log_format
            );
        }
        AccountId::new(self.owner.as_str()).context("owner")?;
        AccountId::new(self.treasury_account.as_str()).context("treasury_account")?;
        Ok(())
    }

    fn db_path(&self) -> PathBuf {
        self.data_dir.join("db")
    }
}

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_format == "compact" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().compact())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    Ok(())
}

fn account(value: &str) -> Result<AccountId> {
    AccountId::new(value).with_context(|| format!("invalid account id {value:?}"))
}

/// Open the engine and bring the stored collaborator addresses in line with
/// the configuration.
fn open_engine(config: &AppConfig) -> Result<(RewardsEngine, SledTokenLedger)> {
    fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("creating data dir {}", config.data_dir.display()))?;
    let storage = SledStorage::new(config.db_path())?;
    let treasury = account(&config.treasury_account)?;
    let ledger = SledTokenLedger::open(storage.db(), treasury.clone(), &config.token_symbol)?;

    let mut engine_config = EngineConfig::new(account(&config.owner)?, treasury);
    engine_config.reward_symbol = config.token_symbol.clone();

    let mut engine = RewardsEngine::open(
        engine_config,
        Collaborators {
            token: Box::new(ledger.clone()),
            batch_size: Box::new(FixedBatchSize(config.batch_size)),
            profit_sharing: Box::new(StaticProfitSharing(config.profit_sharing_ready)),
        },
        Box::new(storage),
    )?;

    let owner = account(&config.owner)?;
    if let Some(game) = &config.game_address {
        let game = account(game)?;
        if engine.game_address() != Some(&game) {
            engine.set_game_address(&owner, game)?;
        }
    }
    if let Some(token) = &config.token_address {
        let token = account(token)?;
        if engine.token_address() != Some(&token) {
            engine.set_token_address(&owner, token)?;
        }
    }
    if let Some(dividends) = &config.dividends_address {
        let dividends = account(dividends)?;
        if engine.dividends_address() != Some(&dividends) {
            engine.set_dividends_address(&owner, dividends)?;
        }
    }

    Ok((engine, ledger))
}

/// One line of a replay file.
#[derive(Debug, Deserialize, PartialEq, Eq)]
struct WagerLine {
    participant: String,
    amount: Amount,
    day: u64,
}

fn parse_wager_line(line: &str) -> Result<Option<WagerLine>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(trimmed)?))
}

fn game_caller(engine: &RewardsEngine) -> Result<AccountId> {
    engine
        .game_address()
        .cloned()
        .context("game_address is not configured")
}

fn log_batch(batch: &Option<BatchOutcome>) {
    if let Some(BatchOutcome::Paid { payouts, complete, .. }) = batch {
        for payout in payouts {
            info!(
                target: "node",
                recipient = %payout.recipient,
                amount = %format_tap(payout.amount),
                "reward paid"
            );
        }
        if *complete {
            info!(target: "node", "distribution complete");
        }
    }
}

fn replay(engine: &mut RewardsEngine, path: &Path) -> Result<usize> {
    let file = fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let caller = game_caller(engine)?;
    let mut recorded = 0;
    for (n, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let Some(wager) = parse_wager_line(&line).with_context(|| format!("line {}", n + 1))?
        else {
            continue;
        };
        let receipt = engine
            .record_wager(&caller, account(&wager.participant)?, wager.amount, wager.day)
            .with_context(|| format!("line {}", n + 1))?;
        log_batch(&receipt.batch);
        recorded += 1;
    }
    Ok(recorded)
}

fn deposit(
    engine: &mut RewardsEngine,
    ledger: &SledTokenLedger,
    from: &AccountId,
    amount: Amount,
) -> Result<()> {
    let token = engine
        .token_address()
        .cloned()
        .context("token_address is not configured")?;
    let treasury = ledger.treasury().clone();
    ledger.credit(&treasury, amount)?;
    if let Err(err) = engine.on_tokens_received(&token, from, amount) {
        // Refused deposits go back out of the treasury.
        ledger.debit(&treasury, amount)?;
        return Err(err.into());
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_overrides(&cli);
    config.validate()?;
    init_logging(&config)?;

    let (mut engine, ledger) = open_engine(&config)?;
    info!(
        target: "node",
        db = %config.db_path().display(),
        day = %engine.current_day(),
        "rewards engine ready"
    );

    match cli.command {
        Commands::Wager {
            participant,
            amount,
            day,
        } => {
            let caller = game_caller(&engine)?;
            let receipt = engine.record_wager(&caller, account(&participant)?, amount, day)?;
            log_batch(&receipt.batch);
            println!("{}", serde_json::to_string_pretty(&receipt)?);
        }
        Commands::Replay { path } => {
            let recorded = replay(&mut engine, &path)?;
            info!(target: "node", recorded, "replay finished");
        }
        Commands::Deposit { from, amount } => {
            deposit(&mut engine, &ledger, &account(&from)?, amount)?;
            println!("deposited {} from {}", format_tap(amount), from);
        }
        Commands::Advance => {
            let outcome = engine.advance_distribution()?;
            if outcome == BatchOutcome::Idle {
                warn!(target: "node", "no distribution pending");
            }
            log_batch(&Some(outcome.clone()));
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::Status => {
            println!("{}", serde_json::to_string_pretty(&engine.status()?)?);
        }
        Commands::Summary => {
            println!("{}", engine.daily_summary_json()?);
        }
        Commands::Expected { participant } => {
            let participant = account(&participant)?;
            let pool = engine.expected_pool()?;
            let share = engine.expected_reward_share(&participant)?;
            println!("expected pool:  {}", format_tap(pool));
            println!("expected share: {}", format_tap(share));
        }
    }

    Ok(())
}
