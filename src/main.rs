use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hashchain_lab::app_state::AppState;
use hashchain_lab::chain::{Chain, ChainIssue};
use hashchain_lab::clock::{Clock, SystemClock};
use hashchain_lab::config::{LabConfig, DEFAULT_CONFIG_PATH};
use hashchain_lab::digest::sha256_hex;
use hashchain_lab::events::{ChainScope, EventBus, LabEvent};
use hashchain_lab::ledger::{MultiLedger, Participant};
use hashchain_lab::miner::Miner;
use hashchain_lab::pow::DifficultyPattern;
use hashchain_lab::{routes, signature, workbench};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "hashchain-lab", version, about = "Proof-of-work and hash-chain lab")]
struct Cli {
    /// Config file (TOML); created with defaults when missing
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// SHA-256 of a text
    Hash { text: String },

    /// Mine a standalone block (data + timestamp + nonce)
    Mine {
        data: String,

        /// Batch multiplier over the configured base batch
        #[arg(long)]
        speed: Option<u64>,

        /// Override the configured difficulty pattern
        #[arg(long)]
        pattern: Option<String>,
    },

    /// Build and mine a user chain, one block per data item
    Chain {
        #[arg(required = true)]
        data: Vec<String>,

        #[arg(long)]
        pattern: Option<String>,
    },

    /// Run the three-participant ledger simulation
    Ledgers {
        /// Transfers such as "A -> B: 10"
        #[arg(long = "transfer")]
        transfers: Vec<String>,

        /// Participant whose chain records the transfer pool
        #[arg(long, default_value = "A")]
        recorder: String,
    },

    /// Generate a secp256k1 key pair
    Keygen {
        /// Also write the pair as JSON
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Sign a message (SHA-256 then ECDSA, DER hex)
    Sign {
        #[arg(long)]
        private_key: String,
        #[arg(long)]
        message: String,
    },

    /// Verify a DER hex signature
    Verify {
        #[arg(long)]
        public_key: String,
        #[arg(long)]
        message: String,
        #[arg(long)]
        signature: String,
    },

    /// Serve the HTTP API and event stream
    Serve {
        #[arg(long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // init tracing from env HASHCHAIN_LOG or RUST_LOG
    let filter = std::env::var("HASHCHAIN_LOG")
        .unwrap_or_else(|_| std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()));
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Hash { text } => {
            println!("{}", sha256_hex(&text));
        }
        Commands::Keygen { out } => {
            let pair = signature::generate_keypair();
            let json = serde_json::to_string_pretty(&pair)?;
            if let Some(path) = out {
                std::fs::write(&path, &json)
                    .with_context(|| format!("writing {}", path.display()))?;
                tracing::info!(path = %path.display(), "key pair written");
            }
            println!("{json}");
        }
        Commands::Sign {
            private_key,
            message,
        } => {
            println!("{}", signature::sign_message(&private_key, &message)?);
        }
        Commands::Verify {
            public_key,
            message,
            signature: sig,
        } => {
            let valid = signature::verify_message(&public_key, &message, &sig)?;
            println!("{}", if valid { "valid" } else { "invalid" });
            if !valid {
                std::process::exit(1);
            }
        }
        cmd => run_lab(cmd, load_config(&cli.config)?).await?,
    }
    Ok(())
}

fn load_config(path: &Path) -> Result<LabConfig> {
    let mut config = LabConfig::load_or_create(path)
        .with_context(|| format!("loading config {}", path.display()))?;
    config.apply_env()?;
    Ok(config)
}

/// Commands that mine
async fn run_lab(cmd: Commands, mut config: LabConfig) -> Result<()> {
    let clock = SystemClock::new(config.clock.utc_offset_minutes);

    match cmd {
        Commands::Mine {
            data,
            speed,
            pattern,
        } => {
            if let Some(p) = pattern {
                config.single.pattern = DifficultyPattern::new(p)?;
            }
            let miner = lab_miner(&config)?;
            let printer = spawn_progress_printer(miner.bus());
            let speed = speed.unwrap_or(config.single.default_speed_multiplier);
            let params = config.single_params();
            let block = workbench::mine_single(&params, &data, speed, &miner, &clock, None).await?;
            printer.abort();
            println!("{}", serde_json::to_string_pretty(&block)?);
        }
        Commands::Chain { data, pattern } => {
            if let Some(p) = pattern {
                config.chain.pattern = DifficultyPattern::new(p)?;
            }
            let miner = lab_miner(&config)?;
            let printer = spawn_progress_printer(miner.bus());
            let mut chain = Chain::new(ChainScope::User, config.chain_params(), miner.bus().clone());
            for (index, item) in data.into_iter().enumerate() {
                chain.append();
                chain.edit_data(index, item)?;
                chain.mine_block(index, &miner, &clock).await?;
            }
            printer.abort();
            println!("{}", serde_json::to_string_pretty(&chain.snapshot())?);
            report_issues(&chain.verify(sha256_hex));
        }
        Commands::Ledgers {
            transfers,
            recorder,
        } => {
            let miner = lab_miner(&config)?;
            let printer = spawn_progress_printer(miner.bus());
            let ledger = MultiLedger::new(&config.ledger_params(), &miner, &clock).await?;
            for line in &transfers {
                if let Err(e) = ledger.submit_transfer(line) {
                    tracing::warn!(transfer = %line, "rejected: {}", e);
                }
            }
            if !ledger.pool().is_empty() {
                let recorder: Participant = recorder.parse()?;
                let block = ledger.record_pool(recorder)?;
                ledger
                    .mine_block(recorder, block.index, &miner, &clock)
                    .await?;
            }
            printer.abort();
            println!("{}", serde_json::to_string_pretty(&ledger.snapshot())?);
        }
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            serve(config, Arc::new(clock)).await?;
        }
        other => anyhow::bail!("{other:?} does not need the lab config"),
    }
    Ok(())
}

fn lab_miner(config: &LabConfig) -> Result<Miner> {
    let bus = EventBus::new(config.miner.event_capacity);
    Ok(Miner::sha256(config.miner.threads, bus)?)
}

async fn serve(config: LabConfig, clock: Arc<dyn Clock>) -> Result<()> {
    let bind = config.server.bind.clone();
    let state = AppState::with_clock(config, clock).await?;
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    tracing::info!("listening on http://{}", bind);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}

/// Print mining progress to stderr until aborted
fn spawn_progress_printer(bus: &EventBus) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(envelope) => match envelope.event {
                    LabEvent::MiningProgress {
                        target,
                        nonce,
                        hashrate,
                        ..
                    } => eprintln!("{target:?}: nonce {nonce} ({hashrate:.0} H/s)"),
                    LabEvent::MiningSucceeded {
                        target,
                        nonce,
                        elapsed_ms,
                        ..
                    } => eprintln!("{target:?}: found nonce {nonce} in {elapsed_ms} ms"),
                    _ => {}
                },
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn report_issues(issues: &[ChainIssue]) {
    if issues.is_empty() {
        eprintln!("chain valid");
    }
    for issue in issues {
        eprintln!("block {}: {:?}", issue.index(), issue);
    }
}
