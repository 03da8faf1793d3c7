use clap::{Parser, Subcommand};
use eltt_core::config::LedgerConfig;
use eltt_core::codec::encode_transaction;
use eltt_core::energy::{EnergySplit, best_fit_binary, best_fit_si};
use eltt_core::handle::LedgerHandle;
use eltt_core::state::Ledger;
use eltt_core::storage::SnapshotStore;
use eltt_core::tx::{self, Transaction};
use std::error::Error;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "eltt-ledger", about = "Single-writer ELTT ledger")]
struct Cli {
    /// JSON config file; defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Overrides the configured data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Block timestamp; defaults to the current unix time
    #[arg(long, global = true)]
    timestamp: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the data directory and genesis block if missing
    Init,
    Mint {
        to: String,
        amount: f64,
        #[arg(long, default_value = "TTTC")]
        token: String,
        #[arg(long, default_value = "")]
        memo: String,
    },
    Burn {
        from: String,
        amount: f64,
        #[arg(long, default_value = "TTTC")]
        token: String,
    },
    Transfer {
        from: String,
        to: String,
        amount: f64,
        #[arg(long, default_value = "TTTC")]
        token: String,
        #[arg(long, default_value = "")]
        memo: String,
    },
    Swap {
        from: String,
        to: String,
        amount: f64,
        #[arg(long, default_value = "TTTC")]
        token: String,
        #[arg(long, default_value = "")]
        memo: String,
    },
    CreateToken {
        symbol: String,
        #[arg(long, default_value = "")]
        name: String,
        /// Wallet credited with the initial supply
        #[arg(long, default_value = "")]
        issuer: String,
        #[arg(long, default_value_t = 0.0)]
        supply: f64,
    },
    CreatePool {
        token_x: String,
        token_y: String,
    },
    AddLiquidity {
        from: String,
        pool: usize,
        amount: f64,
        token: String,
    },
    RemoveLiquidity {
        from: String,
        pool: usize,
        amount: f64,
    },
    Stake {
        owner: String,
        amount: f64,
        #[arg(long, default_value = "TTTC")]
        token: String,
    },
    Unstake {
        owner: String,
        amount: f64,
        #[arg(long, default_value = "TTTC")]
        token: String,
    },
    /// Claim staking rewards; an amount of 0 claims everything
    Claim {
        owner: String,
        #[arg(long, default_value = "TTTC")]
        token: String,
        #[arg(long, default_value_t = 0.0)]
        amount: f64,
    },
    /// Constant-product quote against a pool; does not touch the ledger
    Quote {
        pool: usize,
        token: String,
        amount: f64,
    },
    Wallet {
        address: String,
    },
    Chain,
    Validate {
        /// Also rebuild the state from the blocks and compare
        #[arg(long)]
        replay: bool,
    },
}

fn resolve_token(ledger: &Ledger, token: &str) -> Result<i32, String> {
    if let Ok(index) = token.parse::<i32>() {
        return Ok(index);
    }
    ledger
        .state
        .find_symbol(token)
        .map(|i| i as i32)
        .ok_or_else(|| format!("unknown token {}", token))
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn build(ledger: &Ledger, command: &Command) -> Result<Option<Transaction>, Box<dyn Error>> {
    let t = |symbol: &str| resolve_token(ledger, symbol);
    let built = match command {
        Command::Mint { to, amount, token, memo } => tx::build_mint(to, *amount, t(token)?, memo),
        Command::Burn { from, amount, token } => tx::build_burn(from, *amount, t(token)?, ""),
        Command::Transfer { from, to, amount, token, memo } => {
            tx::build_transfer(from, to, *amount, t(token)?, memo)
        }
        Command::Swap { from, to, amount, token, memo } => {
            tx::build_swap(from, to, *amount, t(token)?, memo)
        }
        Command::CreateToken { symbol, name, issuer, supply } => {
            tx::build_create_token(issuer, symbol, name, *supply)
        }
        Command::CreatePool { token_x, token_y } => tx::build_create_pool("", t(token_x)?, t(token_y)?),
        Command::AddLiquidity { from, pool, amount, token } => {
            tx::build_add_liquidity(from, &tx::pool_address(*pool), *amount, t(token)?, "")
        }
        Command::RemoveLiquidity { from, pool, amount } => {
            let lp = ledger
                .state
                .get_pool(*pool)
                .map(|p| p.lp_token as i32)
                .ok_or_else(|| format!("unknown pool {}", pool))?;
            tx::build_remove_liquidity(from, &tx::pool_address(*pool), *amount, lp, "")
        }
        Command::Stake { owner, amount, token } => tx::build_stake(owner, *amount, t(token)?, ""),
        Command::Unstake { owner, amount, token } => tx::build_unstake(owner, *amount, t(token)?, ""),
        Command::Claim { owner, token, amount } => tx::build_claim_rewards(owner, *amount, t(token)?),
        _ => return Ok(None),
    };
    Ok(Some(built))
}

fn report(ledger: &Ledger, command: &Command) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Wallet { address } => {
            let tokens = ledger
                .list_wallet_tokens(address)
                .ok_or_else(|| format!("unknown wallet {}", address))?;
            for (token, balance) in tokens {
                println!("{:<16} {:>24.8}", token.symbol, balance);
            }
            for pos in ledger.lp_positions(address) {
                println!(
                    "pool {} lp={:.8} share={:.4}% x={:.8} y={:.8}",
                    pos.pool_index, pos.lp_amount, pos.share_percent, pos.amount_x, pos.amount_y
                );
            }
            for stake in ledger.stakes_of(address) {
                println!(
                    "stake token={} amount={:.8} rewards={:.8} locked_until={}",
                    stake.token_index, stake.amount, stake.rewards, stake.lock_until
                );
            }
        }
        Command::Chain => {
            for row in ledger.chain_summary() {
                println!(
                    "#{:<6} ts={:<12} txs={:<4} hash={} prev={}",
                    row.index, row.timestamp, row.tx_count, row.hash, row.prev_hash
                );
            }
        }
        Command::Quote { pool, token, amount } => {
            let token = resolve_token(ledger, token)?;
            let quote = ledger
                .state
                .get_pool(*pool)
                .and_then(|p| p.quote_swap(token as usize, *amount, ledger.params.swap_fee_bps))
                .ok_or("no quote: unknown pool, foreign token or empty reserves")?;
            println!(
                "in={:.8} (token {}) out={:.8} (token {}) fee={:.8}",
                quote.amount_in, quote.token_in, quote.amount_out, quote.token_out, quote.fee
            );
        }
        _ => {}
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut config = match &cli.config {
        Some(path) => LedgerConfig::load(path)?,
        None => LedgerConfig::default(),
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let store = SnapshotStore::new(&config.data_dir)?;
    let handle = LedgerHandle::open(store, config.params.clone())?;

    match &cli.command {
        Command::Init => {
            let genesis = handle.create_genesis()?;
            println!("genesis {}", hex::encode(genesis.hash));
        }
        Command::Validate { replay } => {
            if *replay {
                handle.verify_replay()?;
            } else {
                handle.validate()?;
            }
            println!("ledger valid");
        }
        command => {
            let snapshot = handle.snapshot()?;
            match build(&snapshot, command)? {
                Some(tx) => {
                    let timestamp = cli
                        .timestamp
                        .unwrap_or_else(now)
                        .max(snapshot.tip().map(|b| b.timestamp).unwrap_or(0));
                    let block = handle.submit(vec![tx], timestamp)?;
                    for tx in &block.transactions {
                        let split = EnergySplit::new(tx.energy, config.params.energy_binding_factor);
                        let len = encode_transaction(tx).len();
                        let (si, si_value) = best_fit_si(len);
                        let (bin, bin_value) = best_fit_binary(len);
                        println!(
                            "block {} {} size={}{} ({}{}) energy={:.9} bound={:.9} reward={:.9}",
                            block.index,
                            tx.kind,
                            si_value,
                            si.symbol,
                            bin_value,
                            bin.symbol,
                            tx.energy,
                            split.bound,
                            split.reward
                        );
                    }
                    println!("hash {}", hex::encode(block.hash));
                }
                None => report(&snapshot, command)?,
            }
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
