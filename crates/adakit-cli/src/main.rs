use adakit_types::constants::{DEFAULT_CLI_PATH, DEFAULT_VALIDITY_HORIZON, SOCKET_PATH_ENV};
use adakit_types::{Era, Margin, Network, Relay, SessionConfig};
use adakit_wallet::SelectionStrategy;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

/// Cardano wallet and stake pool tool driving the node command-line binary.
#[derive(Parser)]
#[command(name = "adakit")]
#[command(about = "Wallets, stake pools and transactions on top of cardano-cli")]
#[command(version)]
struct Cli {
    /// Network: mainnet, preprod, preview or a testnet magic number.
    #[arg(long, env = "ADAKIT_NETWORK", default_value = "mainnet")]
    network: Network,

    /// Ledger era flag passed to era-sensitive commands (e.g. babbage).
    #[arg(long, env = "ADAKIT_ERA")]
    era: Option<Era>,

    /// Directory holding priv/ and tmp/ (defaults to the data directory).
    #[arg(long, env = "ADAKIT_DIR")]
    working_dir: Option<PathBuf>,

    /// Node command-line binary.
    #[arg(long, env = "ADAKIT_CARDANO_CLI", default_value = DEFAULT_CLI_PATH)]
    cardano_cli: PathBuf,

    /// Node socket.
    #[arg(long, env = SOCKET_PATH_ENV)]
    socket_path: Option<PathBuf>,

    /// Slots past the tip at which new bodies stop being valid.
    #[arg(long, env = "ADAKIT_VALIDITY_HORIZON", default_value_t = DEFAULT_VALIDITY_HORIZON)]
    validity_horizon: u64,

    /// Tag namespacing this invocation's scratch files.
    #[arg(long, env = "ADAKIT_SESSION_TAG")]
    session_tag: Option<String>,

    /// Shelley genesis file (for KES period computation).
    #[arg(long, env = "ADAKIT_SHELLEY_GENESIS")]
    shelley_genesis: Option<PathBuf>,

    /// Log every node invocation.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the chain tip.
    Tip,

    /// Fetch and show protocol parameters.
    Params,

    /// List unspent outputs of an address or wallet.
    Utxo {
        /// Address to query.
        #[arg(long, conflicts_with = "wallet", required_unless_present = "wallet")]
        address: Option<String>,

        /// Wallet whose payment address to query.
        #[arg(long)]
        wallet: Option<String>,
    },

    /// Show a wallet: addresses, balance, rewards and delegation.
    Wallet { name: String },

    /// Show a pool: id and artifacts on disk.
    Pool { name: String },

    /// Generate payment and stake keys and addresses for a new wallet.
    KeygenWallet { name: String },

    /// Generate cold, KES and VRF keys for a new pool.
    KeygenPool { name: String },

    /// Issue a new operational certificate for a pool.
    IssueOpCert {
        pool: String,

        /// KES period (computed from the tip and genesis when omitted).
        #[arg(long)]
        kes_period: Option<u64>,
    },

    /// Show a pool's id.
    PoolId { pool: String },

    /// Hash a pool metadata file.
    MetadataHash { file: PathBuf },

    /// Address of a native script JSON file.
    ScriptAddress { file: PathBuf },

    /// Show what the node knows about an address.
    AddressInfo { address: String },

    /// Issue (and optionally submit) a certificate.
    Cert {
        #[command(subcommand)]
        command: CertCommand,
    },

    /// Build a raw transaction body.
    BuildRaw {
        /// Input as hash#index.
        #[arg(long = "tx-in", required = true)]
        tx_ins: Vec<String>,

        /// Output as address+lovelace.
        #[arg(long = "tx-out", required = true)]
        tx_outs: Vec<String>,

        /// Reward withdrawal as stake-address+lovelace.
        #[arg(long)]
        withdrawal: Option<String>,

        /// Fee in lovelace.
        #[arg(long, default_value_t = 0)]
        fee: u64,
    },

    /// Minimum fee of a body.
    Fee {
        #[arg(long)]
        tx_body_file: PathBuf,
        #[arg(long)]
        tx_in_count: usize,
        #[arg(long)]
        tx_out_count: usize,
        #[arg(long, default_value_t = 1)]
        witness_count: usize,
    },

    /// Sign a body with one or more keys.
    Sign {
        #[arg(long)]
        tx_body_file: PathBuf,
        #[arg(long = "signing-key-file", required = true)]
        signing_keys: Vec<PathBuf>,
        #[arg(long)]
        script_file: Option<PathBuf>,
    },

    /// Produce a detached witness.
    Witness {
        #[arg(long)]
        tx_body_file: PathBuf,
        #[arg(long)]
        signing_key_file: PathBuf,
        #[arg(long)]
        script_file: Option<PathBuf>,
    },

    /// Combine detached witnesses.
    Assemble {
        #[arg(long)]
        tx_body_file: PathBuf,
        #[arg(long = "witness-file", required = true)]
        witness_files: Vec<PathBuf>,
    },

    /// Submit a signed transaction.
    Submit {
        #[arg(long)]
        tx_file: PathBuf,
    },

    /// Transaction id of a body or signed transaction.
    Txid {
        #[arg(long, conflicts_with = "tx_file", required_unless_present = "tx_file")]
        tx_body_file: Option<PathBuf>,
        #[arg(long)]
        tx_file: Option<PathBuf>,
    },

    /// Send ADA from a wallet.
    Send {
        /// Paying wallet.
        wallet: String,

        /// Destination address.
        #[arg(long)]
        to: String,

        /// Amount in ADA (e.g. "1.5").
        #[arg(long)]
        amount: String,

        /// Input selection: all, best-fit, largest or smallest.
        #[arg(long, default_value = "all")]
        strategy: SelectionStrategy,
    },

    /// Withdraw a wallet's full reward balance.
    Withdraw { wallet: String },

    /// Convert ADA to lovelace.
    ToLovelace { ada: String },

    /// Convert lovelace to ADA.
    ToAda { lovelace: u64 },
}

#[derive(Subcommand)]
enum CertCommand {
    /// Stake key registration.
    StakeReg {
        wallet: String,
        /// Submit, funded and signed by the same wallet.
        #[arg(long)]
        submit: bool,
    },

    /// Stake key deregistration.
    StakeDereg {
        wallet: String,
        #[arg(long)]
        submit: bool,
    },

    /// Delegation of a wallet's stake to a pool.
    Delegate {
        wallet: String,
        #[arg(long)]
        pool_id: String,
        #[arg(long)]
        submit: bool,
    },

    /// Pool registration.
    PoolReg {
        pool: String,
        /// Pledge in lovelace.
        #[arg(long)]
        pledge: Option<u64>,
        /// Fixed cost per epoch in lovelace.
        #[arg(long)]
        cost: Option<u64>,
        /// Margin as a decimal fraction (e.g. 0.02).
        #[arg(long)]
        margin: Option<Margin>,
        #[arg(long)]
        metadata_url: Option<String>,
        #[arg(long)]
        metadata_hash: Option<String>,
        /// Wallet receiving the pool rewards.
        #[arg(long)]
        reward_account: Option<String>,
        /// Owner wallet (repeatable).
        #[arg(long = "owner")]
        owners: Vec<String>,
        /// Relay as host:port or multi:dns-name (repeatable).
        #[arg(long = "relay")]
        relays: Vec<Relay>,
        /// Submit, funded by this wallet.
        #[arg(long)]
        submit_from: Option<String>,
        /// Updating an existing registration: no pool deposit.
        #[arg(long)]
        reregister: bool,
    },

    /// Pool retirement.
    PoolRetire {
        pool: String,
        #[arg(long)]
        epoch: u64,
        #[arg(long)]
        submit_from: Option<String>,
    },
}

/// Application context shared across commands.
pub struct AppContext {
    config: SessionConfig,
}

impl AppContext {
    fn from_cli(cli: &Cli) -> Self {
        let working_dir = cli
            .working_dir
            .clone()
            .unwrap_or_else(|| default_working_dir(&cli.network));

        let mut config = SessionConfig::new(working_dir)
            .with_network(cli.network)
            .with_cli_path(cli.cardano_cli.clone())
            .with_validity_horizon(cli.validity_horizon);
        if let Some(era) = cli.era {
            config = config.with_era(era);
        }
        if let Some(ref socket) = cli.socket_path {
            config = config.with_socket_path(socket.clone());
        }
        if let Some(ref tag) = cli.session_tag {
            config = config.with_scratch_tag(tag.clone());
        }
        if let Some(ref genesis) = cli.shelley_genesis {
            config = config.with_shelley_genesis(genesis.clone());
        }

        Self { config }
    }
}

fn default_working_dir(network: &Network) -> PathBuf {
    let base = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("adakit");
    match network {
        Network::Mainnet => base.join("mainnet"),
        Network::Testnet { magic } => base.join(format!("testnet-{}", magic)),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let ctx = AppContext::from_cli(&cli);

    let result = match cli.command {
        Commands::Tip => commands::show_tip(&ctx).await,
        Commands::Params => commands::show_params(&ctx).await,
        Commands::Utxo { address, wallet } => commands::show_utxos(&ctx, address, wallet).await,
        Commands::Wallet { name } => commands::show_wallet(&ctx, &name).await,
        Commands::Pool { name } => commands::show_pool(&ctx, &name).await,
        Commands::KeygenWallet { name } => commands::keygen_wallet(&ctx, &name).await,
        Commands::KeygenPool { name } => commands::keygen_pool(&ctx, &name).await,
        Commands::IssueOpCert { pool, kes_period } => {
            commands::issue_op_cert(&ctx, &pool, kes_period).await
        }
        Commands::PoolId { pool } => commands::pool_id(&ctx, &pool).await,
        Commands::MetadataHash { file } => commands::metadata_hash(&ctx, &file).await,
        Commands::ScriptAddress { file } => commands::script_address(&ctx, &file).await,
        Commands::AddressInfo { address } => commands::address_info(&ctx, &address).await,
        Commands::Cert { command } => match command {
            CertCommand::StakeReg { wallet, submit } => {
                commands::stake_registration(&ctx, &wallet, submit).await
            }
            CertCommand::StakeDereg { wallet, submit } => {
                commands::stake_deregistration(&ctx, &wallet, submit).await
            }
            CertCommand::Delegate {
                wallet,
                pool_id,
                submit,
            } => commands::delegate(&ctx, &wallet, &pool_id, submit).await,
            CertCommand::PoolReg {
                pool,
                pledge,
                cost,
                margin,
                metadata_url,
                metadata_hash,
                reward_account,
                owners,
                relays,
                submit_from,
                reregister,
            } => {
                let request = adakit_wallet::PoolRegistrationRequest {
                    pledge,
                    cost,
                    margin,
                    metadata_url,
                    metadata_hash,
                    reward_account,
                    owners: Some(owners),
                    relays: Some(relays),
                };
                commands::pool_registration(&ctx, &pool, request, submit_from, reregister).await
            }
            CertCommand::PoolRetire {
                pool,
                epoch,
                submit_from,
            } => commands::pool_retirement(&ctx, &pool, epoch, submit_from).await,
        },
        Commands::BuildRaw {
            tx_ins,
            tx_outs,
            withdrawal,
            fee,
        } => commands::build_raw(&ctx, &tx_ins, &tx_outs, withdrawal, fee).await,
        Commands::Fee {
            tx_body_file,
            tx_in_count,
            tx_out_count,
            witness_count,
        } => {
            commands::min_fee(&ctx, tx_body_file, tx_in_count, tx_out_count, witness_count).await
        }
        Commands::Sign {
            tx_body_file,
            signing_keys,
            script_file,
        } => commands::sign(&ctx, tx_body_file, &signing_keys, script_file).await,
        Commands::Witness {
            tx_body_file,
            signing_key_file,
            script_file,
        } => commands::witness(&ctx, tx_body_file, &signing_key_file, script_file).await,
        Commands::Assemble {
            tx_body_file,
            witness_files,
        } => commands::assemble(&ctx, tx_body_file, witness_files).await,
        Commands::Submit { tx_file } => commands::submit(&ctx, tx_file).await,
        Commands::Txid {
            tx_body_file,
            tx_file,
        } => commands::txid(&ctx, tx_body_file, tx_file).await,
        Commands::Send {
            wallet,
            to,
            amount,
            strategy,
        } => commands::send(&ctx, &wallet, &to, &amount, strategy).await,
        Commands::Withdraw { wallet } => commands::withdraw(&ctx, &wallet).await,
        Commands::ToLovelace { ada } => commands::to_lovelace(&ada),
        Commands::ToAda { lovelace } => commands::to_ada(lovelace),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_context_from_flags() {
        let cli = Cli::parse_from([
            "adakit",
            "--network",
            "preprod",
            "--working-dir",
            "/srv/ada",
            "--era",
            "babbage",
            "--session-tag",
            "ci",
            "tip",
        ]);
        let ctx = AppContext::from_cli(&cli);
        assert_eq!(ctx.config.network, Network::Testnet { magic: 1 });
        assert_eq!(ctx.config.era, Some(Era::Babbage));
        assert_eq!(ctx.config.working_dir, PathBuf::from("/srv/ada"));
        assert_eq!(ctx.config.scratch_tag.as_deref(), Some("ci"));
        assert_eq!(ctx.config.validity_horizon, DEFAULT_VALIDITY_HORIZON);
    }

    #[test]
    fn test_pool_reg_collects_repeated_flags() {
        let cli = Cli::parse_from([
            "adakit",
            "cert",
            "pool-reg",
            "alpha",
            "--owner",
            "alice",
            "--owner",
            "bob",
            "--relay",
            "10.0.0.1:3001",
            "--relay",
            "multi:relays.example",
            "--margin",
            "0.03",
        ]);
        match cli.command {
            Commands::Cert {
                command:
                    CertCommand::PoolReg {
                        owners,
                        relays,
                        margin,
                        pledge,
                        ..
                    },
            } => {
                assert_eq!(owners, vec!["alice", "bob"]);
                assert_eq!(relays.len(), 2);
                assert_eq!(margin.map(|m| m.parts_per_billion()), Some(30_000_000));
                assert_eq!(pledge, None);
            }
            _ => panic!("wrong subcommand"),
        }
    }

    #[test]
    fn test_send_spends_every_output_by_default() {
        let cli = Cli::parse_from(["adakit", "send", "alice", "--to", "addr1x", "--amount", "4"]);
        match cli.command {
            Commands::Send { strategy, .. } => assert_eq!(strategy, SelectionStrategy::All),
            _ => panic!("wrong subcommand"),
        }

        let cli = Cli::parse_from([
            "adakit", "send", "alice", "--to", "addr1x", "--amount", "4", "--strategy", "best-fit",
        ]);
        match cli.command {
            Commands::Send { strategy, .. } => assert_eq!(strategy, SelectionStrategy::BestFit),
            _ => panic!("wrong subcommand"),
        }
    }
}
