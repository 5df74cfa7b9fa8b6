//! CLI command implementations.

use crate::AppContext;
use adakit_node::TxSource;
use adakit_tx::{
    FeeEstimator, Session, SignedTx, SubmissionClient, TransactionBuilder, TxBodyFile,
    WitnessCoordinator, WitnessFile,
};
use adakit_types::amount::{parse_ada, to_ada as format_ada};
use adakit_types::{ArtifactId, Certificate, Role, TxOut, UnspentOutput, Withdrawal};
use adakit_wallet::{
    ArtifactRegistry, CertificateBuilder, FsRegistry, KeyManager, PoolIdentity,
    PoolRegistrationRequest, RewardBalance, SelectionStrategy, UtxoSelector, Wallet,
};
use std::path::{Path, PathBuf};

type Result = std::result::Result<(), Box<dyn std::error::Error>>;

// ─── Helpers ────────────────────────────────────────────────────────────────

fn open_session(ctx: &AppContext) -> std::result::Result<Session, Box<dyn std::error::Error>> {
    Ok(Session::open(ctx.config.clone())?)
}

fn registry(ctx: &AppContext) -> FsRegistry {
    FsRegistry::from_config(&ctx.config)
}

fn format_lovelace(lovelace: u64) -> String {
    format!("{} ADA ({} lovelace)", format_ada(lovelace), lovelace)
}

fn print_certificate(cert: &Certificate) {
    println!("Certificate: {}", cert.path.display());
}

/// Submit certificates funded by `wallet`, printing the transaction id.
async fn submit_from(
    session: &Session,
    registry: &FsRegistry,
    wallet: &str,
    certificates: Vec<Certificate>,
    deposit: u64,
    refund: u64,
    extra_signers: &[PathBuf],
) -> Result {
    let wallet = Wallet::open(session, registry, wallet)?;
    let submitted = wallet
        .submit_certificates(certificates, deposit, refund, extra_signers)
        .await?;
    println!("Submitted: {}", submitted.txid);
    Ok(())
}

// ─── Chain ──────────────────────────────────────────────────────────────────

pub async fn show_tip(ctx: &AppContext) -> Result {
    let session = open_session(ctx)?;
    let tip = session.tip().await?;

    println!("Slot:     {}", tip.slot);
    if let Some(epoch) = tip.epoch {
        println!("Epoch:    {}", epoch);
    }
    if let Some(block) = tip.block {
        println!("Block:    {}", block);
    }
    if let Some(ref hash) = tip.hash {
        println!("Hash:     {}", hash);
    }
    if let Some(ref era) = tip.era {
        println!("Era:      {}", era);
    }
    if let Some(ref progress) = tip.sync_progress {
        println!("Synced:   {}%", progress);
    }
    Ok(())
}

pub async fn show_params(ctx: &AppContext) -> Result {
    let session = open_session(ctx)?;
    let params = session.refresh_parameters().await?;

    println!("Snapshot:          {}", session.parameter_cache().path().display());
    println!("Fee per byte:      {}", params.tx_fee_per_byte);
    println!("Fee constant:      {}", params.tx_fee_fixed);
    if let Some(size) = params.max_tx_size {
        println!("Max tx size:       {}", size);
    }
    println!("Key deposit:       {}", format_lovelace(params.stake_address_deposit));
    println!("Pool deposit:      {}", format_lovelace(params.stake_pool_deposit));
    Ok(())
}

pub async fn show_utxos(
    ctx: &AppContext,
    address: Option<String>,
    wallet: Option<String>,
) -> Result {
    let session = open_session(ctx)?;
    let address = match (address, wallet) {
        (Some(address), _) => address,
        (None, Some(name)) => {
            let registry = registry(ctx);
            Wallet::open(&session, &registry, name)?.payment_address().await?
        }
        (None, None) => return Err("either --address or --wallet is required".into()),
    };

    let utxos = UtxoSelector::new(session.node()).list(&address).await?;
    if utxos.is_empty() {
        println!("No unspent outputs at {}", address);
        return Ok(());
    }

    println!("{:<70} {:>20}", "Output", "Lovelace");
    println!("{}", "-".repeat(91));
    for utxo in &utxos {
        println!("{:<70} {:>20}", utxo.tx_in(), utxo.amount);
    }
    let total: u64 = utxos.iter().map(|u| u.amount).sum();
    println!();
    println!("Total: {} in {} output(s)", format_lovelace(total), utxos.len());
    Ok(())
}

// ─── Wallets and pools ──────────────────────────────────────────────────────

pub async fn show_wallet(ctx: &AppContext, name: &str) -> Result {
    let session = open_session(ctx)?;
    let registry = registry(ctx);
    let identity = Wallet::open(&session, &registry, name)?.identity().await?;

    println!("Wallet:     {}", identity.name);
    println!("Payment:    {}", identity.payment_address);
    println!("Staking:    {}", identity.staking_address);
    println!("Balance:    {}", format_lovelace(identity.balance));
    match identity.reward {
        RewardBalance::Registered(amount) => {
            println!("Rewards:    {}", format_lovelace(amount));
            match identity.delegation {
                Some(pool) => println!("Delegated:  {}", pool),
                None => println!("Delegated:  no"),
            }
        }
        RewardBalance::NotRegistered => println!("Rewards:    {}", identity.reward),
    }
    Ok(())
}

pub async fn show_pool(ctx: &AppContext, name: &str) -> Result {
    let session = open_session(ctx)?;
    let registry = registry(ctx);
    let pool = PoolIdentity::load(&session, &registry, name).await?;

    println!("Pool:    {}", pool.name);
    println!("Id:      {}", pool.pool_id);
    println!();
    for (role, path) in &pool.artifacts {
        println!("  {:<14} {}", role.suffix(), path.display());
    }
    Ok(())
}

pub async fn keygen_wallet(ctx: &AppContext, name: &str) -> Result {
    let session = open_session(ctx)?;
    let registry = registry(ctx);
    let addresses = KeyManager::new(&session, &registry).create_wallet(name).await?;

    println!("Wallet created: {}", name);
    println!("Payment address: {}", addresses.payment);
    println!("Stake address:   {}", addresses.stake);
    Ok(())
}

pub async fn keygen_pool(ctx: &AppContext, name: &str) -> Result {
    let session = open_session(ctx)?;
    let registry = registry(ctx);
    let pool_id = KeyManager::new(&session, &registry).create_pool(name).await?;

    println!("Pool created: {}", name);
    println!("Pool id:      {}", pool_id);
    println!();
    println!("Run 'issue-op-cert {}' before starting the block producer.", name);
    Ok(())
}

pub async fn issue_op_cert(ctx: &AppContext, pool: &str, kes_period: Option<u64>) -> Result {
    let session = open_session(ctx)?;
    let registry = registry(ctx);
    let cert = KeyManager::new(&session, &registry)
        .issue_op_cert(pool, kes_period)
        .await?;

    println!("Operational certificate: {}", cert.path.display());
    println!("KES period:              {}", cert.kes_period);
    Ok(())
}

pub async fn pool_id(ctx: &AppContext, pool: &str) -> Result {
    let session = open_session(ctx)?;
    let registry = registry(ctx);
    println!("{}", KeyManager::new(&session, &registry).pool_id(pool).await?);
    Ok(())
}

pub async fn metadata_hash(ctx: &AppContext, file: &Path) -> Result {
    let metadata = tokio::fs::read_to_string(file).await?;
    let session = open_session(ctx)?;
    let registry = registry(ctx);
    println!(
        "{}",
        KeyManager::new(&session, &registry).metadata_hash(&metadata).await?
    );
    Ok(())
}

pub async fn script_address(ctx: &AppContext, file: &Path) -> Result {
    let text = tokio::fs::read_to_string(file).await?;
    let script: serde_json::Value = serde_json::from_str(&text)?;
    let session = open_session(ctx)?;
    let registry = registry(ctx);
    println!(
        "{}",
        KeyManager::new(&session, &registry).script_address(&script).await?
    );
    Ok(())
}

pub async fn address_info(ctx: &AppContext, address: &str) -> Result {
    let session = open_session(ctx)?;
    let registry = registry(ctx);
    let info = KeyManager::new(&session, &registry).address_info(address).await?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

// ─── Certificates ───────────────────────────────────────────────────────────

pub async fn stake_registration(ctx: &AppContext, wallet: &str, submit: bool) -> Result {
    let session = open_session(ctx)?;
    let registry = registry(ctx);
    let cert = CertificateBuilder::new(session.node(), &registry)
        .stake_registration(wallet)
        .await?;
    print_certificate(&cert);

    if submit {
        let deposit = session.protocol_parameters().await?.stake_address_deposit;
        submit_from(&session, &registry, wallet, vec![cert], deposit, 0, &[]).await?;
    }
    Ok(())
}

pub async fn stake_deregistration(ctx: &AppContext, wallet: &str, submit: bool) -> Result {
    let session = open_session(ctx)?;
    let registry = registry(ctx);
    let cert = CertificateBuilder::new(session.node(), &registry)
        .stake_deregistration(wallet)
        .await?;
    print_certificate(&cert);

    if submit {
        let refund = session.protocol_parameters().await?.stake_address_deposit;
        submit_from(&session, &registry, wallet, vec![cert], 0, refund, &[]).await?;
    }
    Ok(())
}

pub async fn delegate(ctx: &AppContext, wallet: &str, pool_id: &str, submit: bool) -> Result {
    let session = open_session(ctx)?;
    let registry = registry(ctx);
    let cert = CertificateBuilder::new(session.node(), &registry)
        .stake_delegation(wallet, pool_id)
        .await?;
    print_certificate(&cert);

    if submit {
        submit_from(&session, &registry, wallet, vec![cert], 0, 0, &[]).await?;
    }
    Ok(())
}

pub async fn pool_registration(
    ctx: &AppContext,
    pool: &str,
    request: PoolRegistrationRequest,
    funding_wallet: Option<String>,
    reregister: bool,
) -> Result {
    let session = open_session(ctx)?;
    let registry = registry(ctx);
    let owners = request.owners.clone().unwrap_or_default();
    let cert = CertificateBuilder::new(session.node(), &registry)
        .pool_registration(pool, request)
        .await?;
    print_certificate(&cert);

    if let Some(wallet) = funding_wallet {
        let deposit = if reregister {
            0
        } else {
            session.protocol_parameters().await?.stake_pool_deposit
        };
        let mut signers = vec![registry.resolve(&ArtifactId::pool(pool, Role::NodeSkey))?];
        for owner in owners.iter().filter(|o| **o != wallet) {
            signers.push(registry.resolve(&ArtifactId::wallet(owner, Role::StakeSkey))?);
        }
        submit_from(&session, &registry, &wallet, vec![cert], deposit, 0, &signers).await?;
    }
    Ok(())
}

pub async fn pool_retirement(
    ctx: &AppContext,
    pool: &str,
    epoch: u64,
    funding_wallet: Option<String>,
) -> Result {
    let session = open_session(ctx)?;
    let registry = registry(ctx);
    let cert = CertificateBuilder::new(session.node(), &registry)
        .pool_retirement(pool, epoch)
        .await?;
    print_certificate(&cert);

    if let Some(wallet) = funding_wallet {
        let signers = vec![registry.resolve(&ArtifactId::pool(pool, Role::NodeSkey))?];
        submit_from(&session, &registry, &wallet, vec![cert], 0, 0, &signers).await?;
    }
    Ok(())
}

// ─── Raw transactions ───────────────────────────────────────────────────────

pub async fn build_raw(
    ctx: &AppContext,
    tx_ins: &[String],
    tx_outs: &[String],
    withdrawal: Option<String>,
    fee: u64,
) -> Result {
    let mut builder = TransactionBuilder::new().fee(fee);
    for tx_in in tx_ins {
        builder = builder.add_input(UnspentOutput::parse_ref(tx_in)?);
    }
    for tx_out in tx_outs {
        builder = builder.add_output(TxOut::parse(tx_out)?);
    }
    if let Some(withdrawal) = withdrawal {
        let out = TxOut::parse(&withdrawal)?;
        builder = builder.withdrawal(Withdrawal::new(out.address, out.amount));
    }

    let session = open_session(ctx)?;
    let draft = builder.build_raw(&session).await?;
    println!("Body:        {}", draft.body_file().path().display());
    println!("Valid until: slot {}", draft.body().validity_upper_bound);
    Ok(())
}

pub async fn min_fee(
    ctx: &AppContext,
    tx_body_file: PathBuf,
    tx_in_count: usize,
    tx_out_count: usize,
    witness_count: usize,
) -> Result {
    let session = open_session(ctx)?;
    let body = TxBodyFile::from_path(tx_body_file);
    let fee = FeeEstimator::new(&session)
        .estimate(&body, tx_in_count, tx_out_count, witness_count)
        .await?;
    println!("{}", format_lovelace(fee));
    Ok(())
}

pub async fn sign(
    ctx: &AppContext,
    tx_body_file: PathBuf,
    signing_keys: &[PathBuf],
    script_file: Option<PathBuf>,
) -> Result {
    let session = open_session(ctx)?;
    let body = TxBodyFile::from_path(tx_body_file);
    let signed = WitnessCoordinator::new(&session)
        .sign(&body, signing_keys, script_file.as_deref())
        .await?;
    println!("Signed: {}", signed.path().display());
    Ok(())
}

pub async fn witness(
    ctx: &AppContext,
    tx_body_file: PathBuf,
    signing_key_file: &Path,
    script_file: Option<PathBuf>,
) -> Result {
    let session = open_session(ctx)?;
    let body = TxBodyFile::from_path(tx_body_file);
    let witness = WitnessCoordinator::new(&session)
        .witness(&body, signing_key_file, script_file.as_deref())
        .await?;
    println!("Witness: {}", witness.path().display());
    Ok(())
}

pub async fn assemble(
    ctx: &AppContext,
    tx_body_file: PathBuf,
    witness_files: Vec<PathBuf>,
) -> Result {
    let session = open_session(ctx)?;
    let body = TxBodyFile::from_path(tx_body_file);
    let witnesses: Vec<WitnessFile> = witness_files.into_iter().map(WitnessFile::from_path).collect();
    let signed = WitnessCoordinator::new(&session)
        .assemble(&body, &witnesses)
        .await?;
    println!("Signed: {}", signed.path().display());
    Ok(())
}

pub async fn submit(ctx: &AppContext, tx_file: PathBuf) -> Result {
    let session = open_session(ctx)?;
    let submitted = SubmissionClient::new(&session)
        .submit(SignedTx::from_path(tx_file))
        .await?;
    println!("Submitted: {}", submitted.txid);
    Ok(())
}

pub async fn txid(
    ctx: &AppContext,
    tx_body_file: Option<PathBuf>,
    tx_file: Option<PathBuf>,
) -> Result {
    let source = match (tx_body_file, tx_file) {
        (Some(body), None) => TxSource::Body(body),
        (None, Some(signed)) => TxSource::Signed(signed),
        _ => return Err("give exactly one of --tx-body-file and --tx-file".into()),
    };
    let session = open_session(ctx)?;
    println!("{}", session.txid(&source).await?);
    Ok(())
}

// ─── Wallet flows ───────────────────────────────────────────────────────────

pub async fn send(
    ctx: &AppContext,
    wallet: &str,
    to: &str,
    amount: &str,
    strategy: SelectionStrategy,
) -> Result {
    let lovelace = parse_ada(amount)?;
    if lovelace == 0 {
        return Err("amount must be greater than zero".into());
    }
    let session = open_session(ctx)?;
    let registry = registry(ctx);
    let wallet = Wallet::open(&session, &registry, wallet)?;

    println!("Sending {} to {}", format_lovelace(lovelace), to);
    let submitted = wallet
        .send(vec![TxOut::new(to, lovelace)], strategy)
        .await?;
    println!("Submitted: {}", submitted.txid);
    Ok(())
}

pub async fn withdraw(ctx: &AppContext, wallet: &str) -> Result {
    let session = open_session(ctx)?;
    let registry = registry(ctx);
    let wallet = Wallet::open(&session, &registry, wallet)?;
    let submitted = wallet.withdraw_rewards().await?;
    println!("Submitted: {}", submitted.txid);
    Ok(())
}

// ─── Units ──────────────────────────────────────────────────────────────────

pub fn to_lovelace(ada: &str) -> Result {
    println!("{}", parse_ada(ada)?);
    Ok(())
}

pub fn to_ada(lovelace: u64) -> Result {
    println!("{}", format_ada(lovelace));
    Ok(())
}
