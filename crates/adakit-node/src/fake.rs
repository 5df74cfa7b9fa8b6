//! In-process stand-in for the node command-line interface.
//!
//! [`FakeNode`] implements [`CommandRunner`] and answers the same argument
//! lists the real binary accepts. It keeps a small ledger (tip, UTXOs,
//! registered stake addresses) and writes text-envelope artifacts whose
//! `cborHex` carries hex-encoded JSON instead of CBOR. Identifiers are
//! derived with SHA-256, so everything is deterministic.
//!
//! The ledger rules are few: a submitted transaction must carry
//! at least one witness, every known key it spends from must have signed, its
//! validity bound must lie past the tip, its inputs must exist and its value
//! must balance. Anything else is accepted.

use crate::runner::{CommandOutput, CommandRunner};
use adakit_types::UnspentOutput;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Bytes a single vkey witness adds to a transaction.
pub const WITNESS_BYTES: u64 = 109;

const EPOCH_LENGTH: u64 = 86_400;
const DEFAULT_TIP: u64 = 1_000;

/// Emulated node.
pub struct FakeNode {
    state: Mutex<State>,
}

struct State {
    tip: u64,
    params: Value,
    utxos: BTreeMap<String, Vec<UnspentOutput>>,
    /// Registered stake addresses and their reward balance.
    rewards: BTreeMap<String, u64>,
    delegations: BTreeMap<String, String>,
    pools: BTreeSet<String>,
    /// Key hash that must witness spends from an address it built.
    owners: BTreeMap<String, String>,
    calls: Vec<Vec<String>>,
    submitted: Vec<String>,
    seed_counter: u64,
    reject_next_submit: Option<String>,
}

impl Default for FakeNode {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeNode {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                tip: DEFAULT_TIP,
                params: default_params(),
                utxos: BTreeMap::new(),
                rewards: BTreeMap::new(),
                delegations: BTreeMap::new(),
                pools: BTreeSet::new(),
                owners: BTreeMap::new(),
                calls: Vec::new(),
                submitted: Vec::new(),
                seed_counter: 0,
                reject_next_submit: None,
            }),
        }
    }

    pub fn with_tip(self, slot: u64) -> Self {
        self.set_tip(slot);
        self
    }

    pub fn set_tip(&self, slot: u64) {
        self.lock().tip = slot;
    }

    /// Override one protocol parameter.
    pub fn set_param(&self, key: &str, value: Value) {
        if let Some(map) = self.lock().params.as_object_mut() {
            map.insert(key.to_string(), value);
        }
    }

    /// Fund `address` with a fresh output and return it.
    pub fn add_utxo(&self, address: &str, amount: u64) -> UnspentOutput {
        let mut state = self.lock();
        state.seed_counter += 1;
        let hash = sha256_hex(format!("genesis-{}", state.seed_counter).as_bytes());
        let utxo = UnspentOutput::new(hash, 0, amount);
        state
            .utxos
            .entry(address.to_string())
            .or_default()
            .push(utxo.clone());
        utxo
    }

    /// Register `stake_address` with the given reward balance.
    pub fn set_reward(&self, stake_address: &str, amount: u64) {
        self.lock().rewards.insert(stake_address.to_string(), amount);
    }

    pub fn reward(&self, stake_address: &str) -> Option<u64> {
        self.lock().rewards.get(stake_address).copied()
    }

    pub fn delegation(&self, stake_address: &str) -> Option<String> {
        self.lock().delegations.get(stake_address).cloned()
    }

    /// Make the next submission fail with `message`.
    pub fn reject_next_submit(&self, message: &str) {
        self.lock().reject_next_submit = Some(message.to_string());
    }

    pub fn utxos(&self, address: &str) -> Vec<UnspentOutput> {
        self.lock().utxos.get(address).cloned().unwrap_or_default()
    }

    /// Every argument list received so far.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.lock().calls.clone()
    }

    /// Number of calls to a subcommand such as `"transaction build-raw"`.
    pub fn call_count(&self, subcommand: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.len() >= 2 && format!("{} {}", c[0], c[1]) == subcommand)
            .count()
    }

    /// Ids of accepted transactions, in submission order.
    pub fn submitted(&self) -> Vec<String> {
        self.lock().submitted.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CommandRunner for FakeNode {
    async fn run(&self, _program: &Path, args: &[String]) -> std::io::Result<CommandOutput> {
        let result = {
            let mut state = self.lock();
            state.calls.push(args.to_vec());
            state.dispatch(&Args(args))
        };
        Ok(match result {
            Ok(stdout) => CommandOutput::ok(stdout),
            Err(message) => CommandOutput::failed(1, format!("Command failed: {}", message)),
        })
    }
}

fn default_params() -> Value {
    json!({
        "txFeePerByte": 44,
        "txFeeFixed": 155381,
        "maxTxSize": 16384,
        "stakeAddressDeposit": 2000000,
        "stakePoolDeposit": 500000000,
        "minPoolCost": 340000000,
        "protocolVersion": { "major": 8, "minor": 0 }
    })
}

// =============================================================================
// Argument access
// =============================================================================

struct Args<'a>(&'a [String]);

impl<'a> Args<'a> {
    fn command(&self) -> String {
        self.0.iter().take(2).cloned().collect::<Vec<_>>().join(" ")
    }

    fn value(&self, flag: &str) -> Option<&'a str> {
        self.0
            .windows(2)
            .find(|w| w[0] == flag)
            .map(|w| w[1].as_str())
    }

    fn values(&self, flag: &str) -> Vec<&'a str> {
        self.0
            .windows(2)
            .filter(|w| w[0] == flag)
            .map(|w| w[1].as_str())
            .collect()
    }

    fn require(&self, flag: &str) -> Result<&'a str, String> {
        self.value(flag).ok_or_else(|| format!("Missing: {}", flag))
    }

    fn path(&self, flag: &str) -> Result<PathBuf, String> {
        self.require(flag).map(PathBuf::from)
    }

    fn number(&self, flag: &str) -> Result<u64, String> {
        let raw = self.require(flag)?;
        raw.parse()
            .map_err(|_| format!("invalid value for {}: {}", flag, raw))
    }

    fn mainnet(&self) -> bool {
        self.0.iter().any(|a| a == "--mainnet")
    }
}

// =============================================================================
// Artifacts
// =============================================================================

#[derive(Serialize, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    description: String,
    #[serde(rename = "cborHex")]
    cbor_hex: String,
}

#[derive(Serialize, Deserialize)]
struct Body {
    inputs: Vec<String>,
    outputs: Vec<String>,
    certificates: Vec<Value>,
    withdrawal: Option<String>,
    fee: u64,
    ttl: u64,
}

#[derive(Serialize, Deserialize)]
struct Signed {
    body: String,
    witnesses: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct Witness {
    body_id: String,
    key: String,
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn write_envelope(path: &Path, kind: &str, description: &str, payload: &[u8]) -> Result<(), String> {
    let envelope = Envelope {
        kind: kind.to_string(),
        description: description.to_string(),
        cbor_hex: hex::encode(payload),
    };
    let text = serde_json::to_string_pretty(&envelope).map_err(|e| e.to_string())?;
    std::fs::write(path, text).map_err(|e| format!("{}: {}", path.display(), e))
}

fn read_envelope(path: &Path) -> Result<(String, Vec<u8>), String> {
    let text = std::fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    let envelope: Envelope = serde_json::from_str(&text)
        .map_err(|e| format!("{}: not a text envelope: {}", path.display(), e))?;
    let payload = hex::decode(&envelope.cbor_hex)
        .map_err(|e| format!("{}: bad cborHex: {}", path.display(), e))?;
    Ok((envelope.kind, payload))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, expected: &str) -> Result<T, String> {
    let (kind, payload) = read_envelope(path)?;
    if !kind.starts_with(expected) {
        return Err(format!("{}: expected {}, found {}", path.display(), expected, kind));
    }
    serde_json::from_slice(&payload).map_err(|e| format!("{}: {}", path.display(), e))
}

/// Key hash shared by both halves of a key pair.
fn key_hash(path: &Path) -> Result<String, String> {
    let (_, seed) = read_envelope(path)?;
    Ok(sha256_hex(&seed)[..56].to_string())
}

fn payment_address(mainnet: bool, payment: &str, stake: Option<&str>) -> String {
    let prefix = if mainnet { "addr1" } else { "addr_test1" };
    let digest = sha256_hex(format!("{}{}", payment, stake.unwrap_or("")).as_bytes());
    format!("{}{}", prefix, &digest[..50])
}

fn stake_address(mainnet: bool, stake: &str) -> String {
    let prefix = if mainnet { "stake1" } else { "stake_test1" };
    format!("{}{}", prefix, &sha256_hex(format!("stake{}", stake).as_bytes())[..50])
}

fn pool_id(cold: &str) -> String {
    format!("pool1{}", &sha256_hex(format!("pool{}", cold).as_bytes())[..50])
}

fn split_amount(value: &str) -> Result<(String, u64), String> {
    let (target, amount) = value
        .rsplit_once('+')
        .ok_or_else(|| format!("malformed value: {}", value))?;
    let amount = amount
        .parse()
        .map_err(|_| format!("malformed amount: {}", value))?;
    Ok((target.to_string(), amount))
}

// =============================================================================
// Command handlers
// =============================================================================

impl State {
    fn dispatch(&mut self, args: &Args<'_>) -> Result<String, String> {
        match args.command().as_str() {
            "query tip" => self.query_tip(),
            "query protocol-parameters" => self.query_params(args),
            "query stake-address-info" => self.query_stake(args),
            "query utxo" => self.query_utxo(args),
            "address key-gen" => self.key_gen(args, "PaymentVerificationKeyShelley_ed25519", "PaymentSigningKeyShelley_ed25519"),
            "stake-address key-gen" => self.key_gen(args, "StakeVerificationKeyShelley_ed25519", "StakeSigningKeyShelley_ed25519"),
            "node key-gen-KES" => self.key_gen(args, "KesVerificationKey_ed25519_kes_2^6", "KesSigningKey_ed25519_kes_2^6"),
            "node key-gen-VRF" => self.key_gen(args, "VrfVerificationKey_PraosVRF", "VrfSigningKey_PraosVRF"),
            "node key-gen" => self.node_key_gen(args),
            "node issue-op-cert" => self.issue_op_cert(args),
            "address build" => self.address_build(args),
            "stake-address build" => self.stake_address_build(args),
            "address key-hash" => key_hash(&args.path("--payment-verification-key-file")?),
            "stake-address key-hash" => key_hash(&args.path("--staking-verification-key-file")?),
            "address info" => address_info(args),
            "address build-script" => build_script(args),
            "stake-pool id" => Ok(pool_id(&key_hash(&args.path("--cold-verification-key-file")?)?)),
            "stake-pool metadata-hash" => {
                let path = args.path("--pool-metadata-file")?;
                let bytes = std::fs::read(&path).map_err(|e| format!("{}: {}", path.display(), e))?;
                Ok(sha256_hex(&bytes))
            }
            "stake-address registration-certificate" => self.stake_cert(args, "stake_registration"),
            "stake-address deregistration-certificate" => self.stake_cert(args, "stake_deregistration"),
            "stake-address delegation-certificate" => self.stake_cert(args, "stake_delegation"),
            "stake-pool registration-certificate" => self.pool_registration(args),
            "stake-pool deregistration-certificate" => self.pool_retirement(args),
            "transaction build-raw" => self.build_raw(args),
            "transaction calculate-min-fee" => min_fee(args),
            "transaction sign" => sign(args),
            "transaction witness" => witness(args),
            "transaction assemble" => assemble(args),
            "transaction txid" => txid(args),
            "transaction submit" => self.submit(args),
            other => Err(format!("Invalid argument `{}`", other)),
        }
    }

    fn query_tip(&self) -> Result<String, String> {
        let tip = json!({
            "block": self.tip / 20,
            "epoch": self.tip / EPOCH_LENGTH,
            "era": "Babbage",
            "hash": sha256_hex(format!("block{}", self.tip).as_bytes()),
            "slot": self.tip,
            "syncProgress": "100.00"
        });
        serde_json::to_string_pretty(&tip).map_err(|e| e.to_string())
    }

    fn query_params(&self, args: &Args<'_>) -> Result<String, String> {
        let out = args.path("--out-file")?;
        let text = serde_json::to_string_pretty(&self.params).map_err(|e| e.to_string())?;
        std::fs::write(&out, text).map_err(|e| format!("{}: {}", out.display(), e))?;
        Ok(String::new())
    }

    fn query_stake(&self, args: &Args<'_>) -> Result<String, String> {
        let address = args.require("--address")?;
        let entries: Vec<Value> = match self.rewards.get(address) {
            Some(balance) => vec![json!({
                "address": address,
                "delegation": self.delegations.get(address),
                "rewardAccountBalance": balance
            })],
            None => Vec::new(),
        };
        serde_json::to_string_pretty(&entries).map_err(|e| e.to_string())
    }

    fn query_utxo(&self, args: &Args<'_>) -> Result<String, String> {
        let address = args.require("--address")?;
        let mut out = String::new();
        out.push_str("                           TxHash                                 TxIx        Amount\n");
        out.push_str(&"-".repeat(86));
        out.push('\n');
        for utxo in self.utxos.get(address).into_iter().flatten() {
            out.push_str(&format!(
                "{}     {}        {} lovelace + TxOutDatumNone\n",
                utxo.tx_hash, utxo.output_index, utxo.amount
            ));
        }
        Ok(out)
    }

    fn next_seed(&mut self) -> Vec<u8> {
        self.seed_counter += 1;
        Sha256::digest(format!("adakit-fake-key-{}", self.seed_counter).as_bytes()).to_vec()
    }

    fn key_gen(&mut self, args: &Args<'_>, vkey_type: &str, skey_type: &str) -> Result<String, String> {
        let vkey = args.path("--verification-key-file")?;
        let skey = args.path("--signing-key-file")?;
        let seed = self.next_seed();
        write_envelope(&vkey, vkey_type, "Verification Key", &seed)?;
        write_envelope(&skey, skey_type, "Signing Key", &seed)?;
        Ok(String::new())
    }

    fn node_key_gen(&mut self, args: &Args<'_>) -> Result<String, String> {
        let vkey = args.path("--cold-verification-key-file")?;
        let skey = args.path("--cold-signing-key-file")?;
        let counter = args.path("--operational-certificate-issue-counter")?;
        let seed = self.next_seed();
        write_envelope(&vkey, "StakePoolVerificationKey_ed25519", "Stake Pool Operator Verification Key", &seed)?;
        write_envelope(&skey, "StakePoolSigningKey_ed25519", "Stake Pool Operator Signing Key", &seed)?;
        write_counter(&counter, 0)?;
        Ok(String::new())
    }

    fn issue_op_cert(&mut self, args: &Args<'_>) -> Result<String, String> {
        let kes = key_hash(&args.path("--kes-verification-key-file")?)?;
        let cold = key_hash(&args.path("--cold-signing-key-file")?)?;
        let counter_path = args.path("--operational-certificate-issue-counter")?;
        let kes_period = args.number("--kes-period")?;
        let out = args.path("--out-file")?;
        let issue: u64 = read_json::<Value>(&counter_path, "NodeOperationalCertificateIssueCounter")?
            .get("issue")
            .and_then(Value::as_u64)
            .ok_or_else(|| format!("{}: malformed counter", counter_path.display()))?;
        let payload = json!({ "cold": cold, "kes": kes, "kes_period": kes_period, "issue": issue });
        write_envelope(&out, "NodeOperationalCertificate", "", payload.to_string().as_bytes())?;
        write_counter(&counter_path, issue + 1)?;
        Ok(String::new())
    }

    fn address_build(&mut self, args: &Args<'_>) -> Result<String, String> {
        let payment = key_hash(&args.path("--payment-verification-key-file")?)?;
        let stake = match args.value("--staking-verification-key-file") {
            Some(p) => Some(key_hash(Path::new(p))?),
            None => None,
        };
        let out = args.path("--out-file")?;
        let address = payment_address(args.mainnet(), &payment, stake.as_deref());
        std::fs::write(&out, &address).map_err(|e| format!("{}: {}", out.display(), e))?;
        self.owners.insert(address, payment);
        Ok(String::new())
    }

    fn stake_address_build(&mut self, args: &Args<'_>) -> Result<String, String> {
        let stake = key_hash(&args.path("--staking-verification-key-file")?)?;
        let out = args.path("--out-file")?;
        let address = stake_address(args.mainnet(), &stake);
        std::fs::write(&out, &address).map_err(|e| format!("{}: {}", out.display(), e))?;
        self.owners.insert(address, stake);
        Ok(String::new())
    }

    fn stake_cert(&mut self, args: &Args<'_>, kind: &str) -> Result<String, String> {
        let stake = key_hash(&args.path("--staking-verification-key-file")?)?;
        let out = args.path("--out-file")?;
        let mut payload = json!({ "kind": kind, "stake_key": stake });
        if kind == "stake_delegation" {
            payload["pool_id"] = json!(args.require("--stake-pool-id")?);
        }
        write_envelope(&out, "CertificateShelley", kind, payload.to_string().as_bytes())?;
        Ok(String::new())
    }

    fn pool_registration(&mut self, args: &Args<'_>) -> Result<String, String> {
        let cold = key_hash(&args.path("--cold-verification-key-file")?)?;
        key_hash(&args.path("--vrf-verification-key-file")?)?;
        key_hash(&args.path("--pool-reward-account-verification-key-file")?)?;
        let owners = args.values("--pool-owner-stake-verification-key-file");
        if owners.is_empty() {
            return Err("Missing: --pool-owner-stake-verification-key-file".to_string());
        }
        let owners = owners
            .into_iter()
            .map(|p| key_hash(Path::new(p)))
            .collect::<Result<Vec<_>, _>>()?;
        let payload = json!({
            "kind": "pool_registration",
            "pool_id": pool_id(&cold),
            "cold_key": cold,
            "owners": owners,
            "pledge": args.number("--pool-pledge")?,
            "cost": args.number("--pool-cost")?,
            "margin": args.require("--pool-margin")?,
            "metadata_url": args.require("--metadata-url")?,
            "metadata_hash": args.require("--metadata-hash")?,
            "relays": args.values("--pool-relay-port").len()
                + args.values("--multi-host-pool-relay").len(),
        });
        let out = args.path("--out-file")?;
        write_envelope(&out, "CertificateShelley", "Stake Pool Registration Certificate", payload.to_string().as_bytes())?;
        Ok(String::new())
    }

    fn pool_retirement(&mut self, args: &Args<'_>) -> Result<String, String> {
        let cold = key_hash(&args.path("--cold-verification-key-file")?)?;
        let epoch = args.number("--epoch")?;
        let out = args.path("--out-file")?;
        let payload = json!({
            "kind": "pool_retirement",
            "pool_id": pool_id(&cold),
            "cold_key": cold,
            "epoch": epoch,
        });
        write_envelope(&out, "CertificateShelley", "Stake Pool Retirement Certificate", payload.to_string().as_bytes())?;
        Ok(String::new())
    }

    fn build_raw(&mut self, args: &Args<'_>) -> Result<String, String> {
        let certificates = args
            .values("--certificate-file")
            .into_iter()
            .map(|p| read_json::<Value>(Path::new(p), "Certificate"))
            .collect::<Result<Vec<_>, _>>()?;
        let body = Body {
            inputs: args.values("--tx-in").into_iter().map(String::from).collect(),
            outputs: args.values("--tx-out").into_iter().map(String::from).collect(),
            certificates,
            withdrawal: args.value("--withdrawal").map(String::from),
            fee: args.number("--fee")?,
            ttl: args.number("--invalid-hereafter")?,
        };
        if body.inputs.is_empty() {
            return Err("Missing: --tx-in".to_string());
        }
        let out = args.path("--out-file")?;
        let bytes = serde_json::to_vec(&body).map_err(|e| e.to_string())?;
        write_envelope(&out, "TxBodyBabbage", "", &bytes)?;
        Ok(String::new())
    }

    fn deposit(&self, key: &str, alias: &str) -> u64 {
        self.params
            .get(key)
            .or_else(|| self.params.get(alias))
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }

    fn submit(&mut self, args: &Args<'_>) -> Result<String, String> {
        let mainnet = args.mainnet();
        let signed: Signed = read_json(&args.path("--tx-file")?, "Witnessed Tx")?;
        let body_bytes = hex::decode(&signed.body).map_err(|e| e.to_string())?;
        let body: Body = serde_json::from_slice(&body_bytes).map_err(|e| e.to_string())?;

        if let Some(message) = self.reject_next_submit.take() {
            return Err(message);
        }
        if signed.witnesses.is_empty() {
            return Err("ShelleyTxValidationError (MissingVKeyWitnessesUTXOW)".to_string());
        }
        if body.ttl <= self.tip {
            return Err(format!(
                "ShelleyTxValidationError (ExpiredUTxO {{ ttl = {}, slot = {} }})",
                body.ttl, self.tip
            ));
        }
        if body.fee == 0 {
            return Err("ShelleyTxValidationError (FeeTooSmallUTxO)".to_string());
        }

        let witnesses: BTreeSet<&str> = signed.witnesses.iter().map(String::as_str).collect();
        let mut required: BTreeSet<String> = BTreeSet::new();

        // Inputs
        let mut spent = Vec::new();
        let mut in_total: u128 = 0;
        for input in &body.inputs {
            let (address, position) = self
                .utxos
                .iter()
                .find_map(|(addr, list)| {
                    list.iter()
                        .position(|u| &u.tx_in() == input)
                        .map(|i| (addr.clone(), i))
                })
                .ok_or_else(|| format!("ShelleyTxValidationError (BadInputsUTxO {})", input))?;
            in_total += self.utxos[&address][position].amount as u128;
            if let Some(owner) = self.owners.get(&address) {
                required.insert(owner.clone());
            }
            spent.push(input.clone());
        }

        // Withdrawal
        let mut withdrawn = None;
        if let Some(ref w) = body.withdrawal {
            let (stake, amount) = split_amount(w)?;
            match self.rewards.get(&stake) {
                Some(&balance) if balance == amount => {}
                _ => {
                    return Err(format!(
                        "ShelleyTxValidationError (WithdrawalsNotInRewardsDELEGS {})",
                        w
                    ))
                }
            }
            if let Some(owner) = self.owners.get(&stake) {
                required.insert(owner.clone());
            }
            in_total += amount as u128;
            withdrawn = Some(stake);
        }

        // Certificates
        let key_deposit = self.deposit("stakeAddressDeposit", "keyDeposit");
        let pool_deposit = self.deposit("stakePoolDeposit", "poolDeposit");
        let mut deposits: u128 = 0;
        for cert in &body.certificates {
            let field = |name: &str| cert.get(name).and_then(Value::as_str).unwrap_or("").to_string();
            match field("kind").as_str() {
                "stake_registration" => {
                    let stake = stake_address(mainnet, &field("stake_key"));
                    if self.rewards.contains_key(&stake) {
                        return Err("ShelleyTxValidationError (StakeKeyAlreadyRegisteredDELEG)".to_string());
                    }
                    deposits += key_deposit as u128;
                }
                "stake_deregistration" => {
                    let stake = stake_address(mainnet, &field("stake_key"));
                    if !self.rewards.contains_key(&stake) {
                        return Err("ShelleyTxValidationError (StakeKeyNotRegisteredDELEG)".to_string());
                    }
                    in_total += key_deposit as u128;
                    required.insert(field("stake_key"));
                }
                "stake_delegation" => {
                    required.insert(field("stake_key"));
                }
                "pool_registration" => {
                    if !self.pools.contains(&field("pool_id")) {
                        deposits += pool_deposit as u128;
                    }
                    required.insert(field("cold_key"));
                }
                "pool_retirement" => {
                    required.insert(field("cold_key"));
                }
                other => return Err(format!("unknown certificate kind {}", other)),
            }
        }

        if let Some(missing) = required.iter().find(|k| !witnesses.contains(k.as_str())) {
            return Err(format!(
                "ShelleyTxValidationError (MissingVKeyWitnessesUTXOW {})",
                missing
            ));
        }

        // Outputs
        let mut outputs = Vec::new();
        let mut out_total: u128 = 0;
        for output in &body.outputs {
            let (address, amount) = split_amount(output)?;
            out_total += amount as u128;
            outputs.push((address, amount));
        }
        let consumed = in_total;
        let produced = out_total + body.fee as u128 + deposits;
        if consumed != produced {
            return Err(format!(
                "ShelleyTxValidationError (ValueNotConservedUTxO consumed {} produced {})",
                consumed, produced
            ));
        }

        // Apply
        let id = sha256_hex(&body_bytes);
        for list in self.utxos.values_mut() {
            list.retain(|u| !spent.contains(&u.tx_in()));
        }
        for (index, (address, amount)) in outputs.into_iter().enumerate() {
            self.utxos
                .entry(address)
                .or_default()
                .push(UnspentOutput::new(id.clone(), index as u32, amount));
        }
        if let Some(stake) = withdrawn {
            self.rewards.insert(stake, 0);
        }
        for cert in &body.certificates {
            let field = |name: &str| cert.get(name).and_then(Value::as_str).unwrap_or("").to_string();
            match field("kind").as_str() {
                "stake_registration" => {
                    self.rewards.insert(stake_address(mainnet, &field("stake_key")), 0);
                }
                "stake_deregistration" => {
                    let stake = stake_address(mainnet, &field("stake_key"));
                    self.rewards.remove(&stake);
                    self.delegations.remove(&stake);
                }
                "stake_delegation" => {
                    let stake = stake_address(mainnet, &field("stake_key"));
                    self.delegations.insert(stake, field("pool_id"));
                }
                "pool_registration" => {
                    self.pools.insert(field("pool_id"));
                }
                _ => {}
            }
        }
        self.submitted.push(id);
        Ok("Transaction successfully submitted.\n".to_string())
    }
}

fn write_counter(path: &Path, issue: u64) -> Result<(), String> {
    let payload = json!({ "issue": issue });
    write_envelope(
        path,
        "NodeOperationalCertificateIssueCounter",
        &format!("Next certificate issue number: {}", issue),
        payload.to_string().as_bytes(),
    )
}

fn address_info(args: &Args<'_>) -> Result<String, String> {
    let address = args.require("--address")?;
    let kind = if address.starts_with("stake") { "stake" } else { "payment" };
    let info = json!({
        "address": address,
        "base16": hex::encode(address),
        "encoding": "bech32",
        "era": "shelley",
        "type": kind
    });
    serde_json::to_string_pretty(&info).map_err(|e| e.to_string())
}

fn build_script(args: &Args<'_>) -> Result<String, String> {
    let path = args.path("--script-file")?;
    let text = std::fs::read_to_string(&path).map_err(|e| format!("{}: {}", path.display(), e))?;
    serde_json::from_str::<Value>(&text).map_err(|e| format!("{}: {}", path.display(), e))?;
    let prefix = if args.mainnet() { "addr1w" } else { "addr_test1w" };
    Ok(format!("{}{}", prefix, &sha256_hex(text.as_bytes())[..50]))
}

fn min_fee(args: &Args<'_>) -> Result<String, String> {
    let (_, body) = read_envelope(&args.path("--tx-body-file")?)?;
    let witnesses = args.number("--witness-count")?;
    args.number("--tx-in-count")?;
    args.number("--tx-out-count")?;
    let params_path = args.path("--protocol-params-file")?;
    let text = std::fs::read_to_string(&params_path)
        .map_err(|e| format!("{}: {}", params_path.display(), e))?;
    let params: Value = serde_json::from_str(&text).map_err(|e| e.to_string())?;
    let coefficient = |a: &str, b: &str| {
        params
            .get(a)
            .or_else(|| params.get(b))
            .and_then(Value::as_u64)
            .ok_or_else(|| format!("protocol parameters lack {}", a))
    };
    let per_byte = coefficient("txFeePerByte", "minFeeA")?;
    let fixed = coefficient("txFeeFixed", "minFeeB")?;
    let size = body.len() as u64 + witnesses * WITNESS_BYTES;
    Ok(format!("{} Lovelace\n", per_byte * size + fixed))
}

fn sign(args: &Args<'_>) -> Result<String, String> {
    let (_, body) = read_envelope(&args.path("--tx-body-file")?)?;
    let keys = args.values("--signing-key-file");
    if keys.is_empty() {
        return Err("Missing: --signing-key-file".to_string());
    }
    let witnesses = keys
        .into_iter()
        .map(|k| key_hash(Path::new(k)))
        .collect::<Result<BTreeSet<_>, _>>()?;
    write_signed(&args.path("--out-file")?, &body, witnesses)
}

fn witness(args: &Args<'_>) -> Result<String, String> {
    let (_, body) = read_envelope(&args.path("--tx-body-file")?)?;
    let key = key_hash(&args.path("--signing-key-file")?)?;
    let payload = Witness {
        body_id: sha256_hex(&body),
        key,
    };
    let bytes = serde_json::to_vec(&payload).map_err(|e| e.to_string())?;
    write_envelope(&args.path("--out-file")?, "TxWitness BabbageEra", "", &bytes)?;
    Ok(String::new())
}

fn assemble(args: &Args<'_>) -> Result<String, String> {
    let (_, body) = read_envelope(&args.path("--tx-body-file")?)?;
    let body_id = sha256_hex(&body);
    let mut witnesses = BTreeSet::new();
    for file in args.values("--witness-file") {
        let w: Witness = read_json(Path::new(file), "TxWitness")?;
        if w.body_id != body_id {
            return Err(format!("{}: witness was made for a different transaction body", file));
        }
        witnesses.insert(w.key);
    }
    write_signed(&args.path("--out-file")?, &body, witnesses)
}

fn write_signed(out: &Path, body: &[u8], witnesses: BTreeSet<String>) -> Result<String, String> {
    let signed = Signed {
        body: hex::encode(body),
        witnesses: witnesses.into_iter().collect(),
    };
    let bytes = serde_json::to_vec(&signed).map_err(|e| e.to_string())?;
    write_envelope(out, "Witnessed Tx BabbageEra", "Ledger Cddl Format", &bytes)?;
    Ok(String::new())
}

fn txid(args: &Args<'_>) -> Result<String, String> {
    let body = if let Some(path) = args.value("--tx-body-file") {
        read_envelope(Path::new(path))?.1
    } else {
        let signed: Signed = read_json(&args.path("--tx-file")?, "Witnessed Tx")?;
        hex::decode(&signed.body).map_err(|e| e.to_string())?
    };
    Ok(format!("{}\n", sha256_hex(&body)))
}
