//! In-memory ledger, faucet and indexer for driving workflows without a
//! network.  Executes the handful of framework functions the workflows
//! call and records every interaction in order.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde_json::{json, Value};

use chainflow::account::Account;
use chainflow::client::{Faucet, Indexer, LedgerClient, ResourceData, TokenOwnership, TxHash, TxStatus};
use chainflow::crypto::AccountAddress;
use chainflow::error::{ChainflowError, Result};
use chainflow::framework;
use chainflow::operation::{Arg, Operation, TokenId, ViewCall};
use chainflow::submission::ConfirmOptions;
use chainflow::workflow::Orchestrator;

/// Gas charged to the sender of every user transaction.
pub const FEE: u64 = 150;

/// Metadata object address the fake `fa_coin::get_metadata` reports.
pub const FA_METADATA: &str = "0xfa";

pub const CHAIN_ID: u8 = 4;

/// Fast polling so tests stay quick.
pub fn fast_confirm() -> ConfirmOptions {
	ConfirmOptions {
		check_success: true,
		timeout: Duration::from_secs(2),
		poll_interval: Duration::from_millis(5),
	}
}

/// Collection or token data as the creator's tables hold it.
struct ItemRecord {
	description: String,
	uri: String,
	supply: u64,
	maximum: u64,
}

impl ItemRecord {
	fn to_json(&self, name: &str) -> Value {
		json!({
			"name": name,
			"description": self.description,
			"uri": self.uri,
			"supply": self.supply.to_string(),
			"maximum": self.maximum.to_string(),
		})
	}
}

#[derive(Default)]
struct Ledger {
	coins: HashMap<(AccountAddress, String), u64>,
	tokens: HashMap<(AccountAddress, TokenId), u64>,
	token_stores: HashSet<AccountAddress>,
	offers: HashMap<(AccountAddress, AccountAddress, TokenId), u64>,
	collections: HashMap<(AccountAddress, String), ItemRecord>,
	token_data: HashMap<(AccountAddress, String, String), ItemRecord>,
	/// Primary store balances keyed by owner and metadata object.
	fungible: HashMap<(AccountAddress, AccountAddress), u64>,
	frozen: HashSet<AccountAddress>,
	/// New accounts hold the native coin as a fungible asset only.
	native_fa: bool,
	txs: HashMap<String, TxStatus>,
	polls: HashMap<String, u32>,
	next_tx: u64,
}

pub struct FakeLedger {
	ledger: Mutex<Ledger>,
	log: Arc<Mutex<Vec<String>>>,
	node_chain_id: u8,
	indexer_chain_id: u8,
	never_confirm: bool,
	revert_function: Option<String>,
	faucet_down: bool,
	faucet_reverts: bool,
}

impl Default for FakeLedger {
	fn default() -> Self {
		Self {
			ledger: Mutex::default(),
			log: Arc::default(),
			node_chain_id: CHAIN_ID,
			indexer_chain_id: CHAIN_ID,
			never_confirm: false,
			revert_function: None,
			faucet_down: false,
			faucet_reverts: false,
		}
	}
}

impl FakeLedger {
	pub fn new() -> Self {
		Self::default()
	}

	/// Indexer that reports a different chain than the node.
	pub fn with_indexer_chain(mut self, id: u8) -> Self {
		self.indexer_chain_id = id;
		self
	}

	/// Transactions are accepted but never leave the mempool.
	pub fn never_confirming(mut self) -> Self {
		self.never_confirm = true;
		self
	}

	/// Calls to `function` commit with `success == false`.
	pub fn reverting(mut self, function: &str) -> Self {
		self.revert_function = Some(function.to_owned());
		self
	}

	pub fn with_faucet_down(mut self) -> Self {
		self.faucet_down = true;
		self
	}

	/// The faucet answers with hashes whose transactions revert.
	pub fn with_faucet_reverting(mut self) -> Self {
		self.faucet_reverts = true;
		self
	}

	/// Funded accounts get no `CoinStore`; the native coin lives in the
	/// primary fungible store for `0xa`.
	pub fn with_native_fungible_store(self) -> Self {
		self.state().native_fa = true;
		self
	}

	pub fn into_orchestrator(self) -> (Arc<Self>, Orchestrator) {
		let fake = Arc::new(self);
		let orch = Orchestrator::new(fake.clone(), fast_confirm())
			.with_faucet(fake.clone())
			.with_indexer(fake.clone());
		(fake, orch)
	}

	/// Shared event log; steps under test may push their own entries.
	pub fn log(&self) -> Arc<Mutex<Vec<String>>> {
		Arc::clone(&self.log)
	}

	pub fn events(&self) -> Vec<String> {
		self.log.lock().unwrap().clone()
	}

	pub fn native_balance(&self, owner: AccountAddress) -> Option<u64> {
		self.state()
			.coins
			.get(&(owner, framework::APTOS_COIN.to_owned()))
			.copied()
	}

	pub fn has_coin_store(&self, owner: AccountAddress) -> bool {
		self.native_balance(owner).is_some()
	}

	pub fn submitted(&self) -> usize {
		self.events().iter().filter(|e| e.starts_with("submit ")).count()
	}

	fn state(&self) -> MutexGuard<'_, Ledger> {
		self.ledger.lock().unwrap()
	}

	fn record(&self, event: String) {
		self.log.lock().unwrap().push(event);
	}
}

fn address(args: &[Arg], i: usize) -> AccountAddress {
	match &args[i] {
		Arg::Address(a) => *a,
		other => panic!("argument {i} is not an address: {other:?}"),
	}
}

fn number(args: &[Arg], i: usize) -> u64 {
	match &args[i] {
		Arg::U64(v) => *v,
		other => panic!("argument {i} is not a u64: {other:?}"),
	}
}

fn text(args: &[Arg], i: usize) -> String {
	match &args[i] {
		Arg::String(s) => s.clone(),
		other => panic!("argument {i} is not a string: {other:?}"),
	}
}

fn token_at(args: &[Arg], creator: usize) -> TokenId {
	TokenId {
		creator: address(args, creator),
		collection: text(args, creator + 1),
		name: text(args, creator + 2),
		property_version: number(args, creator + 3),
	}
}

type Abort = String;

impl Ledger {
	fn debit_coin(&mut self, owner: AccountAddress, coin: &str, amount: u64) -> std::result::Result<(), Abort> {
		let balance = self
			.coins
			.get_mut(&(owner, coin.to_owned()))
			.ok_or_else(|| "ECOIN_STORE_NOT_PUBLISHED".to_owned())?;
		*balance = balance
			.checked_sub(amount)
			.ok_or_else(|| "EINSUFFICIENT_BALANCE".to_owned())?;
		Ok(())
	}

	fn credit_coin(&mut self, owner: AccountAddress, coin: &str, amount: u64) {
		*self.coins.entry((owner, coin.to_owned())).or_default() += amount;
	}

	fn native_metadata() -> AccountAddress {
		framework::NATIVE_FA_METADATA.parse().unwrap()
	}

	fn fa_metadata() -> AccountAddress {
		FA_METADATA.parse().unwrap()
	}

	fn debit_fungible(&mut self, owner: AccountAddress, metadata: AccountAddress, amount: u64) -> std::result::Result<(), Abort> {
		let held = self.fungible.entry((owner, metadata)).or_default();
		*held = held
			.checked_sub(amount)
			.ok_or_else(|| "EINSUFFICIENT_BALANCE".to_owned())?;
		Ok(())
	}

	fn credit_fungible(&mut self, owner: AccountAddress, metadata: AccountAddress, amount: u64) {
		*self.fungible.entry((owner, metadata)).or_default() += amount;
	}

	/// Native coin comes out of the coin store when one exists, otherwise
	/// out of the primary fungible store.
	fn debit_native(&mut self, owner: AccountAddress, amount: u64) -> std::result::Result<(), Abort> {
		if self.native_fa && !self.coins.contains_key(&(owner, framework::APTOS_COIN.to_owned())) {
			self.debit_fungible(owner, Self::native_metadata(), amount)
		} else {
			self.debit_coin(owner, framework::APTOS_COIN, amount)
		}
	}

	fn credit_native(&mut self, owner: AccountAddress, amount: u64) {
		if self.native_fa && !self.coins.contains_key(&(owner, framework::APTOS_COIN.to_owned())) {
			self.credit_fungible(owner, Self::native_metadata(), amount);
		} else {
			self.credit_coin(owner, framework::APTOS_COIN, amount);
		}
	}

	fn debit_token(&mut self, owner: AccountAddress, token: &TokenId, amount: u64) -> std::result::Result<(), Abort> {
		let held = self
			.tokens
			.get_mut(&(owner, token.clone()))
			.ok_or_else(|| "ETOKEN_NOT_OWNED".to_owned())?;
		*held = held
			.checked_sub(amount)
			.ok_or_else(|| "EINSUFFICIENT_BALANCE".to_owned())?;
		Ok(())
	}

	fn credit_token(&mut self, owner: AccountAddress, token: TokenId, amount: u64) {
		self.token_stores.insert(owner);
		*self.tokens.entry((owner, token)).or_default() += amount;
	}

	fn execute(&mut self, op: &Operation, secondary: &[AccountAddress]) -> std::result::Result<(), Abort> {
		let sender = op.sender();
		let args = op.args();
		let f = op.function();
		match (f.module.as_str(), f.name.as_str()) {
			("aptos_account", "transfer") => {
				let amount = number(args, 1);
				self.debit_native(sender, amount)?;
				self.credit_native(address(args, 0), amount);
			}
			("aptos_account", "transfer_coins") | ("coin", "transfer") => {
				let coin = &op.type_args()[0];
				let amount = number(args, 1);
				self.debit_coin(sender, coin, amount)?;
				self.credit_coin(address(args, 0), coin, amount);
			}
			("managed_coin", "register") => {
				self.credit_coin(sender, &op.type_args()[0], 0);
			}
			("managed_coin", "mint") => {
				let key = (address(args, 0), op.type_args()[0].clone());
				let store = self
					.coins
					.get_mut(&key)
					.ok_or_else(|| "ECOIN_STORE_NOT_PUBLISHED".to_owned())?;
				*store += number(args, 1);
			}
			("code", "publish_package_txn") => {}
			("token", "create_collection_script") => {
				let name = text(args, 0);
				if self.collections.contains_key(&(sender, name.clone())) {
					return Err("ECOLLECTION_ALREADY_EXISTS".into());
				}
				self.collections.insert(
					(sender, name),
					ItemRecord {
						description: text(args, 1),
						uri: text(args, 2),
						supply: 0,
						maximum: number(args, 3),
					},
				);
			}
			("token", "create_token_script") => {
				let (collection, name) = (text(args, 0), text(args, 1));
				let supply = number(args, 3);
				let record = self
					.collections
					.get_mut(&(sender, collection.clone()))
					.ok_or_else(|| "ECOLLECTION_NOT_PUBLISHED".to_owned())?;
				record.supply += 1;
				self.token_data.insert(
					(sender, collection.clone(), name.clone()),
					ItemRecord {
						description: text(args, 2),
						uri: text(args, 5),
						supply,
						maximum: number(args, 4),
					},
				);
				self.credit_token(sender, TokenId::new(sender, &collection, &name), supply);
			}
			("token", "direct_transfer_script") => {
				let receiver = *secondary
					.first()
					.ok_or_else(|| "EINVALID_NUMBER_OF_SIGNERS".to_owned())?;
				let token = token_at(args, 0);
				let amount = number(args, 4);
				self.debit_token(sender, &token, amount)?;
				self.credit_token(receiver, token, amount);
			}
			("token_transfers", "offer_script") => {
				let to = address(args, 0);
				let token = token_at(args, 1);
				let amount = number(args, 5);
				self.debit_token(sender, &token, amount)?;
				*self.offers.entry((sender, to, token)).or_default() += amount;
			}
			("token_transfers", "claim_script") => {
				let from = address(args, 0);
				let token = token_at(args, 1);
				let amount = self
					.offers
					.remove(&(from, sender, token.clone()))
					.ok_or_else(|| "EOFFER_NOT_EXIST".to_owned())?;
				self.credit_token(sender, token, amount);
			}
			("fa_coin", "mint") => {
				self.credit_fungible(address(args, 0), Self::fa_metadata(), number(args, 1));
			}
			("fa_coin", "transfer") => {
				let (from, to, amount) = (address(args, 0), address(args, 1), number(args, 2));
				if self.frozen.contains(&from) || self.frozen.contains(&to) {
					return Err("ESTORE_IS_FROZEN".into());
				}
				self.debit_fungible(from, Self::fa_metadata(), amount)?;
				self.credit_fungible(to, Self::fa_metadata(), amount);
			}
			("fa_coin", "burn") => {
				self.debit_fungible(address(args, 0), Self::fa_metadata(), number(args, 1))?;
			}
			("fa_coin", "freeze_account") => {
				self.frozen.insert(address(args, 0));
			}
			("fa_coin", "unfreeze_account") => {
				self.frozen.remove(&address(args, 0));
			}
			(module, name) => return Err(format!("EFUNCTION_NOT_FOUND {module}::{name}")),
		}
		Ok(())
	}

	fn new_hash(&mut self) -> String {
		self.next_tx += 1;
		format!("0x{:064x}", self.next_tx)
	}
}

impl FakeLedger {
	fn submit(&self, account: &Account, secondary: &[&Account], operation: &Operation) -> Result<TxHash> {
		if account.address() != operation.sender() {
			return Err(ChainflowError::SubmissionRejected("INVALID_AUTH_KEY".into()));
		}
		let secondary: Vec<AccountAddress> = secondary.iter().map(|a| a.address()).collect();
		let function = operation.function().to_string();
		let mut ledger = self.state();
		let hash = ledger.new_hash();
		if secondary.is_empty() {
			self.record(format!("submit {function}"));
		} else {
			self.record(format!("submit {function} cosigned by {}", secondary.len()));
		}

		let status = if self.never_confirm {
			TxStatus::Pending
		} else {
			let reverted = self.revert_function.as_deref() == Some(function.as_str());
			let outcome = if reverted {
				Err("Move abort: EREVERTED".to_owned())
			} else {
				ledger.execute(operation, &secondary)
			};
			// Gas is charged whether or not the payload succeeded.
			let _ = ledger.debit_native(operation.sender(), FEE);
			match outcome {
				Ok(()) => TxStatus::Committed {
					success: true,
					vm_status: "Executed successfully".into(),
					fee: FEE,
				},
				Err(abort) => TxStatus::Committed {
					success: false,
					vm_status: abort,
					fee: FEE,
				},
			}
		};
		ledger.txs.insert(hash.clone(), status);
		Ok(TxHash(hash))
	}
}

#[async_trait::async_trait]
impl LedgerClient for FakeLedger {
	async fn sign_and_submit(&self, account: &Account, operation: &Operation) -> Result<TxHash> {
		self.submit(account, &[], operation)
	}

	async fn sign_and_submit_multi_agent(
		&self,
		sender: &Account,
		secondary: &[&Account],
		operation: &Operation,
	) -> Result<TxHash> {
		if secondary.is_empty() {
			return Err(ChainflowError::BuildInvalid("multi-agent submission needs a co-signer".into()));
		}
		self.submit(sender, secondary, operation)
	}

	async fn transaction_status(&self, hash: &TxHash) -> Result<TxStatus> {
		let mut ledger = self.state();
		let Some(status) = ledger.txs.get(&hash.0).cloned() else {
			return Ok(TxStatus::NotFound);
		};
		// Every transaction is reported pending on its first poll.
		let polls = ledger.polls.entry(hash.0.clone()).or_default();
		*polls += 1;
		if *polls == 1 {
			return Ok(TxStatus::Pending);
		}
		if let TxStatus::Committed { success, .. } = &status {
			self.record(format!("committed {} {success}", hash.0));
		}
		Ok(status)
	}

	async fn resource(&self, address: AccountAddress, resource_type: &str) -> Result<Option<ResourceData>> {
		let ledger = self.state();
		if let Some(coin) = resource_type
			.strip_prefix("0x1::coin::CoinStore<")
			.and_then(|r| r.strip_suffix('>'))
		{
			return Ok(ledger
				.coins
				.get(&(address, coin.to_owned()))
				.map(|value| ResourceData::CoinStore {
					value: *value,
					frozen: false,
				}));
		}
		if resource_type == framework::TOKEN_STORE {
			return Ok(ledger
				.token_stores
				.contains(&address)
				.then(|| ResourceData::TokenStore {
					tokens_table: address.to_hex(),
				}));
		}
		if resource_type == framework::COLLECTIONS {
			return Ok(ledger
				.collections
				.keys()
				.any(|(creator, _)| *creator == address)
				.then(|| ResourceData::Collections {
					collection_data: address.to_hex(),
					token_data: address.to_hex(),
				}));
		}
		Ok(None)
	}

	async fn chain_id(&self) -> Result<u8> {
		Ok(self.node_chain_id)
	}

	async fn view(&self, call: &ViewCall) -> Result<Vec<Value>> {
		let ledger = self.state();
		let f = call.function();
		let args = call.args();
		match (f.module.as_str(), f.name.as_str()) {
			("fa_coin", "get_metadata") => Ok(vec![json!({ "inner": FA_METADATA })]),
			("primary_fungible_store", "balance") => {
				let key = (address(args, 0), address(args, 1));
				let held = ledger.fungible.get(&key).copied().unwrap_or(0);
				Ok(vec![Value::String(held.to_string())])
			}
			("primary_fungible_store", "is_frozen") => {
				Ok(vec![Value::Bool(ledger.frozen.contains(&address(args, 0)))])
			}
			_ => Err(ChainflowError::Query(format!("view {f} not found"))),
		}
	}

	async fn table_item(&self, handle: &str, _key_type: &str, value_type: &str, key: Value) -> Result<Option<Value>> {
		let owner: AccountAddress = handle.parse()?;
		let ledger = self.state();
		let field = |v: &Value, name: &str| v[name].as_str().unwrap_or_default().to_owned();
		match value_type {
			framework::TOKEN_TYPE => {
				let id = &key["token_data_id"];
				let token = TokenId::new(
					id["creator"].as_str().unwrap_or_default().parse()?,
					&field(id, "collection"),
					&field(id, "name"),
				);
				Ok(ledger
					.tokens
					.get(&(owner, token))
					.map(|amount| json!({ "amount": amount.to_string() })))
			}
			framework::COLLECTION_DATA_TYPE => {
				let name = key.as_str().unwrap_or_default().to_owned();
				Ok(ledger
					.collections
					.get(&(owner, name.clone()))
					.map(|r| r.to_json(&name)))
			}
			framework::TOKEN_DATA_TYPE => {
				let name = field(&key, "name");
				Ok(ledger
					.token_data
					.get(&(owner, field(&key, "collection"), name.clone()))
					.map(|r| r.to_json(&name)))
			}
			other => Err(ChainflowError::Query(format!("table value type {other} not supported"))),
		}
	}
}

#[async_trait::async_trait]
impl Faucet for FakeLedger {
	async fn fund(&self, address: AccountAddress, amount: u64) -> Result<Vec<TxHash>> {
		if self.faucet_down {
			return Err(ChainflowError::Query("faucet returned 503".into()));
		}
		let mut ledger = self.state();
		let status = if self.faucet_reverts {
			TxStatus::Committed {
				success: false,
				vm_status: "Move abort: EACCOUNT_DOES_NOT_EXIST".into(),
				fee: 0,
			}
		} else {
			ledger.credit_native(address, amount);
			TxStatus::Committed {
				success: true,
				vm_status: "Executed successfully".into(),
				fee: 0,
			}
		};
		let hash = ledger.new_hash();
		ledger.txs.insert(hash.clone(), status);
		self.record(format!("fund {address}"));
		Ok(vec![TxHash(hash)])
	}
}

#[async_trait::async_trait]
impl Indexer for FakeLedger {
	async fn chain_id(&self) -> Result<u8> {
		Ok(self.indexer_chain_id)
	}

	async fn token_ownerships(&self, owner: AccountAddress) -> Result<Vec<TokenOwnership>> {
		Ok(self
			.state()
			.tokens
			.iter()
			.filter(|((o, _), amount)| *o == owner && **amount > 0)
			.map(|((_, token), amount)| TokenOwnership {
				collection: token.collection.clone(),
				name: token.name.clone(),
				amount: *amount,
			})
			.collect())
	}
}
