use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::crypto::AccountAddress;
use crate::error::{ChainflowError, Result};
use crate::framework;

// -- Function identifiers --

/// `address::module::function`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionId {
	pub address: AccountAddress,
	pub module: String,
	pub name: String,
}

impl FromStr for FunctionId {
	type Err = ChainflowError;

	fn from_str(s: &str) -> Result<Self> {
		let s = s.trim();
		if s.is_empty() {
			return Err(ChainflowError::BuildInvalid("function path is empty".into()));
		}
		let parts: Vec<&str> = s.split("::").collect();
		let [address, module, name] = parts.as_slice() else {
			return Err(ChainflowError::BuildInvalid(format!(
				"function path {s:?} is not address::module::function"
			)));
		};
		if !is_identifier(module) || !is_identifier(name) {
			return Err(ChainflowError::BuildInvalid(format!(
				"function path {s:?} has an invalid module or function name"
			)));
		}
		Ok(Self {
			address: address.parse()?,
			module: (*module).to_owned(),
			name: (*name).to_owned(),
		})
	}
}

impl fmt::Display for FunctionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}::{}::{}", self.address.to_short_hex(), self.module, self.name)
	}
}

fn is_identifier(s: &str) -> bool {
	let mut chars = s.chars();
	matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
		&& chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn check_type_arg(t: &str) -> Result<()> {
	let t = t.trim();
	if t.is_empty() {
		return Err(ChainflowError::BuildInvalid("empty type argument".into()));
	}
	let mut depth = 0i32;
	for c in t.chars() {
		match c {
			'<' => depth += 1,
			'>' => depth -= 1,
			_ => {}
		}
		if depth < 0 {
			break;
		}
	}
	if depth != 0 {
		return Err(ChainflowError::BuildInvalid(format!(
			"type argument {t:?} has unbalanced angle brackets"
		)));
	}
	Ok(())
}

// -- Arguments --

/// A single Move call argument, encoded for the JSON API at the client
/// boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
	Address(AccountAddress),
	U8(u8),
	U64(u64),
	U128(u128),
	Bool(bool),
	String(String),
	Bytes(Vec<u8>),
	Vector(Vec<Arg>),
}

impl Arg {
	/// JSON form: integers wider than 32 bits as decimal strings, byte
	/// vectors as `0x` hex.
	pub fn to_json(&self) -> Value {
		match self {
			Self::Address(a) => Value::String(a.to_hex()),
			Self::U8(v) => json!(v),
			Self::U64(v) => Value::String(v.to_string()),
			Self::U128(v) => Value::String(v.to_string()),
			Self::Bool(v) => Value::Bool(*v),
			Self::String(s) => Value::String(s.clone()),
			Self::Bytes(b) => Value::String(format!("0x{}", hex::encode(b))),
			Self::Vector(items) => Value::Array(items.iter().map(Arg::to_json).collect()),
		}
	}
}

impl From<AccountAddress> for Arg {
	fn from(a: AccountAddress) -> Self {
		Self::Address(a)
	}
}

impl From<u64> for Arg {
	fn from(v: u64) -> Self {
		Self::U64(v)
	}
}

impl From<&str> for Arg {
	fn from(s: &str) -> Self {
		Self::String(s.to_owned())
	}
}

impl From<bool> for Arg {
	fn from(v: bool) -> Self {
		Self::Bool(v)
	}
}

// -- Operations --

/// A state-changing entry-function call, not yet signed.
///
/// Built once and moved into submission.  It is deliberately not `Clone`,
/// so the same value cannot be submitted twice:
///
/// ```compile_fail
/// # use chainflow::operation::transfer_coins;
/// # use chainflow::crypto::AccountAddress;
/// let op = transfer_coins(AccountAddress::ONE, AccountAddress::THREE, 1, None).unwrap();
/// let again = op.clone();
/// ```
#[derive(Debug, PartialEq)]
pub struct Operation {
	sender: AccountAddress,
	function: FunctionId,
	type_args: Vec<String>,
	args: Vec<Arg>,
}

impl Operation {
	/// Validate and assemble an operation.  Framework functions listed in
	/// [`framework::KNOWN_FUNCTIONS`] have their arity checked here; other
	/// functions are left for the chain to validate.
	pub fn build(
		sender: AccountAddress,
		function_path: &str,
		type_args: Vec<String>,
		args: Vec<Arg>,
	) -> Result<Self> {
		let function: FunctionId = function_path.parse()?;
		for t in &type_args {
			check_type_arg(t)?;
		}
		if let Some(info) = framework::lookup(&function.to_string()) {
			check_arity(&function, info.type_params, type_args.len(), "type arguments")?;
			check_arity(&function, info.params, args.len(), "arguments")?;
		}
		Ok(Self {
			sender,
			function,
			type_args,
			args,
		})
	}

	/// Like [`Operation::build`], with a caller-supplied argument count for
	/// functions outside the framework table.
	pub fn build_with_arity(
		sender: AccountAddress,
		function_path: &str,
		type_args: Vec<String>,
		args: Vec<Arg>,
		expected_args: usize,
	) -> Result<Self> {
		let op = Self::build(sender, function_path, type_args, args)?;
		check_arity(&op.function, expected_args, op.args.len(), "arguments")?;
		Ok(op)
	}

	pub fn sender(&self) -> AccountAddress {
		self.sender
	}

	pub fn function(&self) -> &FunctionId {
		&self.function
	}

	pub fn type_args(&self) -> &[String] {
		&self.type_args
	}

	pub fn args(&self) -> &[Arg] {
		&self.args
	}

	/// `entry_function_payload` body for the REST API.
	pub fn payload_json(&self) -> Value {
		json!({
			"type": "entry_function_payload",
			"function": self.function.to_string(),
			"type_arguments": self.type_args,
			"arguments": self.args.iter().map(Arg::to_json).collect::<Vec<_>>(),
		})
	}
}

fn check_arity(function: &FunctionId, expected: usize, got: usize, what: &str) -> Result<()> {
	if expected != got {
		return Err(ChainflowError::BuildInvalid(format!(
			"{function} takes {expected} {what}, got {got}"
		)));
	}
	Ok(())
}

/// A read-only view-function call.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewCall {
	function: FunctionId,
	type_args: Vec<String>,
	args: Vec<Arg>,
}

impl ViewCall {
	pub fn build(function_path: &str, type_args: Vec<String>, args: Vec<Arg>) -> Result<Self> {
		let function: FunctionId = function_path.parse()?;
		for t in &type_args {
			check_type_arg(t)?;
		}
		if let Some(info) = framework::lookup(&function.to_string()) {
			check_arity(&function, info.type_params, type_args.len(), "type arguments")?;
			check_arity(&function, info.params, args.len(), "arguments")?;
		}
		Ok(Self {
			function,
			type_args,
			args,
		})
	}

	pub fn function(&self) -> &FunctionId {
		&self.function
	}

	pub fn type_args(&self) -> &[String] {
		&self.type_args
	}

	pub fn args(&self) -> &[Arg] {
		&self.args
	}

	pub fn request_json(&self) -> Value {
		json!({
			"function": self.function.to_string(),
			"type_arguments": self.type_args,
			"arguments": self.args.iter().map(Arg::to_json).collect::<Vec<_>>(),
		})
	}
}

// -- Tokens --

/// Identifies one token (v1 token model) by creator, collection and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenId {
	pub creator: AccountAddress,
	pub collection: String,
	pub name: String,
	pub property_version: u64,
}

impl TokenId {
	pub fn new(creator: AccountAddress, collection: &str, name: &str) -> Self {
		Self {
			creator,
			collection: collection.to_owned(),
			name: name.to_owned(),
			property_version: 0,
		}
	}

	/// Table key shape used by `TokenStore.tokens`.
	pub fn table_key_json(&self) -> Value {
		json!({
			"token_data_id": self.data_id_json(),
			"property_version": self.property_version.to_string(),
		})
	}

	/// Table key shape used by `Collections.token_data`.
	pub fn data_id_json(&self) -> Value {
		json!({
			"creator": self.creator.to_hex(),
			"collection": self.collection,
			"name": self.name,
		})
	}
}

// -- Packages --

/// Compiled Move package ready for `publish_package_txn`.
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
	pub metadata: Vec<u8>,
	pub modules: Vec<Vec<u8>>,
}

impl Package {
	/// Read `build/<package>/package-metadata.bcs` and the named modules
	/// from `build/<package>/bytecode_modules/` under `dir`.
	pub fn load(dir: &Path, package: &str, modules: &[&str]) -> Result<Self> {
		let build = dir.join("build").join(package);
		let read = |p: &Path| {
			std::fs::read(p).map_err(|e| {
				ChainflowError::BuildInvalid(format!("cannot read {}: {e}", p.display()))
			})
		};
		let metadata = read(&build.join("package-metadata.bcs"))?;
		let modules = modules
			.iter()
			.map(|m| read(&build.join("bytecode_modules").join(format!("{m}.mv"))))
			.collect::<Result<Vec<_>>>()?;
		if modules.is_empty() {
			return Err(ChainflowError::BuildInvalid("package has no modules".into()));
		}
		Ok(Self { metadata, modules })
	}
}

// -- Typed builders for the calls the workflows make --

/// Move APT (when `coin_type` is `None`) or any coin type, creating the
/// recipient's store if needed.
pub fn transfer_coins(
	sender: AccountAddress,
	to: AccountAddress,
	amount: u64,
	coin_type: Option<&str>,
) -> Result<Operation> {
	match coin_type {
		None => Operation::build(
			sender,
			"0x1::aptos_account::transfer",
			vec![],
			vec![to.into(), amount.into()],
		),
		Some(t) => Operation::build(
			sender,
			"0x1::aptos_account::transfer_coins",
			vec![t.to_owned()],
			vec![to.into(), amount.into()],
		),
	}
}

/// Publish a `CoinStore<coin_type>` under the sender.
pub fn register_coin(sender: AccountAddress, coin_type: &str) -> Result<Operation> {
	Operation::build(
		sender,
		"0x1::managed_coin::register",
		vec![coin_type.to_owned()],
		vec![],
	)
}

pub fn mint_coin(
	minter: AccountAddress,
	coin_type: &str,
	to: AccountAddress,
	amount: u64,
) -> Result<Operation> {
	Operation::build(
		minter,
		"0x1::managed_coin::mint",
		vec![coin_type.to_owned()],
		vec![to.into(), amount.into()],
	)
}

pub fn publish_package(sender: AccountAddress, package: &Package) -> Result<Operation> {
	Operation::build(
		sender,
		"0x1::code::publish_package_txn",
		vec![],
		vec![
			Arg::Bytes(package.metadata.clone()),
			Arg::Vector(package.modules.iter().cloned().map(Arg::Bytes).collect()),
		],
	)
}

pub fn create_collection(
	creator: AccountAddress,
	name: &str,
	description: &str,
	uri: &str,
) -> Result<Operation> {
	Operation::build(
		creator,
		"0x3::token::create_collection_script",
		vec![],
		vec![
			name.into(),
			description.into(),
			uri.into(),
			u64::MAX.into(),
			Arg::Vector(vec![false.into(); 3]),
		],
	)
}

pub fn create_token(
	creator: AccountAddress,
	collection: &str,
	name: &str,
	description: &str,
	supply: u64,
	uri: &str,
) -> Result<Operation> {
	Operation::build(
		creator,
		"0x3::token::create_token_script",
		vec![],
		vec![
			collection.into(),
			name.into(),
			description.into(),
			supply.into(),
			u64::MAX.into(),
			uri.into(),
			creator.into(),
			0u64.into(),
			0u64.into(),
			Arg::Vector(vec![false.into(); 5]),
			Arg::Vector(vec![]),
			Arg::Vector(vec![]),
			Arg::Vector(vec![]),
		],
	)
}

pub fn offer_token(
	sender: AccountAddress,
	receiver: AccountAddress,
	token: &TokenId,
	amount: u64,
) -> Result<Operation> {
	Operation::build(
		sender,
		"0x3::token_transfers::offer_script",
		vec![],
		vec![
			receiver.into(),
			token.creator.into(),
			token.collection.as_str().into(),
			token.name.as_str().into(),
			token.property_version.into(),
			amount.into(),
		],
	)
}

pub fn claim_token(
	receiver: AccountAddress,
	sender: AccountAddress,
	token: &TokenId,
) -> Result<Operation> {
	Operation::build(
		receiver,
		"0x3::token_transfers::claim_script",
		vec![],
		vec![
			sender.into(),
			token.creator.into(),
			token.collection.as_str().into(),
			token.name.as_str().into(),
			token.property_version.into(),
		],
	)
}

/// Move `amount` of `token` from `sender` to `receiver` in one
/// transaction.  Both must sign: `sender` as the transaction sender and
/// `receiver` as the secondary signer.
pub fn direct_transfer_token(sender: AccountAddress, token: &TokenId, amount: u64) -> Result<Operation> {
	Operation::build(
		sender,
		"0x3::token::direct_transfer_script",
		vec![],
		vec![
			token.creator.into(),
			token.collection.as_str().into(),
			token.name.as_str().into(),
			token.property_version.into(),
			amount.into(),
		],
	)
}

// FA coin module, published under its creator's address.

fn fa_path(creator: AccountAddress, name: &str) -> String {
	format!("{}::fa_coin::{name}", creator.to_short_hex())
}

pub fn fa_mint(creator: AccountAddress, to: AccountAddress, amount: u64) -> Result<Operation> {
	Operation::build_with_arity(
		creator,
		&fa_path(creator, "mint"),
		vec![],
		vec![to.into(), amount.into()],
		2,
	)
}

pub fn fa_transfer(
	creator: AccountAddress,
	from: AccountAddress,
	to: AccountAddress,
	amount: u64,
) -> Result<Operation> {
	Operation::build_with_arity(
		creator,
		&fa_path(creator, "transfer"),
		vec![],
		vec![from.into(), to.into(), amount.into()],
		3,
	)
}

pub fn fa_burn(creator: AccountAddress, from: AccountAddress, amount: u64) -> Result<Operation> {
	Operation::build_with_arity(
		creator,
		&fa_path(creator, "burn"),
		vec![],
		vec![from.into(), amount.into()],
		2,
	)
}

pub fn fa_freeze(creator: AccountAddress, target: AccountAddress) -> Result<Operation> {
	Operation::build_with_arity(
		creator,
		&fa_path(creator, "freeze_account"),
		vec![],
		vec![target.into()],
		1,
	)
}

pub fn fa_unfreeze(creator: AccountAddress, target: AccountAddress) -> Result<Operation> {
	Operation::build_with_arity(
		creator,
		&fa_path(creator, "unfreeze_account"),
		vec![],
		vec![target.into()],
		1,
	)
}

/// View returning the FA coin's metadata object as `[{"inner": "0x.."}]`.
pub fn fa_get_metadata(creator: AccountAddress) -> Result<ViewCall> {
	ViewCall::build(&fa_path(creator, "get_metadata"), vec![], vec![])
}

pub fn fungible_balance(owner: AccountAddress, metadata: AccountAddress) -> Result<ViewCall> {
	ViewCall::build(
		"0x1::primary_fungible_store::balance",
		vec![framework::FUNGIBLE_ASSET_METADATA.to_owned()],
		vec![owner.into(), metadata.into()],
	)
}

pub fn fungible_is_frozen(owner: AccountAddress, metadata: AccountAddress) -> Result<ViewCall> {
	ViewCall::build(
		"0x1::primary_fungible_store::is_frozen",
		vec![framework::FUNGIBLE_ASSET_METADATA.to_owned()],
		vec![owner.into(), metadata.into()],
	)
}
