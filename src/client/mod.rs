pub mod faucet;
pub mod indexer;
pub mod rest;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::account::Account;
use crate::crypto::AccountAddress;
use crate::error::{ChainflowError, Result};
use crate::framework;
use crate::operation::{Operation, ViewCall};

/// Transaction hash as reported by the node (`0x`-prefixed hex).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(pub String);

impl fmt::Display for TxHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// What the node knows about a transaction hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
	/// Not (yet) visible to the node.
	NotFound,
	/// Accepted into the mempool, not yet executed.
	Pending,
	/// Executed and committed; `success == false` means it reverted.
	Committed {
		success: bool,
		vm_status: String,
		/// Gas charged, in the native coin's base units.
		fee: u64,
	},
}

/// Decoded account resource.  Only the shapes the workflows read are
/// modelled; anything else is kept raw.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceData {
	CoinStore { value: u64, frozen: bool },
	TokenStore { tokens_table: String },
	/// Table handles of a creator's v1 collections and token data.
	Collections { collection_data: String, token_data: String },
	Other(Value),
}

impl ResourceData {
	/// Validate a raw `data` object against the schema implied by its
	/// resource type.
	pub fn decode(resource_type: &str, data: Value) -> Result<Self> {
		if resource_type.starts_with("0x1::coin::CoinStore<") {
			let value = data
				.pointer("/coin/value")
				.and_then(Value::as_str)
				.ok_or_else(|| ChainflowError::Decode(format!("{resource_type}: missing coin.value")))?;
			let value = parse_u64(value, "coin.value")?;
			let frozen = data.get("frozen").and_then(Value::as_bool).unwrap_or(false);
			Ok(Self::CoinStore { value, frozen })
		} else if resource_type == framework::TOKEN_STORE {
			Ok(Self::TokenStore {
				tokens_table: table_handle(resource_type, &data, "tokens")?,
			})
		} else if resource_type == framework::COLLECTIONS {
			Ok(Self::Collections {
				collection_data: table_handle(resource_type, &data, "collection_data")?,
				token_data: table_handle(resource_type, &data, "token_data")?,
			})
		} else {
			Ok(Self::Other(data))
		}
	}
}

fn table_handle(resource_type: &str, data: &Value, field: &str) -> Result<String> {
	data.get(field)
		.and_then(|t| t.get("handle"))
		.and_then(Value::as_str)
		.map(str::to_owned)
		.ok_or_else(|| ChainflowError::Decode(format!("{resource_type}: missing {field}.handle")))
}

/// One row of the indexer's current token ownership view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenOwnership {
	pub collection: String,
	pub name: String,
	pub amount: u64,
}

/// Authoritative ledger access.
///
/// Implementations hold no per-workflow session state and may be shared
/// across concurrently running workflows.
#[async_trait::async_trait]
pub trait LedgerClient: Send + Sync {
	/// Sign `operation` with `account`'s key and hand it to the network.
	async fn sign_and_submit(&self, account: &Account, operation: &Operation) -> Result<TxHash>;

	/// Like [`LedgerClient::sign_and_submit`], for entry functions that take
	/// more than one signer.  `secondary` sign in the order the function
	/// declares them, after the sender.
	async fn sign_and_submit_multi_agent(
		&self,
		sender: &Account,
		secondary: &[&Account],
		operation: &Operation,
	) -> Result<TxHash>;

	async fn transaction_status(&self, hash: &TxHash) -> Result<TxStatus>;

	/// `Ok(None)` when the account or resource does not exist.
	async fn resource(
		&self,
		address: AccountAddress,
		resource_type: &str,
	) -> Result<Option<ResourceData>>;

	async fn chain_id(&self) -> Result<u8>;

	/// Execute a view function and return its Move values as JSON.
	async fn view(&self, call: &ViewCall) -> Result<Vec<Value>>;

	/// Raw value stored under `key` in table `handle`; `Ok(None)` when the
	/// key is absent.
	async fn table_item(
		&self,
		handle: &str,
		key_type: &str,
		value_type: &str,
		key: Value,
	) -> Result<Option<Value>>;
}

/// Credits test accounts.
#[async_trait::async_trait]
pub trait Faucet: Send + Sync {
	/// Returns the hashes of the funding transactions it issued.
	async fn fund(&self, address: AccountAddress, amount: u64) -> Result<Vec<TxHash>>;
}

/// Read-optimised mirror of ledger state; may lag the node.
#[async_trait::async_trait]
pub trait Indexer: Send + Sync {
	async fn chain_id(&self) -> Result<u8>;

	async fn token_ownerships(&self, owner: AccountAddress) -> Result<Vec<TokenOwnership>>;
}

/// Parse a u64 that the JSON API sends as a decimal string.
pub fn parse_u64(s: &str, field: &str) -> Result<u64> {
	s.parse()
		.map_err(|e| ChainflowError::Decode(format!("{field}: {s:?} is not a u64: {e}")))
}

/// Accept u64 values encoded either as JSON strings or numbers.
pub(crate) fn u64_value(v: &Value, field: &str) -> Result<u64> {
	match v {
		Value::String(s) => parse_u64(s, field),
		Value::Number(n) => n
			.as_u64()
			.ok_or_else(|| ChainflowError::Decode(format!("{field}: {n} is not a u64"))),
		other => Err(ChainflowError::Decode(format!("{field}: expected u64, got {other}"))),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn coin_store_decodes_string_value() {
		let data = json!({ "coin": { "value": "100000000" }, "frozen": false });
		let r = ResourceData::decode(&framework::coin_store(framework::APTOS_COIN), data).unwrap();
		assert_eq!(
			r,
			ResourceData::CoinStore {
				value: 100_000_000,
				frozen: false
			}
		);
	}

	#[test]
	fn coin_store_missing_value_is_decode_error() {
		let r = ResourceData::decode("0x1::coin::CoinStore<0xa::m::C>", json!({ "coin": {} }));
		assert!(matches!(r, Err(ChainflowError::Decode(_))));
	}

	#[test]
	fn token_store_exposes_table_handle() {
		let data = json!({ "tokens": { "handle": "0xfeed" } });
		let r = ResourceData::decode(framework::TOKEN_STORE, data).unwrap();
		assert_eq!(
			r,
			ResourceData::TokenStore {
				tokens_table: "0xfeed".into()
			}
		);
	}

	#[test]
	fn collections_expose_both_tables() {
		let data = json!({
			"collection_data": { "handle": "0xc011" },
			"token_data": { "handle": "0xda7a" },
			"create_collection_events": {},
		});
		let r = ResourceData::decode(framework::COLLECTIONS, data).unwrap();
		assert_eq!(
			r,
			ResourceData::Collections {
				collection_data: "0xc011".into(),
				token_data: "0xda7a".into(),
			}
		);
		let missing = ResourceData::decode(framework::COLLECTIONS, json!({ "token_data": { "handle": "0x1" } }));
		assert!(matches!(missing, Err(ChainflowError::Decode(_))));
	}

	#[test]
	fn unknown_resources_stay_raw() {
		let r = ResourceData::decode("0x1::account::Account", json!({ "x": 1 })).unwrap();
		assert!(matches!(r, ResourceData::Other(_)));
	}

	#[test]
	fn u64_values_accept_both_encodings() {
		assert_eq!(u64_value(&json!("35"), "f").unwrap(), 35);
		assert_eq!(u64_value(&json!(35), "f").unwrap(), 35);
		assert!(u64_value(&json!(true), "f").is_err());
		assert!(u64_value(&json!("-1"), "f").is_err());
	}
}
