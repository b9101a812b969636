use std::fmt;

use serde_json::Value;

use crate::client::{u64_value, Indexer, LedgerClient, ResourceData, TokenOwnership};
use crate::crypto::AccountAddress;
use crate::error::{ChainflowError, Result};
use crate::framework;
use crate::operation::{self, TokenId};

/// Something that has a balance.
///
/// Coin-store coins and fungible-asset objects live in different
/// on-chain models, so they are read through different paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Asset {
	/// Coin identified by its Move type, held in `CoinStore<T>`.
	Coin(String),
	/// Fungible asset identified by its metadata object address.
	Fungible(AccountAddress),
}

impl Asset {
	/// The chain's native gas coin.
	pub fn native() -> Self {
		Self::Coin(framework::APTOS_COIN.to_owned())
	}
}

impl fmt::Display for Asset {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Coin(t) => f.write_str(t),
			Self::Fungible(m) => write!(f, "fa:{}", m.to_short_hex()),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipRecord {
	pub owner: AccountAddress,
	pub token: TokenId,
	pub amount: u64,
}

/// Balance of `asset` held by `owner`.  An account without a store for
/// the asset holds zero; that is not an error.
pub async fn read_balance(client: &dyn LedgerClient, owner: AccountAddress, asset: &Asset) -> Result<u64> {
	match asset {
		Asset::Coin(coin_type) => {
			match client.resource(owner, &framework::coin_store(coin_type)).await? {
				Some(ResourceData::CoinStore { value, .. }) => Ok(value),
				Some(other) => Err(ChainflowError::Decode(format!(
					"expected CoinStore for {coin_type}, got {other:?}"
				))),
				// Newer accounts hold the native coin only as a fungible asset.
				None if coin_type == framework::APTOS_COIN => {
					fungible_balance(client, owner, framework::NATIVE_FA_METADATA.parse()?).await
				}
				None => Ok(0),
			}
		}
		Asset::Fungible(metadata) => fungible_balance(client, owner, *metadata).await,
	}
}

async fn fungible_balance(client: &dyn LedgerClient, owner: AccountAddress, metadata: AccountAddress) -> Result<u64> {
	let values = client
		.view(&operation::fungible_balance(owner, metadata)?)
		.await?;
	u64_value(first(&values, "balance")?, "balance")
}

/// The token entry `owner` holds, if any.
pub async fn read_ownership(
	client: &dyn LedgerClient,
	owner: AccountAddress,
	token: &TokenId,
) -> Result<Option<OwnershipRecord>> {
	let table = match client.resource(owner, framework::TOKEN_STORE).await? {
		None => return Ok(None),
		Some(ResourceData::TokenStore { tokens_table }) => tokens_table,
		Some(other) => {
			return Err(ChainflowError::Decode(format!(
				"expected TokenStore, got {other:?}"
			)))
		}
	};

	let Some(item) = client
		.table_item(&table, framework::TOKEN_ID_TYPE, framework::TOKEN_TYPE, token.table_key_json())
		.await?
	else {
		return Ok(None);
	};
	let amount = item
		.get("amount")
		.ok_or_else(|| ChainflowError::Decode("token table item has no amount".into()))
		.and_then(|a| u64_value(a, "amount"))?;

	Ok((amount > 0).then(|| OwnershipRecord {
		owner,
		token: token.clone(),
		amount,
	}))
}

/// Descriptive fields shared by v1 collection and token data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemData {
	pub name: String,
	pub description: String,
	pub uri: String,
	pub supply: u64,
	pub maximum: u64,
}

impl ItemData {
	fn decode(value: &Value) -> Result<Self> {
		let text = |field: &str| {
			value
				.get(field)
				.and_then(Value::as_str)
				.map(str::to_owned)
				.ok_or_else(|| ChainflowError::Decode(format!("item data has no {field}")))
		};
		let number = |field: &str| {
			value
				.get(field)
				.ok_or_else(|| ChainflowError::Decode(format!("item data has no {field}")))
				.and_then(|v| u64_value(v, field))
		};
		Ok(Self {
			name: text("name")?,
			description: text("description")?,
			uri: text("uri")?,
			supply: number("supply")?,
			maximum: number("maximum")?,
		})
	}
}

async fn collections(client: &dyn LedgerClient, creator: AccountAddress) -> Result<Option<(String, String)>> {
	match client.resource(creator, framework::COLLECTIONS).await? {
		None => Ok(None),
		Some(ResourceData::Collections {
			collection_data,
			token_data,
		}) => Ok(Some((collection_data, token_data))),
		Some(other) => Err(ChainflowError::Decode(format!(
			"expected Collections, got {other:?}"
		))),
	}
}

/// Data of the collection `name` created by `creator`, if it exists.
pub async fn read_collection(client: &dyn LedgerClient, creator: AccountAddress, name: &str) -> Result<Option<ItemData>> {
	let Some((table, _)) = collections(client, creator).await? else {
		return Ok(None);
	};
	client
		.table_item(&table, framework::STRING_TYPE, framework::COLLECTION_DATA_TYPE, Value::from(name))
		.await?
		.map(|v| ItemData::decode(&v))
		.transpose()
}

/// Data of `token` as recorded by its creator, if it exists.
pub async fn read_token_data(client: &dyn LedgerClient, token: &TokenId) -> Result<Option<ItemData>> {
	let Some((_, table)) = collections(client, token.creator).await? else {
		return Ok(None);
	};
	client
		.table_item(&table, framework::TOKEN_DATA_ID_TYPE, framework::TOKEN_DATA_TYPE, token.data_id_json())
		.await?
		.map(|v| ItemData::decode(&v))
		.transpose()
}

/// Tokens the indexer currently attributes to `owner`.  May lag the
/// node; callers are expected to have checked the indexer's chain id.
pub async fn indexer_owned_tokens(indexer: &dyn Indexer, owner: AccountAddress) -> Result<Vec<TokenOwnership>> {
	let owned = indexer.token_ownerships(owner).await?;
	tracing::debug!(%owner, count = owned.len(), "indexer ownerships");
	Ok(owned)
}

/// Whether `owner`'s primary store for the fungible asset is frozen.
pub async fn is_frozen(client: &dyn LedgerClient, owner: AccountAddress, metadata: AccountAddress) -> Result<bool> {
	let values = client
		.view(&operation::fungible_is_frozen(owner, metadata)?)
		.await?;
	first(&values, "is_frozen")?
		.as_bool()
		.ok_or_else(|| ChainflowError::Decode("is_frozen did not return a bool".into()))
}

/// Metadata object of the FA coin published by `creator`.
pub async fn fa_metadata(client: &dyn LedgerClient, creator: AccountAddress) -> Result<AccountAddress> {
	let values = client.view(&operation::fa_get_metadata(creator)?).await?;
	object_address(first(&values, "get_metadata")?)
}

/// Parse an `Object<T>` view value (`{"inner": "0x.."}`).
pub fn object_address(value: &Value) -> Result<AccountAddress> {
	value
		.get("inner")
		.and_then(Value::as_str)
		.ok_or_else(|| ChainflowError::Decode(format!("expected object, got {value}")))?
		.parse()
		.map_err(|_| ChainflowError::Decode(format!("object address is malformed: {value}")))
}

fn first<'a>(values: &'a [Value], what: &str) -> Result<&'a Value> {
	values
		.first()
		.ok_or_else(|| ChainflowError::Decode(format!("{what} returned no values")))
}
