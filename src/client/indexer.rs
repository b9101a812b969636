use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use super::{u64_value, Indexer, TokenOwnership};
use crate::crypto::AccountAddress;
use crate::error::{ChainflowError, Result};

const LEDGER_INFO_QUERY: &str = "query LedgerInfo { ledger_infos { chain_id } }";

const OWNERSHIPS_QUERY: &str = "\
query OwnedTokens($owner: String) {
  current_token_ownerships(
    where: { owner_address: { _eq: $owner }, amount: { _gt: \"0\" } }
  ) {
    collection_name
    name
    amount
  }
}";

/// GraphQL indexer client.
#[derive(Debug, Clone)]
pub struct IndexerClient {
	url: Url,
	http: reqwest::Client,
}

#[derive(Deserialize)]
struct GraphQlResponse<T> {
	data: Option<T>,
	#[serde(default)]
	errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
	message: String,
}

#[derive(Deserialize)]
struct LedgerInfos {
	ledger_infos: Vec<LedgerInfoRow>,
}

#[derive(Deserialize)]
struct LedgerInfoRow {
	chain_id: u8,
}

#[derive(Deserialize)]
struct Ownerships {
	current_token_ownerships: Vec<OwnershipRow>,
}

#[derive(Deserialize)]
struct OwnershipRow {
	collection_name: String,
	name: String,
	amount: Value,
}

impl IndexerClient {
	pub fn new(url: &str) -> Result<Self> {
		let url = Url::parse(url)
			.map_err(|e| ChainflowError::Config(format!("invalid indexer url {url:?}: {e}")))?;
		Ok(Self {
			url,
			http: reqwest::Client::new(),
		})
	}

	async fn query<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T> {
		let body = json!({ "query": query, "variables": variables });
		let resp = self.http.post(self.url.clone()).json(&body).send().await?;
		let status = resp.status();
		if !status.is_success() {
			let text = resp.text().await.unwrap_or_default();
			return Err(ChainflowError::Query(format!("indexer HTTP {status}: {text}")));
		}
		let parsed: GraphQlResponse<T> = resp.json().await?;
		if let Some(first) = parsed.errors.first() {
			return Err(ChainflowError::Query(format!("indexer: {}", first.message)));
		}
		parsed
			.data
			.ok_or_else(|| ChainflowError::Decode("indexer response has no data".into()))
	}
}

#[async_trait::async_trait]
impl Indexer for IndexerClient {
	async fn chain_id(&self) -> Result<u8> {
		let infos: LedgerInfos = self.query(LEDGER_INFO_QUERY, json!({})).await?;
		infos
			.ledger_infos
			.first()
			.map(|row| row.chain_id)
			.ok_or_else(|| ChainflowError::Decode("indexer returned no ledger_infos".into()))
	}

	async fn token_ownerships(&self, owner: AccountAddress) -> Result<Vec<TokenOwnership>> {
		let rows: Ownerships = self
			.query(OWNERSHIPS_QUERY, json!({ "owner": owner.to_hex() }))
			.await?;
		rows.current_token_ownerships
			.into_iter()
			.map(|row| {
				Ok(TokenOwnership {
					amount: u64_value(&row.amount, "amount")?,
					collection: row.collection_name,
					name: row.name,
				})
			})
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ownership_rows_accept_numeric_amounts() {
		let raw = r#"{"data":{"current_token_ownerships":[
			{"collection_name":"Alice's","name":"Alice's first token","amount":1}
		]}}"#;
		let parsed: GraphQlResponse<Ownerships> = serde_json::from_str(raw).unwrap();
		let rows = parsed.data.unwrap().current_token_ownerships;
		assert_eq!(rows.len(), 1);
		assert_eq!(u64_value(&rows[0].amount, "amount").unwrap(), 1);
	}

	#[test]
	fn graphql_errors_are_collected() {
		let raw = r#"{"errors":[{"message":"field not found"}]}"#;
		let parsed: GraphQlResponse<LedgerInfos> = serde_json::from_str(raw).unwrap();
		assert!(parsed.data.is_none());
		assert_eq!(parsed.errors[0].message, "field not found");
	}
}
