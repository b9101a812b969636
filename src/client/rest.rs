use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use super::{parse_u64, LedgerClient, ResourceData, TxHash, TxStatus};
use crate::account::Account;
use crate::crypto::AccountAddress;
use crate::error::{ChainflowError, Result};
use crate::operation::{Operation, ViewCall};

/// Gas settings attached to every submitted transaction.
#[derive(Debug, Clone, Copy)]
pub struct GasSettings {
	pub max_gas_amount: u64,
	pub gas_unit_price: u64,
	/// Seconds from now until the transaction expires.
	pub expiration_secs: i64,
}

impl Default for GasSettings {
	fn default() -> Self {
		Self {
			max_gas_amount: 200_000,
			gas_unit_price: 100,
			expiration_secs: 600,
		}
	}
}

/// JSON REST adapter for a full node.
///
/// Transactions are encoded server-side via `encode_submission`, signed
/// locally, then posted with the signature attached.
#[derive(Debug, Clone)]
pub struct RestClient {
	base: Url,
	http: reqwest::Client,
	gas: GasSettings,
}

// -- Response schemas --

#[derive(Deserialize)]
struct LedgerInfo {
	chain_id: u8,
}

#[derive(Deserialize)]
struct AccountInfo {
	sequence_number: String,
}

#[derive(Deserialize)]
struct ResourceResponse {
	#[serde(rename = "type")]
	resource_type: String,
	data: Value,
}

#[derive(Deserialize)]
struct SubmitResponse {
	hash: String,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TransactionResponse {
	PendingTransaction,
	UserTransaction {
		success: bool,
		vm_status: String,
		gas_used: String,
		gas_unit_price: String,
	},
	#[serde(other)]
	Other,
}

#[derive(Deserialize)]
struct ApiError {
	message: String,
	#[serde(default)]
	error_code: Option<String>,
}

impl RestClient {
	/// `url` is the node's REST root; `/v1` is appended when missing.
	pub fn new(url: &str) -> Result<Self> {
		Self::with_gas(url, GasSettings::default())
	}

	pub fn with_gas(url: &str, gas: GasSettings) -> Result<Self> {
		let mut base = Url::parse(url)
			.map_err(|e| ChainflowError::Config(format!("invalid node url {url:?}: {e}")))?;
		if base.cannot_be_a_base() {
			return Err(ChainflowError::Config(format!("node url {url:?} cannot be a base")));
		}
		if !base.path().trim_end_matches('/').ends_with("/v1") {
			let path = format!("{}/v1", base.path().trim_end_matches('/'));
			base.set_path(&path);
		}
		Ok(Self {
			base,
			http: reqwest::Client::new(),
			gas,
		})
	}

	pub fn base_url(&self) -> &Url {
		&self.base
	}

	fn url(&self, segments: &[&str]) -> Url {
		let mut url = self.base.clone();
		if let Ok(mut path) = url.path_segments_mut() {
			path.pop_if_empty().extend(segments);
		}
		url
	}

	async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<Option<T>> {
		let resp = self.http.get(self.url(segments)).send().await?;
		read_optional(resp).await
	}

	async fn post<T: DeserializeOwned>(&self, segments: &[&str], body: &Value) -> Result<Option<T>> {
		let resp = self.http.post(self.url(segments)).json(body).send().await?;
		read_optional(resp).await
	}

	pub async fn sequence_number(&self, address: AccountAddress) -> Result<Option<u64>> {
		let info: Option<AccountInfo> = self.get(&["accounts", &address.to_hex()]).await?;
		info.map(|i| parse_u64(&i.sequence_number, "sequence_number"))
			.transpose()
	}

	fn unsigned_request(&self, operation: &Operation, sequence_number: u64) -> Value {
		let expires = chrono::Utc::now().timestamp() + self.gas.expiration_secs;
		json!({
			"sender": operation.sender().to_hex(),
			"sequence_number": sequence_number.to_string(),
			"max_gas_amount": self.gas.max_gas_amount.to_string(),
			"gas_unit_price": self.gas.gas_unit_price.to_string(),
			"expiration_timestamp_secs": expires.to_string(),
			"payload": operation.payload_json(),
		})
	}

	/// Sequence lookup, server-side encoding, local signing by `sender`
	/// and every secondary signer, then submission.
	async fn submit_signed(
		&self,
		sender: &Account,
		secondary: &[&Account],
		operation: &Operation,
	) -> Result<TxHash> {
		if operation.sender() != sender.address() {
			return Err(ChainflowError::SubmissionRejected(format!(
				"operation sender {} is not the signing account {}",
				operation.sender(),
				sender.address()
			)));
		}

		let sequence_number = self
			.sequence_number(sender.address())
			.await
			.map_err(rejected)?
			.ok_or_else(|| {
				ChainflowError::SubmissionRejected(format!(
					"account {} does not exist on-chain; fund it first",
					sender.address()
				))
			})?;

		let mut request = self.unsigned_request(operation, sequence_number);
		let secondary_addresses: Vec<String> = secondary.iter().map(|a| a.address().to_hex()).collect();
		if !secondary.is_empty() {
			request["secondary_signers"] = json!(secondary_addresses);
		}

		let to_sign: String = self
			.post(&["transactions", "encode_submission"], &request)
			.await
			.map_err(rejected)?
			.ok_or_else(|| ChainflowError::SubmissionRejected("encode_submission not found".into()))?;
		let to_sign = hex::decode(to_sign.strip_prefix("0x").unwrap_or(&to_sign))
			.map_err(|e| ChainflowError::Decode(format!("signing message is not hex: {e}")))?;

		if let Some(fields) = request.as_object_mut() {
			fields.remove("secondary_signers");
		}
		request["signature"] = if secondary.is_empty() {
			single_key_signature(sender, &to_sign)
		} else {
			json!({
				"type": "multi_agent_signature",
				"sender": single_key_signature(sender, &to_sign),
				"secondary_signer_addresses": secondary_addresses,
				"secondary_signers": secondary
					.iter()
					.map(|a| single_key_signature(a, &to_sign))
					.collect::<Vec<_>>(),
			})
		};

		let submitted: SubmitResponse = self
			.post(&["transactions"], &request)
			.await
			.map_err(rejected)?
			.ok_or_else(|| ChainflowError::SubmissionRejected("transactions endpoint not found".into()))?;

		tracing::debug!(
			hash = %submitted.hash,
			function = %operation.function(),
			sequence_number,
			secondary = secondary.len(),
			"transaction submitted"
		);
		Ok(TxHash(submitted.hash))
	}
}

/// Single-key secp256k1 account signature over `message`.
fn single_key_signature(account: &Account, message: &[u8]) -> Value {
	let signature = account.keys().sign(message);
	json!({
		"type": "single_key_signature",
		"public_key": { "type": "secp256k1_ecdsa", "value": account.keys().public_key_hex() },
		"signature": { "type": "secp256k1_ecdsa", "value": format!("0x{}", hex::encode(signature)) },
	})
}

#[async_trait::async_trait]
impl LedgerClient for RestClient {
	async fn sign_and_submit(&self, account: &Account, operation: &Operation) -> Result<TxHash> {
		self.submit_signed(account, &[], operation).await
	}

	async fn sign_and_submit_multi_agent(
		&self,
		sender: &Account,
		secondary: &[&Account],
		operation: &Operation,
	) -> Result<TxHash> {
		if secondary.is_empty() {
			return Err(ChainflowError::BuildInvalid(
				"multi-agent submission needs at least one secondary signer".into(),
			));
		}
		self.submit_signed(sender, secondary, operation).await
	}

	async fn transaction_status(&self, hash: &TxHash) -> Result<TxStatus> {
		let resp: Option<TransactionResponse> =
			self.get(&["transactions", "by_hash", &hash.0]).await?;
		match resp {
			None => Ok(TxStatus::NotFound),
			Some(TransactionResponse::PendingTransaction) => Ok(TxStatus::Pending),
			Some(TransactionResponse::UserTransaction {
				success,
				vm_status,
				gas_used,
				gas_unit_price,
			}) => {
				let fee = parse_u64(&gas_used, "gas_used")?
					.saturating_mul(parse_u64(&gas_unit_price, "gas_unit_price")?);
				Ok(TxStatus::Committed {
					success,
					vm_status,
					fee,
				})
			}
			Some(TransactionResponse::Other) => Err(ChainflowError::Decode(format!(
				"{hash} is not a user transaction"
			))),
		}
	}

	async fn resource(
		&self,
		address: AccountAddress,
		resource_type: &str,
	) -> Result<Option<ResourceData>> {
		let resp: Option<ResourceResponse> = self
			.get(&["accounts", &address.to_hex(), "resource", resource_type])
			.await?;
		resp.map(|r| ResourceData::decode(&r.resource_type, r.data))
			.transpose()
	}

	async fn chain_id(&self) -> Result<u8> {
		let info: Option<LedgerInfo> = self.get(&[]).await?;
		info.map(|i| i.chain_id)
			.ok_or_else(|| ChainflowError::Query("ledger info endpoint not found".into()))
	}

	async fn view(&self, call: &ViewCall) -> Result<Vec<Value>> {
		self.post(&["view"], &call.request_json())
			.await?
			.ok_or_else(|| ChainflowError::Query(format!("view {} not found", call.function())))
	}

	async fn table_item(
		&self,
		handle: &str,
		key_type: &str,
		value_type: &str,
		key: Value,
	) -> Result<Option<Value>> {
		let body = json!({
			"key_type": key_type,
			"value_type": value_type,
			"key": key,
		});
		self.post(&["tables", handle, "item"], &body).await
	}
}

/// 404 maps to `None`; other non-success statuses carry the API message.
async fn read_optional<T: DeserializeOwned>(resp: reqwest::Response) -> Result<Option<T>> {
	let status = resp.status();
	if status == StatusCode::NOT_FOUND {
		return Ok(None);
	}
	if !status.is_success() {
		let text = resp.text().await.unwrap_or_default();
		let message = match serde_json::from_str::<ApiError>(&text) {
			Ok(ApiError {
				message,
				error_code: Some(code),
			}) => format!("{code}: {message}"),
			Ok(ApiError { message, .. }) => message,
			Err(_) => text,
		};
		return Err(ChainflowError::Query(format!("HTTP {status}: {message}")));
	}
	Ok(Some(resp.json().await?))
}

fn rejected(e: ChainflowError) -> ChainflowError {
	match e {
		ChainflowError::Query(msg) => ChainflowError::SubmissionRejected(msg),
		other => other,
	}
}
