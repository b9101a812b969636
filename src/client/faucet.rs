use url::Url;

use super::{Faucet, TxHash};
use crate::crypto::AccountAddress;
use crate::error::{ChainflowError, Result};

/// HTTP faucet that answers `POST /mint?amount=&address=` with a JSON
/// array of transaction hashes.
#[derive(Debug, Clone)]
pub struct FaucetClient {
	base: Url,
	http: reqwest::Client,
}

impl FaucetClient {
	pub fn new(url: &str) -> Result<Self> {
		let base = Url::parse(url)
			.map_err(|e| ChainflowError::Config(format!("invalid faucet url {url:?}: {e}")))?;
		if base.cannot_be_a_base() {
			return Err(ChainflowError::Config(format!("faucet url {url:?} cannot be a base")));
		}
		Ok(Self {
			base,
			http: reqwest::Client::new(),
		})
	}

	fn mint_url(&self, address: AccountAddress, amount: u64) -> Url {
		let mut url = self.base.clone();
		if let Ok(mut path) = url.path_segments_mut() {
			path.pop_if_empty().push("mint");
		}
		let bare = address.to_hex();
		url.query_pairs_mut()
			.append_pair("amount", &amount.to_string())
			.append_pair("address", bare.trim_start_matches("0x"));
		url
	}
}

#[async_trait::async_trait]
impl Faucet for FaucetClient {
	async fn fund(&self, address: AccountAddress, amount: u64) -> Result<Vec<TxHash>> {
		let funding_failed = |reason: String| ChainflowError::FundingFailed {
			address: address.to_hex(),
			reason,
		};

		let resp = self
			.http
			.post(self.mint_url(address, amount))
			.send()
			.await
			.map_err(|e| funding_failed(e.to_string()))?;

		let status = resp.status();
		if !status.is_success() {
			let body = resp.text().await.unwrap_or_default();
			return Err(funding_failed(format!("HTTP {status}: {body}")));
		}

		let hashes: Vec<String> = resp
			.json()
			.await
			.map_err(|e| funding_failed(format!("unexpected faucet response: {e}")))?;
		tracing::debug!(%address, amount, count = hashes.len(), "faucet accepted request");
		Ok(hashes.into_iter().map(TxHash).collect())
	}
}
