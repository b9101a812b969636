use thiserror::Error;

/// Every failure the workflow layer can surface.
///
/// Submission-side variants are kept distinct so callers can tell a
/// transaction that never landed (`SubmissionRejected`,
/// `ConfirmationTimeout`) from one that landed and reverted
/// (`ExecutionFailed`).
#[derive(Debug, Error)]
pub enum ChainflowError {
	#[error("faucet funding failed for {address}: {reason}")]
	FundingFailed { address: String, reason: String },

	#[error("invalid operation: {0}")]
	BuildInvalid(String),

	#[error("submission rejected: {0}")]
	SubmissionRejected(String),

	#[error("transaction {hash} not confirmed within {waited_ms}ms")]
	ConfirmationTimeout { hash: String, waited_ms: u128 },

	#[error("transaction {hash} executed but failed: {vm_status}")]
	ExecutionFailed { hash: String, vm_status: String },

	#[error("post-condition failed: {0}")]
	PostConditionFailed(String),

	#[error("indexer chain id {indexer} does not match node chain id {node}")]
	IndexerDesync { node: u8, indexer: u8 },

	#[error("key material: {0}")]
	KeyMaterial(String),

	#[error("query failed: {0}")]
	Query(String),

	#[error("unexpected response shape: {0}")]
	Decode(String),

	#[error("configuration: {0}")]
	Config(String),
}

pub type Result<T> = std::result::Result<T, ChainflowError>;

impl ChainflowError {
	/// Errors raised before anything reached the network.
	pub fn is_pre_submission(&self) -> bool {
		matches!(
			self,
			Self::BuildInvalid(_) | Self::KeyMaterial(_) | Self::Config(_)
		)
	}
}

impl From<reqwest::Error> for ChainflowError {
	fn from(e: reqwest::Error) -> Self {
		if e.is_decode() {
			Self::Decode(e.to_string())
		} else {
			Self::Query(e.to_string())
		}
	}
}

impl From<serde_json::Error> for ChainflowError {
	fn from(e: serde_json::Error) -> Self {
		Self::Decode(e.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn messages_name_the_transaction() {
		let e = ChainflowError::ExecutionFailed {
			hash: "0xabc".into(),
			vm_status: "Move abort 0x1::coin: EINSUFFICIENT_BALANCE".into(),
		};
		assert_eq!(
			e.to_string(),
			"transaction 0xabc executed but failed: Move abort 0x1::coin: EINSUFFICIENT_BALANCE"
		);

		let t = ChainflowError::ConfirmationTimeout {
			hash: "0xdef".into(),
			waited_ms: 250,
		};
		assert_eq!(t.to_string(), "transaction 0xdef not confirmed within 250ms");
	}

	#[test]
	fn pre_submission_classification() {
		assert!(ChainflowError::BuildInvalid("x".into()).is_pre_submission());
		assert!(!ChainflowError::SubmissionRejected("x".into()).is_pre_submission());
		assert!(!ChainflowError::IndexerDesync { node: 4, indexer: 3 }.is_pre_submission());
	}
}
