use crate::client::{Faucet, LedgerClient};
use crate::crypto::AccountAddress;
use crate::error::{ChainflowError, Result};
use crate::submission::{await_confirmation, ConfirmOptions, SubmissionResult, SubmissionStatus};

pub use crate::account::create_account;

/// Ask the faucet for `amount` and block until every transaction it
/// issued has committed.  Any failure, including a reverted funding
/// transaction or a timeout, surfaces as `FundingFailed`.
pub async fn fund(
	faucet: &dyn Faucet,
	client: &dyn LedgerClient,
	address: AccountAddress,
	amount: u64,
	opts: &ConfirmOptions,
) -> Result<SubmissionResult> {
	let failed = |reason: String| ChainflowError::FundingFailed {
		address: address.to_hex(),
		reason,
	};

	let hashes = match faucet.fund(address, amount).await {
		Ok(h) => h,
		Err(e @ ChainflowError::FundingFailed { .. }) => return Err(e),
		Err(e) => return Err(failed(e.to_string())),
	};
	if hashes.is_empty() {
		return Err(failed("faucet returned no transactions".into()));
	}

	let check = ConfirmOptions {
		check_success: true,
		..*opts
	};
	let mut last = None;
	for hash in hashes {
		let pending = SubmissionResult::pending("faucet::mint", hash);
		let done = await_confirmation(client, pending, &check)
			.await
			.map_err(|e| failed(e.to_string()))?;
		debug_assert_eq!(done.status, SubmissionStatus::Confirmed);
		last = Some(done);
	}

	tracing::info!(%address, amount, "funded");
	last.ok_or_else(|| failed("faucet returned no transactions".into()))
}
