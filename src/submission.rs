use std::time::Duration;

use crate::account::Account;
use crate::client::{LedgerClient, TxHash, TxStatus};
use crate::error::{ChainflowError, Result};
use crate::operation::Operation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStatus {
	Pending,
	Confirmed,
	Failed,
}

/// Outcome of handing one operation to the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionResult {
	/// Function the operation called, e.g. `0x1::aptos_account::transfer`.
	pub function: String,
	pub hash: TxHash,
	pub status: SubmissionStatus,
	/// Fee charged once resolved; zero while pending.
	pub fee: u64,
	pub vm_status: Option<String>,
}

impl SubmissionResult {
	pub fn pending(function: impl Into<String>, hash: TxHash) -> Self {
		Self {
			function: function.into(),
			hash,
			status: SubmissionStatus::Pending,
			fee: 0,
			vm_status: None,
		}
	}

	pub fn is_resolved(&self) -> bool {
		self.status != SubmissionStatus::Pending
	}
}

#[derive(Debug, Clone, Copy)]
pub struct ConfirmOptions {
	/// Turn a committed-but-reverted transaction into `ExecutionFailed`.
	pub check_success: bool,
	pub timeout: Duration,
	pub poll_interval: Duration,
}

impl Default for ConfirmOptions {
	fn default() -> Self {
		Self {
			check_success: true,
			timeout: Duration::from_secs(20),
			poll_interval: Duration::from_millis(500),
		}
	}
}

/// Sign and transmit `operation`.  Returns as soon as the node has
/// accepted it; the result is always `Pending`.
pub async fn submit(
	client: &dyn LedgerClient,
	account: &Account,
	operation: Operation,
) -> Result<SubmissionResult> {
	let function = operation.function().to_string();
	let hash = client.sign_and_submit(account, &operation).await?;
	tracing::info!(%hash, %function, sender = %account.address(), "submitted");
	Ok(SubmissionResult::pending(function, hash))
}

/// Like [`submit`], with `secondary` co-signing after the sender.
pub async fn submit_multi_agent(
	client: &dyn LedgerClient,
	sender: &Account,
	secondary: &[&Account],
	operation: Operation,
) -> Result<SubmissionResult> {
	let function = operation.function().to_string();
	let hash = client
		.sign_and_submit_multi_agent(sender, secondary, &operation)
		.await?;
	tracing::info!(%hash, %function, sender = %sender.address(), co_signers = secondary.len(), "submitted");
	Ok(SubmissionResult::pending(function, hash))
}

/// Poll until `result` is committed or `opts.timeout` elapses.
///
/// Dropping the returned future stops polling but cannot retract the
/// transaction.
pub async fn await_confirmation(
	client: &dyn LedgerClient,
	result: SubmissionResult,
	opts: &ConfirmOptions,
) -> Result<SubmissionResult> {
	if result.is_resolved() {
		return Ok(result);
	}

	let polled = tokio::time::timeout(
		opts.timeout,
		poll_until_committed(client, &result.hash, opts.poll_interval),
	)
	.await;

	let (success, vm_status, fee) = match polled {
		Ok(outcome) => outcome?,
		Err(_) => {
			tracing::warn!(hash = %result.hash, timeout_ms = opts.timeout.as_millis(), "confirmation timed out");
			return Err(ChainflowError::ConfirmationTimeout {
				hash: result.hash.0,
				waited_ms: opts.timeout.as_millis(),
			});
		}
	};

	if !success && opts.check_success {
		return Err(ChainflowError::ExecutionFailed {
			hash: result.hash.0,
			vm_status,
		});
	}

	let status = if success {
		SubmissionStatus::Confirmed
	} else {
		SubmissionStatus::Failed
	};
	tracing::info!(hash = %result.hash, ?status, fee, "resolved");
	Ok(SubmissionResult {
		status,
		fee,
		vm_status: Some(vm_status),
		..result
	})
}

/// Submit then wait, the pair every workflow step performs.
pub async fn submit_and_confirm(
	client: &dyn LedgerClient,
	account: &Account,
	operation: Operation,
	opts: &ConfirmOptions,
) -> Result<SubmissionResult> {
	let pending = submit(client, account, operation).await?;
	await_confirmation(client, pending, opts).await
}

async fn poll_until_committed(
	client: &dyn LedgerClient,
	hash: &TxHash,
	interval: Duration,
) -> Result<(bool, String, u64)> {
	loop {
		match client.transaction_status(hash).await {
			Ok(TxStatus::Committed {
				success,
				vm_status,
				fee,
			}) => return Ok((success, vm_status, fee)),
			Ok(TxStatus::Pending | TxStatus::NotFound) => {}
			// Transport hiccups are retried until the timeout; malformed
			// responses are not.
			Err(ChainflowError::Query(msg)) => {
				tracing::warn!(%hash, error = %msg, "status poll failed, retrying");
			}
			Err(e) => return Err(e),
		}
		tokio::time::sleep(interval).await;
	}
}
