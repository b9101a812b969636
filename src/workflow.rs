//! Declarative step lists and the engine that runs them.
//!
//! A workflow is an ordered list of [`WorkflowStep`]s.  Each step
//! produces an [`Action`] and a set of [`Check`]s from the records of the
//! steps before it, so values such as a freshly published object's
//! address can flow forward.  The engine runs steps strictly in order,
//! waits for every submission to commit, and verifies each step's checks
//! against freshly read state before moving on.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::account::Account;
use crate::client::{Faucet, Indexer, LedgerClient};
use crate::crypto::AccountAddress;
use crate::error::{ChainflowError, Result};
use crate::operation::{Operation, TokenId, ViewCall};
use crate::provisioning;
use crate::state::{self, Asset};
use crate::submission::{self, ConfirmOptions, SubmissionResult};

type Producer<T> = Box<dyn Fn(&Outputs<'_>) -> Result<T> + Send + Sync>;

// -- Steps --

/// What a step does once produced.
#[derive(Debug)]
pub enum Action {
	/// Sign `operation` as `signer`, submit it, and wait for success.
	/// `secondary` co-sign in order when the function takes several signers.
	Submit {
		signer: Arc<Account>,
		secondary: Vec<Arc<Account>>,
		operation: Operation,
	},
	/// Credit `address` from the faucet.
	Fund { address: AccountAddress, amount: u64 },
	/// Call a view function; its values are recorded for later steps.
	View(ViewCall),
	/// Nothing to execute; only the checks run.
	Verify,
}

/// A post-condition evaluated against state read after the step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
	Balance {
		owner: AccountAddress,
		asset: Asset,
		expected: u64,
	},
	/// Balance moved by exactly `delta` across the step.  With `pays_fee`
	/// the step's confirmed fee is also expected to have left the account.
	BalanceChange {
		owner: AccountAddress,
		asset: Asset,
		delta: i128,
		pays_fee: bool,
	},
	Owns {
		owner: AccountAddress,
		token: TokenId,
		amount: u64,
	},
	DoesNotOwn {
		owner: AccountAddress,
		token: TokenId,
	},
	Frozen {
		owner: AccountAddress,
		metadata: AccountAddress,
		frozen: bool,
	},
	/// The collection exists under `creator` with this supply.
	Collection {
		creator: AccountAddress,
		name: String,
		supply: u64,
	},
	/// The creator's record of `token` shows this supply.
	TokenData { token: TokenId, supply: u64 },
	/// Number of distinct tokens the indexer reports for `owner`.
	IndexerTokenCount { owner: AccountAddress, count: usize },
}

impl fmt::Display for Check {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Balance { owner, asset, expected } => {
				write!(f, "balance of {asset} at {owner} == {expected}")
			}
			Self::BalanceChange { owner, asset, delta, pays_fee } => {
				write!(f, "balance of {asset} at {owner} changes by {delta}")?;
				if *pays_fee {
					f.write_str(" minus fee")?;
				}
				Ok(())
			}
			Self::Owns { owner, token, amount } => {
				write!(f, "{owner} owns {amount} of {}/{}", token.collection, token.name)
			}
			Self::DoesNotOwn { owner, token } => {
				write!(f, "{owner} does not own {}/{}", token.collection, token.name)
			}
			Self::Frozen { owner, frozen, .. } => write!(f, "store of {owner} frozen == {frozen}"),
			Self::Collection { creator, name, supply } => {
				write!(f, "collection {name} of {creator} has supply {supply}")
			}
			Self::TokenData { token, supply } => {
				write!(f, "token data {}/{} has supply {supply}", token.collection, token.name)
			}
			Self::IndexerTokenCount { owner, count } => {
				write!(f, "indexer reports {count} token(s) owned by {owner}")
			}
		}
	}
}

/// One entry of a workflow.
pub struct WorkflowStep {
	name: String,
	uses_indexer: bool,
	action: Producer<Action>,
	checks: Producer<Vec<Check>>,
}

impl fmt::Debug for WorkflowStep {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WorkflowStep")
			.field("name", &self.name)
			.field("uses_indexer", &self.uses_indexer)
			.finish_non_exhaustive()
	}
}

impl WorkflowStep {
	pub fn new<F>(name: impl Into<String>, action: F) -> Self
	where
		F: Fn(&Outputs<'_>) -> Result<Action> + Send + Sync + 'static,
	{
		Self {
			name: name.into(),
			uses_indexer: false,
			action: Box::new(action),
			checks: Box::new(|_: &Outputs<'_>| Ok(Vec::new())),
		}
	}

	/// Submit the operation `build` produces, signed by `signer`.
	pub fn submit<F>(name: impl Into<String>, signer: Arc<Account>, build: F) -> Self
	where
		F: Fn(&Outputs<'_>) -> Result<Operation> + Send + Sync + 'static,
	{
		Self::submit_multi_agent(name, signer, Vec::new(), build)
	}

	/// Submit an operation that `signer` and every `secondary` account sign.
	pub fn submit_multi_agent<F>(
		name: impl Into<String>,
		signer: Arc<Account>,
		secondary: Vec<Arc<Account>>,
		build: F,
	) -> Self
	where
		F: Fn(&Outputs<'_>) -> Result<Operation> + Send + Sync + 'static,
	{
		Self::new(name, move |out| {
			Ok(Action::Submit {
				signer: Arc::clone(&signer),
				secondary: secondary.clone(),
				operation: build(out)?,
			})
		})
	}

	pub fn fund(name: impl Into<String>, address: AccountAddress, amount: u64) -> Self {
		Self::new(name, move |_| Ok(Action::Fund { address, amount }))
	}

	pub fn view<F>(name: impl Into<String>, build: F) -> Self
	where
		F: Fn(&Outputs<'_>) -> Result<ViewCall> + Send + Sync + 'static,
	{
		Self::new(name, move |out| Ok(Action::View(build(out)?)))
	}

	pub fn verify(name: impl Into<String>) -> Self {
		Self::new(name, |_| Ok(Action::Verify))
	}

	/// Checks computed from prior outputs.
	pub fn expect_with<F>(mut self, checks: F) -> Self
	where
		F: Fn(&Outputs<'_>) -> Result<Vec<Check>> + Send + Sync + 'static,
	{
		self.checks = Box::new(checks);
		self
	}

	pub fn expect(self, checks: Vec<Check>) -> Self {
		self.expect_with(move |_| Ok(checks.clone()))
	}

	/// Mark the step as reading from the indexer.  Such steps are skipped
	/// when the indexer cannot be trusted.
	pub fn with_indexer(mut self) -> Self {
		self.uses_indexer = true;
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn uses_indexer(&self) -> bool {
		self.uses_indexer
	}
}

/// A named, fixed step list.
#[derive(Debug)]
pub struct Workflow {
	pub name: String,
	pub steps: Vec<WorkflowStep>,
}

impl Workflow {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			steps: Vec::new(),
		}
	}

	pub fn step(mut self, step: WorkflowStep) -> Self {
		self.steps.push(step);
		self
	}
}

// -- Records --

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
	Submitted(SubmissionResult),
	Funded(SubmissionResult),
	Viewed(Vec<Value>),
	Verified,
	Skipped(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
	pub index: usize,
	pub name: String,
	pub outcome: StepOutcome,
	pub checks_passed: usize,
}

impl StepRecord {
	pub fn submission(&self) -> Option<&SubmissionResult> {
		match &self.outcome {
			StepOutcome::Submitted(r) | StepOutcome::Funded(r) => Some(r),
			_ => None,
		}
	}

	pub fn is_skipped(&self) -> bool {
		matches!(self.outcome, StepOutcome::Skipped(_))
	}
}

/// Read-only view of the records of completed steps, handed to step
/// producers.
#[derive(Debug, Clone, Copy)]
pub struct Outputs<'a> {
	records: &'a [StepRecord],
}

impl<'a> Outputs<'a> {
	pub fn new(records: &'a [StepRecord]) -> Self {
		Self { records }
	}

	pub fn records(&self) -> &'a [StepRecord] {
		self.records
	}

	pub fn get(&self, name: &str) -> Option<&'a StepRecord> {
		self.records.iter().find(|r| r.name == name)
	}

	/// Values returned by an earlier view step.
	pub fn view(&self, name: &str) -> Result<&'a [Value]> {
		match self.get(name).map(|r| &r.outcome) {
			Some(StepOutcome::Viewed(values)) => Ok(values.as_slice()),
			Some(_) => Err(ChainflowError::BuildInvalid(format!("step {name:?} is not a view"))),
			None => Err(ChainflowError::BuildInvalid(format!("no output from step {name:?}"))),
		}
	}
}

// -- Engine --

/// A step failure: which step, and why.
#[derive(Debug)]
pub struct StepFailure {
	pub index: usize,
	pub name: String,
	pub cause: ChainflowError,
}

impl fmt::Display for StepFailure {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "step {} ({}) failed: {}", self.index, self.name, self.cause)
	}
}

impl std::error::Error for StepFailure {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		Some(&self.cause)
	}
}

#[derive(Debug)]
pub enum WorkflowState {
	NotStarted,
	Running(usize),
	Completed,
	Aborted(StepFailure),
}

/// Whether indexer-backed steps could be trusted during the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexerVerdict {
	/// No step needed the indexer.
	NotConsulted,
	Trusted,
	/// Chain ids diverged; indexer steps were skipped.
	Desync { node: u8, indexer: u8 },
	/// No indexer configured or the chain id could not be read.
	Unavailable(String),
}

#[derive(Debug)]
pub struct WorkflowReport {
	pub workflow: String,
	pub state: WorkflowState,
	pub records: Vec<StepRecord>,
	pub indexer: IndexerVerdict,
}

impl WorkflowReport {
	pub fn is_completed(&self) -> bool {
		matches!(self.state, WorkflowState::Completed)
	}

	pub fn failure(&self) -> Option<&StepFailure> {
		match &self.state {
			WorkflowState::Aborted(f) => Some(f),
			_ => None,
		}
	}

	pub fn skipped(&self) -> impl Iterator<Item = &StepRecord> {
		self.records.iter().filter(|r| r.is_skipped())
	}

	/// `Err` with the failing step if the workflow aborted.
	pub fn into_result(self) -> std::result::Result<Vec<StepRecord>, StepFailure> {
		match self.state {
			WorkflowState::Aborted(f) => Err(f),
			_ => Ok(self.records),
		}
	}
}

/// Runs workflows against one set of external services.
#[derive(Clone)]
pub struct Orchestrator {
	client: Arc<dyn LedgerClient>,
	faucet: Option<Arc<dyn Faucet>>,
	indexer: Option<Arc<dyn Indexer>>,
	confirm: ConfirmOptions,
}

impl Orchestrator {
	pub fn new(client: Arc<dyn LedgerClient>, confirm: ConfirmOptions) -> Self {
		Self {
			client,
			faucet: None,
			indexer: None,
			confirm: ConfirmOptions {
				check_success: true,
				..confirm
			},
		}
	}

	pub fn with_faucet(mut self, faucet: Arc<dyn Faucet>) -> Self {
		self.faucet = Some(faucet);
		self
	}

	pub fn with_indexer(mut self, indexer: Arc<dyn Indexer>) -> Self {
		self.indexer = Some(indexer);
		self
	}

	pub fn client(&self) -> &dyn LedgerClient {
		self.client.as_ref()
	}

	/// Execute `workflow` to completion or to its first failing step.
	/// Already-confirmed steps are never rolled back.
	pub async fn run(&self, workflow: &Workflow) -> WorkflowReport {
		let mut state = WorkflowState::NotStarted;
		let mut records: Vec<StepRecord> = Vec::with_capacity(workflow.steps.len());
		let mut indexer = IndexerVerdict::NotConsulted;
		tracing::info!(workflow = %workflow.name, steps = workflow.steps.len(), "workflow started");

		for (index, step) in workflow.steps.iter().enumerate() {
			state = WorkflowState::Running(index);
			tracing::info!(workflow = %workflow.name, step = index, name = %step.name, "step started");

			if step.uses_indexer {
				if indexer == IndexerVerdict::NotConsulted {
					indexer = self.check_indexer().await;
				}
				if indexer != IndexerVerdict::Trusted {
					let reason = match &indexer {
						IndexerVerdict::Desync { node, indexer } => ChainflowError::IndexerDesync {
							node: *node,
							indexer: *indexer,
						}
						.to_string(),
						IndexerVerdict::Unavailable(why) => why.clone(),
						_ => unreachable!("indexer verdict resolved above"),
					};
					tracing::warn!(step = index, name = %step.name, %reason, "skipping indexer step");
					records.push(StepRecord {
						index,
						name: step.name.clone(),
						outcome: StepOutcome::Skipped(reason),
						checks_passed: 0,
					});
					continue;
				}
			}

			match self.run_step(index, step, &records).await {
				Ok(record) => records.push(record),
				Err(cause) => {
					tracing::error!(workflow = %workflow.name, step = index, name = %step.name, error = %cause, "workflow aborted");
					state = WorkflowState::Aborted(StepFailure {
						index,
						name: step.name.clone(),
						cause,
					});
					break;
				}
			}
		}

		if matches!(state, WorkflowState::Running(_) | WorkflowState::NotStarted) {
			state = WorkflowState::Completed;
			tracing::info!(workflow = %workflow.name, "workflow completed");
		}

		WorkflowReport {
			workflow: workflow.name.clone(),
			state,
			records,
			indexer,
		}
	}

	async fn run_step(&self, index: usize, step: &WorkflowStep, records: &[StepRecord]) -> Result<StepRecord> {
		let outputs = Outputs::new(records);
		let checks = (step.checks)(&outputs)?;

		// Balances that change-checks compare against, read before anything
		// is submitted.
		let mut before = Vec::with_capacity(checks.len());
		for check in &checks {
			before.push(match check {
				Check::BalanceChange { owner, asset, .. } => {
					Some(state::read_balance(self.client(), *owner, asset).await?)
				}
				_ => None,
			});
		}

		let action = (step.action)(&outputs)?;
		let outcome = match action {
			Action::Submit {
				signer,
				secondary,
				operation,
			} if secondary.is_empty() => StepOutcome::Submitted(
				submission::submit_and_confirm(self.client(), &signer, operation, &self.confirm).await?,
			),
			Action::Submit {
				signer,
				secondary,
				operation,
			} => {
				let co_signers: Vec<&Account> = secondary.iter().map(Arc::as_ref).collect();
				let pending =
					submission::submit_multi_agent(self.client(), &signer, &co_signers, operation).await?;
				StepOutcome::Submitted(
					submission::await_confirmation(self.client(), pending, &self.confirm).await?,
				)
			}
			Action::Fund { address, amount } => {
				let faucet = self
					.faucet
					.as_deref()
					.ok_or_else(|| ChainflowError::Config("no faucet configured".into()))?;
				StepOutcome::Funded(
					provisioning::fund(faucet, self.client(), address, amount, &self.confirm).await?,
				)
			}
			Action::View(call) => StepOutcome::Viewed(self.client.view(&call).await?),
			Action::Verify => StepOutcome::Verified,
		};

		let fee = match &outcome {
			StepOutcome::Submitted(r) => r.fee,
			_ => 0,
		};
		for (check, before) in checks.iter().zip(before) {
			self.evaluate(check, before, fee).await?;
			tracing::debug!(step = index, %check, "check passed");
		}

		Ok(StepRecord {
			index,
			name: step.name.clone(),
			outcome,
			checks_passed: checks.len(),
		})
	}

	async fn check_indexer(&self) -> IndexerVerdict {
		let Some(indexer) = &self.indexer else {
			return IndexerVerdict::Unavailable("no indexer configured".into());
		};
		let node = match self.client.chain_id().await {
			Ok(id) => id,
			Err(e) => return IndexerVerdict::Unavailable(format!("node chain id: {e}")),
		};
		let idx = match indexer.chain_id().await {
			Ok(id) => id,
			Err(e) => return IndexerVerdict::Unavailable(format!("indexer chain id: {e}")),
		};
		tracing::info!(node, indexer = idx, "compared chain ids");
		if node == idx {
			IndexerVerdict::Trusted
		} else {
			IndexerVerdict::Desync { node, indexer: idx }
		}
	}

	async fn evaluate(&self, check: &Check, before: Option<u64>, fee: u64) -> Result<()> {
		let failed = |actual: String| {
			Err(ChainflowError::PostConditionFailed(format!("{check}; actual {actual}")))
		};
		match check {
			Check::Balance { owner, asset, expected } => {
				let actual = state::read_balance(self.client(), *owner, asset).await?;
				if actual != *expected {
					return failed(actual.to_string());
				}
			}
			Check::BalanceChange { owner, asset, delta, pays_fee } => {
				let start = before.ok_or_else(|| {
					ChainflowError::PostConditionFailed(format!("{check}; no starting balance"))
				})?;
				let actual = state::read_balance(self.client(), *owner, asset).await?;
				let charged = if *pays_fee { fee as i128 } else { 0 };
				let expected = start as i128 + delta - charged;
				if actual as i128 != expected {
					return failed(format!("{actual} (started at {start}, fee {fee})"));
				}
			}
			Check::Owns { owner, token, amount } => {
				let held = state::read_ownership(self.client(), *owner, token)
					.await?
					.map_or(0, |r| r.amount);
				if held != *amount {
					return failed(held.to_string());
				}
			}
			Check::DoesNotOwn { owner, token } => {
				if let Some(r) = state::read_ownership(self.client(), *owner, token).await? {
					return failed(format!("owns {}", r.amount));
				}
			}
			Check::Frozen { owner, metadata, frozen } => {
				let actual = state::is_frozen(self.client(), *owner, *metadata).await?;
				if actual != *frozen {
					return failed(actual.to_string());
				}
			}
			Check::Collection { creator, name, supply } => {
				match state::read_collection(self.client(), *creator, name).await? {
					None => return failed("no such collection".into()),
					Some(data) if data.supply != *supply => return failed(data.supply.to_string()),
					Some(_) => {}
				}
			}
			Check::TokenData { token, supply } => {
				match state::read_token_data(self.client(), token).await? {
					None => return failed("no such token data".into()),
					Some(data) if data.supply != *supply => return failed(data.supply.to_string()),
					Some(_) => {}
				}
			}
			Check::IndexerTokenCount { owner, count } => {
				let indexer = self
					.indexer
					.as_deref()
					.ok_or_else(|| ChainflowError::Config("no indexer configured".into()))?;
				let owned = state::indexer_owned_tokens(indexer, *owner).await?;
				if owned.len() != *count {
					return failed(owned.len().to_string());
				}
			}
		}
		Ok(())
	}
}
