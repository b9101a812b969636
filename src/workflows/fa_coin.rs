use std::sync::Arc;

use crate::account::Account;
use crate::crypto::AccountAddress;
use crate::error::{ChainflowError, Result};
use crate::operation;
use crate::state::{self, Asset};
use crate::workflow::{Check, Outputs, Workflow, WorkflowStep};

const METADATA_STEP: &str = "read metadata";

fn metadata(out: &Outputs<'_>) -> Result<AccountAddress> {
	let values = out.view(METADATA_STEP)?;
	let first = values
		.first()
		.ok_or_else(|| ChainflowError::BuildInvalid("get_metadata returned nothing".into()))?;
	state::object_address(first)
}

fn change(owner: AccountAddress, delta: i128) -> impl Fn(&Outputs<'_>) -> Result<Vec<Check>> + Send + Sync {
	move |out| {
		Ok(vec![Check::BalanceChange {
			owner,
			asset: Asset::Fungible(metadata(out)?),
			delta,
			pays_fee: false,
		}])
	}
}

fn frozen(owner: AccountAddress, frozen: bool) -> impl Fn(&Outputs<'_>) -> Result<Vec<Check>> + Send + Sync {
	move |out| {
		Ok(vec![Check::Frozen {
			owner,
			metadata: metadata(out)?,
			frozen,
		}])
	}
}

/// Exercise a `fa_coin` module already published under `creator`:
/// mint, transfer, freeze, unfreeze and burn.  The metadata object
/// address read in the first step feeds every later check.
pub fn fa_coin(creator: Arc<Account>, holder: AccountAddress) -> Workflow {
	let c = creator.address();

	Workflow::new("fa-coin")
		.step(WorkflowStep::view(METADATA_STEP, move |_| operation::fa_get_metadata(c)))
		.step(
			WorkflowStep::submit("mint", Arc::clone(&creator), move |_| operation::fa_mint(c, c, 100))
				.expect_with(change(c, 100)),
		)
		.step(
			WorkflowStep::submit("transfer", Arc::clone(&creator), move |_| {
				operation::fa_transfer(c, c, holder, 35)
			})
			.expect_with(move |out| {
				let mut checks = change(c, -35)(out)?;
				checks.extend(change(holder, 35)(out)?);
				Ok(checks)
			}),
		)
		.step(
			WorkflowStep::submit("freeze holder", Arc::clone(&creator), move |_| operation::fa_freeze(c, holder))
				.expect_with(frozen(holder, true)),
		)
		.step(
			WorkflowStep::submit("unfreeze holder", Arc::clone(&creator), move |_| {
				operation::fa_unfreeze(c, holder)
			})
			.expect_with(frozen(holder, false)),
		)
		.step(
			WorkflowStep::submit("burn", creator, move |_| operation::fa_burn(c, holder, 10))
				.expect_with(change(holder, -10)),
		)
}
