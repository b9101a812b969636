use std::sync::Arc;

use crate::account::Account;
use crate::operation;
use crate::state::Asset;
use crate::workflow::{Check, Workflow, WorkflowStep};

/// Fund two accounts, then move `amount` of the native coin between them.
///
/// The sender's balance is expected to drop by `amount` plus the fee the
/// transfer was charged.
pub fn coin_transfer(sender: Arc<Account>, receiver: Arc<Account>, funding: u64, amount: u64) -> Workflow {
	let (from, to) = (sender.address(), receiver.address());

	Workflow::new("coin-transfer")
		.step(WorkflowStep::fund("fund sender", from, funding).expect(vec![Check::Balance {
			owner: from,
			asset: Asset::native(),
			expected: funding,
		}]))
		.step(WorkflowStep::fund("fund receiver", to, funding).expect(vec![Check::Balance {
			owner: to,
			asset: Asset::native(),
			expected: funding,
		}]))
		.step(
			WorkflowStep::submit("transfer", sender, move |_| {
				operation::transfer_coins(from, to, amount, None)
			})
			.expect(vec![
				Check::BalanceChange {
					owner: to,
					asset: Asset::native(),
					delta: amount as i128,
					pays_fee: false,
				},
				Check::BalanceChange {
					owner: from,
					asset: Asset::native(),
					delta: -(amount as i128),
					pays_fee: true,
				},
			]),
		)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::account::create_account;

	#[test]
	fn three_steps_in_order() {
		let a = Arc::new(create_account().unwrap());
		let b = Arc::new(create_account().unwrap());
		let wf = coin_transfer(a, b, 100_000_000, 35);
		let names: Vec<&str> = wf.steps.iter().map(|s| s.name()).collect();
		assert_eq!(names, ["fund sender", "fund receiver", "transfer"]);
		assert!(wf.steps.iter().all(|s| !s.uses_indexer()));
	}
}
