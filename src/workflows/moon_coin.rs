use std::sync::Arc;

use crate::account::Account;
use crate::crypto::AccountAddress;
use crate::operation::{self, Package};
use crate::state::Asset;
use crate::workflow::{Check, Workflow, WorkflowStep};

/// Move type of the MoonCoin published by `publisher`.
pub fn coin_type(publisher: AccountAddress) -> String {
	format!("{}::moon_coin::MoonCoin", publisher.to_short_hex())
}

/// Publish the MoonCoin package, register a store for it, mint 100 to
/// the publisher and send 35 of them to `receiver`.
///
/// `publisher` must already be funded; `receiver` is funded here.
pub fn moon_coin(publisher: Arc<Account>, receiver: Arc<Account>, package: Package, funding: u64) -> Workflow {
	let (owner, bob) = (publisher.address(), receiver.address());
	let moon = Asset::Coin(coin_type(owner));
	let balance_change = move |who: AccountAddress, delta: i128| Check::BalanceChange {
		owner: who,
		asset: Asset::Coin(coin_type(owner)),
		delta,
		pays_fee: false,
	};

	Workflow::new("moon-coin")
		.step(WorkflowStep::fund("fund receiver", bob, funding))
		.step(
			WorkflowStep::submit("publish package", Arc::clone(&publisher), move |_| {
				operation::publish_package(owner, &package)
			})
			.expect(vec![Check::Balance {
				owner: bob,
				asset: moon,
				expected: 0,
			}]),
		)
		.step(
			WorkflowStep::submit("register coin store", Arc::clone(&publisher), move |_| {
				operation::register_coin(owner, &coin_type(owner))
			})
			.expect(vec![balance_change(owner, 0)]),
		)
		.step(
			WorkflowStep::submit("mint", Arc::clone(&publisher), move |_| {
				operation::mint_coin(owner, &coin_type(owner), owner, 100)
			})
			.expect(vec![balance_change(owner, 100), balance_change(bob, 0)]),
		)
		.step(
			WorkflowStep::submit("transfer", publisher, move |_| {
				operation::transfer_coins(owner, bob, 35, Some(&coin_type(owner)))
			})
			.expect(vec![balance_change(owner, -35), balance_change(bob, 35)]),
		)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn coin_type_uses_short_publisher_address() {
		let publisher: AccountAddress = "0x00ad".parse().unwrap();
		assert_eq!(coin_type(publisher), "0xad::moon_coin::MoonCoin");
	}
}
