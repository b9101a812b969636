use std::sync::Arc;

use crate::account::Account;
use crate::operation::{self, TokenId};
use crate::state::Asset;
use crate::workflow::{Check, Workflow, WorkflowStep};

pub const COLLECTION: &str = "Alice's";
pub const TOKEN: &str = "Alice's first token";

/// Mint a single token into a new collection and read back the
/// creator's collection and token records.  The token then goes from
/// `alice` to `bob` through an offer/claim pair, and returns in one
/// transaction that both sign.  The last step cross-checks ownership
/// through the indexer and is skipped when the indexer is not on the
/// node's chain.
pub fn simple_nft(alice: Arc<Account>, bob: Arc<Account>, funding: u64) -> Workflow {
	let (a, b) = (alice.address(), bob.address());
	let token = TokenId::new(a, COLLECTION, TOKEN);

	let pays_fee_only = move || Check::BalanceChange {
		owner: a,
		asset: Asset::native(),
		delta: 0,
		pays_fee: true,
	};
	let owns = |owner, amount| Check::Owns {
		owner,
		token: token.clone(),
		amount,
	};
	let lacks = |owner| Check::DoesNotOwn {
		owner,
		token: token.clone(),
	};

	let t_offer = token.clone();
	let t_claim = token.clone();
	let t_data = token.clone();
	let t_return = token.clone();

	Workflow::new("simple-nft")
		.step(WorkflowStep::fund("fund alice", a, funding))
		.step(WorkflowStep::fund("fund bob", b, funding))
		.step(
			WorkflowStep::submit("create collection", Arc::clone(&alice), move |_| {
				operation::create_collection(a, COLLECTION, "Alice's simple collection", "https://alice.com")
			})
			.expect(vec![pays_fee_only()]),
		)
		.step(
			WorkflowStep::submit("create token", Arc::clone(&alice), move |_| {
				operation::create_token(a, COLLECTION, TOKEN, "Alice's simple token", 1, "https://aptos.dev/img/nyan.jpg")
			})
			.expect(vec![owns(a, 1), pays_fee_only()]),
		)
		.step(WorkflowStep::verify("collection data").expect(vec![Check::Collection {
			creator: a,
			name: COLLECTION.to_owned(),
			supply: 1,
		}]))
		.step(WorkflowStep::verify("token data").expect(vec![Check::TokenData {
			token: t_data,
			supply: 1,
		}]))
		.step(
			WorkflowStep::submit("offer to bob", Arc::clone(&alice), move |_| {
				operation::offer_token(a, b, &t_offer, 1)
			})
			.expect(vec![lacks(b)]),
		)
		.step(
			WorkflowStep::submit("bob claims", Arc::clone(&bob), move |_| {
				operation::claim_token(b, a, &t_claim)
			})
			.expect(vec![owns(b, 1), lacks(a)]),
		)
		.step(
			WorkflowStep::submit_multi_agent("direct transfer to alice", bob, vec![alice], move |_| {
				operation::direct_transfer_token(b, &t_return, 1)
			})
			.expect(vec![owns(a, 1), lacks(b)]),
		)
		.step(
			WorkflowStep::verify("indexer ownership")
				.expect(vec![
					Check::IndexerTokenCount { owner: a, count: 1 },
					Check::IndexerTokenCount { owner: b, count: 0 },
				])
				.with_indexer(),
		)
}
