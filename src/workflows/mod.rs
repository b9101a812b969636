//! The tutorial scripts, each expressed as one fixed step list.

pub mod fa_coin;
pub mod moon_coin;
pub mod nft;
pub mod transfer;

/// Amount the tutorials request from the faucet for every new account.
pub const FAUCET_AMOUNT: u64 = 100_000_000;
