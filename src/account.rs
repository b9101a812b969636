use crate::crypto::{AccountAddress, KeyPair};
use crate::error::Result;

/// A locally held identity: an address plus the key that controls it.
///
/// Balances are ledger state and never cached here.
#[derive(Debug, Clone)]
pub struct Account {
	address: AccountAddress,
	keys: KeyPair,
}

impl Account {
	pub fn from_keys(keys: KeyPair) -> Self {
		Self {
			address: keys.address(),
			keys,
		}
	}

	/// Restore an account from externally supplied key material.
	pub fn from_private_key_hex(hex_str: &str) -> Result<Self> {
		Ok(Self::from_keys(KeyPair::from_secret_hex(hex_str)?))
	}

	pub fn address(&self) -> AccountAddress {
		self.address
	}

	pub fn keys(&self) -> &KeyPair {
		&self.keys
	}
}

/// Generate a brand-new account.  No network call is made; the account
/// only exists on-chain once something (usually the faucet) touches it.
pub fn create_account() -> Result<Account> {
	let account = Account::from_keys(KeyPair::generate()?);
	tracing::debug!(address = %account.address(), "created local account");
	Ok(account)
}
