use anyhow::Result;
use secrecy::ExposeSecret;

use crate::account::create_account;
use crate::cli::{AccountCommand, Cli};
use crate::commands::{resolve_config, resolve_signer};

pub async fn run(cli: &Cli, cmd: &AccountCommand) -> Result<()> {
	match cmd {
		AccountCommand::New => {
			let account = create_account()?;
			println!("Address:     {}", account.address());
			println!("Public key:  {}", account.keys().public_key_hex());
			println!("Private key: {}", account.keys().export_secret_hex().expose_secret());
			println!();
			println!("Store the private key yourself; it is not saved anywhere.");
			println!("Use it with --private-key or CHAINFLOW_PRIVATE_KEY.");
			Ok(())
		}
		AccountCommand::Show => {
			let config = resolve_config(cli)?;
			let account = resolve_signer(&config)?;
			println!("Address:    {}", account.address());
			println!("Public key: {}", account.keys().public_key_hex());
			Ok(())
		}
	}
}
