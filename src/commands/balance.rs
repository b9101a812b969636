use anyhow::Result;

use crate::cli::Cli;
use crate::commands::{resolve_config, Services};
use crate::crypto::AccountAddress;
use crate::state::{self, Asset};

pub async fn run(cli: &Cli, address: &str, coin: Option<&str>, fa: Option<&str>) -> Result<()> {
	let owner: AccountAddress = address.parse()?;
	let asset = match (coin, fa) {
		(_, Some(metadata)) => Asset::Fungible(metadata.parse()?),
		(Some(coin_type), None) => Asset::Coin(coin_type.to_owned()),
		(None, None) => Asset::native(),
	};

	let config = resolve_config(cli)?;
	let services = Services::connect(&config)?;
	let balance = state::read_balance(services.ledger.as_ref(), owner, &asset).await?;

	println!("Account: {owner}");
	println!("Asset:   {asset}");
	println!("Balance: {balance}");
	Ok(())
}
