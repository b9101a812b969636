/// Signature summary for a function whose shape is known ahead of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionInfo {
	/// Fully-qualified path with short-form address, e.g. `0x1::coin::transfer`.
	pub path: &'static str,
	/// Number of generic type parameters.
	pub type_params: usize,
	/// Number of value parameters, excluding the leading `&signer`s.
	pub params: usize,
}

const fn f(path: &'static str, type_params: usize, params: usize) -> FunctionInfo {
	FunctionInfo {
		path,
		type_params,
		params,
	}
}

/// Framework functions the tutorial workflows call.
pub static KNOWN_FUNCTIONS: &[FunctionInfo] = &[
	f("0x1::aptos_account::transfer", 0, 2),
	f("0x1::aptos_account::transfer_coins", 1, 2),
	f("0x1::coin::transfer", 1, 2),
	f("0x1::managed_coin::register", 1, 0),
	f("0x1::managed_coin::mint", 1, 2),
	f("0x1::managed_coin::burn", 1, 1),
	f("0x1::code::publish_package_txn", 0, 2),
	f("0x1::primary_fungible_store::balance", 1, 2),
	f("0x1::primary_fungible_store::is_frozen", 1, 2),
	f("0x3::token::create_collection_script", 0, 5),
	f("0x3::token::create_token_script", 0, 13),
	f("0x3::token::direct_transfer_script", 0, 5),
	f("0x3::token_transfers::offer_script", 0, 6),
	f("0x3::token_transfers::claim_script", 0, 5),
	f("0x3::token_transfers::cancel_offer_script", 0, 5),
];

/// Look up a framework function by its short-form path.
pub fn lookup(path: &str) -> Option<&'static FunctionInfo> {
	KNOWN_FUNCTIONS.iter().find(|info| info.path == path)
}

// -- Resource and asset type names --

pub const APTOS_COIN: &str = "0x1::aptos_coin::AptosCoin";
pub const TOKEN_STORE: &str = "0x3::token::TokenStore";
pub const FUNGIBLE_ASSET_METADATA: &str = "0x1::fungible_asset::Metadata";
/// Creator-side resource holding the collection and token-data tables.
pub const COLLECTIONS: &str = "0x3::token::Collections";

/// Address of the fungible-asset metadata object paired with the native
/// coin.  Balances migrated out of `CoinStore` live in its primary store.
pub const NATIVE_FA_METADATA: &str = "0xa";

/// Resource type holding an account's balance of `coin_type`.
pub fn coin_store(coin_type: &str) -> String {
	format!("0x1::coin::CoinStore<{coin_type}>")
}

/// Key/value types of the table inside `TokenStore`.
pub const TOKEN_ID_TYPE: &str = "0x3::token::TokenId";
pub const TOKEN_TYPE: &str = "0x3::token::Token";

/// Key/value types of the two tables inside `Collections`.
pub const STRING_TYPE: &str = "0x1::string::String";
pub const COLLECTION_DATA_TYPE: &str = "0x3::token::CollectionData";
pub const TOKEN_DATA_ID_TYPE: &str = "0x3::token::TokenDataId";
pub const TOKEN_DATA_TYPE: &str = "0x3::token::TokenData";
