use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::{ChainflowError, Result};
use crate::submission::ConfirmOptions;

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
	pub network: NetworkConfig,
	#[serde(default)]
	pub signer: SignerConfig,
	#[serde(default)]
	pub confirmation: ConfirmationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
	pub node_url: String,
	pub faucet_url: String,
	#[serde(default)]
	pub indexer_url: Option<String>,
}

/// Key material for the account that publishes modules.  Serialised only
/// when the user writes it into the file themselves; never logged.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SignerConfig {
	#[serde(default, skip_serializing, deserialize_with = "secret_from_str")]
	pub private_key: Option<SecretString>,
}

fn secret_from_str<'de, D>(d: D) -> std::result::Result<Option<SecretString>, D::Error>
where
	D: serde::Deserializer<'de>,
{
	Ok(Option::<String>::deserialize(d)?.map(SecretString::from))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationConfig {
	pub timeout_secs: u64,
	pub poll_interval_ms: u64,
}

impl Default for ConfirmationConfig {
	fn default() -> Self {
		Self {
			timeout_secs: 20,
			poll_interval_ms: 500,
		}
	}
}

impl Default for Config {
	fn default() -> Self {
		Self {
			network: NetworkConfig {
				node_url: "https://fullnode.devnet.aptoslabs.com/v1".into(),
				faucet_url: "https://faucet.devnet.aptoslabs.com".into(),
				indexer_url: Some("https://api.devnet.aptoslabs.com/v1/graphql".into()),
			},
			signer: SignerConfig::default(),
			confirmation: ConfirmationConfig::default(),
		}
	}
}

/// Values supplied on the command line (or through their environment
/// variables) that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
	pub node_url: Option<String>,
	pub faucet_url: Option<String>,
	pub indexer_url: Option<String>,
	pub private_key: Option<String>,
	pub timeout_secs: Option<u64>,
}

impl Config {
	/// Directory where CLI state is stored (~/.chainflow/).
	pub fn dir() -> Result<PathBuf> {
		dirs::home_dir()
			.map(|h| h.join(".chainflow"))
			.ok_or_else(|| ChainflowError::Config("could not determine home directory".into()))
	}

	/// Path to the config file.
	pub fn path() -> Result<PathBuf> {
		Ok(Self::dir()?.join("config.toml"))
	}

	/// Load config from disk, falling back to defaults if no file exists.
	pub fn load() -> Result<Self> {
		let path = Self::path()?;
		if path.exists() {
			let content = std::fs::read_to_string(&path)
				.map_err(|e| ChainflowError::Config(format!("reading {}: {e}", path.display())))?;
			Self::from_toml(&content)
		} else {
			Ok(Self::default())
		}
	}

	pub fn from_toml(content: &str) -> Result<Self> {
		toml::from_str(content).map_err(|e| ChainflowError::Config(e.to_string()))
	}

	/// Persist the current config to disk, creating the directory if needed.
	/// The private key is never written.
	pub fn save(&self) -> Result<PathBuf> {
		let path = Self::path()?;
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)
				.map_err(|e| ChainflowError::Config(format!("creating {}: {e}", parent.display())))?;
		}
		let body = toml::to_string_pretty(self).map_err(|e| ChainflowError::Config(e.to_string()))?;
		std::fs::write(&path, body)
			.map_err(|e| ChainflowError::Config(format!("writing {}: {e}", path.display())))?;
		Ok(path)
	}

	pub fn apply(mut self, o: Overrides) -> Self {
		if let Some(v) = o.node_url {
			self.network.node_url = v;
		}
		if let Some(v) = o.faucet_url {
			self.network.faucet_url = v;
		}
		if let Some(v) = o.indexer_url {
			self.network.indexer_url = Some(v);
		}
		if let Some(v) = o.private_key {
			self.signer.private_key = Some(SecretString::from(v));
		}
		if let Some(v) = o.timeout_secs {
			self.confirmation.timeout_secs = v;
		}
		self
	}

	/// Reject empty endpoints or key material before anything connects.
	pub fn validate(&self) -> Result<()> {
		let non_empty = |value: &str, name: &str| {
			if value.trim().is_empty() {
				Err(ChainflowError::Config(format!("{name} must not be empty")))
			} else {
				Ok(())
			}
		};
		non_empty(&self.network.node_url, "network.node_url")?;
		non_empty(&self.network.faucet_url, "network.faucet_url")?;
		if let Some(url) = &self.network.indexer_url {
			non_empty(url, "network.indexer_url")?;
		}
		if let Some(key) = &self.signer.private_key {
			non_empty(key.expose_secret(), "signer.private_key")?;
		}
		if self.confirmation.timeout_secs == 0 {
			return Err(ChainflowError::Config("confirmation.timeout_secs must be positive".into()));
		}
		Ok(())
	}

	pub fn confirm_options(&self) -> ConfirmOptions {
		ConfirmOptions {
			check_success: true,
			timeout: Duration::from_secs(self.confirmation.timeout_secs),
			poll_interval: Duration::from_millis(self.confirmation.poll_interval_ms.max(1)),
		}
	}
}
