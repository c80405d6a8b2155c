//! Configuration for the staking flow tools.
//!
//! Configuration is a TOML document with four sections:
//!
//! - `[api]`: staking API base URL, bearer token and request timeout
//! - `[chains.<chain_id>]`: per-chain request fields and extra parameters
//! - `[signers.<chain_id>]`: signer implementation settings
//! - `[flow]`: timing of the unstake/withdraw composite
//!
//! `${VAR}` and `${VAR:-default}` placeholders are resolved from the
//! environment before parsing. Signer sections usually carry private keys,
//! so they are left out of `Debug` output and serialization.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use staking_types::{Action, Amount, SecretString};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
	/// The requested chain identifier has no `[chains.<id>]` entry.
	#[error("Unsupported network: {chain_id}. Supported blockchains are: {supported}")]
	UnknownChain { chain_id: String, supported: String },
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message only; the default rendering dumps the whole input.
		ConfigError::Parse(err.message().to_string())
	}
}

/// Complete configuration for one deployment.
#[derive(Clone, Deserialize, Serialize)]
pub struct Config {
	/// Staking API connection settings.
	pub api: ApiConfig,
	/// Per-chain settings keyed by chain identifier.
	pub chains: HashMap<String, ChainConfig>,
	/// Signer sections keyed by chain identifier. Each table is handed to the
	/// signer factory selected by its `implementation` key.
	#[serde(default, skip_serializing)]
	pub signers: HashMap<String, toml::Value>,
	/// Timing of multi-flow operations.
	#[serde(default)]
	pub flow: FlowConfig,
}

impl fmt::Debug for Config {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut signers: Vec<&str> = self.signers.keys().map(String::as_str).collect();
		signers.sort_unstable();
		f.debug_struct("Config")
			.field("api", &self.api)
			.field("chains", &self.chains)
			.field("signers", &signers)
			.field("flow", &self.flow)
			.finish()
	}
}

/// Staking API connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Base URL, e.g. `https://api.example.com/v1`.
	pub url: String,
	/// Value sent verbatim in the `authorization` header.
	pub token: SecretString,
	/// Per-request timeout in seconds.
	#[serde(default = "default_timeout_seconds")]
	pub timeout_seconds: u64,
}

impl ApiConfig {
	/// Base URL without trailing slashes, ready for path concatenation.
	pub fn base_url(&self) -> &str {
		self.url.trim_end_matches('/')
	}
}

fn default_timeout_seconds() -> u64 {
	30
}

/// Bucket of extra request parameters.
///
/// The three flow actions each have a bucket for their initiate request;
/// `broadcast` applies to the broadcast request of every action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamBucket {
	Stake,
	Unstake,
	Withdraw,
	Broadcast,
}

impl From<Action> for ParamBucket {
	fn from(action: Action) -> Self {
		match action {
			Action::Stake => ParamBucket::Stake,
			Action::Unstake => ParamBucket::Unstake,
			Action::Withdraw => ParamBucket::Withdraw,
		}
	}
}

impl fmt::Display for ParamBucket {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			ParamBucket::Stake => "stake",
			ParamBucket::Unstake => "unstake",
			ParamBucket::Withdraw => "withdraw",
			ParamBucket::Broadcast => "broadcast",
		};
		f.write_str(name)
	}
}

/// Per-chain settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChainConfig {
	/// Chain name understood by the staking API, e.g. `polkadot`.
	pub chain: String,
	/// Network name, e.g. `mainnet` or `testnet`.
	pub network: String,
	/// Address of the staker wallet.
	pub wallet_address: String,
	/// Amount sent with every initiate request.
	pub min_amount: Amount,
	/// Template of a link to the staking pool; `{address}` and `{network}`
	/// are substituted.
	#[serde(default)]
	pub pool_link: Option<String>,
	/// Chain-defined objects merged into requests as `extra`.
	#[serde(default)]
	pub extra_params: HashMap<ParamBucket, Map<String, Value>>,
}

impl ChainConfig {
	pub fn new(
		chain: impl Into<String>,
		network: impl Into<String>,
		wallet_address: impl Into<String>,
		min_amount: impl Into<Amount>,
	) -> Self {
		Self {
			chain: chain.into(),
			network: network.into(),
			wallet_address: wallet_address.into(),
			min_amount: min_amount.into(),
			pool_link: None,
			extra_params: HashMap::new(),
		}
	}

	/// Extra parameters of a bucket, only when configured and non-empty.
	pub fn extra_params_for(&self, bucket: ParamBucket) -> Option<&Map<String, Value>> {
		self.extra_params
			.get(&bucket)
			.filter(|params| !params.is_empty())
	}

	/// Renders the pool link template for this chain's wallet.
	pub fn pool_link(&self) -> Option<String> {
		self.pool_link.as_ref().map(|template| {
			template
				.replace("{address}", &self.wallet_address)
				.replace("{network}", &self.network)
		})
	}
}

/// Timing of multi-flow operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FlowConfig {
	/// Pause between a completed unstake and the following withdraw, letting
	/// the unbonding state settle on chain.
	#[serde(default = "default_withdraw_delay_seconds")]
	pub withdraw_delay_seconds: u64,
}

impl Default for FlowConfig {
	fn default() -> Self {
		Self {
			withdraw_delay_seconds: default_withdraw_delay_seconds(),
		}
	}
}

fn default_withdraw_delay_seconds() -> u64 {
	10
}

/// Resolves `${VAR}` and `${VAR:-default}` placeholders from the environment.
///
/// Input is limited to 1MB so the pattern cannot be fed pathological text.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last_end = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};

		result.push_str(&input[last_end..full_match.start()]);
		result.push_str(&value);
		last_end = full_match.end();
	}
	result.push_str(&input[last_end..]);

	Ok(result)
}

impl Config {
	/// Loads and validates a configuration file.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let content = tokio::fs::read_to_string(path).await?;
		content.parse()
	}

	/// Looks up the settings of a chain.
	pub fn chain(&self, chain_id: &str) -> Result<&ChainConfig, ConfigError> {
		self.chains
			.get(chain_id)
			.ok_or_else(|| ConfigError::UnknownChain {
				chain_id: chain_id.to_string(),
				supported: self.supported_chains().join(", "),
			})
	}

	/// Configured chain identifiers, sorted.
	pub fn supported_chains(&self) -> Vec<&str> {
		let mut ids: Vec<&str> = self.chains.keys().map(String::as_str).collect();
		ids.sort_unstable();
		ids
	}

	fn validate(&self) -> Result<(), ConfigError> {
		let url = self.api.url.trim();
		if url.is_empty() {
			return Err(ConfigError::Validation("API url cannot be empty".into()));
		}
		if !(url.starts_with("http://") || url.starts_with("https://")) {
			return Err(ConfigError::Validation(format!(
				"API url must start with http:// or https://, got '{}'",
				url
			)));
		}
		if self.api.token.is_empty() {
			return Err(ConfigError::Validation("API token cannot be empty".into()));
		}
		if self.api.timeout_seconds == 0 || self.api.timeout_seconds > 300 {
			return Err(ConfigError::Validation(
				"API timeout_seconds must be between 1 and 300".into(),
			));
		}

		if self.chains.is_empty() {
			return Err(ConfigError::Validation(
				"At least one chain must be configured".into(),
			));
		}
		for (chain_id, chain) in &self.chains {
			for (field, value) in [
				("chain", &chain.chain),
				("network", &chain.network),
				("wallet_address", &chain.wallet_address),
			] {
				if value.trim().is_empty() {
					return Err(ConfigError::Validation(format!(
						"Chain '{}' must have a non-empty {}",
						chain_id, field
					)));
				}
			}
			if !chain.min_amount.is_positive() {
				return Err(ConfigError::Validation(format!(
					"Chain '{}' min_amount must be a positive number, got '{}'",
					chain_id, chain.min_amount
				)));
			}
		}

		for chain_id in self.signers.keys() {
			if !self.chains.contains_key(chain_id) {
				return Err(ConfigError::Validation(format!(
					"Signer '{}' does not match any configured chain",
					chain_id
				)));
			}
		}

		if self.flow.withdraw_delay_seconds > 600 {
			return Err(ConfigError::Validation(
				"withdraw_delay_seconds cannot exceed 600".into(),
			));
		}

		Ok(())
	}
}

/// Parses and validates a configuration document, resolving environment
/// variables first.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
