//! Transaction signing for the staking flow system.
//!
//! Each chain family has its own unsigned transaction encoding and signature
//! scheme. Implementations take the opaque unsigned transaction produced by
//! the staking API and return the signed transaction in the encoding the API
//! expects for broadcast. The [`SignerRegistry`] maps chain identifiers to
//! the signer configured for them.

use async_trait::async_trait;
use staking_config::ChainConfig;
use staking_types::{
	ConfigSchema, ImplementationRegistry, SecretString, SignedTransaction, UnsignedTransaction,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod evm;
	pub mod near;
	pub mod solana;
	pub mod ton;
}

/// Errors that can occur during signing operations.
#[derive(Debug, Error)]
pub enum SignerError {
	/// No signer is registered for the chain.
	#[error("No signer registered for chain '{0}'")]
	NotFound(String),
	/// Error that occurs when a cryptographic key is invalid or malformed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	/// The unsigned transaction could not be decoded.
	#[error("Invalid transaction: {0}")]
	InvalidTransaction(String),
	/// Error that occurs when signing operations fail.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// The signer section is invalid.
	#[error("Invalid configuration: {0}")]
	Configuration(String),
}

/// Trait defining the interface for signer implementations.
///
/// Implementations are constructed once from their `[signers.<chain_id>]`
/// section and may be shared between flows.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait SignerInterface: Send + Sync {
	/// Returns the configuration schema for this signer implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Signs the unsigned transaction returned by the staking API for
	/// `chain_id`.
	async fn sign_transaction(
		&self,
		unsigned: &UnsignedTransaction,
		chain_id: &str,
		config: &ChainConfig,
	) -> Result<SignedTransaction, SignerError>;
}

/// Type alias for signer factory functions.
pub type SignerFactory = fn(&toml::Value) -> Result<Box<dyn SignerInterface>, SignerError>;

/// Registry trait for signer implementations.
pub trait SignerFactoryRegistry: ImplementationRegistry<Factory = SignerFactory> {}

/// Get all registered signer implementations.
///
/// Returns a vector of (name, factory) tuples for all available signer
/// implementations.
pub fn get_all_implementations() -> Vec<(&'static str, SignerFactory)> {
	use implementations::{evm, near, solana, ton};

	vec![
		(near::Registry::NAME, near::Registry::factory()),
		(solana::Registry::NAME, solana::Registry::factory()),
		(evm::Registry::NAME, evm::Registry::factory()),
		(ton::Registry::NAME, ton::Registry::factory()),
	]
}

/// Signers keyed by chain identifier.
#[derive(Clone, Default)]
pub struct SignerRegistry {
	signers: HashMap<String, Arc<dyn SignerInterface>>,
}

impl SignerRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `signer` for `chain_id`, replacing any previous one.
	pub fn register(&mut self, chain_id: impl Into<String>, signer: Arc<dyn SignerInterface>) {
		self.signers.insert(chain_id.into(), signer);
	}

	/// Returns the signer for `chain_id`.
	pub fn resolve(&self, chain_id: &str) -> Result<Arc<dyn SignerInterface>, SignerError> {
		self.signers
			.get(chain_id)
			.cloned()
			.ok_or_else(|| SignerError::NotFound(chain_id.to_string()))
	}

	/// Chain identifiers with a registered signer, sorted.
	pub fn chains(&self) -> Vec<&str> {
		let mut chains: Vec<&str> = self.signers.keys().map(String::as_str).collect();
		chains.sort_unstable();
		chains
	}

	pub fn is_empty(&self) -> bool {
		self.signers.is_empty()
	}
}

impl std::fmt::Debug for SignerRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SignerRegistry")
			.field("chains", &self.chains())
			.finish()
	}
}

/// Name of the implementation a `[signers.<chain_id>]` section selects.
///
/// The optional `implementation` key wins; otherwise the chain identifier
/// itself names the implementation.
pub fn implementation_name<'a>(chain_id: &'a str, section: &'a toml::Value) -> &'a str {
	section
		.get("implementation")
		.and_then(|v| v.as_str())
		.unwrap_or(chain_id)
}

/// Reads key material from a signer section without copying it into a plain
/// `String`.
pub(crate) fn secret_field(config: &toml::Value, name: &str) -> Result<SecretString, SignerError> {
	config
		.get(name)
		.and_then(|v| v.as_str())
		.map(SecretString::from)
		.ok_or_else(|| SignerError::Configuration(format!("{} is required", name)))
}

/// Reads a list of secrets given either as an array or as one comma
/// separated string. Blank entries are dropped.
pub(crate) fn secret_list(config: &toml::Value, name: &str) -> Result<Vec<SecretString>, SignerError> {
	let entries: Vec<&str> = match config.get(name) {
		Some(toml::Value::String(joined)) => joined.split(',').collect(),
		Some(toml::Value::Array(items)) => items.iter().filter_map(|v| v.as_str()).collect(),
		_ => return Err(SignerError::Configuration(format!("{} is required", name))),
	};

	let secrets: Vec<SecretString> = entries
		.into_iter()
		.map(str::trim)
		.filter(|entry| !entry.is_empty())
		.map(SecretString::from)
		.collect();
	if secrets.is_empty() {
		return Err(SignerError::Configuration(format!("{} cannot be empty", name)));
	}
	Ok(secrets)
}

/// The encoded form of an unsigned transaction.
///
/// Every registered signer takes a string encoding (hex or base64); any
/// other JSON shape is rejected rather than guessed at.
pub(crate) fn encoded_payload(unsigned: &UnsignedTransaction) -> Result<&str, SignerError> {
	unsigned.as_str().map(str::trim).ok_or_else(|| {
		SignerError::InvalidTransaction(format!(
			"expected an encoded string, got {}",
			unsigned.as_value()
		))
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_all_implementations_have_unique_names() {
		let names: Vec<&str> = get_all_implementations()
			.into_iter()
			.map(|(name, _)| name)
			.collect();
		assert_eq!(names, vec!["near", "solana", "evm", "ton"]);
	}

	#[test]
	fn test_secret_list_accepts_array_and_comma_string() {
		let array: toml::Value = toml::from_str("keys = [\"a\", \" b \"]").unwrap();
		let joined: toml::Value = toml::from_str("keys = \"a, b,,\"").unwrap();

		for config in [array, joined] {
			let keys = secret_list(&config, "keys").unwrap();
			let exposed: Vec<&str> = keys.iter().map(SecretString::expose_secret).collect();
			assert_eq!(exposed, vec!["a", "b"]);
		}

		let blank: toml::Value = toml::from_str("keys = \" , \"").unwrap();
		assert!(matches!(
			secret_list(&blank, "keys"),
			Err(SignerError::Configuration(_))
		));
	}

	#[test]
	fn test_structured_payload_is_not_an_encoding() {
		let unsigned = UnsignedTransaction::new(serde_json::json!({ "psbt": "70736274ff" }));
		let err = encoded_payload(&unsigned).unwrap_err();
		assert!(matches!(err, SignerError::InvalidTransaction(_)));

		let unsigned = UnsignedTransaction::new(" 0xabc ");
		assert_eq!(encoded_payload(&unsigned).unwrap(), "0xabc");
	}

	#[test]
	fn test_resolve_unknown_chain() {
		let registry = SignerRegistry::new();
		let err = registry.resolve("xrp").err().unwrap();
		assert!(matches!(err, SignerError::NotFound(ref c) if c == "xrp"));
		assert_eq!(err.to_string(), "No signer registered for chain 'xrp'");
	}

	#[test]
	fn test_implementation_name_defaults_to_chain() {
		let explicit: toml::Value = toml::from_str("implementation = \"evm\"").unwrap();
		let implicit = toml::Value::Table(toml::map::Map::new());

		assert_eq!(implementation_name("polygon", &explicit), "evm");
		assert_eq!(implementation_name("near", &implicit), "near");
	}

	#[test]
	fn test_factories_reject_empty_sections() {
		let empty = toml::Value::Table(toml::map::Map::new());
		for (name, factory) in get_all_implementations() {
			assert!(
				matches!(factory(&empty), Err(SignerError::Configuration(_))),
				"{} accepted an empty section",
				name
			);
		}
	}
}
