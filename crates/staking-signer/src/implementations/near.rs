//! NEAR signer.
//!
//! The staking API returns a hex encoded borsh `Transaction`. NEAR signs the
//! SHA-256 digest of those bytes with Ed25519, and a borsh
//! `SignedTransaction` is the transaction followed by the signature enum
//! (key type `0` for Ed25519, then the 64 signature bytes).

use crate::{encoded_payload, secret_field, SignerError, SignerInterface};
use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};
use sha2::{Digest, Sha256};
use staking_config::ChainConfig;
use staking_types::{
	without_0x_prefix, ConfigSchema, Field, FieldType, Schema, SignedTransaction,
	UnsignedTransaction, ValidationError,
};

const KEY_PREFIX: &str = "ed25519:";
const ED25519_KEY_TYPE: u8 = 0;

/// Configuration schema for the NEAR signer.
pub struct NearSignerSchema;

impl NearSignerSchema {
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		Self.validate(config)
	}
}

impl ConfigSchema for NearSignerSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("private_key", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(key) if key.starts_with(KEY_PREFIX) => Ok(()),
						_ => Err(format!("private_key must start with '{}'", KEY_PREFIX)),
					}
				}),
			],
			vec![Field::new("implementation", FieldType::String)],
		);
		schema.validate(config)
	}
}

/// Ed25519 signer for NEAR transactions.
pub struct NearSigner {
	signing_key: SigningKey,
}

impl NearSigner {
	/// Creates a signer from a NEAR secret key string, `ed25519:<base58>`.
	///
	/// Both the 64 byte keypair form exported by NEAR wallets and a bare 32
	/// byte seed are accepted.
	pub fn from_secret_key(secret: &str) -> Result<Self, SignerError> {
		let encoded = secret
			.strip_prefix(KEY_PREFIX)
			.ok_or_else(|| SignerError::InvalidKey("unsupported NEAR key type".into()))?;
		let bytes = bs58::decode(encoded)
			.into_vec()
			.map_err(|e| SignerError::InvalidKey(format!("invalid base58: {}", e)))?;

		let signing_key = match bytes.len() {
			64 => {
				let mut keypair = [0u8; 64];
				keypair.copy_from_slice(&bytes);
				SigningKey::from_keypair_bytes(&keypair)
					.map_err(|e| SignerError::InvalidKey(e.to_string()))?
			},
			32 => {
				let mut seed = [0u8; 32];
				seed.copy_from_slice(&bytes);
				SigningKey::from_bytes(&seed)
			},
			n => {
				return Err(SignerError::InvalidKey(format!(
					"expected 32 or 64 key bytes, got {}",
					n
				)))
			},
		};

		Ok(Self { signing_key })
	}

	/// Public key in NEAR's `ed25519:<base58>` notation.
	pub fn public_key(&self) -> String {
		format!(
			"{}{}",
			KEY_PREFIX,
			bs58::encode(self.signing_key.verifying_key().as_bytes()).into_string()
		)
	}

	fn sign_bytes(&self, transaction: &[u8]) -> Vec<u8> {
		let digest = Sha256::digest(transaction);
		let signature = self.signing_key.sign(&digest);

		let mut signed = Vec::with_capacity(transaction.len() + 65);
		signed.extend_from_slice(transaction);
		signed.push(ED25519_KEY_TYPE);
		signed.extend_from_slice(&signature.to_bytes());
		signed
	}
}

#[async_trait]
impl SignerInterface for NearSigner {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(NearSignerSchema)
	}

	async fn sign_transaction(
		&self,
		unsigned: &UnsignedTransaction,
		chain_id: &str,
		_config: &ChainConfig,
	) -> Result<SignedTransaction, SignerError> {
		let transaction = hex::decode(without_0x_prefix(encoded_payload(unsigned)?))
			.map_err(|e| SignerError::InvalidTransaction(format!("expected hex: {}", e)))?;
		if transaction.is_empty() {
			return Err(SignerError::InvalidTransaction("empty transaction".into()));
		}

		tracing::debug!(chain = %chain_id, public_key = %self.public_key(), "Signing NEAR transaction");
		Ok(SignedTransaction::new(hex::encode(
			self.sign_bytes(&transaction),
		)))
	}
}

/// Factory function to create a NEAR signer from configuration.
///
/// Configuration parameters:
/// - `private_key`: secret key in `ed25519:<base58>` form
pub fn create_signer(config: &toml::Value) -> Result<Box<dyn crate::SignerInterface>, SignerError> {
	NearSignerSchema::validate_config(config)
		.map_err(|e| SignerError::Configuration(e.to_string()))?;

	let signer = secret_field(config, "private_key")?.with_exposed(NearSigner::from_secret_key)?;
	Ok(Box::new(signer))
}

/// Registry for the NEAR signer implementation.
pub struct Registry;

impl staking_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "near";
	type Factory = crate::SignerFactory;

	fn factory() -> Self::Factory {
		create_signer
	}
}

impl crate::SignerFactoryRegistry for Registry {}
