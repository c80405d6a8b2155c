//! TON signer.
//!
//! The staking API returns a hex encoded bag of cells. Each configured key
//! signs the representation hash of its root cell with Ed25519, and the
//! signed transaction is the hex of all signatures concatenated in key
//! order, which the API aggregates into the multisig message.

use crate::{encoded_payload, secret_list, SignerError, SignerInterface};
use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};
use staking_config::ChainConfig;
use staking_types::{
	without_0x_prefix, ConfigSchema, Field, FieldType, Schema, SignedTransaction,
	UnsignedTransaction, ValidationError,
};
use tonlib_core::cell::BagOfCells;
use tonlib_core::mnemonic::Mnemonic;

/// Configuration schema for the TON signer.
pub struct TonSignerSchema;

impl TonSignerSchema {
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		Self.validate(config)
	}
}

impl ConfigSchema for TonSignerSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("mnemonics", FieldType::StringList)],
			vec![Field::new("implementation", FieldType::String)],
		);
		schema.validate(config)
	}
}

/// Ed25519 signer for TON multisig orders.
pub struct TonSigner {
	keys: Vec<SigningKey>,
}

impl TonSigner {
	/// Derives one key per space separated mnemonic phrase.
	pub fn from_mnemonics<S: AsRef<str>>(phrases: &[S]) -> Result<Self, SignerError> {
		if phrases.is_empty() {
			return Err(SignerError::InvalidKey("no mnemonics supplied".into()));
		}

		let keys = phrases
			.iter()
			.enumerate()
			.map(|(i, phrase)| {
				derive_key(phrase.as_ref())
					.map_err(|e| SignerError::InvalidKey(format!("mnemonic {}: {}", i, e)))
			})
			.collect::<Result<Vec<_>, _>>()?;
		Ok(Self { keys })
	}

	fn sign_hash(&self, hash: &[u8]) -> Vec<u8> {
		self.keys
			.iter()
			.flat_map(|key| key.sign(hash).to_bytes())
			.collect()
	}
}

fn derive_key(phrase: &str) -> Result<SigningKey, String> {
	let words: Vec<&str> = phrase.split_whitespace().collect();
	let keypair = Mnemonic::new(words, &None)
		.and_then(|mnemonic| mnemonic.to_key_pair())
		.map_err(|e| e.to_string())?;

	let seed = keypair
		.secret_key
		.get(..32)
		.and_then(|seed| <[u8; 32]>::try_from(seed).ok())
		.ok_or("derived secret key is too short")?;
	Ok(SigningKey::from_bytes(&seed))
}

#[async_trait]
impl SignerInterface for TonSigner {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(TonSignerSchema)
	}

	async fn sign_transaction(
		&self,
		unsigned: &UnsignedTransaction,
		chain_id: &str,
		_config: &ChainConfig,
	) -> Result<SignedTransaction, SignerError> {
		let boc = BagOfCells::parse_hex(without_0x_prefix(encoded_payload(unsigned)?))
			.map_err(|e| SignerError::InvalidTransaction(format!("invalid bag of cells: {}", e)))?;
		let root = boc
			.single_root()
			.map_err(|e| SignerError::InvalidTransaction(e.to_string()))?;
		let hash = root.cell_hash();

		tracing::debug!(chain = %chain_id, signers = self.keys.len(), "Signing TON cell hash");
		Ok(SignedTransaction::new(hex::encode(
			self.sign_hash(hash.as_slice()),
		)))
	}
}

/// Factory function to create a TON signer from configuration.
///
/// Configuration parameters:
/// - `mnemonics`: one or more 24 word phrases, as an array or a single
///   comma separated string
pub fn create_signer(config: &toml::Value) -> Result<Box<dyn crate::SignerInterface>, SignerError> {
	TonSignerSchema::validate_config(config)
		.map_err(|e| SignerError::Configuration(e.to_string()))?;

	let phrases = secret_list(config, "mnemonics")?;
	let exposed: Vec<&str> = phrases.iter().map(|phrase| phrase.expose_secret()).collect();
	Ok(Box::new(TonSigner::from_mnemonics(&exposed)?))
}

/// Registry for the TON signer implementation.
pub struct Registry;

impl staking_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "ton";
	type Factory = crate::SignerFactory;

	fn factory() -> Self::Factory {
		create_signer
	}
}

impl crate::SignerFactoryRegistry for Registry {}
