//! Solana signer.
//!
//! A Solana wire transaction is a compact-u16 count of signatures, that many
//! 64 byte signature slots, then the message. The first
//! `num_required_signatures` account keys of the message are the signers,
//! and slot `i` holds the signature of account key `i`. Versioned messages
//! carry a one byte prefix with the high bit set before the header.

use crate::{encoded_payload, secret_list, SignerError, SignerInterface};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use ed25519_dalek::{Signer, SigningKey};
use staking_config::ChainConfig;
use staking_types::{
	ConfigSchema, Field, FieldType, Schema, SignedTransaction, UnsignedTransaction,
	ValidationError,
};

const SIGNATURE_LEN: usize = 64;
const PUBKEY_LEN: usize = 32;
const VERSION_PREFIX_MASK: u8 = 0x80;

/// Configuration schema for the Solana signer.
pub struct SolanaSignerSchema;

impl SolanaSignerSchema {
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		Self.validate(config)
	}
}

impl ConfigSchema for SolanaSignerSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("private_keys", FieldType::StringList).with_validator(|value| {
				let empty = match value {
					toml::Value::Array(keys) => keys.is_empty(),
					other => other.as_str().is_some_and(|joined| joined.trim().is_empty()),
				};
				if empty {
					return Err("at least one private key is required".to_string());
				}
				Ok(())
			})],
			vec![Field::new("implementation", FieldType::String)],
		);
		schema.validate(config)
	}
}

/// Ed25519 signer for Solana transactions, holding one or more keypairs.
pub struct SolanaSigner {
	keypairs: Vec<SigningKey>,
}

/// Byte ranges of a decoded wire transaction.
struct WireLayout {
	signatures_offset: usize,
	signature_count: usize,
	message_offset: usize,
	required_signers: Vec<[u8; PUBKEY_LEN]>,
}

impl SolanaSigner {
	/// Creates a signer from base58 encoded 64 byte keypairs.
	pub fn from_keypairs<S: AsRef<str>>(encoded: &[S]) -> Result<Self, SignerError> {
		if encoded.is_empty() {
			return Err(SignerError::InvalidKey("no keypairs supplied".into()));
		}

		let keypairs = encoded
			.iter()
			.enumerate()
			.map(|(i, key)| {
				let bytes = bs58::decode(key.as_ref().trim())
					.into_vec()
					.map_err(|e| SignerError::InvalidKey(format!("key {}: invalid base58: {}", i, e)))?;
				let keypair: [u8; 64] = bytes.as_slice().try_into().map_err(|_| {
					SignerError::InvalidKey(format!(
						"key {}: expected 64 byte keypair, got {} bytes",
						i,
						bytes.len()
					))
				})?;
				SigningKey::from_keypair_bytes(&keypair)
					.map_err(|e| SignerError::InvalidKey(format!("key {}: {}", i, e)))
			})
			.collect::<Result<Vec<_>, _>>()?;

		Ok(Self { keypairs })
	}

	fn sign_wire(&self, mut wire: Vec<u8>) -> Result<Vec<u8>, SignerError> {
		let layout = parse_layout(&wire)?;
		let message = wire[layout.message_offset..].to_vec();

		for keypair in &self.keypairs {
			let pubkey = keypair.verifying_key().to_bytes();
			let index = layout
				.required_signers
				.iter()
				.position(|signer| signer == &pubkey)
				.ok_or_else(|| {
					SignerError::SigningFailed(format!(
						"{} is not a required signer of this transaction",
						bs58::encode(pubkey).into_string()
					))
				})?;
			if index >= layout.signature_count {
				return Err(SignerError::InvalidTransaction(format!(
					"no signature slot for signer {}",
					index
				)));
			}

			let signature = keypair.sign(&message).to_bytes();
			let start = layout.signatures_offset + index * SIGNATURE_LEN;
			wire[start..start + SIGNATURE_LEN].copy_from_slice(&signature);
		}

		Ok(wire)
	}
}

fn invalid(message: impl Into<String>) -> SignerError {
	SignerError::InvalidTransaction(message.into())
}

/// Decodes a compact-u16 length, returning the value and bytes consumed.
fn decode_compact_u16(bytes: &[u8]) -> Result<(usize, usize), SignerError> {
	let mut value = 0usize;
	for (i, byte) in bytes.iter().take(3).enumerate() {
		value |= usize::from(byte & 0x7f) << (7 * i);
		if byte & 0x80 == 0 {
			return Ok((value, i + 1));
		}
	}
	Err(invalid("malformed compact-u16 length"))
}

fn parse_layout(wire: &[u8]) -> Result<WireLayout, SignerError> {
	let (signature_count, len_size) = decode_compact_u16(wire)?;
	let signatures_offset = len_size;
	let message_offset = signatures_offset + signature_count * SIGNATURE_LEN;
	let message = wire
		.get(message_offset..)
		.filter(|m| !m.is_empty())
		.ok_or_else(|| invalid("transaction truncated before message"))?;

	let header_offset = if message[0] & VERSION_PREFIX_MASK != 0 { 1 } else { 0 };
	let header = message
		.get(header_offset..header_offset + 3)
		.ok_or_else(|| invalid("message header truncated"))?;
	let num_required_signatures = usize::from(header[0]);

	let keys_offset = header_offset + 3;
	let (key_count, key_len_size) = decode_compact_u16(&message[keys_offset..])?;
	if key_count < num_required_signatures {
		return Err(invalid(format!(
			"{} required signatures but only {} account keys",
			num_required_signatures, key_count
		)));
	}

	let keys_start = keys_offset + key_len_size;
	let required_signers = (0..num_required_signatures)
		.map(|i| {
			let start = keys_start + i * PUBKEY_LEN;
			message
				.get(start..start + PUBKEY_LEN)
				.and_then(|key| <[u8; PUBKEY_LEN]>::try_from(key).ok())
				.ok_or_else(|| invalid("account keys truncated"))
		})
		.collect::<Result<Vec<_>, _>>()?;

	Ok(WireLayout {
		signatures_offset,
		signature_count,
		message_offset,
		required_signers,
	})
}

#[async_trait]
impl SignerInterface for SolanaSigner {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(SolanaSignerSchema)
	}

	async fn sign_transaction(
		&self,
		unsigned: &UnsignedTransaction,
		chain_id: &str,
		_config: &ChainConfig,
	) -> Result<SignedTransaction, SignerError> {
		let wire = STANDARD
			.decode(encoded_payload(unsigned)?)
			.map_err(|e| invalid(format!("expected base64: {}", e)))?;

		tracing::debug!(chain = %chain_id, signers = self.keypairs.len(), "Signing Solana transaction");
		let signed = self.sign_wire(wire)?;
		Ok(SignedTransaction::new(STANDARD.encode(signed)))
	}
}

/// Factory function to create a Solana signer from configuration.
///
/// Configuration parameters:
/// - `private_keys`: base58 encoded keypairs, applied in order. Either an
///   array or a single comma separated string.
pub fn create_signer(config: &toml::Value) -> Result<Box<dyn crate::SignerInterface>, SignerError> {
	SolanaSignerSchema::validate_config(config)
		.map_err(|e| SignerError::Configuration(e.to_string()))?;

	let keys = secret_list(config, "private_keys")?;
	let exposed: Vec<&str> = keys.iter().map(|key| key.expose_secret()).collect();
	Ok(Box::new(SolanaSigner::from_keypairs(&exposed)?))
}

/// Registry for the Solana signer implementation.
pub struct Registry;

impl staking_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "solana";
	type Factory = crate::SignerFactory;

	fn factory() -> Self::Factory {
		create_signer
	}
}

impl crate::SignerFactoryRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use ed25519_dalek::{Signature, Verifier};

	fn keypair(seed: u8) -> SigningKey {
		SigningKey::from_bytes(&[seed; 32])
	}

	fn encoded(key: &SigningKey) -> String {
		bs58::encode(key.to_keypair_bytes()).into_string()
	}

	/// Builds an unsigned wire transaction with the given required signers
	/// followed by one read-only program account.
	fn unsigned_wire(signers: &[&SigningKey], versioned: bool) -> Vec<u8> {
		let mut message = Vec::new();
		if versioned {
			message.push(VERSION_PREFIX_MASK);
		}
		message.extend_from_slice(&[signers.len() as u8, 0, 1]);
		message.push(signers.len() as u8 + 1);
		for signer in signers {
			message.extend_from_slice(signer.verifying_key().as_bytes());
		}
		message.extend_from_slice(&[9u8; PUBKEY_LEN]);
		message.extend_from_slice(&[3u8; 32]);
		message.push(0);
		if versioned {
			message.push(0);
		}

		let mut wire = vec![signers.len() as u8];
		wire.extend(std::iter::repeat(0u8).take(signers.len() * SIGNATURE_LEN));
		wire.extend_from_slice(&message);
		wire
	}

	fn chain() -> ChainConfig {
		ChainConfig::new("solana", "devnet", "SoLAddr", "1002282880")
	}

	async fn sign(signer: &SolanaSigner, wire: &[u8]) -> Result<Vec<u8>, SignerError> {
		let unsigned = UnsignedTransaction::new(STANDARD.encode(wire));
		let signed = signer.sign_transaction(&unsigned, "sol", &chain()).await?;
		Ok(STANDARD.decode(signed.as_str()).unwrap())
	}

	fn assert_slot_signed(signed: &[u8], slot: usize, key: &SigningKey, message_offset: usize) {
		let start = 1 + slot * SIGNATURE_LEN;
		let signature = Signature::from_slice(&signed[start..start + SIGNATURE_LEN]).unwrap();
		assert!(key
			.verifying_key()
			.verify(&signed[message_offset..], &signature)
			.is_ok());
	}

	#[tokio::test]
	async fn test_signs_legacy_message() {
		let key = keypair(1);
		let signer = SolanaSigner::from_keypairs(&[encoded(&key)]).unwrap();
		let wire = unsigned_wire(&[&key], false);

		let signed = sign(&signer, &wire).await.unwrap();
		assert_eq!(signed.len(), wire.len());
		assert_eq!(&signed[1 + SIGNATURE_LEN..], &wire[1 + SIGNATURE_LEN..]);
		assert_slot_signed(&signed, 0, &key, 1 + SIGNATURE_LEN);
	}

	#[tokio::test]
	async fn test_signs_versioned_message_in_key_order() {
		let fee_payer = keypair(1);
		let stake_authority = keypair(2);
		// Keys are supplied in the opposite order to the message's signers.
		let signer =
			SolanaSigner::from_keypairs(&[encoded(&stake_authority), encoded(&fee_payer)]).unwrap();
		let wire = unsigned_wire(&[&fee_payer, &stake_authority], true);

		let signed = sign(&signer, &wire).await.unwrap();
		let message_offset = 1 + 2 * SIGNATURE_LEN;
		assert_slot_signed(&signed, 0, &fee_payer, message_offset);
		assert_slot_signed(&signed, 1, &stake_authority, message_offset);
	}

	#[tokio::test]
	async fn test_unknown_signer_rejected() {
		let signer = SolanaSigner::from_keypairs(&[encoded(&keypair(5))]).unwrap();
		let wire = unsigned_wire(&[&keypair(1)], false);

		let err = sign(&signer, &wire).await.unwrap_err();
		assert!(err.to_string().contains("is not a required signer"));
	}

	#[tokio::test]
	async fn test_truncated_transaction_rejected() {
		let signer = SolanaSigner::from_keypairs(&[encoded(&keypair(1))]).unwrap();
		let err = sign(&signer, &[1u8, 0, 0]).await.unwrap_err();
		assert!(matches!(err, SignerError::InvalidTransaction(_)));
	}

	#[test]
	fn test_compact_u16() {
		assert_eq!(decode_compact_u16(&[0x05]).unwrap(), (5, 1));
		assert_eq!(decode_compact_u16(&[0x80, 0x01]).unwrap(), (128, 2));
		assert!(decode_compact_u16(&[0x80, 0x80, 0x80]).is_err());
	}

	#[test]
	fn test_factory() {
		let config: toml::Value = toml::from_str(&format!(
			"private_keys = [\"{}\"]",
			encoded(&keypair(1))
		))
		.unwrap();
		let signer = create_signer(&config).unwrap();
		assert!(signer.config_schema().validate(&config).is_ok());

		let empty: toml::Value = toml::from_str("private_keys = []").unwrap();
		assert!(matches!(
			create_signer(&empty),
			Err(SignerError::Configuration(_))
		));
		let short: toml::Value = toml::from_str("private_keys = [\"3yZe7d\"]").unwrap();
		assert!(matches!(create_signer(&short), Err(SignerError::InvalidKey(_))));
	}

	#[tokio::test]
	async fn test_factory_accepts_comma_separated_keys() {
		let fee_payer = keypair(1);
		let stake_authority = keypair(2);
		let config: toml::Value = toml::from_str(&format!(
			"private_keys = \"{}, {}\"",
			encoded(&fee_payer),
			encoded(&stake_authority)
		))
		.unwrap();
		let signer = create_signer(&config).unwrap();

		let wire = unsigned_wire(&[&fee_payer, &stake_authority], false);
		let signed = signer
			.sign_transaction(&UnsignedTransaction::new(STANDARD.encode(&wire)), "sol", &chain())
			.await
			.unwrap();
		let signed = STANDARD.decode(signed.as_str()).unwrap();
		let message_offset = 1 + 2 * SIGNATURE_LEN;
		assert_slot_signed(&signed, 0, &fee_payer, message_offset);
		assert_slot_signed(&signed, 1, &stake_authority, message_offset);

		let blank: toml::Value = toml::from_str("private_keys = \" \"").unwrap();
		assert!(matches!(
			create_signer(&blank),
			Err(SignerError::Configuration(_))
		));
	}
}
