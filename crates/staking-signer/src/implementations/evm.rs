//! EVM signer (Polygon and other EVM chains).
//!
//! The staking API returns an unsigned RLP transaction, hex encoded. Typed
//! EIP-1559 (`0x02`) and EIP-2930 (`0x01`) payloads and unsigned legacy
//! lists are accepted. Every payload is rebuilt as an EIP-1559 transaction
//! before signing, and the result is the EIP-2718 envelope of the signed
//! transaction.
//!
//! With `rpc_url` set, the nonce is refreshed from the node before signing.
//! `max_fee_per_gas_gwei` and `max_priority_fee_gwei` replace the fees
//! suggested by the staking API.

use crate::{encoded_payload, secret_field, SignerError, SignerInterface};
use alloy::consensus::{SignableTransaction, TxEip1559, TxEip2930, TxEnvelope};
use alloy::eips::eip2718::Encodable2718;
use alloy::primitives::{utils::parse_units, Bytes, TxKind, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::signers::{local::PrivateKeySigner, SignerSync};
use alloy::transports::http::reqwest::Url;
use alloy_rlp::{Decodable, Header};
use async_trait::async_trait;
use staking_config::ChainConfig;
use staking_types::{
	with_0x_prefix, without_0x_prefix, ConfigSchema, Field, FieldType, Schema,
	SignedTransaction, UnsignedTransaction, ValidationError,
};

const EIP2930_TX_TYPE: u8 = 0x01;
const EIP1559_TX_TYPE: u8 = 0x02;
/// First byte of an RLP list; untyped legacy payloads start at or above it.
const RLP_LIST_START: u8 = 0xc0;

/// Configuration schema for the EVM signer.
pub struct EvmSignerSchema;

impl EvmSignerSchema {
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		Self.validate(config)
	}
}

fn gwei_validator(value: &toml::Value) -> Result<(), String> {
	let amount = value.as_str().unwrap_or_default();
	parse_gwei(amount).map(|_| ())
}

impl ConfigSchema for EvmSignerSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("private_key", FieldType::String).with_validator(|value| {
					let key = value.as_str().unwrap_or_default();
					let hex_part = without_0x_prefix(key);
					if hex_part.len() != 64 {
						return Err("Private key must be 64 hex characters (32 bytes)".to_string());
					}
					if hex::decode(hex_part).is_err() {
						return Err("Private key must be valid hexadecimal".to_string());
					}
					Ok(())
				}),
			],
			vec![
				Field::new("implementation", FieldType::String),
				Field::new("rpc_url", FieldType::String).with_validator(|value| {
					let url = value.as_str().unwrap_or_default();
					url.parse::<Url>()
						.map(|_| ())
						.map_err(|e| format!("rpc_url is not a valid URL: {}", e))
				}),
				Field::new("max_fee_per_gas_gwei", FieldType::String).with_validator(gwei_validator),
				Field::new("max_priority_fee_gwei", FieldType::String).with_validator(gwei_validator),
			],
		);
		schema.validate(config)
	}
}

/// Converts a decimal gwei amount such as `"30"` or `"1.5"` to wei.
fn parse_gwei(amount: &str) -> Result<u128, String> {
	let wei = parse_units(amount.trim(), "gwei")
		.map_err(|e| format!("invalid gwei amount '{}': {}", amount, e))?
		.get_absolute();
	u128::try_from(wei).map_err(|_| format!("gwei amount '{}' is too large", amount))
}

/// Fee overrides applied to every transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeeOverrides {
	pub max_fee_per_gas: Option<u128>,
	pub max_priority_fee_per_gas: Option<u128>,
}

/// secp256k1 signer producing EIP-1559 transactions.
pub struct EvmSigner {
	signer: PrivateKeySigner,
	rpc_url: Option<Url>,
	fees: FeeOverrides,
}

impl EvmSigner {
	pub fn from_private_key(key: &str) -> Result<Self, SignerError> {
		let signer = without_0x_prefix(key.trim())
			.parse::<PrivateKeySigner>()
			.map_err(|e| SignerError::InvalidKey(e.to_string()))?;
		Ok(Self {
			signer,
			rpc_url: None,
			fees: FeeOverrides::default(),
		})
	}

	/// Refreshes the nonce from `url` before each signature.
	pub fn with_rpc_url(mut self, url: Url) -> Self {
		self.rpc_url = Some(url);
		self
	}

	pub fn with_fees(mut self, fees: FeeOverrides) -> Self {
		self.fees = fees;
		self
	}

	async fn fetch_nonce(&self, url: &Url) -> Result<u64, SignerError> {
		let provider = ProviderBuilder::new().connect_http(url.clone());
		provider
			.get_transaction_count(self.signer.address())
			.await
			.map_err(|e| SignerError::SigningFailed(format!("failed to fetch nonce: {}", e)))
	}

	fn sign(&self, tx: TxEip1559) -> Result<Vec<u8>, SignerError> {
		let signature = self
			.signer
			.sign_hash_sync(&tx.signature_hash())
			.map_err(|e| SignerError::SigningFailed(e.to_string()))?;
		Ok(TxEnvelope::from(tx.into_signed(signature)).encoded_2718())
	}
}

fn invalid(message: impl std::fmt::Display) -> SignerError {
	SignerError::InvalidTransaction(message.to_string())
}

/// Decodes an unsigned payload into an EIP-1559 transaction.
///
/// The payload must hold exactly one unsigned transaction; signed payloads
/// carry extra fields and are rejected.
fn decode_unsigned(payload: &[u8]) -> Result<TxEip1559, SignerError> {
	let (&first, rest) = payload
		.split_first()
		.ok_or_else(|| invalid("empty transaction"))?;

	let mut buf = rest;
	let tx = match first {
		EIP1559_TX_TYPE => TxEip1559::decode(&mut buf).map_err(invalid)?,
		EIP2930_TX_TYPE => {
			let tx = TxEip2930::decode(&mut buf).map_err(invalid)?;
			TxEip1559 {
				chain_id: tx.chain_id,
				nonce: tx.nonce,
				gas_limit: tx.gas_limit,
				max_fee_per_gas: tx.gas_price,
				max_priority_fee_per_gas: tx.gas_price,
				to: tx.to,
				value: tx.value,
				access_list: tx.access_list,
				input: tx.input,
			}
		},
		b if b >= RLP_LIST_START => {
			buf = payload;
			decode_legacy(&mut buf)?
		},
		other => {
			return Err(invalid(format!("unsupported transaction type 0x{:02x}", other)));
		},
	};

	if !buf.is_empty() {
		return Err(invalid(format!("{} trailing bytes after transaction", buf.len())));
	}
	Ok(tx)
}

/// Decodes an unsigned legacy list, `[nonce, gas_price, gas, to, value,
/// data]` optionally followed by the EIP-155 `chain_id, 0, 0`.
fn decode_legacy(buf: &mut &[u8]) -> Result<TxEip1559, SignerError> {
	let header = Header::decode(buf).map_err(invalid)?;
	if !header.list || header.payload_length > buf.len() {
		return Err(invalid("legacy transaction must be an RLP list"));
	}
	let (mut fields, rest) = buf.split_at(header.payload_length);
	*buf = rest;

	let nonce = u64::decode(&mut fields).map_err(invalid)?;
	let gas_price = u128::decode(&mut fields).map_err(invalid)?;
	let gas_limit = u64::decode(&mut fields).map_err(invalid)?;
	let to = TxKind::decode(&mut fields).map_err(invalid)?;
	let value = U256::decode(&mut fields).map_err(invalid)?;
	let input = Bytes::decode(&mut fields).map_err(invalid)?;

	if fields.is_empty() {
		return Err(invalid("legacy transaction has no chain id"));
	}
	let chain_id = u64::decode(&mut fields).map_err(invalid)?;
	let r = U256::decode(&mut fields).map_err(invalid)?;
	let s = U256::decode(&mut fields).map_err(invalid)?;
	if !r.is_zero() || !s.is_zero() || !fields.is_empty() {
		return Err(invalid("legacy transaction is already signed"));
	}

	Ok(TxEip1559 {
		chain_id,
		nonce,
		gas_limit,
		max_fee_per_gas: gas_price,
		max_priority_fee_per_gas: gas_price,
		to,
		value,
		access_list: Default::default(),
		input,
	})
}

#[async_trait]
impl SignerInterface for EvmSigner {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(EvmSignerSchema)
	}

	async fn sign_transaction(
		&self,
		unsigned: &UnsignedTransaction,
		chain_id: &str,
		_config: &ChainConfig,
	) -> Result<SignedTransaction, SignerError> {
		let payload = hex::decode(without_0x_prefix(encoded_payload(unsigned)?))
			.map_err(|e| invalid(format!("expected hex: {}", e)))?;
		let mut tx = decode_unsigned(&payload)?;

		if let Some(url) = &self.rpc_url {
			tx.nonce = self.fetch_nonce(url).await?;
		}
		if let Some(max_fee) = self.fees.max_fee_per_gas {
			tx.max_fee_per_gas = max_fee;
		}
		if let Some(priority_fee) = self.fees.max_priority_fee_per_gas {
			tx.max_priority_fee_per_gas = priority_fee;
		}

		tracing::debug!(
			chain = %chain_id,
			from = %self.signer.address(),
			nonce = tx.nonce,
			"Signing EIP-1559 transaction"
		);
		let signed = self.sign(tx)?;
		Ok(SignedTransaction::new(with_0x_prefix(&hex::encode(signed))))
	}
}

/// Factory function to create an EVM signer from configuration.
///
/// Configuration parameters:
/// - `private_key`: 32 byte hex key, `0x` prefix optional
/// - `rpc_url` (optional): node used to refresh the nonce
/// - `max_fee_per_gas_gwei` (optional): fee cap in gwei
/// - `max_priority_fee_gwei` (optional): priority fee in gwei
pub fn create_signer(config: &toml::Value) -> Result<Box<dyn crate::SignerInterface>, SignerError> {
	EvmSignerSchema::validate_config(config)
		.map_err(|e| SignerError::Configuration(e.to_string()))?;

	let mut signer = secret_field(config, "private_key")?.with_exposed(EvmSigner::from_private_key)?;

	if let Some(url) = config.get("rpc_url").and_then(|v| v.as_str()) {
		let url = url
			.parse::<Url>()
			.map_err(|e| SignerError::Configuration(format!("invalid rpc_url: {}", e)))?;
		signer = signer.with_rpc_url(url);
	}

	let gwei = |name: &str| -> Result<Option<u128>, SignerError> {
		config
			.get(name)
			.and_then(|v| v.as_str())
			.map(parse_gwei)
			.transpose()
			.map_err(SignerError::Configuration)
	};
	let fees = FeeOverrides {
		max_fee_per_gas: gwei("max_fee_per_gas_gwei")?,
		max_priority_fee_per_gas: gwei("max_priority_fee_gwei")?,
	};

	Ok(Box::new(signer.with_fees(fees)))
}

/// Registry for the EVM signer implementation.
pub struct Registry;

impl staking_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "evm";
	type Factory = crate::SignerFactory;

	fn factory() -> Self::Factory {
		create_signer
	}
}

impl crate::SignerFactoryRegistry for Registry {}
