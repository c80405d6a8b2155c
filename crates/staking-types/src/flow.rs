//! Flow actions and staking API payloads.
//!
//! The staking API speaks camelCase JSON. Every payload here serializes to
//! exactly the shape the API expects; optional `extra` objects are omitted
//! entirely when absent rather than sent as `null`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Transaction hash reported by the staking API after a broadcast.
pub type TransactionHash = String;

/// The staking operations driven through the initiate/sign/broadcast pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
	Stake,
	Unstake,
	Withdraw,
}

impl Action {
	/// Returns the path segment used by the staking API for this action.
	pub fn as_str(&self) -> &'static str {
		match self {
			Action::Stake => "stake",
			Action::Unstake => "unstake",
			Action::Withdraw => "withdraw",
		}
	}

	/// Human readable name of the initiate call, used as an error prefix.
	pub fn request_label(&self) -> &'static str {
		match self {
			Action::Stake => "Stake request",
			Action::Unstake => "Unstake request",
			Action::Withdraw => "Withdraw request",
		}
	}
}

impl fmt::Display for Action {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Amount to stake, forwarded to the API in the form it was configured.
///
/// Integers and decimals are sent as JSON numbers. Strings cover amounts in
/// base units that do not fit a float (lamports, yoctoNEAR, wei).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
	Number(serde_json::Number),
	Text(String),
}

impl Amount {
	/// Returns true when the amount parses as a number greater than zero.
	pub fn is_positive(&self) -> bool {
		match self {
			Amount::Number(n) => n.as_f64().is_some_and(|v| v > 0.0),
			Amount::Text(s) => s.trim().parse::<f64>().is_ok_and(|v| v > 0.0),
		}
	}
}

impl From<u64> for Amount {
	fn from(value: u64) -> Self {
		Amount::Number(value.into())
	}
}

impl From<&str> for Amount {
	fn from(value: &str) -> Self {
		Amount::Text(value.to_string())
	}
}

impl fmt::Display for Amount {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Amount::Number(n) => write!(f, "{}", n),
			Amount::Text(s) => f.write_str(s),
		}
	}
}

/// Opaque unsigned transaction returned by the initiate call.
///
/// Its encoding (hex extrinsic, base64 wire transaction, borsh, BOC, or a
/// structured object) is only meaningful to the signer of the chain it was
/// produced for, so the JSON value is kept exactly as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnsignedTransaction(Value);

impl UnsignedTransaction {
	pub fn new(raw: impl Into<Value>) -> Self {
		Self(raw.into())
	}

	/// The payload as an encoded string, when it is one.
	pub fn as_str(&self) -> Option<&str> {
		self.0.as_str()
	}

	pub fn as_value(&self) -> &Value {
		&self.0
	}

	/// Null, a blank string, or an empty array or object.
	pub fn is_empty(&self) -> bool {
		match &self.0 {
			Value::Null => true,
			Value::String(s) => s.trim().is_empty(),
			Value::Array(items) => items.is_empty(),
			Value::Object(map) => map.is_empty(),
			Value::Bool(_) | Value::Number(_) => false,
		}
	}
}

impl fmt::Display for UnsignedTransaction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.0 {
			Value::String(s) => f.write_str(s),
			other => write!(f, "{}", other),
		}
	}
}

/// Opaque signed transaction produced by a signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignedTransaction(String);

impl SignedTransaction {
	pub fn new(encoded: impl Into<String>) -> Self {
		Self(encoded.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for SignedTransaction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Payload of the initiate call (`POST /staking/{action}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
	pub chain: String,
	pub network: String,
	pub staker_address: String,
	pub amount: Amount,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub extra: Option<Map<String, Value>>,
}

/// Payload of the broadcast call (`POST /transaction/broadcast`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastRequest {
	pub chain: String,
	pub network: String,
	pub signed_transaction: SignedTransaction,
	pub staker_address: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub extra: Option<Map<String, Value>>,
}

/// `result` object of a successful initiate response.
///
/// Older API revisions name the payload `unsignedTransactionData`; both
/// spellings are accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateResult {
	#[serde(default, alias = "unsignedTransactionData")]
	pub unsigned_transaction: Option<UnsignedTransaction>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub extra_data: Option<Value>,
}

impl InitiateResult {
	pub fn new(unsigned_transaction: UnsignedTransaction) -> Self {
		Self {
			unsigned_transaction: Some(unsigned_transaction),
			extra_data: None,
		}
	}
}

/// Raw `result` object of a broadcast response.
///
/// The hash may sit at several paths depending on the chain; extraction is
/// left to the result normalizer so the shape knowledge lives in one place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BroadcastResult(pub Value);

impl BroadcastResult {
	pub fn raw(&self) -> &Value {
		&self.0
	}
}
