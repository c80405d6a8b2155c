//! Secret string type for API tokens and signer keys.
//!
//! `SecretString` zeroes its buffer on drop and never prints its contents:
//! Debug, Display and Serialize all emit a redaction marker, so a config or
//! request dumped into the logs cannot leak a bearer token or a private key.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroizing;

const REDACTED: &str = "***REDACTED***";

/// A string that is wiped on drop and redacted in all textual output.
#[derive(Clone, Default)]
pub struct SecretString(Zeroizing<String>);

impl SecretString {
	pub fn new(s: impl Into<String>) -> Self {
		Self(Zeroizing::new(s.into()))
	}

	/// Exposes the secret value.
	///
	/// Only call this at the point where the value is handed to a header,
	/// a key parser or a signing routine.
	pub fn expose_secret(&self) -> &str {
		&self.0
	}

	/// Runs `f` with the exposed value, limiting where the plain text is visible.
	pub fn with_exposed<F, R>(&self, f: F) -> R
	where
		F: FnOnce(&str) -> R,
	{
		f(&self.0)
	}

	pub fn is_empty(&self) -> bool {
		self.0.trim().is_empty()
	}
}

impl fmt::Debug for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "SecretString({})", REDACTED)
	}
}

impl fmt::Display for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl From<String> for SecretString {
	fn from(s: String) -> Self {
		Self::new(s)
	}
}

impl From<&str> for SecretString {
	fn from(s: &str) -> Self {
		Self::new(s)
	}
}

impl PartialEq for SecretString {
	fn eq(&self, other: &Self) -> bool {
		self.0.as_str() == other.0.as_str()
	}
}

impl Eq for SecretString {}

impl Serialize for SecretString {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(REDACTED)
	}
}

impl<'de> Deserialize<'de> for SecretString {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		String::deserialize(deserializer).map(SecretString::new)
	}
}
