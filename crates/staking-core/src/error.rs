//! Flow failures.

use staking_api::ApiError;
use staking_config::ConfigError;
use staking_signer::SignerError;
use staking_types::Action;
use thiserror::Error;

/// What went wrong in a flow.
#[derive(Debug, Error)]
pub enum FlowErrorKind {
	/// Unknown chain identifier or unusable chain configuration.
	#[error(transparent)]
	Configuration(#[from] ConfigError),
	/// The staking API rejected the call or could not be reached.
	#[error(transparent)]
	Upstream(#[from] ApiError),
	/// Initiate succeeded but returned nothing to sign.
	#[error("No unsigned transaction found")]
	MissingUnsignedTransaction,
	/// No signer is registered for the chain.
	#[error("No signer registered for chain '{0}'")]
	SignerNotFound(String),
	/// The signer failed; its own message is preserved.
	#[error(transparent)]
	Signing(SignerError),
}

impl From<SignerError> for FlowErrorKind {
	fn from(err: SignerError) -> Self {
		match err {
			SignerError::NotFound(chain_id) => FlowErrorKind::SignerNotFound(chain_id),
			other => FlowErrorKind::Signing(other),
		}
	}
}

/// A failed flow, tagged with the action and chain it was running.
#[derive(Debug, Error)]
#[error("{action} flow failed on chain '{chain_id}': {kind}")]
pub struct FlowError {
	pub action: Action,
	pub chain_id: String,
	#[source]
	kind: FlowErrorKind,
}

impl FlowError {
	pub fn new(action: Action, chain_id: impl Into<String>, kind: FlowErrorKind) -> Self {
		Self {
			action,
			chain_id: chain_id.into(),
			kind,
		}
	}

	pub fn kind(&self) -> &FlowErrorKind {
		&self.kind
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_display_carries_context() {
		let err = FlowError::new(
			Action::Withdraw,
			"sol",
			FlowErrorKind::MissingUnsignedTransaction,
		);
		assert_eq!(
			err.to_string(),
			"withdraw flow failed on chain 'sol': No unsigned transaction found"
		);
	}

	#[test]
	fn test_signer_not_found_is_its_own_kind() {
		let kind = FlowErrorKind::from(SignerError::NotFound("xrp".into()));
		assert!(matches!(kind, FlowErrorKind::SignerNotFound(ref c) if c == "xrp"));

		let kind = FlowErrorKind::from(SignerError::InvalidKey("bad".into()));
		assert_eq!(kind.to_string(), "Invalid key: bad");
	}

	#[test]
	fn test_upstream_message_is_preserved() {
		let kind = FlowErrorKind::from(ApiError::upstream("Stake request", "Insufficient funds"));
		assert_eq!(kind.to_string(), "Stake request failed: Insufficient funds");
	}
}
