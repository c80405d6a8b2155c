//! Staking API client for the staking flow system.
//!
//! The staking API builds unsigned transactions for an action (`initiate`)
//! and relays signed transactions to their chain (`broadcast`). This crate
//! defines the interface the flow orchestrator consumes and an HTTP
//! implementation of it.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use staking_types::{Action, BroadcastRequest, BroadcastResult, InitiateResult, TransactionRequest};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod http;
}

pub use implementations::http::HttpStakingApi;

/// Label used in broadcast failures.
pub const BROADCAST_LABEL: &str = "Transaction broadcast";

/// Errors that can occur when talking to the staking API.
#[derive(Debug, Error)]
pub enum ApiError {
	/// The API rejected the call or could not be reached.
	///
	/// `message` is the API's own error message when it sent one, otherwise
	/// the transport or status text.
	#[error("{context} failed: {message}")]
	Upstream {
		context: &'static str,
		status: Option<u16>,
		message: String,
	},
	/// The configured token cannot be used as a header value.
	#[error("Invalid API token: {0}")]
	InvalidToken(String),
	/// The HTTP client could not be built.
	#[error("HTTP client error: {0}")]
	Client(String),
}

impl ApiError {
	pub fn upstream(context: &'static str, message: impl Into<String>) -> Self {
		ApiError::Upstream {
			context,
			status: None,
			message: message.into(),
		}
	}

	/// HTTP status of the failed call, when a response was received.
	pub fn status(&self) -> Option<u16> {
		match self {
			ApiError::Upstream { status, .. } => *status,
			_ => None,
		}
	}
}

/// Trait defining the interface for staking API clients.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait StakingApiInterface: Send + Sync {
	/// Asks the API to build the unsigned transaction for `action`.
	async fn initiate(
		&self,
		action: Action,
		request: &TransactionRequest,
	) -> Result<InitiateResult, ApiError>;

	/// Submits a signed transaction through the API.
	async fn broadcast(&self, request: &BroadcastRequest) -> Result<BroadcastResult, ApiError>;
}

/// Builds the headers sent with every staking API call.
///
/// The token is sent verbatim as the `authorization` value, so it must
/// already carry its scheme (e.g. `Bearer ...`) if the API expects one.
pub fn build_auth_headers(token: &str) -> Result<HeaderMap, ApiError> {
	let mut authorization =
		HeaderValue::from_str(token).map_err(|e| ApiError::InvalidToken(e.to_string()))?;
	authorization.set_sensitive(true);

	let mut headers = HeaderMap::new();
	headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
	headers.insert(AUTHORIZATION, authorization);
	headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
	Ok(headers)
}
