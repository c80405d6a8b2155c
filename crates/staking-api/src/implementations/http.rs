//! HTTP implementation of the staking API client.
//!
//! Successful responses wrap their payload as `{"result": ...}`; failed ones
//! may carry a JSON body with a `message` field describing the rejection.

use crate::{build_auth_headers, ApiError, StakingApiInterface, BROADCAST_LABEL};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use staking_config::ApiConfig;
use staking_types::{Action, BroadcastRequest, BroadcastResult, InitiateResult, TransactionRequest};
use std::time::Duration;

#[derive(Deserialize)]
struct Envelope<T> {
	result: Option<T>,
}

#[derive(Deserialize)]
struct ErrorBody {
	message: Option<String>,
}

/// Staking API client over HTTP.
pub struct HttpStakingApi {
	client: reqwest::Client,
	base_url: String,
}

impl HttpStakingApi {
	/// Creates a client with the configured timeout and auth headers.
	pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
		let headers = config.token.with_exposed(build_auth_headers)?;
		let client = reqwest::Client::builder()
			.default_headers(headers)
			.pool_idle_timeout(Duration::from_secs(90))
			.pool_max_idle_per_host(10)
			.timeout(Duration::from_secs(config.timeout_seconds))
			.build()
			.map_err(|e| ApiError::Client(e.to_string()))?;

		Ok(Self {
			client,
			base_url: config.base_url().to_string(),
		})
	}

	async fn post<B, T>(
		&self,
		path: &str,
		body: &B,
		context: &'static str,
	) -> Result<Option<T>, ApiError>
	where
		B: Serialize + ?Sized + Sync,
		T: DeserializeOwned,
	{
		let url = format!("{}/{}", self.base_url, path);
		tracing::debug!(%url, "POST");

		let response = self
			.client
			.post(&url)
			.json(body)
			.send()
			.await
			.map_err(|e| ApiError::upstream(context, e.to_string()))?;

		let status = response.status();
		if !status.is_success() {
			let text = response.text().await.unwrap_or_default();
			let message = serde_json::from_str::<ErrorBody>(&text)
				.ok()
				.and_then(|body| body.message)
				.filter(|m| !m.is_empty())
				.unwrap_or_else(|| status.to_string());
			return Err(ApiError::Upstream {
				context,
				status: Some(status.as_u16()),
				message,
			});
		}

		let envelope: Envelope<T> = response.json().await.map_err(|e| ApiError::Upstream {
			context,
			status: Some(status.as_u16()),
			message: format!("invalid response body: {}", e),
		})?;
		Ok(envelope.result)
	}
}

#[async_trait]
impl StakingApiInterface for HttpStakingApi {
	async fn initiate(
		&self,
		action: Action,
		request: &TransactionRequest,
	) -> Result<InitiateResult, ApiError> {
		let path = format!("staking/{}", action.as_str());
		let result = self
			.post::<_, InitiateResult>(&path, request, action.request_label())
			.await?;
		Ok(result.unwrap_or_default())
	}

	async fn broadcast(&self, request: &BroadcastRequest) -> Result<BroadcastResult, ApiError> {
		let result = self
			.post::<_, BroadcastResult>("transaction/broadcast", request, BROADCAST_LABEL)
			.await?;
		Ok(result.unwrap_or_default())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::{
		extract::{Path, State},
		http::{HeaderMap, StatusCode},
		routing::post,
		Json, Router,
	};
	use serde_json::{json, Value};
	use staking_types::{Amount, SecretString, SignedTransaction, UnsignedTransaction};
	use std::sync::{Arc, Mutex};

	type Seen = Arc<Mutex<Vec<(String, Option<String>, Value)>>>;

	async fn record(
		State(seen): State<Seen>,
		Path(action): Path<String>,
		headers: HeaderMap,
		Json(body): Json<Value>,
	) -> (StatusCode, Json<Value>) {
		let auth = headers
			.get("authorization")
			.and_then(|v| v.to_str().ok())
			.map(str::to_string);
		seen.lock().unwrap().push((action.clone(), auth, body));

		match action.as_str() {
			"stake" => (
				StatusCode::OK,
				Json(json!({ "result": {
					"unsignedTransaction": "0xUNSIGNED",
					"extraData": { "transactionId": "tx-1" }
				}})),
			),
			"unstake" => (
				StatusCode::BAD_REQUEST,
				Json(json!({ "message": "Nothing to unstake" })),
			),
			_ => (StatusCode::OK, Json(json!({}))),
		}
	}

	async fn broadcast(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
		if body["signedTransaction"] == "0xBAD" {
			return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!("boom")));
		}
		(
			StatusCode::OK,
			Json(json!({ "result": { "transactionHash": "0xHASH" } })),
		)
	}

	async fn spawn_server() -> (String, Seen) {
		let seen: Seen = Arc::default();
		let app = Router::new()
			.route("/v1/staking/{action}", post(record))
			.route("/v1/transaction/broadcast", post(broadcast))
			.with_state(seen.clone());

		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			axum::serve(listener, app).await.unwrap();
		});
		(format!("http://{}/v1/", addr), seen)
	}

	fn client(url: String) -> HttpStakingApi {
		HttpStakingApi::new(&ApiConfig {
			url,
			token: SecretString::from("Bearer secret"),
			timeout_seconds: 5,
		})
		.unwrap()
	}

	fn request() -> TransactionRequest {
		TransactionRequest {
			chain: "polkadot".into(),
			network: "testnet".into(),
			staker_address: "5Addr".into(),
			amount: Amount::from(1u64),
			extra: None,
		}
	}

	#[tokio::test]
	async fn test_initiate_posts_to_action_path() {
		let (url, seen) = spawn_server().await;
		let api = client(url);

		let result = api.initiate(Action::Stake, &request()).await.unwrap();
		assert_eq!(
			result.unsigned_transaction,
			Some(UnsignedTransaction::new("0xUNSIGNED"))
		);
		assert_eq!(result.extra_data, Some(json!({ "transactionId": "tx-1" })));

		let seen = seen.lock().unwrap();
		let (action, auth, body) = &seen[0];
		assert_eq!(action, "stake");
		assert_eq!(auth.as_deref(), Some("Bearer secret"));
		assert_eq!(
			body,
			&json!({
				"chain": "polkadot",
				"network": "testnet",
				"stakerAddress": "5Addr",
				"amount": 1
			})
		);
	}

	#[tokio::test]
	async fn test_initiate_without_result_is_empty() {
		let (url, _) = spawn_server().await;
		let result = client(url)
			.initiate(Action::Withdraw, &request())
			.await
			.unwrap();
		assert!(result.unsigned_transaction.is_none());
	}

	#[tokio::test]
	async fn test_upstream_message_is_surfaced() {
		let (url, _) = spawn_server().await;
		let err = client(url)
			.initiate(Action::Unstake, &request())
			.await
			.unwrap_err();

		assert_eq!(err.to_string(), "Unstake request failed: Nothing to unstake");
		assert_eq!(err.status(), Some(400));
	}

	#[tokio::test]
	async fn test_broadcast() {
		let (url, _) = spawn_server().await;
		let api = client(url);
		let mut request = BroadcastRequest {
			chain: "polkadot".into(),
			network: "testnet".into(),
			signed_transaction: SignedTransaction::new("0xSIGNED"),
			staker_address: "5Addr".into(),
			extra: None,
		};

		let result = api.broadcast(&request).await.unwrap();
		assert_eq!(result.raw(), &json!({ "transactionHash": "0xHASH" }));

		request.signed_transaction = SignedTransaction::new("0xBAD");
		let err = api.broadcast(&request).await.unwrap_err();
		assert_eq!(
			err.to_string(),
			"Transaction broadcast failed: 500 Internal Server Error"
		);
	}

	#[tokio::test]
	async fn test_unreachable_api() {
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		drop(listener);

		let err = client(format!("http://{}", addr))
			.initiate(Action::Stake, &request())
			.await
			.unwrap_err();
		assert!(err.to_string().starts_with("Stake request failed: "));
		assert_eq!(err.status(), None);
	}
}
