//! Flow orchestration for the staking flow system.
//!
//! A flow drives one staking action on one chain through a fixed sequence of
//! states:
//!
//! 1. build the initiate request from the chain's configuration
//! 2. ask the staking API for an unsigned transaction
//! 3. resolve the chain's signer and sign the transaction
//! 4. build the broadcast request and broadcast through the staking API
//! 5. extract the transaction hash from the broadcast result
//!
//! Stake, unstake and withdraw all run through [`FlowEngine::run_flow`].
//! Any failure aborts the remaining states; nothing partially completed is
//! ever reported as success.

use staking_api::StakingApiInterface;
use staking_config::Config;
use staking_signer::SignerRegistry;
use staking_types::{truncate_id, Action, InitiateResult, TransactionHash};
use std::sync::Arc;
use tracing::instrument;

pub mod builder;
pub mod error;
pub mod hooks;
pub mod normalizer;
pub mod request;

pub use builder::{BuilderError, FlowEngineBuilder, FlowFactories};
pub use error::{FlowError, FlowErrorKind};
pub use hooks::{BroadcastContext, BroadcastHook, ChainHooks};
pub use normalizer::extract_transaction_hash;
pub use request::RequestBuilder;

/// Runs staking flows against the staking API with the configured signers.
pub struct FlowEngine {
	config: Arc<Config>,
	api: Arc<dyn StakingApiInterface>,
	signers: SignerRegistry,
	requests: RequestBuilder,
}

impl FlowEngine {
	pub fn new(
		config: Arc<Config>,
		api: Arc<dyn StakingApiInterface>,
		signers: SignerRegistry,
		hooks: ChainHooks,
	) -> Self {
		let requests = RequestBuilder::new(config.clone(), hooks);
		Self {
			config,
			api,
			signers,
			requests,
		}
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn signers(&self) -> &SignerRegistry {
		&self.signers
	}

	/// Runs `action` on `chain_id` to completion.
	///
	/// Returns the broadcast transaction hash, or `None` when the API
	/// accepted the broadcast without reporting one. In that case the
	/// transaction has to be verified by hand.
	#[instrument(skip_all, fields(action = %action, chain = %chain_id))]
	pub async fn run_flow(
		&self,
		action: Action,
		chain_id: &str,
	) -> Result<Option<TransactionHash>, FlowError> {
		match self.execute(action, chain_id).await {
			Ok(hash) => Ok(hash),
			Err(kind) => {
				tracing::error!(error = %kind, "{} flow failed", action);
				Err(FlowError::new(action, chain_id, kind))
			},
		}
	}

	async fn execute(
		&self,
		action: Action,
		chain_id: &str,
	) -> Result<Option<TransactionHash>, FlowErrorKind> {
		let request = self.requests.build_initiate_request(action, chain_id)?;
		tracing::info!(
			network = %request.network,
			staker = %request.staker_address,
			amount = %request.amount,
			"Initiating {}",
			action
		);

		let InitiateResult {
			unsigned_transaction,
			extra_data,
		} = self.api.initiate(action, &request).await?;
		let unsigned = unsigned_transaction
			.filter(|tx| !tx.is_empty())
			.ok_or(FlowErrorKind::MissingUnsignedTransaction)?;
		tracing::info!(unsigned = %truncate_id(&unsigned.to_string()), "Unsigned transaction retrieved");

		let signer = self.signers.resolve(chain_id)?;
		let chain = self.config.chain(chain_id)?;
		tracing::info!("Signing transaction");
		let signed = signer
			.sign_transaction(&unsigned, chain_id, chain)
			.await
			.map_err(FlowErrorKind::Signing)?;

		let broadcast = self.requests.build_broadcast_request(
			action,
			chain_id,
			signed,
			&unsigned,
			extra_data.as_ref(),
		)?;
		tracing::info!("Broadcasting signed transaction");
		let result = self.api.broadcast(&broadcast).await?;

		match extract_transaction_hash(result.raw()) {
			Some(hash) => {
				tracing::info!(tx_hash = %hash, "{} transaction broadcast", action);
				Ok(Some(hash))
			},
			None => {
				tracing::warn!(
					"Broadcast accepted without a transaction hash; verify the {} transaction manually",
					action
				);
				Ok(None)
			},
		}
	}
}
