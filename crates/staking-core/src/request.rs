//! Builds staking API payloads from chain configuration.
//!
//! Base fields always come from the chain's `[chains.<chain_id>]` entry. The
//! `extra` object is attached only when it ends up non-empty, so an API that
//! rejects unknown or empty fields never sees one.

use crate::hooks::{BroadcastContext, ChainHooks};
use serde_json::{Map, Value};
use staking_config::{Config, ConfigError, ParamBucket};
use staking_types::{
	Action, BroadcastRequest, SignedTransaction, TransactionRequest, UnsignedTransaction,
};
use std::sync::Arc;

/// Builds initiate and broadcast requests for configured chains.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
	config: Arc<Config>,
	hooks: ChainHooks,
}

impl RequestBuilder {
	pub fn new(config: Arc<Config>, hooks: ChainHooks) -> Self {
		Self { config, hooks }
	}

	/// Request for `POST /staking/{action}`.
	pub fn build_initiate_request(
		&self,
		action: Action,
		chain_id: &str,
	) -> Result<TransactionRequest, ConfigError> {
		let chain = self.config.chain(chain_id)?;

		Ok(TransactionRequest {
			chain: chain.chain.clone(),
			network: chain.network.clone(),
			staker_address: chain.wallet_address.clone(),
			amount: chain.min_amount.clone(),
			extra: chain.extra_params_for(ParamBucket::from(action)).cloned(),
		})
	}

	/// Request for `POST /transaction/broadcast`.
	///
	/// Configured broadcast parameters are copied first; the chain's hook then
	/// runs on top of them.
	pub fn build_broadcast_request(
		&self,
		action: Action,
		chain_id: &str,
		signed: SignedTransaction,
		unsigned: &UnsignedTransaction,
		extra_data: Option<&Value>,
	) -> Result<BroadcastRequest, ConfigError> {
		let chain = self.config.chain(chain_id)?;

		let mut extra = chain
			.extra_params_for(ParamBucket::Broadcast)
			.cloned()
			.unwrap_or_else(Map::new);
		let context = BroadcastContext {
			action,
			chain_id,
			unsigned,
			extra_data,
		};
		self.hooks.apply_broadcast(&chain.chain, &context, &mut extra);

		Ok(BroadcastRequest {
			chain: chain.chain.clone(),
			network: chain.network.clone(),
			signed_transaction: signed,
			staker_address: chain.wallet_address.clone(),
			extra: (!extra.is_empty()).then_some(extra),
		})
	}
}
