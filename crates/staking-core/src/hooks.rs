//! Chain specific adjustments to broadcast requests.
//!
//! Some chains need more in the broadcast `extra` object than what is
//! configured. Each hook is keyed by chain name (the `chain` field of a
//! chain's configuration) and may add keys to the `extra` map after the
//! configured broadcast parameters have been copied in.

use serde_json::{Map, Value};
use staking_types::{Action, UnsignedTransaction};
use std::collections::HashMap;

/// Inputs available to a broadcast hook.
#[derive(Debug, Clone, Copy)]
pub struct BroadcastContext<'a> {
	pub action: Action,
	pub chain_id: &'a str,
	pub unsigned: &'a UnsignedTransaction,
	/// `extraData` returned by the initiate call, if any.
	pub extra_data: Option<&'a Value>,
}

/// Mutates the broadcast `extra` map for one chain.
pub type BroadcastHook = fn(&BroadcastContext<'_>, &mut Map<String, Value>);

/// Broadcast hooks keyed by chain name.
#[derive(Clone)]
pub struct ChainHooks {
	broadcast: HashMap<String, BroadcastHook>,
}

impl ChainHooks {
	/// A hook table with no entries.
	pub fn empty() -> Self {
		Self {
			broadcast: HashMap::new(),
		}
	}

	/// Adds or replaces the broadcast hook of `chain`.
	pub fn with_broadcast_hook(mut self, chain: impl Into<String>, hook: BroadcastHook) -> Self {
		self.broadcast.insert(chain.into(), hook);
		self
	}

	/// Runs the broadcast hook of `chain`, if one is registered.
	pub fn apply_broadcast(
		&self,
		chain: &str,
		context: &BroadcastContext<'_>,
		extra: &mut Map<String, Value>,
	) {
		if let Some(hook) = self.broadcast.get(chain) {
			hook(context, extra);
		}
	}
}

impl std::fmt::Debug for ChainHooks {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut chains: Vec<&String> = self.broadcast.keys().collect();
		chains.sort();
		f.debug_struct("ChainHooks")
			.field("broadcast", &chains)
			.finish()
	}
}

impl Default for ChainHooks {
	fn default() -> Self {
		Self::empty()
			.with_broadcast_hook("ton", ton_unsigned_transaction)
			.with_broadcast_hook("near", near_transaction_id)
	}
}

/// TON broadcasts need the unsigned message alongside the signature.
fn ton_unsigned_transaction(context: &BroadcastContext<'_>, extra: &mut Map<String, Value>) {
	extra.insert(
		"unsignedTransaction".to_string(),
		context.unsigned.as_value().clone(),
	);
}

/// NEAR broadcasts reference the transaction id handed out by initiate.
fn near_transaction_id(context: &BroadcastContext<'_>, extra: &mut Map<String, Value>) {
	if let Some(id) = context
		.extra_data
		.and_then(|data| data.get("transactionId"))
		.filter(|id| !id.is_null())
	{
		extra.insert("transactionId".to_string(), id.clone());
	}
}
