//! Builder pattern for constructing flow engines.
//!
//! Signers are created from their `[signers.<chain_id>]` sections using
//! factory functions keyed by implementation name. The staking API client
//! defaults to the HTTP implementation built from `[api]`; tests and
//! embedders may inject their own.

use crate::hooks::ChainHooks;
use crate::FlowEngine;
use staking_api::{HttpStakingApi, StakingApiInterface};
use staking_config::Config;
use staking_signer::{implementation_name, SignerError, SignerInterface, SignerRegistry};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during flow engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
}

/// Factory functions available to the builder.
pub struct FlowFactories<SF> {
	/// Signer factories keyed by implementation name.
	pub signer_factories: HashMap<String, SF>,
}

/// Builder for constructing a [`FlowEngine`].
pub struct FlowEngineBuilder {
	config: Config,
	api: Option<Arc<dyn StakingApiInterface>>,
	hooks: ChainHooks,
}

impl FlowEngineBuilder {
	pub fn new(config: Config) -> Self {
		Self {
			config,
			api: None,
			hooks: ChainHooks::default(),
		}
	}

	/// Uses `api` instead of an HTTP client built from `[api]`.
	pub fn with_api(mut self, api: Arc<dyn StakingApiInterface>) -> Self {
		self.api = Some(api);
		self
	}

	/// Replaces the default chain hooks.
	pub fn with_hooks(mut self, hooks: ChainHooks) -> Self {
		self.hooks = hooks;
		self
	}

	/// Builds the engine, creating one signer per `[signers.<chain_id>]`.
	///
	/// The signer sections are consumed here; the engine's configuration no
	/// longer holds key material.
	pub fn build<SF>(self, factories: FlowFactories<SF>) -> Result<FlowEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn SignerInterface>, SignerError>,
	{
		let mut config = self.config;
		let mut sections: Vec<(String, toml::Value)> =
			std::mem::take(&mut config.signers).into_iter().collect();
		sections.sort_by(|(a, _), (b, _)| a.cmp(b));

		let mut signers = SignerRegistry::new();
		for (chain_id, section) in &sections {
			let name = implementation_name(chain_id, section);
			let factory = factories.signer_factories.get(name).ok_or_else(|| {
				BuilderError::Config(format!(
					"No signer implementation '{}' for chain '{}'",
					name, chain_id
				))
			})?;

			match factory(section) {
				Ok(signer) => {
					tracing::info!(component = "signer", implementation = %name, chain = %chain_id, "Loaded");
					signers.register(chain_id.as_str(), Arc::from(signer));
				},
				Err(e) => {
					tracing::error!(
						component = "signer",
						implementation = %name,
						chain = %chain_id,
						error = %e,
						"Failed to create signer"
					);
					return Err(BuilderError::Config(format!(
						"Failed to create signer '{}' for chain '{}': {}",
						name, chain_id, e
					)));
				},
			}
		}

		drop(sections);

		let unsigned_chains: Vec<&str> = config
			.supported_chains()
			.into_iter()
			.filter(|chain_id| signers.resolve(chain_id).is_err())
			.collect();
		if !unsigned_chains.is_empty() {
			tracing::warn!(
				chains = ?unsigned_chains,
				"Chains without a signer will fail after initiate"
			);
		}

		let api = match self.api {
			Some(api) => api,
			None => {
				let client = HttpStakingApi::new(&config.api)
					.map_err(|e| BuilderError::Config(e.to_string()))?;
				tracing::info!(component = "api", url = %config.api.base_url(), "Loaded");
				Arc::new(client)
			},
		};

		Ok(FlowEngine::new(
			Arc::new(config),
			api,
			signers,
			self.hooks,
		))
	}
}
