//! Factory registry for signer implementations.
//!
//! Every signer implementation compiled into the binaries registers itself
//! here under its configuration name. Building an engine picks the factories
//! the configuration's `[signers.<chain_id>]` sections ask for.

use staking_config::Config;
use staking_core::{FlowEngine, FlowEngineBuilder, FlowFactories};
use staking_signer::{implementation_name, SignerFactory};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Global registry for all implementation factories
pub struct FactoryRegistry {
	pub signer: HashMap<String, SignerFactory>,
}

impl FactoryRegistry {
	/// Create a new empty registry
	pub fn new() -> Self {
		Self {
			signer: HashMap::new(),
		}
	}

	/// Register a signer implementation
	pub fn register_signer(&mut self, name: impl Into<String>, factory: SignerFactory) {
		self.signer.insert(name.into(), factory);
	}

	/// Registered signer implementation names, sorted.
	pub fn signer_names(&self) -> Vec<&str> {
		let mut names: Vec<&str> = self.signer.keys().map(String::as_str).collect();
		names.sort_unstable();
		names
	}
}

impl Default for FactoryRegistry {
	fn default() -> Self {
		Self::new()
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Initialize the global registry with all available implementations
pub fn initialize_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();

		for (name, factory) in staking_signer::get_all_implementations() {
			tracing::debug!("Registering signer implementation: {}", name);
			registry.register_signer(name, factory);
		}

		registry
	})
}

/// Get the global factory registry
pub fn get_registry() -> &'static FactoryRegistry {
	initialize_registry()
}

/// Picks the factories named by the configuration's signer sections.
fn signer_factories(
	registry: &FactoryRegistry,
	config: &Config,
) -> Result<HashMap<String, SignerFactory>, String> {
	let mut factories = HashMap::new();
	for (chain_id, section) in &config.signers {
		let name = implementation_name(chain_id, section);
		match registry.signer.get(name) {
			Some(factory) => {
				factories.insert(name.to_string(), *factory);
			},
			None => {
				return Err(format!(
					"Unknown signer implementation '{}' for chain '{}'. Available: [{}]",
					name,
					chain_id,
					registry.signer_names().join(", ")
				));
			},
		}
	}
	Ok(factories)
}

/// Build the flow engine using the registry and config
pub fn build_engine_from_config(config: Config) -> Result<FlowEngine, Box<dyn std::error::Error>> {
	let signer_factories = signer_factories(get_registry(), &config)?;
	let engine = FlowEngineBuilder::new(config).build(FlowFactories { signer_factories })?;
	Ok(engine)
}

#[cfg(test)]
mod tests {
	use super::*;

	const BASE: &str = r#"
[api]
url = "https://api.example"
token = "Bearer t"

[chains.near]
chain = "near"
network = "testnet"
wallet_address = "me.testnet"
min_amount = "1000000000000000000000000"

[chains.polygon]
chain = "polygon"
network = "mainnet"
wallet_address = "0xf39F"
min_amount = "1000000000000000000"
"#;

	#[test]
	fn test_registry_contains_all_signers() {
		assert_eq!(get_registry().signer_names(), vec!["evm", "near", "solana", "ton"]);
	}

	#[test]
	fn test_unknown_implementation_lists_available() {
		let config: Config = format!("{}\n[signers.near]\nimplementation = \"hsm\"\n", BASE)
			.parse()
			.unwrap();
		let err = build_engine_from_config(config).err().unwrap();
		assert_eq!(
			err.to_string(),
			"Unknown signer implementation 'hsm' for chain 'near'. Available: [evm, near, solana, ton]"
		);
	}

	#[tokio::test]
	async fn test_builds_engine_with_configured_signers() {
		let config: Config = format!(
			r#"{}
[signers.near]
private_key = "ed25519:{}"

[signers.polygon]
implementation = "evm"
private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
"#,
			BASE,
			// base58 of a 32 byte seed of 0x07
			"US517G5965aydkZ46HS38QLi7UQiSojurfbQfKCELFx"
		)
		.parse()
		.unwrap();

		let engine = build_engine_from_config(config).unwrap();
		assert_eq!(engine.signers().chains(), vec!["near", "polygon"]);
	}
}
