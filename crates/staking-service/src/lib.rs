//! Command line front end for the staking flows.
//!
//! Shared pieces of the `stake` and `unstake` binaries: argument parsing,
//! logging setup, engine construction from a configuration file, and the
//! unstake-then-withdraw sequence.

use clap::Args;
use staking_config::Config;
use staking_core::{FlowEngine, FlowError};
use staking_types::{Action, TransactionHash};
use std::path::PathBuf;
use std::time::Duration;

pub mod factory_registry;

/// Arguments shared by every binary.
#[derive(Args, Debug)]
pub struct CommonArgs {
	/// Chain identifier, as configured under [chains.<id>]
	#[arg(short, long, value_parser = parse_network)]
	pub network: String,

	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	pub config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	pub log_level: String,
}

/// Network names are matched case-insensitively.
fn parse_network(value: &str) -> Result<String, String> {
	let network = value.trim().to_lowercase();
	if network.is_empty() {
		return Err("network cannot be empty".to_string());
	}
	Ok(network)
}

/// Initializes tracing, with `RUST_LOG` taking precedence over `log_level`.
pub fn init_tracing(log_level: &str) {
	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();
}

/// Loads `.env` and the configuration file, then builds the flow engine.
///
/// The requested network is checked against the configuration first, so an
/// unknown network fails before any signer is created.
pub async fn load_engine(args: &CommonArgs) -> Result<FlowEngine, Box<dyn std::error::Error>> {
	if let Ok(path) = dotenv::dotenv() {
		tracing::debug!(path = %path.display(), "Loaded environment file");
	}

	let path = args
		.config
		.to_str()
		.ok_or("configuration path is not valid UTF-8")?;
	let config = Config::from_file(path).await?;
	config.chain(&args.network)?;
	tracing::info!(
		chains = ?config.supported_chains(),
		"Loaded configuration [{}]",
		args.config.display()
	);

	factory_registry::build_engine_from_config(config)
}

/// Runs the stake flow and logs where the stake can be inspected.
pub async fn run_stake(
	engine: &FlowEngine,
	chain_id: &str,
) -> Result<Option<TransactionHash>, FlowError> {
	tracing::info!("Starting staking flow for blockchain: {}", chain_id.to_uppercase());
	let hash = engine.run_flow(Action::Stake, chain_id).await?;

	if let Some(link) = engine
		.config()
		.chains
		.get(chain_id)
		.and_then(|chain| chain.pool_link())
	{
		tracing::info!("Check your stake at: {}", link);
	}
	Ok(hash)
}

/// Hashes of an unstake and the withdraw that followed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnstakeOutcome {
	pub unstake: Option<TransactionHash>,
	pub withdraw: Option<TransactionHash>,
}

/// Runs unstake, waits `delay`, then runs withdraw on the same chain.
///
/// Withdraw is not attempted when unstake fails.
pub async fn run_unstake_then_withdraw(
	engine: &FlowEngine,
	chain_id: &str,
	delay: Duration,
) -> Result<UnstakeOutcome, FlowError> {
	tracing::info!("Starting unstaking flow for blockchain: {}", chain_id.to_uppercase());
	let unstake = engine.run_flow(Action::Unstake, chain_id).await?;

	tracing::info!(
		"Waiting {}s before withdrawing on blockchain: {}",
		delay.as_secs(),
		chain_id.to_uppercase()
	);
	tokio::time::sleep(delay).await;

	let withdraw = engine.run_flow(Action::Withdraw, chain_id).await?;
	Ok(UnstakeOutcome { unstake, withdraw })
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::Parser;
	use serde_json::json;
	use staking_api::{ApiError, MockStakingApiInterface};
	use staking_core::{ChainHooks, FlowErrorKind};
	use staking_signer::{MockSignerInterface, SignerRegistry};
	use staking_types::{BroadcastResult, InitiateResult, SignedTransaction, UnsignedTransaction};
	use std::sync::{Arc, Mutex};
	use tokio::time::Instant;

	#[derive(Parser, Debug)]
	struct TestCli {
		#[command(flatten)]
		common: CommonArgs,
	}

	const CONFIG: &str = r#"
[api]
url = "https://api.example"
token = "Bearer t"

[chains.dot]
chain = "polkadot"
network = "testnet"
wallet_address = "5Addr"
min_amount = 1
pool_link = "https://pools.example/{network}/{address}"
"#;

	type Calls = Arc<Mutex<Vec<(Action, Instant)>>>;

	fn engine(api: MockStakingApiInterface) -> FlowEngine {
		let mut signer = MockSignerInterface::new();
		signer
			.expect_sign_transaction()
			.returning(|unsigned, _, _| Ok(SignedTransaction::new(format!("signed-{}", unsigned))));
		let mut signers = SignerRegistry::new();
		signers.register("dot", Arc::new(signer));

		FlowEngine::new(
			Arc::new(CONFIG.parse().unwrap()),
			Arc::new(api),
			signers,
			ChainHooks::default(),
		)
	}

	fn recording_api(calls: Calls, fail_unstake: bool) -> MockStakingApiInterface {
		let mut api = MockStakingApiInterface::new();
		api.expect_initiate().returning(move |action, _| {
			calls.lock().unwrap().push((action, Instant::now()));
			if fail_unstake && action == Action::Unstake {
				return Err(ApiError::upstream(action.request_label(), "Nothing staked"));
			}
			Ok(InitiateResult::new(UnsignedTransaction::new(action.as_str())))
		});
		api.expect_broadcast().returning(|request| {
			Ok(BroadcastResult(
				json!({ "transactionHash": format!("hash-{}", request.signed_transaction) }),
			))
		});
		api
	}

	#[test]
	fn test_network_is_lowercased() {
		let cli = TestCli::parse_from(["stake", "--network", "DOT"]);
		assert_eq!(cli.common.network, "dot");
		assert_eq!(cli.common.config, PathBuf::from("config.toml"));
		assert_eq!(cli.common.log_level, "info");

		assert!(TestCli::try_parse_from(["stake"]).is_err());
		assert!(TestCli::try_parse_from(["stake", "--network", " "]).is_err());
	}

	#[tokio::test(start_paused = true)]
	async fn test_withdraw_runs_after_delay() {
		let calls: Calls = Arc::default();
		let engine = engine(recording_api(calls.clone(), false));

		let outcome = run_unstake_then_withdraw(&engine, "dot", Duration::from_secs(10))
			.await
			.unwrap();
		assert_eq!(
			outcome,
			UnstakeOutcome {
				unstake: Some("hash-signed-unstake".to_string()),
				withdraw: Some("hash-signed-withdraw".to_string()),
			}
		);

		let calls = calls.lock().unwrap();
		assert_eq!(calls.len(), 2);
		assert_eq!(calls[0].0, Action::Unstake);
		assert_eq!(calls[1].0, Action::Withdraw);
		assert!(calls[1].1 - calls[0].1 >= Duration::from_secs(10));
	}

	#[tokio::test(start_paused = true)]
	async fn test_failed_unstake_skips_withdraw() {
		let calls: Calls = Arc::default();
		let engine = engine(recording_api(calls.clone(), true));

		let err = run_unstake_then_withdraw(&engine, "dot", Duration::from_secs(10))
			.await
			.unwrap_err();
		assert_eq!(err.action, Action::Unstake);
		assert!(matches!(err.kind(), FlowErrorKind::Upstream(_)));
		assert_eq!(calls.lock().unwrap().len(), 1);
	}

	#[tokio::test]
	async fn test_stake_returns_hash() {
		let calls: Calls = Arc::default();
		let engine = engine(recording_api(calls, false));

		let hash = run_stake(&engine, "dot").await.unwrap();
		assert_eq!(hash.as_deref(), Some("hash-signed-stake"));
	}

	#[tokio::test]
	async fn test_load_engine_rejects_unknown_network() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config.toml");
		std::fs::write(&path, CONFIG).unwrap();

		let args = CommonArgs {
			network: "eth".to_string(),
			config: path,
			log_level: "info".to_string(),
		};
		let err = load_engine(&args).await.err().unwrap();
		assert_eq!(
			err.to_string(),
			"Unsupported network: eth. Supported blockchains are: dot"
		);
	}
}
