//! Unstakes on one chain, then withdraws the released funds.

use clap::Parser;
use staking_service::{init_tracing, load_engine, run_unstake_then_withdraw, CommonArgs};
use std::process::ExitCode;
use std::time::Duration;

/// Command-line arguments for the unstake binary.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	#[command(flatten)]
	common: CommonArgs,

	/// Seconds to wait between unstake and withdraw, overriding [flow]
	#[arg(long)]
	withdraw_delay: Option<u64>,
}

#[tokio::main]
async fn main() -> ExitCode {
	let args = Args::parse();
	init_tracing(&args.common.log_level);

	match run(&args).await {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			tracing::error!("Error: {}", e);
			ExitCode::FAILURE
		},
	}
}

async fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
	let engine = load_engine(&args.common).await?;
	let delay = Duration::from_secs(
		args.withdraw_delay
			.unwrap_or(engine.config().flow.withdraw_delay_seconds),
	);

	let outcome = run_unstake_then_withdraw(&engine, &args.common.network, delay).await?;
	for (label, hash) in [("Unstake", outcome.unstake), ("Withdraw", outcome.withdraw)] {
		match hash {
			Some(hash) => tracing::info!("{} transaction hash: {}", label, hash),
			None => tracing::warn!("{} broadcast without a transaction hash", label),
		}
	}
	Ok(())
}
