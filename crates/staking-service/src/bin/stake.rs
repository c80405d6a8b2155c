//! Stakes the configured minimum amount on one chain.
//!
//! Runs initiate, sign and broadcast for the `stake` action and logs the
//! resulting transaction hash along with the chain's pool link.

use clap::Parser;
use staking_service::{init_tracing, load_engine, run_stake, CommonArgs};
use std::process::ExitCode;

/// Command-line arguments for the stake binary.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	#[command(flatten)]
	common: CommonArgs,
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

	match run_stake(&engine, &args.common.network).await? {
		Some(hash) => tracing::info!("Stake transaction hash: {}", hash),
		None => tracing::warn!("Stake broadcast without a transaction hash"),
	}
	Ok(())
}
