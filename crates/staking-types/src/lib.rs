//! Common types for the staking flow system.
//!
//! This crate holds the data shapes that travel between the configuration,
//! the staking API client, the signers and the flow orchestrator, so that
//! every component agrees on a single representation.

/// Flow actions and the request/response payloads of the staking API.
pub mod flow;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Secret string wrapper for tokens and private keys.
pub mod secret_string;
/// String helpers shared by the signers and the logs.
pub mod utils;
/// Configuration validation types for implementation-specific TOML sections.
pub mod validation;

pub use flow::*;
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use utils::{truncate_id, with_0x_prefix, without_0x_prefix};
pub use validation::*;
