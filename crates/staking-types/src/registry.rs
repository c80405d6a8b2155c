//! Registry trait for self-registering implementations.
//!
//! Implementation modules (signers today) expose a `Registry` type that names
//! the implementation as it appears in configuration and hands out its
//! factory function. The service collects these at start-up instead of
//! loading modules by name at runtime.

/// Base trait for implementation registries.
pub trait ImplementationRegistry {
	/// Name used in configuration to select this implementation, for example
	/// `implementation = "near"` under `[signers.<chain_id>]`.
	const NAME: &'static str;

	/// Factory function type this implementation provides.
	type Factory;

	/// Returns the factory that builds the implementation from its TOML section.
	fn factory() -> Self::Factory;
}
