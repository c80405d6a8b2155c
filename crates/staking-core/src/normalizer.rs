//! Transaction hash extraction from broadcast results.

use serde_json::Value;
use staking_types::TransactionHash;

/// Paths tried in order; the first non-empty string wins.
const HASH_PATHS: [&[&str]; 3] = [
	&["transactionHash"],
	&["extraData", "transactionHash"],
	&["extraData", "transactionId"],
];

/// Extracts the transaction hash from a raw broadcast result.
///
/// Returns `None` when no known path holds a non-empty string. Some chains
/// legitimately omit the hash, so absence is not an error here.
pub fn extract_transaction_hash(result: &Value) -> Option<TransactionHash> {
	HASH_PATHS.iter().find_map(|path| {
		path.iter()
			.try_fold(result, |value, key| value.get(key))
			.and_then(Value::as_str)
			.map(str::trim)
			.filter(|hash| !hash.is_empty())
			.map(str::to_string)
	})
}
