//! String helpers shared across the workspace.

/// Shortens long identifiers (hashes, encoded transactions) for log output.
///
/// Keeps the first 10 characters followed by "..".
pub fn truncate_id(id: &str) -> String {
	match id.char_indices().nth(10) {
		Some((idx, _)) => format!("{}..", &id[..idx]),
		None => id.to_string(),
	}
}

/// Adds a "0x" prefix to a hex string unless it already has one.
pub fn with_0x_prefix(hex_str: &str) -> String {
	if hex_str.starts_with("0x") || hex_str.starts_with("0X") {
		hex_str.to_string()
	} else {
		format!("0x{}", hex_str)
	}
}

/// Strips a leading "0x"/"0X" from a hex string if present.
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str
		.strip_prefix("0x")
		.or_else(|| hex_str.strip_prefix("0X"))
		.unwrap_or(hex_str)
}
