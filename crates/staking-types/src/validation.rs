//! Schema validation for implementation-specific TOML sections.
//!
//! Signer sections are free-form (`[signers.<chain_id>]`), so each
//! implementation declares a [`Schema`] and validates its table before
//! parsing keys out of it.

use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error)]
pub enum ValidationError {
	#[error("Missing required field: {0}")]
	MissingField(String),
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
}

/// Type of a configuration field.
#[derive(Debug)]
pub enum FieldType {
	String,
	/// An array of strings, or a single string of comma separated items.
	StringList,
}

impl FieldType {
	fn name(&self) -> &'static str {
		match self {
			FieldType::String => "string",
			FieldType::StringList => "string list",
		}
	}
}

/// Custom check run after the type check passes; returns an error message.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

/// A named field in a [`Schema`].
pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("field_type", &self.field_type)
			.field("validator", &self.validator.is_some())
			.finish()
	}
}

impl Field {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}

	fn check(&self, value: &toml::Value) -> Result<(), ValidationError> {
		check_type(&self.name, value, &self.field_type)?;
		if let Some(validator) = &self.validator {
			validator(value).map_err(|message| ValidationError::InvalidValue {
				field: self.name.clone(),
				message,
			})?;
		}
		Ok(())
	}
}

/// Required and optional fields of a TOML table.
///
/// Keys not named by the schema are ignored.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Validates `config`, which must be a table.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config
			.as_table()
			.ok_or_else(|| ValidationError::TypeMismatch {
				field: "root".to_string(),
				expected: "table".to_string(),
				actual: config.type_str().to_string(),
			})?;

		for field in &self.required {
			let value = table
				.get(&field.name)
				.ok_or_else(|| ValidationError::MissingField(field.name.clone()))?;
			field.check(value)?;
		}

		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				field.check(value)?;
			}
		}

		Ok(())
	}
}

fn check_type(
	field_name: &str,
	value: &toml::Value,
	expected: &FieldType,
) -> Result<(), ValidationError> {
	let mismatch = || ValidationError::TypeMismatch {
		field: field_name.to_string(),
		expected: expected.name().to_string(),
		actual: value.type_str().to_string(),
	};

	match expected {
		FieldType::String if !value.is_str() => Err(mismatch()),
		FieldType::String => Ok(()),
		FieldType::StringList if value.is_str() => Ok(()),
		FieldType::StringList => {
			let items = value.as_array().ok_or_else(mismatch)?;
			for (i, item) in items.iter().enumerate() {
				check_type(&format!("{}[{}]", field_name, i), item, &FieldType::String)?;
			}
			Ok(())
		},
	}
}

/// A configuration schema that can validate TOML values.
pub trait ConfigSchema: Send + Sync {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parse(s: &str) -> toml::Value {
		toml::from_str(s).unwrap()
	}

	#[test]
	fn test_missing_required_field() {
		let schema = Schema::new(vec![Field::new("private_key", FieldType::String)], vec![]);
		let err = schema.validate(&parse("other = 1")).unwrap_err();
		assert!(matches!(err, ValidationError::MissingField(ref f) if f == "private_key"));
	}

	#[test]
	fn test_string_list_accepts_both_forms() {
		let schema = Schema::new(vec![Field::new("keys", FieldType::StringList)], vec![]);
		assert!(schema.validate(&parse("keys = \"a,b\"")).is_ok());
		assert!(schema.validate(&parse("keys = [\"a\", \"b\"]")).is_ok());
		assert_eq!(
			schema.validate(&parse("keys = 3")).unwrap_err().to_string(),
			"Type mismatch for field 'keys': expected string list, got integer"
		);
	}

	#[test]
	fn test_type_mismatch_in_array_reports_index() {
		let schema = Schema::new(vec![Field::new("private_keys", FieldType::StringList)], vec![]);
		let err = schema
			.validate(&parse("private_keys = [\"a\", 2]"))
			.unwrap_err();
		assert_eq!(
			err.to_string(),
			"Type mismatch for field 'private_keys[1]': expected string, got integer"
		);
	}

	#[test]
	fn test_custom_validator_on_optional_field() {
		let schema = Schema::new(
			vec![Field::new("private_key", FieldType::String)],
			vec![Field::new("prefix", FieldType::String).with_validator(|v| {
				match v.as_str() {
					Some(s) if s.starts_with("ed25519:") => Ok(()),
					_ => Err("must start with ed25519:".to_string()),
				}
			})],
		);

		assert!(schema.validate(&parse("private_key = \"k\"")).is_ok());
		assert!(schema
			.validate(&parse("private_key = \"k\"\nprefix = \"ed25519:abc\""))
			.is_ok());
		let err = schema
			.validate(&parse("private_key = \"k\"\nprefix = \"secp:abc\""))
			.unwrap_err();
		assert_eq!(
			err.to_string(),
			"Invalid value for field 'prefix': must start with ed25519:"
		);
	}

	#[test]
	fn test_root_must_be_table() {
		let schema = Schema::new(vec![], vec![]);
		let err = schema.validate(&toml::Value::from("flat")).unwrap_err();
		assert_eq!(
			err.to_string(),
			"Type mismatch for field 'root': expected table, got string"
		);
	}
}
