//! Payload schema engine for intent validation.
//!
//! Handlers describe the shape of their payload with a [`Schema`] of typed
//! fields plus optional per-field validators. Validation is purely
//! structural and syntactic (no network I/O) and aggregates every violation
//! into one [`ValidationErrors`] value, so a caller can repair a payload in
//! a single round trip.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// A single violated field and the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
	pub field: String,
	pub message: String,
}

/// Aggregate of all field-level failures for one payload.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationErrors {
	pub errors: Vec<FieldError>,
}

impl ValidationErrors {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds an aggregate holding a single violation.
	pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
		let mut errors = Self::new();
		errors.push(field, message);
		errors
	}

	pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
		self.errors.push(FieldError {
			field: field.into(),
			message: message.into(),
		});
	}

	pub fn is_empty(&self) -> bool {
		self.errors.is_empty()
	}

	/// Names of all violated fields, in reported order.
	pub fn fields(&self) -> Vec<&str> {
		self.errors.iter().map(|e| e.field.as_str()).collect()
	}

	pub fn into_result(self) -> Result<(), ValidationErrors> {
		if self.is_empty() {
			Ok(())
		} else {
			Err(self)
		}
	}
}

impl fmt::Display for ValidationErrors {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let joined = self
			.errors
			.iter()
			.map(|e| format!("{}: {}", e.field, e.message))
			.collect::<Vec<_>>()
			.join(", ");
		write!(f, "{}", joined)
	}
}

impl std::error::Error for ValidationErrors {}

/// Expected type of a payload field.
pub enum FieldType {
	/// Any JSON string.
	String,
	/// A JSON string with at least one character.
	NonEmptyString,
	/// A decimal amount: either a string matching `^\d+(\.\d+)?$` or a JSON
	/// number whose canonical rendering matches it (no exponent form).
	Amount,
	Boolean,
	Integer { min: Option<i64>, max: Option<i64> },
	Array(Box<FieldType>),
}

impl FieldType {
	fn name(&self) -> &'static str {
		match self {
			FieldType::String | FieldType::NonEmptyString => "string",
			FieldType::Amount => "decimal amount",
			FieldType::Boolean => "boolean",
			FieldType::Integer { .. } => "integer",
			FieldType::Array(_) => "array",
		}
	}
}

/// Type alias for field validator functions.
pub type FieldValidator = Box<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// A field definition with name, type, and optional semantic validator.
pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl Field {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	/// Adds a custom validator, run only after the type check passes.
	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}
}

/// Schema definition with required and optional fields.
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Validates a JSON payload, collecting every violation.
	pub fn validate(&self, payload: &Value) -> Result<(), ValidationErrors> {
		let mut errors = ValidationErrors::new();

		let Some(object) = payload.as_object() else {
			errors.push("payload", "must be a JSON object");
			return errors.into_result();
		};

		for field in &self.required {
			match object.get(&field.name) {
				None | Some(Value::Null) => {
					errors.push(&field.name, format!("missing required field: {}", field.name));
				}
				Some(value) => check_field(field, value, &mut errors),
			}
		}

		for field in &self.optional {
			match object.get(&field.name) {
				None | Some(Value::Null) => {}
				Some(value) => check_field(field, value, &mut errors),
			}
		}

		errors.into_result()
	}
}

fn check_field(field: &Field, value: &Value, errors: &mut ValidationErrors) {
	if let Err(message) = check_type(&field.field_type, value) {
		errors.push(&field.name, message);
		return;
	}

	if let Some(validator) = &field.validator {
		if let Err(message) = validator(value) {
			errors.push(&field.name, message);
		}
	}
}

fn check_type(expected: &FieldType, value: &Value) -> Result<(), String> {
	match expected {
		FieldType::String => {
			if !value.is_string() {
				return Err(format!("expected {}", expected.name()));
			}
		}
		FieldType::NonEmptyString => match value.as_str() {
			Some(s) if !s.is_empty() => {}
			Some(_) => return Err("must not be empty".to_string()),
			None => return Err(format!("expected {}", expected.name())),
		},
		FieldType::Amount => match decimal_string(value) {
			Some(s) if is_decimal(&s) => {}
			Some(s) => return Err(format!("'{}' is not a valid decimal amount", s)),
			None => return Err("amount must be a decimal string or number".to_string()),
		},
		FieldType::Boolean => {
			if !value.is_boolean() {
				return Err(format!("expected {}", expected.name()));
			}
		}
		FieldType::Integer { min, max } => {
			let Some(n) = value.as_i64() else {
				return Err(format!("expected {}", expected.name()));
			};
			if let Some(min) = min {
				if n < *min {
					return Err(format!("value {} is less than minimum {}", n, min));
				}
			}
			if let Some(max) = max {
				if n > *max {
					return Err(format!("value {} is greater than maximum {}", n, max));
				}
			}
		}
		FieldType::Array(inner) => {
			let Some(items) = value.as_array() else {
				return Err(format!("expected {}", expected.name()));
			};
			for (i, item) in items.iter().enumerate() {
				check_type(inner, item).map_err(|m| format!("[{}] {}", i, m))?;
			}
		}
	}

	Ok(())
}

/// Renders a string-or-number amount field as a string, without accepting
/// other JSON types.
pub fn decimal_string(value: &Value) -> Option<String> {
	match value {
		Value::String(s) => Some(s.clone()),
		Value::Number(n) => Some(n.to_string()),
		_ => None,
	}
}

/// `^\d+(\.\d+)?$`: plain non-negative decimal, no sign, no exponent.
pub fn is_decimal(s: &str) -> bool {
	let (int_part, frac_part) = match s.split_once('.') {
		Some((i, f)) => (i, Some(f)),
		None => (s, None),
	};
	if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
		return false;
	}
	match frac_part {
		Some(f) => !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()),
		None => true,
	}
}
