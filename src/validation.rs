//! Request input checks shared by the resource handlers.

use serde_json::{Map, Value};
use validator::Validate;

use crate::error::AppError;

pub const USER_REQUIRED_FIELDS: &[&str] = &["email", "name", "role", "password"];
pub const POST_REQUIRED_FIELDS: &[&str] = &["title", "subtitle", "content", "author"];
pub const LOGIN_REQUIRED_FIELDS: &[&str] = &["email", "password"];

/// Truthiness used for required fields: `null`, `false`, `0` and `""` count as empty.
/// Arrays and objects are always present, even when empty.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// validate_required
///
/// Returns the names in `required` whose value in `input` is absent or falsy,
/// in the order they appear in `required`.
pub fn validate_required(required: &[&str], input: &Map<String, Value>) -> Vec<String> {
    required
        .iter()
        .filter(|field| !input.get(**field).is_some_and(is_truthy))
        .map(|field| field.to_string())
        .collect()
}

/// Builds the single BadRequest that names every missing field, comma-joined.
pub fn missing_fields_error(missing: &[String]) -> AppError {
    AppError::BadRequest(format!("Os campos {} são obrigatórios!", missing.join(",")))
}

/// Runs the required-field check and fails with `missing_fields_error` if anything is missing.
pub fn require_fields(required: &[&str], input: &Map<String, Value>) -> Result<(), AppError> {
    let missing = validate_required(required, input);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(missing_fields_error(&missing))
    }
}

/// Requires a JSON object body.
pub fn into_object(body: Value) -> Result<Map<String, Value>, AppError> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(AppError::BadRequest(
            "O corpo da requisição deve ser um objeto JSON".to_string(),
        )),
    }
}

/// Deserializes a checked body into its typed payload and applies its length limits.
pub fn into_payload<T>(input: Map<String, Value>) -> Result<T, AppError>
where
    T: serde::de::DeserializeOwned + Validate,
{
    let payload: T = serde_json::from_value(Value::Object(input))
        .map_err(|e| AppError::BadRequest(format!("Corpo da requisição inválido: {e}")))?;

    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    Ok(payload)
}

/// parse_id
///
/// Path ids arrive as raw strings so that a blank id and a non-numeric id both
/// produce the uniform error body instead of the framework's plain-text rejection.
pub fn parse_id(raw: &str) -> Result<i32, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::BadRequest("ID is required".to_string()));
    }

    raw.parse::<i32>()
        .map_err(|_| AppError::BadRequest(format!("ID inválido: {raw}")))
}
