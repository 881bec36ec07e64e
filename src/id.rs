//! Deserialization for identifiers that the server sends as either JSON
//! numbers or strings.

use serde::{Deserialize, Deserializer, de::Error as _, de::Unexpected};
use serde_json::Value;

/// Deserialize an identifier such as `42` or `"42"` into a string.
///
/// Numbers keep their exact digits, however long.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(value) => Err(D::Error::invalid_type(
            Unexpected::Bool(value),
            &"a string or number",
        )),
        _ => Err(D::Error::invalid_type(
            Unexpected::Other("a JSON null, array or object"),
            &"a string or number",
        )),
    }
}
