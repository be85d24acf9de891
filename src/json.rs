//! Serialization context handed to every component a client creates.
//!
//! Each client owns its own `Json`; nothing here is process-wide.

use crate::errors::{StoreError, StoreResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Clone, Copy, Debug, Default)]
pub struct Json {
    pretty: bool,
}

impl Json {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit indented output from [`Json::to_string`].
    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    pub fn to_string<T: Serialize + ?Sized>(&self, value: &T) -> StoreResult<String> {
        let text = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        Ok(text)
    }

    pub fn to_value<T: Serialize + ?Sized>(&self, value: &T) -> StoreResult<Value> {
        Ok(serde_json::to_value(value)?)
    }

    pub fn from_str<T: DeserializeOwned>(&self, text: &str) -> StoreResult<T> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_value<T: DeserializeOwned>(&self, value: Value) -> StoreResult<T> {
        Ok(serde_json::from_value(value)?)
    }

    /// Parse a document source; it must be a JSON object.
    pub fn parse_source(&self, text: &str) -> StoreResult<Value> {
        let value: Value = self.from_str(text)?;
        if !value.is_object() {
            return Err(StoreError::operation(
                "map_document",
                "document source must be a JSON object",
            ));
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pretty_context_indents() {
        let value = json!({"a": 1});
        assert_eq!(Json::new().to_string(&value).unwrap(), r#"{"a":1}"#);
        assert!(Json::pretty().to_string(&value).unwrap().contains('\n'));
    }

    #[test]
    fn sources_must_be_objects() {
        let json = Json::new();
        assert!(json.parse_source(r#"{"a": 1}"#).is_ok());
        assert!(json.parse_source("[1]").is_err());
        assert!(matches!(json.parse_source("{").unwrap_err(), StoreError::Json(_)));
    }
}
