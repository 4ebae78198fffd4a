//! # Record Codec
//!
//! Converts typed values to the `(encoding, text)` pair stored in a record
//! and back.
//!
//! ```text
//!   encode("Jane")            → (raw,  "Jane")
//!   encode(42)                → (json, "42")
//!   encode({"a": [1, 2]})     → (json, "{\"a\":[1,2]}")
//!
//!   decode(raw,    text)      → text as a JSON string, then into T
//!   decode(json,   text)      → serde_json::from_str(text)
//!   decode(legacy, text)      → JSON if it parses, else the raw string
//! ```
//!
//! Strings are stored unquoted so a value written as a string reads back
//! byte-for-byte. The tag makes decoding a dispatch rather than a guess;
//! only rows written before the tag existed fall back to guessing.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// How a record's text should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// The text is the value itself (a string).
    Raw,
    /// The text is JSON.
    Json,
    /// Written before encodings were tracked: try JSON, fall back to raw.
    Legacy,
}

impl Encoding {
    /// Column value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Raw => "raw",
            Encoding::Json => "json",
            Encoding::Legacy => "legacy",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "raw" => Ok(Encoding::Raw),
            "json" => Ok(Encoding::Json),
            "legacy" => Ok(Encoding::Legacy),
            other => Err(Error::Serialization(format!("unknown encoding tag '{}'", other))),
        }
    }
}

/// A value ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedValue {
    /// How `text` must be decoded
    pub encoding: Encoding,
    /// Stored text
    pub text: String,
}

/// Encode any serializable value.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<EncodedValue> {
    match serde_json::to_value(value)? {
        Value::String(text) => Ok(EncodedValue {
            encoding: Encoding::Raw,
            text,
        }),
        other => Ok(EncodedValue {
            encoding: Encoding::Json,
            text: serde_json::to_string(&other)?,
        }),
    }
}

/// Decode stored text into an untyped JSON value.
///
/// Only a `json` record with invalid JSON fails; a `legacy` record that is
/// not JSON is returned as a string.
pub fn decode_value(encoding: Encoding, text: &str) -> Result<Value> {
    match encoding {
        Encoding::Raw => Ok(Value::String(text.to_string())),
        Encoding::Json => Ok(serde_json::from_str(text)?),
        Encoding::Legacy => Ok(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))),
    }
}

/// Decode stored text into `T`.
pub fn decode<T: DeserializeOwned>(encoding: Encoding, text: &str) -> Result<T> {
    let value = decode_value(encoding, text)?;
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Address {
        street: String,
        zip: Option<String>,
    }

    #[test]
    fn test_strings_are_stored_unquoted() {
        let encoded = encode("Jane Doe").unwrap();
        assert_eq!(encoded.encoding, Encoding::Raw);
        assert_eq!(encoded.text, "Jane Doe");

        let empty = encode("").unwrap();
        assert_eq!(empty.text, "");
    }

    #[test]
    fn test_string_that_looks_like_json_stays_a_string() {
        let encoded = encode("42").unwrap();
        assert_eq!(encoded.encoding, Encoding::Raw);

        let back: String = decode(encoded.encoding, &encoded.text).unwrap();
        assert_eq!(back, "42");
    }

    #[test]
    fn test_round_trip_values() {
        let values = vec![
            json!(42),
            json!(-3.5),
            json!(true),
            json!(null),
            json!([1, "two", 3.0]),
            json!({"name": "Acme", "tags": ["a", "b"]}),
            json!({"outer": {"inner": {"deep": [1, {"x": "y"}]}}}),
            json!(""),
            json!("Zürich – 東京"),
        ];

        for value in values {
            let encoded = encode(&value).unwrap();
            let back: Value = decode(encoded.encoding, &encoded.text).unwrap();
            assert_eq!(back, value);
        }
    }

    #[test]
    fn test_round_trip_struct() {
        let address = Address {
            street: "1 Main St".into(),
            zip: None,
        };
        let encoded = encode(&address).unwrap();
        assert_eq!(encoded.encoding, Encoding::Json);

        let back: Address = decode(encoded.encoding, &encoded.text).unwrap();
        assert_eq!(back, address);
    }

    #[test]
    fn test_legacy_falls_back_to_raw_string() {
        assert_eq!(decode_value(Encoding::Legacy, "hello").unwrap(), json!("hello"));
        assert_eq!(decode_value(Encoding::Legacy, "{\"a\":1}").unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_corrupt_json_is_an_error() {
        let result = decode_value(Encoding::Json, "{not json");
        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[test]
    fn test_type_mismatch_is_an_error() {
        let result: Result<Address> = decode(Encoding::Json, "[1,2,3]");
        assert!(result.is_err());
    }

    #[test]
    fn test_encoding_tags() {
        for encoding in [Encoding::Raw, Encoding::Json, Encoding::Legacy] {
            assert_eq!(encoding.as_str().parse::<Encoding>().unwrap(), encoding);
        }
        assert!("yaml".parse::<Encoding>().is_err());
    }
}
