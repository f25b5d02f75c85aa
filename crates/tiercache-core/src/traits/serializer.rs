//! Value encodings
//!
//! Every value crosses this boundary before it is stored in either tier, so
//! both tiers hold independent byte copies of what the caller passed in.

use std::fmt::Display;

use serde::{de::DeserializeOwned, Serialize};

use crate::CacheError;

/// Turns values into bytes and back
///
/// A value the format cannot represent must fail with
/// [`CacheError::NotSerializable`] before any tier is touched; unreadable
/// bytes fail with [`CacheError::Deserialization`].
pub trait Serializer: Send + Sync + Clone + 'static {
    /// Short format name, used in logs
    fn name(&self) -> &'static str;

    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CacheError>;

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CacheError>;
}

fn rejected(e: impl Display) -> CacheError {
    CacheError::NotSerializable(e.to_string())
}

fn unreadable(e: impl Display) -> CacheError {
    CacheError::Deserialization(e.to_string())
}

/// JSON, the default encoding
///
/// Maps with non-string keys are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn name(&self) -> &'static str {
        "json"
    }

    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CacheError> {
        serde_json::to_vec(value).map_err(rejected)
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CacheError> {
        serde_json::from_slice(bytes).map_err(unreadable)
    }
}

/// MessagePack with named struct fields, so payloads survive field reordering
#[cfg(feature = "msgpack")]
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackSerializer;

#[cfg(feature = "msgpack")]
impl Serializer for MsgPackSerializer {
    fn name(&self) -> &'static str {
        "msgpack"
    }

    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CacheError> {
        rmp_serde::to_vec_named(value).map_err(rejected)
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CacheError> {
        rmp_serde::from_slice(bytes).map_err(unreadable)
    }
}

/// Bincode, standard configuration
///
/// Smallest payloads; every process sharing the remote tier must use the
/// same value types.
#[cfg(feature = "bincode")]
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeSerializer;

#[cfg(feature = "bincode")]
impl Serializer for BincodeSerializer {
    fn name(&self) -> &'static str {
        "bincode"
    }

    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CacheError> {
        bincode::serde::encode_to_vec(value, bincode::config::standard()).map_err(rejected)
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CacheError> {
        bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map(|(value, _)| value)
            .map_err(unreadable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, HashMap};

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Order {
        id: u64,
        lines: Vec<String>,
        discount: Option<f32>,
    }

    fn order() -> Order {
        Order {
            id: 9,
            lines: vec!["apples".into(), "pears".into()],
            discount: None,
        }
    }

    #[test]
    fn test_json_keeps_value() {
        let bytes = JsonSerializer.serialize(&order()).unwrap();
        assert_eq!(JsonSerializer.deserialize::<Order>(&bytes).unwrap(), order());
    }

    #[test]
    fn test_json_rejects_unencodable_value() {
        let value = BTreeMap::from([((1u8, 2u8), "pair")]);
        let err = JsonSerializer.serialize(&value).unwrap_err();
        assert!(matches!(err, CacheError::NotSerializable(_)));
    }

    #[test]
    fn test_json_wrong_shape_is_unreadable() {
        let bytes = JsonSerializer.serialize(&HashMap::from([("id", "x")])).unwrap();
        let err = JsonSerializer.deserialize::<Order>(&bytes).unwrap_err();
        assert!(matches!(err, CacheError::Deserialization(_)));
    }

    #[cfg(feature = "msgpack")]
    #[test]
    fn test_msgpack_keeps_value() {
        let bytes = MsgPackSerializer.serialize(&order()).unwrap();
        assert_eq!(MsgPackSerializer.deserialize::<Order>(&bytes).unwrap(), order());
    }

    #[cfg(feature = "bincode")]
    #[test]
    fn test_bincode_truncated_payload() {
        let bytes = BincodeSerializer.serialize(&order()).unwrap();
        let err = BincodeSerializer.deserialize::<Order>(&bytes[..2]).unwrap_err();
        assert!(matches!(err, CacheError::Deserialization(_)));
    }
}
