//! MessagePack codec helpers.
//!
//! Message envelopes and their payloads are both MessagePack. Payloads are
//! encoded with named fields so external actors can read them as maps.

use serde::{Deserialize, Serialize};

use crate::error::NetError;

/// Encode a value to MessagePack bytes.
///
/// # Errors
///
/// Returns [`NetError::Encode`] if serialisation fails.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, NetError> {
    rmp_serde::to_vec_named(value).map_err(NetError::Encode)
}

/// Decode a value from MessagePack bytes.
///
/// # Errors
///
/// Returns [`NetError::Decode`] if deserialisation fails.
pub fn decode<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T, NetError> {
    rmp_serde::from_slice(bytes).map_err(NetError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Order {
        fleet: u64,
        target: String,
    }

    #[test]
    fn test_encode_decode() {
        let order = Order {
            fleet: 7,
            target: "Luna".to_string(),
        };
        let bytes = encode(&order).unwrap();
        assert_eq!(decode::<Order>(&bytes).unwrap(), order);
    }

    #[test]
    fn test_decode_invalid_bytes() {
        let result: Result<Order, _> = decode(&[0xc1]);
        assert!(matches!(result, Err(NetError::Decode(_))));
    }
}
