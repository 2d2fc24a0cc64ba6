//! Canonical CBOR encoding for deterministic serialization.
//!
//! This module implements the subset of RFC 8949 Core Deterministic Encoding
//! needed by event records:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//!
//! Only unsigned integers, byte strings, arrays and maps are accepted.

use ciborium::value::Value;

use crate::error::CoreError;

/// Encode a CBOR value to canonical bytes.
pub fn encode_canonical(value: &Value) -> Result<Vec<u8>, CoreError> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value)?;
    Ok(buf)
}

fn encode_value_to(buf: &mut Vec<u8>, value: &Value) -> Result<(), CoreError> {
    match value {
        Value::Integer(i) => {
            let n: i128 = (*i).into();
            let n = u64::try_from(n)
                .map_err(|_| CoreError::EncodingError(format!("integer {} out of range", n)))?;
            encode_uint(buf, 0, n);
        }
        Value::Bytes(b) => {
            encode_uint(buf, 2, b.len() as u64);
            buf.extend_from_slice(b);
        }
        Value::Array(arr) => {
            encode_uint(buf, 4, arr.len() as u64);
            for item in arr {
                encode_value_to(buf, item)?;
            }
        }
        Value::Map(entries) => encode_map_canonical(buf, entries)?,
        other => {
            return Err(CoreError::EncodingError(format!(
                "unsupported value in canonical encoding: {:?}",
                other
            )))
        }
    }
    Ok(())
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) -> Result<(), CoreError> {
    let mut pairs = Vec::with_capacity(entries.len());
    for (k, v) in entries {
        let mut key_buf = Vec::new();
        encode_value_to(&mut key_buf, k)?;
        pairs.push((key_buf, v));
    }
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, pairs.len() as u64);
    for (key_bytes, value) in pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value)?;
    }
    Ok(())
}

/// Decode bytes into a CBOR value.
pub fn decode_value(bytes: &[u8]) -> Result<Value, CoreError> {
    ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))
}

/// Integer-keyed map accessor used when decoding records.
pub(crate) struct MapView<'a> {
    entries: &'a [(Value, Value)],
}

impl<'a> MapView<'a> {
    pub(crate) fn new(value: &'a Value) -> Result<Self, CoreError> {
        match value {
            Value::Map(entries) => Ok(Self { entries }),
            _ => Err(CoreError::DecodingError("expected map".into())),
        }
    }

    fn get(&self, key: u64) -> Option<&'a Value> {
        self.entries
            .iter()
            .find(|(k, _)| matches!(k, Value::Integer(i) if i128::from(*i) == key as i128))
            .map(|(_, v)| v)
    }

    pub(crate) fn uint(&self, key: u64, name: &str) -> Result<u64, CoreError> {
        match self.get(key) {
            Some(Value::Integer(i)) => u64::try_from(i128::from(*i))
                .map_err(|_| CoreError::DecodingError(format!("{} out of range", name))),
            _ => Err(CoreError::DecodingError(format!("missing {}", name))),
        }
    }

    pub(crate) fn bytes<const N: usize>(&self, key: u64, name: &str) -> Result<[u8; N], CoreError> {
        match self.get(key) {
            Some(Value::Bytes(b)) => b
                .as_slice()
                .try_into()
                .map_err(|_| CoreError::DecodingError(format!("invalid {} length", name))),
            _ => Err(CoreError::DecodingError(format!("missing {}", name))),
        }
    }

    pub(crate) fn uint_array(&self, key: u64, name: &str) -> Result<Vec<u64>, CoreError> {
        match self.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::Integer(i) => u64::try_from(i128::from(*i))
                        .map_err(|_| CoreError::DecodingError(format!("{} out of range", name))),
                    _ => Err(CoreError::DecodingError(format!("invalid {}", name))),
                })
                .collect(),
            _ => Err(CoreError::DecodingError(format!("missing {}", name))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smallest_integer_encoding() {
        assert_eq!(encode_canonical(&Value::Integer(0.into())).unwrap(), vec![0x00]);
        assert_eq!(encode_canonical(&Value::Integer(23.into())).unwrap(), vec![0x17]);
        assert_eq!(encode_canonical(&Value::Integer(24.into())).unwrap(), vec![0x18, 24]);
        assert_eq!(
            encode_canonical(&Value::Integer(256.into())).unwrap(),
            vec![0x19, 0x01, 0x00]
        );
    }

    #[test]
    fn test_map_keys_sorted() {
        let a = Value::Map(vec![
            (Value::Integer(2.into()), Value::Integer(1.into())),
            (Value::Integer(0.into()), Value::Integer(1.into())),
        ]);
        let b = Value::Map(vec![
            (Value::Integer(0.into()), Value::Integer(1.into())),
            (Value::Integer(2.into()), Value::Integer(1.into())),
        ]);
        assert_eq!(encode_canonical(&a).unwrap(), encode_canonical(&b).unwrap());
    }

    #[test]
    fn test_rejects_text_and_negative() {
        assert!(encode_canonical(&Value::Text("x".into())).is_err());
        assert!(encode_canonical(&Value::Integer((-1).into())).is_err());
    }

    #[test]
    fn test_decode_matches_ciborium() {
        let value = Value::Map(vec![(
            Value::Integer(1.into()),
            Value::Bytes(vec![0xaa; 4]),
        )]);
        let bytes = encode_canonical(&value).unwrap();
        let decoded = decode_value(&bytes).unwrap();
        let view = MapView::new(&decoded).unwrap();
        assert_eq!(view.bytes::<4>(1, "field").unwrap(), [0xaa; 4]);
    }
}
