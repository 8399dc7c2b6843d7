//! Canonical CBOR encoding for deterministic packet serialization.
//!
//! Packets are encoded as a CBOR map (RFC 8949) with deterministic rules:
//! - Map keys sorted by their encoded bytes, at every nesting level
//! - Integers use the smallest valid encoding
//! - Definite lengths only
//! - No floats, tags or undefined values
//!
//! The content identifier of a packet is derived from these bytes, so the
//! encoding must never change for a given packet.

use ciborium::value::Value;

use crate::error::{CoreError, Result};
use crate::packet::Packet;

/// Packet map keys as they appear on the wire.
pub mod keys {
    pub const PVER: &str = "pver";
    pub const APP_ID: &str = "dapid";
    pub const OBJECT_SET_HASH: &str = "dapobjmerkleroot";
    pub const CONTRACT: &str = "dapcontract";
    pub const OBJECTS: &str = "dapobjects";
    pub const META: &str = "meta";
}

/// Encode a packet without its metadata.
///
/// These are the bytes that get hashed and written to the content store.
pub fn canonical_bytes(packet: &Packet) -> Result<Vec<u8>> {
    encode_canonical(&packet_to_value(packet, false))
}

/// Encode a packet including its metadata.
pub fn canonical_bytes_with_meta(packet: &Packet) -> Result<Vec<u8>> {
    encode_canonical(&packet_to_value(packet, true))
}

fn packet_to_value(packet: &Packet, include_meta: bool) -> Value {
    let mut entries = vec![
        (
            Value::Text(keys::PVER.to_string()),
            Value::Integer(packet.pver.into()),
        ),
        (
            Value::Text(keys::APP_ID.to_string()),
            Value::Text(packet.app_id.clone()),
        ),
        (
            Value::Text(keys::OBJECT_SET_HASH.to_string()),
            Value::Text(packet.object_set_hash.clone()),
        ),
        (
            Value::Text(keys::CONTRACT.to_string()),
            packet.contract.clone().unwrap_or(Value::Null),
        ),
        (
            Value::Text(keys::OBJECTS.to_string()),
            Value::Array(packet.objects.clone()),
        ),
    ];

    if include_meta {
        entries.push((
            Value::Text(keys::META.to_string()),
            packet.meta.clone().unwrap_or(Value::Null),
        ));
    }

    Value::Map(entries)
}

/// Decode a packet from canonical bytes.
///
/// The result is in canonical form: nested maps come back with their keys
/// in encoded order, which may differ from the order the packet was built
/// with. Compare packets by their canonical bytes or identifiers, not with
/// `==`. Trailing bytes after the map are rejected.
pub fn decode_packet(bytes: &[u8]) -> Result<Packet> {
    let mut cursor = std::io::Cursor::new(bytes);
    let value: Value =
        ciborium::from_reader(&mut cursor).map_err(|e| CoreError::DecodingError(e.to_string()))?;

    if cursor.position() as usize != bytes.len() {
        return Err(CoreError::DecodingError("trailing bytes after packet".into()));
    }

    let map = match value {
        Value::Map(m) => m,
        _ => return Err(CoreError::MalformedPacket("expected map".into())),
    };

    let get = |key: &str| -> Option<&Value> {
        map.iter()
            .find(|(k, _)| matches!(k, Value::Text(s) if s == key))
            .map(|(_, v)| v)
    };

    let pver = match get(keys::PVER) {
        Some(Value::Integer(i)) => {
            let n: i128 = (*i).into();
            u32::try_from(n).map_err(|_| CoreError::MalformedPacket("pver out of range".into()))?
        }
        _ => return Err(CoreError::MalformedPacket("missing pver".into())),
    };

    let app_id = match get(keys::APP_ID) {
        Some(Value::Text(s)) => s.clone(),
        _ => return Err(CoreError::MalformedPacket("missing dapid".into())),
    };

    let object_set_hash = match get(keys::OBJECT_SET_HASH) {
        Some(Value::Text(s)) => s.clone(),
        _ => return Err(CoreError::MalformedPacket("missing dapobjmerkleroot".into())),
    };

    let contract = match get(keys::CONTRACT) {
        Some(Value::Null) | None => None,
        Some(v) => Some(v.clone()),
    };

    let objects = match get(keys::OBJECTS) {
        Some(Value::Array(items)) => items.clone(),
        _ => return Err(CoreError::MalformedPacket("missing dapobjects".into())),
    };

    let meta = match get(keys::META) {
        Some(Value::Null) | None => None,
        Some(v) => Some(v.clone()),
    };

    Ok(Packet {
        pver,
        app_id,
        object_set_hash,
        contract,
        objects,
        meta,
    })
}

/// Encode a CBOR value to canonical bytes.
pub fn encode_canonical(value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_value(&mut buf, value)?;
    Ok(buf)
}

fn encode_value(buf: &mut Vec<u8>, value: &Value) -> Result<()> {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => encode_bytes(buf, b),
        Value::Text(s) => encode_text(buf, s),
        Value::Array(arr) => encode_array(buf, arr)?,
        Value::Map(entries) => encode_map(buf, entries)?,
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        Value::Float(_) => {
            return Err(CoreError::EncodingError(
                "floats have no canonical encoding".into(),
            ))
        }
        Value::Tag(tag, _) => {
            return Err(CoreError::EncodingError(format!("unsupported tag {}", tag)))
        }
        _ => return Err(CoreError::EncodingError("unsupported CBOR value".into())),
    }
    Ok(())
}

fn encode_integer(buf: &mut Vec<u8>, i: ciborium::value::Integer) {
    let n: i128 = i.into();
    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // -1 encodes as 0, -2 as 1, ...
        encode_uint(buf, 1, (-1 - n) as u64);
    }
}

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

fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

fn encode_array(buf: &mut Vec<u8>, arr: &[Value]) -> Result<()> {
    encode_uint(buf, 4, arr.len() as u64);
    for item in arr {
        encode_value(buf, item)?;
    }
    Ok(())
}

fn encode_map(buf: &mut Vec<u8>, entries: &[(Value, Value)]) -> Result<()> {
    let mut sorted = Vec::with_capacity(entries.len());
    for (k, v) in entries {
        let mut key_bytes = Vec::new();
        encode_value(&mut key_bytes, k)?;
        sorted.push((key_bytes, v));
    }

    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    for pair in sorted.windows(2) {
        if pair[0].0 == pair[1].0 {
            return Err(CoreError::EncodingError("duplicate map key".into()));
        }
    }

    encode_uint(buf, 5, sorted.len() as u64);
    for (key_bytes, v) in sorted {
        buf.extend_from_slice(&key_bytes);
        encode_value(buf, v)?;
    }
    Ok(())
}


#[cfg(test)]
mod props {
    use ciborium::value::Value;
    use proptest::prelude::*;

    use super::encode_canonical;

    proptest! {
        #[test]
        fn test_integers_use_shortest_form(n in any::<i64>()) {
            let bytes = encode_canonical(&Value::Integer(n.into())).unwrap();
            let magnitude = if n >= 0 { n as u64 } else { (-1 - n) as u64 };
            let expected = match magnitude {
                0..=23 => 1,
                24..=0xff => 2,
                0x100..=0xffff => 3,
                0x1_0000..=0xffff_ffff => 5,
                _ => 9,
            };
            prop_assert_eq!(bytes.len(), expected);

            let back: Value = ciborium::from_reader(&bytes[..]).unwrap();
            prop_assert_eq!(back, Value::Integer(n.into()));
        }
    }
}
