//! Hashing and content identifiers: double SHA-256 over canonical packet
//! bytes, wrapped as a CIDv1 with a `dbl-sha2-256` multihash.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// CID version byte.
pub const CID_VERSION: u8 = 0x01;

/// Multicodec for dag-cbor.
pub const DAG_CBOR_CODEC: u8 = 0x71;

/// Multihash code for `dbl-sha2-256`.
pub const DBL_SHA2_256: u8 = 0x56;

/// Digest length in bytes.
pub const DIGEST_LEN: u8 = 0x20;

/// A 32-byte double SHA-256 digest of a packet's canonical bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PacketHash(pub [u8; 32]);

impl PacketHash {
    /// Compute SHA-256(SHA-256(data)).
    pub fn double_sha256(data: &[u8]) -> Self {
        let first = Sha256::digest(data);
        let second = Sha256::digest(first);
        Self(second.into())
    }

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex. Anything but 64 hex characters is `InvalidHash`.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| CoreError::InvalidHash(format!("{}: {}", s, e)))?;
        let arr: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            CoreError::InvalidHash(format!("expected 32 bytes, got {}", b.len()))
        })?;
        Ok(Self(arr))
    }

    /// Wrap this hash as a content identifier.
    pub fn content_id(&self) -> ContentId {
        ContentId::from_hash(*self)
    }
}

impl fmt::Debug for PacketHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PacketHash({}...)", &self.to_hex()[..16])
    }
}

impl fmt::Display for PacketHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl AsRef<[u8]> for PacketHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for PacketHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// A versioned, codec-tagged content identifier (CIDv1, dag-cbor,
/// dbl-sha2-256).
///
/// This is the only key used for store, pin and unpin operations.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentId {
    hash: PacketHash,
}

impl ContentId {
    /// Build an identifier from a packet hash.
    pub const fn from_hash(hash: PacketHash) -> Self {
        Self { hash }
    }

    /// Build an identifier from a hex-encoded packet hash.
    pub fn from_hash_hex(s: &str) -> Result<Self> {
        PacketHash::from_hex(s).map(Self::from_hash)
    }

    pub const fn hash(&self) -> &PacketHash {
        &self.hash
    }

    /// Multihash bytes: `code || length || digest`.
    pub fn multihash(&self) -> Vec<u8> {
        let mut mh = Vec::with_capacity(34);
        mh.push(DBL_SHA2_256);
        mh.push(DIGEST_LEN);
        mh.extend_from_slice(&self.hash.0);
        mh
    }

    /// Binary CID: `version || codec || multihash`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(36);
        bytes.push(CID_VERSION);
        bytes.push(DAG_CBOR_CODEC);
        bytes.extend_from_slice(&self.multihash());
        bytes
    }

    /// Parse a binary CID.
    pub fn from_cid_bytes(bytes: &[u8]) -> Result<Self> {
        match bytes {
            [CID_VERSION, DAG_CBOR_CODEC, DBL_SHA2_256, DIGEST_LEN, digest @ ..] => {
                let arr: [u8; 32] = digest.try_into().map_err(|_| {
                    CoreError::InvalidContentId(format!("digest is {} bytes", digest.len()))
                })?;
                Ok(Self::from_hash(PacketHash(arr)))
            }
            _ => Err(CoreError::InvalidContentId(
                "expected CIDv1 dag-cbor dbl-sha2-256".into(),
            )),
        }
    }
}

impl fmt::Display for ContentId {
    /// Multibase base32 lower: `b` + base32(cid bytes).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", base32_encode(&self.to_bytes()))
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self)
    }
}

impl FromStr for ContentId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let encoded = s
            .strip_prefix('b')
            .ok_or_else(|| CoreError::InvalidContentId(format!("unsupported multibase: {}", s)))?;
        let bytes = base32_decode(encoded)
            .ok_or_else(|| CoreError::InvalidContentId(format!("invalid base32: {}", s)))?;
        Self::from_cid_bytes(&bytes)
    }
}

impl Serialize for ContentId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ContentId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

const BASE32_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz234567";

// RFC 4648 Base32 encoding (lowercase, no padding)
fn base32_encode(data: &[u8]) -> String {
    let mut result = String::with_capacity((data.len() * 8 + 4) / 5);
    let mut buffer: u64 = 0;
    let mut bits_in_buffer = 0;

    for &byte in data {
        buffer = (buffer << 8) | (byte as u64);
        bits_in_buffer += 8;

        while bits_in_buffer >= 5 {
            bits_in_buffer -= 5;
            let index = ((buffer >> bits_in_buffer) & 0x1f) as usize;
            result.push(BASE32_ALPHABET[index] as char);
        }
    }

    if bits_in_buffer > 0 {
        let index = ((buffer << (5 - bits_in_buffer)) & 0x1f) as usize;
        result.push(BASE32_ALPHABET[index] as char);
    }

    result
}

fn base32_decode(s: &str) -> Option<Vec<u8>> {
    let mut result = Vec::with_capacity(s.len() * 5 / 8);
    let mut buffer: u64 = 0;
    let mut bits_in_buffer = 0;

    for c in s.bytes() {
        let value = BASE32_ALPHABET.iter().position(|&a| a == c)? as u64;
        buffer = (buffer << 5) | value;
        bits_in_buffer += 5;

        if bits_in_buffer >= 8 {
            bits_in_buffer -= 8;
            result.push(((buffer >> bits_in_buffer) & 0xff) as u8);
        }
    }

    // Leftover bits are padding and must be zero.
    if bits_in_buffer >= 5 || buffer & ((1 << bits_in_buffer) - 1) != 0 {
        return None;
    }

    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_sha256_known_vector() {
        // SHA256(SHA256("")) from the Bitcoin test suite
        let h = PacketHash::double_sha256(b"");
        assert_eq!(
            h.to_hex(),
            "5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456"
        );
    }

    #[test]
    fn test_hash_hex_roundtrip() {
        let h = PacketHash::double_sha256(b"packet");
        assert_eq!(PacketHash::from_hex(&h.to_hex()).unwrap(), h);
    }

    #[test]
    fn test_invalid_hash_rejected() {
        assert!(matches!(
            ContentId::from_hash_hex("not-hex"),
            Err(CoreError::InvalidHash(_))
        ));
        assert!(matches!(
            ContentId::from_hash_hex("abcd"),
            Err(CoreError::InvalidHash(_))
        ));
        assert!(matches!(
            ContentId::from_hash_hex(&"ab".repeat(33)),
            Err(CoreError::InvalidHash(_))
        ));
    }

    #[test]
    fn test_cid_layout() {
        let cid = PacketHash::from_bytes([0x11; 32]).content_id();
        let bytes = cid.to_bytes();
        assert_eq!(&bytes[..4], &[0x01, 0x71, 0x56, 0x20]);
        assert_eq!(bytes.len(), 36);
    }

    #[test]
    fn test_cid_string_format() {
        let cid = PacketHash::double_sha256(b"hello").content_id();
        let s = cid.to_string();
        assert!(s.starts_with("bafy"));
        assert_eq!(s, s.to_lowercase());
        assert_eq!(s.parse::<ContentId>().unwrap(), cid);
    }

    #[test]
    fn test_cid_parse_rejects_garbage() {
        assert!("zQm123".parse::<ContentId>().is_err());
        assert!("b!!!!".parse::<ContentId>().is_err());
        // valid base32 but a sha2-256 (0x12) multihash
        let mut other = vec![0x01, 0x71, 0x12, 0x20];
        other.extend_from_slice(&[0u8; 32]);
        let s = format!("b{}", base32_encode(&other));
        assert!(matches!(
            s.parse::<ContentId>(),
            Err(CoreError::InvalidContentId(_))
        ));
    }

    #[test]
    fn test_base32_encode() {
        // RFC 4648 vectors
        assert_eq!(base32_encode(b""), "");
        assert_eq!(base32_encode(b"f"), "my");
        assert_eq!(base32_encode(b"fo"), "mzxq");
        assert_eq!(base32_encode(b"foo"), "mzxw6");
        assert_eq!(base32_encode(b"foob"), "mzxw6yq");
        assert_eq!(base32_encode(b"fooba"), "mzxw6ytb");
        assert_eq!(base32_encode(b"foobar"), "mzxw6ytboi");
    }

    #[test]
    fn test_base32_decode() {
        assert_eq!(base32_decode("mzxw6ytboi").unwrap(), b"foobar");
        assert_eq!(base32_decode("my").unwrap(), b"f");
        assert!(base32_decode("mz").is_none());
    }
}
