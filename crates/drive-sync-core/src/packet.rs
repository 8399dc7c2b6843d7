//! Packet: an application-level bundle of state-transition data.
//!
//! A packet carries six fields: protocol version, application id,
//! object-set hash, contract blob, object list and free-form metadata.
//! Metadata never takes part in content addressing.

use ciborium::value::Value;

use crate::canonical::{canonical_bytes, decode_packet};
use crate::error::Result;
use crate::hash::{ContentId, PacketHash};

/// A state-transition packet.
///
/// Immutable once hashed: hashing is a pure function of the fields, so a
/// packet that is mutated afterwards simply addresses to different content.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    /// Packet protocol version.
    pub pver: u32,
    /// Application identifier.
    pub app_id: String,
    /// Hash over the object set.
    pub object_set_hash: String,
    /// Contract/schema blob, if the packet carries one.
    pub contract: Option<Value>,
    /// Objects carried by the packet.
    pub objects: Vec<Value>,
    /// Free-form metadata, excluded from the hash.
    pub meta: Option<Value>,
}

impl Packet {
    pub fn new(pver: u32, app_id: impl Into<String>, object_set_hash: impl Into<String>) -> Self {
        Self {
            pver,
            app_id: app_id.into(),
            object_set_hash: object_set_hash.into(),
            contract: None,
            objects: Vec::new(),
            meta: None,
        }
    }

    pub fn with_contract(mut self, contract: Value) -> Self {
        self.contract = Some(contract);
        self
    }

    pub fn with_objects(mut self, objects: Vec<Value>) -> Self {
        self.objects = objects;
        self
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Canonical bytes with metadata stripped.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        canonical_bytes(self)
    }

    /// Decode from canonical bytes. Metadata is never stored, so it comes
    /// back as `None`, and nested maps come back in canonical key order.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        decode_packet(bytes)
    }

    /// Double SHA-256 of the canonical bytes.
    pub fn hash(&self) -> Result<PacketHash> {
        Ok(PacketHash::double_sha256(&self.to_bytes()?))
    }

    /// The content identifier this packet is stored under.
    pub fn content_id(&self) -> Result<ContentId> {
        Ok(self.hash()?.content_id())
    }
}
