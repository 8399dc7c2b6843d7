//! # Drive Sync Core
//!
//! Pure primitives for Drive sync: packets, content identifiers and the sync
//! checkpoint model.
//!
//! This crate contains no I/O. Everything here is a deterministic function of
//! its inputs.
//!
//! ## Key Types
//!
//! - [`Packet`] - A state-transition packet
//! - [`PacketHash`] - Double SHA-256 over a packet's canonical bytes
//! - [`ContentId`] - CIDv1 (dag-cbor, dbl-sha2-256) used as the store key
//! - [`SyncCheckpoint`] - How far local block processing has advanced
//!
//! ## Canonicalization
//!
//! Packets are encoded using deterministic CBOR with metadata stripped. See
//! the [`canonical`] module.

pub mod canonical;
pub mod checkpoint;
pub mod error;
pub mod hash;
pub mod packet;

pub use canonical::{canonical_bytes, canonical_bytes_with_meta, decode_packet};
pub use checkpoint::{ProcessedBlock, SyncCheckpoint};
pub use error::{CoreError, Result};
pub use hash::{ContentId, PacketHash};
pub use packet::Packet;

/// Re-exported so callers can build packet fields without naming ciborium.
pub use ciborium::value::Value;

/// Get current time in milliseconds.
pub fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
