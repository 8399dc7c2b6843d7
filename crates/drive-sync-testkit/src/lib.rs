//! # Drive Sync Testkit
//!
//! Testing utilities for Drive sync.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: packets with their expected canonical bytes, hash
//!   and content identifier
//! - **Generators**: proptest strategies for packets, CBOR values and block
//!   runs
//! - **Fixtures**: a Drive over scriptable in-memory collaborators
//!
//! ## Golden Vectors
//!
//! ```rust
//! use drive_sync_testkit::vectors::verify_all_vectors;
//!
//! for report in verify_all_vectors() {
//!     assert!(report.matches, "{}", report.name);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use drive_sync_testkit::generators::{packet_from_params, PacketParams};
//!
//! proptest! {
//!     #[test]
//!     fn hash_is_deterministic(params: PacketParams) {
//!         let p = packet_from_params(&params);
//!         prop_assert_eq!(p.hash().unwrap(), p.clone().hash().unwrap());
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{block_chain, random_block_hash, sample_packet, MemoryDrive, TestFixture};
pub use generators::{packet_from_params, PacketParams};
pub use vectors::{all_vectors, verify_all_vectors, GoldenVector, VectorReport};
