//! Golden test vectors for packet identity.
//!
//! Each vector pins the canonical bytes, the double SHA-256 and the content
//! identifier string of one packet. Any change to the encoding shows up
//! here first.

use drive_sync_core::{ContentId, Packet, Value};

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Builds the packet under test.
    pub packet: fn() -> Packet,
    /// Expected canonical bytes (hex).
    pub canonical_hex: &'static str,
    /// Expected packet hash (hex).
    pub hash_hex: &'static str,
    /// Expected content identifier.
    pub content_id: &'static str,
}

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

fn minimal() -> Packet {
    Packet::new(1, "app", "root")
}

fn contract_and_objects() -> Packet {
    Packet::new(1, "dashpay", "a1b2c3")
        .with_contract(Value::Map(vec![
            (text("version"), Value::Integer(1.into())),
            (text("name"), text("contacts")),
        ]))
        .with_objects(vec![Value::Map(vec![
            (text("type"), text("profile")),
            (text("avatar"), text("https://example.org/a.png")),
            (text("act"), Value::Integer(1.into())),
        ])])
}

fn contract_and_objects_with_meta() -> Packet {
    contract_and_objects().with_meta(Value::Map(vec![(text("peer"), text("relay-3"))]))
}

fn integer_widths() -> Packet {
    let ints: [i64; 9] = [0, 23, 24, 255, 256, 65_536, 4_294_967_296, -1, -25];
    Packet::new(2, "ints", "0").with_objects(ints.iter().map(|&n| Value::Integer(n.into())).collect())
}

fn empty_fields() -> Packet {
    Packet::new(0, "", "")
}

const CONTRACT_AND_OBJECTS_HEX: &str = "a564707665720165646170696467646173687061796a6461706f626a6563747381a3636163740164747970656770726f66696c6566617661746172781968747470733a2f2f6578616d706c652e6f72672f612e706e676b646170636f6e7472616374a2646e616d6568636f6e74616374736776657273696f6e01706461706f626a6d65726b6c65726f6f7466613162326333";
const CONTRACT_AND_OBJECTS_HASH: &str =
    "daf38a03d8f93dc826006e923be7284eb8a85c1a6947cb19a3fe17c86f582156";
const CONTRACT_AND_OBJECTS_CID: &str =
    "bafyvmig26ofahwhzhxecmadosi56okcoxcufygtji7frti76c7eg6wbbky";

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "minimal packet",
            packet: minimal,
            canonical_hex: "a5647076657201656461706964636170706a6461706f626a65637473806b646170636f6e7472616374f6706461706f626a6d65726b6c65726f6f7464726f6f74",
            hash_hex: "9ad8f75e381140f1629e942ef7cc411cc1f0f12ac506d358b0c64bfd504c2bbb",
            content_id: "bafyvmie23d3v4oaridywfhuuf334yqi4yhypckwfa3jvrmggjp6vatblxm",
        },
        GoldenVector {
            name: "contract and objects",
            packet: contract_and_objects,
            canonical_hex: CONTRACT_AND_OBJECTS_HEX,
            hash_hex: CONTRACT_AND_OBJECTS_HASH,
            content_id: CONTRACT_AND_OBJECTS_CID,
        },
        // meta must not move the identifier
        GoldenVector {
            name: "contract and objects with meta",
            packet: contract_and_objects_with_meta,
            canonical_hex: CONTRACT_AND_OBJECTS_HEX,
            hash_hex: CONTRACT_AND_OBJECTS_HASH,
            content_id: CONTRACT_AND_OBJECTS_CID,
        },
        GoldenVector {
            name: "integer widths",
            packet: integer_widths,
            canonical_hex: "a564707665720265646170696464696e74736a6461706f626a65637473890017181818ff1901001a000100001b00000001000000002038186b646170636f6e7472616374f6706461706f626a6d65726b6c65726f6f746130",
            hash_hex: "1bfe0ee20ea0c0e8c5f7f18494126339ce4da41f0629483c751484d61702a046",
            content_id: "bafyvmia37yhoedvayduml57rqskbeyzzzzg2ihygffedy5iuqtlboavaiy",
        },
        GoldenVector {
            name: "empty fields",
            packet: empty_fields,
            canonical_hex: "a5647076657200656461706964606a6461706f626a65637473806b646170636f6e7472616374f6706461706f626a6d65726b6c65726f6f7460",
            hash_hex: "ed6849c4cb2fb27a1fdbd3022db1b62343b4d24d8ecbe09a3c751f9e72a1eca7",
            content_id: "bafyvmihnnbe4jszpwj5b7w6taiw3dnrdio2netmozpqjupdvd6phfipmu4",
        },
    ]
}

/// Outcome of checking one vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorReport {
    pub name: &'static str,
    pub canonical_hex: String,
    pub hash_hex: String,
    pub content_id: String,
    pub matches: bool,
}

/// Recompute every vector and report whether it matches.
pub fn verify_all_vectors() -> Vec<VectorReport> {
    all_vectors().iter().map(verify_vector).collect()
}

pub fn verify_vector(vector: &GoldenVector) -> VectorReport {
    let packet = (vector.packet)();
    let canonical_hex = packet.to_bytes().map(hex::encode).unwrap_or_default();
    let hash_hex = packet.hash().map(|h| h.to_hex()).unwrap_or_default();
    let content_id = packet
        .content_id()
        .map(|id| id.to_string())
        .unwrap_or_default();

    let matches = canonical_hex == vector.canonical_hex
        && hash_hex == vector.hash_hex
        && content_id == vector.content_id;

    VectorReport {
        name: vector.name,
        canonical_hex,
        hash_hex,
        content_id,
        matches,
    }
}

/// Parse a vector's expected identifier.
pub fn expected_content_id(vector: &GoldenVector) -> Option<ContentId> {
    vector.content_id.parse().ok()
}
