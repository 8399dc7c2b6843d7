//! Proptest generators for property-based testing.

use proptest::prelude::*;

use drive_sync_core::{Packet, ProcessedBlock, Value};

/// A CBOR value with a canonical encoding: no floats, no tags.
pub fn cbor_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| Value::Integer(n.into())),
        "[a-z0-9 ]{0,16}".prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..16).prop_map(Value::Bytes),
    ];

    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            // distinct keys so the map stays encodable
            prop::collection::btree_map("[a-z]{1,8}", inner, 0..4).prop_map(|m| {
                Value::Map(m.into_iter().map(|(k, v)| (Value::Text(k), v)).collect())
            }),
        ]
    })
}

/// An application id.
pub fn app_id() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,15}".prop_map(String::from)
}

/// A hex object-set hash.
pub fn object_set_hash() -> impl Strategy<Value = String> {
    any::<[u8; 32]>().prop_map(hex::encode)
}

/// Parameters for generating a packet.
#[derive(Debug, Clone)]
pub struct PacketParams {
    pub pver: u32,
    pub app_id: String,
    pub object_set_hash: String,
    pub contract: Option<Value>,
    pub objects: Vec<Value>,
    pub meta: Option<Value>,
}

impl Arbitrary for PacketParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            0u32..=10,
            app_id(),
            object_set_hash(),
            proptest::option::of(cbor_value()),
            prop::collection::vec(cbor_value(), 0..4),
            proptest::option::of(cbor_value()),
        )
            .prop_map(|(pver, app_id, object_set_hash, contract, objects, meta)| PacketParams {
                pver,
                app_id,
                object_set_hash,
                contract,
                objects,
                meta,
            })
            .boxed()
    }
}

/// Build a packet from parameters.
pub fn packet_from_params(params: &PacketParams) -> Packet {
    Packet {
        pver: params.pver,
        app_id: params.app_id.clone(),
        object_set_hash: params.object_set_hash.clone(),
        contract: params.contract.clone(),
        objects: params.objects.clone(),
        meta: params.meta.clone(),
    }
}

/// A run of processed blocks with strictly increasing heights.
pub fn block_chain(max_len: usize) -> impl Strategy<Value = Vec<ProcessedBlock>> {
    (1u64..1_000, prop::collection::vec((1u64..5, any::<[u8; 32]>()), 0..=max_len)).prop_map(
        |(start, steps)| {
            let mut height = start;
            steps
                .into_iter()
                .map(|(gap, hash)| {
                    height += gap;
                    ProcessedBlock::new(height, hex::encode(hash))
                })
                .collect()
        },
    )
}
