use alloy_rlp::{Encodable, Header};
use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use keccak_hash::keccak;

use crate::constants::EMPTY_KECCACK_HASH;

/// RLP encodes the given fields as a single list
pub fn encode_fields(fields: &[&dyn Encodable]) -> Vec<u8> {
    let payload_length = fields.iter().map(|field| field.length()).sum();
    let mut out = Vec::with_capacity(payload_length + 8);
    Header {
        list: true,
        payload_length,
    }
    .encode(&mut out);
    for field in fields {
        field.encode(&mut out);
    }
    out
}

/// Address of a contract created by `sender` with the given nonce: `keccak(rlp([sender, nonce]))[12..]`
pub fn calculate_create_address(sender: Address, nonce: u64) -> Address {
    let encoded = encode_fields(&[&sender.0, &nonce]);
    Address::from_slice(&keccak(encoded).as_bytes()[12..])
}

pub fn code_hash(code: &Bytes) -> H256 {
    if code.is_empty() {
        EMPTY_KECCACK_HASH
    } else {
        keccak(code)
    }
}

pub fn u256_to_h256(value: U256) -> H256 {
    H256(value.to_big_endian())
}

pub fn h256_to_u256(value: H256) -> U256 {
    U256::from_big_endian(value.as_bytes())
}
