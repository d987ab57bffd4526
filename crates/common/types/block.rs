use ethereum_types::{Address, H256};
use keccak_hash::keccak;
use serde::{Deserialize, Serialize};

use crate::utils::encode_fields;

pub type BlockNumber = u64;
pub type BlockHash = H256;

/// Header of a block already part of the chain.
///
/// Only the fields the tracer needs to rebuild the execution environment are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    pub parent_hash: H256,
    pub coinbase: Address,
    pub state_root: H256,
    #[serde(with = "crate::serde_utils::u64::hex_str")]
    pub number: BlockNumber,
    #[serde(with = "crate::serde_utils::u64::hex_str")]
    pub gas_limit: u64,
    #[serde(with = "crate::serde_utils::u64::hex_str")]
    pub timestamp: u64,
    #[serde(default, with = "crate::serde_utils::u64::hex_str_opt")]
    pub base_fee_per_gas: Option<u64>,
}

impl BlockHeader {
    pub fn hash(&self) -> BlockHash {
        let encoded = encode_fields(&[
            &self.parent_hash.0,
            &self.coinbase.0,
            &self.state_root.0,
            &self.number,
            &self.gas_limit,
            &self.timestamp,
            &self.base_fee_per_gas.unwrap_or_default(),
        ]);
        keccak(encoded)
    }

    /// Builds the header of the block following this one
    pub fn child(&self, timestamp: u64, state_root: H256) -> BlockHeader {
        BlockHeader {
            parent_hash: self.hash(),
            coinbase: self.coinbase,
            state_root,
            number: self.number + 1,
            gas_limit: self.gas_limit,
            timestamp,
            base_fee_per_gas: self.base_fee_per_gas,
        }
    }
}
