use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    io::{BufReader, Error},
    path::Path,
};

use super::{Account, AccountsState, BlockHeader};
use crate::constants::DEFAULT_BLOCK_GAS_LIMIT;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Genesis {
    /// Chain configuration
    pub config: ChainConfig,
    /// The initial state of the accounts in the genesis block.
    pub alloc: BTreeMap<Address, GenesisAccount>,
    /// Genesis header values
    #[serde(default)]
    pub coinbase: Address,
    #[serde(default, with = "crate::serde_utils::u64::hex_str_opt")]
    pub gas_limit: Option<u64>,
    #[serde(default, deserialize_with = "crate::serde_utils::u64::deser_hex_or_dec_str")]
    pub timestamp: u64,
    #[serde(default, with = "crate::serde_utils::u64::hex_str_opt")]
    pub base_fee_per_gas: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    pub chain_id: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct GenesisAccount {
    #[serde(default, with = "crate::serde_utils::bytes")]
    pub code: Bytes,
    #[serde(default, with = "crate::serde_utils::u256::storage_map")]
    pub storage: BTreeMap<H256, U256>,
    #[serde(deserialize_with = "crate::serde_utils::u256::deser_hex_or_dec_str")]
    #[serde(serialize_with = "crate::serde_utils::u256::hex_str::serialize")]
    pub balance: U256,
    #[serde(default, deserialize_with = "crate::serde_utils::u64::deser_hex_or_dec_str")]
    pub nonce: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum GenesisError {
    #[error("Failed to decode genesis file: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Failed to open genesis file: {0}")]
    File(#[from] Error),
}

impl TryFrom<&Path> for Genesis {
    type Error = GenesisError;

    fn try_from(genesis_file_path: &Path) -> Result<Self, Self::Error> {
        let genesis_file = std::fs::File::open(genesis_file_path)?;
        let genesis_reader = BufReader::new(genesis_file);
        Ok(serde_json::from_reader(genesis_reader)?)
    }
}

impl Genesis {
    pub fn accounts(&self) -> AccountsState {
        self.alloc
            .iter()
            .map(|(address, account)| {
                (
                    *address,
                    Account::new(
                        account.balance,
                        account.code.clone(),
                        account.nonce,
                        account.storage.clone(),
                    ),
                )
            })
            .collect()
    }

    /// Header of block 0, `state_root` must be the commitment of [`Genesis::accounts`]
    pub fn get_block_header(&self, state_root: H256) -> BlockHeader {
        BlockHeader {
            parent_hash: H256::zero(),
            coinbase: self.coinbase,
            state_root,
            number: 0,
            gas_limit: self.gas_limit.unwrap_or(DEFAULT_BLOCK_GAS_LIMIT),
            timestamp: self.timestamp,
            base_fee_per_gas: self.base_fee_per_gas,
        }
    }
}
