use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    io::{BufReader, Error},
    path::Path,
};

use super::{Account, AccountUpdate, BlockNumber};

/// Blocks to import on top of the genesis block, in chain order.
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChainFile {
    pub blocks: Vec<ChainFileBlock>,
    #[serde(default, with = "crate::serde_utils::u64::hex_str_opt")]
    pub safe: Option<BlockNumber>,
    #[serde(default, with = "crate::serde_utils::u64::hex_str_opt")]
    pub finalized: Option<BlockNumber>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChainFileBlock {
    #[serde(deserialize_with = "crate::serde_utils::u64::deser_hex_or_dec_str")]
    pub timestamp: u64,
    /// Accounts changed by the block, fields left out keep their previous value
    #[serde(default)]
    pub accounts: BTreeMap<Address, ChainFileAccount>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ChainFileAccount {
    #[serde(default, with = "crate::serde_utils::u256::hex_str_opt")]
    pub balance: Option<U256>,
    #[serde(default, with = "crate::serde_utils::u64::hex_str_opt")]
    pub nonce: Option<u64>,
    #[serde(default, deserialize_with = "crate::serde_utils::bytes::opt::deserialize")]
    pub code: Option<Bytes>,
    /// Slots written by the block, a zero value clears the slot
    #[serde(default, with = "crate::serde_utils::u256::storage_map")]
    pub storage: BTreeMap<H256, U256>,
    #[serde(default)]
    pub removed: bool,
}

impl ChainFileAccount {
    /// Turns the partial description into a full update of `current`
    pub fn to_update(&self, address: Address, current: Option<&Account>) -> AccountUpdate {
        if self.removed {
            return AccountUpdate {
                address,
                removed: true,
                ..Default::default()
            };
        }
        let mut info = current.map(|account| account.info.clone()).unwrap_or_default();
        if let Some(balance) = self.balance {
            info.balance = balance;
        }
        if let Some(nonce) = self.nonce {
            info.nonce = nonce;
        }
        AccountUpdate {
            address,
            removed: false,
            info: Some(info),
            code: self.code.clone(),
            added_storage: self.storage.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChainFileError {
    #[error("Failed to decode chain file: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Failed to open chain file: {0}")]
    File(#[from] Error),
}

impl TryFrom<&Path> for ChainFile {
    type Error = ChainFileError;

    fn try_from(chain_file_path: &Path) -> Result<Self, Self::Error> {
        let chain_file = std::fs::File::open(chain_file_path)?;
        let chain_reader = BufReader::new(chain_file);
        Ok(serde_json::from_reader(chain_reader)?)
    }
}
