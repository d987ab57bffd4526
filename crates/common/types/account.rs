use std::collections::BTreeMap;

use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use serde::{Deserialize, Serialize};

use crate::{constants::EMPTY_KECCACK_HASH, utils::code_hash};

/// World state as of a block, ordered so that iteration (and hashing) is deterministic.
pub type AccountsState = BTreeMap<Address, Account>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub balance: U256,
    pub nonce: u64,
    pub code_hash: H256,
}

impl Default for AccountInfo {
    fn default() -> Self {
        Self {
            balance: U256::zero(),
            nonce: 0,
            code_hash: EMPTY_KECCACK_HASH,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub info: AccountInfo,
    #[serde(with = "crate::serde_utils::bytes")]
    pub code: Bytes,
    pub storage: BTreeMap<H256, U256>,
}

impl Account {
    pub fn new(balance: U256, code: Bytes, nonce: u64, storage: BTreeMap<H256, U256>) -> Self {
        Self {
            info: AccountInfo {
                balance,
                nonce,
                code_hash: code_hash(&code),
            },
            code,
            storage,
        }
    }

    pub fn has_code(&self) -> bool {
        !self.code.is_empty()
    }

    /// Empty as defined by EIP-161: no code, zero nonce and zero balance
    pub fn is_empty(&self) -> bool {
        self.info.balance.is_zero() && self.info.nonce == 0 && !self.has_code()
    }

    pub fn storage_slot(&self, key: &H256) -> U256 {
        self.storage.get(key).copied().unwrap_or_default()
    }

    pub fn set_code(&mut self, code: Bytes) {
        self.info.code_hash = code_hash(&code);
        self.code = code;
    }
}

/// Changes applied to a single account when a block is imported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountUpdate {
    pub address: Address,
    pub removed: bool,
    pub info: Option<AccountInfo>,
    pub code: Option<Bytes>,
    pub added_storage: BTreeMap<H256, U256>,
}

impl AccountUpdate {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            ..Default::default()
        }
    }

    pub fn removed(address: Address) -> Self {
        Self {
            address,
            removed: true,
            ..Default::default()
        }
    }
}
