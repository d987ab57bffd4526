use std::{collections::BTreeMap, sync::Arc};

use bytes::Bytes;
use ethtrace_common::{
    Address, H256, U256,
    types::{Account, AccountInfo, AccountsState, BlockHeader},
    utils::encode_fields,
};
use keccak_hash::keccak;

/// Immutable view over the world state at a given block.
///
/// Cloning is cheap, every clone shares the same underlying account map.
#[derive(Debug, Clone, Default)]
pub struct StateSnapshot {
    accounts: Arc<AccountsState>,
}

impl StateSnapshot {
    pub fn new(accounts: AccountsState) -> Self {
        Self {
            accounts: Arc::new(accounts),
        }
    }

    pub fn get_account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    pub fn account_info(&self, address: &Address) -> AccountInfo {
        self.get_account(address)
            .map(|account| account.info.clone())
            .unwrap_or_default()
    }

    pub fn code(&self, address: &Address) -> Bytes {
        self.get_account(address)
            .map(|account| account.code.clone())
            .unwrap_or_default()
    }

    pub fn storage_slot(&self, address: &Address, key: &H256) -> U256 {
        self.get_account(address)
            .map(|account| account.storage_slot(key))
            .unwrap_or_default()
    }

    pub fn accounts(&self) -> &AccountsState {
        &self.accounts
    }

    pub fn state_root(&self) -> H256 {
        compute_state_root(&self.accounts)
    }
}

/// A resolved block: its header together with the state it left behind.
#[derive(Debug, Clone)]
pub struct BlockReference {
    pub header: BlockHeader,
    pub state: StateSnapshot,
}

/// Commitment over the whole account map.
///
/// Accounts are visited in address order, each one encoded as
/// `rlp([address, nonce, balance, code_hash, storage_root])`.
pub fn compute_state_root(accounts: &AccountsState) -> H256 {
    let mut encoded = Vec::new();
    for (address, account) in accounts {
        let storage_root = compute_storage_root(&account.storage);
        encoded.extend(encode_fields(&[
            &address.0,
            &account.info.nonce,
            &account.info.balance.to_big_endian(),
            &account.info.code_hash.0,
            &storage_root.0,
        ]));
    }
    keccak(encoded)
}

fn compute_storage_root(storage: &BTreeMap<H256, U256>) -> H256 {
    let mut encoded = Vec::new();
    for (key, value) in storage.iter().filter(|(_, value)| !value.is_zero()) {
        encoded.extend(encode_fields(&[&key.0, &value.to_big_endian()]));
    }
    keccak(encoded)
}
