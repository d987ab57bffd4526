use std::collections::BTreeMap;

use bytes::Bytes;
use ethtrace_common::{Address, H256, U256, types::Account};
use ethtrace_storage::StateSnapshot;

use crate::tracing::{AccountDiff, AccountState};

/// Call-local view over a [`StateSnapshot`].
///
/// Accounts are copied into the cache on first access and only ever modified there,
/// the snapshot is never written to.
#[derive(Debug, Clone)]
pub struct GeneralizedDatabase {
    store: StateSnapshot,
    /// Accounts as they are right now, including uncommitted changes
    pub current_accounts_state: BTreeMap<Address, Account>,
    /// Accounts as they were in the snapshot the first time they were accessed
    pub initial_accounts_state: BTreeMap<Address, Option<Account>>,
}

/// Copy of the cache taken before running a call frame, restored if the frame fails.
pub type CacheBackup = BTreeMap<Address, Account>;

impl GeneralizedDatabase {
    pub fn new(store: StateSnapshot) -> Self {
        Self {
            store,
            current_accounts_state: BTreeMap::new(),
            initial_accounts_state: BTreeMap::new(),
        }
    }

    fn load_account(&mut self, address: Address) -> &mut Account {
        let store = &self.store;
        let initial = &mut self.initial_accounts_state;
        self.current_accounts_state
            .entry(address)
            .or_insert_with(|| {
                let account = store.get_account(&address).cloned();
                initial.entry(address).or_insert_with(|| account.clone());
                account.unwrap_or_default()
            })
    }

    pub fn get_account(&mut self, address: Address) -> &Account {
        self.load_account(address)
    }

    pub fn get_account_mut(&mut self, address: Address) -> &mut Account {
        self.load_account(address)
    }

    pub fn balance(&mut self, address: Address) -> U256 {
        self.get_account(address).info.balance
    }

    pub fn code(&mut self, address: Address) -> Bytes {
        self.get_account(address).code.clone()
    }

    pub fn storage_slot(&mut self, address: Address, key: H256) -> U256 {
        self.get_account(address).storage_slot(&key)
    }

    pub fn set_storage_slot(&mut self, address: Address, key: H256, value: U256) {
        self.get_account_mut(address).storage.insert(key, value);
    }

    pub fn backup(&self) -> CacheBackup {
        self.current_accounts_state.clone()
    }

    /// Drops every change made since `backup` was taken.
    ///
    /// Accounts first loaded after the backup are dropped from the cache too, they are
    /// reloaded from the snapshot on next access.
    pub fn restore(&mut self, backup: CacheBackup) {
        self.current_accounts_state = backup;
    }

    /// Every touched account whose balance, nonce, code or storage changed.
    pub fn account_diffs(&self) -> Vec<AccountDiff> {
        self.initial_accounts_state
            .iter()
            .filter_map(|(address, initial)| {
                let current = self.current_accounts_state.get(address);
                let diff = account_diff(*address, initial.as_ref(), current);
                (diff.before != diff.after).then_some(diff)
            })
            .collect()
    }
}

fn account_diff(address: Address, initial: Option<&Account>, current: Option<&Account>) -> AccountDiff {
    // Touching a missing account without giving it a balance, nonce or code does not create it
    let current = match current {
        Some(account) if initial.is_none() && account.is_empty() => None,
        Some(account) => Some(account),
        None => initial,
    };
    let changed_slots = |this: &Account, other: Option<&Account>| -> BTreeMap<H256, U256> {
        let mut keys: Vec<&H256> = this.storage.keys().collect();
        if let Some(other) = other {
            keys.extend(other.storage.keys());
        }
        keys.into_iter()
            .filter(|key| other.map(|other| other.storage_slot(key)) != Some(this.storage_slot(key)))
            .map(|key| (*key, this.storage_slot(key)))
            .collect()
    };
    let state = |this: &Account, other: Option<&Account>| AccountState {
        balance: this.info.balance,
        nonce: this.info.nonce,
        code: this.code.clone(),
        storage: changed_slots(this, other),
    };
    AccountDiff {
        address,
        before: initial.map(|account| state(account, current)),
        after: current.map(|account| state(account, initial)),
    }
}
