use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use ethtrace_common::{
    H256,
    types::{
        AccountUpdate, AccountsState, BlockHash, BlockHeader, BlockIdentifier, BlockNumber,
        BlockTag, ChainConfig, Genesis,
    },
};
use tracing::{debug, error, info};

use crate::{
    api::ChainStateLookup,
    error::StoreError,
    snapshot::{StateSnapshot, compute_state_root},
};

/// In-memory chain store.
///
/// Keeps every canonical header together with the full state left behind by it.
/// Writers build the next state aside and swap it in under the write lock, so readers
/// holding a [`StateSnapshot`] never observe a partially imported block.
#[derive(Debug, Clone, Default)]
pub struct Store {
    inner: Arc<RwLock<StoreInner>>,
}

#[derive(Debug, Default)]
struct StoreInner {
    chain_config: Option<ChainConfig>,
    headers: BTreeMap<BlockNumber, BlockHeader>,
    numbers: HashMap<BlockHash, BlockNumber>,
    states: HashMap<BlockHash, StateSnapshot>,
    latest_block_number: Option<BlockNumber>,
    safe_block_number: Option<BlockNumber>,
    finalized_block_number: Option<BlockNumber>,
}

impl StoreInner {
    fn latest_header(&self) -> Result<&BlockHeader, StoreError> {
        self.latest_block_number
            .and_then(|number| self.headers.get(&number))
            .ok_or(StoreError::MissingLatestBlockNumber)
    }

    fn insert_block(&mut self, header: BlockHeader, state: StateSnapshot) {
        let hash = header.hash();
        let number = header.number;
        self.numbers.insert(hash, number);
        self.states.insert(hash, state);
        self.headers.insert(number, header);
        self.latest_block_number = Some(number);
    }
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn new_from_genesis(genesis: Genesis) -> Result<Self, StoreError> {
        let store = Self::new();
        store.add_initial_state(genesis).await?;
        Ok(store)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreInner>, StoreError> {
        self.inner.read().map_err(|_| StoreError::LockError)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreInner>, StoreError> {
        self.inner.write().map_err(|_| StoreError::LockError)
    }

    /// Stores the genesis block and its state.
    ///
    /// Loading the same genesis twice is a no-op, a different one is rejected.
    pub async fn add_initial_state(&self, genesis: Genesis) -> Result<BlockHeader, StoreError> {
        debug!("Storing initial state from genesis");

        let accounts = genesis.accounts();
        let state_root = compute_state_root(&accounts);
        let genesis_header = genesis.get_block_header(state_root);
        let genesis_hash = genesis_header.hash();

        let mut inner = self.write()?;
        match inner.headers.get(&genesis_header.number) {
            Some(header) if header.hash() == genesis_hash => {
                info!("Received genesis file matching a previously stored one, nothing to do");
                return Ok(genesis_header);
            }
            Some(_) => {
                error!(
                    "The chain configuration stored is incompatible with the provided genesis"
                );
                return Err(StoreError::IncompatibleChainConfig);
            }
            None => {}
        }

        info!(hash = %genesis_hash, "Storing genesis block");
        inner.chain_config = Some(genesis.config);
        inner.insert_block(genesis_header.clone(), StateSnapshot::new(accounts));
        Ok(genesis_header)
    }

    /// Imports a block on top of the current head, applying `updates` to the head state.
    pub async fn add_block(
        &self,
        timestamp: u64,
        updates: &[AccountUpdate],
    ) -> Result<BlockHeader, StoreError> {
        let mut inner = self.write()?;
        let parent = inner.latest_header()?.clone();
        let mut accounts = inner
            .states
            .get(&parent.hash())
            .ok_or(StoreError::MissingState(parent.number))?
            .accounts()
            .clone();
        apply_account_updates(&mut accounts, updates);

        let header = parent.child(timestamp, compute_state_root(&accounts));
        debug!(number = header.number, hash = %header.hash(), "Importing block");
        inner.insert_block(header.clone(), StateSnapshot::new(accounts));
        Ok(header)
    }

    pub fn get_block_header(
        &self,
        block_number: BlockNumber,
    ) -> Result<Option<BlockHeader>, StoreError> {
        Ok(self.read()?.headers.get(&block_number).cloned())
    }

    pub fn get_block_header_by_hash(
        &self,
        block_hash: BlockHash,
    ) -> Result<Option<BlockHeader>, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .numbers
            .get(&block_hash)
            .and_then(|number| inner.headers.get(number))
            .cloned())
    }

    pub fn get_latest_block_number(&self) -> Result<BlockNumber, StoreError> {
        self.read()?
            .latest_block_number
            .ok_or(StoreError::MissingLatestBlockNumber)
    }

    pub fn get_earliest_block_number(&self) -> Result<BlockNumber, StoreError> {
        self.read()?
            .headers
            .keys()
            .next()
            .copied()
            .ok_or(StoreError::MissingEarliestBlockNumber)
    }

    pub fn get_chain_config(&self) -> Result<Option<ChainConfig>, StoreError> {
        Ok(self.read()?.chain_config)
    }

    pub async fn update_finalized_block_number(
        &self,
        block_number: BlockNumber,
    ) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        if !inner.headers.contains_key(&block_number) {
            return Err(StoreError::UnknownBlock(block_number));
        }
        inner.finalized_block_number = Some(block_number);
        Ok(())
    }

    pub async fn update_safe_block_number(
        &self,
        block_number: BlockNumber,
    ) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        if !inner.headers.contains_key(&block_number) {
            return Err(StoreError::UnknownBlock(block_number));
        }
        inner.safe_block_number = Some(block_number);
        Ok(())
    }

    /// Recomputes the state commitment of the given block from its stored state
    pub fn state_root(&self, block_number: BlockNumber) -> Result<Option<H256>, StoreError> {
        let inner = self.read()?;
        let Some(header) = inner.headers.get(&block_number) else {
            return Ok(None);
        };
        Ok(inner
            .states
            .get(&header.hash())
            .map(StateSnapshot::state_root))
    }
}

impl ChainStateLookup for Store {
    fn resolve_header(&self, block: &BlockIdentifier) -> Result<Option<BlockHeader>, StoreError> {
        let inner = self.read()?;
        let number = match block {
            BlockIdentifier::Number(number) => Some(*number),
            BlockIdentifier::Tag(BlockTag::Earliest) => inner.headers.keys().next().copied(),
            // No pending block is built, the head is the closest thing to it
            BlockIdentifier::Tag(BlockTag::Latest | BlockTag::Pending) => {
                inner.latest_block_number
            }
            BlockIdentifier::Tag(BlockTag::Safe) => inner.safe_block_number,
            BlockIdentifier::Tag(BlockTag::Finalized) => inner.finalized_block_number,
        };
        Ok(number.and_then(|number| inner.headers.get(&number)).cloned())
    }

    fn state_snapshot_at(
        &self,
        header: &BlockHeader,
    ) -> Result<Option<StateSnapshot>, StoreError> {
        Ok(self.read()?.states.get(&header.hash()).cloned())
    }
}

fn apply_account_updates(accounts: &mut AccountsState, updates: &[AccountUpdate]) {
    for update in updates {
        if update.removed {
            accounts.remove(&update.address);
            continue;
        }
        let account = accounts.entry(update.address).or_default();
        if let Some(info) = &update.info {
            account.info = info.clone();
        }
        if let Some(code) = &update.code {
            account.set_code(code.clone());
        }
        for (key, value) in &update.added_storage {
            if value.is_zero() {
                account.storage.remove(key);
            } else {
                account.storage.insert(*key, *value);
            }
        }
    }
}
