use ethtrace_common::types::{BlockHeader, BlockIdentifier};

use crate::{error::StoreError, snapshot::StateSnapshot};

/// Read access to historical chain data.
///
/// Implementations must hand out snapshots that never change after being returned,
/// regardless of blocks imported afterwards.
pub trait ChainStateLookup: Send + Sync {
    /// Returns the canonical header for `block`, `None` if the chain has no such block.
    fn resolve_header(&self, block: &BlockIdentifier) -> Result<Option<BlockHeader>, StoreError>;

    /// Returns the world state after executing the block identified by `header`.
    fn state_snapshot_at(&self, header: &BlockHeader)
    -> Result<Option<StateSnapshot>, StoreError>;
}
