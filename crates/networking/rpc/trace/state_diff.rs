use std::collections::BTreeMap;

use bytes::Bytes;
use ethtrace_common::{Address, H256, U256, serde_utils, utils::u256_to_h256};
use ethtrace_vm::tracing::{AccountDiff, AccountState, TransactionTrace};
use serde::{Serialize, Serializer, ser::SerializeMap};

/// Pre and post values of every account the call changed, keyed by address.
pub type StateDiff = BTreeMap<Address, AccountStateDiff>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountStateDiff {
    pub balance: Delta<U256>,
    pub nonce: Delta<U256>,
    pub code: Delta<Code>,
    pub storage: BTreeMap<H256, Delta<H256>>,
}

/// Change of a single value, serialized with parity's `=`, `+`, `-` and `*` markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delta<T> {
    Unchanged,
    Born(T),
    Died(T),
    Changed { from: T, to: T },
}

impl<T: PartialEq> Delta<T> {
    fn between(from: T, to: T) -> Self {
        if from == to {
            Delta::Unchanged
        } else {
            Delta::Changed { from, to }
        }
    }
}

impl<T: Serialize> Serialize for Delta<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        #[derive(Serialize)]
        struct Change<'a, T> {
            from: &'a T,
            to: &'a T,
        }

        match self {
            Delta::Unchanged => serializer.serialize_str("="),
            Delta::Born(value) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("+", value)?;
                map.end()
            }
            Delta::Died(value) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("-", value)?;
                map.end()
            }
            Delta::Changed { from, to } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("*", &Change { from, to })?;
                map.end()
            }
        }
    }
}

/// Account code, serialized as a hex string
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Code(#[serde(serialize_with = "serde_utils::bytes::serialize")] pub Bytes);

pub fn build(trace: &TransactionTrace) -> StateDiff {
    trace
        .account_diffs()
        .filter_map(|diff| Some((diff.address, account_state_diff(diff)?)))
        .collect()
}

fn account_state_diff(diff: &AccountDiff) -> Option<AccountStateDiff> {
    let state_diff = match (&diff.before, &diff.after) {
        (None, Some(after)) => AccountStateDiff {
            balance: Delta::Born(after.balance),
            nonce: Delta::Born(after.nonce.into()),
            code: Delta::Born(Code(after.code.clone())),
            storage: non_zero_slots(after)
                .map(|(key, value)| (*key, Delta::Born(u256_to_h256(*value))))
                .collect(),
        },
        (Some(before), None) => AccountStateDiff {
            balance: Delta::Died(before.balance),
            nonce: Delta::Died(before.nonce.into()),
            code: Delta::Died(Code(before.code.clone())),
            storage: non_zero_slots(before)
                .map(|(key, value)| (*key, Delta::Died(u256_to_h256(*value))))
                .collect(),
        },
        (Some(before), Some(after)) => AccountStateDiff {
            balance: Delta::between(before.balance, after.balance),
            nonce: Delta::between(before.nonce.into(), after.nonce.into()),
            code: Delta::between(Code(before.code.clone()), Code(after.code.clone())),
            storage: before
                .storage
                .keys()
                .chain(after.storage.keys())
                .map(|key| {
                    let slot = |state: &AccountState| {
                        u256_to_h256(state.storage.get(key).copied().unwrap_or_default())
                    };
                    (*key, Delta::between(slot(before), slot(after)))
                })
                .filter(|(_, delta)| *delta != Delta::Unchanged)
                .collect(),
        },
        (None, None) => return None,
    };
    Some(state_diff)
}

fn non_zero_slots(state: &AccountState) -> impl Iterator<Item = (&H256, &U256)> {
    state.storage.iter().filter(|(_, value)| !value.is_zero())
}
