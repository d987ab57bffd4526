use bytes::Bytes;
use ethereum_types::{Address, U256};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum TxKind {
    Call(Address),
    #[default]
    Create,
}

impl TxKind {
    pub fn is_create(&self) -> bool {
        matches!(self, TxKind::Create)
    }

    pub fn to(&self) -> Option<Address> {
        match self {
            TxKind::Call(address) => Some(*address),
            TxKind::Create => None,
        }
    }
}

impl From<Option<Address>> for TxKind {
    fn from(value: Option<Address>) -> Self {
        value.map(TxKind::Call).unwrap_or(TxKind::Create)
    }
}

/// Pseudo-transaction to be simulated, no signature is required.
///
/// Built from the RPC call object once it passed structural validation,
/// fields left unset are filled in by the execution engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallParameters {
    pub from: Option<Address>,
    pub to: TxKind,
    pub gas: Option<u64>,
    pub gas_price: Option<U256>,
    pub max_fee_per_gas: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,
    pub value: U256,
    pub input: Bytes,
    pub nonce: Option<u64>,
}

impl CallParameters {
    pub fn is_eip1559(&self) -> bool {
        self.max_fee_per_gas.is_some() || self.max_priority_fee_per_gas.is_some()
    }
}
