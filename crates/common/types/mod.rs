mod account;
mod block;
mod block_identifier;
mod call;
mod chain_file;
mod genesis;
mod log;

pub use account::*;
pub use block::*;
pub use block_identifier::*;
pub use call::*;
pub use chain_file::*;
pub use genesis::*;
pub use log::*;
