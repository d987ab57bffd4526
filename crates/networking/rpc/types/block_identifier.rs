use std::str::FromStr;

use ethtrace_common::types::{BlockIdentifier, BlockTag};
use serde_json::Value;

/// Parses a block parameter, either a hex quantity (`"0x64"`), a plain JSON integer or a tag.
///
/// A missing parameter refers to the latest block.
pub fn parse_block_identifier(value: Option<&Value>) -> Result<BlockIdentifier, String> {
    match value {
        None | Some(Value::Null) => Ok(BlockIdentifier::default()),
        Some(Value::Number(number)) => number
            .as_u64()
            .map(BlockIdentifier::Number)
            .ok_or_else(|| format!("Invalid block number {number}")),
        Some(Value::String(value)) => match value.strip_prefix("0x") {
            Some(hex) => u64::from_str_radix(hex, 16)
                .map(BlockIdentifier::Number)
                .map_err(|_| format!("Could not parse given hex {value}")),
            None => BlockTag::from_str(value).map(BlockIdentifier::Tag),
        },
        Some(other) => Err(format!("Invalid block identifier {other}")),
    }
}
