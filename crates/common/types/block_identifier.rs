use std::{fmt::Display, str::FromStr};

use super::BlockNumber;

/// Identifies a block either by height or by its position relative to the chain head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockIdentifier {
    Number(BlockNumber),
    Tag(BlockTag),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlockTag {
    Earliest,
    Finalized,
    Safe,
    #[default]
    Latest,
    Pending,
}

impl Default for BlockIdentifier {
    fn default() -> BlockIdentifier {
        BlockIdentifier::Tag(BlockTag::default())
    }
}

impl FromStr for BlockTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "earliest" => Ok(BlockTag::Earliest),
            "finalized" => Ok(BlockTag::Finalized),
            "safe" => Ok(BlockTag::Safe),
            "latest" => Ok(BlockTag::Latest),
            "pending" => Ok(BlockTag::Pending),
            other => Err(format!("Unknown block tag {other}")),
        }
    }
}

impl Display for BlockTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            BlockTag::Earliest => "earliest",
            BlockTag::Finalized => "finalized",
            BlockTag::Safe => "safe",
            BlockTag::Latest => "latest",
            BlockTag::Pending => "pending",
        };
        f.write_str(tag)
    }
}

impl Display for BlockIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockIdentifier::Number(num) => write!(f, "{num:#x}"),
            BlockIdentifier::Tag(tag) => tag.fmt(f),
        }
    }
}
