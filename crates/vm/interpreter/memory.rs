use bytes::Bytes;
use ethtrace_common::U256;

use crate::errors::{ExceptionalHalt, VMError};

pub const WORD_SIZE: usize = 32;

/// Offsets past this bound would cost far more gas than any block allows
const MAX_MEMORY_OFFSET: usize = u32::MAX as usize;

/// Byte-addressed, word-aligned memory of a single call frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    fn resize(&mut self, offset: usize, size: usize) {
        if size == 0 {
            return;
        }
        self.expand((offset + size).div_ceil(WORD_SIZE) * WORD_SIZE);
    }

    /// Grows memory to `new_size` bytes, already paid for by the caller
    pub fn expand(&mut self, new_size: usize) {
        if new_size > self.data.len() {
            self.data.resize(new_size, 0);
        }
    }

    pub fn load_word(&mut self, offset: usize) -> U256 {
        self.resize(offset, WORD_SIZE);
        U256::from_big_endian(&self.data[offset..offset + WORD_SIZE])
    }

    pub fn load_range(&mut self, offset: usize, size: usize) -> Bytes {
        self.resize(offset, size);
        Bytes::copy_from_slice(&self.data[offset..offset + size])
    }

    pub fn store_word(&mut self, offset: usize, value: U256) {
        self.store_data(offset, &value.to_big_endian());
    }

    pub fn store_data(&mut self, offset: usize, data: &[u8]) {
        self.resize(offset, data.len());
        self.data[offset..offset + data.len()].copy_from_slice(data);
    }
}

/// Converts a stack value into a memory offset, halting on values no frame could pay for.
pub fn to_offset(value: U256) -> Result<usize, VMError> {
    if value > U256::from(MAX_MEMORY_OFFSET) {
        return Err(ExceptionalHalt::OutOfGas.into());
    }
    Ok(value.as_usize())
}

/// Converts an `(offset, size)` operand pair. A zero size never touches memory, so its
/// offset is ignored however large it is.
pub fn to_range(offset: U256, size: U256) -> Result<(usize, usize), VMError> {
    if size.is_zero() {
        return Ok((0, 0));
    }
    Ok((to_offset(offset)?, to_offset(size)?))
}

/// Size of memory once `[offset, offset + size)` was accessed, `current` if `size` is zero.
pub fn calculate_memory_size(offset: usize, size: usize, current: usize) -> Result<usize, VMError> {
    if size == 0 {
        return Ok(current);
    }
    let end = offset
        .checked_add(size)
        .filter(|end| *end <= MAX_MEMORY_OFFSET)
        .ok_or(ExceptionalHalt::OutOfGas)?;
    Ok(current.max(end.div_ceil(WORD_SIZE) * WORD_SIZE))
}
