use crate::address::Address;
use std::ops::{Index, IndexMut};
use thiserror::Error;

/// How much RAM the machine has. 12-bit addresses cover it exactly.
pub const MEMORY_SIZE: usize = 4096;

/// Raised when a bulk load would run past the end of memory.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
#[error("loading {len} bytes at {base} overflows the {MEMORY_SIZE}-byte memory")]
pub struct MemoryOverflow {
    pub base: Address,
    pub len: usize,
}

/// The flat 4kiB store everything executes against.
///
/// Indexing by [`Address`] needs no bounds check: the address type already
/// guarantees the 12-bit range. Only bulk [`load`](Memory::load) can fail.
pub struct Memory {
    bytes: [u8; MEMORY_SIZE],
}

impl Memory {
    /// A fresh memory, zero filled.
    pub fn new() -> Self {
        Memory {
            bytes: [0; MEMORY_SIZE],
        }
    }

    /// Copy `data` into memory starting at `base`, overwriting only the
    /// covered range. Fails iff `data` is longer than the capacity left
    /// between `base` and the end of memory.
    pub fn load(&mut self, base: Address, data: &[u8]) -> Result<(), MemoryOverflow> {
        let offset = base.index();
        if data.len() > MEMORY_SIZE - offset {
            return Err(MemoryOverflow {
                base,
                len: data.len(),
            });
        }
        self.bytes[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    /// Write the 80-byte glyph font at `base`. The caller must leave at
    /// least 80 bytes of room; by convention the font lives at 0x050.
    pub fn load_default_font(&mut self, base: Address) {
        let offset = base.index();
        debug_assert!(offset + DEFAULT_FONT.len() <= MEMORY_SIZE);
        self.bytes[offset..offset + DEFAULT_FONT.len()].copy_from_slice(&DEFAULT_FONT);
    }
}

impl Default for Memory {
    fn default() -> Self {
        Memory::new()
    }
}

impl Index<Address> for Memory {
    type Output = u8;

    fn index(&self, address: Address) -> &u8 {
        &self.bytes[address.index()]
    }
}

impl IndexMut<Address> for Memory {
    fn index_mut(&mut self, address: Address) -> &mut u8 {
        &mut self.bytes[address.index()]
    }
}

/// Glyph sprites for the hex digits, 5 bytes per digit.
#[rustfmt::skip]
const DEFAULT_FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];
