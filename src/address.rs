use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use thiserror::Error;

/// Raised when constructing an [`Address`] from a value with bits above
/// bit 11 set.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
#[error("address {0:#06x} does not fit in 12 bits")]
pub struct InvalidAddress(pub u16);

/// An address in CHIP-8 memory.
///
/// The machine only has 4kiB of RAM, so addresses are 12 bits wide and this
/// type never holds a value outside 0x000..=0xFFF. All arithmetic wraps
/// modulo 4096, which is what the program counter and index register need.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(u16);

impl Address {
    pub const VALUE_MASK: u16 = 0x0FFF;

    /// Construct an address from a raw value, rejecting anything that does
    /// not fit in 12 bits.
    pub fn new(value: u16) -> Result<Self, InvalidAddress> {
        if value & !Self::VALUE_MASK != 0 {
            Err(InvalidAddress(value))
        } else {
            Ok(Address(value))
        }
    }

    /// Construct an address by truncating the value to 12 bits. Never fails,
    /// so this is the right constructor for wrapping arithmetic.
    pub const fn truncated(value: u16) -> Self {
        Address(value & Self::VALUE_MASK)
    }

    /// The raw 12-bit value.
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// The raw value widened for slice indexing.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<Address> for u16 {
    fn from(address: Address) -> u16 {
        address.0
    }
}

impl From<Address> for usize {
    fn from(address: Address) -> usize {
        address.0 as usize
    }
}

impl Add<u16> for Address {
    type Output = Address;

    fn add(self, rhs: u16) -> Address {
        Address::truncated(self.0.wrapping_add(rhs))
    }
}

impl AddAssign<u16> for Address {
    fn add_assign(&mut self, rhs: u16) {
        *self = *self + rhs;
    }
}

impl Sub<u16> for Address {
    type Output = Address;

    fn sub(self, rhs: u16) -> Address {
        Address::truncated(self.0.wrapping_sub(rhs))
    }
}

impl SubAssign<u16> for Address {
    fn sub_assign(&mut self, rhs: u16) {
        *self = *self - rhs;
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({:#05x})", self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#05x}", self.0)
    }
}
