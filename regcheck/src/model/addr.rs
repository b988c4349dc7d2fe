use std::fmt;

use thiserror::Error;

/// Number of bits in a register address on the bus
pub(crate) const ADDR_BITS: u32 = 32;

/// Address representation
///
/// Keeps the block base and the register offset apart so that diagnostics can point at the
/// component that is out of line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddrRepr {
    base: u32,
    offset: u32,
}

impl AddrRepr {
    pub fn new(base: u32, offset: u32) -> Self {
        Self { base, offset }
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Get register's absolute memory address
    ///
    /// Computed in 64 bits, so it never wraps. See [`Self::to_bus_addr`] for the checked form.
    pub fn full(&self) -> u64 {
        u64::from(self.base) + u64::from(self.offset)
    }

    /// Get register's absolute memory address, checking that it fits the 32-bit bus
    pub fn to_bus_addr(&self, id: &str) -> Result<u32, MakeAddrError> {
        make_addr(&[self.base.into(), self.offset.into()], ADDR_BITS, Some(id.to_owned()))
            // `make_addr` guarantees the value is representable with `ADDR_BITS`
            .map(|addr| addr as u32)
    }
}

#[derive(Error, Clone, Debug)]
#[cfg_attr(test, derive(PartialEq, Eq))]
#[error(
    "overflow: could not make components {src:x?} into an address of size {size} (bits), id: {id:?}"
)]
pub struct MakeAddrError {
    /// Source offsets for the address
    pub(crate) src: Vec<u64>,
    /// Number of bits used to represent this address
    pub(crate) size: u32,
    /// Optional identifier
    pub(crate) id: Option<String>,
}

fn bits_required(val: u64) -> u32 {
    64 - val.leading_zeros()
}

#[test]
fn bits_required_works() {
    let test = bits_required;

    assert_eq!(test(u64::MAX), 64);
    assert_eq!(test(u32::MAX.into()), 32);
    assert_eq!(test(u16::MAX.into()), 16);
    assert_eq!(test(u8::MAX.into()), 8);
    assert_eq!(test(0b1), 1);
    assert_eq!(test(0b11), 2);
    assert_eq!(test(0b101), 3);
}

/// Construct an address from given offsets
///
/// Validates that the components can form an address that can be represented using the given size.
///
/// # Arguments
///
/// * `offsets` - List of offsets to use to form the address
/// * `size` - Number of bits used to represent this address
/// * `id`  - Optional address identifier for debug and tracing purposes
fn make_addr(offsets: &[u64], size: u32, id: Option<String>) -> Result<u64, MakeAddrError> {
    let err = || MakeAddrError {
        src: offsets.to_vec(),
        size,
        id: id.clone(),
    };

    // Add the components together, watching for overflows
    let addr = offsets
        .iter()
        .try_fold(0u64, |acc, x| acc.checked_add(*x))
        .ok_or_else(err)?;

    // Check that `size` can still represent this value
    if bits_required(addr) > size {
        return Err(err());
    }

    Ok(addr)
}

#[test]
fn make_addr_detects_overflow() {
    assert_eq!(make_addr(&[0x1000, 0x4], 32, None), Ok(0x1004));
    assert_eq!(make_addr(&[0xFFFF_FFFC, 0x4], 32, None).unwrap_err().size, 32);
    assert!(make_addr(&[u64::MAX, 1], 64, None).is_err());

    let repr = AddrRepr::new(0xFFFF_FFF0, 0x10);
    assert_eq!(repr.full(), 0x1_0000_0000);
    assert_eq!(
        repr.to_bus_addr("TOP.REG").unwrap_err().id.as_deref(),
        Some("TOP.REG")
    );
    assert_eq!(AddrRepr::new(0x100, 0x8).to_bus_addr("X"), Ok(0x108));
}

impl fmt::Display for AddrRepr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ base: {:#x}, offset: {:#x} }}",
            self.base(),
            self.offset()
        )
    }
}
