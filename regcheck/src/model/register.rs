//! `Register` is the main primitive of the model. It represents all available metadata for a given
//! register after the blocks of a register map have been flattened.

use std::{fmt, str};

use itertools::Itertools;
use strum::{EnumIter, IntoEnumIterator};

use crate::model::AddrRepr;

/// Represents a single memory-mapped 32-bit register.
#[derive(Clone, Debug)]
pub struct Register {
    /// Name of the block this register belongs to
    pub block: String,
    /// Register name, e.g., `CTRL`
    pub name: String,
    /// Physical address of the register
    pub addr: AddrRepr,
    /// Software access rights as declared
    pub access: Declared<RegisterAccess>,
    /// Expected register value after reset, if declared
    ///
    /// Kept at 64 bits so that a value that does not fit the register can be reported.
    pub reset: Option<u64>,
    pub desc: Option<String>,
    /// Fields in declaration order
    pub fields: Vec<Field>,
}

impl Register {
    /// Get register's unique identifier
    ///
    /// Constructed from the hierarchical path, e.g., `CORE.CTRL`.
    pub fn uid(&self) -> String {
        format!("{}.{}", self.block, self.name)
    }

    /// Get register's absolute memory address
    pub fn full_addr(&self) -> u64 {
        self.addr.full()
    }
}

/// A named bit range within a [`Register`]
#[derive(Clone, Debug)]
pub struct Field {
    pub name: String,
    pub bits: BitRange,
    pub access: Declared<FieldAccess>,
    pub reset: Option<u64>,
}

/// A named group of registers sharing a base address
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub name: String,
    pub base: u32,
}

/// Inclusive bit range `[msb:lsb]`
///
/// The indices are stored as declared; [`BitRange::mask`] returns `None` unless
/// `0 <= lsb <= msb <= 31`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitRange {
    pub msb: i64,
    pub lsb: i64,
}

impl BitRange {
    pub const fn new(msb: i64, lsb: i64) -> Self {
        Self { msb, lsb }
    }

    pub fn in_bounds(&self) -> bool {
        (0..=31).contains(&self.msb) && (0..=31).contains(&self.lsb)
    }

    pub fn is_ordered(&self) -> bool {
        self.msb >= self.lsb
    }

    /// Number of bits covered by a valid range
    pub fn width(&self) -> Option<u32> {
        (self.in_bounds() && self.is_ordered()).then(|| (self.msb - self.lsb + 1) as u32)
    }

    /// Mask of the bits covered by a valid range, e.g., `[3:0]` -> `0xF`
    pub fn mask(&self) -> Option<u32> {
        self.width()
            .map(|width| ((low_bits(width) as u64) << self.lsb) as u32)
    }

    /// Extracts the bits of `value` covered by this range, right-aligned
    pub fn extract(&self, value: u32) -> Option<u32> {
        self.width()
            .map(|width| (value >> self.lsb) & low_bits(width))
    }
}

/// Mask with the `width` lowest bits set, `width` in `1..=32`
pub(crate) fn low_bits(width: u32) -> u32 {
    ((1u64 << width) - 1) as u32
}

impl fmt::Display for BitRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.msb, self.lsb)
    }
}

#[test]
fn bit_range_masks() {
    assert_eq!(BitRange::new(3, 0).mask(), Some(0xF));
    assert_eq!(BitRange::new(0, 0).mask(), Some(0x1));
    assert_eq!(BitRange::new(31, 0).mask(), Some(u32::MAX));
    assert_eq!(BitRange::new(31, 31).mask(), Some(0x8000_0000));
    assert_eq!(BitRange::new(15, 8).width(), Some(8));
    assert_eq!(BitRange::new(15, 8).extract(0xABCD), Some(0xAB));
    assert_eq!(BitRange::new(32, 0).mask(), None);
    assert_eq!(BitRange::new(-1, 0).mask(), None);
    assert_eq!(BitRange::new(0, 3).mask(), None);
}

/// An access mode as spelled in the document
///
/// Unknown spellings are kept so that the validator can report them against the allowed set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Declared<A> {
    Known(A),
    Unknown(String),
}

impl<A: str::FromStr> Declared<A> {
    pub fn from_spelling(s: &str) -> Self {
        s.parse()
            .map_or_else(|_| Self::Unknown(s.to_owned()), Self::Known)
    }

    pub fn known(&self) -> Option<&A> {
        match self {
            Self::Known(a) => Some(a),
            Self::Unknown(_) => None,
        }
    }
}

impl<A: fmt::Display> fmt::Display for Declared<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(a) => a.fmt(f),
            Self::Unknown(s) => s.fmt(f),
        }
    }
}

/// Software access rights of a register
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter)]
pub enum RegisterAccess {
    /// `ro`
    ReadOnly,
    /// `rw`
    ReadWrite,
    /// `ro_w1c`: reads return status, writing one clears the corresponding bit
    ReadOnlyWrite1Clear,
}

impl RegisterAccess {
    /// Field access modes that may appear within a register of this access mode
    pub const fn allowed_field_access(&self) -> &'static [FieldAccess] {
        match self {
            Self::ReadOnly => &[FieldAccess::ReadOnly],
            Self::ReadOnlyWrite1Clear => &[FieldAccess::ReadOnly, FieldAccess::Write1Clear],
            Self::ReadWrite => &[
                FieldAccess::ReadOnly,
                FieldAccess::ReadWrite,
                FieldAccess::Write1Pulse,
                FieldAccess::Write1Clear,
            ],
        }
    }

    pub fn allows(&self, field: FieldAccess) -> bool {
        self.allowed_field_access().contains(&field)
    }

    /// All accepted spellings, e.g., "ro, rw, ro_w1c"
    pub fn spellings() -> String {
        Self::iter().join(", ")
    }
}

impl str::FromStr for RegisterAccess {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ro" => Ok(Self::ReadOnly),
            "rw" => Ok(Self::ReadWrite),
            "ro_w1c" => Ok(Self::ReadOnlyWrite1Clear),
            _ => Err(()),
        }
    }
}

impl fmt::Display for RegisterAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ReadOnly => "ro",
            Self::ReadWrite => "rw",
            Self::ReadOnlyWrite1Clear => "ro_w1c",
        })
    }
}

/// Software access rights of a field
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter)]
pub enum FieldAccess {
    /// `ro`
    ReadOnly,
    /// `rw`
    ReadWrite,
    /// `w1p`: writing one triggers a single-cycle pulse, reads return zero
    Write1Pulse,
    /// `w1c`: writing one clears the bit
    Write1Clear,
}

impl FieldAccess {
    pub fn spellings() -> String {
        Self::iter().join(", ")
    }
}

impl str::FromStr for FieldAccess {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ro" => Ok(Self::ReadOnly),
            "rw" => Ok(Self::ReadWrite),
            "w1p" => Ok(Self::Write1Pulse),
            "w1c" => Ok(Self::Write1Clear),
            _ => Err(()),
        }
    }
}

impl fmt::Display for FieldAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ReadOnly => "ro",
            Self::ReadWrite => "rw",
            Self::Write1Pulse => "w1p",
            Self::Write1Clear => "w1c",
        })
    }
}

#[test]
fn access_compatibility_table() {
    use FieldAccess as F;
    use RegisterAccess as R;

    assert!(R::ReadOnly.allows(F::ReadOnly));
    assert!(!R::ReadOnly.allows(F::ReadWrite));
    assert!(!R::ReadOnly.allows(F::Write1Clear));
    assert!(R::ReadOnlyWrite1Clear.allows(F::Write1Clear));
    assert!(!R::ReadOnlyWrite1Clear.allows(F::Write1Pulse));
    assert!(!R::ReadOnlyWrite1Clear.allows(F::ReadWrite));
    assert!(F::iter().all(|f| R::ReadWrite.allows(f)));
}

#[test]
fn access_spellings() {
    assert_eq!(RegisterAccess::spellings(), "ro, rw, ro_w1c");
    assert_eq!(FieldAccess::spellings(), "ro, rw, w1p, w1c");
    assert_eq!(
        Declared::<RegisterAccess>::from_spelling("ro_w1c"),
        Declared::Known(RegisterAccess::ReadOnlyWrite1Clear)
    );
    assert_eq!(
        Declared::<FieldAccess>::from_spelling("wo"),
        Declared::Unknown("wo".to_owned())
    );
}
