//! Encodes information about the registers of a register map. This information is validated,
//! reconciled against HDL sources and serialized into headers.

mod addr;
mod build;
mod diagnostic;
mod register;

// Anything that's part of the public API of the submodules is also part of the public API of model
pub use addr::*;
pub(crate) use build::build_register_map;
pub use diagnostic::*;
pub use register::*;

use std::ops;

/// Flattened register map: every named register of every block, in document order
#[derive(Clone, Debug, Default)]
pub struct RegisterMap {
    blocks: Vec<Block>,
    registers: Vec<Register>,
}

impl RegisterMap {
    pub(crate) fn new(blocks: Vec<Block>, registers: Vec<Register>) -> Self {
        Self { blocks, registers }
    }

    /// Blocks in document order
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Registers ordered by address, ties keeping document order
    pub fn sorted_by_addr(&self) -> Vec<&Register> {
        let mut registers = self.registers.iter().collect::<Vec<_>>();
        registers.sort_by_key(|r| r.full_addr());
        registers
    }
}

impl ops::Deref for RegisterMap {
    type Target = [Register];

    fn deref(&self) -> &Self::Target {
        &self.registers
    }
}
