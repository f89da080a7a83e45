// SPDX-License-Identifier: MPL-2.0

//! The register file.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The number of general-purpose registers.
pub const GPR_COUNT: usize = 32;
/// The number of floating-point registers.
pub const FPR_COUNT: usize = 32;
/// The number of floating-point control registers.
pub const FCR_COUNT: usize = 32;

/// The value of both *PC* and *nPC* after a reset.
///
/// Fetches read word index `nPC / 4 - 1`, so this makes the first fetch read word 0.
pub const INITIAL_PC: u32 = 4;

/// Machine state: general-purpose registers, *HI*/*LO*, and the *PC*/*nPC* pair.
///
/// All registers hold raw bit patterns; signedness is a matter of interpretation by each operation.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct File {
    /// The address of the instruction just executed.
    pc: u32,
    /// The address of the instruction about to execute.
    npc: u32,
    hi: u32,
    lo: u32,
    /// General-purpose registers. Zero-indexed.
    gprs: [u32; GPR_COUNT],
    fprs: [u32; FPR_COUNT],
    fcrs: [u32; FCR_COUNT],
    fcsr: u32,
    /// Whether `r0` reads as 0 and ignores writes.
    hardwire_zero: bool,
}

impl Default for File {
    fn default() -> Self {
        Self::new(false)
    }
}

impl fmt::Display for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "pc: {:08x} npc:{:08x}", self.pc, self.npc)?;
        for i in 0..(GPR_COUNT / 2) {
            let lhs = format!("r{}:", i);
            let rhs = format!("r{}:", i + GPR_COUNT / 2);
            writeln!(
                f,
                "{:<4}{:08x} {:<4}{:08x}",
                lhs,
                self.gpr(i as u8),
                rhs,
                self.gpr((i + GPR_COUNT / 2) as u8),
            )?;
        }
        writeln!(f, "hi: {:08x} lo: {:08x}", self.hi, self.lo)?;

        Ok(())
    }
}

impl File {
    /// Creates a register file in the reset state.
    pub fn new(hardwire_zero: bool) -> Self {
        Self {
            pc: INITIAL_PC,
            npc: INITIAL_PC,
            hi: 0,
            lo: 0,
            gprs: [0; GPR_COUNT],
            fprs: [0; FPR_COUNT],
            fcrs: [0; FCR_COUNT],
            fcsr: 0,
            hardwire_zero,
        }
    }

    /// Restores the reset state, keeping the `r0` policy.
    pub fn reset(&mut self) {
        *self = Self::new(self.hardwire_zero);
    }

    pub fn hardwires_zero(&self) -> bool {
        self.hardwire_zero
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn pc_mut(&mut self) -> &mut u32 {
        &mut self.pc
    }

    pub fn npc(&self) -> u32 {
        self.npc
    }

    pub fn npc_mut(&mut self) -> &mut u32 {
        &mut self.npc
    }

    /// Moves *nPC* into *PC* and installs `target` as the new *nPC*.
    pub fn jump(&mut self, target: u32) {
        self.pc = self.npc;
        self.npc = target;
    }

    /// Moves *nPC* into *PC* and points *nPC* at the following word.
    pub fn advance(&mut self) {
        self.jump(self.npc.wrapping_add(4));
    }

    pub fn hi(&self) -> u32 {
        self.hi
    }

    pub fn hi_mut(&mut self) -> &mut u32 {
        &mut self.hi
    }

    pub fn lo(&self) -> u32 {
        self.lo
    }

    pub fn lo_mut(&mut self) -> &mut u32 {
        &mut self.lo
    }

    /// Callers pass decoded 5-bit fields or indices already checked against [`GPR_COUNT`].
    pub(crate) fn gpr(&self, index: u8) -> u32 {
        if index == 0 && self.hardwire_zero {
            0
        } else {
            self.gprs[usize::from(index)]
        }
    }

    pub(crate) fn set_gpr(&mut self, index: u8, value: u32) {
        if index == 0 && self.hardwire_zero {
            tracing::trace!("Discarding write of {:#010x} to r0", value);
        } else {
            self.gprs[usize::from(index)] = value;
        }
    }

    pub fn gprs(&self) -> &[u32; GPR_COUNT] {
        &self.gprs
    }

    /// A floating-point register. No implemented operation writes these.
    pub fn fpr(&self, index: usize) -> Option<u32> {
        self.fprs.get(index).copied()
    }

    /// A floating-point control register. No implemented operation writes these.
    pub fn fcr(&self, index: usize) -> Option<u32> {
        self.fcrs.get(index).copied()
    }

    pub fn fcsr(&self) -> u32 {
        self.fcsr
    }
}
