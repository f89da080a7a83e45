// SPDX-License-Identifier: MPL-2.0

//! Bitfield extraction over raw instruction words.
//!
//! Every 32-bit pattern decodes to *some* value in every field; deciding whether those values
//! mean anything is left to the [`OpTable`](super::OpTable).

use super::{i, j, r};

bitfield::bitfield! {
    /// A raw, undecoded instruction word.
    ///
    /// The field getters follow the canonical MIPS layout:
    ///
    /// ```text
    /// R: op(31..26) rs(25..21) rt(20..16) rd(15..11) shamt(10..6) funct(5..0)
    /// I: op(31..26) rs(25..21) rt(20..16) imm(15..0)
    /// J: op(31..26) target(25..0)
    /// ```
    #[derive(Clone, Copy, Default, Eq, Hash, PartialEq)]
    pub struct Word(u32);
    impl Debug;
    pub u8, op, _: 31, 26;
    pub u8, rs, _: 25, 21;
    pub u8, rt, _: 20, 16;
    pub u8, rd, _: 15, 11;
    pub u8, shamt, _: 10, 6;
    pub u8, funct, _: 5, 0;
    pub u16, imm, _: 15, 0;
    pub u32, target, _: 25, 0;
}

impl From<u32> for Word {
    fn from(code: u32) -> Self {
        Self(code)
    }
}

impl From<i32> for Word {
    fn from(code: i32) -> Self {
        // Reinterprets the bit pattern.
        Self(code as u32)
    }
}

impl From<Word> for u32 {
    fn from(word: Word) -> Self {
        word.0
    }
}

/// The primary opcode shared by every funct-selected operation.
pub const OP_SPECIAL: u8 = 0;

/// The dispatch key of a funct-selected operation.
///
/// Shifting by 4 keeps these keys clear of the primary opcodes 1 to 63.
#[inline(always)]
pub const fn special(funct: u8) -> u16 {
    (funct as u16) << 4
}

/// The dispatch key of an operation selected by its primary opcode alone.
#[inline(always)]
pub const fn normal(op: u8) -> u16 {
    op as u16
}

impl Word {
    /// The raw bit pattern.
    pub fn code(self) -> u32 {
        self.0
    }

    /// Derives the dispatch key (the "internal opcode") of this word.
    pub fn key(self) -> u16 {
        let op = self.op();

        if op == OP_SPECIAL {
            special(self.funct())
        } else {
            normal(op)
        }
    }
}

/// Sign-extends the low 16 bits of an immediate to 32 bits.
#[inline(always)]
pub fn sign_extend_16(value: u16) -> u32 {
    ((value as i16) as i32) as u32
}

impl i::Instr {
    pub fn decode(word: Word) -> Self {
        Self {
            rs: word.rs(),
            rt: word.rt(),
            imm: word.imm(),
        }
    }
}

impl j::Instr {
    pub fn decode(word: Word) -> Self {
        Self {
            target: word.target(),
        }
    }
}

impl r::Instr {
    pub fn decode(word: Word) -> Self {
        Self {
            rs: word.rs(),
            rt: word.rt(),
            rd: word.rd(),
            shamt: word.shamt(),
            funct: word.funct(),
        }
    }
}
