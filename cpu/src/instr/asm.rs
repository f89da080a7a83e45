// SPDX-License-Identifier: MPL-2.0

//! Assembly-language rendering of decoded instructions.

use std::fmt;

/// A disassembled instruction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Asm {
    pub op_name: String,
    pub operands: Vec<Operand>,
}

impl fmt::Display for Asm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.operands.is_empty() {
            return f.write_str(&self.op_name);
        }

        write!(
            f,
            "{} {}",
            self.op_name,
            self
                .operands
                .iter()
                .map(|operand| operand.to_string())
                .collect::<Vec<String>>()
                .join(", ")
        )
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Operand {
    Reg(u8),
    SInt(i32),
    UInt(u32),
}

macro_rules! format_int {
    ($value:expr, $abs_value:expr) => {
        if $abs_value < 0x10 {
            format!("{}", $value)
        } else if $value < 0 {
            format!("-{:#x}", $abs_value)
        } else {
            format!("{:#x}", $value)
        }
    };
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Reg(it) => {
                write!(f, "r{}", it)
            }
            Self::SInt(it) => {
                write!(f, "{}", format_int!(i64::from(it), i64::from(it).abs()))
            }
            Self::UInt(it) => {
                write!(f, "{}", format_int!(i64::from(it), i64::from(it)))
            }
        }
    }
}
