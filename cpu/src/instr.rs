// SPDX-License-Identifier: MPL-2.0

//! Instruction shapes and the operations they encode.

pub mod asm;
pub mod decode;
pub mod table;

use std::fmt;

pub use asm::Asm;
pub use decode::Word;
pub use table::{OpTable, OP_TABLE};

use crate::{reg, Config, MultMode};
use decode::{normal, special};

pub mod i {
    use super::Format;

    pub const FORMAT: Format = Format::I;

    /// An I-type instruction, where 'I' stands for 'immediate'.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct Instr {
        /// The *rs* operand.
        pub rs: u8,
        /// The *rt* operand.
        pub rt: u8,
        /// The *imm* operand, as encoded.
        pub imm: u16,
    }
}

pub mod j {
    use super::Format;

    pub const FORMAT: Format = Format::J;

    /// A J-type instruction, where 'J' stands for 'jump'.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct Instr {
        /// The 26-bit word index of the jump target.
        pub target: u32,
    }

    impl Instr {
        /// The target restored to a byte address.
        pub fn address(&self) -> u32 {
            self.target << 2
        }
    }
}

pub mod r {
    use super::Format;

    pub const FORMAT: Format = Format::R;

    /// An R-type instruction, where 'R' stands for 'register'.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct Instr {
        /// The *rs* operand.
        pub rs: u8,
        /// The *rt* operand.
        pub rt: u8,
        /// The *rd* operand.
        ///
        /// This is commonly used as a destination register.
        pub rd: u8,
        /// The *shamt* operand, which stands for 'shift amount'.
        pub shamt: u8,
        /// The *funct* operand.
        pub funct: u8,
    }
}

/// The encoding shape of an instruction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Format {
    R,
    I,
    J,
}

/// A word paired with the operation it selects.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Instr {
    pub kind: Kind,
    pub word: Word,
}

impl Instr {
    /// Decodes `word`, returning `None` if its dispatch key is unmapped.
    pub fn decode(word: impl Into<Word>) -> Option<Self> {
        let word = word.into();

        OP_TABLE.lookup(word.key()).map(|kind| Self { kind, word })
    }

    pub fn asm(&self) -> Asm {
        self.kind.asm(self.word)
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.asm())
    }
}

macro_rules! parse_operand {
    ($src:expr, %($field:tt)) => {
        asm::Operand::Reg($src.$field)
    };
    ($src:expr, *()) => {
        asm::Operand::UInt($src.address())
    };
    ($src:expr, #(s)) => {
        asm::Operand::SInt(decode::sign_extend_16($src.imm) as i32)
    };
}

macro_rules! def_op_kind {
    (
        $(
            {
                name: $variant_name:tt,
                key: $key:expr,
                type: $ty:tt,
                asm: [
                    $display_name:literal
                    $(
                        $kind:tt($($arg:tt)?)
                    ),* $(,)?
                ],
                fn: $fn:expr $(,)?
            } $(,)?
        ),*
    ) => {
        /// An implemented operation.
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        pub enum Kind {
            $(
                $variant_name,
            )*
        }

        impl Kind {
            /// Every implemented operation.
            pub const ALL: &'static [Self] = &[
                $(
                    Self::$variant_name,
                )*
            ];

            /// The dispatch key under which this operation is registered.
            pub const fn key(self) -> u16 {
                match self {
                    $(
                        Self::$variant_name => $key,
                    )*
                }
            }

            /// The assembler mnemonic.
            pub const fn name(self) -> &'static str {
                match self {
                    $(
                        Self::$variant_name => $display_name,
                    )*
                }
            }

            pub const fn format(self) -> Format {
                match self {
                    $(
                        Self::$variant_name => $ty::FORMAT,
                    )*
                }
            }

            pub fn asm(self, word: Word) -> Asm {
                match self {
                    $(
                        #[allow(unused_variables)]
                        Self::$variant_name => {
                            let inner = $ty::Instr::decode(word);

                            Asm {
                                op_name: $display_name.to_string(),
                                operands: vec![
                                    $(
                                        parse_operand!(inner, $kind($($arg)?))
                                    ),*
                                ],
                            }
                        }
                    )*
                }
            }

            /// Executes this operation against `reg`.
            ///
            /// Returns the new *nPC* if the operation redirects control flow, in which case the
            /// caller is expected to move *nPC* into *PC* and then install the returned value.
            /// `None` requests the default one-word advance.
            pub fn execute(self, word: Word, reg: &mut reg::File, config: &Config) -> Option<u32> {
                let mut target = None;

                match self {
                    $(
                        #[allow(dead_code)]
                        Self::$variant_name => {
                            struct Context<'a> {
                                op: $ty::Instr,
                                reg: &'a mut reg::File,
                                config: &'a Config,
                                target: &'a mut Option<u32>,
                            }

                            impl Context<'_> {
                                fn calc_branch_target(&self, imm: u16) -> u32 {
                                    let base = self.reg.npc().wrapping_add(4);
                                    let offset = decode::sign_extend_16(imm) << 2;
                                    tracing::trace!(
                                        "Calc. branch target (base={:#010x}, offset={:#010x})",
                                        base,
                                        offset,
                                    );

                                    base.wrapping_add(offset)
                                }

                                #[inline(always)]
                                fn calc_jump_target(&self, op: j::Instr) -> u32 {
                                    // The region is merged before the +4 fetch bias, so a target of
                                    // 0x3ff_ffff carries into the next 256 MiB region.
                                    ((self.reg.pc() & 0xf000_0000) | op.address()).wrapping_add(4)
                                }

                                #[inline(always)]
                                fn calc_ret_addr(&self) -> u32 {
                                    self.reg.pc().wrapping_add(4)
                                }
                            }

                            $fn(&mut Context {
                                op: $ty::Instr::decode(word),
                                reg: &mut *reg,
                                config,
                                target: &mut target,
                            });
                        }
                    )*
                }

                target
            }
        }
    };
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[inline(always)]
fn log_enter_function(target_addr: u32, ret_addr: u32) {
    tracing::debug!(
        "Entering function `sub_{:08X}` (ra={:#010x})",
        target_addr.wrapping_sub(4),
        ret_addr,
    );
}

def_op_kind!(
    {
        name: Add,
        key: special(0x20),
        type: r,
        asm: ["add" %(rd), %(rs), %(rt)],
        fn: |ctx: &mut Context| {
            // Overflow wraps exactly as `addu` does; no trap is modelled.
            let value = ctx.reg.gpr(ctx.op.rs).wrapping_add(ctx.reg.gpr(ctx.op.rt));
            ctx.reg.set_gpr(ctx.op.rd, value);
        },
    },
    {
        name: Addu,
        key: special(0x21),
        type: r,
        asm: ["addu" %(rd), %(rs), %(rt)],
        fn: |ctx: &mut Context| {
            let value = ctx.reg.gpr(ctx.op.rs).wrapping_add(ctx.reg.gpr(ctx.op.rt));
            ctx.reg.set_gpr(ctx.op.rd, value);
        },
    },
    {
        name: Sub,
        key: special(0x22),
        type: r,
        asm: ["sub" %(rd), %(rs), %(rt)],
        fn: |ctx: &mut Context| {
            // See `Add`.
            let value = ctx.reg.gpr(ctx.op.rs).wrapping_sub(ctx.reg.gpr(ctx.op.rt));
            ctx.reg.set_gpr(ctx.op.rd, value);
        },
    },
    {
        name: Subu,
        key: special(0x23),
        type: r,
        asm: ["subu" %(rd), %(rs), %(rt)],
        fn: |ctx: &mut Context| {
            let value = ctx.reg.gpr(ctx.op.rs).wrapping_sub(ctx.reg.gpr(ctx.op.rt));
            ctx.reg.set_gpr(ctx.op.rd, value);
        },
    },
    {
        name: Mult,
        key: special(0x18),
        type: r,
        asm: ["mult" %(rs), %(rt)],
        fn: |ctx: &mut Context| {
            let rs = ctx.reg.gpr(ctx.op.rs) as i32;
            let rt = ctx.reg.gpr(ctx.op.rt) as i32;
            let value: i64 = match ctx.config.mult {
                MultMode::Full => i64::from(rs) * i64::from(rt),
                MultMode::Truncated => i64::from(rs.wrapping_mul(rt)),
            };
            let value = value as u64;

            *ctx.reg.lo_mut() = value as u32;
            *ctx.reg.hi_mut() = (value >> 32) as u32;
        },
    },
    {
        name: Div,
        key: special(0x1a),
        type: r,
        asm: ["div" %(rs), %(rt)],
        fn: |ctx: &mut Context| {
            let rs = ctx.reg.gpr(ctx.op.rs) as i32;
            let rt = ctx.reg.gpr(ctx.op.rt) as i32;
            let (lo, hi) = if rt == 0 {
                // The R3000 leaves these values behind rather than trapping.
                (if rs < 0 { 1 } else { -1 }, rs)
            } else {
                // `i32::MIN / -1` wraps to `i32::MIN` with a remainder of 0.
                (rs.wrapping_div(rt), rs.wrapping_rem(rt))
            };

            *ctx.reg.lo_mut() = lo as u32;
            *ctx.reg.hi_mut() = hi as u32;
        },
    },
    {
        name: Divu,
        key: special(0x1b),
        type: r,
        asm: ["divu" %(rs), %(rt)],
        fn: |ctx: &mut Context| {
            let rs = ctx.reg.gpr(ctx.op.rs);
            let rt = ctx.reg.gpr(ctx.op.rt);

            // See `Div`.
            *ctx.reg.lo_mut() = rs.checked_div(rt).unwrap_or(u32::MAX);
            *ctx.reg.hi_mut() = rs.checked_rem(rt).unwrap_or(rs);
        },
    },
    {
        name: Jr,
        key: special(0x08),
        type: r,
        asm: ["jr" %(rs)],
        fn: |ctx: &mut Context| {
            if ctx.op.rs == 31 {
                tracing::debug!("Leaving function");
            }

            *ctx.target = Some(ctx.reg.gpr(ctx.op.rs).wrapping_add(4));
        },
    },
    {
        name: Mfhi,
        key: special(0x10),
        type: r,
        asm: ["mfhi" %(rd)],
        fn: |ctx: &mut Context| {
            let value = ctx.reg.hi();
            ctx.reg.set_gpr(ctx.op.rd, value);
        },
    },
    {
        name: Mthi,
        key: special(0x11),
        type: r,
        asm: ["mthi" %(rs)],
        fn: |ctx: &mut Context| {
            *ctx.reg.hi_mut() = ctx.reg.gpr(ctx.op.rs);
        },
    },
    {
        name: Mflo,
        key: special(0x12),
        type: r,
        asm: ["mflo" %(rd)],
        fn: |ctx: &mut Context| {
            let value = ctx.reg.lo();
            ctx.reg.set_gpr(ctx.op.rd, value);
        },
    },
    {
        name: Mtlo,
        key: special(0x13),
        type: r,
        asm: ["mtlo" %(rs)],
        fn: |ctx: &mut Context| {
            *ctx.reg.lo_mut() = ctx.reg.gpr(ctx.op.rs);
        },
    },
    {
        name: Addi,
        key: normal(0x08),
        type: i,
        asm: ["addi" %(rt), %(rs), #(s)],
        fn: |ctx: &mut Context| {
            // See `Add`.
            let value = ctx.reg.gpr(ctx.op.rs).wrapping_add(decode::sign_extend_16(ctx.op.imm));
            ctx.reg.set_gpr(ctx.op.rt, value);
        },
    },
    {
        name: Addiu,
        key: normal(0x09),
        type: i,
        asm: ["addiu" %(rt), %(rs), #(s)],
        fn: |ctx: &mut Context| {
            let value = ctx.reg.gpr(ctx.op.rs).wrapping_add(decode::sign_extend_16(ctx.op.imm));
            ctx.reg.set_gpr(ctx.op.rt, value);
        },
    },
    {
        name: Beq,
        key: normal(0x04),
        type: i,
        asm: ["beq" %(rs), %(rt), #(s)],
        fn: |ctx: &mut Context| {
            if ctx.reg.gpr(ctx.op.rs) == ctx.reg.gpr(ctx.op.rt) {
                *ctx.target = Some(ctx.calc_branch_target(ctx.op.imm));
            }
        },
    },
    {
        name: Bne,
        key: normal(0x05),
        type: i,
        asm: ["bne" %(rs), %(rt), #(s)],
        fn: |ctx: &mut Context| {
            if ctx.reg.gpr(ctx.op.rs) != ctx.reg.gpr(ctx.op.rt) {
                *ctx.target = Some(ctx.calc_branch_target(ctx.op.imm));
            }
        },
    },
    {
        name: J,
        key: normal(0x02),
        type: j,
        asm: ["j" *()],
        fn: |ctx: &mut Context| {
            *ctx.target = Some(ctx.calc_jump_target(ctx.op));
        },
    },
    {
        name: Jal,
        key: normal(0x03),
        type: j,
        asm: ["jal" *()],
        fn: |ctx: &mut Context| {
            // The link is taken from the pre-jump PC.
            let ret_addr = ctx.calc_ret_addr();
            let target_addr = ctx.calc_jump_target(ctx.op);

            ctx.reg.set_gpr(31, ret_addr);
            *ctx.target = Some(target_addr);
            log_enter_function(target_addr, ret_addr);
        },
    },
);
