// SPDX-License-Identifier: MPL-2.0

//! An interpreter for a subset of the MIPS I instruction set.
//!
//! A [`Cpu`] fetches 32-bit words from a shared [`Program`], derives a dispatch key from each,
//! looks the key up in the [`OpTable`](instr::OpTable), and executes the selected operation
//! against its [register file](reg::File). There is no data memory; the machine consists of
//! general-purpose registers, *HI*/*LO*, and a *PC*/*nPC* pair.

pub mod config;
pub mod cpu;
pub mod error;
pub mod instr;
pub mod program;
pub mod reg;

pub use config::{Config, MultMode};
pub use cpu::{Cpu, Status, Trace};
pub use error::Error;
pub use instr::Instr;
pub use program::Program;
