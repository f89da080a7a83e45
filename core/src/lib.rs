// SPDX-License-Identifier: MPL-2.0

//! Driver-side glue around [`mipsi_cpu`]: loading word images and initializing logging.

pub mod log;
pub mod rom;

pub use mipsi_cpu::{Config, Cpu, MultMode, Program, Status};

/// Creates a [`Cpu`] configured with `config` and bound to the image at `path`.
pub fn boot(
    path: impl AsRef<std::path::Path>,
    endian: rom::Endian,
    config: Config,
) -> Result<Cpu, rom::Error> {
    let program = rom::read(path, endian)?;
    let mut cpu = Cpu::new(config);
    cpu.load_program(program);

    Ok(cpu)
}
