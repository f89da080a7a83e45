// SPDX-License-Identifier: MPL-2.0

//! Runs a word image to completion and prints the final registers.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use mipsi::{rom, Config, MultMode};

#[derive(Parser)]
#[command(name = "emu_cli")]
#[command(about = "Runs a MIPS I word image and dumps the final registers")]
struct Args {
    /// Path to the raw word image
    rom: PathBuf,
    /// Read words as big-endian instead of little-endian
    #[arg(long)]
    big_endian: bool,
    /// Stop after at most this many steps instead of running to the end
    #[arg(long, value_name = "N")]
    steps: Option<usize>,
    /// Make r0 read as zero and discard writes to it
    #[arg(long)]
    hardwire_zero: bool,
    /// Keep only the low 32 bits of `mult` products
    #[arg(long)]
    truncated_mult: bool,
    /// Print the final register file as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    fn endian(&self) -> rom::Endian {
        if self.big_endian {
            rom::Endian::Big
        } else {
            rom::Endian::Little
        }
    }

    fn config(&self) -> Config {
        Config {
            hardwire_zero: self.hardwire_zero,
            mult: if self.truncated_mult { MultMode::Truncated } else { MultMode::Full },
        }
    }
}

fn main() -> anyhow::Result<()> {
    mipsi::log::init();

    let args = Args::parse();
    let mut cpu = mipsi::boot(&args.rom, args.endian(), args.config())
        .with_context(|| format!("failed to load {}", args.rom.display()))?;

    let mut stdout = std::io::stdout();
    if let Some(program) = cpu.program() {
        for (i, code) in program.iter().enumerate() {
            mipsi_util::dump_hex(&mut stdout, (i * 4) as u32, code.to_be_bytes())?;
            match mipsi_cpu::Instr::decode(code) {
                Some(instr) => println!("   {}", instr),
                None => println!(),
            }
        }
    }

    let taken = match args.steps {
        Some(count) => cpu.step_program(count)?,
        None => cpu.run_program()?,
    };
    println!();
    println!("{} steps, {:?}", taken, cpu.status());

    if args.json {
        println!("{}", serde_json::to_string_pretty(cpu.reg())?);
    } else {
        print!("{}", cpu.reg());
    }

    Ok(())
}
