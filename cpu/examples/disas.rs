// SPDX-License-Identifier: MPL-2.0

//! Disassembles a flat little-endian dump of instruction words.

use mipsi_cpu::Instr;

fn main() {
    let rom_filepath = std::env::args()
        .nth(1)
        .expect("expected ROM filepath");
    let rom = std::fs::read(rom_filepath).expect("failed to read ROM");

    let mut stdout = std::io::stdout();
    rom.chunks_exact(4)
        .enumerate()
        .for_each(|(i, bytes)| {
            let bytes = [bytes[0], bytes[1], bytes[2], bytes[3]];
            let code = u32::from_le_bytes(bytes);
            mipsi_util::dump_hex(&mut stdout, (i * 4) as u32, code.to_be_bytes())
                .expect("failed to write to stdout");
            if let Some(instr) = Instr::decode(code) {
                println!("   {}", instr);
            } else {
                println!();
            }
        });
}
