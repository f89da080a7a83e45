// SPDX-License-Identifier: MPL-2.0

use std::io;

/// Writes `bytes` as hexadecimal and printable ASCII, prefixed with `addr`.
///
/// No newline is written, so callers may append a disassembly.
pub fn dump_hex(w: &mut impl io::Write, addr: u32, bytes: [u8; 4]) -> io::Result<()> {
    write!(
        w,
        "{:08x}   {}   {}",
        addr,
        bytes
            .iter()
            .map(|byte| format!("{:02x}", byte))
            .collect::<Vec<String>>()
            .join(" "),
        bytes
            .iter()
            .map(|byte| {
                if byte.is_ascii_graphic() {
                    char::from(*byte)
                } else {
                    '.'
                }
            })
            .collect::<String>(),
    )
}
