// SPDX-License-Identifier: MPL-2.0

//! The dispatch table.

use super::Kind;

/// The table shared by every [`Cpu`](crate::Cpu).
pub static OP_TABLE: OpTable = OpTable::new();

/// A mapping from dispatch keys to operations.
///
/// Keys are at most 10 bits wide (a 6-bit funct shifted left by 4), so the table is a flat array
/// with one slot per possible key.
#[derive(Clone, Debug)]
pub struct OpTable {
    slots: [Option<Kind>; Self::LEN],
}

impl Default for OpTable {
    fn default() -> Self {
        Self::new()
    }
}

impl OpTable {
    /// The number of slots, i.e. one more than the largest possible key.
    pub const LEN: usize = 1 << 10;

    /// Creates a table populated with every operation in [`Kind::ALL`].
    pub const fn new() -> Self {
        let mut slots = [None; Self::LEN];
        let mut i = 0;
        while i < Kind::ALL.len() {
            let kind = Kind::ALL[i];
            slots[kind.key() as usize] = Some(kind);
            i += 1;
        }

        Self { slots }
    }

    /// The operation registered under `key`, if any.
    pub fn lookup(&self, key: u16) -> Option<Kind> {
        self.slots.get(usize::from(key)).copied().flatten()
    }

    /// The registered operations in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = Kind> + '_ {
        self.slots.iter().filter_map(|slot| *slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_its_own_slot() {
        assert_eq!(OP_TABLE.iter().count(), Kind::ALL.len());
        for kind in Kind::ALL {
            assert_eq!(OP_TABLE.lookup(kind.key()), Some(*kind), "{}", kind.name());
        }
    }

    #[test]
    fn matches_reference_encoding() {
        let expected = [
            ("add", 0x20 << 4),
            ("addu", 0x21 << 4),
            ("sub", 0x22 << 4),
            ("subu", 0x23 << 4),
            ("mult", 0x18 << 4),
            ("div", 0x1a << 4),
            ("divu", 0x1b << 4),
            ("jr", 0x08 << 4),
            ("mfhi", 0x10 << 4),
            ("mthi", 0x11 << 4),
            ("mflo", 0x12 << 4),
            ("mtlo", 0x13 << 4),
            ("addi", 0x08),
            ("addiu", 0x09),
            ("beq", 0x04),
            ("bne", 0x05),
            ("j", 0x02),
            ("jal", 0x03),
        ];

        assert_eq!(expected.len(), Kind::ALL.len());
        for (name, key) in expected {
            let kind = OP_TABLE.lookup(key);
            assert_eq!(kind.map(Kind::name), Some(name), "key {:#x}", key);
        }
    }

    #[test]
    fn unmapped_keys_yield_nothing() {
        // sll (the all-zero word), and, ori, lw
        for key in [0, 0x24 << 4, 0x0d, 0x23] {
            assert_eq!(OP_TABLE.lookup(key), None);
        }
        assert_eq!(OP_TABLE.lookup(u16::MAX), None);
    }
}
