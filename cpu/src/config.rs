// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};

/// Behavioural knobs of a [`Cpu`](crate::Cpu).
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Config {
    /// Whether `r0` reads as 0 and ignores writes.
    ///
    /// Off by default, in which case `r0` is an ordinary register.
    pub hardwire_zero: bool,
    /// How `mult` fills *HI* and *LO*.
    pub mult: MultMode,
}

/// The product computed by `mult`.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MultMode {
    /// The full 64-bit signed product, split into *HI*:*LO*.
    #[default]
    Full,
    /// The product truncated to 32 bits and then sign-extended into *HI*.
    Truncated,
}
