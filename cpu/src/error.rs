// SPDX-License-Identifier: MPL-2.0

use thiserror::Error;

#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("register index {index} is out of range (expected 0..32)")]
    RegisterOutOfRange { index: usize },
    #[error("no program is loaded")]
    NoProgram,
}
