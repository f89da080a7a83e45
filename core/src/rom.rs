// SPDX-License-Identifier: MPL-2.0

//! Word images: flat dumps of 4-byte instruction words.

use std::{fs, io, path::Path};

use mipsi_cpu::Program;
use thiserror::Error;

/// The byte order of words in an image.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Endian {
    #[default]
    Little,
    Big,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read image: {0}")]
    Io(#[from] io::Error),
    #[error("image length {len} is not a multiple of 4")]
    Misaligned { len: usize },
}

/// Splits `bytes` into words.
pub fn decode(bytes: &[u8], endian: Endian) -> Result<Program, Error> {
    if bytes.len() % 4 != 0 {
        return Err(Error::Misaligned { len: bytes.len() });
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| {
            let bytes = [chunk[0], chunk[1], chunk[2], chunk[3]];
            match endian {
                Endian::Little => i32::from_le_bytes(bytes),
                Endian::Big => i32::from_be_bytes(bytes),
            }
        })
        .collect())
}

/// Reads and decodes the image at `path`.
pub fn read(path: impl AsRef<Path>, endian: Endian) -> Result<Program, Error> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    tracing::debug!("Read {} bytes from {}", bytes.len(), path.display());

    decode(&bytes, endian)
}
