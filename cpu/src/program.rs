// SPDX-License-Identifier: MPL-2.0

//! Instruction streams.

use std::sync::Arc;

/// An immutable, word-indexed instruction stream.
///
/// Cloning is cheap and every clone shares the same words, so several [`Cpu`](crate::Cpu)s may
/// replay one program.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Program {
    words: Arc<[i32]>,
}

impl Program {
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// The word at `index`, as a raw bit pattern.
    pub fn get(&self, index: usize) -> Option<u32> {
        self.words.get(index).map(|it| *it as u32)
    }

    pub fn words(&self) -> &[i32] {
        &self.words
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.words.iter().map(|it| *it as u32)
    }
}

impl From<Vec<i32>> for Program {
    fn from(words: Vec<i32>) -> Self {
        Self { words: words.into() }
    }
}

impl From<&[i32]> for Program {
    fn from(words: &[i32]) -> Self {
        Self { words: words.into() }
    }
}

impl From<Vec<u32>> for Program {
    fn from(words: Vec<u32>) -> Self {
        words.into_iter().map(|it| it as i32).collect()
    }
}

impl<const N: usize> From<[u32; N]> for Program {
    fn from(words: [u32; N]) -> Self {
        words.into_iter().map(|it| it as i32).collect()
    }
}

impl FromIterator<i32> for Program {
    fn from_iter<I: IntoIterator<Item = i32>>(iter: I) -> Self {
        Self { words: iter.into_iter().collect() }
    }
}
