//! Instruction storage.
//!
//! A program is a flat sequence of 32-bit instruction words with no header.
//! It is loaded once when a machine is created and never written to again.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Size of one instruction word in bytes.
pub const INSTR_SIZE: u32 = 4;

/// Byte order of the words in a program image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endian {
    #[default]
    Little,
    Big,
}

impl Endian {
    /// Decode `bytes` (whose length must be a multiple of 4) into words.
    fn read_words(self, bytes: &[u8], words: &mut [u32]) {
        match self {
            Endian::Little => LittleEndian::read_u32_into(bytes, words),
            Endian::Big => BigEndian::read_u32_into(bytes, words),
        }
    }

    /// Encode `words` into bytes.
    pub fn write_words(self, words: &[u32]) -> Vec<u8> {
        let mut bytes = vec![0u8; words.len() * INSTR_SIZE as usize];
        match self {
            Endian::Little => LittleEndian::write_u32_into(words, &mut bytes),
            Endian::Big => BigEndian::write_u32_into(words, &mut bytes),
        }
        bytes
    }
}

/// An immutable, bounds-checked instruction stream.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    words: Box<[u32]>,
}

impl Program {
    /// Build a program from already-decoded words.
    pub fn new(words: impl Into<Box<[u32]>>) -> Self {
        Self { words: words.into() }
    }

    /// Parse a raw program image.
    ///
    /// The image must hold a whole number of words; anything else means the
    /// file was truncated or is not a program.
    pub fn from_bytes(bytes: &[u8], endian: Endian) -> Result<Self, LoadError> {
        if bytes.len() % INSTR_SIZE as usize != 0 {
            return Err(LoadError::Misaligned { len: bytes.len() });
        }
        let mut words = vec![0u32; bytes.len() / INSTR_SIZE as usize];
        endian.read_words(bytes, &mut words);
        Ok(Self::new(words))
    }

    /// Fetch the word at byte offset `pc`, or `None` past the end.
    #[inline]
    pub fn fetch(&self, pc: u32) -> Option<u32> {
        self.words.get((pc / INSTR_SIZE) as usize).copied()
    }

    /// Number of instruction words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// The instruction words.
    pub fn words(&self) -> &[u32] {
        &self.words
    }
}

impl std::fmt::Debug for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Program")
            .field("words", &self.words.len())
            .finish()
    }
}

/// Errors that can occur while loading a program image.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("The file '{path}' could not be successfully opened.")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("The file '{path}' could not be read from properly")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("program image is {len} bytes, not a multiple of 4")]
    Misaligned { len: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_little_endian() {
        let bytes = [0x05, 0x00, 0x08, 0x20, 0x00, 0x00, 0x00, 0x00];
        let program = Program::from_bytes(&bytes, Endian::Little).unwrap();

        assert_eq!(program.len(), 2);
        assert_eq!(program.words(), &[0x2008_0005, 0]);
    }

    #[test]
    fn test_from_bytes_big_endian() {
        let bytes = [0x20, 0x08, 0x00, 0x05];
        let program = Program::from_bytes(&bytes, Endian::Big).unwrap();

        assert_eq!(program.words(), &[0x2008_0005]);
    }

    #[test]
    fn test_misaligned_image_rejected() {
        let err = Program::from_bytes(&[1, 2, 3, 4, 5], Endian::Little).unwrap_err();
        assert!(matches!(err, LoadError::Misaligned { len: 5 }));
    }

    #[test]
    fn test_empty_image() {
        let program = Program::from_bytes(&[], Endian::Little).unwrap();
        assert!(program.is_empty());
        assert_eq!(program.fetch(0), None);
    }

    #[test]
    fn test_fetch_bounds() {
        let program = Program::new(vec![1, 2, 3]);

        assert_eq!(program.fetch(0), Some(1));
        assert_eq!(program.fetch(8), Some(3));
        assert_eq!(program.fetch(12), None);
        assert_eq!(program.fetch(u32::MAX), None);
    }

    #[test]
    fn test_write_words_matches_read() {
        let bytes = Endian::Big.write_words(&[0x0123_4567]);
        assert_eq!(bytes, vec![0x01, 0x23, 0x45, 0x67]);

        let bytes = Endian::Little.write_words(&[0x0123_4567]);
        assert_eq!(bytes, vec![0x67, 0x45, 0x23, 0x01]);
    }
}
