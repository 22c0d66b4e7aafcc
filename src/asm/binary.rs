//! Raw program files.
//!
//! A program file is nothing but instruction words back to back: no header,
//! no magic number. The word count is the file size divided by 4.

use crate::cpu::program::{Endian, LoadError, Program};
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;

/// Load a program file from disk.
pub fn load_program<P: AsRef<Path>>(path: P, endian: Endian) -> Result<Program, LoadError> {
    let path = path.as_ref();
    let display = path.display().to_string();

    let mut file = std::fs::File::open(path)
        .map_err(|source| LoadError::Open { path: display.clone(), source })?;

    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|source| LoadError::Read { path: display.clone(), source })?;

    let program = Program::from_bytes(&bytes, endian)?;
    log::info!("loaded {} instructions from {}", program.len(), display);
    Ok(program)
}

/// Save instruction words to disk.
pub fn save_program<P: AsRef<Path>>(path: P, words: &[u32], endian: Endian) -> Result<(), SaveError> {
    let path = path.as_ref();
    let write_err = |source| SaveError::Write { path: path.display().to_string(), source };

    let mut file = std::fs::File::create(path).map_err(write_err)?;
    file.write_all(&endian.write_words(words)).map_err(write_err)?;
    Ok(())
}

/// Errors that can occur while saving a program file.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("could not write '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("mips-emu-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_save_then_load() {
        let path = temp_path("roundtrip.bin");
        let words = [0x2008_0005, 0x0109_5020, 0];

        save_program(&path, &words, Endian::Big).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 12);

        let program = load_program(&path, Endian::Big).unwrap();
        assert_eq!(program.words(), &words);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_file() {
        let err = load_program(temp_path("does-not-exist.bin"), Endian::Little).unwrap_err();
        assert!(matches!(err, LoadError::Open { .. }));
        assert!(err.to_string().contains("could not be successfully opened"));
    }

    #[test]
    fn test_truncated_file() {
        let path = temp_path("truncated.bin");
        std::fs::write(&path, [0u8; 6]).unwrap();

        let err = load_program(&path, Endian::Little).unwrap_err();
        assert!(matches!(err, LoadError::Misaligned { len: 6 }));

        std::fs::remove_file(&path).unwrap();
    }
}
