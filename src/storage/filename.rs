//! Filename/blocksize decoding.
//!
//! Store filenames encode their block size as a power-of-two exponent:
//! `<name>.<k>.csv` means every block is `2^k` bytes.

use std::path::Path;

use crate::error::{BadFilenameKind, BlockCsvError, Result};
use crate::storage::block::BlockSize;

/// The decoded components of a store filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameParts {
    /// Block size derived from the exponent component.
    pub block_size: BlockSize,
    /// The `<name>` component.
    pub name: String,
    /// The raw `<k>` component, kept as text (e.g. to re-derive a new filename).
    pub exponent_str: String,
    /// The extension component, always `csv` once validated.
    pub extension: String,
}

/// Decodes `path`'s filename into its block size, name, and extension.
///
/// # Errors
///
/// Returns [`BlockCsvError::BadFilename`] if the path has no filename, the
/// extension is not (case-insensitively) `csv`, the filename does not split
/// into exactly three dot-separated parts, or the block-size component is
/// not a base-10 non-negative integer.
pub fn decode(path: &Path) -> Result<FilenameParts> {
    let path_str = path.display().to_string();
    let filename = path
        .file_name()
        .and_then(|f| f.to_str())
        .ok_or_else(|| BlockCsvError::BadFilename {
            path: path_str.clone(),
            kind: BadFilenameKind::NoFilename,
        })?;

    let parts: Vec<&str> = filename.split('.').collect();
    if parts.len() != 3 {
        return Err(BlockCsvError::BadFilename {
            path: path_str,
            kind: BadFilenameKind::WrongPartCount,
        });
    }

    let (name, exponent_str, extension) = (parts[0], parts[1], parts[2]);

    if !extension.eq_ignore_ascii_case("csv") {
        return Err(BlockCsvError::BadFilename {
            path: path_str,
            kind: BadFilenameKind::WrongExtension,
        });
    }

    let exponent: u32 = exponent_str
        .parse()
        .map_err(|_| BlockCsvError::BadFilename {
            path: path_str.clone(),
            kind: BadFilenameKind::NotAnInteger,
        })?;

    Ok(FilenameParts {
        block_size: BlockSize::from_exponent(exponent),
        name: name.to_string(),
        exponent_str: exponent_str.to_string(),
        extension: extension.to_string(),
    })
}
