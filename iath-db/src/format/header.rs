//! Fixed 64-byte database file header.
//!
//! ```text
//! magic:            "ILMA"  [0..4]
//! version:          u32 LE  [4..8]
//! domain_code:      u8      [8]
//! compression_type: u8      [9]      1 = zstd
//! checksum:         [u8;32] [10..42] reserved, always zero, never validated
//! index_offset:     u64 LE  [42..50]
//! data_offset:      u64 LE  [50..58]
//! padding:          [u8;6]  [58..64]
//! ```

use crate::error::{Result, TileDbError};
use serde::Serialize;

/// Magic bytes at the start of every database file.
pub const MAGIC: &[u8; 4] = b"ILMA";

/// Format version written by this crate.
pub const FORMAT_VERSION: u32 = 1;

/// Header length in bytes.
pub const HEADER_LEN: usize = 64;

/// Payload compression scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    Zstd,
}

impl Compression {
    pub fn as_u8(self) -> u8 {
        match self {
            Compression::Zstd => 1,
        }
    }

    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            1 => Some(Compression::Zstd),
            _ => None,
        }
    }
}

/// Parsed header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DatabaseHeader {
    pub version: u32,
    pub domain_code: u8,
    pub compression: Compression,
    pub index_offset: u64,
    pub data_offset: u64,
}

/// Parse the header of a database image without touching the index or tiles.
pub fn read_header(bytes: &[u8]) -> Result<DatabaseHeader> {
    DatabaseHeader::read(bytes)
}

impl DatabaseHeader {
    /// Header for a freshly written file whose index is `index_len` bytes.
    pub fn new(domain_code: u8, index_len: usize) -> Self {
        let index_offset = HEADER_LEN as u64;
        Self {
            version: FORMAT_VERSION,
            domain_code,
            compression: Compression::Zstd,
            index_offset,
            data_offset: index_offset + index_len as u64,
        }
    }

    /// Serialize to 64 bytes. The checksum slot is zero-filled.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..4].copy_from_slice(MAGIC);
        buf[4..8].copy_from_slice(&self.version.to_le_bytes());
        buf[8] = self.domain_code;
        buf[9] = self.compression.as_u8();
        // [10..42] checksum: reserved
        buf[42..50].copy_from_slice(&self.index_offset.to_le_bytes());
        buf[50..58].copy_from_slice(&self.data_offset.to_le_bytes());
        // [58..64] padding
        buf
    }

    /// Parse and validate the header at the start of `data`.
    ///
    /// Checks magic, version, compression type, and that the index and data
    /// offsets lie within `data`. Any failure is `CorruptFile`.
    pub fn read(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(TileDbError::CorruptFile(format!(
                "header too short: {} bytes (need {})",
                data.len(),
                HEADER_LEN
            )));
        }

        if &data[0..4] != MAGIC {
            return Err(TileDbError::CorruptFile(format!(
                "invalid magic: {:02x?}",
                &data[0..4]
            )));
        }

        let version = u32::from_le_bytes(fixed(&data[4..8]));
        if version == 0 || version > FORMAT_VERSION {
            return Err(TileDbError::CorruptFile(format!(
                "unsupported format version: {} (max {})",
                version, FORMAT_VERSION
            )));
        }

        let domain_code = data[8];
        let compression = Compression::from_u8(data[9]).ok_or_else(|| {
            TileDbError::CorruptFile(format!("unknown compression type: {}", data[9]))
        })?;

        let index_offset = u64::from_le_bytes(fixed(&data[42..50]));
        let data_offset = u64::from_le_bytes(fixed(&data[50..58]));
        let file_len = data.len() as u64;

        if index_offset < HEADER_LEN as u64 || index_offset > data_offset || data_offset > file_len
        {
            return Err(TileDbError::CorruptFile(format!(
                "section offsets out of range: index_offset={}, data_offset={}, file_len={}",
                index_offset, data_offset, file_len
            )));
        }

        Ok(Self {
            version,
            domain_code,
            compression,
            index_offset,
            data_offset,
        })
    }
}

fn fixed<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let header = DatabaseHeader::new(2, 100);
        let bytes = header.to_bytes();

        assert_eq!(&bytes[0..4], b"ILMA");
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 1);
        assert_eq!(bytes[8], 2);
        assert_eq!(bytes[9], 1);
        assert!(bytes[10..42].iter().all(|&b| b == 0));
        assert_eq!(u64::from_le_bytes(bytes[42..50].try_into().unwrap()), 64);
        assert_eq!(u64::from_le_bytes(bytes[50..58].try_into().unwrap()), 164);
        assert!(bytes[58..64].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_header_read_back() {
        let header = DatabaseHeader::new(7, 10);
        let mut file = header.to_bytes().to_vec();
        file.extend_from_slice(&[b' '; 10]);

        assert_eq!(DatabaseHeader::read(&file).unwrap(), header);
    }

    #[test]
    fn test_bad_magic() {
        let mut file = DatabaseHeader::new(1, 0).to_bytes();
        file[0..4].copy_from_slice(b"NOPE");
        let err = DatabaseHeader::read(&file).unwrap_err();
        assert!(matches!(err, TileDbError::CorruptFile(_)));
    }

    #[test]
    fn test_short_header() {
        let err = DatabaseHeader::read(b"ILMA").unwrap_err();
        assert!(matches!(err, TileDbError::CorruptFile(_)));
    }

    #[test]
    fn test_offsets_past_eof() {
        // data_offset claims a 100-byte index but the file ends at the header.
        let file = DatabaseHeader::new(1, 100).to_bytes();
        let err = DatabaseHeader::read(&file).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_unknown_compression() {
        let mut file = DatabaseHeader::new(1, 0).to_bytes();
        file[9] = 9;
        let err = DatabaseHeader::read(&file).unwrap_err();
        assert!(err.to_string().contains("compression"));
    }
}
