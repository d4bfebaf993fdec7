//! `.iath` wire format: 64-byte file header, JSON index, and independently
//! zstd-compressed tile blobs.
//!
//! ```text
//! ┌──────────────┬──────────────────────────┬──────────────────────────────┐
//! │ Header (64B) │ Index [index_off, data_off) │ Data [data_off, EOF)      │
//! └──────────────┴──────────────────────────┴──────────────────────────────┘
//! ```

pub mod batch;
pub mod header;
pub(crate) mod reader;
pub mod tile_codec;

pub use batch::{
    decode_batch, encode_batch, encode_batch_detailed, read_index, write_database, DecodedBatch,
    EncodedBatch, IndexEntry, SkippedTile,
};
pub use header::{read_header, Compression, DatabaseHeader, FORMAT_VERSION, HEADER_LEN, MAGIC};
pub use tile_codec::{decode_tile, encode_tile, COMPRESSION_LEVEL};
