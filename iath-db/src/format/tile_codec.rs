//! Single-tile blob codec.
//!
//! A tile blob is four length-prefixed sections, compressed together with
//! zstd:
//!
//! ```text
//! [u32 len][metadata] [u32 len][coordinates] [u32 len][content] [u32 len][verification]
//!
//! metadata:      id\0 topic\0 created_at[27]         (ASCII, NUL-padded)
//! coordinates:   6 × f32 LE                          (domain xyz, meta xyz)
//! content:       [u32 len][thinking] [u32 len][response]
//! verification:  status:u8 certainty:u8 reviewer_count:u32 [reviewer_id[36]; count]
//! ```
//!
//! References, reasoning path, reviewer details, source, and history are not
//! persisted; decode leaves them empty.

use super::reader::{utf8, ByteReader};
use crate::error::{Result, TileDbError};
use crate::tile::{
    Point3, Tile, TileContent, TileCoordinates, TileMetadata, Verification, VerificationStatus,
};
use chrono::{DateTime, NaiveDateTime, Utc};

/// zstd level used for tile blobs.
pub const COMPRESSION_LEVEL: i32 = 19;

/// Width of the `created_at` slot.
const CREATED_AT_LEN: usize = 27;

/// Width of one reviewer-id slot.
const REVIEWER_ID_LEN: usize = 36;

const COORDINATES_LEN: usize = 6 * 4;

/// Serialize and compress a tile.
///
/// Fails with `Encode` if a coordinate is non-finite, if `id` or `topic`
/// contain NUL, if `created_at` falls outside years 0000-9999, or if a
/// section exceeds the `u32` length prefix.
pub fn encode_tile(tile: &Tile) -> Result<Vec<u8>> {
    let sections = [
        encode_metadata(&tile.metadata)?,
        encode_coordinates(tile.id(), &tile.coordinates)?,
        encode_content(&tile.content)?,
        encode_verification(&tile.verification)?,
    ];

    let total: usize = sections.iter().map(|s| s.len() + 4).sum();
    let mut uncompressed = Vec::with_capacity(total);
    for section in &sections {
        put_prefixed(&mut uncompressed, section)?;
    }

    zstd::encode_all(&uncompressed[..], COMPRESSION_LEVEL)
        .map_err(|e| TileDbError::Encode(format!("zstd compression failed: {e}")))
}

/// Decompress and parse a tile blob.
///
/// Any truncation, invalid UTF-8, unknown status code, or compression-stream
/// error is `CorruptTile`.
pub fn decode_tile(bytes: &[u8]) -> Result<Tile> {
    let uncompressed = zstd::decode_all(bytes)
        .map_err(|e| TileDbError::corrupt_tile(format!("zstd decompression failed: {e}")))?;

    let mut r = ByteReader::new(&uncompressed);
    let metadata = decode_metadata(r.read_prefixed()?)?;
    let coordinates = decode_coordinates(r.read_prefixed()?)?;
    let content = decode_content(r.read_prefixed()?)?;
    let verification = decode_verification(r.read_prefixed()?)?;

    Ok(Tile {
        metadata,
        content,
        coordinates,
        verification,
        source: None,
        history: Vec::new(),
    })
}

fn put_prefixed(buf: &mut Vec<u8>, bytes: &[u8]) -> Result<()> {
    let len = u32::try_from(bytes.len()).map_err(|_| {
        TileDbError::Encode(format!(
            "section of {} bytes exceeds u32 length prefix",
            bytes.len()
        ))
    })?;
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(bytes);
    Ok(())
}

fn put_cstr(buf: &mut Vec<u8>, field: &str, value: &str) -> Result<()> {
    if value.as_bytes().contains(&0) {
        return Err(TileDbError::Encode(format!(
            "{field} contains a NUL byte and cannot be NUL-terminated"
        )));
    }
    buf.extend_from_slice(value.as_bytes());
    buf.push(0);
    Ok(())
}

/// Copy `bytes` into a fixed-width slot, truncating or NUL-padding.
fn put_fixed(buf: &mut Vec<u8>, bytes: &[u8], width: usize) {
    let n = bytes.len().min(width);
    buf.extend_from_slice(&bytes[..n]);
    buf.resize(buf.len() + (width - n), 0);
}

// ============================================================================
// Metadata
// ============================================================================

fn encode_metadata(metadata: &TileMetadata) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(metadata.id.len() + metadata.topic.len() + 2 + CREATED_AT_LEN);
    put_cstr(&mut buf, "id", &metadata.id)?;
    put_cstr(&mut buf, "topic", &metadata.topic)?;
    let created_at = metadata
        .created_at
        .format("%Y-%m-%dT%H:%M:%S%.6fZ")
        .to_string();
    // Years outside 0000..=9999 widen `%Y` and would lose sub-second digits.
    if created_at.len() != CREATED_AT_LEN {
        return Err(TileDbError::Encode(format!(
            "created_at {created_at} does not fit the {CREATED_AT_LEN}-byte timestamp slot"
        )));
    }
    buf.extend_from_slice(created_at.as_bytes());
    Ok(buf)
}

fn decode_metadata(section: &[u8]) -> Result<TileMetadata> {
    let mut r = ByteReader::new(section);
    let id = r.read_cstr()?.to_string();
    let topic = r.read_cstr()?.to_string();
    // Older writers did not pad the slot, so accept a short tail.
    let created_at = parse_created_at(r.take_up_to(CREATED_AT_LEN))?;

    Ok(TileMetadata {
        id,
        topic,
        domain: String::new(),
        created_at,
        version: 0,
    })
}

fn parse_created_at(raw: &[u8]) -> Result<DateTime<Utc>> {
    let s = utf8(raw)?.trim_end_matches('\0');
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    // A truncated offset ("...123456+") leaves a dangling sign; drop it.
    let naive = s.trim_end_matches(|c: char| !c.is_ascii_digit());
    NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|dt| dt.and_utc())
        .map_err(|e| TileDbError::corrupt_tile(format!("invalid created_at '{s}': {e}")))
}

// ============================================================================
// Coordinates
// ============================================================================

fn encode_coordinates(tile_id: &str, coordinates: &TileCoordinates) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(COORDINATES_LEN);
    let values = coordinates
        .domain_space
        .iter()
        .chain(coordinates.meta_space.iter());
    for (i, v) in values.enumerate() {
        if !v.is_finite() {
            return Err(TileDbError::Encode(format!(
                "tile '{tile_id}': non-finite coordinate {v} at position {i}"
            )));
        }
        buf.extend_from_slice(&v.to_le_bytes());
    }
    Ok(buf)
}

fn decode_coordinates(section: &[u8]) -> Result<TileCoordinates> {
    if section.len() != COORDINATES_LEN {
        return Err(TileDbError::corrupt_tile(format!(
            "coordinate section is {} bytes (expected {})",
            section.len(),
            COORDINATES_LEN
        )));
    }
    let mut r = ByteReader::new(section);
    let mut read_point = || -> Result<Point3> {
        let mut p = [0f32; 3];
        for v in &mut p {
            *v = r.read_f32_le()?;
            if !v.is_finite() {
                return Err(TileDbError::corrupt_tile("non-finite coordinate"));
            }
        }
        Ok(p)
    };
    let domain_space = read_point()?;
    let meta_space = read_point()?;

    Ok(TileCoordinates {
        domain_space,
        meta_space,
        reasoning_path: Vec::new(),
    })
}

// ============================================================================
// Content
// ============================================================================

fn encode_content(content: &TileContent) -> Result<Vec<u8>> {
    let mut buf =
        Vec::with_capacity(8 + content.thinking_process.len() + content.final_response.len());
    put_prefixed(&mut buf, content.thinking_process.as_bytes())?;
    put_prefixed(&mut buf, content.final_response.as_bytes())?;
    Ok(buf)
}

fn decode_content(section: &[u8]) -> Result<TileContent> {
    let mut r = ByteReader::new(section);
    let thinking_process = utf8(r.read_prefixed()?)?.to_string();
    let final_response = utf8(r.read_prefixed()?)?.to_string();

    Ok(TileContent {
        thinking_process,
        final_response,
        references: Vec::new(),
    })
}

// ============================================================================
// Verification
// ============================================================================

fn encode_verification(verification: &Verification) -> Result<Vec<u8>> {
    let count = u32::try_from(verification.reviewers.len())
        .map_err(|_| TileDbError::Encode("too many reviewers".into()))?;
    let mut buf = Vec::with_capacity(6 + verification.reviewers.len() * REVIEWER_ID_LEN);
    buf.push(verification.status.as_u8());
    buf.push(verification.initial_certainty.min(100));
    buf.extend_from_slice(&count.to_le_bytes());
    for reviewer in &verification.reviewers {
        put_fixed(&mut buf, reviewer.reviewer_id.as_bytes(), REVIEWER_ID_LEN);
    }
    Ok(buf)
}

fn decode_verification(section: &[u8]) -> Result<Verification> {
    let mut r = ByteReader::new(section);
    let code = r.read_u8()?;
    let status = VerificationStatus::from_u8(code)
        .ok_or_else(|| TileDbError::corrupt_tile(format!("unknown verification status {code}")))?;
    let initial_certainty = r.read_u8()?.min(100);
    let reviewer_count = r.read_u32_le()? as usize;
    // Reviewer slots are skipped, not restored.
    let slots = reviewer_count
        .checked_mul(REVIEWER_ID_LEN)
        .ok_or_else(|| TileDbError::corrupt_tile("reviewer count overflow"))?;
    r.take(slots)?;

    Ok(Verification {
        status,
        initial_certainty,
        reviewers: Vec::new(),
    })
}
