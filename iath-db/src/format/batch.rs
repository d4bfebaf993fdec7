//! Whole-file codec: header + JSON index + concatenated tile blobs.
//!
//! Files are rebuilt in one shot from a full tile batch; there is no append
//! path. Decoding is best-effort per tile: a corrupt header or index aborts,
//! a corrupt tile blob is logged and skipped.

use super::header::{DatabaseHeader, HEADER_LEN};
use super::tile_codec::{decode_tile, encode_tile};
use crate::error::{Result, TileDbError};
use crate::tile::Tile;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

/// One index record: where a tile's blob lives, relative to `data_offset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub offset: u64,
    pub length: u64,
}

/// Output of [`encode_batch_detailed`].
#[derive(Debug, Clone)]
pub struct EncodedBatch {
    /// Complete file contents.
    pub bytes: Vec<u8>,
    /// Index records in tile order.
    pub entries: Vec<IndexEntry>,
    /// Tiles dropped for having an empty id.
    pub skipped: usize,
}

/// A tile that could not be decoded during a batch load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedTile {
    pub id: String,
    pub reason: String,
}

/// Output of [`decode_batch`].
#[derive(Debug, Clone)]
pub struct DecodedBatch {
    pub header: DatabaseHeader,
    /// Decoded tiles in index order, one per distinct id.
    ///
    /// Each tile carries its index id. When the index repeats an id, the
    /// later blob replaces the earlier one in the earlier one's position.
    pub tiles: Vec<Tile>,
    /// Index entries whose blob failed to decode.
    pub skipped: Vec<SkippedTile>,
}

impl DecodedBatch {
    /// Number of decoded tiles.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Decoded tiles keyed by id.
    pub fn into_map(self) -> FxHashMap<String, Tile> {
        self.tiles
            .into_iter()
            .map(|t| (t.metadata.id.clone(), t))
            .collect()
    }
}

/// Encode a batch of tiles into complete database file bytes.
pub fn encode_batch(tiles: &[Tile], domain_code: u8) -> Result<Vec<u8>> {
    encode_batch_detailed(tiles, domain_code).map(|batch| batch.bytes)
}

/// Encode a batch of tiles, also returning the index and skip count.
///
/// Tiles with an empty id are skipped. Any other encode failure aborts the
/// whole batch.
pub fn encode_batch_detailed(tiles: &[Tile], domain_code: u8) -> Result<EncodedBatch> {
    tracing::debug!(
        tile_count = tiles.len(),
        domain_code = domain_code,
        "encoding tile batch"
    );

    let mut entries = Vec::with_capacity(tiles.len());
    let mut data = Vec::new();
    let mut skipped = 0usize;

    for tile in tiles {
        if tile.id().is_empty() {
            skipped += 1;
            tracing::warn!(topic = %tile.metadata.topic, "skipping tile without id");
            continue;
        }
        let blob = encode_tile(tile)?;
        entries.push(IndexEntry {
            id: tile.id().to_string(),
            offset: data.len() as u64,
            length: blob.len() as u64,
        });
        data.extend_from_slice(&blob);
    }

    let index_bytes = serde_json::to_vec(&entries)
        .map_err(|e| TileDbError::Encode(format!("index serialization failed: {e}")))?;
    let header = DatabaseHeader::new(domain_code, index_bytes.len());

    let mut bytes = Vec::with_capacity(HEADER_LEN + index_bytes.len() + data.len());
    bytes.extend_from_slice(&header.to_bytes());
    bytes.extend_from_slice(&index_bytes);
    bytes.extend_from_slice(&data);

    tracing::debug!(
        encoded = entries.len(),
        skipped = skipped,
        index_bytes = index_bytes.len(),
        data_bytes = data.len(),
        "tile batch encoded"
    );

    Ok(EncodedBatch {
        bytes,
        entries,
        skipped,
    })
}

/// Parse the header and index without decoding any tile.
pub fn read_index(bytes: &[u8]) -> Result<(DatabaseHeader, Vec<IndexEntry>)> {
    let header = DatabaseHeader::read(bytes)?;
    let index_bytes = &bytes[header.index_offset as usize..header.data_offset as usize];
    let entries: Vec<IndexEntry> = serde_json::from_slice(index_bytes)
        .map_err(|e| TileDbError::CorruptFile(format!("unparsable index: {e}")))?;
    Ok((header, entries))
}

/// Decode a complete database file.
pub fn decode_batch(bytes: &[u8]) -> Result<DecodedBatch> {
    let (header, entries) = read_index(bytes)?;
    tracing::debug!(
        version = header.version,
        domain_code = header.domain_code,
        index_offset = header.index_offset,
        data_offset = header.data_offset,
        entries = entries.len(),
        "database header ok"
    );

    let mut tiles: Vec<Tile> = Vec::with_capacity(entries.len());
    let mut positions: FxHashMap<String, usize> = FxHashMap::default();
    let mut skipped = Vec::new();

    for entry in &entries {
        match decode_entry(bytes, header.data_offset, entry) {
            Ok(mut tile) => {
                // The index id is authoritative for lookups and dedup.
                if tile.metadata.id != entry.id {
                    if !tile.metadata.id.is_empty() {
                        tracing::warn!(
                            index_id = %entry.id,
                            blob_id = %tile.metadata.id,
                            "tile id differs from index entry; using index id"
                        );
                    }
                    tile.metadata.id = entry.id.clone();
                }
                match positions.get(&entry.id) {
                    Some(&pos) => tiles[pos] = tile,
                    None => {
                        positions.insert(entry.id.clone(), tiles.len());
                        tiles.push(tile);
                    }
                }
            }
            Err(e) => {
                tracing::warn!(tile_id = %entry.id, error = %e, "skipping undecodable tile");
                skipped.push(SkippedTile {
                    id: entry.id.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(DecodedBatch {
        header,
        tiles,
        skipped,
    })
}

fn decode_entry(bytes: &[u8], data_offset: u64, entry: &IndexEntry) -> Result<Tile> {
    let start = data_offset.checked_add(entry.offset);
    let end = start.and_then(|s| s.checked_add(entry.length));
    let (start, end) = match (start, end) {
        (Some(s), Some(e)) if e <= bytes.len() as u64 => (s as usize, e as usize),
        _ => {
            return Err(TileDbError::corrupt_tile(format!(
                "blob range offset={} length={} lies outside the data section",
                entry.offset, entry.length
            ))
            .with_tile_id(&entry.id))
        }
    };
    decode_tile(&bytes[start..end]).map_err(|e| e.with_tile_id(&entry.id))
}

/// Encode `tiles` and write them to `path`, replacing any existing file.
///
/// Writes to a temp file in the same directory and renames it into place so
/// readers never observe a partially written database.
pub fn write_database(path: &Path, tiles: &[Tile], domain_code: u8) -> Result<EncodedBatch> {
    let batch = encode_batch_detailed(tiles, domain_code)?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::other(format!("not a file path: {}", path.display())))?;
    let tmp = dir.join(format!(
        ".{}.{}.tmp",
        file_name.to_string_lossy(),
        std::process::id()
    ));

    std::fs::write(&tmp, &batch.bytes)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }

    tracing::info!(
        path = %path.display(),
        tiles = batch.entries.len(),
        bytes = batch.bytes.len(),
        "database written"
    );
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::{TileContent, TileCoordinates, TileMetadata, Verification};
    use chrono::Utc;

    fn tile(id: &str, xyz: [f32; 3], response: &str) -> Tile {
        Tile {
            metadata: TileMetadata {
                id: id.into(),
                topic: format!("topic {id}"),
                domain: "medical".into(),
                created_at: Utc::now(),
                version: 1,
            },
            content: TileContent {
                thinking_process: "reasoning".into(),
                final_response: response.into(),
                references: Vec::new(),
            },
            coordinates: TileCoordinates {
                domain_space: xyz,
                meta_space: [80.0, 200.0, 50.0],
                reasoning_path: Vec::new(),
            },
            verification: Verification::default(),
            source: None,
            history: Vec::new(),
        }
    }

    #[test]
    fn test_batch_layout() {
        let tiles = vec![tile("a", [1.0; 3], "one"), tile("b", [2.0; 3], "two")];
        let batch = encode_batch_detailed(&tiles, 1).unwrap();

        let header = DatabaseHeader::read(&batch.bytes).unwrap();
        assert_eq!(header.index_offset, 64);
        assert_eq!(header.domain_code, 1);

        let index: Vec<IndexEntry> = serde_json::from_slice(
            &batch.bytes[header.index_offset as usize..header.data_offset as usize],
        )
        .unwrap();
        assert_eq!(index, batch.entries);
        assert_eq!(index[0].offset, 0);
        assert_eq!(index[1].offset, index[0].length);

        let data_len = batch.bytes.len() as u64 - header.data_offset;
        assert_eq!(data_len, index[0].length + index[1].length);
    }

    #[test]
    fn test_batch_roundtrip_ids() {
        let tiles = vec![
            tile("a", [0.0; 3], "x"),
            tile("b", [1.0; 3], "y"),
            tile("c", [2.0; 3], "z"),
        ];
        let decoded = decode_batch(&encode_batch(&tiles, 3).unwrap()).unwrap();
        let ids: Vec<_> = decoded.tiles.iter().map(|t| t.id().to_string()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert!(decoded.skipped.is_empty());
        assert_eq!(decoded.header.domain_code, 3);
    }

    #[test]
    fn test_index_id_overrides_blob_id() {
        let blob = encode_tile(&tile("x", [3.0; 3], "shared")).unwrap();
        let entries = vec![
            IndexEntry {
                id: "a".into(),
                offset: 0,
                length: blob.len() as u64,
            },
            IndexEntry {
                id: "b".into(),
                offset: 0,
                length: blob.len() as u64,
            },
        ];
        let index = serde_json::to_vec(&entries).unwrap();
        let mut bytes = DatabaseHeader::new(1, index.len()).to_bytes().to_vec();
        bytes.extend_from_slice(&index);
        bytes.extend_from_slice(&blob);

        let map = decode_batch(&bytes).unwrap().into_map();
        let mut keys: Vec<_> = map.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(map["a"].id(), "a");
        assert_eq!(map["b"].content.final_response, "shared");
    }

    #[test]
    fn test_duplicate_ids_collapse_to_later() {
        let tiles = vec![
            tile("dup", [0.0; 3], "first"),
            tile("other", [5.0; 3], "other"),
            tile("dup", [9.0; 3], "second"),
        ];
        let decoded = decode_batch(&encode_batch(&tiles, 1).unwrap()).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded.tiles[0].id(), "dup");
        assert_eq!(decoded.tiles[0].content.final_response, "second");

        let map = decoded.into_map();
        assert_eq!(map["dup"].domain_space(), [9.0; 3]);
    }

    #[test]
    fn test_empty_id_skipped_on_encode() {
        let tiles = vec![tile("", [0.0; 3], "anon"), tile("named", [0.0; 3], "ok")];
        let batch = encode_batch_detailed(&tiles, 1).unwrap();
        assert_eq!(batch.skipped, 1);
        assert_eq!(batch.entries.len(), 1);
    }

    #[test]
    fn test_empty_batch() {
        let bytes = encode_batch(&[], 1).unwrap();
        let decoded = decode_batch(&bytes).unwrap();
        assert!(decoded.is_empty());
        assert_eq!(bytes.len(), 64 + 2); // header + "[]"
    }

    #[test]
    fn test_corrupt_blob_is_skipped() {
        let tiles = vec![tile("good", [0.0; 3], "fine"), tile("bad", [1.0; 3], "bad")];
        let batch = encode_batch_detailed(&tiles, 1).unwrap();
        let mut bytes = batch.bytes;
        let header = DatabaseHeader::read(&bytes).unwrap();
        let bad = &batch.entries[1];
        let start = (header.data_offset + bad.offset) as usize;
        for b in &mut bytes[start..start + bad.length as usize] {
            *b = 0xAB;
        }

        let decoded = decode_batch(&bytes).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded.tiles[0].id(), "good");
        assert_eq!(decoded.skipped.len(), 1);
        assert_eq!(decoded.skipped[0].id, "bad");
    }

    #[test]
    fn test_blob_range_past_eof_is_skipped() {
        let tiles = vec![tile("only", [0.0; 3], "x")];
        let mut bytes = encode_batch(&tiles, 1).unwrap();
        bytes.truncate(bytes.len() - 3);
        let decoded = decode_batch(&bytes).unwrap();
        assert!(decoded.is_empty());
        assert_eq!(decoded.skipped[0].id, "only");
    }

    #[test]
    fn test_bad_index_is_fatal() {
        let mut bytes = encode_batch(&[tile("a", [0.0; 3], "x")], 1).unwrap();
        bytes[64] = b'{';
        let err = decode_batch(&bytes).unwrap_err();
        assert!(matches!(err, TileDbError::CorruptFile(_)));
    }

    #[test]
    fn test_bad_magic_is_fatal() {
        let mut bytes = encode_batch(&[tile("a", [0.0; 3], "x")], 1).unwrap();
        bytes[0] = b'X';
        assert!(matches!(
            decode_batch(&bytes).unwrap_err(),
            TileDbError::CorruptFile(_)
        ));
    }

    #[test]
    fn test_write_database_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.iath");
        std::fs::write(&path, b"stale").unwrap();

        let batch = write_database(&path, &[tile("a", [0.0; 3], "x")], 2).unwrap();
        let on_disk = std::fs::read(&path).unwrap();
        assert_eq!(on_disk, batch.bytes);

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
