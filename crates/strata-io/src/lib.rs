//! On-disk storage for player-modified chunks.
//!
//! One file per chunk, named `{x}_{y}_{z}.chunk`. The body is a bincode-encoded
//! [`ChunkFile`] compressed with size-prepended LZ4.
#![forbid(unsafe_code)]

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strata_blocks::BlockRegistry;
use strata_world::{CHUNK_VOLUME, ChunkPos, PendingUpdate};
use thiserror::Error;

const FORMAT_VERSION: u32 = 1;
const EXTENSION: &str = "chunk";

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("no saved file for chunk {0:?}")]
    NotFound(ChunkPos),
    #[error("corrupt chunk file for {pos:?}: {reason}")]
    CorruptData { pos: ChunkPos, reason: String },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A chunk as persisted: voxel type ids in index order plus the updates still
/// addressed to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkRecord {
    pub pos: ChunkPos,
    pub blocks: Vec<u16>,
    pub pending: Vec<PendingUpdate>,
}

#[derive(Serialize, Deserialize)]
struct ChunkFile {
    version: u32,
    pos: ChunkPos,
    blocks: Vec<u16>,
    pending: Vec<PendingUpdate>,
}

/// Directory of saved chunks. Only Modified chunks are ever written here.
#[derive(Debug, Clone)]
pub struct PersistenceStore {
    dir: PathBuf,
    reg: Arc<BlockRegistry>,
}

impl PersistenceStore {
    /// Opens (creating if needed) the save directory.
    pub fn open(
        dir: impl Into<PathBuf>,
        reg: Arc<BlockRegistry>,
    ) -> Result<Self, PersistenceError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, reg })
    }

    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, pos: ChunkPos) -> PathBuf {
        self.dir.join(file_name(pos))
    }

    #[inline]
    pub fn exists(&self, pos: ChunkPos) -> bool {
        self.path_for(pos).is_file()
    }

    /// Writes the record atomically: encode to a temp file, then rename over the target.
    pub fn save(&self, record: &ChunkRecord) -> Result<(), PersistenceError> {
        let pos = record.pos;
        if record.blocks.len() != CHUNK_VOLUME {
            return Err(PersistenceError::CorruptData {
                pos,
                reason: format!("refusing to save {} voxels", record.blocks.len()),
            });
        }
        let file = ChunkFile {
            version: FORMAT_VERSION,
            pos,
            blocks: record.blocks.clone(),
            pending: record.pending.clone(),
        };
        let bytes = bincode::serialize(&file).map_err(|e| PersistenceError::CorruptData {
            pos,
            reason: format!("encode: {e}"),
        })?;
        let compressed = lz4_flex::compress_prepend_size(&bytes);
        let path = self.path_for(pos);
        let tmp = path.with_extension("chunk.tmp");
        fs::write(&tmp, &compressed)?;
        fs::rename(&tmp, &path)?;
        log::debug!(
            target: "persist",
            "saved {:?} ({} bytes, {} pending)",
            pos,
            compressed.len(),
            record.pending.len()
        );
        Ok(())
    }

    pub fn load(&self, pos: ChunkPos) -> Result<ChunkRecord, PersistenceError> {
        let path = self.path_for(pos);
        let compressed = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(PersistenceError::NotFound(pos));
            }
            Err(e) => return Err(e.into()),
        };
        let corrupt = |reason: String| PersistenceError::CorruptData { pos, reason };
        let bytes = lz4_flex::decompress_size_prepended(&compressed)
            .map_err(|e| corrupt(format!("decompress: {e}")))?;
        let file: ChunkFile =
            bincode::deserialize(&bytes).map_err(|e| corrupt(format!("decode: {e}")))?;
        if file.version != FORMAT_VERSION {
            return Err(corrupt(format!("unsupported version {}", file.version)));
        }
        if file.pos != pos {
            return Err(corrupt(format!("file holds chunk {:?}", file.pos)));
        }
        if file.blocks.len() != CHUNK_VOLUME {
            let n = file.blocks.len();
            return Err(corrupt(format!("{n} voxels, expected {CHUNK_VOLUME}")));
        }
        let known = |id: u16| self.reg.contains(id);
        if let Some(id) = file.blocks.iter().copied().find(|&id| !known(id)) {
            return Err(corrupt(format!("unknown block id {id}")));
        }
        let pending: Vec<PendingUpdate> = file
            .pending
            .into_iter()
            .filter(|u| {
                let keep = u.target() == pos && known(u.type_id);
                if !keep {
                    log::warn!(target: "persist", "dropping stale update {:?} in {:?}", u, pos);
                }
                keep
            })
            .collect();
        Ok(ChunkRecord {
            pos,
            blocks: file.blocks,
            pending,
        })
    }

    /// Deletes a saved chunk. Returns whether a file existed.
    pub fn remove(&self, pos: ChunkPos) -> Result<bool, PersistenceError> {
        match fs::remove_file(self.path_for(pos)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Positions of every saved chunk, recovered from file names.
    pub fn list_saved(&self) -> Result<Vec<ChunkPos>, PersistenceError> {
        let mut out = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(pos) = entry.file_name().to_str().and_then(parse_file_name) {
                out.push(pos);
            }
        }
        Ok(out)
    }
}

pub fn file_name(pos: ChunkPos) -> String {
    format!("{}_{}_{}.{EXTENSION}", pos.cx, pos.cy, pos.cz)
}

/// Inverse of [`file_name`]; `None` for anything that is not a chunk file.
pub fn parse_file_name(name: &str) -> Option<ChunkPos> {
    let stem = name.strip_suffix(EXTENSION)?.strip_suffix('.')?;
    let mut parts = stem.split('_');
    let x = parts.next()?.parse().ok()?;
    let y = parts.next()?.parse().ok()?;
    let z = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(ChunkPos::new(x, y, z))
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_world::{LocalPos, WorldPos, chunk_and_local_to_world};

    fn store() -> (tempfile::TempDir, PersistenceStore) {
        let dir = tempfile::tempdir().unwrap();
        let reg = Arc::new(BlockRegistry::builtin());
        let store = PersistenceStore::open(dir.path(), reg).unwrap();
        (dir, store)
    }

    fn every_type_record(pos: ChunkPos) -> ChunkRecord {
        let types = BlockRegistry::builtin().len() as u16;
        let blocks = (0..CHUNK_VOLUME).map(|i| (i as u16 * 7) % types).collect();
        let pending = vec![PendingUpdate::new(
            chunk_and_local_to_world(pos, LocalPos::new(1, 2, 3)),
            types - 1,
        )];
        ChunkRecord { pos, blocks, pending }
    }

    #[test]
    fn round_trip_with_every_block_type() {
        let (_dir, store) = store();
        let pos = ChunkPos::new(-3, 4, -5);
        let record = every_type_record(pos);
        let types = BlockRegistry::builtin().len() as u16;
        for id in 0..types {
            assert!(record.blocks.contains(&id));
        }
        store.save(&record).unwrap();
        assert!(store.exists(pos));
        assert_eq!(store.load(pos).unwrap(), record);
    }

    #[test]
    fn missing_file_is_not_found() {
        let (_dir, store) = store();
        assert!(matches!(
            store.load(ChunkPos::new(1, 1, 1)),
            Err(PersistenceError::NotFound(p)) if p == ChunkPos::new(1, 1, 1)
        ));
    }

    #[test]
    fn garbage_is_corrupt() {
        let (_dir, store) = store();
        let pos = ChunkPos::new(0, 0, 0);
        fs::write(store.path_for(pos), b"not a chunk").unwrap();
        assert!(matches!(store.load(pos), Err(PersistenceError::CorruptData { .. })));
    }

    #[test]
    fn unknown_ids_are_corrupt() {
        let (_dir, store) = store();
        let pos = ChunkPos::new(2, 0, 0);
        let mut record = every_type_record(pos);
        record.blocks[17] = 4000;
        store.save(&record).unwrap();
        let err = store.load(pos).unwrap_err();
        assert!(err.to_string().contains("unknown block id 4000"), "{err}");
    }

    #[test]
    fn renamed_file_fails_position_check() {
        let (_dir, store) = store();
        let a = ChunkPos::new(1, 2, 3);
        let b = ChunkPos::new(3, 2, 1);
        store.save(&every_type_record(a)).unwrap();
        fs::rename(store.path_for(a), store.path_for(b)).unwrap();
        assert!(matches!(
            store.load(b),
            Err(PersistenceError::CorruptData { pos, .. }) if pos == b
        ));
    }

    #[test]
    fn misaddressed_pending_records_are_dropped() {
        let (_dir, store) = store();
        let pos = ChunkPos::new(0, 0, 0);
        let mut record = every_type_record(pos);
        record.pending.push(PendingUpdate::new(WorldPos::new(100, 0, 0), 1));
        store.save(&record).unwrap();
        assert_eq!(store.load(pos).unwrap().pending.len(), 1);
    }

    #[test]
    fn list_saved_parses_names_and_skips_strangers() {
        let (dir, store) = store();
        let positions = [ChunkPos::new(-1, 0, 7), ChunkPos::new(12, -3, -40)];
        for p in positions {
            store.save(&every_type_record(p)).unwrap();
        }
        fs::write(dir.path().join("notes.txt"), b"hi").unwrap();
        fs::write(dir.path().join("1_2.chunk"), b"").unwrap();
        let mut saved = store.list_saved().unwrap();
        saved.sort_by_key(|p| (p.cx, p.cy, p.cz));
        assert_eq!(saved, positions.to_vec());
        assert!(store.remove(positions[0]).unwrap());
        assert!(!store.remove(positions[0]).unwrap());
        assert_eq!(store.list_saved().unwrap(), vec![positions[1]]);
    }

    #[test]
    fn file_names_round_trip_negative_coordinates() {
        let p = ChunkPos::new(-12, 0, 345);
        assert_eq!(file_name(p), "-12_0_345.chunk");
        assert_eq!(parse_file_name(&file_name(p)), Some(p));
        assert_eq!(parse_file_name("1_2_3.chunk.tmp"), None);
        assert_eq!(parse_file_name("1_2_3_4.chunk"), None);
    }
}
