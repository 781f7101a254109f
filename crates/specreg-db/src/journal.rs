//! Mutation journals.
//!
//! A [`Journal`] records every accepted [`Mutation`] before it is applied to
//! the in-memory indexes. [`WriteAheadLog`] persists them to a single
//! append-only file; [`NoJournal`] discards them.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use crate::state::Mutation;

/// Durable sink for mutations.
pub trait Journal: Send + Sync {
    /// Record a mutation. It must be durable (per the journal's sync policy)
    /// when this returns `Ok`.
    fn record(&self, mutation: &Mutation) -> DbResult<()>;
}

/// Journal that keeps nothing. Backs the in-memory database.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoJournal;

impl Journal for NoJournal {
    fn record(&self, _mutation: &Mutation) -> DbResult<()> {
        Ok(())
    }
}

/// Flush/sync strategy for the write-ahead log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// `fsync` after every write.
    EveryWrite,
    /// Flush to the OS and rely on page-cache writeback.
    #[default]
    OsDefault,
}

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// Append-only mutation log.
///
/// On-disk format, repeated:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized Mutation)]
/// ```
///
/// Recovery reads front-to-back. Entries failing the CRC are skipped. A frame
/// whose header is incomplete or whose length is zero or runs past the end of
/// the file is a torn tail only if no intact frame follows it; the tail is
/// then truncated so later appends stay aligned. Otherwise the log refuses to
/// open with [`DbError::CorruptJournal`] and the file is left untouched.
pub struct WriteAheadLog {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
    sync_mode: SyncMode,
}

impl WriteAheadLog {
    /// Open (or create) the log at `path` and return it together with every
    /// mutation recovered from it, in append order.
    pub fn open(path: &Path, sync_mode: SyncMode) -> DbResult<(Self, Vec<Mutation>)> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let Recovery {
            mutations,
            valid_len,
        } = recover(path)?;
        let file_len = file.metadata()?.len();
        if valid_len < file_len {
            warn!(
                path = %path.display(),
                valid_len,
                file_len,
                "discarding torn tail of metadata journal"
            );
            file.set_len(valid_len)?;
        }

        Ok((
            Self {
                path: path.to_path_buf(),
                writer: Mutex::new(BufWriter::new(file)),
                sync_mode,
            },
            mutations,
        ))
    }

    /// Path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Journal for WriteAheadLog {
    fn record(&self, mutation: &Mutation) -> DbResult<()> {
        let payload =
            bincode::serialize(mutation).map_err(|e| DbError::Serialization(e.to_string()))?;
        let length = u32::try_from(payload.len())
            .map_err(|_| DbError::Serialization(format!("entry of {} bytes too large", payload.len())))?;
        let crc = crc32fast::hash(&payload);

        let mut w = self
            .writer
            .lock()
            .map_err(|e| DbError::Unavailable(format!("journal lock poisoned: {e}")))?;
        w.write_all(&length.to_le_bytes())?;
        w.write_all(&crc.to_le_bytes())?;
        w.write_all(&payload)?;
        w.flush()?;
        if self.sync_mode == SyncMode::EveryWrite {
            w.get_ref().sync_all()?;
        }

        debug!(len = payload.len(), "journal append");
        Ok(())
    }
}

impl std::fmt::Debug for WriteAheadLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteAheadLog")
            .field("path", &self.path)
            .field("sync_mode", &self.sync_mode)
            .finish()
    }
}

/// Mutations read back from a log, plus the byte length of its well-framed
/// prefix. Anything past `valid_len` is a torn tail.
struct Recovery {
    mutations: Vec<Mutation>,
    valid_len: u64,
}

/// The frame starting at `offset` as `(expected_crc, payload)`, if its header
/// is complete and its non-zero length fits inside `data`.
fn frame_at(data: &[u8], offset: usize) -> Option<(u32, &[u8])> {
    let header = data.get(offset..offset.checked_add(HEADER_SIZE)?)?;
    let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
    let crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    if length == 0 {
        return None;
    }
    let start = offset + HEADER_SIZE;
    let payload = data.get(start..start.checked_add(length)?)?;
    Some((crc, payload))
}

/// Offset of the first frame at or after `from` that passes its CRC and
/// decodes.
fn next_intact_frame(data: &[u8], from: usize) -> Option<usize> {
    (from..data.len()).find(|&offset| {
        frame_at(data, offset).is_some_and(|(crc, payload)| {
            crc32fast::hash(payload) == crc && bincode::deserialize::<Mutation>(payload).is_ok()
        })
    })
}

/// Read every valid mutation from the log.
fn recover(path: &Path) -> DbResult<Recovery> {
    let data = fs::read(path)?;
    let mut mutations = Vec::new();
    let mut offset = 0usize;

    while offset < data.len() {
        let Some((expected_crc, payload)) = frame_at(&data, offset) else {
            if let Some(resume_at) = next_intact_frame(&data, offset + 1) {
                return Err(DbError::CorruptJournal {
                    offset: offset as u64,
                    resume_at: resume_at as u64,
                });
            }
            warn!(
                offset,
                remaining = data.len() - offset,
                "torn journal tail; stopping recovery"
            );
            break;
        };
        let entry_end = offset + HEADER_SIZE + payload.len();

        let actual_crc = crc32fast::hash(payload);
        if actual_crc != expected_crc {
            warn!(
                offset,
                expected = expected_crc,
                actual = actual_crc,
                "CRC mismatch; skipping journal entry"
            );
            offset = entry_end;
            continue;
        }

        match bincode::deserialize::<Mutation>(payload) {
            Ok(mutation) => mutations.push(mutation),
            Err(e) => warn!(offset, error = %e, "undecodable journal entry; skipping"),
        }
        offset = entry_end;
    }

    debug!(recovered = mutations.len(), "journal recovery complete");
    Ok(Recovery {
        mutations,
        valid_len: offset as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Seek, SeekFrom};

    use specreg_types::CustomerId;

    fn mutation(n: u32) -> Mutation {
        Mutation::DeleteAllSpecs {
            sub: CustomerId::new(format!("customer-{n}")).unwrap(),
        }
    }

    #[test]
    fn record_and_recover_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.wal");
        let (wal, recovered) = WriteAheadLog::open(&path, SyncMode::OsDefault).unwrap();
        assert!(recovered.is_empty());

        for n in 1..=3 {
            wal.record(&mutation(n)).unwrap();
        }
        drop(wal);

        let (_, recovered) = WriteAheadLog::open(&path, SyncMode::OsDefault).unwrap();
        assert_eq!(recovered, vec![mutation(1), mutation(2), mutation(3)]);
    }

    #[test]
    fn crc_mismatch_skips_only_that_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.wal");
        let (wal, _) = WriteAheadLog::open(&path, SyncMode::OsDefault).unwrap();
        wal.record(&mutation(1)).unwrap();
        wal.record(&mutation(2)).unwrap();
        drop(wal);

        {
            let mut file = OpenOptions::new().read(true).write(true).open(&path).unwrap();
            file.seek(SeekFrom::Start(HEADER_SIZE as u64)).unwrap();
            let mut buf = [0u8; 1];
            file.read_exact(&mut buf).unwrap();
            buf[0] ^= 0xFF;
            file.seek(SeekFrom::Start(HEADER_SIZE as u64)).unwrap();
            file.write_all(&buf).unwrap();
        }

        let (_, recovered) = WriteAheadLog::open(&path, SyncMode::OsDefault).unwrap();
        assert_eq!(recovered, vec![mutation(2)]);
    }

    #[test]
    fn torn_tail_is_truncated_and_appends_stay_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tail.wal");
        let (wal, _) = WriteAheadLog::open(&path, SyncMode::EveryWrite).unwrap();
        wal.record(&mutation(1)).unwrap();
        wal.record(&mutation(2)).unwrap();
        drop(wal);

        let len = fs::metadata(&path).unwrap().len();
        OpenOptions::new()
            .write(true)
            .open(&path)
            .unwrap()
            .set_len(len - 3)
            .unwrap();

        let (wal, recovered) = WriteAheadLog::open(&path, SyncMode::OsDefault).unwrap();
        assert_eq!(recovered, vec![mutation(1)]);
        wal.record(&mutation(3)).unwrap();
        drop(wal);

        let (_, recovered) = WriteAheadLog::open(&path, SyncMode::OsDefault).unwrap();
        assert_eq!(recovered, vec![mutation(1), mutation(3)]);
    }

    fn flip_byte(path: &Path, at: u64) {
        let mut file = OpenOptions::new().read(true).write(true).open(path).unwrap();
        file.seek(SeekFrom::Start(at)).unwrap();
        let mut buf = [0u8; 1];
        file.read_exact(&mut buf).unwrap();
        buf[0] ^= 0xFF;
        file.seek(SeekFrom::Start(at)).unwrap();
        file.write_all(&buf).unwrap();
    }

    #[test]
    fn damaged_length_before_valid_entries_refuses_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("length.wal");
        let (wal, _) = WriteAheadLog::open(&path, SyncMode::OsDefault).unwrap();
        for n in 1..=3 {
            wal.record(&mutation(n)).unwrap();
        }
        drop(wal);
        let len = fs::metadata(&path).unwrap().len();

        // High byte of the first entry's length.
        flip_byte(&path, 3);
        let err = WriteAheadLog::open(&path, SyncMode::OsDefault).unwrap_err();
        assert!(
            matches!(err, DbError::CorruptJournal { offset: 0, resume_at } if resume_at > 0),
            "unexpected error {err}"
        );
        assert_eq!(fs::metadata(&path).unwrap().len(), len);

        // Once repaired, nothing was lost.
        flip_byte(&path, 3);
        let (_, recovered) = WriteAheadLog::open(&path, SyncMode::OsDefault).unwrap();
        assert_eq!(recovered, vec![mutation(1), mutation(2), mutation(3)]);
    }

    #[test]
    fn zeroed_header_mid_file_refuses_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zeroed.wal");
        let (wal, _) = WriteAheadLog::open(&path, SyncMode::OsDefault).unwrap();
        wal.record(&mutation(1)).unwrap();
        wal.record(&mutation(2)).unwrap();
        drop(wal);

        let mut file = OpenOptions::new().write(true).open(&path).unwrap();
        file.write_all(&[0u8; HEADER_SIZE]).unwrap();
        drop(file);

        assert!(matches!(
            WriteAheadLog::open(&path, SyncMode::OsDefault),
            Err(DbError::CorruptJournal { offset: 0, .. })
        ));
    }

    #[test]
    fn header_only_tail_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("header.wal");
        let (wal, _) = WriteAheadLog::open(&path, SyncMode::OsDefault).unwrap();
        wal.record(&mutation(1)).unwrap();
        drop(wal);
        let len = fs::metadata(&path).unwrap().len();

        // A complete header whose payload never made it to disk.
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&64u32.to_le_bytes()).unwrap();
        file.write_all(&0u32.to_le_bytes()).unwrap();
        drop(file);

        let (_, recovered) = WriteAheadLog::open(&path, SyncMode::OsDefault).unwrap();
        assert_eq!(recovered, vec![mutation(1)]);
        assert_eq!(fs::metadata(&path).unwrap().len(), len);
    }
}
