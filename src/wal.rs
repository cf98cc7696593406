use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::model::Event;

/// Encode one committed transaction to [len][bincode][crc32] format.
fn encode_entry(writer: &mut impl Write, events: &[Event]) -> io::Result<()> {
    let payload =
        bincode::serialize(events).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let len = payload.len() as u32;
    let crc = crc32fast::hash(&payload);
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.write_all(&crc.to_le_bytes())?;
    Ok(())
}

/// Append-only Write-Ahead Log.
///
/// Format per entry: `[u32: len][bincode: Vec<Event>][u32: crc32]`
/// - One entry is one committed transaction, so replay never applies half of one.
/// - `len` is the byte length of the bincode payload (not including the CRC).
/// - Truncated last entry (crash) is safely discarded via length-prefix + CRC check.
pub struct Wal {
    writer: BufWriter<File>,
    path: PathBuf,
    appends_since_compact: u64,
}

/// Result of reading a WAL back from disk.
#[derive(Debug, Default)]
pub struct Replay {
    pub events: Vec<Event>,
    /// Number of intact entries (transactions) read.
    pub entries: u64,
}

impl Wal {
    /// Open (or create) the WAL file at `path`.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            appends_since_compact: 0,
        })
    }

    /// Append one entry, flush and fsync. Returns once the entry is durable.
    pub fn append(&mut self, events: &[Event]) -> io::Result<()> {
        let encoded = encode_entry(&mut self.writer, events);
        // Flush even when encoding failed so partial bytes don't prefix the next entry.
        let synced = self.flush_sync();
        encoded.and(synced)?;
        self.appends_since_compact += 1;
        Ok(())
    }

    fn flush_sync(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a compacted snapshot to a temp file and fsync.
    pub fn write_compact_file(path: &Path, events: &[Event]) -> io::Result<()> {
        let tmp_path = path.with_extension("wal.tmp");
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        encode_entry(&mut writer, events)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    }

    /// Atomic swap: rename temp file over the WAL and reopen.
    pub fn swap_compact_file(&mut self) -> io::Result<()> {
        let tmp_path = self.path.with_extension("wal.tmp");
        fs::rename(&tmp_path, &self.path)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.writer = BufWriter::new(file);
        self.appends_since_compact = 0;
        Ok(())
    }

    #[cfg(test)]
    pub fn compact(&mut self, events: &[Event]) -> io::Result<()> {
        Self::write_compact_file(&self.path, events)?;
        self.swap_compact_file()
    }

    pub fn appends_since_compact(&self) -> u64 {
        self.appends_since_compact
    }

    /// Replay the WAL from disk, returning all events of intact entries in order.
    /// Truncated/corrupt trailing entries are silently discarded.
    pub fn replay(path: &Path) -> io::Result<Replay> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Replay::default()),
            Err(e) => return Err(e),
        };
        let mut reader = BufReader::new(file);
        let mut replay = Replay::default();

        loop {
            let mut len_buf = [0u8; 4];
            match reader.read_exact(&mut len_buf) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e),
            }
            let len = u32::from_le_bytes(len_buf) as usize;

            let mut payload = vec![0u8; len];
            match reader.read_exact(&mut payload) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break, // truncated
                Err(e) => return Err(e),
            }

            let mut crc_buf = [0u8; 4];
            match reader.read_exact(&mut crc_buf) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break, // truncated
                Err(e) => return Err(e),
            }
            if u32::from_le_bytes(crc_buf) != crc32fast::hash(&payload) {
                break;
            }

            match bincode::deserialize::<Vec<Event>>(&payload) {
                Ok(events) => {
                    replay.events.extend(events);
                    replay.entries += 1;
                }
                Err(_) => break, // corrupt payload
            }
        }

        Ok(replay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Room, Sequences};
    use chrono::Utc;

    fn tmp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("innkeep_test_wal");
        fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    fn room(id: u64, name: &str) -> Event {
        Event::RoomSaved(Room {
            id,
            name: name.into(),
            capacity: Some(2),
            is_active: true,
            created_at: Utc::now(),
            updated_at: None,
        })
    }

    #[test]
    fn append_and_replay() {
        let path = tmp_path("append_and_replay.wal");
        let _ = fs::remove_file(&path);

        let first = vec![room(1, "Ocean"), room(2, "Garden")];
        let second = vec![Event::RoomDeleted { id: 2 }];

        {
            let mut wal = Wal::open(&path).unwrap();
            wal.append(&first).unwrap();
            wal.append(&second).unwrap();
        }

        let replay = Wal::replay(&path).unwrap();
        assert_eq!(replay.entries, 2);
        assert_eq!(replay.events.len(), 3);
        assert_eq!(replay.events[..2], first[..]);
        assert_eq!(replay.events[2], second[0]);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn replay_handles_truncation() {
        let path = tmp_path("truncation.wal");
        let _ = fs::remove_file(&path);

        let entry = vec![room(1, "Ocean")];
        {
            let mut wal = Wal::open(&path).unwrap();
            wal.append(&entry).unwrap();
        }

        // Append garbage to simulate a truncated second entry
        {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(&[0u8; 6]).unwrap();
        }

        let replay = Wal::replay(&path).unwrap();
        assert_eq!(replay.entries, 1);
        assert_eq!(replay.events, entry);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn replay_nonexistent_file() {
        let path = tmp_path("nonexistent.wal");
        let _ = fs::remove_file(&path);
        let replay = Wal::replay(&path).unwrap();
        assert!(replay.events.is_empty());
        assert_eq!(replay.entries, 0);
    }

    #[test]
    fn replay_drops_whole_entry_on_bad_crc() {
        let path = tmp_path("corrupt_crc.wal");
        let _ = fs::remove_file(&path);

        let entry = vec![room(1, "Ocean"), Event::RoomDeleted { id: 1 }];
        {
            let payload = bincode::serialize(&entry).unwrap();
            let len = payload.len() as u32;
            let bad_crc: u32 = 0xDEADBEEF;

            let mut f = File::create(&path).unwrap();
            f.write_all(&len.to_le_bytes()).unwrap();
            f.write_all(&payload).unwrap();
            f.write_all(&bad_crc.to_le_bytes()).unwrap();
        }

        let replay = Wal::replay(&path).unwrap();
        assert!(replay.events.is_empty());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn compact_then_append() {
        let path = tmp_path("compact_append.wal");
        let _ = fs::remove_file(&path);

        let snapshot = vec![
            Event::SequencesAdvanced(Sequences { room: 4, guest: 1, reservation: 1 }),
            room(1, "Ocean"),
        ];
        let later = vec![room(4, "Attic")];

        {
            let mut wal = Wal::open(&path).unwrap();
            for id in 1..=3 {
                wal.append(&[room(id, "churn")]).unwrap();
                wal.append(&[Event::RoomDeleted { id }]).unwrap();
            }
            assert_eq!(wal.appends_since_compact(), 6);
            let before = fs::metadata(&path).unwrap().len();

            wal.compact(&snapshot).unwrap();
            assert_eq!(wal.appends_since_compact(), 0);
            let after = fs::metadata(&path).unwrap().len();
            assert!(after < before, "compacted WAL should be smaller: {after} < {before}");

            wal.append(&later).unwrap();
        }

        let replay = Wal::replay(&path).unwrap();
        assert_eq!(replay.entries, 2);
        assert_eq!(replay.events.len(), 3);
        assert_eq!(replay.events[..2], snapshot[..]);
        assert_eq!(replay.events[2], later[0]);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn append_is_durable_before_close() {
        let path = tmp_path("durable_append.wal");
        let _ = fs::remove_file(&path);

        let entries: Vec<Vec<Event>> = (1..=5).map(|id| vec![room(id, "Suite")]).collect();
        let mut wal = Wal::open(&path).unwrap();
        for e in &entries {
            wal.append(e).unwrap();
        }
        assert_eq!(wal.appends_since_compact(), 5);

        // The writer is still open: every entry must already be on disk.
        let replay = Wal::replay(&path).unwrap();
        assert_eq!(replay.entries, 5);
        assert_eq!(replay.events, entries.concat());

        drop(wal);
        let _ = fs::remove_file(&path);
    }
}
