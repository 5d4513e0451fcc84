use log::{debug, warn};
use serde::{Deserialize, Serialize};
use shade_core::error::{LedgerError, LedgerResult};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::store::{LedgerDelta, LedgerState};

/// One committed operation as recorded in the journal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Position of the operation in the serial history
    pub sequence: u64,

    /// Name of the operation that produced the delta
    pub operation: String,

    /// Milliseconds since the Unix epoch when the entry was recorded
    pub timestamp: u64,

    /// The writes the operation committed
    pub delta: LedgerDelta,
}

impl JournalEntry {
    pub fn new(sequence: u64, operation: impl Into<String>, delta: LedgerDelta) -> Self {
        Self {
            sequence,
            operation: operation.into(),
            timestamp: chrono::Utc::now().timestamp_millis().max(0) as u64,
            delta,
        }
    }
}

/// Append-only record of committed deltas, written before they are applied
pub trait LedgerJournal: Send + Sync {
    /// Initialize the journal
    ///
    /// # Parameters
    /// * `path` - The file path for the journal
    fn init(&self, path: &Path) -> LedgerResult<()>;

    /// Append a committed operation
    fn record(&self, entry: &JournalEntry) -> LedgerResult<()>;

    /// Iterate over all recorded entries in order
    fn entries(&self) -> Box<dyn Iterator<Item = LedgerResult<JournalEntry>> + '_>;

    /// Rebuild the ledger by applying every recorded delta to an empty state
    fn replay(&self) -> LedgerResult<LedgerState> {
        let mut state = LedgerState::new();
        let mut expected = 0u64;

        for entry in self.entries() {
            let entry = entry.map_err(|e| {
                LedgerError::Journal(format!("failed to read journal entry {}: {}", expected, e))
            })?;
            if entry.sequence != expected {
                return Err(LedgerError::Journal(format!(
                    "expected sequence {}, found {}",
                    expected, entry.sequence
                )));
            }
            state.apply(&entry.delta);
            expected += 1;
        }

        debug!("replayed {} journal entries", expected);
        Ok(state)
    }
}

/// Size of the length prefix in front of every entry
const FRAME_HEADER_LEN: u64 = 8;

/// A file-based journal of length-prefixed bincode entries
pub struct FileLedgerJournal {
    /// Path to the journal file
    path: Arc<Mutex<PathBuf>>,

    /// File handle for writing
    file: Arc<Mutex<Option<BufWriter<File>>>>,

    /// End of the last complete entry in the file
    end: Arc<Mutex<u64>>,
}

impl FileLedgerJournal {
    pub fn new() -> Self {
        Self {
            path: Arc::new(Mutex::new(PathBuf::new())),
            file: Arc::new(Mutex::new(None)),
            end: Arc::new(Mutex::new(0)),
        }
    }

    /// Create a journal and initialize it at `path`
    pub fn open(path: &Path) -> LedgerResult<Self> {
        let journal = Self::new();
        journal.init(path)?;
        Ok(journal)
    }

    fn encode_frame(entry: &JournalEntry) -> LedgerResult<Vec<u8>> {
        let serialized = bincode::serialize(entry)?;
        let mut frame = Vec::with_capacity(FRAME_HEADER_LEN as usize + serialized.len());
        frame.extend_from_slice(&(serialized.len() as u64).to_le_bytes());
        frame.extend_from_slice(&serialized);
        Ok(frame)
    }

    /// Length of the longest prefix of `file` made of complete entries
    fn complete_frames_len(file: &File) -> LedgerResult<u64> {
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::Start(0))?;

        let mut offset = 0u64;
        while file_len - offset >= FRAME_HEADER_LEN {
            let mut len_buf = [0u8; 8];
            reader.read_exact(&mut len_buf)?;
            let entry_len = u64::from_le_bytes(len_buf);
            if entry_len > file_len - offset - FRAME_HEADER_LEN {
                break;
            }
            reader.seek(SeekFrom::Current(entry_len as i64))?;
            offset += FRAME_HEADER_LEN + entry_len;
        }

        Ok(offset)
    }
}

impl Default for FileLedgerJournal {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerJournal for FileLedgerJournal {
    fn init(&self, path: &Path) -> LedgerResult<()> {
        let mut file_guard = self
            .file
            .lock()
            .map_err(|e| LedgerError::Journal(format!("Failed to acquire lock: {}", e)))?;
        let mut end_guard = self
            .end
            .lock()
            .map_err(|e| LedgerError::Journal(format!("Failed to acquire end lock: {}", e)))?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(path)
            .map_err(|e| LedgerError::Journal(format!("Failed to open journal file: {}", e)))?;

        // Cut off a partial entry left by an interrupted append
        let complete = Self::complete_frames_len(&file)?;
        let file_len = file.metadata()?.len();
        if complete < file_len {
            warn!(
                "truncating {} trailing bytes from journal {}",
                file_len - complete,
                path.display()
            );
            file.set_len(complete)?;
        }

        *file_guard = Some(BufWriter::new(file));
        *end_guard = complete;

        let mut path_guard = self
            .path
            .lock()
            .map_err(|e| LedgerError::Journal(format!("Failed to acquire path lock: {}", e)))?;
        *path_guard = path.to_path_buf();

        Ok(())
    }

    fn record(&self, entry: &JournalEntry) -> LedgerResult<()> {
        let mut file_guard = self
            .file
            .lock()
            .map_err(|e| LedgerError::Journal(format!("Failed to acquire lock: {}", e)))?;
        let mut end_guard = self
            .end
            .lock()
            .map_err(|e| LedgerError::Journal(format!("Failed to acquire end lock: {}", e)))?;
        let end = *end_guard;

        let writer = file_guard
            .as_mut()
            .ok_or_else(|| LedgerError::Journal("Journal has not been initialized".to_string()))?;

        let frame = Self::encode_frame(entry)?;

        let on_disk = writer.get_ref().metadata()?.len();
        if on_disk < end {
            return Err(LedgerError::Journal(format!(
                "journal shrank to {} bytes, expected at least {}",
                on_disk, end
            )));
        }
        if on_disk > end {
            warn!("discarding {} bytes after the last journal entry", on_disk - end);
            writer.get_mut().set_len(end)?;
        }

        // The length prefix and the entry go out as a single write
        let written = writer.write_all(&frame).and_then(|_| writer.flush());
        if let Err(e) = written {
            // Drop the buffered remainder and any partial frame on disk
            if let Some(writer) = file_guard.take() {
                let (file, _) = writer.into_parts();
                file.set_len(end)?;
                *file_guard = Some(BufWriter::new(file));
            }
            return Err(LedgerError::Journal(format!(
                "failed to append entry {}: {}",
                entry.sequence, e
            )));
        }

        *end_guard = end + frame.len() as u64;
        Ok(())
    }

    fn entries(&self) -> Box<dyn Iterator<Item = LedgerResult<JournalEntry>> + '_> {
        let path = match self.path.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => return Box::new(std::iter::empty()),
        };

        let opened = File::open(&path).and_then(|file| {
            let remaining = file.metadata()?.len();
            Ok((file, remaining))
        });

        match opened {
            Ok((file, remaining)) => Box::new(JournalEntryIterator {
                reader: BufReader::new(file),
                remaining,
                failed: false,
            }),
            Err(e) => {
                warn!("cannot open journal {}: {}", path.display(), e);
                Box::new(std::iter::empty())
            }
        }
    }
}

/// Iterator over journal entries
struct JournalEntryIterator {
    reader: BufReader<File>,

    /// Bytes not yet consumed
    remaining: u64,

    /// Set after the first error; nothing past a bad frame is trusted
    failed: bool,
}

impl JournalEntryIterator {
    fn read_entry(&mut self) -> Option<LedgerResult<JournalEntry>> {
        let mut len_buf = [0u8; 8];
        match self.reader.read_exact(&mut len_buf) {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return None,
            Err(e) => return Some(Err(LedgerError::from(e))),
        }
        self.remaining = self.remaining.saturating_sub(FRAME_HEADER_LEN);

        let entry_len = u64::from_le_bytes(len_buf);
        if entry_len > self.remaining {
            return Some(Err(LedgerError::Journal(format!(
                "entry of {} bytes exceeds the {} bytes left in the journal",
                entry_len, self.remaining
            ))));
        }

        let mut entry_data = vec![0u8; entry_len as usize];
        if let Err(e) = self.reader.read_exact(&mut entry_data) {
            return Some(Err(LedgerError::Journal(format!("truncated entry: {}", e))));
        }
        self.remaining -= entry_len;

        Some(bincode::deserialize(&entry_data).map_err(LedgerError::from))
    }
}

impl Iterator for JournalEntryIterator {
    type Item = LedgerResult<JournalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.read_entry();
        if matches!(item, Some(Err(_))) {
            self.failed = true;
        }
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{LedgerRead, LedgerWrite};
    use shade_core::id::{HashKey, TokenId};
    use tempfile::tempdir;

    fn mint_delta(state: &LedgerState, token: u64, owner: HashKey) -> LedgerDelta {
        let mut tx = state.begin();
        tx.set_owner(TokenId::new(token), owner);
        tx.increment_balance(&owner).unwrap();
        tx.into_delta()
    }

    #[test]
    fn test_journal_replay_rebuilds_state() {
        let temp_dir = tempdir().unwrap();
        let journal_path = temp_dir.path().join("ledger.journal");
        let journal = FileLedgerJournal::open(&journal_path).unwrap();

        let owner = HashKey::new([1; 32]);
        let mut state = LedgerState::new();

        for (sequence, token) in [1u64, 2].into_iter().enumerate() {
            let delta = mint_delta(&state, token, owner);
            journal
                .record(&JournalEntry::new(sequence as u64, "mint", delta.clone()))
                .unwrap();
            state.apply(&delta);
        }

        let entries: Vec<_> = journal.entries().collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].operation, "mint");

        let replayed = journal.replay().unwrap();
        assert_eq!(replayed, state);
        assert_eq!(replayed.balance_of(&owner), 2);
    }

    #[test]
    fn test_replay_rejects_gaps() {
        let temp_dir = tempdir().unwrap();
        let journal = FileLedgerJournal::open(&temp_dir.path().join("gap.journal")).unwrap();

        let delta = mint_delta(&LedgerState::new(), 1, HashKey::new([1; 32]));
        journal.record(&JournalEntry::new(3, "mint", delta)).unwrap();

        assert!(matches!(journal.replay(), Err(LedgerError::Journal(_))));
    }

    #[test]
    fn test_record_requires_init() {
        let journal = FileLedgerJournal::new();
        let entry = JournalEntry::new(0, "mint", LedgerDelta::default());
        assert!(journal.record(&entry).is_err());
    }

    fn append_raw(path: &Path, bytes: &[u8]) {
        let mut file = OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(bytes).unwrap();
    }

    #[test]
    fn test_partial_entry_is_discarded_on_next_record() {
        let temp_dir = tempdir().unwrap();
        let journal_path = temp_dir.path().join("torn.journal");
        let journal = FileLedgerJournal::open(&journal_path).unwrap();
        let owner = HashKey::new([1; 32]);

        let first = mint_delta(&LedgerState::new(), 1, owner);
        journal.record(&JournalEntry::new(0, "mint", first.clone())).unwrap();

        // A length prefix with no entry behind it, as an interrupted append leaves
        append_raw(&journal_path, &100u64.to_le_bytes());

        let state = LedgerState::new().with_delta(&first);
        let second = mint_delta(&state, 2, owner);
        journal.record(&JournalEntry::new(1, "mint", second.clone())).unwrap();

        let replayed = journal.replay().unwrap();
        assert_eq!(replayed, state.with_delta(&second));
        assert_eq!(replayed.balance_of(&owner), 2);
    }

    #[test]
    fn test_partial_entry_is_truncated_on_open() {
        let temp_dir = tempdir().unwrap();
        let journal_path = temp_dir.path().join("reopen.journal");
        let owner = HashKey::new([1; 32]);
        let delta = mint_delta(&LedgerState::new(), 1, owner);

        {
            let journal = FileLedgerJournal::open(&journal_path).unwrap();
            journal.record(&JournalEntry::new(0, "mint", delta.clone())).unwrap();
        }
        let complete_len = std::fs::metadata(&journal_path).unwrap().len();
        append_raw(&journal_path, &[7, 0, 0]);

        let journal = FileLedgerJournal::open(&journal_path).unwrap();
        assert_eq!(std::fs::metadata(&journal_path).unwrap().len(), complete_len);
        assert_eq!(journal.replay().unwrap(), LedgerState::new().with_delta(&delta));
    }

    #[test]
    fn test_oversized_length_prefix_is_an_error() {
        let temp_dir = tempdir().unwrap();
        let journal_path = temp_dir.path().join("corrupt.journal");
        let journal = FileLedgerJournal::open(&journal_path).unwrap();

        append_raw(&journal_path, &u64::MAX.to_le_bytes());

        assert!(matches!(journal.replay(), Err(LedgerError::Journal(_))));
        let results: Vec<_> = journal.entries().collect();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }

    #[test]
    fn test_undecodable_entry_is_a_journal_error() {
        let temp_dir = tempdir().unwrap();
        let journal_path = temp_dir.path().join("garbage.journal");
        let journal = FileLedgerJournal::open(&journal_path).unwrap();

        let mut frame = 4u64.to_le_bytes().to_vec();
        frame.extend_from_slice(&[0xff; 4]);
        append_raw(&journal_path, &frame);

        assert!(matches!(journal.replay(), Err(LedgerError::Journal(_))));
    }
}
