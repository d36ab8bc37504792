//! On-disk format and whole-file I/O.
//!
//! The database is one JSON document holding every collection. Reads
//! deserialize the full file; writes serialize the full snapshot to a sibling
//! temp file, fsync it and rename it over the original, so a crash mid-write
//! leaves the previous document intact.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::models::{MessageRecord, UserRecord};

/// Last id issued per collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sequences {
    pub messages: u64,
    pub users: u64,
}

impl Sequences {
    pub fn next_message(&mut self) -> u64 {
        self.messages += 1;
        self.messages
    }

    pub fn next_user(&mut self) -> u64 {
        self.users += 1;
        self.users
    }
}

/// Every collection and index, mirrored 1:1 to the database file.
/// Missing keys read as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub messages: BTreeMap<u64, MessageRecord>,
    pub users: BTreeMap<u64, UserRecord>,
    /// Normalized email -> user id.
    pub emails: BTreeMap<String, u64>,
    /// Revoked token -> revocation time.
    pub revocations: BTreeMap<String, DateTime<Utc>>,
    pub sequences: Sequences,
}

impl Snapshot {
    /// Counters to resume from: the persisted high-water marks, raised to the
    /// largest id actually present in case the file was written without them.
    pub fn high_water(&self) -> Sequences {
        let max_message = self.messages.keys().next_back().copied().unwrap_or(0);
        let max_user = self.users.keys().next_back().copied().unwrap_or(0);
        Sequences {
            messages: self.sequences.messages.max(max_message),
            users: self.sequences.users.max(max_user),
        }
    }
}

/// Write an empty snapshot if nothing exists at `path`. Existing content,
/// valid or not, is left alone.
pub fn initialize(path: &Path) -> Result<()> {
    match fs::metadata(path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
            }
            persist(path, &Snapshot::default())
        }
        Err(e) => Err(StoreError::io(path, e)),
    }
}

/// Read and decode the whole file. A missing file is an I/O error here;
/// only [`initialize`] treats absence as a fresh database.
pub fn load(path: &Path) -> Result<Snapshot> {
    let bytes = fs::read(path).map_err(|e| StoreError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| StoreError::format(path, e))
}

/// Replace the file with `snapshot`.
pub fn persist(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let payload = serde_json::to_vec(snapshot).map_err(|e| StoreError::format(path, e))?;

    let temp = temp_path(path);
    if let Err(e) = write_and_rename(&temp, path, &payload) {
        let _ = fs::remove_file(&temp);
        return Err(StoreError::io(path, e));
    }
    Ok(())
}

fn write_and_rename(temp: &Path, path: &Path, payload: &[u8]) -> io::Result<()> {
    let mut file = File::create(temp)?;
    file.write_all(payload)?;
    file.sync_all()?;
    drop(file);
    fs::rename(temp, path)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("database"));
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn db_path(dir: &TempDir) -> PathBuf {
        dir.path().join("database.json")
    }

    #[test]
    fn initialize_creates_empty_document() {
        let dir = TempDir::new().unwrap();
        let path = db_path(&dir);

        initialize(&path).unwrap();

        assert_eq!(load(&path).unwrap(), Snapshot::default());
    }

    #[test]
    fn initialize_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/deeper/database.json");

        initialize(&path).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn initialize_leaves_existing_content_alone() {
        let dir = TempDir::new().unwrap();
        let path = db_path(&dir);
        fs::write(&path, b"not json").unwrap();

        initialize(&path).unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"not json");
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = load(&db_path(&dir)).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }), "{err}");
    }

    #[test]
    fn load_malformed_file_is_format_error() {
        let dir = TempDir::new().unwrap();
        let path = db_path(&dir);

        fs::write(&path, b"{\"messages\": [").unwrap();
        assert!(matches!(load(&path), Err(StoreError::Format { .. })));

        fs::write(&path, b"").unwrap();
        assert!(matches!(load(&path), Err(StoreError::Format { .. })));
    }

    #[test]
    fn missing_collections_read_as_empty() {
        let dir = TempDir::new().unwrap();
        let path = db_path(&dir);
        fs::write(&path, br#"{"emails": {"a@b.com": 1}}"#).unwrap();

        let snapshot = load(&path).unwrap();

        assert!(snapshot.messages.is_empty());
        assert_eq!(snapshot.emails.get("a@b.com"), Some(&1));
        assert_eq!(snapshot.sequences, Sequences::default());
    }

    #[test]
    fn persist_writes_documented_layout() {
        let dir = TempDir::new().unwrap();
        let path = db_path(&dir);

        let mut snapshot = Snapshot::default();
        snapshot.messages.insert(
            7,
            MessageRecord {
                id: 7,
                author_id: 1,
                body: "hi".into(),
            },
        );
        snapshot.emails.insert("a@b.com".into(), 1);
        snapshot.sequences.messages = 7;
        persist(&path, &snapshot).unwrap();

        let doc: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(doc["messages"]["7"]["body"], "hi");
        assert_eq!(doc["emails"]["a@b.com"], 1);
        assert_eq!(doc["sequences"]["messages"], 7);
        assert!(doc["revocations"].as_object().unwrap().is_empty());

        assert_eq!(load(&path).unwrap(), snapshot);
    }

    #[test]
    fn persist_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = db_path(&dir);

        persist(&path, &Snapshot::default()).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![OsString::from("database.json")]);
    }

    #[test]
    fn failed_persist_keeps_previous_document() {
        let dir = TempDir::new().unwrap();
        let path = db_path(&dir);
        let mut snapshot = Snapshot::default();
        snapshot.emails.insert("a@b.com".into(), 1);
        persist(&path, &snapshot).unwrap();

        // A directory squatting on the temp path makes the write fail.
        fs::create_dir(temp_path(&path)).unwrap();
        let err = persist(&path, &Snapshot::default()).unwrap_err();

        assert!(matches!(err, StoreError::Io { .. }));
        assert_eq!(load(&path).unwrap(), snapshot);
    }

    #[test]
    fn high_water_takes_the_larger_of_counter_and_ids() {
        let mut snapshot = Snapshot::default();
        snapshot.users.insert(
            4,
            UserRecord {
                id: 4,
                email: "x@y.z".into(),
                is_privileged: false,
                password_hash: String::new(),
            },
        );
        snapshot.sequences = Sequences {
            messages: 9,
            users: 2,
        };

        assert_eq!(
            snapshot.high_water(),
            Sequences {
                messages: 9,
                users: 4
            }
        );
    }
}
