//! Single-file JSON record store for messages, users and revoked tokens.
//!
//! Every operation round-trips the whole snapshot through [`snapshot`].
//! Readers share one `RwLock`; writers hold it exclusively across
//! load, mutate and persist, so concurrent writers cannot lose each other's
//! changes. The store never logs; callers decide what to report.

pub mod error;
pub mod models;
pub mod password;
pub mod queries;
pub mod snapshot;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

pub use error::{Result, StoreError};
pub use models::{SortOrder, UserChanges};
pub use password::PasswordPolicy;

use snapshot::{Sequences, Snapshot};

pub struct Database {
    path: PathBuf,
    policy: PasswordPolicy,
    /// Id counters for this process. The lock also serializes access to the
    /// file itself.
    sequences: RwLock<Sequences>,
    /// Verified against when a login names an unknown email, so both failure
    /// paths pay the same Argon2 cost.
    decoy_hash: String,
}

/// What a mutation closure did, so no-ops skip the rewrite.
pub(crate) enum Outcome<T> {
    Changed(T),
    Unchanged(T),
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, PasswordPolicy::default())
    }

    pub fn open_with(path: impl AsRef<Path>, policy: PasswordPolicy) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        snapshot::initialize(&path)?;
        let sequences = snapshot::load(&path)?.high_water();
        let decoy_hash = password::hash_password(&policy, "chirpy-decoy")?;

        Ok(Self {
            path,
            policy,
            sequences: RwLock::new(sequences),
            decoy_hash,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn policy(&self) -> &PasswordPolicy {
        &self.policy
    }

    /// Run `f` against the current snapshot under the shared lock.
    pub(crate) fn with_snapshot<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Snapshot) -> Result<T>,
    {
        let _guard = self.sequences.read().map_err(|_| self.poisoned())?;
        let snapshot = snapshot::load(&self.path)?;
        f(&snapshot)
    }

    /// Load, mutate and persist under the exclusive lock. Counters advanced by
    /// `f` stay advanced even if the persist fails.
    pub(crate) fn with_snapshot_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Snapshot, &mut Sequences) -> Result<Outcome<T>>,
    {
        let mut sequences = self.sequences.write().map_err(|_| self.poisoned())?;
        let mut snapshot = snapshot::load(&self.path)?;

        match f(&mut snapshot, &mut *sequences)? {
            Outcome::Unchanged(value) => Ok(value),
            Outcome::Changed(value) => {
                snapshot.sequences = *sequences;
                snapshot::persist(&self.path, &snapshot)?;
                Ok(value)
            }
        }
    }

    fn poisoned(&self) -> StoreError {
        StoreError::io(&self.path, io::Error::other("database lock poisoned"))
    }
}
