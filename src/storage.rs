// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Whole-document storage for the three ledger collections.
//!
//! Each collection is a single JSON array. Reads load the full array and
//! writes replace it; there are no partial updates and no transaction across
//! documents, so a crash between two writes can leave users and history out
//! of step.
//!
//! ```text
//! <data-dir>/users.json    → [User]
//! <data-dir>/history.json  → [HistoryEntry], newest first
//! <data-dir>/ranking.json  → [RankingEntry], highest balance first
//! ```

use crate::error::StorageError;
use crate::history::HistoryEntry;
use crate::ranking::RankingEntry;
use crate::user::User;
use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// A named ledger document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    History,
    Ranking,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Collection::Users, Collection::History, Collection::Ranking];

    pub fn file_name(&self) -> &'static str {
        match self {
            Collection::Users => "users.json",
            Collection::History => "history.json",
            Collection::Ranking => "ranking.json",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collection::Users => f.write_str("users"),
            Collection::History => f.write_str("history"),
            Collection::Ranking => f.write_str("ranking"),
        }
    }
}

/// Raw byte storage for whole documents.
pub trait DocumentStore: Send + Sync {
    /// Returns `None` if the document has never been written.
    fn read(&self, collection: Collection) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replaces the document.
    fn write(&self, collection: Collection, bytes: &[u8]) -> Result<(), StorageError>;
}

/// One JSON file per collection inside a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens `dir`, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| StorageError::Io {
            collection: Collection::Users,
            reason: format!("cannot create data directory {}: {e}", dir.display()),
        })?;
        Ok(Self { dir })
    }

    /// Opens `dir` without creating it, for read-only use.
    pub fn open_existing(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(StorageError::MissingDirectory(dir.display().to_string()));
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, collection: Collection) -> PathBuf {
        self.dir.join(collection.file_name())
    }
}

impl DocumentStore for FileStore {
    fn read(&self, collection: Collection) -> Result<Option<Vec<u8>>, StorageError> {
        match std::fs::read(self.path(collection)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io {
                collection,
                reason: e.to_string(),
            }),
        }
    }

    fn write(&self, collection: Collection, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.path(collection);
        let io_err = |e: std::io::Error| StorageError::Io {
            collection,
            reason: e.to_string(),
        };

        // Write a sibling then rename so readers never see a half-written file.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes).map_err(io_err)?;
        std::fs::rename(&tmp, &path).map_err(io_err)?;

        debug!(path = %path.display(), bytes = bytes.len(), "Document written");
        Ok(())
    }
}

/// In-process document store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: DashMap<Collection, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a document, e.g. with legacy or damaged content.
    pub fn with_document(self, collection: Collection, bytes: impl Into<Vec<u8>>) -> Self {
        self.documents.insert(collection, bytes.into());
        self
    }

    /// Current raw content of a document.
    pub fn document(&self, collection: Collection) -> Option<Vec<u8>> {
        self.documents.get(&collection).map(|d| d.value().clone())
    }
}

impl DocumentStore for MemoryStore {
    fn read(&self, collection: Collection) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.document(collection))
    }

    fn write(&self, collection: Collection, bytes: &[u8]) -> Result<(), StorageError> {
        self.documents.insert(collection, bytes.to_vec());
        Ok(())
    }
}

/// What to do with a document that exists but cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OnCorrupt {
    /// Log a warning and continue with an empty collection.
    #[default]
    TreatAsEmpty,
    /// Fail the operation.
    Fail,
}

/// Typed access to the ledger collections.
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn DocumentStore>,
    on_corrupt: OnCorrupt,
}

impl Repository {
    pub fn new(store: Arc<dyn DocumentStore>, on_corrupt: OnCorrupt) -> Self {
        Self { store, on_corrupt }
    }

    pub fn on_corrupt(&self) -> OnCorrupt {
        self.on_corrupt
    }

    pub fn load_users(&self) -> Result<Vec<User>, StorageError> {
        self.load(Collection::Users)
    }

    pub fn save_users(&self, users: &[User]) -> Result<(), StorageError> {
        self.save(Collection::Users, users)
    }

    pub fn load_history(&self) -> Result<Vec<HistoryEntry>, StorageError> {
        self.load(Collection::History)
    }

    pub fn save_history(&self, history: &[HistoryEntry]) -> Result<(), StorageError> {
        self.save(Collection::History, history)
    }

    pub fn load_ranking(&self) -> Result<Vec<RankingEntry>, StorageError> {
        self.load(Collection::Ranking)
    }

    pub fn save_ranking(&self, ranking: &[RankingEntry]) -> Result<(), StorageError> {
        self.save(Collection::Ranking, ranking)
    }

    /// Re-encodes the users document if any record only decoded through
    /// lenient coercion (for example a non-numeric `exchangedAmount`).
    ///
    /// Returns `true` if the document was rewritten.
    pub fn normalize_users(&self) -> Result<bool, StorageError> {
        let Some(bytes) = self.read_document(Collection::Users)? else {
            return Ok(false);
        };
        let raw: Value = match serde_json::from_slice(&bytes) {
            Ok(raw) => raw,
            Err(e) => return self.recover::<User>(Collection::Users, e).map(|_| false),
        };
        let users: Vec<User> = match serde_json::from_value(raw.clone()) {
            Ok(users) => users,
            Err(e) => return self.recover::<User>(Collection::Users, e).map(|_| false),
        };
        let canonical = serde_json::to_value(&users).map_err(|e| StorageError::Encode {
            collection: Collection::Users,
            reason: e.to_string(),
        })?;
        if canonical == raw {
            return Ok(false);
        }
        self.save_users(&users)?;
        Ok(true)
    }

    /// Reads a document, treating whitespace-only content as absent.
    fn read_document(&self, collection: Collection) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self
            .store
            .read(collection)?
            .filter(|bytes| !bytes.iter().all(u8::is_ascii_whitespace)))
    }

    fn load<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>, StorageError> {
        let Some(bytes) = self.read_document(collection)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_slice(&bytes) {
            Ok(items) => Ok(items),
            Err(e) => self.recover(collection, e),
        }
    }

    fn recover<T>(
        &self,
        collection: Collection,
        err: serde_json::Error,
    ) -> Result<Vec<T>, StorageError> {
        match self.on_corrupt {
            OnCorrupt::TreatAsEmpty => {
                warn!(%collection, error = %err, "Corrupt document treated as empty");
                Ok(Vec::new())
            }
            OnCorrupt::Fail => Err(StorageError::Corrupt {
                collection,
                reason: err.to_string(),
            }),
        }
    }

    fn save<T: Serialize>(&self, collection: Collection, items: &[T]) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(items).map_err(|e| StorageError::Encode {
            collection,
            reason: e.to_string(),
        })?;
        self.store.write(collection, &bytes)
    }
}
