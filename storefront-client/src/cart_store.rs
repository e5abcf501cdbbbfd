//! redb-based cart identifier store
//!
//! One opaque cart id per location, under `<prefix>:<locationId>`. This is the
//! only client state that outlives the process. Fallback carts are never
//! written here.
//!
//! # Tables
//!
//! | Table | Key | Value |
//! |-------|-----|-------|
//! | `cart_ids` | `<prefix>:<location_id>` | cart id |

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, TableDefinition};
use thiserror::Error;

use crate::error::ClientError;

/// Table for cart ids: key = namespaced location id, value = cart id
const CART_IDS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("cart_ids");

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),
}

impl From<StorageError> for ClientError {
    fn from(err: StorageError) -> Self {
        ClientError::Storage(err.to_string())
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Clone)]
enum Backend {
    Durable(Arc<Database>),
    /// No durable storage available; reads miss, writes are dropped
    Unavailable,
}

/// Persisted cart id per location
#[derive(Clone)]
pub struct CartIdStore {
    backend: Backend,
    prefix: String,
}

impl std::fmt::Debug for CartIdStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartIdStore")
            .field("prefix", &self.prefix)
            .field("durable", &self.is_durable())
            .finish()
    }
}

impl CartIdStore {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>, prefix: impl Into<String>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db, prefix)
    }

    /// Open an in-memory database
    pub fn open_in_memory(prefix: impl Into<String>) -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db, prefix)
    }

    /// A store for environments without durable storage
    pub fn unavailable(prefix: impl Into<String>) -> Self {
        Self {
            backend: Backend::Unavailable,
            prefix: prefix.into(),
        }
    }

    fn init(db: Database, prefix: impl Into<String>) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(CART_IDS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self {
            backend: Backend::Durable(Arc::new(db)),
            prefix: prefix.into(),
        })
    }

    pub fn is_durable(&self) -> bool {
        matches!(self.backend, Backend::Durable(_))
    }

    /// Namespaced key of a location
    pub fn key_for(&self, location_id: &str) -> String {
        format!("{}:{}", self.prefix, location_id)
    }

    /// Persisted cart id of a location. Storage failures read as absence.
    pub fn get(&self, location_id: &str) -> Option<String> {
        match self.try_get(location_id) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(location_id = %location_id, error = %e, "Failed to read persisted cart id");
                None
            }
        }
    }

    fn try_get(&self, location_id: &str) -> StorageResult<Option<String>> {
        let Backend::Durable(db) = &self.backend else {
            return Ok(None);
        };
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(CART_IDS_TABLE)?;
        let key = self.key_for(location_id);
        Ok(table.get(key.as_str())?.map(|guard| guard.value().to_string()))
    }

    /// Persist (`Some`) or clear (`None`) the cart id of a location.
    /// The write is committed before this returns.
    pub fn set(&self, location_id: &str, cart_id: Option<&str>) -> StorageResult<()> {
        let Backend::Durable(db) = &self.backend else {
            return Ok(());
        };
        let key = self.key_for(location_id);
        let write_txn = db.begin_write()?;
        {
            let mut table = write_txn.open_table(CART_IDS_TABLE)?;
            match cart_id {
                Some(id) => {
                    table.insert(key.as_str(), id)?;
                }
                None => {
                    table.remove(key.as_str())?;
                }
            }
        }
        write_txn.commit()?;
        tracing::debug!(location_id = %location_id, cart_id = ?cart_id, "Persisted cart id");
        Ok(())
    }
}
