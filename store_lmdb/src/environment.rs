//! LMDB environment setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::account::LmdbSubscriptionStore;
use crate::journal::LmdbTransferJournal;
use crate::meta::LmdbMetaStore;
use crate::LmdbError;

pub(crate) const ACCOUNTS_DB: &str = "accounts";
pub(crate) const META_DB: &str = "meta";
pub(crate) const TRANSFERS_DB: &str = "transfers";

const MAX_DBS: u32 = 4;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    path: PathBuf,
    pub(crate) accounts_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
    pub(crate) transfers_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    ///
    /// Creates the directory and all databases on first use, then brings the
    /// schema version up to date.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment is opened once per process and the data
        // directory is not modified by anything other than LMDB itself.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let accounts_db: Database<Bytes, Bytes> =
            env.create_database(&mut wtxn, Some(ACCOUNTS_DB))?;
        let meta_db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some(META_DB))?;
        let transfers_db: Database<Bytes, Bytes> =
            env.create_database(&mut wtxn, Some(TRANSFERS_DB))?;
        wtxn.commit()?;

        let environment = Self {
            env: Arc::new(env),
            path: path.to_path_buf(),
            accounts_db,
            meta_db,
            transfers_db,
        };
        environment.meta_store().ensure_schema()?;

        tracing::info!(path = %path.display(), map_size, "opened LMDB environment");
        Ok(environment)
    }

    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Account records and global configuration, committing transfers into the journal.
    pub fn subscription_store(&self) -> LmdbSubscriptionStore {
        LmdbSubscriptionStore::new(
            Arc::clone(&self.env),
            self.accounts_db,
            self.meta_db,
            self.transfers_db,
        )
    }

    /// Settlement journal, usable as the ledger's custody backend.
    pub fn transfer_journal(&self) -> LmdbTransferJournal {
        LmdbTransferJournal::new(Arc::clone(&self.env), self.transfers_db)
    }

    pub fn meta_store(&self) -> LmdbMetaStore {
        LmdbMetaStore {
            env: Arc::clone(&self.env),
            meta_db: self.meta_db,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_directory_and_sets_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger");
        let env = LmdbEnvironment::open(&path, 16 * 1024 * 1024).unwrap();
        assert!(path.join("data.mdb").exists());
        assert_eq!(
            env.meta_store().get_schema_version().unwrap(),
            crate::CURRENT_SCHEMA_VERSION
        );
    }
}
