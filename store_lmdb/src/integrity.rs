//! LMDB database integrity checks.
//!
//! Run on startup to detect corruption early, before the ledger begins
//! serving calls.

use std::path::Path;

use heed::types::Bytes;
use subledger_store::{AccountRecord, TransferRecord};

use crate::environment::{ACCOUNTS_DB, META_DB, TRANSFERS_DB};
use crate::{LmdbEnvironment, LmdbError};

/// Summary of an integrity check run.
#[derive(Debug, Default)]
pub struct IntegrityReport {
    pub databases_checked: u32,
    pub total_entries: u64,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    /// Returns `true` if no errors were detected.
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }
}

const EXPECTED_DATABASES: &[&str] = &[ACCOUNTS_DB, META_DB, TRANSFERS_DB];

/// Check LMDB database integrity on startup.
///
/// Counts the entries of each expected database and decodes every account and
/// transfer record. Failures are recorded in the report rather than causing a
/// hard error.
pub fn check_integrity(environment: &LmdbEnvironment) -> Result<IntegrityReport, LmdbError> {
    let mut report = IntegrityReport::default();
    let env = environment.env();
    let rtxn = env.read_txn()?;

    for &db_name in EXPECTED_DATABASES {
        match env.open_database::<Bytes, Bytes>(&rtxn, Some(db_name)) {
            Ok(Some(db)) => {
                report.databases_checked += 1;
                match db.len(&rtxn) {
                    Ok(count) => report.total_entries += count,
                    Err(e) => report
                        .errors
                        .push(format!("failed to read database '{}': {}", db_name, e)),
                }
            }
            Ok(None) => report
                .errors
                .push(format!("database '{}' is missing", db_name)),
            Err(e) => report
                .errors
                .push(format!("failed to open database '{}': {}", db_name, e)),
        }
    }

    for item in environment.accounts_db.iter(&rtxn)? {
        let (key, value) = item?;
        if bincode::deserialize::<AccountRecord>(value).is_err() {
            report.errors.push(format!(
                "undecodable account record for '{}'",
                String::from_utf8_lossy(key)
            ));
        }
    }

    for item in environment.transfers_db.iter(&rtxn)? {
        let (key, value) = item?;
        if key.len() != 8 || bincode::deserialize::<TransferRecord>(value).is_err() {
            report
                .errors
                .push(format!("undecodable transfer record at key {:02x?}", key));
        }
    }

    Ok(report)
}

/// Check if the LMDB data directory looks valid before opening.
///
/// A missing or empty directory is a fresh start. A populated directory without
/// `data.mdb` suggests corruption or a mistyped path.
pub fn check_data_dir(path: &Path) -> Result<(), String> {
    if !path.exists() {
        return Ok(());
    }
    let populated = std::fs::read_dir(path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?
        .next()
        .is_some();
    if populated && !path.join("data.mdb").exists() {
        return Err(format!(
            "directory {} is not empty but data.mdb is missing",
            path.display()
        ));
    }
    Ok(())
}
