//! Durable snapshot storage behind the bill store and network registry.
//!
//! Both services treat storage as a full-state blob store: every successful
//! mutation rewrites the whole snapshot, and startup reads it back once.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;
use rusqlite::Connection;

use crate::db::{self, BILLS_KEY, NETWORKS_KEY};
use crate::error::{BillError, Result};
use crate::models::BillRecord;
use crate::registry::NetworkConfig;

pub trait BillStorage: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet.
    fn load_all(&self) -> Result<Option<Vec<BillRecord>>>;
    fn save_all(&self, records: &[BillRecord]) -> Result<()>;
}

pub trait ConfigStorage: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet.
    fn load_config(&self) -> Result<Option<Vec<NetworkConfig>>>;
    fn save_config(&self, networks: &[NetworkConfig]) -> Result<()>;
}

/// JSON snapshots in the `snapshots` table of one SQLite database.
#[derive(Clone)]
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = db::get_connection(db_path)?;
        db::init_db(&conn)?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| BillError::Storage("database connection lock poisoned".to_string()))
    }

    fn load<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let conn = self.lock()?;
        let Some(payload) = db::read_snapshot(&conn, key)? else {
            return Ok(None);
        };
        debug!("Loaded '{key}' snapshot ({} bytes)", payload.len());
        serde_json::from_str(&payload)
            .map(Some)
            .map_err(|e| BillError::Storage(format!("corrupt '{key}' snapshot: {e}")))
    }

    fn save<T: serde::Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let payload = serde_json::to_string(value)?;
        let conn = self.lock()?;
        db::write_snapshot(&conn, key, &payload)?;
        debug!("Saved '{key}' snapshot ({} bytes)", payload.len());
        Ok(())
    }
}

impl BillStorage for SqliteStorage {
    fn load_all(&self) -> Result<Option<Vec<BillRecord>>> {
        self.load(BILLS_KEY)
    }

    fn save_all(&self, records: &[BillRecord]) -> Result<()> {
        self.save(BILLS_KEY, records)
    }
}

impl ConfigStorage for SqliteStorage {
    fn load_config(&self) -> Result<Option<Vec<NetworkConfig>>> {
        self.load(NETWORKS_KEY)
    }

    fn save_config(&self, networks: &[NetworkConfig]) -> Result<()> {
        self.save(NETWORKS_KEY, networks)
    }
}


#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::quarters::SeedPattern;

    fn test_storage() -> (tempfile::TempDir, SqliteStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = SqliteStorage::open(&dir.path().join("test.db")).unwrap();
        (dir, storage)
    }

    #[test]
    fn test_empty_database_has_no_state() {
        let (_dir, storage) = test_storage();
        assert!(storage.load_all().unwrap().is_none());
        assert!(storage.load_config().unwrap().is_none());
    }

    #[test]
    fn test_bills_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let mut record = BillRecord::new("ILL", "RELIANCE JIO INFOCOMM LTD", Decimal::new(5000, 0));
        record.serial_no = 1;
        SqliteStorage::open(&path).unwrap().save_all(&[record.clone()]).unwrap();

        let loaded = SqliteStorage::open(&path).unwrap().load_all().unwrap().unwrap();
        assert_eq!(loaded, vec![record]);
    }

    #[test]
    fn test_networks_roundtrip() {
        let (_dir, storage) = test_storage();
        let network = NetworkConfig::new("BSNL", ["BSNL Vendor"], SeedPattern::FiscalHalves.config());
        storage.save_config(&[network.clone()]).unwrap();
        assert_eq!(storage.load_config().unwrap(), Some(vec![network]));
    }

    #[test]
    fn test_corrupt_snapshot_is_storage_error() {
        let (_dir, storage) = test_storage();
        {
            let conn = storage.lock().unwrap();
            db::write_snapshot(&conn, BILLS_KEY, "{not json").unwrap();
        }
        match storage.load_all() {
            Err(BillError::Storage(msg)) => assert!(msg.contains("bills")),
            other => panic!("expected storage error, got {other:?}"),
        }
    }
}
