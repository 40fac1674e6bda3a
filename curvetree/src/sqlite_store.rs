//! SQLite-backed [`KvStore`] for persistent curve tree storage.
//!
//! All records live in one `curve_tree_kv` table keyed by the byte keys of
//! [`KvTreeStore`](crate::kv_store::KvTreeStore), so the store can coexist
//! in any existing SQLite database.
//!
//! # Connection modes
//!
//! - **Owned**: [`SqliteKvStore::new`] takes ownership of a `Connection`.
//! - **Shared**: [`SqliteKvStore::new_shared`] shares an
//!   `Arc<Mutex<Connection>>` with other components; the mutex is held for
//!   each individual SQL operation, so concurrent readers observe either
//!   the pre-batch or the fully committed state.

use std::sync::{Arc, Mutex};

use rusqlite::{Connection, OptionalExtension, params};

use crate::error::CurveTreeError;
use crate::kv_store::{BatchOp, KvStore};

/// How the store accesses the SQLite connection.
enum ConnectionHolder {
    /// The store owns the connection exclusively.
    Owned(Connection),
    /// The store shares the connection with other components.
    Shared(Arc<Mutex<Connection>>),
}

/// SQLite-backed implementation of [`KvStore`].
pub struct SqliteKvStore {
    holder: ConnectionHolder,
}

impl SqliteKvStore {
    /// Create a store that owns the given connection.
    ///
    /// Creates the backing table if it does not already exist.
    pub fn new(conn: Connection) -> Result<Self, CurveTreeError> {
        create_table(&conn)?;
        Ok(Self {
            holder: ConnectionHolder::Owned(conn),
        })
    }

    /// Create a store that shares a connection via `Arc<Mutex<Connection>>`.
    ///
    /// Creates the backing table if it does not already exist.
    pub fn new_shared(conn: Arc<Mutex<Connection>>) -> Result<Self, CurveTreeError> {
        {
            let guard = conn.lock().expect("connection mutex poisoned");
            create_table(&guard)?;
        }
        Ok(Self {
            holder: ConnectionHolder::Shared(conn),
        })
    }

    /// Open (or create) a database file and own its connection.
    pub fn open(path: &std::path::Path) -> Result<Self, CurveTreeError> {
        let conn = Connection::open(path)?;
        Self::new(conn)
    }

    /// Execute a closure with a reference to the underlying connection.
    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> T) -> T {
        match &self.holder {
            ConnectionHolder::Owned(conn) => f(conn),
            ConnectionHolder::Shared(arc) => {
                let guard = arc.lock().expect("connection mutex poisoned");
                f(&guard)
            }
        }
    }
}

fn create_table(conn: &Connection) -> Result<(), CurveTreeError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS curve_tree_kv (
            key   BLOB PRIMARY KEY,
            value BLOB NOT NULL
        );",
    )?;
    Ok(())
}

impl KvStore for SqliteKvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, CurveTreeError> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT value FROM curve_tree_kv WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(row)
        })
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), CurveTreeError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO curve_tree_kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
            Ok(())
        })
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), CurveTreeError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM curve_tree_kv WHERE key = ?1", params![key])?;
            Ok(())
        })
    }

    fn prefix_iter(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, CurveTreeError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT key, value FROM curve_tree_kv
                 WHERE key >= ?1 AND substr(key, 1, ?2) = ?1
                 ORDER BY key",
            )?;
            let rows = stmt.query_map(params![prefix, prefix.len() as i64], |row| {
                Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, Vec<u8>>(1)?))
            })?;
            let mut entries = Vec::new();
            for row in rows {
                entries.push(row?);
            }
            Ok(entries)
        })
    }

    fn apply_batch(&mut self, ops: Vec<BatchOp>) -> Result<(), CurveTreeError> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            for op in &ops {
                match op {
                    BatchOp::Put { key, value } => {
                        tx.execute(
                            "INSERT INTO curve_tree_kv (key, value) VALUES (?1, ?2)
                             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                            params![key, value],
                        )?;
                    }
                    BatchOp::Delete { key } => {
                        tx.execute("DELETE FROM curve_tree_kv WHERE key = ?1", params![key])?;
                    }
                }
            }
            tx.commit()?;
            Ok(())
        })
    }
}
