//! Connection pool: one write connection plus a round-robin read pool.
//! In-memory mode routes reads through the writer, because in-memory read
//! connections would be isolated databases.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use rusqlite::Connection;

use engram_core::errors::EngramResult;

use super::pragmas::{apply_pragmas, apply_read_pragmas};
use super::to_query_err;

const DEFAULT_READ_POOL_SIZE: usize = 4;
const MAX_READ_POOL_SIZE: usize = 8;

pub struct ConnectionPool {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    next_reader: AtomicUsize,
    pub db_path: Option<PathBuf>,
}

impl ConnectionPool {
    /// Open a file-backed pool.
    pub fn open(path: &Path, read_pool_size: usize) -> EngramResult<Self> {
        let writer = Connection::open(path).map_err(to_query_err)?;
        apply_pragmas(&writer)?;

        let size = read_pool_size.clamp(1, MAX_READ_POOL_SIZE);
        let mut readers = Vec::with_capacity(size);
        for _ in 0..size {
            let conn = Connection::open_with_flags(
                path,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .map_err(to_query_err)?;
            apply_read_pragmas(&conn)?;
            readers.push(Mutex::new(conn));
        }

        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            next_reader: AtomicUsize::new(0),
            db_path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory pool (for testing). Reads share the writer.
    pub fn open_in_memory() -> EngramResult<Self> {
        let writer = Connection::open_in_memory().map_err(to_query_err)?;
        apply_read_pragmas(&writer)?;
        Ok(Self {
            writer: Mutex::new(writer),
            readers: Vec::new(),
            next_reader: AtomicUsize::new(0),
            db_path: None,
        })
    }

    pub fn default_read_pool_size() -> usize {
        DEFAULT_READ_POOL_SIZE
    }

    /// Execute a closure on the write connection.
    pub fn with_write<T>(
        &self,
        f: impl FnOnce(&Connection) -> EngramResult<T>,
    ) -> EngramResult<T> {
        let guard = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        f(&guard)
    }

    /// Execute a closure on the best read connection: round-robin over the
    /// read pool when file-backed, the writer otherwise.
    pub fn with_read<T>(&self, f: impl FnOnce(&Connection) -> EngramResult<T>) -> EngramResult<T> {
        if self.readers.is_empty() {
            return self.with_write(f);
        }
        let idx = self.next_reader.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let guard = self.readers[idx].lock().unwrap_or_else(|e| e.into_inner());
        f(&guard)
    }
}
