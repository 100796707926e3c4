//! In-memory object store with failure injection, for tests and local runs.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{BlobReader, ObjectStore, StorageError, StorageResult};

#[derive(Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    fail_puts: AtomicBool,
    fail_gets: AtomicBool,
    fail_deletes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `put` fail until reset.
    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Make every `get` fail until reset.
    pub fn fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    /// Make every `delete` fail until reset.
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().map(|b| b.contains_key(key)).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> StorageResult<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.blobs
            .lock()
            .map_err(|e| StorageError::Unavailable(format!("Lock poisoned: {}", e)))
    }

    fn injected(flag: &AtomicBool, op: &str) -> StorageResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(format!("injected {} failure", op)));
        }
        Ok(())
    }
}

impl ObjectStore for MemoryStore {
    fn put(&self, key: &str, bytes: &[u8]) -> StorageResult<String> {
        Self::injected(&self.fail_puts, "put")?;
        self.lock()?.insert(key.to_string(), bytes.to_vec());
        Ok(format!("memory://{}", key))
    }

    fn get(&self, key: &str) -> StorageResult<BlobReader> {
        Self::injected(&self.fail_gets, "get")?;
        let bytes = self
            .lock()?
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        Ok(Box::new(Cursor::new(bytes)))
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        Self::injected(&self.fail_deletes, "delete")?;
        self.lock()?
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::read_to_vec;

    #[test]
    fn test_roundtrip_and_delete() {
        let store = MemoryStore::new();
        assert_eq!(store.put("k", b"v").unwrap(), "memory://k");
        assert!(store.contains("k"));
        assert_eq!(read_to_vec(&store, "k").unwrap(), b"v");

        store.delete("k").unwrap();
        assert!(store.is_empty());
        assert!(matches!(store.delete("k"), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_failure_injection() {
        let store = MemoryStore::new();
        store.put("k", b"v").unwrap();

        store.fail_deletes(true);
        assert!(matches!(store.delete("k"), Err(StorageError::Unavailable(_))));
        assert!(store.contains("k"));

        store.fail_deletes(false);
        store.fail_gets(true);
        assert!(store.get("k").is_err());

        store.fail_puts(true);
        assert!(store.put("k2", b"v").is_err());
        assert_eq!(store.len(), 1);
    }
}
