//! Key-value persistence for countdown progress
//!
//! The timer core knows nothing about storage. The driver task saves
//! `remaining` here on every transition and reads it back on restore.

pub mod file_store;
pub mod memory_store;

use tracing::warn;

use crate::error::StoreError;

// Re-export main types
pub use file_store::FileStore;
pub use memory_store::MemoryStore;

/// Key under which the remaining seconds are stored
pub const REMAINING_KEY: &str = "countdown.remaining";

/// A string key-value store
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Save the remaining seconds as a decimal string
pub fn save_remaining(store: &mut dyn KeyValueStore, remaining: u64) -> Result<(), StoreError> {
    store.set(REMAINING_KEY, &remaining.to_string())
}

/// Load the remaining seconds, treating unparseable values as absent
pub fn load_remaining(store: &dyn KeyValueStore) -> Option<u64> {
    let raw = store.get(REMAINING_KEY)?;
    match raw.trim().parse::<u64>() {
        Ok(remaining) => Some(remaining),
        Err(e) => {
            warn!("Ignoring stored remaining value {:?}: {}", raw, e);
            None
        }
    }
}
