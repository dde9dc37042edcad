//! Memory engine configuration.

use thiserror::Error;

/// Errors raised when a [`MemoryEngineConfig`] cannot be used.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The reader table must hold at least one slot.
    #[error("max_readers must be at least 1")]
    NoReaderSlots,

    /// The map must have room for at least one key/data pair.
    #[error("map_size {0} is too small")]
    MapTooSmall(usize),
}

/// Configuration for opening a [`crate::MemoryEngine`].
#[derive(Debug, Clone)]
pub struct MemoryEngineConfig {
    /// Number of slots in the reader lock table.
    pub max_readers: usize,

    /// Number of named databases the environment may hold.
    pub max_dbs: usize,

    /// Bytes of key and data the environment may hold.
    pub map_size: usize,
}

impl Default for MemoryEngineConfig {
    fn default() -> Self {
        Self {
            max_readers: 126,
            max_dbs: 8,
            map_size: 10 * 1024 * 1024, // 10 MiB
        }
    }
}

impl MemoryEngineConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of reader slots.
    #[must_use]
    pub const fn max_readers(mut self, value: usize) -> Self {
        self.max_readers = value;
        self
    }

    /// Sets the number of named databases.
    #[must_use]
    pub const fn max_dbs(mut self, value: usize) -> Self {
        self.max_dbs = value;
        self
    }

    /// Sets the map size in bytes.
    #[must_use]
    pub const fn map_size(mut self, value: usize) -> Self {
        self.map_size = value;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.max_readers == 0 {
            return Err(ConfigError::NoReaderSlots);
        }
        // one byte of key plus one byte of data
        if self.map_size < 2 {
            return Err(ConfigError::MapTooSmall(self.map_size));
        }
        Ok(())
    }
}
