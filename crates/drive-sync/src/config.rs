//! Drive configuration: defaults plus environment overrides.

use std::time::Duration;

use drive_sync_chain::{WatcherConfig, DEFAULT_WATCH_INTERVAL};
use drive_sync_store::{
    CheckpointWriterConfig, PacketStoreConfig, DEFAULT_MAX_PROCESSED_BLOCKS, DEFAULT_TIMEOUT,
};

use crate::error::{DriveError, Result};

pub const ENV_PACKET_TIMEOUT_MS: &str = "DRIVE_PACKET_TIMEOUT_MS";
pub const ENV_WATCH_INTERVAL_MS: &str = "DRIVE_SYNC_STATE_CHECK_INTERVAL_MS";
pub const ENV_SYNC_DEADLINE_MS: &str = "DRIVE_SYNC_DEADLINE_MS";
pub const ENV_MAX_PROCESSED_BLOCKS: &str = "DRIVE_MAX_PROCESSED_BLOCKS";

/// Configuration for a [`Drive`](crate::Drive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveConfig {
    /// Deadline for packet retrieve and pin.
    pub packet_timeout: Duration,
    /// How often the change watcher reloads the checkpoint.
    pub watch_interval: Duration,
    /// Upper bound on [`Drive::await_sync`](crate::Drive::await_sync).
    /// `None` waits indefinitely.
    pub sync_deadline: Option<Duration>,
    /// Processed blocks kept in the checkpoint.
    pub max_processed_blocks: usize,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            packet_timeout: DEFAULT_TIMEOUT,
            watch_interval: DEFAULT_WATCH_INTERVAL,
            sync_deadline: None,
            max_processed_blocks: DEFAULT_MAX_PROCESSED_BLOCKS,
        }
    }
}

impl DriveConfig {
    /// Defaults overridden by `DRIVE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(ms) = parse_u64(&lookup, ENV_PACKET_TIMEOUT_MS)? {
            config.packet_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_u64(&lookup, ENV_WATCH_INTERVAL_MS)? {
            if ms == 0 {
                return Err(DriveError::Config(format!(
                    "{} must be greater than zero",
                    ENV_WATCH_INTERVAL_MS
                )));
            }
            config.watch_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_u64(&lookup, ENV_SYNC_DEADLINE_MS)? {
            config.sync_deadline = Some(Duration::from_millis(ms));
        }
        if let Some(n) = parse_u64(&lookup, ENV_MAX_PROCESSED_BLOCKS)? {
            config.max_processed_blocks = usize::try_from(n).map_err(|_| {
                DriveError::Config(format!("{} out of range: {}", ENV_MAX_PROCESSED_BLOCKS, n))
            })?;
        }

        Ok(config)
    }

    pub fn packet_store(&self) -> PacketStoreConfig {
        PacketStoreConfig {
            timeout: self.packet_timeout,
        }
    }

    pub fn watcher(&self) -> WatcherConfig {
        WatcherConfig {
            watch_interval: self.watch_interval,
        }
    }

    pub fn checkpoint_writer(&self) -> CheckpointWriterConfig {
        CheckpointWriterConfig {
            max_processed_blocks: Some(self.max_processed_blocks),
        }
    }
}

fn parse_u64<F>(lookup: &F, key: &str) -> Result<Option<u64>>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| DriveError::Config(format!("{}={:?}: {}", key, raw, e))),
    }
}
