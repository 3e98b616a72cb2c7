//! Durable cursor of the last fully committed block

use std::{
    future::Future,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context as _, Result};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

pub const CHECKPOINT_FILE_NAME: &str = "block-index.txt";

pub trait CheckpointStore: Send + Sync + 'static {
    fn load(&self) -> impl Future<Output = Result<Option<u64>>> + Send;
    fn save(&mut self, block_index: u64) -> impl Future<Output = Result<()>> + Send;
}

/// Single integer in `<dir>/block-index.txt`, replaced atomically on save
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(CHECKPOINT_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CheckpointStore for FileCheckpointStore {
    async fn load(&self) -> Result<Option<u64>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", self.path.display()))
            }
        };
        match contents.trim().parse::<u64>() {
            Ok(index) => Ok(Some(index)),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    "Ignoring unreadable checkpoint: {e}"
                );
                Ok(None)
            }
        }
    }

    async fn save(&mut self, block_index: u64) -> Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        // Write beside the target then rename over it
        let mut file = NamedTempFile::new_in(dir)?;
        write!(file, "{block_index}")?;
        file.as_file().sync_all()?;
        file.persist(&self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        debug!(block_index, path = %self.path.display(), "Checkpoint saved");
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCheckpointStore {
    block_index: Option<u64>,
}

impl InMemoryCheckpointStore {
    pub fn new(block_index: Option<u64>) -> Self {
        Self { block_index }
    }
}

impl CheckpointStore for InMemoryCheckpointStore {
    async fn load(&self) -> Result<Option<u64>> {
        Ok(self.block_index)
    }

    async fn save(&mut self, block_index: u64) -> Result<()> {
        self.block_index = Some(block_index);
        Ok(())
    }
}

/// Last committed position, advanced only forwards
pub struct CheckpointTracker<C: CheckpointStore> {
    store: C,
    committed: Option<u64>,
}

impl<C: CheckpointStore> CheckpointTracker<C> {
    pub async fn open(store: C) -> Result<Self> {
        let committed = store.load().await?;
        Ok(Self { store, committed })
    }

    pub fn committed(&self) -> Option<u64> {
        self.committed
    }

    /// Persist `block_index` if it moves the checkpoint forward.
    /// Returns whether anything was written.
    pub async fn advance(&mut self, block_index: u64) -> Result<bool> {
        if self.committed.is_some_and(|c| c >= block_index) {
            return Ok(false);
        }
        self.store.save(block_index).await?;
        self.committed = Some(block_index);
        Ok(true)
    }
}
