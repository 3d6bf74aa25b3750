use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{StorageError, Table, TableStore};

/// Writes tables as CSV files below a root directory.
#[derive(Clone, Debug)]
pub struct LocalTableStore {
    root: PathBuf,
}

impl LocalTableStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Rejects anything that could escape the root.
    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let rel = Path::new(path);
        let clean = !path.is_empty()
            && rel
                .components()
                .all(|c| matches!(c, Component::Normal(_)));

        if !clean {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl TableStore for LocalTableStore {
    #[instrument(skip(self, table), fields(rows = table.len()), level = "debug")]
    async fn persist_table(&self, path: &str, table: &Table) -> Result<(), StorageError> {
        let target = self.resolve(path)?;
        let bytes = table.to_csv()?;

        if let Some(dir) = target.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&target, bytes).await?;

        debug!(path = %target.display(), "table written");
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn load_table(&self, path: &str) -> Result<Option<Table>, StorageError> {
        let target = self.resolve(path)?;

        let bytes = match tokio::fs::read(&target).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Table::from_csv(&bytes).map(Some)
    }
}
