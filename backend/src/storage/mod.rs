//! Daily tables and where they end up.

pub mod local;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

pub use local::LocalTableStore;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid table path {0:?}")]
    InvalidPath(String),

    #[error("invalid table: {0}")]
    InvalidTable(String),
}

/// Column-named rows of already formatted cells. Empty cells stand for
/// missing values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<S: Into<String>>(header: impl IntoIterator<Item = S>) -> Self {
        Self {
            header: header.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_csv(&self) -> Result<Vec<u8>, StorageError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.header)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;

        writer
            .into_inner()
            .map_err(|e| StorageError::Io(e.into_error()))
    }

    /// Parses bytes written by [`Table::to_csv`]; the first record is the header.
    pub fn from_csv(bytes: &[u8]) -> Result<Self, StorageError> {
        let mut reader = csv::Reader::from_reader(bytes);
        let header = reader.headers()?.iter().map(String::from).collect();

        let rows = reader
            .records()
            .map(|record| record.map(|r| r.iter().map(String::from).collect()))
            .collect::<Result<_, _>>()?;

        Ok(Self { header, rows })
    }
}

/// Sink for daily tables, addressed by a relative logical path.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Writes `table` at `path`, replacing what was there.
    async fn persist_table(&self, path: &str, table: &Table) -> Result<(), StorageError>;

    /// Reads back the table at `path`; `None` when nothing was written there.
    async fn load_table(&self, path: &str) -> Result<Option<Table>, StorageError>;
}

/// `{owner}/{market}/{YYYY-MM-DD}.csv`, owner being an exchange or a pair id.
pub fn table_path(owner: &str, market: &str, date: NaiveDate) -> String {
    format!("{owner}/{market}/{}.csv", date.format("%Y-%m-%d"))
}
