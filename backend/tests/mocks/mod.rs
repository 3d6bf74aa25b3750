#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use market::exchanges::ExchangeClient;
use market::{ExchangeError, RawLevel, RawOrderBook};
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use spreadwatch::notify::{Notifier, NotifyError};
use spreadwatch::storage::{StorageError, Table, TableStore};

/// What a scripted exchange answers on one call.
#[derive(Clone, Debug)]
pub enum Step {
    Book(RawOrderBook),
    Status(u16),
    Invalid,
    /// Never answers; only a deadline gets the caller out.
    Hang,
}

/// Plays `steps` in order, then repeats the last one forever.
pub struct ScriptedExchange {
    name: String,
    steps: Mutex<VecDeque<Step>>,
    last: Mutex<Step>,
    pub calls: AtomicUsize,
}

impl ScriptedExchange {
    pub fn new(name: &str, steps: Vec<Step>) -> Arc<Self> {
        let last = steps.last().cloned().unwrap_or(Step::Invalid);
        Arc::new(Self {
            name: name.to_string(),
            steps: Mutex::new(steps.into()),
            last: Mutex::new(last),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn always(name: &str, step: Step) -> Arc<Self> {
        Self::new(name, vec![step])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExchangeClient for ScriptedExchange {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_orderbook(&self, _market: &str) -> Result<RawOrderBook, ExchangeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let step = match self.steps.lock().await.pop_front() {
            Some(step) => {
                *self.last.lock().await = step.clone();
                step
            }
            None => self.last.lock().await.clone(),
        };

        match step {
            Step::Book(book) => Ok(book),
            Step::Status(status) => Err(ExchangeError::Status {
                status,
                body: String::new(),
            }),
            Step::Invalid => Err(ExchangeError::InvalidResponse("garbage".into())),
            Step::Hang => {
                tokio::time::sleep(Duration::from_secs(3_600)).await;
                Err(ExchangeError::InvalidResponse("hung".into()))
            }
        }
    }
}

/// Single-level book.
pub fn book(bid: Decimal, ask: Decimal) -> RawOrderBook {
    RawOrderBook {
        asks: vec![RawLevel::new(ask, Decimal::ONE)],
        bids: vec![RawLevel::new(bid, Decimal::ONE)],
    }
}

/// Book whose mid is `mid` with a 0.02 wide spread.
pub fn tight(mid: Decimal) -> Step {
    let half = Decimal::new(1, 2);
    Step::Book(book(mid - half, mid + half))
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub batches: Mutex<Vec<Vec<String>>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub async fn messages(&self) -> Vec<String> {
        self.batches.lock().await.concat()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, messages: &[String]) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Rejected {
                status: 500,
                body: "webhook down".into(),
            });
        }
        self.batches.lock().await.push(messages.to_vec());
        Ok(())
    }
}

/// Keeps tables in memory; paths starting with `fail_prefix` are refused.
#[derive(Default)]
pub struct MemoryStore {
    pub tables: Mutex<BTreeMap<String, Table>>,
    pub fail_prefix: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_on(prefix: &str) -> Arc<Self> {
        Arc::new(Self {
            fail_prefix: Some(prefix.to_string()),
            ..Self::default()
        })
    }

    pub async fn paths(&self) -> Vec<String> {
        self.tables.lock().await.keys().cloned().collect()
    }

    pub async fn table(&self, path: &str) -> Option<Table> {
        self.tables.lock().await.get(path).cloned()
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn persist_table(&self, path: &str, table: &Table) -> Result<(), StorageError> {
        if self.fail_prefix.as_deref().is_some_and(|p| path.starts_with(p)) {
            return Err(StorageError::Io(std::io::Error::other("disk full")));
        }
        self.tables
            .lock()
            .await
            .insert(path.to_string(), table.clone());
        Ok(())
    }

    async fn load_table(&self, path: &str) -> Result<Option<Table>, StorageError> {
        Ok(self.tables.lock().await.get(path).cloned())
    }
}
