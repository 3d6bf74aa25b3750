pub mod alert;
pub mod config;
pub mod eod;
pub mod fetcher;
pub mod history;
pub mod metrics;
pub mod monitor;
pub mod notify;
pub mod storage;

pub mod error;
pub mod time;
