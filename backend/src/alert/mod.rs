//! Cross-exchange divergence alerts.

pub mod divergence;
pub mod engine;
pub mod threshold;

pub use divergence::Divergence;
pub use engine::{ArbitrageAlert, DivergenceAlertEngine};
pub use threshold::{ThresholdLevel, ThresholdPolicy, ThresholdState};
