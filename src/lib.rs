pub mod agents;
pub mod config;
pub mod error;
pub mod indicators;
pub mod ml;
pub mod registry;
pub mod types;

pub use agents::{CusumTrendAgent, IndicatorAgent, SafeStrategy, SignalAgent};
pub use error::{AgentError, ErrorKind, Result};
pub use types::{Bar, Column, OhlcvFrame};
