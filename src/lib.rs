pub mod core;

// Re-export commonly used types
pub use crate::core::clock::{ClockEngine, Probe, RegisterBus};
pub use crate::core::coverage::{CoverageModel, CoverageReport, SampleValues};
pub use crate::core::device::Device;
pub use crate::core::driver::{RegisterReadDriver, RegisterWriteDriver, DEFAULT_TIMEOUT_CYCLES};
pub use crate::core::error::TbError;
pub use crate::core::monitor::{BusMonitor, StatRecord, TransactionStats, TransactionSubscriber};
pub use crate::core::orchestrator::{RunReport, TestConfig, TestOrchestrator, TestState};
pub use crate::core::scoreboard::{Mismatch, ScoreboardModel};
pub use crate::core::signal::Signals;
pub use crate::core::stimulus::{StimulusGenerator, StimulusSample};
pub use crate::core::transaction::{Transaction, TxKind};
