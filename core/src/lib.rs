//! amldesk-core — real-time AML risk assessment and case workflow.
//!
//! The crate has two halves:
//!   - a pure scoring pipeline (`context` -> `features` -> `rules` +
//!     `model` -> `composer`), entered through [`engine::RiskEngine`];
//!   - durable case workflow (`alerts`, `reports`, `screening`) on top of
//!     the SQLite [`store`].
//!
//! The scoring pipeline holds no shared mutable state and may run in
//! parallel across transactions; the workflow managers serialize
//! conflicting transitions at the storage boundary.

pub mod alerts;
pub mod composer;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod features;
pub mod model;
pub mod reports;
pub mod rules;
pub mod screening;
pub mod store;
pub mod types;

pub use alerts::{Alert, AlertManager, AlertStatus};
pub use config::EngineConfig;
pub use context::{KycStatus, TransactionContext, TransactionKind};
pub use engine::{AnalysisResult, RiskEngine};
pub use error::{AmlError, AmlResult};
pub use reports::{ReportStatus, StrReport, StrReportManager};
pub use rules::{FlagSeverity, RiskFlag};
pub use screening::{CustomerScreeningResult, MatchStatus, WatchlistScreener};
pub use store::AmlStore;
pub use types::{RecommendedAction, RiskLevel};
