//! Postsift Telemetry
//!
//! Persistence and counters for the moderation agent.
//!
//! Provides:
//! - Classification report log with rotation, query, and export
//! - Flagged account store
//! - In-process stats counters for the /stats surface

pub mod accounts;
pub mod report;
pub mod stats;

pub use accounts::{AccountRecord, AccountStore};
pub use report::{
    ExportFormat, ReportConfig, ReportQuery, ReportReader, ReportRecord, ReportWriter,
};
pub use stats::{StatsCollector, StatsSnapshot};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::accounts::{AccountRecord, AccountStore};
    pub use crate::report::{ReportConfig, ReportReader, ReportRecord, ReportWriter};
    pub use crate::stats::{StatsCollector, StatsSnapshot};
}
