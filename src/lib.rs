// Audit Reports - Core Library
// Aggregation engine over enforcement audit records, shared by the CLI and API server

pub mod error;
pub mod entities;
pub mod filter;         // Date-range predicate shared by every report
pub mod grouping;       // Group-by reduction with deterministic ordering
pub mod store;          // Read-only record store seam
pub mod db;             // SQLite schema, import, SqliteStore
pub mod reports;        // Category / plate / user / daily summarizers
pub mod dashboard;      // All-time composite snapshot
pub mod config;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use error::{ReportError, ReportResult};
pub use entities::{
    AuditRecord, AuditType, InspectionRecord, PenaltyRecord, PlateOwnerRecord,
    PlatePenaltySummaryRecord, PlateRecord, RegulationEntry, UserRecord,
};
pub use filter::DateRange;
pub use grouping::{group_count, GroupRow};
pub use store::{RecordSet, RecordStore};
pub use db::{
    CancelToken, ImportKind, SqliteStore,
    setup_database, load_csv, import_csv, verify_count,
};
pub use reports::{
    CategoryCount, PlateCount, UserCount, DailySeries, PlateTally, PlateOption,
    DataKind, ReportKind, Report,
    run_report, category_counts, category_counts_all_time, plate_counts, user_counts,
    daily_series, plate_tally, plate_lookup, plate_penalty_list,
};
pub use dashboard::{build_dashboard, DashboardSnapshot};
pub use config::ReportsConfig;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
