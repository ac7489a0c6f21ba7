// 🗂️ Composite Dashboard - every summary over all history, in one snapshot
//
// The dashboard never takes a date range. Windowed views are the separate
// drill-down reports in reports.rs.

use crate::entities::{PlateOwnerRecord, PlatePenaltySummaryRecord};
use crate::error::ReportResult;
use crate::filter::DateRange;
use crate::reports::{
    summarize_categories, summarize_plates, summarize_users, summarize_violation_days,
    CategoryCount, DailySeries, PlateCount, UserCount,
};
use crate::store::RecordStore;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub violation_count: usize,
    pub warning_count: usize,
    pub inspection_count: usize,
    pub plate_count: usize,

    pub category_counts: Vec<CategoryCount>,
    pub plate_counts: Vec<PlateCount>,
    pub user_counts: Vec<UserCount>,
    pub daily_violations: DailySeries,

    // Reference lists, verbatim from the store
    pub plate_owners: Vec<PlateOwnerRecord>,
    pub plate_penalties: Vec<PlatePenaltySummaryRecord>,
}

impl DashboardSnapshot {
    /// True when nothing was counted: no violations, warnings or inspections.
    /// Audits with other type codes are never counted, so they do not make a
    /// snapshot non-empty.
    pub fn is_empty(&self) -> bool {
        self.violation_count == 0 && self.warning_count == 0 && self.inspection_count == 0
    }
}

/// Build the all-time snapshot. Each table is fetched exactly once.
pub fn build_dashboard(store: &impl RecordStore) -> ReportResult<DashboardSnapshot> {
    let audits = store.audits()?;
    let inspections = store.inspections()?;
    let penalties = store.penalties()?;
    let regulations = store.regulations()?;
    let plates = store.plates()?;
    let users = store.users()?;
    let plate_owners = store.plate_owners()?;
    let plate_penalties = store.plate_penalty_summaries()?;

    let all_time = DateRange::all_time();

    let snapshot = DashboardSnapshot {
        violation_count: audits.iter().filter(|a| a.is_violation()).count(),
        warning_count: audits.iter().filter(|a| a.is_warning()).count(),
        inspection_count: inspections.len(),
        plate_count: plates.len(),

        category_counts: summarize_categories(&penalties, &regulations, None),
        plate_counts: summarize_plates(&inspections, &plates, &all_time),
        user_counts: summarize_users(&inspections, &users, &all_time),
        daily_violations: summarize_violation_days(&audits, &all_time),

        plate_owners,
        plate_penalties,
    };

    debug!(
        violations = snapshot.violation_count,
        warnings = snapshot.warning_count,
        inspections = snapshot.inspection_count,
        plates = snapshot.plate_count,
        "dashboard built"
    );

    Ok(snapshot)
}
