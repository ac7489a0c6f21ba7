// Record Store - read-only access to the eight record kinds
//
// Reports only ever read. `SqliteStore` (db.rs) is the production store;
// `RecordSet` holds rows in memory and serves fixtures and snapshots.

use crate::entities::{
    AuditRecord, InspectionRecord, PenaltyRecord, PlateOwnerRecord, PlatePenaltySummaryRecord,
    PlateRecord, RegulationEntry, UserRecord,
};
use crate::error::ReportResult;
use crate::filter::DateRange;
use serde::{Deserialize, Serialize};

pub trait RecordStore {
    fn audits(&self) -> ReportResult<Vec<AuditRecord>>;
    fn inspections(&self) -> ReportResult<Vec<InspectionRecord>>;
    fn penalties(&self) -> ReportResult<Vec<PenaltyRecord>>;
    fn regulations(&self) -> ReportResult<Vec<RegulationEntry>>;
    fn plates(&self) -> ReportResult<Vec<PlateRecord>>;
    fn users(&self) -> ReportResult<Vec<UserRecord>>;
    fn plate_owners(&self) -> ReportResult<Vec<PlateOwnerRecord>>;
    fn plate_penalty_summaries(&self) -> ReportResult<Vec<PlatePenaltySummaryRecord>>;

    /// Audits created inside `range`. Stores that can narrow at the source
    /// (an indexed `WHERE`) override this; the default filters in memory.
    fn audits_between(&self, range: &DateRange) -> ReportResult<Vec<AuditRecord>> {
        Ok(range.filter(self.audits()?, |a| a.created_at))
    }

    /// Inspections created inside `range`
    fn inspections_between(&self, range: &DateRange) -> ReportResult<Vec<InspectionRecord>> {
        Ok(range.filter(self.inspections()?, |i| i.created_at))
    }
}

/// In-memory record store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordSet {
    #[serde(default)]
    pub audits: Vec<AuditRecord>,
    #[serde(default)]
    pub inspections: Vec<InspectionRecord>,
    #[serde(default)]
    pub penalties: Vec<PenaltyRecord>,
    #[serde(default)]
    pub regulations: Vec<RegulationEntry>,
    #[serde(default)]
    pub plates: Vec<PlateRecord>,
    #[serde(default)]
    pub users: Vec<UserRecord>,
    #[serde(default)]
    pub plate_owners: Vec<PlateOwnerRecord>,
    #[serde(default)]
    pub plate_penalty_summaries: Vec<PlatePenaltySummaryRecord>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy every table out of another store
    pub fn snapshot(store: &impl RecordStore) -> ReportResult<Self> {
        Ok(RecordSet {
            audits: store.audits()?,
            inspections: store.inspections()?,
            penalties: store.penalties()?,
            regulations: store.regulations()?,
            plates: store.plates()?,
            users: store.users()?,
            plate_owners: store.plate_owners()?,
            plate_penalty_summaries: store.plate_penalty_summaries()?,
        })
    }
}

impl RecordStore for RecordSet {
    fn audits(&self) -> ReportResult<Vec<AuditRecord>> {
        Ok(self.audits.clone())
    }

    fn inspections(&self) -> ReportResult<Vec<InspectionRecord>> {
        Ok(self.inspections.clone())
    }

    fn penalties(&self) -> ReportResult<Vec<PenaltyRecord>> {
        Ok(self.penalties.clone())
    }

    fn regulations(&self) -> ReportResult<Vec<RegulationEntry>> {
        Ok(self.regulations.clone())
    }

    fn plates(&self) -> ReportResult<Vec<PlateRecord>> {
        Ok(self.plates.clone())
    }

    fn users(&self) -> ReportResult<Vec<UserRecord>> {
        Ok(self.users.clone())
    }

    fn plate_owners(&self) -> ReportResult<Vec<PlateOwnerRecord>> {
        Ok(self.plate_owners.clone())
    }

    fn plate_penalty_summaries(&self) -> ReportResult<Vec<PlatePenaltySummaryRecord>> {
        Ok(self.plate_penalty_summaries.clone())
    }
}
