// 📊 Report Summarizers
//
// Each report is filter → group → order over rows fetched from a RecordStore.
// The pure `summarize_*` functions work on slices so the dashboard can fetch
// every table once and reuse it; the store-facing functions fetch and delegate.
//
// Joins are inner joins on the group key: a record whose plate, user or
// regulation cannot be resolved is left out of the grouping entirely.

use crate::entities::{
    AuditRecord, InspectionRecord, PenaltyRecord, PlatePenaltySummaryRecord, PlateRecord,
    RegulationEntry, UserRecord,
};
use crate::error::{ReportError, ReportResult};
use crate::filter::DateRange;
use crate::grouping::{group_count, GroupRow};
use crate::store::RecordStore;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

// ============================================================================
// OUTPUT ROWS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlateCount {
    pub plate_number: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCount {
    pub full_name: String,
    pub count: usize,
}

impl From<GroupRow> for CategoryCount {
    fn from(row: GroupRow) -> Self {
        CategoryCount { category: row.key, count: row.count }
    }
}

impl From<GroupRow> for PlateCount {
    fn from(row: GroupRow) -> Self {
        PlateCount { plate_number: row.key, count: row.count }
    }
}

impl From<GroupRow> for UserCount {
    fn from(row: GroupRow) -> Self {
        UserCount { full_name: row.key, count: row.count }
    }
}

/// Per-day counts as two parallel arrays, ascending by date
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySeries {
    pub labels: Vec<String>,
    pub values: Vec<usize>,
}

impl DailySeries {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Scalar counts for one plate (or every plate) over a date range
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlateTally {
    pub violation_count: usize,
    pub warning_count: usize,
    pub inspection_count: usize,
}

/// Autocomplete entry: `value` is the plate id, `text` the plate number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlateOption {
    pub value: i64,
    pub text: String,
}

// ============================================================================
// REPORT SELECTION
// ============================================================================

/// What a daily series counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DataKind {
    /// Audit records with the violation code
    #[default]
    Violation,

    /// Every inspection record
    Inspection,
}

impl DataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataKind::Violation => "violation",
            DataKind::Inspection => "inspection",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataKind {
    type Err = ReportError;

    fn from_str(s: &str) -> ReportResult<Self> {
        match s {
            "violation" => Ok(DataKind::Violation),
            "inspection" => Ok(DataKind::Inspection),
            other => Err(ReportError::invalid_parameter(
                "dataType",
                format!("unrecognized value '{}' (expected 'violation' or 'inspection')", other),
            )),
        }
    }
}

/// The closed set of grouped reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    ByCategory,
    ByPlate,
    ByUser,
    ByDay(DataKind),
}

/// Output of a grouped report; serializes as the bare list or series
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Report {
    Categories(Vec<CategoryCount>),
    Plates(Vec<PlateCount>),
    Users(Vec<UserCount>),
    Daily(DailySeries),
}

pub fn run_report(store: &impl RecordStore, kind: ReportKind, range: &DateRange) -> ReportResult<Report> {
    let report = match kind {
        ReportKind::ByCategory => Report::Categories(category_counts(store, range)?),
        ReportKind::ByPlate => Report::Plates(plate_counts(store, range)?),
        ReportKind::ByUser => Report::Users(user_counts(store, range)?),
        ReportKind::ByDay(data_kind) => Report::Daily(daily_series(store, data_kind, range)?),
    };

    Ok(report)
}

// ============================================================================
// PURE SUMMARIES
// ============================================================================

/// Penalties grouped by regulation keyword.
///
/// `audits = None` counts every penalty (all-time dashboard). With
/// `Some((audits, range))` only penalties whose audit exists and falls in
/// the range are counted.
pub fn summarize_categories(
    penalties: &[PenaltyRecord],
    regulations: &[RegulationEntry],
    audits: Option<(&[AuditRecord], &DateRange)>,
) -> Vec<CategoryCount> {
    let keywords: HashMap<i64, Option<&str>> = regulations
        .iter()
        .map(|r| (r.id, r.keyword.as_deref()))
        .collect();

    let audit_ids: Option<HashSet<i64>> = audits.map(|(audits, range)| {
        audits
            .iter()
            .filter(|a| range.contains(a.created_at))
            .map(|a| a.id)
            .collect()
    });

    let selected = penalties.iter().filter(|p| match &audit_ids {
        Some(ids) => ids.contains(&p.audit_id),
        None => true,
    });

    group_count(selected, |p| {
        p.regulation_id
            .and_then(|id| keywords.get(&id).copied().flatten())
            .map(str::to_string)
    })
    .into_iter()
    .map(CategoryCount::from)
    .collect()
}

pub fn summarize_plates(
    inspections: &[InspectionRecord],
    plates: &[PlateRecord],
    range: &DateRange,
) -> Vec<PlateCount> {
    let numbers: HashMap<i64, &str> = plates
        .iter()
        .map(|p| (p.id, p.plate_number.as_str()))
        .collect();

    let filtered = range.filter(inspections, |i| i.created_at);

    group_count(filtered, |i| {
        i.plate_id
            .and_then(|id| numbers.get(&id))
            .map(|n| n.to_string())
    })
    .into_iter()
    .map(PlateCount::from)
    .collect()
}

pub fn summarize_users(
    inspections: &[InspectionRecord],
    users: &[UserRecord],
    range: &DateRange,
) -> Vec<UserCount> {
    let names: HashMap<i64, &str> = users
        .iter()
        .map(|u| (u.id, u.full_name.as_str()))
        .collect();

    let filtered = range.filter(inspections, |i| i.created_at);

    group_count(filtered, |i| {
        i.user_id
            .and_then(|id| names.get(&id))
            .map(|n| n.to_string())
    })
    .into_iter()
    .map(UserCount::from)
    .collect()
}

/// Count timestamps per calendar day, ascending, days without records omitted
pub fn summarize_days<I>(timestamps: I) -> DailySeries
where
    I: IntoIterator<Item = chrono::NaiveDateTime>,
{
    let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for ts in timestamps {
        *per_day.entry(ts.date()).or_insert(0) += 1;
    }

    let mut series = DailySeries::default();
    for (day, count) in per_day {
        series.labels.push(day.format("%Y-%m-%d").to_string());
        series.values.push(count);
    }

    series
}

pub fn summarize_violation_days(audits: &[AuditRecord], range: &DateRange) -> DailySeries {
    summarize_days(
        audits
            .iter()
            .filter(|a| a.is_violation() && range.contains(a.created_at))
            .map(|a| a.created_at),
    )
}

pub fn summarize_inspection_days(inspections: &[InspectionRecord], range: &DateRange) -> DailySeries {
    summarize_days(
        inspections
            .iter()
            .filter(|i| range.contains(i.created_at))
            .map(|i| i.created_at),
    )
}

/// The tally narrows by date only when both ends are given; a lone start or
/// end date is ignored and the tally covers all history.
pub fn tally_window(range: &DateRange) -> DateRange {
    match (range.start, range.end) {
        (Some(_), Some(_)) => *range,
        _ => DateRange::all_time(),
    }
}

pub fn summarize_plate_tally(
    audits: &[AuditRecord],
    inspections: &[InspectionRecord],
    plate_id: Option<i64>,
    range: &DateRange,
) -> PlateTally {
    let window = tally_window(range);
    let on_plate = |record_plate: Option<i64>| plate_id.map_or(true, |id| record_plate == Some(id));

    let mut tally = PlateTally::default();

    for audit in audits
        .iter()
        .filter(|a| on_plate(a.plate_id) && window.contains(a.created_at))
    {
        if audit.is_violation() {
            tally.violation_count += 1;
        } else if audit.is_warning() {
            tally.warning_count += 1;
        }
    }

    tally.inspection_count = inspections
        .iter()
        .filter(|i| on_plate(i.plate_id) && window.contains(i.created_at))
        .count();

    tally
}

/// Case-sensitive substring match on plate number, ordered by plate number
pub fn lookup_plates(plates: &[PlateRecord], term: &str, limit: usize) -> Vec<PlateOption> {
    let mut matches: Vec<PlateOption> = plates
        .iter()
        .filter(|p| p.plate_number.contains(term))
        .map(|p| PlateOption {
            value: p.id,
            text: p.plate_number.clone(),
        })
        .collect();

    matches.sort_by(|a, b| a.text.cmp(&b.text).then(a.value.cmp(&b.value)));
    matches.truncate(limit);
    matches
}

// ============================================================================
// STORE-FACING REPORTS
// ============================================================================

/// Windowed category report; joins penalties through their audit's timestamp
pub fn category_counts(store: &impl RecordStore, range: &DateRange) -> ReportResult<Vec<CategoryCount>> {
    let audits = store.audits_between(range)?;
    let penalties = store.penalties()?;
    let regulations = store.regulations()?;

    let rows = summarize_categories(&penalties, &regulations, Some((&audits, range)));
    debug!(rows = rows.len(), penalties = penalties.len(), "category report built");

    Ok(rows)
}

/// All-history category report; no audit join
pub fn category_counts_all_time(store: &impl RecordStore) -> ReportResult<Vec<CategoryCount>> {
    let penalties = store.penalties()?;
    let regulations = store.regulations()?;

    Ok(summarize_categories(&penalties, &regulations, None))
}

pub fn plate_counts(store: &impl RecordStore, range: &DateRange) -> ReportResult<Vec<PlateCount>> {
    let inspections = store.inspections_between(range)?;
    let plates = store.plates()?;

    let rows = summarize_plates(&inspections, &plates, range);
    debug!(rows = rows.len(), inspections = inspections.len(), "plate report built");

    Ok(rows)
}

pub fn user_counts(store: &impl RecordStore, range: &DateRange) -> ReportResult<Vec<UserCount>> {
    let inspections = store.inspections_between(range)?;
    let users = store.users()?;

    let rows = summarize_users(&inspections, &users, range);
    debug!(rows = rows.len(), inspections = inspections.len(), "user report built");

    Ok(rows)
}

pub fn daily_series(
    store: &impl RecordStore,
    kind: DataKind,
    range: &DateRange,
) -> ReportResult<DailySeries> {
    let series = match kind {
        DataKind::Violation => summarize_violation_days(&store.audits_between(range)?, range),
        DataKind::Inspection => summarize_inspection_days(&store.inspections_between(range)?, range),
    };
    debug!(kind = %kind, days = series.len(), "daily series built");

    Ok(series)
}

pub fn plate_tally(
    store: &impl RecordStore,
    plate_id: Option<i64>,
    range: &DateRange,
) -> ReportResult<PlateTally> {
    let window = tally_window(range);
    let audits = store.audits_between(&window)?;
    let inspections = store.inspections_between(&window)?;

    Ok(summarize_plate_tally(&audits, &inspections, plate_id, &window))
}

pub fn plate_lookup(store: &impl RecordStore, term: &str, limit: usize) -> ReportResult<Vec<PlateOption>> {
    Ok(lookup_plates(&store.plates()?, term, limit))
}

/// Raw plate/penalty association rows, returned as stored
pub fn plate_penalty_list(store: &impl RecordStore) -> ReportResult<Vec<PlatePenaltySummaryRecord>> {
    store.plate_penalty_summaries()
}
