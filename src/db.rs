use crate::entities::{
    AuditRecord, InspectionRecord, PenaltyRecord, PlateOwnerRecord, PlatePenaltySummaryRecord,
    PlateRecord, RegulationEntry, UserRecord,
};
use crate::error::{ReportError, ReportResult};
use crate::filter::DateRange;
use crate::store::RecordStore;
use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use rusqlite::{params, params_from_iter, Connection, InterruptHandle, OpenFlags};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL so report readers never block the importer
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    debug!(journal_mode = %mode, "journal mode set");

    conn.execute(
        "CREATE TABLE IF NOT EXISTS plates (
            id INTEGER PRIMARY KEY,
            plate_number TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY,
            full_name TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS regulations (
            id INTEGER PRIMARY KEY,
            keyword TEXT
        )",
        [],
    )?;

    // References are deliberately not FOREIGN KEYs: dangling plate/user/regulation
    // ids exist in real data and reports must skip them, not reject them
    conn.execute(
        "CREATE TABLE IF NOT EXISTS audits (
            id INTEGER PRIMARY KEY,
            audit_type_id INTEGER NOT NULL,
            plate_id INTEGER,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS inspections (
            id INTEGER PRIMARY KEY,
            plate_id INTEGER,
            user_id INTEGER,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS penalties (
            id INTEGER PRIMARY KEY,
            audit_id INTEGER NOT NULL,
            regulation_id INTEGER
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS plate_owners (
            id INTEGER PRIMARY KEY,
            plate_number TEXT NOT NULL,
            owner_name TEXT,
            phone TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS plate_penalty_summaries (
            id INTEGER PRIMARY KEY,
            plate_number TEXT NOT NULL,
            regulation_keyword TEXT,
            penalty_count INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes (serve the ranged fetches in SqliteStore)
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_audits_created_at ON audits(created_at)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_inspections_created_at ON inspections(created_at)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// IMPORT
// ============================================================================

/// Record kinds that can be loaded from CSV
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Audits,
    Inspections,
    Penalties,
    Regulations,
    Plates,
    Users,
    PlateOwners,
    PlatePenaltySummaries,
}

impl ImportKind {
    pub const ALL: [ImportKind; 8] = [
        ImportKind::Audits,
        ImportKind::Inspections,
        ImportKind::Penalties,
        ImportKind::Regulations,
        ImportKind::Plates,
        ImportKind::Users,
        ImportKind::PlateOwners,
        ImportKind::PlatePenaltySummaries,
    ];

    pub fn table(&self) -> &'static str {
        match self {
            ImportKind::Audits => "audits",
            ImportKind::Inspections => "inspections",
            ImportKind::Penalties => "penalties",
            ImportKind::Regulations => "regulations",
            ImportKind::Plates => "plates",
            ImportKind::Users => "users",
            ImportKind::PlateOwners => "plate_owners",
            ImportKind::PlatePenaltySummaries => "plate_penalty_summaries",
        }
    }
}

impl FromStr for ImportKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        match ImportKind::ALL.iter().find(|kind| kind.table() == normalized) {
            Some(kind) => Ok(*kind),
            None => bail!(
                "unknown record kind '{}' (expected one of: {})",
                s,
                ImportKind::ALL.map(|k| k.table()).join(", ")
            ),
        }
    }
}

pub fn load_csv<T: DeserializeOwned>(csv_path: &Path) -> Result<Vec<T>> {
    let mut rdr = csv::Reader::from_path(csv_path)
        .with_context(|| format!("Failed to open CSV file {}", csv_path.display()))?;

    let mut records = Vec::new();

    for (line, result) in rdr.deserialize().enumerate() {
        // +2: header row, then 1-based numbering
        let record: T = result.with_context(|| format!("Failed to deserialize row {}", line + 2))?;
        records.push(record);
    }

    Ok(records)
}

/// Load a CSV file of the given kind and insert it; returns rows inserted
pub fn import_csv(conn: &Connection, kind: ImportKind, csv_path: &Path) -> Result<usize> {
    let inserted = match kind {
        ImportKind::Audits => insert_audits(conn, &load_csv(csv_path)?)?,
        ImportKind::Inspections => insert_inspections(conn, &load_csv(csv_path)?)?,
        ImportKind::Penalties => insert_penalties(conn, &load_csv(csv_path)?)?,
        ImportKind::Regulations => insert_regulations(conn, &load_csv(csv_path)?)?,
        ImportKind::Plates => insert_plates(conn, &load_csv(csv_path)?)?,
        ImportKind::Users => insert_users(conn, &load_csv(csv_path)?)?,
        ImportKind::PlateOwners => insert_plate_owners(conn, &load_csv(csv_path)?)?,
        ImportKind::PlatePenaltySummaries => {
            insert_plate_penalty_summaries(conn, &load_csv(csv_path)?)?
        }
    };

    info!(table = kind.table(), inserted, "CSV import finished");
    Ok(inserted)
}

pub fn insert_audits(conn: &Connection, records: &[AuditRecord]) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT OR REPLACE INTO audits (id, audit_type_id, plate_id, created_at)
         VALUES (?1, ?2, ?3, ?4)",
    )?;

    for r in records {
        stmt.execute(params![r.id, r.audit_type_id, r.plate_id, r.created_at])?;
    }

    Ok(records.len())
}

pub fn insert_inspections(conn: &Connection, records: &[InspectionRecord]) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT OR REPLACE INTO inspections (id, plate_id, user_id, created_at)
         VALUES (?1, ?2, ?3, ?4)",
    )?;

    for r in records {
        stmt.execute(params![r.id, r.plate_id, r.user_id, r.created_at])?;
    }

    Ok(records.len())
}

pub fn insert_penalties(conn: &Connection, records: &[PenaltyRecord]) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT OR REPLACE INTO penalties (id, audit_id, regulation_id) VALUES (?1, ?2, ?3)",
    )?;

    for r in records {
        stmt.execute(params![r.id, r.audit_id, r.regulation_id])?;
    }

    Ok(records.len())
}

pub fn insert_regulations(conn: &Connection, records: &[RegulationEntry]) -> Result<usize> {
    let mut stmt =
        conn.prepare("INSERT OR REPLACE INTO regulations (id, keyword) VALUES (?1, ?2)")?;

    for r in records {
        stmt.execute(params![r.id, r.keyword])?;
    }

    Ok(records.len())
}

pub fn insert_plates(conn: &Connection, records: &[PlateRecord]) -> Result<usize> {
    let mut stmt =
        conn.prepare("INSERT OR REPLACE INTO plates (id, plate_number) VALUES (?1, ?2)")?;

    for r in records {
        stmt.execute(params![r.id, r.plate_number])?;
    }

    Ok(records.len())
}

pub fn insert_users(conn: &Connection, records: &[UserRecord]) -> Result<usize> {
    let mut stmt = conn.prepare("INSERT OR REPLACE INTO users (id, full_name) VALUES (?1, ?2)")?;

    for r in records {
        stmt.execute(params![r.id, r.full_name])?;
    }

    Ok(records.len())
}

pub fn insert_plate_owners(conn: &Connection, records: &[PlateOwnerRecord]) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT OR REPLACE INTO plate_owners (id, plate_number, owner_name, phone)
         VALUES (?1, ?2, ?3, ?4)",
    )?;

    for r in records {
        stmt.execute(params![r.id, r.plate_number, r.owner_name, r.phone])?;
    }

    Ok(records.len())
}

pub fn insert_plate_penalty_summaries(
    conn: &Connection,
    records: &[PlatePenaltySummaryRecord],
) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT OR REPLACE INTO plate_penalty_summaries
            (id, plate_number, regulation_keyword, penalty_count)
         VALUES (?1, ?2, ?3, ?4)",
    )?;

    for r in records {
        stmt.execute(params![r.id, r.plate_number, r.regulation_keyword, r.penalty_count])?;
    }

    Ok(records.len())
}

pub fn verify_count(conn: &Connection, kind: ImportKind) -> Result<i64> {
    // table() is a closed set of literals, safe to splice
    let sql = format!("SELECT COUNT(*) FROM {}", kind.table());
    let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;

    Ok(count)
}

// ============================================================================
// SQLITE RECORD STORE
// ============================================================================

/// Shared cancellation flag for a store that may be running on another thread.
///
/// Cancelling sets the flag and interrupts the statement currently executing
/// on the attached connection. A store checks the flag before preparing each
/// statement, so a cancelled fetch never starts new work.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelState>,
}

#[derive(Default)]
struct CancelState {
    cancelled: AtomicBool,
    interrupt: Mutex<Option<InterruptHandle>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        if let Ok(slot) = self.inner.interrupt.lock() {
            if let Some(handle) = slot.as_ref() {
                handle.interrupt();
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    fn attach(&self, handle: InterruptHandle) {
        if let Ok(mut slot) = self.inner.interrupt.lock() {
            if self.is_cancelled() {
                handle.interrupt();
            }
            *slot = Some(handle);
        }
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Record store backed by one SQLite connection.
///
/// The connection lives exactly as long as the store, so dropping the store
/// releases it on every exit path.
pub struct SqliteStore {
    conn: Connection,
    cancel: CancelToken,
}

impl SqliteStore {
    /// Open read-write (used by the CLI for `init` and `import`)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        Ok(Self::from_connection(conn))
    }

    /// Open for reporting: the file must already exist and writes are refused.
    ///
    /// Opened read-write with `query_only` rather than SQLITE_OPEN_READ_ONLY,
    /// since a read-only handle cannot attach to a WAL database whose -wal
    /// file was cleaned up by the last writer.
    pub fn open_read_only(path: &Path) -> ReportResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.pragma_update(None, "query_only", true)?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            cancel: CancelToken::new(),
        }
    }

    /// Tie this store to `token`: cancelling it interrupts the running
    /// statement and fails every later fetch.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        token.attach(self.conn.get_interrupt_handle());
        self.cancel = token;
        self
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn ensure_active(&self) -> ReportResult<()> {
        if self.cancel.is_cancelled() {
            return Err(ReportError::Cancelled);
        }
        Ok(())
    }
}

/// `WHERE` clause and parameters for a created_at window, matching
/// `DateRange::contains`.
fn created_at_clause(range: &DateRange) -> (String, Vec<NaiveDateTime>) {
    let mut conditions = Vec::new();
    let mut bounds = Vec::new();

    if let Some(lower) = range.lower_bound() {
        conditions.push("created_at >= ?");
        bounds.push(lower);
    }
    if let Some(upper) = range.upper_bound() {
        conditions.push("created_at < ?");
        bounds.push(upper);
    }

    if conditions.is_empty() {
        (String::new(), bounds)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), bounds)
    }
}

fn audit_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditRecord> {
    Ok(AuditRecord {
        id: row.get(0)?,
        audit_type_id: row.get(1)?,
        plate_id: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn inspection_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<InspectionRecord> {
    Ok(InspectionRecord {
        id: row.get(0)?,
        plate_id: row.get(1)?,
        user_id: row.get(2)?,
        created_at: row.get(3)?,
    })
}

impl RecordStore for SqliteStore {
    fn audits(&self) -> ReportResult<Vec<AuditRecord>> {
        self.audits_between(&DateRange::all_time())
    }

    fn inspections(&self) -> ReportResult<Vec<InspectionRecord>> {
        self.inspections_between(&DateRange::all_time())
    }

    fn penalties(&self) -> ReportResult<Vec<PenaltyRecord>> {
        self.ensure_active()?;
        let mut stmt = self
            .conn
            .prepare("SELECT id, audit_id, regulation_id FROM penalties ORDER BY id")?;

        let records = stmt
            .query_map([], |row| {
                Ok(PenaltyRecord {
                    id: row.get(0)?,
                    audit_id: row.get(1)?,
                    regulation_id: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn regulations(&self) -> ReportResult<Vec<RegulationEntry>> {
        self.ensure_active()?;
        let mut stmt = self
            .conn
            .prepare("SELECT id, keyword FROM regulations ORDER BY id")?;

        let records = stmt
            .query_map([], |row| {
                Ok(RegulationEntry {
                    id: row.get(0)?,
                    keyword: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn plates(&self) -> ReportResult<Vec<PlateRecord>> {
        self.ensure_active()?;
        let mut stmt = self
            .conn
            .prepare("SELECT id, plate_number FROM plates ORDER BY id")?;

        let records = stmt
            .query_map([], |row| {
                Ok(PlateRecord {
                    id: row.get(0)?,
                    plate_number: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn users(&self) -> ReportResult<Vec<UserRecord>> {
        self.ensure_active()?;
        let mut stmt = self
            .conn
            .prepare("SELECT id, full_name FROM users ORDER BY id")?;

        let records = stmt
            .query_map([], |row| {
                Ok(UserRecord {
                    id: row.get(0)?,
                    full_name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn plate_owners(&self) -> ReportResult<Vec<PlateOwnerRecord>> {
        self.ensure_active()?;
        let mut stmt = self.conn.prepare(
            "SELECT id, plate_number, owner_name, phone FROM plate_owners ORDER BY id",
        )?;

        let records = stmt
            .query_map([], |row| {
                Ok(PlateOwnerRecord {
                    id: row.get(0)?,
                    plate_number: row.get(1)?,
                    owner_name: row.get(2)?,
                    phone: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn plate_penalty_summaries(&self) -> ReportResult<Vec<PlatePenaltySummaryRecord>> {
        self.ensure_active()?;
        let mut stmt = self.conn.prepare(
            "SELECT id, plate_number, regulation_keyword, penalty_count
             FROM plate_penalty_summaries
             ORDER BY id",
        )?;

        let records = stmt
            .query_map([], |row| {
                Ok(PlatePenaltySummaryRecord {
                    id: row.get(0)?,
                    plate_number: row.get(1)?,
                    regulation_keyword: row.get(2)?,
                    penalty_count: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn audits_between(&self, range: &DateRange) -> ReportResult<Vec<AuditRecord>> {
        self.ensure_active()?;
        let (clause, bounds) = created_at_clause(range);
        let sql = format!(
            "SELECT id, audit_type_id, plate_id, created_at FROM audits{} ORDER BY id",
            clause
        );
        let mut stmt = self.conn.prepare(&sql)?;

        let records = stmt
            .query_map(params_from_iter(bounds), audit_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        debug!(rows = records.len(), ?range, "audits fetched");
        Ok(records)
    }

    fn inspections_between(&self, range: &DateRange) -> ReportResult<Vec<InspectionRecord>> {
        self.ensure_active()?;
        let (clause, bounds) = created_at_clause(range);
        let sql = format!(
            "SELECT id, plate_id, user_id, created_at FROM inspections{} ORDER BY id",
            clause
        );
        let mut stmt = self.conn.prepare(&sql)?;

        let records = stmt
            .query_map(params_from_iter(bounds), inspection_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        debug!(rows = records.len(), ?range, "inspections fetched");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::timestamp;
    use std::io::Write;

    fn memory_store() -> SqliteStore {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        SqliteStore::from_connection(conn)
    }

    #[test]
    fn test_setup_database_is_idempotent() {
        let store = memory_store();

        setup_database(store.connection()).unwrap();

        for kind in ImportKind::ALL {
            assert_eq!(verify_count(store.connection(), kind).unwrap(), 0);
        }
    }

    #[test]
    fn test_audits_round_trip_through_sqlite() {
        let store = memory_store();
        let audits = vec![
            AuditRecord {
                id: 1,
                audit_type_id: 401,
                plate_id: Some(10),
                created_at: timestamp::parse("2024-01-01 23:59:59").unwrap(),
            },
            AuditRecord {
                id: 2,
                audit_type_id: 402,
                plate_id: None,
                created_at: timestamp::parse("2024-01-02 00:00:00").unwrap(),
            },
        ];

        let inserted = insert_audits(store.connection(), &audits).unwrap();
        let loaded = store.audits().unwrap();

        assert_eq!(inserted, 2);
        assert_eq!(loaded, audits);
    }

    #[test]
    fn test_null_references_survive_storage() {
        let store = memory_store();

        insert_penalties(
            store.connection(),
            &[PenaltyRecord { id: 1, audit_id: 5, regulation_id: None }],
        )
        .unwrap();
        insert_regulations(
            store.connection(),
            &[RegulationEntry { id: 3, keyword: None }],
        )
        .unwrap();

        assert_eq!(store.penalties().unwrap()[0].regulation_id, None);
        assert_eq!(store.regulations().unwrap()[0].keyword, None);
    }

    #[test]
    fn test_import_kind_parsing() {
        assert_eq!("audits".parse::<ImportKind>().unwrap(), ImportKind::Audits);
        assert_eq!(
            "plate-owners".parse::<ImportKind>().unwrap(),
            ImportKind::PlateOwners
        );
        assert!("vehicles".parse::<ImportKind>().is_err());
    }

    #[test]
    fn test_import_csv_inserts_rows() {
        let store = memory_store();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "id,plate_id,user_id,created_at").unwrap();
        writeln!(file, "1,10,100,2024-01-01 08:00:00").unwrap();
        writeln!(file, "2,,100,2024-01-01T09:15:00").unwrap();
        file.flush().unwrap();

        let inserted = import_csv(store.connection(), ImportKind::Inspections, file.path()).unwrap();
        let loaded = store.inspections().unwrap();

        assert_eq!(inserted, 2);
        assert_eq!(verify_count(store.connection(), ImportKind::Inspections).unwrap(), 2);
        assert_eq!(loaded[1].plate_id, None);
        assert_eq!(loaded[1].created_at, timestamp::parse("2024-01-01 09:15:00").unwrap());
    }

    #[test]
    fn test_import_csv_reports_bad_row() {
        let store = memory_store();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "id,plate_number").unwrap();
        writeln!(file, "not-a-number,34 ABC 123").unwrap();
        file.flush().unwrap();

        let err = import_csv(store.connection(), ImportKind::Plates, file.path()).unwrap_err();

        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn test_read_only_store_refuses_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audits.db");
        let writer = SqliteStore::open(&path).unwrap();
        setup_database(writer.connection()).unwrap();
        insert_plates(
            writer.connection(),
            &[PlateRecord { id: 1, plate_number: "35 KL 77".into() }],
        )
        .unwrap();
        drop(writer);

        let reader = SqliteStore::open_read_only(&path).unwrap();

        assert_eq!(reader.plates().unwrap().len(), 1);
        assert!(insert_plates(
            reader.connection(),
            &[PlateRecord { id: 2, plate_number: "35 KL 78".into() }],
        )
        .is_err());
    }

    fn audit_at(id: i64, stamp: &str) -> AuditRecord {
        AuditRecord {
            id,
            audit_type_id: 401,
            plate_id: None,
            created_at: timestamp::parse(stamp).unwrap(),
        }
    }

    #[test]
    fn test_ranged_fetch_covers_whole_end_day() {
        let store = memory_store();
        insert_audits(
            store.connection(),
            &[
                audit_at(1, "2023-12-31 23:59:59"),
                audit_at(2, "2024-01-01 00:00:00"),
                audit_at(3, "2024-01-31 23:59:59.500"),
                audit_at(4, "2024-02-01 00:00:00"),
            ],
        )
        .unwrap();
        let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = chrono::NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();

        let both = store.audits_between(&DateRange::new(Some(start), Some(end))).unwrap();
        let from = store.audits_between(&DateRange::new(Some(start), None)).unwrap();
        let until = store.audits_between(&DateRange::new(None, Some(end))).unwrap();

        let ids = |rows: Vec<AuditRecord>| rows.iter().map(|a| a.id).collect::<Vec<_>>();
        assert_eq!(ids(both), vec![2, 3]);
        assert_eq!(ids(from), vec![2, 3, 4]);
        assert_eq!(ids(until), vec![1, 2, 3]);
        assert_eq!(store.audits().unwrap().len(), 4);
    }

    #[test]
    fn test_ranged_fetch_agrees_with_in_memory_filter() {
        let store = memory_store();
        let inspections = vec![
            InspectionRecord { id: 1, plate_id: Some(1), user_id: None, created_at: timestamp::parse("2024-03-09 12:00:00").unwrap() },
            InspectionRecord { id: 2, plate_id: Some(1), user_id: None, created_at: timestamp::parse("2024-03-10 00:00:00").unwrap() },
            InspectionRecord { id: 3, plate_id: Some(1), user_id: None, created_at: timestamp::parse("2024-03-11 00:00:00").unwrap() },
        ];
        insert_inspections(store.connection(), &inspections).unwrap();
        let day = chrono::NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let range = DateRange::new(Some(day), Some(day));

        let fetched = store.inspections_between(&range).unwrap();

        assert_eq!(fetched, range.filter(inspections, |i| i.created_at));
    }

    #[test]
    fn test_only_range_indexes_are_created() {
        let store = memory_store();

        let mut stmt = store
            .connection()
            .prepare("SELECT name FROM sqlite_master WHERE type = 'index' AND name LIKE 'idx_%' ORDER BY name")
            .unwrap();
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert_eq!(names, vec!["idx_audits_created_at", "idx_inspections_created_at"]);
    }

    #[test]
    fn test_cancelled_store_refuses_fetches() {
        let token = CancelToken::new();
        let store = memory_store().with_cancel(token.clone());
        assert!(store.plates().is_ok());

        token.cancel();

        assert!(token.is_cancelled());
        assert!(matches!(store.plates(), Err(ReportError::Cancelled)));
        assert!(matches!(
            store.audits_between(&DateRange::all_time()),
            Err(ReportError::Cancelled)
        ));
    }

    #[test]
    fn test_token_cancelled_before_attach_still_applies() {
        let token = CancelToken::new();
        token.cancel();

        let store = memory_store().with_cancel(token);

        assert!(matches!(store.inspections(), Err(ReportError::Cancelled)));
    }

    #[test]
    fn test_read_only_store_rejects_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.db");

        assert!(SqliteStore::open_read_only(&missing).is_err());
    }
}
