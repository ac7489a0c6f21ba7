// 🚗 Vehicle Entities - plates, inspectors, inspections
//
// Inspections are logged independently of audit outcomes: every stop counts,
// whether or not it produced a violation or warning.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateRecord {
    pub id: i64,
    pub plate_number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub full_name: String,
}

/// One vehicle inspection event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionRecord {
    pub id: i64,
    pub plate_id: Option<i64>,
    pub user_id: Option<i64>,
    #[serde(with = "super::timestamp")]
    pub created_at: NaiveDateTime,
}

// ============================================================================
// REFERENCE ROWS (passed through to the dashboard untouched)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlateOwnerRecord {
    pub id: i64,
    pub plate_number: String,
    pub owner_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatePenaltySummaryRecord {
    pub id: i64,
    pub plate_number: String,
    pub regulation_keyword: Option<String>,
    pub penalty_count: i64,
}
