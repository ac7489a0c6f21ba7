// 🚨 Audit Entities - enforcement outcomes and the regulations they cite
//
// An audit record is one logged inspection outcome. Its type code decides
// whether it counts as a violation (401), a warning (402), or neither.
// A penalty links one audit record to the regulation it violated.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const VIOLATION_CODE: i64 = 401;
pub const WARNING_CODE: i64 = 402;

// ============================================================================
// AUDIT TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditType {
    /// Violation report (code 401)
    Violation,

    /// Warning report (code 402)
    Warning,

    /// Any other code; counted nowhere
    Other(i64),
}

impl AuditType {
    pub fn from_code(code: i64) -> Self {
        match code {
            VIOLATION_CODE => AuditType::Violation,
            WARNING_CODE => AuditType::Warning,
            other => AuditType::Other(other),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            AuditType::Violation => VIOLATION_CODE,
            AuditType::Warning => WARNING_CODE,
            AuditType::Other(code) => *code,
        }
    }
}

// ============================================================================
// AUDIT RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub audit_type_id: i64,
    pub plate_id: Option<i64>,
    #[serde(with = "super::timestamp")]
    pub created_at: NaiveDateTime,
}

impl AuditRecord {
    pub fn audit_type(&self) -> AuditType {
        AuditType::from_code(self.audit_type_id)
    }

    pub fn is_violation(&self) -> bool {
        self.audit_type() == AuditType::Violation
    }

    pub fn is_warning(&self) -> bool {
        self.audit_type() == AuditType::Warning
    }
}

// ============================================================================
// PENALTY + REGULATION
// ============================================================================

/// Link between an audit record and the regulation it violated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyRecord {
    pub id: i64,
    pub audit_id: i64,
    pub regulation_id: Option<i64>,
}

/// A regulation article; `keyword` is the category label shown in reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegulationEntry {
    pub id: i64,
    pub keyword: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_type_codes() {
        assert_eq!(AuditType::from_code(401), AuditType::Violation);
        assert_eq!(AuditType::from_code(402), AuditType::Warning);
        assert_eq!(AuditType::from_code(403), AuditType::Other(403));
        assert_eq!(AuditType::Other(7).code(), 7);
        assert_eq!(AuditType::Warning.code(), WARNING_CODE);
    }

    #[test]
    fn test_audit_record_classification() {
        let record = AuditRecord {
            id: 1,
            audit_type_id: 401,
            plate_id: None,
            created_at: NaiveDateTime::parse_from_str("2024-01-01 09:00:00", "%Y-%m-%d %H:%M:%S")
                .unwrap(),
        };

        assert!(record.is_violation());
        assert!(!record.is_warning());
    }
}
