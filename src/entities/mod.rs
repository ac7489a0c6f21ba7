// Record Models
// Read-only rows consumed from the record store. Reports never mutate them.

pub mod audit;
pub mod vehicle;

pub use audit::{AuditRecord, AuditType, PenaltyRecord, RegulationEntry, VIOLATION_CODE, WARNING_CODE};
pub use vehicle::{InspectionRecord, PlateOwnerRecord, PlatePenaltySummaryRecord, PlateRecord, UserRecord};

/// Serde format for record timestamps: `YYYY-MM-DD HH:MM:SS`.
/// Deserialization also accepts the ISO `T` separator and fractional seconds.
pub(crate) mod timestamp {
    use chrono::NaiveDateTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", raw)))
    }

    pub fn parse(raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_accepts_both_separators() {
        let spaced = timestamp::parse("2024-05-01 14:30:00").unwrap();
        let iso = timestamp::parse("2024-05-01T14:30:00").unwrap();
        let fractional = timestamp::parse("2024-05-01 14:30:00.250").unwrap();

        assert_eq!(spaced, iso);
        assert_eq!(fractional.format("%H:%M:%S").to_string(), "14:30:00");
        assert!(timestamp::parse("yesterday").is_none());
    }

    #[test]
    fn test_record_json_uses_plain_timestamp() {
        let record = InspectionRecord {
            id: 9,
            plate_id: Some(1),
            user_id: None,
            created_at: timestamp::parse("2024-05-01 14:30:00").unwrap(),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["created_at"], "2024-05-01 14:30:00");

        let back: InspectionRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
