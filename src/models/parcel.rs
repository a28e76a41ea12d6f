use serde::{Deserialize, Serialize};

use crate::models::status::StatusCode;

/// One tracked shipment, as persisted in the history file.
///
/// `courier` holds the user-facing carrier label; the directory ID is
/// resolved against the carrier directory at fetch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParcelRecord {
    pub name: String,
    pub number: String,
    pub courier: String,
    #[serde(default)]
    pub last_status: StatusCode,
    #[serde(default)]
    pub last_updated_time: Option<String>,
    #[serde(default)]
    pub days_in_transit: Option<i64>,
}

impl ParcelRecord {
    pub fn new(
        name: impl Into<String>,
        number: impl Into<String>,
        courier: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            number: number.into(),
            courier: courier.into(),
            last_status: StatusCode::Unknown,
            last_updated_time: None,
            days_in_transit: None,
        }
    }

    /// Display form of the transit duration ("3 days", "1 day", "N/A").
    pub fn days_in_transit_label(&self) -> String {
        match self.days_in_transit {
            Some(1) => "1 day".to_string(),
            Some(days) => format!("{days} days"),
            None => "N/A".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ParcelRecord;
    use crate::models::status::StatusCode;

    #[test]
    fn persisted_field_names_are_stable() {
        let mut record = ParcelRecord::new("Keyboard", "KR123", "CJ Logistics");
        record.last_status = StatusCode::InTransit;
        record.last_updated_time = Some("2024-03-01 09:30:00".to_string());
        record.days_in_transit = Some(3);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["name"], "Keyboard");
        assert_eq!(json["number"], "KR123");
        assert_eq!(json["courier"], "CJ Logistics");
        assert_eq!(json["last_status"], "IN_TRANSIT");
        assert_eq!(json["last_updated_time"], "2024-03-01 09:30:00");
        assert_eq!(json["days_in_transit"], 3);
    }

    #[test]
    fn missing_optional_fields_default() {
        let record: ParcelRecord = serde_json::from_str(
            r#"{ "name": "Keyboard", "number": "KR123", "courier": "CJ Logistics" }"#,
        )
        .unwrap();
        assert_eq!(record.last_status, StatusCode::Unknown);
        assert!(record.last_updated_time.is_none());
        assert_eq!(record.days_in_transit_label(), "N/A");
    }

    #[test]
    fn transit_label_pluralizes() {
        let mut record = ParcelRecord::new("Keyboard", "KR123", "CJ Logistics");
        record.days_in_transit = Some(1);
        assert_eq!(record.days_in_transit_label(), "1 day");
        record.days_in_transit = Some(4);
        assert_eq!(record.days_in_transit_label(), "4 days");
    }
}
