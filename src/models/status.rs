use std::fmt;

use serde::{Deserialize, Serialize};

/// Tracking status codes as defined by the remote API. Codes this build does
/// not know about deserialize to `Unknown` instead of failing the record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", from = "String")]
pub enum StatusCode {
    #[default]
    Unknown,
    InformationReceived,
    AtPickup,
    InTransit,
    OutForDelivery,
    AttemptFail,
    Delivered,
    AvailableForPickup,
    Exception,
}

impl StatusCode {
    pub fn from_code(raw: &str) -> Self {
        match raw {
            "INFORMATION_RECEIVED" => StatusCode::InformationReceived,
            "AT_PICKUP" => StatusCode::AtPickup,
            "IN_TRANSIT" => StatusCode::InTransit,
            "OUT_FOR_DELIVERY" => StatusCode::OutForDelivery,
            "ATTEMPT_FAIL" => StatusCode::AttemptFail,
            "DELIVERED" => StatusCode::Delivered,
            "AVAILABLE_FOR_PICKUP" => StatusCode::AvailableForPickup,
            "EXCEPTION" => StatusCode::Exception,
            _ => StatusCode::Unknown,
        }
    }

    pub fn as_code(&self) -> &'static str {
        match self {
            StatusCode::Unknown => "UNKNOWN",
            StatusCode::InformationReceived => "INFORMATION_RECEIVED",
            StatusCode::AtPickup => "AT_PICKUP",
            StatusCode::InTransit => "IN_TRANSIT",
            StatusCode::OutForDelivery => "OUT_FOR_DELIVERY",
            StatusCode::AttemptFail => "ATTEMPT_FAIL",
            StatusCode::Delivered => "DELIVERED",
            StatusCode::AvailableForPickup => "AVAILABLE_FOR_PICKUP",
            StatusCode::Exception => "EXCEPTION",
        }
    }

    /// Human-readable label for display surfaces.
    pub fn pretty_name(&self) -> &'static str {
        match self {
            StatusCode::Unknown => "Unknown Status",
            StatusCode::InformationReceived => "Info Received",
            StatusCode::AtPickup => "Ready for Pickup",
            StatusCode::InTransit => "In Transit",
            StatusCode::OutForDelivery => "Out for Delivery",
            StatusCode::AttemptFail => "Delivery Attempt Failed",
            StatusCode::Delivered => "Delivered",
            StatusCode::AvailableForPickup => "Available for Pickup",
            StatusCode::Exception => "Exception",
        }
    }
}

impl From<String> for StatusCode {
    fn from(raw: String) -> Self {
        StatusCode::from_code(&raw)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

#[cfg(test)]
mod tests {
    use super::StatusCode;

    #[test]
    fn wire_codes_round_trip() {
        let parsed: StatusCode = serde_json::from_str("\"OUT_FOR_DELIVERY\"").unwrap();
        assert_eq!(parsed, StatusCode::OutForDelivery);
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"OUT_FOR_DELIVERY\"");
    }

    #[test]
    fn unrecognized_code_degrades_to_unknown() {
        let parsed: StatusCode = serde_json::from_str("\"TELEPORTED\"").unwrap();
        assert_eq!(parsed, StatusCode::Unknown);
    }
}
