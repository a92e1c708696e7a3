//! The normalized log entry and the outbound bulk envelope.
//!
//! These are the only types that cross the wire. Field names serialize in
//! camelCase to match the intake API, and severity serializes as its
//! integer value.
//!
//! # Output Format
//!
//! ```json
//! {
//!   "privateKey": "...",
//!   "applicationName": "orders",
//!   "subsystemName": "checkout",
//!   "computerName": "host-1",
//!   "logEntries": [
//!     {"text":"...","timestamp":1700000000000.0,"severity":3,"category":"...",
//!      "className":"...","methodName":"...","threadId":"..."}
//!   ]
//! }
//! ```

use serde::{Serialize, Serializer};

/// Ordered log severity, matching the intake API's numeric scale.
///
/// Any out-of-range numeric input coerces to [`Severity::Debug`] before
/// storage; see [`Severity::from_value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Severity {
    Debug = 1,
    Verbose = 2,
    Info = 3,
    Warning = 4,
    Error = 5,
    Critical = 6,
}

impl Severity {
    /// Maps a raw numeric severity to the enum, coercing anything outside
    /// `1..=6` to `Debug`.
    #[must_use]
    pub fn from_value(value: i64) -> Self {
        match value {
            2 => Severity::Verbose,
            3 => Severity::Info,
            4 => Severity::Warning,
            5 => Severity::Error,
            6 => Severity::Critical,
            _ => Severity::Debug,
        }
    }

    /// Resolves a severity by name.
    ///
    /// Accepts the canonical level names plus the common aliases `warn`
    /// (warning) and `fatal` (error), case-insensitively. Returns `None`
    /// for unknown names so callers can pick their own fallback.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "debug" => Some(Severity::Debug),
            "verbose" => Some(Severity::Verbose),
            "info" => Some(Severity::Info),
            "warning" | "warn" => Some(Severity::Warning),
            "error" | "fatal" => Some(Severity::Error),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }

    /// The numeric wire value.
    #[must_use]
    pub fn as_value(self) -> u8 {
        self as u8
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

/// One normalized log entry, immutable once constructed.
///
/// `timestamp` is epoch milliseconds already corrected by the clock offset
/// in effect at append time; records buffered before a resync keep their
/// original stamp.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub text: String,
    pub timestamp: f64,
    pub severity: Severity,
    pub category: String,
    pub class_name: String,
    pub method_name: String,
    pub thread_id: String,
}

/// The outbound batch envelope.
///
/// The four identity fields are a fixed template set once at configure
/// time; `log_entries` is replaced per send and never retained after a
/// send attempt sequence completes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkEnvelope {
    pub private_key: String,
    pub application_name: String,
    pub subsystem_name: String,
    pub computer_name: String,
    pub log_entries: Vec<LogRecord>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_record() -> LogRecord {
        LogRecord {
            text: "hello".to_string(),
            timestamp: 1_700_000_000_000.0,
            severity: Severity::Info,
            category: "orders".to_string(),
            class_name: "Checkout".to_string(),
            method_name: "submit".to_string(),
            thread_id: "1".to_string(),
        }
    }

    #[test]
    fn test_severity_from_value_in_range() {
        assert_eq!(Severity::from_value(1), Severity::Debug);
        assert_eq!(Severity::from_value(2), Severity::Verbose);
        assert_eq!(Severity::from_value(3), Severity::Info);
        assert_eq!(Severity::from_value(4), Severity::Warning);
        assert_eq!(Severity::from_value(5), Severity::Error);
        assert_eq!(Severity::from_value(6), Severity::Critical);
    }

    #[test]
    fn test_severity_from_value_coerces_out_of_range() {
        assert_eq!(Severity::from_value(0), Severity::Debug);
        assert_eq!(Severity::from_value(7), Severity::Debug);
        assert_eq!(Severity::from_value(-3), Severity::Debug);
        assert_eq!(Severity::from_value(i64::MAX), Severity::Debug);
    }

    #[test]
    fn test_severity_from_name_aliases() {
        assert_eq!(Severity::from_name("warn"), Some(Severity::Warning));
        assert_eq!(Severity::from_name("fatal"), Some(Severity::Error));
        assert_eq!(Severity::from_name("CRITICAL"), Some(Severity::Critical));
        assert_eq!(Severity::from_name("nope"), None);
    }

    #[test]
    fn test_severity_serializes_as_integer() {
        let json = serde_json::to_string(&Severity::Warning).unwrap();
        assert_eq!(json, "4");
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Debug < Severity::Critical);
        assert!(Severity::Error > Severity::Warning);
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let json = serde_json::to_value(sample_record()).unwrap();

        assert_eq!(json["text"], "hello");
        assert_eq!(json["severity"], 3);
        assert!(json.get("className").is_some());
        assert!(json.get("methodName").is_some());
        assert!(json.get("threadId").is_some());
        assert!(json.get("class_name").is_none());
    }

    #[test]
    fn test_envelope_serializes_camel_case() {
        let envelope = BulkEnvelope {
            private_key: "pk".to_string(),
            application_name: "app".to_string(),
            subsystem_name: "sub".to_string(),
            computer_name: "host".to_string(),
            log_entries: vec![sample_record()],
        };

        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["privateKey"], "pk");
        assert_eq!(json["applicationName"], "app");
        assert_eq!(json["subsystemName"], "sub");
        assert_eq!(json["computerName"], "host");
        assert_eq!(json["logEntries"].as_array().unwrap().len(), 1);
    }
}
