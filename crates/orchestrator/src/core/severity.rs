use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity as reported by the analysis service.
///
/// The service decides what a finding is and how bad it is; this type only
/// carries the label through to the report. Labels the service may add later
/// land in `Unknown` instead of failing the whole response.
///
/// `Unknown` orders below every known label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "High"),
            Self::Medium => write!(f, "Medium"),
            Self::Low => write!(f, "Low"),
            Self::None => write!(f, "None"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

impl Severity {
    fn rank(&self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::None => 1,
            Self::Low => 2,
            Self::Medium => 3,
            Self::High => 4,
        }
    }
}

impl Ord for Severity {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl PartialOrd for Severity {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrecognized_label_is_unknown() {
        let parsed: Severity = serde_json::from_str("\"Catastrophic\"").unwrap();
        assert_eq!(parsed, Severity::Unknown);

        let parsed: Severity = serde_json::from_str("\"High\"").unwrap();
        assert_eq!(parsed, Severity::High);
        assert!(Severity::High > Severity::Low);
    }

    #[test]
    fn test_unknown_orders_lowest() {
        assert!(Severity::Unknown < Severity::None);
        assert_eq!(
            [Severity::High, Severity::Unknown, Severity::Low].iter().max(),
            Some(&Severity::High)
        );
        assert_eq!(
            [Severity::None, Severity::Unknown].iter().min(),
            Some(&Severity::Unknown)
        );
    }

    #[test]
    fn test_issue_with_unknown_label_still_parses() {
        let issue: crate::core::Issue = serde_json::from_value(serde_json::json!({
            "description": { "head": "Gas griefing", "tail": "Unbounded loop" },
            "locations": [{ "sourceMap": "12:3:0" }],
            "severity": "Catastrophic",
            "swcID": "SWC-128",
            "swcTitle": "DoS With Block Gas Limit"
        }))
        .unwrap();
        assert_eq!(issue.severity, Severity::Unknown);
    }
}
