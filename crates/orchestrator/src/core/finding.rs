use crate::core::Severity;
use serde::{Deserialize, Serialize};

/// One issue report as the service returns it: the issues found against one
/// source list, plus service metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_format: Option<String>,

    #[serde(default)]
    pub source_list: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,

    #[serde(default)]
    pub issues: Vec<Issue>,

    #[serde(default)]
    pub meta: ReportMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub description: IssueDescription,

    #[serde(default)]
    pub locations: Vec<SourceLocation>,

    pub severity: Severity,

    #[serde(rename = "swcID")]
    pub swc_id: String,

    #[serde(rename = "swcTitle")]
    pub swc_title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueDescription {
    pub head: String,
    pub tail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub source_map: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_compiler: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub error: Vec<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warning: Vec<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<ServiceLog>,
}

/// A diagnostic line the service attached to its report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceLog {
    pub level: String,
    pub msg: String,
}

/// A finding flattened out of an [`Issue`] for the report layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub head: String,

    pub tail: String,

    pub severity: Severity,

    #[serde(rename = "swcID")]
    pub swc_id: String,

    #[serde(rename = "swcTitle")]
    pub swc_title: String,

    pub locations: Vec<SourceLocation>,
}

impl From<&Issue> for Finding {
    fn from(issue: &Issue) -> Self {
        Self {
            head: issue.description.head.clone(),
            tail: issue.description.tail.clone(),
            severity: issue.severity,
            swc_id: issue.swc_id.clone(),
            swc_title: issue.swc_title.clone(),
            locations: issue.locations.clone(),
        }
    }
}

impl IssueReport {
    /// Validates an `issues` payload against the report schema.
    ///
    /// Only a JSON array of reports is accepted. An object (even an empty
    /// one), a string or a number is malformed; an empty array is a valid
    /// "nothing found".
    pub fn parse_list(value: &serde_json::Value) -> Result<Vec<IssueReport>, String> {
        match value {
            serde_json::Value::Array(_) => serde_json::from_value(value.clone())
                .map_err(|e| format!("issues payload does not match the report schema: {}", e)),
            serde_json::Value::Null => Err("issues payload is missing".to_string()),
            other => Err(format!(
                "issues payload must be a list of reports, got {}",
                json_kind(other)
            )),
        }
    }
}

/// Flattens reports into findings and collects the service log lines.
pub fn collect_findings(reports: &[IssueReport]) -> (Vec<Finding>, Vec<ServiceLog>) {
    let findings = reports
        .iter()
        .flat_map(|report| report.issues.iter().map(Finding::from))
        .collect();
    let logs = reports
        .iter()
        .flat_map(|report| report.meta.logs.iter().cloned())
        .collect();
    (findings, logs)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "a list",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_report() -> serde_json::Value {
        json!([{
            "sourceFormat": "evm-byzantium-bytecode",
            "sourceList": ["contracts/simple_dao.sol"],
            "sourceType": "raw-bytecode",
            "issues": [{
                "description": { "head": "Head message", "tail": "Tail message" },
                "locations": [{ "sourceMap": "444:1:0" }],
                "severity": "High",
                "swcID": "SWC-000",
                "swcTitle": "Test Title"
            }],
            "meta": {
                "selected_compiler": "0.5.0",
                "error": [],
                "warning": [],
                "logs": [{ "level": "info", "msg": "message1" }]
            }
        }])
    }

    #[test]
    fn test_finding_uses_report_field_names() {
        let reports = IssueReport::parse_list(&sample_report()).unwrap();
        let (findings, _) = collect_findings(&reports);

        let json = serde_json::to_value(&findings[0]).unwrap();
        assert_eq!(json["swcID"], "SWC-000");
        assert_eq!(json["swcTitle"], "Test Title");
        assert_eq!(json["locations"][0]["sourceMap"], "444:1:0");
        assert!(json.get("swc_id").is_none());
    }

    #[test]
    fn test_parse_valid_report_list() {
        let reports = IssueReport::parse_list(&sample_report()).unwrap();
        assert_eq!(reports.len(), 1);

        let (findings, logs) = collect_findings(&reports);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].head, "Head message");
        assert_eq!(findings[0].swc_id, "SWC-000");
        assert_eq!(findings[0].severity, Severity::High);
        assert_eq!(findings[0].locations[0].source_map, "444:1:0");
        assert_eq!(logs, vec![ServiceLog { level: "info".into(), msg: "message1".into() }]);
    }

    #[test]
    fn test_empty_list_is_valid() {
        let reports = IssueReport::parse_list(&json!([])).unwrap();
        assert!(reports.is_empty());
    }

    #[test]
    fn test_empty_object_is_malformed() {
        let err = IssueReport::parse_list(&json!({})).unwrap_err();
        assert!(err.contains("an object"));
    }

    #[test]
    fn test_schema_mismatch_is_malformed() {
        let err = IssueReport::parse_list(&json!([{ "issues": "nope" }])).unwrap_err();
        assert!(err.contains("report schema"));
    }
}
