use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// One compiled contract as handed over by the artifact locator.
///
/// The four artifact fields distinguish "absent" (`None`) from an explicit
/// JSON `null` (`Some(None)`), because the sanitizer reports a null as
/// stripped but has nothing to say about a field that was never there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractRecord {
    pub contract_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub bytecode: Option<Option<String>>,

    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub deployed_bytecode: Option<Option<String>>,

    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub source_map: Option<Option<String>>,

    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub deployed_source_map: Option<Option<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ast: Option<serde_json::Value>,

    #[serde(default, rename = "legacyAST", skip_serializing_if = "Option::is_none")]
    pub legacy_ast: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiler: Option<CompilerInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerInfo {
    pub name: String,
    pub version: String,
}

fn explicit_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl ContractRecord {
    pub fn new(contract_name: impl Into<String>) -> Self {
        Self {
            contract_name: contract_name.into(),
            source_path: None,
            source: None,
            bytecode: None,
            deployed_bytecode: None,
            source_map: None,
            deployed_source_map: None,
            ast: None,
            legacy_ast: None,
            compiler: None,
        }
    }

    pub fn with_source(mut self, path: impl Into<String>, source: impl Into<String>) -> Self {
        self.source_path = Some(path.into());
        self.source = Some(source.into());
        self
    }

    pub fn with_bytecode(mut self, bytecode: impl Into<String>) -> Self {
        self.bytecode = Some(Some(bytecode.into()));
        self
    }

    pub fn with_deployed_bytecode(mut self, bytecode: impl Into<String>) -> Self {
        self.deployed_bytecode = Some(Some(bytecode.into()));
        self
    }

    pub fn with_source_map(mut self, source_map: impl Into<String>) -> Self {
        self.source_map = Some(Some(source_map.into()));
        self
    }

    pub fn with_deployed_source_map(mut self, source_map: impl Into<String>) -> Self {
        self.deployed_source_map = Some(Some(source_map.into()));
        self
    }

    pub fn with_compiler(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.compiler = Some(CompilerInfo {
            name: name.into(),
            version: version.into(),
        });
        self
    }

    /// Translates the record into the service's request schema.
    pub fn to_payload(&self) -> AnalysisPayload {
        let main_source = self.source_path.clone();
        let source_list = main_source.iter().cloned().collect();

        let mut sources = BTreeMap::new();
        if let Some(path) = &self.source_path {
            sources.insert(
                path.clone(),
                SourceEntry {
                    source: self.source.clone(),
                    ast: self.ast.clone(),
                    legacy_ast: self.legacy_ast.clone(),
                },
            );
        }

        AnalysisPayload {
            contract_name: self.contract_name.clone(),
            bytecode: present(&self.bytecode),
            deployed_bytecode: present(&self.deployed_bytecode),
            source_map: present(&self.source_map),
            deployed_source_map: present(&self.deployed_source_map),
            source_list,
            main_source,
            sources,
            solc_version: self.compiler.as_ref().map(|c| c.version.clone()),
            analysis_mode: AnalysisMode::Quick,
        }
    }
}

fn present(field: &Option<Option<String>>) -> Option<String> {
    field.as_ref().and_then(|value| value.clone())
}

/// Body of one submission's `data` member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisPayload {
    pub contract_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytecode: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployed_bytecode: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_map: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployed_source_map: Option<String>,

    pub source_list: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_source: Option<String>,

    pub sources: BTreeMap<String, SourceEntry>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub solc_version: Option<String>,

    pub analysis_mode: AnalysisMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ast: Option<serde_json::Value>,

    #[serde(rename = "legacyAST", skip_serializing_if = "Option::is_none")]
    pub legacy_ast: Option<serde_json::Value>,
}

/// Only the fast mode is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    Quick,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_and_absent_are_distinct() {
        let record: ContractRecord = serde_json::from_value(json!({
            "contractName": "SimpleDAO",
            "bytecode": "0x6080",
            "sourceMap": null
        }))
        .unwrap();

        assert_eq!(record.bytecode, Some(Some("0x6080".to_string())));
        assert_eq!(record.source_map, Some(None));
        assert_eq!(record.deployed_bytecode, None);
    }

    #[test]
    fn test_payload_translation() {
        let record = ContractRecord::new("SimpleDAO")
            .with_source("contracts/simple_dao.sol", "contract SimpleDAO {}")
            .with_bytecode("0x6080")
            .with_compiler("solc", "0.5.0");

        let payload = record.to_payload();
        assert_eq!(payload.contract_name, "SimpleDAO");
        assert_eq!(payload.bytecode.as_deref(), Some("0x6080"));
        assert_eq!(payload.deployed_bytecode, None);
        assert_eq!(payload.source_list, vec!["contracts/simple_dao.sol"]);
        assert_eq!(payload.main_source.as_deref(), Some("contracts/simple_dao.sol"));
        assert_eq!(payload.solc_version.as_deref(), Some("0.5.0"));
        assert_eq!(payload.analysis_mode, AnalysisMode::Quick);

        let wire = serde_json::to_value(&payload).unwrap();
        assert_eq!(wire["analysisMode"], "quick");
        assert!(wire.get("deployedBytecode").is_none());
    }
}
