//! Artifact cleanup before submission
//!
//! Build tools emit placeholder values for artifacts that have nothing in
//! them: an empty string, a JSON null, or `0x` for a contract compiled with
//! no code (interfaces, abstract contracts). The service rejects or
//! misreads those, so they are dropped from the outgoing record. The input
//! record is left untouched and a cleaned copy is returned along with the
//! names of the fields that were dropped.

use crate::core::ContractRecord;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Bytecode placeholder for a contract compiled with no code.
pub const EMPTY_BYTECODE: &str = "0x";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ArtifactField {
    Bytecode,
    DeployedBytecode,
    SourceMap,
    DeployedSourceMap,
}

impl ArtifactField {
    pub const ALL: [ArtifactField; 4] = [
        Self::Bytecode,
        Self::DeployedBytecode,
        Self::SourceMap,
        Self::DeployedSourceMap,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bytecode => "bytecode",
            Self::DeployedBytecode => "deployedBytecode",
            Self::SourceMap => "sourceMap",
            Self::DeployedSourceMap => "deployedSourceMap",
        }
    }

    fn holds_bytecode(&self) -> bool {
        matches!(self, Self::Bytecode | Self::DeployedBytecode)
    }

    fn slot<'a>(&self, record: &'a mut ContractRecord) -> &'a mut Option<Option<String>> {
        match self {
            Self::Bytecode => &mut record.bytecode,
            Self::DeployedBytecode => &mut record.deployed_bytecode,
            Self::SourceMap => &mut record.source_map,
            Self::DeployedSourceMap => &mut record.deployed_source_map,
        }
    }
}

impl fmt::Display for ArtifactField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StripReason {
    Null,
    Empty,
    NoCode,
}

/// Emitted once per stripped field when diagnostics are on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SanitizeEvent {
    pub contract: String,
    pub field: ArtifactField,
    pub reason: StripReason,
}

impl fmt::Display for SanitizeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let why = match self.reason {
            StripReason::Null => "is null",
            StripReason::Empty => "is empty",
            StripReason::NoCode => "is \"0x\" (compiled with no code)",
        };
        write!(
            f,
            "{}: {} {}; omitting it from the submission",
            self.contract, self.field, why
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sanitized {
    pub record: ContractRecord,
    pub stripped: BTreeSet<ArtifactField>,
}

pub fn sanitize<F>(record: &ContractRecord, diagnostics: bool, mut sink: F) -> Sanitized
where
    F: FnMut(&SanitizeEvent),
{
    let mut clean = record.clone();
    let mut stripped = BTreeSet::new();
    let mut events = Vec::new();

    for field in ArtifactField::ALL {
        let slot = field.slot(&mut clean);
        let reason = match &*slot {
            Some(None) => Some(StripReason::Null),
            Some(Some(value)) if value.is_empty() => Some(StripReason::Empty),
            Some(Some(value)) if field.holds_bytecode() && value.as_str() == EMPTY_BYTECODE => {
                Some(StripReason::NoCode)
            }
            _ => None,
        };

        if let Some(reason) = reason {
            *slot = None;
            stripped.insert(field);
            events.push(SanitizeEvent {
                contract: record.contract_name.clone(),
                field,
                reason,
            });
        }
    }

    if diagnostics {
        for event in &events {
            sink(event);
        }
    }

    Sanitized {
        record: clean,
        stripped,
    }
}
