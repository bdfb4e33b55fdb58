//! PVA payloads and structure navigation.
//!
//! PVA servers deliver normative-type structures; the transport hands
//! them over as JSON-shaped values. Typed views of the common
//! sub-structures deserialize with serde; arbitrary `structure`
//! payloads are navigated with a [`crate::FieldPath`], applying the
//! bracketed indices that were stripped from the network request.
//!
//! Out-of-range indices and wrong node kinds are configuration errors:
//! they are reported once and the affected widget stays disconnected,
//! they never abort the runtime.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::protocol::FieldPath;

/// A PVA payload as delivered by the transport.
pub type PvaValue = Value;

#[derive(Debug, Error, PartialEq)]
pub enum NavError {
    #[error("field {0:?} not present in structure")]
    MissingField(String),
    #[error("index {index} out of range for field {field:?} (len {len})")]
    IndexOutOfRange {
        field: String,
        index: usize,
        len: usize,
    },
    #[error("field {0:?} is not an array but an index was given")]
    NotAnArray(String),
    #[error("field {0:?} is not a structure")]
    NotAStructure(String),
}

/// Walk a structure along `path`, applying bracketed indices locally.
pub fn navigate<'v>(root: &'v PvaValue, path: &FieldPath) -> Result<&'v PvaValue, NavError> {
    let mut node = root;
    for segment in &path.segments {
        let object = node
            .as_object()
            .ok_or_else(|| NavError::NotAStructure(segment.name.clone()))?;
        node = object
            .get(&segment.name)
            .ok_or_else(|| NavError::MissingField(segment.name.clone()))?;
        for &index in &segment.indices {
            let array = node
                .as_array()
                .ok_or_else(|| NavError::NotAnArray(segment.name.clone()))?;
            node = array.get(index).ok_or_else(|| NavError::IndexOutOfRange {
                field: segment.name.clone(),
                index,
                len: array.len(),
            })?;
        }
    }
    Ok(node)
}

/// `alarm` sub-structure of the normative types.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NtAlarm {
    #[serde(default)]
    pub severity: i16,
    #[serde(default)]
    pub status: i16,
    #[serde(default)]
    pub message: String,
}

/// `display` sub-structure: limits, precision, units.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NtDisplay {
    #[serde(default, rename = "limitLow")]
    pub limit_low: f64,
    #[serde(default, rename = "limitHigh")]
    pub limit_high: f64,
    #[serde(default)]
    pub precision: Option<i16>,
    #[serde(default)]
    pub units: String,
}

/// `control` sub-structure: write limits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NtControl {
    #[serde(default, rename = "limitLow")]
    pub limit_low: f64,
    #[serde(default, rename = "limitHigh")]
    pub limit_high: f64,
}

/// `value` field of an NTEnum.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NtEnumValue {
    #[serde(default)]
    pub index: i32,
    #[serde(default)]
    pub choices: Vec<String>,
}

/// Read a typed sub-structure off a payload field, tolerating absence.
pub fn read_section<T: for<'de> Deserialize<'de>>(root: &PvaValue, field: &str) -> Option<T> {
    root.get(field)
        .cloned()
        .and_then(|value| serde_json::from_value(value).ok())
}
