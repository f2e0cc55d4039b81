// src/model/result.rs
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::model::filter::ReportFilter;
use crate::model::report::ReportDefinition;

/// One bucket of a grouped result. `None` means "no data", never zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapEntry {
    pub key: String,
    pub value: Option<f64>,
}

impl MapEntry {
    pub fn new(key: impl Into<String>, value: Option<f64>) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Ordered key/value buckets with unique keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketedResult {
    pub entries: Vec<MapEntry>,
    /// False when the bucket list was cut at the bucket limit.
    #[serde(default = "complete")]
    pub is_complete: bool,
}

fn complete() -> bool {
    true
}

impl Default for BucketedResult {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            is_complete: true,
        }
    }
}

impl BucketedResult {
    pub fn new(entries: Vec<MapEntry>) -> Self {
        Self {
            entries,
            is_complete: true,
        }
    }

    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<f64>)>,
        K: Into<String>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(key, value)| MapEntry::new(key, value))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.key.as_str()).collect()
    }

    pub fn values(&self) -> Vec<Option<f64>> {
        self.entries.iter().map(|e| e.value).collect()
    }

    /// Value at `key`; `None` if the key is absent or its value is null.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .and_then(|e| e.value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|e| e.key == key)
    }
}

/// A row of a raw-data report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDataRow {
    pub instance_id: String,
    pub definition_key: String,
    pub start_date: String,
    pub end_date: Option<String>,
    #[serde(default)]
    pub variables: BTreeMap<String, serde_json::Value>,
}

/// Result payload of a single report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ResultData {
    Map(BucketedResult),
    Number(Option<f64>),
    Raw(Vec<RawDataRow>),
}

impl ResultData {
    pub fn as_map(&self) -> Option<&BucketedResult> {
        match self {
            ResultData::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Same shape with every value cleared, for results backed by no instances.
    pub fn without_values(self) -> Self {
        match self {
            ResultData::Map(mut map) => {
                for entry in &mut map.entries {
                    entry.value = None;
                }
                ResultData::Map(map)
            }
            ResultData::Number(_) => ResultData::Number(None),
            raw => raw,
        }
    }
}

/// What a single-report evaluation produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleReportResult {
    pub data: ResultData,
    /// Ids of the instances that matched the report's effective filters.
    #[serde(default)]
    pub instance_ids: BTreeSet<String>,
}

impl SingleReportResult {
    pub fn instance_count(&self) -> u64 {
        self.instance_ids.len() as u64
    }
}

/// Which filters took part in a member's evaluation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOutcome {
    pub applied: Vec<ReportFilter>,
    pub skipped: Vec<SkippedFilter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedFilter {
    pub filter: ReportFilter,
    pub reason: String,
}

/// One member's share of a combined evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberResult {
    pub report: ReportDefinition,
    pub data: ResultData,
    pub instance_count: u64,
    pub filters: FilterOutcome,
}

impl MemberResult {
    pub fn map(&self) -> Option<&BucketedResult> {
        self.data.as_map()
    }
}

/// A member left out of a combined evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExcludedMember {
    pub report_id: String,
    pub reason: String,
}

/// Evaluated combined report: members on one shared axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedResult {
    pub members: Vec<MemberResult>,
    /// Distinct instances across all members.
    pub instance_count: u64,
    #[serde(default)]
    pub excluded: Vec<ExcludedMember>,
    pub is_complete: bool,
}

impl Default for CombinedResult {
    fn default() -> Self {
        Self {
            members: Vec::new(),
            instance_count: 0,
            excluded: Vec::new(),
            is_complete: true,
        }
    }
}

impl CombinedResult {
    pub fn get(&self, report_id: &str) -> Option<&MemberResult> {
        self.members.iter().find(|m| m.report.id == report_id)
    }

    pub fn member_ids(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.report.id.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
