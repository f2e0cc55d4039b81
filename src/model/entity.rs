// src/model/entity.rs
use serde::{Deserialize, Serialize};

/// A dashboard showing report tiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub collection_id: Option<String>,
    #[serde(default)]
    pub report_ids: Vec<String>,
}

impl Dashboard {
    pub fn shows(&self, report_id: &str) -> bool {
        self.report_ids.iter().any(|id| id == report_id)
    }

    pub fn remove_report(&mut self, report_id: &str) -> bool {
        let before = self.report_ids.len();
        self.report_ids.retain(|id| id != report_id);
        before != self.report_ids.len()
    }
}

/// A threshold alert on a number report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub name: String,
    pub report_id: String,
    #[serde(default)]
    pub threshold: f64,
}

/// A shared space owning reports and dashboards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,
    pub name: String,
}

/// Kind of item that blocks an update or delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConflictedItemType {
    CombinedReport,
    Report,
    Alert,
    Dashboard,
    Collection,
}

impl std::fmt::Display for ConflictedItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConflictedItemType::CombinedReport => "combined report",
            ConflictedItemType::Report => "report",
            ConflictedItemType::Alert => "alert",
            ConflictedItemType::Dashboard => "dashboard",
            ConflictedItemType::Collection => "collection",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictedItem {
    pub item_type: ConflictedItemType,
    pub id: String,
    pub name: String,
}

/// Every dependent an operation would orphan or invalidate.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictSet {
    pub items: Vec<ConflictedItem>,
}

impl ConflictSet {
    pub fn push(&mut self, item_type: ConflictedItemType, id: &str, name: &str) {
        let item = ConflictedItem {
            item_type,
            id: id.to_string(),
            name: name.to_string(),
        };
        if let Err(pos) = self.items.binary_search(&item) {
            self.items.insert(pos, item);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn of_type(&self, item_type: ConflictedItemType) -> Vec<&ConflictedItem> {
        self.items
            .iter()
            .filter(|item| item.item_type == item_type)
            .collect()
    }

    pub fn contains(&self, item_type: ConflictedItemType, id: &str) -> bool {
        self.items
            .iter()
            .any(|item| item.item_type == item_type && item.id == id)
    }
}
