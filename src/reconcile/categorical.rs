// src/reconcile/categorical.rs
use std::collections::HashMap;

use crate::model::BucketedResult;
use crate::reconcile::{assemble, ReconciledAxis};

/// Union of keys in first-seen order, no range math.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoricalAxis {
    bucket_limit: usize,
}

impl CategoricalAxis {
    pub fn new(bucket_limit: usize) -> Self {
        Self { bucket_limit }
    }

    pub fn reconcile(&self, results: &[BucketedResult]) -> ReconciledAxis {
        let mut keys: Vec<String> = Vec::new();
        let mut slots: HashMap<&str, usize> = HashMap::new();
        let mut truncated = false;

        for entry in results.iter().flat_map(|r| r.entries.iter()) {
            if slots.contains_key(entry.key.as_str()) {
                continue;
            }
            if keys.len() == self.bucket_limit {
                truncated = true;
                break;
            }
            slots.insert(entry.key.as_str(), keys.len());
            keys.push(entry.key.clone());
        }

        let placements = results
            .iter()
            .map(|r| {
                r.entries
                    .iter()
                    .filter_map(|e| slots.get(e.key.as_str()).map(|slot| (*slot, e.value)))
                    .collect()
            })
            .collect();

        assemble(results, keys, placements, truncated)
    }
}
