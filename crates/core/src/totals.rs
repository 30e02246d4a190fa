//! In-memory cost totals per object level.

use std::collections::HashMap;

use crate::object::ObjectType;

/// Accumulated cost per object id, for every [`ObjectType`].
///
/// One bucket map exists per level from construction on, so an empty level
/// is still present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationTotals {
    buckets: [HashMap<String, f64>; 4],
}

/// Per-level digest of a totals structure.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelSummary {
    pub object_type: ObjectType,
    pub objects: usize,
    pub total_cost: f64,
}

impl AggregationTotals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `cost` to `id` at `object_type`, inserting the entry if absent.
    pub fn add(&mut self, object_type: ObjectType, id: &str, cost: f64) {
        let bucket = &mut self.buckets[object_type.index()];
        match bucket.get_mut(id) {
            Some(total) => *total += cost,
            None => {
                bucket.insert(id.to_owned(), cost);
            }
        }
    }

    pub fn get(&self, object_type: ObjectType, id: &str) -> Option<f64> {
        self.buckets[object_type.index()].get(id).copied()
    }

    /// All ids and costs of one level.
    pub fn level(&self, object_type: ObjectType) -> &HashMap<String, f64> {
        &self.buckets[object_type.index()]
    }

    /// Every `(object_type, object_id, cost)` triple.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectType, &str, f64)> + '_ {
        ObjectType::ALL.into_iter().flat_map(move |ty| {
            self.buckets[ty.index()]
                .iter()
                .map(move |(id, cost)| (ty, id.as_str(), *cost))
        })
    }

    /// Number of triples.
    pub fn len(&self) -> usize {
        self.buckets.iter().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(HashMap::is_empty)
    }

    /// Folds `other` into `self`, summing costs of shared ids.
    pub fn merge(&mut self, other: AggregationTotals) {
        for (ty, bucket) in ObjectType::ALL.into_iter().zip(other.buckets) {
            let target = &mut self.buckets[ty.index()];
            if target.is_empty() {
                *target = bucket;
                continue;
            }
            for (id, cost) in bucket {
                *target.entry(id).or_insert(0.0) += cost;
            }
        }
    }

    pub fn summary(&self) -> Vec<LevelSummary> {
        ObjectType::ALL
            .into_iter()
            .map(|ty| {
                let bucket = self.level(ty);
                LevelSummary {
                    object_type: ty,
                    objects: bucket.len(),
                    total_cost: bucket.values().sum(),
                }
            })
            .collect()
    }
}
