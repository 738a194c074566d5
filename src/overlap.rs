//! Reciprocal-overlap queries over per-chromosome interval trees.

use bio::data_structures::interval_tree::ArrayBackedIntervalTree;

use crate::common::{reciprocal_overlap, ChromMap};
use crate::model::SvInterval;

/// Alias for the interval tree that we use.
type IntervalTree = ArrayBackedIntervalTree<i32, u32>;

/// Set of tagged intervals indexed for reciprocal-overlap queries.
///
/// Entry identifiers are positions in ingestion order.  Two indexes can be
/// intersected only when they were built with the same chromosome map.
#[derive(Debug, Default)]
pub struct OverlapIndex {
    /// All intervals, in ingestion order.
    entries: Vec<SvInterval>,
    /// Interval trees, indexed by chromosome rank.
    trees: Vec<IntervalTree>,
    /// Chromosome ranks, aligned with `entries`.
    ranks: Vec<usize>,
}

impl OverlapIndex {
    /// Build the index from intervals, in the given order.
    pub fn build(intervals: Vec<SvInterval>, chrom_map: &mut ChromMap) -> Self {
        let mut result = Self::default();
        for interval in intervals {
            let rank = chrom_map.get_or_insert(&interval.chrom);
            while result.trees.len() <= rank {
                result.trees.push(IntervalTree::new());
            }
            result.trees[rank].insert(interval.range(), result.entries.len() as u32);
            result.ranks.push(rank);
            result.entries.push(interval);
        }
        result.trees.iter_mut().for_each(|tree| tree.index());
        result
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, id: u32) -> &SvInterval {
        &self.entries[id as usize]
    }

    /// Identifiers of entries overlapping `query` on the chromosome with
    /// rank `rank`, sorted ascending.  With `min_overlap` unset, any strict
    /// overlap qualifies.
    fn hits(
        &self,
        query: &SvInterval,
        rank: usize,
        min_overlap: Option<f32>,
        kind_match: bool,
    ) -> Vec<u32> {
        let Some(tree) = self.trees.get(rank) else {
            return Vec::new();
        };
        let mut result = tree
            .find(query.range())
            .iter()
            .map(|entry| *entry.data())
            .filter(|&id| {
                let other = &self.entries[id as usize];
                (!kind_match || other.sv_type == query.sv_type)
                    && match min_overlap {
                        Some(min_overlap) => {
                            reciprocal_overlap(query.range(), other.range()) >= min_overlap
                        }
                        None => true,
                    }
            })
            .collect::<Vec<_>>();
        result.sort_unstable();
        result
    }

    /// All reciprocal self-overlap pairs `(a, b)` of entry identifiers.
    ///
    /// The outer loop runs in ingestion order and hits come sorted, so every
    /// entry pairs with itself before anything else pairs with it.
    pub fn self_intersect(&self, min_overlap: f32, kind_match: bool) -> Vec<(u32, u32)> {
        let mut pairs = Vec::new();
        for (id, entry) in self.entries.iter().enumerate() {
            for hit in self.hits(entry, self.ranks[id], Some(min_overlap), kind_match) {
                pairs.push((id as u32, hit));
            }
        }
        pairs
    }

    /// All overlap pairs `(a, b)` with `a` from `self` and `b` from `other`.
    pub fn intersect(
        &self,
        other: &OverlapIndex,
        min_overlap: Option<f32>,
        kind_match: bool,
    ) -> Vec<(u32, u32)> {
        let mut pairs = Vec::new();
        for (id, entry) in self.entries.iter().enumerate() {
            for hit in other.hits(entry, self.ranks[id], min_overlap, kind_match) {
                pairs.push((id as u32, hit));
            }
        }
        pairs
    }

    /// Per entry of `self`, the number of entries in `other` overlapping it
    /// by any amount.
    pub fn count_overlaps(&self, other: &OverlapIndex) -> Vec<u32> {
        let mut counts = vec![0u32; self.entries.len()];
        for (id, _) in self.intersect(other, None, false) {
            counts[id as usize] += 1;
        }
        counts
    }
}
