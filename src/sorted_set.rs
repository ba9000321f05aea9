use std::collections::HashMap;
use std::ops::Bound;

use bytes::Bytes;

use crate::utils::skiplist::SkipList;

/// A collection of distinct members ordered by ascending score, ties broken by the member bytes.
///
/// The skip list answers rank and score-range queries; the map gives constant-time membership and
/// score lookups so an update can find the entry it replaces.
#[derive(Debug, Default)]
pub struct SortedSet {
    scores: HashMap<Bytes, f64>,
    ranks: SkipList,
}

impl SortedSet {
    pub fn new() -> SortedSet {
        SortedSet::default()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Adds `member` or moves it to `score`. Returns `true` if the member is new.
    pub fn add(&mut self, score: f64, member: Bytes) -> bool {
        // -0 and 0 are the same score; the index orders with `total_cmp`, which tells them apart.
        let score = score + 0.0;

        match self.scores.insert(member.clone(), score) {
            Some(previous) if previous.total_cmp(&score).is_eq() => false,
            Some(previous) => {
                self.ranks.remove(previous, &member);
                self.ranks.insert(score, member);
                false
            }
            None => {
                self.ranks.insert(score, member);
                true
            }
        }
    }

    /// Removes `member`, returning whether it was present.
    pub fn remove(&mut self, member: &[u8]) -> bool {
        match self.scores.remove(member) {
            Some(score) => self.ranks.remove(score, member),
            None => false,
        }
    }

    pub fn score(&self, member: &[u8]) -> Option<f64> {
        self.scores.get(member).copied()
    }

    /// Members within the inclusive rank range `[start, stop]`.
    ///
    /// A negative index counts from the end, `-1` being the last member. Both indices are then
    /// clamped into the set; an inverted range is empty.
    pub fn range(&self, start: i64, stop: i64) -> Vec<(Bytes, f64)> {
        let Some((start, stop)) = normalize_range(start, stop, self.len()) else {
            return vec![];
        };

        self.ranks
            .iter_from(start)
            .take(stop - start + 1)
            .map(|(score, member)| (member.clone(), score))
            .collect()
    }

    /// Number of members whose score lies between `min` and `max`.
    pub fn count(&self, min: Bound<f64>, max: Bound<f64>) -> usize {
        let below_min = self.ranks.count_while(|score| match min {
            Bound::Included(min) => score < min,
            Bound::Excluded(min) => score <= min,
            Bound::Unbounded => false,
        });
        let up_to_max = self.ranks.count_while(|score| match max {
            Bound::Included(max) => score <= max,
            Bound::Excluded(max) => score < max,
            Bound::Unbounded => true,
        });

        up_to_max.saturating_sub(below_min)
    }
}

fn normalize_range(start: i64, stop: i64, len: usize) -> Option<(usize, usize)> {
    if len == 0 {
        return None;
    }

    let len = len as i64;
    let normalize = |index: i64| {
        let index = if index < 0 { len + index } else { index };
        index.clamp(0, len - 1)
    };

    let (start, stop) = (normalize(start), normalize(stop));
    (start <= stop).then_some((start as usize, stop as usize))
}

/// Shortest decimal rendering of a score that parses back to the same value.
pub fn format_score(score: f64) -> String {
    score.to_string()
}
