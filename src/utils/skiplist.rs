//! An order-statistics skip list ordered by `(score, member)`.
//!
//! Nodes live in a single arena and link to each other by index. Every forward link also records
//! its span, the number of ranks it skips, so a node can be located by rank in logarithmic time.

use std::cmp::Ordering;

use bytes::Bytes;
use rand::Rng;

const MAX_LEVEL: usize = 32;
const PROMOTION_PROBABILITY: f64 = 0.25;
const HEAD: usize = 0;

#[derive(Debug, Clone, Copy, Default)]
struct Link {
    forward: Option<usize>,
    span: usize,
}

#[derive(Debug)]
struct Node {
    score: f64,
    member: Bytes,
    levels: Vec<Link>,
}

impl Node {
    fn cmp_key(&self, score: f64, member: &[u8]) -> Ordering {
        self.score
            .total_cmp(&score)
            .then_with(|| self.member.as_ref().cmp(member))
    }
}

#[derive(Debug)]
pub struct SkipList {
    nodes: Vec<Node>,
    free: Vec<usize>,
    level: usize,
    len: usize,
}

impl SkipList {
    pub fn new() -> SkipList {
        let head = Node {
            score: 0.0,
            member: Bytes::new(),
            levels: vec![Link::default(); MAX_LEVEL],
        };

        SkipList {
            nodes: vec![head],
            free: Vec::new(),
            level: 1,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn link(&self, node: usize, level: usize) -> Link {
        self.nodes[node].levels[level]
    }

    fn link_mut(&mut self, node: usize, level: usize) -> &mut Link {
        &mut self.nodes[node].levels[level]
    }

    /// Inserts `(score, member)`. The caller guarantees the pair is not already present.
    pub fn insert(&mut self, score: f64, member: Bytes) {
        let mut update = [HEAD; MAX_LEVEL];
        let mut rank = [0usize; MAX_LEVEL];

        let mut x = HEAD;
        for i in (0..self.level).rev() {
            rank[i] = if i + 1 == self.level { 0 } else { rank[i + 1] };
            while let Some(next) = self.link(x, i).forward {
                if self.nodes[next].cmp_key(score, &member) == Ordering::Less {
                    rank[i] += self.link(x, i).span;
                    x = next;
                } else {
                    break;
                }
            }
            update[i] = x;
        }

        let level = random_level();
        if level > self.level {
            for i in self.level..level {
                rank[i] = 0;
                update[i] = HEAD;
                self.link_mut(HEAD, i).span = self.len;
            }
            self.level = level;
        }

        let node = self.alloc(score, member, level);
        for i in 0..level {
            let prev = self.link(update[i], i);
            let skipped = rank[0] - rank[i];

            *self.link_mut(node, i) = Link {
                forward: prev.forward,
                span: prev.span - skipped,
            };
            *self.link_mut(update[i], i) = Link {
                forward: Some(node),
                span: skipped + 1,
            };
        }

        // Links above the new node's height now pass over one more node.
        for i in level..self.level {
            self.link_mut(update[i], i).span += 1;
        }

        self.len += 1;
    }

    /// Removes `(score, member)`, returning whether it was present.
    pub fn remove(&mut self, score: f64, member: &[u8]) -> bool {
        let mut update = [HEAD; MAX_LEVEL];

        let mut x = HEAD;
        for i in (0..self.level).rev() {
            while let Some(next) = self.link(x, i).forward {
                if self.nodes[next].cmp_key(score, member) == Ordering::Less {
                    x = next;
                } else {
                    break;
                }
            }
            update[i] = x;
        }

        let target = match self.link(x, 0).forward {
            Some(next) if self.nodes[next].cmp_key(score, member) == Ordering::Equal => next,
            _ => return false,
        };

        for i in 0..self.level {
            let prev = self.link(update[i], i);
            if prev.forward == Some(target) {
                let removed = self.link(target, i);
                *self.link_mut(update[i], i) = Link {
                    forward: removed.forward,
                    span: prev.span + removed.span - 1,
                };
            } else {
                self.link_mut(update[i], i).span -= 1;
            }
        }

        while self.level > 1 && self.link(HEAD, self.level - 1).forward.is_none() {
            self.level -= 1;
        }

        self.release(target);
        self.len -= 1;

        true
    }

    /// Returns the arena index of the node at the zero-based `rank`.
    fn node_at(&self, rank: usize) -> Option<usize> {
        if rank >= self.len {
            return None;
        }

        let target = rank + 1;
        let mut traversed = 0;
        let mut x = HEAD;
        for i in (0..self.level).rev() {
            while let Some(next) = self.link(x, i).forward {
                let span = self.link(x, i).span;
                if traversed + span > target {
                    break;
                }
                traversed += span;
                x = next;
            }
            if traversed == target {
                return Some(x);
            }
        }

        None
    }

    /// Number of leading entries whose score satisfies `predicate`. The predicate must be
    /// monotone over the ordering: once it fails it fails for every following entry.
    pub fn count_while(&self, predicate: impl Fn(f64) -> bool) -> usize {
        let mut traversed = 0;
        let mut x = HEAD;
        for i in (0..self.level).rev() {
            while let Some(next) = self.link(x, i).forward {
                if !predicate(self.nodes[next].score) {
                    break;
                }
                traversed += self.link(x, i).span;
                x = next;
            }
        }
        traversed
    }

    /// Iterates entries in order starting at the zero-based `rank`.
    pub fn iter_from(&self, rank: usize) -> Iter<'_> {
        Iter {
            list: self,
            next: self.node_at(rank),
        }
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            next: self.link(HEAD, 0).forward,
        }
    }

    fn alloc(&mut self, score: f64, member: Bytes, level: usize) -> usize {
        let node = Node {
            score,
            member,
            levels: vec![Link::default(); level],
        };

        match self.free.pop() {
            Some(index) => {
                self.nodes[index] = node;
                index
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, index: usize) {
        let node = &mut self.nodes[index];
        node.member = Bytes::new();
        node.levels.clear();
        self.free.push(index);
    }
}

impl Default for SkipList {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Iter<'a> {
    list: &'a SkipList,
    next: Option<usize>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (f64, &'a Bytes);

    fn next(&mut self) -> Option<Self::Item> {
        let list = self.list;
        let node = &list.nodes[self.next?];
        self.next = node.levels[0].forward;
        Some((node.score, &node.member))
    }
}

fn random_level() -> usize {
    let mut rng = rand::thread_rng();
    let mut level = 1;
    while level < MAX_LEVEL && rng.gen_bool(PROMOTION_PROBABILITY) {
        level += 1;
    }
    level
}
