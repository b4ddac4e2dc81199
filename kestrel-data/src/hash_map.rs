// kestrel-data - Persistent hashed trie map
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! A persistent hash array mapped trie.
//!
//! Keys are hashed to 64 bits and consumed five bits per level, so each
//! branch has up to 32 slots, stored densely behind a bitmap. Keys whose full
//! hashes are equal share a collision node.
//!
//! `assoc` and `dissoc` copy only the branches on the path from the root to
//! the changed entry; every other branch is shared with the original map.
//! The entry count is carried alongside the root and adjusted per update.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use crate::coll::{Counted, Seqable};
use crate::error::{Error, Result};
use crate::seq::Seq;
use crate::value::Value;

/// Bits consumed per trie level.
const BITS_PER_LEVEL: u32 = 5;
const LEVEL_MASK: u64 = 0x1f;

pub(crate) fn hash_of(key: &Value) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

/// The five-bit slot index at a given depth.
fn slot_at_depth(hash: u64, depth: u32) -> u32 {
    ((hash >> (depth * BITS_PER_LEVEL)) & LEVEL_MASK) as u32
}

/// Position of `slot` in a branch's dense entry array.
fn compressed_index(bitmap: u32, slot: u32) -> usize {
    (bitmap & ((1u32 << slot) - 1)).count_ones() as usize
}

#[derive(Clone)]
enum Entry {
    Leaf(Value, Value),
    Branch(Arc<Branch>),
    Collision(Arc<Collision>),
}

struct Branch {
    bitmap: u32,
    entries: Vec<Entry>,
}

/// Two or more keys with the same full hash.
struct Collision {
    hash: u64,
    pairs: Vec<(Value, Value)>,
}

#[derive(Clone)]
pub struct HashMap {
    root: Arc<Branch>,
    count: usize,
}

static EMPTY_ROOT: OnceLock<Arc<Branch>> = OnceLock::new();

impl HashMap {
    pub fn empty() -> HashMap {
        let root = EMPTY_ROOT.get_or_init(|| {
            Arc::new(Branch {
                bitmap: 0,
                entries: Vec::new(),
            })
        });
        HashMap {
            root: Arc::clone(root),
            count: 0,
        }
    }

    /// Build from pairs, failing on a repeated key.
    pub fn from_pairs_checked(pairs: impl IntoIterator<Item = (Value, Value)>) -> Result<Self> {
        let mut map = HashMap::empty();
        for (key, val) in pairs {
            let (next, added) = map.insert(key.clone(), val);
            if !added {
                return Err(Error::DuplicateKey {
                    key: key.to_string(),
                });
            }
            map = next;
        }
        Ok(map)
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn val_at(&self, key: &Value) -> Option<&Value> {
        let hash = hash_of(key);
        let mut branch: &Branch = &self.root;
        let mut depth = 0u32;
        loop {
            let slot = slot_at_depth(hash, depth);
            let bit = 1u32 << slot;
            if branch.bitmap & bit == 0 {
                return None;
            }
            match &branch.entries[compressed_index(branch.bitmap, slot)] {
                Entry::Leaf(k, v) => return if k == key { Some(v) } else { None },
                Entry::Collision(c) => {
                    if c.hash != hash {
                        return None;
                    }
                    return c.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v);
                }
                Entry::Branch(child) => {
                    branch = &**child;
                    depth += 1;
                }
            }
        }
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.val_at(key).is_some()
    }

    pub fn assoc(&self, key: Value, val: Value) -> HashMap {
        self.insert(key, val).0
    }

    /// Insert or replace; the flag is true when the key was new.
    fn insert(&self, key: Value, val: Value) -> (HashMap, bool) {
        let hash = hash_of(&key);
        let mut added = false;
        let root = insert_into(&self.root, 0, hash, key, val, &mut added);
        let count = if added { self.count + 1 } else { self.count };
        (
            HashMap {
                root: Arc::new(root),
                count,
            },
            added,
        )
    }

    pub fn dissoc(&self, key: &Value) -> HashMap {
        let hash = hash_of(key);
        match remove_from(&self.root, 0, hash, key) {
            Removal::NotFound => self.clone(),
            Removal::Replaced(entries, bitmap) => HashMap {
                root: Arc::new(Branch { bitmap, entries }),
                count: self.count - 1,
            },
        }
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            stack: vec![Level::Entries(self.root.entries.iter())],
        }
    }
}

// ============================================================================
// Insertion
// ============================================================================

fn insert_into(
    branch: &Branch,
    depth: u32,
    hash: u64,
    key: Value,
    val: Value,
    added: &mut bool,
) -> Branch {
    let slot = slot_at_depth(hash, depth);
    let bit = 1u32 << slot;
    let idx = compressed_index(branch.bitmap, slot);
    let mut entries = branch.entries.clone();

    if branch.bitmap & bit == 0 {
        *added = true;
        entries.insert(idx, Entry::Leaf(key, val));
        return Branch {
            bitmap: branch.bitmap | bit,
            entries,
        };
    }

    let replacement = match &branch.entries[idx] {
        Entry::Leaf(existing_key, existing_val) => {
            if *existing_key == key {
                Entry::Leaf(key, val)
            } else {
                *added = true;
                let existing_hash = hash_of(existing_key);
                if existing_hash == hash {
                    Entry::Collision(Arc::new(Collision {
                        hash,
                        pairs: vec![(existing_key.clone(), existing_val.clone()), (key, val)],
                    }))
                } else {
                    let existing = Entry::Leaf(existing_key.clone(), existing_val.clone());
                    Entry::Branch(Arc::new(split(
                        existing,
                        existing_hash,
                        Entry::Leaf(key, val),
                        hash,
                        depth + 1,
                    )))
                }
            }
        }
        Entry::Collision(c) => {
            if c.hash == hash {
                let mut pairs = c.pairs.clone();
                match pairs.iter().position(|(k, _)| *k == key) {
                    Some(pos) => pairs[pos] = (key, val),
                    None => {
                        *added = true;
                        pairs.push((key, val));
                    }
                }
                Entry::Collision(Arc::new(Collision { hash, pairs }))
            } else {
                *added = true;
                Entry::Branch(Arc::new(split(
                    Entry::Collision(Arc::clone(c)),
                    c.hash,
                    Entry::Leaf(key, val),
                    hash,
                    depth + 1,
                )))
            }
        }
        Entry::Branch(child) => {
            Entry::Branch(Arc::new(insert_into(child, depth + 1, hash, key, val, added)))
        }
    };
    entries[idx] = replacement;
    Branch {
        bitmap: branch.bitmap,
        entries,
    }
}

/// A branch holding two entries whose hashes differ somewhere at or below
/// `depth`.
fn split(a: Entry, a_hash: u64, b: Entry, b_hash: u64, depth: u32) -> Branch {
    let a_slot = slot_at_depth(a_hash, depth);
    let b_slot = slot_at_depth(b_hash, depth);
    if a_slot == b_slot {
        let child = split(a, a_hash, b, b_hash, depth + 1);
        return Branch {
            bitmap: 1u32 << a_slot,
            entries: vec![Entry::Branch(Arc::new(child))],
        };
    }
    let entries = if a_slot < b_slot { vec![a, b] } else { vec![b, a] };
    Branch {
        bitmap: (1u32 << a_slot) | (1u32 << b_slot),
        entries,
    }
}

// ============================================================================
// Removal
// ============================================================================

enum Removal {
    NotFound,
    /// The branch's new entries and bitmap.
    Replaced(Vec<Entry>, u32),
}

fn remove_from(branch: &Branch, depth: u32, hash: u64, key: &Value) -> Removal {
    let slot = slot_at_depth(hash, depth);
    let bit = 1u32 << slot;
    if branch.bitmap & bit == 0 {
        return Removal::NotFound;
    }
    let idx = compressed_index(branch.bitmap, slot);

    let replacement: Option<Entry> = match &branch.entries[idx] {
        Entry::Leaf(k, _) => {
            if k != key {
                return Removal::NotFound;
            }
            None
        }
        Entry::Collision(c) => {
            if c.hash != hash {
                return Removal::NotFound;
            }
            let Some(pos) = c.pairs.iter().position(|(k, _)| k == key) else {
                return Removal::NotFound;
            };
            let mut pairs = c.pairs.clone();
            pairs.remove(pos);
            if pairs.len() == 1 {
                let (k, v) = pairs.remove(0);
                Some(Entry::Leaf(k, v))
            } else {
                Some(Entry::Collision(Arc::new(Collision { hash, pairs })))
            }
        }
        Entry::Branch(child) => match remove_from(child, depth + 1, hash, key) {
            Removal::NotFound => return Removal::NotFound,
            Removal::Replaced(mut child_entries, child_bitmap) => {
                // A lone leaf or collision can sit at any depth, so pull it
                // up. A lone branch has to stay where its hash bits put it.
                let single_terminal = child_entries.len() == 1
                    && !matches!(child_entries[0], Entry::Branch(_));
                if child_entries.is_empty() {
                    None
                } else if single_terminal {
                    child_entries.pop()
                } else {
                    Some(Entry::Branch(Arc::new(Branch {
                        bitmap: child_bitmap,
                        entries: child_entries,
                    })))
                }
            }
        },
    };

    let mut entries = branch.entries.clone();
    match replacement {
        Some(entry) => {
            entries[idx] = entry;
            Removal::Replaced(entries, branch.bitmap)
        }
        None => {
            entries.remove(idx);
            Removal::Replaced(entries, branch.bitmap & !bit)
        }
    }
}

// ============================================================================
// Iteration
// ============================================================================

enum Level<'a> {
    Entries(std::slice::Iter<'a, Entry>),
    Pairs(std::slice::Iter<'a, (Value, Value)>),
}

/// Borrowing iterator over a hash map's entries, in trie order.
pub struct Iter<'a> {
    stack: Vec<Level<'a>>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a Value, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.stack.last_mut()? {
                Level::Entries(it) => match it.next() {
                    Some(Entry::Leaf(k, v)) => return Some((k, v)),
                    Some(Entry::Branch(b)) => self.stack.push(Level::Entries(b.entries.iter())),
                    Some(Entry::Collision(c)) => self.stack.push(Level::Pairs(c.pairs.iter())),
                    None => {
                        self.stack.pop();
                    }
                },
                Level::Pairs(it) => match it.next() {
                    Some((k, v)) => return Some((k, v)),
                    None => {
                        self.stack.pop();
                    }
                },
            }
        }
    }
}

/// An owned cursor into the trie, used as a sequence view.
///
/// The path holds each branch from the root down to the current entry along
/// with the index taken at that level. Advancing clones the path, which is at
/// most thirteen frames deep.
#[derive(Clone)]
pub struct HashMapSeq {
    path: Vec<Frame>,
    remaining: usize,
}

#[derive(Clone)]
enum Frame {
    Branch(Arc<Branch>, usize),
    Collision(Arc<Collision>, usize),
}

impl Frame {
    fn advance(&mut self) {
        match self {
            Frame::Branch(_, i) | Frame::Collision(_, i) => *i += 1,
        }
    }
}

enum Step {
    Ready,
    Exhausted,
    Descend(Frame),
}

impl HashMapSeq {
    pub(crate) fn new(map: &HashMap) -> Option<Self> {
        if map.is_empty() {
            return None;
        }
        let path = settle(vec![Frame::Branch(Arc::clone(&map.root), 0)])?;
        Some(HashMapSeq {
            path,
            remaining: map.count,
        })
    }

    pub(crate) fn entry(&self) -> Option<(&Value, &Value)> {
        match self.path.last()? {
            Frame::Branch(b, i) => match b.entries.get(*i)? {
                Entry::Leaf(k, v) => Some((k, v)),
                _ => None,
            },
            Frame::Collision(c, i) => c.pairs.get(*i).map(|(k, v)| (k, v)),
        }
    }

    pub(crate) fn advance(&self) -> Option<Self> {
        if self.remaining <= 1 {
            return None;
        }
        let mut path = self.path.clone();
        path.last_mut()?.advance();
        Some(HashMapSeq {
            path: settle(path)?,
            remaining: self.remaining - 1,
        })
    }

    pub(crate) fn remaining(&self) -> usize {
        self.remaining
    }
}

/// Move the cursor forward until it rests on a leaf or a collision pair.
fn settle(mut path: Vec<Frame>) -> Option<Vec<Frame>> {
    loop {
        let step = match path.last()? {
            Frame::Branch(b, i) => match b.entries.get(*i) {
                None => Step::Exhausted,
                Some(Entry::Leaf(..)) => Step::Ready,
                Some(Entry::Branch(child)) => Step::Descend(Frame::Branch(Arc::clone(child), 0)),
                Some(Entry::Collision(c)) => Step::Descend(Frame::Collision(Arc::clone(c), 0)),
            },
            Frame::Collision(c, i) => {
                if *i < c.pairs.len() {
                    Step::Ready
                } else {
                    Step::Exhausted
                }
            }
        };
        match step {
            Step::Ready => return Some(path),
            Step::Descend(frame) => path.push(frame),
            Step::Exhausted => {
                path.pop();
                path.last_mut()?.advance();
            }
        }
    }
}

impl Counted for HashMap {
    fn count(&self) -> usize {
        self.count
    }
}

impl Seqable for HashMap {
    fn seq(&self) -> Result<Option<Seq>> {
        Ok(HashMapSeq::new(self).map(Seq::HashMap))
    }
}

impl fmt::Debug for HashMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
