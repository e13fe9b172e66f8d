//! Darts-compatible double-array trie.
//!
//! The image is a flat array of 8-byte units (`base: i32`, `check: u32`, both
//! little endian). A transition on byte `c` from a node with base `b` lands at
//! `b + c + 1` and is valid when that unit's `check == b`. Key terminals use
//! code 0, so keys must not contain NUL; a terminal unit stores `-value - 1`
//! as its base.
//!
//! [`DoubleArrayBuilder`] produces the image from sorted keys and
//! [`DoubleArray`] reads it in place without copying.

use crate::errors::{GramDbError, Result};

/// Size of one serialized unit in bytes.
pub const UNIT_SIZE: usize = 8;

/// A key (or key prefix) found by a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Match {
    /// Matched length in bytes of the searched key.
    pub length: usize,
    /// Payload stored for the matched key.
    pub value: i32,
}

#[derive(Debug, Clone, Copy)]
struct Unit {
    base: i32,
    check: u32,
}

/// Read-only view over a serialized double-array image.
#[derive(Debug, Clone, Copy)]
pub struct DoubleArray<'a> {
    image: &'a [u8],
}

impl<'a> DoubleArray<'a> {
    /// Wrap a serialized image. Returns `None` unless the image is a non-empty
    /// whole number of units.
    pub fn from_bytes(image: &'a [u8]) -> Option<Self> {
        if image.is_empty() || image.len() % UNIT_SIZE != 0 {
            return None;
        }
        Some(Self { image })
    }

    #[inline]
    fn unit(&self, index: usize) -> Option<Unit> {
        let start = index.checked_mul(UNIT_SIZE)?;
        let bytes = self.image.get(start..start + UNIT_SIZE)?;
        Some(Unit {
            base: i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            check: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        })
    }

    /// Base of an interior node, or `None` for leaves and missing units.
    #[inline]
    fn interior_base(&self, node_pos: usize) -> Option<i32> {
        self.unit(node_pos).map(|u| u.base).filter(|&b| b > 0)
    }

    #[inline]
    fn child(&self, base: i32, code: usize) -> Option<(usize, Unit)> {
        let pos = (base as usize).checked_add(code)?;
        self.unit(pos)
            .filter(|u| u.check == base as u32)
            .map(|u| (pos, u))
    }

    #[inline]
    fn terminal_value(&self, base: i32) -> Option<i32> {
        self.child(base, 0)
            .filter(|(_, u)| u.base < 0)
            .map(|(_, u)| -(u.base + 1))
    }

    /// Walk `key` from `node_pos` as far as the trie allows.
    ///
    /// Returns the last node reached and the number of key bytes consumed;
    /// the walk stopped early when the count is less than `key.len()`.
    pub fn traverse(&self, key: &[u8], node_pos: usize) -> (usize, usize) {
        let mut node = node_pos;
        for (i, &byte) in key.iter().enumerate() {
            let Some(base) = self.interior_base(node) else {
                return (node, i);
            };
            match self.child(base, byte as usize + 1) {
                Some((pos, _)) => node = pos,
                None => return (node, i),
            }
        }
        (node, key.len())
    }

    /// Value of the key that spells exactly `key`, if stored.
    pub fn exact_match_search(&self, key: &[u8]) -> Option<i32> {
        let (node, consumed) = self.traverse(key, 0);
        if consumed != key.len() {
            return None;
        }
        self.interior_base(node)
            .and_then(|base| self.terminal_value(base))
    }

    /// Every prefix of `key` that, read from `node_pos`, ends on a stored key.
    ///
    /// Results come in order of increasing length, at most `limit` of them.
    pub fn common_prefix_search(&self, key: &[u8], node_pos: usize, limit: usize) -> Vec<Match> {
        let mut results = Vec::new();
        let Some(mut base) = self.interior_base(node_pos) else {
            return results;
        };
        for (i, &byte) in key.iter().enumerate() {
            if let Some(value) = self.terminal_value(base) {
                if results.len() < limit {
                    results.push(Match { length: i, value });
                }
            }
            match self.child(base, byte as usize + 1) {
                Some((_, unit)) if unit.base > 0 => base = unit.base,
                _ => return results,
            }
        }
        if let Some(value) = self.terminal_value(base) {
            if results.len() < limit {
                results.push(Match {
                    length: key.len(),
                    value,
                });
            }
        }
        results
    }
}

/// A group of sibling edges sharing a parent, covering keys `left..right`.
#[derive(Debug, Clone, Copy)]
struct Node {
    code: usize,
    depth: usize,
    left: usize,
    right: usize,
}

/// Builds a double-array image from strictly ascending, NUL-free keys.
pub struct DoubleArrayBuilder<'k> {
    keys: &'k [&'k [u8]],
    values: &'k [i32],
    base: Vec<i32>,
    check: Vec<u32>,
    used: Vec<bool>,
    size: usize,
    next_check_pos: usize,
}

impl<'k> DoubleArrayBuilder<'k> {
    /// Build the serialized image for `keys` with matching non-negative `values`.
    pub fn build(keys: &'k [&'k [u8]], values: &'k [i32]) -> Result<Vec<u8>> {
        if keys.is_empty() {
            return Err(GramDbError::EmptyInput);
        }
        if keys.len() != values.len() {
            return Err(GramDbError::TrieConstruction(format!(
                "{} keys but {} values",
                keys.len(),
                values.len()
            )));
        }
        validate_keys(keys)?;
        if let Some(index) = values.iter().position(|&v| v < 0) {
            return Err(GramDbError::TrieConstruction(format!(
                "negative value at index {}",
                index
            )));
        }

        let mut builder = Self {
            keys,
            values,
            base: Vec::new(),
            check: Vec::new(),
            used: Vec::new(),
            size: 1,
            next_check_pos: 0,
        };
        builder.resize(8192.min(keys.len() * 4 + 256));

        let root = Node {
            code: 0,
            depth: 0,
            left: 0,
            right: keys.len(),
        };
        let siblings = builder.fetch(&root)?;
        let begin = builder.insert(&siblings)?;
        builder.base[0] = to_base(begin)?;
        Ok(builder.into_image())
    }

    fn resize(&mut self, len: usize) {
        if self.base.len() < len {
            self.base.resize(len, 0);
            self.check.resize(len, 0);
            self.used.resize(len, false);
        }
    }

    /// Collect the distinct edges leaving `parent`, one per next byte.
    fn fetch(&self, parent: &Node) -> Result<Vec<Node>> {
        let mut siblings: Vec<Node> = Vec::new();
        let mut prev = 0;
        for i in parent.left..parent.right {
            let key = self.keys[i];
            if key.len() < parent.depth {
                continue;
            }
            let code = key.get(parent.depth).map_or(0, |&b| b as usize + 1);
            if prev > code {
                return Err(GramDbError::UnsortedKeys { index: i });
            }
            if code != prev || siblings.is_empty() {
                if let Some(last) = siblings.last_mut() {
                    last.right = i;
                }
                siblings.push(Node {
                    code,
                    depth: parent.depth + 1,
                    left: i,
                    right: parent.right,
                });
            }
            prev = code;
        }
        Ok(siblings)
    }

    /// Place `siblings` at the first free base and recurse into each child.
    fn insert(&mut self, siblings: &[Node]) -> Result<usize> {
        let (Some(first), Some(last)) = (siblings.first(), siblings.last()) else {
            return Err(GramDbError::TrieConstruction("empty sibling set".into()));
        };

        let mut pos = (first.code + 1).max(self.next_check_pos) - 1;
        let mut nonzero = 0usize;
        let mut first_free = true;
        let begin = loop {
            pos += 1;
            self.resize(pos + 1);
            if self.check[pos] != 0 {
                nonzero += 1;
                continue;
            }
            if first_free {
                self.next_check_pos = pos;
                first_free = false;
            }
            let begin = pos - first.code;
            self.resize(begin + last.code + 1);
            if self.used[begin] {
                continue;
            }
            if siblings[1..]
                .iter()
                .all(|s| self.check[begin + s.code] == 0)
            {
                break begin;
            }
        };

        // mostly-full region: skip it on the next search
        if nonzero * 100 >= (pos - self.next_check_pos + 1) * 95 {
            self.next_check_pos = pos;
        }

        self.used[begin] = true;
        self.size = self.size.max(begin + last.code + 1);
        let check = to_check(begin)?;
        for s in siblings {
            self.check[begin + s.code] = check;
        }

        for s in siblings {
            let children = self.fetch(s)?;
            let slot = begin + s.code;
            if children.is_empty() {
                self.base[slot] = -self.values[s.left] - 1;
            } else {
                let child_begin = self.insert(&children)?;
                self.base[slot] = to_base(child_begin)?;
            }
        }
        Ok(begin)
    }

    fn into_image(self) -> Vec<u8> {
        let mut image = Vec::with_capacity(self.size * UNIT_SIZE);
        for i in 0..self.size {
            image.extend_from_slice(&self.base[i].to_le_bytes());
            image.extend_from_slice(&self.check[i].to_le_bytes());
        }
        image
    }
}

fn to_base(pos: usize) -> Result<i32> {
    i32::try_from(pos).map_err(|_| GramDbError::TrieConstruction("double array too large".into()))
}

fn to_check(pos: usize) -> Result<u32> {
    u32::try_from(pos).map_err(|_| GramDbError::TrieConstruction("double array too large".into()))
}

/// Keys must be non-empty, NUL-free and strictly ascending.
fn validate_keys(keys: &[&[u8]]) -> Result<()> {
    for (index, key) in keys.iter().enumerate() {
        if key.is_empty() || key.contains(&0) {
            return Err(GramDbError::InvalidKey { index });
        }
        if index > 0 {
            match keys[index - 1].cmp(key) {
                std::cmp::Ordering::Less => {}
                std::cmp::Ordering::Equal => return Err(GramDbError::DuplicateKey { index }),
                std::cmp::Ordering::Greater => return Err(GramDbError::UnsortedKeys { index }),
            }
        }
    }
    Ok(())
}
