//! Compact cluster node-list expansion and membership matching.
//!
//! Allocated nodes appear in the log in compact syntax: a lowercase
//! cluster prefix, optional brackets, comma-separated pieces where a
//! hyphen denotes an inclusive numeric range (`kp[001-003,010]`).
//! Expansion canonicalizes that into a set of zero-padded identifiers
//! so user queries written as `5`, `kp005` or `[001-010]` all land on
//! the same members.

use crate::expr::Expr;
use crate::field::EvalError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static LETTER_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new("[a-z]").unwrap_or_else(|e| panic!("invalid node prefix pattern: {e}"))
});

/// Width of a canonical numeric node identifier.
const NODE_WIDTH: usize = 3;

/// Canonical membership set for a compact node-list expression.
///
/// Rebuilt per record; the underlying node list differs from line to
/// line, so there is nothing worth caching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSet {
    nodes: BTreeSet<String>,
}

impl NodeSet {
    /// Expand compact node-list syntax into a canonical set.
    ///
    /// Lowercase letter prefixes and brackets are stripped; each
    /// comma-separated piece is either an inclusive numeric range
    /// (endpoints reoriented low-to-high if written backwards) or a
    /// single node. All-numeric identifiers are zero-padded to width
    /// 3. Empty input expands to the empty set: the job did not run
    /// on any nodes.
    pub fn expand(compact: &str) -> Self {
        let stripped = LETTER_PREFIX.replace_all(compact, "");
        let stripped = stripped.replace(['[', ']'], "");

        let mut nodes = BTreeSet::new();
        for piece in stripped.split(',') {
            if piece.is_empty() {
                continue;
            }
            if let Some((lo, hi)) = parse_range(piece) {
                for n in lo..=hi {
                    nodes.insert(format!("{n:0width$}", width = NODE_WIDTH));
                }
            } else {
                nodes.insert(pad(piece));
            }
        }
        Self { nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, node: &str) -> bool {
        self.nodes.contains(node)
    }

    /// Whether every member of `other` is a member of `self`.
    ///
    /// Vacuously true when `other` is empty.
    pub fn contains_all(&self, other: &NodeSet) -> bool {
        other.nodes.iter().all(|n| self.nodes.contains(n))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }
}

/// Evaluate a node query expression against a record's node list.
///
/// Each query term expands like a node list and is true iff all of
/// its nodes were allocated to the record; the term results reduce
/// through the usual boolean combinators.
pub fn matches(record_node_list: &str, expr: &Expr) -> Result<bool, EvalError> {
    let allocated = NodeSet::expand(record_node_list);
    expr.eval(&mut |term| Ok(allocated.contains_all(&NodeSet::expand(term))))
}

fn parse_range(piece: &str) -> Option<(u64, u64)> {
    let (lo, hi) = piece.split_once('-')?;
    let lo: u64 = lo.parse().ok()?;
    let hi: u64 = hi.parse().ok()?;
    // Ranges written high-to-low are reoriented, not rejected
    Some(if lo > hi { (hi, lo) } else { (lo, hi) })
}

fn pad(piece: &str) -> String {
    match piece.parse::<u64>() {
        Ok(n) => format!("{n:0width$}", width = NODE_WIDTH),
        Err(_) => piece.to_string(),
    }
}
